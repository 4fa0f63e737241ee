/*
 * Copyright (c) 2026. Mikhail Kulik.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::collections::HashMap;

use crate::types::Type;

/// A lexically scoped symbol table: a stack of frames searched innermost
/// first, plus a flat side namespace for foreign type names and the name
/// of the module being checked (used to build fully qualified type names).
pub struct SymbolTable<T> {
    pub module_name: String,
    frames: Vec<HashMap<String, T>>,
    foreign_types: HashMap<String, Type>,
}

impl<T> SymbolTable<T> {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            frames: vec![HashMap::new()],
            foreign_types: HashMap::new(),
        }
    }

    pub fn open_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn close_scope(&mut self) {
        self.frames.pop().expect("scope underflow");
    }

    pub fn add(&mut self, name: &str, decl: T) {
        self.frames
            .last_mut()
            .expect("no open scope")
            .insert(name.to_string(), decl);
    }

    /// Search all frames, innermost first.
    pub fn find(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Search only the innermost frame, for duplicate detection.
    pub fn find_dup(&self, name: &str) -> Option<&T> {
        self.frames.last().and_then(|frame| frame.get(name))
    }

    pub fn add_foreign_type(&mut self, name: &str, ty: Type) {
        self.foreign_types.insert(name.to_string(), ty);
    }

    pub fn find_foreign_type(&self, name: &str) -> Option<&Type> {
        self.foreign_types.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoping() {
        let mut t: SymbolTable<u32> = SymbolTable::new("m");
        t.add("a", 1);
        t.open_scope();
        t.add("a", 2);
        t.add("b", 3);
        assert_eq!(t.find("a"), Some(&2));
        assert_eq!(t.find("b"), Some(&3));
        assert_eq!(t.find_dup("a"), Some(&2));
        t.close_scope();
        assert_eq!(t.find("a"), Some(&1));
        assert_eq!(t.find("b"), None);
        assert_eq!(t.find_dup("a"), Some(&1));
    }
}
