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

//! The import-resolution seam between the checker and the outside world.
//! The driver provides a filesystem implementation; tests use
//! [`InMemoryLoader`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::type_checker::check_module;
use crate::types::ModuleType;
use crate::Session;

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    NotFound(String),
    /// The module is currently being loaded further up the stack.
    Circular(String),
    /// The module was found but failed to compile or its type could not
    /// be read.
    Failed(String, String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotFound(name) => write!(f, "module '{}' not found", name),
            ImportError::Circular(name) => {
                write!(f, "circular reference to module '{}'", name)
            }
            ImportError::Failed(name, why) => {
                write!(f, "could not load module '{}': {}", name, why)
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Resolves a module name to its exported type. Implementations MUST
/// report a cycle with [`ImportError::Circular`] when re-entered for a
/// module that is still being loaded.
pub trait Loader {
    fn load(&mut self, session: &mut Session, module_name: &str) -> Result<ModuleType, ImportError>;
}

/// A loader over an in-memory map of sources, for tests. Memoizes loaded
/// types and detects circular imports with an in-progress sentinel set.
#[derive(Default)]
pub struct InMemoryLoader {
    sources: HashMap<String, String>,
    loaded: HashMap<String, ModuleType>,
    in_progress: HashSet<String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, source: &str) -> &mut Self {
        self.sources.insert(name.to_string(), source.to_string());
        self
    }

    /// Register an already-typed module (no source), as a stand-in for a
    /// precompiled artifact.
    pub fn add_typed(&mut self, ty: ModuleType) -> &mut Self {
        self.loaded.insert(ty.name.clone(), ty);
        self
    }
}

impl Loader for InMemoryLoader {
    fn load(&mut self, session: &mut Session, module_name: &str) -> Result<ModuleType, ImportError> {
        if let Some(ty) = self.loaded.get(module_name) {
            return Ok(ty.clone());
        }
        if self.in_progress.contains(module_name) {
            return Err(ImportError::Circular(module_name.to_string()));
        }
        let source = self
            .sources
            .get(module_name)
            .cloned()
            .ok_or_else(|| ImportError::NotFound(module_name.to_string()))?;

        let program = parser::parse(&source)
            .map_err(|e| ImportError::Failed(module_name.to_string(), e.to_string()))?;

        self.in_progress.insert(module_name.to_string());
        let result = check_module(module_name, &source, &program, session, self);
        self.in_progress.remove(module_name);

        match result {
            Ok(module) => {
                let ty = module.module_type.clone();
                self.loaded.insert(module_name.to_string(), ty.clone());
                Ok(ty)
            }
            Err(errors) => {
                let first = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(ImportError::Failed(module_name.to_string(), first))
            }
        }
    }
}
