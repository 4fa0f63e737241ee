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

//! Globals-table layout: interns the string literals of function bodies
//! into a pool occupying the first slots, assigns every top-level value a
//! slot after the pool, and records which slots each function touches.
//! Computed as a side table; the typed module is read-only here.

use std::collections::{BTreeSet, HashMap};

use crate::hir::*;

#[derive(Debug)]
pub struct ModuleLayout {
    /// Interned string literals, one slot each, in first-appearance order.
    pub literals: Vec<Vec<u8>>,
    /// Slot of each top-level value, parallel to `TModule::values`.
    pub value_slots: Vec<usize>,
    /// For each top-level value that is a function, the set of globals
    /// slots its body references; empty sets for variables.
    pub referenced_slots: Vec<BTreeSet<usize>>,
}

impl ModuleLayout {
    pub fn slot_count(&self) -> usize {
        self.literals.len() + self.value_slots.len()
    }

    pub fn literal_slot(&self, text: &[u8]) -> Option<usize> {
        self.literals.iter().position(|lit| lit == text)
    }
}

pub fn layout_module(module: &TModule) -> ModuleLayout {
    let mut pool = LiteralPool {
        literals: Vec::new(),
        index: HashMap::new(),
    };
    let mut referenced: Vec<BTreeSet<usize>> = Vec::with_capacity(module.values.len());

    // slots 0..L hold the literal pool, L.. the top-level values; walk in
    // declaration order so two runs produce identical layouts
    for value in &module.values {
        let mut refs = Refs::default();
        if let TValueDecl::Func(f) = value {
            walk_block(&f.body, &mut pool, &mut refs);
        }
        referenced.push(refs.globals);
    }

    let first_value_slot = pool.literals.len();
    let value_slots = (0..module.values.len())
        .map(|i| first_value_slot + i)
        .collect();
    let referenced_slots = referenced
        .into_iter()
        .map(|set| {
            set.into_iter()
                .map(|value_index| first_value_slot + value_index)
                .collect()
        })
        .collect();

    ModuleLayout {
        literals: pool.literals,
        value_slots,
        referenced_slots,
    }
}

struct LiteralPool {
    literals: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, usize>,
}

impl LiteralPool {
    fn intern(&mut self, text: &[u8]) {
        if !self.index.contains_key(text) {
            self.index.insert(text.to_vec(), self.literals.len());
            self.literals.push(text.to_vec());
        }
    }
}

#[derive(Default)]
struct Refs {
    /// Referenced top-level values, as indices into `TModule::values`.
    globals: BTreeSet<usize>,
}

fn walk_block(block: &TBlock, pool: &mut LiteralPool, refs: &mut Refs) {
    for stmt in &block.stmts {
        walk_stmt(stmt, pool, refs);
    }
}

fn walk_stmt(stmt: &TStmt, pool: &mut LiteralPool, refs: &mut Refs) {
    match stmt {
        TStmt::Do(body) => walk_block(body, pool, refs),
        TStmt::While { cond, body } => {
            walk_exp(cond, pool, refs);
            walk_block(body, pool, refs);
        }
        TStmt::Repeat { body, until } => {
            walk_block(body, pool, refs);
            walk_exp(until, pool, refs);
        }
        TStmt::If { arms, else_body } => {
            for (cond, body) in arms {
                walk_exp(cond, pool, refs);
                walk_block(body, pool, refs);
            }
            if let Some(body) = else_body {
                walk_block(body, pool, refs);
            }
        }
        TStmt::NumFor {
            start,
            finish,
            step,
            body,
            ..
        } => {
            walk_exp(start, pool, refs);
            walk_exp(finish, pool, refs);
            walk_exp(step, pool, refs);
            walk_block(body, pool, refs);
        }
        TStmt::Decl { value, .. } => walk_exp(value, pool, refs),
        TStmt::Assign { targets, values } => {
            for target in targets {
                match target {
                    TTarget::Global { index, .. } => {
                        refs.globals.insert(*index);
                    }
                    TTarget::Array { array, index, .. } => {
                        walk_exp(array, pool, refs);
                        walk_exp(index, pool, refs);
                    }
                    TTarget::Field { object, .. } => walk_exp(object, pool, refs),
                    TTarget::Local(_) => {}
                }
            }
            for value in values {
                walk_exp(value, pool, refs);
            }
        }
        TStmt::Call(call) => walk_exp(call, pool, refs),
        TStmt::Return(values) => {
            for value in values {
                walk_exp(value, pool, refs);
            }
        }
    }
}

fn walk_exp(exp: &TExp, pool: &mut LiteralPool, refs: &mut Refs) {
    match &exp.kind {
        TExpKind::String(text) => pool.intern(text),
        TExpKind::Global { index } => {
            refs.globals.insert(*index);
        }
        TExpKind::InitArray { elems } => {
            for elem in elems {
                walk_exp(elem, pool, refs);
            }
        }
        TExpKind::InitRecord { fields, .. } => {
            for field in fields {
                walk_exp(field, pool, refs);
            }
        }
        TExpKind::ArrayGet { array, index } => {
            walk_exp(array, pool, refs);
            walk_exp(index, pool, refs);
        }
        TExpKind::FieldGet { object, .. } => walk_exp(object, pool, refs),
        TExpKind::Unop { operand, .. } => walk_exp(operand, pool, refs),
        TExpKind::Binop { lhs, rhs, .. } => {
            walk_exp(lhs, pool, refs);
            walk_exp(rhs, pool, refs);
        }
        TExpKind::Concat { items } => {
            for item in items {
                walk_exp(item, pool, refs);
            }
        }
        TExpKind::CallFunc { target, args, .. } => {
            if let CallTarget::ModuleFunc(index) = target {
                refs.globals.insert(*index);
            }
            for arg in args {
                walk_exp(arg, pool, refs);
            }
        }
        TExpKind::CallValue { callee, args, .. } => {
            walk_exp(callee, pool, refs);
            for arg in args {
                walk_exp(arg, pool, refs);
            }
        }
        TExpKind::Coerce { value, .. } => walk_exp(value, pool, refs),
        TExpKind::Adjust(inner) => walk_exp(inner, pool, refs),
        TExpKind::Nil
        | TExpKind::Bool(_)
        | TExpKind::Integer(_)
        | TExpKind::Float(_)
        | TExpKind::Local(_)
        | TExpKind::ImportedVar { .. }
        | TExpKind::ModuleRef(_)
        | TExpKind::RecordRef(_)
        | TExpKind::FuncRef(_) => {}
    }
}
