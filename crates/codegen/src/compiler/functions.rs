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

//! Per-function emission context: owns the C names of locals and
//! temporaries, and the GC stack-slot discipline. Every GC-typed local
//! and temporary gets its own reserved slot; the function preamble
//! reserves and nils them, and values are mirrored into their slot as
//! soon as they are produced, so a collection triggered by any later
//! allocation still sees them.

use crate::compiler::cwriter::CWriter;
use crate::compiler::{c_type, mangle};
use crate::hir::*;
use crate::types::Type;
use crate::upvalues::ModuleLayout;

pub(crate) struct FuncEmitter<'m> {
    pub module: &'m TModule,
    pub layout: &'m ModuleLayout,
    /// C expression naming this module's globals table (`_mod` inside
    /// functions).
    pub globals: String,
    pub out: CWriter,
    /// Counter for auxiliary C names (probes, part arrays).
    pub(crate) tvalue_probe: usize,
    locals: Vec<CLocal>,
    tmp_count: usize,
    slot_count: usize,
}

struct CLocal {
    c_name: String,
    slot: Option<usize>,
}

/// A computed value: a C expression (usually a temporary's name) plus the
/// slot mirroring it when it is GC-typed.
#[derive(Clone)]
pub(crate) struct CValue {
    pub expr: String,
    pub slot: Option<usize>,
}

impl CValue {
    pub fn pure(expr: impl Into<String>) -> CValue {
        CValue {
            expr: expr.into(),
            slot: None,
        }
    }
}

impl<'m> FuncEmitter<'m> {
    pub fn new(module: &'m TModule, layout: &'m ModuleLayout, func: &TFunc) -> FuncEmitter<'m> {
        let mut emitter = FuncEmitter {
            module,
            layout,
            globals: "_mod".to_string(),
            out: CWriter::new(),
            tvalue_probe: 0,
            locals: Vec::new(),
            tmp_count: 0,
            slot_count: 0,
        };
        for (id, local) in func.locals.iter().enumerate() {
            let c_name = if id < func.param_count {
                format!("_param_{}", local.name)
            } else {
                format!("_local_{}_{}", local.name, id)
            };
            let slot = local.ty.is_gc().then(|| emitter.take_slot());
            emitter.locals.push(CLocal { c_name, slot });
        }
        emitter
    }

    /// A context for module-init code, which has no reserved stack slots;
    /// everything it builds is stored into the (anchored) globals table
    /// right away.
    pub fn for_init(module: &'m TModule, layout: &'m ModuleLayout) -> FuncEmitter<'m> {
        FuncEmitter {
            module,
            layout,
            globals: format!("{}_globals", mangle(&module.name)),
            out: CWriter::new(),
            tvalue_probe: 0,
            locals: Vec::new(),
            tmp_count: 0,
            slot_count: 0,
        }
    }

    fn take_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn local_name(&self, id: LocalId) -> &str {
        &self.locals[id].c_name
    }

    pub fn local_slot(&self, id: LocalId) -> Option<usize> {
        self.locals[id].slot
    }

    pub fn slot_expr(slot: usize) -> String {
        format!("_base + {}", slot)
    }

    /// Declare a fresh temporary of the given type; GC types also get a
    /// stack slot.
    pub fn new_tmp(&mut self, ty: &Type) -> CValue {
        self.tmp_count += 1;
        let name = format!("_tmp_{}", self.tmp_count);
        match ty {
            Type::Value | Type::Option(_) | Type::Nominal(_) => {
                self.out.line(&format!("TValue {};", name));
                self.out.line(&format!("setnilvalue(&{});", name));
            }
            Type::String | Type::Array(_) | Type::Function { .. } => {
                self.out.line(&format!("{}{} = NULL;", c_type(ty), name));
            }
            _ => {
                self.out.line(&format!("{}{} = 0;", c_type(ty), name));
            }
        }
        let slot = ty.is_gc().then(|| self.take_slot());
        CValue { expr: name, slot }
    }

    /// Mirror a GC value into its owning slot (no-op for scalars).
    pub fn mirror(&mut self, ty: &Type, value: &CValue) {
        if let Some(slot) = value.slot {
            let slot_expr = Self::slot_expr(slot);
            let store = set_value(ty, &format!("({})", slot_expr), &value.expr);
            self.out.line(&store);
        }
    }

    /// Store into a named local, mirroring its slot when GC-typed.
    pub fn store_local(&mut self, id: LocalId, ty: &Type, value: &str) {
        let c_name = self.locals[id].c_name.clone();
        self.out.line(&format!("{} = {};", c_name, value));
        if let Some(slot) = self.locals[id].slot {
            let store = set_value(ty, &format!("({})", Self::slot_expr(slot)), &c_name);
            self.out.line(&store);
        }
    }

    /// Emit a runtime type-mismatch trap for a `TValue *` expression.
    pub fn type_error(&mut self, expected: &str, tv: &str, line: u32) -> String {
        format!(
            "luaL_error(L, \"type error at line %d, expected %s but found %s\", {}, \"{}\", lua_typename(L, ttnov({})));",
            line, expected, tv
        )
    }

    /// Extract a typed C value out of a `TValue *`, trapping on a tag
    /// mismatch, and mirror it. Returns the temporary holding the result.
    pub fn extract_checked(&mut self, ty: &Type, tv: &str, line: u32) -> CValue {
        let tmp = self.new_tmp(ty);
        match ty {
            Type::Value | Type::Option(_) => {
                self.out
                    .line(&format!("setobj2s(L, &{}, {});", tmp.expr, tv));
            }
            Type::Nominal(fqtn) => {
                let mt = self.typemt_expr(fqtn);
                self.out.open(&format!(
                    "if (TITAN_UNLIKELY(!ttistable({}) || hvalue({})->metatable != {})) {{",
                    tv, tv, mt
                ));
                let trap = self.type_error(fqtn, tv, line);
                self.out.line(&trap);
                self.out.close("}");
                self.out
                    .line(&format!("setobj2s(L, &{}, {});", tmp.expr, tv));
            }
            // floats also accept integers, as Lua numbers do
            Type::Float => {
                self.out.open(&format!("if (ttisfloat({})) {{", tv));
                self.out.line(&format!("{} = fltvalue({});", tmp.expr, tv));
                self.out.close("}");
                self.out.open(&format!("else if (ttisinteger({})) {{", tv));
                self.out
                    .line(&format!("{} = (lua_Number)ivalue({});", tmp.expr, tv));
                self.out.close("}");
                self.out.open("else {");
                let trap = self.type_error("float", tv, line);
                self.out.line(&trap);
                self.out.close("}");
            }
            _ => {
                let (check, read, name) = match ty {
                    Type::Nil => ("ttisnil", "0".to_string(), "nil"),
                    Type::Boolean => ("ttisboolean", format!("bvalue({})", tv), "boolean"),
                    Type::Integer => ("ttisinteger", format!("ivalue({})", tv), "integer"),
                    Type::String => ("ttisstring", format!("tsvalue({})", tv), "string"),
                    Type::Array(_) => ("ttistable", format!("hvalue({})", tv), "array"),
                    Type::Function { .. } => {
                        ("ttisCclosure", format!("clCvalue({})", tv), "function")
                    }
                    _ => unreachable!("extract of {}", ty),
                };
                self.out
                    .open(&format!("if (TITAN_UNLIKELY(!{}({}))) {{", check, tv));
                let trap = self.type_error(name, tv, line);
                self.out.line(&trap);
                self.out.close("}");
                if *ty != Type::Nil {
                    self.out.line(&format!("{} = {};", tmp.expr, read));
                }
            }
        }
        self.mirror(ty, &tmp);
        tmp
    }

    /// The C expression for a record's metatable pointer, local or
    /// imported.
    pub fn typemt_expr(&self, fqtn: &str) -> String {
        typemt_expr(self.module, fqtn)
    }
}

pub(crate) fn typemt_expr(module: &TModule, fqtn: &str) -> String {
    let own_prefix = format!("{}.", module.name);
    if let Some(local) = fqtn.strip_prefix(&own_prefix) {
        if module.records.iter().any(|r| r.fqtn == fqtn) {
            return format!("{}_{}_typemt", mangle(&module.name), local);
        }
    }
    for import in &module.imports {
        let prefix = format!("{}.", import.module_name);
        if let Some(local) = fqtn.strip_prefix(&prefix) {
            return format!("(*{}_{}_typemt_ref)", mangle(&import.module_name), local);
        }
    }
    // a record of a transitively imported module; resolved like an import
    unreachable!("record {} has no reachable metatable", fqtn)
}

/// The store macro writing a typed C value into a `TValue *` destination.
pub(crate) fn set_value(ty: &Type, dst: &str, src: &str) -> String {
    match ty {
        Type::Nil => format!("setnilvalue({});", dst),
        Type::Boolean => format!("setbvalue({}, {});", dst, src),
        Type::Integer => format!("setivalue({}, {});", dst, src),
        Type::Float => format!("setfltvalue({}, {});", dst, src),
        Type::String => format!("setsvalue(L, {}, {});", dst, src),
        Type::Array(_) => format!("sethvalue(L, {}, {});", dst, src),
        Type::Function { .. } => format!("setclCvalue(L, {}, {});", dst, src),
        Type::Value | Type::Option(_) | Type::Nominal(_) => {
            format!("setobj2s(L, {}, &{});", dst, src)
        }
        Type::Invalid | Type::Module(_) | Type::Foreign(_) | Type::TypeOf(_) => {
            unreachable!("store of {}", ty)
        }
    }
}

/// Read a typed C value out of a `TValue *` with no check (for slots the
/// emitter itself keeps well-typed, like globals).
pub(crate) fn read_value(ty: &Type, tv: &str) -> String {
    match ty {
        Type::Nil => "0".to_string(),
        Type::Boolean => format!("bvalue({})", tv),
        Type::Integer => format!("ivalue({})", tv),
        Type::Float => format!("fltvalue({})", tv),
        Type::String => format!("tsvalue({})", tv),
        Type::Array(_) => format!("hvalue({})", tv),
        Type::Function { .. } => format!("clCvalue({})", tv),
        Type::Value | Type::Option(_) | Type::Nominal(_) => format!("*{}", tv),
        Type::Invalid | Type::Module(_) | Type::Foreign(_) | Type::TypeOf(_) => {
            unreachable!("read of {}", ty)
        }
    }
}
