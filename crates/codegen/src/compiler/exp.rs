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

use ast::op::{BinOp, UnOp};

use crate::compiler::cwriter::c_string_literal;
use crate::compiler::functions::{read_value, set_value, CValue, FuncEmitter};
use crate::compiler::{c_type, float_literal, mangle, native_name};
use crate::hir::*;
use crate::types::Type;

impl FuncEmitter<'_> {
    /// Emit the statements computing `e` and return the C expression (a
    /// temporary or a literal) holding the result.
    pub(crate) fn exp(&mut self, e: &TExp) -> CValue {
        match &e.kind {
            TExpKind::Nil => CValue::pure("0"),
            TExpKind::Bool(b) => CValue::pure(if *b { "1" } else { "0" }),
            TExpKind::Integer(n) => CValue::pure(format!("((lua_Integer){})", n)),
            TExpKind::Float(x) => CValue::pure(format!("((lua_Number){})", float_literal(*x))),
            TExpKind::String(text) => {
                let slot = self
                    .layout
                    .literal_slot(text)
                    .expect("string literal was not interned");
                CValue::pure(format!("tsvalue(&{}->array[{}])", self.globals, slot))
            }
            TExpKind::Local(id) => CValue {
                expr: self.local_name(*id).to_string(),
                slot: self.local_slot(*id),
            },
            TExpKind::Global { index } => {
                let slot = self.layout.value_slots[*index];
                let tv = format!("(&{}->array[{}])", self.globals, slot);
                let tmp = self.new_tmp(&e.ty);
                let read = read_value(&e.ty, &tv);
                self.out.line(&format!("{} = {};", tmp.expr, read));
                self.mirror(&e.ty, &tmp);
                tmp
            }
            TExpKind::ImportedVar { import, member } => {
                let module = mangle(&self.module.imports[*import].module_name);
                let tv = format!("(*{}_{}_slot_ref)", module, member);
                let tmp = self.new_tmp(&e.ty);
                let read = read_value(&e.ty, &tv);
                self.out.line(&format!("{} = {};", tmp.expr, read));
                self.mirror(&e.ty, &tmp);
                tmp
            }
            TExpKind::InitArray { elems } => self.emit_init_array(e, elems),
            TExpKind::InitRecord { fqtn, fields } => self.emit_record_new(e, fqtn, fields),
            TExpKind::ArrayGet { array, index } => self.emit_array_get(e, array, index),
            TExpKind::FieldGet {
                object,
                fqtn,
                field_index,
            } => self.emit_field_get(e, object, fqtn, *field_index),
            TExpKind::Unop { op, operand } => self.emit_unop(e, *op, operand),
            TExpKind::Binop { op, lhs, rhs } => self.emit_binop(e, *op, lhs, rhs),
            TExpKind::Concat { items } => self.emit_concat(items),
            TExpKind::CallFunc { target, args, rets } => {
                self.emit_call_func(target, args, rets, e.line)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| CValue::pure("0"))
            }
            TExpKind::CallValue { callee, args, rets } => self
                .emit_call_value(callee, args, rets, e.line)
                .into_iter()
                .next()
                .unwrap_or_else(|| CValue::pure("0")),
            TExpKind::Coerce { kind, value } => self.emit_coerce(e, *kind, value),
            TExpKind::Adjust(inner) => self.exp(inner),
            TExpKind::ModuleRef(_) | TExpKind::RecordRef(_) | TExpKind::FuncRef(_) => {
                unreachable!("name reference survived type checking")
            }
        }
    }

    /// Emit a call in a context that consumes every result. Returns one
    /// `CValue` per declared result.
    pub(crate) fn call_all(&mut self, e: &TExp) -> Vec<CValue> {
        match &e.kind {
            TExpKind::CallFunc { target, args, rets } => {
                self.emit_call_func(target, args, rets, e.line)
            }
            TExpKind::CallValue { callee, args, rets } => {
                self.emit_call_value(callee, args, rets, e.line)
            }
            _ => vec![self.exp(e)],
        }
    }

    // ─── Containers ──────────────────────────────────────────────────────

    fn emit_init_array(&mut self, e: &TExp, elems: &[TExp]) -> CValue {
        let tmp = self.new_tmp(&e.ty);
        self.out.line(&format!("{} = luaH_new(L);", tmp.expr));
        self.mirror(&e.ty, &tmp);
        if !elems.is_empty() {
            self.out
                .line(&format!("luaH_resize(L, {}, {}, 0);", tmp.expr, elems.len()));
        }
        let elem_ty = match &e.ty {
            Type::Array(elem) => elem.as_ref().clone(),
            _ => unreachable!("array initializer with non-array type"),
        };
        for (i, elem) in elems.iter().enumerate() {
            let value = self.exp(elem);
            let dst = format!("(&{}->array[{}])", tmp.expr, i);
            let store = set_value(&elem_ty, &dst, &value.expr);
            self.out.line(&store);
            if elem_ty.is_gc() {
                self.out
                    .line(&format!("luaC_barrierback(L, {}, {});", tmp.expr, dst));
            }
        }
        tmp
    }

    /// Record construction, shared by `{x = ...}` initializers and
    /// `R.new(...)`: a table with one array slot per field, tagged with
    /// the record's metatable.
    fn emit_record_new(&mut self, e: &TExp, fqtn: &str, fields: &[TExp]) -> CValue {
        let table = self.new_tmp(&Type::array(Type::Value));
        self.out.line(&format!("{} = luaH_new(L);", table.expr));
        self.mirror(&Type::array(Type::Value), &table);
        if !fields.is_empty() {
            self.out.line(&format!(
                "luaH_resize(L, {}, {}, 0);",
                table.expr,
                fields.len()
            ));
        }
        for (i, field) in fields.iter().enumerate() {
            let value = self.exp(field);
            let dst = format!("(&{}->array[{}])", table.expr, i);
            let store = set_value(&field.ty, &dst, &value.expr);
            self.out.line(&store);
            if field.ty.is_gc() {
                self.out
                    .line(&format!("luaC_barrierback(L, {}, {});", table.expr, dst));
            }
        }
        let mt = self.typemt_expr(fqtn);
        self.out
            .line(&format!("{}->metatable = {};", table.expr, mt));
        let boxed = self.new_tmp(&e.ty);
        self.out
            .line(&format!("sethvalue(L, &{}, {});", boxed.expr, table.expr));
        self.mirror(&e.ty, &boxed);
        boxed
    }

    fn emit_array_get(&mut self, e: &TExp, array: &TExp, index: &TExp) -> CValue {
        let arr = self.exp(array);
        let idx = self.exp(index);
        self.tvalue_probe += 1;
        let probe = format!("_v_{}", self.tvalue_probe);
        self.out.line(&format!(
            "const TValue *{} = luaH_getint({}, {});",
            probe, arr.expr, idx.expr
        ));
        match &e.ty {
            // option and value elements read nil slots as nil
            Type::Value | Type::Option(_) => {
                let tmp = self.new_tmp(&e.ty);
                self.out
                    .line(&format!("setobj2s(L, &{}, {});", tmp.expr, probe));
                self.mirror(&e.ty, &tmp);
                tmp
            }
            ty => self.extract_checked(&ty.clone(), &probe, e.line),
        }
    }

    fn emit_field_get(
        &mut self,
        e: &TExp,
        object: &TExp,
        _fqtn: &str,
        field_index: usize,
    ) -> CValue {
        let obj = self.exp(object);
        self.tvalue_probe += 1;
        let probe = format!("_v_{}", self.tvalue_probe);
        // fields live in the array part, in declaration order, and are
        // always initialized, so no tag check is needed
        self.out.line(&format!(
            "const TValue *{} = &hvalue(&{})->array[{}];",
            probe, obj.expr, field_index
        ));
        let tmp = self.new_tmp(&e.ty);
        let read = read_value(&e.ty, &probe);
        self.out.line(&format!("{} = {};", tmp.expr, read));
        self.mirror(&e.ty, &tmp);
        tmp
    }

    // ─── Operators ───────────────────────────────────────────────────────

    fn emit_unop(&mut self, e: &TExp, op: UnOp, operand: &TExp) -> CValue {
        let value = self.exp(operand);
        let expr = match (op, &operand.ty) {
            (UnOp::Neg, Type::Integer) => {
                format!("((lua_Integer)(0u - l_castS2U({})))", value.expr)
            }
            (UnOp::Neg, _) => format!("(-{})", value.expr),
            (UnOp::Not, _) => format!("(!{})", value.expr),
            (UnOp::Len, Type::String) => format!("((lua_Integer)tsslen({}))", value.expr),
            (UnOp::Len, _) => format!("((lua_Integer)luaH_getn({}))", value.expr),
            (UnOp::BitNot, _) => format!("((lua_Integer)(~l_castS2U({})))", value.expr),
        };
        let tmp = self.new_tmp(&e.ty);
        self.out.line(&format!("{} = {};", tmp.expr, expr));
        tmp
    }

    fn emit_binop(&mut self, e: &TExp, op: BinOp, lhs: &TExp, rhs: &TExp) -> CValue {
        if matches!(op, BinOp::And | BinOp::Or) {
            return self.emit_logical(e, op, lhs, rhs);
        }
        let l = self.exp(lhs);
        let r = self.exp(rhs);
        let a = &l.expr;
        let b = &r.expr;
        let expr = match (&lhs.ty, op) {
            (Type::Integer, BinOp::Add) => {
                format!("((lua_Integer)(l_castS2U({}) + l_castS2U({})))", a, b)
            }
            (Type::Integer, BinOp::Sub) => {
                format!("((lua_Integer)(l_castS2U({}) - l_castS2U({})))", a, b)
            }
            (Type::Integer, BinOp::Mul) => {
                format!("((lua_Integer)(l_castS2U({}) * l_castS2U({})))", a, b)
            }
            (Type::Integer, BinOp::IntDiv) => format!("luaV_div(L, {}, {})", a, b),
            (Type::Integer, BinOp::Mod) => format!("luaV_mod(L, {}, {})", a, b),
            (Type::Integer, BinOp::Shl) => format!("luaV_shiftl({}, {})", a, b),
            (Type::Integer, BinOp::Shr) => {
                format!("luaV_shiftl({}, (lua_Integer)(0u - l_castS2U({})))", a, b)
            }
            (Type::Integer, BinOp::BitOr) => {
                format!("((lua_Integer)(l_castS2U({}) | l_castS2U({})))", a, b)
            }
            (Type::Integer, BinOp::BitXor) => {
                format!("((lua_Integer)(l_castS2U({}) ^ l_castS2U({})))", a, b)
            }
            (Type::Integer, BinOp::BitAnd) => {
                format!("((lua_Integer)(l_castS2U({}) & l_castS2U({})))", a, b)
            }
            (Type::Float, BinOp::Add) => format!("({} + {})", a, b),
            (Type::Float, BinOp::Sub) => format!("({} - {})", a, b),
            (Type::Float, BinOp::Mul) => format!("({} * {})", a, b),
            (Type::Float, BinOp::Div) => format!("({} / {})", a, b),
            (Type::Float, BinOp::IntDiv) => format!("(l_mathop(floor)({} / {}))", a, b),
            (Type::Float, BinOp::Mod) => format!("_titan_fltmod({}, {})", a, b),
            (Type::Float, BinOp::Pow) => format!("(l_mathop(pow)({}, {}))", a, b),
            (ty, cmp) if cmp.is_comparison() => self.comparison(ty, cmp, a, b),
            (ty, op) => unreachable!("operator '{}' on {}", op, ty),
        };
        let tmp = self.new_tmp(&e.ty);
        self.out.line(&format!("{} = {};", tmp.expr, expr));
        tmp
    }

    fn comparison(&mut self, ty: &Type, op: BinOp, a: &str, b: &str) -> String {
        let c_op = match op {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            _ => unreachable!(),
        };
        match ty {
            Type::String => match op {
                BinOp::Eq => format!("_titan_streq({}, {})", a, b),
                BinOp::Ne => format!("(!_titan_streq({}, {}))", a, b),
                _ => format!("(_titan_strcmp({}, {}) {} 0)", a, b, c_op),
            },
            Type::Value | Type::Option(_) | Type::Nominal(_) => match op {
                BinOp::Eq => format!("luaV_equalobj(L, &{}, &{})", a, b),
                BinOp::Ne => format!("(!luaV_equalobj(L, &{}, &{}))", a, b),
                _ => unreachable!("ordering on boxed values"),
            },
            Type::Nil => match op {
                BinOp::Eq => "1".to_string(),
                _ => "0".to_string(),
            },
            _ => format!("({} {} {})", a, c_op, b),
        }
    }

    /// `and`/`or` with Lua short-circuiting. For types that are never
    /// falsy the dead branch is not evaluated at all.
    fn emit_logical(&mut self, e: &TExp, op: BinOp, lhs: &TExp, rhs: &TExp) -> CValue {
        let never_falsy = !matches!(
            lhs.ty,
            Type::Boolean | Type::Nil | Type::Value | Type::Option(_) | Type::Invalid
        );
        if never_falsy {
            // lhs is always truthy: `and` yields rhs, `or` skips it
            let l = self.exp(lhs);
            return match op {
                BinOp::And => self.exp(rhs),
                _ => l,
            };
        }
        let result = self.new_tmp(&e.ty);
        let l = self.exp(lhs);
        let assign_l = self.assign_tmp(&e.ty, &result, &l.expr);
        self.out.line(&assign_l);
        self.mirror(&e.ty, &result);
        let truthy = match &e.ty {
            Type::Boolean => result.expr.clone(),
            _ => format!("(!l_isfalse(&{}))", result.expr),
        };
        let guard = match op {
            BinOp::And => truthy,
            _ => format!("(!{})", truthy),
        };
        self.out.open(&format!("if ({}) {{", guard));
        let r = self.exp(rhs);
        let assign_r = self.assign_tmp(&e.ty, &result, &r.expr);
        self.out.line(&assign_r);
        self.mirror(&e.ty, &result);
        self.out.close("}");
        result
    }

    fn assign_tmp(&self, _ty: &Type, dst: &CValue, src: &str) -> String {
        format!("{} = {};", dst.expr, src)
    }

    fn emit_concat(&mut self, items: &[TExp]) -> CValue {
        let parts: Vec<CValue> = items.iter().map(|item| self.exp(item)).collect();
        self.tvalue_probe += 1;
        let array = format!("_parts_{}", self.tvalue_probe);
        let list: Vec<&str> = parts.iter().map(|p| p.expr.as_str()).collect();
        self.out.line(&format!(
            "TString *{}[{}] = {{{}}};",
            array,
            parts.len(),
            list.join(", ")
        ));
        let tmp = self.new_tmp(&Type::String);
        self.out.line(&format!(
            "{} = _titan_concat(L, {}, {});",
            tmp.expr,
            parts.len(),
            array
        ));
        self.mirror(&Type::String, &tmp);
        tmp
    }

    // ─── Calls ───────────────────────────────────────────────────────────

    fn emit_call_func(
        &mut self,
        target: &CallTarget,
        args: &[TExp],
        rets: &[Type],
        line: u32,
    ) -> Vec<CValue> {
        if let CallTarget::RecordNew(fqtn) = target {
            let e = TExp {
                kind: TExpKind::Nil,
                ty: Type::Nominal(fqtn.clone()),
                line,
            };
            return vec![self.emit_record_new(&e, fqtn, args)];
        }

        let mut arg_values = Vec::new();
        for arg in args {
            // a multi-valued call in the last position spreads
            if std::ptr::eq(arg, args.last().unwrap()) && arg.call_rets().is_some_and(|r| r.len() != 1)
            {
                arg_values.extend(self.call_all(arg));
            } else {
                arg_values.push(self.exp(arg));
            }
        }

        let (callee, globals) = match target {
            CallTarget::ModuleFunc(index) => {
                let name = self.module.values[*index].name().to_string();
                (
                    native_name(&self.module.name, &name),
                    self.globals.clone(),
                )
            }
            CallTarget::Imported { import, member } => {
                let module = &self.module.imports[*import].module_name;
                (
                    format!("(*{})", native_name(module, member)),
                    format!("(*{}_globals_ref)", mangle(module)),
                )
            }
            CallTarget::RecordNew(_) => unreachable!(),
        };

        // results: the first is the C return value, the rest come back
        // through out-parameters
        let ret_tmps: Vec<CValue> = rets.iter().map(|ty| self.new_tmp(ty)).collect();
        let mut call_args: Vec<String> = vec!["L".to_string(), globals];
        call_args.extend(arg_values.iter().map(|v| v.expr.clone()));
        for ret in ret_tmps.iter().skip(1) {
            call_args.push(format!("&{}", ret.expr));
        }
        match ret_tmps.first() {
            Some(first) => self.out.line(&format!(
                "{} = {}({});",
                first.expr,
                callee,
                call_args.join(", ")
            )),
            None => self
                .out
                .line(&format!("{}({});", callee, call_args.join(", "))),
        }
        for (ret, ty) in ret_tmps.iter().zip(rets.iter()) {
            self.mirror(ty, ret);
        }
        ret_tmps
    }

    fn emit_call_value(
        &mut self,
        callee: &TExp,
        args: &[TExp],
        rets: &[Type],
        line: u32,
    ) -> Vec<CValue> {
        let closure = self.exp(callee);
        let mut arg_values = Vec::new();
        for arg in args {
            if std::ptr::eq(arg, args.last().unwrap()) && arg.call_rets().is_some_and(|r| r.len() != 1)
            {
                let rets = arg.call_rets().unwrap().to_vec();
                let values = self.call_all(arg);
                arg_values.extend(values.into_iter().zip(rets));
            } else {
                arg_values.push((self.exp(arg), arg.ty.clone()));
            }
        }

        self.out
            .line(&format!("lua_checkstack(L, {});", arg_values.len() + 1));
        self.out
            .line(&format!("setclCvalue(L, L->top, {});", closure.expr));
        self.out.line("L->top++;");
        for (value, ty) in &arg_values {
            let store = set_value(ty, "(L->top)", &value.expr);
            self.out.line(&store);
            self.out.line("L->top++;");
        }
        self.out.line(&format!(
            "lua_call(L, {}, {});",
            arg_values.len(),
            rets.len()
        ));

        let mut ret_tmps = Vec::new();
        for (i, ty) in rets.iter().enumerate() {
            self.tvalue_probe += 1;
            let probe = format!("_v_{}", self.tvalue_probe);
            self.out.line(&format!(
                "const TValue *{} = L->top - {};",
                probe,
                rets.len() - i
            ));
            ret_tmps.push(self.extract_checked(ty, &probe, line));
        }
        if !rets.is_empty() {
            self.out.line(&format!("L->top -= {};", rets.len()));
        }
        ret_tmps
    }

    // ─── Coercions ───────────────────────────────────────────────────────

    fn emit_coerce(&mut self, e: &TExp, kind: CoerceKind, value: &TExp) -> CValue {
        let from = self.exp(value);
        match kind {
            CoerceKind::IntToFloat => CValue::pure(format!("((lua_Number)({}))", from.expr)),
            CoerceKind::FloatToInt => {
                let tmp = self.new_tmp(&Type::Integer);
                self.tvalue_probe += 1;
                let floored = format!("_f_{}", self.tvalue_probe);
                self.out.line(&format!(
                    "lua_Number {} = l_mathop(floor)({});",
                    floored, from.expr
                ));
                self.out.open(&format!(
                    "if (TITAN_UNLIKELY({} != {} || !lua_numbertointeger({}, &{}))) {{",
                    floored, from.expr, floored, tmp.expr
                ));
                self.out.line(&format!(
                    "luaL_error(L, \"number has no integer representation at line %d\", {});",
                    e.line
                ));
                self.out.close("}");
                tmp
            }
            CoerceKind::ToValue | CoerceKind::ToOption => {
                let tmp = self.new_tmp(&e.ty);
                let store = set_value(&value.ty, &format!("(&{})", tmp.expr), &from.expr);
                self.out.line(&store);
                self.mirror(&e.ty, &tmp);
                tmp
            }
            CoerceKind::FromValue => {
                let tv = format!("(&{})", from.expr);
                self.extract_checked(&e.ty.clone(), &tv, e.line)
            }
            CoerceKind::Truthiness => match &value.ty {
                Type::Nil => CValue::pure("0"),
                Type::Value | Type::Option(_) => {
                    CValue::pure(format!("(!l_isfalse(&{}))", from.expr))
                }
                Type::Boolean => from,
                _ => CValue::pure("1"),
            },
            CoerceKind::IntToString => {
                let tmp = self.new_tmp(&Type::String);
                self.out
                    .line(&format!("{} = _integer2str(L, {});", tmp.expr, from.expr));
                self.mirror(&Type::String, &tmp);
                tmp
            }
            CoerceKind::FloatToString => {
                let tmp = self.new_tmp(&Type::String);
                self.out
                    .line(&format!("{} = _float2str(L, {});", tmp.expr, from.expr));
                self.mirror(&Type::String, &tmp);
                tmp
            }
            CoerceKind::FromOption => {
                self.out.open(&format!(
                    "if (TITAN_UNLIKELY(ttisnil(&{}))) {{",
                    from.expr
                ));
                self.out.line(&format!(
                    "luaL_error(L, \"option value is nil at line %d\", {});",
                    e.line
                ));
                self.out.close("}");
                let tv = format!("(&{})", from.expr);
                self.extract_checked(&e.ty.clone(), &tv, e.line)
            }
        }
    }

    /// Emit a constant top-level initializer into a globals-table slot.
    /// Runs in module-init context, where there are no reserved stack
    /// slots: intermediate containers stay anchored on the Lua stack
    /// until the final store.
    pub(crate) fn emit_const_into_slot(&mut self, exp: &TExp, slot: usize) {
        self.emit_const_push(exp);
        self.out.line(&format!(
            "setobj2t(L, &{}->array[{}], L->top - 1);",
            self.globals, slot
        ));
        self.out.line("L->top--;");
    }

    fn emit_const_push(&mut self, exp: &TExp) {
        match &exp.kind {
            TExpKind::Nil => self.out.line("lua_pushnil(L);"),
            TExpKind::Bool(b) => self
                .out
                .line(&format!("lua_pushboolean(L, {});", *b as i32)),
            TExpKind::Integer(n) => self
                .out
                .line(&format!("lua_pushinteger(L, (lua_Integer){});", n)),
            TExpKind::Float(x) => self.out.line(&format!(
                "lua_pushnumber(L, (lua_Number){});",
                float_literal(*x)
            )),
            TExpKind::String(bytes) => self.out.line(&format!(
                "lua_pushlstring(L, {}, {});",
                c_string_literal(bytes),
                bytes.len()
            )),
            TExpKind::Coerce { kind, value } => match (kind, &value.kind) {
                (CoerceKind::IntToFloat, TExpKind::Integer(n)) => {
                    self.out
                        .line(&format!("lua_pushnumber(L, (lua_Number){});", n));
                }
                (CoerceKind::FloatToInt, TExpKind::Float(x)) if x.fract() == 0.0 => {
                    self.out
                        .line(&format!("lua_pushinteger(L, (lua_Integer){});", *x as i64));
                }
                (CoerceKind::FloatToInt, _) => {
                    self.out.line(&format!(
                        "luaL_error(L, \"number has no integer representation at line %d\", {});",
                        exp.line
                    ));
                    self.out.line("lua_pushinteger(L, 0);");
                }
                (CoerceKind::IntToString | CoerceKind::FloatToString, _) => {
                    self.emit_const_push(value);
                    self.out.line("lua_tostring(L, -1);");
                }
                (CoerceKind::Truthiness, inner) => {
                    let truthy = !matches!(inner, TExpKind::Nil | TExpKind::Bool(false));
                    self.out
                        .line(&format!("lua_pushboolean(L, {});", truthy as i32));
                }
                // boxing coercions do not change the representation
                _ => self.emit_const_push(value),
            },
            TExpKind::InitArray { elems } => {
                self.out
                    .line(&format!("lua_createtable(L, {}, 0);", elems.len()));
                for (i, elem) in elems.iter().enumerate() {
                    self.emit_const_push(elem);
                    self.out.line(&format!("lua_rawseti(L, -2, {});", i + 1));
                }
            }
            TExpKind::InitRecord { fqtn, fields } => {
                self.out
                    .line(&format!("lua_createtable(L, {}, 0);", fields.len()));
                for (i, field) in fields.iter().enumerate() {
                    self.emit_const_push(field);
                    self.out.line(&format!("lua_rawseti(L, -2, {});", i + 1));
                }
                let mt = self.typemt_expr(fqtn);
                self.out
                    .line(&format!("hvalue(L->top - 1)->metatable = {};", mt));
            }
            _ => unreachable!("non-constant initializer survived checking"),
        }
    }
}
