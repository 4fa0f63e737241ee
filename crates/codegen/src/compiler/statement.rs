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

use crate::compiler::functions::{set_value, CValue, FuncEmitter};
use crate::compiler::c_type;
use crate::hir::*;
use crate::types::Type;

impl FuncEmitter<'_> {
    pub(crate) fn block(&mut self, block: &TBlock) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &TStmt) {
        match stmt {
            TStmt::Do(body) => {
                self.out.open("{");
                self.block(body);
                self.out.close("}");
            }

            // the condition may build temporaries, so it re-evaluates
            // inside the loop with an explicit break
            TStmt::While { cond, body } => {
                self.out.open("for (;;) {");
                let c = self.exp(cond);
                self.out.line(&format!("if (!{}) break;", c.expr));
                self.block(body);
                self.out.close("}");
            }

            TStmt::Repeat { body, until } => {
                self.out.open("for (;;) {");
                self.block(body);
                let c = self.exp(until);
                self.out.line(&format!("if ({}) break;", c.expr));
                self.out.close("}");
            }

            TStmt::If { arms, else_body } => self.emit_if(arms, else_body),

            TStmt::NumFor {
                local,
                start,
                finish,
                step,
                body,
            } => self.emit_numfor(*local, start, finish, step, body),

            TStmt::Decl { local, value } => {
                let v = self.exp(value);
                let ty = value.ty.clone();
                let name = self.local_name(*local).to_string();
                self.out
                    .line(&format!("{}{} = {};", c_type(&ty), name, v.expr));
                if let Some(slot) = self.local_slot(*local) {
                    let store = set_value(&ty, &format!("({})", Self::slot_expr(slot)), &name);
                    self.out.line(&store);
                }
            }

            TStmt::Assign { targets, values } => self.emit_assign(targets, values),

            TStmt::Call(call) => {
                self.call_all(call);
            }

            TStmt::Return(values) => self.emit_return(values),
        }
    }

    fn emit_if(&mut self, arms: &[(TExp, TBlock)], else_body: &Option<TBlock>) {
        // conditions can emit statements, so elseif chains nest instead
        // of cascading with `else if`
        let mut depth = 0;
        for (i, (cond, body)) in arms.iter().enumerate() {
            if i > 0 {
                self.out.open("else {");
                depth += 1;
            }
            let c = self.exp(cond);
            self.out.open(&format!("if ({}) {{", c.expr));
            self.block(body);
            self.out.close("}");
        }
        if let Some(body) = else_body {
            self.out.open("else {");
            self.block(body);
            self.out.close("}");
        }
        for _ in 0..depth {
            self.out.close("}");
        }
    }

    fn emit_numfor(
        &mut self,
        local: LocalId,
        start: &TExp,
        finish: &TExp,
        step: &TExp,
        body: &TBlock,
    ) {
        let control_ty = start.ty.clone();
        let cty = c_type(&control_ty);
        let var = self.local_name(local).to_string();

        let s = self.exp(start);
        let f = self.exp(finish);
        self.tvalue_probe += 1;
        let limit = format!("_limit_{}", self.tvalue_probe);
        self.out
            .line(&format!("{}{} = {};", cty, limit, f.expr));

        // a constant step fixes the comparison direction at compile time
        let const_step = match &step.kind {
            TExpKind::Integer(n) => Some(*n >= 0),
            TExpKind::Float(x) => Some(*x >= 0.0),
            _ => None,
        };
        match const_step {
            Some(ascending) => {
                let step_value = self.exp(step);
                let cmp = if ascending { "<=" } else { ">=" };
                self.out.open(&format!(
                    "for ({}{} = {}; {} {} {}; {} += {}) {{",
                    cty, var, s.expr, var, cmp, limit, var, step_value.expr
                ));
            }
            None => {
                let step_value = self.exp(step);
                self.tvalue_probe += 1;
                let step_var = format!("_step_{}", self.tvalue_probe);
                self.out
                    .line(&format!("{}{} = {};", cty, step_var, step_value.expr));
                self.out.open(&format!(
                    "for ({}{} = {}; ({} >= 0) ? ({} <= {}) : ({} >= {}); {} += {}) {{",
                    cty, var, s.expr, step_var, var, limit, var, limit, var, step_var
                ));
            }
        }
        self.block(body);
        self.out.close("}");
    }

    fn emit_assign(&mut self, targets: &[TTarget], values: &[TExp]) {
        // evaluate target prefixes first, then all values, then store
        let prefixes: Vec<Option<(CValue, CValue)>> = targets
            .iter()
            .map(|target| match target {
                TTarget::Array { array, index, .. } => {
                    let t = self.exp(array);
                    let i = self.exp(index);
                    Some((t, i))
                }
                TTarget::Field { object, .. } => {
                    let o = self.exp(object);
                    Some((o.clone(), o))
                }
                _ => None,
            })
            .collect();

        let mut computed: Vec<(CValue, Type)> = Vec::with_capacity(targets.len());
        for (i, value) in values.iter().enumerate() {
            let spread = i + 1 == values.len() && value.call_rets().is_some_and(|r| r.len() != 1);
            if spread {
                let rets = value.call_rets().unwrap().to_vec();
                let results = self.call_all(value);
                computed.extend(results.into_iter().zip(rets));
            } else {
                computed.push((self.exp(value), value.ty.clone()));
            }
        }

        for ((target, prefix), (value, value_ty)) in
            targets.iter().zip(prefixes).zip(computed)
        {
            self.store_target(target, prefix, value, value_ty);
        }
    }

    fn store_target(
        &mut self,
        target: &TTarget,
        prefix: Option<(CValue, CValue)>,
        value: CValue,
        value_ty: Type,
    ) {
        match target {
            TTarget::Local(id) => {
                let ty = value_ty;
                self.store_local(*id, &ty, &value.expr);
            }
            TTarget::Global { index, ty } => {
                let slot = self.layout.value_slots[*index];
                self.tvalue_probe += 1;
                let g = format!("_g_{}", self.tvalue_probe);
                self.out.line(&format!(
                    "TValue *{} = &{}->array[{}];",
                    g, self.globals, slot
                ));
                let store = set_value(ty, &g, &value.expr);
                self.out.line(&store);
                if ty.is_gc() {
                    self.out.line(&format!(
                        "luaC_barrierback(L, {}, {});",
                        self.globals, g
                    ));
                }
            }
            TTarget::Array { elem, .. } => {
                let (table, index) = prefix.expect("array target prefix");
                self.tvalue_probe += 1;
                let tv = format!("_tv_{}", self.tvalue_probe);
                if value_ty == Type::Nil {
                    // storing nil deletes the slot
                    self.out.line(&format!("TValue {};", tv));
                    self.out.line(&format!("setnilvalue(&{});", tv));
                } else {
                    self.out.line(&format!("TValue {};", tv));
                    let store = set_value(elem, &format!("(&{})", tv), &value.expr);
                    self.out.line(&store);
                }
                self.out.line(&format!(
                    "_titan_setarr(L, {}, {}, &{});",
                    table.expr, index.expr, tv
                ));
            }
            TTarget::Field {
                field_index, ty, ..
            } => {
                let (object, _) = prefix.expect("field target prefix");
                self.tvalue_probe += 1;
                let rt = format!("_rt_{}", self.tvalue_probe);
                self.out.line(&format!(
                    "Table *{} = hvalue(&{});",
                    rt, object.expr
                ));
                self.tvalue_probe += 1;
                let fslot = format!("_f_{}", self.tvalue_probe);
                self.out.line(&format!(
                    "TValue *{} = &{}->array[{}];",
                    fslot, rt, field_index
                ));
                let store = set_value(ty, &fslot, &value.expr);
                self.out.line(&store);
                if ty.is_gc() {
                    self.out
                        .line(&format!("luaC_barrierback(L, {}, {});", rt, fslot));
                }
            }
        }
    }

    fn emit_return(&mut self, values: &[TExp]) {
        let mut results: Vec<CValue> = Vec::new();
        for (i, value) in values.iter().enumerate() {
            let spread = i + 1 == values.len() && value.call_rets().is_some_and(|r| r.len() != 1);
            if spread {
                results.extend(self.call_all(value));
            } else {
                results.push(self.exp(value));
            }
        }
        for (i, result) in results.iter().enumerate().skip(1) {
            self.out
                .line(&format!("*_outparam_{} = {};", i + 1, result.expr));
        }
        self.out.line("L->top = _base;");
        match results.first() {
            Some(first) => self.out.line(&format!("return {};", first.expr)),
            None => self.out.line("return 0;"),
        }
    }
}
