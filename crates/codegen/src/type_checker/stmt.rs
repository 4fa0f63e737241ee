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

use logos::Span;

use ast::expr::{Expr, Var};
use ast::stmt::Stmt;
use ast::Spanned;

use super::{Binding, Checker};
use crate::hir::*;
use crate::types::Type;

impl Checker<'_> {
    pub(crate) fn check_stmt(&mut self, stmt: &Spanned<Stmt>) -> TStmt {
        match &stmt.node {
            Stmt::Do(body) => TStmt::Do(self.check_block(body)),

            Stmt::While { cond, body } => {
                let cond_exp = self.check_exp(cond, None);
                let cond_exp = self.coerce_condition(cond_exp, &cond.span);
                TStmt::While {
                    cond: cond_exp,
                    body: self.check_block(body),
                }
            }

            // the until condition sees the body's locals
            Stmt::Repeat { body, until } => {
                self.symbols.open_scope();
                let stmts = body.stmts.iter().map(|s| self.check_stmt(s)).collect();
                let until_exp = self.check_exp(until, None);
                let until_exp = self.coerce_condition(until_exp, &until.span);
                self.symbols.close_scope();
                TStmt::Repeat {
                    body: TBlock { stmts },
                    until: until_exp,
                }
            }

            Stmt::If { arms, else_body } => {
                let arms = arms
                    .iter()
                    .map(|(cond, body)| {
                        let cond_exp = self.check_exp(cond, None);
                        let cond_exp = self.coerce_condition(cond_exp, &cond.span);
                        (cond_exp, self.check_block(body))
                    })
                    .collect();
                let else_body = else_body.as_ref().map(|b| self.check_block(b));
                TStmt::If { arms, else_body }
            }

            Stmt::For {
                var,
                annotation,
                start,
                finish,
                step,
                body,
            } => self.check_for(var, annotation, start, finish, step, body, &stmt.span),

            Stmt::Decl {
                name,
                annotation,
                value,
            } => self.check_decl(name, annotation, value, &stmt.span),

            Stmt::Assign { targets, values } => self.check_assign(targets, values, &stmt.span),

            Stmt::Call(call) => {
                let exp = self.check_exp(call, None);
                TStmt::Call(exp)
            }

            Stmt::Return { values } => self.check_return(values, &stmt.span),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_for(
        &mut self,
        var: &str,
        annotation: &Option<Spanned<ast::types::TypeAnnotation>>,
        start: &Spanned<Expr>,
        finish: &Spanned<Expr>,
        step: &Option<Spanned<Expr>>,
        body: &ast::stmt::Block,
        span: &Span,
    ) -> TStmt {
        let start_exp = match annotation {
            Some(ann) => {
                let declared = self.resolve_annotation(ann);
                let exp = self.check_exp(start, Some(&declared));
                self.coerce(exp, &declared, &start.span)
            }
            None => self.check_exp(start, None),
        };
        let control_ty = match &start_exp.ty {
            Type::Integer | Type::Float => start_exp.ty.clone(),
            Type::Invalid => Type::Invalid,
            other => {
                self.error(
                    format!("'for' control variable must be a number, found {}", other),
                    span.clone(),
                );
                Type::Invalid
            }
        };

        let finish_exp = self.check_exp(finish, Some(&control_ty));
        let finish_exp = self.coerce(finish_exp, &control_ty, &finish.span);

        // a missing step becomes an explicit constant 1 of the control type
        let line = self.line(span);
        let step_exp = match step {
            Some(step) => {
                let exp = self.check_exp(step, Some(&control_ty));
                self.coerce(exp, &control_ty, &step.span)
            }
            None => match control_ty {
                Type::Float => self.texp(TExpKind::Float(1.0), Type::Float, line),
                _ => self.texp(TExpKind::Integer(1), Type::Integer, line),
            },
        };

        self.symbols.open_scope();
        let local = self.add_local(var, control_ty);
        self.symbols.add(var, Binding::Local(local));
        let stmts = body.stmts.iter().map(|s| self.check_stmt(s)).collect();
        self.symbols.close_scope();

        TStmt::NumFor {
            local,
            start: start_exp,
            finish: finish_exp,
            step: step_exp,
            body: TBlock { stmts },
        }
    }

    fn check_decl(
        &mut self,
        name: &str,
        annotation: &Option<Spanned<ast::types::TypeAnnotation>>,
        value: &Spanned<Expr>,
        span: &Span,
    ) -> TStmt {
        let (value_exp, ty) = match annotation {
            Some(ann) => {
                let declared = self.resolve_annotation(ann);
                let exp = self.check_exp(value, Some(&declared));
                let exp = self.coerce(exp, &declared, &value.span);
                (exp, declared)
            }
            None => {
                let exp = self.check_exp(value, None);
                self.ensure_first_class(&exp, &value.span);
                if exp.ty == Type::Nil {
                    self.error(
                        "'nil' initializer needs a type annotation",
                        value.span.clone(),
                    );
                }
                let ty = exp.ty.clone();
                (exp, ty)
            }
        };

        if self.symbols.find_dup(name).is_some() {
            self.error(format!("duplicate declaration of '{}'", name), span.clone());
        }
        let local = self.add_local(name, ty);
        self.symbols.add(name, Binding::Local(local));
        TStmt::Decl {
            local,
            value: value_exp,
        }
    }

    fn check_assign(
        &mut self,
        targets: &[Spanned<Var>],
        values: &[Spanned<Expr>],
        span: &Span,
    ) -> TStmt {
        let ttargets: Vec<Option<TTarget>> = targets
            .iter()
            .map(|t| self.check_target(t))
            .collect();

        let mut tvalues: Vec<TExp> = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let hint = ttargets
                .get(i)
                .and_then(|t| t.as_ref())
                .map(|t| self.target_type(t));
            tvalues.push(self.check_exp(value, hint.as_ref()));
        }

        let spread = tvalues
            .last()
            .and_then(|last| last.call_rets())
            .filter(|rets| rets.len() != 1)
            .map(|rets| rets.to_vec());
        let effective = match &spread {
            Some(rets) => values.len() - 1 + rets.len(),
            None => values.len(),
        };
        if effective != targets.len() {
            self.error(
                format!(
                    "wrong number of values in the assignment: {} target(s) but {} value(s)",
                    targets.len(),
                    effective
                ),
                span.clone(),
            );
        }

        let plain = match &spread {
            Some(_) => tvalues.len() - 1,
            None => tvalues.len(),
        };
        let mut coerced = Vec::with_capacity(tvalues.len());
        for (i, value_exp) in tvalues.into_iter().enumerate() {
            if i >= plain {
                // spread results must match their targets exactly
                if let (Some(rets), Some(_)) = (&spread, values.get(i)) {
                    for (j, ret) in rets.iter().enumerate() {
                        if let Some(Some(target)) = ttargets.get(i + j) {
                            let expected = self.target_type(target);
                            if *ret != expected
                                && *ret != Type::Invalid
                                && expected != Type::Invalid
                            {
                                self.error(
                                    format!(
                                        "value {} of the spread call has type {} but {} expected",
                                        j + 1,
                                        ret,
                                        expected
                                    ),
                                    values[i].span.clone(),
                                );
                            }
                        }
                    }
                }
                coerced.push(value_exp);
                continue;
            }
            match ttargets.get(i).and_then(|t| t.as_ref()) {
                // assigning nil into an array slot deletes it
                Some(TTarget::Array { .. }) if value_exp.ty == Type::Nil => {
                    coerced.push(value_exp);
                }
                Some(target) => {
                    let expected = self.target_type(target);
                    let value_span = values[i].span.clone();
                    coerced.push(self.coerce(value_exp, &expected, &value_span));
                }
                None => coerced.push(value_exp),
            }
        }

        TStmt::Assign {
            targets: ttargets.into_iter().flatten().collect(),
            values: coerced,
        }
    }

    fn target_type(&self, target: &TTarget) -> Type {
        match target {
            TTarget::Local(id) => self.locals[*id].ty.clone(),
            TTarget::Global { ty, .. } => ty.clone(),
            TTarget::Array { elem, .. } => elem.clone(),
            TTarget::Field { ty, .. } => ty.clone(),
        }
    }

    fn check_target(&mut self, target: &Spanned<Var>) -> Option<TTarget> {
        match &target.node {
            Var::Name(name) => match self.symbols.find(name).cloned() {
                Some(Binding::Local(id)) => Some(TTarget::Local(id)),
                Some(Binding::TopLevel(index)) => {
                    if self.values[index].is_func {
                        self.error(
                            format!(
                                "attempting to assign to toplevel constant function {}",
                                name
                            ),
                            target.span.clone(),
                        );
                        return None;
                    }
                    let ty = self.values[index].ty.clone();
                    Some(TTarget::Global { index, ty })
                }
                Some(Binding::Import(_) | Binding::Foreign(_)) => {
                    self.error(
                        format!("cannot assign to imported module '{}'", name),
                        target.span.clone(),
                    );
                    None
                }
                Some(Binding::Record(_)) => {
                    self.error(
                        format!("cannot assign to record type '{}'", name),
                        target.span.clone(),
                    );
                    None
                }
                None => {
                    self.error(format!("undefined name '{}'", name), target.span.clone());
                    None
                }
            },
            Var::Dot { object, field } => {
                let obj = self.check_exp(object, None);
                match obj.ty.clone() {
                    Type::Nominal(fqtn) => {
                        let record = self.session.registry.get(&fqtn).cloned();
                        match record.and_then(|r| {
                            r.field_index(field).map(|i| (i, r.fields[i].1.clone()))
                        }) {
                            Some((field_index, ty)) => Some(TTarget::Field {
                                object: obj,
                                fqtn,
                                field_index,
                                ty,
                            }),
                            None => {
                                self.error(
                                    format!("record '{}' has no field '{}'", fqtn, field),
                                    target.span.clone(),
                                );
                                None
                            }
                        }
                    }
                    Type::Module(name) => {
                        self.error(
                            format!("cannot assign to a member of imported module '{}'", name),
                            target.span.clone(),
                        );
                        None
                    }
                    Type::Invalid => None,
                    other => {
                        self.error(
                            format!("cannot assign to a field of a {} value", other),
                            target.span.clone(),
                        );
                        None
                    }
                }
            }
            Var::Bracket { array, index } => {
                let arr = self.check_exp(array, None);
                let idx = self.check_exp(index, None);
                let idx = self.coerce(idx, &Type::Integer, &index.span);
                match arr.ty.clone() {
                    Type::Array(elem) => Some(TTarget::Array {
                        array: arr,
                        index: idx,
                        elem: *elem,
                    }),
                    Type::Invalid => None,
                    other => {
                        self.error(
                            format!("cannot index a {} value", other),
                            target.span.clone(),
                        );
                        None
                    }
                }
            }
        }
    }

    fn check_return(&mut self, values: &[Spanned<Expr>], span: &Span) -> TStmt {
        let rets = self.current_rets.clone();
        let mut tvalues: Vec<TExp> = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            tvalues.push(self.check_exp(value, rets.get(i)));
        }

        let spread = tvalues
            .last()
            .and_then(|last| last.call_rets())
            .filter(|r| r.len() != 1)
            .map(|r| r.to_vec());
        let effective = match &spread {
            Some(call_rets) => values.len() - 1 + call_rets.len(),
            None => values.len(),
        };
        if effective != rets.len() {
            self.error(
                format!(
                    "wrong number of return values: expected {} but found {}",
                    rets.len(),
                    effective
                ),
                span.clone(),
            );
            return TStmt::Return(tvalues);
        }

        let plain = match &spread {
            Some(_) => tvalues.len() - 1,
            None => tvalues.len(),
        };
        let mut coerced = Vec::with_capacity(tvalues.len());
        for (i, value_exp) in tvalues.into_iter().enumerate() {
            if i < plain {
                let value_span = values[i].span.clone();
                coerced.push(self.coerce(value_exp, &rets[i], &value_span));
            } else {
                if let Some(call_rets) = &spread {
                    for (j, ret) in call_rets.iter().enumerate() {
                        if let Some(expected) = rets.get(i + j) {
                            if ret != expected
                                && *ret != Type::Invalid
                                && *expected != Type::Invalid
                            {
                                self.error(
                                    format!(
                                        "return value {} of the spread call has type {} but {} expected",
                                        i + j + 1,
                                        ret,
                                        expected
                                    ),
                                    values[i].span.clone(),
                                );
                            }
                        }
                    }
                }
                coerced.push(value_exp);
            }
        }
        TStmt::Return(coerced)
    }
}
