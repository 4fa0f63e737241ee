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

use ast::expr::{Expr, InitEntry, Var};
use ast::op::{BinOp, UnOp};
use ast::Spanned;

use super::{Binding, Checker};
use crate::hir::*;
use crate::types::{MemberType, Type};

impl Checker<'_> {
    /// Check an expression. Never fails: a failed node is annotated with
    /// `Type::Invalid` after recording a diagnostic, so downstream checks
    /// proceed.
    pub(crate) fn check_exp(&mut self, e: &Spanned<Expr>, hint: Option<&Type>) -> TExp {
        let line = self.line(&e.span);
        match &e.node {
            Expr::Nil => self.texp(TExpKind::Nil, Type::Nil, line),
            Expr::Bool(b) => self.texp(TExpKind::Bool(*b), Type::Boolean, line),
            Expr::Integer(n) => self.texp(TExpKind::Integer(*n), Type::Integer, line),
            Expr::Float(x) => self.texp(TExpKind::Float(*x), Type::Float, line),
            Expr::String(s) => self.texp(TExpKind::String(s.clone()), Type::String, line),
            Expr::InitList(entries) => self.check_init_list(entries, hint, &e.span, line),
            Expr::Var(v) => self.check_var_read(v, &e.span, line),
            Expr::Unop { op, operand } => self.check_unop(*op, operand, &e.span, line),
            Expr::Binop { op, lhs, rhs } => self.check_binop(*op, lhs, rhs, &e.span, line),
            Expr::Concat { items } => self.check_concat(items, line),
            Expr::Call { callee, args } => self.check_call(callee, args, &e.span, line),
            Expr::MethodCall { receiver, args, .. } => {
                let recv = self.check_exp(receiver, None);
                for arg in args {
                    self.check_exp(arg, None);
                }
                if recv.ty != Type::Invalid {
                    self.error(
                        format!("values of type {} have no methods", recv.ty),
                        e.span.clone(),
                    );
                }
                self.invalid(line)
            }
            Expr::Cast { value, to } => self.check_cast(value, to, &e.span, line),
            Expr::Paren(inner) => {
                let exp = self.check_exp(inner, hint);
                match exp.call_rets() {
                    Some(rets) => {
                        let ty = match rets.first() {
                            Some(first) => first.clone(),
                            None => {
                                self.error(
                                    "expression produces no value",
                                    inner.span.clone(),
                                );
                                Type::Invalid
                            }
                        };
                        self.texp(TExpKind::Adjust(Box::new(exp)), ty, line)
                    }
                    None => exp,
                }
            }
        }
    }

    pub(crate) fn texp(&self, kind: TExpKind, ty: Type, line: u32) -> TExp {
        TExp { kind, ty, line }
    }

    pub(crate) fn invalid(&self, line: u32) -> TExp {
        TExp {
            kind: TExpKind::Nil,
            ty: Type::Invalid,
            line,
        }
    }

    // ─── Coercions ───────────────────────────────────────────────────────

    /// Whether a type describes a first-class runtime value.
    fn is_first_class(ty: &Type) -> bool {
        !matches!(
            ty,
            Type::Module(_) | Type::Foreign(_) | Type::TypeOf(_)
        )
    }

    /// Reject expressions that name things rather than produce values
    /// (modules, record types, constructors, imported functions).
    pub(crate) fn ensure_first_class(&mut self, exp: &TExp, span: &Span) -> bool {
        let bad = matches!(
            exp.kind,
            TExpKind::ModuleRef(_) | TExpKind::RecordRef(_) | TExpKind::FuncRef(_)
        ) || !Self::is_first_class(&exp.ty);
        if bad && exp.ty != Type::Invalid {
            self.error(
                format!("{} cannot be used as a value", exp.ty),
                span.clone(),
            );
        }
        !bad
    }

    /// Insert the implicit coercion from `exp` to `target`, or report a
    /// type mismatch. The coder only ever sees the explicit `Coerce` node.
    pub(crate) fn coerce(&mut self, exp: TExp, target: &Type, span: &Span) -> TExp {
        if !self.ensure_first_class(&exp, span) {
            return exp;
        }
        if exp.ty == *target || exp.ty == Type::Invalid || *target == Type::Invalid {
            return exp;
        }
        let kind = match (&exp.ty, target) {
            (Type::Integer, Type::Float) => Some(CoerceKind::IntToFloat),
            (Type::Float, Type::Integer) => Some(CoerceKind::FloatToInt),
            // truthiness wins over checked extraction for `value -> boolean`
            (_, Type::Boolean) => Some(CoerceKind::Truthiness),
            (_, Type::Value) => Some(CoerceKind::ToValue),
            (Type::Value, _) if Self::is_first_class(target) => Some(CoerceKind::FromValue),
            (Type::Nil, Type::Option(_)) => Some(CoerceKind::ToOption),
            (ty, Type::Option(base)) if ty == base.as_ref() => Some(CoerceKind::ToOption),
            _ => None,
        };
        match kind {
            Some(kind) => self.wrap_coerce(exp, kind, target.clone()),
            None => {
                self.error(
                    format!("expected {} but found {}", target, exp.ty),
                    span.clone(),
                );
                self.invalid(exp.line)
            }
        }
    }

    fn wrap_coerce(&self, exp: TExp, kind: CoerceKind, ty: Type) -> TExp {
        let line = exp.line;
        TExp {
            kind: TExpKind::Coerce {
                kind,
                value: Box::new(exp),
            },
            ty,
            line,
        }
    }

    /// Coerce to boolean by truthiness (used by conditions and `not`).
    pub(crate) fn coerce_condition(&mut self, exp: TExp, span: &Span) -> TExp {
        if exp.ty == Type::Boolean || exp.ty == Type::Invalid {
            return exp;
        }
        if !self.ensure_first_class(&exp, span) {
            return exp;
        }
        self.wrap_coerce(exp, CoerceKind::Truthiness, Type::Boolean)
    }

    fn check_cast(
        &mut self,
        value: &Spanned<Expr>,
        to: &Spanned<ast::types::TypeAnnotation>,
        span: &Span,
        line: u32,
    ) -> TExp {
        let target = self.resolve_annotation(to);
        let exp = self.check_exp(value, Some(&target));
        if !self.ensure_first_class(&exp, span) {
            return exp;
        }
        if exp.ty == target || exp.ty == Type::Invalid || target == Type::Invalid {
            return exp;
        }
        let kind = match (&exp.ty, &target) {
            (Type::Integer, Type::Float) => Some(CoerceKind::IntToFloat),
            (Type::Float, Type::Integer) => Some(CoerceKind::FloatToInt),
            (_, Type::Value) => Some(CoerceKind::ToValue),
            (Type::Value, t) if Self::is_first_class(t) => Some(CoerceKind::FromValue),
            (_, Type::Boolean) => Some(CoerceKind::Truthiness),
            (Type::Integer, Type::String) => Some(CoerceKind::IntToString),
            (Type::Float, Type::String) => Some(CoerceKind::FloatToString),
            (Type::Nil, Type::Option(_)) => Some(CoerceKind::ToOption),
            (ty, Type::Option(base)) if ty == base.as_ref() => Some(CoerceKind::ToOption),
            (Type::Option(base), ty) if ty == base.as_ref() => Some(CoerceKind::FromOption),
            _ => None,
        };
        match kind {
            Some(kind) => self.wrap_coerce(exp, kind, target),
            None => {
                self.error(
                    format!("cannot cast {} to {}", exp.ty, target),
                    span.clone(),
                );
                self.invalid(line)
            }
        }
    }

    // ─── Variables ───────────────────────────────────────────────────────

    fn check_var_read(&mut self, v: &Var, span: &Span, line: u32) -> TExp {
        match v {
            Var::Name(name) => self.check_name(name, span, line),
            Var::Dot { object, field } => self.check_dot(object, field, span, line),
            Var::Bracket { array, index } => {
                let arr = self.check_exp(array, None);
                let idx = self.check_exp(index, None);
                let idx = self.coerce(idx, &Type::Integer, &index.span);
                match arr.ty.clone() {
                    Type::Array(elem) => self.texp(
                        TExpKind::ArrayGet {
                            array: Box::new(arr),
                            index: Box::new(idx),
                        },
                        *elem,
                        line,
                    ),
                    Type::Invalid => self.invalid(line),
                    other => {
                        self.error(format!("cannot index a {} value", other), span.clone());
                        self.invalid(line)
                    }
                }
            }
        }
    }

    fn check_name(&mut self, name: &str, span: &Span, line: u32) -> TExp {
        match self.symbols.find(name).cloned() {
            Some(Binding::Local(id)) => {
                let ty = self.locals[id].ty.clone();
                self.texp(TExpKind::Local(id), ty, line)
            }
            Some(Binding::TopLevel(index)) => {
                let ty = self.values[index].ty.clone();
                self.texp(TExpKind::Global { index }, ty, line)
            }
            Some(Binding::Import(index)) => {
                let ty = Type::Module(self.imports[index].module_name.clone());
                self.texp(TExpKind::ModuleRef(index), ty, line)
            }
            Some(Binding::Record(fqtn)) => {
                let ty = Type::TypeOf(fqtn.clone());
                self.texp(TExpKind::RecordRef(fqtn), ty, line)
            }
            Some(Binding::Foreign(index)) => {
                let ty = Type::Foreign(self.foreigns[index].0.clone());
                self.texp(TExpKind::ModuleRef(index), ty, line)
            }
            None => {
                self.error(format!("undefined name '{}'", name), span.clone());
                self.invalid(line)
            }
        }
    }

    fn check_dot(
        &mut self,
        object: &Spanned<Expr>,
        field: &str,
        span: &Span,
        line: u32,
    ) -> TExp {
        let obj = self.check_exp(object, None);
        match (&obj.kind, obj.ty.clone()) {
            (TExpKind::ModuleRef(import), Type::Module(_)) => {
                let import = *import;
                let member = self.imports[import].ty.member(field).cloned();
                match member {
                    Some(MemberType::Var(ty)) => self.texp(
                        TExpKind::ImportedVar {
                            import,
                            member: field.to_string(),
                        },
                        ty,
                        line,
                    ),
                    Some(MemberType::Func { params, rets }) => self.texp(
                        TExpKind::FuncRef(CallTarget::Imported {
                            import,
                            member: field.to_string(),
                        }),
                        Type::Function {
                            params,
                            rets,
                            vararg: false,
                        },
                        line,
                    ),
                    Some(MemberType::Record(record)) => {
                        let fqtn = record.fqtn.clone();
                        self.texp(TExpKind::RecordRef(fqtn.clone()), Type::TypeOf(fqtn), line)
                    }
                    None => {
                        self.error(
                            format!(
                                "module '{}' has no member '{}'",
                                self.imports[import].module_name, field
                            ),
                            span.clone(),
                        );
                        self.invalid(line)
                    }
                }
            }
            (_, Type::Foreign(name)) => {
                self.error(
                    format!("members of foreign module '{}' are not supported", name),
                    span.clone(),
                );
                self.invalid(line)
            }
            (TExpKind::RecordRef(fqtn), Type::TypeOf(_)) => {
                if field == "new" {
                    let record = self.session.registry.get(fqtn).cloned();
                    match record {
                        Some(record) => {
                            let params: Vec<Type> =
                                record.fields.iter().map(|(_, t)| t.clone()).collect();
                            // records of this module construct through the
                            // top-level `R.new` the parser synthesized;
                            // imported ones build inline against their
                            // loaded metatable
                            let own_prefix = format!("{}.", self.symbols.module_name);
                            let target = fqtn
                                .strip_prefix(&own_prefix)
                                .and_then(|local| self.value_index(&format!("{}.new", local)))
                                .map(CallTarget::ModuleFunc)
                                .unwrap_or_else(|| CallTarget::RecordNew(record.fqtn.clone()));
                            self.texp(
                                TExpKind::FuncRef(target),
                                Type::Function {
                                    params,
                                    rets: vec![Type::Nominal(record.fqtn)],
                                    vararg: false,
                                },
                                line,
                            )
                        }
                        None => self.invalid(line),
                    }
                } else {
                    self.error(
                        format!("record '{}' has no static member '{}'", fqtn, field),
                        span.clone(),
                    );
                    self.invalid(line)
                }
            }
            (_, Type::Nominal(fqtn)) => {
                let record = self.session.registry.get(&fqtn).cloned();
                match record {
                    Some(record) => match record.field_index(field) {
                        Some(field_index) => {
                            let ty = record.fields[field_index].1.clone();
                            self.texp(
                                TExpKind::FieldGet {
                                    object: Box::new(obj),
                                    fqtn,
                                    field_index,
                                },
                                ty,
                                line,
                            )
                        }
                        None => {
                            self.error(
                                format!("record '{}' has no field '{}'", fqtn, field),
                                span.clone(),
                            );
                            self.invalid(line)
                        }
                    },
                    None => {
                        self.error(format!("unknown record type '{}'", fqtn), span.clone());
                        self.invalid(line)
                    }
                }
            }
            (_, Type::Invalid) => self.invalid(line),
            (_, other) => {
                self.error(
                    format!("cannot access field '{}' of a {} value", field, other),
                    span.clone(),
                );
                self.invalid(line)
            }
        }
    }

    // ─── Operators ───────────────────────────────────────────────────────

    fn check_unop(
        &mut self,
        op: UnOp,
        operand: &Spanned<Expr>,
        span: &Span,
        line: u32,
    ) -> TExp {
        let exp = self.check_exp(operand, None);
        if exp.ty == Type::Invalid {
            return self.invalid(line);
        }
        let (exp, ty) = match op {
            UnOp::Neg => match exp.ty {
                Type::Integer => (exp, Type::Integer),
                Type::Float => (exp, Type::Float),
                ref other => {
                    self.error(format!("cannot negate a {} value", other), span.clone());
                    return self.invalid(line);
                }
            },
            UnOp::Not => {
                let exp = self.coerce_condition(exp, &operand.span);
                (exp, Type::Boolean)
            }
            UnOp::Len => match exp.ty {
                Type::Array(_) | Type::String => (exp, Type::Integer),
                ref other => {
                    self.error(
                        format!("'#' requires an array or string, found {}", other),
                        span.clone(),
                    );
                    return self.invalid(line);
                }
            },
            UnOp::BitNot => {
                let exp = self.integer_operand(exp, &operand.span);
                (exp, Type::Integer)
            }
        };
        self.texp(
            TExpKind::Unop {
                op,
                operand: Box::new(exp),
            },
            ty,
            line,
        )
    }

    /// A bitwise operand: integers pass, floats coerce (truncation checked
    /// at runtime), anything else is a diagnostic.
    fn integer_operand(&mut self, exp: TExp, span: &Span) -> TExp {
        match exp.ty {
            Type::Integer | Type::Invalid => exp,
            Type::Float => self.wrap_coerce(exp, CoerceKind::FloatToInt, Type::Integer),
            ref other => {
                self.error(
                    format!("bitwise operand must be an integer, found {}", other),
                    span.clone(),
                );
                self.invalid(exp.line)
            }
        }
    }

    fn float_operand(&mut self, exp: TExp, span: &Span) -> TExp {
        match exp.ty {
            Type::Float | Type::Invalid => exp,
            Type::Integer => self.wrap_coerce(exp, CoerceKind::IntToFloat, Type::Float),
            ref other => {
                self.error(
                    format!("arithmetic operand must be a number, found {}", other),
                    span.clone(),
                );
                self.invalid(exp.line)
            }
        }
    }

    fn check_binop(
        &mut self,
        op: BinOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        span: &Span,
        line: u32,
    ) -> TExp {
        let l = self.check_exp(lhs, None);
        let r = self.check_exp(rhs, None);
        if l.ty == Type::Invalid || r.ty == Type::Invalid {
            return self.invalid(line);
        }

        let (l, r, ty) = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Mod | BinOp::IntDiv => {
                match (&l.ty, &r.ty) {
                    (Type::Integer, Type::Integer) => (l, r, Type::Integer),
                    (Type::Integer | Type::Float, Type::Integer | Type::Float) => {
                        let l = self.float_operand(l, &lhs.span);
                        let r = self.float_operand(r, &rhs.span);
                        (l, r, Type::Float)
                    }
                    _ => {
                        self.error(
                            format!("invalid operands to '{}': {} and {}", op, l.ty, r.ty),
                            span.clone(),
                        );
                        return self.invalid(line);
                    }
                }
            }
            // `/` and `^` always work on floats
            BinOp::Div | BinOp::Pow => {
                let l = self.float_operand(l, &lhs.span);
                let r = self.float_operand(r, &rhs.span);
                (l, r, Type::Float)
            }
            BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd | BinOp::Shl | BinOp::Shr => {
                let l = self.integer_operand(l, &lhs.span);
                let r = self.integer_operand(r, &rhs.span);
                (l, r, Type::Integer)
            }
            BinOp::Eq | BinOp::Ne => {
                let (l, r) = self.equality_operands(l, r, span);
                (l, r, Type::Boolean)
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                let (l, r) = self.ordering_operands(op, l, r, span);
                (l, r, Type::Boolean)
            }
            BinOp::And | BinOp::Or => {
                let (l, r, ty) = self.logical_operands(op, l, r, span);
                (l, r, ty)
            }
        };

        self.texp(
            TExpKind::Binop {
                op,
                lhs: Box::new(l),
                rhs: Box::new(r),
            },
            ty,
            line,
        )
    }

    fn equality_operands(&mut self, l: TExp, r: TExp, span: &Span) -> (TExp, TExp) {
        if l.ty == r.ty {
            return (l, r);
        }
        match (&l.ty, &r.ty) {
            // integers promote when compared against floats
            (Type::Integer, Type::Float) => {
                let l = self.wrap_coerce(l, CoerceKind::IntToFloat, Type::Float);
                (l, r)
            }
            (Type::Float, Type::Integer) => {
                let r = self.wrap_coerce(r, CoerceKind::IntToFloat, Type::Float);
                (l, r)
            }
            (Type::Value, _) => {
                let r = self.wrap_coerce(r, CoerceKind::ToValue, Type::Value);
                (l, r)
            }
            (_, Type::Value) => {
                let l = self.wrap_coerce(l, CoerceKind::ToValue, Type::Value);
                (l, r)
            }
            (Type::Nil, Type::Option(_)) => {
                let ty = r.ty.clone();
                let l = self.wrap_coerce(l, CoerceKind::ToOption, ty);
                (l, r)
            }
            (Type::Option(_), Type::Nil) => {
                let ty = l.ty.clone();
                let r = self.wrap_coerce(r, CoerceKind::ToOption, ty);
                (l, r)
            }
            (base, Type::Option(opt)) if base == opt.as_ref() => {
                let ty = r.ty.clone();
                let l = self.wrap_coerce(l, CoerceKind::ToOption, ty);
                (l, r)
            }
            (Type::Option(opt), base) if base == opt.as_ref() => {
                let ty = l.ty.clone();
                let r = self.wrap_coerce(r, CoerceKind::ToOption, ty);
                (l, r)
            }
            _ => {
                self.error(
                    format!("cannot compare {} and {} for equality", l.ty, r.ty),
                    span.clone(),
                );
                (l, r)
            }
        }
    }

    fn ordering_operands(
        &mut self,
        op: BinOp,
        l: TExp,
        r: TExp,
        span: &Span,
    ) -> (TExp, TExp) {
        match (&l.ty, &r.ty) {
            (Type::Integer, Type::Integer)
            | (Type::Float, Type::Float)
            | (Type::String, Type::String) => (l, r),
            (Type::Integer, Type::Float) => {
                let l = self.wrap_coerce(l, CoerceKind::IntToFloat, Type::Float);
                (l, r)
            }
            (Type::Float, Type::Integer) => {
                let r = self.wrap_coerce(r, CoerceKind::IntToFloat, Type::Float);
                (l, r)
            }
            _ => {
                self.error(
                    format!("invalid operands to '{}': {} and {}", op, l.ty, r.ty),
                    span.clone(),
                );
                (l, r)
            }
        }
    }

    /// `and`/`or` keep Lua's short-circuit semantics; the result type is
    /// the operands' common type.
    fn logical_operands(
        &mut self,
        op: BinOp,
        l: TExp,
        r: TExp,
        span: &Span,
    ) -> (TExp, TExp, Type) {
        if l.ty == r.ty {
            let ty = l.ty.clone();
            return (l, r, ty);
        }
        if l.ty == Type::Boolean || r.ty == Type::Boolean {
            let lspan = span.clone();
            let l = self.coerce_condition(l, &lspan);
            let r = self.coerce_condition(r, span);
            return (l, r, Type::Boolean);
        }
        if l.ty == Type::Value || r.ty == Type::Value {
            let l = self.coerce(l, &Type::Value, span);
            let r = self.coerce(r, &Type::Value, span);
            return (l, r, Type::Value);
        }
        self.error(
            format!("invalid operands to '{}': {} and {}", op, l.ty, r.ty),
            span.clone(),
        );
        (l, r, Type::Invalid)
    }

    fn check_concat(&mut self, items: &[Spanned<Expr>], line: u32) -> TExp {
        let mut parts = Vec::new();
        for item in items {
            let exp = self.check_exp(item, None);
            let exp = match exp.ty {
                Type::String | Type::Invalid => exp,
                Type::Integer => self.wrap_coerce(exp, CoerceKind::IntToString, Type::String),
                Type::Float => self.wrap_coerce(exp, CoerceKind::FloatToString, Type::String),
                ref other => {
                    self.error(
                        format!("cannot concatenate a {} value", other),
                        item.span.clone(),
                    );
                    self.invalid(exp.line)
                }
            };
            parts.push(exp);
        }
        self.texp(TExpKind::Concat { items: parts }, Type::String, line)
    }

    // ─── Initializer lists ───────────────────────────────────────────────

    fn check_init_list(
        &mut self,
        entries: &[InitEntry],
        hint: Option<&Type>,
        span: &Span,
        line: u32,
    ) -> TExp {
        match hint {
            Some(Type::Array(elem)) => {
                let elem = elem.as_ref().clone();
                let mut elems = Vec::new();
                for entry in entries {
                    match entry {
                        InitEntry::Positional(e) => {
                            let exp = self.check_exp(e, Some(&elem));
                            elems.push(self.coerce(exp, &elem, &e.span));
                        }
                        InitEntry::Named { name, span, .. } => {
                            self.error(
                                format!("named field '{}' in an array initializer", name),
                                span.clone(),
                            );
                        }
                    }
                }
                self.texp(TExpKind::InitArray { elems }, Type::array(elem), line)
            }
            Some(Type::Nominal(fqtn)) => self.check_record_init(entries, fqtn, span, line),
            Some(Type::Invalid) => self.invalid(line),
            _ => {
                self.error(
                    "missing an array or record type hint for the initializer list",
                    span.clone(),
                );
                self.invalid(line)
            }
        }
    }

    fn check_record_init(
        &mut self,
        entries: &[InitEntry],
        fqtn: &str,
        span: &Span,
        line: u32,
    ) -> TExp {
        let Some(record) = self.session.registry.get(fqtn).cloned() else {
            self.error(format!("unknown record type '{}'", fqtn), span.clone());
            return self.invalid(line);
        };
        let mut provided: Vec<Option<TExp>> = record.fields.iter().map(|_| None).collect();
        for entry in entries {
            match entry {
                InitEntry::Positional(e) => {
                    self.error(
                        "record initializers take named fields only",
                        e.span.clone(),
                    );
                }
                InitEntry::Named { name, value, span } => {
                    match record.field_index(name) {
                        Some(index) => {
                            if provided[index].is_some() {
                                self.error(
                                    format!("duplicate field '{}' in record initializer", name),
                                    span.clone(),
                                );
                                continue;
                            }
                            let field_ty = record.fields[index].1.clone();
                            let exp = self.check_exp(value, Some(&field_ty));
                            provided[index] = Some(self.coerce(exp, &field_ty, &value.span));
                        }
                        None => {
                            self.error(
                                format!("record '{}' has no field '{}'", fqtn, name),
                                span.clone(),
                            );
                        }
                    }
                }
            }
        }
        let mut fields = Vec::new();
        for (index, slot) in provided.into_iter().enumerate() {
            match slot {
                Some(exp) => fields.push(exp),
                None => {
                    self.error(
                        format!(
                            "missing field '{}' in initializer of '{}'",
                            record.fields[index].0, fqtn
                        ),
                        span.clone(),
                    );
                    fields.push(self.invalid(line));
                }
            }
        }
        self.texp(
            TExpKind::InitRecord {
                fqtn: fqtn.to_string(),
                fields,
            },
            Type::Nominal(fqtn.to_string()),
            line,
        )
    }

    // ─── Calls ───────────────────────────────────────────────────────────

    fn check_call(
        &mut self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: &Span,
        line: u32,
    ) -> TExp {
        let callee_exp = self.check_exp(callee, None);
        let (params, rets) = match &callee_exp.ty {
            Type::Function { params, rets, .. } => (params.clone(), rets.clone()),
            Type::Invalid => {
                for arg in args {
                    self.check_exp(arg, None);
                }
                return self.invalid(line);
            }
            other => {
                self.error(format!("cannot call a {} value", other), span.clone());
                for arg in args {
                    self.check_exp(arg, None);
                }
                return self.invalid(line);
            }
        };

        let targs = self.check_args(args, &params, span);
        let ty = rets.first().cloned().unwrap_or(Type::Nil);

        // a statically known target lowers to a direct native call
        let kind = match callee_exp.kind {
            TExpKind::FuncRef(target) => TExpKind::CallFunc {
                target,
                args: targs,
                rets: rets.clone(),
            },
            TExpKind::Global { index } if self.values[index].is_func => TExpKind::CallFunc {
                target: CallTarget::ModuleFunc(index),
                args: targs,
                rets: rets.clone(),
            },
            _ => TExpKind::CallValue {
                callee: Box::new(callee_exp),
                args: targs,
                rets: rets.clone(),
            },
        };
        self.texp(kind, ty, line)
    }

    /// Check and coerce a call's arguments, applying the adjustment rule:
    /// a multi-valued call in the last position spreads all its values;
    /// anywhere else it supplies exactly one.
    fn check_args(
        &mut self,
        args: &[Spanned<Expr>],
        params: &[Type],
        span: &Span,
    ) -> Vec<TExp> {
        let mut targs: Vec<TExp> = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            targs.push(self.check_exp(arg, params.get(i)));
        }

        // a single-result call in last position is an ordinary argument
        let spread = targs
            .last()
            .and_then(|last| last.call_rets())
            .filter(|rets| rets.len() != 1)
            .map(|rets| rets.to_vec());

        let effective = match &spread {
            Some(rets) if args.len() <= params.len() => args.len() - 1 + rets.len(),
            _ => args.len(),
        };
        if effective != params.len() {
            self.error(
                format!(
                    "function expects {} argument(s) but {} given",
                    params.len(),
                    effective
                ),
                span.clone(),
            );
        }

        let plain = match &spread {
            Some(_) => targs.len().saturating_sub(1),
            None => targs.len(),
        };
        let mut result = Vec::with_capacity(targs.len());
        for (i, targ) in targs.into_iter().enumerate() {
            if i < plain {
                match params.get(i) {
                    Some(param) => {
                        let arg_span = args[i].span.clone();
                        result.push(self.coerce(targ, param, &arg_span));
                    }
                    None => result.push(targ),
                }
            } else {
                // spread results are used as-is; they must match exactly
                if let Some(rets) = &spread {
                    for (j, ret) in rets.iter().enumerate() {
                        if let Some(param) = params.get(i + j) {
                            if ret != param && *ret != Type::Invalid && *param != Type::Invalid {
                                self.error(
                                    format!(
                                        "value {} of the spread call has type {} but {} expected",
                                        j + 1,
                                        ret,
                                        param
                                    ),
                                    args[i].span.clone(),
                                );
                            }
                        }
                    }
                }
                result.push(targ);
            }
        }
        result
    }
}
