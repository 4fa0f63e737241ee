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

//! Static type checker: resolves names, enforces the coercion and operator
//! rules, and lowers the parsed AST into the typed module of [`crate::hir`].
//!
//! Two passes: the first collects every top-level declaration and its type
//! (so bodies can reference later declarations), the second checks bodies
//! and module-variable initializers. Errors are collected rather than
//! fatal; failed expressions continue with `Type::Invalid` so one run
//! surfaces as many diagnostics as possible.

mod exp;
mod stmt;

use logos::Span;
use std::fmt;

use ast::expr::Expr;
use ast::loc;
use ast::stmt::Block;
use ast::types::TypeAnnotation;
use ast::{FuncDecl, Program, Spanned, TopLevel, VarDecl};

use crate::hir::*;
use crate::loader::Loader;
use crate::symbols::SymbolTable;
use crate::types::{MemberType, ModuleType, RecordType, Type};
use crate::Session;

/// A type error with a source span for precise reporting.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub message: String,
    pub span: Span,
}

impl TypeError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type error: {}", self.message)
    }
}

impl std::error::Error for TypeError {}

/// Check a whole module. Returns the typed module, or every diagnostic
/// collected; a module with any diagnostic is never emitted.
pub fn check_module(
    module_name: &str,
    source: &str,
    program: &Program,
    session: &mut Session,
    loader: &mut dyn Loader,
) -> Result<TModule, Vec<TypeError>> {
    let mut checker = Checker {
        source,
        session,
        loader,
        errors: Vec::new(),
        symbols: SymbolTable::new(module_name),
        imports: Vec::new(),
        foreigns: Vec::new(),
        records: Vec::new(),
        values: Vec::new(),
        locals: Vec::new(),
        current_rets: Vec::new(),
    };
    checker.collect_declarations(program);
    let values = checker.check_bodies(program);
    let module_type = checker.module_type();

    if checker.errors.is_empty() {
        Ok(TModule {
            name: module_name.to_string(),
            imports: checker.imports,
            foreigns: checker.foreigns,
            records: checker.records,
            values,
            module_type,
        })
    } else {
        Err(checker.errors)
    }
}

/// What a name in scope refers to.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Local(LocalId),
    /// Index into the module's top-level values.
    TopLevel(usize),
    /// Index into the module's imports.
    Import(usize),
    /// A record declared in this module, by fully qualified name.
    Record(String),
    /// Index into the module's foreign imports.
    Foreign(usize),
}

/// Signature of a top-level value, collected in the first pass.
pub(crate) struct ValueSig {
    pub name: String,
    pub ty: Type,
    pub exported: bool,
    pub is_func: bool,
}

pub(crate) struct Checker<'a> {
    pub(crate) source: &'a str,
    pub(crate) session: &'a mut Session,
    pub(crate) loader: &'a mut dyn Loader,
    pub(crate) errors: Vec<TypeError>,
    pub(crate) symbols: SymbolTable<Binding>,
    pub(crate) imports: Vec<TImport>,
    pub(crate) foreigns: Vec<(String, String)>,
    pub(crate) records: Vec<RecordType>,
    pub(crate) values: Vec<ValueSig>,
    /// Locals of the function currently being checked.
    pub(crate) locals: Vec<TLocal>,
    pub(crate) current_rets: Vec<Type>,
}

impl Checker<'_> {
    pub(crate) fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(TypeError::new(message, span));
    }

    pub(crate) fn line(&self, span: &Span) -> u32 {
        loc::line_col(self.source, span.start).0
    }

    fn check_duplicate(&mut self, name: &str, span: &Span) -> bool {
        if self.symbols.find_dup(name).is_some() {
            self.error(format!("duplicate declaration of '{}'", name), span.clone());
            true
        } else {
            false
        }
    }

    // ─── Pass 1: collect top-level declarations ──────────────────────────

    /// Processes imports, then records, then value signatures, regardless
    /// of the order the items were written in.
    fn collect_declarations(&mut self, program: &Program) {
        for item in &program.items {
            match &item.node {
                TopLevel::Import { local_name, module } => {
                    self.collect_import(local_name, module, &item.span);
                }
                TopLevel::ForeignImport { local_name, header } => {
                    if self.check_duplicate(local_name, &item.span) {
                        continue;
                    }
                    let index = self.foreigns.len();
                    self.foreigns.push((local_name.clone(), header.clone()));
                    self.symbols.add(local_name, Binding::Foreign(index));
                    self.symbols
                        .add_foreign_type(local_name, Type::Foreign(local_name.clone()));
                }
                _ => {}
            }
        }

        // records first get their names, so fields can refer to each other
        for item in &program.items {
            if let TopLevel::Record(r) = &item.node {
                if self.check_duplicate(&r.name, &item.span) {
                    continue;
                }
                let fqtn = format!("{}.{}", self.symbols.module_name, r.name);
                self.symbols.add(&r.name, Binding::Record(fqtn));
            }
        }
        for item in &program.items {
            if let TopLevel::Record(r) = &item.node {
                let fqtn = format!("{}.{}", self.symbols.module_name, r.name);
                if self.records.iter().any(|rec| rec.fqtn == fqtn) {
                    continue; // duplicate already reported
                }
                let mut fields = Vec::new();
                for field in &r.fields {
                    if fields.iter().any(|(n, _): &(String, Type)| n == &field.name) {
                        self.error(
                            format!("duplicate field '{}' in record '{}'", field.name, r.name),
                            field.span.clone(),
                        );
                        continue;
                    }
                    let ty = self.resolve_annotation(&field.annotation);
                    fields.push((field.name.clone(), ty));
                }
                let record = RecordType {
                    fqtn: fqtn.clone(),
                    fields,
                };
                self.session.registry.register(record.clone());
                self.records.push(record);
            }
        }

        for item in &program.items {
            match &item.node {
                TopLevel::Var(v) => self.collect_var_sig(v, &item.span),
                TopLevel::Func(f) => self.collect_func_sig(f, &item.span),
                _ => {}
            }
        }
    }

    fn collect_import(&mut self, local_name: &str, module: &str, span: &Span) {
        if self.check_duplicate(local_name, span) {
            return;
        }
        if module == self.symbols.module_name {
            self.error(
                format!("circular reference to module '{}'", module),
                span.clone(),
            );
            return;
        }
        match self.loader.load(self.session, module) {
            Ok(ty) => {
                // make the imported module's records resolvable by name
                for (_, member) in &ty.members {
                    if let MemberType::Record(record) = member {
                        self.session.registry.register(record.clone());
                    }
                }
                let index = self.imports.len();
                self.imports.push(TImport {
                    local_name: local_name.to_string(),
                    module_name: module.to_string(),
                    ty,
                });
                self.symbols.add(local_name, Binding::Import(index));
            }
            Err(err) => {
                self.error(err.to_string(), span.clone());
            }
        }
    }

    fn collect_var_sig(&mut self, v: &VarDecl, span: &Span) {
        if self.check_duplicate(&v.name, span) {
            return;
        }
        let ty = match &v.annotation {
            Some(ann) => self.resolve_annotation(ann),
            None => self.infer_constant_type(&v.value),
        };
        let index = self.values.len();
        self.values.push(ValueSig {
            name: v.name.clone(),
            ty,
            exported: v.exported,
            is_func: false,
        });
        self.symbols.add(&v.name, Binding::TopLevel(index));
    }

    fn collect_func_sig(&mut self, f: &FuncDecl, span: &Span) {
        if self.check_duplicate(&f.name, span) {
            return;
        }
        let params: Vec<Type> = f
            .params
            .iter()
            .map(|p| self.resolve_annotation(&p.annotation))
            .collect();
        let rets: Vec<Type> = f
            .return_types
            .iter()
            .map(|t| self.resolve_annotation(t))
            .collect();
        let index = self.values.len();
        self.values.push(ValueSig {
            name: f.name.clone(),
            ty: Type::Function {
                params,
                rets,
                vararg: false,
            },
            exported: f.exported,
            is_func: true,
        });
        self.symbols.add(&f.name, Binding::TopLevel(index));
    }

    /// Type of a top-level initializer when no annotation was written.
    /// Only literal forms can be inferred.
    fn infer_constant_type(&mut self, value: &Spanned<Expr>) -> Type {
        match &value.node {
            Expr::Bool(_) => Type::Boolean,
            Expr::Integer(_) => Type::Integer,
            Expr::Float(_) => Type::Float,
            Expr::String(_) => Type::String,
            Expr::Nil => {
                self.error(
                    "'nil' initializer needs a type annotation",
                    value.span.clone(),
                );
                Type::Invalid
            }
            Expr::InitList(_) => {
                self.error(
                    "missing type hint for initializer list",
                    value.span.clone(),
                );
                Type::Invalid
            }
            _ => {
                self.error(
                    "initializer is not a constant expression",
                    value.span.clone(),
                );
                Type::Invalid
            }
        }
    }

    // ─── Pass 2: check bodies ────────────────────────────────────────────

    fn check_bodies(&mut self, program: &Program) -> Vec<TValueDecl> {
        let mut values = Vec::new();
        for item in &program.items {
            match &item.node {
                TopLevel::Var(v) => {
                    if let Some(decl) = self.check_var_body(v, &item.span) {
                        values.push(TValueDecl::Var(decl));
                    }
                }
                TopLevel::Func(f) => {
                    if let Some(decl) = self.check_func_body(f, &item.span) {
                        values.push(TValueDecl::Func(decl));
                    }
                }
                _ => {}
            }
        }
        values
    }

    pub(crate) fn value_index(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name == name)
    }

    fn check_var_body(&mut self, v: &VarDecl, span: &Span) -> Option<TVar> {
        let index = self.value_index(&v.name)?;
        let declared = self.values[index].ty.clone();
        let value = self.check_exp(&v.value, Some(&declared));
        let value = self.coerce(value, &declared, &v.value.span);
        if !self.is_constant(&value) {
            self.error(
                format!("initializer of '{}' is not a constant expression", v.name),
                span.clone(),
            );
        }
        Some(TVar {
            name: v.name.clone(),
            ty: declared,
            value,
            exported: v.exported,
        })
    }

    /// Initializers of top-level variables must be evaluable at module
    /// init without calling into the module itself.
    fn is_constant(&self, exp: &TExp) -> bool {
        match &exp.kind {
            TExpKind::Nil
            | TExpKind::Bool(_)
            | TExpKind::Integer(_)
            | TExpKind::Float(_)
            | TExpKind::String(_) => true,
            TExpKind::InitArray { elems } => elems.iter().all(|e| self.is_constant(e)),
            TExpKind::InitRecord { fields, .. } => fields.iter().all(|e| self.is_constant(e)),
            TExpKind::Coerce { value, .. } => self.is_constant(value),
            _ => false,
        }
    }

    fn check_func_body(&mut self, f: &FuncDecl, _span: &Span) -> Option<TFunc> {
        let index = self.value_index(&f.name)?;
        let (params, rets) = match &self.values[index].ty {
            Type::Function { params, rets, .. } => (params.clone(), rets.clone()),
            _ => return None,
        };

        self.locals = Vec::new();
        self.current_rets = rets.clone();
        self.symbols.open_scope();
        for (param, ty) in f.params.iter().zip(params.iter()) {
            let id = self.add_local(&param.name, ty.clone());
            if self
                .locals
                .iter()
                .take(id)
                .any(|l| l.name == param.name)
            {
                self.error(
                    format!("duplicate parameter '{}'", param.name),
                    param.span.clone(),
                );
            }
            self.symbols.add(&param.name, Binding::Local(id));
        }
        let body = self.check_block(&f.body);
        self.symbols.close_scope();

        if !rets.is_empty() && !always_returns(&body) {
            self.error(
                format!(
                    "control reaches the end of function '{}' without returning",
                    f.name
                ),
                f.body
                    .stmts
                    .last()
                    .map(|s| s.span.clone())
                    .unwrap_or(0..0),
            );
        }

        Some(TFunc {
            name: f.name.clone(),
            locals: std::mem::take(&mut self.locals),
            param_count: f.params.len(),
            rets,
            body,
            exported: f.exported,
        })
    }

    pub(crate) fn add_local(&mut self, name: &str, ty: Type) -> LocalId {
        let id = self.locals.len();
        self.locals.push(TLocal {
            name: name.to_string(),
            ty,
        });
        id
    }

    pub(crate) fn check_block(&mut self, block: &Block) -> TBlock {
        self.symbols.open_scope();
        let stmts = block
            .stmts
            .iter()
            .map(|stmt| self.check_stmt(stmt))
            .collect();
        self.symbols.close_scope();
        TBlock { stmts }
    }

    // ─── Type annotations ────────────────────────────────────────────────

    pub(crate) fn resolve_annotation(&mut self, ann: &Spanned<TypeAnnotation>) -> Type {
        match &ann.node {
            TypeAnnotation::Name(name) => match name.as_str() {
                "nil" => Type::Nil,
                "boolean" => Type::Boolean,
                "integer" => Type::Integer,
                "float" => Type::Float,
                "string" => Type::String,
                "value" => Type::Value,
                other => {
                    if let Some(Binding::Record(fqtn)) = self.symbols.find(other).cloned() {
                        return Type::Nominal(fqtn);
                    }
                    if let Some(ty) = self.symbols.find_foreign_type(other).cloned() {
                        return ty;
                    }
                    self.error(format!("unknown type '{}'", other), ann.span.clone());
                    Type::Invalid
                }
            },
            TypeAnnotation::Qualified(module, record) => {
                let binding = self.symbols.find(module).cloned();
                match binding {
                    Some(Binding::Import(index)) => {
                        let import = &self.imports[index];
                        let fqtn = format!("{}.{}", import.module_name, record);
                        match import.ty.member(record) {
                            Some(MemberType::Record(_)) => Type::Nominal(fqtn),
                            _ => {
                                self.error(
                                    format!(
                                        "module '{}' has no record named '{}'",
                                        import.module_name, record
                                    ),
                                    ann.span.clone(),
                                );
                                Type::Invalid
                            }
                        }
                    }
                    _ => {
                        self.error(
                            format!("'{}' does not name an imported module", module),
                            ann.span.clone(),
                        );
                        Type::Invalid
                    }
                }
            }
            TypeAnnotation::Array(elem) => {
                let elem_ty = self.resolve_annotation(elem);
                if elem_ty == Type::Nil {
                    self.error("arrays of nil are not allowed", ann.span.clone());
                    return Type::Invalid;
                }
                Type::array(elem_ty)
            }
            TypeAnnotation::Map(..) => {
                self.error("map types are not supported", ann.span.clone());
                Type::Invalid
            }
            TypeAnnotation::Function { params, results } => Type::Function {
                params: params.iter().map(|t| self.resolve_annotation(t)).collect(),
                rets: results.iter().map(|t| self.resolve_annotation(t)).collect(),
                vararg: false,
            },
            TypeAnnotation::Option(base) => Type::option(self.resolve_annotation(base)),
        }
    }

    // ─── Module type ─────────────────────────────────────────────────────

    fn module_type(&self) -> ModuleType {
        let mut members = Vec::new();
        for record in &self.records {
            members.push((
                record.local_name().to_string(),
                MemberType::Record(record.clone()),
            ));
        }
        for sig in &self.values {
            if !sig.exported {
                continue;
            }
            let member = match &sig.ty {
                Type::Function { params, rets, .. } if sig.is_func => MemberType::Func {
                    params: params.clone(),
                    rets: rets.clone(),
                },
                ty => MemberType::Var(ty.clone()),
            };
            members.push((sig.name.clone(), member));
        }
        ModuleType {
            name: self.symbols.module_name.clone(),
            members,
        }
    }
}

/// Conservative "always returns" computation: a block returns iff some
/// statement in it always returns; an `if` must cover every branch
/// including an explicit else; loops never count.
pub(crate) fn always_returns(block: &TBlock) -> bool {
    block.stmts.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &TStmt) -> bool {
    match stmt {
        TStmt::Return(_) => true,
        TStmt::Do(body) => always_returns(body),
        TStmt::If { arms, else_body } => {
            else_body.as_ref().is_some_and(always_returns)
                && arms.iter().all(|(_, body)| always_returns(body))
        }
        _ => false,
    }
}
