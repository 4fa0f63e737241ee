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

pub mod expr;
pub mod loc;
pub mod op;
pub mod pretty;
pub mod stmt;
pub mod types;

use logos::Span;

use expr::Expr;
use stmt::Block;
use types::TypeAnnotation;

/// Every AST node carries a source span for error reporting.
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A parsed Titan compilation unit: an ordered sequence of top-level items.
///
/// The parser preserves source order; the checker processes imports before
/// variables before functions regardless of the order written.
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Spanned<TopLevel>>,
}

#[derive(Debug, Clone)]
pub enum TopLevel {
    /// `local name = import "mod.path"`
    Import { local_name: String, module: String },

    /// `local name = foreign import "header.h"`
    ForeignImport { local_name: String, header: String },

    /// `local? name [: type] = expr`
    Var(VarDecl),

    /// `local? function name(params) [: rettypes] body end`
    Func(FuncDecl),

    /// `record Name fields end`
    Record(RecordDecl),
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    /// `local` declarations are private to the module; the rest are exported.
    pub exported: bool,
    pub name: String,
    pub annotation: Option<Spanned<TypeAnnotation>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub exported: bool,
    pub name: String,
    pub params: Vec<Param>,
    /// Declared return types; empty means the function returns nothing.
    pub return_types: Vec<Spanned<TypeAnnotation>>,
    pub body: Block,
}

/// A function parameter. Parameters always carry a type annotation.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Spanned<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: String,
    pub annotation: Spanned<TypeAnnotation>,
    pub span: Span,
}
