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

use crate::op::{BinOp, UnOp};
use crate::types::TypeAnnotation;
use crate::Spanned;

#[derive(Debug, Clone)]
pub enum Expr {
    /// `nil`
    Nil,

    /// `true` / `false`
    Bool(bool),

    /// Integer literal: `42`, `0x2A`
    Integer(i64),

    /// Float literal: `3.14`, `1e10`, `0x1p4`
    Float(f64),

    /// String literal, after escape processing. Titan strings are byte
    /// strings; escapes such as `\xFF` produce bytes outside UTF-8.
    String(Vec<u8>),

    /// `{ e1, e2 }` or `{ x = e1, y = e2 }`. The element/field types come
    /// from the surrounding type hint during checking.
    InitList(Vec<InitEntry>),

    /// A variable reference: name, dot access, or bracket indexing.
    Var(Var),

    /// Unary operation: `-x`, `not x`, `#x`, `~x`
    Unop {
        op: UnOp,
        operand: Box<Spanned<Expr>>,
    },

    /// Binary operation: `x + y`, `x < y`, `x and y`, ...
    Binop {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },

    /// `a .. b .. c` flattened into a single n-ary node. Chains of string
    /// literals are folded into a single `String` at parse time.
    Concat { items: Vec<Spanned<Expr>> },

    /// Function call: `f(a, b)`
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// Method call: `o:m(a, b)`
    MethodCall {
        receiver: Box<Spanned<Expr>>,
        method: String,
        args: Vec<Spanned<Expr>>,
    },

    /// `e as T`
    Cast {
        value: Box<Spanned<Expr>>,
        to: Spanned<TypeAnnotation>,
    },

    /// `(e)` where `e` is a call: adjusts a multi-valued producer to
    /// exactly one value. Parentheses around anything else are dropped
    /// during parsing since they carry no meaning.
    Paren(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone)]
pub enum Var {
    /// `name`
    Name(String),

    /// `object.field` (record field or module member access)
    Dot {
        object: Box<Spanned<Expr>>,
        field: String,
    },

    /// `array[index]`
    Bracket {
        array: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone)]
pub enum InitEntry {
    Positional(Spanned<Expr>),
    Named {
        name: String,
        value: Spanned<Expr>,
        span: Span,
    },
}
