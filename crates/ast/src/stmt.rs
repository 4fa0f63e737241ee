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

use crate::expr::{Expr, Var};
use crate::types::TypeAnnotation;
use crate::Spanned;

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `do body end`
    Do(Block),

    /// `while cond do body end`
    While { cond: Spanned<Expr>, body: Block },

    /// `repeat body until cond`
    Repeat { body: Block, until: Spanned<Expr> },

    /// `if c1 then b1 elseif c2 then b2 ... else bn end`. Each arm pairs a
    /// condition with its block; `elseif` chains are kept flat.
    If {
        arms: Vec<(Spanned<Expr>, Block)>,
        else_body: Option<Block>,
    },

    /// `for v [: T] = start, finish [, step] do body end`
    For {
        var: String,
        annotation: Option<Spanned<TypeAnnotation>>,
        start: Spanned<Expr>,
        finish: Spanned<Expr>,
        step: Option<Spanned<Expr>>,
        body: Block,
    },

    /// `local name [: T] = expr`
    Decl {
        name: String,
        annotation: Option<Spanned<TypeAnnotation>>,
        value: Spanned<Expr>,
    },

    /// `v1, v2 = e1, e2`
    Assign {
        targets: Vec<Spanned<Var>>,
        values: Vec<Spanned<Expr>>,
    },

    /// A call expression in statement position.
    Call(Spanned<Expr>),

    /// `return e1, e2`. Must be the last statement of its block.
    Return { values: Vec<Spanned<Expr>> },
}
