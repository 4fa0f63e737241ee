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

//! Renders a parsed program back to Titan source. Reparsing the output
//! yields an AST equal to the input up to spans, which `--print-ast`
//! relies on and the parser tests assert.

use crate::expr::{Expr, InitEntry, Var};
use crate::op::{BinOp, UnOp};
use crate::stmt::{Block, Stmt};
use crate::types::TypeAnnotation;
use crate::{FuncDecl, Program, RecordDecl, Spanned, TopLevel, VarDecl};

pub fn program(p: &Program) -> String {
    let mut out = Printer::new();
    for item in &p.items {
        // implicit record constructors (`R.new`) have no source spelling;
        // the parser resynthesizes them from the record declaration
        if let TopLevel::Func(f) = &item.node {
            if f.name.contains('.') {
                continue;
            }
        }
        out.top_level(&item.node);
        out.newline();
    }
    out.buf
}

/// Render a single expression (used by diagnostics and tests).
pub fn expr(e: &Expr) -> String {
    let mut out = Printer::new();
    out.expr(e, 0);
    out.buf
}

// Precedence levels, lowest to highest. An operand is parenthesized when
// its own level is below what its context requires.
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_CMP: u8 = 3;
const PREC_BOR: u8 = 4;
const PREC_BXOR: u8 = 5;
const PREC_BAND: u8 = 6;
const PREC_SHIFT: u8 = 7;
const PREC_CONCAT: u8 = 8;
const PREC_ADD: u8 = 9;
const PREC_MUL: u8 = 10;
const PREC_UNARY: u8 = 11;
const PREC_POW: u8 = 12;
const PREC_CAST: u8 = 13;
const PREC_ATOM: u8 = 14;

fn binop_prec(op: BinOp) -> u8 {
    match op {
        BinOp::Or => PREC_OR,
        BinOp::And => PREC_AND,
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => PREC_CMP,
        BinOp::BitOr => PREC_BOR,
        BinOp::BitXor => PREC_BXOR,
        BinOp::BitAnd => PREC_BAND,
        BinOp::Shl | BinOp::Shr => PREC_SHIFT,
        BinOp::Add | BinOp::Sub => PREC_ADD,
        BinOp::Mul | BinOp::Div | BinOp::IntDiv | BinOp::Mod => PREC_MUL,
        BinOp::Pow => PREC_POW,
    }
}

fn expr_prec(e: &Expr) -> u8 {
    match e {
        Expr::Binop { op, .. } => binop_prec(*op),
        Expr::Concat { .. } => PREC_CONCAT,
        Expr::Unop { .. } => PREC_UNARY,
        Expr::Cast { .. } => PREC_CAST,
        _ => PREC_ATOM,
    }
}

struct Printer {
    buf: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Printer {
            buf: String::new(),
            indent: 0,
        }
    }

    fn push(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
    }

    fn top_level(&mut self, item: &TopLevel) {
        match item {
            TopLevel::Import { local_name, module } => {
                self.push(&format!("local {} = import \"{}\"", local_name, module));
            }
            TopLevel::ForeignImport { local_name, header } => {
                self.push(&format!(
                    "local {} = foreign import \"{}\"",
                    local_name, header
                ));
            }
            TopLevel::Var(v) => self.var_decl(v),
            TopLevel::Func(f) => self.func_decl(f),
            TopLevel::Record(r) => self.record_decl(r),
        }
        self.newline();
    }

    fn var_decl(&mut self, v: &VarDecl) {
        if !v.exported {
            self.push("local ");
        }
        self.push(&v.name);
        if let Some(ann) = &v.annotation {
            self.push(": ");
            self.type_annotation(&ann.node);
        }
        self.push(" = ");
        self.expr(&v.value.node, 0);
    }

    fn func_decl(&mut self, f: &FuncDecl) {
        if !f.exported {
            self.push("local ");
        }
        self.push("function ");
        self.push(&f.name);
        self.push("(");
        for (i, p) in f.params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&p.name);
            self.push(": ");
            self.type_annotation(&p.annotation.node);
        }
        self.push(")");
        if !f.return_types.is_empty() {
            self.push(": ");
            self.type_list(&f.return_types);
        }
        self.indent += 1;
        self.newline();
        self.block_inner(&f.body);
        self.indent -= 1;
        self.newline();
        self.push("end");
    }

    fn record_decl(&mut self, r: &RecordDecl) {
        self.push("record ");
        self.push(&r.name);
        self.indent += 1;
        for field in &r.fields {
            self.newline();
            self.push(&field.name);
            self.push(": ");
            self.type_annotation(&field.annotation.node);
        }
        self.indent -= 1;
        self.newline();
        self.push("end");
    }

    fn block_inner(&mut self, b: &Block) {
        for (i, stmt) in b.stmts.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.stmt(&stmt.node);
        }
    }

    fn nested_block(&mut self, b: &Block) {
        self.indent += 1;
        self.newline();
        self.block_inner(b);
        self.indent -= 1;
        self.newline();
    }

    fn stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::Do(body) => {
                self.push("do");
                self.nested_block(body);
                self.push("end");
            }
            Stmt::While { cond, body } => {
                self.push("while ");
                self.expr(&cond.node, 0);
                self.push(" do");
                self.nested_block(body);
                self.push("end");
            }
            Stmt::Repeat { body, until } => {
                self.push("repeat");
                self.nested_block(body);
                self.push("until ");
                self.expr(&until.node, 0);
            }
            Stmt::If { arms, else_body } => {
                for (i, (cond, body)) in arms.iter().enumerate() {
                    self.push(if i == 0 { "if " } else { "elseif " });
                    self.expr(&cond.node, 0);
                    self.push(" then");
                    self.nested_block(body);
                }
                if let Some(body) = else_body {
                    self.push("else");
                    self.nested_block(body);
                }
                self.push("end");
            }
            Stmt::For {
                var,
                annotation,
                start,
                finish,
                step,
                body,
            } => {
                self.push("for ");
                self.push(var);
                if let Some(ann) = annotation {
                    self.push(": ");
                    self.type_annotation(&ann.node);
                }
                self.push(" = ");
                self.expr(&start.node, 0);
                self.push(", ");
                self.expr(&finish.node, 0);
                if let Some(step) = step {
                    self.push(", ");
                    self.expr(&step.node, 0);
                }
                self.push(" do");
                self.nested_block(body);
                self.push("end");
            }
            Stmt::Decl {
                name,
                annotation,
                value,
            } => {
                self.push("local ");
                self.push(name);
                if let Some(ann) = annotation {
                    self.push(": ");
                    self.type_annotation(&ann.node);
                }
                self.push(" = ");
                self.expr(&value.node, 0);
            }
            Stmt::Assign { targets, values } => {
                for (i, t) in targets.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.var(&t.node);
                }
                self.push(" = ");
                self.expr_list(values);
            }
            Stmt::Call(call) => self.expr(&call.node, 0),
            Stmt::Return { values } => {
                self.push("return");
                if !values.is_empty() {
                    self.push(" ");
                    self.expr_list(values);
                }
            }
        }
    }

    fn expr_list(&mut self, exprs: &[Spanned<Expr>]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(&e.node, 0);
        }
    }

    fn expr(&mut self, e: &Expr, min_prec: u8) {
        let prec = expr_prec(e);
        let parens = prec < min_prec;
        if parens {
            self.push("(");
        }
        match e {
            Expr::Nil => self.push("nil"),
            Expr::Bool(true) => self.push("true"),
            Expr::Bool(false) => self.push("false"),
            Expr::Integer(n) => self.push(&n.to_string()),
            Expr::Float(x) => self.push(&format!("{:?}", x)),
            Expr::String(bytes) => self.string_literal(bytes),
            Expr::InitList(entries) => {
                self.push("{");
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    match entry {
                        InitEntry::Positional(e) => self.expr(&e.node, 0),
                        InitEntry::Named { name, value, .. } => {
                            self.push(name);
                            self.push(" = ");
                            self.expr(&value.node, 0);
                        }
                    }
                }
                self.push("}");
            }
            Expr::Var(v) => self.var(v),
            Expr::Unop { op, operand } => {
                match op {
                    UnOp::Not => self.push("not "),
                    UnOp::Neg => {
                        // a space keeps `- -x` from lexing as a comment
                        let mark = self.buf.len();
                        self.push("-");
                        self.expr(&operand.node, PREC_UNARY);
                        if self.buf[mark + 1..].starts_with('-') {
                            self.buf.insert(mark + 1, ' ');
                        }
                        if parens {
                            self.push(")");
                        }
                        return;
                    }
                    UnOp::Len => self.push("#"),
                    UnOp::BitNot => self.push("~"),
                }
                self.expr(&operand.node, PREC_UNARY);
            }
            Expr::Binop { op, lhs, rhs } => {
                let p = binop_prec(*op);
                // `^` is right-associative; everything else associates left
                let (lmin, rmin) = if *op == BinOp::Pow {
                    (p + 1, p)
                } else {
                    (p, p + 1)
                };
                self.expr(&lhs.node, lmin);
                self.push(&format!(" {} ", op));
                self.expr(&rhs.node, rmin);
            }
            Expr::Concat { items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(" .. ");
                    }
                    self.expr(&item.node, PREC_CONCAT + 1);
                }
            }
            Expr::Call { callee, args } => {
                self.expr(&callee.node, PREC_ATOM);
                self.push("(");
                self.expr_list(args);
                self.push(")");
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                self.expr(&receiver.node, PREC_ATOM);
                self.push(":");
                self.push(method);
                self.push("(");
                self.expr_list(args);
                self.push(")");
            }
            Expr::Cast { value, to } => {
                self.expr(&value.node, PREC_CAST);
                self.push(" as ");
                self.type_annotation(&to.node);
            }
            Expr::Paren(inner) => {
                self.push("(");
                self.expr(&inner.node, 0);
                self.push(")");
            }
        }
        if parens {
            self.push(")");
        }
    }

    fn var(&mut self, v: &Var) {
        match v {
            Var::Name(n) => self.push(n),
            Var::Dot { object, field } => {
                self.expr(&object.node, PREC_ATOM);
                self.push(".");
                self.push(field);
            }
            Var::Bracket { array, index } => {
                self.expr(&array.node, PREC_ATOM);
                self.push("[");
                self.expr(&index.node, 0);
                self.push("]");
            }
        }
    }

    fn string_literal(&mut self, bytes: &[u8]) {
        self.buf.push('"');
        for &b in bytes {
            match b {
                b'"' => self.buf.push_str("\\\""),
                b'\\' => self.buf.push_str("\\\\"),
                b'\n' => self.buf.push_str("\\n"),
                b'\r' => self.buf.push_str("\\r"),
                b'\t' => self.buf.push_str("\\t"),
                0x20..=0x7e => self.buf.push(b as char),
                // three digits, so a following digit byte cannot extend the escape
                _ => self.buf.push_str(&format!("\\{:03}", b)),
            }
        }
        self.buf.push('"');
    }

    fn type_annotation(&mut self, t: &TypeAnnotation) {
        self.push(&t.to_string());
    }

    fn type_list(&mut self, ts: &[Spanned<TypeAnnotation>]) {
        if ts.len() == 1 {
            if matches!(ts[0].node, TypeAnnotation::Function { .. }) {
                self.push("(");
                self.type_annotation(&ts[0].node);
                self.push(")");
            } else {
                self.type_annotation(&ts[0].node);
            }
        } else {
            self.push("(");
            for (i, t) in ts.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.type_annotation(&t.node);
            }
            self.push(")");
        }
    }
}
