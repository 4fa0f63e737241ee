use ast::expr::{Expr, InitEntry};
use ast::op::UnOp;
use ast::Spanned;

use super::{ParseErrorKind, ParseResult, Parser};
use crate::lexer::{Numeral, Token};

impl Parser<'_> {
    // not  #  -  ~ — binds tighter than the binary operators but looser
    // than `^`, so `-x^2` reads as `-(x^2)`.
    pub(crate) fn parse_unary(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let op = match self.peek_token() {
            Token::Not => Some(UnOp::Not),
            Token::Hash => Some(UnOp::Len),
            Token::Minus => Some(UnOp::Neg),
            Token::Tilde => Some(UnOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.start..self.last_end();
            // fold negated numeric literals so that constant steps in
            // `for` headers (e.g. `-2`) stay compile-time constants
            if op == UnOp::Neg {
                match operand.node {
                    Expr::Integer(n) if n != i64::MIN => {
                        return Ok(Spanned::new(Expr::Integer(-n), span));
                    }
                    Expr::Float(x) => return Ok(Spanned::new(Expr::Float(-x), span)),
                    _ => {}
                }
            }
            return Ok(Spanned::new(
                Expr::Unop {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_power()
    }

    // ^ — right-associative; the exponent re-enters the unary level so
    // `2 ^ -3` parses.
    fn parse_power(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let base = self.parse_cast()?;
        if self.eat(Token::Caret) {
            let exponent = self.parse_unary()?;
            let span = start.start..self.last_end();
            return Ok(Spanned::new(
                Expr::Binop {
                    op: ast::op::BinOp::Pow,
                    lhs: Box::new(base),
                    rhs: Box::new(exponent),
                },
                span,
            ));
        }
        Ok(base)
    }

    // `e as T`, possibly chained
    fn parse_cast(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut value = self.parse_postfix()?;
        while self.eat(Token::As) {
            let to = self.parse_type()?;
            let span = start.start..self.last_end();
            value = Spanned::new(
                Expr::Cast {
                    value: Box::new(value),
                    to,
                },
                span,
            );
        }
        Ok(value)
    }

    pub(crate) fn parse_primary(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        match self.peek_token() {
            Token::Nil => {
                self.advance();
                Ok(Spanned::new(Expr::Nil, start))
            }
            Token::True => {
                self.advance();
                Ok(Spanned::new(Expr::Bool(true), start))
            }
            Token::False => {
                self.advance();
                Ok(Spanned::new(Expr::Bool(false), start))
            }
            Token::Number(n) => {
                self.advance();
                let expr = match n {
                    Numeral::Int(v) => Expr::Integer(v),
                    Numeral::Flt(v) => Expr::Float(v),
                };
                Ok(Spanned::new(expr, start))
            }
            Token::Str(bytes) => {
                self.advance();
                Ok(Spanned::new(Expr::String(bytes), start))
            }
            Token::Name => {
                self.advance();
                let name = self.last_text().to_string();
                Ok(Spanned::new(Expr::Var(ast::expr::Var::Name(name)), start))
            }
            Token::LCurly => self.parse_init_list(),
            Token::LParen => {
                self.advance(); // consume `(`
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, ParseErrorKind::RParExpr)?;
                let span = start.start..self.last_end();
                // parentheses adjust a multi-valued call to one value;
                // around anything else they are meaningless and dropped
                match inner.node {
                    Expr::Call { .. } | Expr::MethodCall { .. } => {
                        Ok(Spanned::new(Expr::Paren(Box::new(inner)), span))
                    }
                    _ => Ok(inner),
                }
            }
            _ => Err(self.error(ParseErrorKind::ExpExpr)),
        }
    }

    fn parse_init_list(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        self.advance(); // consume `{`
        let mut entries = Vec::new();
        loop {
            if self.peek_token() == Token::RCurly {
                break;
            }
            // `name = expr` is a named field; anything else is positional
            if self.peek_token() == Token::Name && self.peek2_token() == Token::Assign {
                let field_start = self.peek_span();
                self.advance();
                let name = self.last_text().to_string();
                self.advance(); // =
                let value = self.parse_expr()?;
                let span = field_start.start..self.last_end();
                entries.push(InitEntry::Named { name, value, span });
            } else {
                entries.push(InitEntry::Positional(self.parse_expr()?));
            }
            if !self.eat(Token::Comma) && !self.eat(Token::Semicolon) {
                break;
            }
        }
        self.expect(Token::RCurly, ParseErrorKind::RCurlyInit)?;
        let span = start.start..self.last_end();
        Ok(Spanned::new(Expr::InitList(entries), span))
    }
}
