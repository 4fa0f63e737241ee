use ast::expr::{Expr, Var};
use ast::Spanned;

use super::{ParseErrorKind, ParseResult, Parser};
use crate::lexer::Token;

impl Parser<'_> {
    /// A primary expression followed by any chain of call, index, field,
    /// and method suffixes, all left-associative.
    pub(crate) fn parse_postfix(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_token() {
                Token::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let span = start.start..self.last_end();
                    expr = Spanned::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                Token::Dot => {
                    self.advance();
                    let field = self.expect_name(ParseErrorKind::NameDot)?;
                    let span = start.start..self.last_end();
                    expr = Spanned::new(
                        Expr::Var(Var::Dot {
                            object: Box::new(expr),
                            field,
                        }),
                        span,
                    );
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket, ParseErrorKind::RBracketIndex)?;
                    let span = start.start..self.last_end();
                    expr = Spanned::new(
                        Expr::Var(Var::Bracket {
                            array: Box::new(expr),
                            index: Box::new(index),
                        }),
                        span,
                    );
                }
                Token::Colon => {
                    self.advance();
                    let method = self.expect_name(ParseErrorKind::NameMethod)?;
                    self.expect(Token::LParen, ParseErrorKind::LParMethodArgs)?;
                    let args = self.parse_call_args()?;
                    let span = start.start..self.last_end();
                    expr = Spanned::new(
                        Expr::MethodCall {
                            receiver: Box::new(expr),
                            method,
                            args,
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments after a consumed `(`, up to and including the `)`.
    fn parse_call_args(&mut self) -> ParseResult<Vec<Spanned<Expr>>> {
        let mut args = Vec::new();
        if self.peek_token() != Token::RParen {
            args = self.parse_expr_list()?;
        }
        self.expect(Token::RParen, ParseErrorKind::RParCallArgs)?;
        Ok(args)
    }
}
