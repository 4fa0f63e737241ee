use ast::expr::Expr;
use ast::op::BinOp;
use ast::Spanned;

use super::{ParseResult, Parser};
use crate::lexer::Token;

// One function per precedence level, lowest first. Each level loops on its
// own operators and descends into the next tighter level.
impl Parser<'_> {
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Spanned<Expr>> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_and()?;
        while self.eat(Token::Or) {
            let right = self.parse_and()?;
            left = self.binop(BinOp::Or, left, right, start.start);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_comparison()?;
        while self.eat(Token::And) {
            let right = self.parse_comparison()?;
            left = self.binop(BinOp::And, left, right, start.start);
        }
        Ok(left)
    }

    // == ~= < > <= >=
    fn parse_comparison(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_bitor()?;
        loop {
            let op = match self.peek_token() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Gt => BinOp::Gt,
                Token::Le => BinOp::Le,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_bitor()?;
            left = self.binop(op, left, right, start.start);
        }
        Ok(left)
    }

    // |
    fn parse_bitor(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_bitxor()?;
        while self.eat(Token::Pipe) {
            let right = self.parse_bitxor()?;
            left = self.binop(BinOp::BitOr, left, right, start.start);
        }
        Ok(left)
    }

    // ~ (binary)
    fn parse_bitxor(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_bitand()?;
        while self.eat(Token::Tilde) {
            let right = self.parse_bitand()?;
            left = self.binop(BinOp::BitXor, left, right, start.start);
        }
        Ok(left)
    }

    // &
    fn parse_bitand(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_shift()?;
        while self.eat(Token::Amp) {
            let right = self.parse_shift()?;
            left = self.binop(BinOp::BitAnd, left, right, start.start);
        }
        Ok(left)
    }

    // << >>
    fn parse_shift(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek_token() {
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            left = self.binop(op, left, right, start.start);
        }
        Ok(left)
    }

    // `..` — right-associative, but flattened into one n-ary node, so the
    // chain is collected iteratively. A chain of string literals folds
    // into a single literal.
    fn parse_concat(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let first = self.parse_additive()?;
        if self.peek_token() != Token::DotDot {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::DotDot) {
            items.push(self.parse_additive()?);
        }
        let end = self.last_end();
        let span = start.start..end;
        if items.iter().all(|e| matches!(e.node, Expr::String(_))) {
            let mut folded = Vec::new();
            for item in items {
                match item.node {
                    Expr::String(bytes) => folded.extend_from_slice(&bytes),
                    _ => unreachable!(),
                }
            }
            return Ok(Spanned::new(Expr::String(folded), span));
        }
        Ok(Spanned::new(Expr::Concat { items }, span))
    }

    // + -
    fn parse_additive(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_token() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binop(op, left, right, start.start);
        }
        Ok(left)
    }

    // * / // %
    fn parse_multiplicative(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_span();
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::IntDiv,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binop(op, left, right, start.start);
        }
        Ok(left)
    }

    fn binop(
        &self,
        op: BinOp,
        lhs: Spanned<Expr>,
        rhs: Spanned<Expr>,
        start: usize,
    ) -> Spanned<Expr> {
        let span = start..self.last_end();
        Spanned::new(
            Expr::Binop {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }
}
