use ast::expr::Expr;
use ast::stmt::{Block, Stmt};
use ast::Spanned;

use super::{ParseErrorKind, ParseResult, Parser};
use crate::lexer::Token;

impl Parser<'_> {
    /// Parse statements until a block terminator (`end`, `else`, `elseif`,
    /// `until`, end of input). The terminator itself is not consumed.
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(Token::Semicolon) {}
            if self.at_block_end() {
                return Ok(Block { stmts });
            }
            let stmt = self.parse_stmt()?;
            let was_return = matches!(stmt.node, Stmt::Return { .. });
            stmts.push(stmt);
            if was_return {
                while self.eat(Token::Semicolon) {}
                if !self.at_block_end() {
                    return Err(self.error(ParseErrorKind::EndOfBlockAfterReturn));
                }
            }
        }
    }

    fn at_block_end(&self) -> bool {
        matches!(
            self.peek_token(),
            Token::End | Token::Else | Token::Elseif | Token::Until | Token::Eof
        )
    }

    fn parse_stmt(&mut self) -> ParseResult<Spanned<Stmt>> {
        let start = self.peek_span();
        let stmt = match self.peek_token() {
            Token::Do => self.parse_do()?,
            Token::While => self.parse_while()?,
            Token::Repeat => self.parse_repeat()?,
            Token::If => self.parse_if()?,
            Token::For => self.parse_for()?,
            Token::Local => self.parse_decl()?,
            Token::Return => self.parse_return()?,
            _ => self.parse_assign_or_call()?,
        };
        let end = self.last_end();
        Ok(Spanned::new(stmt, start.start..end))
    }

    fn parse_do(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `do`
        let body = self.parse_block()?;
        self.expect(Token::End, ParseErrorKind::EndDo)?;
        Ok(Stmt::Do(body))
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `while`
        let cond = self.parse_expr()?;
        self.expect(Token::Do, ParseErrorKind::DoWhile)?;
        let body = self.parse_block()?;
        self.expect(Token::End, ParseErrorKind::EndWhile)?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_repeat(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `repeat`
        let body = self.parse_block()?;
        self.expect(Token::Until, ParseErrorKind::UntilRepeat)?;
        let until = self.parse_expr()?;
        Ok(Stmt::Repeat { body, until })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `if`
        let mut arms = Vec::new();
        let cond = self.parse_expr()?;
        self.expect(Token::Then, ParseErrorKind::ThenIf)?;
        arms.push((cond, self.parse_block()?));
        while self.peek_token() == Token::Elseif {
            self.advance();
            let cond = self.parse_expr()?;
            self.expect(Token::Then, ParseErrorKind::ThenIf)?;
            arms.push((cond, self.parse_block()?));
        }
        let else_body = if self.eat(Token::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        self.expect(Token::End, ParseErrorKind::EndIf)?;
        Ok(Stmt::If { arms, else_body })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `for`
        let var = self.expect_name(ParseErrorKind::NameFor)?;
        let annotation = if self.eat(Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(Token::Assign, ParseErrorKind::AssignFor)?;
        let start = self.parse_expr()?;
        self.expect(Token::Comma, ParseErrorKind::CommaFor)?;
        let finish = self.parse_expr()?;
        let step = if self.eat(Token::Comma) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(Token::Do, ParseErrorKind::DoFor)?;
        let body = self.parse_block()?;
        self.expect(Token::End, ParseErrorKind::EndFor)?;
        Ok(Stmt::For {
            var,
            annotation,
            start,
            finish,
            step,
            body,
        })
    }

    fn parse_decl(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `local`
        let name = self.expect_name(ParseErrorKind::NameDecl)?;
        let annotation = if self.eat(Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(Token::Assign, ParseErrorKind::AssignDecl)?;
        let value = self.parse_expr()?;
        Ok(Stmt::Decl {
            name,
            annotation,
            value,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume `return`
        let values = if self.at_block_end() || self.peek_token() == Token::Semicolon {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        Ok(Stmt::Return { values })
    }

    /// A statement that starts with an expression: either an assignment
    /// (the expression must then be a variable) or a bare call.
    fn parse_assign_or_call(&mut self) -> ParseResult<Stmt> {
        let first = self.parse_postfix()?;

        if matches!(self.peek_token(), Token::Comma | Token::Assign) {
            let mut targets = vec![self.to_var(first)?];
            while self.eat(Token::Comma) {
                let next = self.parse_postfix()?;
                targets.push(self.to_var(next)?);
            }
            self.expect(Token::Assign, ParseErrorKind::AssignAssign)?;
            let values = self.parse_expr_list()?;
            return Ok(Stmt::Assign { targets, values });
        }

        match first.node {
            Expr::Call { .. } | Expr::MethodCall { .. } => Ok(Stmt::Call(first)),
            _ => Err(self.error(ParseErrorKind::ExpStat)),
        }
    }

    fn to_var(&self, e: Spanned<Expr>) -> ParseResult<Spanned<ast::expr::Var>> {
        match e.node {
            Expr::Var(v) => Ok(Spanned::new(v, e.span)),
            _ => Err(super::ParseError {
                kind: ParseErrorKind::ExpAssign,
                span: e.span,
            }),
        }
    }

    pub(crate) fn parse_expr_list(&mut self) -> ParseResult<Vec<Spanned<Expr>>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }
}
