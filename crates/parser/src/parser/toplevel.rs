use logos::Span;

use ast::expr::{Expr, InitEntry, Var};
use ast::stmt::{Block, Stmt};
use ast::types::TypeAnnotation;
use ast::{FuncDecl, Param, Program, RecordDecl, RecordField, Spanned, TopLevel, VarDecl};

use super::{ParseErrorKind, ParseResult, Parser};
use crate::lexer::Token;

impl Parser<'_> {
    /// Parse a complete compilation unit: a sequence of top-level items in
    /// any order, until end of input.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut items = Vec::new();
        while self.peek_token() != Token::Eof {
            self.parse_top_level(&mut items)?;
        }
        Ok(Program { items })
    }

    fn parse_top_level(&mut self, items: &mut Vec<Spanned<TopLevel>>) -> ParseResult<()> {
        let start = self.peek_span();
        let item = match self.peek_token() {
            Token::Local => {
                self.advance();
                match self.peek_token() {
                    Token::Function => self.parse_func(false)?,
                    _ => self.parse_local_binding()?,
                }
            }
            Token::Function => self.parse_func(true)?,
            // a record declaration produces two items: the record type and
            // its implicit `new` static constructor
            Token::Record => {
                let record = self.parse_record()?;
                let span = start.start..self.last_end();
                let constructor = record_constructor(&record, &span);
                items.push(Spanned::new(TopLevel::Record(record), span.clone()));
                items.push(Spanned::new(TopLevel::Func(constructor), span));
                return Ok(());
            }
            Token::Name => self.parse_var(true)?,
            _ => return Err(self.error(ParseErrorKind::TopLevelDecl)),
        };
        let end = self.last_end();
        items.push(Spanned::new(item, start.start..end));
        Ok(())
    }

    /// After `local`, with a name ahead: an import, a foreign import, or a
    /// module-private variable.
    fn parse_local_binding(&mut self) -> ParseResult<TopLevel> {
        // peek past `name =` for `import` / `foreign import`
        if self.peek2_token() == Token::Assign {
            match self.nth_token(2) {
                Token::Import => {
                    let local_name = self.expect_name(ParseErrorKind::NameDecl)?;
                    self.advance(); // =
                    self.advance(); // import
                    let module = self.parse_import_string()?;
                    return Ok(TopLevel::Import { local_name, module });
                }
                Token::Foreign => {
                    let local_name = self.expect_name(ParseErrorKind::NameDecl)?;
                    self.advance(); // =
                    self.advance(); // foreign
                    self.expect(Token::Import, ParseErrorKind::ImportForeign)?;
                    let header = self.parse_import_string()?;
                    return Ok(TopLevel::ForeignImport { local_name, header });
                }
                _ => {}
            }
        }
        self.parse_var(false)
    }

    fn parse_import_string(&mut self) -> ParseResult<String> {
        match self.peek_token() {
            Token::Str(bytes) => {
                self.advance();
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => Err(self.error(ParseErrorKind::StringImport)),
        }
    }

    fn parse_var(&mut self, exported: bool) -> ParseResult<TopLevel> {
        let name = self.expect_name(ParseErrorKind::NameDecl)?;
        let annotation = if self.eat(Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(Token::Assign, ParseErrorKind::AssignTopLevelVar)?;
        let value = self.parse_expr()?;
        Ok(TopLevel::Var(VarDecl {
            exported,
            name,
            annotation,
            value,
        }))
    }

    fn parse_func(&mut self, exported: bool) -> ParseResult<TopLevel> {
        self.advance(); // consume `function`
        let name = self.expect_name(ParseErrorKind::NameFunc)?;
        self.expect(Token::LParen, ParseErrorKind::LParPList)?;
        let params = self.parse_params()?;
        self.expect(Token::RParen, ParseErrorKind::RParPList)?;
        let return_types = if self.eat(Token::Colon) {
            self.parse_type_list()?
        } else {
            Vec::new()
        };
        let body = self.parse_block()?;
        self.expect(Token::End, ParseErrorKind::EndFunc)?;
        Ok(TopLevel::Func(FuncDecl {
            exported,
            name,
            params,
            return_types,
            body,
        }))
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.peek_token() == Token::RParen {
            return Ok(params);
        }
        loop {
            let start = self.peek_span();
            let name = self.expect_name(ParseErrorKind::NameParam)?;
            self.expect(Token::Colon, ParseErrorKind::ColonParam)?;
            let annotation = self.parse_type()?;
            let end = self.last_end();
            params.push(Param {
                name,
                annotation,
                span: start.start..end,
            });
            if !self.eat(Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_record(&mut self) -> ParseResult<RecordDecl> {
        self.advance(); // consume `record`
        let name = self.expect_name(ParseErrorKind::NameRecord)?;
        let mut fields = Vec::new();
        while self.peek_token() != Token::End {
            let start = self.peek_span();
            let field_name = self.expect_name(ParseErrorKind::FieldRecord)?;
            self.expect(Token::Colon, ParseErrorKind::ColonRecordField)?;
            let annotation = self.parse_type()?;
            let end = self.last_end();
            fields.push(RecordField {
                name: field_name,
                annotation,
                span: start.start..end,
            });
            self.eat(Token::Semicolon);
        }
        self.advance(); // consume `end`
        Ok(RecordDecl { name, fields })
    }
}

/// The implicit `new` static constructor of a record: one parameter per
/// field, returning the record built from them. It is a module-private
/// top-level function named `R.new` — a name no source declaration can
/// spell, so it cannot collide.
fn record_constructor(record: &RecordDecl, span: &Span) -> FuncDecl {
    let params = record
        .fields
        .iter()
        .map(|field| Param {
            name: field.name.clone(),
            annotation: field.annotation.clone(),
            span: field.span.clone(),
        })
        .collect();
    let entries = record
        .fields
        .iter()
        .map(|field| InitEntry::Named {
            name: field.name.clone(),
            value: Spanned::new(
                Expr::Var(Var::Name(field.name.clone())),
                field.span.clone(),
            ),
            span: field.span.clone(),
        })
        .collect();
    let value = Spanned::new(Expr::InitList(entries), span.clone());
    let body = Block {
        stmts: vec![Spanned::new(
            Stmt::Return {
                values: vec![value],
            },
            span.clone(),
        )],
    };
    FuncDecl {
        exported: false,
        name: format!("{}.new", record.name),
        params,
        return_types: vec![Spanned::new(
            TypeAnnotation::Name(record.name.clone()),
            span.clone(),
        )],
        body,
    }
}
