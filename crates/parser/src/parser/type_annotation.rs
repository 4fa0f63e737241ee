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

use ast::types::TypeAnnotation;
use ast::Spanned;

use super::{ParseErrorKind, ParseResult, Parser};
use crate::lexer::Token;

impl Parser<'_> {
    /// Parse a type: primitive or record names, `mod.Rec`, `{T}`, `{K: V}`,
    /// `T?`, and right-associative function types `T -> U`,
    /// `(T1, T2) -> (U1, U2)`.
    pub(crate) fn parse_type(&mut self) -> ParseResult<Spanned<TypeAnnotation>> {
        let start = self.peek_span();

        if self.peek_token() == Token::LParen {
            self.advance();
            let mut params = Vec::new();
            if self.peek_token() != Token::RParen {
                params.push(self.parse_type()?);
                while self.eat(Token::Comma) {
                    params.push(self.parse_type()?);
                }
            }
            self.expect(Token::RParen, ParseErrorKind::RParType)?;
            if self.eat(Token::Arrow) {
                let results = self.parse_result_types()?;
                let span = start.start..self.last_end();
                return Ok(Spanned::new(TypeAnnotation::Function { params, results }, span));
            }
            // a parenthesized single type stands alone; a longer list is
            // only meaningful in front of `->`
            if params.len() == 1 {
                let inner = params.pop().expect("length checked");
                return Ok(self.parse_option_suffix(inner, start.start));
            }
            return Err(self.error(ParseErrorKind::ArrowTypeList));
        }

        let atom = self.parse_type_atom()?;
        if self.eat(Token::Arrow) {
            let results = self.parse_result_types()?;
            let span = start.start..self.last_end();
            return Ok(Spanned::new(
                TypeAnnotation::Function {
                    params: vec![atom],
                    results,
                },
                span,
            ));
        }
        Ok(atom)
    }

    /// The right-hand side of `->`: a single type (recursing for right
    /// associativity) or a parenthesized result list, which may itself be
    /// the parameter list of a further function type.
    fn parse_result_types(&mut self) -> ParseResult<Vec<Spanned<TypeAnnotation>>> {
        if self.peek_token() != Token::LParen {
            return Ok(vec![self.parse_type()?]);
        }
        let start = self.peek_span();
        self.advance();
        let mut types = Vec::new();
        if self.peek_token() != Token::RParen {
            types.push(self.parse_type()?);
            while self.eat(Token::Comma) {
                types.push(self.parse_type()?);
            }
        }
        self.expect(Token::RParen, ParseErrorKind::RParType)?;
        if self.eat(Token::Arrow) {
            let results = self.parse_result_types()?;
            let span = start.start..self.last_end();
            return Ok(vec![Spanned::new(
                TypeAnnotation::Function {
                    params: types,
                    results,
                },
                span,
            )]);
        }
        Ok(types)
    }

    fn parse_type_atom(&mut self) -> ParseResult<Spanned<TypeAnnotation>> {
        let start = self.peek_span();
        let atom = match self.peek_token() {
            Token::Nil => {
                self.advance();
                Spanned::new(TypeAnnotation::Name("nil".to_string()), start.clone())
            }
            Token::Name => {
                self.advance();
                let name = self.last_text().to_string();
                if self.eat(Token::Dot) {
                    let member = self.expect_name(ParseErrorKind::NameQualType)?;
                    let span = start.start..self.last_end();
                    Spanned::new(TypeAnnotation::Qualified(name, member), span)
                } else {
                    Spanned::new(TypeAnnotation::Name(name), start.clone())
                }
            }
            Token::LCurly => {
                self.advance();
                let first = self.parse_type()?;
                if self.eat(Token::Colon) {
                    let value = self.parse_type()?;
                    self.expect(Token::RCurly, ParseErrorKind::RCurlyType)?;
                    let span = start.start..self.last_end();
                    Spanned::new(
                        TypeAnnotation::Map(Box::new(first), Box::new(value)),
                        span,
                    )
                } else {
                    self.expect(Token::RCurly, ParseErrorKind::RCurlyType)?;
                    let span = start.start..self.last_end();
                    Spanned::new(TypeAnnotation::Array(Box::new(first)), span)
                }
            }
            _ => return Err(self.error(ParseErrorKind::TypeDecl)),
        };
        Ok(self.parse_option_suffix(atom, start.start))
    }

    /// Apply any `?` suffixes.
    fn parse_option_suffix(
        &mut self,
        mut t: Spanned<TypeAnnotation>,
        start: usize,
    ) -> Spanned<TypeAnnotation> {
        while self.eat(Token::Question) {
            let span = start..self.last_end();
            t = Spanned::new(TypeAnnotation::Option(Box::new(t)), span);
        }
        t
    }

    /// Return-type position of a function declaration: one type or a
    /// parenthesized list.
    pub(crate) fn parse_type_list(&mut self) -> ParseResult<Vec<Spanned<TypeAnnotation>>> {
        self.parse_result_types()
    }
}
