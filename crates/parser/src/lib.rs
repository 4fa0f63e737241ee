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

pub mod lexer;
pub mod parser;

#[cfg(test)]
mod tests;

use std::fmt;

use ast::Program;

pub use lexer::{LexError, LexicalError};
pub use parser::{ParseError, ParseErrorKind};

/// A syntax-phase failure: either a lexical error or a parse error. Both
/// stop at the first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(LexicalError),
    Parse(ParseError),
}

impl Error {
    pub fn span(&self) -> logos::Span {
        match self {
            Error::Lex(e) => e.span.clone(),
            Error::Parse(e) => e.span.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex(e) => write!(f, "{} [{}]", e.kind.message(), e.kind.label()),
            Error::Parse(e) => write!(f, "{} [{:?}]", e.kind.message(), e.kind),
        }
    }
}

impl std::error::Error for Error {}

/// Lex and parse a complete compilation unit.
pub fn parse(source: &str) -> Result<Program, Error> {
    let tokens = lexer::tokenize(source).map_err(Error::Lex)?;
    let mut parser = parser::Parser::new(source, tokens);
    parser.parse_program().map_err(Error::Parse)
}
