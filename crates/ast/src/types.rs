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

//! Syntactic type annotations as written in source. Resolution to semantic
//! types (including whether a bare name is a primitive, a record in this
//! module, or an unknown name) happens in the checker.

use std::fmt;

use crate::Spanned;

#[derive(Debug, Clone)]
pub enum TypeAnnotation {
    /// `nil`, `integer`, `string`, `Point`, ... — any single name.
    Name(String),

    /// `mod.Record`
    Qualified(String, String),

    /// `{T}`
    Array(Box<Spanned<TypeAnnotation>>),

    /// `{K: V}`. Parses, but the checker rejects it: the semantic type
    /// system has no map type.
    Map(Box<Spanned<TypeAnnotation>>, Box<Spanned<TypeAnnotation>>),

    /// `T -> U`, `(T1, T2) -> (U1, U2)`. Right-associative.
    Function {
        params: Vec<Spanned<TypeAnnotation>>,
        results: Vec<Spanned<TypeAnnotation>>,
    },

    /// `T?`
    Option(Box<Spanned<TypeAnnotation>>),
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAnnotation::Name(n) => f.write_str(n),
            TypeAnnotation::Qualified(m, n) => write!(f, "{}.{}", m, n),
            TypeAnnotation::Array(elem) => write!(f, "{{{}}}", elem.node),
            TypeAnnotation::Map(k, v) => write!(f, "{{{}: {}}}", k.node, v.node),
            TypeAnnotation::Function { params, results } => {
                fn list(f: &mut fmt::Formatter<'_>, ts: &[Spanned<TypeAnnotation>]) -> fmt::Result {
                    // a lone function type keeps its parentheses so that
                    // `(T -> U) -> V` does not read as `T -> (U -> V)`
                    if ts.len() == 1 && !matches!(ts[0].node, TypeAnnotation::Function { .. }) {
                        write!(f, "{}", ts[0].node)
                    } else {
                        f.write_str("(")?;
                        for (i, t) in ts.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", t.node)?;
                        }
                        f.write_str(")")
                    }
                }
                list(f, params)?;
                f.write_str(" -> ")?;
                // the result side of `->` associates right, so a function
                // result needs no parentheses
                if results.len() == 1 {
                    write!(f, "{}", results[0].node)
                } else {
                    f.write_str("(")?;
                    for (i, t) in results.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", t.node)?;
                    }
                    f.write_str(")")
                }
            }
            TypeAnnotation::Option(base) => {
                if matches!(base.node, TypeAnnotation::Function { .. }) {
                    write!(f, "({})?", base.node)
                } else {
                    write!(f, "{}?", base.node)
                }
            }
        }
    }
}
