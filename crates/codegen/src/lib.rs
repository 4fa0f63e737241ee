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

pub mod compiler;
pub mod hir;
pub mod loader;
pub mod symbols;
pub mod type_checker;
pub mod types;
pub mod upvalues;

#[cfg(test)]
mod tests;

use ast::loc;
use type_checker::TypeError;
use types::{ModuleType, TypeRegistry};

/// Per-compilation-session state, threaded explicitly through the
/// pipeline: the nominal type registry shared by every module checked in
/// the session. Import memoization lives in the loader.
#[derive(Default)]
pub struct Session {
    pub registry: TypeRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct CompiledModule {
    /// The generated C translation unit.
    pub c_source: String,
    pub module_type: ModuleType,
    /// Serialized module type, for the `.types` sidecar.
    pub type_text: String,
}

#[derive(Debug)]
pub enum CompileError {
    Syntax(parser::Error),
    Check(Vec<TypeError>),
}

impl CompileError {
    /// Render diagnostics as `file:line:col: message` lines.
    pub fn render(&self, file: &str, source: &str) -> Vec<String> {
        match self {
            CompileError::Syntax(e) => {
                vec![format!(
                    "{}: syntax error: {}",
                    loc::describe(file, source, e.span().start),
                    e
                )]
            }
            CompileError::Check(errors) => errors
                .iter()
                .map(|e| {
                    format!(
                        "{}: type error: {}",
                        loc::describe(file, source, e.span.start),
                        e.message
                    )
                })
                .collect(),
        }
    }
}

/// Compile one module from source text to C: parse, check, lay out the
/// globals table, and emit. The caller owns writing the artifacts and
/// invoking the C toolchain.
pub fn compile(
    module_name: &str,
    source: &str,
    session: &mut Session,
    loader: &mut dyn loader::Loader,
) -> Result<CompiledModule, CompileError> {
    let program = parser::parse(source).map_err(CompileError::Syntax)?;
    let module = type_checker::check_module(module_name, source, &program, session, loader)
        .map_err(CompileError::Check)?;
    let layout = upvalues::layout_module(&module);
    let c_source = compiler::emit_module(&module, &layout);
    let type_text = types::serialize_module_type(&module.module_type);
    Ok(CompiledModule {
        c_source,
        module_type: module.module_type,
        type_text,
    })
}

/// Parse and check only, returning the typed module (used by
/// `--print-types` and by the in-memory loader).
pub fn check_only(
    module_name: &str,
    source: &str,
    session: &mut Session,
    loader: &mut dyn loader::Loader,
) -> Result<hir::TModule, CompileError> {
    let program = parser::parse(source).map_err(CompileError::Syntax)?;
    type_checker::check_module(module_name, source, &program, session, loader)
        .map_err(CompileError::Check)
}
