mod compiler_tests;
mod loader_tests;
mod type_checker_tests;
mod types_tests;
mod upvalues_tests;

use crate::hir::TModule;
use crate::loader::InMemoryLoader;
use crate::type_checker::{check_module, TypeError};
use crate::Session;

/// Check a single module named `m` with an empty loader.
pub(crate) fn check(source: &str) -> Result<TModule, Vec<TypeError>> {
    let program = parser::parse(source).expect("parse failed");
    let mut session = Session::new();
    let mut loader = InMemoryLoader::new();
    check_module("m", source, &program, &mut session, &mut loader)
}

pub(crate) fn check_ok(source: &str) -> TModule {
    match check(source) {
        Ok(module) => module,
        Err(errors) => panic!("expected no errors, got {:?}", errors),
    }
}

/// First diagnostic message of a failing module.
pub(crate) fn first_error(source: &str) -> String {
    match check(source) {
        Ok(_) => panic!("expected a type error"),
        Err(errors) => errors[0].message.clone(),
    }
}

pub(crate) fn all_errors(source: &str) -> Vec<String> {
    match check(source) {
        Ok(_) => panic!("expected type errors"),
        Err(errors) => errors.into_iter().map(|e| e.message).collect(),
    }
}
