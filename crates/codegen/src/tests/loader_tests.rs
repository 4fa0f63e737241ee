use crate::loader::{ImportError, InMemoryLoader, Loader};
use crate::types::{MemberType, Type};
use crate::Session;

#[test]
fn test_load_typed_module() {
    let mut session = Session::new();
    let mut loader = InMemoryLoader::new();
    loader.add("dep", "function id(x: integer): integer return x end");
    let ty = loader.load(&mut session, "dep").expect("load failed");
    assert_eq!(ty.name, "dep");
    match ty.member("id") {
        Some(MemberType::Func { params, rets }) => {
            assert_eq!(params, &[Type::Integer]);
            assert_eq!(rets, &[Type::Integer]);
        }
        other => panic!("expected Func member, got {:?}", other),
    }
    // a second load is memoized
    assert!(loader.load(&mut session, "dep").is_ok());
}

#[test]
fn test_missing_module() {
    let mut session = Session::new();
    let mut loader = InMemoryLoader::new();
    match loader.load(&mut session, "ghost") {
        Err(ImportError::NotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_broken_module_reports_failure() {
    let mut session = Session::new();
    let mut loader = InMemoryLoader::new();
    loader.add("bad", "function f(): integer return \"nope\" end");
    match loader.load(&mut session, "bad") {
        Err(ImportError::Failed(name, why)) => {
            assert_eq!(name, "bad");
            assert!(why.contains("expected integer"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[test]
fn test_circular_detection() {
    let mut session = Session::new();
    let mut loader = InMemoryLoader::new();
    loader.add("a", "local b = import \"b\"");
    loader.add("b", "local a = import \"a\"");
    match loader.load(&mut session, "a") {
        Err(ImportError::Failed(_, why)) => {
            assert!(why.contains("circular reference to module"));
        }
        other => panic!("expected Failed from the cycle, got {:?}", other),
    }
    assert_eq!(
        ImportError::Circular("x".to_string()).to_string(),
        "circular reference to module 'x'"
    );
}

#[test]
fn test_records_of_loaded_module_enter_registry() {
    let mut session = Session::new();
    let mut loader = InMemoryLoader::new();
    loader.add("geo", "record Point\n x: float\n y: float\nend");
    loader.load(&mut session, "geo").expect("load failed");
    // loading happens through the checker, which registers the records
    let source = "local geo = import \"geo\"\n\
                  function f(p: geo.Point): float return p.x end";
    let program = parser::parse(source).expect("parse failed");
    let module =
        crate::type_checker::check_module("m", source, &program, &mut session, &mut loader)
            .expect("check failed");
    assert!(session.registry.get("geo.Point").is_some());
    assert_eq!(module.imports.len(), 1);
}
