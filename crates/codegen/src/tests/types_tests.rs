use crate::types::*;

fn sample_module() -> ModuleType {
    ModuleType {
        name: "test".to_string(),
        members: vec![
            (
                "Point".to_string(),
                MemberType::Record(RecordType {
                    fqtn: "test.Point".to_string(),
                    fields: vec![
                        ("x".to_string(), Type::Float),
                        ("y".to_string(), Type::Float),
                    ],
                }),
            ),
            (
                "f".to_string(),
                MemberType::Func {
                    params: vec![],
                    rets: vec![Type::Float, Type::Float],
                },
            ),
            (
                "xs".to_string(),
                MemberType::Var(Type::array(Type::option(Type::Integer))),
            ),
        ],
    }
}

#[test]
fn test_serialization_notation() {
    let text = serialize_module_type(&sample_module());
    assert!(text.starts_with("Module('test',{"));
    assert!(text.contains("f = ModuleMember('test', 'f', Function({},{Float(),Float()},false))"));
    assert!(text.contains("Field('test.Point', 'x', Float(), 1)"));
    assert!(text.contains("new = StaticMethod('test.Point', 'new',{Float(),Float()},{Nominal('test.Point')})"));
    assert!(text.contains("Array(Option(Integer()))"));
}

#[test]
fn test_serialize_parse_roundtrip() {
    let module = sample_module();
    let text = serialize_module_type(&module);
    let parsed = parse_module_type(&text).expect("parse failed");
    assert_eq!(parsed, module);
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(parse_module_type("Module('x',{").is_none());
    assert!(parse_module_type("nonsense").is_none());
    assert!(parse_module_type("").is_none());
}

#[test]
fn test_registry_interns_by_fqtn() {
    let mut registry = TypeRegistry::new();
    let record = RecordType {
        fqtn: "m.R".to_string(),
        fields: vec![("n".to_string(), Type::Integer)],
    };
    registry.register(record.clone());
    // a second registration of the same name is a no-op
    registry.register(RecordType {
        fqtn: "m.R".to_string(),
        fields: vec![],
    });
    assert_eq!(registry.get("m.R"), Some(&record));
    assert!(registry.get("m.S").is_none());
}

#[test]
fn test_nominal_equality_is_by_name() {
    assert_eq!(
        Type::Nominal("m.R".to_string()),
        Type::Nominal("m.R".to_string())
    );
    assert_ne!(
        Type::Nominal("m.R".to_string()),
        Type::Nominal("n.R".to_string())
    );
}

#[test]
fn test_gc_classification() {
    assert!(Type::String.is_gc());
    assert!(Type::array(Type::Integer).is_gc());
    assert!(Type::Value.is_gc());
    assert!(Type::option(Type::Integer).is_gc());
    assert!(!Type::Integer.is_gc());
    assert!(!Type::Boolean.is_gc());
    assert!(!Type::Nil.is_gc());
}
