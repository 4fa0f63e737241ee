use ast::expr::{Expr, InitEntry, Var};
use ast::op::{BinOp, UnOp};
use ast::stmt::Stmt;
use ast::types::TypeAnnotation;
use ast::{pretty, Program, TopLevel};

use crate::parser::ParseErrorKind;
use crate::{parse, Error};

fn parse_ok(source: &str) -> Program {
    parse(source).expect("parse failed")
}

fn parse_err(source: &str) -> ParseErrorKind {
    match parse(source) {
        Err(Error::Parse(e)) => e.kind,
        other => panic!("expected a parse error, got {:?}", other),
    }
}

/// Parse the body of `function f() ... end` and return its statements.
fn parse_body(body: &str) -> Vec<Stmt> {
    let src = format!("function f()\n{}\nend", body);
    let p = parse_ok(&src);
    match &p.items[0].node {
        TopLevel::Func(f) => f.body.stmts.iter().map(|s| s.node.clone()).collect(),
        other => panic!("expected Func, got {:?}", other),
    }
}

fn parse_expr(expr: &str) -> Expr {
    let stmts = parse_body(&format!("local x = {}", expr));
    match &stmts[0] {
        Stmt::Decl { value, .. } => value.node.clone(),
        other => panic!("expected Decl, got {:?}", other),
    }
}

#[test]
fn test_top_level_var() {
    let p = parse_ok("local a: integer = 1");
    match &p.items[0].node {
        TopLevel::Var(v) => {
            assert!(!v.exported);
            assert_eq!(v.name, "a");
            assert!(matches!(v.value.node, Expr::Integer(1)));
        }
        other => panic!("expected Var, got {:?}", other),
    }

    let p = parse_ok("a = 1.5");
    match &p.items[0].node {
        TopLevel::Var(v) => assert!(v.exported),
        other => panic!("expected Var, got {:?}", other),
    }
}

#[test]
fn test_imports() {
    let p = parse_ok("local foo = import \"foo.bar\"\nlocal c = foreign import \"stdio.h\"");
    match &p.items[0].node {
        TopLevel::Import { local_name, module } => {
            assert_eq!(local_name, "foo");
            assert_eq!(module, "foo.bar");
        }
        other => panic!("expected Import, got {:?}", other),
    }
    match &p.items[1].node {
        TopLevel::ForeignImport { local_name, header } => {
            assert_eq!(local_name, "c");
            assert_eq!(header, "stdio.h");
        }
        other => panic!("expected ForeignImport, got {:?}", other),
    }
}

#[test]
fn test_function_decl() {
    let p = parse_ok("function add(x: integer, y: integer): integer return x + y end");
    match &p.items[0].node {
        TopLevel::Func(f) => {
            assert!(f.exported);
            assert_eq!(f.name, "add");
            assert_eq!(f.params.len(), 2);
            assert_eq!(f.params[0].name, "x");
            assert_eq!(f.return_types.len(), 1);
            assert_eq!(f.body.stmts.len(), 1);
            assert!(matches!(f.body.stmts[0].node, Stmt::Return { .. }));
        }
        other => panic!("expected Func, got {:?}", other),
    }
}

#[test]
fn test_multi_return_types() {
    let p = parse_ok("function f(): (integer, float) return 1, 2.0 end");
    match &p.items[0].node {
        TopLevel::Func(f) => {
            assert_eq!(f.return_types.len(), 2);
            match &f.body.stmts[0].node {
                Stmt::Return { values } => assert_eq!(values.len(), 2),
                other => panic!("expected Return, got {:?}", other),
            }
        }
        other => panic!("expected Func, got {:?}", other),
    }
}

#[test]
fn test_record_decl() {
    let p = parse_ok("record Point\n    x: float\n    y: float\nend");
    // a record declaration produces two top-level items: the record type
    // and its implicit `new` static constructor
    assert_eq!(p.items.len(), 2);
    match &p.items[0].node {
        TopLevel::Record(r) => {
            assert_eq!(r.name, "Point");
            assert_eq!(r.fields.len(), 2);
            assert_eq!(r.fields[0].name, "x");
            assert_eq!(r.fields[1].name, "y");
        }
        other => panic!("expected Record, got {:?}", other),
    }
    match &p.items[1].node {
        TopLevel::Func(f) => {
            assert_eq!(f.name, "Point.new");
            assert!(!f.exported);
            assert_eq!(f.params.len(), 2);
            assert_eq!(f.params[0].name, "x");
            assert_eq!(f.params[1].name, "y");
            assert!(
                matches!(&f.return_types[0].node, TypeAnnotation::Name(n) if n == "Point")
            );
            assert_eq!(f.body.stmts.len(), 1);
            match &f.body.stmts[0].node {
                Stmt::Return { values } => match &values[0].node {
                    Expr::InitList(entries) => {
                        assert_eq!(entries.len(), 2);
                        assert!(
                            matches!(&entries[0], InitEntry::Named { name, .. } if name == "x")
                        );
                    }
                    other => panic!("expected InitList, got {:?}", other),
                },
                other => panic!("expected Return, got {:?}", other),
            }
        }
        other => panic!("expected the implicit constructor, got {:?}", other),
    }
}

#[test]
fn test_statements() {
    let stmts = parse_body(
        "local i = 0\n\
         while i < 10 do i = i + 1 end\n\
         repeat i = i - 1 until i == 0\n\
         if i > 0 then i = 1 elseif i < 0 then i = 2 else i = 3 end\n\
         do i = 4 end",
    );
    assert!(matches!(stmts[0], Stmt::Decl { .. }));
    assert!(matches!(stmts[1], Stmt::While { .. }));
    assert!(matches!(stmts[2], Stmt::Repeat { .. }));
    match &stmts[3] {
        Stmt::If { arms, else_body } => {
            assert_eq!(arms.len(), 2);
            assert!(else_body.is_some());
        }
        other => panic!("expected If, got {:?}", other),
    }
    assert!(matches!(stmts[4], Stmt::Do(_)));
}

#[test]
fn test_numeric_for() {
    let stmts = parse_body("for i = 10, 1, -2 do f() end");
    match &stmts[0] {
        Stmt::For {
            var, start, finish, step, ..
        } => {
            assert_eq!(var, "i");
            assert!(matches!(start.node, Expr::Integer(10)));
            assert!(matches!(finish.node, Expr::Integer(1)));
            // the negated literal folds to a constant
            assert!(matches!(step.as_ref().map(|s| &s.node), Some(Expr::Integer(-2))));
        }
        other => panic!("expected For, got {:?}", other),
    }
}

#[test]
fn test_multi_assignment() {
    let stmts = parse_body("a, b[1], c.x = f(), 2");
    match &stmts[0] {
        Stmt::Assign { targets, values } => {
            assert_eq!(targets.len(), 3);
            assert!(matches!(targets[0].node, Var::Name(_)));
            assert!(matches!(targets[1].node, Var::Bracket { .. }));
            assert!(matches!(targets[2].node, Var::Dot { .. }));
            assert_eq!(values.len(), 2);
        }
        other => panic!("expected Assign, got {:?}", other),
    }
}

#[test]
fn test_precedence() {
    // `*` binds tighter than `+`
    match parse_expr("1 + 2 * 3") {
        Expr::Binop { op: BinOp::Add, rhs, .. } => {
            assert!(matches!(rhs.node, Expr::Binop { op: BinOp::Mul, .. }));
        }
        other => panic!("expected Add at the top, got {:?}", other),
    }
    // comparison binds looser than arithmetic
    match parse_expr("a + 1 < b * 2") {
        Expr::Binop { op: BinOp::Lt, .. } => {}
        other => panic!("expected Lt at the top, got {:?}", other),
    }
    // `^` is right-associative
    match parse_expr("2 ^ 3 ^ 4") {
        Expr::Binop { op: BinOp::Pow, lhs, rhs } => {
            assert!(matches!(lhs.node, Expr::Integer(2)));
            assert!(matches!(rhs.node, Expr::Binop { op: BinOp::Pow, .. }));
        }
        other => panic!("expected Pow at the top, got {:?}", other),
    }
    // unary binds looser than `^`: -x^2 == -(x^2)
    match parse_expr("-x ^ 2") {
        Expr::Unop { op: UnOp::Neg, operand } => {
            assert!(matches!(operand.node, Expr::Binop { op: BinOp::Pow, .. }));
        }
        other => panic!("expected Neg at the top, got {:?}", other),
    }
}

#[test]
fn test_concat_flattens() {
    match parse_expr("a .. b .. c") {
        Expr::Concat { items } => assert_eq!(items.len(), 3),
        other => panic!("expected Concat, got {:?}", other),
    }
}

#[test]
fn test_concat_folds_string_literals() {
    match parse_expr("\"foo\" .. \"bar\" .. \"baz\"") {
        Expr::String(bytes) => assert_eq!(bytes, b"foobarbaz"),
        other => panic!("expected folded String, got {:?}", other),
    }
    // a non-literal operand keeps the chain
    match parse_expr("\"foo\" .. x") {
        Expr::Concat { items } => assert_eq!(items.len(), 2),
        other => panic!("expected Concat, got {:?}", other),
    }
}

#[test]
fn test_call_suffixes() {
    match parse_expr("m.f(1)[2]:g(3)") {
        Expr::MethodCall { receiver, method, args } => {
            assert_eq!(method, "g");
            assert_eq!(args.len(), 1);
            assert!(matches!(receiver.node, Expr::Var(Var::Bracket { .. })));
        }
        other => panic!("expected MethodCall, got {:?}", other),
    }
}

#[test]
fn test_paren_adjusts_only_calls() {
    // parentheses around a call are an adjustment to one value
    assert!(matches!(parse_expr("(f())"), Expr::Paren(_)));
    // around anything else they disappear
    assert!(matches!(parse_expr("(x)"), Expr::Var(Var::Name(_))));
}

#[test]
fn test_cast() {
    match parse_expr("x as float") {
        Expr::Cast { to, .. } => assert!(matches!(to.node, TypeAnnotation::Name(_))),
        other => panic!("expected Cast, got {:?}", other),
    }
    // casts bind tighter than `^`
    match parse_expr("2 ^ x as float") {
        Expr::Binop { op: BinOp::Pow, rhs, .. } => {
            assert!(matches!(rhs.node, Expr::Cast { .. }));
        }
        other => panic!("expected Pow at the top, got {:?}", other),
    }
}

#[test]
fn test_init_lists() {
    match parse_expr("{1, 2, 3}") {
        Expr::InitList(entries) => {
            assert_eq!(entries.len(), 3);
            assert!(matches!(entries[0], InitEntry::Positional(_)));
        }
        other => panic!("expected InitList, got {:?}", other),
    }
    match parse_expr("{x = 1.0, y = 2.0}") {
        Expr::InitList(entries) => {
            assert!(matches!(&entries[0], InitEntry::Named { name, .. } if name == "x"));
        }
        other => panic!("expected InitList, got {:?}", other),
    }
}

#[test]
fn test_type_annotations() {
    let p = parse_ok("function f(a: {integer}, b: mod.Rec, c: integer?, g: (integer, float) -> string) end");
    match &p.items[0].node {
        TopLevel::Func(f) => {
            assert!(matches!(f.params[0].annotation.node, TypeAnnotation::Array(_)));
            assert!(matches!(f.params[1].annotation.node, TypeAnnotation::Qualified(..)));
            assert!(matches!(f.params[2].annotation.node, TypeAnnotation::Option(_)));
            match &f.params[3].annotation.node {
                TypeAnnotation::Function { params, results } => {
                    assert_eq!(params.len(), 2);
                    assert_eq!(results.len(), 1);
                }
                other => panic!("expected Function type, got {:?}", other),
            }
        }
        other => panic!("expected Func, got {:?}", other),
    }
}

#[test]
fn test_function_type_right_associative() {
    let p = parse_ok("function f(g: integer -> float -> string) end");
    match &p.items[0].node {
        TopLevel::Func(f) => match &f.params[0].annotation.node {
            TypeAnnotation::Function { results, .. } => {
                assert!(matches!(results[0].node, TypeAnnotation::Function { .. }));
            }
            other => panic!("expected Function type, got {:?}", other),
        },
        other => panic!("expected Func, got {:?}", other),
    }
}

#[test]
fn test_first_error_wins() {
    assert_eq!(parse_err("function f( local"), ParseErrorKind::NameParam);
    assert_eq!(
        parse_err("function f() while true g() end end"),
        ParseErrorKind::DoWhile
    );
    assert_eq!(parse_err("function f() x + 1 end"), ParseErrorKind::ExpStat);
    assert_eq!(parse_err("local = 1"), ParseErrorKind::NameDecl);
}

#[test]
fn test_return_must_end_block() {
    assert_eq!(
        parse_err("function f() return 1 local x = 2 end"),
        ParseErrorKind::EndOfBlockAfterReturn
    );
    // a semicolon after return is fine
    parse_ok("function f(): integer return 1; end");
}

#[test]
fn test_reserved_keywords() {
    assert_eq!(parse_err("local break = 1"), ParseErrorKind::ReservedName);
}

#[test]
fn test_roundtrip_through_printer() {
    let sources = [
        "local a: integer = 1",
        "function add(x: integer, y: integer): integer return x + y end",
        "function f()\n  local xs: {integer} = {1, 2, 3}\n  xs[1] = nil\nend",
        "record Point\n x: float\n y: float\nend",
        "function g(): (integer, float)\n  if x > 1 then return 1, 2.0 else return 3, 4.0 end\nend",
        "function h()\n  for i = 10, 1, -2 do\n    v = v + i * 2 ^ i\n  end\nend",
        "function k(): string return \"a\" .. x .. \"\\255\" end",
        "function m()\n  local p = Point.new(1.0, 2.0)\n  p.x, p.y = (f()), g(p)\nend",
        "local fs: (integer -> float)? = nil",
        "function w(v: value): boolean return not (v as boolean) end",
    ];
    for src in sources {
        let once = pretty::program(&parse_ok(src));
        let twice = pretty::program(&parse_ok(&once));
        assert_eq!(once, twice, "round-trip failed for {:?}", src);
    }
}
