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

use super::{all_errors, check_ok, first_error};
use crate::hir::*;
use crate::types::Type;

/// The body of the first source-level function in the module (skipping
/// the `R.new` constructors records synthesize).
fn func_body(module: &TModule) -> &TBlock {
    for value in &module.values {
        if let TValueDecl::Func(f) = value {
            if f.name.contains('.') {
                continue;
            }
            return &f.body;
        }
    }
    panic!("module has no function");
}

fn return_exp(module: &TModule) -> &TExp {
    match func_body(module).stmts.last() {
        Some(TStmt::Return(values)) => &values[0],
        other => panic!("expected Return, got {:?}", other),
    }
}

// ─── Numeric coercions ───────────────────────────────────────────────────────

#[test]
fn test_mixed_arithmetic_promotes_to_float() {
    let m = check_ok("function f(a: integer, b: float): float return a + b end");
    let ret = return_exp(&m);
    assert_eq!(ret.ty, Type::Float);
    match &ret.kind {
        TExpKind::Binop { lhs, rhs, .. } => {
            // the integer side gained an explicit cast
            assert!(matches!(
                lhs.kind,
                TExpKind::Coerce {
                    kind: CoerceKind::IntToFloat,
                    ..
                }
            ));
            assert!(matches!(rhs.kind, TExpKind::Local(_)));
        }
        other => panic!("expected Binop, got {:?}", other),
    }
}

#[test]
fn test_integer_arithmetic_stays_integer() {
    let m = check_ok("function f(a: integer, b: integer): integer return a * b end");
    assert_eq!(return_exp(&m).ty, Type::Integer);
}

#[test]
fn test_division_always_floats() {
    let m = check_ok("function f(a: integer, b: integer): float return a / b end");
    let ret = return_exp(&m);
    assert_eq!(ret.ty, Type::Float);
    match &ret.kind {
        TExpKind::Binop { lhs, rhs, .. } => {
            assert!(matches!(
                lhs.kind,
                TExpKind::Coerce {
                    kind: CoerceKind::IntToFloat,
                    ..
                }
            ));
            assert!(matches!(
                rhs.kind,
                TExpKind::Coerce {
                    kind: CoerceKind::IntToFloat,
                    ..
                }
            ));
        }
        other => panic!("expected Binop, got {:?}", other),
    }
}

#[test]
fn test_power_always_floats() {
    let m = check_ok("function power(a: float, b: float): float return a ^ b end");
    assert_eq!(return_exp(&m).ty, Type::Float);
}

#[test]
fn test_bitwise_requires_integers() {
    let m = check_ok("function f(a: integer, x: float): integer return a | x end");
    match &return_exp(&m).kind {
        TExpKind::Binop { rhs, .. } => assert!(matches!(
            rhs.kind,
            TExpKind::Coerce {
                kind: CoerceKind::FloatToInt,
                ..
            }
        )),
        other => panic!("expected Binop, got {:?}", other),
    }
    assert!(first_error("function f(s: string): integer return s | 1 end")
        .contains("bitwise operand"));
}

#[test]
fn test_arithmetic_on_strings_fails() {
    assert!(
        first_error("function f(s: string): integer return s + 1 end")
            .contains("invalid operands")
    );
}

// ─── Comparisons ─────────────────────────────────────────────────────────────

#[test]
fn test_integer_float_comparison_promotes() {
    // accepted, with implicit promotion of the integer side
    let m = check_ok("function f(a: integer, b: float): boolean return a < b end");
    assert_eq!(return_exp(&m).ty, Type::Boolean);
}

#[test]
fn test_string_ordering_ok_mixed_fails() {
    check_ok("function f(a: string, b: string): boolean return a < b end");
    assert!(
        first_error("function f(a: string, b: integer): boolean return a < b end")
            .contains("invalid operands")
    );
}

#[test]
fn test_equality_with_value_boxes_both() {
    let m = check_ok("function f(v: value, n: integer): boolean return v == n end");
    match &return_exp(&m).kind {
        TExpKind::Binop { rhs, .. } => assert!(matches!(
            rhs.kind,
            TExpKind::Coerce {
                kind: CoerceKind::ToValue,
                ..
            }
        )),
        other => panic!("expected Binop, got {:?}", other),
    }
}

// ─── Logical operators ───────────────────────────────────────────────────────

#[test]
fn test_and_with_boolean_coerces_other_side() {
    let m = check_ok("function f(b: boolean, n: integer): boolean return b and n end");
    assert_eq!(return_exp(&m).ty, Type::Boolean);
}

#[test]
fn test_and_same_type_keeps_type() {
    let m = check_ok("function f(a: integer, b: integer): integer return a and b end");
    assert_eq!(return_exp(&m).ty, Type::Integer);
}

#[test]
fn test_or_incompatible_types_fail() {
    assert!(
        first_error("function f(a: integer, s: string): integer return a or s end")
            .contains("invalid operands")
    );
}

// ─── Concatenation ───────────────────────────────────────────────────────────

#[test]
fn test_concat_coerces_numbers() {
    let m = check_ok("function f(n: integer, x: float): string return \"v\" .. n .. x end");
    match &return_exp(&m).kind {
        TExpKind::Concat { items } => {
            assert_eq!(items.len(), 3);
            assert!(items.iter().all(|i| i.ty == Type::String));
        }
        other => panic!("expected Concat, got {:?}", other),
    }
}

#[test]
fn test_concat_rejects_booleans() {
    assert!(
        first_error("function f(b: boolean): string return \"x\" .. b end")
            .contains("cannot concatenate")
    );
}

// ─── Length and indexing ─────────────────────────────────────────────────────

#[test]
fn test_length_of_array_and_string() {
    check_ok("function f(xs: {integer}, s: string): integer return #xs + #s end");
    assert!(first_error("function f(n: integer): integer return #n end")
        .contains("'#' requires"));
}

#[test]
fn test_index_coerces_to_integer() {
    let m = check_ok("function f(xs: {string}, i: float): string return xs[i] end");
    match &return_exp(&m).kind {
        TExpKind::ArrayGet { index, .. } => assert!(matches!(
            index.kind,
            TExpKind::Coerce {
                kind: CoerceKind::FloatToInt,
                ..
            }
        )),
        other => panic!("expected ArrayGet, got {:?}", other),
    }
}

#[test]
fn test_nil_assignment_into_array_is_deletion() {
    check_ok("function delete(array: {integer}, i: integer) array[i] = nil end");
}

#[test]
fn test_indexing_non_array_fails() {
    assert!(first_error("function f(n: integer): integer return n[1] end")
        .contains("cannot index"));
}

// ─── Initializer lists ───────────────────────────────────────────────────────

#[test]
fn test_initializer_needs_hint() {
    assert!(first_error("function f() local xs = {} end").contains("type hint"));
}

#[test]
fn test_array_initializer_with_hint() {
    check_ok("function f() local xs: {integer} = {1, 2, 3} end");
}

#[test]
fn test_record_initializer_field_coverage() {
    let errors = all_errors(
        "record P\n x: float\n y: float\n z: float\nend\n\
         function f() local p: P = {x = 1.0, w = 2.0} end",
    );
    // each missing field is reported individually, plus the unknown one
    assert!(errors.iter().any(|e| e.contains("no field 'w'")));
    assert!(errors.iter().any(|e| e.contains("missing field 'y'")));
    assert!(errors.iter().any(|e| e.contains("missing field 'z'")));
}

#[test]
fn test_array_of_nil_rejected() {
    assert!(first_error("function f(xs: {nil}) end").contains("arrays of nil"));
}

#[test]
fn test_map_type_rejected() {
    assert!(
        first_error("function f(m: {string: integer}) end").contains("map types")
    );
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[test]
fn test_record_constructor_and_field_access() {
    let m = check_ok(
        "record Point\n x: float\n y: float\nend\n\
         function f(): float\n local p = Point.new(1.0, 2.0)\n return p.x\nend",
    );
    assert_eq!(return_exp(&m).ty, Type::Float);
    assert_eq!(m.records.len(), 1);
    assert_eq!(m.records[0].fqtn, "m.Point");
    // the record's implicit constructor is a real top-level value, and
    // `Point.new(...)` calls it directly
    let ctor = m
        .values
        .iter()
        .position(|v| v.name() == "Point.new")
        .expect("missing the synthesized constructor");
    assert!(matches!(&m.values[ctor], TValueDecl::Func(f) if !f.exported));
    match &func_body(&m).stmts[0] {
        TStmt::Decl { value, .. } => {
            assert!(matches!(
                value.kind,
                TExpKind::CallFunc {
                    target: CallTarget::ModuleFunc(index),
                    ..
                } if index == ctor
            ));
        }
        other => panic!("expected Decl, got {:?}", other),
    }
}

#[test]
fn test_nominal_not_structural() {
    let errors = all_errors(
        "record A\n x: float\nend\n\
         record B\n x: float\nend\n\
         function f(a: A): B return a end",
    );
    assert!(errors[0].contains("expected m.B but found m.A"));
}

#[test]
fn test_method_calls_rejected() {
    assert!(
        first_error(
            "record P\n x: float\nend\nfunction f(p: P): float return p:getx() end"
        )
        .contains("have no methods")
    );
}

// ─── Value ───────────────────────────────────────────────────────────────────

#[test]
fn test_value_accepts_anything_and_extraction_is_checked() {
    let m = check_ok(
        "function fn(): integer\n local x: value = 1\n return x\nend",
    );
    // the return site gained a checked extraction
    assert!(matches!(
        return_exp(&m).kind,
        TExpKind::Coerce {
            kind: CoerceKind::FromValue,
            ..
        }
    ));
}

// ─── Options ─────────────────────────────────────────────────────────────────

#[test]
fn test_option_accepts_nil_and_base() {
    check_ok("function f(): integer?\n return nil\nend");
    check_ok("function f(): integer?\n return 1\nend");
}

#[test]
fn test_option_needs_narrowing() {
    assert!(
        first_error("function f(x: integer?): integer return x end")
            .contains("expected integer but found integer?")
    );
    check_ok("function f(x: integer?): integer return x as integer end");
}

// ─── Casts ───────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_cast() {
    assert!(first_error("function f(b: boolean): integer return b as integer end")
        .contains("cannot cast"));
}

#[test]
fn test_number_to_string_casts() {
    check_ok("function f(n: integer): string return n as string end");
    check_ok("function f(x: float): string return x as string end");
}

// ─── Calls and returns ───────────────────────────────────────────────────────

#[test]
fn test_call_arity() {
    assert!(
        first_error(
            "function g(a: integer, b: integer): integer return a end\n\
             function f(): integer return g(1) end"
        )
        .contains("expects 2 argument(s) but 1 given")
    );
}

#[test]
fn test_argument_coercion() {
    check_ok(
        "function g(x: float): float return x end\n\
         function f(): float return g(1) end",
    );
}

#[test]
fn test_spread_supplies_all_values() {
    check_ok(
        "function g(): (integer, integer) return 1, 2 end\n\
         function h(a: integer, b: integer): integer return a + b end\n\
         function f(): integer return h(g()) end",
    );
}

#[test]
fn test_adjusted_call_supplies_one_value() {
    assert!(
        first_error(
            "function g(): (integer, integer) return 1, 2 end\n\
             function h(a: integer, b: integer): integer return a + b end\n\
             function f(): integer return h((g())) end"
        )
        .contains("expects 2 argument(s) but 1 given")
    );
}

#[test]
fn test_multi_assignment_from_call() {
    check_ok(
        "function g(): (integer, string) return 1, \"x\" end\n\
         function f(): integer\n\
             local a: integer = 0\n\
             local s: string = \"\"\n\
             a, s = g()\n\
             return a\n\
         end",
    );
}

#[test]
fn test_calling_non_function() {
    assert!(first_error("function f(n: integer): integer return n(1) end")
        .contains("cannot call"));
}

#[test]
fn test_first_class_functions() {
    check_ok(
        "function g(x: integer): integer return x end\n\
         function f(): integer\n\
             local h: integer -> integer = g\n\
             return h(1)\n\
         end",
    );
}

// ─── Return coverage ─────────────────────────────────────────────────────────

#[test]
fn test_return_coverage_if_else() {
    check_ok(
        "function f(b: boolean): integer\n\
             if b then return 1 else return 2 end\n\
         end",
    );
}

#[test]
fn test_return_coverage_missing_else() {
    assert!(
        first_error(
            "function f(b: boolean): integer\n\
                 if b then return 1 end\n\
             end"
        )
        .contains("without returning")
    );
}

#[test]
fn test_loops_never_count_as_returning() {
    assert!(
        first_error(
            "function f(): integer\n\
                 while true do return 1 end\n\
             end"
        )
        .contains("without returning")
    );
}

// ─── Top-level rules ─────────────────────────────────────────────────────────

#[test]
fn test_assign_to_toplevel_function() {
    assert_eq!(
        first_error("function foo()\n foo = 2\nend"),
        "attempting to assign to toplevel constant function foo"
    );
}

#[test]
fn test_duplicate_declarations() {
    assert!(first_error("local a: integer = 1\nlocal a: integer = 2")
        .contains("duplicate declaration"));
}

#[test]
fn test_toplevel_initializer_must_be_constant() {
    assert!(
        first_error("function g(): integer return 1 end\nlocal a: integer = g()")
            .contains("not a constant expression")
    );
    check_ok("local a: integer = 1\nlocal xs: {integer} = {1, 2}");
}

#[test]
fn test_undefined_name() {
    assert!(first_error("function f(): integer return nope end")
        .contains("undefined name 'nope'"));
}

#[test]
fn test_nil_local_needs_annotation() {
    assert!(first_error("function f() local x = nil end").contains("type annotation"));
}

// ─── For loops ───────────────────────────────────────────────────────────────

#[test]
fn test_for_default_step_matches_control_type() {
    let m = check_ok("function f()\n for x = 1.0, 10.0 do end\nend");
    match &func_body(&m).stmts[0] {
        TStmt::NumFor { step, .. } => assert!(matches!(step.kind, TExpKind::Float(_))),
        other => panic!("expected NumFor, got {:?}", other),
    }
}

#[test]
fn test_for_control_must_be_numeric() {
    assert!(
        first_error("function f()\n for s = \"a\", \"b\" do end\nend")
            .contains("must be a number")
    );
}

#[test]
fn test_for_negative_constant_step() {
    let m = check_ok(
        "function forstep(): integer\n\
             local v = 0\n\
             for i = 10, 1, -2 do v = v + i end\n\
             return v\n\
         end",
    );
    match &func_body(&m).stmts[1] {
        TStmt::NumFor { step, .. } => {
            assert!(matches!(step.kind, TExpKind::Integer(-2)));
        }
        other => panic!("expected NumFor, got {:?}", other),
    }
}
