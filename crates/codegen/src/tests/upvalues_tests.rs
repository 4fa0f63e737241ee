use super::check_ok;
use crate::upvalues::layout_module;

#[test]
fn test_slots_follow_declaration_order_after_literals() {
    let module = check_ok(
        "local a: integer = 1\n\
         function f(): string return \"hello\" .. \"x\" .. a end\n\
         local b: integer = 2",
    );
    let layout = layout_module(&module);
    // literals occupy the pool prefix, in appearance order
    assert_eq!(layout.literals, vec![b"hello".to_vec(), b"x".to_vec()]);
    // values follow, in declaration order: a, f, b
    assert_eq!(layout.value_slots, vec![2, 3, 4]);
    assert_eq!(layout.slot_count(), 5);
}

#[test]
fn test_literals_are_shared() {
    let module = check_ok(
        "function f(): string return \"dup\" end\n\
         function g(): string return \"dup\" end\n\
         function h(): string return \"other\" end",
    );
    let layout = layout_module(&module);
    assert_eq!(layout.literals.len(), 2);
    assert_eq!(layout.literal_slot(b"dup"), Some(0));
    assert_eq!(layout.literal_slot(b"other"), Some(1));
}

#[test]
fn test_referenced_slots_track_globals() {
    let module = check_ok(
        "local counter: integer = 0\n\
         function bump(): integer\n\
             counter = counter + 1\n\
             return counter\n\
         end\n\
         function twice(): integer\n\
             bump()\n\
             return bump()\n\
         end",
    );
    let layout = layout_module(&module);
    // no literals: counter=0, bump=1, twice=2
    assert_eq!(layout.value_slots, vec![0, 1, 2]);
    // bump touches counter's slot; twice touches bump's slot
    assert!(layout.referenced_slots[1].contains(&0));
    assert!(layout.referenced_slots[2].contains(&1));
    assert!(!layout.referenced_slots[2].contains(&0));
    // variables have empty reference sets
    assert!(layout.referenced_slots[0].is_empty());
}

#[test]
fn test_var_initializer_strings_stay_out_of_pool() {
    let module = check_ok("greeting = \"hi\"\nfunction f(): string return \"body\" end");
    let layout = layout_module(&module);
    // only function-body literals are interned
    assert_eq!(layout.literals, vec![b"body".to_vec()]);
}
