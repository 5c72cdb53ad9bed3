//! Field and action validation during initialization.

use crate::compile;
use crate::errors::{CompileError, SemanticError};

#[test]
fn test_action_targets_must_exist() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A { raw str; } = "a"@capture:missing;
        }
        "#,
    )
    .expect_err("the unknown target should be rejected");

    match error {
        CompileError::Semantic(SemanticError::UnknownActionTarget { target, .. }) => {
            assert_eq!(target, "missing");
        }
        other => panic!("expected an unknown action target, got: {other}"),
    }
}

#[test]
fn test_action_kind_must_match_field_kind() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A { flag seen; } = "a"@capture:seen;
        }
        "#,
    )
    .expect_err("capturing into a flag should be rejected");

    match error {
        CompileError::Semantic(SemanticError::ActionFieldKindMismatch { expected, .. }) => {
            assert_eq!(expected, "raw");
        }
        other => panic!("expected a field kind mismatch, got: {other}"),
    }
}

#[test]
fn test_flag_actions_accept_flag_fields() {
    compile(
        r#"
        finite automaton M {
            root terminal A { flag seen; raw str; } = "a"@flag:seen@capture:str;
        }
        "#,
    )
    .expect("well-typed actions should pass");
}

#[test]
fn test_actions_are_forbidden_in_regex_statements() {
    let error = compile(
        r#"
        finite automaton M {
            regex Digits = ["0"-"9"]+@capture:x;
            root terminal Num = Digits;
        }
        "#,
    )
    .expect_err("actions inside a regex statement should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::ActionsForbidden { .. })
    ));
}

#[test]
fn test_field_names_must_be_unique_within_a_statement() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A { raw x; flag x; } = "a";
        }
        "#,
    )
    .expect_err("the duplicate field should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::FieldRedeclaration { .. })
    ));
}

#[test]
fn test_field_names_must_not_shadow_category_fields() {
    let error = compile(
        r#"
        finite automaton M {
            category Token { raw value; };
            root terminal Word : Token { raw value; } = ["a"-"z"]+;
        }
        "#,
    )
    .expect_err("shadowing a category field should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::FieldRedeclaration { .. })
    ));
}

#[test]
fn test_typed_fields_must_resolve() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A { Missing item x; } = "a";
        }
        "#,
    )
    .expect_err("the unresolvable field type should be rejected");

    match error {
        CompileError::Semantic(SemanticError::UnknownFieldType { type_name, .. }) => {
            assert_eq!(type_name, "Missing");
        }
        other => panic!("expected an unknown field type, got: {other}"),
    }
}

#[test]
fn test_typed_set_payload_must_match_field_type() {
    let error = compile(
        r#"
        LL(1) parser P on Tok {
            root production R { A item slot; } = B@set:slot;
        }
        finite automaton Tok {
            root terminal A = "a";
            root terminal B = "b";
        }
        "#,
    )
    .expect_err("setting a B into an A slot should be rejected");

    match error {
        CompileError::Semantic(SemanticError::TypedActionTypeMismatch {
            declared, actual, ..
        }) => {
            assert_eq!(declared, "A");
            assert_eq!(actual, "B");
        }
        other => panic!("expected a typed action mismatch, got: {other}"),
    }
}

#[test]
fn test_typed_set_accepts_matching_reference() {
    compile(
        r#"
        LL(1) parser P on Tok {
            root production R { A item slot; } = A@set:slot;
        }
        finite automaton Tok {
            root terminal A = "a";
        }
        "#,
    )
    .expect("a matching typed action should pass");
}

#[test]
fn test_literals_are_rejected_off_raw_input() {
    let error = compile(
        r#"
        finite automaton Tok {
            root terminal A = "a";
        }
        finite automaton Upper on Tok {
            root terminal X = "a";
        }
        "#,
    )
    .expect_err("a literal on a non-raw machine should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::LiteralOnNonRawInput { .. })
    ));
}

#[test]
fn test_unknown_rule_reference_is_rejected() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A = Missing;
        }
        "#,
    )
    .expect_err("the unknown reference should be rejected");

    match error {
        CompileError::Semantic(SemanticError::UnknownReference { name, .. }) => {
            assert_eq!(name, "Missing");
        }
        other => panic!("expected an unknown reference, got: {other}"),
    }
}

#[test]
fn test_pattern_actions_operate_on_enclosing_fields() {
    compile(
        r#"
        finite automaton M {
            pattern Spaces { flag spaced; } = " "+@flag:spaced;
            root terminal A = "a";
        }
        "#,
    )
    .expect("pattern actions on own fields should pass");
}
