//! Linking, defaults, and idempotency of tree initialization.

use crate::compile;
use crate::errors::{CompileError, SemanticError};
use crate::semantic::{Rootness, Statement, Terminality};

#[test]
fn test_initialization_is_idempotent() {
    let mut tree = compile(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal B = "b";
        }
        "#,
    )
    .expect("grammar should compile");

    let indices_before: Vec<u32> = tree.machines["M"]
        .statements
        .values()
        .filter_map(|s| s.as_production())
        .map(|p| p.terminal_index)
        .collect();
    let states_before = tree.machines["M"]
        .pseudo_dfa
        .as_ref()
        .expect("a pseudo-DFA")
        .automaton
        .states
        .len();

    tree.initialize().expect("re-initialization is a no-op");

    let indices_after: Vec<u32> = tree.machines["M"]
        .statements
        .values()
        .filter_map(|s| s.as_production())
        .map(|p| p.terminal_index)
        .collect();
    let states_after = tree.machines["M"]
        .pseudo_dfa
        .as_ref()
        .expect("a pseudo-DFA")
        .automaton
        .states
        .len();

    assert_eq!(indices_before, indices_after);
    assert_eq!(states_before, states_after);
}

#[test]
fn test_rule_reference_cycle_is_rejected_in_finite_automata() {
    let error = compile(
        r#"
        finite automaton M {
            terminal P = Q;
            terminal Q = P;
        }
        "#,
    )
    .expect_err("the P-Q cycle should be rejected");

    match error {
        CompileError::Semantic(SemanticError::RuleReferenceCycle { path, start, end }) => {
            assert_eq!(path, "P-Q");
            assert_ne!(start, end);
        }
        other => panic!("expected a rule reference cycle, got: {other}"),
    }
}

#[test]
fn test_rule_recursion_is_permitted_in_parsers() {
    compile(
        r#"
        LL(1) parser P {
            root production R = "(" R ")" | "x";
        }
        "#,
    )
    .expect("bracket recursion is legal in a parser");
}

#[test]
fn test_machine_flags_fill_unspecified_properties() {
    let tree = compile(
        r#"
        finite automaton M with productions_terminal_by_default, productions_root_by_default {
            A = "a";
            B = "b";
        }
        "#,
    )
    .expect("grammar should compile");

    for statement in tree.machines["M"].statements.values() {
        let production = statement.as_production().expect("a production");
        assert_eq!(production.terminality, Terminality::Terminal);
        assert_eq!(production.rootness, Rootness::AcceptRoot);
        assert!(production.terminal_index > 0);
    }
}

#[test]
fn test_explicit_properties_win_over_flags() {
    let tree = compile(
        r#"
        finite automaton M with productions_terminal_by_default {
            root terminal A = "a";
            nonterminal B = A;
        }
        "#,
    )
    .expect("grammar should compile");

    let b = tree.machines["M"].statements["B"]
        .as_production()
        .expect("a production");
    assert_eq!(b.terminality, Terminality::Nonterminal);
    assert_eq!(b.terminal_index, 0);
}

#[test]
fn test_machine_hierarchy_cycle_is_rejected() {
    let error = compile(
        r#"
        finite automaton A on B { root terminal X = Y; }
        finite automaton B on A { root terminal Y = "y"; }
        "#,
    )
    .expect_err("the A-B dependency cycle should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::MachineHierarchyCycle { .. })
    ));
}

#[test]
fn test_unknown_on_machine_is_rejected() {
    let error = compile(
        r#"
        finite automaton A on Missing { root terminal X = "x"; }
        "#,
    )
    .expect_err("the unknown dependency should be rejected");

    match error {
        CompileError::Semantic(SemanticError::UnknownMachine { name, link, .. }) => {
            assert_eq!(name, "Missing");
            assert_eq!(link, "on");
        }
        other => panic!("expected an unknown machine error, got: {other}"),
    }
}

#[test]
fn test_category_back_references_are_linked() {
    let tree = compile(
        r#"
        finite automaton M {
            category Token;
            root terminal Word : Token = ["a"-"z"]+;
            root terminal Num : Token = ["0"-"9"]+;
        }
        "#,
    )
    .expect("grammar should compile");

    let category = match &tree.machines["M"].statements["Token"] {
        Statement::Category(category) => category,
        other => panic!("expected a category, got {}", other.name()),
    };
    let referrers: Vec<&str> = category.references.keys().map(|k| k.as_str()).collect();
    assert_eq!(referrers, vec!["Word", "Num"]);
}

#[test]
fn test_category_cycle_is_rejected() {
    let error = compile(
        r#"
        finite automaton M {
            category A : B;
            category B : A;
        }
        "#,
    )
    .expect_err("the category cycle should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::CategoryCycle { .. })
    ));
}

#[test]
fn test_category_parent_must_be_a_category() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal B : A = "b";
        }
        "#,
    )
    .expect_err("deriving from a production should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::NotACategory { .. })
    ));
}

#[test]
fn test_duplicate_statement_names_are_rejected() {
    let error = compile(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal A = "b";
        }
        "#,
    )
    .expect_err("the redeclaration should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::Redeclaration { .. })
    ));
}

#[test]
fn test_finite_automaton_input_must_have_terminal_roots() {
    let error = compile(
        r#"
        finite automaton Lower {
            root terminal T = "t";
            root nonterminal N = T;
        }
        finite automaton Upper on Lower {
            root terminal X = T;
        }
        "#,
    )
    .expect_err("a non-terminal-rooted input machine should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::NonTerminalInput { .. })
    ));
}

#[test]
fn test_cross_machine_references_resolve_through_on() {
    let tree = compile(
        r#"
        finite automaton Tok {
            root terminal A = "a";
        }
        LL(1) parser P on Tok {
            root production R = A;
        }
        "#,
    )
    .expect("grammar should compile");

    assert!(tree.machines["P"].decisions.is_some());
}

#[test]
fn test_machines_initialize_leaves_first() {
    // Upper is declared before Lower, yet depends on it through `on`; the
    // dependency order must win
    let tree = compile(
        r#"
        LL(1) parser Upper on Lower {
            root production R = A;
        }
        finite automaton Lower {
            root terminal A = "a";
        }
        "#,
    )
    .expect("grammar should compile");

    assert!(tree.machines["Lower"].pseudo_dfa.is_some());
    assert!(tree.machines["Upper"].decisions.is_some());
}
