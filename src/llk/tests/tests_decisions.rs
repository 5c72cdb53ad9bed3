//! Decision-tree construction: disambiguation, ambiguity reporting, and
//! the disjointness property of the emitted forest.

use crate::automata::afa::Condition;
use crate::automata::symbol::SymbolGroup;
use crate::compile;
use crate::errors::{CompileError, LlkError};
use crate::llk::DecisionPoint;

#[test]
fn test_ambiguity_at_depth_k_is_reported() {
    let error = compile(
        r#"
        LL(1) parser P {
            root production R = "a" "b" | "a" "c";
        }
        "#,
    )
    .expect_err("the shared 'a' prefix exceeds k = 1");

    match error {
        CompileError::Llk(LlkError::LookaheadExceeded {
            k,
            first,
            second,
            witness,
        }) => {
            assert_eq!(k, 1);
            assert_ne!(first, second);
            assert_eq!(witness, "'a'");
        }
        other => panic!("expected a lookahead error, got: {other}"),
    }
}

#[test]
fn test_larger_k_resolves_the_same_grammar() {
    let tree = compile(
        r#"
        LL(2) parser P {
            root production R = "a" "b" | "a" "c";
        }
        "#,
    )
    .expect("k = 2 suffices for the shared prefix");

    let decisions = &tree.machines["P"]
        .decisions
        .as_ref()
        .expect("a decision forest")
        .statements["R"];
    // one edge on 'a', disambiguated one level deeper on 'b' vs 'c'
    assert_eq!(decisions.transitions.len(), 1);
    assert_eq!(decisions.transitions[0].point.transitions.len(), 2);
}

#[test]
fn test_precedence_flag_truncates_disambiguation() {
    let tree = compile(
        r#"
        LL(1) parser P with ambiguity_resolved_by_precedence {
            root production R = "a" "b" | "a" "c";
        }
        "#,
    )
    .expect("precedence resolution should suppress the conflict");

    assert!(tree.machines["P"].decisions.is_some());
}

#[test]
fn test_statement_references_disambiguate_at_depth_one() {
    let tree = compile(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal B = "b";
        }
        LL(1) parser P on M {
            root production R = A | B;
        }
        "#,
    )
    .expect("grammar should compile");

    let decisions = &tree.machines["P"]
        .decisions
        .as_ref()
        .expect("a decision forest")
        .statements["R"];

    assert_eq!(decisions.transitions.len(), 2);
    let names: Vec<&str> = decisions
        .transitions
        .iter()
        .map(|t| match &t.condition {
            SymbolGroup::Reference { productions, .. } => {
                assert_eq!(productions.len(), 1);
                productions[0].name.as_str()
            }
            other => panic!("expected statement references, got {}", other.describe()),
        })
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(decisions.transitions[0]
        .condition
        .disjoint(&decisions.transitions[1].condition));
}

#[test]
fn test_left_recursion_is_detected() {
    let error = compile(
        r#"
        LL(1) parser P {
            root production R = R "a" | "b";
        }
        "#,
    )
    .expect_err("left recursion should be rejected");

    match error {
        CompileError::Llk(LlkError::LeftRecursion { name, .. }) => {
            assert_eq!(name, "R");
        }
        other => panic!("expected a left recursion error, got: {other}"),
    }
}

fn assert_sibling_disjointness(point: &DecisionPoint) {
    for (i, left) in point.transitions.iter().enumerate() {
        for right in point.transitions.iter().skip(i + 1) {
            assert!(
                left.condition.equals(&right.condition) || left.condition.disjoint(&right.condition),
                "sibling conditions {} and {} overlap",
                left.condition.describe(),
                right.condition.describe()
            );
        }
    }
    for transition in &point.transitions {
        assert_sibling_disjointness(&transition.point);
    }
}

#[test]
fn test_forest_edges_are_pairwise_disjoint() {
    let tree = compile(
        r#"
        finite automaton M {
            root terminal Id = ["a"-"z"]+;
            root terminal Num = ["0"-"9"]+;
            root terminal Comma = ",";
        }
        LL(2) parser P on M {
            root production Entry = Id | Num;
            root production Pair = Id Comma Id | Num Comma Num;
        }
        "#,
    )
    .expect("grammar should compile");

    let forest = tree.machines["P"]
        .decisions
        .as_ref()
        .expect("a decision forest");
    for decisions in forest.statements.values() {
        assert_sibling_disjointness(decisions);
    }
    assert_sibling_disjointness(&forest.root);
}

#[test]
fn test_category_alternatives_are_disambiguated() {
    let tree = compile(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal B = "b";
        }
        LL(1) parser P on M {
            category Item;
            root production X : Item = A;
            root production Y : Item = B;
        }
        "#,
    )
    .expect("grammar should compile");

    let decisions = &tree.machines["P"]
        .decisions
        .as_ref()
        .expect("a decision forest")
        .statements["Item"];
    assert_eq!(decisions.transitions.len(), 2);
}

#[test]
fn test_decision_depth_never_exceeds_k() {
    let tree = compile(
        r#"
        LL(3) parser P {
            root production R = "a" "b" "c" | "a" "b" "d";
        }
        "#,
    )
    .expect("grammar should compile");

    let forest = tree.machines["P"]
        .decisions
        .as_ref()
        .expect("a decision forest");
    for decisions in forest.statements.values() {
        assert!(decisions.depth() <= 3);
    }
}
