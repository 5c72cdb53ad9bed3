//! First-set computation over compiled grammars.

use crate::automata::afa::Condition;
use crate::automata::symbol::{SymbolGroup, SymbolGroupList};
use crate::base::StatementRef;
use crate::compile;
use crate::errors::{CompileError, SemanticError};
use crate::llk::{Firster, LlkItem};
use crate::semantic::SemanticTree;

fn first_of(tree: &SemanticTree, machine: &str, statement: &str, prefix: &[SymbolGroup]) -> SymbolGroupList {
    let machine_id = tree.machine_id(machine).expect("machine exists");
    let index = tree
        .machine(machine_id)
        .statements
        .get_index_of(statement)
        .expect("statement exists");
    let mut firster = Firster::new(tree, machine_id);
    firster
        .first(
            LlkItem::statement(tree, StatementRef::new(machine_id, index)),
            &prefix.to_vec().into(),
        )
        .expect("first computation should succeed")
}

fn assert_contains(list: &SymbolGroupList, group: &SymbolGroup) {
    assert!(
        list.iter().any(|g| g.equals(group)),
        "expected {} in {:?}",
        group.describe(),
        list
    );
}

#[test]
fn test_first_of_a_literal_sequence_is_its_head() {
    let tree = compile(
        r#"
        LL(1) parser P {
            root production R = "a" "b";
        }
        "#,
    )
    .expect("grammar should compile");

    let first = first_of(&tree, "P", "R", &[]);
    assert_eq!(first.len(), 1);
    assert_contains(&first, &SymbolGroup::byte(b'a'));
}

#[test]
fn test_star_head_contributes_both_sides() {
    let tree = compile(
        r#"
        LL(2) parser P {
            root production R = "a"* "b";
        }
        "#,
    )
    .expect("grammar should compile");

    let first = first_of(&tree, "P", "R", &[]);
    assert_contains(&first, &SymbolGroup::byte(b'a'));
    assert_contains(&first, &SymbolGroup::byte(b'b'));

    // after one 'a' the star may continue or give way to the 'b'
    let extended = first_of(&tree, "P", "R", &[SymbolGroup::byte(b'a')]);
    assert_contains(&extended, &SymbolGroup::byte(b'a'));
    assert_contains(&extended, &SymbolGroup::byte(b'b'));
}

#[test]
fn test_optional_repetition_derives_epsilon() {
    let tree = compile(
        r#"
        LL(1) parser P {
            root production R = "a"?;
        }
        "#,
    )
    .expect("grammar should compile");

    let first = first_of(&tree, "P", "R", &[]);
    assert_contains(&first, &SymbolGroup::byte(b'a'));
    assert!(first.contains_epsilon());
}

#[test]
fn test_category_first_is_the_union_over_referrers() {
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

    let first = first_of(&tree, "P", "Item", &[]);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_empty_repetition_loop_is_rejected() {
    let error = compile(
        r#"
        LL(1) parser P {
            root production R = ("a"?)* "b";
        }
        "#,
    )
    .expect_err("a star around an ε-deriving atom should be rejected");

    assert!(matches!(
        error,
        CompileError::Semantic(SemanticError::EmptyRepetitionLoop { .. })
    ));
}

#[test]
fn test_exhausted_prefix_yields_epsilon() {
    let tree = compile(
        r#"
        LL(2) parser P {
            root production R = "a";
        }
        "#,
    )
    .expect("grammar should compile");

    let first = first_of(&tree, "P", "R", &[SymbolGroup::byte(b'a')]);
    assert!(first.contains_epsilon());
    assert_eq!(first.len(), 1);
}
