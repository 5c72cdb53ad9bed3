//! Subset-construction behavior, driven end-to-end through compiled
//! grammars.

use super::accepts;
use crate::automata::action::ActionKind;
use crate::automata::afa::Condition;
use crate::automata::nfa::Nfa;
use crate::automata::symbol::SymbolGroup;
use crate::compile;

fn pseudo_dfa_of(source: &str, machine: &str) -> Nfa {
    let tree = compile(source).expect("grammar should compile");
    tree.machines[machine]
        .pseudo_dfa
        .clone()
        .expect("finite automaton should carry a pseudo-DFA")
}

#[test]
fn test_two_terminal_roots_share_the_initial_state() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal B = "b";
        }
        "#,
        "M",
    );

    assert_eq!(dfa.automaton.states.len(), 3);
    assert_eq!(dfa.automaton.final_states.len(), 2);

    // the transition into accept-A carries the context creation; the
    // accept state itself terminalizes and elevates, in order
    let accept_a = dfa.automaton.states[0]
        .transitions
        .iter()
        .find(|t| t.condition.equals(&SymbolGroup::byte(b'a')))
        .expect("an 'a' transition out of the initial state");
    let transition_kinds: Vec<ActionKind> =
        accept_a.register.iter().map(|a| a.kind).collect();
    assert_eq!(transition_kinds, vec![ActionKind::CreateContext]);
    let create = accept_a
        .register
        .iter()
        .next()
        .expect("a context creation action");
    assert_eq!(create.context_path, "m_token");
    assert_eq!(create.target, "A");

    let entry_kinds: Vec<ActionKind> = dfa.automaton.states[accept_a.target]
        .register
        .iter()
        .map(|a| a.kind)
        .collect();
    assert_eq!(
        entry_kinds,
        vec![ActionKind::TerminalizeContext, ActionKind::ElevateContext]
    );
}

#[test]
fn test_terminal_indices_are_assigned_in_declaration_order() {
    let tree = compile(
        r#"
        finite automaton M {
            root terminal A = "a";
            root terminal B = "b";
        }
        "#,
    )
    .expect("grammar should compile");

    let machine = &tree.machines["M"];
    assert_eq!(machine.terminal_count, 2);
    let a = machine.statements["A"]
        .as_production()
        .expect("A is a production");
    let b = machine.statements["B"]
        .as_production()
        .expect("B is a production");
    assert_eq!(a.terminal_index, 1);
    assert_eq!(b.terminal_index, 2);
}

#[test]
fn test_shared_prefix_is_factored_by_disjoining() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal X = "ab" | "ac";
        }
        "#,
        "M",
    );

    assert_eq!(dfa.automaton.states.len(), 4);

    let initial = &dfa.automaton.states[0];
    assert_eq!(initial.transitions.len(), 1);
    assert!(initial.transitions[0]
        .condition
        .equals(&SymbolGroup::byte(b'a')));

    let fork = &dfa.automaton.states[initial.transitions[0].target];
    let conditions: Vec<String> = fork
        .transitions
        .iter()
        .map(|t| t.condition.describe())
        .collect();
    assert_eq!(conditions, vec!["'b'", "'c'"]);
    for transition in &fork.transitions {
        assert!(dfa.automaton.final_states.contains(&transition.target));
    }
}

#[test]
fn test_unbounded_repetition_collapses_to_a_self_loop() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal Ws = " "+;
        }
        "#,
        "M",
    );

    assert_eq!(dfa.automaton.states.len(), 2);
    assert!(dfa.automaton.final_states.contains(&1));
    assert!(!dfa.automaton.final_states.contains(&0));

    let looping = dfa.automaton.states[1]
        .transitions
        .iter()
        .find(|t| t.condition.equals(&SymbolGroup::byte(b' ')))
        .expect("a space transition out of the accepting state");
    assert_eq!(looping.target, 1);
}

#[test]
fn test_pseudo_dfa_has_disjoint_conditions_per_state() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal Id = ["a"-"z" "_"] ["a"-"z" "0"-"9" "_"]*;
            root terminal Num = ["0"-"9"]+;
        }
        "#,
        "M",
    );

    for state in &dfa.automaton.states {
        let mergeable: Vec<&SymbolGroup> = state
            .transitions
            .iter()
            .filter(|t| !t.keep_apart)
            .map(|t| &t.condition)
            .collect();
        for (i, left) in mergeable.iter().enumerate() {
            for right in mergeable.iter().skip(i + 1) {
                assert!(
                    left.equals(right) || left.disjoint(right),
                    "conditions {} and {} overlap within one state",
                    left.describe(),
                    right.describe()
                );
            }
        }
    }
}

#[test]
fn test_pseudo_dfa_accepts_the_same_language_as_the_nfa() {
    let source = r#"
        finite automaton M {
            root terminal X = ("a" | "b" "c")+;
        }
    "#;
    let dfa = pseudo_dfa_of(source, "M");

    let cases: Vec<(&[u8], bool)> = vec![
        (b"", false),
        (b"a", true),
        (b"bc", true),
        (b"abc", true),
        (b"bca", true),
        (b"aa", true),
        (b"b", false),
        (b"cb", false),
        (b"ac", false),
    ];
    for (input, expected) in cases {
        assert_eq!(
            accepts(&dfa, input),
            expected,
            "pseudo-DFA disagrees on {:?}",
            String::from_utf8_lossy(input)
        );
    }
}

#[test]
fn test_optional_tail_bypasses() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal X = "a"{1,3};
        }
        "#,
        "M",
    );

    let cases: Vec<(&[u8], bool)> = vec![
        (b"", false),
        (b"a", true),
        (b"aa", true),
        (b"aaa", true),
        (b"aaaa", false),
    ];
    for (input, expected) in cases {
        assert_eq!(
            accepts(&dfa, input),
            expected,
            "pseudo-DFA disagrees on {:?}",
            String::from_utf8_lossy(input)
        );
    }
}

#[test]
fn test_question_mark_accepts_empty() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal X = "a"? "b";
        }
        "#,
        "M",
    );

    assert!(accepts(&dfa, b"b"));
    assert!(accepts(&dfa, b"ab"));
    assert!(!accepts(&dfa, b"a"));
    assert!(!accepts(&dfa, b"aab"));
}

#[test]
fn test_except_any_complements_the_byte_alphabet() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal NotQuote = [^"\""]+;
        }
        "#,
        "M",
    );

    assert!(accepts(&dfa, b"abc"));
    assert!(!accepts(&dfa, b"\""));
    assert!(!accepts(&dfa, b"a\"b"));
}

#[test]
fn test_contexts_carry_through_subset_construction() {
    let dfa = pseudo_dfa_of(
        r#"
        finite automaton M {
            root terminal A = "a";
        }
        "#,
        "M",
    );

    assert_eq!(dfa.contexts.len(), 1);
    assert_eq!(dfa.contexts[0].0, "m_token");
    assert_eq!(dfa.contexts[0].1, "A");
}
