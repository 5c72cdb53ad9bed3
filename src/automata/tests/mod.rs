mod tests_pseudo_dfa;

use std::collections::BTreeSet;

use crate::automata::afa::Condition;
use crate::automata::nfa::Nfa;
use crate::automata::symbol::SymbolGroup;

/// Reference interpretation of an NFA over raw bytes, for language
/// comparisons in tests.
pub(crate) fn accepts(nfa: &Nfa, input: &[u8]) -> bool {
    let mut current = epsilon_closure(nfa, BTreeSet::from([0]));

    for &byte in input {
        let mut advanced = BTreeSet::new();
        for &state in &current {
            for transition in &nfa.automaton.states[state].transitions {
                if matches_byte(&transition.condition, byte) {
                    advanced.insert(transition.target);
                }
            }
        }
        if advanced.is_empty() {
            return false;
        }
        current = epsilon_closure(nfa, advanced);
    }

    current
        .iter()
        .any(|state| nfa.automaton.final_states.contains(state))
}

fn matches_byte(condition: &SymbolGroup, byte: u8) -> bool {
    match condition {
        SymbolGroup::Byte { start, end } => *start <= byte && byte <= *end,
        _ => false,
    }
}

fn epsilon_closure(nfa: &Nfa, states: BTreeSet<usize>) -> BTreeSet<usize> {
    let mut closure = states.clone();
    let mut pending: Vec<usize> = states.into_iter().collect();
    while let Some(state) = pending.pop() {
        for transition in &nfa.automaton.states[state].transitions {
            if transition.condition.is_epsilon() && closure.insert(transition.target) {
                pending.push(transition.target);
            }
        }
    }
    closure
}

/// A single-byte-matching NFA.
pub(crate) fn byte_nfa(byte: u8) -> Nfa {
    let mut nfa = Nfa::new();
    let accept = nfa.add_state();
    nfa.add_transition(
        0,
        crate::automata::Transition::new(accept, SymbolGroup::byte(byte)),
    );
    nfa.mark_final(accept);
    nfa
}
