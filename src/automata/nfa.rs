//! The NFA specialization of the abstract automaton.
//!
//! States carry an entry action register (fires when the state is entered),
//! transitions carry a transition register (fires when the transition is
//! taken), and the automaton as a whole records the tree-building contexts
//! `(parent path, child name)` declared while it was assembled. Contexts
//! propagate through every compositional operation and survive subset
//! construction verbatim.

use smol_str::SmolStr;

use crate::automata::action::ActionRegister;
use crate::automata::afa::{Afa, Register, StateId, Transition};
use crate::automata::symbol::SymbolGroup;

pub type NfaTransition = Transition<SymbolGroup, ActionRegister>;

/// A nondeterministic automaton with action registers.
#[derive(Debug, Clone, Default)]
pub struct Nfa {
    pub automaton: Afa<SymbolGroup, ActionRegister, SmolStr>,
    /// Declared `(parent context path, subcontext name)` pairs, in
    /// first-registration order.
    pub contexts: Vec<(String, SmolStr)>,
}

impl Nfa {
    pub fn new() -> Self {
        Self {
            automaton: Afa::new(),
            contexts: Vec::new(),
        }
    }

    pub fn add_state(&mut self) -> StateId {
        self.automaton.add_state()
    }

    pub fn add_transition(&mut self, source: StateId, transition: NfaTransition) {
        self.automaton.add_transition(source, transition);
    }

    pub fn add_empty_transition(&mut self, source: StateId, target: StateId) {
        self.automaton.add_empty_transition(source, target);
    }

    pub fn add_empty_transition_with(
        &mut self,
        source: StateId,
        target: StateId,
        register: ActionRegister,
    ) {
        self.automaton.add_transition(
            source,
            Transition::with_register(target, SymbolGroup::Empty, register),
        );
    }

    pub fn mark_final(&mut self, state: StateId) {
        self.automaton.final_states.insert(state);
    }

    pub fn or_with(&mut self, other: &Nfa, prevent_closure_optimization: bool) {
        self.automaton
            .or_with(&other.automaton, prevent_closure_optimization);
        self.merge_in_contexts(other);
    }

    pub fn and_with(&mut self, other: &Nfa, prevent_closure_optimization: bool) {
        self.automaton
            .and_with(&other.automaton, prevent_closure_optimization);
        self.merge_in_contexts(other);
    }

    /// If the automaton has several final states, or `actions` is nonempty,
    /// introduce a fresh state, wire every current final to it through an
    /// ε-transition carrying `actions`, and make it the unique final state.
    /// Returns the unique final state's id.
    pub fn concentrate_final_states(&mut self, actions: ActionRegister) -> StateId {
        if self.automaton.final_states.len() == 1 && actions.is_empty() {
            if let Some(&only) = self.automaton.final_states.iter().next() {
                return only;
            }
        }

        let concentrated = self.add_state();
        for final_state in std::mem::take(&mut self.automaton.final_states) {
            self.add_empty_transition_with(final_state, concentrated, actions.clone());
        }
        self.automaton.final_states.insert(concentrated);
        concentrated
    }

    /// Prepend `actions` to every transition leaving the initial state,
    /// and, if the initial state is final, to its entry register, so that
    /// matching the empty string still fires them.
    pub fn add_initial_actions(&mut self, actions: &ActionRegister) {
        for transition in &mut self.automaton.states[0].transitions {
            transition.register = transition.register.prefixed_with(actions);
        }

        if self.automaton.final_states.contains(&0) {
            let register = &mut self.automaton.states[0].register;
            *register = register.prefixed_with(actions);
        }
    }

    /// Append `actions` behind every final state: each final gets a fresh
    /// ε-successor carrying `actions`, and the fresh states become the
    /// final set.
    pub fn add_final_actions(&mut self, actions: &ActionRegister) {
        if actions.is_empty() {
            return;
        }

        let mut new_finals = std::collections::BTreeSet::new();
        for final_state in std::mem::take(&mut self.automaton.final_states) {
            let fresh = self.add_state();
            self.add_empty_transition_with(final_state, fresh, actions.clone());
            new_finals.insert(fresh);
        }
        self.automaton.final_states = new_finals;
    }

    /// Declare a `(parent, child)` context pair; duplicates are dropped.
    pub fn register_context(&mut self, parent: impl Into<String>, child: impl Into<SmolStr>) {
        let pair = (parent.into(), child.into());
        if !self.contexts.contains(&pair) {
            self.contexts.push(pair);
        }
    }

    fn merge_in_contexts(&mut self, other: &Nfa) {
        for (parent, child) in &other.contexts {
            self.register_context(parent.clone(), child.clone());
        }
    }

    /// Wire a repeatable copy of `atom` onto the state `at`: the copy's
    /// initial and final states both collapse into `at`, its interior
    /// states are appended, and every transition leaving `at` as part of
    /// the copy is flagged to stay apart during subset construction so the
    /// loop point remains visible.
    pub fn wire_loop(&mut self, at: StateId, atom: &Nfa) {
        let mut atom = atom.clone();
        let atom_final = atom.concentrate_final_states(ActionRegister::new());

        let mut mapping: Vec<StateId> = Vec::with_capacity(atom.automaton.states.len());
        for state in 0..atom.automaton.states.len() {
            if state == 0 || state == atom_final {
                mapping.push(at);
            } else {
                mapping.push(self.add_state());
            }
        }

        for (state, object) in atom.automaton.states.iter().enumerate() {
            let source = mapping[state];
            if source != at {
                self.automaton.states[source].register.merge(&object.register);
            }
            for transition in &object.transitions {
                let mut copied = transition.clone();
                copied.target = mapping[copied.target];
                copied.keep_apart |= source == at;
                self.automaton.states[source].transitions.push(copied);
            }
        }

        self.merge_in_contexts(&atom);
    }

    /// Subset construction; declared contexts carry across verbatim.
    pub fn build_pseudo_dfa(&self) -> Nfa {
        Nfa {
            automaton: self.automaton.build_pseudo_dfa(),
            contexts: self.contexts.clone(),
        }
    }
}
