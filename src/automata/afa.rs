//! The abstract finite automaton framework.
//!
//! An [`Afa`] is a labeled digraph: a vector of states (index 0 is the
//! initial state), a set of final states, and a tag map for addressing
//! states by caller-supplied keys. States and transitions both carry a
//! generic register payload that participates in every merge. The framework
//! provides the two composition operations (union and concatenation) and
//! the subset-construction skeleton that turns a nondeterministic automaton
//! into a pseudo-deterministic one while accumulating registers through
//! ε-closures.

use std::collections::BTreeSet;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::trace;

/// Index of a state within one automaton.
pub type StateId = usize;

/// Which of the two inputs of a disjoining a piece descends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Left,
    Right,
}

/// A transition condition: supports the ε shape, equality, disjointness,
/// and disjoining into pairwise disjoint pieces.
pub trait Condition: Clone {
    fn epsilon() -> Self;
    fn is_epsilon(&self) -> bool;
    /// A condition that can never match (e.g. an emptied reference set).
    fn is_vacant(&self) -> bool {
        false
    }
    fn equals(&self, other: &Self) -> bool;
    fn disjoint(&self, other: &Self) -> bool;
    /// Splits two overlapping, non-equal conditions; both inputs become the
    /// overlap and the returned pieces cover the remainder of the union.
    fn disjoin_from(&mut self, other: &mut Self) -> Vec<(Self, Provenance)>;
}

/// A register payload: defaultable, mergeable, order-preserving.
pub trait Register: Default + Clone {
    fn merge(&mut self, other: &Self);
    fn is_empty(&self) -> bool;
}

/// A labeled edge of the automaton.
#[derive(Debug, Clone)]
pub struct Transition<C, R> {
    pub target: StateId,
    pub condition: C,
    pub register: R,
    /// When set, this transition never merges into a condition closure with
    /// its peers; composition only ever turns this flag on.
    pub keep_apart: bool,
}

impl<C: Condition, R: Register> Transition<C, R> {
    pub fn new(target: StateId, condition: C) -> Self {
        Self {
            target,
            condition,
            register: R::default(),
            keep_apart: false,
        }
    }

    pub fn with_register(target: StateId, condition: C, register: R) -> Self {
        Self {
            target,
            condition,
            register,
            keep_apart: false,
        }
    }

    /// Two transitions may fold into one when neither opts out, they agree
    /// on the target, and their conditions are equal.
    fn mergeable_with(&self, other: &Self) -> bool {
        !self.keep_apart
            && !other.keep_apart
            && self.target == other.target
            && self.condition.equals(&other.condition)
    }

    /// Aligned transitions need no further disjoining.
    fn aligned_with(&self, other: &Self) -> bool {
        self.condition.equals(&other.condition) || self.condition.disjoint(&other.condition)
    }
}

/// One state: its outgoing transitions plus an entry register that fires
/// when the state is entered.
#[derive(Debug, Clone)]
pub struct StateObject<C, R> {
    pub transitions: Vec<Transition<C, R>>,
    pub register: R,
}

impl<C, R: Register> Default for StateObject<C, R> {
    fn default() -> Self {
        Self {
            transitions: Vec::new(),
            register: R::default(),
        }
    }
}

impl<C: Condition, R: Register> StateObject<C, R> {
    /// Merge another state into this one: transitions appended, entry
    /// registers unioned.
    fn merge_from(&mut self, other: &StateObject<C, R>) {
        self.transitions.extend(other.transitions.iter().cloned());
        self.register.merge(&other.register);
    }
}

/// The abstract finite automaton.
#[derive(Debug, Clone)]
pub struct Afa<C, R, T> {
    /// State 0 is the initial state.
    pub states: Vec<StateObject<C, R>>,
    pub final_states: BTreeSet<StateId>,
    pub tags: FxHashMap<T, StateId>,
}

/// Interim bookkeeping of the subset construction: one pseudo-DFA state is
/// a set of source states plus the register accumulated by ε-closure.
struct InterimState<R> {
    members: BTreeSet<StateId>,
    marked: bool,
    register: R,
}

/// All targets reachable from one disjoint condition, with the merged
/// transition register.
struct ConditionClosure<C, R> {
    condition: C,
    targets: BTreeSet<StateId>,
    register: R,
}

impl<C: Condition, R: Register, T: Eq + Hash + Clone> Default for Afa<C, R, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Condition, R: Register, T: Eq + Hash + Clone> Afa<C, R, T> {
    /// A fresh automaton with the lone initial state.
    pub fn new() -> Self {
        Self {
            states: vec![StateObject::default()],
            final_states: BTreeSet::new(),
            tags: FxHashMap::default(),
        }
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(StateObject::default());
        self.states.len() - 1
    }

    pub fn add_transition(&mut self, source: StateId, transition: Transition<C, R>) {
        self.states[source].transitions.push(transition);
    }

    pub fn add_empty_transition(&mut self, source: StateId, target: StateId) {
        self.add_transition(source, Transition::new(target, C::epsilon()));
    }

    pub fn tag_state(&mut self, state: StateId, tag: T) {
        self.tags.insert(tag, state);
    }

    pub fn has_tag(&self, tag: &T) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn find_by_tag(&self, tag: &T) -> Option<StateId> {
        self.tags.get(tag).copied()
    }

    /// Union composition: `other`'s initial state is merged into this
    /// automaton's initial state, the remaining states are appended with
    /// their targets shifted, and finality is unioned.
    ///
    /// With `prevent_closure_optimization`, every transition leaving the
    /// merged initial state is flagged to stay apart in later disjoining.
    pub fn or_with(&mut self, other: &Afa<C, R, T>, prevent_closure_optimization: bool) {
        let shift = self.states.len() - 1;
        let shifted = Self::shift_states(other, shift, prevent_closure_optimization);

        let mut shifted_iter = shifted.into_iter();
        if let Some(other_initial) = shifted_iter.next() {
            self.states[0].merge_from(&other_initial);
        }
        self.states.extend(shifted_iter);

        for &final_state in &other.final_states {
            if final_state == 0 {
                self.final_states.insert(0);
            } else {
                self.final_states.insert(shift + final_state);
            }
        }

        for (tag, state) in &other.tags {
            let shifted_state = if *state == 0 { 0 } else { shift + state };
            self.tags.insert(tag.clone(), shifted_state);
        }
    }

    /// Concatenation composition: `other`'s initial state is merged into
    /// every current final state, the remaining states are appended with
    /// their targets shifted, and the final set becomes the shifted copy of
    /// `other`'s finals. When `other` accepts in its initial state, the
    /// current finals stay final as well.
    pub fn and_with(&mut self, other: &Afa<C, R, T>, prevent_closure_optimization: bool) {
        let shift = self.states.len() - 1;
        let shifted = Self::shift_states(other, shift, prevent_closure_optimization);

        let mut shifted_iter = shifted.into_iter();
        if let Some(other_initial) = shifted_iter.next() {
            for &final_state in &self.final_states.clone() {
                self.states[final_state].merge_from(&other_initial);
            }
        }
        self.states.extend(shifted_iter);

        let mut new_finals = BTreeSet::new();
        for &final_state in &other.final_states {
            if final_state == 0 {
                new_finals.extend(self.final_states.iter().copied());
            } else {
                new_finals.insert(shift + final_state);
            }
        }
        self.final_states = new_finals;

        for (tag, state) in &other.tags {
            let shifted_state = if *state == 0 { 0 } else { shift + state };
            self.tags.insert(tag.clone(), shifted_state);
        }
    }

    fn shift_states(
        other: &Afa<C, R, T>,
        shift: usize,
        prevent_closure_optimization: bool,
    ) -> Vec<StateObject<C, R>> {
        let mut states = other.states.clone();
        for (index, state) in states.iter_mut().enumerate() {
            for transition in &mut state.transitions {
                transition.target += shift;
                if index == 0 {
                    transition.keep_apart |= prevent_closure_optimization;
                }
            }
        }
        states
    }

    /// Subset construction.
    ///
    /// The result is deterministic up to opted-out transitions: every
    /// resulting state has at most one outgoing transition per disjoint
    /// condition, except that transitions flagged `keep_apart` stay
    /// separate. Registers are carried: a result state's entry register is
    /// the accumulation of its ε-closure, a result transition's register is
    /// the union over the merged source transitions. Tags are lost in the
    /// process.
    pub fn build_pseudo_dfa(&self) -> Afa<C, R, T> {
        let mut result: Afa<C, R, T> = Afa::new();
        let mut state_map: Vec<InterimState<R>> = Vec::new();

        let initial = self.epsilon_closure(BTreeSet::from([0]));
        result.states[0].register.merge(&initial.register);
        if initial.members.iter().any(|s| self.final_states.contains(s)) {
            result.final_states.insert(0);
        }
        state_map.push(initial);

        while let Some(current) = state_map.iter().position(|s| !s.marked) {
            state_map[current].marked = true;

            let transitions = self.disjoint_transitions_of(&state_map[current].members);
            let closures = Self::condition_closures(transitions);
            trace!(state = current, closures = closures.len(), "expanding pseudo-DFA state");

            for closure in closures {
                let advanced = self.epsilon_closure(closure.targets);
                let target = match state_map.iter().position(|s| s.members == advanced.members) {
                    Some(existing) => existing,
                    None => {
                        let id = result.add_state();
                        result.states[id].register.merge(&advanced.register);
                        if advanced.members.iter().any(|s| self.final_states.contains(s)) {
                            result.final_states.insert(id);
                        }
                        state_map.push(advanced);
                        id
                    }
                };

                result.add_transition(
                    current,
                    Transition::with_register(target, closure.condition, closure.register),
                );
            }
        }

        result
    }

    /// The set of states reachable from `states` through ε-transitions,
    /// together with the register accumulated in DFS visit order: each
    /// visited state contributes its entry register, each ε-transition
    /// followed contributes its transition register.
    fn epsilon_closure(&self, states: BTreeSet<StateId>) -> InterimState<R> {
        let mut register = R::default();
        let mut members = states.clone();
        let mut pending: Vec<StateId> = states.into_iter().collect();

        while let Some(state) = pending.pop() {
            register.merge(&self.states[state].register);
            for transition in &self.states[state].transitions {
                if !transition.condition.is_epsilon() {
                    continue;
                }
                register.merge(&transition.register);
                if members.insert(transition.target) {
                    pending.push(transition.target);
                }
            }
        }

        InterimState {
            members,
            marked: false,
            register,
        }
    }

    /// Gathers every transition leaving any member state and disjoins the
    /// list until all conditions are pairwise equal or disjoint.
    ///
    /// When two transitions become equal (same target, neither opted out),
    /// their registers union into the survivor in the order
    /// (survivor, newcomer) and the other is dropped. When two overlap, the
    /// pair is disjoined in place and the off-cut pieces are appended to
    /// the end of the list for later alignment, each carrying the register
    /// of the original it descends from.
    fn disjoint_transitions_of(&self, states: &BTreeSet<StateId>) -> Vec<Transition<C, R>> {
        let mut transitions: Vec<Transition<C, R>> = states
            .iter()
            .flat_map(|&s| self.states[s].transitions.iter().cloned())
            .collect();

        let mut i = 0;
        while i < transitions.len() {
            let mut j = i + 1;
            let mut merged_into = None;
            while j < transitions.len() {
                let (head, tail) = transitions.split_at_mut(j);
                let left = &mut head[i];
                let right = &mut tail[0];

                if right.mergeable_with(left) {
                    merged_into = Some(j);
                    break;
                } else if !left.aligned_with(right) {
                    let pieces = left.condition.disjoin_from(&mut right.condition);
                    let new_transitions: Vec<Transition<C, R>> = pieces
                        .into_iter()
                        .map(|(condition, provenance)| {
                            let source = match provenance {
                                Provenance::Left => &*left,
                                Provenance::Right => &*right,
                            };
                            Transition {
                                target: source.target,
                                condition,
                                register: source.register.clone(),
                                keep_apart: source.keep_apart,
                            }
                        })
                        .collect();
                    transitions.extend(new_transitions);
                    j += 1;
                } else {
                    j += 1;
                }
            }

            if let Some(survivor) = merged_into {
                let newcomer = transitions.remove(i);
                // removal shifted the survivor down by one
                transitions[survivor - 1].register.merge(&newcomer.register);
            } else {
                i += 1;
            }
        }

        transitions
    }

    /// Groups disjoint transitions into closures: per condition, the set of
    /// reachable targets and the merged register. Opted-out transitions
    /// each form their own closure and come first.
    fn condition_closures(transitions: Vec<Transition<C, R>>) -> Vec<ConditionClosure<C, R>> {
        let mut individual: Vec<ConditionClosure<C, R>> = Vec::new();
        let mut general: Vec<ConditionClosure<C, R>> = Vec::new();

        for transition in transitions {
            if transition.condition.is_epsilon() || transition.condition.is_vacant() {
                continue;
            }

            if transition.keep_apart {
                individual.push(ConditionClosure {
                    condition: transition.condition,
                    targets: BTreeSet::from([transition.target]),
                    register: transition.register,
                });
            } else if let Some(closure) = general
                .iter_mut()
                .find(|c| c.condition.equals(&transition.condition))
            {
                closure.targets.insert(transition.target);
                closure.register.merge(&transition.register);
            } else {
                general.push(ConditionClosure {
                    condition: transition.condition,
                    targets: BTreeSet::from([transition.target]),
                    register: transition.register,
                });
            }
        }

        individual.extend(general);
        individual
    }
}
