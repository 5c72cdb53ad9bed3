//! Translation of the semantic model into NFAs.
//!
//! One builder instance is scoped to a machine and a generation context
//! path (the `__`-joined chain of type-forming statements entered so far).
//! Each statement or regex node becomes a minimal NFA; regex actions are
//! translated into initial/final action registers and decorated onto the
//! emitted transitions.

use smol_str::SmolStr;

use crate::automata::action::{Action, ActionKind, ActionRegister};
use crate::automata::afa::Register;
use crate::automata::nfa::Nfa;
use crate::automata::symbol::SymbolGroup;
use crate::automata::Transition;
use crate::base::{MachineId, StatementRef};
use crate::semantic::{
    AtomicRegex, ConjunctiveRegex, DisjunctiveRegex, PrimitiveKind, PrimitiveRegex, RegexAction,
    RegexActionKind, RepetitionBound, RepetitiveRegex, RootRegex, Rootness, SemanticTree,
    Statement,
};

/// Builds NFAs for the statements and regexes of one machine.
pub struct NfaBuilder<'t> {
    tree: &'t SemanticTree,
    machine: MachineId,
    context_path: String,
}

impl<'t> NfaBuilder<'t> {
    pub fn new(tree: &'t SemanticTree, machine: MachineId, context_path: impl Into<String>) -> Self {
        Self {
            tree,
            machine,
            context_path: context_path.into(),
        }
    }

    /// A builder for the context entered by a type-forming or pattern
    /// statement.
    fn scoped_to(&self, statement_name: &str) -> NfaBuilder<'t> {
        NfaBuilder {
            tree: self.tree,
            machine: self.machine,
            context_path: format!("{}__{}", self.context_path, statement_name),
        }
    }

    /// Builds the NFA of any statement, dispatching on its shape.
    pub fn build_statement(&self, handle: StatementRef) -> Nfa {
        match self.tree.statement(handle) {
            Statement::Category(_) => self.build_category(handle),
            Statement::Production(production) => {
                // the regex runs inside the production's own context
                let scoped = self.scoped_to(&production.name);
                let mut nfa = scoped.build_disjunction(&production.regex);

                let mut create = ActionRegister::new();
                create.push(Action::new(
                    ActionKind::CreateContext,
                    self.context_path.clone(),
                    production.name.clone(),
                ));
                nfa.add_initial_actions(&create);
                nfa.register_context(self.context_path.clone(), production.name.clone());
                nfa
            }
            Statement::Pattern(pattern) => {
                // patterns form no type of their own: no context creation,
                // but their actions still run in a nested context path
                let scoped = self.scoped_to(&pattern.name);
                scoped.build_disjunction(&pattern.regex)
            }
            Statement::Regex(regex_statement) => self.build_disjunction(&regex_statement.regex),
        }
    }

    /// A category matches any of its referrers; each type-forming referrer
    /// has its fresh context elevated (or discarded) into the category.
    fn build_category(&self, handle: StatementRef) -> Nfa {
        let Some(category) = self.tree.statement(handle).as_category() else {
            return Nfa::new();
        };

        let mut alternation = Nfa::new();
        let parent_context_path = format!("{}__{}", self.context_path, category.name);

        for (child_name, &child) in &category.references {
            let mut alternative = self.build_statement(child);

            let child_statement = self.tree.statement(child);
            if child_statement.is_type_forming() {
                let mut elevation = ActionRegister::new();
                if child_statement.is_terminal_production() {
                    elevation.push(Action::new(
                        ActionKind::TerminalizeContext,
                        parent_context_path.clone(),
                        child_name.clone(),
                    ));
                }
                let elevation_kind = if child_statement.rootness() == Rootness::IgnoreRoot {
                    ActionKind::IgnoreContext
                } else {
                    ActionKind::ElevateContext
                };
                elevation.push(Action::new(
                    elevation_kind,
                    parent_context_path.clone(),
                    child_name.clone(),
                ));
                alternative.concentrate_final_states(elevation);
            }

            alternation.or_with(&alternative, false);
        }

        let mut create = ActionRegister::new();
        create.push(Action::new(
            ActionKind::CreateContext,
            self.context_path.clone(),
            category.name.clone(),
        ));
        alternation.add_initial_actions(&create);
        alternation.register_context(self.context_path.clone(), category.name.clone());

        alternation
    }

    pub fn build_disjunction(&self, regex: &DisjunctiveRegex) -> Nfa {
        let mut base = Nfa::new();
        for conjunction in &regex.alternatives {
            let alternative = self.build_conjunction(conjunction);
            base.or_with(&alternative, false);
        }

        let (initial, r#final) = self.action_registers_for(&regex.actions, None);
        base.add_initial_actions(&initial);
        base.add_final_actions(&r#final);
        base
    }

    fn build_conjunction(&self, conjunction: &ConjunctiveRegex) -> Nfa {
        let mut base = Nfa::new();
        base.mark_final(0);
        for root in &conjunction.sequence {
            let next = self.build_root(root);
            base.and_with(&next, false);
        }
        base
    }

    fn build_root(&self, root: &RootRegex) -> Nfa {
        match root {
            RootRegex::Repetitive(repetition) => self.build_repetition(repetition),
            RootRegex::Atomic(atom) => self.build_atomic(atom),
        }
    }

    fn build_atomic(&self, atom: &AtomicRegex) -> Nfa {
        match atom {
            AtomicRegex::Group(group) => self.build_disjunction(group),
            AtomicRegex::Primitive(primitive) => self.build_primitive(primitive),
        }
    }

    /// The repetition machine: a mandatory chain of `min` atoms (one when
    /// min is 0), then either a loop of the atom wired back onto the
    /// chain's concentrated final (max = ∞) or an optional tail of
    /// `max - min` atoms with ε-bypasses to the end. Loop and tail entry
    /// transitions stay apart during subset construction so the loop
    /// points survive.
    fn build_repetition(&self, repetition: &RepetitiveRegex) -> Nfa {
        // zero repetitions at most: only the empty match remains
        if repetition.max == RepetitionBound::Finite(0) {
            let mut base = Nfa::new();
            base.mark_final(0);
            let (initial, r#final) = self.action_registers_for(&repetition.actions, None);
            base.add_initial_actions(&initial);
            base.add_final_actions(&r#final);
            return base;
        }

        let atom = self.build_atomic(&repetition.atom);

        let mut chain = Nfa::new();
        chain.mark_final(0);
        for _ in 0..repetition.min.max(1) {
            chain.and_with(&atom, false);
        }

        match repetition.max {
            RepetitionBound::Infinite => {
                let loop_point = chain.concentrate_final_states(ActionRegister::new());
                chain.wire_loop(loop_point, &atom);
            }
            RepetitionBound::Finite(max) => {
                let mut bypass_sources = Vec::new();
                for _ in repetition.min.max(1)..max {
                    bypass_sources.push(chain.concentrate_final_states(ActionRegister::new()));
                    chain.and_with(&atom, true);
                }
                if !bypass_sources.is_empty() {
                    let end = chain.concentrate_final_states(ActionRegister::new());
                    for source in bypass_sources {
                        chain.add_empty_transition(source, end);
                    }
                }
            }
        }

        if repetition.min == 0 {
            chain.mark_final(0);
        }

        let (initial, r#final) = self.action_registers_for(&repetition.actions, None);
        chain.add_initial_actions(&initial);
        chain.add_final_actions(&r#final);
        chain
    }

    fn build_primitive(&self, primitive: &PrimitiveRegex) -> Nfa {
        match &primitive.kind {
            PrimitiveKind::Empty => self.build_empty(&primitive.actions),
            PrimitiveKind::Literal(literal) => self.build_literal(literal, &primitive.actions),
            PrimitiveKind::Any(any) => self.build_any(&any.spans(), &primitive.actions),
            PrimitiveKind::ExceptAny(any) => {
                self.build_any(&any.complement_spans(), &primitive.actions)
            }
            PrimitiveKind::Arbitrary => self.build_arbitrary(&primitive.actions),
            PrimitiveKind::Reference { name, target } => {
                self.build_reference(name, *target, &primitive.actions)
            }
        }
    }

    /// Matching the empty string still fires the node's actions: they ride
    /// on a single ε-transition.
    fn build_empty(&self, actions: &[RegexAction]) -> Nfa {
        let mut base = Nfa::new();
        let accept = base.add_state();
        base.mark_final(accept);

        let (mut initial, r#final) = self.action_registers_for(actions, None);
        initial.merge(&r#final);
        base.add_empty_transition_with(0, accept, initial);
        base
    }

    fn build_literal(&self, literal: &str, actions: &[RegexAction]) -> Nfa {
        let mut base = Nfa::new();
        let (initial, r#final) = self.action_registers_for(actions, None);

        // one state per byte; the node's initial actions fire on the first
        // step only
        let mut current = 0;
        for (index, byte) in crate::automata::symbol::literal_bytes(literal)
            .iter()
            .enumerate()
        {
            let next = base.add_state();
            let register = if index == 0 {
                initial.clone()
            } else {
                ActionRegister::new()
            };
            base.add_transition(
                current,
                Transition::with_register(next, SymbolGroup::byte(*byte), register),
            );
            current = next;
        }

        base.mark_final(current);
        base.add_final_actions(&r#final);
        base
    }

    fn build_any(&self, spans: &[(u8, u8)], actions: &[RegexAction]) -> Nfa {
        let mut base = Nfa::new();
        let accept = base.add_state();
        let (initial, r#final) = self.action_registers_for(actions, None);

        for &(start, end) in spans {
            base.add_transition(
                0,
                Transition::with_register(
                    accept,
                    SymbolGroup::byte_range(start, end),
                    initial.clone(),
                ),
            );
        }

        base.mark_final(accept);
        base.add_final_actions(&r#final);
        base
    }

    fn build_arbitrary(&self, actions: &[RegexAction]) -> Nfa {
        let mut base = Nfa::new();
        let accept = base.add_state();
        let (initial, r#final) = self.action_registers_for(actions, None);

        for group in self.tree.arbitrary_symbol_groups(self.machine) {
            base.add_transition(0, Transition::with_register(accept, group, initial.clone()));
        }

        base.mark_final(accept);
        base.add_final_actions(&r#final);
        base
    }

    fn build_reference(
        &self,
        name: &SmolStr,
        target: Option<StatementRef>,
        actions: &[RegexAction],
    ) -> Nfa {
        let Some(target) = target else {
            // linking guarantees resolution; an unresolved reference can
            // match nothing
            return Nfa::new();
        };

        if target.machine == self.machine {
            // same machine: inline the referenced statement's NFA, with
            // typed action payloads pointing at the context it creates
            let payload_path = if self.tree.statement(target).is_type_forming() {
                Some(format!("{}__{}", self.context_path, name))
            } else {
                None
            };
            let (initial, r#final) = self.action_registers_for(actions, payload_path.as_deref());

            let mut base = self.build_statement(target);
            base.add_initial_actions(&initial);
            base.add_final_actions(&r#final);
            base
        } else {
            // other machine: a single transition on the terminal set the
            // referenced statement stands for
            let (initial, r#final) = self.action_registers_for(actions, None);

            let mut base = Nfa::new();
            let accept = base.add_state();
            let productions = self.tree.terminal_refs_of(target);
            base.add_transition(
                0,
                Transition::with_register(
                    accept,
                    SymbolGroup::reference(target.machine, name.clone(), productions),
                    initial,
                ),
            );
            base.mark_final(accept);
            base.add_final_actions(&r#final);
            base
        }
    }

    /// Splits a node's regex actions into the initial and final registers
    /// of its NFA. The kind-specific action always lands in the final
    /// register; `Capture`/`Append`/`Prepend` additionally inject an
    /// `InitiateCapture` into the initial register to open the capture
    /// window. Typed `Set`/`Push` carry `payload` naming the product being
    /// stored; no capture window is opened for them.
    fn action_registers_for(
        &self,
        actions: &[RegexAction],
        payload: Option<&str>,
    ) -> (ActionRegister, ActionRegister) {
        let mut initial = ActionRegister::new();
        let mut r#final = ActionRegister::new();

        for action in actions {
            let mut translated = Action::new(
                translate_action_kind(action.kind),
                self.context_path.clone(),
                action.target.clone(),
            );
            if let Some(payload) = payload {
                translated = translated.with_payload(payload);
            }
            if let Some(field) = action.field {
                translated = translated.with_field(field);
            }
            r#final.push(translated);

            if matches!(
                action.kind,
                RegexActionKind::Capture | RegexActionKind::Append | RegexActionKind::Prepend
            ) {
                initial.push(Action::new(
                    ActionKind::InitiateCapture,
                    self.context_path.clone(),
                    action.target.clone(),
                ));
            }
        }

        (initial, r#final)
    }
}

fn translate_action_kind(kind: RegexActionKind) -> ActionKind {
    match kind {
        RegexActionKind::Flag => ActionKind::Flag,
        RegexActionKind::Unflag => ActionKind::Unflag,
        RegexActionKind::Capture => ActionKind::Capture,
        RegexActionKind::Empty => ActionKind::Empty,
        RegexActionKind::Append => ActionKind::Append,
        RegexActionKind::Prepend => ActionKind::Prepend,
        RegexActionKind::Set => ActionKind::Set,
        RegexActionKind::Unset => ActionKind::Unset,
        RegexActionKind::Push => ActionKind::Push,
        RegexActionKind::Pop => ActionKind::Pop,
        RegexActionKind::Clear => ActionKind::Clear,
    }
}
