//! Decision-tree construction for LL(k) parser machines.
//!
//! The builder walks every statement of the machine, recording where each
//! nonterminal appears (its parent and the sequence that follows it, the
//! context-sensitive follow information), and disambiguates every set of
//! alternatives: overlapping lookahead edges are disjoined and the
//! conflict is pushed one symbol deeper, up to the machine's k. Conflicts
//! surviving at depth k are LL(k) errors unless the machine resolves
//! ambiguity by declaration precedence.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::automata::afa::{Condition, Provenance};
use crate::automata::symbol::{SymbolGroup, SymbolGroupList};
use crate::base::{MachineId, StatementRef};
use crate::errors::{CompileError, LlkError};
use crate::llk::firster::Firster;
use crate::llk::{DecisionForest, DecisionPoint, DecisionTransition, LlkItem, LlkKey};
use crate::semantic::{
    AtomicRegex, ConjunctiveRegex, DisjunctiveRegex, MachineFlag, RepetitionBound, RootRegex,
    SemanticTree, Statement,
};

/// Where a nonterminal appears: under which parent, followed by what.
#[derive(Clone)]
struct NonterminalContext<'t> {
    parent: LlkItem<'t>,
    followed_by: Vec<LlkItem<'t>>,
}

/// Per-nonterminal bookkeeping: appearance contexts plus the decision
/// point built so far.
#[derive(Default)]
struct Flyweight<'t> {
    contexts: Vec<NonterminalContext<'t>>,
    decisions: DecisionPoint,
}

/// Builds the decision forest of one LL(k) parser machine.
pub struct LlkBuilder<'t> {
    tree: &'t SemanticTree,
    machine: MachineId,
    k: usize,
    resolve_by_precedence: bool,
    firster: Firster<'t>,
    flyweights: FxHashMap<LlkKey, Flyweight<'t>>,
}

impl<'t> LlkBuilder<'t> {
    pub fn new(tree: &'t SemanticTree, machine: MachineId, k: usize) -> Self {
        let resolve_by_precedence = tree
            .machine(machine)
            .flag(MachineFlag::AmbiguityResolvedByPrecedence);
        Self {
            tree,
            machine,
            k,
            resolve_by_precedence,
            firster: Firster::new(tree, machine),
            flyweights: FxHashMap::default(),
        }
    }

    /// Runs the construction over the whole machine and extracts the
    /// forest: statements in declared order, then the root disjunction.
    pub fn build(mut self) -> Result<DecisionForest, CompileError> {
        let statement_count = self.tree.machine(self.machine).statements.len();

        for index in 0..statement_count {
            let handle = StatementRef::new(self.machine, index);
            self.visit_statement(handle)?;
        }

        let roots: Vec<LlkItem<'t>> = self
            .tree
            .machine(self.machine)
            .accept_root_indices()
            .into_iter()
            .map(|index| LlkItem::statement(self.tree, StatementRef::new(self.machine, index)))
            .collect();
        self.disambiguate(&roots)?;

        let mut root = DecisionPoint::default();
        for item in &roots {
            root.merge(&self.decisions_of(item.key()));
        }

        let mut forest = DecisionForest {
            statements: Default::default(),
            root,
        };
        for index in 0..statement_count {
            let handle = StatementRef::new(self.machine, index);
            let name = self.tree.statement(handle).name().clone();
            forest
                .statements
                .insert(name, self.decisions_of(LlkKey::Statement(handle)));
        }

        debug!(
            machine = %self.tree.machine(self.machine).name,
            statements = forest.statements.len(),
            "built decision forest"
        );
        Ok(forest)
    }

    fn decisions_of(&self, key: LlkKey) -> DecisionPoint {
        self.flyweights
            .get(&key)
            .map(|f| f.decisions.clone())
            .unwrap_or_default()
    }

    fn visit_statement(&mut self, handle: StatementRef) -> Result<(), CompileError> {
        let item = LlkItem::statement(self.tree, handle);
        match self.tree.statement(handle) {
            Statement::Category(category) => {
                let mut alternatives = Vec::new();
                for &child in category.references.values() {
                    let child_item = LlkItem::statement(self.tree, child);
                    alternatives.push(child_item);
                    self.register_context_appearance(child_item, item, Vec::new());
                }
                self.disambiguate(&alternatives)?;
                self.fill_parent_decisions(item.key(), &alternatives);
            }
            statement => {
                if let Some(regex) = statement.regex() {
                    self.visit_disjunction(regex)?;
                    let decisions = self.decisions_of(LlkKey::Node(regex.node));
                    self.flyweight_mut(item.key()).decisions = decisions;
                }
            }
        }

        // rules without internal conflicts still get their entry decision,
        // and the first computation surfaces ε-loops and left recursion
        // even when no disambiguation touches the statement
        let mut point = std::mem::take(&mut self.flyweight_mut(item.key()).decisions);
        let outcome = self.fill_decision_point(item, &mut point, &SymbolGroupList::new());
        self.flyweight_mut(item.key()).decisions = point;
        outcome
    }

    fn visit_disjunction(&mut self, regex: &'t DisjunctiveRegex) -> Result<(), CompileError> {
        let parent = LlkItem::Disjunction(regex);

        let mut alternatives = Vec::new();
        for conjunction in &regex.alternatives {
            let item = LlkItem::Conjunction(conjunction);
            alternatives.push(item);
            self.register_context_appearance(item, parent, Vec::new());
            self.visit_conjunction(conjunction)?;
        }
        self.disambiguate(&alternatives)?;
        self.fill_parent_decisions(parent.key(), &alternatives);
        Ok(())
    }

    fn visit_conjunction(&mut self, regex: &'t ConjunctiveRegex) -> Result<(), CompileError> {
        let parent = LlkItem::Conjunction(regex);

        // walk backwards so each element knows its sequential tail
        let mut tail: Vec<LlkItem<'t>> = Vec::new();
        for root in regex.sequence.iter().rev() {
            let item = LlkItem::Root(root);
            self.register_context_appearance(item, parent, tail.clone());
            tail.insert(0, item);
            self.visit_root(root)?;
        }

        if regex.sequence.is_empty() {
            let flyweight = self.flyweight_mut(parent.key());
            if flyweight.decisions.transitions.is_empty() {
                flyweight.decisions.transitions.push(DecisionTransition {
                    condition: SymbolGroup::Empty,
                    point: DecisionPoint::default(),
                });
            }
        }
        Ok(())
    }

    fn visit_root(&mut self, root: &'t RootRegex) -> Result<(), CompileError> {
        match root {
            RootRegex::Repetitive(repetition) => {
                let parent = LlkItem::Root(root);
                let atom = LlkItem::Atomic(&repetition.atom);

                // inside the repetition, the atom is followed by up to
                // max - 1 further copies of itself; an unbounded tail keeps
                // one copy in the follow so iteration stays visible
                let cap = match repetition.max {
                    RepetitionBound::Infinite => repetition.min.max(1),
                    RepetitionBound::Finite(max) => max,
                };
                let continuation: Vec<LlkItem<'t>> =
                    (1..cap).map(|_| atom).collect();
                self.register_context_appearance(atom, parent, continuation);
                if repetition.max == RepetitionBound::Infinite {
                    self.register_context_appearance(atom, parent, vec![atom]);
                }

                self.visit_atomic(&repetition.atom)
            }
            RootRegex::Atomic(atom) => self.visit_atomic(atom),
        }
    }

    fn visit_atomic(&mut self, atom: &'t AtomicRegex) -> Result<(), CompileError> {
        match atom {
            AtomicRegex::Group(group) => self.visit_disjunction(group),
            AtomicRegex::Primitive(_) => Ok(()),
        }
    }

    fn flyweight_mut(&mut self, key: LlkKey) -> &mut Flyweight<'t> {
        self.flyweights.entry(key).or_default()
    }

    fn register_context_appearance(
        &mut self,
        target: LlkItem<'t>,
        parent: LlkItem<'t>,
        followed_by: Vec<LlkItem<'t>>,
    ) {
        let flyweight = self.flyweight_mut(target.key());
        let exists = flyweight.contexts.iter().any(|context| {
            context.parent.key() == parent.key()
                && context.followed_by.len() == followed_by.len()
                && context
                    .followed_by
                    .iter()
                    .zip(&followed_by)
                    .all(|(a, b)| a.key() == b.key())
        });
        if !exists {
            flyweight.contexts.push(NonterminalContext {
                parent,
                followed_by,
            });
        }
    }

    /// After disambiguating a set of alternatives, the parent's decision
    /// point is the union of theirs.
    fn fill_parent_decisions(&mut self, parent: LlkKey, alternatives: &[LlkItem<'t>]) {
        let mut combined = DecisionPoint::default();
        for alternative in alternatives {
            combined.merge(&self.decisions_of(alternative.key()));
        }
        self.flyweight_mut(parent).decisions.merge(&combined);
    }

    /// Pairwise disambiguation over a set of alternatives.
    fn disambiguate(&mut self, alternatives: &[LlkItem<'t>]) -> Result<(), CompileError> {
        for first_index in 0..alternatives.len() {
            for second_index in first_index + 1..alternatives.len() {
                self.disambiguate_pair(alternatives[first_index], alternatives[second_index])?;
            }
        }
        Ok(())
    }

    fn disambiguate_pair(
        &mut self,
        first: LlkItem<'t>,
        second: LlkItem<'t>,
    ) -> Result<(), CompileError> {
        let mut first_point = std::mem::take(&mut self.flyweight_mut(first.key()).decisions);
        let mut second_point = std::mem::take(&mut self.flyweight_mut(second.key()).decisions);

        let mut prefix = SymbolGroupList::new();
        let outcome = self.disambiguate_decision_points(
            first,
            second,
            &mut first_point,
            &mut second_point,
            &mut prefix,
        );

        self.flyweight_mut(first.key()).decisions = first_point;
        self.flyweight_mut(second.key()).decisions = second_point;
        outcome
    }

    fn disambiguate_decision_points(
        &mut self,
        first: LlkItem<'t>,
        second: LlkItem<'t>,
        first_point: &mut DecisionPoint,
        second_point: &mut DecisionPoint,
        prefix: &mut SymbolGroupList,
    ) -> Result<(), CompileError> {
        if prefix.len() >= self.k {
            if self.resolve_by_precedence {
                // the alternative declared first wins; stop refining
                return Ok(());
            }
            return Err(LlkError::LookaheadExceeded {
                k: self.k,
                first: first.describe(),
                second: second.describe(),
                witness: prefix.as_sequence_string(),
            }
            .into());
        }

        self.fill_decision_point(first, first_point, prefix)?;
        self.fill_decision_point(second, second_point, prefix)?;

        let mut first_index = 0;
        while first_index < first_point.transitions.len() {
            let mut second_index = 0;
            while second_index < second_point.transitions.len() {
                let overlapping = {
                    let first_condition = &first_point.transitions[first_index].condition;
                    let second_condition = &second_point.transitions[second_index].condition;
                    !first_condition.disjoint(second_condition)
                };

                if overlapping {
                    let pieces = {
                        let first_transition = &mut first_point.transitions[first_index];
                        let second_transition = &mut second_point.transitions[second_index];
                        first_transition
                            .condition
                            .disjoin_from(&mut second_transition.condition)
                    };

                    let first_child = first_point.transitions[first_index].point.clone();
                    let second_child = second_point.transitions[second_index].point.clone();
                    for (condition, provenance) in pieces {
                        match provenance {
                            Provenance::Left => first_point.transitions.push(DecisionTransition {
                                condition,
                                point: first_child.clone(),
                            }),
                            Provenance::Right => {
                                second_point.transitions.push(DecisionTransition {
                                    condition,
                                    point: second_child.clone(),
                                })
                            }
                        }
                    }

                    // both conditions are now the overlap; the conflict
                    // moves one lookahead symbol deeper
                    prefix.push(first_point.transitions[first_index].condition.clone());
                    {
                        let first_child = &mut first_point.transitions[first_index].point;
                        let second_child = &mut second_point.transitions[second_index].point;
                        self.disambiguate_decision_points(
                            first,
                            second,
                            first_child,
                            second_child,
                            prefix,
                        )?;
                    }
                    prefix.pop();
                }

                second_index += 1;
            }
            first_index += 1;
        }

        Ok(())
    }

    /// Fills an empty decision node with the lookahead symbols admissible
    /// after `prefix`: the item's first-set, extended through its
    /// appearance contexts when the item can complete within the prefix.
    fn fill_decision_point(
        &mut self,
        item: LlkItem<'t>,
        point: &mut DecisionPoint,
        prefix: &SymbolGroupList,
    ) -> Result<(), CompileError> {
        if !point.transitions.is_empty() {
            return Ok(());
        }

        let mut symbols = self.firster.first(item, prefix)?;
        if symbols.contains_epsilon() {
            symbols.remove_epsilon();
            let mut visited = vec![item.key()];
            let follow = self.follow_symbols(item, &mut visited)?;
            symbols.merge(&follow);
        }

        for condition in symbols {
            point.transitions.push(DecisionTransition {
                condition,
                point: DecisionPoint::default(),
            });
        }
        Ok(())
    }

    /// Context-sensitive follow: the symbols that may come after the item,
    /// derived from the sequential tails of its appearances, falling back
    /// to each parent's follow when a tail can derive empty.
    fn follow_symbols(
        &mut self,
        item: LlkItem<'t>,
        visited: &mut Vec<LlkKey>,
    ) -> Result<SymbolGroupList, CompileError> {
        let contexts = match self.flyweights.get(&item.key()) {
            Some(flyweight) => flyweight.contexts.clone(),
            None => Vec::new(),
        };

        let empty_prefix = SymbolGroupList::new();
        let mut ret = SymbolGroupList::new();

        for context in contexts {
            let mut tail_exhausted = true;
            for follower in &context.followed_by {
                let mut part = self.firster.first(*follower, &empty_prefix)?;
                let had_epsilon = part.contains_epsilon();
                part.remove_epsilon();
                ret.merge(&part);
                if !had_epsilon {
                    tail_exhausted = false;
                    break;
                }
            }

            if tail_exhausted && !visited.contains(&context.parent.key()) {
                visited.push(context.parent.key());
                let parent_follow = self.follow_symbols(context.parent, visited)?;
                ret.merge(&parent_follow);
            }
        }

        Ok(ret)
    }
}
