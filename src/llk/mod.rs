//! LL(k) analysis: first-set computation and decision-tree construction.
//!
//! For parser machines, every decision between alternatives is compiled
//! into a prefix tree of symbol-group edges. Sibling edges at any depth are
//! pairwise disjoint; a path from the root spells out a lookahead prefix of
//! length at most k that commits the parser to one alternative.

mod builder;
mod firster;

pub use builder::LlkBuilder;
pub use firster::Firster;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::automata::afa::Condition;
use crate::automata::symbol::{SymbolGroup, SymbolGroupList};
use crate::base::{FileLocation, NodeId, StatementRef};
use crate::semantic::{AtomicRegex, ConjunctiveRegex, DisjunctiveRegex, RootRegex, SemanticTree, Statement};

#[cfg(test)]
mod tests;

/// One lookahead decision node: edges to deeper decisions, keyed by
/// pairwise-disjoint symbol groups.
#[derive(Debug, Clone, Default)]
pub struct DecisionPoint {
    pub transitions: Vec<DecisionTransition>,
}

/// An edge of the decision tree.
#[derive(Debug, Clone)]
pub struct DecisionTransition {
    pub condition: SymbolGroup,
    pub point: DecisionPoint,
}

impl DecisionPoint {
    /// The conditions of the outgoing edges, in order.
    pub fn condition_symbols(&self) -> SymbolGroupList {
        self.transitions.iter().map(|t| t.condition.clone()).collect()
    }

    /// Union of two decision points: edges with equal conditions merge
    /// their subtrees, new conditions are appended.
    pub fn merge(&mut self, other: &DecisionPoint) {
        for incoming in &other.transitions {
            match self
                .transitions
                .iter_mut()
                .find(|t| t.condition.equals(&incoming.condition))
            {
                Some(existing) => existing.point.merge(&incoming.point),
                None => self.transitions.push(incoming.clone()),
            }
        }
    }

    /// Longest root-to-leaf edge count.
    pub fn depth(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| 1 + t.point.depth())
            .max()
            .unwrap_or(0)
    }
}

/// The per-machine product of LL(k) construction, handed to emitters.
#[derive(Debug, Clone, Default)]
pub struct DecisionForest {
    /// Per-statement decision trees, in declaration order.
    pub statements: IndexMap<SmolStr, DecisionPoint>,
    /// The decision between the machine's accepted roots.
    pub root: DecisionPoint,
}

/// Identity of an LL(k) nonterminal for bookkeeping maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlkKey {
    Statement(StatementRef),
    Node(NodeId),
}

/// A borrowed handle on anything the firster can compute a first-set of.
#[derive(Clone, Copy)]
pub enum LlkItem<'t> {
    Statement(StatementRef, &'t Statement),
    Disjunction(&'t DisjunctiveRegex),
    Conjunction(&'t ConjunctiveRegex),
    Root(&'t RootRegex),
    Atomic(&'t AtomicRegex),
}

impl<'t> LlkItem<'t> {
    pub fn statement(tree: &'t SemanticTree, handle: StatementRef) -> Self {
        Self::Statement(handle, tree.statement(handle))
    }

    pub fn key(&self) -> LlkKey {
        match self {
            Self::Statement(handle, _) => LlkKey::Statement(*handle),
            Self::Disjunction(regex) => LlkKey::Node(regex.node),
            Self::Conjunction(regex) => LlkKey::Node(regex.node),
            Self::Root(regex) => LlkKey::Node(regex.node()),
            Self::Atomic(atom) => LlkKey::Node(atom.node()),
        }
    }

    pub fn location(&self) -> FileLocation {
        match self {
            Self::Statement(_, statement) => statement.location(),
            Self::Disjunction(regex) => regex.location,
            Self::Conjunction(regex) => regex.location,
            Self::Root(regex) => regex.location(),
            Self::Atomic(atom) => atom.location(),
        }
    }

    /// How the item is named in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Statement(_, statement) => format!("'{}'", statement.name()),
            Self::Conjunction(regex) => format!("the alternative at {}", regex.location),
            Self::Disjunction(regex) => format!("the disjunction at {}", regex.location),
            Self::Root(regex) => format!("the regex at {}", regex.location()),
            Self::Atomic(atom) => format!("the regex at {}", atom.location()),
        }
    }
}
