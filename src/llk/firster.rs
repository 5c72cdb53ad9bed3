//! First-set computation.
//!
//! `first(item, prefix)` answers: assuming the item has already matched the
//! given prefix of symbol groups, which symbol groups can come next? An ε
//! entry in the answer means the item can complete having consumed exactly
//! the prefix. Sequencing (conjunctions, repetitions) advances a set of
//! windows over the prefix, one first-computation per window, so the
//! algebra needs no backtracking.

use crate::automata::symbol::{SymbolGroup, SymbolGroupList};
use crate::base::MachineId;
use crate::errors::{CompileError, LlkError, SemanticError};
use crate::llk::{LlkItem, LlkKey};
use crate::semantic::{
    AtomicRegex, PrimitiveKind, PrimitiveRegex, RepetitionBound, RepetitiveRegex, RootRegex,
    SemanticTree, Statement,
};

/// Computes first-sets in the scope of one machine.
pub struct Firster<'t> {
    tree: &'t SemanticTree,
    machine: MachineId,
    /// Statements currently being expanded, with the prefix length they
    /// were entered at; re-entry means left recursion.
    active: Vec<(LlkKey, usize)>,
}

impl<'t> Firster<'t> {
    pub fn new(tree: &'t SemanticTree, machine: MachineId) -> Self {
        Self {
            tree,
            machine,
            active: Vec::new(),
        }
    }

    pub fn first(
        &mut self,
        item: LlkItem<'t>,
        prefix: &SymbolGroupList,
    ) -> Result<SymbolGroupList, CompileError> {
        match item {
            LlkItem::Statement(handle, statement) => {
                let guard = (item.key(), prefix.len());
                if self.active.contains(&guard) {
                    return Err(LlkError::LeftRecursion {
                        name: statement.name().to_string(),
                        location: statement.location(),
                    }
                    .into());
                }
                self.active.push(guard);
                let result = self.first_statement(statement, prefix);
                self.active.pop();
                result
            }
            LlkItem::Disjunction(regex) => {
                let mut ret = SymbolGroupList::new();
                for conjunction in &regex.alternatives {
                    ret.merge(&self.first(LlkItem::Conjunction(conjunction), prefix)?);
                }
                Ok(ret)
            }
            LlkItem::Conjunction(regex) => {
                let items: Vec<LlkItem<'t>> =
                    regex.sequence.iter().map(LlkItem::Root).collect();
                self.first_sequence(&items, prefix)
            }
            LlkItem::Root(RootRegex::Repetitive(repetition)) => {
                self.first_repetition(repetition, prefix)
            }
            LlkItem::Root(RootRegex::Atomic(atom)) => self.first(LlkItem::Atomic(atom), prefix),
            LlkItem::Atomic(AtomicRegex::Group(group)) => {
                self.first(LlkItem::Disjunction(group), prefix)
            }
            LlkItem::Atomic(AtomicRegex::Primitive(primitive)) => {
                self.first_primitive(primitive, prefix)
            }
        }
    }

    fn first_statement(
        &mut self,
        statement: &'t Statement,
        prefix: &SymbolGroupList,
    ) -> Result<SymbolGroupList, CompileError> {
        match statement {
            Statement::Category(category) => {
                let mut ret = SymbolGroupList::new();
                for &child in category.references.values() {
                    let item = LlkItem::statement(self.tree, child);
                    ret.merge(&self.first(item, prefix)?);
                }
                Ok(ret)
            }
            _ => match statement.regex() {
                Some(regex) => self.first(LlkItem::Disjunction(regex), prefix),
                None => Ok(SymbolGroupList::new()),
            },
        }
    }

    /// The sequencing algebra: a window `(start, end)` means the item at
    /// the current position is being matched against `prefix[start..end]`.
    /// An ε in an item's first completes the item and opens a fresh window
    /// for the next one; a first-set overlapping the next prefix symbol
    /// grows the window; a first-set at the end of the prefix contributes
    /// to the answer.
    fn first_sequence(
        &mut self,
        items: &[LlkItem<'t>],
        prefix: &SymbolGroupList,
    ) -> Result<SymbolGroupList, CompileError> {
        let mut ret = SymbolGroupList::new();
        let mut next: Vec<(usize, usize)> = vec![(0, 0)];
        let mut index = 0;

        while !next.is_empty() && index < items.len() {
            let mut current = std::mem::take(&mut next);
            let mut position = 0;
            while position < current.len() {
                let (start, end) = current[position];
                let window = slice_of(prefix, start, end);

                let mut part = self.first(items[index], &window)?;
                if part.contains_epsilon() {
                    if !next.contains(&(end, end)) {
                        next.push((end, end));
                    }
                    part.remove_epsilon();
                }

                if !part.is_empty() {
                    match prefix.get(end) {
                        Some(symbol) => {
                            if part.contains_overlapping(symbol) && !current.contains(&(start, end + 1))
                            {
                                current.push((start, end + 1));
                            }
                        }
                        None => ret.merge(&part),
                    }
                }

                position += 1;
            }
            index += 1;
        }

        // the sequence derives the prefix exactly when every item completed
        // within it and the last window reached its end
        if index == items.len() && next.iter().any(|&(_, end)| end == prefix.len()) {
            ret.merge(&epsilon_list());
        }

        Ok(ret)
    }

    /// Iterated application of the sequencing step, one round per atom
    /// repetition, bounded by `max`.
    fn first_repetition(
        &mut self,
        repetition: &'t RepetitiveRegex,
        prefix: &SymbolGroupList,
    ) -> Result<SymbolGroupList, CompileError> {
        let atom = LlkItem::Atomic(&repetition.atom);
        let mut ret = SymbolGroupList::new();
        let mut next: Vec<(usize, usize)> = vec![(0, 0)];
        let mut round: u32 = 0;

        loop {
            if round >= repetition.min && next.iter().any(|&(_, end)| end == prefix.len()) {
                ret.merge(&epsilon_list());
            }

            let within_bound = match repetition.max {
                RepetitionBound::Infinite => true,
                RepetitionBound::Finite(max) => round < max,
            };
            if next.is_empty() || !within_bound {
                break;
            }

            let mut current = std::mem::take(&mut next);
            let mut position = 0;
            while position < current.len() {
                let (start, end) = current[position];
                let window = slice_of(prefix, start, end);

                let mut part = self.first(atom, &window)?;
                if part.contains_epsilon() {
                    if start == end && repetition.max == RepetitionBound::Infinite {
                        return Err(SemanticError::EmptyRepetitionLoop {
                            location: repetition.location,
                        }
                        .into());
                    }
                    if !next.contains(&(end, end)) {
                        next.push((end, end));
                    }
                    part.remove_epsilon();
                }

                if !part.is_empty() {
                    match prefix.get(end) {
                        Some(symbol) => {
                            if part.contains_overlapping(symbol) && !current.contains(&(start, end + 1))
                            {
                                current.push((start, end + 1));
                            }
                        }
                        None => ret.merge(&part),
                    }
                }

                position += 1;
            }
            round += 1;
        }

        Ok(ret)
    }

    fn first_primitive(
        &mut self,
        primitive: &'t PrimitiveRegex,
        prefix: &SymbolGroupList,
    ) -> Result<SymbolGroupList, CompileError> {
        match &primitive.kind {
            PrimitiveKind::Empty => Ok(if prefix.is_empty() {
                epsilon_list()
            } else {
                SymbolGroupList::new()
            }),
            PrimitiveKind::Reference { name, target } => match target {
                Some(target) if target.machine == self.machine => {
                    self.first(LlkItem::statement(self.tree, *target), prefix)
                }
                Some(target) => Ok(single_symbol_answer(prefix, || {
                    SymbolGroup::reference(
                        target.machine,
                        name.clone(),
                        self.tree.terminal_refs_of(*target),
                    )
                })),
                None => Ok(SymbolGroupList::new()),
            },
            PrimitiveKind::Literal(literal) => Ok(single_symbol_answer(prefix, || {
                SymbolGroup::literal(literal.clone())
            })),
            PrimitiveKind::Any(any) => Ok(span_answer(prefix, &any.spans())),
            PrimitiveKind::ExceptAny(any) => Ok(span_answer(prefix, &any.complement_spans())),
            PrimitiveKind::Arbitrary => {
                if prefix.is_empty() {
                    Ok(self.tree.arbitrary_symbol_groups(self.machine).into())
                } else if prefix.len() == 1 {
                    Ok(epsilon_list())
                } else {
                    Ok(SymbolGroupList::new())
                }
            }
        }
    }
}

fn epsilon_list() -> SymbolGroupList {
    vec![SymbolGroup::Empty].into()
}

/// The standard answer shape of single-symbol primitives: the symbol with
/// an empty prefix, ε with a one-symbol prefix (the caller already checked
/// the overlap), nothing otherwise.
fn single_symbol_answer(
    prefix: &SymbolGroupList,
    symbol: impl FnOnce() -> SymbolGroup,
) -> SymbolGroupList {
    if prefix.is_empty() {
        vec![symbol()].into()
    } else if prefix.len() == 1 {
        epsilon_list()
    } else {
        SymbolGroupList::new()
    }
}

fn span_answer(prefix: &SymbolGroupList, spans: &[(u8, u8)]) -> SymbolGroupList {
    if prefix.is_empty() {
        spans
            .iter()
            .map(|&(start, end)| SymbolGroup::byte_range(start, end))
            .collect()
    } else if prefix.len() == 1 {
        epsilon_list()
    } else {
        SymbolGroupList::new()
    }
}

fn slice_of(prefix: &SymbolGroupList, start: usize, end: usize) -> SymbolGroupList {
    (start..end)
        .filter_map(|i| prefix.get(i).cloned())
        .collect()
}
