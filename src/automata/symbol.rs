//! Condition sets over input alphabets.
//!
//! A [`SymbolGroup`] describes the set of input symbols a transition or a
//! decision-tree edge accepts: nothing (ε), a byte range, a multi-byte
//! literal, or "any instance of these terminal productions of machine M".
//! The groups support equality, disjointness, and *disjoining* - splitting
//! two overlapping groups into pairwise disjoint pieces with provenance, the
//! operation both the subset construction and the LL(k) disambiguation are
//! built on.

use smol_str::SmolStr;

use crate::automata::afa::{Condition, Provenance};
use crate::base::{MachineId, TerminalIndex};

/// The input bytes a literal stands for: each char's scalar value folded
/// to a byte (escape decoding never produces chars above 0xff).
pub fn literal_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| (c as u32).min(0xff) as u8).collect()
}

/// A terminal production referenced by a statement symbol group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRef {
    pub name: SmolStr,
    pub index: TerminalIndex,
}

impl TerminalRef {
    pub fn new(name: impl Into<SmolStr>, index: TerminalIndex) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// A set of input symbols guarding a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolGroup {
    /// The ε condition: consumes nothing, disjoint from every other shape.
    Empty,
    /// An inclusive byte range `[start, end]`.
    Byte { start: u8, end: u8 },
    /// A multi-byte literal, treated as an indivisible unit. Length-1
    /// literals are normalized to byte ranges at construction.
    Literal(SmolStr),
    /// Any instance of the listed terminal productions of `machine`.
    Reference {
        machine: MachineId,
        name: SmolStr,
        productions: Vec<TerminalRef>,
    },
}

impl SymbolGroup {
    pub fn byte(value: u8) -> Self {
        Self::Byte {
            start: value,
            end: value,
        }
    }

    pub fn byte_range(start: u8, end: u8) -> Self {
        Self::Byte { start, end }
    }

    /// Build a literal group, normalizing length-1 literals to byte ranges
    /// so that a single-byte literal and the range containing it compare
    /// and disjoin identically.
    pub fn literal(text: impl Into<SmolStr>) -> Self {
        let text = text.into();
        match literal_bytes(&text)[..] {
            [single] => Self::byte(single),
            _ => Self::Literal(text),
        }
    }

    pub fn reference(
        machine: MachineId,
        name: impl Into<SmolStr>,
        productions: Vec<TerminalRef>,
    ) -> Self {
        Self::Reference {
            machine,
            name: name.into(),
            productions,
        }
    }

    /// Human-readable rendering used in diagnostics and emitted tables.
    pub fn describe(&self) -> String {
        fn byte_text(value: u8) -> String {
            if value.is_ascii_graphic() || value == b' ' {
                format!("'{}'", value as char)
            } else {
                format!("0x{value:02x}")
            }
        }

        match self {
            Self::Empty => "()".to_string(),
            Self::Byte { start, end } if start == end => byte_text(*start),
            Self::Byte { start, end } => {
                format!("{}-{}", byte_text(*start), byte_text(*end))
            }
            Self::Literal(text) => format!("'{text}'"),
            Self::Reference { name, .. } => name.to_string(),
        }
    }
}

impl Condition for SymbolGroup {
    fn epsilon() -> Self {
        Self::Empty
    }

    fn is_epsilon(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn is_vacant(&self) -> bool {
        matches!(self, Self::Reference { productions, .. } if productions.is_empty())
    }

    fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (
                Self::Byte { start, end },
                Self::Byte {
                    start: other_start,
                    end: other_end,
                },
            ) => start == other_start && end == other_end,
            (Self::Literal(text), Self::Literal(other_text)) => text == other_text,
            (
                Self::Reference {
                    machine,
                    productions,
                    ..
                },
                Self::Reference {
                    machine: other_machine,
                    productions: other_productions,
                    ..
                },
            ) => {
                machine == other_machine
                    && productions.len() == other_productions.len()
                    && productions
                        .iter()
                        .zip(other_productions)
                        .all(|(a, b)| a.name == b.name)
            }
            _ => false,
        }
    }

    fn disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, other) => !other.is_epsilon(),
            (_, Self::Empty) => true,
            (
                Self::Byte { start, end },
                Self::Byte {
                    start: other_start,
                    end: other_end,
                },
            ) => start > other_end || other_start > end,
            (Self::Literal(text), Self::Literal(other_text)) => text != other_text,
            (
                Self::Reference {
                    machine,
                    productions,
                    ..
                },
                Self::Reference {
                    machine: other_machine,
                    productions: other_productions,
                    ..
                },
            ) => {
                machine != other_machine
                    || productions
                        .iter()
                        .all(|p| other_productions.iter().all(|q| p.name != q.name))
            }
            _ => true,
        }
    }

    /// Split two overlapping, non-equal groups into pairwise disjoint
    /// pieces.
    ///
    /// Both inputs are mutated to the overlap; the returned pieces cover the
    /// rest of the union, each tagged with the input it descends from. For
    /// equal or disjoint inputs this is a no-op returning no pieces.
    fn disjoin_from(&mut self, other: &mut Self) -> Vec<(Self, Provenance)> {
        if self.equals(other) || self.disjoint(other) {
            return Vec::new();
        }

        match (&mut *self, &mut *other) {
            (
                Self::Byte { start, end },
                Self::Byte {
                    start: other_start,
                    end: other_end,
                },
            ) => {
                let mut pieces = Vec::new();

                let mid_start = (*start).max(*other_start);
                let mid_end = (*end).min(*other_end);

                let bottom_start = (*start).min(*other_start);
                if bottom_start < mid_start {
                    let provenance = if bottom_start == *start {
                        Provenance::Left
                    } else {
                        Provenance::Right
                    };
                    pieces.push((Self::byte_range(bottom_start, mid_start - 1), provenance));
                }

                let top_end = (*end).max(*other_end);
                if top_end > mid_end {
                    let provenance = if top_end == *end {
                        Provenance::Left
                    } else {
                        Provenance::Right
                    };
                    pieces.push((Self::byte_range(mid_end + 1, top_end), provenance));
                }

                *start = mid_start;
                *end = mid_end;
                *other_start = mid_start;
                *other_end = mid_end;

                pieces
            }
            (
                Self::Reference {
                    machine,
                    name,
                    productions,
                },
                Self::Reference {
                    name: other_name,
                    productions: other_productions,
                    ..
                },
            ) => {
                let mut shared = Vec::new();
                let mut left_only = Vec::new();
                for production in productions.drain(..) {
                    if other_productions.iter().any(|q| q.name == production.name) {
                        shared.push(production);
                    } else {
                        left_only.push(production);
                    }
                }
                let right_only: Vec<TerminalRef> = other_productions
                    .drain(..)
                    .filter(|q| shared.iter().all(|p| p.name != q.name))
                    .collect();

                let mut pieces = Vec::new();
                if !left_only.is_empty() {
                    pieces.push((
                        Self::Reference {
                            machine: *machine,
                            name: name.clone(),
                            productions: left_only,
                        },
                        Provenance::Left,
                    ));
                }
                if !right_only.is_empty() {
                    pieces.push((
                        Self::Reference {
                            machine: *machine,
                            name: other_name.clone(),
                            productions: right_only,
                        },
                        Provenance::Right,
                    ));
                }

                *productions = shared.clone();
                *other_productions = shared;

                pieces
            }
            // Literal/byte, literal/literal and reference/anything pairs are
            // either equal or disjoint, handled above.
            _ => Vec::new(),
        }
    }
}

/// An ordered list of symbol groups, the currency of first-set computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolGroupList(Vec<SymbolGroup>);

impl SymbolGroupList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: SymbolGroup) {
        self.0.push(group);
    }

    pub fn pop(&mut self) -> Option<SymbolGroup> {
        self.0.pop()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymbolGroup> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&SymbolGroup> {
        self.0.get(index)
    }

    /// True when the list holds a group equal to or overlapping `group`.
    pub fn contains_overlapping(&self, group: &SymbolGroup) -> bool {
        self.0
            .iter()
            .any(|g| g.equals(group) || !g.disjoint(group))
    }

    pub fn contains_epsilon(&self) -> bool {
        self.0.iter().any(SymbolGroup::is_epsilon)
    }

    pub fn remove_epsilon(&mut self) {
        self.0.retain(|g| !g.is_epsilon());
    }

    /// Ordered-set union: appends groups from `other` that no existing
    /// entry equals.
    pub fn merge(&mut self, other: &SymbolGroupList) {
        for group in &other.0 {
            if !self.0.iter().any(|g| g.equals(group)) {
                self.0.push(group.clone());
            }
        }
    }

    pub fn extend(&mut self, other: SymbolGroupList) {
        self.0.extend(other.0);
    }

    /// Renders the list as a prefix witness, e.g. `"'a' 'b'"`.
    pub fn as_sequence_string(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(SymbolGroup::describe).collect();
        parts.join(" ")
    }
}

impl From<Vec<SymbolGroup>> for SymbolGroupList {
    fn from(groups: Vec<SymbolGroup>) -> Self {
        Self(groups)
    }
}

impl FromIterator<SymbolGroup> for SymbolGroupList {
    fn from_iter<T: IntoIterator<Item = SymbolGroup>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SymbolGroupList {
    type Item = SymbolGroup;
    type IntoIter = std::vec::IntoIter<SymbolGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SymbolGroupList {
    type Item = &'a SymbolGroup;
    type IntoIter = std::slice::Iter<'a, SymbolGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
