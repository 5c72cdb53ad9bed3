//! The regex tree carried by rule statements.
//!
//! A rule's body is a disjunction of conjunctions of root regexes; each
//! root is either a repetition around an atom or an atom itself, and an
//! atom is either a parenthesized group or a primitive. Action suffixes
//! (`@capture:field` and friends) can hang off any root. Reference
//! primitives start out as bare names; the linking pass resolves them to
//! statement handles.

use smol_str::SmolStr;

use crate::base::{FieldRef, FileLocation, NodeId, StatementRef};

/// What an `@action:target` suffix does to its target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexActionKind {
    Flag,
    Unflag,
    Capture,
    Empty,
    Append,
    Prepend,
    Set,
    Unset,
    Push,
    Pop,
    Clear,
}

/// An action suffix attached to a root regex.
#[derive(Debug, Clone)]
pub struct RegexAction {
    pub kind: RegexActionKind,
    pub target: SmolStr,
    pub location: FileLocation,
    /// Resolved target field; filled during validation.
    pub field: Option<FieldRef>,
}

/// Alternatives separated by `|`.
#[derive(Debug, Clone, Default)]
pub struct DisjunctiveRegex {
    pub node: NodeId,
    pub location: FileLocation,
    pub alternatives: Vec<ConjunctiveRegex>,
    pub actions: Vec<RegexAction>,
}

/// A juxtaposed sequence of root regexes.
#[derive(Debug, Clone, Default)]
pub struct ConjunctiveRegex {
    pub node: NodeId,
    pub location: FileLocation,
    pub sequence: Vec<RootRegex>,
}

/// One element of a conjunction: a repetition or a bare atom.
#[derive(Debug, Clone)]
pub enum RootRegex {
    Repetitive(RepetitiveRegex),
    Atomic(AtomicRegex),
}

impl RootRegex {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Repetitive(repetition) => repetition.node,
            Self::Atomic(atom) => atom.node(),
        }
    }

    pub fn location(&self) -> FileLocation {
        match self {
            Self::Repetitive(repetition) => repetition.location,
            Self::Atomic(atom) => atom.location(),
        }
    }

    pub fn actions(&self) -> &[RegexAction] {
        match self {
            Self::Repetitive(repetition) => &repetition.actions,
            Self::Atomic(AtomicRegex::Group(group)) => &group.actions,
            Self::Atomic(AtomicRegex::Primitive(primitive)) => &primitive.actions,
        }
    }

    pub fn actions_mut(&mut self) -> &mut Vec<RegexAction> {
        match self {
            Self::Repetitive(repetition) => &mut repetition.actions,
            Self::Atomic(AtomicRegex::Group(group)) => &mut group.actions,
            Self::Atomic(AtomicRegex::Primitive(primitive)) => &mut primitive.actions,
        }
    }
}

/// Upper bound of a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionBound {
    Finite(u32),
    Infinite,
}

/// `atom?`, `atom*`, `atom+`, or `atom{min,max}`.
#[derive(Debug, Clone)]
pub struct RepetitiveRegex {
    pub node: NodeId,
    pub location: FileLocation,
    pub min: u32,
    pub max: RepetitionBound,
    pub atom: Box<AtomicRegex>,
    pub actions: Vec<RegexAction>,
}

/// A parenthesized group or a primitive.
#[derive(Debug, Clone)]
pub enum AtomicRegex {
    Group(Box<DisjunctiveRegex>),
    Primitive(PrimitiveRegex),
}

impl AtomicRegex {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Group(group) => group.node,
            Self::Primitive(primitive) => primitive.node,
        }
    }

    pub fn location(&self) -> FileLocation {
        match self {
            Self::Group(group) => group.location,
            Self::Primitive(primitive) => primitive.location,
        }
    }
}

/// A leaf of the regex tree.
#[derive(Debug, Clone)]
pub struct PrimitiveRegex {
    pub node: NodeId,
    pub location: FileLocation,
    pub kind: PrimitiveKind,
    pub actions: Vec<RegexAction>,
}

#[derive(Debug, Clone)]
pub enum PrimitiveKind {
    /// `()` - matches the empty string.
    Empty,
    /// A literal byte string.
    Literal(SmolStr),
    /// `[...]` - any of the listed bytes and ranges.
    Any(AnyRegex),
    /// `[^...]` - any byte except the listed ones.
    ExceptAny(AnyRegex),
    /// `.` - any symbol of the machine's input alphabet.
    Arbitrary,
    /// A statement referenced by name.
    Reference {
        name: SmolStr,
        /// Resolved handle; filled during linking.
        target: Option<StatementRef>,
    },
}

/// Byte content of an any-of / any-except set.
#[derive(Debug, Clone, Default)]
pub struct AnyRegex {
    pub bytes: Vec<u8>,
    pub ranges: Vec<(u8, u8)>,
}

impl AnyRegex {
    /// The byte coverage of the set, one inclusive range per entry, in
    /// declaration order.
    pub fn spans(&self) -> Vec<(u8, u8)> {
        let mut spans: Vec<(u8, u8)> = self.bytes.iter().map(|&b| (b, b)).collect();
        spans.extend(self.ranges.iter().copied());
        spans
    }

    /// The complement of the set over the byte alphabet, as sorted maximal
    /// ranges.
    pub fn complement_spans(&self) -> Vec<(u8, u8)> {
        let mut covered = [false; 256];
        for (start, end) in self.spans() {
            for value in start..=end {
                covered[value as usize] = true;
            }
        }

        let mut spans = Vec::new();
        let mut run_start: Option<u8> = None;
        for value in 0..=255u8 {
            match (covered[value as usize], run_start) {
                (false, None) => run_start = Some(value),
                (true, Some(start)) => {
                    spans.push((start, value - 1));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            spans.push((start, 255));
        }
        spans
    }
}
