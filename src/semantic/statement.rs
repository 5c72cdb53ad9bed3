//! Statements: the declarations inside a machine body.
//!
//! Four shapes share the machine's statement namespace. Categories and
//! productions are type-forming (a successful match produces a structured
//! value); categories, productions, and patterns are attributed (carry
//! fields and category parents); productions, patterns, and regex
//! statements carry a rule body.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::{FileLocation, StatementRef, TerminalIndex};
use crate::semantic::field::Field;
use crate::semantic::regex::DisjunctiveRegex;

/// Whether a statement is accepted at the top level of its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rootness {
    /// Accepted and handed to the consumer.
    AcceptRoot,
    /// Recognized but discarded.
    IgnoreRoot,
    Unspecified,
}

/// Whether a production's match is a leaf token or a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminality {
    Terminal,
    Nonterminal,
    Unspecified,
}

/// The attributed part shared by categories, productions, and patterns:
/// category parents and declared fields, both in declaration order.
#[derive(Debug, Clone, Default)]
pub struct AttributedPart {
    /// Parent category name to its resolved handle (filled during linking).
    pub categories: IndexMap<SmolStr, Option<StatementRef>>,
    pub fields: Vec<Field>,
}

/// A named union of statements acting as a supertype.
#[derive(Debug, Clone)]
pub struct CategoryStatement {
    pub name: SmolStr,
    pub location: FileLocation,
    pub rootness: Rootness,
    pub attrs: AttributedPart,
    /// Back-map of statements that list this category as a parent,
    /// referrer name to handle; filled during linking.
    pub references: IndexMap<SmolStr, StatementRef>,
}

/// A type-forming, rule-carrying statement.
#[derive(Debug, Clone)]
pub struct ProductionStatement {
    pub name: SmolStr,
    pub location: FileLocation,
    pub rootness: Rootness,
    pub terminality: Terminality,
    /// Machine-scoped 1-based index of terminal productions; 0 until
    /// initialization, and permanently 0 for nonterminals.
    pub terminal_index: TerminalIndex,
    pub attrs: AttributedPart,
    pub regex: DisjunctiveRegex,
}

/// A rule with attributes but no type of its own: its actions operate on
/// the enclosing context.
#[derive(Debug, Clone)]
pub struct PatternStatement {
    pub name: SmolStr,
    pub location: FileLocation,
    pub attrs: AttributedPart,
    pub regex: DisjunctiveRegex,
}

/// A bare reusable rule; actions are disallowed anywhere inside it.
#[derive(Debug, Clone)]
pub struct RegexStatement {
    pub name: SmolStr,
    pub location: FileLocation,
    pub regex: DisjunctiveRegex,
}

/// Any statement of a machine.
#[derive(Debug, Clone)]
pub enum Statement {
    Category(CategoryStatement),
    Production(ProductionStatement),
    Pattern(PatternStatement),
    Regex(RegexStatement),
}

impl Statement {
    pub fn name(&self) -> &SmolStr {
        match self {
            Self::Category(s) => &s.name,
            Self::Production(s) => &s.name,
            Self::Pattern(s) => &s.name,
            Self::Regex(s) => &s.name,
        }
    }

    pub fn location(&self) -> FileLocation {
        match self {
            Self::Category(s) => s.location,
            Self::Production(s) => s.location,
            Self::Pattern(s) => s.location,
            Self::Regex(s) => s.location,
        }
    }

    pub fn is_type_forming(&self) -> bool {
        matches!(self, Self::Category(_) | Self::Production(_))
    }

    pub fn rootness(&self) -> Rootness {
        match self {
            Self::Category(s) => s.rootness,
            Self::Production(s) => s.rootness,
            _ => Rootness::Unspecified,
        }
    }

    /// The attributed part, for the three statement shapes that have one.
    pub fn attrs(&self) -> Option<&AttributedPart> {
        match self {
            Self::Category(s) => Some(&s.attrs),
            Self::Production(s) => Some(&s.attrs),
            Self::Pattern(s) => Some(&s.attrs),
            Self::Regex(_) => None,
        }
    }

    pub fn attrs_mut(&mut self) -> Option<&mut AttributedPart> {
        match self {
            Self::Category(s) => Some(&mut s.attrs),
            Self::Production(s) => Some(&mut s.attrs),
            Self::Pattern(s) => Some(&mut s.attrs),
            Self::Regex(_) => None,
        }
    }

    /// The rule body, for the three statement shapes that carry one.
    pub fn regex(&self) -> Option<&DisjunctiveRegex> {
        match self {
            Self::Category(_) => None,
            Self::Production(s) => Some(&s.regex),
            Self::Pattern(s) => Some(&s.regex),
            Self::Regex(s) => Some(&s.regex),
        }
    }

    pub fn regex_mut(&mut self) -> Option<&mut DisjunctiveRegex> {
        match self {
            Self::Category(_) => None,
            Self::Production(s) => Some(&mut s.regex),
            Self::Pattern(s) => Some(&mut s.regex),
            Self::Regex(s) => Some(&mut s.regex),
        }
    }

    pub fn as_category(&self) -> Option<&CategoryStatement> {
        match self {
            Self::Category(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_production(&self) -> Option<&ProductionStatement> {
        match self {
            Self::Production(s) => Some(s),
            _ => None,
        }
    }

    /// True for terminal productions.
    pub fn is_terminal_production(&self) -> bool {
        matches!(
            self,
            Self::Production(p) if p.terminality == Terminality::Terminal
        )
    }
}
