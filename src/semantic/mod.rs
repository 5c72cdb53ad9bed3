//! The semantic model: machines, statements, fields, and regex trees.
//!
//! The surface parser produces a [`SemanticTree`] whose cross-references
//! are still unresolved names; [`SemanticTree::initialize`] links and
//! validates the model and builds, per machine, either the pseudo-DFA or
//! the LL(k) decision forest.

mod field;
mod init;
mod regex;
mod statement;

pub use field::{Field, FieldKind};
pub use regex::{
    AnyRegex, AtomicRegex, ConjunctiveRegex, DisjunctiveRegex, PrimitiveKind, PrimitiveRegex,
    RegexAction, RegexActionKind, RepetitionBound, RepetitiveRegex, RootRegex,
};
pub use statement::{
    AttributedPart, CategoryStatement, PatternStatement, ProductionStatement, RegexStatement,
    Rootness, Statement, Terminality,
};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::automata::nfa::Nfa;
use crate::automata::symbol::{SymbolGroup, TerminalRef};
use crate::base::{FieldRef, FileLocation, MachineId, StatementRef, TerminalIndex};
use crate::llk::DecisionForest;

#[cfg(test)]
mod tests;

/// What kind of recognizer a machine compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    FiniteAutomaton,
    LlkParser { k: usize },
}

/// Machine-level behavior switches set in the `with` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineFlag {
    ProductionsTerminalByDefault,
    ProductionsRootByDefault,
    CategoriesRootByDefault,
    AmbiguityResolvedByPrecedence,
}

/// A flag's state: whether it was set explicitly, and its value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagSetting {
    pub set: bool,
    pub value: bool,
}

/// An `on`/`uses` link to another machine, resolved during linking.
#[derive(Debug, Clone)]
pub struct MachineLink {
    pub name: SmolStr,
    pub location: FileLocation,
    pub target: Option<MachineId>,
}

impl MachineLink {
    pub fn unresolved(name: impl Into<SmolStr>, location: FileLocation) -> Self {
        Self {
            name: name.into(),
            location,
            target: None,
        }
    }
}

/// A named recognizer definition.
#[derive(Debug, Clone)]
pub struct Machine {
    pub name: SmolStr,
    pub location: FileLocation,
    pub kind: MachineKind,
    pub flags: IndexMap<MachineFlag, FlagSetting>,
    /// The input machine whose output stream this machine consumes; `None`
    /// means raw byte input.
    pub on: Option<MachineLink>,
    pub uses: Vec<MachineLink>,
    pub statements: IndexMap<SmolStr, Statement>,
    pub terminal_count: TerminalIndex,
    pub initialized: bool,
    /// Built during initialization of finite automata.
    pub pseudo_dfa: Option<Nfa>,
    /// Built during initialization of LL(k) parsers.
    pub decisions: Option<DecisionForest>,
}

impl Machine {
    pub fn new(name: impl Into<SmolStr>, location: FileLocation, kind: MachineKind) -> Self {
        let mut flags = IndexMap::new();
        flags.insert(MachineFlag::ProductionsTerminalByDefault, FlagSetting::default());
        flags.insert(MachineFlag::ProductionsRootByDefault, FlagSetting::default());
        flags.insert(MachineFlag::CategoriesRootByDefault, FlagSetting::default());
        flags.insert(MachineFlag::AmbiguityResolvedByPrecedence, FlagSetting::default());

        Self {
            name: name.into(),
            location,
            kind,
            flags,
            on: None,
            uses: Vec::new(),
            statements: IndexMap::new(),
            terminal_count: 0,
            initialized: false,
            pseudo_dfa: None,
            decisions: None,
        }
    }

    pub fn flag(&self, flag: MachineFlag) -> bool {
        self.flags.get(&flag).map(|s| s.value).unwrap_or(false)
    }

    pub fn set_flag(&mut self, flag: MachineFlag, value: bool) {
        self.flags.insert(flag, FlagSetting { set: true, value });
    }

    /// True when the machine reads raw bytes rather than another machine's
    /// output.
    pub fn is_raw_input(&self) -> bool {
        self.on.is_none()
    }

    pub fn statement_at(&self, index: usize) -> Option<&Statement> {
        self.statements.get_index(index).map(|(_, s)| s)
    }

    /// Indices of type-forming statements that are roots, accepted or
    /// ignored, in declaration order.
    pub fn root_indices(&self) -> Vec<usize> {
        self.statements
            .values()
            .enumerate()
            .filter(|(_, s)| s.is_type_forming() && s.rootness() != Rootness::Unspecified)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of accepted roots only.
    pub fn accept_root_indices(&self) -> Vec<usize> {
        self.statements
            .values()
            .enumerate()
            .filter(|(_, s)| s.rootness() == Rootness::AcceptRoot)
            .map(|(i, _)| i)
            .collect()
    }

    /// A machine can feed a finite automaton only if every accepted root is
    /// a terminal production.
    pub fn has_purely_terminal_roots(&self) -> bool {
        self.statements
            .values()
            .filter(|s| s.rootness() == Rootness::AcceptRoot)
            .all(Statement::is_terminal_production)
    }
}

/// A grammar file reference introduced by a top-level `uses "path";`.
#[derive(Debug, Clone)]
pub struct FileReference {
    pub path: String,
    pub location: FileLocation,
}

/// The whole parsed grammar: file references plus machines in declaration
/// order.
#[derive(Debug, Clone, Default)]
pub struct SemanticTree {
    pub file_references: Vec<FileReference>,
    pub machines: IndexMap<SmolStr, Machine>,
    pub(crate) initialized: bool,
}

impl SemanticTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(&self, id: MachineId) -> &Machine {
        let (_, machine) = self
            .machines
            .get_index(id.0)
            .unwrap_or_else(|| panic!("machine id {} out of bounds", id.0));
        machine
    }

    pub fn machine_mut(&mut self, id: MachineId) -> &mut Machine {
        let (_, machine) = self
            .machines
            .get_index_mut(id.0)
            .unwrap_or_else(|| panic!("machine id {} out of bounds", id.0));
        machine
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineId> {
        self.machines.get_index_of(name).map(MachineId)
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = MachineId> {
        (0..self.machines.len()).map(MachineId)
    }

    pub fn statement(&self, handle: StatementRef) -> &Statement {
        let machine = self.machine(handle.machine);
        machine
            .statement_at(handle.index)
            .unwrap_or_else(|| panic!("statement index {} out of bounds", handle.index))
    }

    pub fn statement_mut(&mut self, handle: StatementRef) -> &mut Statement {
        let machine = self.machine_mut(handle.machine);
        let (_, statement) = machine
            .statements
            .get_index_mut(handle.index)
            .unwrap_or_else(|| panic!("statement index {} out of bounds", handle.index));
        statement
    }

    /// Looks a statement name up in the context of `from`: used machines
    /// first, then the input machine chain, then the machine's own
    /// statements. Mirrors the name scoping of machine composition.
    pub fn find_statement(&self, from: MachineId, name: &str) -> Option<StatementRef> {
        let machine = self.machine(from);

        for link in &machine.uses {
            if let Some(target) = link.target {
                if let Some(found) = self.find_statement(target, name) {
                    return Some(found);
                }
            }
        }

        if let Some(on) = machine.on.as_ref().and_then(|link| link.target) {
            if let Some(found) = self.find_statement(on, name) {
                return Some(found);
            }
        }

        machine
            .statements
            .get_index_of(name)
            .map(|index| StatementRef::new(from, index))
    }

    /// Finds a field by name on a statement or anywhere up its category
    /// chain, depth-first in declaration order.
    pub fn find_field(&self, on: StatementRef, name: &str) -> Option<(FieldRef, &Field)> {
        let statement = self.statement(on);
        let attrs = statement.attrs()?;

        if let Some(index) = attrs.fields.iter().position(|f| f.name == name) {
            return Some((
                FieldRef {
                    statement: on,
                    field: index,
                },
                &attrs.fields[index],
            ));
        }

        self.find_category_field(attrs, name)
    }

    /// Finds a field by name in the category parents only.
    pub(crate) fn find_category_field(
        &self,
        attrs: &AttributedPart,
        name: &str,
    ) -> Option<(FieldRef, &Field)> {
        for parent in attrs.categories.values() {
            let parent = (*parent)?;
            if let Some(found) = self.find_field(parent, name) {
                return Some(found);
            }
        }
        None
    }

    /// The terminal productions a statement can stand for: a production is
    /// itself, a category is the union over its referrers, a pattern is
    /// nothing.
    pub fn instanding_productions(&self, handle: StatementRef) -> Vec<StatementRef> {
        match self.statement(handle) {
            Statement::Production(_) => vec![handle],
            Statement::Category(category) => category
                .references
                .values()
                .flat_map(|&child| self.instanding_productions(child))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Terminal references (name + index) for a statement symbol group.
    pub fn terminal_refs_of(&self, handle: StatementRef) -> Vec<TerminalRef> {
        self.instanding_productions(handle)
            .into_iter()
            .filter_map(|p| self.statement(p).as_production())
            .map(|p| TerminalRef::new(p.name.clone(), p.terminal_index))
            .collect()
    }

    /// The conditions matched by `.` in the given machine: the full byte
    /// range on raw input, or the accepted root productions of the input
    /// machine otherwise.
    pub fn arbitrary_symbol_groups(&self, machine: MachineId) -> Vec<SymbolGroup> {
        match self.machine(machine).on.as_ref().and_then(|l| l.target) {
            None => vec![SymbolGroup::byte_range(0, 255)],
            Some(on) => {
                let on_machine = self.machine(on);
                let productions: Vec<TerminalRef> = on_machine
                    .accept_root_indices()
                    .into_iter()
                    .flat_map(|i| self.terminal_refs_of(StatementRef::new(on, i)))
                    .collect();
                vec![SymbolGroup::reference(
                    on,
                    on_machine.name.clone(),
                    productions,
                )]
            }
        }
    }
}
