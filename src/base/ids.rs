//! Arena handles into the semantic tree.
//!
//! Ownership in the tree runs one way (tree owns machines, machines own
//! statements, statements own fields and regexes); every cross-reference is
//! one of these copyable handles, filled in during the linking pass of
//! initialization.

/// Index of a machine in the semantic tree, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(pub usize);

/// Handle of a statement: owning machine plus its declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementRef {
    pub machine: MachineId,
    pub index: usize,
}

impl StatementRef {
    pub fn new(machine: MachineId, index: usize) -> Self {
        Self { machine, index }
    }
}

/// Handle of a field: owning statement plus the field's declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub statement: StatementRef,
    pub field: usize,
}

/// Identity of a regex node, unique within one parsed grammar.
///
/// Assigned by the parser from a running counter; keys the LL(k)
/// bookkeeping maps without relying on node addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

/// Machine-scoped terminal type number; 1-based, 0 reserved for
/// end-of-stream.
pub type TerminalIndex = u32;
