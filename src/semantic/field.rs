//! Fields of attributed statements.

use smol_str::SmolStr;

use crate::base::{FileLocation, MachineId};

/// A field declared in the body of an attributed statement.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: SmolStr,
    pub location: FileLocation,
    pub kind: FieldKind,
}

/// The shape of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A boolean toggled by `@flag`/`@unflag`.
    Flag,
    /// A raw string filled by `@capture`/`@empty`/`@append`/`@prepend`.
    Raw,
    /// A single typed item, targeted by `@set`/`@unset`.
    Item {
        type_name: SmolStr,
        /// Machine the type resolves to; filled during linking.
        type_machine: Option<MachineId>,
    },
    /// A list of typed items, targeted by `@push`/`@pop`/`@clear`.
    List {
        type_name: SmolStr,
        type_machine: Option<MachineId>,
    },
}

impl FieldKind {
    /// Type name of a typed field, if this is one.
    pub fn type_name(&self) -> Option<&SmolStr> {
        match self {
            Self::Item { type_name, .. } | Self::List { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Raw => "raw",
            Self::Item { .. } => "item",
            Self::List { .. } => "list",
        }
    }
}
