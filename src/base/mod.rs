//! Foundation types for the astir compiler.
//!
//! This module provides fundamental types used throughout the compiler:
//! - [`FileLocation`] - line/column positions in grammar source
//! - [`MachineId`], [`StatementRef`], [`FieldRef`] - arena handles into the
//!   semantic tree
//! - [`NodeId`] - identity of regex nodes, assigned at parse time
//! - [`TerminalIndex`] - machine-scoped terminal type numbering
//!
//! This module has NO dependencies on other astir modules.

mod ids;
mod location;

pub use ids::{FieldRef, MachineId, NodeId, StatementRef, TerminalIndex};
pub use location::FileLocation;
