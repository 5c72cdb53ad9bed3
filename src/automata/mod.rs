//! Automaton machinery: condition sets, action registers, the abstract
//! finite automaton framework, its NFA specialization, and the builder that
//! translates the semantic model into NFAs.
//!
//! Layering (leaves first): `symbol` and `action` are standalone; `afa` is
//! generic over both; `nfa` fixes the generic parameters to symbol groups
//! and action registers; `builder` walks the semantic tree emitting NFAs.

pub mod action;
pub mod afa;
pub mod builder;
pub mod nfa;
pub mod symbol;

pub use action::{Action, ActionKind, ActionRegister};
pub use afa::{Afa, Condition, Provenance, Register, StateId, StateObject, Transition};
pub use builder::NfaBuilder;
pub use nfa::Nfa;
pub use symbol::{SymbolGroup, SymbolGroupList, TerminalRef};

#[cfg(test)]
mod tests;
