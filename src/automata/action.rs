//! Side-effect descriptors carried along automaton transitions.
//!
//! Recognizer machines do more than accept: entering a state or taking a
//! transition can create a tree-building context, capture raw input into a
//! field, or push a finished product onto a list. Each such effect is an
//! [`Action`]; an [`ActionRegister`] is the ordered set of actions attached
//! to one state or transition.

use smol_str::SmolStr;

use crate::automata::afa::Register;
use crate::base::FieldRef;

/// The operation an action performs when its state or transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Flag,
    Unflag,

    InitiateCapture,
    Capture,
    Empty,
    Append,
    Prepend,

    Set,
    Unset,
    Push,
    Pop,
    Clear,

    CreateContext,
    TerminalizeContext,
    ElevateContext,
    IgnoreContext,
}

/// One side effect: what to do, on which context, to which target.
#[derive(Debug, Clone, Eq)]
pub struct Action {
    pub kind: ActionKind,
    /// The `__`-joined path of the context the action operates on.
    pub context_path: String,
    /// Field name or subcontext name the action targets.
    pub target: SmolStr,
    /// For `Set`/`Push`: identifies the product being stored.
    pub payload: Option<String>,
    /// The resolved target field, where the target names one.
    pub field: Option<FieldRef>,
}

impl Action {
    pub fn new(kind: ActionKind, context_path: impl Into<String>, target: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            context_path: context_path.into(),
            target: target.into(),
            payload: None,
            field: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_field(mut self, field: FieldRef) -> Self {
        self.field = Some(field);
        self
    }

    /// Two actions occupy the same register slot when they have the same
    /// kind, context path, and target; payload and resolved field are data,
    /// not identity.
    pub fn same_slot(&self, other: &Action) -> bool {
        self.kind == other.kind
            && self.context_path == other.context_path
            && self.target == other.target
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.same_slot(other) && self.payload == other.payload
    }
}

/// Ordered set of actions: a plain list for iteration and equality, a set
/// for union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRegister(Vec<Action>);

impl ActionRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(actions: Vec<Action>) -> Self {
        let mut register = Self::new();
        for action in actions {
            register.push(action);
        }
        register
    }

    /// Appends unless an action with the same slot is already present,
    /// preserving first-occurrence order.
    pub fn push(&mut self, action: Action) {
        if !self.0.iter().any(|a| a.same_slot(&action)) {
            self.0.push(action);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.0.iter()
    }

    /// Returns the union `prefix + self`, with `prefix` entries first.
    pub fn prefixed_with(&self, prefix: &ActionRegister) -> ActionRegister {
        let mut combined = prefix.clone();
        combined.merge(self);
        combined
    }
}

impl Register for ActionRegister {
    fn merge(&mut self, other: &Self) {
        for action in &other.0 {
            self.push(action.clone());
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a ActionRegister {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn flag(target: &str) -> Action {
        Action::new(ActionKind::Flag, "m_token", target)
    }

    #[test]
    fn test_union_skips_present_slots() {
        let mut left = ActionRegister::of(vec![flag("a"), flag("b")]);
        let right = ActionRegister::of(vec![flag("b"), flag("c")]);
        left.merge(&right);

        let targets: Vec<&str> = left.iter().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_slot_identity_ignores_payload() {
        let mut register = ActionRegister::new();
        register.push(Action::new(ActionKind::Set, "ctx", "f").with_payload("X"));
        register.push(Action::new(ActionKind::Set, "ctx", "f").with_payload("Y"));
        assert_eq!(register.len(), 1);
        assert_eq!(register.iter().next().and_then(|a| a.payload.as_deref()), Some("X"));
    }

    #[test]
    fn test_prefixed_with_puts_prefix_first() {
        let register = ActionRegister::of(vec![flag("later")]);
        let prefix = ActionRegister::of(vec![flag("first")]);
        let combined = register.prefixed_with(&prefix);

        let targets: Vec<&str> = combined.iter().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, vec!["first", "later"]);
    }

    proptest! {
        // Union is idempotent and keeps first occurrences in place.
        #[test]
        fn prop_union_idempotent(targets in proptest::collection::vec("[a-d]", 0..8)) {
            let register = ActionRegister::of(targets.iter().map(|t| flag(t)).collect());
            let mut doubled = register.clone();
            doubled.merge(&register);
            prop_assert_eq!(&doubled, &register);
        }
    }
}
