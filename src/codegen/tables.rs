//! Language-neutral rendering of recognizer structures.
//!
//! Emitters bind these renderings to concrete target syntax through their
//! template files; the core only produces structured, line-oriented text:
//! transition tables, action register listings, context declarations, type
//! declarations, and decision trees.

use std::fmt::Write as _;

use crate::automata::afa::Register;
use crate::automata::nfa::Nfa;
use crate::automata::{Action, ActionKind, ActionRegister};
use crate::base::{MachineId, StatementRef};
use crate::llk::{DecisionForest, DecisionPoint};
use crate::semantic::{FieldKind, SemanticTree, Statement, Terminality};

/// Action registers of a pseudo-DFA, numbered 1.. in discovery order
/// (state registers first, then transition registers, per state).
///
/// Id 0 is never handed out: in the emitted maps it means "no register",
/// a namespace separate from terminal type indices where 0 means
/// end-of-stream.
pub struct RegisterTable {
    registers: Vec<ActionRegister>,
    state_register: Vec<usize>,
    transition_registers: Vec<Vec<usize>>,
}

impl RegisterTable {
    pub fn of(dfa: &Nfa) -> Self {
        let mut registers = Vec::new();
        let mut state_register = Vec::new();
        let mut transition_registers = Vec::new();

        for state in &dfa.automaton.states {
            if state.register.is_empty() {
                state_register.push(0);
            } else {
                registers.push(state.register.clone());
                state_register.push(registers.len());
            }

            let mut per_transition = Vec::new();
            for transition in &state.transitions {
                if transition.register.is_empty() {
                    per_transition.push(0);
                } else {
                    registers.push(transition.register.clone());
                    per_transition.push(registers.len());
                }
            }
            transition_registers.push(per_transition);
        }

        Self {
            registers,
            state_register,
            transition_registers,
        }
    }

    fn describe_id(id: usize) -> String {
        if id == 0 {
            "none".to_string()
        } else {
            format!("register{id}")
        }
    }

    /// One declaration line per register.
    pub fn declarations(&self) -> String {
        let mut out = String::new();
        for id in 1..=self.registers.len() {
            let _ = writeln!(out, "register{id}");
        }
        out
    }

    /// One block per register listing its actions in order.
    pub fn definitions(&self) -> String {
        let mut out = String::new();
        for (index, register) in self.registers.iter().enumerate() {
            let _ = writeln!(out, "register{} {{", index + 1);
            for action in register {
                let _ = writeln!(out, "\t{}", describe_action(action));
            }
            let _ = writeln!(out, "}}");
        }
        out
    }

    /// Per state: the register firing on entry.
    pub fn state_action_map(&self) -> String {
        let entries: Vec<String> = self
            .state_register
            .iter()
            .map(|&id| Self::describe_id(id))
            .collect();
        entries.join(", ")
    }

    /// Per state: per transition, the register firing when it is taken.
    pub fn transition_action_map(&self, dfa: &Nfa) -> String {
        let mut out = String::new();
        for (state, object) in dfa.automaton.states.iter().enumerate() {
            let entries: Vec<String> = object
                .transitions
                .iter()
                .zip(&self.transition_registers[state])
                .map(|(transition, &id)| {
                    format!("{} -> {}", transition.condition.describe(), Self::describe_id(id))
                })
                .collect();
            let _ = writeln!(out, "{state}: {}", entries.join(", "));
        }
        out
    }
}

fn describe_action(action: &Action) -> String {
    let kind = match action.kind {
        ActionKind::Flag => "flag",
        ActionKind::Unflag => "unflag",
        ActionKind::InitiateCapture => "initiate_capture",
        ActionKind::Capture => "capture",
        ActionKind::Empty => "empty",
        ActionKind::Append => "append",
        ActionKind::Prepend => "prepend",
        ActionKind::Set => "set",
        ActionKind::Unset => "unset",
        ActionKind::Push => "push",
        ActionKind::Pop => "pop",
        ActionKind::Clear => "clear",
        ActionKind::CreateContext => "create_context",
        ActionKind::TerminalizeContext => "terminalize_context",
        ActionKind::ElevateContext => "elevate_context",
        ActionKind::IgnoreContext => "ignore_context",
    };
    match &action.payload {
        Some(payload) => format!("{kind} {} {} <- {payload}", action.context_path, action.target),
        None => format!("{kind} {} {}", action.context_path, action.target),
    }
}

/// Per state: its outgoing transitions with conditions and targets.
pub fn state_map(dfa: &Nfa) -> String {
    let mut out = String::new();
    for (state, object) in dfa.automaton.states.iter().enumerate() {
        let entries: Vec<String> = object
            .transitions
            .iter()
            .map(|t| format!("{} -> {}", t.condition.describe(), t.target))
            .collect();
        let _ = writeln!(out, "{state}: {}", entries.join(", "));
    }
    out
}

/// Per state: whether it accepts.
pub fn state_finality(dfa: &Nfa) -> String {
    let entries: Vec<&str> = (0..dfa.automaton.states.len())
        .map(|state| {
            if dfa.automaton.final_states.contains(&state) {
                "true"
            } else {
                "false"
            }
        })
        .collect();
    entries.join(", ")
}

/// The contexts the machine's actions operate on, one per line.
pub fn context_declarations(dfa: &Nfa) -> String {
    let mut out = String::new();
    for (parent, child) in &dfa.contexts {
        let _ = writeln!(out, "{parent}__{child} : {child}");
    }
    out
}

/// Terminal type numbering of a machine, 0 reserved for end-of-stream.
pub fn terminal_type_enumeration(tree: &SemanticTree, machine: MachineId) -> String {
    let mut out = String::from("EndOfStream = 0\n");
    for statement in tree.machine(machine).statements.values() {
        if let Some(production) = statement.as_production() {
            if production.terminality == Terminality::Terminal {
                let _ = writeln!(out, "{} = {}", production.name, production.terminal_index);
            }
        }
    }
    out
}

/// Declarations of the machine's type-forming statements with their
/// flattened field lists, parents before children.
pub fn type_declarations(tree: &SemanticTree, machine: MachineId) -> String {
    let mut out = String::new();
    let mut declared: Vec<StatementRef> = Vec::new();

    for index in 0..tree.machine(machine).statements.len() {
        declare_type(tree, StatementRef::new(machine, index), &mut declared, &mut out);
    }
    out
}

fn declare_type(
    tree: &SemanticTree,
    handle: StatementRef,
    declared: &mut Vec<StatementRef>,
    out: &mut String,
) {
    let statement = tree.statement(handle);
    if !statement.is_type_forming() || declared.contains(&handle) {
        return;
    }
    declared.push(handle);

    let Some(attrs) = statement.attrs() else {
        return;
    };

    // parent categories must exist before anything deriving from them
    for parent in attrs.categories.values().flatten() {
        declare_type(tree, *parent, declared, out);
    }

    let mut header = format!("type {}", statement.name());
    let parents: Vec<&str> = attrs.categories.keys().map(|k| k.as_str()).collect();
    if !parents.is_empty() {
        header.push_str(" : ");
        header.push_str(&parents.join(", "));
    }
    if let Statement::Production(production) = statement {
        if production.terminality == Terminality::Terminal {
            let _ = write!(header, " terminal {}", production.terminal_index);
        }
    }

    let _ = writeln!(out, "{header} {{");
    for field in &attrs.fields {
        match &field.kind {
            FieldKind::Flag => {
                let _ = writeln!(out, "\tflag {}", field.name);
            }
            FieldKind::Raw => {
                let _ = writeln!(out, "\traw {}", field.name);
            }
            FieldKind::Item { type_name, .. } => {
                let _ = writeln!(out, "\t{type_name} item {}", field.name);
            }
            FieldKind::List { type_name, .. } => {
                let _ = writeln!(out, "\t{type_name} list {}", field.name);
            }
        }
    }
    let _ = writeln!(out, "}}");
}

/// One parser body sketch per statement: the rule name followed by its
/// indented decision tree.
pub fn parsing_definitions(forest: &DecisionForest) -> String {
    let mut out = String::new();
    for (name, decisions) in &forest.statements {
        let _ = writeln!(out, "parse {name} {{");
        render_decision_point(decisions, 1, &mut out);
        let _ = writeln!(out, "}}");
    }
    let _ = writeln!(out, "parse <root> {{");
    render_decision_point(&forest.root, 1, &mut out);
    let _ = writeln!(out, "}}");
    out
}

pub fn parsing_declarations(forest: &DecisionForest) -> String {
    let mut out = String::new();
    for name in forest.statements.keys() {
        let _ = writeln!(out, "parse {name}");
    }
    out
}

fn render_decision_point(point: &DecisionPoint, depth: usize, out: &mut String) {
    for transition in &point.transitions {
        let indentation = "\t".repeat(depth);
        let _ = writeln!(out, "{indentation}on {}", transition.condition.describe());
        render_decision_point(&transition.point, depth + 1, out);
    }
}
