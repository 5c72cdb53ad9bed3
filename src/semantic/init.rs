//! Initialization of the semantic tree.
//!
//! Runs exactly once per tree (idempotent, reentrancy-guarded per machine):
//! resolves the machine dependency graph, applies flag defaults, assigns
//! terminal indices, links category parents and rule references, validates
//! fields and actions, and finally builds each machine's recognizer - the
//! pseudo-DFA for finite automata, the LL(k) decision forest for parsers.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::debug;

use crate::automata::action::{Action, ActionKind, ActionRegister};
use crate::automata::builder::NfaBuilder;
use crate::automata::nfa::Nfa;
use crate::base::{FileLocation, MachineId, StatementRef};
use crate::errors::{CompileError, SemanticError};
use crate::llk::LlkBuilder;
use crate::semantic::regex::{
    AtomicRegex, ConjunctiveRegex, DisjunctiveRegex, PrimitiveKind, PrimitiveRegex, RegexAction,
    RegexActionKind, RootRegex,
};
use crate::semantic::statement::{Rootness, Statement, Terminality};
use crate::semantic::{FieldKind, MachineFlag, MachineKind, SemanticTree};

/// Context path of every token-level context created by a finite
/// automaton.
pub const TOKEN_CONTEXT: &str = "m_token";

impl SemanticTree {
    /// Resolve, validate, and build every machine. Calling this a second
    /// time is a no-op.
    pub fn initialize(&mut self) -> Result<(), CompileError> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;

        let mut names_encountered = Vec::new();
        for id in self.machine_ids().collect::<Vec<_>>() {
            self.complete_machine_hierarchy(&mut names_encountered, id)?;
        }

        for id in self.machine_ids().collect::<Vec<_>>() {
            self.initialize_machine(id)?;
        }

        Ok(())
    }

    /// Resolves `on`/`uses` names to machine handles and rejects cycles in
    /// the dependency graph.
    fn complete_machine_hierarchy(
        &mut self,
        names_encountered: &mut Vec<SmolStr>,
        id: MachineId,
    ) -> Result<(), SemanticError> {
        let machine = self.machine(id);
        let name = machine.name.clone();
        let location = machine.location;

        let collision = names_encountered.contains(&name);
        names_encountered.push(name.clone());
        if collision {
            return Err(SemanticError::MachineHierarchyCycle {
                path: names_encountered
                    .iter()
                    .map(SmolStr::as_str)
                    .collect::<Vec<_>>()
                    .join("-"),
                location,
            });
        }

        let on_name = self.machine(id).on.as_ref().map(|l| l.name.clone());
        if let Some(on_name) = on_name {
            let target = self
                .machine_id(&on_name)
                .ok_or_else(|| SemanticError::UnknownMachine {
                    name: on_name.to_string(),
                    link: "on",
                    referrer: name.to_string(),
                    location,
                })?;
            if let Some(link) = self.machine_mut(id).on.as_mut() {
                link.target = Some(target);
            }
            self.complete_machine_hierarchy(names_encountered, target)?;
        }

        for index in 0..self.machine(id).uses.len() {
            let used_name = self.machine(id).uses[index].name.clone();
            let target = self
                .machine_id(&used_name)
                .ok_or_else(|| SemanticError::UnknownMachine {
                    name: used_name.to_string(),
                    link: "uses",
                    referrer: name.to_string(),
                    location,
                })?;
            self.machine_mut(id).uses[index].target = Some(target);
            self.complete_machine_hierarchy(names_encountered, target)?;
        }

        names_encountered.pop();
        Ok(())
    }

    fn initialize_machine(&mut self, id: MachineId) -> Result<(), CompileError> {
        if self.machine(id).initialized {
            return Ok(());
        }
        self.machine_mut(id).initialized = true;

        debug!(machine = %self.machine(id).name, "initializing machine");

        // dependencies first; the hierarchy pass guarantees termination
        if let Some(on) = self.machine(id).on.as_ref().and_then(|l| l.target) {
            self.initialize_machine(on)?;
        }
        let used: Vec<MachineId> = self
            .machine(id)
            .uses
            .iter()
            .filter_map(|l| l.target)
            .collect();
        for target in used {
            self.initialize_machine(target)?;
        }

        self.apply_statement_defaults(id);

        let mut names_encountered = Vec::new();
        for index in 0..self.machine(id).statements.len() {
            let handle = StatementRef::new(id, index);
            if self.statement(handle).attrs().is_some() {
                self.complete_category_references(&mut names_encountered, handle, false)?;
            }
        }

        self.complete_field_declarations(id)?;
        self.complete_rules(id)?;

        match self.machine(id).kind {
            MachineKind::FiniteAutomaton => {
                self.detect_rule_recursion(id)?;

                if let Some(on) = self.machine(id).on.as_ref().and_then(|l| l.target) {
                    if !self.machine(on).has_purely_terminal_roots() {
                        let machine = self.machine(id);
                        return Err(SemanticError::NonTerminalInput {
                            machine: machine.name.to_string(),
                            on: self.machine(on).name.to_string(),
                            location: machine.location,
                        }
                        .into());
                    }
                }

                let dfa = self.build_finite_automaton(id);
                self.machine_mut(id).pseudo_dfa = Some(dfa);
            }
            MachineKind::LlkParser { k } => {
                let forest = LlkBuilder::new(self, id, k).build()?;
                self.machine_mut(id).decisions = Some(forest);
            }
        }

        Ok(())
    }

    /// Fills unspecified rootness and terminality from the machine flags
    /// and hands out terminal type indices in declaration order.
    fn apply_statement_defaults(&mut self, id: MachineId) {
        let machine = self.machine_mut(id);
        let categories_root = machine.flag(MachineFlag::CategoriesRootByDefault);
        let productions_root = machine.flag(MachineFlag::ProductionsRootByDefault);
        let productions_terminal = machine.flag(MachineFlag::ProductionsTerminalByDefault);

        let mut terminal_count = machine.terminal_count;
        for statement in machine.statements.values_mut() {
            match statement {
                Statement::Category(category) => {
                    if category.rootness == Rootness::Unspecified && categories_root {
                        category.rootness = Rootness::AcceptRoot;
                    }
                }
                Statement::Production(production) => {
                    if production.rootness == Rootness::Unspecified && productions_root {
                        production.rootness = Rootness::AcceptRoot;
                    }
                    if production.terminality == Terminality::Unspecified {
                        production.terminality = if productions_terminal {
                            Terminality::Terminal
                        } else {
                            Terminality::Nonterminal
                        };
                    }
                    if production.terminality == Terminality::Terminal {
                        terminal_count += 1;
                        production.terminal_index = terminal_count;
                    }
                }
                _ => {}
            }
        }
        machine.terminal_count = terminal_count;
    }

    /// Resolves the category parents of `handle`, records back-references
    /// on the categories, and rejects cycles in the parent chains.
    fn complete_category_references(
        &mut self,
        names_encountered: &mut Vec<SmolStr>,
        handle: StatementRef,
        must_be_category: bool,
    ) -> Result<(), SemanticError> {
        let statement = self.statement(handle);
        let name = statement.name().clone();
        let location = statement.location();
        let is_category = statement.as_category().is_some();

        let collision = names_encountered.contains(&name);
        names_encountered.push(name.clone());
        if collision {
            return Err(SemanticError::CategoryCycle {
                path: names_encountered
                    .iter()
                    .map(SmolStr::as_str)
                    .collect::<Vec<_>>()
                    .join("-"),
                location,
            });
        }
        if must_be_category && !is_category {
            return Err(SemanticError::NotACategory {
                name: name.to_string(),
                location,
            });
        }

        let parent_names: Vec<SmolStr> = match self.statement(handle).attrs() {
            Some(attrs) => attrs.categories.keys().cloned().collect(),
            None => Vec::new(),
        };

        for parent_name in parent_names {
            let target = self.find_statement(handle.machine, &parent_name).ok_or_else(|| {
                SemanticError::UnknownReference {
                    name: parent_name.to_string(),
                    machine: self.machine(handle.machine).name.to_string(),
                    location,
                }
            })?;

            if let Some(attrs) = self.statement_mut(handle).attrs_mut() {
                attrs.categories.insert(parent_name.clone(), Some(target));
            }
            if let Statement::Category(category) = self.statement_mut(target) {
                category.references.insert(name.clone(), handle);
            }

            self.complete_category_references(names_encountered, target, true)?;
        }

        names_encountered.pop();
        Ok(())
    }

    /// Rejects field name collisions (within a statement and up its
    /// category chain) and resolves the types of item/list fields.
    fn complete_field_declarations(&mut self, id: MachineId) -> Result<(), SemanticError> {
        for index in 0..self.machine(id).statements.len() {
            let handle = StatementRef::new(id, index);
            let Some(attrs) = self.statement(handle).attrs() else {
                continue;
            };

            let mut resolutions = Vec::new();
            for (field_index, field) in attrs.fields.iter().enumerate() {
                if let Some(previous) = attrs.fields[..field_index]
                    .iter()
                    .find(|f| f.name == field.name)
                {
                    return Err(SemanticError::FieldRedeclaration {
                        name: field.name.to_string(),
                        location: field.location,
                        previous: previous.location,
                    });
                }

                if let Some((_, previous)) = self.find_category_field(attrs, &field.name) {
                    return Err(SemanticError::FieldRedeclaration {
                        name: field.name.to_string(),
                        location: field.location,
                        previous: previous.location,
                    });
                }

                if let Some(type_name) = field.kind.type_name() {
                    let target = self.find_statement(id, type_name).ok_or_else(|| {
                        SemanticError::UnknownFieldType {
                            name: field.name.to_string(),
                            type_name: type_name.to_string(),
                            machine: self.machine(id).name.to_string(),
                            location: field.location,
                        }
                    })?;
                    resolutions.push((field_index, target.machine));
                }
            }

            if let Some(attrs) = self.statement_mut(handle).attrs_mut() {
                for (field_index, machine) in resolutions {
                    match &mut attrs.fields[field_index].kind {
                        FieldKind::Item { type_machine, .. } | FieldKind::List { type_machine, .. } => {
                            *type_machine = Some(machine);
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Links every rule's regex references and validates its actions.
    fn complete_rules(&mut self, id: MachineId) -> Result<(), SemanticError> {
        let raw_input = self.machine(id).is_raw_input();

        for index in 0..self.machine(id).statements.len() {
            let handle = StatementRef::new(id, index);
            let actions_allowed = !matches!(self.statement(handle), Statement::Regex(_));
            let Some(regex) = self.statement_mut(handle).regex_mut() else {
                continue;
            };

            let mut regex = std::mem::take(regex);
            let outcome = self
                .link_disjunction(&mut regex, id)
                .and_then(|_| self.verify_disjunction(&mut regex, handle, actions_allowed, raw_input));
            if let Some(slot) = self.statement_mut(handle).regex_mut() {
                *slot = regex;
            }
            outcome?;
        }

        Ok(())
    }

    fn link_disjunction(
        &self,
        regex: &mut DisjunctiveRegex,
        id: MachineId,
    ) -> Result<(), SemanticError> {
        for conjunction in &mut regex.alternatives {
            self.link_conjunction(conjunction, id)?;
        }
        Ok(())
    }

    fn link_conjunction(
        &self,
        conjunction: &mut ConjunctiveRegex,
        id: MachineId,
    ) -> Result<(), SemanticError> {
        for root in &mut conjunction.sequence {
            let atom = match root {
                RootRegex::Repetitive(repetition) => &mut *repetition.atom,
                RootRegex::Atomic(atom) => atom,
            };
            match atom {
                AtomicRegex::Group(group) => self.link_disjunction(group, id)?,
                AtomicRegex::Primitive(primitive) => self.link_primitive(primitive, id)?,
            }
        }
        Ok(())
    }

    fn link_primitive(
        &self,
        primitive: &mut PrimitiveRegex,
        id: MachineId,
    ) -> Result<(), SemanticError> {
        if let PrimitiveKind::Reference { name, target } = &mut primitive.kind {
            let found =
                self.find_statement(id, name)
                    .ok_or_else(|| SemanticError::UnknownReference {
                        name: name.to_string(),
                        machine: self.machine(id).name.to_string(),
                        location: primitive.location,
                    })?;
            *target = Some(found);
        }
        Ok(())
    }

    fn verify_disjunction(
        &self,
        regex: &mut DisjunctiveRegex,
        context: StatementRef,
        actions_allowed: bool,
        raw_input: bool,
    ) -> Result<(), SemanticError> {
        self.verify_actions(&mut regex.actions, "raw", context, actions_allowed)?;
        for conjunction in &mut regex.alternatives {
            for root in &mut conjunction.sequence {
                self.verify_root(root, context, actions_allowed, raw_input)?;
            }
        }
        Ok(())
    }

    fn verify_root(
        &self,
        root: &mut RootRegex,
        context: StatementRef,
        actions_allowed: bool,
        raw_input: bool,
    ) -> Result<(), SemanticError> {
        // The payload of a typed action is the referenced statement's
        // product where the action sits directly on a reference, raw
        // captured input otherwise.
        let item_type: SmolStr = match root {
            RootRegex::Atomic(AtomicRegex::Primitive(primitive)) => match &primitive.kind {
                PrimitiveKind::Reference { name, .. } => name.clone(),
                _ => SmolStr::new("raw"),
            },
            _ => SmolStr::new("raw"),
        };

        match root {
            RootRegex::Repetitive(repetition) => {
                self.verify_actions(&mut repetition.actions, &item_type, context, actions_allowed)?;
                match &mut *repetition.atom {
                    AtomicRegex::Group(group) => {
                        self.verify_disjunction(group, context, actions_allowed, raw_input)?;
                    }
                    AtomicRegex::Primitive(primitive) => {
                        self.verify_primitive(primitive, context, actions_allowed, raw_input)?;
                    }
                }
            }
            RootRegex::Atomic(AtomicRegex::Group(group)) => {
                self.verify_disjunction(group, context, actions_allowed, raw_input)?;
            }
            RootRegex::Atomic(AtomicRegex::Primitive(primitive)) => {
                self.verify_primitive(primitive, context, actions_allowed, raw_input)?;
            }
        }
        Ok(())
    }

    fn verify_primitive(
        &self,
        primitive: &mut PrimitiveRegex,
        context: StatementRef,
        actions_allowed: bool,
        raw_input: bool,
    ) -> Result<(), SemanticError> {
        if let PrimitiveKind::Literal(literal) = &primitive.kind {
            if !raw_input {
                let machine = self.machine(context.machine);
                return Err(SemanticError::LiteralOnNonRawInput {
                    literal: literal.to_string(),
                    machine: machine.name.to_string(),
                    location: primitive.location,
                });
            }
        }

        let item_type: SmolStr = match &primitive.kind {
            PrimitiveKind::Reference { name, .. } => name.clone(),
            _ => SmolStr::new("raw"),
        };
        self.verify_actions(&mut primitive.actions, &item_type, context, actions_allowed)
    }

    fn verify_actions(
        &self,
        actions: &mut [RegexAction],
        item_type: &str,
        context: StatementRef,
        actions_allowed: bool,
    ) -> Result<(), SemanticError> {
        if actions.is_empty() {
            return Ok(());
        }

        let statement = self.statement(context);
        let context_name = statement.name().to_string();
        let context_location = statement.location();

        if !actions_allowed {
            return Err(SemanticError::ActionsForbidden {
                context: context_name,
                location: actions[0].location,
                context_location,
            });
        }

        for action in actions {
            let (field_ref, field) = self.find_field(context, &action.target).ok_or_else(|| {
                SemanticError::UnknownActionTarget {
                    target: action.target.to_string(),
                    context: context_name.clone(),
                    location: action.location,
                }
            })?;
            action.field = Some(field_ref);

            let mismatch = |expected: &'static str| SemanticError::ActionFieldKindMismatch {
                target: action.target.to_string(),
                expected,
                context: context_name.clone(),
                location: action.location,
            };

            match action.kind {
                RegexActionKind::Flag | RegexActionKind::Unflag => {
                    if !matches!(field.kind, FieldKind::Flag) {
                        return Err(mismatch("flag"));
                    }
                }
                RegexActionKind::Capture
                | RegexActionKind::Empty
                | RegexActionKind::Append
                | RegexActionKind::Prepend => {
                    if !matches!(field.kind, FieldKind::Raw) {
                        return Err(mismatch("raw"));
                    }
                }
                RegexActionKind::Set => match &field.kind {
                    FieldKind::Item { type_name, .. } => {
                        if type_name != item_type {
                            return Err(SemanticError::TypedActionTypeMismatch {
                                target: action.target.to_string(),
                                declared: type_name.to_string(),
                                actual: item_type.to_string(),
                                location: action.location,
                            });
                        }
                    }
                    _ => return Err(mismatch("item")),
                },
                RegexActionKind::Unset => {
                    if !matches!(field.kind, FieldKind::Item { .. }) {
                        return Err(mismatch("item"));
                    }
                }
                RegexActionKind::Push => match &field.kind {
                    FieldKind::List { type_name, .. } => {
                        if type_name != item_type {
                            return Err(SemanticError::TypedActionTypeMismatch {
                                target: action.target.to_string(),
                                declared: type_name.to_string(),
                                actual: item_type.to_string(),
                                location: action.location,
                            });
                        }
                    }
                    _ => return Err(mismatch("list")),
                },
                RegexActionKind::Pop | RegexActionKind::Clear => {
                    if !matches!(field.kind, FieldKind::List { .. }) {
                        return Err(mismatch("list"));
                    }
                }
            }
        }

        Ok(())
    }

    /// Rejects reference cycles among the rules of a finite automaton;
    /// parsers permit them.
    fn detect_rule_recursion(&self, id: MachineId) -> Result<(), SemanticError> {
        for index in 0..self.machine(id).statements.len() {
            let handle = StatementRef::new(id, index);
            let statement = self.statement(handle);
            let target_name = statement.name().clone();

            let mut path = vec![target_name.clone()];
            let mut visited = FxHashSet::default();
            visited.insert(index);

            if let Some(end) =
                self.recursion_walk(id, handle, &target_name, &mut path, &mut visited)
            {
                return Err(SemanticError::RuleReferenceCycle {
                    path: path.iter().map(SmolStr::as_str).collect::<Vec<_>>().join("-"),
                    start: statement.location(),
                    end,
                });
            }
        }
        Ok(())
    }

    fn recursion_walk(
        &self,
        id: MachineId,
        handle: StatementRef,
        target_name: &SmolStr,
        path: &mut Vec<SmolStr>,
        visited: &mut FxHashSet<usize>,
    ) -> Option<FileLocation> {
        match self.statement(handle) {
            Statement::Category(category) => {
                for (child_name, &child) in &category.references {
                    if child_name == target_name {
                        return Some(self.statement(child).location());
                    }
                    if let Some(end) = self.recurse_into(id, child, target_name, path, visited) {
                        return Some(end);
                    }
                }
                None
            }
            statement => {
                let regex = statement.regex()?;
                self.regex_recursion_walk(id, regex, target_name, path, visited)
            }
        }
    }

    fn recurse_into(
        &self,
        id: MachineId,
        next: StatementRef,
        target_name: &SmolStr,
        path: &mut Vec<SmolStr>,
        visited: &mut FxHashSet<usize>,
    ) -> Option<FileLocation> {
        if next.machine != id || !visited.insert(next.index) {
            return None;
        }
        path.push(self.statement(next).name().clone());
        if let Some(end) = self.recursion_walk(id, next, target_name, path, visited) {
            return Some(end);
        }
        path.pop();
        None
    }

    fn regex_recursion_walk(
        &self,
        id: MachineId,
        regex: &DisjunctiveRegex,
        target_name: &SmolStr,
        path: &mut Vec<SmolStr>,
        visited: &mut FxHashSet<usize>,
    ) -> Option<FileLocation> {
        for conjunction in &regex.alternatives {
            for root in &conjunction.sequence {
                let atom = match root {
                    RootRegex::Repetitive(repetition) => &*repetition.atom,
                    RootRegex::Atomic(atom) => atom,
                };
                let found = match atom {
                    AtomicRegex::Group(group) => {
                        self.regex_recursion_walk(id, group, target_name, path, visited)
                    }
                    AtomicRegex::Primitive(primitive) => match &primitive.kind {
                        PrimitiveKind::Reference {
                            name,
                            target: Some(target),
                        } => {
                            if name == target_name {
                                Some(primitive.location)
                            } else {
                                self.recurse_into(id, *target, target_name, path, visited)
                            }
                        }
                        _ => None,
                    },
                };
                if let Some(end) = found {
                    return Some(end);
                }
            }
        }
        None
    }

    /// Assembles the machine NFA from its root statements and runs the
    /// subset construction.
    fn build_finite_automaton(&self, id: MachineId) -> Nfa {
        let mut base = Nfa::new();
        let builder = NfaBuilder::new(self, id, TOKEN_CONTEXT);

        for index in self.machine(id).root_indices() {
            let handle = StatementRef::new(id, index);
            let statement = self.statement(handle);
            let subcontext_name = statement.name().clone();

            let mut alternative = builder.build_statement(handle);

            // a type-forming root created a context that now needs to be
            // handed to the machine level; terminal productions get their
            // raw capture associated first
            let mut elevation = ActionRegister::new();
            if statement.is_terminal_production() {
                elevation.push(Action::new(
                    ActionKind::TerminalizeContext,
                    TOKEN_CONTEXT,
                    subcontext_name.clone(),
                ));
            }
            match statement.rootness() {
                Rootness::AcceptRoot => elevation.push(Action::new(
                    ActionKind::ElevateContext,
                    TOKEN_CONTEXT,
                    subcontext_name.clone(),
                )),
                Rootness::IgnoreRoot => elevation.push(Action::new(
                    ActionKind::IgnoreContext,
                    TOKEN_CONTEXT,
                    subcontext_name.clone(),
                )),
                Rootness::Unspecified => {}
            }
            alternative.concentrate_final_states(elevation);

            base.or_with(&alternative, false);
        }

        base.build_pseudo_dfa()
    }
}
