//! Code emission: the consumer interface over the compiled structures and
//! a template-driven emitter.
//!
//! The core stays target-language agnostic. A [`GenerationVisitor`] is
//! handed the semantic tree with its built recognizers - the pseudo-DFA of
//! each finite automaton, the decision forest of each parser - and renders
//! artifacts however it wants; the bundled [`TemplateEmitter`] does so by
//! macro substitution over specimen template files.

pub mod tables;
pub mod templates;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::automata::nfa::Nfa;
use crate::base::MachineId;
use crate::errors::GenerationError;
use crate::llk::DecisionForest;
use crate::semantic::{MachineKind, SemanticTree};

/// Consumer of compiled machines.
pub trait GenerationVisitor {
    fn visit_finite_automaton(
        &mut self,
        tree: &SemanticTree,
        machine: MachineId,
        dfa: &Nfa,
    ) -> Result<(), GenerationError>;

    fn visit_llk_parser(
        &mut self,
        tree: &SemanticTree,
        machine: MachineId,
        forest: &DecisionForest,
    ) -> Result<(), GenerationError>;

    /// Walks every machine of an initialized tree in declaration order.
    fn visit_tree(&mut self, tree: &SemanticTree) -> Result<(), GenerationError> {
        for id in tree.machine_ids().collect::<Vec<_>>() {
            let machine = tree.machine(id);
            match machine.kind {
                MachineKind::FiniteAutomaton => {
                    if let Some(dfa) = machine.pseudo_dfa.as_ref() {
                        self.visit_finite_automaton(tree, id, dfa)?;
                    }
                }
                MachineKind::LlkParser { .. } => {
                    if let Some(forest) = machine.decisions.as_ref() {
                        self.visit_llk_parser(tree, id, forest)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Built-in specimen used when no template directory is configured: it
/// lays the rendered structures out one macro per section.
const DEFAULT_AUTOMATON_HEAD: &str = include_str!("specimens/finite_automaton.head");
const DEFAULT_AUTOMATON_BODY: &str = include_str!("specimens/finite_automaton.body");
const DEFAULT_PARSER_HEAD: &str = include_str!("specimens/llk_parser.head");
const DEFAULT_PARSER_BODY: &str = include_str!("specimens/llk_parser.body");

/// Emits, per machine, a header-like `NAME.head` and a source-like
/// `NAME.body` artifact into the output directory.
pub struct TemplateEmitter {
    output_directory: PathBuf,
    template_directory: Option<PathBuf>,
}

impl TemplateEmitter {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            template_directory: None,
        }
    }

    pub fn with_template_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.template_directory = Some(directory.into());
        self
    }

    fn load_template(&self, file_name: &str, built_in: &str) -> Result<String, GenerationError> {
        match &self.template_directory {
            None => Ok(built_in.to_string()),
            Some(directory) => {
                let path = directory.join(file_name);
                std::fs::read_to_string(&path).map_err(|_| GenerationError::MissingTemplate {
                    path: path.display().to_string(),
                })
            }
        }
    }

    fn write_artifacts(
        &self,
        machine_name: &str,
        head_template: &str,
        body_template: &str,
        macros: &IndexMap<String, String>,
    ) -> Result<(), GenerationError> {
        std::fs::create_dir_all(&self.output_directory)?;

        let mut head = String::new();
        templates::macro_write(head_template, macros, &mut head)?;
        std::fs::write(
            self.output_directory.join(format!("{machine_name}.head")),
            head,
        )?;

        let mut body = String::new();
        templates::macro_write(body_template, macros, &mut body)?;
        std::fs::write(
            self.output_directory.join(format!("{machine_name}.body")),
            body,
        )?;

        debug!(machine = machine_name, "emitted artifacts");
        Ok(())
    }

    fn universal_macros(tree: &SemanticTree, machine: MachineId) -> IndexMap<String, String> {
        let machine_object = tree.machine(machine);
        let mut macros = IndexMap::new();
        macros.insert("MachineName".to_string(), machine_object.name.to_string());
        let applies_on = machine_object
            .on
            .as_ref()
            .map(|link| link.name.to_string())
            .unwrap_or_else(|| "raw".to_string());
        macros.insert("AppliesOn".to_string(), applies_on);
        macros.insert(
            "TypeDeclarations".to_string(),
            tables::type_declarations(tree, machine),
        );
        macros.insert(
            "TerminalTypeEnumerated".to_string(),
            tables::terminal_type_enumeration(tree, machine),
        );
        macros
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

impl GenerationVisitor for TemplateEmitter {
    fn visit_finite_automaton(
        &mut self,
        tree: &SemanticTree,
        machine: MachineId,
        dfa: &Nfa,
    ) -> Result<(), GenerationError> {
        let machine_object = tree.machine(machine);
        let head_template = self.load_template("finite_automaton.head", DEFAULT_AUTOMATON_HEAD)?;
        let body_template = self.load_template("finite_automaton.body", DEFAULT_AUTOMATON_BODY)?;

        let mut macros = Self::universal_macros(tree, machine);
        macros.insert(
            "StateCount".to_string(),
            dfa.automaton.states.len().to_string(),
        );
        let symbol_count = match machine_object.on.as_ref().and_then(|l| l.target) {
            // end-of-stream occupies index 0 of the input terminal range
            Some(on) => tree.machine(on).terminal_count as usize + 1,
            None => 256,
        };
        macros.insert("TransitionSymbolCount".to_string(), symbol_count.to_string());
        macros.insert("StateMapEnumerated".to_string(), tables::state_map(dfa));
        macros.insert(
            "StateFinalityEnumerated".to_string(),
            tables::state_finality(dfa),
        );
        macros.insert(
            "ActionContextsDeclarations".to_string(),
            tables::context_declarations(dfa),
        );

        let registers = tables::RegisterTable::of(dfa);
        macros.insert("ActionDeclarations".to_string(), registers.declarations());
        macros.insert("ActionDefinitions".to_string(), registers.definitions());
        macros.insert(
            "StateActionMapEnumerated".to_string(),
            registers.state_action_map(),
        );
        macros.insert(
            "TransitionActionMapEnumerated".to_string(),
            registers.transition_action_map(dfa),
        );

        self.write_artifacts(&machine_object.name, &head_template, &body_template, &macros)
    }

    fn visit_llk_parser(
        &mut self,
        tree: &SemanticTree,
        machine: MachineId,
        forest: &DecisionForest,
    ) -> Result<(), GenerationError> {
        let machine_object = tree.machine(machine);
        if machine_object.accept_root_indices().is_empty() {
            return Err(GenerationError::NoRoots {
                machine: machine_object.name.to_string(),
            });
        }

        let head_template = self.load_template("llk_parser.head", DEFAULT_PARSER_HEAD)?;
        let body_template = self.load_template("llk_parser.body", DEFAULT_PARSER_BODY)?;

        let mut macros = Self::universal_macros(tree, machine);
        macros.insert(
            "ParsingDeclarations".to_string(),
            tables::parsing_declarations(forest),
        );
        macros.insert(
            "ParsingDefinitions".to_string(),
            tables::parsing_definitions(forest),
        );

        self.write_artifacts(&machine_object.name, &head_template, &body_template, &macros)
    }
}

#[cfg(test)]
mod tests;
