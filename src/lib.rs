//! # astir
//!
//! A compiler for layered recognizer machines: declarative grammars are
//! compiled into finite-automaton tokenizers and LL(k) parsers whose
//! output streams can feed one another.
//!
//! ## Module structure (dependency order)
//!
//! ```text
//! codegen   → emission interface, template engine, table renderers
//!   ↓
//! llk       → first-set computation, decision-tree construction
//!   ↓
//! automata  → symbol groups, action registers, AFA framework, NFA builder
//!   ↓
//! semantic  → machines, statements, fields, regex trees, initialization
//!   ↓
//! parser    → recursive-descent parser over the token stream
//!   ↓
//! lexer     → logos tokenizer with escapes and comments
//!   ↓
//! base      → FileLocation, arena handles (no internal dependencies)
//! ```
//!
//! The typical pipeline:
//!
//! ```no_run
//! use astir::codegen::{GenerationVisitor, TemplateEmitter};
//!
//! # fn main() -> Result<(), astir::errors::CompileError> {
//! let source = std::fs::read_to_string("grammar.astir")?;
//! let tokens = astir::lexer::tokenize(&source)?;
//! let mut tree = astir::parser::parse(&tokens)?;
//! tree.initialize()?;
//! TemplateEmitter::new("out").visit_tree(&tree)?;
//! # Ok(())
//! # }
//! ```

pub mod automata;
pub mod base;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod llk;
pub mod parser;
pub mod semantic;

pub use base::{FileLocation, MachineId, NodeId, StatementRef};
pub use errors::CompileError;
pub use semantic::SemanticTree;

/// Compile grammar source into an initialized semantic tree.
pub fn compile(source: &str) -> Result<SemanticTree, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let mut tree = parser::parse(&tokens)?;
    tree.initialize()?;
    Ok(tree)
}
