//! The astir driver: grammar file in, recognizer artifacts out.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use astir::codegen::{GenerationVisitor, TemplateEmitter};
use astir::errors::CompileError;

#[derive(Parser)]
#[command(name = "astir", about = "Compiles declarative grammars into recognizer machines")]
struct Cli {
    /// The grammar specification to process.
    grammar_file: PathBuf,

    /// Where the generated files go.
    #[arg(long, default_value = ".")]
    output_directory: PathBuf,

    /// Directory holding the specimen template files; built-in specimens
    /// are used when not given.
    #[arg(long)]
    template_directory: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CompileError> {
    let source = std::fs::read_to_string(&cli.grammar_file)?;

    println!("Tokenizing grammar file");
    let tokens = astir::lexer::tokenize(&source)?;

    println!("Parsing grammar file");
    let mut tree = astir::parser::parse(&tokens)?;

    println!("Semantically processing the grammar");
    tree.initialize()?;

    println!("Generating output");
    let mut emitter = TemplateEmitter::new(&cli.output_directory);
    if let Some(templates) = &cli.template_directory {
        emitter = emitter.with_template_directory(templates);
    }
    emitter.visit_tree(&tree)?;

    Ok(())
}
