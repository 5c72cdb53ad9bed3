//! Artifact emission through the template emitter.

use crate::codegen::{GenerationVisitor, TemplateEmitter};
use crate::compile;
use crate::errors::GenerationError;

const TOKENIZER_AND_PARSER: &str = r#"
    finite automaton Tok {
        root terminal A = "a";
        root terminal B = "b";
    }
    LL(1) parser Par on Tok {
        root production R = A | B;
    }
"#;

#[test]
fn test_artifacts_are_written_per_machine() {
    let tree = compile(TOKENIZER_AND_PARSER).expect("grammar should compile");
    let output = tempfile::tempdir().expect("a temporary directory");

    let mut emitter = TemplateEmitter::new(output.path());
    emitter.visit_tree(&tree).expect("emission should succeed");

    for artifact in ["Tok.head", "Tok.body", "Par.head", "Par.body"] {
        assert!(
            output.path().join(artifact).is_file(),
            "expected artifact {artifact}"
        );
    }
}

#[test]
fn test_tokenizer_artifacts_carry_the_tables() {
    let tree = compile(TOKENIZER_AND_PARSER).expect("grammar should compile");
    let output = tempfile::tempdir().expect("a temporary directory");

    TemplateEmitter::new(output.path())
        .visit_tree(&tree)
        .expect("emission should succeed");

    let head = std::fs::read_to_string(output.path().join("Tok.head")).expect("the head artifact");
    assert!(head.contains("machine Tok"));
    assert!(head.contains("states 3"));
    assert!(head.contains("symbols 256"));
    assert!(head.contains("A = 1"));
    assert!(head.contains("B = 2"));
    assert!(head.contains("m_token__A : A"));

    let body = std::fs::read_to_string(output.path().join("Tok.body")).expect("the body artifact");
    assert!(body.contains("create_context m_token A"));
    assert!(body.contains("terminalize_context m_token A"));
    assert!(body.contains("elevate_context m_token A"));
    assert!(body.contains("true"));
}

#[test]
fn test_parser_artifacts_carry_the_decisions() {
    let tree = compile(TOKENIZER_AND_PARSER).expect("grammar should compile");
    let output = tempfile::tempdir().expect("a temporary directory");

    TemplateEmitter::new(output.path())
        .visit_tree(&tree)
        .expect("emission should succeed");

    let body = std::fs::read_to_string(output.path().join("Par.body")).expect("the body artifact");
    assert!(body.contains("parse R"));
    assert!(body.contains("on A"));
    assert!(body.contains("on B"));
}

#[test]
fn test_custom_templates_are_used() {
    let tree = compile(TOKENIZER_AND_PARSER).expect("grammar should compile");
    let output = tempfile::tempdir().expect("a temporary directory");
    let templates = tempfile::tempdir().expect("a template directory");

    for name in ["finite_automaton.head", "finite_automaton.body"] {
        std::fs::write(
            templates.path().join(name),
            "machine ${{MachineName}} has ${{StateCount}} states\n",
        )
        .expect("template should be written");
    }
    for name in ["llk_parser.head", "llk_parser.body"] {
        std::fs::write(templates.path().join(name), "parser ${{MachineName}}\n")
            .expect("template should be written");
    }

    TemplateEmitter::new(output.path())
        .with_template_directory(templates.path())
        .visit_tree(&tree)
        .expect("emission should succeed");

    let head = std::fs::read_to_string(output.path().join("Tok.head")).expect("the head artifact");
    assert_eq!(head, "machine Tok has 3 states\n");
}

#[test]
fn test_missing_template_file_is_an_error() {
    let tree = compile(TOKENIZER_AND_PARSER).expect("grammar should compile");
    let output = tempfile::tempdir().expect("a temporary directory");
    let templates = tempfile::tempdir().expect("an empty template directory");

    let error = TemplateEmitter::new(output.path())
        .with_template_directory(templates.path())
        .visit_tree(&tree)
        .expect_err("emission should fail without templates");

    assert!(matches!(error, GenerationError::MissingTemplate { .. }));
}

#[test]
fn test_parser_without_roots_is_rejected() {
    let tree = compile(
        r#"
        finite automaton Tok {
            root terminal A = "a";
        }
        LL(1) parser Par on Tok {
            production R = A;
        }
        "#,
    )
    .expect("grammar should compile");
    let output = tempfile::tempdir().expect("a temporary directory");

    let error = TemplateEmitter::new(output.path())
        .visit_tree(&tree)
        .expect_err("a rootless parser cannot be generated");

    assert!(matches!(error, GenerationError::NoRoots { .. }));
}
