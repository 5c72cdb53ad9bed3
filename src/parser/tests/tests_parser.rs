//! Parsing of machine definitions, statements, fields, and regexes.

use crate::errors::{CompileError, ParseError};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::semantic::{
    AtomicRegex, MachineFlag, MachineKind, PrimitiveKind, RegexActionKind, RepetitionBound,
    RootRegex, Rootness, SemanticTree, Statement, Terminality,
};

fn parse_source(source: &str) -> SemanticTree {
    let tokens = tokenize(source).expect("tokenization should succeed");
    parse(&tokens).expect("parsing should succeed")
}

fn parse_error(source: &str) -> CompileError {
    let tokens = tokenize(source).expect("tokenization should succeed");
    parse(&tokens).expect_err("parsing should fail")
}

#[test]
fn test_machine_header_clauses() {
    let tree = parse_source(
        r#"
        finite automaton M with productions_terminal_by_default on N uses O, Q;
        finite automaton N;
        finite automaton O;
        finite automaton Q;
        "#,
    );

    let machine = &tree.machines["M"];
    assert_eq!(machine.kind, MachineKind::FiniteAutomaton);
    assert!(machine.flag(MachineFlag::ProductionsTerminalByDefault));
    assert_eq!(machine.on.as_ref().map(|l| l.name.as_str()), Some("N"));
    let used: Vec<&str> = machine.uses.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(used, vec!["O", "Q"]);
}

#[test]
fn test_llk_parser_header_carries_k() {
    let tree = parse_source("LL(3) parser P;");
    assert_eq!(tree.machines["P"].kind, MachineKind::LlkParser { k: 3 });
}

#[test]
fn test_statement_prefixes() {
    let tree = parse_source(
        r#"
        finite automaton M {
            ignored root terminal Ws = " "+;
            root nonterminal production N = Ws;
            category Cat;
        }
        "#,
    );

    let machine = &tree.machines["M"];
    let ws = machine.statements["Ws"].as_production().expect("production");
    assert_eq!(ws.rootness, Rootness::IgnoreRoot);
    assert_eq!(ws.terminality, Terminality::Terminal);

    let n = machine.statements["N"].as_production().expect("production");
    assert_eq!(n.rootness, Rootness::AcceptRoot);
    assert_eq!(n.terminality, Terminality::Nonterminal);

    assert!(matches!(machine.statements["Cat"], Statement::Category(_)));
}

#[test]
fn test_rootness_is_invalid_on_patterns() {
    let error = parse_error(
        r#"
        finite automaton M {
            root pattern P = "a";
        }
        "#,
    );
    assert!(matches!(
        error,
        CompileError::Parse(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_field_forms() {
    let tree = parse_source(
        r#"
        finite automaton M {
            category T;
            root terminal A : T { flag f; raw r; T item one; T two; T list many; } = "a";
        }
        "#,
    );

    let attrs = tree.machines["M"].statements["A"]
        .attrs()
        .expect("attributed statement");
    let described: Vec<(&str, &str)> = attrs
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.kind.describe()))
        .collect();
    assert_eq!(
        described,
        vec![
            ("f", "flag"),
            ("r", "raw"),
            ("one", "item"),
            ("two", "item"),
            ("many", "list"),
        ]
    );
}

#[test]
fn test_typed_literal_splits_per_byte() {
    let tree = parse_source(
        r#"
        finite automaton M {
            root terminal X = "abc";
        }
        "#,
    );

    let regex = tree.machines["M"].statements["X"]
        .regex()
        .expect("a rule body");
    let sequence = &regex.alternatives[0].sequence;
    assert_eq!(sequence.len(), 3);
    for (root, expected) in sequence.iter().zip(["a", "b", "c"]) {
        match root {
            RootRegex::Atomic(AtomicRegex::Primitive(primitive)) => match &primitive.kind {
                PrimitiveKind::Literal(text) => assert_eq!(text, expected),
                other => panic!("expected a literal, got {other:?}"),
            },
            other => panic!("expected an atomic root, got {other:?}"),
        }
    }
}

#[test]
fn test_untyped_literal_stays_whole() {
    let tree = parse_source(
        r#"
        finite automaton M {
            root terminal X = 'abc';
        }
        "#,
    );

    let regex = tree.machines["M"].statements["X"]
        .regex()
        .expect("a rule body");
    assert_eq!(regex.alternatives[0].sequence.len(), 1);
}

#[test]
fn test_suffix_applies_to_the_last_split_byte() {
    let tree = parse_source(
        r#"
        finite automaton M {
            root terminal X = "ab"*;
        }
        "#,
    );

    let sequence = &tree.machines["M"].statements["X"]
        .regex()
        .expect("a rule body")
        .alternatives[0]
        .sequence;
    assert_eq!(sequence.len(), 2);
    assert!(matches!(sequence[0], RootRegex::Atomic(_)));
    match &sequence[1] {
        RootRegex::Repetitive(repetition) => {
            assert_eq!(repetition.min, 0);
            assert_eq!(repetition.max, RepetitionBound::Infinite);
        }
        other => panic!("expected a repetition, got {other:?}"),
    }
}

#[test]
fn test_repetition_range() {
    let tree = parse_source(
        r#"
        finite automaton M {
            root terminal X = "a"{2,5};
        }
        "#,
    );

    match &tree.machines["M"].statements["X"]
        .regex()
        .expect("a rule body")
        .alternatives[0]
        .sequence[0]
    {
        RootRegex::Repetitive(repetition) => {
            assert_eq!(repetition.min, 2);
            assert_eq!(repetition.max, RepetitionBound::Finite(5));
        }
        other => panic!("expected a repetition, got {other:?}"),
    }
}

#[test]
fn test_inverted_repetition_range_is_rejected() {
    let error = parse_error(
        r#"
        finite automaton M {
            root terminal X = "a"{5,2};
        }
        "#,
    );
    assert!(matches!(
        error,
        CompileError::Parse(ParseError::InvertedRepetitionRange { .. })
    ));
}

#[test]
fn test_actions_attach_to_their_root() {
    let tree = parse_source(
        r#"
        finite automaton M {
            root terminal X { raw str; flag f; } = ["a"-"z"]+@capture:str@flag:f;
        }
        "#,
    );

    let sequence = &tree.machines["M"].statements["X"]
        .regex()
        .expect("a rule body")
        .alternatives[0]
        .sequence;
    let actions = sequence[0].actions();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind, RegexActionKind::Capture);
    assert_eq!(actions[0].target, "str");
    assert_eq!(actions[1].kind, RegexActionKind::Flag);
}

#[test]
fn test_empty_regex_parses() {
    let tree = parse_source(
        r#"
        finite automaton M {
            root terminal X = () | "a";
        }
        "#,
    );

    let regex = tree.machines["M"].statements["X"]
        .regex()
        .expect("a rule body");
    assert_eq!(regex.alternatives.len(), 2);
    match &regex.alternatives[0].sequence[0] {
        RootRegex::Atomic(AtomicRegex::Primitive(primitive)) => {
            assert!(matches!(primitive.kind, PrimitiveKind::Empty));
        }
        other => panic!("expected the empty regex, got {other:?}"),
    }
}

#[test]
fn test_duplicate_flag_setting_is_rejected() {
    let error = parse_error(
        "finite automaton M with productions_root_by_default, productions_nonroot_by_default;",
    );
    assert!(matches!(
        error,
        CompileError::Parse(ParseError::DuplicateFlagSetting { .. })
    ));
}

#[test]
fn test_file_level_uses_statement() {
    let tree = parse_source(r#"uses "tokens.astir"; finite automaton M;"#);
    assert_eq!(tree.file_references.len(), 1);
    assert_eq!(tree.file_references[0].path, "tokens.astir");
}

#[test]
fn test_machine_redeclaration_is_rejected() {
    let error = parse_error("finite automaton M; finite automaton M;");
    assert!(matches!(error, CompileError::Semantic(_)));
}

#[test]
fn test_parse_error_carries_location() {
    let error = parse_error("finite automaton M {");
    match error {
        CompileError::Parse(ParseError::UnexpectedToken { location, .. }) => {
            assert_eq!(location.line, 1);
        }
        other => panic!("expected an unexpected token error, got: {other}"),
    }
}
