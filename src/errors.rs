//! Error taxonomy of the compiler.
//!
//! Five error classes, all fatal to the current compilation: lexical,
//! syntactic, semantic, LL(k), and generation errors. Every variant carries
//! at least one grammar source location; where a second "since" location is
//! meaningful (cycle start, previous declaration) it is included.

use thiserror::Error;

use crate::base::FileLocation;

/// Errors raised while tokenizing grammar source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unrecognized character '{character}' at {location}")]
    UnexpectedCharacter {
        character: char,
        location: FileLocation,
    },

    #[error("string started at {location} was left unterminated")]
    UnterminatedString { location: FileLocation },

    #[error("unknown escape sequence '\\{sequence}' at {location} in string started at {start}")]
    BadEscape {
        sequence: String,
        location: FileLocation,
        start: FileLocation,
    },

    #[error("multiline comment started at {location} was left unclosed, expected '*/' before end of input")]
    UnterminatedComment { location: FileLocation },
}

/// Errors raised by the recursive-descent grammar parser.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected {found} at {location}, expected {expected} {context} (started at {since})")]
    UnexpectedToken {
        found: String,
        expected: String,
        context: String,
        location: FileLocation,
        since: FileLocation,
    },

    #[error(
        "the attribute setting '{flag}' at {location} configures an attribute that has already been set explicitly, check for repetitive or contradictory settings"
    )]
    DuplicateFlagSetting { flag: String, location: FileLocation },

    #[error(
        "the minimum number of repetitions exceeds the maximum in the repetition range at {location}"
    )]
    InvertedRepetitionRange { location: FileLocation },

    #[error("the end of the character range at {location} precedes its beginning")]
    InvertedCharacterRange { location: FileLocation },
}

/// Errors raised during semantic analysis of the parsed grammar.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemanticError {
    #[error("'{name}' at {location} has already been declared at {previous}")]
    Redeclaration {
        name: String,
        location: FileLocation,
        previous: FileLocation,
    },

    #[error("unknown machine '{name}' referenced as '{link}' dependency by machine '{referrer}' declared at {location}")]
    UnknownMachine {
        name: String,
        link: &'static str,
        referrer: String,
        location: FileLocation,
    },

    #[error("definition recursion found in the machine dependency path {path}, at {location}")]
    MachineHierarchyCycle { path: String, location: FileLocation },

    #[error("declaration recursion found in the category-use hierarchy path {path} at {location}")]
    CategoryCycle { path: String, location: FileLocation },

    #[error("'{name}' is referenced as a category at {location} but was not declared as one")]
    NotACategory { name: String, location: FileLocation },

    #[error("rule reference recursion found in the path {path}; start at {start}, end at {end} - no recursion is allowed in finite automata")]
    RuleReferenceCycle {
        path: String,
        start: FileLocation,
        end: FileLocation,
    },

    #[error("the name '{name}' referenced at {location} is not defined in the context of machine '{machine}'")]
    UnknownReference {
        name: String,
        machine: String,
        location: FileLocation,
    },

    #[error("the field '{name}' declared at {location} uses the name already taken by the field declared at {previous}")]
    FieldRedeclaration {
        name: String,
        location: FileLocation,
        previous: FileLocation,
    },

    #[error("the typed field '{name}' at {location} references type '{type_name}', but no such type could be found in the context of machine '{machine}'")]
    UnknownFieldType {
        name: String,
        type_name: String,
        machine: String,
        location: FileLocation,
    },

    #[error("regex actions appear at {location} while all actions are prohibited within '{context}' declared at {context_location}")]
    ActionsForbidden {
        context: String,
        location: FileLocation,
        context_location: FileLocation,
    },

    #[error("the action at {location} refers to target '{target}' that is not recognized as a field in the context of '{context}'")]
    UnknownActionTarget {
        target: String,
        context: String,
        location: FileLocation,
    },

    #[error("the action at {location} refers to target '{target}' that is not a '{expected}' field of '{context}'")]
    ActionFieldKindMismatch {
        target: String,
        expected: &'static str,
        context: String,
        location: FileLocation,
    },

    #[error("the typed action at {location} targets '{target}' of type '{declared}' with a payload of type '{actual}'")]
    TypedActionTypeMismatch {
        target: String,
        declared: String,
        actual: String,
        location: FileLocation,
    },

    #[error("literal '{literal}' encountered at {location} within machine '{machine}' that runs on the output of another machine; literals may only be used on raw input")]
    LiteralOnNonRawInput {
        literal: String,
        machine: String,
        location: FileLocation,
    },

    #[error("the repetition at {location} permits infinite repetition of a regex that may derive empty, which would loop forever")]
    EmptyRepetitionLoop { location: FileLocation },

    #[error("the finite automaton '{machine}' declared at {location} references machine '{on}' that does not have purely terminal roots and thus can not serve as its input")]
    NonTerminalInput {
        machine: String,
        on: String,
        location: FileLocation,
    },
}

/// Errors raised while building LL(k) decision trees.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlkError {
    #[error("lookahead of {k} is insufficient to tell {first} apart from {second}; both admit the prefix {witness}")]
    LookaheadExceeded {
        k: usize,
        first: String,
        second: String,
        witness: String,
    },

    #[error("left recursion detected through '{name}' at {location}")]
    LeftRecursion { name: String, location: FileLocation },
}

/// Errors raised while emitting target artifacts.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("template file '{path}' could not be read")]
    MissingTemplate { path: String },

    #[error("a macro start '${{{{' without the matching '}}}}' encountered in the template")]
    UnmatchedMacroDelimiter,

    #[error("unrecognized macro '{name}' encountered in the template")]
    UnknownMacro { name: String },

    #[error("the machine '{machine}' has no root statements and cannot be generated")]
    NoRoots { machine: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Any diagnostic the compilation pipeline can stop with.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Llk(#[from] LlkError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
