//! Logos-based lexer for grammar source.
//!
//! Produces a flat, located token stream with whitespace and comments
//! dropped, string escapes decoded, and a terminating
//! [`TokenKind::EndOfStream`] token. Single-quoted strings are *untyped*
//! (one literal unit); double-quoted strings are *typed* (the parser
//! splits them into per-byte literals).

use logos::Logos;
use smol_str::SmolStr;

use crate::base::FileLocation;
use crate::errors::LexError;

/// A lexed token: kind, processed text, and the location of its first
/// character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub location: FileLocation,
}

impl Token {
    /// Rendering used in "unexpected X" parse errors.
    pub fn to_human_string(&self) -> String {
        match self.kind {
            TokenKind::EndOfStream => "end of input".to_string(),
            TokenKind::String { .. } => format!("string \"{}\"", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Uses,
    On,
    With,
    Finite,
    Automaton,
    Ll,
    Parser,

    ProductionsTerminalByDefault,
    ProductionsNonterminalByDefault,
    ProductionsRootByDefault,
    ProductionsNonrootByDefault,
    CategoriesRootByDefault,
    CategoriesNonrootByDefault,
    AmbiguityDisallowed,
    AmbiguityResolvedByPrecedence,

    Ignored,
    Root,
    Terminal,
    Nonterminal,
    Category,
    Production,
    Pattern,
    Regex,

    Item,
    List,
    Raw,

    Flag,
    Unflag,
    Capture,
    Empty,
    Append,
    Prepend,
    Set,
    Unset,
    Push,
    Pop,
    Clear,

    Identifier,
    Number,
    String { typed: bool },

    ParLeft,
    ParRight,
    SquareLeft,
    SquareRight,
    CurlyLeft,
    CurlyRight,

    Colon,
    Equals,
    LeftArrow,
    Semicolon,
    Comma,
    Dot,
    Caret,
    Dollar,

    Star,
    Plus,
    QuestionMark,
    Pipe,
    ForwardSlash,
    Ampersand,
    Dash,
    At,

    EndOfStream,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum RawToken {
    #[token("uses")]
    Uses,
    #[token("on")]
    On,
    #[token("with")]
    With,
    #[token("finite")]
    Finite,
    #[token("automaton")]
    Automaton,
    #[token("LL")]
    Ll,
    #[token("parser")]
    Parser,

    #[token("productions_terminal_by_default")]
    ProductionsTerminalByDefault,
    #[token("productions_nonterminal_by_default")]
    ProductionsNonterminalByDefault,
    #[token("productions_root_by_default")]
    ProductionsRootByDefault,
    #[token("productions_nonroot_by_default")]
    ProductionsNonrootByDefault,
    #[token("categories_root_by_default")]
    CategoriesRootByDefault,
    #[token("categories_nonroot_by_default")]
    CategoriesNonrootByDefault,
    #[token("ambiguity_disallowed")]
    AmbiguityDisallowed,
    #[token("ambiguity_resolved_by_precedence")]
    AmbiguityResolvedByPrecedence,

    #[token("ignored")]
    Ignored,
    #[token("root")]
    Root,
    #[token("terminal")]
    Terminal,
    #[token("nonterminal")]
    Nonterminal,
    #[token("category")]
    Category,
    #[token("production")]
    Production,
    #[token("pattern")]
    Pattern,
    #[token("regex")]
    Regex,

    #[token("item")]
    Item,
    #[token("list")]
    List,
    #[token("raw")]
    Raw,

    #[token("flag")]
    Flag,
    #[token("unflag")]
    Unflag,
    #[token("capture")]
    Capture,
    #[token("empty")]
    Empty,
    #[token("append")]
    Append,
    #[token("prepend")]
    Prepend,
    #[token("set")]
    Set,
    #[token("unset")]
    Unset,
    #[token("push")]
    Push,
    #[token("pop")]
    Pop,
    #[token("clear")]
    Clear,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    DoubleString,
    #[regex(r"'([^'\\\n]|\\[^\n])*'")]
    SingleString,

    #[token("(")]
    ParLeft,
    #[token(")")]
    ParRight,
    #[token("[")]
    SquareLeft,
    #[token("]")]
    SquareRight,
    #[token("{")]
    CurlyLeft,
    #[token("}")]
    CurlyRight,

    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token("<-")]
    LeftArrow,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("^")]
    Caret,
    #[token("$")]
    Dollar,

    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("?")]
    QuestionMark,
    #[token("|")]
    Pipe,
    #[token("/")]
    ForwardSlash,
    #[token("&")]
    Ampersand,
    #[token("-")]
    Dash,
    #[token("@")]
    At,
}

/// Tokenize a whole grammar source, appending the end-of-stream marker.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let line_starts = compute_line_starts(source);
    let locate = |offset: usize| locate_offset(&line_starts, offset);

    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(raw) = lexer.next() {
        let span = lexer.span();
        let location = locate(span.start);
        let slice = lexer.slice();

        let raw = match raw {
            Ok(raw) => raw,
            Err(()) => return Err(classify_error(source, span.start, location)),
        };

        let token = match raw {
            RawToken::DoubleString => Token {
                kind: TokenKind::String { typed: true },
                text: decode_escapes(&slice[1..slice.len() - 1], location, &line_starts, span.start + 1)?,
                location,
            },
            RawToken::SingleString => Token {
                kind: TokenKind::String { typed: false },
                text: decode_escapes(&slice[1..slice.len() - 1], location, &line_starts, span.start + 1)?,
                location,
            },
            _ => Token {
                kind: plain_kind(raw),
                text: SmolStr::new(slice),
                location,
            },
        };
        tokens.push(token);
    }

    tokens.push(Token {
        kind: TokenKind::EndOfStream,
        text: SmolStr::default(),
        location: locate(source.len()),
    });

    Ok(tokens)
}

fn plain_kind(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Uses => TokenKind::Uses,
        RawToken::On => TokenKind::On,
        RawToken::With => TokenKind::With,
        RawToken::Finite => TokenKind::Finite,
        RawToken::Automaton => TokenKind::Automaton,
        RawToken::Ll => TokenKind::Ll,
        RawToken::Parser => TokenKind::Parser,
        RawToken::ProductionsTerminalByDefault => TokenKind::ProductionsTerminalByDefault,
        RawToken::ProductionsNonterminalByDefault => TokenKind::ProductionsNonterminalByDefault,
        RawToken::ProductionsRootByDefault => TokenKind::ProductionsRootByDefault,
        RawToken::ProductionsNonrootByDefault => TokenKind::ProductionsNonrootByDefault,
        RawToken::CategoriesRootByDefault => TokenKind::CategoriesRootByDefault,
        RawToken::CategoriesNonrootByDefault => TokenKind::CategoriesNonrootByDefault,
        RawToken::AmbiguityDisallowed => TokenKind::AmbiguityDisallowed,
        RawToken::AmbiguityResolvedByPrecedence => TokenKind::AmbiguityResolvedByPrecedence,
        RawToken::Ignored => TokenKind::Ignored,
        RawToken::Root => TokenKind::Root,
        RawToken::Terminal => TokenKind::Terminal,
        RawToken::Nonterminal => TokenKind::Nonterminal,
        RawToken::Category => TokenKind::Category,
        RawToken::Production => TokenKind::Production,
        RawToken::Pattern => TokenKind::Pattern,
        RawToken::Regex => TokenKind::Regex,
        RawToken::Item => TokenKind::Item,
        RawToken::List => TokenKind::List,
        RawToken::Raw => TokenKind::Raw,
        RawToken::Flag => TokenKind::Flag,
        RawToken::Unflag => TokenKind::Unflag,
        RawToken::Capture => TokenKind::Capture,
        RawToken::Empty => TokenKind::Empty,
        RawToken::Append => TokenKind::Append,
        RawToken::Prepend => TokenKind::Prepend,
        RawToken::Set => TokenKind::Set,
        RawToken::Unset => TokenKind::Unset,
        RawToken::Push => TokenKind::Push,
        RawToken::Pop => TokenKind::Pop,
        RawToken::Clear => TokenKind::Clear,
        RawToken::Identifier => TokenKind::Identifier,
        RawToken::Number => TokenKind::Number,
        RawToken::ParLeft => TokenKind::ParLeft,
        RawToken::ParRight => TokenKind::ParRight,
        RawToken::SquareLeft => TokenKind::SquareLeft,
        RawToken::SquareRight => TokenKind::SquareRight,
        RawToken::CurlyLeft => TokenKind::CurlyLeft,
        RawToken::CurlyRight => TokenKind::CurlyRight,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Equals => TokenKind::Equals,
        RawToken::LeftArrow => TokenKind::LeftArrow,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Dollar => TokenKind::Dollar,
        RawToken::Star => TokenKind::Star,
        RawToken::Plus => TokenKind::Plus,
        RawToken::QuestionMark => TokenKind::QuestionMark,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::ForwardSlash => TokenKind::ForwardSlash,
        RawToken::Ampersand => TokenKind::Ampersand,
        RawToken::Dash => TokenKind::Dash,
        RawToken::At => TokenKind::At,
        RawToken::DoubleString | RawToken::SingleString => {
            unreachable!("string tokens are decoded separately")
        }
    }
}

/// Distinguishes the three shapes a lexing failure can take.
fn classify_error(source: &str, offset: usize, location: FileLocation) -> LexError {
    let rest = &source[offset..];
    if rest.starts_with('"') || rest.starts_with('\'') {
        LexError::UnterminatedString { location }
    } else if rest.starts_with("/*") {
        LexError::UnterminatedComment { location }
    } else {
        LexError::UnexpectedCharacter {
            character: rest.chars().next().unwrap_or('\0'),
            location,
        }
    }
}

/// Decodes C-style escapes inside a string body. `body_offset` is the byte
/// offset of the body's first character, used to locate bad escapes.
///
/// Byte-valued escapes (`\xHH`, `\OOO`) decode to the char with that scalar
/// value, so a decoded string is a sequence of 0-255-valued chars that
/// later stages turn back into input bytes.
fn decode_escapes(
    body: &str,
    start: FileLocation,
    line_starts: &[usize],
    body_offset: usize,
) -> Result<SmolStr, LexError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();

    while let Some((offset, character)) = chars.next() {
        if character != '\\' {
            out.push(character);
            continue;
        }

        let escape_location = locate_offset(line_starts, body_offset + offset);
        let Some((_, designator)) = chars.next() else {
            return Err(LexError::BadEscape {
                sequence: String::new(),
                location: escape_location,
                start,
            });
        };

        let simple = match designator {
            '\'' => Some('\''),
            '"' => Some('"'),
            '?' => Some('?'),
            '\\' => Some('\\'),
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            'f' => Some('\x0c'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\x0b'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            continue;
        }

        if designator == 'x' {
            let mut digits = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if next.is_ascii_hexdigit() {
                    digits.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = u32::from_str_radix(&digits, 16).ok().filter(|&v| v <= 0xff);
            match value {
                Some(value) => out.push(char::from(value as u8)),
                None => {
                    return Err(LexError::BadEscape {
                        sequence: format!("x{digits}"),
                        location: escape_location,
                        start,
                    });
                }
            }
        } else if ('0'..'8').contains(&designator) {
            let mut digits = String::new();
            digits.push(designator);
            while let Some(&(_, next)) = chars.peek() {
                if digits.len() < 3 && ('0'..'8').contains(&next) {
                    digits.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = u32::from_str_radix(&digits, 8).ok().filter(|&v| v <= 0xff);
            match value {
                Some(value) => out.push(char::from(value as u8)),
                None => {
                    return Err(LexError::BadEscape {
                        sequence: digits,
                        location: escape_location,
                        start,
                    });
                }
            }
        } else {
            return Err(LexError::BadEscape {
                sequence: designator.to_string(),
                location: escape_location,
                start,
            });
        }
    }

    Ok(SmolStr::new(out))
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (offset, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(offset + 1);
        }
    }
    starts
}

fn locate_offset(line_starts: &[usize], offset: usize) -> FileLocation {
    let line_index = match line_starts.binary_search(&offset) {
        Ok(exact) => exact,
        Err(insertion) => insertion - 1,
    };
    FileLocation::new(line_index + 1, offset - line_starts[line_index] + 1)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenization should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_punctuation() {
        assert_eq!(
            kinds("finite automaton M { root terminal A = \"a\"; }"),
            vec![
                TokenKind::Finite,
                TokenKind::Automaton,
                TokenKind::Identifier,
                TokenKind::CurlyLeft,
                TokenKind::Root,
                TokenKind::Terminal,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::String { typed: true },
                TokenKind::Semicolon,
                TokenKind::CurlyRight,
                TokenKind::EndOfStream,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_stays_identifier() {
        let tokens = tokenize("rooted").expect("tokenization should succeed");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "rooted");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("on // to the end\n/* block\ncomment */ uses"),
            vec![TokenKind::On, TokenKind::Uses, TokenKind::EndOfStream]
        );
    }

    #[test]
    fn test_block_comments_may_end_in_star_runs() {
        assert_eq!(
            kinds("on /***/ /** banner **/ /*a*b*/ uses"),
            vec![TokenKind::On, TokenKind::Uses, TokenKind::EndOfStream]
        );
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        // the first `*/` closes the comment; the inner `/*` is plain content
        assert_eq!(
            kinds("on /* /* */ uses"),
            vec![TokenKind::On, TokenKind::Uses, TokenKind::EndOfStream]
        );
    }

    #[test]
    fn test_locations_are_one_based() {
        let tokens = tokenize("on\n  uses").expect("tokenization should succeed");
        assert_eq!(tokens[0].location, FileLocation::new(1, 1));
        assert_eq!(tokens[1].location, FileLocation::new(2, 3));
    }

    #[rstest]
    #[case(r#""a\tb""#, "a\tb")]
    #[case(r"'\x41'", "A")]
    #[case(r"'\101'", "A")]
    #[case(r"'\xff'", "\u{ff}")]
    #[case(r#"'\''"#, "'")]
    #[case(r#""\"""#, "\"")]
    #[case(r"'\n\r\t'", "\n\r\t")]
    fn test_string_escapes(#[case] source: &str, #[case] expected: &str) {
        let tokens = tokenize(source).expect("tokenization should succeed");
        assert_eq!(tokens[0].text, expected);
    }

    #[test]
    fn test_quote_kinds_are_distinguished() {
        let tokens = tokenize(r#""typed" 'untyped'"#).expect("tokenization should succeed");
        assert_eq!(tokens[0].kind, TokenKind::String { typed: true });
        assert_eq!(tokens[1].kind, TokenKind::String { typed: false });
    }

    #[test]
    fn test_bad_escape_is_reported() {
        let error = tokenize(r#""\q""#).expect_err("escape should be rejected");
        assert!(matches!(error, LexError::BadEscape { .. }));
    }

    #[test]
    fn test_unterminated_string() {
        let error = tokenize("\"abc").expect_err("string should be rejected");
        assert!(matches!(error, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let error = tokenize("/* never closed").expect_err("comment should be rejected");
        assert!(matches!(error, LexError::UnterminatedComment { .. }));
    }

    #[test]
    fn test_left_arrow() {
        assert_eq!(
            kinds("<- -"),
            vec![
                TokenKind::LeftArrow,
                TokenKind::Dash,
                TokenKind::EndOfStream
            ]
        );
    }

    #[test]
    fn test_bare_less_than_is_rejected() {
        let error = tokenize("<").expect_err("lone '<' should be rejected");
        assert!(matches!(error, LexError::UnexpectedCharacter { character: '<', .. }));
    }
}
