//! Regex parsing: disjunctions of juxtaposed, suffixed, action-decorated
//! atoms.
//!
//! Typed (double-quoted) literals are split here into one single-byte
//! literal atom per byte, so `"ab"` is the same rule body as `'a' 'b'`;
//! repetition suffixes and action decorations then apply to the last byte
//! only, exactly as if the split had been written out by hand.

use smol_str::SmolStr;

use crate::automata::symbol::literal_bytes;
use crate::errors::ParseError;
use crate::lexer::TokenKind;
use crate::semantic::{
    AnyRegex, AtomicRegex, ConjunctiveRegex, DisjunctiveRegex, PrimitiveKind, PrimitiveRegex,
    RegexAction, RegexActionKind, RepetitionBound, RepetitiveRegex, RootRegex,
};

use super::Parser;

impl<'a> Parser<'a> {
    pub(super) fn parse_disjunctive_regex(
        &mut self,
    ) -> Result<Option<DisjunctiveRegex>, ParseError> {
        let since = self.location();
        let Some(first) = self.parse_conjunctive_regex()? else {
            return Ok(None);
        };

        let mut regex = DisjunctiveRegex {
            node: self.next_node(),
            location: since,
            alternatives: vec![first],
            actions: Vec::new(),
        };

        while self.at(TokenKind::Pipe) {
            self.bump();
            let Some(alternative) = self.parse_conjunctive_regex()? else {
                return Err(self.unexpected(
                    "a conjunctive regex to follow '|'",
                    "for disjunctive regex",
                    since,
                ));
            };
            regex.alternatives.push(alternative);
        }

        Ok(Some(regex))
    }

    fn parse_conjunctive_regex(&mut self) -> Result<Option<ConjunctiveRegex>, ParseError> {
        let since = self.location();
        let mut sequence = Vec::new();

        while let Some(roots) = self.parse_root_regexes()? {
            sequence.extend(roots);
        }

        if sequence.is_empty() {
            return Ok(None);
        }

        Ok(Some(ConjunctiveRegex {
            node: self.next_node(),
            location: since,
            sequence,
        }))
    }

    /// One lexical atom's worth of root regexes. Usually a single element;
    /// typed multi-byte literals expand to several, with any suffix and
    /// actions landing on the last.
    fn parse_root_regexes(&mut self) -> Result<Option<Vec<RootRegex>>, ParseError> {
        let since = self.location();
        let Some(mut atoms) = self.parse_atomic_regexes()? else {
            return Ok(None);
        };

        let Some(last_atom) = atoms.pop() else {
            return Ok(None);
        };
        let mut roots: Vec<RootRegex> = atoms.into_iter().map(RootRegex::Atomic).collect();

        let mut last = match self.kind() {
            TokenKind::QuestionMark => {
                self.bump();
                RootRegex::Repetitive(RepetitiveRegex {
                    node: self.next_node(),
                    location: since,
                    min: 0,
                    max: RepetitionBound::Finite(1),
                    atom: Box::new(last_atom),
                    actions: Vec::new(),
                })
            }
            TokenKind::Star => {
                self.bump();
                RootRegex::Repetitive(RepetitiveRegex {
                    node: self.next_node(),
                    location: since,
                    min: 0,
                    max: RepetitionBound::Infinite,
                    atom: Box::new(last_atom),
                    actions: Vec::new(),
                })
            }
            TokenKind::Plus => {
                self.bump();
                RootRegex::Repetitive(RepetitiveRegex {
                    node: self.next_node(),
                    location: since,
                    min: 1,
                    max: RepetitionBound::Infinite,
                    atom: Box::new(last_atom),
                    actions: Vec::new(),
                })
            }
            TokenKind::CurlyLeft => {
                self.bump();
                let min = self.parse_repetition_count(since)?;
                self.expect(
                    TokenKind::Comma,
                    "a comma separating the range numbers",
                    "for repetition range regex",
                    since,
                )?;
                let (max, max_location) = self.parse_repetition_count_located(since)?;
                if min > max {
                    return Err(ParseError::InvertedRepetitionRange {
                        location: max_location,
                    });
                }
                self.expect(
                    TokenKind::CurlyRight,
                    "the closing bracket '}'",
                    "for repetition range regex",
                    since,
                )?;
                RootRegex::Repetitive(RepetitiveRegex {
                    node: self.next_node(),
                    location: since,
                    min,
                    max: RepetitionBound::Finite(max),
                    atom: Box::new(last_atom),
                    actions: Vec::new(),
                })
            }
            _ => RootRegex::Atomic(last_atom),
        };

        while self.at(TokenKind::At) {
            let at_location = self.bump().location;
            let kind = self.parse_regex_action_kind(at_location)?;
            self.expect(
                TokenKind::Colon,
                "a colon ':' separating the action from its target",
                "for regex action",
                at_location,
            )?;
            let target = self.expect(
                TokenKind::Identifier,
                "an identifier naming the action target",
                "for regex action",
                at_location,
            )?;
            last.actions_mut().push(RegexAction {
                kind,
                target: target.text.clone(),
                location: at_location,
                field: None,
            });
        }

        roots.push(last);
        Ok(Some(roots))
    }

    fn parse_repetition_count(
        &mut self,
        since: crate::base::FileLocation,
    ) -> Result<u32, ParseError> {
        self.parse_repetition_count_located(since).map(|(count, _)| count)
    }

    fn parse_repetition_count_located(
        &mut self,
        since: crate::base::FileLocation,
    ) -> Result<(u32, crate::base::FileLocation), ParseError> {
        let token = self.expect(
            TokenKind::Number,
            "a number",
            "for repetition range regex",
            since,
        )?;
        let count = token.text.parse().map_err(|_| ParseError::UnexpectedToken {
            found: token.to_human_string(),
            expected: "a representable repetition count".to_string(),
            context: "for repetition range regex".to_string(),
            location: token.location,
            since,
        })?;
        Ok((count, token.location))
    }

    fn parse_regex_action_kind(
        &mut self,
        since: crate::base::FileLocation,
    ) -> Result<RegexActionKind, ParseError> {
        let kind = match self.kind() {
            TokenKind::Flag => RegexActionKind::Flag,
            TokenKind::Unflag => RegexActionKind::Unflag,
            TokenKind::Capture => RegexActionKind::Capture,
            TokenKind::Empty => RegexActionKind::Empty,
            TokenKind::Append => RegexActionKind::Append,
            TokenKind::Prepend => RegexActionKind::Prepend,
            TokenKind::Set => RegexActionKind::Set,
            TokenKind::Unset => RegexActionKind::Unset,
            TokenKind::Push => RegexActionKind::Push,
            TokenKind::Pop => RegexActionKind::Pop,
            TokenKind::Clear => RegexActionKind::Clear,
            _ => {
                return Err(self.unexpected(
                    "an action keyword to follow '@'",
                    "for regex action",
                    since,
                ));
            }
        };
        self.bump();
        Ok(kind)
    }

    fn parse_atomic_regexes(&mut self) -> Result<Option<Vec<AtomicRegex>>, ParseError> {
        let since = self.location();

        if self.at(TokenKind::ParLeft) {
            self.bump();

            if self.at(TokenKind::ParRight) {
                self.bump();
                return Ok(Some(vec![AtomicRegex::Primitive(PrimitiveRegex {
                    node: self.next_node(),
                    location: since,
                    kind: PrimitiveKind::Empty,
                    actions: Vec::new(),
                })]));
            }

            let Some(group) = self.parse_disjunctive_regex()? else {
                return Err(self.unexpected(
                    "a disjunctive regex or an empty regex",
                    "for parenthesized regex",
                    since,
                ));
            };
            self.expect(
                TokenKind::ParRight,
                "the matching closing parenthesis ')'",
                "for parenthesized regex",
                since,
            )?;
            return Ok(Some(vec![AtomicRegex::Group(Box::new(group))]));
        }

        if self.at(TokenKind::SquareLeft) {
            return Ok(Some(vec![self.parse_any_regex()?]));
        }

        match self.kind() {
            TokenKind::String { typed } => {
                let token = self.bump();
                let text = token.text.clone();
                let location = token.location;

                if typed && text.chars().count() > 1 {
                    let atoms = text
                        .chars()
                        .map(|character| {
                            AtomicRegex::Primitive(PrimitiveRegex {
                                node: self.next_node(),
                                location,
                                kind: PrimitiveKind::Literal(SmolStr::new(
                                    character.to_string(),
                                )),
                                actions: Vec::new(),
                            })
                        })
                        .collect();
                    Ok(Some(atoms))
                } else {
                    Ok(Some(vec![AtomicRegex::Primitive(PrimitiveRegex {
                        node: self.next_node(),
                        location,
                        kind: PrimitiveKind::Literal(text),
                        actions: Vec::new(),
                    })]))
                }
            }
            TokenKind::Dot => {
                let location = self.bump().location;
                Ok(Some(vec![AtomicRegex::Primitive(PrimitiveRegex {
                    node: self.next_node(),
                    location,
                    kind: PrimitiveKind::Arbitrary,
                    actions: Vec::new(),
                })]))
            }
            TokenKind::Identifier => {
                let token = self.bump();
                Ok(Some(vec![AtomicRegex::Primitive(PrimitiveRegex {
                    node: self.next_node(),
                    location: token.location,
                    kind: PrimitiveKind::Reference {
                        name: token.text.clone(),
                        target: None,
                    },
                    actions: Vec::new(),
                })]))
            }
            _ => Ok(None),
        }
    }

    /// `[...]` and `[^...]` character sets.
    fn parse_any_regex(&mut self) -> Result<AtomicRegex, ParseError> {
        let since = self.bump().location;

        let negated = if self.at(TokenKind::Caret) {
            self.bump();
            true
        } else {
            false
        };

        let mut any = AnyRegex::default();
        while let TokenKind::String { .. } = self.kind() {
            let first = self.bump();
            let first_text = first.text.clone();

            if self.at(TokenKind::Dash) {
                self.bump();
                let end = match self.kind() {
                    TokenKind::String { .. } => self.bump(),
                    _ => {
                        return Err(self.unexpected(
                            "a string literal for the end of the range",
                            "for character set regex",
                            since,
                        ));
                    }
                };
                let start_bytes = literal_bytes(&first_text);
                let end_bytes = literal_bytes(&end.text);
                let (Some(&start_byte), Some(&end_byte)) =
                    (start_bytes.first(), end_bytes.first())
                else {
                    return Err(self.unexpected(
                        "non-empty string literals as range endpoints",
                        "for character set regex",
                        since,
                    ));
                };
                if start_byte > end_byte {
                    return Err(ParseError::InvertedCharacterRange {
                        location: end.location,
                    });
                }
                any.ranges.push((start_byte, end_byte));
            } else {
                any.bytes.extend(literal_bytes(&first_text));
            }
        }

        self.expect(
            TokenKind::SquareRight,
            "a literal, a literal range, or the matching ']'",
            "for character set regex",
            since,
        )?;

        let kind = if negated {
            PrimitiveKind::ExceptAny(any)
        } else {
            PrimitiveKind::Any(any)
        };
        Ok(AtomicRegex::Primitive(PrimitiveRegex {
            node: self.next_node(),
            location: since,
            kind,
            actions: Vec::new(),
        }))
    }
}
