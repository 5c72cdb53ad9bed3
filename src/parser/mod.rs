//! Recursive-descent parser for grammar source.
//!
//! Consumes the token stream of [`crate::lexer`] and produces a
//! [`SemanticTree`] whose cross-references are still unresolved names;
//! [`SemanticTree::initialize`] completes them. Every regex node is stamped
//! with a tree-unique [`NodeId`] here.

mod regexes;

#[cfg(test)]
mod tests;

use smol_str::SmolStr;

use crate::base::{FileLocation, NodeId};
use crate::errors::{CompileError, ParseError, SemanticError};
use crate::lexer::{Token, TokenKind};
use crate::semantic::{
    AttributedPart, CategoryStatement, Field, FieldKind, FileReference, Machine, MachineFlag,
    MachineKind, MachineLink, PatternStatement, ProductionStatement, RegexStatement, Rootness,
    SemanticTree, Statement, Terminality,
};

/// Parse a token stream into the (unlinked) semantic tree.
pub fn parse(tokens: &[Token]) -> Result<SemanticTree, CompileError> {
    let mut parser = Parser::new(tokens);
    parser.parse_tree()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    node_counter: u32,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            node_counter: 0,
        }
    }

    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> &'a Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn location(&self) -> FileLocation {
        self.peek().location
    }

    fn next_node(&mut self) -> NodeId {
        self.node_counter += 1;
        NodeId(self.node_counter)
    }

    fn unexpected(&self, expected: &str, context: &str, since: FileLocation) -> ParseError {
        ParseError::UnexpectedToken {
            found: self.peek().to_human_string(),
            expected: expected.to_string(),
            context: context.to_string(),
            location: self.location(),
            since,
        }
    }

    fn expect(
        &mut self,
        kind: TokenKind,
        expected: &str,
        context: &str,
        since: FileLocation,
    ) -> Result<&'a Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected, context, since))
        }
    }

    fn parse_tree(&mut self) -> Result<SemanticTree, CompileError> {
        let mut tree = SemanticTree::new();

        while !self.at(TokenKind::EndOfStream) {
            if let Some(reference) = self.parse_file_reference()? {
                tree.file_references.push(reference);
                continue;
            }

            if let Some(machine) = self.parse_machine_definition()? {
                if let Some(previous) = tree.machines.get(&machine.name) {
                    return Err(SemanticError::Redeclaration {
                        name: machine.name.to_string(),
                        location: machine.location,
                        previous: previous.location,
                    }
                    .into());
                }
                tree.machines.insert(machine.name.clone(), machine);
                continue;
            }

            return Err(self
                .unexpected(
                    "a machine definition or a 'uses' statement",
                    "at grammar file level",
                    self.location(),
                )
                .into());
        }

        Ok(tree)
    }

    /// `uses "path";` at file level.
    fn parse_file_reference(&mut self) -> Result<Option<FileReference>, ParseError> {
        if !self.at(TokenKind::Uses) {
            return Ok(None);
        }
        let since = self.bump().location;

        let path = match self.kind() {
            TokenKind::String { .. } => self.bump().text.to_string(),
            _ => {
                return Err(self.unexpected(
                    "a string with a file path",
                    "for 'uses' statement",
                    since,
                ));
            }
        };
        self.expect(
            TokenKind::Semicolon,
            "the terminal semicolon ';'",
            "for 'uses' statement",
            since,
        )?;

        Ok(Some(FileReference {
            path,
            location: since,
        }))
    }

    fn parse_machine_kind(&mut self) -> Result<Option<(MachineKind, FileLocation)>, ParseError> {
        if self.at(TokenKind::Finite) {
            let since = self.bump().location;
            self.expect(
                TokenKind::Automaton,
                "the keyword 'automaton'",
                "for finite automaton declaration",
                since,
            )?;
            return Ok(Some((MachineKind::FiniteAutomaton, since)));
        }

        if self.at(TokenKind::Ll) {
            let since = self.bump().location;
            self.expect(
                TokenKind::ParLeft,
                "'(' introducing the lookahead bound",
                "for LL parser declaration",
                since,
            )?;
            let k_token = self.expect(
                TokenKind::Number,
                "the lookahead bound k",
                "for LL parser declaration",
                since,
            )?;
            let k: usize = k_token.text.parse().map_err(|_| ParseError::UnexpectedToken {
                found: k_token.to_human_string(),
                expected: "a representable lookahead bound".to_string(),
                context: "for LL parser declaration".to_string(),
                location: k_token.location,
                since,
            })?;
            self.expect(
                TokenKind::ParRight,
                "')' closing the lookahead bound",
                "for LL parser declaration",
                since,
            )?;
            self.expect(
                TokenKind::Parser,
                "the keyword 'parser'",
                "for LL parser declaration",
                since,
            )?;
            return Ok(Some((MachineKind::LlkParser { k }, since)));
        }

        Ok(None)
    }

    fn parse_machine_definition(&mut self) -> Result<Option<Machine>, CompileError> {
        let Some((kind, since)) = self.parse_machine_kind()? else {
            return Ok(None);
        };

        let name = self
            .expect(
                TokenKind::Identifier,
                "an identifier",
                "for machine declaration",
                since,
            )?
            .text
            .clone();
        let mut machine = Machine::new(name, since, kind);

        if self.at(TokenKind::With) {
            self.bump();
            self.parse_machine_flag(&mut machine, since)?;
            while self.at(TokenKind::Comma) {
                self.bump();
                self.parse_machine_flag(&mut machine, since)?;
            }
        }

        if self.at(TokenKind::On) {
            self.bump();
            let target = self.expect(
                TokenKind::Identifier,
                "an identifier for the input machine",
                "for machine declaration",
                since,
            )?;
            machine.on = Some(MachineLink::unresolved(target.text.clone(), target.location));
        }

        if self.at(TokenKind::Uses) {
            self.bump();
            loop {
                let used = self.expect(
                    TokenKind::Identifier,
                    "an identifier for the machine to use",
                    "in the 'uses' clause of a machine declaration",
                    since,
                )?;
                machine
                    .uses
                    .push(MachineLink::unresolved(used.text.clone(), used.location));
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }

        if self.at(TokenKind::Semicolon) {
            self.bump();
            return Ok(Some(machine));
        }

        self.expect(
            TokenKind::CurlyLeft,
            "the definition body opening bracket '{'",
            "for machine definition",
            since,
        )?;

        while let Some(statement) = self.parse_machine_statement()? {
            if let Some(previous) = machine.statements.get(statement.name()) {
                return Err(SemanticError::Redeclaration {
                    name: statement.name().to_string(),
                    location: statement.location(),
                    previous: previous.location(),
                }
                .into());
            }
            machine
                .statements
                .insert(statement.name().clone(), statement);
        }

        self.expect(
            TokenKind::CurlyRight,
            "a statement or the closing bracket '}'",
            "for machine definition",
            since,
        )?;

        Ok(Some(machine))
    }

    fn parse_machine_flag(
        &mut self,
        machine: &mut Machine,
        since: FileLocation,
    ) -> Result<(), ParseError> {
        let (flag, value) = match self.kind() {
            TokenKind::ProductionsTerminalByDefault => {
                (MachineFlag::ProductionsTerminalByDefault, true)
            }
            TokenKind::ProductionsNonterminalByDefault => {
                (MachineFlag::ProductionsTerminalByDefault, false)
            }
            TokenKind::ProductionsRootByDefault => (MachineFlag::ProductionsRootByDefault, true),
            TokenKind::ProductionsNonrootByDefault => (MachineFlag::ProductionsRootByDefault, false),
            TokenKind::CategoriesRootByDefault => (MachineFlag::CategoriesRootByDefault, true),
            TokenKind::CategoriesNonrootByDefault => (MachineFlag::CategoriesRootByDefault, false),
            TokenKind::AmbiguityResolvedByPrecedence => {
                (MachineFlag::AmbiguityResolvedByPrecedence, true)
            }
            TokenKind::AmbiguityDisallowed => (MachineFlag::AmbiguityResolvedByPrecedence, false),
            _ => {
                return Err(self.unexpected(
                    "an attribute-setting keyword",
                    "in the 'with' clause of a machine declaration",
                    since,
                ));
            }
        };

        let token = self.bump();
        if machine.flags.get(&flag).map(|s| s.set).unwrap_or(false) {
            return Err(ParseError::DuplicateFlagSetting {
                flag: token.text.to_string(),
                location: token.location,
            });
        }
        machine.set_flag(flag, value);
        Ok(())
    }

    fn parse_machine_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        let saved = self.pos;
        let since = self.location();

        let mut rootness = Rootness::Unspecified;
        if self.at(TokenKind::Ignored) {
            self.bump();
            self.expect(
                TokenKind::Root,
                "the keyword 'root'",
                "for machine statement",
                since,
            )?;
            rootness = Rootness::IgnoreRoot;
        } else if self.at(TokenKind::Root) {
            self.bump();
            rootness = Rootness::AcceptRoot;
        }

        if self.at(TokenKind::Category) {
            self.bump();
            return Ok(Some(self.parse_category_statement(rootness, since)?));
        }

        if self.at(TokenKind::Pattern) {
            if rootness != Rootness::Unspecified {
                return Err(self.unexpected(
                    "'category', 'production', or terminality to follow the rootness specification",
                    "for machine statement",
                    since,
                ));
            }
            self.bump();
            return Ok(Some(self.parse_pattern_statement(since)?));
        }

        if self.at(TokenKind::Regex) {
            if rootness != Rootness::Unspecified {
                return Err(self.unexpected(
                    "'category', 'production', or terminality to follow the rootness specification",
                    "for machine statement",
                    since,
                ));
            }
            self.bump();
            return Ok(Some(self.parse_regex_statement(since)?));
        }

        let mut terminality = Terminality::Unspecified;
        if self.at(TokenKind::Terminal) {
            self.bump();
            terminality = Terminality::Terminal;
        } else if self.at(TokenKind::Nonterminal) {
            self.bump();
            terminality = Terminality::Nonterminal;
        }

        if self.at(TokenKind::Production) {
            self.bump();
        }

        if self.at(TokenKind::Identifier) {
            return Ok(Some(self.parse_production_statement(
                rootness,
                terminality,
                since,
            )?));
        }

        if rootness != Rootness::Unspecified || terminality != Terminality::Unspecified {
            return Err(self.unexpected(
                "an identifier, optionally preceded by 'production'",
                "for machine statement",
                since,
            ));
        }

        self.pos = saved;
        Ok(None)
    }

    fn parse_category_statement(
        &mut self,
        rootness: Rootness,
        since: FileLocation,
    ) -> Result<Statement, ParseError> {
        let name = self
            .expect(
                TokenKind::Identifier,
                "an identifier for the category name",
                "for category declaration",
                since,
            )?
            .text
            .clone();

        let attrs = self.parse_attributed_part("category", since)?;
        self.expect(
            TokenKind::Semicolon,
            "the terminal semicolon ';'",
            "for category definition",
            since,
        )?;

        Ok(Statement::Category(CategoryStatement {
            name,
            location: since,
            rootness,
            attrs,
            references: Default::default(),
        }))
    }

    fn parse_production_statement(
        &mut self,
        rootness: Rootness,
        terminality: Terminality,
        since: FileLocation,
    ) -> Result<Statement, ParseError> {
        let name = self
            .expect(
                TokenKind::Identifier,
                "an identifier to serve as the production name",
                "for production declaration",
                since,
            )?
            .text
            .clone();

        let attrs = self.parse_attributed_part("production", since)?;
        let regex = self.parse_rule_part("production", since)?;

        Ok(Statement::Production(ProductionStatement {
            name,
            location: since,
            rootness,
            terminality,
            terminal_index: 0,
            attrs,
            regex,
        }))
    }

    fn parse_pattern_statement(&mut self, since: FileLocation) -> Result<Statement, ParseError> {
        let name = self
            .expect(
                TokenKind::Identifier,
                "an identifier to serve as the pattern name",
                "for pattern declaration",
                since,
            )?
            .text
            .clone();

        let attrs = self.parse_attributed_part("pattern", since)?;
        let regex = self.parse_rule_part("pattern", since)?;

        Ok(Statement::Pattern(PatternStatement {
            name,
            location: since,
            attrs,
            regex,
        }))
    }

    fn parse_regex_statement(&mut self, since: FileLocation) -> Result<Statement, ParseError> {
        let name = self
            .expect(
                TokenKind::Identifier,
                "an identifier to serve as the regex name",
                "for regex declaration",
                since,
            )?
            .text
            .clone();

        let regex = self.parse_rule_part("regex", since)?;

        Ok(Statement::Regex(RegexStatement {
            name,
            location: since,
            regex,
        }))
    }

    /// The optional `: Parent, ...` and `{ fields }` clauses.
    fn parse_attributed_part(
        &mut self,
        statement_kind: &str,
        since: FileLocation,
    ) -> Result<AttributedPart, ParseError> {
        let mut attrs = AttributedPart::default();

        if self.at(TokenKind::Colon) {
            self.bump();
            loop {
                let parent = self.expect(
                    TokenKind::Identifier,
                    "a category name identifier",
                    &format!("for inheritance in {statement_kind} declaration"),
                    since,
                )?;
                attrs.categories.insert(parent.text.clone(), None);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }

        if self.at(TokenKind::CurlyLeft) {
            self.bump();
            while let Some(field) = self.parse_field_declaration()? {
                attrs.fields.push(field);
            }
            self.expect(
                TokenKind::CurlyRight,
                "a member declaration or the matching '}'",
                &format!("for {statement_kind} definition"),
                since,
            )?;
        }

        Ok(attrs)
    }

    fn parse_field_declaration(&mut self) -> Result<Option<Field>, ParseError> {
        let since = self.location();

        let (name, kind): (SmolStr, FieldKind) = match self.kind() {
            TokenKind::Flag | TokenKind::Raw => {
                let keyword = self.bump();
                let kind = if keyword.kind == TokenKind::Flag {
                    FieldKind::Flag
                } else {
                    FieldKind::Raw
                };
                let name = self
                    .expect(
                        TokenKind::Identifier,
                        &format!("an identifier for the member name to follow '{}'", keyword.text),
                        "for member declaration",
                        since,
                    )?
                    .text
                    .clone();
                (name, kind)
            }
            TokenKind::Identifier => {
                let type_name = self.bump().text.clone();
                let is_list = match self.kind() {
                    TokenKind::List => {
                        self.bump();
                        true
                    }
                    TokenKind::Item => {
                        self.bump();
                        false
                    }
                    TokenKind::Identifier => false,
                    _ => {
                        return Err(self.unexpected(
                            "'list', 'item', or an identifier for the member name",
                            "for member declaration",
                            since,
                        ));
                    }
                };
                let name = self
                    .expect(
                        TokenKind::Identifier,
                        "an identifier for the member name",
                        "for member declaration",
                        since,
                    )?
                    .text
                    .clone();
                let kind = if is_list {
                    FieldKind::List {
                        type_name,
                        type_machine: None,
                    }
                } else {
                    FieldKind::Item {
                        type_name,
                        type_machine: None,
                    }
                };
                (name, kind)
            }
            _ => return Ok(None),
        };

        self.expect(
            TokenKind::Semicolon,
            "the terminal semicolon ';'",
            "for member declaration",
            since,
        )?;

        Ok(Some(Field {
            name,
            location: since,
            kind,
        }))
    }

    /// The `= REGEX ;` tail shared by productions, patterns, and regex
    /// statements.
    fn parse_rule_part(
        &mut self,
        statement_kind: &str,
        since: FileLocation,
    ) -> Result<crate::semantic::DisjunctiveRegex, ParseError> {
        self.expect(
            TokenKind::Equals,
            "'=' followed by a rule body",
            &format!("for {statement_kind} declaration"),
            since,
        )?;

        let Some(regex) = self.parse_disjunctive_regex()? else {
            return Err(self.unexpected(
                "a rule body (a possibly disjunctive regex)",
                &format!("for {statement_kind} declaration"),
                since,
            ));
        };

        self.expect(
            TokenKind::Semicolon,
            "the terminal semicolon ';'",
            &format!("for {statement_kind} definition"),
            since,
        )?;

        Ok(regex)
    }
}
