//! Parser for Sluice source files
//!
//! A recursive descent parser that transforms the token stream from the lexer
//! into a [`CompilationUnit`].

pub mod decl;
pub mod error;
pub mod expr;
pub mod graph;
pub mod stmt;
pub mod types;

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};

pub use error::{ParseError, ParseErrorKind};

/// Parser state for one source file.
pub struct Parser {
    /// Pre-tokenized input
    tokens: Vec<(Token, Span)>,

    /// Current position in token stream
    pos: usize,

    /// Accumulated parse errors (allows continuing after errors)
    errors: Vec<ParseError>,

    /// Node id source; shared across the files of one compilation
    ids: NodeIdGen,
}

impl Parser {
    /// Create a new parser from source code.
    pub fn new(source: &str) -> Result<Self, Vec<LexError>> {
        let mut tokens = Lexer::new(source).tokenize()?;

        let eof_span = match tokens.last() {
            Some((_, last)) => Span::new(last.end, last.end, last.line, last.column),
            None => Span::new(0, 0, 1, 1),
        };
        tokens.push((Token::Eof, eof_span));

        Ok(Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            ids: NodeIdGen::default(),
        })
    }

    /// Continue numbering nodes from an existing generator
    pub fn with_node_ids(mut self, ids: NodeIdGen) -> Self {
        self.ids = ids;
        self
    }

    /// Parse the entire source file into a compilation unit.
    pub fn parse(self) -> Result<CompilationUnit, Vec<ParseError>> {
        self.parse_with_ids().0
    }

    /// Parse, handing back the node id generator for the next file.
    pub fn parse_with_ids(mut self) -> (Result<CompilationUnit, Vec<ParseError>>, NodeIdGen) {
        let unit = self.parse_compilation_unit();
        let result = if self.errors.is_empty() {
            Ok(unit)
        } else {
            Err(std::mem::take(&mut self.errors))
        };
        (result, self.ids)
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    /// Get the current token.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    /// Get the current token's span.
    #[inline]
    pub fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    /// Peek `n` tokens past the current one.
    #[inline]
    pub fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].0
    }

    /// Peek at the next token.
    #[inline]
    pub fn peek(&self) -> &Token {
        self.peek_nth(1)
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].1
    }

    /// Advance to the next token, returning the previous current token.
    pub fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    /// Check if the current token matches the given kind.
    #[inline]
    pub fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(expected)
    }

    /// Check if the current token matches any of the given kinds.
    pub fn check_any(&self, expected: &[Token]) -> bool {
        expected.iter().any(|tok| self.check(tok))
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Check if we've reached EOF.
    #[inline]
    pub fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    /// Consume the current token if it matches the expected kind.
    pub fn expect(&mut self, expected: Token) -> Result<Token, ParseError> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected_token(&[expected]))
        }
    }

    /// Consume an identifier.
    pub fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let span = self.current_span();
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Ident {
                    id: self.ids.fresh(),
                    name,
                    span,
                })
            }
            _ => Err(self.unexpected_token(&[Token::Identifier(String::new())])),
        }
    }

    pub fn check_ident(&self) -> bool {
        matches!(self.current(), Token::Identifier(_))
    }

    /// Whether the current token is the identifier `text`
    pub fn check_ident_named(&self, text: &str) -> bool {
        matches!(self.current(), Token::Identifier(name) if name == text)
    }

    pub(crate) fn fresh_id(&mut self) -> NodeId {
        self.ids.fresh()
    }

    /// Span from `start` to the end of the previously consumed token
    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.merge(&self.previous_span())
    }

    // ========================================================================
    // Error Handling
    // ========================================================================

    /// Record a parse error and keep going.
    pub fn report(&mut self, err: ParseError) {
        self.errors.push(err);
    }

    /// Create an "unexpected token" error.
    fn unexpected_token(&self, expected: &[Token]) -> ParseError {
        let span = self.current_span();
        let wanted: Vec<String> = expected.iter().map(describe).collect();
        if self.at_eof() {
            ParseError {
                kind: ParseErrorKind::UnexpectedEof {
                    expected: expected.to_vec(),
                },
                span,
                message: format!("unexpected end of file, expected {}", wanted.join(" or ")),
            }
        } else {
            ParseError {
                kind: ParseErrorKind::UnexpectedToken {
                    expected: expected.to_vec(),
                    found: self.current().clone(),
                },
                span,
                message: format!(
                    "unexpected '{}', expected {}",
                    self.current(),
                    wanted.join(" or ")
                ),
            }
        }
    }

    /// Error for a construct that cannot start here.
    pub(crate) fn unexpected(&self, what: &str) -> ParseError {
        ParseError {
            kind: ParseErrorKind::UnexpectedToken {
                expected: Vec::new(),
                found: self.current().clone(),
            },
            span: self.current_span(),
            message: format!("unexpected '{}', expected {}", self.current(), what),
        }
    }

    /// Skip tokens until something that can start a definition, balancing braces.
    pub(crate) fn sync_to_definition(&mut self) {
        let start = self.pos;
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current() {
                Token::LeftBrace => depth += 1,
                Token::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                Token::Composite | Token::Type | Token::Public | Token::Static | Token::Stateful
                    if depth == 0 && self.pos != start =>
                {
                    return
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the end of the current item inside a braced section.
    pub(crate) fn sync_to_item_end(&mut self) {
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current() {
                Token::LeftBrace => depth += 1,
                Token::RightBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Identifier(_) => "identifier".to_string(),
        Token::IntLiteral(_) => "integer".to_string(),
        Token::StringLiteral(_) => "string".to_string(),
        other => format!("'{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CompilationUnit {
        Parser::new(source).unwrap().parse().unwrap()
    }

    fn parse_err(source: &str) -> Vec<ParseError> {
        Parser::new(source).unwrap().parse().unwrap_err()
    }

    // ── Units ──

    #[test]
    fn test_namespace_and_uses() {
        let unit = parse("namespace a.b; use c.d::X; use e::*;");
        assert_eq!(unit.namespace.as_ref().map(|n| n.name.dotted()), Some("a.b".into()));
        assert_eq!(unit.uses.len(), 2);
        assert!(matches!(unit.uses[0].target, UseTarget::Name(ref i) if i.name == "X"));
        assert!(matches!(unit.uses[1].target, UseTarget::Wildcard));
    }

    #[test]
    fn test_type_definitions() {
        let unit = parse("type T = tuple<int32 a, rstring b>; static type U = list<T>[4];");
        assert_eq!(unit.definitions.len(), 2);
        let Definition::Type(t) = &unit.definitions[0] else {
            panic!("expected type def");
        };
        assert_eq!(t.name.name, "T");
        let TypeExprKind::Tuple(TupleBody::Attributes(attrs)) = &t.tail.kind else {
            panic!("expected tuple");
        };
        assert_eq!(attrs.len(), 2);
        let Definition::Type(u) = &unit.definitions[1] else {
            panic!("expected type def");
        };
        assert!(u.is_static());
        assert!(matches!(u.tail.kind, TypeExprKind::List { bound: Some(4), .. }));
    }

    #[test]
    fn test_composite_with_ports_and_graph() {
        let unit = parse(
            "composite C(input stream<T> In; output stream<T> Out) {
                graph stream<T> Out = Functor(In) {}
            }",
        );
        let Definition::Composite(c) = &unit.definitions[0] else {
            panic!("expected composite");
        };
        assert_eq!(c.inputs.len(), 1);
        assert_eq!(c.outputs.len(), 1);
        assert_eq!(c.graph.len(), 1);
        assert_eq!(c.graph[0].invocation_name(), Some("Out"));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let unit = parse("type T = tuple<int32 a>; type U = T;");
        let Definition::Type(t) = &unit.definitions[0] else {
            panic!()
        };
        let Definition::Type(u) = &unit.definitions[1] else {
            panic!()
        };
        assert_ne!(t.id, u.id);
        assert_ne!(t.tail.id, u.tail.id);
    }

    #[test]
    fn test_ids_continue_across_files() {
        let (first, ids) = Parser::new("type T = int32;").unwrap().parse_with_ids();
        let first = first.unwrap();
        let next = ids.peek();
        let second = Parser::new("type U = int32;")
            .unwrap()
            .with_node_ids(ids)
            .parse()
            .unwrap();
        assert!(second.id >= next);
        assert!(first.id < next);
    }

    // ── Errors ──

    #[test]
    fn test_mixed_tuple_body_is_rejected() {
        let errors = parse_err("type T = tuple<int32 a, U>;");
        assert!(errors
            .iter()
            .any(|e| e.kind == ParseErrorKind::MixedTupleBody));
    }

    #[test]
    fn test_recovery_reports_multiple_errors() {
        let errors = parse_err("type = int32; composite { } type V = ;");
        assert!(errors.len() >= 2);
    }
}
