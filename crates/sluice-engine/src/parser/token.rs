//! Token definitions for the Sluice stream-processing language.

use std::fmt;

/// A token of Sluice source code.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Declarations
    Namespace,
    Use,
    Composite,
    Type,
    Stream,

    // Modifiers
    Public,
    Static,
    Mutable,
    Stateful,

    // Composite and invocation sections
    Graph,
    Param,
    Config,
    Input,
    Output,
    Logic,
    State,
    OnTuple,
    OnPunct,
    OnProcess,
    Window,

    // Expression modes of composite formals
    Expression,
    Attribute,
    Function,
    Operator,

    // Type constructors
    Tuple,
    List,
    Set,
    Map,
    Enum,
    Optional,

    // Statements
    As,
    If,
    Else,
    For,
    In,
    While,
    Return,
    Break,
    Continue,

    // Literals
    True,
    False,
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    /// Identifier, possibly with a leading `$`
    Identifier(String),

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AmpAmp,
    PipePipe,
    Bang,
    Dot,
    Comma,
    Semicolon,
    Colon,
    ColonColon,
    At,
    Question,

    Eof,
}

impl Token {
    /// Whether the token is a reserved word
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Namespace
                | Token::Use
                | Token::Composite
                | Token::Type
                | Token::Stream
                | Token::Public
                | Token::Static
                | Token::Mutable
                | Token::Stateful
                | Token::Graph
                | Token::Param
                | Token::Config
                | Token::Input
                | Token::Output
                | Token::Logic
                | Token::State
                | Token::OnTuple
                | Token::OnPunct
                | Token::OnProcess
                | Token::Window
                | Token::Expression
                | Token::Attribute
                | Token::Function
                | Token::Operator
                | Token::Tuple
                | Token::List
                | Token::Set
                | Token::Map
                | Token::Enum
                | Token::Optional
                | Token::As
                | Token::If
                | Token::Else
                | Token::For
                | Token::In
                | Token::While
                | Token::Return
                | Token::Break
                | Token::Continue
                | Token::True
                | Token::False
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::IntLiteral(_)
                | Token::FloatLiteral(_)
                | Token::StringLiteral(_)
                | Token::True
                | Token::False
        )
    }
}

/// Source location of a token or syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if self.start <= other.start {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Namespace => "namespace",
            Token::Use => "use",
            Token::Composite => "composite",
            Token::Type => "type",
            Token::Stream => "stream",
            Token::Public => "public",
            Token::Static => "static",
            Token::Mutable => "mutable",
            Token::Stateful => "stateful",
            Token::Graph => "graph",
            Token::Param => "param",
            Token::Config => "config",
            Token::Input => "input",
            Token::Output => "output",
            Token::Logic => "logic",
            Token::State => "state",
            Token::OnTuple => "onTuple",
            Token::OnPunct => "onPunct",
            Token::OnProcess => "onProcess",
            Token::Window => "window",
            Token::Expression => "expression",
            Token::Attribute => "attribute",
            Token::Function => "function",
            Token::Operator => "operator",
            Token::Tuple => "tuple",
            Token::List => "list",
            Token::Set => "set",
            Token::Map => "map",
            Token::Enum => "enum",
            Token::Optional => "optional",
            Token::As => "as",
            Token::If => "if",
            Token::Else => "else",
            Token::For => "for",
            Token::In => "in",
            Token::While => "while",
            Token::Return => "return",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::True => "true",
            Token::False => "false",
            Token::IntLiteral(n) => return write!(f, "{}", n),
            Token::FloatLiteral(n) => return write!(f, "{}", n),
            Token::StringLiteral(s) => return write!(f, "\"{}\"", s),
            Token::Identifier(name) => return f.write_str(name),
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Less => "<",
            Token::Greater => ">",
            Token::LessEqual => "<=",
            Token::GreaterEqual => ">=",
            Token::EqualEqual => "==",
            Token::BangEqual => "!=",
            Token::Equal => "=",
            Token::PlusEqual => "+=",
            Token::MinusEqual => "-=",
            Token::StarEqual => "*=",
            Token::SlashEqual => "/=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Bang => "!",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::ColonColon => "::",
            Token::At => "@",
            Token::Question => "?",
            Token::Eof => "end of file",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_classification() {
        assert!(Token::Composite.is_keyword());
        assert!(Token::OnTuple.is_keyword());
        assert!(!Token::Identifier("x".into()).is_keyword());
        assert!(Token::True.is_literal());
    }

    #[test]
    fn test_span_merge_keeps_first_position() {
        let a = Span::new(10, 14, 2, 3);
        let b = Span::new(20, 25, 3, 1);
        let m = b.merge(&a);
        assert_eq!((m.start, m.end, m.line, m.column), (10, 25, 2, 3));
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::OnPunct.to_string(), "onPunct");
        assert_eq!(Token::ColonColon.to_string(), "::");
        assert_eq!(Token::Identifier("$x".into()).to_string(), "$x");
    }
}
