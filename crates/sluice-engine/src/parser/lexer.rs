//! Lexer for the Sluice language.
//!
//! Tokenization is done by logos; this module converts the logos tokens into
//! [`Token`] values with line/column spans.

use crate::parser::token::{Span, Token};
use logos::Logos;
use thiserror::Error;

/// Logos-based token enum for lexing.
///
/// Converted to the public [`Token`] enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum LogosToken {
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*", lex_block_comment)]
    BlockComment,

    #[token("namespace")]
    Namespace,
    #[token("use")]
    Use,
    #[token("composite")]
    Composite,
    #[token("type")]
    Type,
    #[token("stream")]
    Stream,
    #[token("public")]
    Public,
    #[token("static")]
    Static,
    #[token("mutable")]
    Mutable,
    #[token("stateful")]
    Stateful,
    #[token("graph")]
    Graph,
    #[token("param")]
    Param,
    #[token("config")]
    Config,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("logic")]
    Logic,
    #[token("state")]
    State,
    #[token("onTuple")]
    OnTuple,
    #[token("onPunct")]
    OnPunct,
    #[token("onProcess")]
    OnProcess,
    #[token("window")]
    Window,
    #[token("expression")]
    Expression,
    #[token("attribute")]
    Attribute,
    #[token("function")]
    Function,
    #[token("operator")]
    Operator,
    #[token("tuple")]
    Tuple,
    #[token("list")]
    List,
    #[token("set")]
    Set,
    #[token("map")]
    Map,
    #[token("enum")]
    Enum,
    #[token("optional")]
    Optional,
    #[token("as")]
    As,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r#""([^"\\\n]|\\.)*"#)]
    UnterminatedStr,

    #[regex(r"\$?[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("*=")]
    StarEqual,
    #[token("/=")]
    SlashEqual,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("::")]
    ColonColon,
    #[token("@")]
    At,
    #[token("?")]
    Question,
}

/// Strip the quotes and resolve escapes of a string literal
fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::Skip {
    let remainder = lex.remainder();
    // unterminated comments run to end of input
    let end = remainder.find("*/").map_or(remainder.len(), |at| at + 2);
    lex.bump(end);
    logos::Skip
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = quoted.get(1..quoted.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}

/// Lexical errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {}:{}", .span.line, .span.column)]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("unterminated string literal at {}:{}", .span.line, .span.column)]
    UnterminatedString { span: Span },

    #[error("invalid literal '{text}' at {}:{}", .span.line, .span.column)]
    InvalidLiteral { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidLiteral { span, .. } => *span,
        }
    }
}

/// Lexer converting source text into spanned tokens
pub struct Lexer<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// Tokenize the whole source, collecting every lexical error
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut lex = LogosToken::lexer(self.source);

        while let Some(result) = lex.next() {
            let range = lex.span();
            let span = self.span_of(range.start, range.end);
            match result {
                Ok(LogosToken::UnterminatedStr) => {
                    errors.push(LexError::UnterminatedString { span });
                }
                Ok(tok) => tokens.push((convert(tok), span)),
                Err(()) => {
                    let text = lex.slice();
                    let first = text.chars().next().unwrap_or('\0');
                    if first.is_ascii_digit() || first == '"' {
                        errors.push(LexError::InvalidLiteral {
                            text: text.to_string(),
                            span,
                        });
                    } else {
                        errors.push(LexError::UnexpectedCharacter { ch: first, span });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    /// 1-based line/column span for a byte range
    fn span_of(&self, start: usize, end: usize) -> Span {
        let line_idx = match self.line_starts.binary_search(&start) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = start - self.line_starts[line_idx] + 1;
        Span::new(start, end, line_idx as u32 + 1, column as u32)
    }
}

fn convert(tok: LogosToken) -> Token {
    match tok {
        LogosToken::LineComment | LogosToken::BlockComment | LogosToken::UnterminatedStr => {
            Token::Eof
        }
        LogosToken::Namespace => Token::Namespace,
        LogosToken::Use => Token::Use,
        LogosToken::Composite => Token::Composite,
        LogosToken::Type => Token::Type,
        LogosToken::Stream => Token::Stream,
        LogosToken::Public => Token::Public,
        LogosToken::Static => Token::Static,
        LogosToken::Mutable => Token::Mutable,
        LogosToken::Stateful => Token::Stateful,
        LogosToken::Graph => Token::Graph,
        LogosToken::Param => Token::Param,
        LogosToken::Config => Token::Config,
        LogosToken::Input => Token::Input,
        LogosToken::Output => Token::Output,
        LogosToken::Logic => Token::Logic,
        LogosToken::State => Token::State,
        LogosToken::OnTuple => Token::OnTuple,
        LogosToken::OnPunct => Token::OnPunct,
        LogosToken::OnProcess => Token::OnProcess,
        LogosToken::Window => Token::Window,
        LogosToken::Expression => Token::Expression,
        LogosToken::Attribute => Token::Attribute,
        LogosToken::Function => Token::Function,
        LogosToken::Operator => Token::Operator,
        LogosToken::Tuple => Token::Tuple,
        LogosToken::List => Token::List,
        LogosToken::Set => Token::Set,
        LogosToken::Map => Token::Map,
        LogosToken::Enum => Token::Enum,
        LogosToken::Optional => Token::Optional,
        LogosToken::As => Token::As,
        LogosToken::If => Token::If,
        LogosToken::Else => Token::Else,
        LogosToken::For => Token::For,
        LogosToken::In => Token::In,
        LogosToken::While => Token::While,
        LogosToken::Return => Token::Return,
        LogosToken::Break => Token::Break,
        LogosToken::Continue => Token::Continue,
        LogosToken::True => Token::True,
        LogosToken::False => Token::False,
        LogosToken::Float(n) => Token::FloatLiteral(n),
        LogosToken::Int(n) => Token::IntLiteral(n),
        LogosToken::Str(s) => Token::StringLiteral(s),
        LogosToken::Ident(s) => Token::Identifier(s),
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBrace => Token::LeftBrace,
        LogosToken::RightBrace => Token::RightBrace,
        LogosToken::LeftBracket => Token::LeftBracket,
        LogosToken::RightBracket => Token::RightBracket,
        LogosToken::Less => Token::Less,
        LogosToken::Greater => Token::Greater,
        LogosToken::LessEqual => Token::LessEqual,
        LogosToken::GreaterEqual => Token::GreaterEqual,
        LogosToken::EqualEqual => Token::EqualEqual,
        LogosToken::BangEqual => Token::BangEqual,
        LogosToken::Equal => Token::Equal,
        LogosToken::PlusEqual => Token::PlusEqual,
        LogosToken::MinusEqual => Token::MinusEqual,
        LogosToken::StarEqual => Token::StarEqual,
        LogosToken::SlashEqual => Token::SlashEqual,
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Star => Token::Star,
        LogosToken::Slash => Token::Slash,
        LogosToken::Percent => Token::Percent,
        LogosToken::AmpAmp => Token::AmpAmp,
        LogosToken::PipePipe => Token::PipePipe,
        LogosToken::Bang => Token::Bang,
        LogosToken::Dot => Token::Dot,
        LogosToken::Comma => Token::Comma,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Colon => Token::Colon,
        LogosToken::ColonColon => Token::ColonColon,
        LogosToken::At => Token::At,
        LogosToken::Question => Token::Question,
    }
}
