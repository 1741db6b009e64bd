//! Lexer and parser for the Sluice stream-processing language.
//!
//! # Example
//!
//! ```ignore
//! use sluice_engine::parser::Parser;
//!
//! let unit = Parser::new("namespace demo; type T = tuple<int32 a>;")?.parse()?;
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use token::{Span, Token};
