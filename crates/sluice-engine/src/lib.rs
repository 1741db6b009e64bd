//! Sluice Language Engine
//!
//! Front end for the Sluice stream-processing language:
//! - **Parser**: lexer and recursive-descent parser (`parser` module)
//! - **Types**: interned semantic types (`types` module)
//! - **Binder**: scopes, symbols, name and type resolution, composite
//!   instantiation (`binder` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_engine::{Binder, BinderConfig};
//!
//! let source = r#"
//!     namespace demo;
//!     type T = tuple<int32 a>;
//!     composite Main {
//!         graph
//!             stream<T> Src = Beacon() { }
//!             stream<T> Out = Functor(Src) { param filter: a > 0; }
//!     }
//! "#;
//!
//! let mut binder = Binder::new(BinderConfig::default());
//! binder.add_source("main.spl", source);
//! binder.bind();
//! assert!(!binder.diagnostics().has_errors());
//! ```

#![warn(rust_2018_idioms)]
#![allow(clippy::large_enum_variant)]

// ============================================================================
// Core Modules
// ============================================================================

/// Parser module: lexer, tokens, AST and parser
pub mod parser;

/// Semantic types and the type factory
pub mod types;

/// Binder module: symbol table, resolution and instantiation
pub mod binder;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{ast, LexError, Lexer, ParseError, Parser, Span, Token};

pub use types::{PrimitiveType, Type, TypeContext, TypeId};

pub use binder::{
    BindError, Binder, BinderConfig, Diagnostic, Diagnostics, ErrorCode, GenExpr, GenExprKind,
    Location, ModelRegistry, OperatorModel, ScopeId, ShadowPolicy, Symbol, SymbolId, SymbolKind,
    SymbolTable, WarningConfig,
};
