//! Syntax tree for Sluice source files
//!
//! Every node the binder attaches a symbol to carries a [`NodeId`]. Ids are unique
//! within one compilation; clones of composite bodies are renumbered with fresh ids
//! (see [`renumber`]).

pub mod renumber;

use crate::parser::token::Span;
use crate::types::PrimitiveType;
use std::fmt;

pub use renumber::Renumber;

/// Identity of a syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of fresh node ids
#[derive(Debug, Clone, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn starting_at(first: NodeId) -> Self {
        Self { next: first.0 }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to `fresh` returns
    pub fn peek(&self) -> NodeId {
        NodeId(self.next)
    }
}

// ============================================================================
// Names
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

/// Dotted namespace name: `com.acme.util`
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub parts: Vec<Ident>,
    pub span: Span,
}

impl QualifiedName {
    pub fn dotted(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Possibly namespace-qualified name: `T` or `com.acme::T`
#[derive(Debug, Clone, PartialEq)]
pub struct PathName {
    pub namespace: Option<QualifiedName>,
    pub name: Ident,
    pub span: Span,
}

impl PathName {
    /// `ns::name`, or just `name` when unqualified
    pub fn display(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}::{}", ns.dotted(), self.name.name),
            None => self.name.name.clone(),
        }
    }
}

// ============================================================================
// Compilation units
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub id: NodeId,
    pub namespace: Option<NamespaceDecl>,
    pub uses: Vec<UseDirective>,
    pub definitions: Vec<Definition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub name: QualifiedName,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDirective {
    pub id: NodeId,
    pub namespace: QualifiedName,
    pub target: UseTarget,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UseTarget {
    /// `use ns::Name;`
    Name(Ident),
    /// `use ns::*;`
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Type(TypeDef),
    Composite(CompositeDef),
    Function(FunctionDef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Static,
    Mutable,
    Stateful,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modifier::Public => "public",
            Modifier::Static => "static",
            Modifier::Mutable => "mutable",
            Modifier::Stateful => "stateful",
        })
    }
}

pub fn has_modifier(modifiers: &[Modifier], m: Modifier) -> bool {
    modifiers.contains(&m)
}

/// `type T = tail;`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub id: NodeId,
    pub modifiers: Vec<Modifier>,
    pub name: Ident,
    pub tail: TypeExpr,
    pub span: Span,
}

impl TypeDef {
    pub fn is_static(&self) -> bool {
        has_modifier(&self.modifiers, Modifier::Static)
    }
}

// ============================================================================
// Type expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Primitive(PrimitiveType),
    /// `rstring[n]`
    BoundedString(u32),
    List {
        element: Box<TypeExpr>,
        bound: Option<u32>,
    },
    Set {
        element: Box<TypeExpr>,
        bound: Option<u32>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        bound: Option<u32>,
    },
    Optional(Box<TypeExpr>),
    Enum(Vec<Ident>),
    Tuple(TupleBody),
    /// Reference to a user type, type formal or composite type formal
    Named(PathName),
}

/// Body of `tuple<...>` or `stream<...>`
#[derive(Debug, Clone, PartialEq)]
pub enum TupleBody {
    /// `tuple<int32 a, rstring b>`
    Attributes(Vec<AttributeDecl>),
    /// `tuple<A, B>`
    Extends(Vec<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub id: NodeId,
    pub ty: TypeExpr,
    pub name: Ident,
    pub span: Span,
}

/// `stream<...>`: a tuple type expression attached to a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamType {
    pub tuple: TypeExpr,
    pub span: Span,
}

// ============================================================================
// Composites
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDef {
    pub id: NodeId,
    pub modifiers: Vec<Modifier>,
    pub name: Ident,
    pub inputs: Vec<CompositePort>,
    pub outputs: Vec<CompositePort>,
    pub formals: Vec<CompositeFormal>,
    pub types: Vec<TypeDef>,
    pub graph: Vec<OpInvoke>,
    pub configs: Vec<ConfigItem>,
    pub span: Span,
}

impl CompositeDef {
    pub fn is_public(&self) -> bool {
        has_modifier(&self.modifiers, Modifier::Public)
    }
}

/// Formal input or output port of a composite
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePort {
    pub id: NodeId,
    pub ty: Option<StreamType>,
    pub name: Ident,
    pub span: Span,
}

/// `expression<int32> $n : 5;`
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFormal {
    pub id: NodeId,
    pub mode: FormalMode,
    pub name: Ident,
    pub default: Option<OpActual>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormalMode {
    Expression(Option<TypeExpr>),
    Attribute,
    Function,
    Operator,
    Type,
}

impl FormalMode {
    pub fn name(&self) -> &'static str {
        match self {
            FormalMode::Expression(_) => "expression",
            FormalMode::Attribute => "attribute",
            FormalMode::Function => "function",
            FormalMode::Operator => "operator",
            FormalMode::Type => "type",
        }
    }
}

/// Actual argument of a composite formal or operator parameter
#[derive(Debug, Clone, PartialEq)]
pub enum OpActual {
    Exprs(Vec<Expr>),
    Type(TypeExpr),
}

// ============================================================================
// Operator invocations
// ============================================================================

/// `stream<T> Out = Op(In) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct OpInvoke {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub outputs: Vec<OpOutput>,
    pub alias: Option<Ident>,
    pub operator: PathName,
    pub inputs: Vec<PortInputs>,
    pub body: OpInvokeBody,
    pub span: Span,
}

impl OpInvoke {
    /// Alias if present, else the first output stream name
    pub fn invocation_name(&self) -> Option<&str> {
        self.alias
            .as_ref()
            .or_else(|| self.outputs.first().map(|o| &o.name))
            .map(|i| i.name.as_str())
    }
}

/// One output port: `stream<T> Name as Alias`
#[derive(Debug, Clone, PartialEq)]
pub struct OpOutput {
    pub id: NodeId,
    pub ty: StreamType,
    pub name: Ident,
    pub alias: Option<Ident>,
    pub span: Span,
}

/// One input port: `A, B as In`
#[derive(Debug, Clone, PartialEq)]
pub struct PortInputs {
    pub id: NodeId,
    pub streams: Vec<Ident>,
    pub alias: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpInvokeBody {
    pub logic: Vec<LogicItem>,
    pub windows: Vec<WindowItem>,
    pub params: Vec<ActualParam>,
    pub outputs: Vec<OutputItem>,
    pub configs: Vec<ConfigItem>,
}

impl OpInvokeBody {
    pub fn is_empty(&self) -> bool {
        self.logic.is_empty()
            && self.windows.is_empty()
            && self.params.is_empty()
            && self.outputs.is_empty()
            && self.configs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicItem {
    State(StateItem),
    OnTuple(PortLogic),
    OnPunct(PortLogic),
    OnProcess(ProcessLogic),
}

/// `state: { mutable int32 n = 0; }`
#[derive(Debug, Clone, PartialEq)]
pub struct StateItem {
    pub id: NodeId,
    pub decls: Vec<LocalDecl>,
    pub span: Span,
}

/// `onTuple In: stmt` / `onPunct In: stmt`
#[derive(Debug, Clone, PartialEq)]
pub struct PortLogic {
    pub id: NodeId,
    pub port: Ident,
    pub body: Stmt,
    pub span: Span,
}

/// `onProcess: stmt`
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessLogic {
    pub id: NodeId,
    pub body: Stmt,
    pub span: Span,
}

/// `In: sliding, count(10);`
#[derive(Debug, Clone, PartialEq)]
pub struct WindowItem {
    pub id: NodeId,
    pub port: Ident,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

/// `name: actual;`
#[derive(Debug, Clone, PartialEq)]
pub struct ActualParam {
    pub id: NodeId,
    pub name: Ident,
    pub value: OpActual,
    pub span: Span,
}

/// `Out: a = expr, b = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct OutputItem {
    pub id: NodeId,
    pub port: Ident,
    pub assignments: Vec<OutputAssign>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputAssign {
    pub id: NodeId,
    pub attribute: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `label: exprs;` in a config clause
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigItem {
    pub id: NodeId,
    pub label: Ident,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

/// `@name(key = value, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: NodeId,
    pub name: Ident,
    pub args: Vec<AnnotationArg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationArg {
    pub key: Ident,
    pub value: Expr,
}

// ============================================================================
// Functions and statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub id: NodeId,
    pub modifiers: Vec<Modifier>,
    /// `<any T, tuple U>`
    pub type_formals: Vec<TypeFormalDecl>,
    /// `[N, M]`
    pub bounds_formals: Vec<Ident>,
    pub return_type: TypeExpr,
    pub name: Ident,
    pub formals: Vec<FunctionFormal>,
    pub body: Block,
    pub span: Span,
}

/// One `constraint Name` entry of a generic function's type list
#[derive(Debug, Clone, PartialEq)]
pub struct TypeFormalDecl {
    pub constraint: String,
    pub name: Ident,
    pub span: Span,
}

impl FunctionDef {
    pub fn is_generic(&self) -> bool {
        !self.type_formals.is_empty() || !self.bounds_formals.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFormal {
    pub id: NodeId,
    pub mutable: bool,
    pub ty: TypeExpr,
    pub name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Block),
    Local(LocalDecl),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    For(ForStmt),
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
}

/// `mutable int32 a = 1, b;`
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub modifiers: Vec<Modifier>,
    pub ty: TypeExpr,
    pub items: Vec<LocalItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalItem {
    pub id: NodeId,
    pub name: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

/// `for (T x in expr) stmt`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub id: NodeId,
    pub ty: TypeExpr,
    pub name: Ident,
    pub iterable: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    /// `ns::name`
    Qualified(PathName),
    Literal(Literal),
    /// `base.name`
    Attribute {
        base: Box<Expr>,
        name: Ident,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    List(Vec<Expr>),
    /// `{a = 1, b = x}`
    TupleLiteral(Vec<TupleField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleField {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl Expr {
    /// The identifier, if this expression is a bare name
    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}
