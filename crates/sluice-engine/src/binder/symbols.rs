//! The symbol catalog
//!
//! Every bound entity is a [`Symbol`] in the table's arena. The closed set of
//! kinds is [`SymbolKind`]; per-kind data lives in the variant payloads.
//! Symbols whose type or members depend on other symbols carry an
//! [`Expansion`] slot that the lazy expansion engine drives.

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::fmt;
use std::sync::Arc;

use super::expansion::Expansion;
use super::model::OperatorModel;
use super::scope::ScopeId;
use crate::parser::ast::{
    FormalMode, NodeId, NodeIdGen, OpActual, OpInvoke, Renumber, TypeDef, TypeExpr,
};
use crate::parser::Span;
use crate::types::TypeId;

/// Symbol identifier (index into the symbol table's arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// Source location: a file in the binder's file set plus a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: usize,
    pub span: Span,
}

impl Location {
    /// Location of symbols the binder seeds itself
    pub const INTRINSIC: Location = Location {
        file: usize::MAX,
        span: Span::new(0, 0, 0, 0),
    };

    pub const fn new(file: usize, span: Span) -> Self {
        Self { file, span }
    }

    pub fn is_intrinsic(&self) -> bool {
        self.file == usize::MAX
    }
}

/// A bound entity
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Declared name; empty for anonymous clause symbols
    pub name: String,
    pub location: Location,
    /// Scope the symbol was declared in, if any
    pub scope: Option<ScopeId>,
    /// Members reachable through this symbol, once known
    pub held: Option<ScopeId>,
    pub kind: SymbolKind,
}

/// Closed set of symbol kinds
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Namespace(NamespaceData),
    CompilationUnit(CompilationUnitData),
    CompositeDef(Box<CompositeDefData>),
    CompositeInstance(Box<CompositeInstanceData>),
    CompositeFormal(CompositeFormalData),
    CompositeInputPort(InputPortData),
    PrimitiveOperator(PrimitiveOperatorData),
    PrimitiveFormal(PrimitiveFormalData),
    OpInvoke(Box<OpInvokeData>),
    OpInvokeActual(ActualParamData),
    OpInvokeOutput(OutputClauseData),
    OpInvokeWindow(LogicClauseData),
    OnTupleLogic(LogicClauseData),
    OnPunctLogic(LogicClauseData),
    OnProcessLogic(LogicClauseData),
    ActualConfig(ActualConfigData),
    /// A config label the language knows (`placement`, `hostPool`, ...)
    FormalConfig,
    HostPool,
    Stream(StreamData),
    PortAlias(PortAliasData),
    Variable(VariableData),
    FunctionHead(FunctionData),
    FunctionFormal(FunctionFormalData),
    /// `T` in a generic function's `<any T>` list
    TypeFormal(TypeFormalData),
    /// `N` in a generic function's `[N]` list
    BoundsFormal,
    /// Attribute declared in a `tuple<...>` attribute list
    AttributeDecl(AttributeDeclData),
    /// Attribute copied out of an already computed tuple type
    AttributeFromType(TypeId),
    AttributeAccess(AttributeAccessData),
    AttributeAssign(AttributeAssignData),
    DefType(DefTypeData),
    TupleAttrib(TupleAttribData),
    TupleExtend(TupleExtendData),
    EnumType(EnumTypeData),
    EnumValue(EnumValueData),
    /// `list<..>`, `set<..>`, `map<..>` or `optional<..>` in a type expression
    ContainerType(ContainerData),
    Annotation(AnnotationData),
    AnnotationKey,
    Indirect(IndirectData),
    /// Function, window policy or helper the binder seeds itself
    Intrinsic(TypeId),
    /// Stand-in for anything that failed to bind
    ErrorDummy,
}

impl SymbolKind {
    /// Short kind label used in listings and messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            SymbolKind::Namespace(_) => "namespace",
            SymbolKind::CompilationUnit(_) => "compilation unit",
            SymbolKind::CompositeDef(_) => "composite",
            SymbolKind::CompositeInstance(_) => "composite instance",
            SymbolKind::CompositeFormal(_) => "composite parameter",
            SymbolKind::CompositeInputPort(_) => "composite input port",
            SymbolKind::PrimitiveOperator(_) => "primitive operator",
            SymbolKind::PrimitiveFormal(_) => "operator parameter",
            SymbolKind::OpInvoke(_) => "operator invocation",
            SymbolKind::OpInvokeActual(_) => "actual parameter",
            SymbolKind::OpInvokeOutput(_) => "output clause",
            SymbolKind::OpInvokeWindow(_) => "window clause",
            SymbolKind::OnTupleLogic(_) => "onTuple clause",
            SymbolKind::OnPunctLogic(_) => "onPunct clause",
            SymbolKind::OnProcessLogic(_) => "onProcess clause",
            SymbolKind::ActualConfig(_) => "config",
            SymbolKind::FormalConfig => "config label",
            SymbolKind::HostPool => "host pool",
            SymbolKind::Stream(_) => "stream",
            SymbolKind::PortAlias(_) => "port alias",
            SymbolKind::Variable(_) => "variable",
            SymbolKind::FunctionHead(_) => "function",
            SymbolKind::FunctionFormal(_) => "function parameter",
            SymbolKind::TypeFormal(_) => "type parameter",
            SymbolKind::BoundsFormal => "bounds parameter",
            SymbolKind::AttributeDecl(_) | SymbolKind::AttributeFromType(_) => "attribute",
            SymbolKind::AttributeAccess(_) => "attribute access",
            SymbolKind::AttributeAssign(_) => "attribute assignment",
            SymbolKind::DefType(_) => "type",
            SymbolKind::TupleAttrib(_) | SymbolKind::TupleExtend(_) => "tuple",
            SymbolKind::EnumType(_) => "enum",
            SymbolKind::EnumValue(_) => "enum value",
            SymbolKind::ContainerType(_) => "container type",
            SymbolKind::Annotation(_) => "annotation",
            SymbolKind::AnnotationKey => "annotation key",
            SymbolKind::Indirect(_) => "indirect",
            SymbolKind::Intrinsic(_) => "intrinsic",
            SymbolKind::ErrorDummy => "error",
        }
    }

    /// Streams and the names that stand for them inside a graph
    pub fn is_stream_like(&self) -> bool {
        matches!(
            self,
            SymbolKind::Stream(_) | SymbolKind::CompositeInputPort(_) | SymbolKind::PortAlias(_)
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SymbolKind::ErrorDummy)
    }
}

// ============================================================================
// Namespaces and compilation units
// ============================================================================

#[derive(Debug, Clone)]
pub struct NamespaceData {
    /// Dotted name; empty for the default namespace
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct CompilationUnitData {
    pub namespace: SymbolId,
    pub named_uses: Vec<NamedUse>,
    pub wildcard_uses: Vec<WildcardUse>,
}

/// `use a.b::Name;`
#[derive(Debug, Clone)]
pub struct NamedUse {
    pub name: String,
    pub namespace: String,
    pub location: Location,
}

/// `use a.b::*;`
#[derive(Debug, Clone)]
pub struct WildcardUse {
    pub namespace: String,
    pub location: Location,
}

// ============================================================================
// Composites
// ============================================================================

/// Instance part of a composite: cloned and renumbered per instance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeBody {
    pub types: Vec<TypeDef>,
    pub graph: Vec<OpInvoke>,
}

impl Renumber for CompositeBody {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.types.renumber(ids);
        self.graph.renumber(ids);
    }
}

/// Formal port of a composite definition
#[derive(Debug, Clone)]
pub struct CompositePortDecl {
    pub name: String,
    pub location: Location,
    /// Declared stream tuple, bound in the definition scope
    pub tuple: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct CompositeDefData {
    pub namespace: String,
    pub file: usize,
    pub is_public: bool,
    pub inputs: Vec<CompositePortDecl>,
    pub outputs: Vec<CompositePortDecl>,
    pub formals: Vec<SymbolId>,
    pub template: Arc<CompositeBody>,
    pub instances: Vec<SymbolId>,
}

impl CompositeDefData {
    /// A composite without ports can be a main composite
    pub fn is_main_candidate(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Actual argument recorded on an instance for one formal
#[derive(Debug, Clone, PartialEq)]
pub struct ActualArg {
    pub value: OpActual,
    /// Scope the actual was written in
    pub scope: ScopeId,
    /// Taken from the formal's default
    pub is_default: bool,
}

#[derive(Debug, Clone)]
pub struct CompositeInstanceData {
    pub definition: SymbolId,
    /// `parent.invocationName`; empty for a main instance
    pub full_name: String,
    pub parent: Option<SymbolId>,
    /// Invocation in the parent graph that created this instance
    pub invoke: Option<SymbolId>,
    /// Formal name to actual, in formal order
    pub actuals: IndexMap<String, ActualArg, FxBuildHasher>,
    /// Output port name to the caller's stream, in port order
    pub output_ports: IndexMap<String, SymbolId, FxBuildHasher>,
    pub input_ports: Vec<SymbolId>,
    /// This instance's renumbered copy of the definition body
    pub body: Arc<CompositeBody>,
    pub invokes: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct CompositeFormalData {
    pub mode: FormalMode,
    pub default: Option<OpActual>,
    pub composite: SymbolId,
}

#[derive(Debug, Clone)]
pub struct InputPortData {
    pub instance: SymbolId,
    pub index: usize,
    /// Actual streams supplied by the caller
    pub streams: Vec<SymbolId>,
    /// Caller-side port alias
    pub alias: Option<String>,
    pub ty: TypeId,
}

// ============================================================================
// Primitive operators
// ============================================================================

#[derive(Debug, Clone)]
pub struct PrimitiveOperatorData {
    pub model: Arc<OperatorModel>,
    pub full_name: String,
    /// Custom literal values, merged across literal sets
    pub enums: ScopeId,
    /// Custom output function set name to its scope
    pub output_functions: FxHashMap<String, ScopeId>,
}

#[derive(Debug, Clone)]
pub struct PrimitiveFormalData {
    pub operator: SymbolId,
    /// Index into the model's parameter list
    pub index: usize,
}

// ============================================================================
// Operator invocations
// ============================================================================

/// Where the syntax of an invocation lives
#[derive(Debug, Clone)]
pub struct InvokeSource {
    pub body: Arc<CompositeBody>,
    pub index: usize,
}

impl InvokeSource {
    pub fn node(&self) -> Option<&OpInvoke> {
        self.body.graph.get(self.index)
    }
}

#[derive(Debug, Clone)]
pub struct InvokeInput {
    pub streams: Vec<SymbolId>,
    pub alias: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct InvokeOutput {
    pub name: String,
    pub alias: Option<String>,
    pub stream: SymbolId,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct OpInvokeData {
    pub node: NodeId,
    pub source: InvokeSource,
    pub file: usize,
    /// Primitive operator or composite definition invoked
    pub target: Option<SymbolId>,
    pub inputs: Vec<InvokeInput>,
    pub outputs: Vec<InvokeOutput>,
    /// Attributes of the input streams plus custom literals
    pub expr_scope: Option<ScopeId>,
    /// State variables; child of the expression scope
    pub state_scope: Option<ScopeId>,
    /// Composite instance created by this invocation
    pub instance: Option<SymbolId>,
    pub clauses: Vec<SymbolId>,
    pub expansion: Expansion<()>,
}

impl OpInvokeData {
    /// Index of the output port whose stream name or alias is `name`
    pub fn output_port_named(&self, name: &str) -> Option<usize> {
        self.outputs
            .iter()
            .position(|o| o.name == name || o.alias.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone)]
pub struct ActualParamData {
    pub invoke: SymbolId,
    /// Matching primitive or composite formal
    pub formal: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct OutputClauseData {
    pub invoke: SymbolId,
    pub port: Option<usize>,
    /// Expression scope plus the port's custom output functions
    pub right: Option<ScopeId>,
    pub expansion: Expansion<()>,
}

/// onTuple, onPunct, onProcess and window clauses
#[derive(Debug, Clone)]
pub struct LogicClauseData {
    pub invoke: SymbolId,
    pub port: Option<usize>,
    pub expansion: Expansion<()>,
}

#[derive(Debug, Clone)]
pub struct ActualConfigData {
    pub label: String,
    pub formal: Option<SymbolId>,
    pub expansion: Expansion<()>,
}

// ============================================================================
// Streams, variables, functions
// ============================================================================

#[derive(Debug, Clone)]
pub struct StreamData {
    pub tuple: TypeExpr,
    pub full_name: String,
    pub invoke: Option<SymbolId>,
    pub port: usize,
}

#[derive(Debug, Clone)]
pub struct PortAliasData {
    pub invoke: SymbolId,
    pub port: usize,
    pub output: bool,
}

#[derive(Debug, Clone)]
pub struct VariableData {
    pub ty: TypeExpr,
    pub mutable: bool,
    pub is_static: bool,
    /// Declared in an invocation's state clause
    pub state: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub is_public: bool,
    pub return_type: TypeExpr,
    pub formals: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct FunctionFormalData {
    pub ty: TypeExpr,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct TypeFormalData {
    /// `any`, `tuple`, `ordered`, ...
    pub constraint: String,
    pub ty: TypeId,
}

// ============================================================================
// Attributes and types
// ============================================================================

#[derive(Debug, Clone)]
pub struct AttributeDeclData {
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct AttributeAccessData {
    pub base: SymbolId,
    pub attribute: SymbolId,
}

#[derive(Debug, Clone)]
pub struct AttributeAssignData {
    pub output: SymbolId,
    pub attribute: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct DefTypeData {
    pub tail: TypeExpr,
    pub is_static: bool,
    pub expansion: Expansion<(TypeId, Option<ScopeId>)>,
}

/// `tuple<int32 a, ...>`: members are declared up front, the type is lazy
#[derive(Debug, Clone, Default)]
pub struct TupleAttribData {
    pub expansion: Expansion<TypeId>,
}

/// `tuple<A, B>`: members are copied in during expansion
#[derive(Debug, Clone)]
pub struct TupleExtendData {
    pub parts: Vec<TypeExpr>,
    pub expansion: Expansion<TypeId>,
}

#[derive(Debug, Clone)]
pub struct EnumTypeData {
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct EnumValueData {
    /// Enum type symbol or primitive operator
    pub owner: SymbolId,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct ContainerData {
    pub expr: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct AnnotationData {
    pub keys: Vec<String>,
}

// ============================================================================
// Indirect references
// ============================================================================

/// One contribution to an indirect name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectOrigin {
    /// Stream, port or operator the name was reached through
    pub origin: SymbolId,
    /// Symbol the origin contributes under the name
    pub target: SymbolId,
    /// Input port of the origin, when it is a stream
    pub port: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct IndirectData {
    pub origins: Vec<IndirectOrigin>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_location() {
        assert!(Location::INTRINSIC.is_intrinsic());
        assert!(!Location::new(0, Span::new(0, 1, 1, 1)).is_intrinsic());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SymbolKind::ErrorDummy.kind_name(), "error");
        assert_eq!(SymbolKind::HostPool.kind_name(), "host pool");
        assert!(SymbolKind::ErrorDummy.is_error());
    }
}
