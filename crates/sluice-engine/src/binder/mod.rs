//! Name and type resolution
//!
//! The binder turns parsed compilation units into a symbol table:
//! - **Declaration** (`declare`): namespaces, units and definitions, plus the
//!   skeleton of every type expression
//! - **Resolution** (`resolve`): simple and qualified names, expressions,
//!   statements and function bodies
//! - **Expansion** (`expansion`, `typing`): lazy, cycle-safe computation of
//!   types and member scopes
//! - **Invocations and composites** (`invoke`, `composite`): per-instance
//!   binding of operator graphs
//! - **Indirect references** (`indirect`): names reached through input streams
//!
//! # Example
//!
//! ```ignore
//! use sluice_engine::binder::{Binder, BinderConfig};
//!
//! let mut binder = Binder::new(BinderConfig::default());
//! binder.add_source("main.spl", "namespace demo; type T = tuple<int32 a>;");
//! binder.bind();
//! assert!(!binder.diagnostics().has_errors());
//! ```

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod expansion;
pub mod intrinsics;
pub mod model;
pub mod scope;
pub mod symbols;
pub mod table;

mod composite;
mod declare;
mod guard;
mod indirect;
mod invoke;
mod resolve;
mod typing;

pub use config::{BinderConfig, ShadowPolicy, WarningConfig};
pub use context::ResolutionContext;
pub use diagnostic::{Diagnostic, Diagnostics, ErrorCode, JsonDiagnostic, SourceFiles};
pub use error::{BindError, ModelError};
pub use expansion::{Expansion, ExpansionStats};
pub use guard::is_reserved;
pub use indirect::{GenExpr, GenExprKind};
pub use intrinsics::{IntrinsicScopes, IMPLICIT_NAMESPACES};
pub use model::{ModelRegistry, OperatorModel};
pub use scope::{Scope, ScopeId};
pub use symbols::{Location, Symbol, SymbolId, SymbolKind};
pub use table::SymbolTable;

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::parser::ast::{CompilationUnit, Definition, NodeId, NodeIdGen, OpActual};
use crate::parser::Parser;
use crate::types::{TypeContext, TypeId};
use declare::DeferredType;

/// One parsed file waiting to be bound
#[derive(Debug, Clone)]
pub(crate) struct SourceUnit {
    pub(crate) file: usize,
    pub(crate) unit: Arc<CompilationUnit>,
}

/// Binding driver and owner of everything one compilation produces
pub struct Binder {
    pub(crate) config: BinderConfig,
    pub(crate) table: SymbolTable,
    pub(crate) types: TypeContext,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) context: ResolutionContext,
    pub(crate) intrinsics: IntrinsicScopes,
    pub(crate) stats: ExpansionStats,
    pub(crate) files: SourceFiles,
    /// Fresh ids for parsing and for cloned composite bodies
    pub(crate) ids: NodeIdGen,
    pub(crate) root: ScopeId,
    units: Vec<SourceUnit>,
    /// Units already declared and resolved by earlier `bind` calls
    bound_units: usize,
    pub(crate) deferred: Vec<DeferredType>,
    /// Composite formal use site to its rewritten actual
    pub(crate) substitutions: FxHashMap<NodeId, OpActual>,
    /// Type references naming a composite formal, to the instance they were bound in
    pub(crate) formal_uses: FxHashMap<NodeId, SymbolId>,
    /// Attribute scopes built from computed tuple types
    pub(crate) type_scopes: FxHashMap<TypeId, ScopeId>,
    pub(crate) mains: Vec<SymbolId>,
    pub(crate) instances: Vec<SymbolId>,
}

impl Binder {
    /// Binder with the built-in operator toolkit
    pub fn new(config: BinderConfig) -> Self {
        Self::with_models(config, ModelRegistry::builtin())
    }

    /// Binder with a custom set of primitive operator models
    pub fn with_models(config: BinderConfig, models: ModelRegistry) -> Self {
        let mut table = SymbolTable::new();
        let mut types = TypeContext::new();
        let root = table.new_scope(None, None);
        let intrinsics = IntrinsicScopes::seed(&mut table, &mut types);
        let diagnostics = Diagnostics::new(config.warnings.clone());

        let mut binder = Binder {
            config,
            table,
            types,
            diagnostics,
            context: ResolutionContext::new(root),
            intrinsics,
            stats: ExpansionStats::default(),
            files: SourceFiles::new(),
            ids: NodeIdGen::default(),
            root,
            units: Vec::new(),
            bound_units: 0,
            deferred: Vec::new(),
            substitutions: FxHashMap::default(),
            formal_uses: FxHashMap::default(),
            type_scopes: FxHashMap::default(),
            mains: Vec::new(),
            instances: Vec::new(),
        };
        binder.namespace_symbol("");
        binder.seed_namespace_functions();
        binder.seed_operators(&models);
        debug!(operators = models.len(), "binder ready");
        binder
    }

    /// Parse a source file and queue it for binding
    ///
    /// Returns the file id, or `None` when the file did not parse; lexical
    /// and syntax errors are recorded as diagnostics.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Option<usize> {
        let source = source.into();
        let file = self.files.add(name.into(), source.clone());

        let parser = match Parser::new(&source) {
            Ok(parser) => parser,
            Err(errors) => {
                for error in errors {
                    let location = Location::new(file, error.span());
                    self.diagnostics.push(
                        Diagnostic::error(error.to_string())
                            .with_code(ErrorCode("E1001"))
                            .with_primary_label(location, "invalid token"),
                    );
                }
                return None;
            }
        };

        let ids = std::mem::take(&mut self.ids);
        let (result, ids) = parser.with_node_ids(ids).parse_with_ids();
        self.ids = ids;

        match result {
            Ok(unit) => {
                self.units.push(SourceUnit {
                    file,
                    unit: Arc::new(unit),
                });
                Some(file)
            }
            Err(errors) => {
                for error in errors {
                    let location = Location::new(file, error.span);
                    self.diagnostics.push(
                        Diagnostic::error(error.message.clone())
                            .with_code(ErrorCode("E1002"))
                            .with_primary_label(location, "syntax error"),
                    );
                }
                None
            }
        }
    }

    /// Bind every queued file
    ///
    /// Declares all definitions first, so the order of files and of
    /// definitions within a file does not matter; then resolves bodies and
    /// instantiates the main composites.
    #[instrument(skip(self), fields(files = self.units.len() - self.bound_units))]
    pub fn bind(&mut self) {
        let pending: Vec<SourceUnit> = self.units[self.bound_units..].to_vec();
        self.bound_units = self.units.len();

        for unit in &pending {
            self.declare_unit(unit);
        }
        self.flush_deferred();
        for unit in &pending {
            self.resolve_unit(unit);
        }
        self.instantiate_mains(&pending);

        info!(
            symbols = self.table.symbol_count(),
            errors = self.diagnostics.error_count(),
            warnings = self.diagnostics.warning_count(),
            "binding finished"
        );
    }

    fn instantiate_mains(&mut self, units: &[SourceUnit]) {
        if let Some(name) = self.config.main_composite.clone() {
            if !self.mains.is_empty() {
                return;
            }
            match self.lookup_qualified(&name) {
                Some(def) if matches!(self.table.symbol(def).kind, SymbolKind::CompositeDef(_)) => {
                    if let Some(main) = self.instantiate(def, None) {
                        self.mains.push(main);
                    }
                }
                _ => self.report(BindError::UnknownMainComposite { name }),
            }
            return;
        }

        let mut candidates = Vec::new();
        for unit in units {
            for def in &unit.unit.definitions {
                let Definition::Composite(cd) = def else {
                    continue;
                };
                let Some(sym) = self.table.node_symbol(cd.id) else {
                    continue;
                };
                if let SymbolKind::CompositeDef(data) = &self.table.symbol(sym).kind {
                    if data.is_main_candidate() {
                        candidates.push(sym);
                    }
                }
            }
        }
        for def in candidates {
            if let Some(main) = self.instantiate(def, None) {
                self.mains.push(main);
            }
        }
    }

    // ========================================================================
    // Results
    // ========================================================================

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn types(&self) -> &TypeContext {
        &self.types
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn stats(&self) -> &ExpansionStats {
        &self.stats
    }

    pub fn files(&self) -> &SourceFiles {
        &self.files
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root
    }

    /// Instances of the main composites, in instantiation order
    pub fn main_instances(&self) -> &[SymbolId] {
        &self.mains
    }

    /// Every composite instance, nested ones included
    pub fn instances(&self) -> &[SymbolId] {
        &self.instances
    }

    /// Member scope of a namespace
    pub fn namespace_scope(&self, name: &str) -> Option<ScopeId> {
        let ns = self.table.scope(self.root).get(name)?;
        self.table.symbol(ns).held
    }

    /// Look up `ns::Name`, or `Name` in the default namespace
    pub fn lookup_qualified(&self, path: &str) -> Option<SymbolId> {
        let (namespace, name) = path.rsplit_once("::").unwrap_or(("", path));
        let scope = self.namespace_scope(namespace)?;
        self.table.scope(scope).get(name)
    }

    /// Symbol bound to a syntax node
    pub fn symbol_at(&self, node: NodeId) -> Option<SymbolId> {
        self.table.node_symbol(node)
    }

    /// Rewritten actual recorded for a composite formal use
    pub fn substitution(&self, node: NodeId) -> Option<&OpActual> {
        self.substitutions.get(&node)
    }

    pub fn display_type(&self, ty: TypeId) -> String {
        self.types.display(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Sources ──

    #[test]
    fn test_add_source_reports_syntax_errors() {
        let mut binder = Binder::new(BinderConfig::default());
        assert!(binder.add_source("bad.spl", "type = ;").is_none());
        assert!(binder.diagnostics().has_errors());
        assert!(binder.diagnostics().iter().any(|d| d.code() == Some("E1002")));
    }

    #[test]
    fn test_lookup_qualified_default_namespace() {
        let mut binder = Binder::new(BinderConfig::default());
        binder.add_source("a.spl", "type T = int32;").unwrap();
        binder.bind();
        assert!(binder.lookup_qualified("T").is_some());
        assert!(binder.lookup_qualified("::T").is_some());
        assert!(binder.lookup_qualified("nowhere::T").is_none());
    }

    #[test]
    fn test_bind_is_incremental() {
        let mut binder = Binder::new(BinderConfig::default());
        binder.add_source("a.spl", "namespace a; type T = int32;").unwrap();
        binder.bind();
        binder
            .add_source("b.spl", "namespace b; use a::T; type U = T;")
            .unwrap();
        binder.bind();
        assert!(!binder.diagnostics().has_errors());
        let u = binder.lookup_qualified("b::U").unwrap();
        let ty = binder.type_of(u);
        assert_eq!(binder.display_type(ty), "int32");
    }

    // ── Mains ──

    #[test]
    fn test_unknown_main_composite() {
        let config = BinderConfig {
            main_composite: Some("demo::Missing".into()),
            ..BinderConfig::default()
        };
        let mut binder = Binder::new(config);
        binder.add_source("a.spl", "namespace demo; composite Main { }").unwrap();
        binder.bind();
        assert_eq!(binder.diagnostics().with_code("E2029").count(), 1);
        assert!(binder.main_instances().is_empty());
    }

    #[test]
    fn test_portless_composites_are_mains() {
        let mut binder = Binder::new(BinderConfig::default());
        binder
            .add_source(
                "a.spl",
                "namespace demo; composite Main { } composite Helper(output Out) { }",
            )
            .unwrap();
        binder.bind();
        assert_eq!(binder.main_instances().len(), 1);
    }
}
