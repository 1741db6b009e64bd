//! Arena owning every scope and symbol of one compilation

use rustc_hash::FxHashMap;
use tracing::trace;

use super::scope::{Scope, ScopeId};
use super::symbols::{Location, Symbol, SymbolId, SymbolKind};
use crate::parser::ast::NodeId;

/// Scopes and symbols by index, plus the node-to-symbol side table
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    bindings: FxHashMap<NodeId, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope
    pub fn new_scope(&mut self, parent: Option<ScopeId>, holder: Option<SymbolId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(parent, holder));
        id
    }

    /// Create a symbol that is not yet in any scope
    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        location: Location,
        kind: SymbolKind,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.into(),
            location,
            scope: None,
            held: None,
            kind,
        });
        id
    }

    /// Create a symbol together with the scope it holds
    pub fn add_symbol_with_scope(
        &mut self,
        name: impl Into<String>,
        location: Location,
        kind: SymbolKind,
        parent: Option<ScopeId>,
    ) -> (SymbolId, ScopeId) {
        let sym = self.add_symbol(name, location, kind);
        let scope = self.new_scope(parent, Some(sym));
        self.symbols[sym.0 as usize].held = Some(scope);
        (sym, scope)
    }

    /// Put `sym` into `scope` under its own name
    ///
    /// On collision nothing is inserted and the earlier symbol is returned.
    pub fn insert(&mut self, scope: ScopeId, sym: SymbolId) -> Result<(), SymbolId> {
        let name = self.symbols[sym.0 as usize].name.clone();
        self.insert_as(scope, &name, sym)
    }

    /// Put `sym` into `scope` under `name`
    pub fn insert_as(&mut self, scope: ScopeId, name: &str, sym: SymbolId) -> Result<(), SymbolId> {
        self.scopes[scope.0 as usize].insert(name, sym)?;
        let symbol = &mut self.symbols[sym.0 as usize];
        if symbol.scope.is_none() {
            symbol.scope = Some(scope);
        }
        Ok(())
    }

    /// Nearest declaration of `name`, walking parents outward
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(sym) = s.get(name) {
                trace!(name, %id, %sym, "lookup hit");
                return Some(sym);
            }
            current = s.parent();
        }
        None
    }

    /// Existence check in `scope` only
    pub fn has(&self, scope: ScopeId, name: &str) -> bool {
        self.scope(scope).has(name)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn set_held(&mut self, sym: SymbolId, scope: ScopeId) {
        self.symbols[sym.0 as usize].held = Some(scope);
    }

    /// Attach `sym` to a syntax node
    pub fn bind_node(&mut self, node: NodeId, sym: SymbolId) {
        self.bindings.insert(node, sym);
    }

    /// Symbol attached to a syntax node
    pub fn node_symbol(&self, node: NodeId) -> Option<SymbolId> {
        self.bindings.get(&node).copied()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// Chain of scopes from `scope` out to the root
    pub fn chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |s| self.scope(*s).parent())
    }
}
