//! Resolution context: the current-scope stack of one binding run

use tracing::debug;

use super::scope::ScopeId;
use super::symbols::{SymbolId, SymbolKind};
use super::table::SymbolTable;
use super::Binder;

#[derive(Debug, Clone, Copy)]
struct Frame {
    scope: ScopeId,
    file: usize,
    excursion: bool,
}

/// Stack of scopes the driver is currently inside
///
/// Frames are pushed and popped strictly LIFO through [`Binder::in_scope`] and
/// [`Binder::in_excursion`]. Queries walk the parent chain of the innermost
/// scope and look at each scope's holder.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    frames: Vec<Frame>,
}

impl ResolutionContext {
    pub fn new(root: ScopeId) -> Self {
        Self {
            frames: vec![Frame {
                scope: root,
                file: 0,
                excursion: false,
            }],
        }
    }

    /// Innermost scope
    pub fn current(&self) -> ScopeId {
        self.frames.last().map(|f| f.scope).unwrap_or(ScopeId(0))
    }

    /// File the innermost frame binds
    pub fn file(&self) -> usize {
        self.frames.last().map(|f| f.file).unwrap_or(0)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of open excursions
    pub fn excursions(&self) -> usize {
        self.frames.iter().filter(|f| f.excursion).count()
    }

    fn push(&mut self, scope: ScopeId, file: usize, excursion: bool) {
        self.frames.push(Frame {
            scope,
            file,
            excursion,
        });
    }

    fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "popped the root frame");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Nearest holder on the current chain matching `pred`
    fn find_holder(
        &self,
        table: &SymbolTable,
        pred: impl Fn(&SymbolKind) -> bool,
    ) -> Option<SymbolId> {
        table
            .chain(self.current())
            .filter_map(|s| table.scope(s).holder())
            .find(|h| pred(&table.symbol(*h).kind))
    }

    pub fn current_op_invoke(&self, table: &SymbolTable) -> Option<SymbolId> {
        self.find_holder(table, |k| matches!(k, SymbolKind::OpInvoke(_)))
    }

    pub fn current_composite_instance(&self, table: &SymbolTable) -> Option<SymbolId> {
        self.find_holder(table, |k| matches!(k, SymbolKind::CompositeInstance(_)))
    }

    pub fn current_composite_def(&self, table: &SymbolTable) -> Option<SymbolId> {
        self.find_holder(table, |k| matches!(k, SymbolKind::CompositeDef(_)))
    }

    pub fn current_compilation_unit(&self, table: &SymbolTable) -> Option<SymbolId> {
        self.find_holder(table, |k| matches!(k, SymbolKind::CompilationUnit(_)))
    }

    /// Namespace of the current compilation unit
    pub fn current_namespace(&self, table: &SymbolTable) -> Option<SymbolId> {
        let unit = self.current_compilation_unit(table)?;
        match &table.symbol(unit).kind {
            SymbolKind::CompilationUnit(data) => Some(data.namespace),
            _ => None,
        }
    }
}

impl Binder {
    /// Run `f` with `scope` pushed as the current scope
    pub(crate) fn in_scope<R>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> R) -> R {
        let file = self.context.file();
        self.context.push(scope, file, false);
        let result = f(self);
        self.context.pop();
        result
    }

    /// Run `f` with an unrelated scope (and its file) made current
    pub(crate) fn in_excursion<R>(
        &mut self,
        scope: ScopeId,
        file: usize,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        debug!(%scope, file, "excursion");
        self.context.push(scope, file, true);
        let result = f(self);
        self.context.pop();
        result
    }

    pub(crate) fn current_scope(&self) -> ScopeId {
        self.context.current()
    }

    pub(crate) fn current_file(&self) -> usize {
        self.context.file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::symbols::{CompilationUnitData, Location, NamespaceData};

    #[test]
    fn test_holder_queries() {
        let mut table = SymbolTable::new();
        let root = table.new_scope(None, None);
        let (ns, _) = table.add_symbol_with_scope(
            "demo",
            Location::INTRINSIC,
            SymbolKind::Namespace(NamespaceData {
                full_name: "demo".into(),
            }),
            Some(root),
        );
        let (unit, unit_scope) = table.add_symbol_with_scope(
            "",
            Location::INTRINSIC,
            SymbolKind::CompilationUnit(CompilationUnitData {
                namespace: ns,
                named_uses: Vec::new(),
                wildcard_uses: Vec::new(),
            }),
            Some(root),
        );
        let block = table.new_scope(Some(unit_scope), None);

        let mut context = ResolutionContext::new(root);
        assert_eq!(context.current_compilation_unit(&table), None);
        context.push(block, 0, false);
        assert_eq!(context.current_compilation_unit(&table), Some(unit));
        assert_eq!(context.current_namespace(&table), Some(ns));
        assert_eq!(context.current_op_invoke(&table), None);
        context.pop();
        assert_eq!(context.current(), root);
    }

    #[test]
    fn test_scoped_push_pop() {
        let mut binder = Binder::new(crate::binder::BinderConfig::default());
        let depth = binder.context.depth();
        let scope = binder.table.new_scope(None, None);
        let seen = binder.in_scope(scope, |b| {
            b.in_excursion(scope, 3, |b| {
                (b.current_scope(), b.current_file(), b.context.excursions())
            })
        });
        assert_eq!(seen, (scope, 3, 1));
        assert_eq!(binder.context.depth(), depth);
    }
}
