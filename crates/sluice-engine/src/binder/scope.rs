//! Scopes: insertion-ordered name tables with an optional parent and holder

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::fmt;

use super::symbols::SymbolId;

/// Scope identifier (index into the symbol table's scope arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// One name table in the scope graph
///
/// Lookup through [`SymbolTable::lookup`](super::SymbolTable::lookup) falls
/// through to `parent` when a name is missing here. The holder is the symbol
/// whose members this scope lists; it is fixed at construction.
#[derive(Debug, Clone)]
pub struct Scope {
    parent: Option<ScopeId>,
    holder: Option<SymbolId>,
    entries: IndexMap<String, SymbolId, FxBuildHasher>,
}

impl Scope {
    pub(crate) fn new(parent: Option<ScopeId>, holder: Option<SymbolId>) -> Self {
        Self {
            parent,
            holder,
            entries: IndexMap::default(),
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn holder(&self) -> Option<SymbolId> {
        self.holder
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbol declared under `name` in this scope only
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.entries.get(name).copied()
    }

    /// Entry at position `index`, in declaration order
    pub fn get_index(&self, index: usize) -> Option<(&str, SymbolId)> {
        self.entries
            .get_index(index)
            .map(|(name, sym)| (name.as_str(), *sym))
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.entries.iter().map(|(name, sym)| (name.as_str(), *sym))
    }

    /// Insert unless taken; returns the existing symbol on collision
    pub(crate) fn insert(&mut self, name: &str, sym: SymbolId) -> Result<(), SymbolId> {
        if let Some(existing) = self.entries.get(name) {
            return Err(*existing);
        }
        self.entries.insert(name.to_string(), sym);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let mut scope = Scope::new(None, None);
        scope.insert("b", SymbolId(1)).unwrap();
        scope.insert("a", SymbolId(2)).unwrap();
        scope.insert("c", SymbolId(3)).unwrap();

        let names: Vec<&str> = scope.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(scope.get_index(1), Some(("a", SymbolId(2))));
        assert_eq!(scope.len(), 3);
    }

    #[test]
    fn test_first_insert_stays() {
        let mut scope = Scope::new(None, None);
        scope.insert("x", SymbolId(1)).unwrap();
        assert_eq!(scope.insert("x", SymbolId(2)), Err(SymbolId(1)));
        assert_eq!(scope.get("x"), Some(SymbolId(1)));
        assert!(!scope.has("y"));
    }
}
