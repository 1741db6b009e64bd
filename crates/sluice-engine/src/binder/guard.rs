//! Diagnostics guard: duplicate detection, identifier rules, error reporting

use codespan_reporting::diagnostic::Severity;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::diagnostic::Diagnostic;
use super::error::BindError;
use super::scope::ScopeId;
use super::symbols::{Location, SymbolId, SymbolKind};
use super::Binder;

/// Names the generated code reserves; they cannot name attributes
const RESERVED: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bitand", "bitor", "bool", "case", "catch",
    "char", "class", "compl", "const", "constexpr", "const_cast", "default", "delete", "do",
    "double", "dynamic_cast", "explicit", "export", "extern", "float", "friend", "goto", "inline",
    "int", "long", "namespace", "new", "noexcept", "not", "nullptr", "operator", "or", "private",
    "protected", "register", "reinterpret_cast", "short", "signed", "sizeof", "static_assert",
    "static_cast", "struct", "switch", "template", "this", "throw", "try", "typedef", "typeid",
    "typename", "union", "unsigned", "virtual", "volatile", "wchar_t", "xor",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Label domains of one operator invocation's clauses
#[derive(Debug, Default)]
pub(crate) struct ClauseLabels {
    config: FxHashMap<String, Location>,
    ports: FxHashMap<(&'static str, usize), Location>,
    generic: FxHashMap<String, Location>,
}

impl ClauseLabels {
    /// First location a config label was used at, if any
    pub(crate) fn config(&mut self, label: &str, location: Location) -> Option<Location> {
        claim(&mut self.config, label.to_string(), location)
    }

    /// `branch` is the clause kind; ports collide by index
    pub(crate) fn port(
        &mut self,
        branch: &'static str,
        port: usize,
        location: Location,
    ) -> Option<Location> {
        claim(&mut self.ports, (branch, port), location)
    }

    pub(crate) fn generic(&mut self, label: &str, location: Location) -> Option<Location> {
        claim(&mut self.generic, label.to_string(), location)
    }
}

fn claim<K: std::hash::Hash + Eq>(
    map: &mut FxHashMap<K, Location>,
    key: K,
    location: Location,
) -> Option<Location> {
    match map.get(&key) {
        Some(previous) => Some(*previous),
        None => {
            map.insert(key, location);
            None
        }
    }
}

impl Binder {
    /// Report an error
    pub(crate) fn report(&mut self, error: BindError) {
        debug!(code = error.code(), %error, "bind error");
        self.diagnostics
            .push(Diagnostic::from_bind_error(&error, Severity::Error));
    }

    pub(crate) fn report_warning(&mut self, error: BindError) {
        self.diagnostics
            .push(Diagnostic::from_bind_error(&error, Severity::Warning));
    }

    pub(crate) fn location(&self, span: crate::parser::Span) -> Location {
        Location::new(self.current_file(), span)
    }

    /// Insert `sym` into `scope`, reporting a duplicate on collision
    ///
    /// The symbol is still created and bound by the caller; only the first
    /// declaration is reachable by lookup.
    pub(crate) fn declare(&mut self, scope: ScopeId, sym: SymbolId) -> bool {
        match self.table.insert(scope, sym) {
            Ok(()) => true,
            Err(previous) => {
                let symbol = self.table.symbol(sym);
                let error = BindError::DuplicateDeclaration {
                    name: symbol.name.clone(),
                    location: symbol.location,
                    previous: self.table.symbol(previous).location,
                };
                self.report(error);
                false
            }
        }
    }

    /// Ordinary declared names must not start with `$`
    pub(crate) fn check_plain_name(&mut self, name: &str, location: Location) -> bool {
        if name.starts_with('$') {
            self.report(BindError::LeadingDollar {
                name: name.to_string(),
                location,
            });
            return false;
        }
        true
    }

    /// Composite formals must start with `$`
    pub(crate) fn check_formal_name(&mut self, name: &str, location: Location) -> bool {
        if !name.starts_with('$') {
            self.report(BindError::LeadingDollarMissing {
                name: name.to_string(),
                location,
            });
            return false;
        }
        true
    }

    /// Attribute names: plain and not reserved
    pub(crate) fn check_attribute_name(&mut self, name: &str, location: Location) -> bool {
        if !self.check_plain_name(name, location) {
            return false;
        }
        if is_reserved(name) {
            self.report(BindError::ReservedIdentifier {
                name: name.to_string(),
                location,
            });
            return false;
        }
        true
    }

    /// Duplicate clause: an error, or a warning when only checking syntax
    pub(crate) fn report_duplicate_clause(
        &mut self,
        label: &str,
        location: Location,
        previous: Location,
    ) {
        let error = BindError::DuplicateClause {
            label: label.to_string(),
            location,
            previous,
        };
        if self.config.syntax_only {
            self.report_warning(error);
        } else {
            self.report(error);
        }
    }

    /// Placeholder for a name that failed to bind
    pub(crate) fn error_dummy(&mut self, name: &str, location: Location) -> SymbolId {
        self.table
            .add_symbol(name, location, SymbolKind::ErrorDummy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::symbols::SymbolKind;
    use crate::binder::BinderConfig;
    use crate::parser::Span;

    fn loc(start: usize) -> Location {
        Location::new(0, Span::new(start, start + 1, 1, start as u32 + 1))
    }

    // ── Duplicates ──

    #[test]
    fn test_duplicate_reports_both_locations() {
        let mut binder = Binder::new(BinderConfig::default());
        let scope = binder.table.new_scope(None, None);
        let first = binder.table.add_symbol("x", loc(1), SymbolKind::HostPool);
        let second = binder.table.add_symbol("x", loc(9), SymbolKind::HostPool);
        assert!(binder.declare(scope, first));
        assert!(!binder.declare(scope, second));

        let diags: Vec<_> = binder.diagnostics.with_code("E2001").collect();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].secondary_label_count(), 1);
        assert_eq!(binder.table.lookup(scope, "x"), Some(first));
    }

    #[test]
    fn test_distinct_domains_do_not_collide() {
        let mut binder = Binder::new(BinderConfig::default());
        let d1 = binder.table.new_scope(None, None);
        let d2 = binder.table.new_scope(None, None);
        let a = binder.table.add_symbol("x", loc(1), SymbolKind::HostPool);
        let b = binder.table.add_symbol("x", loc(5), SymbolKind::HostPool);
        assert!(binder.declare(d1, a));
        assert!(binder.declare(d2, b));
        assert!(binder.diagnostics.is_empty());
    }

    #[test]
    fn test_clause_label_domains() {
        let mut labels = ClauseLabels::default();
        assert_eq!(labels.port("onTuple", 0, loc(1)), None);
        assert_eq!(labels.port("onTuple", 0, loc(4)), Some(loc(1)));
        assert_eq!(labels.port("onPunct", 0, loc(6)), None);
        assert_eq!(labels.config("placement", loc(8)), None);
        assert_eq!(labels.generic("placement", loc(9)), None);
    }

    // ── Identifier rules ──

    #[test]
    fn test_identifier_rules() {
        let mut binder = Binder::new(BinderConfig::default());
        assert!(!binder.check_plain_name("$x", loc(0)));
        assert!(binder.check_formal_name("$x", loc(0)));
        assert!(!binder.check_formal_name("x", loc(0)));
        assert!(!binder.check_attribute_name("class", loc(0)));
        assert!(binder.check_attribute_name("total", loc(0)));

        let codes: Vec<_> = binder.diagnostics.iter().filter_map(|d| d.code()).collect();
        assert_eq!(codes, vec!["E2002", "E2003", "E2004"]);
    }

    #[test]
    fn test_syntax_only_downgrades_duplicate_clause() {
        let config = BinderConfig {
            syntax_only: true,
            ..BinderConfig::default()
        };
        let mut binder = Binder::new(config);
        binder.report_duplicate_clause("In", loc(5), loc(1));
        assert_eq!(binder.diagnostics.error_count(), 0);
        assert_eq!(binder.diagnostics.warning_count(), 1);
    }
}
