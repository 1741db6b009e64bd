//! Lazy, cycle-safe expansion
//!
//! A symbol whose type or members depend on other symbols goes through
//! `NotStarted -> InProgress -> Done | Failed`. Re-entering an expansion that
//! is still in progress is a circular definition: the symbol fails for good
//! and callers get the fallback value.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::error::BindError;
use super::scope::ScopeId;
use super::symbols::{SymbolId, SymbolKind};
use super::Binder;
use crate::types::TypeId;

/// Expansion state of one symbol
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expansion<T> {
    #[default]
    NotStarted,
    InProgress,
    Done(T),
    Failed,
}

impl<T> Expansion<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Expansion::Done(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Expansion::Failed)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Expansion::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// How often each symbol's expansion work actually ran
#[derive(Debug, Clone, Default)]
pub struct ExpansionStats {
    runs: FxHashMap<SymbolId, u32>,
    total: u64,
}

impl ExpansionStats {
    pub(crate) fn record(&mut self, sym: SymbolId) {
        *self.runs.entry(sym).or_insert(0) += 1;
        self.total += 1;
    }

    /// Number of times `sym` was expanded
    pub fn runs(&self, sym: SymbolId) -> u32 {
        self.runs.get(&sym).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Slot accessor for the expansion state inside a symbol kind
pub(crate) type Slot<T> = fn(&mut SymbolKind) -> Option<&mut Expansion<T>>;

pub(crate) fn unit_slot(kind: &mut SymbolKind) -> Option<&mut Expansion<()>> {
    match kind {
        SymbolKind::OpInvoke(data) => Some(&mut data.expansion),
        SymbolKind::OpInvokeOutput(data) => Some(&mut data.expansion),
        SymbolKind::OpInvokeWindow(data)
        | SymbolKind::OnTupleLogic(data)
        | SymbolKind::OnPunctLogic(data)
        | SymbolKind::OnProcessLogic(data) => Some(&mut data.expansion),
        SymbolKind::ActualConfig(data) => Some(&mut data.expansion),
        _ => None,
    }
}

pub(crate) fn tuple_slot(kind: &mut SymbolKind) -> Option<&mut Expansion<TypeId>> {
    match kind {
        SymbolKind::TupleAttrib(data) => Some(&mut data.expansion),
        SymbolKind::TupleExtend(data) => Some(&mut data.expansion),
        _ => None,
    }
}

pub(crate) fn def_type_slot(
    kind: &mut SymbolKind,
) -> Option<&mut Expansion<(TypeId, Option<ScopeId>)>> {
    match kind {
        SymbolKind::DefType(data) => Some(&mut data.expansion),
        _ => None,
    }
}

enum Entry<T> {
    Ready(T),
    Fallback,
    Cycle,
    Start,
}

impl Binder {
    /// Run `work` once for `sym` under the expansion protocol
    ///
    /// Returns the memoized value when done, `failed` when the symbol failed
    /// or has no expansion slot, and reports a circular definition when the
    /// expansion is re-entered.
    pub(crate) fn run_expansion<T: Clone>(
        &mut self,
        sym: SymbolId,
        slot: Slot<T>,
        failed: T,
        work: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let entry = match slot(&mut self.table.symbol_mut(sym).kind) {
            None => Entry::Fallback,
            Some(state) => match state {
                Expansion::Done(value) => Entry::Ready(value.clone()),
                Expansion::Failed => Entry::Fallback,
                Expansion::InProgress => {
                    *state = Expansion::Failed;
                    Entry::Cycle
                }
                Expansion::NotStarted => {
                    *state = Expansion::InProgress;
                    Entry::Start
                }
            },
        };

        match entry {
            Entry::Ready(value) => return value,
            Entry::Fallback => return failed,
            Entry::Cycle => {
                let symbol = self.table.symbol(sym);
                debug!(name = %symbol.name, %sym, "expansion re-entered");
                let error = BindError::CircularDefinition {
                    name: symbol.name.clone(),
                    location: symbol.location,
                };
                self.report(error);
                return failed;
            }
            Entry::Start => {}
        }

        self.stats.record(sym);
        debug!(name = %self.table.symbol(sym).name, %sym, "expanding");
        let value = work(self);

        match slot(&mut self.table.symbol_mut(sym).kind) {
            Some(state) if matches!(state, Expansion::InProgress) => {
                *state = Expansion::Done(value.clone());
                value
            }
            // a cycle through this symbol failed it while the work ran
            _ => failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::symbols::LogicClauseData;
    use crate::binder::{BinderConfig, Location};

    fn clause(binder: &mut Binder, name: &str) -> SymbolId {
        binder.table.add_symbol(
            name,
            Location::INTRINSIC,
            SymbolKind::OnProcessLogic(LogicClauseData {
                invoke: SymbolId(0),
                port: None,
                expansion: Expansion::NotStarted,
            }),
        )
    }

    // ── Protocol ──

    #[test]
    fn test_runs_once() {
        let mut binder = Binder::new(BinderConfig::default());
        let sym = clause(&mut binder, "c");
        binder.run_expansion(sym, unit_slot, (), |_| ());
        assert_eq!(binder.stats.runs(sym), 1);
        binder.run_expansion(sym, unit_slot, (), |_| ());
        assert_eq!(binder.stats.runs(sym), 1);
    }

    #[test]
    fn test_reentry_fails_once() {
        let mut binder = Binder::new(BinderConfig::default());
        let sym = clause(&mut binder, "loop");
        let before = binder.diagnostics.error_count();
        binder.run_expansion(sym, unit_slot, (), |b| {
            b.run_expansion(sym, unit_slot, (), |_| ());
        });
        assert_eq!(binder.diagnostics.error_count(), before + 1);
        let SymbolKind::OnProcessLogic(data) = &binder.table.symbol(sym).kind else {
            panic!("expected clause");
        };
        assert!(data.expansion.is_failed());

        binder.run_expansion(sym, unit_slot, (), |_| ());
        assert_eq!(binder.diagnostics.error_count(), before + 1);
        assert_eq!(binder.stats.runs(sym), 1);
    }

    #[test]
    fn test_no_slot_is_fallback() {
        let mut binder = Binder::new(BinderConfig::default());
        let sym = binder
            .table
            .add_symbol("x", Location::INTRINSIC, SymbolKind::ErrorDummy);
        let unknown = binder.types.unknown_type();
        let value = binder.run_expansion(sym, tuple_slot, unknown, |_| panic!("must not run"));
        assert!(binder.types.is_unknown(value));
        assert_eq!(binder.stats.runs(sym), 0);
    }
}
