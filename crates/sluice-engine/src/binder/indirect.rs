//! Names reached through input streams and operator literals
//!
//! Inside an invocation, the attributes of every input stream and the
//! operator's custom literals are visible by simple name. One name can be
//! reached through several origins; it only stands for a definite expression
//! when every origin yields the same one.

use tracing::trace;

use super::error::BindError;
use super::scope::ScopeId;
use super::symbols::{IndirectData, IndirectOrigin, Location, SymbolId, SymbolKind};
use super::Binder;
use crate::types::TypeId;

/// Expression a resolved name stands for in generated code
#[derive(Debug, Clone)]
pub struct GenExpr {
    pub kind: GenExprKind,
    pub location: Location,
}

/// Shape of a [`GenExpr`]; equality ignores where the expression was built
#[derive(Debug, Clone, PartialEq)]
pub enum GenExprKind {
    /// A declared entity used directly
    Symbol(SymbolId),
    /// The current tuple of an input port
    InputTuple { port: usize },
    /// `base.name`
    Attribute { base: Box<GenExprKind>, name: String },
    /// A custom literal of the invoked operator
    EnumLiteral { name: String, ty: TypeId },
}

impl Binder {
    /// Declare `name` in `scope` as reached through `origin`
    ///
    /// A second declaration of the same name adds its origin to the existing
    /// indirect instead of reporting a duplicate.
    pub(crate) fn merge_indirect(
        &mut self,
        scope: ScopeId,
        name: &str,
        origin: IndirectOrigin,
        location: Location,
    ) -> SymbolId {
        if let Some(existing) = self.table.scope(scope).get(name) {
            if let SymbolKind::Indirect(data) = &mut self.table.symbol_mut(existing).kind {
                if !data.origins.contains(&origin) {
                    data.origins.push(origin);
                }
                trace!(name, origins = data.origins.len(), "merged indirect");
            }
            return existing;
        }
        let sym = self.table.add_symbol(
            name,
            location,
            SymbolKind::Indirect(IndirectData {
                origins: vec![origin],
            }),
        );
        let _ = self.table.insert(scope, sym);
        sym
    }

    /// Copy every member of `members` into `scope` as reached through `origin`
    pub(crate) fn merge_members(
        &mut self,
        scope: ScopeId,
        members: ScopeId,
        origin: SymbolId,
        port: Option<usize>,
        location: Location,
    ) {
        let entries: Vec<(String, SymbolId)> = self
            .table
            .scope(members)
            .iter()
            .map(|(name, sym)| (name.to_string(), sym))
            .collect();
        for (name, target) in entries {
            let origin = IndirectOrigin {
                origin,
                target,
                port,
            };
            self.merge_indirect(scope, &name, origin, location);
        }
    }

    /// Type of an indirect: the common type of its targets, else unknown
    pub(crate) fn indirect_type(&mut self, sym: SymbolId) -> TypeId {
        let unknown = self.types.unknown_type();
        let SymbolKind::Indirect(data) = &self.table.symbol(sym).kind else {
            return unknown;
        };
        let targets: Vec<SymbolId> = data.origins.iter().map(|o| o.target).collect();
        let mut common: Option<TypeId> = None;
        for target in targets {
            let ty = self.type_of(target);
            match common {
                None => common = Some(ty),
                Some(seen) if seen == ty => {}
                Some(_) => return unknown,
            }
        }
        common.unwrap_or(unknown)
    }

    /// Report a use of an indirect whose origins disagree on the type
    pub(crate) fn check_indirect_use(&mut self, sym: SymbolId, location: Location) {
        let SymbolKind::Indirect(data) = &self.table.symbol(sym).kind else {
            return;
        };
        if data.origins.len() < 2 {
            return;
        }
        let origins = data.origins.clone();
        let name = self.table.symbol(sym).name.clone();
        let mut types = Vec::with_capacity(origins.len());
        for origin in &origins {
            let ty = self.type_of(origin.target);
            if self.types.is_unknown(ty) {
                return;
            }
            types.push(ty);
        }
        if types.iter().all(|t| *t == types[0]) {
            return;
        }
        let names: Vec<String> = origins
            .iter()
            .map(|o| format!("'{}'", self.table.symbol(o.origin).name))
            .collect();
        self.report(BindError::AmbiguousReference {
            name,
            origins: names.join(", "),
            location,
        });
    }

    /// Expression `sym` stands for when used at `site`
    ///
    /// `None` when the symbol has no expression of its own, or when an
    /// indirect's origins disagree.
    pub fn gen_expression(&mut self, sym: SymbolId, site: Location) -> Option<GenExpr> {
        let kind = self.gen_kind(sym)?;
        Some(GenExpr {
            kind,
            location: site,
        })
    }

    fn gen_kind(&mut self, sym: SymbolId) -> Option<GenExprKind> {
        let symbol = self.table.symbol(sym);
        match &symbol.kind {
            SymbolKind::Indirect(data) => {
                let origins = data.origins.clone();
                let name = symbol.name.clone();
                let mut merged: Option<GenExprKind> = None;
                for origin in origins {
                    let kind = self.origin_kind(&name, origin)?;
                    match &merged {
                        None => merged = Some(kind),
                        Some(seen) if *seen == kind => {}
                        Some(_) => return None,
                    }
                }
                merged
            }
            SymbolKind::AttributeAccess(data) => {
                let (base, name) = (data.base, symbol.name.clone());
                let base = self.gen_kind(base)?;
                Some(GenExprKind::Attribute {
                    base: Box::new(base),
                    name,
                })
            }
            SymbolKind::AttributeAssign(data) => {
                let attribute = data.attribute?;
                self.gen_kind(attribute)
            }
            SymbolKind::EnumValue(data) => Some(GenExprKind::EnumLiteral {
                name: symbol.name.clone(),
                ty: data.ty,
            }),
            SymbolKind::Stream(_)
            | SymbolKind::CompositeInputPort(_)
            | SymbolKind::PortAlias(_)
            | SymbolKind::Variable(_)
            | SymbolKind::FunctionFormal(_)
            | SymbolKind::FunctionHead(_)
            | SymbolKind::BoundsFormal
            | SymbolKind::HostPool
            | SymbolKind::Intrinsic(_) => Some(GenExprKind::Symbol(sym)),
            _ => None,
        }
    }

    /// What one origin contributes under `name`
    fn origin_kind(&mut self, name: &str, origin: IndirectOrigin) -> Option<GenExprKind> {
        match &self.table.symbol(origin.origin).kind {
            SymbolKind::PrimitiveOperator(_) => {
                let ty = self.type_of(origin.target);
                Some(GenExprKind::EnumLiteral {
                    name: name.to_string(),
                    ty,
                })
            }
            _ => {
                let base = match origin.port {
                    Some(port) => GenExprKind::InputTuple { port },
                    None => GenExprKind::Symbol(origin.origin),
                };
                Some(GenExprKind::Attribute {
                    base: Box::new(base),
                    name: name.to_string(),
                })
            }
        }
    }
}
