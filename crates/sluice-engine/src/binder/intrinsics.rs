//! Scopes the binder seeds before any source is bound

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

use super::model::{ModelRegistry, OperatorModel};
use super::scope::ScopeId;
use super::symbols::{
    EnumTypeData, EnumValueData, Location, PrimitiveFormalData, PrimitiveOperatorData, SymbolId,
    SymbolKind,
};
use super::table::SymbolTable;
use super::Binder;
use crate::types::{PrimitiveType, TypeContext, TypeId};

/// Namespaces searched after wildcard uses
pub const IMPLICIT_NAMESPACES: &[&str] = &[
    "spl.math",
    "spl.string",
    "spl.collection",
    "spl.utility",
    "spl.relational",
    "spl.adapter",
];

const COMPOSITE_FUNCTIONS: &[(&str, PrimitiveType)] = &[
    ("getSubmissionTimeValue", PrimitiveType::Rstring),
    ("getSubmissionTimeListValue", PrimitiveType::Rstring),
    ("getCompileTimeValue", PrimitiveType::Rstring),
    ("getCompileTimeListValue", PrimitiveType::Rstring),
    ("getThisCompositeInstanceName", PrimitiveType::Rstring),
];

const WINDOW_POLICIES: &[&str] = &[
    "sliding",
    "tumbling",
    "count",
    "time",
    "delta",
    "punct",
    "partitioned",
    "evictionTime",
    "timeInterval",
];

/// Config labels and the helpers visible in their values
const CONFIG_LABELS: &[(&str, &[&str])] = &[
    (
        "placement",
        &[
            "host",
            "hostColocation",
            "hostExlocation",
            "hostIsolation",
            "partitionColocation",
            "partitionExlocation",
            "partitionIsolation",
        ],
    ),
    ("hostPool", &["createPool", "Sys"]),
    ("threadedPort", &["queue", "Sys"]),
    ("checkpoint", &["periodic", "operatorDriven"]),
    ("relocatable", &[]),
    ("restartable", &[]),
    ("defaultPoolSize", &[]),
    ("logLevel", &["error", "info", "debug", "trace"]),
    ("tracing", &["error", "info", "debug", "trace"]),
    ("wrapper", &[]),
    ("applicationScope", &[]),
];

const SYS_VALUES: &[&str] = &["Shared", "Exclusive", "Wait", "DropFirst", "DropLast"];

const NAMESPACE_FUNCTIONS: &[(&str, &[(&str, PrimitiveType)])] = &[
    (
        "spl.math",
        &[
            ("abs", PrimitiveType::Float64),
            ("max", PrimitiveType::Float64),
            ("min", PrimitiveType::Float64),
            ("sqrt", PrimitiveType::Float64),
            ("floor", PrimitiveType::Float64),
            ("ceil", PrimitiveType::Float64),
            ("pow", PrimitiveType::Float64),
        ],
    ),
    (
        "spl.string",
        &[
            ("length", PrimitiveType::Int32),
            ("concat", PrimitiveType::Rstring),
            ("substring", PrimitiveType::Rstring),
            ("upper", PrimitiveType::Rstring),
            ("lower", PrimitiveType::Rstring),
        ],
    ),
    (
        "spl.collection",
        &[
            ("size", PrimitiveType::Int32),
            ("has", PrimitiveType::Boolean),
            ("clear", PrimitiveType::Void),
            ("insertM", PrimitiveType::Void),
        ],
    ),
    (
        "spl.utility",
        &[
            ("printStringLn", PrimitiveType::Void),
            ("getTimestamp", PrimitiveType::Timestamp),
            ("assert", PrimitiveType::Void),
        ],
    ),
];

/// Common scopes shared by every binding site of one kind
#[derive(Debug, Clone, Copy)]
pub struct IntrinsicScopes {
    /// Functions callable inside composite bodies
    pub composite: ScopeId,
    /// Window policies
    pub window: ScopeId,
    /// Known config labels
    pub config: ScopeId,
    /// `submit`, for Custom logic
    pub submit: ScopeId,
    /// `currentPunct`, for onPunct logic
    pub punct: ScopeId,
}

fn intrinsic(table: &mut SymbolTable, scope: ScopeId, name: &str, ty: TypeId) {
    let sym = table.add_symbol(name, Location::INTRINSIC, SymbolKind::Intrinsic(ty));
    let _ = table.insert(scope, sym);
}

impl IntrinsicScopes {
    pub(crate) fn seed(table: &mut SymbolTable, types: &mut TypeContext) -> Self {
        let rstring = types.primitive(PrimitiveType::Rstring);
        let void = types.primitive(PrimitiveType::Void);

        let composite = table.new_scope(None, None);
        for (name, ty) in COMPOSITE_FUNCTIONS {
            let ty = types.primitive(*ty);
            intrinsic(table, composite, name, ty);
        }

        let window = table.new_scope(None, None);
        for name in WINDOW_POLICIES {
            intrinsic(table, window, name, void);
        }

        let sys_ty = types.enumeration(SYS_VALUES.iter().map(|s| s.to_string()).collect());
        let (sys, sys_scope) = table.add_symbol_with_scope(
            "Sys",
            Location::INTRINSIC,
            SymbolKind::EnumType(EnumTypeData { ty: sys_ty }),
            None,
        );
        for value in SYS_VALUES {
            let sym = table.add_symbol(
                *value,
                Location::INTRINSIC,
                SymbolKind::EnumValue(EnumValueData {
                    owner: sys,
                    ty: sys_ty,
                }),
            );
            let _ = table.insert(sys_scope, sym);
        }

        let config = table.new_scope(None, None);
        for (label, helpers) in CONFIG_LABELS {
            let (sym, held) = table.add_symbol_with_scope(
                *label,
                Location::INTRINSIC,
                SymbolKind::FormalConfig,
                None,
            );
            let _ = table.insert(config, sym);
            for helper in *helpers {
                if *helper == "Sys" {
                    let _ = table.insert_as(held, "Sys", sys);
                } else {
                    intrinsic(table, held, helper, rstring);
                }
            }
        }

        let submit = table.new_scope(None, None);
        intrinsic(table, submit, "submit", void);

        let punct_ty = types.enumeration(vec!["WindowMarker".into(), "FinalMarker".into()]);
        let punct = table.new_scope(None, None);
        intrinsic(table, punct, "currentPunct", punct_ty);

        Self {
            composite,
            window,
            config,
            submit,
            punct,
        }
    }
}

impl Binder {
    /// Functions of the implicit standard namespaces
    pub(crate) fn seed_namespace_functions(&mut self) {
        for (namespace, functions) in NAMESPACE_FUNCTIONS {
            let ns = self.namespace_symbol(namespace);
            let Some(scope) = self.table.symbol(ns).held else {
                continue;
            };
            for (name, ty) in *functions {
                let ty = self.types.primitive(*ty);
                intrinsic(&mut self.table, scope, name, ty);
            }
        }
    }

    /// One primitive operator symbol per model, in the model's namespace
    pub(crate) fn seed_operators(&mut self, registry: &ModelRegistry) {
        for model in registry.iter() {
            self.declare_operator(Arc::clone(model));
        }
    }

    fn declare_operator(&mut self, model: Arc<OperatorModel>) -> SymbolId {
        let (op, params) = self.table.add_symbol_with_scope(
            model.name.clone(),
            Location::INTRINSIC,
            SymbolKind::ErrorDummy,
            None,
        );

        let enums = self.table.new_scope(None, Some(op));
        for set in &model.custom_literals {
            let ty = self.types.enumeration(set.values.clone());
            for value in &set.values {
                let sym = self.table.add_symbol(
                    value.clone(),
                    Location::INTRINSIC,
                    SymbolKind::EnumValue(EnumValueData { owner: op, ty }),
                );
                let _ = self.table.insert(enums, sym);
            }
        }

        let unknown = self.types.unknown_type();
        let mut output_functions = FxHashMap::default();
        for set in &model.output_functions {
            let scope = self.table.new_scope(None, Some(op));
            for function in &set.functions {
                intrinsic(&mut self.table, scope, function, unknown);
            }
            output_functions.insert(set.name.clone(), scope);
        }

        for (index, param) in model.parameters.iter().enumerate() {
            let sym = self.table.add_symbol(
                param.name.clone(),
                Location::INTRINSIC,
                SymbolKind::PrimitiveFormal(PrimitiveFormalData {
                    operator: op,
                    index,
                }),
            );
            let _ = self.table.insert(params, sym);
        }

        let namespace = self.namespace_symbol(&model.namespace);
        self.table.symbol_mut(op).kind = SymbolKind::PrimitiveOperator(PrimitiveOperatorData {
            full_name: model.full_name(),
            model,
            enums,
            output_functions,
        });
        if let Some(scope) = self.table.symbol(namespace).held {
            let _ = self.table.insert(scope, op);
        }
        debug!(operator = %self.table.symbol(op).name, "seeded operator");
        op
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BinderConfig;

    #[test]
    fn test_seeded_scopes() {
        let binder = Binder::new(BinderConfig::default());
        let scopes = binder.intrinsics;
        assert!(binder.table.has(scopes.window, "sliding"));
        assert!(binder.table.has(scopes.submit, "submit"));
        assert!(binder.table.has(scopes.punct, "currentPunct"));
        assert!(binder.table.has(scopes.composite, "getThisCompositeInstanceName"));

        let placement = binder.table.scope(scopes.config).get("placement").unwrap();
        let held = binder.table.symbol(placement).held.unwrap();
        assert!(binder.table.has(held, "hostColocation"));
    }

    #[test]
    fn test_operators_live_in_their_namespace() {
        let binder = Binder::new(BinderConfig::default());
        let functor = binder.lookup_qualified("spl.relational::Functor").unwrap();
        let SymbolKind::PrimitiveOperator(data) = &binder.table.symbol(functor).kind else {
            panic!("expected operator");
        };
        assert_eq!(data.full_name, "spl.relational::Functor");
        let params = binder.table.symbol(functor).held.unwrap();
        assert!(binder.table.has(params, "filter"));

        let source = binder.lookup_qualified("spl.adapter::FileSource").unwrap();
        let SymbolKind::PrimitiveOperator(data) = &binder.table.symbol(source).kind else {
            panic!("expected operator");
        };
        assert!(binder.table.has(data.enums, "csv"));
    }
}
