//! Declaration pass: namespaces, compilation units, definitions and the
//! symbol skeleton of type expressions

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use super::error::BindError;
use super::expansion::Expansion;
use super::scope::ScopeId;
use super::symbols::{
    AnnotationData, AttributeDeclData, CompilationUnitData, CompositeBody, CompositeDefData,
    CompositeFormalData, CompositePortDecl, ContainerData, DefTypeData, EnumTypeData,
    EnumValueData, FunctionData, FunctionFormalData, Location, NamedUse, NamespaceData, SymbolId,
    SymbolKind, TupleAttribData, TupleExtendData, TypeFormalData, WildcardUse,
};
use super::{Binder, SourceUnit};
use crate::parser::ast::{
    has_modifier, Annotation, CompositeDef, CompositePort, Definition, FormalMode, FunctionDef,
    Modifier, NodeId, OpActual, PathName, TupleBody, TypeDef, TypeExprKind, TypeExpr, UseTarget,
};

/// A named type reference waiting for every definition to be declared
#[derive(Debug, Clone)]
pub(crate) struct DeferredType {
    pub(crate) node: NodeId,
    pub(crate) path: PathName,
    pub(crate) scope: ScopeId,
    pub(crate) file: usize,
}

impl Binder {
    /// Namespace symbol for a dotted name, created on first use
    pub(crate) fn namespace_symbol(&mut self, name: &str) -> SymbolId {
        if let Some(ns) = self.table.scope(self.root).get(name) {
            return ns;
        }
        let (ns, _) = self.table.add_symbol_with_scope(
            name,
            Location::INTRINSIC,
            SymbolKind::Namespace(NamespaceData {
                full_name: name.to_string(),
            }),
            None,
        );
        let _ = self.table.insert(self.root, ns);
        debug!(namespace = name, "declared namespace");
        ns
    }

    fn namespace_members(&mut self, name: &str) -> ScopeId {
        let ns = self.namespace_symbol(name);
        if let Some(scope) = self.table.symbol(ns).held {
            return scope;
        }
        let scope = self.table.new_scope(None, Some(ns));
        self.table.set_held(ns, scope);
        scope
    }

    /// Pass 1 over one file
    #[instrument(skip_all, fields(file = unit.file))]
    pub(crate) fn declare_unit(&mut self, unit: &SourceUnit) -> SymbolId {
        let ast = Arc::clone(&unit.unit);
        let namespace = ast
            .namespace
            .as_ref()
            .map(|ns| ns.name.dotted())
            .unwrap_or_default();
        let ns = self.namespace_symbol(&namespace);
        let members = self.namespace_members(&namespace);

        let mut named_uses = Vec::new();
        let mut wildcard_uses = Vec::new();
        for directive in &ast.uses {
            let location = Location::new(unit.file, directive.span);
            match &directive.target {
                UseTarget::Name(name) => named_uses.push(NamedUse {
                    name: name.name.clone(),
                    namespace: directive.namespace.dotted(),
                    location,
                }),
                UseTarget::Wildcard => wildcard_uses.push(WildcardUse {
                    namespace: directive.namespace.dotted(),
                    location,
                }),
            }
        }

        let (cu, cu_scope) = self.table.add_symbol_with_scope(
            "",
            Location::new(unit.file, ast.span),
            SymbolKind::CompilationUnit(CompilationUnitData {
                namespace: ns,
                named_uses,
                wildcard_uses,
            }),
            Some(self.root),
        );
        self.table.bind_node(ast.id, cu);

        self.in_excursion(cu_scope, unit.file, |b| {
            for def in &ast.definitions {
                match def {
                    Definition::Type(td) => {
                        b.declare_type_def(td, members, true);
                    }
                    Definition::Function(fd) => b.declare_function(fd, members),
                    Definition::Composite(cd) => b.declare_composite(cd, members, &namespace),
                }
            }
        });
        cu
    }

    /// `type T = tail;` into `scope`; the tail's references bind in the current scope
    pub(crate) fn declare_type_def(
        &mut self,
        td: &TypeDef,
        scope: ScopeId,
        namespace_level: bool,
    ) -> SymbolId {
        let location = self.location(td.name.span);
        self.check_plain_name(&td.name.name, location);
        let sym = self.table.add_symbol(
            td.name.name.clone(),
            location,
            SymbolKind::DefType(DefTypeData {
                tail: td.tail.clone(),
                is_static: namespace_level || td.is_static(),
                expansion: Expansion::NotStarted,
            }),
        );
        self.declare(scope, sym);
        self.table.bind_node(td.id, sym);
        self.table.bind_node(td.name.id, sym);
        self.declare_type_expr(&td.tail);
        sym
    }

    /// Generic functions get a signature scope between the enclosing scope
    /// and the body, holding their type and bounds formals
    fn declare_function(&mut self, fd: &FunctionDef, members: ScopeId) {
        let location = self.location(fd.name.span);
        self.check_plain_name(&fd.name.name, location);
        let current = self.current_scope();
        let signature = if fd.is_generic() {
            let scope = self.table.new_scope(Some(current), None);
            self.declare_generics(fd, scope);
            scope
        } else {
            current
        };
        let (sym, scope) = self.table.add_symbol_with_scope(
            fd.name.name.clone(),
            location,
            SymbolKind::FunctionHead(FunctionData {
                is_public: has_modifier(&fd.modifiers, Modifier::Public),
                return_type: fd.return_type.clone(),
                formals: Vec::new(),
            }),
            Some(signature),
        );
        self.declare(members, sym);
        self.table.bind_node(fd.id, sym);
        self.table.bind_node(fd.name.id, sym);

        let formals = self.in_scope(signature, |b| {
            b.declare_type_expr(&fd.return_type);
            let mut formals = Vec::with_capacity(fd.formals.len());
            for formal in &fd.formals {
                let location = b.location(formal.name.span);
                b.check_plain_name(&formal.name.name, location);
                b.declare_type_expr(&formal.ty);
                let f = b.table.add_symbol(
                    formal.name.name.clone(),
                    location,
                    SymbolKind::FunctionFormal(FunctionFormalData {
                        ty: formal.ty.clone(),
                        mutable: formal.mutable,
                    }),
                );
                b.declare(scope, f);
                b.table.bind_node(formal.id, f);
                b.table.bind_node(formal.name.id, f);
                formals.push(f);
            }
            formals
        });
        if let SymbolKind::FunctionHead(data) = &mut self.table.symbol_mut(sym).kind {
            data.formals = formals;
        }
    }

    fn declare_generics(&mut self, fd: &FunctionDef, scope: ScopeId) {
        for formal in &fd.type_formals {
            let location = self.location(formal.name.span);
            self.check_plain_name(&formal.name.name, location);
            let ty = self.types.type_formal(formal.name.name.clone());
            let sym = self.table.add_symbol(
                formal.name.name.clone(),
                location,
                SymbolKind::TypeFormal(TypeFormalData {
                    constraint: formal.constraint.clone(),
                    ty,
                }),
            );
            self.declare(scope, sym);
            self.table.bind_node(formal.name.id, sym);
        }
        for bound in &fd.bounds_formals {
            let location = self.location(bound.span);
            self.check_plain_name(&bound.name, location);
            let sym = self
                .table
                .add_symbol(bound.name.clone(), location, SymbolKind::BoundsFormal);
            self.declare(scope, sym);
            self.table.bind_node(bound.id, sym);
        }
    }

    /// Declares the composite's static part; the instance part is kept as a
    /// template and bound once per instance
    fn declare_composite(&mut self, cd: &CompositeDef, members: ScopeId, namespace: &str) {
        let location = self.location(cd.name.span);
        self.check_plain_name(&cd.name.name, location);

        let template = CompositeBody {
            types: cd.types.iter().filter(|t| !t.is_static()).cloned().collect(),
            graph: cd.graph.clone(),
        };
        let data = CompositeDefData {
            namespace: namespace.to_string(),
            file: self.current_file(),
            is_public: cd.is_public(),
            inputs: self.port_decls(&cd.inputs),
            outputs: self.port_decls(&cd.outputs),
            formals: Vec::new(),
            template: Arc::new(template),
            instances: Vec::new(),
        };
        let current = self.current_scope();
        let (def, def_scope) = self.table.add_symbol_with_scope(
            cd.name.name.clone(),
            location,
            SymbolKind::CompositeDef(Box::new(data)),
            Some(current),
        );
        self.declare(members, def);
        self.table.bind_node(cd.id, def);
        self.table.bind_node(cd.name.id, def);

        let shared: Vec<(String, SymbolId)> = self
            .table
            .scope(self.intrinsics.composite)
            .iter()
            .map(|(name, sym)| (name.to_string(), sym))
            .collect();
        for (name, sym) in shared {
            let _ = self.table.insert_as(def_scope, &name, sym);
        }

        let formals = self.in_scope(def_scope, |b| {
            let mut formals = Vec::with_capacity(cd.formals.len());
            for formal in &cd.formals {
                let location = b.location(formal.name.span);
                b.check_formal_name(&formal.name.name, location);
                if let FormalMode::Expression(Some(ty)) = &formal.mode {
                    b.declare_type_expr(ty);
                }
                if let Some(OpActual::Type(ty)) = &formal.default {
                    b.declare_type_expr(ty);
                }
                let sym = b.table.add_symbol(
                    formal.name.name.clone(),
                    location,
                    SymbolKind::CompositeFormal(CompositeFormalData {
                        mode: formal.mode.clone(),
                        default: formal.default.clone(),
                        composite: def,
                    }),
                );
                b.declare(def_scope, sym);
                b.table.bind_node(formal.id, sym);
                b.table.bind_node(formal.name.id, sym);
                formals.push(sym);
            }

            b.check_port_names(cd.inputs.iter().chain(cd.outputs.iter()));
            for port in cd.inputs.iter().chain(cd.outputs.iter()) {
                if let Some(ty) = &port.ty {
                    b.declare_type_expr(&ty.tuple);
                }
            }

            for td in cd.types.iter().filter(|t| t.is_static()) {
                b.declare_type_def(td, def_scope, false);
            }
            formals
        });

        if let SymbolKind::CompositeDef(data) = &mut self.table.symbol_mut(def).kind {
            data.formals = formals;
        }
        debug!(composite = %cd.name.name, "declared composite");
    }

    fn port_decls(&self, ports: &[CompositePort]) -> Vec<CompositePortDecl> {
        ports
            .iter()
            .map(|p| CompositePortDecl {
                name: p.name.name.clone(),
                location: self.location(p.name.span),
                tuple: p.ty.as_ref().map(|t| t.tuple.clone()),
            })
            .collect()
    }

    fn check_port_names<'a>(&mut self, ports: impl Iterator<Item = &'a CompositePort>) {
        let mut seen: FxHashMap<String, Location> = FxHashMap::default();
        for port in ports {
            let location = self.location(port.name.span);
            self.check_plain_name(&port.name.name, location);
            if let Some(previous) = seen.get(&port.name.name) {
                self.report(BindError::DuplicatePortName {
                    name: port.name.name.clone(),
                    location,
                    previous: *previous,
                });
            } else {
                seen.insert(port.name.name.clone(), location);
            }
        }
    }

    /// Symbol skeleton of a type expression
    ///
    /// Tuple, enum and container expressions get their symbols now; named
    /// references are deferred until [`Binder::flush_deferred`].
    pub(crate) fn declare_type_expr(&mut self, te: &TypeExpr) {
        let location = self.location(te.span);
        match &te.kind {
            TypeExprKind::Primitive(_) | TypeExprKind::BoundedString(_) => {}
            TypeExprKind::Named(path) => {
                self.deferred.push(DeferredType {
                    node: te.id,
                    path: path.clone(),
                    scope: self.current_scope(),
                    file: self.current_file(),
                });
            }
            TypeExprKind::List { element, .. } | TypeExprKind::Set { element, .. } => {
                self.container(te, location);
                self.declare_type_expr(element);
            }
            TypeExprKind::Map { key, value, .. } => {
                self.container(te, location);
                self.declare_type_expr(key);
                self.declare_type_expr(value);
            }
            TypeExprKind::Optional(inner) => {
                self.container(te, location);
                self.declare_type_expr(inner);
            }
            TypeExprKind::Enum(values) => {
                let names: Vec<String> = values.iter().map(|v| v.name.clone()).collect();
                let ty = self.types.enumeration(names);
                let (sym, held) = self.table.add_symbol_with_scope(
                    "",
                    location,
                    SymbolKind::EnumType(EnumTypeData { ty }),
                    None,
                );
                self.table.bind_node(te.id, sym);
                for value in values {
                    let location = self.location(value.span);
                    self.check_plain_name(&value.name, location);
                    let v = self.table.add_symbol(
                        value.name.clone(),
                        location,
                        SymbolKind::EnumValue(EnumValueData { owner: sym, ty }),
                    );
                    self.declare(held, v);
                    self.table.bind_node(value.id, v);
                }
            }
            TypeExprKind::Tuple(TupleBody::Attributes(decls)) => {
                let (sym, held) = self.table.add_symbol_with_scope(
                    "",
                    location,
                    SymbolKind::TupleAttrib(TupleAttribData::default()),
                    None,
                );
                self.table.bind_node(te.id, sym);
                for decl in decls {
                    let location = self.location(decl.name.span);
                    self.check_attribute_name(&decl.name.name, location);
                    let attr = self.table.add_symbol(
                        decl.name.name.clone(),
                        location,
                        SymbolKind::AttributeDecl(AttributeDeclData {
                            ty: decl.ty.clone(),
                        }),
                    );
                    self.declare(held, attr);
                    self.table.bind_node(decl.id, attr);
                    self.table.bind_node(decl.name.id, attr);
                    self.declare_type_expr(&decl.ty);
                }
            }
            TypeExprKind::Tuple(TupleBody::Extends(parts)) => {
                let (sym, _) = self.table.add_symbol_with_scope(
                    "",
                    location,
                    SymbolKind::TupleExtend(TupleExtendData {
                        parts: parts.clone(),
                        expansion: Expansion::NotStarted,
                    }),
                    None,
                );
                self.table.bind_node(te.id, sym);
                for part in parts {
                    self.declare_type_expr(part);
                }
            }
        }
    }

    fn container(&mut self, te: &TypeExpr, location: Location) {
        let sym = self.table.add_symbol(
            "",
            location,
            SymbolKind::ContainerType(ContainerData { expr: te.clone() }),
        );
        self.table.bind_node(te.id, sym);
    }

    /// `@name(key = value, ...)`: keys form their own name domain
    pub(crate) fn declare_annotation(&mut self, annotation: &Annotation) -> SymbolId {
        let location = self.location(annotation.name.span);
        let (sym, keys) = self.table.add_symbol_with_scope(
            annotation.name.name.clone(),
            location,
            SymbolKind::Annotation(AnnotationData {
                keys: annotation.args.iter().map(|a| a.key.name.clone()).collect(),
            }),
            None,
        );
        self.table.bind_node(annotation.id, sym);
        for arg in &annotation.args {
            let key_location = self.location(arg.key.span);
            let key = self.table.add_symbol(
                arg.key.name.clone(),
                key_location,
                SymbolKind::AnnotationKey,
            );
            self.declare(keys, key);
            self.table.bind_node(arg.key.id, key);
            self.bind_expr(&arg.value);
        }
        sym
    }

    /// Resolve every pending named type reference
    pub(crate) fn flush_deferred(&mut self) {
        while !self.deferred.is_empty() {
            let pending = std::mem::take(&mut self.deferred);
            trace!(count = pending.len(), "flushing type references");
            for entry in pending {
                self.in_excursion(entry.scope, entry.file, |b| {
                    b.bind_type_name(entry.node, &entry.path)
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::{Binder, BinderConfig, SymbolKind};

    fn bind(source: &str) -> Binder {
        let mut binder = Binder::new(BinderConfig::default());
        binder.add_source("test.spl", source).unwrap();
        binder.bind();
        binder
    }

    // ── Definitions ──

    #[test]
    fn test_definitions_land_in_namespace() {
        let binder = bind(
            "namespace demo;
             type T = tuple<int32 a>;
             int32 twice(int32 x) { return x * 2; }
             composite Main { }",
        );
        assert!(!binder.diagnostics().has_errors());
        let t = binder.lookup_qualified("demo::T").unwrap();
        assert!(matches!(binder.table().symbol(t).kind, SymbolKind::DefType(_)));
        let f = binder.lookup_qualified("demo::twice").unwrap();
        assert!(matches!(binder.table().symbol(f).kind, SymbolKind::FunctionHead(_)));
        let c = binder.lookup_qualified("demo::Main").unwrap();
        assert!(matches!(binder.table().symbol(c).kind, SymbolKind::CompositeDef(_)));
    }

    #[test]
    fn test_forward_references_across_files() {
        let mut binder = Binder::new(BinderConfig::default());
        binder
            .add_source("a.spl", "namespace demo; type A = tuple<B b>;")
            .unwrap();
        binder
            .add_source("b.spl", "namespace demo; type B = int64;")
            .unwrap();
        binder.bind();
        assert!(!binder.diagnostics().has_errors());
    }

    #[test]
    fn test_duplicate_attribute_in_tuple() {
        let binder = bind("type T = tuple<int32 a, rstring a>;");
        assert_eq!(binder.diagnostics().with_code("E2001").count(), 1);
    }

    #[test]
    fn test_reserved_attribute_name() {
        let binder = bind("type T = tuple<int32 class>;");
        assert_eq!(binder.diagnostics().with_code("E2004").count(), 1);
    }

    // ── Composites ──

    #[test]
    fn test_formal_names_need_dollar() {
        let binder = bind("composite C { param expression n; }");
        assert_eq!(binder.diagnostics().with_code("E2003").count(), 1);
    }

    #[test]
    fn test_duplicate_composite_ports() {
        let binder = bind("composite C(input In; output In) { }");
        assert_eq!(binder.diagnostics().with_code("E2011").count(), 1);
    }

    #[test]
    fn test_unknown_named_type() {
        let binder = bind("type T = Missing;");
        let diags: Vec<_> = binder.diagnostics().with_code("E2006").collect();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message().contains("Missing"));
    }

    // ── Generic functions ──

    #[test]
    fn test_type_formal_visible_in_signature_and_body() {
        let mut binder = bind("<any T>[N] T f(T x) { return x; }");
        assert!(!binder.diagnostics().has_errors());
        let f = binder.lookup_qualified("f").unwrap();
        let body = binder.table().symbol(f).held.unwrap();

        let t = binder.table().lookup(body, "T").unwrap();
        let SymbolKind::TypeFormal(data) = &binder.table().symbol(t).kind else {
            panic!("expected type formal");
        };
        assert_eq!(data.constraint, "any");
        let n = binder.table().lookup(body, "N").unwrap();
        assert!(matches!(binder.table().symbol(n).kind, SymbolKind::BoundsFormal));

        let x = binder.table().scope(body).get("x").unwrap();
        let ty = binder.type_of(x);
        assert_eq!(binder.display_type(ty), "T");
        let ret = binder.type_of(f);
        assert_eq!(binder.display_type(ret), "T");
    }

    #[test]
    fn test_type_formals_stay_out_of_namespace() {
        let binder = bind("<any T> T f(T x) { return x; } type U = T;");
        assert_eq!(binder.diagnostics().with_code("E2006").count(), 1);
    }
}
