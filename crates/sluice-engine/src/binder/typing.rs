//! Types and member scopes of symbols
//!
//! Both are computed on demand. Symbols whose answer depends on other
//! symbols go through the expansion protocol, so a definition that reaches
//! itself is reported once and then yields the unknown type.

use tracing::trace;

use super::error::BindError;
use super::expansion::{def_type_slot, tuple_slot};
use super::scope::ScopeId;
use super::symbols::{Location, SymbolId, SymbolKind};
use super::Binder;
use crate::parser::ast::{ExprKind, FormalMode, NodeId, OpActual, TypeExpr, TypeExprKind};
use crate::types::{PrimitiveType, TypeId};

impl Binder {
    /// Type of a symbol; the unknown type when it has none or failed
    pub fn type_of(&mut self, sym: SymbolId) -> TypeId {
        let unknown = self.types.unknown_type();
        match &self.table.symbol(sym).kind {
            SymbolKind::DefType(_) => self.expand_def_type(sym).0,
            SymbolKind::TupleAttrib(_) => self.expand_tuple_attrib(sym),
            SymbolKind::TupleExtend(_) => self.expand_tuple_extend(sym),
            SymbolKind::EnumType(data) => data.ty,
            SymbolKind::EnumValue(data) => data.ty,
            SymbolKind::AttributeFromType(ty) | SymbolKind::Intrinsic(ty) => *ty,
            SymbolKind::CompositeInputPort(data) => data.ty,
            SymbolKind::ContainerType(data) => {
                let expr = data.expr.clone();
                self.eval_type_expr(&expr)
            }
            SymbolKind::AttributeDecl(data) => {
                let expr = data.ty.clone();
                self.eval_type_expr(&expr)
            }
            SymbolKind::Stream(data) => {
                let expr = data.tuple.clone();
                self.eval_type_expr(&expr)
            }
            SymbolKind::Variable(data) => {
                let expr = data.ty.clone();
                self.eval_type_expr(&expr)
            }
            SymbolKind::FunctionFormal(data) => {
                let expr = data.ty.clone();
                self.eval_type_expr(&expr)
            }
            SymbolKind::FunctionHead(data) => {
                let expr = data.return_type.clone();
                self.eval_type_expr(&expr)
            }
            SymbolKind::TypeFormal(data) => data.ty,
            SymbolKind::BoundsFormal => self.types.primitive(PrimitiveType::Int32),
            SymbolKind::AttributeAccess(data) => {
                let attribute = data.attribute;
                self.type_of(attribute)
            }
            SymbolKind::AttributeAssign(data) => match data.attribute {
                Some(attribute) => self.type_of(attribute),
                None => unknown,
            },
            SymbolKind::PortAlias(data) => {
                let (invoke, port, output) = (data.invoke, data.port, data.output);
                self.port_type(invoke, port, output)
            }
            SymbolKind::Indirect(_) => self.indirect_type(sym),
            SymbolKind::CompositeFormal(_) => {
                let instance = self.context.current_composite_instance(&self.table);
                self.formal_type(sym, instance)
            }
            SymbolKind::PrimitiveFormal(data) => {
                let (operator, index) = (data.operator, data.index);
                let SymbolKind::PrimitiveOperator(op) = &self.table.symbol(operator).kind else {
                    return unknown;
                };
                match op
                    .model
                    .parameters
                    .get(index)
                    .and_then(|p| p.ty.as_deref())
                    .and_then(PrimitiveType::from_name)
                {
                    Some(p) => self.types.primitive(p),
                    None => unknown,
                }
            }
            _ => unknown,
        }
    }

    /// `(type, member scope)` of a type definition
    pub(crate) fn expand_def_type(&mut self, sym: SymbolId) -> (TypeId, Option<ScopeId>) {
        let unknown = self.types.unknown_type();
        let tail = match &self.table.symbol(sym).kind {
            SymbolKind::DefType(data) => data.tail.clone(),
            _ => return (unknown, None),
        };
        self.run_expansion(sym, def_type_slot, (unknown, None), |b| {
            let ty = b.eval_type_expr(&tail);
            let scope = b.type_expr_scope(&tail);
            (ty, scope)
        })
    }

    fn expand_tuple_attrib(&mut self, sym: SymbolId) -> TypeId {
        let unknown = self.types.unknown_type();
        let Some(held) = self.table.symbol(sym).held else {
            return unknown;
        };
        self.run_expansion(sym, tuple_slot, unknown, |b| {
            let members: Vec<(String, SymbolId)> = b
                .table
                .scope(held)
                .iter()
                .map(|(name, attr)| (name.to_string(), attr))
                .collect();
            let mut attributes = Vec::with_capacity(members.len());
            for (name, attr) in members {
                let ty = b.type_of(attr);
                attributes.push((name, ty));
            }
            b.types.tuple(attributes)
        })
    }

    /// `tuple<A, B>`: members of every part are copied into the tuple's scope
    fn expand_tuple_extend(&mut self, sym: SymbolId) -> TypeId {
        let unknown = self.types.unknown_type();
        let symbol = self.table.symbol(sym);
        let (Some(held), SymbolKind::TupleExtend(data)) = (symbol.held, &symbol.kind) else {
            return unknown;
        };
        let parts = data.parts.clone();
        let file = symbol.location.file;

        self.run_expansion(sym, tuple_slot, unknown, |b| {
            let mut attributes: Vec<(String, TypeId)> = Vec::new();
            for part in &parts {
                let location = Location::new(file, part.span);
                let ty = b.eval_type_expr(part);
                if b.types.is_unknown(ty) {
                    continue;
                }
                let Some(members) = b.types.tuple_attributes(ty).map(|a| a.to_vec()) else {
                    let name = match &part.kind {
                        TypeExprKind::Named(path) => path.display(),
                        _ => b.types.display(ty),
                    };
                    b.report(BindError::TupleExtendeeNotTuple { name, location });
                    continue;
                };
                for (name, attr_ty) in members {
                    match b.table.scope(held).get(&name) {
                        Some(existing) => {
                            if b.type_of(existing) != attr_ty {
                                b.report(BindError::DuplicateAttribute { name, location });
                            }
                        }
                        None => {
                            let attr = b.table.add_symbol(
                                name.clone(),
                                location,
                                SymbolKind::AttributeFromType(attr_ty),
                            );
                            let _ = b.table.insert(held, attr);
                            attributes.push((name, attr_ty));
                        }
                    }
                }
            }
            b.types.tuple(attributes)
        })
    }

    /// Evaluate a type expression whose named references are already bound
    pub(crate) fn eval_type_expr(&mut self, te: &TypeExpr) -> TypeId {
        let unknown = self.types.unknown_type();
        match &te.kind {
            TypeExprKind::Primitive(p) => self.types.primitive(*p),
            TypeExprKind::BoundedString(n) => self.types.bounded_rstring(*n),
            TypeExprKind::List { element, bound } => {
                let element = self.eval_type_expr(element);
                self.types.list(element, *bound)
            }
            TypeExprKind::Set { element, bound } => {
                let element = self.eval_type_expr(element);
                self.types.set(element, *bound)
            }
            TypeExprKind::Map { key, value, bound } => {
                let key = self.eval_type_expr(key);
                let value = self.eval_type_expr(value);
                self.types.map(key, value, *bound)
            }
            TypeExprKind::Optional(inner) => {
                let inner = self.eval_type_expr(inner);
                self.types.optional(inner)
            }
            TypeExprKind::Enum(_) | TypeExprKind::Tuple(_) => match self.table.node_symbol(te.id) {
                Some(sym) => self.type_of(sym),
                None => unknown,
            },
            TypeExprKind::Named(_) => {
                let Some(sym) = self.table.node_symbol(te.id) else {
                    return unknown;
                };
                match &self.table.symbol(sym).kind {
                    SymbolKind::CompositeFormal(_) => {
                        let instance = self.formal_uses.get(&te.id).copied();
                        self.formal_type(sym, instance)
                    }
                    SymbolKind::DefType(_)
                    | SymbolKind::EnumType(_)
                    | SymbolKind::TupleAttrib(_)
                    | SymbolKind::TupleExtend(_)
                    | SymbolKind::ContainerType(_)
                    | SymbolKind::Stream(_)
                    | SymbolKind::CompositeInputPort(_)
                    | SymbolKind::TypeFormal(_) => self.type_of(sym),
                    _ => unknown,
                }
            }
        }
    }

    /// Type a composite formal stands for inside `instance`
    fn formal_type(&mut self, formal: SymbolId, instance: Option<SymbolId>) -> TypeId {
        let unknown = self.types.unknown_type();
        let symbol = self.table.symbol(formal);
        let SymbolKind::CompositeFormal(data) = &symbol.kind else {
            return unknown;
        };
        let mode = data.mode.clone();
        let name = symbol.name.clone();

        let actual = instance.and_then(|inst| match &self.table.symbol(inst).kind {
            SymbolKind::CompositeInstance(data) => data.actuals.get(&name).map(|a| a.value.clone()),
            _ => None,
        });
        trace!(formal = %name, ?instance, "typing composite formal");

        match (mode, actual) {
            (FormalMode::Expression(Some(ty)), _) => self.eval_type_expr(&ty),
            (FormalMode::Type, Some(OpActual::Type(ty))) => self.eval_type_expr(&ty),
            (FormalMode::Type | FormalMode::Expression(None), Some(OpActual::Exprs(exprs))) => {
                match exprs.first() {
                    Some(expr) if exprs.len() == 1 => self.expr_type(expr.id, &expr.kind),
                    _ => unknown,
                }
            }
            _ => unknown,
        }
    }

    fn expr_type(&mut self, node: NodeId, kind: &ExprKind) -> TypeId {
        match kind {
            ExprKind::Ident(_) | ExprKind::Qualified(_) | ExprKind::Attribute { .. } => {
                match self.table.node_symbol(node) {
                    Some(sym) => self.type_of(sym),
                    None => self.types.unknown_type(),
                }
            }
            _ => self.types.unknown_type(),
        }
    }

    /// Member scope a type expression gives the symbol it declares
    pub(crate) fn type_expr_scope(&mut self, te: &TypeExpr) -> Option<ScopeId> {
        match &te.kind {
            TypeExprKind::Tuple(_) | TypeExprKind::Enum(_) => {
                let sym = self.table.node_symbol(te.id)?;
                self.held_scope(sym)
            }
            TypeExprKind::Named(_) => {
                let sym = self.table.node_symbol(te.id)?;
                match &self.table.symbol(sym).kind {
                    SymbolKind::CompositeFormal(_) => {
                        let ty = self.eval_type_expr(te);
                        self.type_scope(ty)
                    }
                    SymbolKind::ErrorDummy => None,
                    _ => self.held_scope(sym),
                }
            }
            _ => None,
        }
    }

    /// Scope of members reachable through a symbol, once it can be computed
    pub fn held_scope(&mut self, sym: SymbolId) -> Option<ScopeId> {
        let symbol = self.table.symbol(sym);
        let held = symbol.held;
        match &symbol.kind {
            SymbolKind::DefType(_) => self.expand_def_type(sym).1,
            SymbolKind::TupleAttrib(_) => {
                self.expand_tuple_attrib(sym);
                self.expanded_scope(sym, held)
            }
            SymbolKind::TupleExtend(_) => {
                self.expand_tuple_extend(sym);
                self.expanded_scope(sym, held)
            }
            SymbolKind::Stream(data) => {
                let tuple = data.tuple.clone();
                self.type_expr_scope(&tuple)
            }
            SymbolKind::Variable(data) => {
                let ty = data.ty.clone();
                self.type_expr_scope(&ty)
            }
            SymbolKind::FunctionFormal(data) => {
                let ty = data.ty.clone();
                self.type_expr_scope(&ty)
            }
            SymbolKind::AttributeDecl(data) => {
                let ty = data.ty.clone();
                self.type_expr_scope(&ty)
            }
            SymbolKind::AttributeFromType(ty) => {
                let ty = *ty;
                self.type_scope(ty)
            }
            SymbolKind::AttributeAccess(data) => {
                let attribute = data.attribute;
                self.held_scope(attribute)
            }
            SymbolKind::PortAlias(data) => {
                let invoke = data.invoke;
                self.expand_invoke(invoke);
                self.table.symbol(sym).held
            }
            SymbolKind::OpInvoke(_) => {
                self.expand_invoke(sym);
                held
            }
            SymbolKind::Indirect(data) => {
                let targets: Vec<SymbolId> = data.origins.iter().map(|o| o.target).collect();
                let mut scopes = Vec::with_capacity(targets.len());
                for target in targets {
                    scopes.push(self.held_scope(target));
                }
                match scopes.first() {
                    Some(first) if scopes.iter().all(|s| s == first) => *first,
                    _ => {
                        let ty = self.indirect_type(sym);
                        self.type_scope(ty)
                    }
                }
            }
            SymbolKind::CompositeFormal(_) => {
                let ty = self.type_of(sym);
                self.type_scope(ty)
            }
            SymbolKind::Intrinsic(_) | SymbolKind::ErrorDummy | SymbolKind::EnumValue(_) => None,
            _ => held,
        }
    }

    /// A tuple's member scope is withheld when its expansion failed
    fn expanded_scope(&self, sym: SymbolId, held: Option<ScopeId>) -> Option<ScopeId> {
        let failed = match &self.table.symbol(sym).kind {
            SymbolKind::TupleAttrib(data) => data.expansion.is_failed(),
            SymbolKind::TupleExtend(data) => data.expansion.is_failed(),
            _ => false,
        };
        if failed {
            None
        } else {
            held
        }
    }

    /// Member scope of a computed tuple type, built once per type
    pub(crate) fn type_scope(&mut self, ty: TypeId) -> Option<ScopeId> {
        if let Some(scope) = self.type_scopes.get(&ty) {
            return Some(*scope);
        }
        let attributes = self.types.tuple_attributes(ty)?.to_vec();
        let scope = self.table.new_scope(None, None);
        for (name, attr_ty) in attributes {
            let attr = self.table.add_symbol(
                name,
                Location::INTRINSIC,
                SymbolKind::AttributeFromType(attr_ty),
            );
            let _ = self.table.insert(scope, attr);
        }
        self.type_scopes.insert(ty, scope);
        Some(scope)
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::{Binder, BinderConfig, ModelRegistry, SymbolKind};

    fn bind(source: &str) -> Binder {
        let mut binder = Binder::new(BinderConfig::default());
        binder.add_source("test.spl", source).unwrap();
        binder.bind();
        binder
    }

    fn display(binder: &mut Binder, name: &str) -> String {
        let sym = binder.lookup_qualified(name).unwrap();
        let ty = binder.type_of(sym);
        binder.display_type(ty)
    }

    // ── Type definitions ──

    #[test]
    fn test_named_and_container_types() {
        let mut binder = bind(
            "type Id = int64;
             type Ids = list<Id>[8];
             type Lookup = map<rstring, optional<Id>>;",
        );
        assert!(!binder.diagnostics().has_errors());
        assert_eq!(display(&mut binder, "Ids"), "list<int64>[8]");
        assert_eq!(display(&mut binder, "Lookup"), "map<rstring, optional<int64>>");
    }

    #[test]
    fn test_tuple_extension() {
        let mut binder = bind(
            "type A = tuple<int32 a>;
             type B = tuple<rstring b>;
             type AB = tuple<A, B>;",
        );
        assert!(!binder.diagnostics().has_errors());
        assert_eq!(display(&mut binder, "AB"), "tuple<int32 a, rstring b>");
    }

    #[test]
    fn test_extension_with_same_attribute_twice() {
        let mut binder = bind(
            "type A = tuple<int32 a>;
             type A2 = tuple<int32 a, float64 c>;
             type Both = tuple<A, A2>;
             type Clash = tuple<A, tuple<rstring a>>;",
        );
        assert_eq!(display(&mut binder, "Both"), "tuple<int32 a, float64 c>");
        assert_eq!(binder.diagnostics().with_code("E2024").count(), 1);
    }

    #[test]
    fn test_extendee_must_be_tuple() {
        let binder = bind("type I = int32; type T = tuple<I>;");
        assert_eq!(binder.diagnostics().with_code("E2023").count(), 1);
    }

    // ── Cycles ──

    #[test]
    fn test_mutual_definition_reported_once() {
        let mut binder = bind("type A = B; type B = A;");
        assert_eq!(binder.diagnostics().with_code("E2005").count(), 1);
        let a = binder.lookup_qualified("A").unwrap();
        let ty = binder.type_of(a);
        assert!(binder.types().is_unknown(ty));
        assert_eq!(binder.diagnostics().with_code("E2005").count(), 1);
    }

    #[test]
    fn test_self_referencing_tuple() {
        let binder = bind("type T = tuple<int32 a, T next>;");
        assert_eq!(binder.diagnostics().with_code("E2005").count(), 1);
    }

    #[test]
    fn test_expansion_runs_once() {
        let mut binder = bind("type T = tuple<int32 a>; type U = T;");
        let t = binder.lookup_qualified("T").unwrap();
        let runs = binder.stats().runs(t);
        binder.type_of(t);
        binder.held_scope(t);
        assert_eq!(runs, 1);
        assert_eq!(binder.stats().runs(t), 1);
    }

    // ── Member scopes ──

    #[test]
    fn test_enum_members() {
        let mut binder = bind("type Color = enum { red, green };");
        let color = binder.lookup_qualified("Color").unwrap();
        let scope = binder.held_scope(color).unwrap();
        assert!(binder.table().has(scope, "green"));
        assert_eq!(display(&mut binder, "Color"), "enum{red, green}");
    }

    #[test]
    fn test_type_scope_is_cached() {
        let mut binder = bind("type T = tuple<int32 a>;");
        let t = binder.lookup_qualified("T").unwrap();
        let ty = binder.type_of(t);
        let first = binder.type_scope(ty);
        assert!(first.is_some());
        assert_eq!(binder.type_scope(ty), first);
    }

    // ── Operator parameters ──

    #[test]
    fn test_declared_parameter_type() {
        let mut models = ModelRegistry::builtin();
        let mut beacon = (**models.get("spl.utility::Beacon").unwrap()).clone();
        beacon.parameters[0].ty = Some("float64".into());
        models.add(beacon);

        let mut binder = Binder::with_models(BinderConfig::default(), models);
        binder.bind();
        let op = binder.lookup_qualified("spl.utility::Beacon").unwrap();
        let formals: Vec<_> = binder
            .table()
            .symbols()
            .filter(|(_, s)| matches!(&s.kind, SymbolKind::PrimitiveFormal(f) if f.operator == op))
            .map(|(id, s)| (id, s.name.clone()))
            .collect();
        assert_eq!(formals.len(), 3);
        for (id, name) in formals {
            let ty = binder.type_of(id);
            match name.as_str() {
                "period" => assert_eq!(binder.display_type(ty), "float64"),
                _ => assert!(binder.types().is_unknown(ty)),
            }
        }
    }
}
