//! Composite instantiation
//!
//! A composite definition's instance part (its graph and non-static types) is
//! a template. Every invocation of the composite, and every main composite,
//! gets its own renumbered copy bound under a fresh instance scope, so two
//! instances never share symbols.
//!
//! Inside an instance, a composite parameter stands for the actual the caller
//! supplied. [`Binder::actual`] hands out a rewritten copy of that actual in
//! which streams and attributes of the caller are replaced by what the
//! instance sees them as.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use super::diagnostic::{Diagnostic, ErrorCode};
use super::error::BindError;
use super::scope::ScopeId;
use super::symbols::{
    ActualArg, AttributeAccessData, CompositeBody, CompositeInstanceData, CompositePortDecl,
    InputPortData, InvokeInput, InvokeOutput, InvokeSource, Location, SymbolId, SymbolKind,
};
use super::Binder;
use crate::parser::ast::{
    Expr, ExprKind, FormalMode, Ident, OpActual, Renumber, TupleField, TypeExpr,
};
use crate::types::TypeId;

/// One `param name: value;` of an invocation whose target is a composite
#[derive(Debug, Clone)]
pub(crate) struct CallParam {
    pub(crate) name: String,
    pub(crate) value: OpActual,
    /// Scope the value was bound in
    pub(crate) scope: ScopeId,
    pub(crate) location: Location,
}

/// Invocation creating a nested instance
#[derive(Debug, Clone)]
pub(crate) struct CallSite {
    pub(crate) invoke: SymbolId,
    /// Invocation name; the last part of the instance's full name
    pub(crate) name: String,
    pub(crate) location: Location,
    pub(crate) params: Vec<CallParam>,
    pub(crate) inputs: Vec<InvokeInput>,
    pub(crate) outputs: Vec<InvokeOutput>,
}

type Actuals = IndexMap<String, ActualArg, FxBuildHasher>;

impl Binder {
    /// Instantiate a composite, binding a fresh copy of its body
    ///
    /// `call` is `None` for a main composite. Returns `None` when the
    /// composite would instantiate itself.
    #[instrument(skip(self, call), fields(composite = %self.table.symbol(def).name))]
    pub(crate) fn instantiate(
        &mut self,
        def: SymbolId,
        call: Option<CallSite>,
    ) -> Option<SymbolId> {
        let symbol = self.table.symbol(def);
        let name = symbol.name.clone();
        let location = call.as_ref().map(|c| c.location).unwrap_or(symbol.location);
        let (SymbolKind::CompositeDef(data), Some(def_scope)) = (&symbol.kind, symbol.held) else {
            return None;
        };
        let template = Arc::clone(&data.template);
        let formals = data.formals.clone();
        let input_decls = data.inputs.clone();
        let output_decls = data.outputs.clone();
        let file = data.file;

        let parent = self.context.current_composite_instance(&self.table);
        if self.instantiates_itself(def, parent) {
            self.report(BindError::RecursiveComposite { name, location });
            return None;
        }

        let full_name = match (&call, parent) {
            (None, _) => String::new(),
            (Some(call), Some(parent)) => match &self.table.symbol(parent).kind {
                SymbolKind::CompositeInstance(p) if !p.full_name.is_empty() => {
                    format!("{}.{}", p.full_name, call.name)
                }
                _ => call.name.clone(),
            },
            (Some(call), None) => call.name.clone(),
        };

        let mut body = CompositeBody::clone(&template);
        body.renumber(&mut self.ids);
        let body = Arc::new(body);

        let actuals = self.collect_actuals(&name, &formals, call.as_ref(), def_scope, location);
        let mut output_ports = IndexMap::default();
        if let Some(call) = &call {
            for (decl, output) in output_decls.iter().zip(&call.outputs) {
                output_ports.insert(decl.name.clone(), output.stream);
            }
        }

        let data = CompositeInstanceData {
            definition: def,
            full_name: full_name.clone(),
            parent,
            invoke: call.as_ref().map(|c| c.invoke),
            actuals,
            output_ports,
            input_ports: Vec::new(),
            body: Arc::clone(&body),
            invokes: Vec::new(),
        };
        let (instance, scope) = self.table.add_symbol_with_scope(
            name,
            location,
            SymbolKind::CompositeInstance(Box::new(data)),
            Some(def_scope),
        );
        self.instances.push(instance);
        if let SymbolKind::CompositeDef(data) = &mut self.table.symbol_mut(def).kind {
            data.instances.push(instance);
        }

        let input_ports = self.declare_input_ports(instance, scope, &input_decls, call.as_ref());
        if let SymbolKind::CompositeInstance(data) = &mut self.table.symbol_mut(instance).kind {
            data.input_ports = input_ports;
        }

        let errors = self.diagnostics.error_count();
        self.in_excursion(scope, file, |b| b.bind_instance_body(instance, &body));
        if call.is_some() && self.diagnostics.error_count() > errors {
            self.note_instance_errors(instance, location);
        }
        debug!(instance = %full_name, "instantiated composite");
        Some(instance)
    }

    fn instantiates_itself(&self, def: SymbolId, parent: Option<SymbolId>) -> bool {
        let mut cursor = parent;
        while let Some(instance) = cursor {
            let SymbolKind::CompositeInstance(data) = &self.table.symbol(instance).kind else {
                break;
            };
            if data.definition == def {
                return true;
            }
            cursor = data.parent;
        }
        false
    }

    /// First supplied actual per formal, else its default
    fn collect_actuals(
        &mut self,
        composite: &str,
        formals: &[SymbolId],
        call: Option<&CallSite>,
        def_scope: ScopeId,
        location: Location,
    ) -> Actuals {
        let mut actuals = Actuals::default();
        for &formal in formals {
            let symbol = self.table.symbol(formal);
            let SymbolKind::CompositeFormal(data) = &symbol.kind else {
                continue;
            };
            let name = symbol.name.clone();
            let default = data.default.clone();
            let supplied = call.and_then(|c| {
                c.params
                    .iter()
                    .find(|p| name.strip_prefix('$') == Some(p.name.as_str()))
            });
            if let Some(param) = supplied {
                if let Some(expected) = actual_kind_mismatch(&data.mode, &param.value) {
                    let error = BindError::ActualKindMismatch {
                        name: param.name.clone(),
                        composite: composite.to_string(),
                        expected,
                        location: param.location,
                    };
                    self.report(error);
                }
            }
            let arg = match (supplied, default) {
                (Some(param), _) => ActualArg {
                    value: param.value.clone(),
                    scope: param.scope,
                    is_default: false,
                },
                (None, Some(value)) => ActualArg {
                    value,
                    scope: def_scope,
                    is_default: true,
                },
                (None, None) => {
                    self.report(BindError::MissingCompositeParameter {
                        name,
                        composite: composite.to_string(),
                        location,
                    });
                    continue;
                }
            };
            trace!(formal = %name, is_default = arg.is_default, "recorded actual");
            actuals.insert(name, arg);
        }
        actuals
    }

    fn declare_input_ports(
        &mut self,
        instance: SymbolId,
        scope: ScopeId,
        decls: &[CompositePortDecl],
        call: Option<&CallSite>,
    ) -> Vec<SymbolId> {
        let mut ports = Vec::with_capacity(decls.len());
        for (index, decl) in decls.iter().enumerate() {
            let input = call.and_then(|c| c.inputs.get(index));
            let streams = input.map(|i| i.streams.clone()).unwrap_or_default();
            let alias = input.and_then(|i| i.alias.clone());
            let (ty, members) = self.stream_shape(&streams, decl.tuple.as_ref());
            let port = self.table.add_symbol(
                decl.name.clone(),
                decl.location,
                SymbolKind::CompositeInputPort(InputPortData {
                    instance,
                    index,
                    streams,
                    alias,
                    ty,
                }),
            );
            if let Some(members) = members {
                self.table.set_held(port, members);
            }
            self.declare(scope, port);
            ports.push(port);
        }
        ports
    }

    /// Common type and member scope of the streams feeding a port; the
    /// declared tuple when nothing feeds it
    fn stream_shape(
        &mut self,
        streams: &[SymbolId],
        declared: Option<&TypeExpr>,
    ) -> (TypeId, Option<ScopeId>) {
        let unknown = self.types.unknown_type();
        if streams.is_empty() {
            return match declared {
                Some(te) => (self.eval_type_expr(te), self.type_expr_scope(te)),
                None => (unknown, None),
            };
        }
        let mut types = Vec::with_capacity(streams.len());
        let mut scopes = Vec::with_capacity(streams.len());
        for &stream in streams {
            types.push(self.type_of(stream));
            scopes.push(self.held_scope(stream));
        }
        let ty = if types.iter().all(|t| *t == types[0]) {
            types[0]
        } else {
            unknown
        };
        let members = if scopes.iter().all(|s| *s == scopes[0]) && scopes[0].is_some() {
            scopes[0]
        } else {
            self.type_scope(ty)
        };
        (ty, members)
    }

    /// Types first, then every invocation's outputs, then the invocations
    fn bind_instance_body(&mut self, instance: SymbolId, body: &Arc<CompositeBody>) {
        let scope = self.current_scope();
        for td in &body.types {
            self.declare_type_def(td, scope, false);
        }
        let mut invokes = Vec::with_capacity(body.graph.len());
        for index in 0..body.graph.len() {
            let source = InvokeSource {
                body: Arc::clone(body),
                index,
            };
            if let Some(invoke) = self.declare_invoke(source, Some(instance)) {
                invokes.push(invoke);
            }
        }
        self.flush_deferred();
        for td in &body.types {
            if let Some(sym) = self.table.node_symbol(td.id) {
                self.type_of(sym);
            }
        }
        if let SymbolKind::CompositeInstance(data) = &mut self.table.symbol_mut(instance).kind {
            data.invokes = invokes.clone();
        }
        for invoke in invokes {
            self.expand_invoke(invoke);
        }
    }

    fn note_instance_errors(&mut self, instance: SymbolId, location: Location) {
        let mut backtrace = Vec::new();
        let mut cursor = Some(instance);
        while let Some(current) = cursor {
            let symbol = self.table.symbol(current);
            let SymbolKind::CompositeInstance(data) = &symbol.kind else {
                break;
            };
            let shown = if data.full_name.is_empty() {
                "<main>"
            } else {
                data.full_name.as_str()
            };
            backtrace.push(format!("in instance '{}' of composite '{}'", shown, symbol.name));
            cursor = data.parent;
        }
        let name = self.table.symbol(instance).name.clone();
        let mut note = Diagnostic::note(format!("errors instantiating composite '{}'", name))
            .with_code(ErrorCode("N2001"))
            .with_primary_label(location, "instantiated here");
        for line in backtrace {
            note = note.with_note(line);
        }
        self.diagnostics.push(note);
    }

    // ========================================================================
    // Stream names
    // ========================================================================

    /// Graph-wide name of a stream declared inside `instance`
    ///
    /// A stream bound to an output port takes the caller's stream name;
    /// anything else is qualified by the instance's full name.
    pub(crate) fn full_stream_name(&self, instance: SymbolId, local: &str) -> String {
        let SymbolKind::CompositeInstance(data) = &self.table.symbol(instance).kind else {
            return local.to_string();
        };
        if let Some(&stream) = data.output_ports.get(local) {
            if let SymbolKind::Stream(s) = &self.table.symbol(stream).kind {
                return s.full_name.clone();
            }
        }
        if data.full_name.is_empty() {
            local.to_string()
        } else {
            format!("{}.{}", data.full_name, local)
        }
    }

    /// Port of `instance` that `stream` reaches it through
    fn port_name_for(&self, instance: SymbolId, stream: SymbolId, local: &str) -> Option<String> {
        let SymbolKind::CompositeInstance(data) = &self.table.symbol(instance).kind else {
            return None;
        };
        if let Some((port, _)) = data.output_ports.iter().find(|(_, s)| **s == stream) {
            return Some(port.clone());
        }
        data.input_ports.iter().find_map(|&port| {
            let symbol = self.table.symbol(port);
            match &symbol.kind {
                SymbolKind::CompositeInputPort(p)
                    if p.streams.contains(&stream) || p.alias.as_deref() == Some(local) =>
                {
                    Some(symbol.name.clone())
                }
                _ => None,
            }
        })
    }

    // ========================================================================
    // Actuals
    // ========================================================================

    /// The actual of `formal` in `instance`, rewritten for use in `use_scope`
    ///
    /// The copy has fresh node ids; the recorded actual is left untouched.
    pub(crate) fn actual(
        &mut self,
        instance: SymbolId,
        formal: &str,
        use_scope: ScopeId,
    ) -> Option<OpActual> {
        let SymbolKind::CompositeInstance(data) = &self.table.symbol(instance).kind else {
            return None;
        };
        let arg = data.actuals.get(formal)?.clone();
        match &arg.value {
            OpActual::Exprs(exprs) => {
                let mut rewritten = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    rewritten.push(self.rewrite_expr(expr, instance, use_scope));
                }
                Some(OpActual::Exprs(rewritten))
            }
            OpActual::Type(_) => Some(arg.value),
        }
    }

    fn rewrite_expr(&mut self, expr: &Expr, instance: SymbolId, scope: ScopeId) -> Expr {
        let bound = self.table.node_symbol(expr.id);

        // a parameter of the calling composite stands for its own actual
        if let Some(sym) = bound {
            if matches!(self.table.symbol(sym).kind, SymbolKind::CompositeFormal(_)) {
                if let Some(OpActual::Exprs(exprs)) = self.substitutions.get(&expr.id) {
                    if let [single] = exprs.as_slice() {
                        let single = single.clone();
                        return self.rewrite_expr(&single, instance, scope);
                    }
                }
            }
        }

        let id = self.ids.fresh();
        let kind = match &expr.kind {
            ExprKind::Ident(ident) => {
                let (name, target) = self.rewrite_leaf(ident, bound, instance, scope);
                let leaf = Ident {
                    id: self.ids.fresh(),
                    name,
                    span: ident.span,
                };
                if let Some(target) = target {
                    self.table.bind_node(leaf.id, target);
                    self.table.bind_node(id, target);
                }
                ExprKind::Ident(leaf)
            }
            ExprKind::Qualified(path) => {
                let mut copy = path.clone();
                copy.renumber(&mut self.ids);
                if let Some(sym) = self.table.node_symbol(path.name.id) {
                    self.table.bind_node(copy.name.id, sym);
                }
                ExprKind::Qualified(copy)
            }
            ExprKind::Literal(literal) => ExprKind::Literal(literal.clone()),
            ExprKind::Attribute { base, name } => {
                let new_base = self.rewrite_expr(base, instance, scope);
                let leaf = Ident {
                    id: self.ids.fresh(),
                    ..name.clone()
                };
                let old_base = self.table.node_symbol(base.id);
                let rebased = self.table.node_symbol(new_base.id);
                let attribute = match rebased {
                    Some(rebased) if Some(rebased) != old_base => {
                        self.rebind_attribute(rebased, &name.name, &leaf)
                    }
                    _ => bound,
                };
                if let Some(attribute) = attribute.or(bound) {
                    self.table.bind_node(leaf.id, attribute);
                    self.table.bind_node(id, attribute);
                }
                ExprKind::Attribute {
                    base: Box::new(new_base),
                    name: leaf,
                }
            }
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: Box::new(self.rewrite_expr(callee, instance, scope)),
                args: self.rewrite_all(args, instance, scope),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(self.rewrite_expr(operand, instance, scope)),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: Box::new(self.rewrite_expr(left, instance, scope)),
                right: Box::new(self.rewrite_expr(right, instance, scope)),
            },
            ExprKind::Assign { op, target, value } => ExprKind::Assign {
                op: *op,
                target: Box::new(self.rewrite_expr(target, instance, scope)),
                value: Box::new(self.rewrite_expr(value, instance, scope)),
            },
            ExprKind::Subscript { base, index } => ExprKind::Subscript {
                base: Box::new(self.rewrite_expr(base, instance, scope)),
                index: Box::new(self.rewrite_expr(index, instance, scope)),
            },
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => ExprKind::Conditional {
                cond: Box::new(self.rewrite_expr(cond, instance, scope)),
                then_expr: Box::new(self.rewrite_expr(then_expr, instance, scope)),
                else_expr: Box::new(self.rewrite_expr(else_expr, instance, scope)),
            },
            ExprKind::List(items) => ExprKind::List(self.rewrite_all(items, instance, scope)),
            ExprKind::TupleLiteral(fields) => {
                let mut copies = Vec::with_capacity(fields.len());
                for field in fields {
                    let name = Ident {
                        id: self.ids.fresh(),
                        ..field.name.clone()
                    };
                    let value = self.rewrite_expr(&field.value, instance, scope);
                    copies.push(TupleField { name, value });
                }
                ExprKind::TupleLiteral(copies)
            }
        };

        if self.table.node_symbol(id).is_none() {
            if let Some(sym) = bound {
                self.table.bind_node(id, sym);
            }
        }
        Expr {
            id,
            kind,
            span: expr.span,
        }
    }

    fn rewrite_all(&mut self, exprs: &[Expr], instance: SymbolId, scope: ScopeId) -> Vec<Expr> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            out.push(self.rewrite_expr(expr, instance, scope));
        }
        out
    }

    /// New name and binding of one identifier of an actual
    ///
    /// A stream becomes the port it enters the instance through, looked up
    /// from the use site. An indirect is rebound to the use site's indirect of
    /// the same name when there is one.
    fn rewrite_leaf(
        &self,
        ident: &Ident,
        bound: Option<SymbolId>,
        instance: SymbolId,
        scope: ScopeId,
    ) -> (String, Option<SymbolId>) {
        let Some(old) = bound else {
            return (ident.name.clone(), None);
        };
        let kind = &self.table.symbol(old).kind;
        if kind.is_stream_like() {
            let name = self
                .port_name_for(instance, old, &ident.name)
                .unwrap_or_else(|| ident.name.clone());
            let found = self
                .table
                .lookup(scope, &name)
                .filter(|s| self.table.symbol(*s).kind.is_stream_like());
            trace!(from = %ident.name, to = %name, "rewrote stream in actual");
            return (name, found.or(Some(old)));
        }
        if matches!(kind, SymbolKind::Indirect(_)) {
            let found = self
                .table
                .lookup(scope, &ident.name)
                .filter(|s| matches!(self.table.symbol(*s).kind, SymbolKind::Indirect(_)));
            return (ident.name.clone(), found.or(Some(old)));
        }
        (ident.name.clone(), Some(old))
    }

    /// `base.name` against a base the rewrite replaced
    fn rebind_attribute(&mut self, base: SymbolId, name: &str, leaf: &Ident) -> Option<SymbolId> {
        let members = self.held_scope(base)?;
        let attribute = self.table.scope(members).get(name)?;
        let location = Location::new(self.current_file(), leaf.span);
        Some(self.table.add_symbol(
            name,
            location,
            SymbolKind::AttributeAccess(AttributeAccessData { base, attribute }),
        ))
    }
}

/// What a formal expects when `actual` can never be it
fn actual_kind_mismatch(mode: &FormalMode, actual: &OpActual) -> Option<&'static str> {
    match (mode, actual) {
        (FormalMode::Type, OpActual::Type(_)) => None,
        // a lone name may still turn out to be a type
        (FormalMode::Type, OpActual::Exprs(exprs)) => match exprs.as_slice() {
            [expr] if matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Qualified(_)) => None,
            _ => Some("a type"),
        },
        (FormalMode::Expression(_), OpActual::Type(_)) => Some("an expression"),
        (FormalMode::Attribute, OpActual::Type(_)) => Some("an attribute"),
        (FormalMode::Function, OpActual::Type(_)) => Some("a function"),
        (FormalMode::Operator, OpActual::Type(_)) => Some("an operator"),
        (_, OpActual::Exprs(_)) => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::{Binder, BinderConfig, SymbolId, SymbolKind};
    use crate::parser::ast::OpActual;

    fn bind(source: &str) -> Binder {
        let mut binder = Binder::new(BinderConfig::default());
        binder.add_source("main.spl", source).unwrap();
        binder.bind();
        binder
    }

    fn instances_of(binder: &Binder, name: &str) -> Vec<SymbolId> {
        binder
            .instances()
            .iter()
            .copied()
            .filter(|i| binder.table().symbol(*i).name == name)
            .collect()
    }

    fn full_name(binder: &Binder, instance: SymbolId) -> String {
        match &binder.table().symbol(instance).kind {
            SymbolKind::CompositeInstance(data) => data.full_name.clone(),
            _ => panic!("expected instance"),
        }
    }

    fn stream_full_names(binder: &Binder) -> Vec<String> {
        let mut names: Vec<String> = binder
            .table()
            .symbols()
            .filter_map(|(_, s)| match &s.kind {
                SymbolKind::Stream(data) => Some(data.full_name.clone()),
                _ => None,
            })
            .collect();
        names.sort();
        names
    }

    const PIPE: &str = "namespace ns;
        type T = tuple<int32 a>;
        composite C(input stream<T> In; output stream<T> Out) {
            graph stream<T> Out = Functor(In) { }
        }";

    // ── Instances ──

    #[test]
    fn test_two_instances_are_independent() {
        let binder = bind(&format!(
            "{}
             composite Main {{
                graph
                    stream<T> Src = Beacon() {{ }}
                    stream<T> A = C(Src) {{ }}
                    stream<T> B = C(Src) {{ }}
             }}",
            PIPE
        ));
        assert!(!binder.diagnostics().has_errors());
        let cs = instances_of(&binder, "C");
        assert_eq!(cs.len(), 2);
        assert_eq!(full_name(&binder, cs[0]), "A");
        assert_eq!(full_name(&binder, cs[1]), "B");

        let invokes = |i: SymbolId| match &binder.table().symbol(i).kind {
            SymbolKind::CompositeInstance(data) => data.invokes.clone(),
            _ => Vec::new(),
        };
        let (first, second) = (invokes(cs[0]), invokes(cs[1]));
        assert_eq!(first.len(), 1);
        assert_ne!(first, second);
        assert_ne!(
            binder.table().symbol(cs[0]).held,
            binder.table().symbol(cs[1]).held
        );
    }

    #[test]
    fn test_output_ports_take_caller_stream_names() {
        let binder = bind(&format!(
            "{}
             composite Main {{
                graph
                    stream<T> Src = Beacon() {{ }}
                    stream<T> A = C(Src) {{ }}
             }}",
            PIPE
        ));
        // the caller's A and C's Out are the same graph stream
        assert_eq!(stream_full_names(&binder), vec!["A", "A", "Src"]);
    }

    #[test]
    fn test_nested_full_names() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite Inner(output stream<T> O) {
                graph
                    stream<T> Mid = Beacon() { }
                    stream<T> O = Functor(Mid) { }
             }
             composite Outer(output stream<T> O) {
                graph stream<T> O as Q = Inner() { }
             }
             composite Main {
                graph stream<T> P = Outer() { }
             }",
        );
        assert!(!binder.diagnostics().has_errors());
        let inner = instances_of(&binder, "Inner");
        assert_eq!(full_name(&binder, inner[0]), "P.Q");
        assert!(stream_full_names(&binder).contains(&"P.Q.Mid".to_string()));
    }

    #[test]
    fn test_recursive_composite() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite R(output stream<T> O) { graph stream<T> O = R() { } }
             composite Main { graph stream<T> X = R() { } }",
        );
        assert_eq!(binder.diagnostics().with_code("E2018").count(), 1);
        assert_eq!(binder.diagnostics().with_code("N2001").count(), 1);
    }

    #[test]
    fn test_instance_errors_get_a_note() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite Broken(output stream<T> O) { graph stream<T> O = Functor(Nowhere) { } }
             composite Main { graph stream<T> X = Broken() { } }",
        );
        let notes: Vec<_> = binder.diagnostics().with_code("N2001").collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notes().len(), 2);
    }

    #[test]
    fn test_invisible_composite() {
        let mut binder = Binder::new(BinderConfig::default());
        binder
            .add_source(
                "a.spl",
                "namespace a;
                 type T = tuple<int32 x>;
                 composite Hidden(output stream<T> O) { graph stream<T> O = Beacon() { } }
                 public composite Shown(output stream<T> O) { graph stream<T> O = Beacon() { } }",
            )
            .unwrap();
        binder
            .add_source(
                "b.spl",
                "namespace b;
                 use a::T;
                 composite Main {
                    graph
                        stream<T> X = a::Hidden() { }
                        stream<T> Y = a::Shown() { }
                 }",
            )
            .unwrap();
        binder.bind();
        assert_eq!(binder.diagnostics().with_code("E2019").count(), 1);
    }

    // ── Parameters ──

    #[test]
    fn test_missing_and_default_parameters() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite P(output stream<T> O) {
                param
                    expression<int32> $needed;
                    expression<int32> $optional : 3;
                graph stream<T> O = Beacon() { }
             }
             composite Main { graph stream<T> X = P() { } }",
        );
        assert_eq!(binder.diagnostics().with_code("E2017").count(), 1);
        let p = instances_of(&binder, "P")[0];
        let SymbolKind::CompositeInstance(data) = &binder.table().symbol(p).kind else {
            panic!("expected instance");
        };
        assert!(data.actuals["$optional"].is_default);
        assert!(!data.actuals.contains_key("$needed"));
    }

    #[test]
    fn test_actual_of_wrong_kind_reported_at_parameter() {
        let source = "type T = tuple<int32 a>;
             composite P(output stream<T> O) {
                param
                    type $Shape;
                    expression<int32> $n;
                graph stream<T> O = Beacon() { }
             }
             composite Main {
                graph stream<T> X = P() {
                    param Shape: 1 + 2;
                          n: tuple<int32 b>;
                }
             }";
        let binder = bind(source);
        let mismatches: Vec<_> = binder.diagnostics().with_code("E2030").collect();
        assert_eq!(mismatches.len(), 2);
        assert!(mismatches[0].message().contains("expects a type"));
        assert!(mismatches[1].message().contains("expects an expression"));

        let starts: Vec<usize> = mismatches
            .iter()
            .map(|d| d.inner().labels[0].range.start)
            .collect();
        assert_eq!(
            starts,
            vec![
                source.find("Shape: 1").unwrap(),
                source.find("n: tuple").unwrap()
            ]
        );
    }

    #[test]
    fn test_named_type_actual_is_accepted() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite P(output stream<T> O) {
                param type $S;
                graph stream<T> O = Beacon() { }
             }
             composite Main { graph stream<T> X = P() { param S: T; } }",
        );
        assert_eq!(binder.diagnostics().with_code("E2030").count(), 0);
    }

    #[test]
    fn test_first_actual_wins() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite P(output stream<T> O) {
                param expression<int32> $n;
                graph stream<T> O = Beacon() { }
             }
             composite Main { graph stream<T> X = P() { param n: 1; n: 2; } }",
        );
        assert_eq!(binder.diagnostics().with_code("E2010").count(), 1);
        let p = instances_of(&binder, "P")[0];
        let SymbolKind::CompositeInstance(data) = &binder.table().symbol(p).kind else {
            panic!("expected instance");
        };
        let OpActual::Exprs(exprs) = &data.actuals["$n"].value else {
            panic!("expected expressions");
        };
        assert_eq!(format!("{:?}", exprs[0].kind), "Literal(Int(1))");
    }

    #[test]
    fn test_formal_use_is_rewritten_to_instance_attribute() {
        let binder = bind(
            "type T = tuple<int32 a>;
             composite F(input stream<T> In; output stream<T> Out) {
                param expression<int32> $key;
                graph stream<T> Out = Functor(In) { param filter: $key > 0; }
             }
             composite Main {
                graph
                    stream<T> Src = Beacon() { }
                    stream<T> X = F(Src) { param key: a; }
             }",
        );
        assert!(!binder.diagnostics().has_errors());

        let substituted: Vec<&OpActual> = binder.substitutions.values().collect();
        assert_eq!(substituted.len(), 1);
        let OpActual::Exprs(exprs) = substituted[0] else {
            panic!("expected expressions");
        };
        let leaf = binder.symbol_at(exprs[0].id).unwrap();
        let SymbolKind::Indirect(data) = &binder.table().symbol(leaf).kind else {
            panic!("expected indirect");
        };
        assert!(matches!(
            binder.table().symbol(data.origins[0].origin).kind,
            SymbolKind::CompositeInputPort(_)
        ));
    }
}
