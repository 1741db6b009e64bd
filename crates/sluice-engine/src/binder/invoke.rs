//! Operator invocations
//!
//! An invocation is declared in two steps. [`Binder::declare_invoke`] runs
//! with the rest of the graph and only makes the output streams visible, so
//! invocations may consume streams declared after them. [`Binder::expand_invoke`]
//! binds everything else on first demand: operator, inputs, the expression
//! scope built from input attributes, and every clause.
//!
//! Scopes of one invocation:
//!
//! ```text
//! instance scope
//!   └─ labels      port aliases
//!        └─ expr   input attributes, custom literals
//!             ├─ state    state variables
//!             │    ├─ logic clauses
//!             │    └─ output right-hand sides
//!             ├─ window clauses
//!             └─ actual parameters
//! ```

use std::sync::Arc;
use tracing::{debug, trace};

use super::composite::{CallParam, CallSite};
use super::error::BindError;
use super::expansion::{unit_slot, Expansion};
use super::guard::ClauseLabels;
use super::model::OperatorModel;
use super::scope::ScopeId;
use super::symbols::{
    ActualConfigData, ActualParamData, AttributeAssignData, InvokeInput, InvokeOutput,
    InvokeSource, Location, LogicClauseData, OpInvokeData, OutputClauseData, PortAliasData,
    StreamData, SymbolId, SymbolKind,
};
use super::Binder;
use crate::parser::ast::{
    ConfigItem, Expr, ExprKind, FormalMode, Ident, LogicItem, OpActual, OpInvoke, OutputItem,
    PathName, Stmt, WindowItem,
};
use crate::types::TypeId;

/// What the clauses of one invocation are bound against
#[derive(Debug)]
struct Invocation {
    sym: SymbolId,
    labels: ScopeId,
    expr_scope: ScopeId,
    state_scope: ScopeId,
    target: Option<SymbolId>,
    target_name: String,
    model: Option<Arc<OperatorModel>>,
    inputs: Vec<InvokeInput>,
    outputs: Vec<InvokeOutput>,
}

impl Invocation {
    fn is_custom(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.is_custom())
    }
}

/// Operator an invocation names
enum Target {
    Primitive(SymbolId, Arc<OperatorModel>),
    Composite(SymbolId),
}

impl Binder {
    // ========================================================================
    // Declaration
    // ========================================================================

    /// Declare one invocation of a graph and its output streams
    ///
    /// `instance` is the composite instance the graph belongs to; it decides
    /// the full names of the output streams.
    pub(crate) fn declare_invoke(
        &mut self,
        source: InvokeSource,
        instance: Option<SymbolId>,
    ) -> Option<SymbolId> {
        let body = Arc::clone(&source.body);
        let op = body.graph.get(source.index)?;
        let location = self.location(op.span);
        let scope = self.current_scope();
        let name = op.invocation_name().unwrap_or_default().to_string();

        let data = OpInvokeData {
            node: op.id,
            source,
            file: self.current_file(),
            target: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            expr_scope: None,
            state_scope: None,
            instance: None,
            clauses: Vec::new(),
            expansion: Expansion::NotStarted,
        };
        let (sym, labels) = self.table.add_symbol_with_scope(
            name,
            location,
            SymbolKind::OpInvoke(Box::new(data)),
            Some(scope),
        );
        self.table.bind_node(op.id, sym);
        for annotation in &op.annotations {
            self.declare_annotation(annotation);
        }
        if let Some(alias) = &op.alias {
            let alias_location = self.location(alias.span);
            self.check_plain_name(&alias.name, alias_location);
            self.table.bind_node(alias.id, sym);
        }

        let mut outputs = Vec::with_capacity(op.outputs.len());
        for (port, out) in op.outputs.iter().enumerate() {
            let out_location = self.location(out.name.span);
            self.check_plain_name(&out.name.name, out_location);
            self.declare_type_expr(&out.ty.tuple);
            let full_name = match instance {
                Some(instance) => self.full_stream_name(instance, &out.name.name),
                None => out.name.name.clone(),
            };
            let stream = self.table.add_symbol(
                out.name.name.clone(),
                out_location,
                SymbolKind::Stream(StreamData {
                    tuple: out.ty.tuple.clone(),
                    full_name,
                    invoke: Some(sym),
                    port,
                }),
            );
            self.declare(scope, stream);
            self.table.bind_node(out.id, stream);
            self.table.bind_node(out.name.id, stream);

            if let Some(alias) = &out.alias {
                self.declare_port_alias(labels, sym, alias, port, true);
            }
            outputs.push(InvokeOutput {
                name: out.name.name.clone(),
                alias: out.alias.as_ref().map(|a| a.name.clone()),
                stream,
                location: out_location,
            });
        }

        if let SymbolKind::OpInvoke(data) = &mut self.table.symbol_mut(sym).kind {
            data.outputs = outputs;
        }
        trace!(invoke = %sym, "declared invocation");
        Some(sym)
    }

    fn declare_port_alias(
        &mut self,
        labels: ScopeId,
        invoke: SymbolId,
        alias: &Ident,
        port: usize,
        output: bool,
    ) -> SymbolId {
        let location = self.location(alias.span);
        self.check_plain_name(&alias.name, location);
        let sym = self.table.add_symbol(
            alias.name.clone(),
            location,
            SymbolKind::PortAlias(PortAliasData {
                invoke,
                port,
                output,
            }),
        );
        if let Err(previous) = self.table.insert(labels, sym) {
            let previous = self.table.symbol(previous).location;
            self.report(BindError::DuplicatePortName {
                name: alias.name.clone(),
                location,
                previous,
            });
        }
        self.table.bind_node(alias.id, sym);
        sym
    }

    // ========================================================================
    // Expansion
    // ========================================================================

    /// Bind the body of an invocation, once
    pub(crate) fn expand_invoke(&mut self, sym: SymbolId) {
        let symbol = self.table.symbol(sym);
        let (SymbolKind::OpInvoke(data), Some(labels)) = (&symbol.kind, symbol.held) else {
            return;
        };
        let source = data.source.clone();
        let file = data.file;
        let Some(parent) = self.table.scope(labels).parent() else {
            return;
        };
        self.run_expansion(sym, unit_slot, (), |b| {
            b.in_excursion(parent, file, |b| b.bind_invoke(sym, labels, &source))
        });
    }

    fn bind_invoke(&mut self, sym: SymbolId, labels: ScopeId, source: &InvokeSource) {
        let body = Arc::clone(&source.body);
        let Some(op) = body.graph.get(source.index) else {
            return;
        };
        let location = self.location(op.span);
        debug!(invoke = %self.table.symbol(sym).name, "binding invocation");

        let target = self.resolve_operator(&op.operator);
        let (target_sym, model) = match &target {
            Some(Target::Primitive(s, model)) => (Some(*s), Some(Arc::clone(model))),
            Some(Target::Composite(s)) => (Some(*s), None),
            None => (None, None),
        };
        let target_name = match target_sym {
            Some(t) => match &self.table.symbol(t).kind {
                SymbolKind::PrimitiveOperator(data) => data.full_name.clone(),
                _ => self.table.symbol(t).name.clone(),
            },
            None => op.operator.display(),
        };

        let inputs = self.bind_inputs(sym, labels, op);
        let outputs = match &self.table.symbol(sym).kind {
            SymbolKind::OpInvoke(data) => data.outputs.clone(),
            _ => Vec::new(),
        };

        let expr_scope = self.table.new_scope(Some(labels), Some(sym));
        for (port, input) in inputs.iter().enumerate() {
            for &stream in &input.streams {
                if let Some(members) = self.held_scope(stream) {
                    self.merge_members(expr_scope, members, stream, Some(port), input.location);
                }
            }
        }
        if let Some(Target::Primitive(operator, _)) = &target {
            if let SymbolKind::PrimitiveOperator(data) = &self.table.symbol(*operator).kind {
                let enums = data.enums;
                self.merge_members(expr_scope, enums, *operator, None, location);
            }
        }
        let state_scope = self.table.new_scope(Some(expr_scope), Some(sym));
        self.alias_scopes(labels, &inputs, &outputs);

        if let SymbolKind::OpInvoke(data) = &mut self.table.symbol_mut(sym).kind {
            data.target = target_sym;
            data.inputs = inputs.clone();
            data.expr_scope = Some(expr_scope);
            data.state_scope = Some(state_scope);
        }

        let inv = Invocation {
            sym,
            labels,
            expr_scope,
            state_scope,
            target: target_sym,
            target_name,
            model,
            inputs,
            outputs,
        };
        self.check_port_counts(&inv, &target, location);

        let mut used = ClauseLabels::default();
        let mut clauses = Vec::new();
        self.in_scope(state_scope, |b| {
            for item in &op.body.logic {
                if let Some(clause) = b.bind_logic_item(&inv, item, &mut used) {
                    clauses.push(clause);
                }
            }
        });
        for window in &op.body.windows {
            clauses.push(self.bind_window(&inv, window, &mut used));
        }
        let params = self.bind_params(&inv, op, &mut used);
        for item in &op.body.outputs {
            clauses.push(self.bind_output_item(&inv, item, &mut used));
        }
        let configs = self.in_scope(state_scope, |b| b.bind_configs(&op.body.configs, &mut used));
        clauses.extend(configs);

        if let SymbolKind::OpInvoke(data) = &mut self.table.symbol_mut(sym).kind {
            data.clauses = clauses;
        }

        if let Some(Target::Composite(def)) = target {
            let call = CallSite {
                invoke: sym,
                name: self.table.symbol(sym).name.clone(),
                location,
                params,
                inputs: inv.inputs.clone(),
                outputs: inv.outputs.clone(),
            };
            let instance = self.instantiate(def, Some(call));
            if let SymbolKind::OpInvoke(data) = &mut self.table.symbol_mut(sym).kind {
                data.instance = instance;
            }
        }
    }

    /// Operator named by an invocation: a primitive, a composite, or an
    /// operator-mode composite parameter standing for one of those
    fn resolve_operator(&mut self, path: &PathName) -> Option<Target> {
        let location = self.location(path.span);
        let sym = self.bind_path(path);
        let kind = &self.table.symbol(sym).kind;
        if kind.is_error() {
            return None;
        }
        let operator_formal = matches!(
            kind,
            SymbolKind::CompositeFormal(data) if matches!(data.mode, FormalMode::Operator)
        );
        let target = if operator_formal {
            let instance = self.context.current_composite_instance(&self.table)?;
            let formal = self.table.symbol(sym).name.clone();
            let scope = self.current_scope();
            let actual = self.actual(instance, &formal, scope)?;
            let OpActual::Exprs(exprs) = &actual else {
                return None;
            };
            let resolved = exprs.first().and_then(|e| self.table.node_symbol(e.id));
            self.substitutions.insert(path.name.id, actual.clone());
            resolved?
        } else {
            sym
        };

        match &self.table.symbol(target).kind {
            SymbolKind::PrimitiveOperator(data) => {
                Some(Target::Primitive(target, Arc::clone(&data.model)))
            }
            SymbolKind::CompositeDef(data) => {
                let namespace = self
                    .context
                    .current_namespace(&self.table)
                    .and_then(|ns| match &self.table.symbol(ns).kind {
                        SymbolKind::Namespace(n) => Some(n.full_name.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                if !data.is_public && data.namespace != namespace {
                    let error = BindError::InvisibleComposite {
                        name: self.table.symbol(target).name.clone(),
                        namespace: data.namespace.clone(),
                        location,
                    };
                    self.report(error);
                }
                Some(Target::Composite(target))
            }
            SymbolKind::ErrorDummy => None,
            _ => {
                self.report(BindError::NotAnOperator {
                    name: path.display(),
                    location,
                });
                None
            }
        }
    }

    fn bind_inputs(&mut self, sym: SymbolId, labels: ScopeId, op: &OpInvoke) -> Vec<InvokeInput> {
        let mut inputs = Vec::with_capacity(op.inputs.len());
        for (port, input) in op.inputs.iter().enumerate() {
            let mut streams = Vec::with_capacity(input.streams.len());
            for ident in &input.streams {
                let stream = self.bind_name(ident);
                let kind = &self.table.symbol(stream).kind;
                if kind.is_stream_like() {
                    streams.push(stream);
                } else if !kind.is_error() {
                    let location = self.location(ident.span);
                    self.report(BindError::UnknownPort {
                        name: ident.name.clone(),
                        location,
                    });
                }
            }
            if let Some(alias) = &input.alias {
                self.declare_port_alias(labels, sym, alias, port, false);
            }
            inputs.push(InvokeInput {
                streams,
                alias: input.alias.as_ref().map(|a| a.name.clone()),
                location: self.location(input.span),
            });
        }
        inputs
    }

    /// Member scopes of the port aliases
    fn alias_scopes(&mut self, labels: ScopeId, inputs: &[InvokeInput], outputs: &[InvokeOutput]) {
        let aliases: Vec<SymbolId> = self.table.scope(labels).iter().map(|(_, s)| s).collect();
        for alias in aliases {
            let SymbolKind::PortAlias(data) = &self.table.symbol(alias).kind else {
                continue;
            };
            let (port, output) = (data.port, data.output);
            if output {
                if let Some(out) = outputs.get(port) {
                    if let Some(members) = self.held_scope(out.stream) {
                        self.table.set_held(alias, members);
                    }
                }
                continue;
            }
            let Some(input) = inputs.get(port) else {
                continue;
            };
            let scope = self.table.new_scope(None, Some(alias));
            for &stream in &input.streams {
                if let Some(members) = self.held_scope(stream) {
                    self.merge_members(scope, members, stream, Some(port), input.location);
                }
            }
            self.table.set_held(alias, scope);
        }
    }

    fn check_port_counts(&mut self, inv: &Invocation, target: &Option<Target>, location: Location) {
        let (inputs_ok, outputs_ok, expected_in, expected_out) = match target {
            Some(Target::Primitive(_, model)) => (
                model.input_ports.accepts(inv.inputs.len()),
                model.output_ports.accepts(inv.outputs.len()),
                model.input_ports.ports.len(),
                model.output_ports.ports.len(),
            ),
            Some(Target::Composite(def)) => match &self.table.symbol(*def).kind {
                SymbolKind::CompositeDef(data) => (
                    data.inputs.len() == inv.inputs.len(),
                    data.outputs.len() == inv.outputs.len(),
                    data.inputs.len(),
                    data.outputs.len(),
                ),
                _ => return,
            },
            None => return,
        };
        if !inputs_ok {
            self.report(BindError::PortCountMismatch {
                name: inv.target_name.clone(),
                direction: "input",
                expected: expected_in,
                actual: inv.inputs.len(),
                location,
            });
        }
        if !outputs_ok {
            self.report(BindError::PortCountMismatch {
                name: inv.target_name.clone(),
                direction: "output",
                expected: expected_out,
                actual: inv.outputs.len(),
                location,
            });
        }
    }

    // ========================================================================
    // Port labels
    // ========================================================================

    /// Input port a clause label names: an input alias or a stream name
    fn resolve_port_label(&mut self, inv: &Invocation, label: &Ident) -> Option<usize> {
        let location = self.location(label.span);
        if let Some(alias) = self.table.scope(inv.labels).get(&label.name) {
            if let SymbolKind::PortAlias(data) = &self.table.symbol(alias).kind {
                if !data.output {
                    let port = data.port;
                    self.table.bind_node(label.id, alias);
                    return Some(port);
                }
            }
            self.report(BindError::PortDirectionMismatch {
                name: label.name.clone(),
                expected: "input",
                location,
            });
            return None;
        }

        let mut matches: Vec<(usize, SymbolId)> = Vec::new();
        for (port, input) in inv.inputs.iter().enumerate() {
            if let Some(&stream) = input
                .streams
                .iter()
                .find(|s| self.table.symbol(**s).name == label.name)
            {
                matches.push((port, stream));
            }
        }
        match matches.as_slice() {
            [(port, stream)] => {
                self.table.bind_node(label.id, *stream);
                Some(*port)
            }
            [] => {
                let error = if inv.outputs.iter().any(|o| o.name == label.name) {
                    BindError::PortDirectionMismatch {
                        name: label.name.clone(),
                        expected: "input",
                        location,
                    }
                } else {
                    BindError::UnknownPort {
                        name: label.name.clone(),
                        location,
                    }
                };
                self.report(error);
                None
            }
            _ => {
                self.report(BindError::MultiplePorts {
                    name: label.name.clone(),
                    location,
                });
                None
            }
        }
    }

    /// Output port an output clause names: an output stream name or alias
    fn resolve_output_label(&mut self, inv: &Invocation, label: &Ident) -> Option<usize> {
        let location = self.location(label.span);
        let found = inv
            .outputs
            .iter()
            .position(|o| o.name == label.name || o.alias.as_deref() == Some(label.name.as_str()));
        if let Some(port) = found {
            self.table.bind_node(label.id, inv.outputs[port].stream);
            return Some(port);
        }
        let names_input = inv.inputs.iter().any(|input| {
            input.alias.as_deref() == Some(label.name.as_str())
                || input
                    .streams
                    .iter()
                    .any(|s| self.table.symbol(*s).name == label.name)
        });
        let error = if names_input {
            BindError::PortDirectionMismatch {
                name: label.name.clone(),
                expected: "output",
                location,
            }
        } else {
            BindError::InvalidPortName {
                name: label.name.clone(),
                location,
            }
        };
        self.report(error);
        None
    }

    /// Type of an invocation port: the output stream's, or the common type of
    /// the streams feeding an input port
    pub(crate) fn port_type(&mut self, invoke: SymbolId, port: usize, output: bool) -> TypeId {
        let unknown = self.types.unknown_type();
        self.expand_invoke(invoke);
        let SymbolKind::OpInvoke(data) = &self.table.symbol(invoke).kind else {
            return unknown;
        };
        let streams: Vec<SymbolId> = if output {
            data.outputs.get(port).map(|o| vec![o.stream]).unwrap_or_default()
        } else {
            data.inputs.get(port).map(|i| i.streams.clone()).unwrap_or_default()
        };
        let mut common: Option<TypeId> = None;
        for stream in streams {
            let ty = self.type_of(stream);
            match common {
                None => common = Some(ty),
                Some(seen) if seen == ty => {}
                Some(_) => return unknown,
            }
        }
        common.unwrap_or(unknown)
    }

    // ========================================================================
    // Clauses
    // ========================================================================

    fn bind_logic_item(
        &mut self,
        inv: &Invocation,
        item: &LogicItem,
        used: &mut ClauseLabels,
    ) -> Option<SymbolId> {
        match item {
            LogicItem::State(state) => {
                for decl in &state.decls {
                    self.declare_locals(decl, Some(inv.expr_scope));
                }
                None
            }
            LogicItem::OnTuple(logic) | LogicItem::OnPunct(logic) => {
                let punct = matches!(item, LogicItem::OnPunct(_));
                let branch = if punct { "onPunct" } else { "onTuple" };
                let location = self.location(logic.port.span);
                let port = self.resolve_port_label(inv, &logic.port);
                if let Some(port) = port {
                    if let Some(previous) = used.port(branch, port, location) {
                        let label = format!("{} {}", branch, logic.port.name);
                        self.report_duplicate_clause(&label, location, previous);
                    }
                }
                let data = LogicClauseData {
                    invoke: inv.sym,
                    port,
                    expansion: Expansion::NotStarted,
                };
                let kind = if punct {
                    SymbolKind::OnPunctLogic(data)
                } else {
                    SymbolKind::OnTupleLogic(data)
                };
                let clause = self.table.add_symbol(logic.port.name.clone(), location, kind);
                self.table.bind_node(logic.id, clause);

                let mut shared = Vec::new();
                if inv.is_custom() {
                    shared.push(self.intrinsics.submit);
                }
                if punct {
                    shared.push(self.intrinsics.punct);
                }
                self.expand_logic(clause, inv.state_scope, &shared, &logic.body);
                Some(clause)
            }
            LogicItem::OnProcess(logic) => {
                let location = self.location(logic.span);
                if inv.target.is_some() && !inv.is_custom() {
                    self.report(BindError::OnProcessNotCustom {
                        operator: inv.target_name.clone(),
                        location,
                    });
                }
                if let Some(previous) = used.generic("onProcess", location) {
                    self.report_duplicate_clause("onProcess", location, previous);
                }
                let clause = self.table.add_symbol(
                    "onProcess",
                    location,
                    SymbolKind::OnProcessLogic(LogicClauseData {
                        invoke: inv.sym,
                        port: None,
                        expansion: Expansion::NotStarted,
                    }),
                );
                self.table.bind_node(logic.id, clause);
                let shared = if inv.is_custom() {
                    vec![self.intrinsics.submit]
                } else {
                    Vec::new()
                };
                self.expand_logic(clause, inv.state_scope, &shared, &logic.body);
                Some(clause)
            }
        }
    }

    fn expand_logic(&mut self, clause: SymbolId, parent: ScopeId, shared: &[ScopeId], body: &Stmt) {
        self.run_expansion(clause, unit_slot, (), |b| {
            let scope = b.table.new_scope(Some(parent), Some(clause));
            for &from in shared {
                b.copy_members(from, scope);
            }
            b.table.set_held(clause, scope);
            b.in_scope(scope, |b| b.bind_stmt(body));
        });
    }

    /// Make every member of `from` visible in `to` under the same name
    pub(crate) fn copy_members(&mut self, from: ScopeId, to: ScopeId) {
        let members: Vec<(String, SymbolId)> = self
            .table
            .scope(from)
            .iter()
            .map(|(name, sym)| (name.to_string(), sym))
            .collect();
        for (name, sym) in members {
            let _ = self.table.insert_as(to, &name, sym);
        }
    }

    fn bind_window(
        &mut self,
        inv: &Invocation,
        window: &WindowItem,
        used: &mut ClauseLabels,
    ) -> SymbolId {
        let location = self.location(window.port.span);
        let port = self.resolve_port_label(inv, &window.port);
        if let Some(port) = port {
            if let Some(previous) = used.port("window", port, location) {
                let label = format!("window {}", window.port.name);
                self.report_duplicate_clause(&label, location, previous);
            }
        }
        let clause = self.table.add_symbol(
            window.port.name.clone(),
            location,
            SymbolKind::OpInvokeWindow(LogicClauseData {
                invoke: inv.sym,
                port,
                expansion: Expansion::NotStarted,
            }),
        );
        self.table.bind_node(window.id, clause);

        self.run_expansion(clause, unit_slot, (), |b| {
            let scope = b.table.new_scope(Some(inv.expr_scope), Some(clause));
            b.copy_members(b.intrinsics.window, scope);
            if let Some(input) = port.and_then(|p| inv.inputs.get(p)) {
                for &stream in &input.streams {
                    if let Some(members) = b.held_scope(stream) {
                        b.merge_members(scope, members, stream, port, location);
                    }
                }
            }
            b.table.set_held(clause, scope);
            b.in_scope(scope, |b| {
                for expr in &window.exprs {
                    b.bind_expr(expr);
                }
            });
        });
        clause
    }

    /// Actual parameters; returns them for a composite target to instantiate with
    fn bind_params(
        &mut self,
        inv: &Invocation,
        op: &OpInvoke,
        used: &mut ClauseLabels,
    ) -> Vec<CallParam> {
        let mut params = Vec::with_capacity(op.body.params.len());
        for param in &op.body.params {
            let location = self.location(param.name.span);
            if let Some(previous) = used.generic(&format!("param {}", param.name.name), location) {
                self.report_duplicate_clause(&param.name.name, location, previous);
            }
            let formal = self.match_parameter(inv, &param.name, location);
            let actual = self.table.add_symbol(
                param.name.name.clone(),
                location,
                SymbolKind::OpInvokeActual(ActualParamData {
                    invoke: inv.sym,
                    formal,
                }),
            );
            self.table.bind_node(param.id, actual);
            self.table.bind_node(param.name.id, actual);

            let scope = self.table.new_scope(Some(inv.expr_scope), Some(actual));
            if let Some(functions) = self.parameter_output_functions(inv, formal) {
                self.copy_members(functions, scope);
            }
            self.table.set_held(actual, scope);
            self.in_scope(scope, |b| match &param.value {
                OpActual::Exprs(exprs) => {
                    for expr in exprs {
                        b.bind_expr(expr);
                    }
                }
                OpActual::Type(ty) => {
                    b.declare_type_expr(ty);
                    b.flush_deferred();
                }
            });
            params.push(CallParam {
                name: param.name.name.clone(),
                value: param.value.clone(),
                scope,
                location,
            });
        }
        params
    }

    /// Formal an actual parameter fills, reporting unknown names
    fn match_parameter(
        &mut self,
        inv: &Invocation,
        name: &Ident,
        location: Location,
    ) -> Option<SymbolId> {
        let target = inv.target?;
        let symbol = self.table.symbol(target);
        let (found, allow_any) = match &symbol.kind {
            SymbolKind::PrimitiveOperator(data) => {
                let found = symbol
                    .held
                    .and_then(|params| self.table.scope(params).get(&name.name));
                (found, data.model.allow_any_parameters)
            }
            SymbolKind::CompositeDef(_) => {
                let found = symbol
                    .held
                    .and_then(|scope| self.table.scope(scope).get(&format!("${}", name.name)))
                    .filter(|f| {
                        matches!(self.table.symbol(*f).kind, SymbolKind::CompositeFormal(_))
                    });
                (found, false)
            }
            _ => return None,
        };
        if found.is_none() && !allow_any {
            self.report(BindError::UnknownParameter {
                name: name.name.clone(),
                operator: inv.target_name.clone(),
                location,
            });
        }
        found
    }

    fn parameter_output_functions(
        &self,
        inv: &Invocation,
        formal: Option<SymbolId>,
    ) -> Option<ScopeId> {
        let SymbolKind::PrimitiveFormal(formal) = &self.table.symbol(formal?).kind else {
            return None;
        };
        let SymbolKind::PrimitiveOperator(data) = &self.table.symbol(inv.target?).kind else {
            return None;
        };
        let set = data
            .model
            .parameters
            .get(formal.index)?
            .custom_output_function
            .as_ref()?;
        data.output_functions.get(set).copied()
    }

    fn port_output_functions(&self, inv: &Invocation, port: usize) -> Option<ScopeId> {
        let model = inv.model.as_ref()?;
        let set = model.output_ports.port(port)?.output_functions.as_ref()?;
        let SymbolKind::PrimitiveOperator(data) = &self.table.symbol(inv.target?).kind else {
            return None;
        };
        data.output_functions.get(set).copied()
    }

    fn bind_output_item(
        &mut self,
        inv: &Invocation,
        item: &OutputItem,
        used: &mut ClauseLabels,
    ) -> SymbolId {
        let location = self.location(item.port.span);
        let port = self.resolve_output_label(inv, &item.port);
        if let Some(port) = port {
            if let Some(previous) = used.port("output", port, location) {
                let label = format!("output {}", item.port.name);
                self.report_duplicate_clause(&label, location, previous);
            }
        }
        let clause = self.table.add_symbol(
            item.port.name.clone(),
            location,
            SymbolKind::OpInvokeOutput(OutputClauseData {
                invoke: inv.sym,
                port,
                right: None,
                expansion: Expansion::NotStarted,
            }),
        );
        self.table.bind_node(item.id, clause);
        self.run_expansion(clause, unit_slot, (), |b| {
            b.bind_output_clause(inv, clause, port, item)
        });
        clause
    }

    /// Left: the output tuple's attributes. Right: state plus the port's
    /// custom output functions.
    fn bind_output_clause(
        &mut self,
        inv: &Invocation,
        clause: SymbolId,
        port: Option<usize>,
        item: &OutputItem,
    ) {
        let location = self.location(item.port.span);
        let left = self.table.new_scope(None, Some(clause));
        let right = self.table.new_scope(Some(inv.state_scope), None);
        let assigned = self.table.new_scope(None, None);
        let output = port.and_then(|p| inv.outputs.get(p));

        if let (Some(port), Some(output)) = (port, output) {
            if let Some(members) = self.held_scope(output.stream) {
                self.merge_members(left, members, output.stream, None, location);
            }
            if let Some(functions) = self.port_output_functions(inv, port) {
                self.copy_members(functions, right);
            }
        }
        self.table.set_held(clause, left);
        if let SymbolKind::OpInvokeOutput(data) = &mut self.table.symbol_mut(clause).kind {
            data.right = Some(right);
        }

        for assign in &item.assignments {
            let assign_location = self.location(assign.attribute.span);
            self.check_attribute_name(&assign.attribute.name, assign_location);
            let attribute = self.table.scope(left).get(&assign.attribute.name);
            if attribute.is_none() {
                if let Some(output) = output {
                    self.report(BindError::UnknownAttribute {
                        name: assign.attribute.name.clone(),
                        base: output.name.clone(),
                        location: assign_location,
                    });
                }
            }
            let sym = self.table.add_symbol(
                assign.attribute.name.clone(),
                assign_location,
                SymbolKind::AttributeAssign(AttributeAssignData {
                    output: clause,
                    attribute,
                }),
            );
            self.declare(assigned, sym);
            self.table.bind_node(assign.id, sym);
            self.table.bind_node(assign.attribute.id, sym);
            self.in_scope(right, |b| b.bind_expr(&assign.value));
        }
    }

    // ========================================================================
    // Config
    // ========================================================================

    /// `config label: exprs;` items of a composite or an invocation
    pub(crate) fn bind_configs(
        &mut self,
        configs: &[ConfigItem],
        used: &mut ClauseLabels,
    ) -> Vec<SymbolId> {
        let mut bound = Vec::with_capacity(configs.len());
        for item in configs {
            let location = self.location(item.label.span);
            if let Some(previous) = used.config(&item.label.name, location) {
                let label = format!("config {}", item.label.name);
                self.report_duplicate_clause(&label, location, previous);
            }
            let formal = self.table.scope(self.intrinsics.config).get(&item.label.name);
            if formal.is_none() {
                self.report(BindError::UnknownConfig {
                    label: item.label.name.clone(),
                    location,
                });
            }
            let sym = self.table.add_symbol(
                item.label.name.clone(),
                location,
                SymbolKind::ActualConfig(ActualConfigData {
                    label: item.label.name.clone(),
                    formal,
                    expansion: Expansion::NotStarted,
                }),
            );
            self.table.bind_node(item.id, sym);
            self.table.bind_node(item.label.id, sym);

            let parent = self.current_scope();
            self.run_expansion(sym, unit_slot, (), |b| {
                let scope = b.table.new_scope(Some(parent), Some(sym));
                if let Some(helpers) = formal.and_then(|f| b.table.symbol(f).held) {
                    b.copy_members(helpers, scope);
                }
                b.table.set_held(sym, scope);
                b.in_scope(scope, |b| {
                    for expr in &item.exprs {
                        b.bind_config_expr(&item.label.name, expr);
                    }
                });
            });
            bound.push(sym);
        }
        bound
    }

    /// `hostPool: name = expr` declares a pool other configs can place on.
    /// Pools named on an invocation belong to the enclosing instance.
    fn bind_config_expr(&mut self, label: &str, expr: &Expr) {
        if label == "hostPool" {
            if let ExprKind::Assign { target, value, .. } = &expr.kind {
                if let ExprKind::Ident(name) = &target.kind {
                    self.bind_expr(value);
                    let location = self.location(name.span);
                    self.check_plain_name(&name.name, location);
                    let pool = self
                        .table
                        .add_symbol(name.name.clone(), location, SymbolKind::HostPool);
                    // instances share their definition's scope
                    let scope = self
                        .context
                        .current_composite_instance(&self.table)
                        .or_else(|| self.context.current_composite_def(&self.table))
                        .and_then(|holder| self.table.symbol(holder).held)
                        .unwrap_or_else(|| self.current_scope());
                    self.declare(scope, pool);
                    self.table.bind_node(target.id, pool);
                    self.table.bind_node(name.id, pool);
                    return;
                }
            }
        }
        self.bind_expr(expr);
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::{Binder, BinderConfig, SymbolKind};

    fn bind(graph: &str) -> Binder {
        let source = format!(
            "namespace demo;
             type T = tuple<int32 a, rstring b>;
             type U = tuple<int32 a, float64 c>;
             composite Main {{ graph {} }}",
            graph
        );
        let mut binder = Binder::new(BinderConfig::default());
        binder.add_source("main.spl", source).unwrap();
        binder.bind();
        binder
    }

    fn codes(binder: &Binder) -> Vec<String> {
        binder
            .diagnostics()
            .iter()
            .filter_map(|d| d.code().map(str::to_string))
            .collect()
    }

    fn invoke_named(binder: &Binder, name: &str) -> crate::binder::SymbolId {
        binder
            .table()
            .symbols()
            .find(|(_, s)| s.name == name && matches!(s.kind, SymbolKind::OpInvoke(_)))
            .map(|(id, _)| id)
            .unwrap()
    }

    // ── Streams ──

    #[test]
    fn test_clean_pipeline() {
        let binder = bind(
            "stream<T> Src = Beacon() { param iterations: 10; }
             stream<T> Out = Functor(Src) { param filter: a > 0; output Out: b = \"x\"; }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    }

    #[test]
    fn test_forward_stream_reference() {
        let binder = bind(
            "stream<T> Out = Functor(Src) { }
             stream<T> Src = Beacon() { }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    }

    #[test]
    fn test_unknown_input_stream() {
        let binder = bind("stream<T> Out = Functor(Nope) { }");
        assert_eq!(binder.diagnostics().with_code("E2006").count(), 1);
    }

    #[test]
    fn test_not_an_operator() {
        let binder = bind("stream<T> Out = T() { }");
        assert_eq!(binder.diagnostics().with_code("E2022").count(), 1);
    }

    #[test]
    fn test_port_count_mismatch() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Beacon(Src) { }",
        );
        assert_eq!(binder.diagnostics().with_code("E2028").count(), 1);
    }

    // ── Expression scope ──

    #[test]
    fn test_attributes_are_visible_in_params() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Filter(Src) { param filter: a > 1 && b == \"y\"; }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    }

    #[test]
    fn test_shared_attribute_across_ports_has_common_type() {
        let mut binder = bind(
            "stream<T> L = Beacon() { }
             stream<U> R = Beacon() { }
             stream<T> J = Join(L; R) { param match: a == 1; }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
        let join = invoke_named(&binder, "J");
        let SymbolKind::OpInvoke(data) = &binder.table().symbol(join).kind else {
            panic!("expected invocation");
        };
        let scope = data.expr_scope.unwrap();
        let a = binder.table().scope(scope).get("a").unwrap();
        let ty = binder.type_of(a);
        assert_eq!(binder.display_type(ty), "int32");
        let location = binder.table().symbol(a).location;
        assert!(binder.gen_expression(a, location).is_none());
    }

    #[test]
    fn test_custom_literals_are_visible() {
        let binder = bind(
            "stream<T> L = Beacon() { }
             stream<T> R = Beacon() { }
             stream<T> J = Join(L; R) { param algorithm: leftOuter; }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    }

    #[test]
    fn test_unknown_parameter() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Functor(Src) { param nonsense: 1; }",
        );
        assert_eq!(binder.diagnostics().with_code("E2016").count(), 1);
    }

    // ── Clauses ──

    #[test]
    fn test_custom_logic() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Custom(Src as In) {
                logic
                    state: { mutable int32 n = 0; }
                    onTuple In: { n = n + a; submit(In, Out); }
                    onPunct In: submit(currentPunct(), Out);
             }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    }

    #[test]
    fn test_alias_and_stream_name_collide() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Custom(Src as In) {
                logic
                    onTuple In: { }
                    onTuple Src: { }
             }",
        );
        let duplicates: Vec<_> = binder.diagnostics().with_code("E2010").collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].secondary_label_count(), 1);
    }

    #[test]
    fn test_duplicate_clause_is_warning_in_syntax_only_mode() {
        let config = BinderConfig {
            syntax_only: true,
            ..BinderConfig::default()
        };
        let mut binder = Binder::new(config);
        binder
            .add_source(
                "main.spl",
                "type T = tuple<int32 a>;
                 composite Main { graph
                    stream<T> Src = Beacon() { }
                    stream<T> Out = Custom(Src) {
                        logic onTuple Src: { } onTuple Src: { }
                    }
                 }",
            )
            .unwrap();
        binder.bind();
        assert!(!binder.diagnostics().has_errors());
        assert_eq!(binder.diagnostics().warning_count(), 1);
    }

    #[test]
    fn test_on_process_requires_custom() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Functor(Src) { logic onProcess: { } }",
        );
        assert_eq!(binder.diagnostics().with_code("E2020").count(), 1);
    }

    #[test]
    fn test_submit_only_in_custom() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Functor(Src) { logic onTuple Src: submit(Src, Out); }",
        );
        assert_eq!(binder.diagnostics().with_code("E2006").count(), 1);
    }

    #[test]
    fn test_clause_port_errors() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Custom(Src) {
                logic onTuple Nowhere: { } onTuple Out: { }
             }",
        );
        assert_eq!(binder.diagnostics().with_code("E2013").count(), 1);
        assert_eq!(binder.diagnostics().with_code("E2015").count(), 1);
    }

    #[test]
    fn test_stream_on_two_ports() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> J = Join(Src; Src) { window Src: sliding, count(10); }",
        );
        assert_eq!(binder.diagnostics().with_code("E2014").count(), 1);
    }

    #[test]
    fn test_window_sees_policies_and_attributes() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Agg = Aggregate(Src) {
                window Src: tumbling, delta(a, 10);
                output Agg: a = Max(a), b = First(b);
             }",
        );
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    }

    #[test]
    fn test_output_functions_only_on_their_port() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Functor(Src) { output Out: a = Max(a); }",
        );
        assert_eq!(binder.diagnostics().with_code("E2006").count(), 1);
    }

    #[test]
    fn test_output_clause_errors() {
        let binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Functor(Src) {
                output Src: a = 1; Wrong: a = 1; Out: zzz = 1;
             }",
        );
        assert_eq!(binder.diagnostics().with_code("E2015").count(), 1);
        assert_eq!(binder.diagnostics().with_code("E2012").count(), 1);
        assert_eq!(binder.diagnostics().with_code("E2007").count(), 1);
    }

    #[test]
    fn test_output_assignment_links_attribute() {
        let mut binder = bind(
            "stream<T> Src = Beacon() { }
             stream<T> Out = Functor(Src) { output Out: b = \"v\"; }",
        );
        let (assign, _) = binder
            .table()
            .symbols()
            .find(|(_, s)| matches!(s.kind, SymbolKind::AttributeAssign(_)))
            .unwrap();
        let ty = binder.type_of(assign);
        assert_eq!(binder.display_type(ty), "rstring");
    }

    // ── Config ──

    #[test]
    fn test_config_labels() {
        let binder = bind(
            "stream<T> Src = Beacon() {
                config placement: partitionColocation(\"p\"); placement: hostColocation(\"q\");
                       bogus: 1;
             }",
        );
        assert_eq!(binder.diagnostics().with_code("E2010").count(), 1);
        assert_eq!(binder.diagnostics().with_code("E2027").count(), 1);
    }

    #[test]
    fn test_host_pool_is_reachable_from_placement() {
        let mut binder = Binder::new(BinderConfig::default());
        binder
            .add_source(
                "main.spl",
                "type T = tuple<int32 a>;
                 composite Main {
                    graph stream<T> Src = Beacon() { config placement: host(pool); }
                    config hostPool: pool = createPool(2, Sys.Shared);
                 }",
            )
            .unwrap();
        binder.bind();
        assert!(!binder.diagnostics().has_errors());
        assert!(binder
            .table()
            .symbols()
            .any(|(_, s)| s.name == "pool" && matches!(s.kind, SymbolKind::HostPool)));
    }

    #[test]
    fn test_invocation_host_pool_per_instance() {
        let mut binder = Binder::new(BinderConfig::default());
        binder
            .add_source(
                "main.spl",
                "type T = tuple<int32 a>;
                 composite C(output stream<T> Out) {
                    graph stream<T> Out = Beacon() {
                        config hostPool: pool = createPool(2, Sys.Shared);
                               placement: host(pool);
                    }
                 }
                 composite Main {
                    graph
                        stream<T> A = C() { }
                        stream<T> B = C() { }
                 }",
            )
            .unwrap();
        binder.bind();
        assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
        let pools = binder
            .table()
            .symbols()
            .filter(|(_, s)| s.name == "pool" && matches!(s.kind, SymbolKind::HostPool))
            .count();
        assert_eq!(pools, 2);
    }
}
