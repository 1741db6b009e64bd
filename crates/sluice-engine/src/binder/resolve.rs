//! Name resolution and the body-binding pass

use std::sync::Arc;
use tracing::{instrument, trace};

use super::error::BindError;
use super::guard::ClauseLabels;
use super::intrinsics::IMPLICIT_NAMESPACES;
use super::scope::ScopeId;
use super::symbols::{
    AttributeAccessData, CompositeFormalData, Location, SymbolId, SymbolKind, VariableData,
};
use super::{Binder, ShadowPolicy, SourceUnit};
use crate::parser::ast::{
    has_modifier, Block, Definition, Expr, ExprKind, FormalMode, Ident, LocalDecl, Modifier,
    NodeId, OpActual, PathName, Stmt, UseTarget,
};

/// Why a name did not resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unresolved {
    NotFound,
    /// Already reported
    Ambiguous,
}

impl Binder {
    // ========================================================================
    // Lookup
    // ========================================================================

    /// Resolve a simple name from the current scope
    ///
    /// Order: the scope chain (namespaces are skipped), named uses, the
    /// current namespace, then wildcard uses together with the implicit
    /// standard namespaces. A name found in several of the last group is
    /// ambiguous.
    pub(crate) fn resolve_simple(
        &mut self,
        name: &str,
        location: Location,
    ) -> Result<SymbolId, Unresolved> {
        for scope in self.table.chain(self.current_scope()) {
            if let Some(sym) = self.table.scope(scope).get(name) {
                if !matches!(self.table.symbol(sym).kind, SymbolKind::Namespace(_)) {
                    trace!(name, %sym, "found in scope chain");
                    return Ok(sym);
                }
            }
        }

        let Some(unit) = self.context.current_compilation_unit(&self.table) else {
            return Err(Unresolved::NotFound);
        };
        let SymbolKind::CompilationUnit(data) = &self.table.symbol(unit).kind else {
            return Err(Unresolved::NotFound);
        };
        let namespace = data.namespace;
        let named: Vec<(String, String)> = data
            .named_uses
            .iter()
            .map(|u| (u.namespace.clone(), u.name.clone()))
            .collect();
        let wildcards: Vec<String> = data
            .wildcard_uses
            .iter()
            .map(|u| u.namespace.clone())
            .collect();

        for (ns, used) in &named {
            let Some(scope) = self.namespace_scope(ns) else {
                continue;
            };
            let Some(target) = self.table.scope(scope).get(used) else {
                continue;
            };
            if used == name {
                return Ok(target);
            }
            // constants of a named enum type come along with it
            if matches!(
                self.table.symbol(target).kind,
                SymbolKind::DefType(_) | SymbolKind::EnumType(_)
            ) {
                if let Some(members) = self.held_scope(target) {
                    if let Some(value) = self.table.scope(members).get(name) {
                        if matches!(self.table.symbol(value).kind, SymbolKind::EnumValue(_)) {
                            return Ok(value);
                        }
                    }
                }
            }
        }

        if let Some(members) = self.table.symbol(namespace).held {
            if let Some(sym) = self.table.scope(members).get(name) {
                return Ok(sym);
            }
        }

        let mut hits: Vec<(String, SymbolId)> = Vec::new();
        let searched = wildcards
            .iter()
            .map(String::as_str)
            .chain(IMPLICIT_NAMESPACES.iter().copied());
        for ns in searched {
            if hits.iter().any(|(seen, _)| seen == ns) {
                continue;
            }
            let Some(scope) = self.namespace_scope(ns) else {
                continue;
            };
            if let Some(sym) = self.table.scope(scope).get(name) {
                if !hits.iter().any(|(_, s)| *s == sym) {
                    hits.push((ns.to_string(), sym));
                }
            }
        }
        match hits.len() {
            0 => Err(Unresolved::NotFound),
            1 => Ok(hits[0].1),
            _ => {
                let namespaces = hits
                    .iter()
                    .map(|(ns, _)| ns.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.report(BindError::AmbiguousAcrossNamespaces {
                    name: name.to_string(),
                    namespaces,
                    location,
                });
                Err(Unresolved::Ambiguous)
            }
        }
    }

    /// `ns::name` looks only in that namespace; a bare name resolves simply
    pub(crate) fn resolve_path(&mut self, path: &PathName) -> Result<SymbolId, Unresolved> {
        let location = self.location(path.span);
        match &path.namespace {
            Some(ns) => self
                .namespace_scope(&ns.dotted())
                .and_then(|scope| self.table.scope(scope).get(&path.name.name))
                .ok_or(Unresolved::NotFound),
            None => self.resolve_simple(&path.name.name, location),
        }
    }

    /// Bind an identifier, reporting it and binding a dummy when unresolved
    pub(crate) fn bind_name(&mut self, ident: &Ident) -> SymbolId {
        let location = self.location(ident.span);
        let sym = match self.resolve_simple(&ident.name, location) {
            Ok(sym) => sym,
            Err(reason) => {
                if reason == Unresolved::NotFound {
                    self.report(BindError::UnknownIdentifier {
                        name: ident.name.clone(),
                        location,
                    });
                }
                self.error_dummy(&ident.name, location)
            }
        };
        self.table.bind_node(ident.id, sym);
        sym
    }

    /// Bind a path, reporting it and binding a dummy when unresolved
    pub(crate) fn bind_path(&mut self, path: &PathName) -> SymbolId {
        let location = self.location(path.span);
        let sym = match self.resolve_path(path) {
            Ok(sym) => sym,
            Err(reason) => {
                if reason == Unresolved::NotFound {
                    self.report(BindError::UnknownIdentifier {
                        name: path.display(),
                        location,
                    });
                }
                self.error_dummy(&path.name.name, location)
            }
        };
        self.table.bind_node(path.name.id, sym);
        sym
    }

    /// Deferred named type reference
    pub(crate) fn bind_type_name(&mut self, node: NodeId, path: &PathName) {
        let sym = self.bind_path(path);
        self.table.bind_node(node, sym);
        if matches!(self.table.symbol(sym).kind, SymbolKind::CompositeFormal(_)) {
            if let Some(instance) = self.context.current_composite_instance(&self.table) {
                self.formal_uses.insert(node, instance);
            }
        }
    }

    // ========================================================================
    // Pass 2
    // ========================================================================

    /// Bind the bodies of one file's definitions
    #[instrument(skip_all, fields(file = unit.file))]
    pub(crate) fn resolve_unit(&mut self, unit: &SourceUnit) {
        let ast = Arc::clone(&unit.unit);
        let Some(cu) = self.table.node_symbol(ast.id) else {
            return;
        };
        let Some(cu_scope) = self.table.symbol(cu).held else {
            return;
        };

        self.in_excursion(cu_scope, unit.file, |b| {
            for directive in &ast.uses {
                let location = b.location(directive.span);
                let namespace = directive.namespace.dotted();
                let Some(scope) = b.namespace_scope(&namespace) else {
                    b.report(BindError::UnknownIdentifier {
                        name: namespace,
                        location,
                    });
                    continue;
                };
                if let UseTarget::Name(name) = &directive.target {
                    match b.table.scope(scope).get(&name.name) {
                        Some(sym) => b.table.bind_node(name.id, sym),
                        None => b.report(BindError::UnknownIdentifier {
                            name: format!("{}::{}", namespace, name.name),
                            location,
                        }),
                    }
                }
            }

            for def in &ast.definitions {
                match def {
                    Definition::Type(td) => {
                        if let Some(sym) = b.table.node_symbol(td.id) {
                            b.type_of(sym);
                        }
                    }
                    Definition::Function(fd) => {
                        let Some(sym) = b.table.node_symbol(fd.id) else {
                            continue;
                        };
                        if let Some(scope) = b.table.symbol(sym).held {
                            b.in_scope(scope, |b| b.bind_block(&fd.body));
                        }
                    }
                    Definition::Composite(cd) => {
                        let Some(def) = b.table.node_symbol(cd.id) else {
                            continue;
                        };
                        let Some(def_scope) = b.table.symbol(def).held else {
                            continue;
                        };
                        b.in_scope(def_scope, |b| {
                            for formal in &cd.formals {
                                if let Some(OpActual::Exprs(exprs)) = &formal.default {
                                    for expr in exprs {
                                        b.bind_expr(expr);
                                    }
                                }
                            }
                            for td in cd.types.iter().filter(|t| t.is_static()) {
                                if let Some(sym) = b.table.node_symbol(td.id) {
                                    b.type_of(sym);
                                }
                            }
                            let mut labels = ClauseLabels::default();
                            b.bind_configs(&cd.configs, &mut labels);
                        });
                    }
                }
            }
        });
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub(crate) fn bind_block(&mut self, block: &Block) {
        let scope = self.table.new_scope(Some(self.current_scope()), None);
        self.in_scope(scope, |b| {
            for stmt in &block.stmts {
                b.bind_stmt(stmt);
            }
        });
    }

    pub(crate) fn bind_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.bind_block(block),
            Stmt::Local(decl) => self.declare_locals(decl, None),
            Stmt::Expr(expr) => self.bind_expr(expr),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.bind_expr(cond);
                self.bind_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.bind_stmt(else_branch);
                }
            }
            Stmt::For(f) => {
                self.bind_expr(&f.iterable);
                self.declare_type_expr(&f.ty);
                self.flush_deferred();
                let scope = self.table.new_scope(Some(self.current_scope()), None);
                let location = self.location(f.name.span);
                self.check_plain_name(&f.name.name, location);
                let var = self.table.add_symbol(
                    f.name.name.clone(),
                    location,
                    SymbolKind::Variable(VariableData {
                        ty: f.ty.clone(),
                        mutable: false,
                        is_static: false,
                        state: false,
                    }),
                );
                self.declare(scope, var);
                self.table.bind_node(f.id, var);
                self.table.bind_node(f.name.id, var);
                self.in_scope(scope, |b| b.bind_stmt(&f.body));
            }
            Stmt::While { cond, body, .. } => {
                self.bind_expr(cond);
                self.bind_stmt(body);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.bind_expr(value);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    /// Local or state variables into the current scope
    ///
    /// `shadowed` is the expression scope of the invocation when these are
    /// state variables; a state variable named like a stream attribute is
    /// handled per the configured shadowing policy.
    pub(crate) fn declare_locals(&mut self, decl: &LocalDecl, shadowed: Option<ScopeId>) {
        self.declare_type_expr(&decl.ty);
        self.flush_deferred();
        let mutable = has_modifier(&decl.modifiers, Modifier::Mutable);
        let is_static = has_modifier(&decl.modifiers, Modifier::Static);
        let scope = self.current_scope();

        for item in &decl.items {
            if let Some(init) = &item.init {
                self.bind_expr(init);
            }
            let location = self.location(item.name.span);
            self.check_plain_name(&item.name.name, location);
            if !mutable && item.init.is_none() {
                self.report(BindError::MissingInitializer {
                    name: item.name.name.clone(),
                    location,
                });
            }
            let var = self.table.add_symbol(
                item.name.name.clone(),
                location,
                SymbolKind::Variable(VariableData {
                    ty: decl.ty.clone(),
                    mutable,
                    is_static,
                    state: shadowed.is_some(),
                }),
            );
            self.table.bind_node(item.id, var);
            self.table.bind_node(item.name.id, var);

            let hides_attribute = shadowed.is_some_and(|e| self.table.has(e, &item.name.name));
            if !hides_attribute {
                self.declare(scope, var);
                continue;
            }
            match self.config.state_shadowing {
                ShadowPolicy::Error => {
                    self.report(BindError::StateShadowsAttribute {
                        name: item.name.name.clone(),
                        location,
                    });
                    self.declare(scope, var);
                }
                ShadowPolicy::Silent => {
                    self.declare(scope, var);
                }
                ShadowPolicy::Legacy => {}
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub(crate) fn bind_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(ident) => {
                let sym = self.bind_name(ident);
                self.table.bind_node(expr.id, sym);
                self.note_formal_use(expr.id, sym);
                let location = self.location(ident.span);
                self.check_indirect_use(sym, location);
            }
            ExprKind::Qualified(path) => {
                let sym = self.bind_path(path);
                self.table.bind_node(expr.id, sym);
            }
            ExprKind::Literal(_) => {}
            ExprKind::Attribute { base, name } => {
                self.bind_expr(base);
                match self.table.node_symbol(base.id) {
                    Some(base_sym) => self.bind_attribute(expr.id, base_sym, name),
                    None => {
                        let location = self.location(name.span);
                        let dummy = self.error_dummy(&name.name, location);
                        self.table.bind_node(expr.id, dummy);
                    }
                }
            }
            ExprKind::Call { callee, args } => {
                self.bind_expr(callee);
                for arg in args {
                    self.bind_expr(arg);
                }
            }
            ExprKind::Unary { operand, .. } => self.bind_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.bind_expr(left);
                self.bind_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.bind_expr(value);
                self.bind_expr(target);
            }
            ExprKind::Subscript { base, index } => {
                self.bind_expr(base);
                self.bind_expr(index);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.bind_expr(cond);
                self.bind_expr(then_expr);
                self.bind_expr(else_expr);
            }
            ExprKind::List(items) => {
                for item in items {
                    self.bind_expr(item);
                }
            }
            ExprKind::TupleLiteral(fields) => {
                for field in fields {
                    self.bind_expr(&field.value);
                }
            }
        }
    }

    /// A composite formal used inside an instance is replaced by its actual
    fn note_formal_use(&mut self, node: NodeId, sym: SymbolId) {
        let SymbolKind::CompositeFormal(CompositeFormalData { mode, .. }) =
            &self.table.symbol(sym).kind
        else {
            return;
        };
        if matches!(mode, FormalMode::Type) {
            return;
        }
        let Some(instance) = self.context.current_composite_instance(&self.table) else {
            return;
        };
        let formal = self.table.symbol(sym).name.clone();
        let scope = self.current_scope();
        if let Some(actual) = self.actual(instance, &formal, scope) {
            self.substitutions.insert(node, actual);
        }
    }

    /// `base.name`
    ///
    /// Members of an operator are its custom literals; members of a composite
    /// are its static types. Anything else is looked up in the base's held
    /// scope.
    pub(crate) fn bind_attribute(&mut self, node: NodeId, base: SymbolId, name: &Ident) {
        let location = self.location(name.span);
        let members = match &self.table.symbol(base).kind {
            SymbolKind::ErrorDummy => {
                let dummy = self.error_dummy(&name.name, location);
                self.table.bind_node(node, dummy);
                self.table.bind_node(name.id, dummy);
                return;
            }
            SymbolKind::PrimitiveOperator(data) => Some(data.enums),
            _ => self.held_scope(base),
        };

        let found = members.and_then(|scope| self.table.scope(scope).get(&name.name));
        let base_is_composite = matches!(self.table.symbol(base).kind, SymbolKind::CompositeDef(_));

        let sym = match found {
            Some(attribute) if base_is_composite && !self.is_static_member(attribute) => {
                self.report(BindError::NonStaticThroughOperator {
                    name: name.name.clone(),
                    location,
                });
                self.error_dummy(&name.name, location)
            }
            Some(attribute) => self.table.add_symbol(
                name.name.clone(),
                location,
                SymbolKind::AttributeAccess(AttributeAccessData { base, attribute }),
            ),
            None => {
                if base_is_composite && self.template_declares(base, &name.name) {
                    self.report(BindError::NonStaticThroughOperator {
                        name: name.name.clone(),
                        location,
                    });
                } else {
                    let base = self.table.symbol(base).name.clone();
                    self.report(BindError::UnknownAttribute {
                        name: name.name.clone(),
                        base,
                        location,
                    });
                }
                self.error_dummy(&name.name, location)
            }
        };
        self.table.bind_node(node, sym);
        self.table.bind_node(name.id, sym);
    }

    fn is_static_member(&self, sym: SymbolId) -> bool {
        match &self.table.symbol(sym).kind {
            SymbolKind::DefType(data) => data.is_static,
            SymbolKind::Variable(data) => data.is_static,
            SymbolKind::CompositeFormal(_) => false,
            _ => true,
        }
    }

    /// Whether the composite's instance part declares a type named `name`
    fn template_declares(&self, def: SymbolId, name: &str) -> bool {
        match &self.table.symbol(def).kind {
            SymbolKind::CompositeDef(data) => {
                data.template.types.iter().any(|t| t.name.name == name)
            }
            _ => false,
        }
    }
}
