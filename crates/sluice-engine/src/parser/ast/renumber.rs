//! Fresh node ids for cloned subtrees
//!
//! Composite instance bodies and rewritten actual arguments are clones of a
//! template; renumbering gives every clone its own identity in the binder's
//! node side table.

use super::*;

/// Assign fresh ids to every node of a subtree, in place
pub trait Renumber {
    fn renumber(&mut self, ids: &mut NodeIdGen);
}

impl<T: Renumber> Renumber for Vec<T> {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        for item in self {
            item.renumber(ids);
        }
    }
}

impl<T: Renumber> Renumber for Option<T> {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        if let Some(item) = self {
            item.renumber(ids);
        }
    }
}

impl<T: Renumber> Renumber for Box<T> {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        (**self).renumber(ids);
    }
}

impl Renumber for Ident {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
    }
}

impl Renumber for QualifiedName {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.parts.renumber(ids);
    }
}

impl Renumber for PathName {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.namespace.renumber(ids);
        self.name.renumber(ids);
    }
}

impl Renumber for TypeDef {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.name.renumber(ids);
        self.tail.renumber(ids);
    }
}

impl Renumber for TypeExpr {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        match &mut self.kind {
            TypeExprKind::Primitive(_) | TypeExprKind::BoundedString(_) => {}
            TypeExprKind::List { element, .. } | TypeExprKind::Set { element, .. } => {
                element.renumber(ids)
            }
            TypeExprKind::Map { key, value, .. } => {
                key.renumber(ids);
                value.renumber(ids);
            }
            TypeExprKind::Optional(inner) => inner.renumber(ids),
            TypeExprKind::Enum(values) => values.renumber(ids),
            TypeExprKind::Tuple(body) => body.renumber(ids),
            TypeExprKind::Named(path) => path.renumber(ids),
        }
    }
}

impl Renumber for TupleBody {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        match self {
            TupleBody::Attributes(attrs) => attrs.renumber(ids),
            TupleBody::Extends(types) => types.renumber(ids),
        }
    }
}

impl Renumber for AttributeDecl {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.ty.renumber(ids);
        self.name.renumber(ids);
    }
}

impl Renumber for StreamType {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.tuple.renumber(ids);
    }
}

impl Renumber for OpActual {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        match self {
            OpActual::Exprs(exprs) => exprs.renumber(ids),
            OpActual::Type(ty) => ty.renumber(ids),
        }
    }
}

impl Renumber for OpInvoke {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.annotations.renumber(ids);
        self.outputs.renumber(ids);
        self.alias.renumber(ids);
        self.operator.renumber(ids);
        self.inputs.renumber(ids);
        self.body.renumber(ids);
    }
}

impl Renumber for OpOutput {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.ty.renumber(ids);
        self.name.renumber(ids);
        self.alias.renumber(ids);
    }
}

impl Renumber for PortInputs {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.streams.renumber(ids);
        self.alias.renumber(ids);
    }
}

impl Renumber for OpInvokeBody {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.logic.renumber(ids);
        self.windows.renumber(ids);
        self.params.renumber(ids);
        self.outputs.renumber(ids);
        self.configs.renumber(ids);
    }
}

impl Renumber for LogicItem {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        match self {
            LogicItem::State(state) => {
                state.id = ids.fresh();
                state.decls.renumber(ids);
            }
            LogicItem::OnTuple(logic) | LogicItem::OnPunct(logic) => {
                logic.id = ids.fresh();
                logic.port.renumber(ids);
                logic.body.renumber(ids);
            }
            LogicItem::OnProcess(logic) => {
                logic.id = ids.fresh();
                logic.body.renumber(ids);
            }
        }
    }
}

impl Renumber for WindowItem {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.port.renumber(ids);
        self.exprs.renumber(ids);
    }
}

impl Renumber for ActualParam {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.name.renumber(ids);
        self.value.renumber(ids);
    }
}

impl Renumber for OutputItem {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.port.renumber(ids);
        self.assignments.renumber(ids);
    }
}

impl Renumber for OutputAssign {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.attribute.renumber(ids);
        self.value.renumber(ids);
    }
}

impl Renumber for ConfigItem {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.label.renumber(ids);
        self.exprs.renumber(ids);
    }
}

impl Renumber for Annotation {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.name.renumber(ids);
        for arg in &mut self.args {
            arg.key.renumber(ids);
            arg.value.renumber(ids);
        }
    }
}

impl Renumber for Block {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        self.stmts.renumber(ids);
    }
}

impl Renumber for Stmt {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        match self {
            Stmt::Block(block) => block.renumber(ids),
            Stmt::Local(decl) => decl.renumber(ids),
            Stmt::Expr(expr) => expr.renumber(ids),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                cond.renumber(ids);
                then_branch.renumber(ids);
                else_branch.renumber(ids);
            }
            Stmt::For(f) => {
                f.id = ids.fresh();
                f.ty.renumber(ids);
                f.name.renumber(ids);
                f.iterable.renumber(ids);
                f.body.renumber(ids);
            }
            Stmt::While { cond, body, .. } => {
                cond.renumber(ids);
                body.renumber(ids);
            }
            Stmt::Return { value, .. } => value.renumber(ids),
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }
}

impl Renumber for LocalDecl {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.ty.renumber(ids);
        for item in &mut self.items {
            item.id = ids.fresh();
            item.name.renumber(ids);
            item.init.renumber(ids);
        }
    }
}

impl Renumber for Expr {
    fn renumber(&mut self, ids: &mut NodeIdGen) {
        self.id = ids.fresh();
        match &mut self.kind {
            ExprKind::Ident(ident) => ident.renumber(ids),
            ExprKind::Qualified(path) => path.renumber(ids),
            ExprKind::Literal(_) => {}
            ExprKind::Attribute { base, name } => {
                base.renumber(ids);
                name.renumber(ids);
            }
            ExprKind::Call { callee, args } => {
                callee.renumber(ids);
                args.renumber(ids);
            }
            ExprKind::Unary { operand, .. } => operand.renumber(ids),
            ExprKind::Binary { left, right, .. } => {
                left.renumber(ids);
                right.renumber(ids);
            }
            ExprKind::Assign { target, value, .. } => {
                target.renumber(ids);
                value.renumber(ids);
            }
            ExprKind::Subscript { base, index } => {
                base.renumber(ids);
                index.renumber(ids);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.renumber(ids);
                then_expr.renumber(ids);
                else_expr.renumber(ids);
            }
            ExprKind::List(items) => items.renumber(ids),
            ExprKind::TupleLiteral(fields) => {
                for field in fields {
                    field.name.renumber(ids);
                    field.value.renumber(ids);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token::Span;

    fn ident(id: u32, name: &str) -> Ident {
        Ident {
            id: NodeId(id),
            name: name.into(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_renumber_gives_every_node_a_fresh_id() {
        let mut expr = Expr {
            id: NodeId(1),
            kind: ExprKind::Attribute {
                base: Box::new(Expr {
                    id: NodeId(2),
                    kind: ExprKind::Ident(ident(3, "In")),
                    span: Span::default(),
                }),
                name: ident(4, "a"),
            },
            span: Span::default(),
        };
        let original = expr.clone();
        let mut ids = NodeIdGen::starting_at(NodeId(100));
        expr.renumber(&mut ids);

        assert_eq!(ids.peek(), NodeId(104));
        assert_eq!(expr.id, NodeId(100));
        let ExprKind::Attribute { base, name } = &expr.kind else {
            panic!("shape changed");
        };
        assert_eq!(base.as_ident().map(|i| i.name.as_str()), Some("In"));
        assert!(name.id.0 >= 100);
        assert_ne!(expr, original);
    }
}
