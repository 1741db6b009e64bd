//! Expressions
//!
//! Precedence, lowest first: assignment, conditional, `||`, `&&`, `in`,
//! equality, relational, additive, multiplicative, unary, postfix.

use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// `e, e, e`
    pub(crate) fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_conditional()?;
        let op = match self.current() {
            Token::Equal => AssignOp::Assign,
            Token::PlusEqual => AssignOp::AddAssign,
            Token::MinusEqual => AssignOp::SubAssign,
            Token::StarEqual => AssignOp::MulAssign,
            Token::SlashEqual => AssignOp::DivAssign,
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_assignment()?;
        let span = target.span.merge(&value.span);
        Ok(Expr {
            id: self.fresh_id(),
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then_expr = self.parse_assignment()?;
        self.expect(Token::Colon)?;
        let else_expr = self.parse_conditional()?;
        let span = cond.span.merge(&else_expr.span);
        Ok(Expr {
            id: self.fresh_id(),
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        })
    }

    /// Precedence climbing over the binary operators
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = binary_op(self.current()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span.merge(&right.span);
            left = Expr {
                id: self.fresh_id(),
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let op = match self.current() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr {
            id: self.fresh_id(),
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span: self.span_from(start),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    let span = expr.span.merge(&name.span);
                    expr = Expr {
                        id: self.fresh_id(),
                        kind: ExprKind::Attribute {
                            base: Box::new(expr),
                            name,
                        },
                        span,
                    };
                }
                Token::LeftParen => {
                    self.advance();
                    let args = if self.check(&Token::RightParen) {
                        Vec::new()
                    } else {
                        self.parse_expr_list()?
                    };
                    self.expect(Token::RightParen)?;
                    let span = self.span_from(expr.span);
                    expr = Expr {
                        id: self.fresh_id(),
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RightBracket)?;
                    let span = self.span_from(expr.span);
                    expr = Expr {
                        id: self.fresh_id(),
                        kind: ExprKind::Subscript {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let kind = match self.current().clone() {
            Token::IntLiteral(n) => {
                self.advance();
                ExprKind::Literal(Literal::Int(n))
            }
            Token::FloatLiteral(n) => {
                self.advance();
                ExprKind::Literal(Literal::Float(n))
            }
            Token::StringLiteral(s) => {
                self.advance();
                ExprKind::Literal(Literal::String(s))
            }
            Token::True | Token::False => {
                let value = self.check(&Token::True);
                self.advance();
                ExprKind::Literal(Literal::Bool(value))
            }
            Token::Identifier(_) => {
                if self.at_qualified_name() {
                    ExprKind::Qualified(self.parse_path_name()?)
                } else {
                    ExprKind::Ident(self.expect_ident()?)
                }
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                return Ok(inner);
            }
            Token::LeftBracket => {
                self.advance();
                let items = if self.check(&Token::RightBracket) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect(Token::RightBracket)?;
                ExprKind::List(items)
            }
            Token::LeftBrace => {
                self.advance();
                let mut fields = Vec::new();
                while !self.check(&Token::RightBrace) {
                    let name = self.expect_ident()?;
                    self.expect(Token::Equal)?;
                    let value = self.parse_conditional()?;
                    fields.push(TupleField { name, value });
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RightBrace)?;
                ExprKind::TupleLiteral(fields)
            }
            _ => return Err(self.unexpected("an expression")),
        };
        Ok(Expr {
            id: self.fresh_id(),
            kind,
            span: self.span_from(start),
        })
    }

    /// `a.b::c` ahead: a dotted name followed by `::`
    fn at_qualified_name(&self) -> bool {
        let mut i = 0;
        while matches!(self.peek_nth(i + 1), Token::Dot)
            && matches!(self.peek_nth(i + 2), Token::Identifier(_))
        {
            i += 2;
        }
        matches!(self.peek_nth(i + 1), Token::ColonColon)
    }
}

fn binary_op(tok: &Token) -> Option<(BinaryOp, u8)> {
    Some(match tok {
        Token::PipePipe => (BinaryOp::Or, 1),
        Token::AmpAmp => (BinaryOp::And, 2),
        Token::In => (BinaryOp::In, 3),
        Token::EqualEqual => (BinaryOp::Eq, 4),
        Token::BangEqual => (BinaryOp::Ne, 4),
        Token::Less => (BinaryOp::Lt, 5),
        Token::LessEqual => (BinaryOp::Le, 5),
        Token::Greater => (BinaryOp::Gt, 5),
        Token::GreaterEqual => (BinaryOp::Ge, 5),
        Token::Plus => (BinaryOp::Add, 6),
        Token::Minus => (BinaryOp::Sub, 6),
        Token::Star => (BinaryOp::Mul, 7),
        Token::Slash => (BinaryOp::Div, 7),
        Token::Percent => (BinaryOp::Mod, 7),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::Parser;

    fn expr(source: &str) -> Expr {
        let unit = Parser::new(&format!("void f() {{ {}; }}", source))
            .unwrap()
            .parse()
            .unwrap();
        let Some(Definition::Function(f)) = unit.definitions.into_iter().next() else {
            panic!("expected function");
        };
        match f.body.stmts.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let e = expr("a + b * c");
        let ExprKind::Binary { op, right, .. } = e.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_postfix_chain() {
        let e = expr("In.a.b(1)[2]");
        let ExprKind::Subscript { base, .. } = e.kind else {
            panic!("expected subscript");
        };
        let ExprKind::Call { callee, args } = base.kind else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(callee.kind, ExprKind::Attribute { ref name, .. } if name.name == "b"));
    }

    #[test]
    fn test_qualified_vs_attribute() {
        assert!(matches!(expr("a.b::c").kind, ExprKind::Qualified(_)));
        assert!(matches!(expr("a.b").kind, ExprKind::Attribute { .. }));
    }

    #[test]
    fn test_assignment_and_literals() {
        let e = expr("x += {a = 1, b = [true, \"s\"]}");
        let ExprKind::Assign { op, value, .. } = e.kind else {
            panic!("expected assignment");
        };
        assert_eq!(op, AssignOp::AddAssign);
        assert!(matches!(value.kind, ExprKind::TupleLiteral(ref f) if f.len() == 2));
    }
}
