//! Statements and local declarations

use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;

impl Parser {
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.current_span();
        self.expect(Token::LeftBrace)?;
        let id = self.fresh_id();
        let mut stmts = Vec::new();
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(Token::RightBrace)?;
        Ok(Block {
            id,
            stmts,
            span: self.span_from(start),
        })
    }

    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();
        match self.current().clone() {
            Token::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            Token::If => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                let then_branch = Box::new(self.parse_stmt()?);
                let else_branch = if self.eat(&Token::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                    span: self.span_from(start),
                })
            }
            Token::For => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let ty = self.parse_type_expr()?;
                let name = self.expect_ident()?;
                self.expect(Token::In)?;
                let iterable = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::For(ForStmt {
                    id: self.fresh_id(),
                    ty,
                    name,
                    iterable,
                    body,
                    span: self.span_from(start),
                }))
            }
            Token::While => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::While {
                    cond,
                    body,
                    span: self.span_from(start),
                })
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Return {
                    value,
                    span: self.span_from(start),
                })
            }
            Token::Break => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Break(self.span_from(start)))
            }
            Token::Continue => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Continue(self.span_from(start)))
            }
            _ if self.at_local_decl() => Ok(Stmt::Local(self.parse_local_decl()?)),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// A modifier, an unambiguous type, or a type followed by a name
    fn at_local_decl(&mut self) -> bool {
        if self.check_any(&[Token::Mutable, Token::Static, Token::Public]) {
            return true;
        }
        if self.starts_unambiguous_type() {
            return true;
        }
        if !self.check_ident() {
            return false;
        }
        let pos = self.pos;
        let is_decl = self
            .try_parse(|p| {
                p.parse_type_expr()?;
                if p.check_ident() {
                    Ok(())
                } else {
                    Err(p.unexpected("a declared name"))
                }
            })
            .is_some();
        self.pos = pos;
        is_decl
    }

    /// `mutable int32 a = 1, b;`
    pub(crate) fn parse_local_decl(&mut self) -> Result<LocalDecl, ParseError> {
        let start = self.current_span();
        let modifiers = self.parse_modifiers();
        let ty = self.parse_type_expr()?;
        let mut items = Vec::new();
        loop {
            let item_start = self.current_span();
            let name = self.expect_ident()?;
            let init = if self.eat(&Token::Equal) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            items.push(LocalItem {
                id: self.fresh_id(),
                name,
                init,
                span: self.span_from(item_start),
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon)?;
        Ok(LocalDecl {
            modifiers,
            ty,
            items,
            span: self.span_from(start),
        })
    }
}
