//! Operator invocations and their clauses

use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;

impl Parser {
    /// Whether the current token can start an operator invocation
    pub(crate) fn starts_op_invoke(&self) -> bool {
        self.check_any(&[Token::Stream, Token::LeftParen, Token::At])
    }

    /// `stream<T> Out = Op(In) { ... }` or `(stream<T> A; stream<U> B) as X = Op(...) {...}`
    pub(crate) fn parse_op_invoke(&mut self) -> Result<OpInvoke, ParseError> {
        let start = self.current_span();
        let mut annotations = Vec::new();
        while self.check(&Token::At) {
            annotations.push(self.parse_annotation()?);
        }

        let id = self.fresh_id();
        let mut outputs = Vec::new();
        if self.eat(&Token::LeftParen) {
            while !self.check(&Token::RightParen) {
                outputs.push(self.parse_op_output()?);
                if !self.eat(&Token::Semicolon) {
                    break;
                }
            }
            self.expect(Token::RightParen)?;
        } else {
            outputs.push(self.parse_op_output()?);
        }

        let alias = if self.eat(&Token::As) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(Token::Equal)?;
        let operator = self.parse_path_name()?;

        self.expect(Token::LeftParen)?;
        let mut inputs = Vec::new();
        while !self.check(&Token::RightParen) {
            inputs.push(self.parse_port_inputs()?);
            if !self.eat(&Token::Semicolon) {
                break;
            }
        }
        self.expect(Token::RightParen)?;

        let body = self.parse_op_invoke_body()?;
        Ok(OpInvoke {
            id,
            annotations,
            outputs,
            alias,
            operator,
            inputs,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_op_output(&mut self) -> Result<OpOutput, ParseError> {
        let start = self.current_span();
        let ty = self.parse_stream_type()?;
        let name = self.expect_ident()?;
        // `as` after a lone output is the invocation alias, handled by the caller
        let alias = if self.check(&Token::As) && !self.check_lone_output_end() {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };
        Ok(OpOutput {
            id: self.fresh_id(),
            ty,
            name,
            alias,
            span: self.span_from(start),
        })
    }

    /// `stream<T> A as X =`: the alias belongs to the invocation
    fn check_lone_output_end(&self) -> bool {
        matches!(self.peek_nth(2), Token::Equal)
    }

    fn parse_port_inputs(&mut self) -> Result<PortInputs, ParseError> {
        let start = self.current_span();
        let mut streams = vec![self.expect_ident()?];
        while self.eat(&Token::Comma) {
            streams.push(self.expect_ident()?);
        }
        let alias = if self.eat(&Token::As) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        Ok(PortInputs {
            id: self.fresh_id(),
            streams,
            alias,
            span: self.span_from(start),
        })
    }

    /// `@name(key = value, ...)`
    fn parse_annotation(&mut self) -> Result<Annotation, ParseError> {
        let start = self.current_span();
        self.expect(Token::At)?;
        let id = self.fresh_id();
        let name = self.expect_ident()?;
        let mut args = Vec::new();
        if self.eat(&Token::LeftParen) {
            while !self.check(&Token::RightParen) {
                let key = self.expect_ident()?;
                self.expect(Token::Equal)?;
                let value = self.parse_expr()?;
                args.push(AnnotationArg { key, value });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RightParen)?;
        }
        Ok(Annotation {
            id,
            name,
            args,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // Invocation body
    // ========================================================================

    fn parse_op_invoke_body(&mut self) -> Result<OpInvokeBody, ParseError> {
        let mut body = OpInvokeBody::default();
        self.expect(Token::LeftBrace)?;
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            match self.current() {
                Token::Logic => {
                    self.advance();
                    while self.check_any(&[
                        Token::State,
                        Token::OnTuple,
                        Token::OnPunct,
                        Token::OnProcess,
                    ]) {
                        match self.parse_logic_item() {
                            Ok(item) => body.logic.push(item),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Window => {
                    self.advance();
                    while self.check_ident() {
                        match self.parse_window_item() {
                            Ok(item) => body.windows.push(item),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Param => {
                    self.advance();
                    while self.check_ident() {
                        match self.parse_actual_param() {
                            Ok(item) => body.params.push(item),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Output => {
                    self.advance();
                    while self.check_ident() {
                        match self.parse_output_item() {
                            Ok(item) => body.outputs.push(item),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Config => {
                    self.advance();
                    body.configs.extend(self.parse_config_items());
                }
                _ => {
                    return Err(
                        self.unexpected("'logic', 'window', 'param', 'output' or 'config'")
                    )
                }
            }
        }
        self.expect(Token::RightBrace)?;
        Ok(body)
    }

    fn parse_logic_item(&mut self) -> Result<LogicItem, ParseError> {
        let start = self.current_span();
        let id = self.fresh_id();
        match self.advance() {
            Token::State => {
                self.expect(Token::Colon)?;
                let mut decls = Vec::new();
                if self.eat(&Token::LeftBrace) {
                    while !self.check(&Token::RightBrace) && !self.at_eof() {
                        decls.push(self.parse_local_decl()?);
                    }
                    self.expect(Token::RightBrace)?;
                } else {
                    decls.push(self.parse_local_decl()?);
                }
                Ok(LogicItem::State(StateItem {
                    id,
                    decls,
                    span: self.span_from(start),
                }))
            }
            Token::OnProcess => {
                self.expect(Token::Colon)?;
                let body = self.parse_stmt()?;
                Ok(LogicItem::OnProcess(ProcessLogic {
                    id,
                    body,
                    span: self.span_from(start),
                }))
            }
            tok => {
                let port = self.expect_ident()?;
                self.expect(Token::Colon)?;
                let body = self.parse_stmt()?;
                let logic = PortLogic {
                    id,
                    port,
                    body,
                    span: self.span_from(start),
                };
                if tok == Token::OnTuple {
                    Ok(LogicItem::OnTuple(logic))
                } else {
                    Ok(LogicItem::OnPunct(logic))
                }
            }
        }
    }

    fn parse_window_item(&mut self) -> Result<WindowItem, ParseError> {
        let start = self.current_span();
        let port = self.expect_ident()?;
        self.expect(Token::Colon)?;
        let exprs = self.parse_expr_list()?;
        self.expect(Token::Semicolon)?;
        Ok(WindowItem {
            id: self.fresh_id(),
            port,
            exprs,
            span: self.span_from(start),
        })
    }

    fn parse_actual_param(&mut self) -> Result<ActualParam, ParseError> {
        let start = self.current_span();
        let name = self.expect_ident()?;
        self.expect(Token::Colon)?;
        let value = self.parse_op_actual()?;
        self.expect(Token::Semicolon)?;
        Ok(ActualParam {
            id: self.fresh_id(),
            name,
            value,
            span: self.span_from(start),
        })
    }

    /// A type when the tokens can only be a type, else a list of expressions
    pub(crate) fn parse_op_actual(&mut self) -> Result<OpActual, ParseError> {
        if self.starts_unambiguous_type() {
            return Ok(OpActual::Type(self.parse_type_expr()?));
        }
        Ok(OpActual::Exprs(self.parse_expr_list()?))
    }

    fn parse_output_item(&mut self) -> Result<OutputItem, ParseError> {
        let start = self.current_span();
        let port = self.expect_ident()?;
        self.expect(Token::Colon)?;
        let mut assignments = Vec::new();
        loop {
            let assign_start = self.current_span();
            let attribute = self.expect_ident()?;
            self.expect(Token::Equal)?;
            let value = self.parse_expr()?;
            assignments.push(OutputAssign {
                id: self.fresh_id(),
                attribute,
                value,
                span: self.span_from(assign_start),
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon)?;
        Ok(OutputItem {
            id: self.fresh_id(),
            port,
            assignments,
            span: self.span_from(start),
        })
    }

    /// `label: exprs;` items until the next section
    pub(crate) fn parse_config_items(&mut self) -> Vec<ConfigItem> {
        let mut items = Vec::new();
        while self.check_ident() {
            match self.parse_config_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.report(err);
                    self.sync_to_item_end();
                }
            }
        }
        items
    }

    fn parse_config_item(&mut self) -> Result<ConfigItem, ParseError> {
        let start = self.current_span();
        let label = self.expect_ident()?;
        self.expect(Token::Colon)?;
        let exprs = self.parse_expr_list()?;
        self.expect(Token::Semicolon)?;
        Ok(ConfigItem {
            id: self.fresh_id(),
            label,
            exprs,
            span: self.span_from(start),
        })
    }
}
