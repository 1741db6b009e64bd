//! Compilation units and top-level definitions

use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;

impl Parser {
    pub(crate) fn parse_compilation_unit(&mut self) -> CompilationUnit {
        let start = self.current_span();
        let id = self.fresh_id();

        let namespace = if self.check(&Token::Namespace) {
            match self.parse_namespace_decl() {
                Ok(ns) => Some(ns),
                Err(err) => {
                    self.report(err);
                    self.sync_to_definition();
                    None
                }
            }
        } else {
            None
        };

        let mut uses = Vec::new();
        while self.check(&Token::Use) {
            match self.parse_use() {
                Ok(u) => uses.push(u),
                Err(err) => {
                    self.report(err);
                    self.sync_to_definition();
                }
            }
        }

        let mut definitions = Vec::new();
        while !self.at_eof() {
            match self.parse_definition() {
                Ok(def) => definitions.push(def),
                Err(err) => {
                    self.report(err);
                    self.sync_to_definition();
                }
            }
        }

        CompilationUnit {
            id,
            namespace,
            uses,
            definitions,
            span: self.span_from(start),
        }
    }

    fn parse_namespace_decl(&mut self) -> Result<NamespaceDecl, ParseError> {
        let start = self.current_span();
        self.expect(Token::Namespace)?;
        let name = self.parse_qualified_name()?;
        self.expect(Token::Semicolon)?;
        Ok(NamespaceDecl {
            name,
            span: self.span_from(start),
        })
    }

    fn parse_use(&mut self) -> Result<UseDirective, ParseError> {
        let start = self.current_span();
        self.expect(Token::Use)?;
        let namespace = self.parse_qualified_name()?;
        self.expect(Token::ColonColon)?;
        let target = if self.eat(&Token::Star) {
            UseTarget::Wildcard
        } else {
            UseTarget::Name(self.expect_ident()?)
        };
        self.expect(Token::Semicolon)?;
        Ok(UseDirective {
            id: self.fresh_id(),
            namespace,
            target,
            span: self.span_from(start),
        })
    }

    /// `a.b.c`
    pub(crate) fn parse_qualified_name(&mut self) -> Result<QualifiedName, ParseError> {
        let start = self.current_span();
        let mut parts = vec![self.expect_ident()?];
        while self.check(&Token::Dot) && matches!(self.peek(), Token::Identifier(_)) {
            self.advance();
            parts.push(self.expect_ident()?);
        }
        Ok(QualifiedName {
            parts,
            span: self.span_from(start),
        })
    }

    /// `name` or `a.b::name`
    pub(crate) fn parse_path_name(&mut self) -> Result<PathName, ParseError> {
        let start = self.current_span();
        let qualified = self.parse_qualified_name()?;
        if self.eat(&Token::ColonColon) {
            let name = self.expect_ident()?;
            return Ok(PathName {
                namespace: Some(qualified),
                name,
                span: self.span_from(start),
            });
        }
        let mut parts = qualified.parts;
        if parts.len() > 1 {
            return Err(ParseError::invalid_syntax(
                "dotted name must be followed by '::'",
                qualified.span,
            ));
        }
        let name = parts.remove(0);
        Ok(PathName {
            namespace: None,
            name,
            span: self.span_from(start),
        })
    }

    pub(crate) fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let m = match self.current() {
                Token::Public => Modifier::Public,
                Token::Static => Modifier::Static,
                Token::Mutable => Modifier::Mutable,
                Token::Stateful => Modifier::Stateful,
                _ => return modifiers,
            };
            self.advance();
            modifiers.push(m);
        }
    }

    fn parse_definition(&mut self) -> Result<Definition, ParseError> {
        let start = self.current_span();
        if self.check(&Token::Less) {
            let (type_formals, bounds_formals) = self.parse_generics()?;
            let modifiers = self.parse_modifiers();
            let mut def = self.parse_function(modifiers, start)?;
            def.type_formals = type_formals;
            def.bounds_formals = bounds_formals;
            return Ok(Definition::Function(def));
        }
        let modifiers = self.parse_modifiers();
        match self.current() {
            Token::Type => {
                self.advance();
                let def = self.parse_type_def_rest(modifiers, start)?;
                Ok(Definition::Type(def))
            }
            Token::Composite => {
                let def = self.parse_composite(modifiers, start)?;
                Ok(Definition::Composite(def))
            }
            _ => {
                let def = self.parse_function(modifiers, start)?;
                Ok(Definition::Function(def))
            }
        }
    }

    /// `T = tail;` after the `type` keyword or inside a composite `type` section
    pub(crate) fn parse_type_def_rest(
        &mut self,
        modifiers: Vec<Modifier>,
        start: crate::parser::token::Span,
    ) -> Result<TypeDef, ParseError> {
        let id = self.fresh_id();
        let name = self.expect_ident()?;
        self.expect(Token::Equal)?;
        let tail = self.parse_type_expr()?;
        self.expect(Token::Semicolon)?;
        Ok(TypeDef {
            id,
            modifiers,
            name,
            tail,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // Composites
    // ========================================================================

    fn parse_composite(
        &mut self,
        modifiers: Vec<Modifier>,
        start: crate::parser::token::Span,
    ) -> Result<CompositeDef, ParseError> {
        self.expect(Token::Composite)?;
        let id = self.fresh_id();
        let name = self.expect_ident()?;

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        if self.eat(&Token::LeftParen) {
            while !self.check(&Token::RightParen) {
                let is_input = match self.current() {
                    Token::Input => true,
                    Token::Output => false,
                    _ => return Err(self.unexpected("'input' or 'output'")),
                };
                self.advance();
                let ports = self.parse_composite_ports()?;
                if is_input {
                    inputs.extend(ports);
                } else {
                    outputs.extend(ports);
                }
                if !self.eat(&Token::Semicolon) {
                    break;
                }
            }
            self.expect(Token::RightParen)?;
        }

        let mut def = CompositeDef {
            id,
            modifiers,
            name,
            inputs,
            outputs,
            formals: Vec::new(),
            types: Vec::new(),
            graph: Vec::new(),
            configs: Vec::new(),
            span: start,
        };

        self.expect(Token::LeftBrace)?;
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            match self.current() {
                Token::Param => {
                    self.advance();
                    while self.starts_composite_formal() {
                        match self.parse_composite_formal() {
                            Ok(formal) => def.formals.push(formal),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Type => {
                    self.advance();
                    while self.check_ident() || self.check_any(&[Token::Static, Token::Public]) {
                        let item_start = self.current_span();
                        let modifiers = self.parse_modifiers();
                        match self.parse_type_def_rest(modifiers, item_start) {
                            Ok(t) => def.types.push(t),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Graph => {
                    self.advance();
                    while self.starts_op_invoke() {
                        match self.parse_op_invoke() {
                            Ok(invoke) => def.graph.push(invoke),
                            Err(err) => {
                                self.report(err);
                                self.sync_to_item_end();
                            }
                        }
                    }
                }
                Token::Config => {
                    self.advance();
                    def.configs.extend(self.parse_config_items());
                }
                _ => return Err(self.unexpected("'param', 'type', 'graph' or 'config'")),
            }
        }
        self.expect(Token::RightBrace)?;
        def.span = self.span_from(start);
        Ok(def)
    }

    /// `stream<T> In, In2` (the stream type is optional)
    fn parse_composite_ports(&mut self) -> Result<Vec<CompositePort>, ParseError> {
        let mut ports = Vec::new();
        loop {
            let start = self.current_span();
            let ty = if self.check(&Token::Stream) {
                Some(self.parse_stream_type()?)
            } else {
                None
            };
            let name = self.expect_ident()?;
            ports.push(CompositePort {
                id: self.fresh_id(),
                ty,
                name,
                span: self.span_from(start),
            });
            if !self.eat(&Token::Comma) {
                return Ok(ports);
            }
        }
    }

    /// A formal starts with its mode; `type` only counts when a `$name` follows,
    /// otherwise it opens the composite's `type` section.
    fn starts_composite_formal(&self) -> bool {
        match self.current() {
            Token::Expression | Token::Attribute | Token::Function | Token::Operator => true,
            Token::Type => matches!(self.peek(), Token::Identifier(name) if name.starts_with('$')),
            _ => false,
        }
    }

    /// `expression<int32> $n : 5;`
    fn parse_composite_formal(&mut self) -> Result<CompositeFormal, ParseError> {
        let start = self.current_span();
        let mode = match self.advance() {
            Token::Expression => {
                if self.eat(&Token::Less) {
                    let ty = self.parse_type_expr()?;
                    self.expect(Token::Greater)?;
                    FormalMode::Expression(Some(ty))
                } else {
                    FormalMode::Expression(None)
                }
            }
            Token::Attribute => FormalMode::Attribute,
            Token::Function => FormalMode::Function,
            Token::Operator => FormalMode::Operator,
            _ => FormalMode::Type,
        };
        let id = self.fresh_id();
        let name = self.expect_ident()?;
        let default = if self.eat(&Token::Colon) {
            Some(self.parse_op_actual()?)
        } else {
            None
        };
        self.expect(Token::Semicolon)?;
        Ok(CompositeFormal {
            id,
            mode,
            name,
            default,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// `<any T, tuple U>[N]` ahead of a generic function
    fn parse_generics(&mut self) -> Result<(Vec<TypeFormalDecl>, Vec<Ident>), ParseError> {
        self.expect(Token::Less)?;
        let mut type_formals = Vec::new();
        while !self.check(&Token::Greater) {
            let start = self.current_span();
            let constraint = match self.current().clone() {
                Token::Identifier(name) => name,
                token if token.is_keyword() => token.to_string(),
                _ => return Err(self.unexpected("a type constraint")),
            };
            self.advance();
            let name = self.expect_ident()?;
            type_formals.push(TypeFormalDecl {
                constraint,
                name,
                span: self.span_from(start),
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Greater)?;

        let mut bounds_formals = Vec::new();
        if self.eat(&Token::LeftBracket) {
            while !self.check(&Token::RightBracket) {
                bounds_formals.push(self.expect_ident()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RightBracket)?;
        }
        Ok((type_formals, bounds_formals))
    }

    fn parse_function(
        &mut self,
        modifiers: Vec<Modifier>,
        start: crate::parser::token::Span,
    ) -> Result<FunctionDef, ParseError> {
        let return_type = self.parse_type_expr()?;
        let id = self.fresh_id();
        let name = self.expect_ident()?;
        self.expect(Token::LeftParen)?;
        let mut formals = Vec::new();
        while !self.check(&Token::RightParen) {
            let formal_start = self.current_span();
            let mutable = self.eat(&Token::Mutable);
            let ty = self.parse_type_expr()?;
            let formal_name = self.expect_ident()?;
            formals.push(FunctionFormal {
                id: self.fresh_id(),
                mutable,
                ty,
                name: formal_name,
                span: self.span_from(formal_start),
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RightParen)?;
        let body = self.parse_block()?;
        Ok(FunctionDef {
            id,
            modifiers,
            type_formals: Vec::new(),
            bounds_formals: Vec::new(),
            return_type,
            name,
            formals,
            body,
            span: self.span_from(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::Parser;

    fn parse(source: &str) -> CompilationUnit {
        Parser::new(source).unwrap().parse().unwrap()
    }

    #[test]
    fn test_composite_sections() {
        let unit = parse(
            "public composite Main {
                param
                    expression<int32> $n : 5;
                    type $T : tuple<int32 a>;
                    operator $Op;
                type
                    static S = int32;
                    U = $T;
                graph
                    stream<S x> A = Beacon() {}
                config
                    restartable: true;
            }",
        );
        let Definition::Composite(c) = &unit.definitions[0] else {
            panic!("expected composite");
        };
        assert!(c.is_public());
        assert_eq!(c.formals.len(), 3);
        assert!(matches!(c.formals[0].mode, FormalMode::Expression(Some(_))));
        assert!(matches!(c.formals[1].default, Some(OpActual::Type(_))));
        assert!(matches!(c.formals[2].mode, FormalMode::Operator));
        assert_eq!(c.types.len(), 2);
        assert!(c.types[0].is_static());
        assert_eq!(c.graph.len(), 1);
        assert_eq!(c.configs.len(), 1);
    }

    #[test]
    fn test_untyped_ports() {
        let unit = parse("composite C(output O1, O2; input I) { graph }");
        let Definition::Composite(c) = &unit.definitions[0] else {
            panic!("expected composite");
        };
        assert_eq!(c.outputs.len(), 2);
        assert_eq!(c.inputs.len(), 1);
        assert!(c.inputs[0].ty.is_none());
    }

    #[test]
    fn test_function_definition() {
        let unit = parse("stateful int32 add(int32 a, mutable int32 b) { return a + b; }");
        let Definition::Function(f) = &unit.definitions[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name.name, "add");
        assert_eq!(f.formals.len(), 2);
        assert!(f.formals[1].mutable);
        assert_eq!(f.modifiers, vec![Modifier::Stateful]);
    }

    #[test]
    fn test_generic_function_head() {
        let unit = parse("<any T, tuple U>[N] public T pick(list<T> xs, U u) { return xs[0]; }");
        let Definition::Function(f) = &unit.definitions[0] else {
            panic!("expected function");
        };
        assert!(f.is_generic());
        let formals: Vec<_> = f
            .type_formals
            .iter()
            .map(|t| (t.constraint.as_str(), t.name.name.as_str()))
            .collect();
        assert_eq!(formals, vec![("any", "T"), ("tuple", "U")]);
        assert_eq!(f.bounds_formals[0].name, "N");
        assert_eq!(f.modifiers, vec![Modifier::Public]);
        assert_eq!(f.name.name, "pick");
    }

    #[test]
    fn test_qualified_operator_name() {
        let unit = parse(
            "composite M { graph stream<int32 a> A = spl.utility::Beacon() {} }",
        );
        let Definition::Composite(c) = &unit.definitions[0] else {
            panic!("expected composite");
        };
        assert_eq!(c.graph[0].operator.display(), "spl.utility::Beacon");
    }
}
