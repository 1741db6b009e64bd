//! Type expressions

use super::{ParseError, ParseErrorKind, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;
use crate::types::PrimitiveType;

impl Parser {
    /// Parse a type expression.
    pub(crate) fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.current_span();
        let kind = match self.current().clone() {
            Token::List | Token::Set => {
                let is_list = self.check(&Token::List);
                self.advance();
                self.expect(Token::Less)?;
                let element = Box::new(self.parse_type_expr()?);
                self.expect(Token::Greater)?;
                let bound = self.parse_bound()?;
                if is_list {
                    TypeExprKind::List { element, bound }
                } else {
                    TypeExprKind::Set { element, bound }
                }
            }
            Token::Map => {
                self.advance();
                self.expect(Token::Less)?;
                let key = Box::new(self.parse_type_expr()?);
                self.expect(Token::Comma)?;
                let value = Box::new(self.parse_type_expr()?);
                self.expect(Token::Greater)?;
                let bound = self.parse_bound()?;
                TypeExprKind::Map { key, value, bound }
            }
            Token::Optional => {
                self.advance();
                self.expect(Token::Less)?;
                let inner = self.parse_type_expr()?;
                self.expect(Token::Greater)?;
                TypeExprKind::Optional(Box::new(inner))
            }
            Token::Enum => {
                self.advance();
                self.expect(Token::LeftBrace)?;
                let mut values = vec![self.expect_ident()?];
                while self.eat(&Token::Comma) {
                    values.push(self.expect_ident()?);
                }
                self.expect(Token::RightBrace)?;
                TypeExprKind::Enum(values)
            }
            Token::Tuple => {
                self.advance();
                self.expect(Token::Less)?;
                let body = self.parse_tuple_body()?;
                self.expect(Token::Greater)?;
                TypeExprKind::Tuple(body)
            }
            Token::Identifier(name) => match PrimitiveType::from_name(&name) {
                Some(PrimitiveType::Rstring) if matches!(self.peek(), Token::LeftBracket) => {
                    self.advance();
                    self.advance();
                    let bound = self.expect_bound_value()?;
                    self.expect(Token::RightBracket)?;
                    TypeExprKind::BoundedString(bound)
                }
                Some(p) => {
                    self.advance();
                    TypeExprKind::Primitive(p)
                }
                None => TypeExprKind::Named(self.parse_path_name()?),
            },
            _ => return Err(self.unexpected("a type")),
        };
        Ok(TypeExpr {
            id: self.fresh_id(),
            kind,
            span: self.span_from(start),
        })
    }

    /// `stream<...>`
    pub(crate) fn parse_stream_type(&mut self) -> Result<StreamType, ParseError> {
        let start = self.current_span();
        self.expect(Token::Stream)?;
        self.expect(Token::Less)?;
        let body_start = self.current_span();
        let body = self.parse_tuple_body()?;
        let tuple = TypeExpr {
            id: self.fresh_id(),
            kind: TypeExprKind::Tuple(body),
            span: self.span_from(body_start),
        };
        self.expect(Token::Greater)?;
        Ok(StreamType {
            tuple,
            span: self.span_from(start),
        })
    }

    /// Either all attribute declarations or all extended types
    fn parse_tuple_body(&mut self) -> Result<TupleBody, ParseError> {
        let start = self.current_span();
        let mut attributes = Vec::new();
        let mut extends = Vec::new();
        loop {
            let item_start = self.current_span();
            let ty = self.parse_type_expr()?;
            if self.check_ident() {
                let name = self.expect_ident()?;
                attributes.push(AttributeDecl {
                    id: self.fresh_id(),
                    ty,
                    name,
                    span: self.span_from(item_start),
                });
            } else {
                extends.push(ty);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        match (attributes.is_empty(), extends.is_empty()) {
            (false, true) => Ok(TupleBody::Attributes(attributes)),
            (true, false) => Ok(TupleBody::Extends(extends)),
            _ => Err(ParseError {
                kind: ParseErrorKind::MixedTupleBody,
                span: self.span_from(start),
                message: "tuple body mixes attribute declarations and extended types".into(),
            }),
        }
    }

    fn parse_bound(&mut self) -> Result<Option<u32>, ParseError> {
        if !self.eat(&Token::LeftBracket) {
            return Ok(None);
        }
        let bound = self.expect_bound_value()?;
        self.expect(Token::RightBracket)?;
        Ok(Some(bound))
    }

    fn expect_bound_value(&mut self) -> Result<u32, ParseError> {
        let span = self.current_span();
        match self.current().clone() {
            Token::IntLiteral(n) if n >= 0 && n <= u32::MAX as i64 => {
                self.advance();
                Ok(n as u32)
            }
            _ => Err(ParseError::invalid_syntax("expected a non-negative bound", span)),
        }
    }

    /// Whether the current token can only start a type, never an expression
    pub(crate) fn starts_unambiguous_type(&self) -> bool {
        match self.current() {
            Token::Tuple
            | Token::List
            | Token::Set
            | Token::Map
            | Token::Enum
            | Token::Optional => true,
            Token::Identifier(name) => {
                PrimitiveType::from_name(name).is_some() && !matches!(self.peek(), Token::LeftParen)
            }
            _ => false,
        }
    }

    /// Run `f` speculatively; on failure rewind to where it started.
    pub(crate) fn try_parse<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Option<T> {
        let pos = self.pos;
        let errors = self.errors.len();
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = pos;
                self.errors.truncate(errors);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::Parser;
    use crate::types::PrimitiveType;

    fn type_of(source: &str) -> TypeExpr {
        let unit = Parser::new(&format!("type X = {};", source))
            .unwrap()
            .parse()
            .unwrap();
        match unit.definitions.into_iter().next() {
            Some(Definition::Type(t)) => t.tail,
            _ => panic!("expected type def"),
        }
    }

    #[test]
    fn test_primitive_and_bounded_string() {
        assert_eq!(type_of("int64").kind, TypeExprKind::Primitive(PrimitiveType::Int64));
        assert_eq!(type_of("rstring[12]").kind, TypeExprKind::BoundedString(12));
        assert_eq!(type_of("rstring").kind, TypeExprKind::Primitive(PrimitiveType::Rstring));
    }

    #[test]
    fn test_nested_collections() {
        let t = type_of("map<rstring, list<int32>[3]>[10]");
        let TypeExprKind::Map { value, bound, .. } = t.kind else {
            panic!("expected map");
        };
        assert_eq!(bound, Some(10));
        assert!(matches!(value.kind, TypeExprKind::List { bound: Some(3), .. }));
    }

    #[test]
    fn test_enum_and_optional() {
        let TypeExprKind::Enum(values) = type_of("enum {csv, txt}").kind else {
            panic!("expected enum");
        };
        assert_eq!(values.len(), 2);
        assert!(matches!(type_of("optional<int32>").kind, TypeExprKind::Optional(_)));
    }

    #[test]
    fn test_tuple_extension_and_named() {
        let TypeExprKind::Tuple(TupleBody::Extends(parts)) = type_of("tuple<A, ns::B>").kind else {
            panic!("expected extension");
        };
        assert_eq!(parts.len(), 2);
        let TypeExprKind::Named(path) = &parts[1].kind else {
            panic!("expected named");
        };
        assert_eq!(path.display(), "ns::B");
    }
}
