use super::{Parser, Terminator};
use crate::{
    ast::{Node, NodeKind},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    token_stream::unexpected,
    tokenizer::TokenKind,
    util::is_void_tag,
};

impl<'a> Parser<'a> {
    pub(super) fn parse_element(&mut self) -> CompileResult<Node> {
        let start = self.stream.next();
        let name = start.element_name();
        let mut attributes = vec![];
        while !self.stream.test(TokenKind::ElementEnd, None) {
            attributes.push(self.parse_attribute()?);
        }
        let end = self.stream.next();
        let self_closing = end.text == "/>";
        let element = |children, loc| {
            let kind = NodeKind::Element {
                name: name.to_string(),
                attributes,
                children,
                self_closing,
            };
            Node::new(kind, loc)
        };
        if self_closing || is_void_tag(name) {
            return Ok(element(vec![], start.location.merge(&end.location)));
        }
        let (children, terminator) = self.parse_children(&[])?;
        match terminator {
            Terminator::EndTag(t) if t.element_name() == name => {
                Ok(element(children, start.location.merge(&t.location)))
            }
            Terminator::EndTag(t) => Err(CompilationError::new(ErrorKind::MismatchedEndTag)
                .with_additional_message(format!(": found `{}`, expected `</{}>`.", t.text, name))
                .with_location(t.location)),
            Terminator::Eof => Err(CompilationError::new(ErrorKind::MissingEndTag)
                .with_additional_message(format!(": `<{}>` is not closed.", name))
                .with_location(start.location)),
            Terminator::Tag(t) => Err(unexpected(&t, "an end tag")),
        }
    }

    fn parse_attribute(&mut self) -> CompileResult<Node> {
        let name = self.expect_symbol(None)?;
        if self.stream.next_if(TokenKind::Punctuation, Some("=")).is_none() {
            let kind = NodeKind::Attribute {
                name: name.text.to_string(),
                value: None,
            };
            return Ok(Node::new(kind, name.location));
        }
        let value = match self.stream.peek().kind {
            TokenKind::StringStart => self.parse_attribute_value()?,
            // unquoted `<input size=10>`
            TokenKind::Symbol => {
                let token = self.stream.next();
                Node::string(token.text, token.location)
            }
            _ => return Err(unexpected(self.stream.peek(), "an attribute value")),
        };
        let kind = NodeKind::Attribute {
            name: name.text.to_string(),
            value: Some(Box::new(value)),
        };
        Ok(Node::new(kind, self.loc_from(name.location.start)))
    }

    /// Quoted value, interpolations are joined with `~`.
    fn parse_attribute_value(&mut self) -> CompileResult<Node> {
        let open = self.stream.next();
        let mut parts: Vec<Node> = vec![];
        loop {
            let token = self.stream.next();
            match token.kind {
                TokenKind::StringEnd => break,
                // attribute text carries no quotes, it is never printed verbatim
                TokenKind::String => parts.push(Node::string(token.text, token.location)),
                TokenKind::ExpressionStart => {
                    parts.push(self.parse_expression()?);
                    self.stream.expect(TokenKind::ExpressionEnd, None)?;
                }
                _ => return Err(unexpected(&token, "an attribute value")),
            }
        }
        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(first) => first,
            None => return Ok(Node::string("", self.loc_from(open.location.start))),
        };
        Ok(parts.fold(first, |left, right| {
            let loc = left.loc.merge(&right.loc);
            let kind = NodeKind::BinaryExpression {
                operator: "~".into(),
                left: Box::new(left),
                right: Box::new(right),
            };
            Node::new(kind, loc)
        }))
    }
}
