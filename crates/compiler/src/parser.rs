//! Recursive descent parser.
//!
//! The parser itself only knows the template level grammar: text, `{{ }}`,
//! comments and markup elements. Every `{% keyword %}` is dispatched to the
//! tag parser registered for `keyword`, and every operator comes from the
//! [`Registry`]. Expressions are in [`expression`], markup in [`element`].

mod element;
mod expression;

use super::{
    ast::{Node, NodeKind},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    extension::Registry,
    flags::TokenFlags,
    token_stream::{unexpected, TokenStream},
    tokenizer::{Lexer, Token, TokenKind},
    Position, SourceLocation,
};
#[cfg(feature = "serde")]
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ParseOption {
    /// honor `-` next to delimiters. Turning it off keeps every Text verbatim.
    pub apply_whitespace_trimming: bool,
    /// keep string literals as authored, escapes included
    pub preserve_source_literally: bool,
}

impl Default for ParseOption {
    fn default() -> Self {
        Self {
            apply_whitespace_trimming: true,
            preserve_source_literally: false,
        }
    }
}

/// How a run of children ended.
enum Terminator<'a> {
    Eof,
    /// `{% keyword` of an awaited end tag, both tokens consumed
    Tag(Token<'a>),
    /// `</name>` markup end tag, consumed
    EndTag(Token<'a>),
}

pub struct Parser<'a> {
    stream: TokenStream<'a>,
    registry: &'a Registry,
    option: ParseOption,
    /// set by a `-%}` style delimiter, consumed by the next Text
    trim_next: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, registry: &'a Registry, option: ParseOption) -> CompileResult<Self> {
        let lexer = Lexer::new(source, registry.operator_texts());
        let stream = TokenStream::new(lexer)?;
        Ok(Self {
            stream,
            registry,
            option,
            trim_next: false,
        })
    }

    pub fn stream(&mut self) -> &mut TokenStream<'a> {
        &mut self.stream
    }
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }
    pub fn option(&self) -> &ParseOption {
        &self.option
    }

    /// location from `start` to the end of the last consumed token
    pub fn loc_from(&self, start: Position) -> SourceLocation {
        SourceLocation::new(start, self.stream.prev_end())
    }

    pub fn parse_template(mut self, name: &str) -> CompileResult<Node> {
        let (body, terminator) = self.parse_children(&[])?;
        match terminator {
            Terminator::Eof => {}
            Terminator::EndTag(t) => return Err(unexpected_end_tag(&t)),
            Terminator::Tag(t) => return Err(unexpected(&t, "a tag keyword")),
        }
        let eof = self.stream.peek().location.end;
        let kind = NodeKind::Template {
            name: name.to_string(),
            parent: None,
            body,
        };
        Ok(Node::new(kind, SourceLocation::new(Position::default(), eof)))
    }

    /// Parse children until one of `end_tags` opens a tag.
    /// Returns the children and the keyword token. The caller consumes the
    /// rest of that tag, usually with [`Parser::expect_tag_end`].
    pub fn parse_body(&mut self, end_tags: &[&str]) -> CompileResult<(Vec<Node>, Token<'a>)> {
        let (body, terminator) = self.parse_children(end_tags)?;
        match terminator {
            Terminator::Tag(keyword) => Ok((body, keyword)),
            Terminator::EndTag(t) => Err(unexpected_end_tag(&t)),
            Terminator::Eof => {
                let expected: Vec<_> = end_tags.iter().map(|t| format!("`{{% {} %}}`", t)).collect();
                let eof = self.stream.peek();
                Err(CompilationError::new(ErrorKind::MissingEndTag)
                    .with_additional_message(format!(": expected {}.", expected.join(" or ")))
                    .with_location(eof.location))
            }
        }
    }

    /// Consume `%}` and remember its trim marker for the following text.
    pub fn expect_tag_end(&mut self) -> CompileResult<Token<'a>> {
        let end = self.stream.expect(TokenKind::TagEnd, None)?;
        self.set_trim_after(&end);
        Ok(end)
    }

    pub fn expect_symbol(&mut self, text: Option<&str>) -> CompileResult<Token<'a>> {
        self.stream.expect(TokenKind::Symbol, text)
    }

    pub fn test_symbol(&self, text: &str) -> bool {
        self.stream.test(TokenKind::Symbol, Some(text))
    }

    pub fn test_punctuation(&self, text: &str) -> bool {
        self.stream.test(TokenKind::Punctuation, Some(text))
    }

    fn parse_children(&mut self, end_tags: &[&str]) -> CompileResult<(Vec<Node>, Terminator<'a>)> {
        let mut body = vec![];
        loop {
            match self.stream.peek().kind {
                TokenKind::Eof => return Ok((body, Terminator::Eof)),
                TokenKind::EndTag => {
                    let end = self.stream.next();
                    return Ok((body, Terminator::EndTag(end)));
                }
                TokenKind::Text => {
                    let text = self.stream.next();
                    if let Some(node) = self.text_node(text) {
                        body.push(node);
                    }
                }
                TokenKind::ExpressionStart => {
                    let node = self.parse_print(&mut body)?;
                    body.push(node);
                }
                TokenKind::CommentStart => self.parse_comment(&mut body)?,
                TokenKind::TagStart => {
                    let keyword = self.stream.la(1);
                    let is_end = keyword.kind == TokenKind::Symbol && end_tags.contains(&keyword.text);
                    let start = self.stream.next();
                    self.trim_before(&start, &mut body);
                    if is_end {
                        let keyword = self.stream.next();
                        return Ok((body, Terminator::Tag(keyword)));
                    }
                    let node = self.parse_statement(start)?;
                    body.push(node);
                }
                TokenKind::ElementStart => {
                    self.trim_next = false;
                    let node = self.parse_element()?;
                    body.push(node);
                }
                _ => {
                    let token = self.stream.peek();
                    return Err(unexpected(token, "text, a tag or an element"));
                }
            }
        }
    }

    fn parse_statement(&mut self, start: Token<'a>) -> CompileResult<Node> {
        let keyword = self.expect_symbol(None)?;
        let parse = self.registry.tag(keyword.text).ok_or_else(|| {
            CompilationError::new(ErrorKind::UnknownTag)
                .with_additional_message(format!(" `{}`.", keyword.text))
                .with_location(keyword.location)
        })?;
        self.trim_next = false;
        parse(self, start)
    }

    fn parse_print(&mut self, body: &mut Vec<Node>) -> CompileResult<Node> {
        let start = self.stream.next();
        self.trim_before(&start, body);
        self.trim_next = false;
        let value = Box::new(self.parse_expression()?);
        let end = self.stream.expect(TokenKind::ExpressionEnd, None)?;
        self.set_trim_after(&end);
        let loc = start.location.merge(&end.location);
        Ok(Node::new(NodeKind::PrintStatement { value }, loc))
    }

    fn parse_comment(&mut self, body: &mut Vec<Node>) -> CompileResult<()> {
        let start = self.stream.next();
        self.trim_before(&start, body);
        self.stream.next_if(TokenKind::Comment, None);
        let end = self.stream.expect(TokenKind::CommentEnd, None)?;
        self.set_trim_after(&end);
        Ok(())
    }

    fn text_node(&mut self, token: Token<'a>) -> Option<Node> {
        let mut value = token.text;
        if std::mem::take(&mut self.trim_next) {
            value = value.trim_start();
        }
        if value.is_empty() {
            return None;
        }
        let text = Node::new(
            NodeKind::Text {
                value: value.to_string(),
            },
            token.location,
        );
        let kind = NodeKind::Fragment {
            value: Box::new(text),
        };
        Some(Node::new(kind, token.location))
    }

    fn trim_before(&self, delimiter: &Token, body: &mut Vec<Node>) {
        if !self.option.apply_whitespace_trimming || !delimiter.flags.contains(TokenFlags::TRIM_BEFORE)
        {
            return;
        }
        let emptied = match body.last_mut().map(|n| &mut n.kind) {
            Some(NodeKind::Fragment { value }) => match &mut value.kind {
                NodeKind::Text { value } => {
                    let len = value.trim_end().len();
                    value.truncate(len);
                    value.is_empty()
                }
                _ => false,
            },
            _ => false,
        };
        if emptied {
            body.pop();
        }
    }

    fn set_trim_after(&mut self, delimiter: &Token) {
        self.trim_next = self.option.apply_whitespace_trimming
            && delimiter.flags.contains(TokenFlags::TRIM_AFTER);
    }
}

fn unexpected_end_tag(token: &Token) -> CompilationError {
    CompilationError::new(ErrorKind::UnexpectedEndTag)
        .with_additional_message(format!(" `{}`.", token.text))
        .with_location(token.location)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ast::get_node_source, core_extension};

    fn registry() -> Registry {
        Registry::new(vec![core_extension::core()]).unwrap()
    }

    pub fn parse_with(source: &str, option: ParseOption) -> CompileResult<Node> {
        let registry = registry();
        Parser::new(source, &registry, option)?.parse_template("test")
    }

    fn body(node: &Node) -> &[Node] {
        match &node.kind {
            NodeKind::Template { body, .. } => body,
            _ => panic!("not a template"),
        }
    }

    fn text_of(node: &Node) -> &str {
        match &node.kind {
            NodeKind::Fragment { value } => match &value.kind {
                NodeKind::Text { value } => value,
                _ => panic!("not text"),
            },
            _ => panic!("not a fragment"),
        }
    }

    #[test]
    fn test_text_and_print() {
        let source = "a {{ b }} c";
        let ast = parse_with(source, ParseOption::default()).unwrap();
        let body = body(&ast);
        assert_eq!(body.len(), 3);
        assert_eq!(text_of(&body[0]), "a ");
        assert_eq!(get_node_source(&body[1], source), "{{ b }}");
        assert_eq!(get_node_source(&ast, source), source);
    }

    #[test]
    fn test_trim_markers() {
        let source = "a  {{- b -}}  c";
        let ast = parse_with(source, ParseOption::default()).unwrap();
        let body = body(&ast);
        assert_eq!(text_of(&body[0]), "a");
        assert_eq!(text_of(&body[2]), "c");
        // locations are not affected by trimming
        assert_eq!(get_node_source(&body[0], source), "a  ");
    }

    #[test]
    fn test_trim_drops_blank_text() {
        let ast = parse_with("{{ a -}}   \n  {{ b }}", ParseOption::default()).unwrap();
        assert_eq!(body(&ast).len(), 2);
    }

    #[test]
    fn test_comment_is_dropped() {
        let ast = parse_with("a {#- note #}b", ParseOption::default()).unwrap();
        let body = body(&ast);
        assert_eq!(body.len(), 2);
        assert_eq!(text_of(&body[0]), "a");
    }

    #[test]
    fn test_unknown_tag() {
        let err = parse_with("{% frobnicate %}", ParseOption::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownTag);
        assert_eq!(err.to_string(), "Unknown tag `frobnicate`.");
        assert_eq!(err.location.start.column, 4);
    }

    #[test]
    fn test_missing_end_tag() {
        let err = parse_with("{% if a %}b", ParseOption::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingEndTag);
        assert_eq!(
            err.to_string(),
            "Unexpected EOF, the construct was not closed: expected `{% elseif %}` or `{% else %}` or `{% endif %}`."
        );
    }

    #[test]
    fn test_unclosed_expression() {
        let err = parse_with("{{ a ", ParseOption::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingEndTag);
    }
}
