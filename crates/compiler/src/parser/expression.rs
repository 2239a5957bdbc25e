use super::Parser;
use crate::{
    ast::{Associativity, Binding, Node, NodeKind},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    token_stream::unexpected,
    tokenizer::{Token, TokenKind},
    util::unescape,
};

impl<'a> Parser<'a> {
    /// Full expression including the conditional operator.
    pub fn parse_expression(&mut self) -> CompileResult<Node> {
        let test = self.parse_binary(0)?;
        if !self.test_punctuation("?") {
            return Ok(test);
        }
        self.stream.next();
        let start = test.loc.start;
        let test = Box::new(test);
        // `a ?: b`
        if self.stream.next_if(TokenKind::Punctuation, Some(":")).is_some() {
            let alternate = Some(Box::new(self.parse_expression()?));
            let kind = NodeKind::ConditionalExpression {
                test,
                consequent: None,
                alternate,
            };
            return Ok(Node::new(kind, self.loc_from(start)));
        }
        let consequent = Some(Box::new(self.parse_expression()?));
        let alternate = match self.stream.next_if(TokenKind::Punctuation, Some(":")) {
            Some(_) => Some(Box::new(self.parse_expression()?)),
            None => None,
        };
        let kind = NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        };
        Ok(Node::new(kind, self.loc_from(start)))
    }

    /// Precedence climbing over the registered binary operators.
    pub fn parse_binary(&mut self, min_precedence: u32) -> CompileResult<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let token = self.stream.peek();
            if token.kind != TokenKind::Operator {
                break;
            }
            let op = match self.registry.binary_operator(token.text) {
                Some(op) if op.precedence >= min_precedence => *op,
                _ => break,
            };
            let token = self.stream.next();
            if let Some(parse) = op.parse {
                left = parse(self, left, token)?;
                continue;
            }
            let next_precedence = match op.associativity {
                Associativity::Left => op.precedence + 1,
                Associativity::Right => op.precedence,
            };
            let right = self.parse_binary(next_precedence)?;
            let loc = left.loc.merge(&right.loc);
            let kind = NodeKind::BinaryExpression {
                operator: token.text.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
            left = Node::new(kind, loc);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> CompileResult<Node> {
        let token = self.stream.peek();
        let op = match token.kind {
            TokenKind::Operator => self.registry.unary_operator(token.text).copied(),
            _ => None,
        };
        let op = match op {
            Some(op) => op,
            None => return self.parse_postfix_expression(),
        };
        let token = self.stream.next();
        let argument = self.parse_binary(op.precedence)?;
        let loc = token.location.merge(&argument.loc);
        let kind = NodeKind::UnaryExpression {
            operator: token.text.to_string(),
            argument: Box::new(argument),
        };
        Ok(Node::new(kind, loc))
    }

    fn parse_postfix_expression(&mut self) -> CompileResult<Node> {
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> CompileResult<Node> {
        let token = self.stream.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.stream.next();
                let value = token.text.parse::<f64>().map_err(|_| {
                    unexpected(&token, "a number")
                })?;
                Ok(Node::new(NodeKind::NumericLiteral { value }, token.location))
            }
            TokenKind::StringStart => self.parse_string(),
            TokenKind::Symbol => {
                self.stream.next();
                let kind = match token.text {
                    "true" | "TRUE" => NodeKind::BooleanLiteral { value: true },
                    "false" | "FALSE" => NodeKind::BooleanLiteral { value: false },
                    "null" | "NULL" | "none" | "NONE" => NodeKind::NullLiteral,
                    name => NodeKind::Identifier {
                        name: name.to_string(),
                        binding: Binding::Unresolved,
                    },
                };
                Ok(Node::new(kind, token.location))
            }
            TokenKind::Punctuation => match token.text {
                "(" => {
                    self.stream.next();
                    let mut inner = self.parse_expression()?;
                    self.stream.expect(TokenKind::Punctuation, Some(")"))?;
                    // parentheses belong to the authored text of the node
                    inner.loc = self.loc_from(token.location.start);
                    Ok(inner)
                }
                "[" => self.parse_array(),
                "{" => self.parse_hash(),
                _ => Err(unexpected(&token, "an expression")),
            },
            _ => Err(unexpected(&token, "an expression")),
        }
    }

    fn parse_postfix(&mut self, mut node: Node) -> CompileResult<Node> {
        loop {
            let token = self.stream.peek();
            if token.kind != TokenKind::Punctuation {
                return Ok(node);
            }
            let text = token.text;
            node = match text {
                "." => self.parse_member(node)?,
                "[" => self.parse_subscript(node)?,
                "(" => {
                    let start = node.loc.start;
                    let (arguments, _) = self.parse_arguments()?;
                    Node::new(
                        NodeKind::CallExpression {
                            callee: Box::new(node),
                            arguments,
                        },
                        self.loc_from(start),
                    )
                }
                "|" => self.parse_filter(node)?,
                _ => return Ok(node),
            };
        }
    }

    fn parse_member(&mut self, object: Node) -> CompileResult<Node> {
        self.stream.next();
        let token = self.stream.next();
        let (property, computed) = match token.kind {
            TokenKind::Symbol => {
                let name = token.text;
                (Node::identifier(name, Binding::Property, token.location), false)
            }
            // `items.0`
            TokenKind::Number => {
                let value = token.text.parse::<f64>().map_err(|_| {
                    unexpected(&token, "a number")
                })?;
                let kind = NodeKind::NumericLiteral { value };
                (Node::new(kind, token.location), true)
            }
            _ => return Err(unexpected(&token, "an attribute name")),
        };
        let loc = object.loc.merge(&property.loc);
        let kind = NodeKind::MemberExpression {
            object: Box::new(object),
            property: Box::new(property),
            computed,
        };
        Ok(Node::new(kind, loc))
    }

    /// `a[b]`, `a[b:c]`, `a[:c]` or `a[b:]`
    fn parse_subscript(&mut self, target: Node) -> CompileResult<Node> {
        self.stream.next();
        let start_loc = target.loc.start;
        let start = if self.test_punctuation(":") {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        if self.stream.next_if(TokenKind::Punctuation, Some(":")).is_none() {
            self.stream.expect(TokenKind::Punctuation, Some("]"))?;
            let property = match start {
                Some(property) => property,
                None => return Err(unexpected(self.stream.peek(), "an expression")),
            };
            let kind = NodeKind::MemberExpression {
                object: Box::new(target),
                property,
                computed: true,
            };
            return Ok(Node::new(kind, self.loc_from(start_loc)));
        }
        let end = if self.test_punctuation("]") {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.stream.expect(TokenKind::Punctuation, Some("]"))?;
        let kind = NodeKind::SliceExpression {
            target: Box::new(target),
            start,
            end,
        };
        Ok(Node::new(kind, self.loc_from(start_loc)))
    }

    fn parse_filter(&mut self, target: Node) -> CompileResult<Node> {
        self.stream.next();
        let start = target.loc.start;
        let name = self.expect_symbol(None)?;
        let arguments = if self.test_punctuation("(") {
            self.parse_arguments()?.0
        } else {
            vec![]
        };
        let kind = NodeKind::FilterExpression {
            target: Box::new(target),
            name: name.text.to_string(),
            arguments,
        };
        Ok(Node::new(kind, self.loc_from(start)))
    }

    /// `( expr, ... )`, returns the closing parenthesis too
    pub fn parse_arguments(&mut self) -> CompileResult<(Vec<Node>, Token<'a>)> {
        self.stream.expect(TokenKind::Punctuation, Some("("))?;
        let (arguments, close) = self.parse_sequence(")")?;
        Ok((arguments, close))
    }

    /// comma separated expressions up to `close`, trailing comma allowed
    fn parse_sequence(&mut self, close: &str) -> CompileResult<(Vec<Node>, Token<'a>)> {
        let mut items = vec![];
        loop {
            if let Some(end) = self.stream.next_if(TokenKind::Punctuation, Some(close)) {
                return Ok((items, end));
            }
            items.push(self.parse_expression()?);
            if self.stream.next_if(TokenKind::Punctuation, Some(",")).is_none() {
                let end = self.stream.expect(TokenKind::Punctuation, Some(close))?;
                return Ok((items, end));
            }
        }
    }

    fn parse_array(&mut self) -> CompileResult<Node> {
        let open = self.stream.next();
        let (elements, _) = self.parse_sequence("]")?;
        let kind = NodeKind::ArrayExpression { elements };
        Ok(Node::new(kind, self.loc_from(open.location.start)))
    }

    fn parse_hash(&mut self) -> CompileResult<Node> {
        let open = self.stream.next();
        let mut properties = vec![];
        loop {
            if self.stream.next_if(TokenKind::Punctuation, Some("}")).is_some() {
                break;
            }
            properties.push(self.parse_hash_property()?);
            if self.stream.next_if(TokenKind::Punctuation, Some(",")).is_none() {
                self.stream.expect(TokenKind::Punctuation, Some("}"))?;
                break;
            }
        }
        let kind = NodeKind::ObjectExpression { properties };
        Ok(Node::new(kind, self.loc_from(open.location.start)))
    }

    fn parse_hash_property(&mut self) -> CompileResult<Node> {
        let token = self.stream.peek().clone();
        let (key, computed) = match token.kind {
            TokenKind::StringStart => (self.parse_string()?, false),
            TokenKind::Number => (self.parse_primary()?, false),
            TokenKind::Symbol => {
                self.stream.next();
                let key = Node::identifier(token.text, Binding::Property, token.location);
                (key, false)
            }
            TokenKind::Punctuation if token.text == "(" => {
                self.stream.next();
                let key = self.parse_expression()?;
                self.stream.expect(TokenKind::Punctuation, Some(")"))?;
                (key, true)
            }
            _ => return Err(unexpected(&token, "a hash key")),
        };
        let value = if self.stream.next_if(TokenKind::Punctuation, Some(":")).is_some() {
            self.parse_expression()?
        } else if token.kind == TokenKind::Symbol {
            // `{ foo }` is `{ foo: foo }`
            Node::identifier(token.text, Binding::Unresolved, token.location)
        } else {
            return Err(unexpected(self.stream.peek(), "`:`"));
        };
        let loc = key.loc.merge(&value.loc);
        let kind = NodeKind::ObjectProperty {
            key: Box::new(key),
            value: Box::new(value),
            computed,
        };
        Ok(Node::new(kind, loc))
    }

    /// `"..."` or `'...'`, the location covers both quotes
    pub fn parse_string(&mut self) -> CompileResult<Node> {
        let open = self.stream.expect(TokenKind::StringStart, None)?;
        let raw = match self.stream.next_if(TokenKind::String, None) {
            Some(t) => t.text,
            None => "",
        };
        self.stream.expect(TokenKind::StringEnd, None)?;
        let verbatim = self.option.preserve_source_literally;
        let value = if verbatim {
            raw.to_string()
        } else {
            unescape(raw)
        };
        let kind = NodeKind::StringLiteral { value, verbatim };
        Ok(Node::new(kind, self.loc_from(open.location.start)))
    }

    /// a plain name, used for assignment and loop targets
    pub fn parse_target(&mut self) -> CompileResult<Node> {
        let token = self.stream.peek().clone();
        if token.kind != TokenKind::Symbol {
            return Err(CompilationError::new(ErrorKind::InvalidAssignmentTarget)
                .with_additional_message(format!(" Found {}.", token))
                .with_location(token.location));
        }
        self.stream.next();
        Ok(Node::identifier(
            token.text,
            Binding::Unresolved,
            token.location,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::super::test::parse_with;
    use super::*;
    use crate::{ast::get_node_source, parser::ParseOption};

    fn print_value(source: &str) -> Node {
        let ast = parse_with(source, ParseOption::default()).unwrap();
        let mut body = match ast.kind {
            NodeKind::Template { body, .. } => body,
            _ => panic!("not a template"),
        };
        match body.remove(0).kind {
            NodeKind::PrintStatement { value } => *value,
            _ => panic!("not a print"),
        }
    }

    /// s-expression rendering of an expression tree
    fn sexp(node: &Node) -> String {
        match &node.kind {
            NodeKind::Identifier { name, .. } => name.clone(),
            NodeKind::NumericLiteral { value } => value.to_string(),
            NodeKind::StringLiteral { value, .. } => format!("{:?}", value),
            NodeKind::BooleanLiteral { value } => value.to_string(),
            NodeKind::NullLiteral => "null".into(),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => format!("({} {} {})", operator, sexp(left), sexp(right)),
            NodeKind::UnaryExpression { operator, argument } => {
                format!("({} {})", operator, sexp(argument))
            }
            NodeKind::MemberExpression {
                object, property, ..
            } => format!("(. {} {})", sexp(object), sexp(property)),
            NodeKind::FilterExpression {
                target,
                name,
                arguments,
            } => {
                let args: Vec<_> = arguments.iter().map(sexp).collect();
                format!("(| {} {} [{}])", sexp(target), name, args.join(" "))
            }
            NodeKind::TestExpression {
                target,
                name,
                arguments,
                negated,
            } => {
                let args: Vec<_> = arguments.iter().map(sexp).collect();
                let op = if *negated { "is not" } else { "is" };
                format!("({} {} {} [{}])", op, sexp(target), name, args.join(" "))
            }
            NodeKind::CallExpression { callee, arguments } => {
                let args: Vec<_> = arguments.iter().map(sexp).collect();
                format!("(call {} [{}])", sexp(callee), args.join(" "))
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let c = consequent.as_ref().map_or("_".into(), |n| sexp(n));
                let a = alternate.as_ref().map_or("_".into(), |n| sexp(n));
                format!("(? {} {} {})", sexp(test), c, a)
            }
            NodeKind::SliceExpression { target, start, end } => {
                let s = start.as_ref().map_or("_".into(), |n| sexp(n));
                let e = end.as_ref().map_or("_".into(), |n| sexp(n));
                format!("(slice {} {} {})", sexp(target), s, e)
            }
            NodeKind::ArrayExpression { elements } => {
                let items: Vec<_> = elements.iter().map(sexp).collect();
                format!("[{}]", items.join(" "))
            }
            NodeKind::ObjectExpression { properties } => {
                let items: Vec<_> = properties.iter().map(sexp).collect();
                format!("{{{}}}", items.join(" "))
            }
            NodeKind::ObjectProperty { key, value, .. } => {
                format!("{}:{}", sexp(key), sexp(value))
            }
            _ => "?".into(),
        }
    }

    fn parse(expr: &str) -> String {
        sexp(&print_value(&format!("{{{{ {} }}}}", expr)))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse("a + b * c"), "(+ a (* b c))");
        assert_eq!(parse("a * b + c"), "(+ (* a b) c)");
        assert_eq!(parse("a - b - c"), "(- (- a b) c)");
        assert_eq!(parse("a ** b ** c"), "(** a (** b c))");
        assert_eq!(parse("a or b and c"), "(or a (and b c))");
        assert_eq!(parse("a ~ b + c"), "(+ (~ a b) c)");
        assert_eq!(parse("a ?? b ?? c"), "(?? a (?? b c))");
        assert_eq!(parse("1..3"), "(.. 1 3)");
    }

    #[test]
    fn test_unary() {
        assert_eq!(parse("not a and b"), "(and (not a) b)");
        assert_eq!(parse("-a ** 2"), "(** (- a) 2)");
        assert_eq!(parse("a not in b"), "(not in a b)");
        assert_eq!(parse("not (a or b)"), "(not (or a b))");
    }

    #[test]
    fn test_postfix_chain() {
        assert_eq!(parse("a.b[c].d(1)"), "(call (. (. (. a b) c) d) [1])");
        assert_eq!(
            parse("name | default('x') | upper"),
            "(| (| name default [\"x\"]) upper [])"
        );
        assert_eq!(parse("a ~ b | upper"), "(~ a (| b upper []))");
        assert_eq!(parse("items[1:2]"), "(slice items 1 2)");
        assert_eq!(parse("items[:2]"), "(slice items _ 2)");
        assert_eq!(parse("items[1:]"), "(slice items 1 _)");
    }

    #[test]
    fn test_tests() {
        assert_eq!(parse("a is defined"), "(is a defined [])");
        assert_eq!(parse("a is not null"), "(is not a null [])");
        assert_eq!(parse("a is divisible by(3)"), "(is a divisible by [3])");
        assert_eq!(parse("a is same as(b) and c"), "(and (is a same as [b]) c)");
    }

    #[test]
    fn test_conditional() {
        assert_eq!(parse("a ? b : c"), "(? a b c)");
        assert_eq!(parse("a ? b"), "(? a b _)");
        assert_eq!(parse("a ?: b"), "(? a _ b)");
        assert_eq!(parse("a ? b : c ? d : e"), "(? a b (? c d e))");
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("[1, 'a', true, null,]"), "[1 \"a\" true null]");
        assert_eq!(
            parse("{a: 1, 'b': 2, (c): 3, d}"),
            "{a:1 \"b\":2 c:3 d:d}"
        );
        assert_eq!(parse(r#""a\"b\n""#), "\"a\\\"b\\n\"");
        assert_eq!(parse("2.5"), "2.5");
    }

    #[test]
    fn test_loc_covers_parentheses() {
        let source = "{{ (a + b) * c }}";
        let value = print_value(source);
        assert_eq!(get_node_source(&value, source), "(a + b) * c");
        let left = match &value.kind {
            NodeKind::BinaryExpression { left, .. } => left,
            _ => panic!("not binary"),
        };
        assert_eq!(get_node_source(left, source), "(a + b)");
    }

    #[test]
    fn test_verbatim_string() {
        let source = r#"{{ "a\tb" }}"#;
        let option = ParseOption {
            preserve_source_literally: true,
            ..Default::default()
        };
        let ast = parse_with(source, option).unwrap();
        let mut strings = vec![];
        ast.for_each(&mut |n| {
            if let NodeKind::StringLiteral { value, verbatim } = &n.kind {
                strings.push((value.clone(), *verbatim, get_node_source(n, source)));
            }
        });
        assert_eq!(strings, vec![(r"a\tb".to_string(), true, r#""a\tb""#)]);
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse_with("{{ a + }}", ParseOption::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedToken);
        assert_eq!(
            err.to_string(),
            "Unexpected token: expected an expression, found expression end `}}`."
        );
    }
}
