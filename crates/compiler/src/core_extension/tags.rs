//! Parsers of the core statement tags.
//!
//! Each parser is entered right after its keyword and consumes the rest of
//! the tag, the body and the end tag. Node locations run from the opening
//! `{%` through the last `%}`.

use crate::{
    ast::{Node, NodeKind},
    error::CompileResult,
    extension::Extension,
    parser::Parser,
    token_stream::unexpected,
    tokenizer::{Token, TokenKind},
    Position,
};

pub fn register(ext: Extension) -> Extension {
    ext.tag("for", parse_for)
        .tag("if", parse_if)
        .tag("set", parse_set)
        .tag("spaceless", parse_spaceless)
        .tag("mount", parse_mount)
        .tag("block", parse_block)
        .tag("extends", parse_extends)
        .tag("flush", parse_flush)
        .tag("include", parse_include)
        .tag("autoescape", parse_autoescape)
        .tag("do", parse_do)
        .tag("macro", parse_macro)
        .tag("import", parse_import)
        .tag("from", parse_from)
}

fn is_tag_end(p: &mut Parser) -> bool {
    p.stream().test(TokenKind::TagEnd, None)
}

fn next_if_symbol(p: &mut Parser, text: &str) -> bool {
    p.stream().next_if(TokenKind::Symbol, Some(text)).is_some()
}

fn next_if_punctuation(p: &mut Parser, text: &str) -> bool {
    p.stream().next_if(TokenKind::Punctuation, Some(text)).is_some()
}

/// template paths of `mount` and `import` are resolved at compile time
fn parse_source(p: &mut Parser) -> CompileResult<Node> {
    if !p.stream().test(TokenKind::StringStart, None) {
        return Err(unexpected(p.stream().peek(), "a template path string"));
    }
    p.parse_string()
}

/// `body {% end %}`, with an optional repeated name in the end tag
fn parse_block_body(p: &mut Parser, end: &str, name: Option<&str>) -> CompileResult<Vec<Node>> {
    p.expect_tag_end()?;
    let (body, _) = p.parse_body(&[end])?;
    if let Some(name) = name {
        next_if_symbol(p, name);
    }
    p.expect_tag_end()?;
    Ok(body)
}

fn parse_for<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let first = p.parse_target()?;
    let (key_target, value_target) = if next_if_punctuation(p, ",") {
        (Some(Box::new(first)), Box::new(p.parse_target()?))
    } else {
        (None, Box::new(first))
    };
    p.stream().expect(TokenKind::Operator, Some("in"))?;
    let sequence = Box::new(p.parse_expression()?);
    let condition = if next_if_symbol(p, "if") {
        Some(Box::new(p.parse_expression()?))
    } else {
        None
    };
    p.expect_tag_end()?;
    let (body, keyword) = p.parse_body(&["else", "endfor"])?;
    let otherwise = if keyword.text == "else" {
        parse_block_body(p, "endfor", None)?
    } else {
        p.expect_tag_end()?;
        vec![]
    };
    let kind = NodeKind::ForStatement {
        key_target,
        value_target,
        sequence,
        condition,
        body,
        otherwise,
    };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

fn parse_if<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    parse_if_branch(p, start.location.start)
}

/// `elseif` nests a new IfStatement which consumes the shared `endif`
fn parse_if_branch(p: &mut Parser, start: Position) -> CompileResult<Node> {
    let test = Box::new(p.parse_expression()?);
    p.expect_tag_end()?;
    let (consequent, keyword) = p.parse_body(&["elseif", "else", "endif"])?;
    let alternate = match keyword.text {
        "elseif" => vec![parse_if_branch(p, keyword.location.start)?],
        "else" => parse_block_body(p, "endif", None)?,
        _ => {
            p.expect_tag_end()?;
            vec![]
        }
    };
    let kind = NodeKind::IfStatement {
        test,
        consequent,
        alternate,
    };
    Ok(Node::new(kind, p.loc_from(start)))
}

/// `set a = 1` or `set a, b = 1, 2`
fn parse_set<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let mut targets = vec![p.parse_target()?];
    while next_if_punctuation(p, ",") {
        targets.push(p.parse_target()?);
    }
    p.stream().expect(TokenKind::Punctuation, Some("="))?;
    let mut values = vec![p.parse_expression()?];
    while next_if_punctuation(p, ",") {
        values.push(p.parse_expression()?);
    }
    if values.len() != targets.len() {
        let expected = format!("{} values", targets.len());
        return Err(unexpected(p.stream().peek(), &expected));
    }
    p.expect_tag_end()?;
    let assignments = targets
        .into_iter()
        .zip(values)
        .map(|(id, init)| {
            let loc = id.loc.merge(&init.loc);
            let kind = NodeKind::VariableDeclarator {
                id: Box::new(id),
                init: Box::new(init),
            };
            Node::new(kind, loc)
        })
        .collect();
    let kind = NodeKind::SetStatement { assignments };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

fn parse_spaceless<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let body = parse_block_body(p, "endspaceless", None)?;
    let kind = NodeKind::SpacelessBlock { body };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

/// `mount 'src' [as key] [with args]` or `mount Name from 'src' ...`
fn parse_mount<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let name = if p.stream().test(TokenKind::Symbol, None) {
        let name = p.expect_symbol(None)?;
        p.expect_symbol(Some("from"))?;
        Some(name.text.to_string())
    } else {
        None
    };
    let source = Box::new(parse_source(p)?);
    let key = if next_if_symbol(p, "as") {
        Some(Box::new(p.parse_expression()?))
    } else {
        None
    };
    let argument = if next_if_symbol(p, "with") {
        Some(Box::new(p.parse_expression()?))
    } else {
        None
    };
    p.expect_tag_end()?;
    let kind = NodeKind::MountStatement {
        name,
        source,
        key,
        argument,
    };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

/// `block name %}...{% endblock [name]` or the shorthand `block name expr`
fn parse_block<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let name = p.expect_symbol(None)?;
    let body = if is_tag_end(p) {
        parse_block_body(p, "endblock", Some(name.text))?
    } else {
        let value = p.parse_expression()?;
        let loc = value.loc;
        p.expect_tag_end()?;
        let value = Box::new(value);
        vec![Node::new(NodeKind::PrintStatement { value }, loc)]
    };
    let kind = NodeKind::BlockStatement {
        name: name.text.to_string(),
        body,
    };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

fn parse_extends<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let parent = Box::new(p.parse_expression()?);
    p.expect_tag_end()?;
    let kind = NodeKind::ExtendsStatement { parent };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

fn parse_flush<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    p.expect_tag_end()?;
    Ok(Node::new(
        NodeKind::FlushStatement,
        p.loc_from(start.location.start),
    ))
}

/// `include expr [ignore missing] [with args] [only]`
fn parse_include<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let source = Box::new(p.parse_expression()?);
    let ignore_missing = if next_if_symbol(p, "ignore") {
        p.expect_symbol(Some("missing"))?;
        true
    } else {
        false
    };
    let argument = if next_if_symbol(p, "with") {
        Some(Box::new(p.parse_expression()?))
    } else {
        None
    };
    let only = next_if_symbol(p, "only");
    p.expect_tag_end()?;
    let kind = NodeKind::IncludeStatement {
        source,
        argument,
        only,
        ignore_missing,
    };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

fn parse_autoescape<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let strategy = if is_tag_end(p) {
        None
    } else {
        Some(Box::new(p.parse_expression()?))
    };
    let body = parse_block_body(p, "endautoescape", None)?;
    let kind = NodeKind::AutoescapeBlock { strategy, body };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

fn parse_do<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let value = Box::new(p.parse_expression()?);
    p.expect_tag_end()?;
    let kind = NodeKind::DoStatement { value };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

/// `macro name(a, b = default)`
fn parse_macro<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let name = p.expect_symbol(None)?;
    p.stream().expect(TokenKind::Punctuation, Some("("))?;
    let mut params = vec![];
    while !next_if_punctuation(p, ")") {
        let id = p.parse_target()?;
        let param = if next_if_punctuation(p, "=") {
            let init = p.parse_expression()?;
            let loc = id.loc.merge(&init.loc);
            let kind = NodeKind::VariableDeclarator {
                id: Box::new(id),
                init: Box::new(init),
            };
            Node::new(kind, loc)
        } else {
            id
        };
        params.push(param);
        if !next_if_punctuation(p, ",") {
            p.stream().expect(TokenKind::Punctuation, Some(")"))?;
            break;
        }
    }
    let body = parse_block_body(p, "endmacro", Some(name.text))?;
    let kind = NodeKind::MacroDeclaration {
        name: name.text.to_string(),
        params,
        body,
    };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

/// `import 'forms.twig' as forms`
fn parse_import<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let source = Box::new(parse_source(p)?);
    p.expect_symbol(Some("as"))?;
    let local = p.expect_symbol(None)?;
    p.expect_tag_end()?;
    let specifier = NodeKind::ImportSpecifier {
        imported: None,
        local: local.text.to_string(),
    };
    let kind = NodeKind::ImportDeclaration {
        source,
        specifiers: vec![Node::new(specifier, local.location)],
    };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}

/// `from 'forms.twig' import input as field, textarea`
fn parse_from<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    let source = Box::new(parse_source(p)?);
    p.expect_symbol(Some("import"))?;
    let mut specifiers = vec![];
    loop {
        let imported = p.expect_symbol(None)?;
        let local = if next_if_symbol(p, "as") {
            p.expect_symbol(None)?
        } else {
            imported.clone()
        };
        let kind = NodeKind::ImportSpecifier {
            imported: Some(imported.text.to_string()),
            local: local.text.to_string(),
        };
        specifiers.push(Node::new(kind, p.loc_from(imported.location.start)));
        if !next_if_punctuation(p, ",") {
            break;
        }
    }
    p.expect_tag_end()?;
    let kind = NodeKind::ImportDeclaration { source, specifiers };
    Ok(Node::new(kind, p.loc_from(start.location.start)))
}
