//! Incremental DOM backend.
//!
//! Lowers the markup nodes of a template into calls of the incremental DOM
//! instruction set: `elementOpen`, `elementVoid`, `elementClose` and `text`.
//! Registering [`idom`] is what makes a template with output compile.

use compiler::{
    ast::{Binding, Node, NodeKind, NodeType, TEMPLATE_ONLY_TYPES},
    error::CompileResult,
    extension::Extension,
    transformer::CompileState,
    traverse::{Path, VisitorMap},
    SourceLocation,
};
use tracing::trace;

pub const IDOM_EXTENSION: &str = "idom";

pub fn idom() -> Extension {
    let visitors = VisitorMap::new()
        .on(NodeType::Element, lower_element)
        .on(NodeType::Fragment, lower_output)
        .on(NodeType::Text, lower_output)
        .on(NodeType::PrintStatement, lower_output);
    let visitors = TEMPLATE_ONLY_TYPES
        .iter()
        .fold(visitors, |map, ty| map.eliminates(*ty));
    Extension::new(IDOM_EXTENSION).finalize(visitors)
}

fn instruction(name: &str, arguments: Vec<Node>, loc: SourceLocation) -> Node {
    let callee = Node::identifier(name, Binding::Runtime, loc);
    Node::statement(Node::call(callee, arguments, loc))
}

fn null(loc: SourceLocation) -> Node {
    Node::new(NodeKind::NullLiteral, loc)
}

/// `<a href="x">..</a>` is `elementOpen("a", key, null, "href", "x")`,
/// the children and `elementClose("a")`. Childless elements are void.
fn lower_element(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    let node = path.node_mut();
    let loc = node.loc;
    let (name, attributes, children) = match &mut node.kind {
        NodeKind::Element {
            name,
            attributes,
            children,
            ..
        } => (
            std::mem::take(name),
            std::mem::take(attributes),
            std::mem::take(children),
        ),
        _ => return Ok(()),
    };
    let key = if state.option.generate_key {
        Node::string(state.next_key(), loc)
    } else {
        null(loc)
    };
    let mut arguments = vec![Node::string(name.as_str(), loc), key, null(loc)];
    for attribute in attributes {
        let at = attribute.loc;
        if let NodeKind::Attribute { name, value } = attribute.kind {
            arguments.push(Node::string(name, at));
            arguments.push(match value {
                Some(value) => *value,
                // boolean attributes like `disabled`
                None => Node::string("", at),
            });
        }
    }
    trace!(element = %name, children = children.len(), "lowering element");
    let mut statements = Vec::with_capacity(children.len() + 2);
    if children.is_empty() {
        statements.push(instruction("elementVoid", arguments, loc));
    } else {
        statements.push(instruction("elementOpen", arguments, loc));
        statements.extend(children);
        let close = vec![Node::string(name, loc)];
        statements.push(instruction("elementClose", close, loc));
    }
    path.replace_with_many(statements)
}

/// text and printed values are both `text(value)`
fn lower_output(path: &mut Path, _: &mut CompileState) -> CompileResult<()> {
    let node = path.node_mut();
    let loc = node.loc;
    let value = match std::mem::replace(&mut node.kind, NodeKind::NullLiteral) {
        NodeKind::Text { value } => Node::string(value, loc),
        NodeKind::Fragment { value } | NodeKind::PrintStatement { value } => {
            let inner = *value;
            match inner.kind {
                NodeKind::Text { value } => Node::string(value, inner.loc),
                kind => Node::new(kind, inner.loc),
            }
        }
        other => {
            node.kind = other;
            return Ok(());
        }
    };
    path.replace_with(instruction("text", vec![value], loc));
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use compiler::{codegen::to_string, compiler::CompileOption, Compiler};
    use insta::assert_snapshot;

    fn compile_with(source: &str, option: &CompileOption) -> String {
        let compiler = Compiler::new(vec![idom()]).unwrap();
        let ast = compiler.compile("test", source, option).unwrap();
        to_string(&ast, source).unwrap().code
    }

    fn compile(source: &str) -> String {
        compile_with(source, &CompileOption::default())
    }

    /// the body of `render` without its indentation
    fn render_body(code: &str) -> Vec<String> {
        let start = code
            .find("export default function render")
            .expect("render is exported");
        code[start..]
            .lines()
            .skip(1)
            .map(|l| l.trim().to_string())
            .filter(|l| l != "}")
            .collect()
    }

    #[test]
    fn test_text_and_print() {
        let code = compile("abc{{ name }}");
        assert_eq!(
            code,
            "import { text } from \"twig-runtime\";\n\
             \n\
             export default function render(_context, _blocks = {}) {\n  \
             text(\"abc\");\n  \
             text(_context.name);\n\
             }\n"
        );
    }

    #[test]
    fn test_element_lowering() {
        let body = render_body(&compile(r#"<div class="a {{ b }}"><br>x</div>"#));
        assert_eq!(
            body,
            vec![
                r#"elementOpen("div", null, null, "class", _concat("a ", _context.b));"#,
                r#"elementVoid("br", null, null);"#,
                r#"text("x");"#,
                r#"elementClose("div");"#,
            ]
        );
    }

    #[test]
    fn test_boolean_attribute() {
        let body = render_body(&compile("<input disabled>"));
        assert_snapshot!(body.join("\n"), @r###"elementVoid("input", null, null, "disabled", "");"###);
    }

    #[test]
    fn test_generated_keys() {
        let option = CompileOption {
            generate_key: true,
            ..Default::default()
        };
        let body = render_body(&compile_with("<ul><li>a</li><li>b</li></ul>", &option));
        assert_eq!(body[0], r#"elementOpen("ul", "k0", null);"#);
        assert_eq!(body[1], r#"elementOpen("li", "k1", null);"#);
        assert_eq!(body[4], r#"elementOpen("li", "k2", null);"#);
    }

    #[test]
    fn test_loop_body_is_lowered() {
        let body = render_body(&compile(
            "{% for item in items %}<li>{{ item.name }}</li>{% else %}empty{% endfor %}",
        ));
        assert_eq!(
            body,
            vec![
                "let _iterated0 = false;",
                "for (let [, item, loop] of _entries(_context.items)) {",
                "_iterated0 = true;",
                r#"elementOpen("li", null, null);"#,
                "text(item.name);",
                r#"elementClose("li");"#,
                "if (!_iterated0) {",
                r#"text("empty");"#,
            ]
        );
    }
}
