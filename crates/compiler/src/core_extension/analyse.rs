use crate::{
    ast::{Node, NodeKind, NodeType},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    transformer::CompileState,
    traverse::{Path, VisitorMap},
    SourceLocation,
};
use std::mem;

pub fn analyse_visitors() -> VisitorMap {
    VisitorMap::new()
        .on(NodeType::ExtendsStatement, hoist_parent)
        .on(NodeType::FlushStatement, remove_flush)
        .on(NodeType::SliceExpression, lower_slice)
        .on(NodeType::SpacelessBlock, collapse_spaceless)
        .on(NodeType::BlockStatement, record_block)
        .eliminates(NodeType::ExtendsStatement)
        .eliminates(NodeType::FlushStatement)
        .eliminates(NodeType::SliceExpression)
        .eliminates(NodeType::SpacelessBlock)
}

fn hoist_parent(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    let node = path.node();
    if let NodeKind::ExtendsStatement { parent } = &node.kind {
        if !matches!(parent.kind, NodeKind::StringLiteral { .. }) {
            return Err(CompilationError::new(ErrorKind::DynamicParentTemplate)
                .with_location(parent.loc));
        }
        state.meta.parent = Some((**parent).clone());
    }
    path.remove()
}

fn remove_flush(path: &mut Path, _: &mut CompileState) -> CompileResult<()> {
    path.remove()
}

/// `a[s:l]` is `a|slice(s, l)`, a missing start is 0
fn lower_slice(path: &mut Path, _: &mut CompileState) -> CompileResult<()> {
    let node = path.node_mut();
    let loc = node.loc;
    let (target, start, end) = match mem::replace(&mut node.kind, NodeKind::NullLiteral) {
        NodeKind::SliceExpression { target, start, end } => (target, start, end),
        other => {
            node.kind = other;
            return Ok(());
        }
    };
    let start = match start {
        Some(start) => *start,
        None => {
            let at = SourceLocation::new(loc.start, loc.start);
            Node::new(NodeKind::NumericLiteral { value: 0.0 }, at)
        }
    };
    let mut arguments = vec![start];
    arguments.extend(end.map(|end| *end));
    let kind = NodeKind::FilterExpression {
        target,
        name: "slice".to_string(),
        arguments,
    };
    path.replace_with(Node::new(kind, loc));
    Ok(())
}

fn is_blank_text(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Fragment { value } => {
            matches!(&value.kind, NodeKind::Text { value } if value.trim().is_empty())
        }
        _ => false,
    }
}

fn drop_blank_text(nodes: &mut Vec<Node>) {
    nodes.retain(|n| !is_blank_text(n));
    for node in nodes.iter_mut() {
        if let NodeKind::Element { children, .. } = &mut node.kind {
            drop_blank_text(children);
        }
    }
}

fn collapse_spaceless(path: &mut Path, _: &mut CompileState) -> CompileResult<()> {
    let mut body = match &mut path.node_mut().kind {
        NodeKind::SpacelessBlock { body } => mem::take(body),
        _ => return Ok(()),
    };
    drop_blank_text(&mut body);
    path.replace_with_many(body)
}

fn record_block(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    if let NodeKind::BlockStatement { name, .. } = &path.node().kind {
        if !state.meta.blocks.contains(name) {
            state.meta.blocks.push(name.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        ast::{get_node_source, NodeKind},
        compiler::{CompileOption, Compiler},
        error::CompilationErrorKind as ErrorKind,
    };

    fn compile(source: &str) -> Result<crate::Node, crate::CompilationError> {
        let compiler = Compiler::new(vec![])?;
        compiler.compile("t", source, &CompileOption::default())
    }

    #[test]
    fn test_extends_is_hoisted() {
        let source = "{% extends 'base.twig' %}{% flush %}{% block a %}{% endblock %}";
        let ast = compile(source).unwrap();
        match &ast.kind {
            NodeKind::Template { parent, body, .. } => {
                let parent = parent.as_ref().unwrap();
                assert_eq!(get_node_source(parent, source), "'base.twig'");
                assert_eq!(body.len(), 1);
            }
            _ => panic!("not a template"),
        }
    }

    #[test]
    fn test_dynamic_parent() {
        let err = compile("{% extends layout %}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DynamicParentTemplate);
    }

    #[test]
    fn test_slice_becomes_filter() {
        let ast = compile("{% set a = items[:2] %}{% set b = items[1:] %}").unwrap();
        let mut filters = vec![];
        ast.for_each(&mut |n| {
            if let NodeKind::FilterExpression {
                name, arguments, ..
            } = &n.kind
            {
                filters.push((name.clone(), arguments.len()));
            }
            assert!(!matches!(n.kind, NodeKind::SliceExpression { .. }));
        });
        assert_eq!(
            filters,
            vec![("slice".to_string(), 2), ("slice".to_string(), 1)]
        );
    }

    #[test]
    fn test_spaceless_is_spliced() {
        let ast = compile("{% spaceless %} {% set a = 1 %}\n {% do a %} {% endspaceless %}").unwrap();
        match &ast.kind {
            NodeKind::Template { body, .. } => {
                let types: Vec<_> = body.iter().map(|n| n.node_type()).collect();
                assert_eq!(
                    types,
                    vec![
                        crate::NodeType::SetStatement,
                        crate::NodeType::DoStatement
                    ]
                );
            }
            _ => panic!("not a template"),
        }
    }
}
