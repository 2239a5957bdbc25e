use super::common::{body, get_compiler};
use super::compiler;
use compiler::{
    ast::{Binding, Node, NodeKind, NodeType},
    codegen::to_string,
    error::CompileResult,
    parser::Parser,
    tokenizer::Token,
    CompileOption, Compiler, Extension,
};
use std::{sync::Arc, thread};

/// `{% hello %}` calls the runtime helper `hello()`
fn parse_hello<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    p.expect_tag_end()?;
    let loc = p.loc_from(start.location.start);
    let callee = Node::identifier("hello", Binding::Runtime, loc);
    let value = Box::new(Node::call(callee, vec![], loc));
    Ok(Node::new(NodeKind::DoStatement { value }, loc))
}

fn greeting() -> Extension {
    Extension::new("greeting")
        .tag("hello", parse_hello)
        .filters(&["shout"])
}

fn compile(compiler: &Compiler, source: &str) -> String {
    let ast = compiler
        .compile("test", source, &CompileOption::default())
        .unwrap();
    to_string(&ast, source).unwrap().code
}

#[test]
fn test_custom_extension() {
    let compiler = Compiler::new(vec![greeting()]).unwrap();
    let code = compile(&compiler, "{% hello %}{% do 'a' | shout %}");
    assert!(code.starts_with("import { _filters, hello } from \"twig-runtime\";\n"));
    assert!(code.contains("  hello();\n"));
    assert!(code.contains("  _filters.shout(\"a\");\n"));
}

#[test]
fn test_statements_need_no_backend() {
    let source = "{% set a, b = 1, c %}{% do a ~ b %}";
    let code = compile(&get_compiler(), source);
    assert!(code.contains("  [_context.a, _context.b] = [1, _context.c];\n"), "{}", code);
    assert!(code.contains("  _concat(_context.a, _context.b);\n"), "{}", code);
}

#[test]
fn test_set_loop_target() {
    let source = "{% for x in xs %}{% set x = x + 1 %}{% do x %}{% endfor %}";
    let code = compile(&get_compiler(), source);
    assert!(code.contains("for (let [, x, loop] of _entries(_context.xs)) {"), "{}", code);
    assert!(code.contains("x = (x + 1);\n"), "{}", code);
}

#[test]
fn test_extends_is_hoisted() {
    let source = "{% extends 'base.twig' %}{% block title %}{% do 1 %}{% endblock %}";
    let ast = get_compiler()
        .compile("child", source, &CompileOption::default())
        .unwrap();
    let (parent, body) = match &ast.kind {
        NodeKind::Template { parent, body, .. } => (parent, body),
        _ => panic!("not a template"),
    };
    assert!(matches!(
        parent.as_deref().map(|p| &p.kind),
        Some(NodeKind::StringLiteral { value, .. }) if value == "base.twig"
    ));
    let types: Vec<_> = body.iter().map(Node::node_type).collect();
    assert_eq!(types, vec![NodeType::BlockStatement]);
}

#[test]
fn test_compile_is_deterministic() {
    let source = "{% import 'forms.twig' as forms %}\
                  {% macro input(name, value) %}{% do forms.field(name, value ?? '') %}{% endmacro %}\
                  {% for k, v in items if v is not empty %}{% do input(k, v | upper) %}{% endfor %}";
    let compiler = Compiler::new(vec![greeting()]).unwrap();
    let first = compile(&compiler, source);
    for _ in 0..3 {
        assert_eq!(compile(&compiler, source), first);
    }
}

#[test]
fn test_compiler_is_shared_between_threads() {
    let compiler = Arc::new(Compiler::new(vec![greeting()]).unwrap());
    let source = "{% for x in 1..3 %}{% hello %}{% endfor %}";
    let expected = compile(&compiler, source);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let compiler = Arc::clone(&compiler);
            thread::spawn(move || compile(&compiler, source))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_parse_keeps_template_only_nodes() {
    let ast = get_compiler()
        .parse("<p>{{ a }}</p>", &Default::default())
        .unwrap();
    assert_eq!(body(&ast)[0].node_type(), NodeType::Element);
}
