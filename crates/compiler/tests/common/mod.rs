use super::compiler;
use compiler::{
    ast::{Node, NodeKind},
    CompilationError, CompileOption, Compiler, ParseOption,
};

pub fn get_compiler() -> Compiler {
    Compiler::new(vec![]).unwrap()
}

pub fn parse(source: &str) -> Node {
    get_compiler().parse(source, &ParseOption::default()).unwrap()
}

pub fn parse_with(source: &str, option: ParseOption) -> Node {
    get_compiler().parse(source, &option).unwrap()
}

pub fn compile_err(source: &str) -> CompilationError {
    get_compiler()
        .compile("test", source, &CompileOption::default())
        .unwrap_err()
}

pub fn body(template: &Node) -> &[Node] {
    match &template.kind {
        NodeKind::Template { body, .. } => body,
        _ => panic!("not a template"),
    }
}

/// the expression printed by `{{ }}`
pub fn printed(template: &Node) -> &Node {
    match &body(template)[0].kind {
        NodeKind::PrintStatement { value } => value,
        _ => panic!("not a print statement"),
    }
}

/// Compact prefix notation of an expression, e.g. `(+ a (* b c))`.
pub fn sexp(node: &Node) -> String {
    match &node.kind {
        NodeKind::Identifier { name, .. } => name.clone(),
        NodeKind::NumericLiteral { value } => value.to_string(),
        NodeKind::StringLiteral { value, .. } => format!("{:?}", value),
        NodeKind::NullLiteral => "null".into(),
        NodeKind::BooleanLiteral { value } => value.to_string(),
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
        } => call(&format!("|{}", name), target, arguments),
        NodeKind::TestExpression {
            target,
            name,
            arguments,
            negated,
        } => {
            let op = if *negated { "is-not" } else { "is" };
            call(&format!("{} {}", op, name), target, arguments)
        }
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            let part = |n: &Option<Box<Node>>| n.as_ref().map_or("_".to_string(), |n| sexp(n));
            format!("(? {} {} {})", sexp(test), part(consequent), part(alternate))
        }
        other => format!("{:?}", other),
    }
}

fn call(head: &str, target: &Node, arguments: &[Node]) -> String {
    let mut s = format!("({} {}", head, sexp(target));
    for arg in arguments {
        s.push(' ');
        s.push_str(&sexp(arg));
    }
    s.push(')');
    s
}
