use crate::{
    ast::{Associativity::*, Node, NodeKind},
    error::CompileResult,
    extension::Extension,
    parser::Parser,
    tokenizer::{Token, TokenKind},
};
use smallvec::SmallVec;

pub fn register(ext: Extension) -> Extension {
    ext.binary("or", 10, Left)
        .binary("and", 15, Left)
        .binary("b-or", 16, Left)
        .binary("b-xor", 17, Left)
        .binary("b-and", 18, Left)
        .binary("==", 20, Left)
        .binary("!=", 20, Left)
        .binary("<", 20, Left)
        .binary(">", 20, Left)
        .binary(">=", 20, Left)
        .binary("<=", 20, Left)
        .binary("in", 20, Left)
        .binary("not in", 20, Left)
        .binary("matches", 20, Left)
        .binary("starts with", 20, Left)
        .binary("ends with", 20, Left)
        .binary("..", 25, Left)
        .binary("+", 30, Left)
        .binary("-", 30, Left)
        .binary("~", 40, Left)
        .binary("*", 60, Left)
        .binary("/", 60, Left)
        .binary("//", 60, Left)
        .binary("%", 60, Left)
        .binary_with("is", 100, parse_test)
        .binary_with("is not", 100, parse_test)
        .binary("**", 200, Right)
        .binary("??", 300, Right)
        .unary("not", 50)
        .unary("-", 500)
        .unary("+", 500)
}

/// `target is [not] name[(args)]`. Two word tests like `divisible by` are
/// joined when the pair is registered.
fn parse_test<'a>(parser: &mut Parser<'a>, target: Node, op: Token<'a>) -> CompileResult<Node> {
    let first = parser.expect_symbol(None)?;
    let mut words: SmallVec<[&str; 2]> = SmallVec::new();
    words.push(first.text);
    let second = parser.stream().peek().clone();
    if second.kind == TokenKind::Symbol {
        let joined = format!("{} {}", first.text, second.text);
        if parser.registry().tests().contains(joined.as_str()) {
            parser.stream().next();
            words.push(second.text);
        }
    }
    let arguments = if parser.test_punctuation("(") {
        parser.parse_arguments()?.0
    } else {
        vec![]
    };
    let start = target.loc.start;
    let kind = NodeKind::TestExpression {
        target: Box::new(target),
        name: words.join(" "),
        arguments,
        negated: op.text == "is not",
    };
    Ok(Node::new(kind, parser.loc_from(start)))
}
