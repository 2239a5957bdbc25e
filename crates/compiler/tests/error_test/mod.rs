use super::common::{compile_err, get_compiler, parse};
use super::compiler;
use compiler::{
    ast::{Node, NodeKind},
    diagnostic::Diagnostic,
    error::CompileResult,
    parser::Parser,
    tokenizer::Token,
    CompilationErrorKind as ErrorKind, Compiler, ErrorCategory, Extension,
};
use insta::assert_snapshot;

fn parse_nothing<'a>(p: &mut Parser<'a>, start: Token<'a>) -> CompileResult<Node> {
    p.expect_tag_end()?;
    Ok(Node::new(NodeKind::FlushStatement, p.loc_from(start.location.start)))
}

#[test]
fn test_missing_backend() {
    let err = compile_err("<p>hi</p>");
    assert_eq!(err.kind, ErrorKind::MissingBackend);
    assert_eq!(err.category(), ErrorCategory::Validation);
    let err = compile_err("{% if a %}{{ b }}{% endif %}");
    assert_eq!(err.kind, ErrorKind::MissingBackend);
    assert!(err.to_string().ends_with(" Found `PrintStatement`."));
}

#[test]
fn test_unknown_filter_before_missing_backend() {
    let err = compile_err("{{ x | totallyBogusFilter }}");
    assert_eq!(err.kind, ErrorKind::UnknownFilter);
    let err = compile_err("<p>{{ x is bogus }}</p>");
    assert_eq!(err.kind, ErrorKind::UnknownTest);
}

#[test]
fn test_unknown_filter_suggestions() {
    let err = compile_err("{% do x | totallyBogusFilter %}");
    assert_eq!(err.kind, ErrorKind::UnknownFilter);
    assert!(!err.suggestions.is_empty());
    let mut sorted = err.suggestions.clone();
    sorted.sort();
    assert_eq!(err.suggestions, sorted);
    assert!(err
        .to_string()
        .starts_with("Unknown filter `totallyBogusFilter`. You might want to use one of: "));
}

#[test]
fn test_close_filter_name() {
    let err = compile_err("{% do x | uper %}");
    assert_eq!(err.kind, ErrorKind::UnknownFilter);
    assert_eq!(err.suggestions, vec!["upper"]);
}

#[test]
fn test_unknown_test() {
    let err = compile_err("{% do x is evn %}");
    assert_eq!(err.kind, ErrorKind::UnknownTest);
    assert!(err.suggestions.contains(&"even".to_string()));
}

#[test]
fn test_duplicate_tag() {
    let ext = Extension::new("loops").tag("for", parse_nothing);
    let err = Compiler::new(vec![ext]).err().unwrap();
    assert_eq!(err.kind, ErrorKind::DuplicateTag);
    assert_eq!(err.category(), ErrorCategory::Registration);
    assert_snapshot!(
        err.to_string(),
        @"Tag is registered by more than one extension `for`: defined by `core` and `loops`."
    );
}

#[test]
fn test_duplicate_operator_and_filter() {
    let ext = Extension::new("math").binary("+", 1, compiler::ast::Associativity::Left);
    let err = Compiler::new(vec![ext]).err().unwrap();
    assert_eq!(err.kind, ErrorKind::DuplicateBinaryOperator);
    let ext = Extension::new("strings").filters(&["upper"]);
    let err = Compiler::new(vec![ext]).err().unwrap();
    assert_eq!(err.kind, ErrorKind::DuplicateFilter);
}

#[test]
fn test_custom_tag_is_parsed() {
    let compiler = Compiler::new(vec![Extension::new("noop").tag("noop", parse_nothing)]).unwrap();
    assert!(compiler.parse("{% noop %}", &Default::default()).is_ok());
    assert_eq!(parse("{% do 1 %}").loc.end.offset, 10);
}

#[test]
fn test_diagnostic_frame() {
    let source = "<ul>\n  {% for x in %}\n</ul>";
    let err = get_compiler()
        .parse(source, &Default::default())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedToken);
    let diagnostic = Diagnostic::from_error(&err, source);
    assert_eq!(diagnostic.position.line, 2);
    assert_eq!(diagnostic.position.column, 15);
    assert_eq!(
        diagnostic.frame,
        "  1 | <ul>\n> 2 |   {% for x in %}\n    |               ^\n  3 | </ul>\n"
    );
}

#[test]
fn test_lex_error_has_location() {
    let err = get_compiler()
        .parse("{{ 'abc }}", &Default::default())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedString);
    assert_eq!(err.category(), ErrorCategory::Lex);
}
