use super::common::{body, parse, parse_with, printed, sexp};
use super::compiler;
use compiler::{get_node_source, Node, NodeKind, NodeType, ParseOption};

fn untrimmed() -> ParseOption {
    ParseOption {
        apply_whitespace_trimming: false,
        ..Default::default()
    }
}

fn texts(template: &Node) -> Vec<String> {
    body(template)
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Fragment { value } => match &value.kind {
                NodeKind::Text { value } => Some(value.clone()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[test]
fn test_set_round_trip() {
    let source = "abc{% set foo = 0 %}def";
    let ast = parse(source);
    let body = body(&ast);
    assert_eq!(body.len(), 3);
    assert_eq!(body[1].node_type(), NodeType::SetStatement);
    assert_eq!(get_node_source(&body[1], source), "{% set foo = 0 %}");
    assert_eq!(get_node_source(&body[0], source), "abc");
    assert_eq!(get_node_source(&body[2], source), "def");
}

#[test]
fn test_round_trip_of_every_top_level_node() {
    let source = "a {{ b | upper }} {% if c %}d{% else %}e{% endif %} <p id=\"x\">f</p>";
    let ast = parse_with(source, untrimmed());
    let joined: String = body(&ast)
        .iter()
        .map(|n| get_node_source(n, source))
        .collect();
    assert_eq!(joined, source);
}

#[test]
fn test_round_trip_with_trim_markers() {
    let source = "a {%- set x = 1 -%} b";
    let ast = parse_with(source, untrimmed());
    let body = body(&ast);
    assert_eq!(get_node_source(&body[1], source), "{%- set x = 1 -%}");
    assert_eq!(texts(&ast), vec!["a ", " b"]);
}

#[test]
fn test_trimming_applies_to_every_tag() {
    let cases = [
        "a {%- for x in y -%} b {%- endfor -%} c",
        "a {%- if x -%} b {%- endif -%} c",
        "a {%- mount 'm' -%} b",
        "a {{- x -}} b",
    ];
    for case in cases {
        let ast = parse(case);
        let mut trimmed = vec![];
        ast.for_each(&mut |n| {
            if let NodeKind::Text { value } = &n.kind {
                trimmed.push(value.clone());
            }
        });
        assert!(
            trimmed.iter().all(|t| t.trim() == t),
            "{}: {:?}",
            case,
            trimmed
        );
    }
}

#[test]
fn test_trimming_disabled_keeps_text() {
    let ast = parse_with("a  {{- b -}}  c", untrimmed());
    assert_eq!(texts(&ast), vec!["a  ", "  c"]);
    let ast = parse("a  {{- b -}}  c");
    assert_eq!(texts(&ast), vec!["a", "c"]);
}

#[test]
fn test_precedence() {
    let cases = [
        ("a + b * c", "(+ a (* b c))"),
        ("a == b or c < d", "(or (== a b) (< c d))"),
        ("a b-or b b-and c", "(b-or a (b-and b c))"),
        ("a // b % c", "(% (// a b) c)"),
        ("1..n + 1", "(.. 1 (+ n 1))"),
        ("a ** b ** c", "(** a (** b c))"),
        ("not a in b", "(in (not a) b)"),
        ("a starts with 'x' and b", "(and (starts with a \"x\") b)"),
        ("a is not empty or b", "(or (is-not empty a) b)"),
        ("x ?? y ? 1 : 2", "(? (?? x y) 1 2)"),
    ];
    for (expr, expected) in cases {
        let ast = parse(&format!("{{{{ {} }}}}", expr));
        assert_eq!(sexp(printed(&ast)), expected, "{}", expr);
    }
}

#[test]
fn test_word_operator_as_property() {
    let cases = [
        ("team.matches", "(. team matches)"),
        ("a.is", "(. a is)"),
        ("a.in", "(. a in)"),
        ("a.in in b.not", "(in (. a in) (. b not))"),
        ("a.b matches c", "(matches (. a b) c)"),
    ];
    for (expr, expected) in cases {
        let ast = parse(&format!("{{{{ {} }}}}", expr));
        assert_eq!(sexp(printed(&ast)), expected, "{}", expr);
    }
}

#[test]
fn test_filters_bind_tighter_than_operators() {
    let ast = parse("{{ -a | abs + b | length }}");
    assert_eq!(sexp(printed(&ast)), "(+ (- (|abs a)) (|length b))");
}

#[test]
fn test_node_source_survives_rewrite() {
    let source = "{{ a.b }}";
    let ast = parse(source);
    let mut value = printed(&ast).clone();
    if let NodeKind::MemberExpression { object, .. } = &mut value.kind {
        object.kind = NodeKind::NullLiteral;
    }
    assert_eq!(get_node_source(&value, source), "a.b");
}
