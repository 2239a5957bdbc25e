use phf::{phf_set, Set};

mod js_string;
pub use js_string::{js_string, write_js_string};

const VOID_TAGS: Set<&str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
};

/// elements that never have children nor an end tag
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

pub fn is_simple_identifier(s: &str) -> bool {
    let is_ident = |c: char| c == '$' || c == '_' || c.is_ascii_alphanumeric();
    !s.is_empty() && s.chars().all(is_ident) && !s.starts_with(|c: char| c.is_ascii_digit())
}

/// Resolve backslash escapes of a template string literal.
/// Unknown escapes keep their backslash.
pub fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut ret = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => ret.push('\n'),
            Some('t') => ret.push('\t'),
            Some('r') => ret.push('\r'),
            Some('f') => ret.push('\u{c}'),
            Some('v') => ret.push('\u{b}'),
            Some('e') => ret.push('\u{1b}'),
            Some('0') => ret.push('\0'),
            Some(c @ ('\\' | '"' | '\'' | '#')) => ret.push(c),
            Some(c) => {
                ret.push('\\');
                ret.push(c);
            }
            None => ret.push('\\'),
        }
    }
    ret
}

/// Edit distance between two names, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a\"b\n"#), "a\"b\n");
        assert_eq!(unescape(r"\d+"), r"\d+");
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape(r"end\"), r"end\");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("uper", "upper"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_simple_identifier() {
        assert!(is_simple_identifier("_a1$"));
        assert!(!is_simple_identifier("1a"));
        assert!(!is_simple_identifier("same as"));
        assert!(!is_simple_identifier(""));
    }
}
