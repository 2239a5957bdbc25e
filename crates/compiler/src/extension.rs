//! Grammar and pass contributions.
//!
//! An [`Extension`] is a plain value. Extensions are merged into a
//! [`Registry`] once, conflicts are rejected right there, and the registry
//! is never mutated afterwards so it can be shared by concurrent compiles.

use super::{
    ast::{Associativity, Node},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    parser::Parser,
    tokenizer::Token,
    traverse::VisitorMap,
};
use rustc_hash::{FxHashMap, FxHashSet};

/// Parses a tag after its keyword. Receives the `{%` token and must
/// consume everything up to and including the closing `%}` of the tag.
pub type TagParser = for<'a> fn(&mut Parser<'a>, Token<'a>) -> CompileResult<Node>;

/// Custom infix production. Receives the left operand and the operator token.
pub type InfixParser = for<'a> fn(&mut Parser<'a>, Node, Token<'a>) -> CompileResult<Node>;

#[derive(Clone, Copy)]
pub struct BinaryOperator {
    pub precedence: u32,
    pub associativity: Associativity,
    pub parse: Option<InfixParser>,
}

#[derive(Clone, Copy, Debug)]
pub struct UnaryOperator {
    pub precedence: u32,
}

#[derive(Default)]
pub struct Extension {
    pub name: &'static str,
    pub tags: Vec<(&'static str, TagParser)>,
    pub binary_operators: Vec<(&'static str, BinaryOperator)>,
    pub unary_operators: Vec<(&'static str, UnaryOperator)>,
    pub filters: Vec<&'static str>,
    pub tests: Vec<&'static str>,
    pub analyse: Option<VisitorMap>,
    pub finalize: Option<VisitorMap>,
}

impl Extension {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }
    pub fn tag(mut self, keyword: &'static str, parse: TagParser) -> Self {
        self.tags.push((keyword, parse));
        self
    }
    pub fn binary(
        mut self,
        text: &'static str,
        precedence: u32,
        associativity: Associativity,
    ) -> Self {
        let op = BinaryOperator {
            precedence,
            associativity,
            parse: None,
        };
        self.binary_operators.push((text, op));
        self
    }
    pub fn binary_with(mut self, text: &'static str, precedence: u32, parse: InfixParser) -> Self {
        let op = BinaryOperator {
            precedence,
            associativity: Associativity::Left,
            parse: Some(parse),
        };
        self.binary_operators.push((text, op));
        self
    }
    pub fn unary(mut self, text: &'static str, precedence: u32) -> Self {
        self.unary_operators
            .push((text, UnaryOperator { precedence }));
        self
    }
    pub fn filters(mut self, names: &[&'static str]) -> Self {
        self.filters.extend_from_slice(names);
        self
    }
    pub fn tests(mut self, names: &[&'static str]) -> Self {
        self.tests.extend_from_slice(names);
        self
    }
    pub fn analyse(mut self, visitors: VisitorMap) -> Self {
        self.analyse = Some(visitors);
        self
    }
    pub fn finalize(mut self, visitors: VisitorMap) -> Self {
        self.finalize = Some(visitors);
        self
    }
}

/// Lookup tables merged from an ordered list of extensions.
pub struct Registry {
    extensions: Vec<Extension>,
    tags: FxHashMap<&'static str, TagParser>,
    binary_operators: FxHashMap<&'static str, BinaryOperator>,
    unary_operators: FxHashMap<&'static str, UnaryOperator>,
    filters: FxHashSet<&'static str>,
    tests: FxHashSet<&'static str>,
    /// every operator text, longest first, for the lexer
    operator_texts: Vec<String>,
}

/// Records which extension owns each key of one contribution kind.
struct Owners {
    kind: ErrorKind,
    owners: FxHashMap<&'static str, &'static str>,
}

impl Owners {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            owners: FxHashMap::default(),
        }
    }
    fn claim(&mut self, key: &'static str, extension: &'static str) -> CompileResult<()> {
        if let Some(first) = self.owners.insert(key, extension) {
            let msg = format!(" `{}`: defined by `{}` and `{}`.", key, first, extension);
            return Err(CompilationError::new(self.kind).with_additional_message(msg));
        }
        Ok(())
    }
}

impl Registry {
    pub fn new(extensions: Vec<Extension>) -> CompileResult<Self> {
        let mut tag_owners = Owners::new(ErrorKind::DuplicateTag);
        let mut binary_owners = Owners::new(ErrorKind::DuplicateBinaryOperator);
        let mut unary_owners = Owners::new(ErrorKind::DuplicateUnaryOperator);
        let mut filter_owners = Owners::new(ErrorKind::DuplicateFilter);
        let mut test_owners = Owners::new(ErrorKind::DuplicateTest);

        let mut tags = FxHashMap::default();
        let mut binary_operators = FxHashMap::default();
        let mut unary_operators = FxHashMap::default();
        let mut filters = FxHashSet::default();
        let mut tests = FxHashSet::default();

        for ext in &extensions {
            for &(keyword, parse) in &ext.tags {
                tag_owners.claim(keyword, ext.name)?;
                tags.insert(keyword, parse);
            }
            for &(text, op) in &ext.binary_operators {
                binary_owners.claim(text, ext.name)?;
                binary_operators.insert(text, op);
            }
            for &(text, op) in &ext.unary_operators {
                unary_owners.claim(text, ext.name)?;
                unary_operators.insert(text, op);
            }
            for &name in &ext.filters {
                filter_owners.claim(name, ext.name)?;
                filters.insert(name);
            }
            for &name in &ext.tests {
                test_owners.claim(name, ext.name)?;
                tests.insert(name);
            }
        }

        let mut operator_texts: Vec<String> = binary_operators
            .keys()
            .chain(unary_operators.keys())
            .map(|s| s.to_string())
            .collect();
        // `-` is both unary and binary
        operator_texts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        operator_texts.dedup();

        Ok(Self {
            extensions,
            tags,
            binary_operators,
            unary_operators,
            filters,
            tests,
            operator_texts,
        })
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }
    pub fn tag(&self, keyword: &str) -> Option<TagParser> {
        self.tags.get(keyword).copied()
    }
    pub fn binary_operator(&self, text: &str) -> Option<&BinaryOperator> {
        self.binary_operators.get(text)
    }
    pub fn unary_operator(&self, text: &str) -> Option<&UnaryOperator> {
        self.unary_operators.get(text)
    }
    pub fn filters(&self) -> &FxHashSet<&'static str> {
        &self.filters
    }
    pub fn tests(&self) -> &FxHashSet<&'static str> {
        &self.tests
    }
    pub fn operator_texts(&self) -> &[String] {
        &self.operator_texts
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::NodeKind;

    fn noop<'a>(_: &mut Parser<'a>, t: Token<'a>) -> CompileResult<Node> {
        Ok(Node::new(NodeKind::FlushStatement, t.location))
    }

    #[test]
    fn test_duplicate_names_both_extensions() {
        let a = Extension::new("a").tag("for", noop);
        let b = Extension::new("b").tag("for", noop);
        let err = Registry::new(vec![a, b]).err().unwrap();
        assert_eq!(err.kind, ErrorKind::DuplicateTag);
        assert_eq!(
            err.to_string(),
            "Tag is registered by more than one extension `for`: defined by `a` and `b`."
        );
    }

    #[test]
    fn test_same_text_different_kind() {
        let ext = Extension::new("a")
            .binary("-", 30, Associativity::Left)
            .unary("-", 500)
            .binary("not in", 20, Associativity::Left)
            .unary("not", 50);
        let registry = Registry::new(vec![ext]).unwrap();
        assert_eq!(registry.operator_texts(), &["not in", "not", "-"]);
        assert_eq!(registry.unary_operator("-").unwrap().precedence, 500);
    }

    #[test]
    fn test_duplicate_filter() {
        let a = Extension::new("a").filters(&["upper"]);
        let b = Extension::new("b").filters(&["lower", "upper"]);
        let err = Registry::new(vec![a, b]).err().unwrap();
        assert_eq!(err.kind, ErrorKind::DuplicateFilter);
    }
}
