use super::{
    ast::{Node, NodeKind},
    core_extension,
    error::CompileResult,
    extension::{Extension, Registry},
    parser::{ParseOption, Parser},
    tokenizer::Lexer,
    transformer::{transform, CompileState},
};
#[cfg(feature = "serde")]
use serde::Deserialize;
use tracing::{debug, debug_span};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct CompileOption {
    pub apply_whitespace_trimming: bool,
    pub preserve_source_literally: bool,
    /// ask the backend to give every element a unique key
    pub generate_key: bool,
}

impl Default for CompileOption {
    fn default() -> Self {
        Self {
            apply_whitespace_trimming: true,
            preserve_source_literally: false,
            generate_key: false,
        }
    }
}

impl CompileOption {
    pub fn parse_option(&self) -> ParseOption {
        ParseOption {
            apply_whitespace_trimming: self.apply_whitespace_trimming,
            preserve_source_literally: self.preserve_source_literally,
        }
    }
}

/// A validated set of extensions. Immutable once built, so one compiler
/// can serve any number of threads; every call gets its own state.
pub struct Compiler {
    registry: Registry,
}

impl Compiler {
    /// The core extension is always registered first.
    pub fn new(extensions: Vec<Extension>) -> CompileResult<Self> {
        let mut all = Vec::with_capacity(extensions.len() + 1);
        all.push(core_extension::core());
        all.extend(extensions);
        let names: Vec<_> = all.iter().map(|e| e.name).collect();
        debug!(extensions = ?names, "building registry");
        Ok(Self {
            registry: Registry::new(all)?,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tokenize<'a>(&'a self, source: &'a str) -> Lexer<'a> {
        Lexer::new(source, self.registry.operator_texts())
    }

    /// Parse without transforming. The template is unnamed.
    pub fn parse(&self, source: &str, option: &ParseOption) -> CompileResult<Node> {
        Parser::new(source, &self.registry, *option)?.parse_template("")
    }

    /// Parse, run every pass and validate. The returned tree is ready for
    /// [`crate::codegen::to_string`].
    pub fn compile(&self, name: &str, source: &str, option: &CompileOption) -> CompileResult<Node> {
        let span = debug_span!("compile", template = name);
        let _guard = span.enter();
        let parser = Parser::new(source, &self.registry, option.parse_option())?;
        let mut ast = parser.parse_template(name)?;
        debug!(len = source.len(), "parsed");
        let mut state = CompileState::new(option, self.registry.filters(), self.registry.tests());
        transform(&mut ast, &self.registry, &mut state)?;
        if let NodeKind::Template { parent, .. } = &mut ast.kind {
            *parent = state.meta.parent.take().map(Box::new);
        }
        Ok(ast)
    }
}
