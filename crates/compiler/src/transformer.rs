/*!
Transform the parsed template into a tree the generator can print.

Pass groups run strictly in this order, each one a full traversal:

1. `analyse` visitors of every extension, in registration order
2. scope resolution of identifiers
3. `finalize` visitors of every extension (backend lowering)
4. validation

Node types declared eliminated by a pass are forbidden in every later one.
 */

mod scope;
mod validate;

pub use validate::suggest_filters;

use super::{
    ast::{Node, NodeType},
    compiler::CompileOption,
    error::CompileResult,
    extension::Registry,
    traverse::{Traverser, VisitorMap},
};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Facts collected about the template while transforming it.
#[derive(Debug, Default)]
pub struct TemplateMeta {
    /// string literal of `{% extends %}`
    pub parent: Option<Node>,
    /// names of `{% block %}`s in source order
    pub blocks: Vec<String>,
}

/// Lexical scopes of local names. The outermost scope is the template.
#[derive(Debug)]
pub struct Scopes(Vec<FxHashSet<String>>);

impl Default for Scopes {
    fn default() -> Self {
        Self(vec![FxHashSet::default()])
    }
}

impl Scopes {
    pub fn push(&mut self, scope: FxHashSet<String>) {
        self.0.push(scope);
    }
    pub fn pop(&mut self) {
        // the template scope is never popped
        if self.0.len() > 1 {
            self.0.pop();
        }
    }
    pub fn declare(&mut self, name: &str) {
        if let Some(scope) = self.0.last_mut() {
            scope.insert(name.to_string());
        }
    }
    pub fn is_local(&self, name: &str) -> bool {
        self.0.iter().any(|s| s.contains(name))
    }
}

/// State of a single compile call. Never shared between calls.
pub struct CompileState<'a> {
    pub option: &'a CompileOption,
    pub filters: &'a FxHashSet<&'static str>,
    pub tests: &'a FxHashSet<&'static str>,
    pub scopes: Scopes,
    pub meta: TemplateMeta,
    key_counter: usize,
}

impl<'a> CompileState<'a> {
    pub fn new(
        option: &'a CompileOption,
        filters: &'a FxHashSet<&'static str>,
        tests: &'a FxHashSet<&'static str>,
    ) -> Self {
        Self {
            option,
            filters,
            tests,
            scopes: Scopes::default(),
            meta: TemplateMeta::default(),
            key_counter: 0,
        }
    }

    /// a key unique within this compile, for backends that key their output
    pub fn next_key(&mut self) -> String {
        let key = format!("k{}", self.key_counter);
        self.key_counter += 1;
        key
    }
}

struct Stage<'v> {
    phase: &'static str,
    name: &'static str,
    visitors: &'v VisitorMap,
}

pub fn transform(
    ast: &mut Node,
    registry: &Registry,
    state: &mut CompileState<'_>,
) -> CompileResult<()> {
    let scope = scope::scope_visitors();
    let validation = validate::validation_visitors();
    let mut stages = vec![];
    for ext in registry.extensions() {
        if let Some(visitors) = &ext.analyse {
            stages.push(Stage {
                phase: "analyse",
                name: ext.name,
                visitors,
            });
        }
    }
    stages.push(Stage {
        phase: "analyse",
        name: "scope",
        visitors: &scope,
    });
    for ext in registry.extensions() {
        if let Some(visitors) = &ext.finalize {
            stages.push(Stage {
                phase: "finalize",
                name: ext.name,
                visitors,
            });
        }
    }
    stages.push(Stage {
        phase: "validate",
        name: "validate",
        visitors: &validation,
    });

    let mut forbidden: Vec<NodeType> = vec![];
    for stage in stages {
        debug!(phase = stage.phase, pass = stage.name, forbidden = forbidden.len(), "running pass");
        Traverser::new(stage.visitors, &forbidden).traverse(ast, state)?;
        forbidden.extend_from_slice(stage.visitors.eliminated());
    }
    Ok(())
}
