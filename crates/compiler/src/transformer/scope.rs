//! Resolve every identifier to a context lookup or a local name.
//! Loop targets, macro arguments and import aliases are locals.

use super::CompileState;
use crate::{
    ast::{Binding, Node, NodeKind, NodeType},
    error::CompileResult,
    traverse::{traverse, Path, VisitorMap},
};
use rustc_hash::FxHashSet;

pub fn scope_visitors() -> VisitorMap {
    VisitorMap::new()
        .on(NodeType::Identifier, resolve_identifier)
        .on(NodeType::ForStatement, enter_for)
        .exit(NodeType::ForStatement, exit_scope)
        .on(NodeType::MacroDeclaration, enter_macro)
        .exit(NodeType::MacroDeclaration, exit_scope)
        .on(NodeType::ImportDeclaration, declare_imports)
}

fn resolve_identifier(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    if let NodeKind::Identifier { name, binding } = &mut path.node_mut().kind {
        if *binding == Binding::Unresolved {
            *binding = if state.scopes.is_local(name) {
                Binding::Local
            } else {
                Binding::Context
            };
        }
    }
    Ok(())
}

/// mark a declared name local and record it in `scope`
fn declare(target: &mut Node, scope: &mut FxHashSet<String>) {
    match &mut target.kind {
        NodeKind::Identifier { name, binding } => {
            *binding = Binding::Local;
            scope.insert(name.clone());
        }
        NodeKind::VariableDeclarator { id, .. } => declare(id, scope),
        _ => {}
    }
}

fn enter_for(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    let visitors = scope_visitors();
    if let NodeKind::ForStatement {
        key_target,
        value_target,
        sequence,
        otherwise,
        ..
    } = &mut path.node_mut().kind
    {
        // the sequence and the else branch are outside of the loop scope
        traverse(sequence, &visitors, state)?;
        for node in otherwise.iter_mut() {
            traverse(node, &visitors, state)?;
        }
        let mut scope = FxHashSet::default();
        if let Some(key) = key_target {
            declare(key, &mut scope);
        }
        declare(value_target, &mut scope);
        scope.insert("loop".to_string());
        state.scopes.push(scope);
    }
    Ok(())
}

fn enter_macro(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    if let NodeKind::MacroDeclaration { params, .. } = &mut path.node_mut().kind {
        let mut scope = FxHashSet::default();
        for param in params.iter_mut() {
            declare(param, &mut scope);
        }
        state.scopes.push(scope);
    }
    Ok(())
}

fn exit_scope(_: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    state.scopes.pop();
    Ok(())
}

fn declare_imports(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    if let NodeKind::ImportDeclaration { specifiers, .. } = &path.node().kind {
        for specifier in specifiers {
            if let NodeKind::ImportSpecifier { local, .. } = &specifier.kind {
                state.scopes.declare(local);
            }
        }
    }
    Ok(())
}
