use super::CompileState;
use crate::{
    ast::{NodeKind, NodeType, TEMPLATE_ONLY_TYPES},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    traverse::{Path, VisitorMap},
    util::levenshtein,
};

/// Template-only nodes are reported on exit, so an unknown filter or test
/// inside them is reported first.
pub fn validation_visitors() -> VisitorMap {
    let visitors = TEMPLATE_ONLY_TYPES
        .iter()
        .fold(VisitorMap::new(), |map, ty| map.exit(*ty, missing_backend));
    visitors
        .on(NodeType::FilterExpression, check_filter)
        .on(NodeType::TestExpression, check_test)
}

fn missing_backend(path: &mut Path, _: &mut CompileState) -> CompileResult<()> {
    let node = path.node();
    Err(CompilationError::new(ErrorKind::MissingBackend)
        .with_additional_message(format!(" Found `{:?}`.", node.node_type()))
        .with_location(node.loc))
}

fn check_filter(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    let node = path.node();
    if let NodeKind::FilterExpression { name, .. } = &node.kind {
        if !state.filters.contains(name.as_str()) {
            let known = state.filters.iter().copied();
            return Err(CompilationError::new(ErrorKind::UnknownFilter)
                .with_additional_message(format!(" `{}`.", name))
                .with_suggestions(suggest_filters(name, known))
                .with_location(node.loc));
        }
    }
    Ok(())
}

fn check_test(path: &mut Path, state: &mut CompileState) -> CompileResult<()> {
    let node = path.node();
    if let NodeKind::TestExpression { name, .. } = &node.kind {
        if !state.tests.contains(name.as_str()) {
            let known = state.tests.iter().copied();
            return Err(CompilationError::new(ErrorKind::UnknownTest)
                .with_additional_message(format!(" `{}`.", name))
                .with_suggestions(suggest_filters(name, known))
                .with_location(node.loc));
        }
    }
    Ok(())
}

/// Known names worth suggesting for `unknown`, sorted.
/// Falls back to every known name when nothing is close.
pub fn suggest_filters<'a, I>(unknown: &str, known: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut known: Vec<&str> = known.into_iter().collect();
    known.sort_unstable();
    known.dedup();
    let lower = unknown.to_lowercase();
    let threshold = (unknown.chars().count() / 3).max(2);
    let close: Vec<String> = known
        .iter()
        .filter(|k| {
            let k = k.to_lowercase();
            levenshtein(&lower, &k) <= threshold || (k.len() > 2 && lower.contains(&k))
        })
        .map(|k| k.to_string())
        .collect();
    if !close.is_empty() {
        return close;
    }
    known.into_iter().map(String::from).collect()
}
