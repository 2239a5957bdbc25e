//! Work-list traversal with in-place rewriting.
//!
//! Nodes are addressed by their [`Step`]s from the root and re-located on
//! every visit, so siblings shifted by an earlier removal or splice are
//! found at their live position. List children are walked by a cursor that
//! only advances once the current item has been fully visited:
//!
//! * plain visit: enter, children, exit, then the next index
//! * `skip`: neither children nor exit, then the next index
//! * `remove` / `replace_with_many`: the same index is visited again
//! * `replace_with`: the replacement is visited again at the same position

use super::{
    ast::{ChildSlot, Node, NodeType},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    transformer::CompileState,
};
use rustc_hash::FxHashMap;

pub type VisitFn = fn(&mut Path<'_>, &mut CompileState<'_>) -> CompileResult<()>;

#[derive(Clone, Copy, Default)]
pub struct Visitor {
    pub enter: Option<VisitFn>,
    pub exit: Option<VisitFn>,
}

/// Handlers keyed by node type for one pass.
#[derive(Clone, Default)]
pub struct VisitorMap {
    visitors: FxHashMap<NodeType, Visitor>,
    eliminates: Vec<NodeType>,
}

impl VisitorMap {
    pub fn new() -> Self {
        Self::default()
    }
    /// register a plain function, which is an enter handler
    pub fn on(mut self, ty: NodeType, f: VisitFn) -> Self {
        self.visitors.entry(ty).or_default().enter = Some(f);
        self
    }
    pub fn exit(mut self, ty: NodeType, f: VisitFn) -> Self {
        self.visitors.entry(ty).or_default().exit = Some(f);
        self
    }
    /// Declares that no node of `ty` survives this pass.
    /// Later traversals treat meeting one as a contract violation.
    pub fn eliminates(mut self, ty: NodeType) -> Self {
        self.eliminates.push(ty);
        self
    }
    pub fn get(&self, ty: NodeType) -> Option<&Visitor> {
        self.visitors.get(&ty)
    }
    pub fn eliminated(&self) -> &[NodeType] {
        &self.eliminates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKey {
    Root,
    Field(&'static str),
    Index(&'static str, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ancestor {
    pub node_type: NodeType,
    pub key: PathKey,
}

enum Flow {
    Continue,
    Skip,
    Replaced,
    ReplacedMany(Vec<Node>),
    Removed,
}

/// Cursor handed to visitor callbacks.
pub struct Path<'a> {
    node: &'a mut Node,
    key: PathKey,
    optional: bool,
    ancestors: &'a [Ancestor],
    flow: Flow,
}

impl<'a> Path<'a> {
    pub fn node(&self) -> &Node {
        self.node
    }
    pub fn node_mut(&mut self) -> &mut Node {
        self.node
    }
    pub fn key(&self) -> PathKey {
        self.key
    }
    /// outermost first
    pub fn ancestors(&self) -> &[Ancestor] {
        self.ancestors
    }
    pub fn parent(&self) -> Option<&Ancestor> {
        self.ancestors.last()
    }

    pub fn replace_with(&mut self, node: Node) {
        *self.node = node;
        self.flow = Flow::Replaced;
    }

    /// Splice `nodes` in place of the current node. List positions only.
    pub fn replace_with_many(&mut self, nodes: Vec<Node>) -> CompileResult<()> {
        if !matches!(self.key, PathKey::Index(..)) {
            return Err(self.error(ErrorKind::InvalidReplacement));
        }
        self.flow = Flow::ReplacedMany(nodes);
        Ok(())
    }

    pub fn remove(&mut self) -> CompileResult<()> {
        if !self.optional && !matches!(self.key, PathKey::Index(..)) {
            return Err(self.error(ErrorKind::InvalidRemoval));
        }
        self.flow = Flow::Removed;
        Ok(())
    }

    pub fn skip(&mut self) {
        self.flow = Flow::Skip;
    }

    fn error(&self, kind: ErrorKind) -> CompilationError {
        let msg = match self.key {
            PathKey::Root => " at the root.".to_string(),
            PathKey::Field(name) => format!(" at `{}`.", name),
            PathKey::Index(name, i) => format!(" at `{}[{}]`.", name, i),
        };
        CompilationError::new(kind)
            .with_additional_message(msg)
            .with_location(self.node.loc)
    }
}

/// one edge from a node to a child: slot index and, for lists, item index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    slot: usize,
    index: Option<usize>,
}

enum Task {
    Enter(Vec<Step>),
    Exit(Vec<Step>),
}

struct Located<'n> {
    node: &'n mut Node,
    key: PathKey,
    optional: bool,
    ancestors: Vec<Ancestor>,
}

/// Walk from the root along `steps`. `None` means the position is gone,
/// e.g. a list cursor that ran past the end.
fn locate<'n>(root: &'n mut Node, steps: &[Step]) -> Option<Located<'n>> {
    let mut node = root;
    let mut key = PathKey::Root;
    let mut optional = false;
    let mut ancestors = Vec::with_capacity(steps.len());
    for step in steps {
        let current = node;
        let node_type = current.node_type();
        ancestors.push(Ancestor { node_type, key });
        let slot = current.children_mut().into_iter().nth(step.slot)?;
        node = match (slot, step.index) {
            (ChildSlot::One(name, child), None) => {
                key = PathKey::Field(name);
                optional = false;
                &mut **child
            }
            (ChildSlot::Opt(name, child), None) => {
                key = PathKey::Field(name);
                optional = true;
                child.as_deref_mut()?
            }
            (ChildSlot::Many(name, list), Some(i)) => {
                key = PathKey::Index(name, i);
                optional = false;
                list.get_mut(i)?
            }
            _ => return None,
        };
    }
    Some(Located {
        node,
        key,
        optional,
        ancestors,
    })
}

/// Apply a removal or splice to the parent of the node at `steps`.
fn detach(root: &mut Node, steps: &[Step], replacement: Vec<Node>) {
    let (last, parent_steps) = match steps.split_last() {
        Some(split) => split,
        None => return,
    };
    let parent = match locate(root, parent_steps) {
        Some(located) => located.node,
        None => return,
    };
    match (parent.children_mut().into_iter().nth(last.slot), last.index) {
        (Some(ChildSlot::Many(_, list)), Some(i)) => {
            list.splice(i..i + 1, replacement);
        }
        (Some(ChildSlot::Opt(_, child)), None) => *child = None,
        _ => {}
    }
}

fn with_step(steps: &[Step], step: Step) -> Vec<Step> {
    let mut v = Vec::with_capacity(steps.len() + 1);
    v.extend_from_slice(steps);
    v.push(step);
    v
}

/// the same position with the list index moved by `delta`
fn sibling(steps: &[Step], delta: usize) -> Option<Vec<Step>> {
    let (last, init) = steps.split_last()?;
    let i = last.index?;
    let step = Step {
        slot: last.slot,
        index: Some(i + delta),
    };
    Some(with_step(init, step))
}

pub struct Traverser<'v> {
    visitors: &'v VisitorMap,
    forbidden: &'v [NodeType],
}

impl<'v> Traverser<'v> {
    pub fn new(visitors: &'v VisitorMap, forbidden: &'v [NodeType]) -> Self {
        Self {
            visitors,
            forbidden,
        }
    }

    pub fn traverse(&self, root: &mut Node, state: &mut CompileState<'_>) -> CompileResult<()> {
        let mut tasks = vec![Task::Enter(vec![])];
        while let Some(task) = tasks.pop() {
            match task {
                Task::Enter(steps) => self.enter(root, steps, state, &mut tasks)?,
                Task::Exit(steps) => self.exit(root, steps, state, &mut tasks)?,
            }
        }
        Ok(())
    }

    fn enter(
        &self,
        root: &mut Node,
        steps: Vec<Step>,
        state: &mut CompileState<'_>,
        tasks: &mut Vec<Task>,
    ) -> CompileResult<()> {
        let flow = {
            let located = match locate(root, &steps) {
                Some(located) => located,
                // list cursor reached the end
                None => return Ok(()),
            };
            let node_type = located.node.node_type();
            if self.forbidden.contains(&node_type) {
                return Err(CompilationError::new(ErrorKind::ContractViolation)
                    .with_additional_message(format!(": found `{:?}`.", node_type))
                    .with_location(located.node.loc));
            }
            match self.visitors.get(node_type).and_then(|v| v.enter) {
                Some(f) => run(f, located, state)?,
                None => Flow::Continue,
            }
        };
        match flow {
            Flow::Continue => {
                tasks.push(Task::Exit(steps.clone()));
                self.push_children(root, &steps, tasks);
            }
            Flow::Skip => tasks.extend(sibling(&steps, 1).map(Task::Enter)),
            Flow::Replaced => tasks.push(Task::Enter(steps)),
            Flow::ReplacedMany(nodes) => {
                detach(root, &steps, nodes);
                tasks.push(Task::Enter(steps));
            }
            Flow::Removed => {
                detach(root, &steps, vec![]);
                // an optional child has no sibling to continue with
                if steps.last().map_or(false, |s| s.index.is_some()) {
                    tasks.push(Task::Enter(steps));
                }
            }
        }
        Ok(())
    }

    fn exit(
        &self,
        root: &mut Node,
        steps: Vec<Step>,
        state: &mut CompileState<'_>,
        tasks: &mut Vec<Task>,
    ) -> CompileResult<()> {
        let flow = {
            let located = match locate(root, &steps) {
                Some(located) => located,
                None => return Ok(()),
            };
            let node_type = located.node.node_type();
            match self.visitors.get(node_type).and_then(|v| v.exit) {
                Some(f) => run(f, located, state)?,
                None => Flow::Continue,
            }
        };
        match flow {
            Flow::Continue | Flow::Skip => tasks.extend(sibling(&steps, 1).map(Task::Enter)),
            Flow::Replaced => tasks.push(Task::Enter(steps)),
            Flow::ReplacedMany(nodes) => {
                detach(root, &steps, nodes);
                tasks.push(Task::Enter(steps));
            }
            Flow::Removed => {
                detach(root, &steps, vec![]);
                if steps.last().map_or(false, |s| s.index.is_some()) {
                    tasks.push(Task::Enter(steps));
                }
            }
        }
        Ok(())
    }

    fn push_children(&self, root: &mut Node, steps: &[Step], tasks: &mut Vec<Task>) {
        let node = match locate(root, steps) {
            Some(located) => located.node,
            None => return,
        };
        let children: Vec<Step> = node
            .children_mut()
            .iter()
            .enumerate()
            .filter_map(|(slot, child)| match child {
                ChildSlot::One(..) => Some(Step { slot, index: None }),
                ChildSlot::Opt(_, c) if c.is_some() => Some(Step { slot, index: None }),
                ChildSlot::Opt(..) => None,
                ChildSlot::Many(..) => Some(Step {
                    slot,
                    index: Some(0),
                }),
            })
            .collect();
        // stack order: the first child is popped first
        for step in children.into_iter().rev() {
            tasks.push(Task::Enter(with_step(steps, step)));
        }
    }
}

fn run(f: VisitFn, located: Located<'_>, state: &mut CompileState<'_>) -> CompileResult<Flow> {
    let mut path = Path {
        node: located.node,
        key: located.key,
        optional: located.optional,
        ancestors: &located.ancestors,
        flow: Flow::Continue,
    };
    f(&mut path, state)?;
    Ok(path.flow)
}

/// Run one pass over `root`.
pub fn traverse(
    root: &mut Node,
    visitors: &VisitorMap,
    state: &mut CompileState<'_>,
) -> CompileResult<()> {
    Traverser::new(visitors, &[]).traverse(root, state)
}
