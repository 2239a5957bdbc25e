//! Abstract syntax tree produced by the parser and rewritten by the pipeline.
//!
//! Every [`Node`] owns its children through `Box` or `Vec`, so a rewrite can
//! move subtrees around without any reference bookkeeping. A `SliceExpression`
//! owns its `target`; the slice is a view on that target, not a second owner.

use super::SourceLocation;
#[cfg(feature = "serde")]
use serde::Serialize;

/// How an identifier is looked up at runtime.
/// Filled in by the scope analysis, `Unresolved` never reaches the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Binding {
    Unresolved,
    /// `_context.name`
    Context,
    /// loop targets, macro arguments and import aliases
    Local,
    /// helper imported from the runtime module
    Runtime,
    /// name after `.` or a hash key, never looked up
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Node {
    pub kind: NodeKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum NodeKind {
    Template {
        name: String,
        parent: Option<Box<Node>>,
        body: Vec<Node>,
    },

    // literals
    StringLiteral {
        value: String,
        /// print the authored bytes instead of re-escaping `value`
        verbatim: bool,
    },
    NumericLiteral {
        value: f64,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    ArrayExpression {
        elements: Vec<Node>,
    },
    ObjectExpression {
        properties: Vec<Node>,
    },
    ObjectProperty {
        key: Box<Node>,
        value: Box<Node>,
        computed: bool,
    },

    // expressions
    Identifier {
        name: String,
        binding: Binding,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
    SliceExpression {
        target: Box<Node>,
        start: Option<Box<Node>>,
        end: Option<Box<Node>>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    FilterExpression {
        target: Box<Node>,
        name: String,
        arguments: Vec<Node>,
    },
    TestExpression {
        target: Box<Node>,
        name: String,
        arguments: Vec<Node>,
        negated: bool,
    },
    BinaryExpression {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryExpression {
        operator: String,
        argument: Box<Node>,
    },
    ConditionalExpression {
        test: Box<Node>,
        /// `None` for `a ?: b`
        consequent: Option<Box<Node>>,
        /// `None` for `a ? b`
        alternate: Option<Box<Node>>,
    },

    // statements from the core extension
    ForStatement {
        key_target: Option<Box<Node>>,
        value_target: Box<Node>,
        sequence: Box<Node>,
        condition: Option<Box<Node>>,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    IfStatement {
        test: Box<Node>,
        consequent: Vec<Node>,
        /// `elseif` is a single nested IfStatement
        alternate: Vec<Node>,
    },
    SetStatement {
        assignments: Vec<Node>,
    },
    VariableDeclarator {
        id: Box<Node>,
        init: Box<Node>,
    },
    SpacelessBlock {
        body: Vec<Node>,
    },
    MountStatement {
        name: Option<String>,
        source: Box<Node>,
        key: Option<Box<Node>>,
        argument: Option<Box<Node>>,
    },
    BlockStatement {
        name: String,
        body: Vec<Node>,
    },
    ExtendsStatement {
        parent: Box<Node>,
    },
    FlushStatement,
    IncludeStatement {
        source: Box<Node>,
        argument: Option<Box<Node>>,
        only: bool,
        ignore_missing: bool,
    },
    AutoescapeBlock {
        strategy: Option<Box<Node>>,
        body: Vec<Node>,
    },
    DoStatement {
        value: Box<Node>,
    },
    MacroDeclaration {
        name: String,
        params: Vec<Node>,
        body: Vec<Node>,
    },
    ImportDeclaration {
        source: Box<Node>,
        specifiers: Vec<Node>,
    },
    ImportSpecifier {
        /// `None` imports the whole template: `import 'x' as forms`
        imported: Option<String>,
        local: String,
    },

    // output constructs, eliminated by a backend
    Element {
        name: String,
        attributes: Vec<Node>,
        children: Vec<Node>,
        self_closing: bool,
    },
    Attribute {
        name: String,
        value: Option<Box<Node>>,
    },
    Fragment {
        value: Box<Node>,
    },
    Text {
        value: String,
    },
    PrintStatement {
        value: Box<Node>,
    },

    // backend output
    ExpressionStatement {
        expression: Box<Node>,
    },
}

/// Fieldless discriminant of [`NodeKind`], used to key visitor maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum NodeType {
    Template,
    StringLiteral,
    NumericLiteral,
    BooleanLiteral,
    NullLiteral,
    ArrayExpression,
    ObjectExpression,
    ObjectProperty,
    Identifier,
    MemberExpression,
    SliceExpression,
    CallExpression,
    FilterExpression,
    TestExpression,
    BinaryExpression,
    UnaryExpression,
    ConditionalExpression,
    ForStatement,
    IfStatement,
    SetStatement,
    VariableDeclarator,
    SpacelessBlock,
    MountStatement,
    BlockStatement,
    ExtendsStatement,
    FlushStatement,
    IncludeStatement,
    AutoescapeBlock,
    DoStatement,
    MacroDeclaration,
    ImportDeclaration,
    ImportSpecifier,
    Element,
    Attribute,
    Fragment,
    Text,
    PrintStatement,
    ExpressionStatement,
}

/// node types only the parser produces, a backend must eliminate them
pub const TEMPLATE_ONLY_TYPES: &[NodeType] = &[
    NodeType::Element,
    NodeType::Attribute,
    NodeType::Fragment,
    NodeType::Text,
    NodeType::PrintStatement,
];

impl NodeType {
    pub fn is_template_only(&self) -> bool {
        TEMPLATE_ONLY_TYPES.contains(self)
    }
}

/// A mutable handle on one child position of a node.
pub enum ChildSlot<'a> {
    One(&'static str, &'a mut Box<Node>),
    Opt(&'static str, &'a mut Option<Box<Node>>),
    Many(&'static str, &'a mut Vec<Node>),
}

impl Node {
    pub fn new(kind: NodeKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    pub fn identifier<S: Into<String>>(name: S, binding: Binding, loc: SourceLocation) -> Self {
        let name = name.into();
        Self::new(NodeKind::Identifier { name, binding }, loc)
    }

    pub fn string<S: Into<String>>(value: S, loc: SourceLocation) -> Self {
        let kind = NodeKind::StringLiteral {
            value: value.into(),
            verbatim: false,
        };
        Self::new(kind, loc)
    }

    pub fn call(callee: Node, arguments: Vec<Node>, loc: SourceLocation) -> Self {
        let callee = Box::new(callee);
        Self::new(NodeKind::CallExpression { callee, arguments }, loc)
    }

    pub fn statement(expression: Node) -> Self {
        let loc = expression.loc;
        let expression = Box::new(expression);
        Self::new(NodeKind::ExpressionStatement { expression }, loc)
    }

    pub fn node_type(&self) -> NodeType {
        use NodeKind as K;
        use NodeType as T;
        match &self.kind {
            K::Template { .. } => T::Template,
            K::StringLiteral { .. } => T::StringLiteral,
            K::NumericLiteral { .. } => T::NumericLiteral,
            K::BooleanLiteral { .. } => T::BooleanLiteral,
            K::NullLiteral => T::NullLiteral,
            K::ArrayExpression { .. } => T::ArrayExpression,
            K::ObjectExpression { .. } => T::ObjectExpression,
            K::ObjectProperty { .. } => T::ObjectProperty,
            K::Identifier { .. } => T::Identifier,
            K::MemberExpression { .. } => T::MemberExpression,
            K::SliceExpression { .. } => T::SliceExpression,
            K::CallExpression { .. } => T::CallExpression,
            K::FilterExpression { .. } => T::FilterExpression,
            K::TestExpression { .. } => T::TestExpression,
            K::BinaryExpression { .. } => T::BinaryExpression,
            K::UnaryExpression { .. } => T::UnaryExpression,
            K::ConditionalExpression { .. } => T::ConditionalExpression,
            K::ForStatement { .. } => T::ForStatement,
            K::IfStatement { .. } => T::IfStatement,
            K::SetStatement { .. } => T::SetStatement,
            K::VariableDeclarator { .. } => T::VariableDeclarator,
            K::SpacelessBlock { .. } => T::SpacelessBlock,
            K::MountStatement { .. } => T::MountStatement,
            K::BlockStatement { .. } => T::BlockStatement,
            K::ExtendsStatement { .. } => T::ExtendsStatement,
            K::FlushStatement => T::FlushStatement,
            K::IncludeStatement { .. } => T::IncludeStatement,
            K::AutoescapeBlock { .. } => T::AutoescapeBlock,
            K::DoStatement { .. } => T::DoStatement,
            K::MacroDeclaration { .. } => T::MacroDeclaration,
            K::ImportDeclaration { .. } => T::ImportDeclaration,
            K::ImportSpecifier { .. } => T::ImportSpecifier,
            K::Element { .. } => T::Element,
            K::Attribute { .. } => T::Attribute,
            K::Fragment { .. } => T::Fragment,
            K::Text { .. } => T::Text,
            K::PrintStatement { .. } => T::PrintStatement,
            K::ExpressionStatement { .. } => T::ExpressionStatement,
        }
    }

    /// Child positions in source order. Traversal visits them in this order.
    pub fn children_mut(&mut self) -> Vec<ChildSlot<'_>> {
        use ChildSlot::*;
        use NodeKind as K;
        match &mut self.kind {
            K::Template { parent, body, .. } => vec![Opt("parent", parent), Many("body", body)],
            K::StringLiteral { .. }
            | K::NumericLiteral { .. }
            | K::BooleanLiteral { .. }
            | K::NullLiteral
            | K::Identifier { .. }
            | K::FlushStatement
            | K::ImportSpecifier { .. }
            | K::Text { .. } => vec![],
            K::ArrayExpression { elements } => vec![Many("elements", elements)],
            K::ObjectExpression { properties } => vec![Many("properties", properties)],
            K::ObjectProperty { key, value, .. } => vec![One("key", key), One("value", value)],
            K::MemberExpression {
                object, property, ..
            } => vec![One("object", object), One("property", property)],
            K::SliceExpression { target, start, end } => {
                vec![One("target", target), Opt("start", start), Opt("end", end)]
            }
            K::CallExpression { callee, arguments } => {
                vec![One("callee", callee), Many("arguments", arguments)]
            }
            K::FilterExpression {
                target, arguments, ..
            }
            | K::TestExpression {
                target, arguments, ..
            } => vec![One("target", target), Many("arguments", arguments)],
            K::BinaryExpression { left, right, .. } => vec![One("left", left), One("right", right)],
            K::UnaryExpression { argument, .. } => vec![One("argument", argument)],
            K::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => vec![
                One("test", test),
                Opt("consequent", consequent),
                Opt("alternate", alternate),
            ],
            K::ForStatement {
                key_target,
                value_target,
                sequence,
                condition,
                body,
                otherwise,
            } => vec![
                Opt("key_target", key_target),
                One("value_target", value_target),
                One("sequence", sequence),
                Opt("condition", condition),
                Many("body", body),
                Many("otherwise", otherwise),
            ],
            K::IfStatement {
                test,
                consequent,
                alternate,
            } => vec![
                One("test", test),
                Many("consequent", consequent),
                Many("alternate", alternate),
            ],
            K::SetStatement { assignments } => vec![Many("assignments", assignments)],
            K::VariableDeclarator { id, init } => vec![One("id", id), One("init", init)],
            K::SpacelessBlock { body } | K::BlockStatement { body, .. } => vec![Many("body", body)],
            K::MountStatement {
                source,
                key,
                argument,
                ..
            } => vec![
                One("source", source),
                Opt("key", key),
                Opt("argument", argument),
            ],
            K::ExtendsStatement { parent } => vec![One("parent", parent)],
            K::IncludeStatement {
                source, argument, ..
            } => vec![One("source", source), Opt("argument", argument)],
            K::AutoescapeBlock { strategy, body } => {
                vec![Opt("strategy", strategy), Many("body", body)]
            }
            K::DoStatement { value } => vec![One("value", value)],
            K::MacroDeclaration { params, body, .. } => {
                vec![Many("params", params), Many("body", body)]
            }
            K::ImportDeclaration { source, specifiers } => {
                vec![One("source", source), Many("specifiers", specifiers)]
            }
            K::Element {
                attributes,
                children,
                ..
            } => vec![Many("attributes", attributes), Many("children", children)],
            K::Attribute { value, .. } => vec![Opt("value", value)],
            K::Fragment { value } | K::PrintStatement { value } => vec![One("value", value)],
            K::ExpressionStatement { expression } => vec![One("expression", expression)],
        }
    }

    /// Children in the same order as [`Node::children_mut`].
    pub fn children(&self) -> Vec<&Node> {
        use NodeKind as K;
        let mut out: Vec<&Node> = vec![];
        match &self.kind {
            K::Template { parent, body, .. } => {
                out.extend(parent.as_deref());
                out.extend(body);
            }
            K::StringLiteral { .. }
            | K::NumericLiteral { .. }
            | K::BooleanLiteral { .. }
            | K::NullLiteral
            | K::Identifier { .. }
            | K::FlushStatement
            | K::ImportSpecifier { .. }
            | K::Text { .. } => {}
            K::ArrayExpression { elements: list }
            | K::ObjectExpression { properties: list }
            | K::SetStatement { assignments: list }
            | K::SpacelessBlock { body: list }
            | K::BlockStatement { body: list, .. } => out.extend(list),
            K::ObjectProperty {
                key: first,
                value: second,
                ..
            }
            | K::MemberExpression {
                object: first,
                property: second,
                ..
            }
            | K::BinaryExpression {
                left: first,
                right: second,
                ..
            }
            | K::VariableDeclarator {
                id: first,
                init: second,
            } => out.extend([&**first, &**second]),
            K::SliceExpression { target, start, end } => {
                out.push(target);
                out.extend(start.as_deref());
                out.extend(end.as_deref());
            }
            K::CallExpression {
                callee: head,
                arguments: list,
            }
            | K::FilterExpression {
                target: head,
                arguments: list,
                ..
            }
            | K::TestExpression {
                target: head,
                arguments: list,
                ..
            }
            | K::ImportDeclaration {
                source: head,
                specifiers: list,
            } => {
                out.push(head);
                out.extend(list);
            }
            K::UnaryExpression { argument: only, .. }
            | K::ExtendsStatement { parent: only }
            | K::DoStatement { value: only }
            | K::Fragment { value: only }
            | K::PrintStatement { value: only }
            | K::ExpressionStatement { expression: only } => out.push(only),
            K::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                out.push(test);
                out.extend(consequent.as_deref());
                out.extend(alternate.as_deref());
            }
            K::ForStatement {
                key_target,
                value_target,
                sequence,
                condition,
                body,
                otherwise,
            } => {
                out.extend(key_target.as_deref());
                out.extend([&**value_target, &**sequence]);
                out.extend(condition.as_deref());
                out.extend(body);
                out.extend(otherwise);
            }
            K::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                out.push(test);
                out.extend(consequent);
                out.extend(alternate);
            }
            K::MountStatement {
                source,
                key,
                argument,
                ..
            } => {
                out.push(source);
                out.extend(key.as_deref());
                out.extend(argument.as_deref());
            }
            K::IncludeStatement {
                source, argument, ..
            } => {
                out.push(source);
                out.extend(argument.as_deref());
            }
            K::AutoescapeBlock { strategy, body } => {
                out.extend(strategy.as_deref());
                out.extend(body);
            }
            K::MacroDeclaration { params, body, .. } => {
                out.extend(params);
                out.extend(body);
            }
            K::Element {
                attributes,
                children,
                ..
            } => {
                out.extend(attributes);
                out.extend(children);
            }
            K::Attribute { value, .. } => out.extend(value.as_deref()),
        }
        out
    }

    /// pre-order walk without mutation
    pub fn for_each<F>(&self, f: &mut F)
    where
        F: FnMut(&Node),
    {
        f(self);
        for child in self.children() {
            child.for_each(f);
        }
    }
}

/// Authored text of a node, delimiters included.
pub fn get_node_source<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.loc.start.offset..node.loc.end.offset]
}
