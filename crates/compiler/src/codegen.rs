//! Print a finalized template as an ES module.
//!
//! The module is assembled from sections generated independently:
//! runtime imports, hoisted imports, macros, blocks and the default
//! `render(_context, _blocks)` export. Every name list is sorted or kept in
//! source order, so the same tree always prints the same code.

mod code_writer;

use super::{
    ast::{Binding, Node, NodeKind},
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    util::{is_simple_identifier, js_string},
    Position,
};
use code_writer::CodeWriter;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Range,
};
use tracing::debug;

pub trait CodeGenerator {
    type IR;
    type Output;
    /// generate will take a finalized tree and output
    /// the desired code format
    fn generate(&mut self, node: Self::IR) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct GenerateOption {
    /// module every runtime helper is imported from
    pub runtime_module: String,
    pub source_map: bool,
}

impl Default for GenerateOption {
    fn default() -> Self {
        Self {
            runtime_module: "twig-runtime".into(),
            source_map: false,
        }
    }
}

/// One generated statement and the template position it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Mapping {
    /// 1-based
    pub generated_line: usize,
    /// 1-based, in chars
    pub generated_column: usize,
    pub original: Position,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Generated {
    pub code: String,
    pub map: Option<Vec<Mapping>>,
}

pub fn to_string(ast: &Node, source: &str) -> CompileResult<Generated> {
    to_string_with(ast, source, &GenerateOption::default())
}

pub fn to_string_with(
    ast: &Node,
    source: &str,
    option: &GenerateOption,
) -> CompileResult<Generated> {
    JsGenerator::new(source, option).generate(ast)
}

fn missing_printer(node: &Node) -> CompilationError {
    CompilationError::new(ErrorKind::MissingPrinter)
        .with_additional_message(format!(" `{:?}`.", node.node_type()))
        .with_location(node.loc)
}

fn unknown_operator(node: &Node, operator: &str) -> CompilationError {
    CompilationError::new(ErrorKind::MissingPrinter)
        .with_additional_message(format!(" operator `{}`.", operator))
        .with_location(node.loc)
}

pub struct JsGenerator<'a> {
    source: &'a str,
    option: &'a GenerateOption,
    /// runtime helpers and Runtime bound identifiers
    runtime: BTreeSet<&'a str>,
    imports: Vec<CodeWriter>,
    macros: Vec<CodeWriter>,
    /// block name to its hoisted function
    blocks: BTreeMap<&'a str, CodeWriter>,
    mount_count: usize,
    loop_count: usize,
}

impl<'a> CodeGenerator for JsGenerator<'a> {
    type IR = &'a Node;
    type Output = CompileResult<Generated>;
    fn generate(&mut self, root: &'a Node) -> CompileResult<Generated> {
        let (name, parent, body) = match &root.kind {
            NodeKind::Template { name, parent, body } => (name, parent, body),
            _ => return Err(missing_printer(root)),
        };
        let mut render = self.writer();
        render.open_block("export default function render(_context, _blocks = {})");
        match parent {
            Some(parent) => self.gen_child_render(&mut render, parent, body)?,
            None => self.gen_statements(&mut render, body)?,
        }
        render.close_block();
        debug!(template = %name, blocks = self.blocks.len(), "generated");
        Ok(self.assemble(render))
    }
}

impl<'a> JsGenerator<'a> {
    pub fn new(source: &'a str, option: &'a GenerateOption) -> Self {
        Self {
            source,
            option,
            runtime: BTreeSet::new(),
            imports: vec![],
            macros: vec![],
            blocks: BTreeMap::new(),
            mount_count: 0,
            loop_count: 0,
        }
    }

    fn writer(&self) -> CodeWriter {
        CodeWriter::new(self.option.source_map)
    }

    fn helper(&mut self, name: &'static str) -> &'static str {
        self.runtime.insert(name);
        name
    }

    fn assemble(&mut self, render: CodeWriter) -> Generated {
        let mut out = self.writer();
        if !self.runtime.is_empty() {
            let names: Vec<_> = self.runtime.iter().copied().collect();
            out.write_str(&format!("import {{ {} }} from ", names.join(", ")));
            out.write_str(&js_string(&self.option.runtime_module));
            out.write_str(";");
            out.end_line();
        }
        for import in self.imports.drain(..) {
            out.append(import);
        }
        let sections = self
            .macros
            .drain(..)
            .chain(std::mem::take(&mut self.blocks).into_values())
            .chain(Some(render));
        for section in sections {
            if !out.is_empty() {
                out.end_line();
            }
            out.append(section);
        }
        let (code, map) = out.finish();
        Generated { code, map }
    }

    /// A child template only declares blocks for its parent to render.
    fn gen_child_render(
        &mut self,
        w: &mut CodeWriter,
        parent: &'a Node,
        body: &'a [Node],
    ) -> CompileResult<()> {
        let mut import = self.writer();
        import.mark(&parent.loc);
        import.write_str("import _parent from ");
        self.gen_expr(&mut import, parent)?;
        import.write_str(";");
        import.end_line();
        self.imports.push(import);
        // everything outside of blocks is dropped
        let mut discarded = self.writer();
        for node in body {
            if matches!(
                node.kind,
                NodeKind::BlockStatement { .. }
                    | NodeKind::MacroDeclaration { .. }
                    | NodeKind::ImportDeclaration { .. }
            ) {
                self.gen_statement(&mut discarded, node)?;
            }
        }
        let blocks: Vec<_> = self
            .blocks
            .keys()
            .map(|name| format!("{}: block_{}", name, name))
            .collect();
        w.start_line();
        w.write_str(&format!(
            "_parent(_context, Object.assign({{ {} }}, _blocks));",
            blocks.join(", ")
        ));
        w.end_line();
        Ok(())
    }

    fn gen_statements(&mut self, w: &mut CodeWriter, nodes: &'a [Node]) -> CompileResult<()> {
        for node in nodes {
            self.gen_statement(w, node)?;
        }
        Ok(())
    }

    fn gen_statement(&mut self, w: &mut CodeWriter, node: &'a Node) -> CompileResult<()> {
        use NodeKind as K;
        match &node.kind {
            K::ExpressionStatement { expression } | K::DoStatement { value: expression } => {
                w.start_line();
                w.mark(&node.loc);
                self.gen_expr(w, expression)?;
                w.write_str(";");
                w.end_line();
            }
            K::ForStatement { .. } => self.gen_for(w, node)?,
            K::IfStatement { .. } => {
                w.start_line();
                w.mark(&node.loc);
                self.gen_if(w, node)?;
            }
            K::SetStatement { assignments } => self.gen_set(w, node, assignments)?,
            K::IncludeStatement {
                source,
                argument,
                only,
                ignore_missing,
            } => {
                w.start_line();
                w.mark(&node.loc);
                w.write_str(self.helper("_include"));
                w.write_str("(_context, ");
                self.gen_expr(w, source)?;
                w.write_str(", ");
                self.gen_opt_expr(w, argument.as_deref())?;
                w.write_str(&format!(", {}, {});", only, ignore_missing));
                w.end_line();
            }
            K::MountStatement {
                name,
                source,
                key,
                argument,
            } => {
                let local = match name {
                    Some(name) => name.clone(),
                    None => {
                        self.mount_count += 1;
                        format!("_template_{}", self.mount_count - 1)
                    }
                };
                let mut import = self.writer();
                import.mark(&node.loc);
                import.write_str(&format!("import {} from ", local));
                self.gen_expr(&mut import, source)?;
                import.write_str(";");
                import.end_line();
                self.imports.push(import);
                w.start_line();
                w.mark(&node.loc);
                w.write_str(self.helper("_mount"));
                w.write_str(&format!("({}, ", local));
                self.gen_opt_expr(w, key.as_deref())?;
                w.write_str(", ");
                self.gen_opt_expr(w, argument.as_deref())?;
                w.write_str(");");
                w.end_line();
            }
            K::BlockStatement { name, body } => {
                let mut function = self.writer();
                function.mark(&node.loc);
                function.open_block(&format!("function block_{}(_context, _blocks)", name));
                self.gen_statements(&mut function, body)?;
                function.close_block();
                self.blocks.insert(name, function);
                w.start_line();
                w.mark(&node.loc);
                w.write_str(&format!(
                    "(_blocks.{0} || block_{0})(_context, _blocks);",
                    name
                ));
                w.end_line();
            }
            K::MacroDeclaration { name, params, body } => {
                let mut function = self.writer();
                function.mark(&node.loc);
                function.write_str(&format!("export function {}(", name));
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        function.write_str(", ");
                    }
                    match &param.kind {
                        K::VariableDeclarator { id, init } => {
                            self.gen_expr(&mut function, id)?;
                            function.write_str(" = ");
                            self.gen_expr(&mut function, init)?;
                        }
                        _ => self.gen_expr(&mut function, param)?,
                    }
                }
                function.write_str(") {");
                function.end_line();
                function.indent();
                function.start_line();
                function.write_str("const _context = {};");
                function.end_line();
                self.gen_statements(&mut function, body)?;
                function.close_block();
                self.macros.push(function);
            }
            K::ImportDeclaration { source, specifiers } => {
                let mut import = self.writer();
                import.mark(&node.loc);
                import.write_str("import ");
                let mut named = vec![];
                for specifier in specifiers {
                    match &specifier.kind {
                        K::ImportSpecifier {
                            imported: None,
                            local,
                        } => import.write_str(&format!("* as {}", local)),
                        K::ImportSpecifier {
                            imported: Some(imported),
                            local,
                        } if imported == local => named.push(local.clone()),
                        K::ImportSpecifier {
                            imported: Some(imported),
                            local,
                        } => named.push(format!("{} as {}", imported, local)),
                        _ => return Err(missing_printer(specifier)),
                    }
                }
                if !named.is_empty() {
                    import.write_str(&format!("{{ {} }}", named.join(", ")));
                }
                import.write_str(" from ");
                self.gen_expr(&mut import, source)?;
                import.write_str(";");
                import.end_line();
                self.imports.push(import);
            }
            // escaping is up to the runtime helpers of the backend
            K::AutoescapeBlock { body, .. } => self.gen_statements(w, body)?,
            _ => return Err(missing_printer(node)),
        }
        Ok(())
    }

    fn gen_for(&mut self, w: &mut CodeWriter, node: &'a Node) -> CompileResult<()> {
        let (key_target, value_target, sequence, condition, body, otherwise) = match &node.kind {
            NodeKind::ForStatement {
                key_target,
                value_target,
                sequence,
                condition,
                body,
                otherwise,
            } => (key_target, value_target, sequence, condition, body, otherwise),
            _ => return Err(missing_printer(node)),
        };
        let flag = if otherwise.is_empty() {
            None
        } else {
            self.loop_count += 1;
            Some(format!("_iterated{}", self.loop_count - 1))
        };
        if let Some(flag) = &flag {
            w.start_line();
            w.write_str(&format!("let {} = false;", flag));
            w.end_line();
        }
        w.start_line();
        w.mark(&node.loc);
        // targets stay assignable by `set`
        w.write_str("for (let [");
        if let Some(key) = key_target {
            self.gen_expr(w, key)?;
        }
        w.write_str(", ");
        self.gen_expr(w, value_target)?;
        w.write_str(", loop] of ");
        w.write_str(self.helper("_entries"));
        w.write_str("(");
        self.gen_expr(w, sequence)?;
        w.write_str(")) {");
        w.end_line();
        w.indent();
        if let Some(condition) = condition {
            w.start_line();
            w.write_str("if (!");
            self.gen_expr(w, condition)?;
            w.write_str(") continue;");
            w.end_line();
        }
        if let Some(flag) = &flag {
            w.start_line();
            w.write_str(&format!("{} = true;", flag));
            w.end_line();
        }
        self.gen_statements(w, body)?;
        w.close_block();
        if let Some(flag) = &flag {
            w.open_block(&format!("if (!{})", flag));
            self.gen_statements(w, otherwise)?;
            w.close_block();
        }
        Ok(())
    }

    /// `if (...) {` continuing the current line, `elseif` chains stay flat
    fn gen_if(&mut self, w: &mut CodeWriter, node: &'a Node) -> CompileResult<()> {
        let (test, consequent, alternate) = match &node.kind {
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => (test, consequent, alternate),
            _ => return Err(missing_printer(node)),
        };
        w.write_str("if (");
        self.gen_expr(w, test)?;
        w.write_str(") {");
        w.end_line();
        w.indent();
        self.gen_statements(w, consequent)?;
        w.dedent();
        w.start_line();
        match alternate.as_slice() {
            [] => w.write_str("}"),
            [nested] if matches!(nested.kind, NodeKind::IfStatement { .. }) => {
                w.write_str("} else ");
                return self.gen_if(w, nested);
            }
            _ => {
                w.write_str("} else {");
                w.end_line();
                w.indent();
                self.gen_statements(w, alternate)?;
                w.dedent();
                w.start_line();
                w.write_str("}");
            }
        }
        w.end_line();
        Ok(())
    }

    /// several targets are assigned at once, so `set a, b = b, a` swaps
    fn gen_set(
        &mut self,
        w: &mut CodeWriter,
        node: &'a Node,
        assignments: &'a [Node],
    ) -> CompileResult<()> {
        let mut ids = vec![];
        let mut inits = vec![];
        for assignment in assignments {
            match &assignment.kind {
                NodeKind::VariableDeclarator { id, init } => {
                    ids.push(&**id);
                    inits.push(&**init);
                }
                _ => return Err(missing_printer(assignment)),
            }
        }
        w.start_line();
        w.mark(&node.loc);
        if let ([id], [init]) = (ids.as_slice(), inits.as_slice()) {
            self.gen_expr(w, *id)?;
            w.write_str(" = ");
            self.gen_expr(w, *init)?;
        } else {
            w.write_str("[");
            self.gen_list(w, ids)?;
            w.write_str("] = [");
            self.gen_list(w, inits)?;
            w.write_str("]");
        }
        w.write_str(";");
        w.end_line();
        Ok(())
    }

    fn gen_opt_expr(&mut self, w: &mut CodeWriter, node: Option<&'a Node>) -> CompileResult<()> {
        match node {
            Some(node) => self.gen_expr(w, node),
            None => {
                w.write_str("null");
                Ok(())
            }
        }
    }

    /// generate a comma separated list
    fn gen_list<I>(&mut self, w: &mut CodeWriter, nodes: I) -> CompileResult<()>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        for (i, node) in nodes.into_iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.gen_expr(w, node)?;
        }
        Ok(())
    }

    /// `target, arg1, arg2` of a filter or test call
    fn gen_call_args(
        &mut self,
        w: &mut CodeWriter,
        target: &'a Node,
        arguments: &'a [Node],
    ) -> CompileResult<()> {
        w.write_str("(");
        self.gen_list(w, Some(target).into_iter().chain(arguments))?;
        w.write_str(")");
        Ok(())
    }

    fn gen_expr(&mut self, w: &mut CodeWriter, node: &'a Node) -> CompileResult<()> {
        use NodeKind as K;
        match &node.kind {
            K::StringLiteral { verbatim: true, .. } => {
                let range: Range<usize> = node.loc.into();
                let text = self.source.get(range).ok_or_else(|| {
                    CompilationError::new(ErrorKind::SourceMismatch).with_location(node.loc)
                })?;
                w.write_str(text)
            }
            K::StringLiteral { value, .. } => w.write_str(&js_string(value)),
            K::NumericLiteral { value } => w.write_str(&format_number(*value)),
            K::BooleanLiteral { value } => w.write_str(if *value { "true" } else { "false" }),
            K::NullLiteral => w.write_str("null"),
            K::ArrayExpression { elements } => {
                w.write_str("[");
                self.gen_list(w, elements)?;
                w.write_str("]");
            }
            K::ObjectExpression { properties } => self.gen_object(w, properties)?,
            K::Identifier { name, binding } => match binding {
                Binding::Runtime => {
                    self.runtime.insert(name);
                    w.write_str(name);
                }
                Binding::Local | Binding::Property => w.write_str(name),
                Binding::Context | Binding::Unresolved => {
                    w.write_str("_context");
                    write_property(w, name);
                }
            },
            K::MemberExpression {
                object,
                property,
                computed,
            } => {
                self.gen_expr(w, object)?;
                match (&property.kind, computed) {
                    (K::Identifier { name, .. }, false) => write_property(w, name),
                    _ => {
                        w.write_str("[");
                        self.gen_expr(w, property)?;
                        w.write_str("]");
                    }
                }
            }
            K::CallExpression { callee, arguments } => {
                self.gen_expr(w, callee)?;
                w.write_str("(");
                self.gen_list(w, arguments)?;
                w.write_str(")");
            }
            K::FilterExpression {
                target,
                name,
                arguments,
            } => {
                w.write_str(self.helper("_filters"));
                write_property(w, name);
                self.gen_call_args(w, target, arguments)?;
            }
            K::TestExpression {
                target,
                name,
                arguments,
                negated,
            } => {
                if *negated {
                    w.write_str("!");
                }
                w.write_str(self.helper("_tests"));
                write_property(w, name);
                self.gen_call_args(w, target, arguments)?;
            }
            K::BinaryExpression {
                operator,
                left,
                right,
            } => self.gen_binary(w, node, operator, left, right)?,
            K::UnaryExpression { operator, argument } => {
                let op = match operator.as_str() {
                    "not" => "!",
                    "-" => "-",
                    "+" => "+",
                    other => return Err(unknown_operator(node, other)),
                };
                w.write_str("(");
                w.write_str(op);
                self.gen_expr(w, argument)?;
                w.write_str(")");
            }
            K::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                w.write_str("(");
                self.gen_expr(w, test)?;
                match consequent {
                    Some(consequent) => {
                        w.write_str(" ? ");
                        self.gen_expr(w, consequent)?;
                        w.write_str(" : ");
                        match alternate {
                            Some(alternate) => self.gen_expr(w, alternate)?,
                            None => w.write_str("\"\""),
                        }
                    }
                    None => {
                        w.write_str(" || ");
                        self.gen_opt_expr(w, alternate.as_deref())?;
                    }
                }
                w.write_str(")");
            }
            _ => return Err(missing_printer(node)),
        }
        Ok(())
    }

    fn gen_object(&mut self, w: &mut CodeWriter, properties: &'a [Node]) -> CompileResult<()> {
        if properties.is_empty() {
            w.write_str("{}");
            return Ok(());
        }
        w.write_str("{ ");
        for (i, property) in properties.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            let (key, value, computed) = match &property.kind {
                NodeKind::ObjectProperty {
                    key,
                    value,
                    computed,
                } => (key, value, *computed),
                _ => return Err(missing_printer(property)),
            };
            match &key.kind {
                _ if computed => {
                    w.write_str("[");
                    self.gen_expr(w, key)?;
                    w.write_str("]");
                }
                NodeKind::Identifier { name, .. } if is_simple_identifier(name) => {
                    w.write_str(name)
                }
                NodeKind::Identifier { name, .. } => w.write_str(&js_string(name)),
                _ => self.gen_expr(w, key)?,
            }
            w.write_str(": ");
            self.gen_expr(w, value)?;
        }
        w.write_str(" }");
        Ok(())
    }

    fn gen_binary(
        &mut self,
        w: &mut CodeWriter,
        node: &'a Node,
        operator: &str,
        left: &'a Node,
        right: &'a Node,
    ) -> CompileResult<()> {
        // operators printed as a function call of both operands
        let call = match operator {
            "in" => Some(("", "_contains", true)),
            "not in" => Some(("!", "_contains", true)),
            "matches" => Some(("", "_matches", false)),
            ".." => Some(("", "_range", false)),
            "~" => Some(("", "_concat", false)),
            _ => None,
        };
        if let Some((prefix, helper, swapped)) = call {
            w.write_str(prefix);
            w.write_str(self.helper(helper));
            w.write_str("(");
            let (first, second) = if swapped { (right, left) } else { (left, right) };
            self.gen_expr(w, first)?;
            w.write_str(", ");
            self.gen_expr(w, second)?;
            w.write_str(")");
            return Ok(());
        }
        let method = match operator {
            "starts with" => Some("startsWith"),
            "ends with" => Some("endsWith"),
            _ => None,
        };
        if let Some(method) = method {
            w.write_str("String(");
            self.gen_expr(w, left)?;
            w.write_str(&format!(").{}(", method));
            self.gen_expr(w, right)?;
            w.write_str(")");
            return Ok(());
        }
        if operator == "//" {
            w.write_str("Math.floor(");
            self.gen_expr(w, left)?;
            w.write_str(" / ");
            self.gen_expr(w, right)?;
            w.write_str(")");
            return Ok(());
        }
        let op = match operator {
            "or" => "||",
            "and" => "&&",
            "b-or" => "|",
            "b-xor" => "^",
            "b-and" => "&",
            "==" | "!=" | "<" | ">" | ">=" | "<=" | "+" | "-" | "*" | "/" | "%" | "**" | "??" => {
                operator
            }
            other => return Err(unknown_operator(node, other)),
        };
        w.write_str("(");
        self.gen_expr(w, left)?;
        w.write_str(&format!(" {} ", op));
        self.gen_expr(w, right)?;
        w.write_str(")");
        Ok(())
    }
}

/// `.name`, or `["name"]` when it is not a valid JS identifier
fn write_property(w: &mut CodeWriter, name: &str) {
    if is_simple_identifier(name) {
        w.write_str(".");
        w.write_str(name);
    } else {
        w.write_str("[");
        w.write_str(&js_string(name));
        w.write_str("]");
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
