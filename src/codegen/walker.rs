//! The node walker: compiles each template node into statements.
//!
//! Which lookup mode a variable reference gets depends on where it
//! appears:
//!
//! | reference                         | mode                          |
//! |-----------------------------------|-------------------------------|
//! | `{{ x }}`, `{{ x|f }}`            | lenient                       |
//! | `{{ x|default:"lit" }}`           | lenient, `"lit"` as fallback  |
//! | `{% if x %}`, `{% for i in x %}`  | lenient                       |
//! | `{{ y|f:x }}` (filter argument)   | strict                        |
//!
//! The `default` filter still runs after a fallback lookup, so a present
//! but falsy value renders the same way it does in the interpreter.

use crate::ast::span::Spanned;
use crate::ast::template::{
    Condition, FilterCall, FilterExpression, ForBlock, IfBlock, Node, NodeKind, Operand, Template,
};
use crate::error::CompileError;
use crate::program::Program;
use crate::registry::Registry;

use super::CompilerState;
use super::instr::{Branch, Expr, ExprKind, Fragment, Stmt, StmtKind};
use super::lower::lower_to_statement;
use super::position::attach;
use super::resolve::{Resolution, resolve};

/// Options controlling compilation and the loader built on it.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Let the loader render a template with the interpreter when it
    /// contains a construct the compiler cannot lower. Default `true`.
    pub fallback_to_interpreter: bool,
    /// Pass a literal `default` argument as the lookup fallback of the
    /// variable it guards. Default `true`.
    pub default_as_fallback: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fallback_to_interpreter: true,
            default_as_fallback: true,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback_to_interpreter(mut self, enabled: bool) -> Self {
        self.fallback_to_interpreter = enabled;
        self
    }

    pub fn default_as_fallback(mut self, enabled: bool) -> Self {
        self.default_as_fallback = enabled;
        self
    }
}

/// Compile `template` into a program.
///
/// Fails on the first node that cannot be lowered: an unknown filter, a
/// filter called with the wrong number of arguments, or a construct with
/// no lowering rule.
pub fn compile(
    template: &Template,
    registry: &Registry,
    options: &CompileOptions,
) -> Result<Program, CompileError> {
    Compiler::new(registry, options.clone()).compile(template)
}

/// One compilation. Owns the instance-value table and filter table until
/// they are frozen into the resulting [`Program`].
#[derive(Debug)]
pub struct Compiler<'r> {
    registry: &'r Registry,
    options: CompileOptions,
    state: CompilerState,
    name: Option<String>,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry, options: CompileOptions) -> Self {
        Self {
            registry,
            options,
            state: CompilerState::new(),
            name: None,
        }
    }

    /// Name the template being compiled, for logging and diagnostics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn compile(mut self, template: &Template) -> Result<Program, CompileError> {
        let label = self.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
        log::debug!("compiling template {label} ({} top-level nodes)", template.nodes.len());

        let body = self.compile_nodes(&template.nodes).inspect_err(|e| {
            log::debug!("template {label} not compiled: {e}");
        })?;

        let (descriptors, filters) = self.state.finish();
        log::debug!(
            "compiled template {label}: {} statements, {} descriptors, {} filters",
            body.len(),
            descriptors.len(),
            filters.len()
        );
        Ok(Program::new(self.name, body, descriptors, filters))
    }

    fn compile_nodes(&mut self, nodes: &[Node]) -> Result<Vec<Stmt>, CompileError> {
        let mut body = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(fragment) = self.compile_node(node)? {
                body.push(lower_to_statement(fragment));
            }
        }
        Ok(body)
    }

    fn compile_node(&mut self, node: &Node) -> Result<Option<Fragment>, CompileError> {
        let fragment: Fragment = match &node.node {
            NodeKind::Text(text) => attach(Stmt::new(StmtKind::Text(text.clone())), node).into(),
            NodeKind::Comment => return Ok(None),
            NodeKind::Variable(expr) => self.compile_output(expr)?.into(),
            NodeKind::If(block) => self.compile_if(block, node)?.into(),
            NodeKind::For(block) => self.compile_for(block, node)?.into(),
            NodeKind::FilterBlock(_) => {
                return Err(CompileError::Unsupported {
                    construct: "filter block",
                    pos: node.pos.unwrap_or_default(),
                });
            }
        };
        Ok(Some(fragment))
    }

    /// `{{ ... }}`: a value, lowered to an emit by the caller.
    fn compile_output(&mut self, expr: &FilterExpression) -> Result<Expr, CompileError> {
        let resolution = if self.options.default_as_fallback {
            default_fallback(expr)
        } else {
            Resolution::lenient()
        };
        self.compile_filter_expression(expr, resolution)
    }

    fn compile_filter_expression(
        &mut self,
        expr: &FilterExpression,
        resolution: Resolution,
    ) -> Result<Expr, CompileError> {
        let mut value = self.compile_operand(&expr.base, resolution);
        for call in &expr.filters {
            value = self.compile_filter_call(call, value)?;
        }
        Ok(value)
    }

    fn compile_operand(&mut self, operand: &Spanned<Operand>, resolution: Resolution) -> Expr {
        match &operand.node {
            Operand::Literal(value) => attach(Expr::literal(value.clone()), operand),
            Operand::Variable(path) => attach(resolve(path, &mut self.state, resolution), operand),
        }
    }

    fn compile_filter_call(
        &mut self,
        call: &Spanned<FilterCall>,
        input: Expr,
    ) -> Result<Expr, CompileError> {
        let FilterCall { name, arg } = &call.node;
        let pos = call.pos.unwrap_or_default();

        let filter = self
            .registry
            .get(name)
            .ok_or_else(|| CompileError::UnknownFilter {
                name: name.clone(),
                pos,
            })?;
        filter
            .signature()
            .arg
            .check(arg.is_some())
            .map_err(|problem| CompileError::FilterArity {
                name: name.clone(),
                problem,
                pos,
            })?;
        let filter = self.state.intern_filter(name, filter);

        // Filter arguments must exist.
        let arg = arg
            .as_ref()
            .map(|arg| Box::new(self.compile_operand(arg, Resolution::Strict)));

        Ok(attach(
            Expr::new(ExprKind::Filter {
                filter,
                input: Box::new(input),
                arg,
            }),
            call,
        ))
    }

    fn compile_condition(&mut self, condition: &Condition) -> Result<Expr, CompileError> {
        let test = self.compile_filter_expression(&condition.expr, Resolution::lenient())?;
        if !condition.negated {
            return Ok(test);
        }
        let pos = test.pos();
        Ok(attach(Expr::new(ExprKind::Not(Box::new(test))), &pos))
    }

    fn compile_if(&mut self, block: &IfBlock, node: &Node) -> Result<Stmt, CompileError> {
        let mut branches = Vec::with_capacity(1 + block.elif_branches.len());
        branches.push(Branch {
            test: self.compile_condition(&block.condition)?,
            body: self.compile_nodes(&block.body.nodes)?,
        });
        for elif in &block.elif_branches {
            branches.push(Branch {
                test: self.compile_condition(&elif.condition)?,
                body: self.compile_nodes(&elif.body.nodes)?,
            });
        }
        let orelse = match &block.else_body {
            Some(body) => self.compile_nodes(&body.nodes)?,
            None => Vec::new(),
        };
        Ok(attach(Stmt::new(StmtKind::If { branches, orelse }), node))
    }

    fn compile_for(&mut self, block: &ForBlock, node: &Node) -> Result<Stmt, CompileError> {
        let iterable = self.compile_filter_expression(&block.iterable, Resolution::lenient())?;
        let body = self.compile_nodes(&block.body.nodes)?;
        let empty = match &block.empty {
            Some(empty) => self.compile_nodes(&empty.nodes)?,
            None => Vec::new(),
        };
        Ok(attach(
            Stmt::new(StmtKind::For {
                binding: block.binding.clone(),
                iterable,
                body,
                empty,
            }),
            node,
        ))
    }
}

/// `x|default:"lit"|...` looks `x` up with `"lit"` as its fallback.
/// Anything else is a plain lenient lookup.
fn default_fallback(expr: &FilterExpression) -> Resolution {
    if let Some(call) = expr.filters.first()
        && call.node.name == "default"
        && let Some(arg) = &call.node.arg
        && let Operand::Literal(value) = &arg.node
    {
        return Resolution::lenient_with(attach(Expr::literal(value.clone()), arg));
    }
    Resolution::lenient()
}
