//! Tree-walking interpreter.
//!
//! Renders a parsed [`Template`] directly, without compiling it. The
//! loader uses it for templates the compiler cannot lower, and tests use
//! it as the reference a compiled program's output is checked against.
//!
//! It calls the same runtime entry points as compiled code and assigns
//! error positions by the same rule, so for any template both accept the
//! two renderers agree on output and on errors.

use crate::ast::span::{SourcePos, Spanned};
use crate::ast::template::*;
use crate::ast::value::Value;
use crate::error::RenderError;
use crate::registry::Registry;
use crate::runtime::{Context, Execution, RenderOptions, Variable, bind_loop_item, iterate};

/// Render `template` against `ctx` with default options.
///
/// ```rust
/// use tapestry::{Context, Registry, interp, parse};
///
/// let template = parse("Hi {{ name|default:\"stranger\" }}!").unwrap();
/// let out = interp::render(&template, &mut Context::new(), &Registry::default()).unwrap();
/// assert_eq!(out, "Hi stranger!");
/// ```
pub fn render(template: &Template, ctx: &mut Context, registry: &Registry) -> Result<String, RenderError> {
    render_with_options(template, ctx, registry, RenderOptions::default())
}

pub fn render_with_options(
    template: &Template,
    ctx: &mut Context,
    registry: &Registry,
    options: RenderOptions,
) -> Result<String, RenderError> {
    let mut exec = Execution::new(options);
    execute(template, &mut exec, ctx, registry)?;
    Ok(exec.into_output())
}

/// Render into an existing execution, appending to its output.
pub fn execute(
    template: &Template,
    exec: &mut Execution,
    ctx: &mut Context,
    registry: &Registry,
) -> Result<(), RenderError> {
    Interpreter { registry }.render_nodes(&template.nodes, exec, ctx)
}

struct Interpreter<'r> {
    registry: &'r Registry,
}

impl Interpreter<'_> {
    fn render_nodes(
        &self,
        nodes: &[Node],
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        for node in nodes {
            if matches!(node.node, NodeKind::Comment) {
                continue;
            }
            self.render_node(node, exec, ctx)
                .map_err(|e| e.or_pos(node_pos(node)))?;
        }
        Ok(())
    }

    fn render_node(
        &self,
        node: &Node,
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        exec.check_limits()?;

        match &node.node {
            NodeKind::Text(text) => exec.emit_text(text),
            NodeKind::Comment => {}
            NodeKind::Variable(expr) => {
                let value = self.eval_filter_expression(expr, exec, ctx)?;
                exec.emit(value);
            }
            NodeKind::If(block) => self.render_if(block, exec, ctx)?,
            NodeKind::For(block) => self.render_for(block, exec, ctx)?,
            NodeKind::FilterBlock(block) => self.render_filter_block(block, exec, ctx)?,
        }
        Ok(())
    }

    // ── Expression evaluation ───────────────────────────────────────────

    /// Evaluate `base|f1:a1|f2...`. The base is looked up leniently; each
    /// filter argument strictly, right before its filter runs.
    fn eval_filter_expression(
        &self,
        expr: &FilterExpression,
        exec: &Execution,
        ctx: &Context,
    ) -> Result<Value, RenderError> {
        let mut value = match &expr.base.node {
            Operand::Literal(value) => value.clone(),
            Operand::Variable(path) => exec
                .try_resolve(&Variable::new(path.clone()), ctx, None)
                .map_err(|e| e.or_pos(pos_of(&expr.base)))?,
        };
        for call in &expr.filters {
            value = self.apply_filter(call, value, ctx)?;
        }
        Ok(value)
    }

    fn apply_filter(
        &self,
        call: &Spanned<FilterCall>,
        value: Value,
        ctx: &Context,
    ) -> Result<Value, RenderError> {
        let arg = match &call.node.arg {
            None => None,
            Some(arg) => Some(self.eval_strict(arg, ctx)?),
        };
        self.registry
            .apply(&call.node.name, value, arg)
            .map_err(|e| e.or_pos(pos_of(call)))
    }

    fn eval_strict(&self, operand: &Spanned<Operand>, ctx: &Context) -> Result<Value, RenderError> {
        match &operand.node {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Variable(path) => Variable::new(path.clone())
                .resolve(ctx)
                .map_err(|e| e.or_pos(pos_of(operand))),
        }
    }

    fn eval_condition(
        &self,
        condition: &Condition,
        exec: &Execution,
        ctx: &Context,
    ) -> Result<bool, RenderError> {
        let truthy = self.eval_filter_expression(&condition.expr, exec, ctx)?.is_truthy();
        Ok(truthy != condition.negated)
    }

    // ── Control flow ────────────────────────────────────────────────────

    fn render_if(
        &self,
        block: &IfBlock,
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        if self.eval_condition(&block.condition, exec, ctx)? {
            return self.render_nodes(&block.body.nodes, exec, ctx);
        }

        for elif in &block.elif_branches {
            if self.eval_condition(&elif.condition, exec, ctx)? {
                return self.render_nodes(&elif.body.nodes, exec, ctx);
            }
        }

        if let Some(else_body) = &block.else_body {
            return self.render_nodes(&else_body.nodes, exec, ctx);
        }

        Ok(())
    }

    fn render_for(
        &self,
        block: &ForBlock,
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        let iterable = self.eval_filter_expression(&block.iterable, exec, ctx)?;
        let items = iterate(iterable)
            .map_err(|e| e.or_pos(block.iterable.outer_pos().unwrap_or_default()))?;

        if items.is_empty() {
            if let Some(empty) = &block.empty {
                self.render_nodes(&empty.nodes, exec, ctx)?;
            }
            return Ok(());
        }

        ctx.push_frame();
        let result = self.render_loop(block, items, exec, ctx);
        ctx.pop_frame();
        result
    }

    fn render_loop(
        &self,
        block: &ForBlock,
        items: Vec<Value>,
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        let len = items.len();
        for (index, item) in items.into_iter().enumerate() {
            exec.check_iteration_limit()?;
            bind_loop_item(ctx, &block.binding, item, index, len);
            self.render_nodes(&block.body.nodes, exec, ctx)?;
        }
        Ok(())
    }

    /// `{% filter name %}body{% endfilter %}`: the body is rendered into a
    /// capture buffer and the filter's result is emitted as is. The body
    /// was already escaped while rendering.
    fn render_filter_block(
        &self,
        block: &FilterBlock,
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        let saved = exec.begin_capture();
        let rendered = self.render_nodes(&block.body.nodes, exec, ctx);
        let captured = exec.end_capture(saved);
        rendered?;

        let value = self.apply_filter(&block.filter, Value::String(captured), ctx)?;
        exec.emit_text(&value.to_output_string());
        Ok(())
    }
}

fn pos_of<T>(item: &Spanned<T>) -> SourcePos {
    item.pos.unwrap_or_default()
}

/// The position a compiled program would report for this node: the value
/// it emits for interpolations, the node itself otherwise.
fn node_pos(node: &Node) -> SourcePos {
    match &node.node {
        NodeKind::Variable(expr) => expr.outer_pos().unwrap_or_default(),
        _ => pos_of(node),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
