//! Compiled programs and the executor that runs them.

use std::fmt;
use std::sync::Arc;

use crate::ast::value::Value;
use crate::codegen::instr::{Expr, ExprKind, Stmt, StmtKind};
use crate::codegen::DescriptorHandle;
use crate::error::RenderError;
use crate::registry::TemplateFilter;
use crate::runtime::{Context, Execution, RenderOptions, Variable, bind_loop_item, iterate};

/// A compiled template.
///
/// Immutable once built. The descriptor and filter tables are shared by
/// every render, so a program can be rendered concurrently from several
/// threads, each with its own [`Execution`] and [`Context`].
#[derive(Clone)]
pub struct Program {
    name: Option<String>,
    body: Vec<Stmt>,
    descriptors: Arc<[Variable]>,
    filters: Arc<[Arc<dyn TemplateFilter>]>,
}

impl Program {
    pub(crate) fn new(
        name: Option<String>,
        body: Vec<Stmt>,
        descriptors: Arc<[Variable]>,
        filters: Arc<[Arc<dyn TemplateFilter>]>,
    ) -> Self {
        Self {
            name,
            body,
            descriptors,
            filters,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    /// The program's instance values: one descriptor per distinct path.
    pub fn descriptors(&self) -> &[Variable] {
        &self.descriptors
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptor(&self, handle: DescriptorHandle) -> Option<&Variable> {
        self.descriptors.get(handle.index())
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Render with a fresh execution and return the output.
    pub fn render(&self, ctx: &mut Context, options: RenderOptions) -> Result<String, RenderError> {
        let mut exec = Execution::new(options);
        self.execute(&mut exec, ctx)?;
        Ok(exec.into_output())
    }

    /// Run the program body, appending to `exec`'s output.
    ///
    /// Errors carry the position of the instruction that failed. The
    /// context is left as it was found, including after an error.
    pub fn execute(&self, exec: &mut Execution, ctx: &mut Context) -> Result<(), RenderError> {
        self.exec_block(&self.body, exec, ctx)
    }

    fn exec_block(
        &self,
        body: &[Stmt],
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        for stmt in body {
            self.exec_stmt(stmt, exec, ctx)
                .map_err(|e| e.or_pos(stmt.pos()))?;
        }
        Ok(())
    }

    fn exec_stmt(
        &self,
        stmt: &Stmt,
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        exec.check_limits()?;

        match &stmt.kind {
            StmtKind::Text(text) => exec.emit_text(text),
            StmtKind::Emit(expr) => {
                let value = self.eval(expr, exec, ctx)?;
                exec.emit(value);
            }
            StmtKind::If { branches, orelse } => {
                for branch in branches {
                    if self.eval(&branch.test, exec, ctx)?.is_truthy() {
                        return self.exec_block(&branch.body, exec, ctx);
                    }
                }
                self.exec_block(orelse, exec, ctx)?;
            }
            StmtKind::For {
                binding,
                iterable,
                body,
                empty,
            } => {
                let value = self.eval(iterable, exec, ctx)?;
                let items = iterate(value).map_err(|e| e.or_pos(iterable.pos()))?;
                if items.is_empty() {
                    return self.exec_block(empty, exec, ctx);
                }

                ctx.push_frame();
                let result = self.exec_loop(binding, items, body, exec, ctx);
                ctx.pop_frame();
                result?;
            }
        }
        Ok(())
    }

    fn exec_loop(
        &self,
        binding: &str,
        items: Vec<Value>,
        body: &[Stmt],
        exec: &mut Execution,
        ctx: &mut Context,
    ) -> Result<(), RenderError> {
        let len = items.len();
        for (index, item) in items.into_iter().enumerate() {
            exec.check_iteration_limit()?;
            bind_loop_item(ctx, binding, item, index, len);
            self.exec_block(body, exec, ctx)?;
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr, exec: &Execution, ctx: &Context) -> Result<Value, RenderError> {
        let value = match &expr.kind {
            ExprKind::Literal(value) => value.clone(),
            ExprKind::Resolve { descriptor, .. } => self
                .variable(*descriptor)
                .resolve(ctx)
                .map_err(|e| e.or_pos(expr.pos()))?,
            ExprKind::TryResolve {
                descriptor,
                fallback,
                ..
            } => {
                let fallback = fallback
                    .as_deref()
                    .map(|f| self.eval(f, exec, ctx))
                    .transpose()?;
                exec.try_resolve(self.variable(*descriptor), ctx, fallback)
                    .map_err(|e| e.or_pos(expr.pos()))?
            }
            ExprKind::Filter { filter, input, arg } => {
                let input = self.eval(input, exec, ctx)?;
                let arg = arg
                    .as_deref()
                    .map(|a| self.eval(a, exec, ctx))
                    .transpose()?;
                exec.apply_filter(self.filters[filter.index()].as_ref(), input, arg)
                    .map_err(|e| e.or_pos(expr.pos()))?
            }
            ExprKind::Not(inner) => Value::Bool(!self.eval(inner, exec, ctx)?.is_truthy()),
        };
        Ok(value)
    }

    // Handles are only minted by the compiler that built this program.
    fn variable(&self, handle: DescriptorHandle) -> &Variable {
        &self.descriptors[handle.index()]
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("descriptors", &self.descriptors)
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::span::SourcePos;
    use crate::codegen::{CompileOptions, compile};
    use crate::error::RenderErrorKind;
    use crate::parser::parse;
    use crate::registry::Registry;

    fn program(source: &str) -> Program {
        compile(&parse(source).unwrap(), &Registry::with_builtins(), &CompileOptions::default())
            .unwrap()
    }

    fn render(source: &str, ctx: &mut Context) -> Result<String, RenderError> {
        program(source).render(ctx, RenderOptions::default())
    }

    #[test]
    fn test_text_and_values() {
        let mut ctx: Context = [("name", "Ada")].into_iter().collect();
        assert_eq!(render("Hi {{ name }}!", &mut ctx).unwrap(), "Hi Ada!");
    }

    #[test]
    fn test_missing_interpolation_renders_empty() {
        assert_eq!(render("[{{ nope }}]", &mut Context::new()).unwrap(), "[]");
    }

    #[test]
    fn test_default_filter() {
        let source = r#"{{ user.name|default:"N/A" }}"#;
        assert_eq!(render(source, &mut Context::new()).unwrap(), "N/A");

        let user: Value = [("name", "")].into_iter().collect();
        let mut ctx: Context = [("user", user)].into_iter().collect();
        assert_eq!(render(source, &mut ctx).unwrap(), "N/A");
    }

    #[test]
    fn test_missing_filter_argument_fails_with_position() {
        let err = render("\n  {{ x|default:other }}", &mut Context::new()).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::MissingVariable);
        assert_eq!(err.pos, Some(SourcePos::new(2, 16)));
        assert_eq!(err.message, "variable does not exist: other");
    }

    #[test]
    fn test_autoescape() {
        let mut ctx: Context = [("html", "<b>")].into_iter().collect();
        assert_eq!(render("<i>{{ html }}</i>", &mut ctx).unwrap(), "<i>&lt;b&gt;</i>");
    }

    #[test]
    fn test_if_elif_else() {
        let source = "{% if a %}A{% elif not b %}B{% else %}C{% endif %}";
        let mut ctx: Context = [("a", true)].into_iter().collect();
        assert_eq!(render(source, &mut ctx).unwrap(), "A");
        assert_eq!(render(source, &mut Context::new()).unwrap(), "B");
        let mut ctx: Context = [("b", true)].into_iter().collect();
        assert_eq!(render(source, &mut ctx).unwrap(), "C");
    }

    #[test]
    fn test_for_loop_scoping() {
        let source = "{% for i in items %}{{ forloop.counter }}={{ i }};{% empty %}none{% endfor %}{{ i }}";
        let mut ctx = Context::new();
        ctx.set("items", Value::from(vec!["a", "b"]));
        assert_eq!(render(source, &mut ctx).unwrap(), "1=a;2=b;");
        assert_eq!(ctx.depth(), 1);
        assert_eq!(render(source, &mut Context::new()).unwrap(), "none");
    }

    #[test]
    fn test_not_iterable_position() {
        let mut ctx: Context = [("n", 3i64)].into_iter().collect();
        let err = render("{% for i in n %}{% endfor %}", &mut ctx).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::NotIterable);
        assert_eq!(err.pos, Some(SourcePos::new(1, 13)));
    }

    #[test]
    fn test_context_restored_after_error() {
        let source = "{% for i in items %}{{ i|default:missing }}{% endfor %}";
        let mut ctx = Context::new();
        ctx.set("items", Value::from(vec![""]));
        assert!(render(source, &mut ctx).is_err());
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_iteration_limit() {
        let mut ctx = Context::new();
        ctx.set("items", Value::from(vec![1i64, 2, 3]));
        let err = program("{% for i in items %}{{ i }}{% endfor %}")
            .render(&mut ctx, RenderOptions::new().max_iterations(2))
            .unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::ResourceLimit);
        assert_eq!(err.pos, Some(SourcePos::new(1, 1)));
    }

    #[test]
    fn test_shared_across_renders() {
        let program = program("{{ n }}");
        let mut one: Context = [("n", 1i64)].into_iter().collect();
        let mut two: Context = [("n", 2i64)].into_iter().collect();
        assert_eq!(program.render(&mut one, RenderOptions::default()).unwrap(), "1");
        assert_eq!(program.render(&mut two, RenderOptions::default()).unwrap(), "2");
        assert_eq!(program.descriptor_count(), 1);
    }
}
