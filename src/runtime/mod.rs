//! Runtime support library shared by compiled programs and the
//! interpreter.
//!
//! Both renderers go through the same entry points, which is what keeps
//! their output identical:
//!
//! - [`Variable::resolve`]: strict lookup, fails on a missing variable.
//! - [`Execution::try_resolve`]: lenient lookup, substitutes a fallback or
//!   [`Value::None`] for a missing variable.
//! - [`Execution::emit`]: appends a value to the output, escaping it when
//!   autoescaping is on.
//!
//! The execution object is always passed explicitly; nothing here relies
//! on ambient state.

use std::sync::atomic::Ordering;

use crate::ast::value::Value;
use crate::error::{RenderError, RenderErrorKind};
use crate::registry::TemplateFilter;

mod context;
mod options;
mod variable;

pub use context::Context;
pub use options::RenderOptions;
pub use variable::Variable;

/// Per-render state: the output buffer, options, and limit counters.
///
/// One `Execution` serves exactly one render call. Compiled programs and
/// the descriptors they share stay read-only while it runs.
#[derive(Debug)]
pub struct Execution {
    output: String,
    options: RenderOptions,
    node_count: u64,
    iteration_count: u64,
}

impl Execution {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            output: String::new(),
            options,
            node_count: 0,
            iteration_count: 0,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Append a value to the output, HTML-escaping it if autoescaping is on.
    pub fn emit(&mut self, value: Value) {
        let text = value.to_output_string();
        if self.options.autoescape {
            push_escaped(&mut self.output, &text);
        } else {
            self.output.push_str(&text);
        }
    }

    /// Append literal template text verbatim.
    pub fn emit_text(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Lenient lookup of `variable` in `ctx`.
    ///
    /// A missing variable yields `fallback`, or [`Value::None`] when no
    /// fallback was passed. Any other failure propagates unchanged.
    pub fn try_resolve(
        &self,
        variable: &Variable,
        ctx: &Context,
        fallback: Option<Value>,
    ) -> Result<Value, RenderError> {
        match variable.resolve(ctx) {
            Ok(value) => Ok(value),
            Err(e) if e.is_missing_variable() => Ok(fallback.unwrap_or(Value::None)),
            Err(e) => Err(e),
        }
    }

    /// Call a filter that has already been checked for arity.
    pub fn apply_filter(
        &self,
        filter: &dyn TemplateFilter,
        value: Value,
        arg: Option<Value>,
    ) -> Result<Value, RenderError> {
        filter.apply(value, arg)
    }

    /// Redirect output into a fresh buffer. Returns the buffer to restore
    /// with [`end_capture`](Self::end_capture).
    pub fn begin_capture(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Stop capturing: restore `saved` and return what was captured.
    pub fn end_capture(&mut self, saved: String) -> String {
        std::mem::replace(&mut self.output, saved)
    }

    /// Check resource limits and cancellation. Called once per node or
    /// statement evaluation.
    pub fn check_limits(&mut self) -> Result<(), RenderError> {
        self.node_count += 1;

        if let Some(max) = self.options.max_node_evaluations
            && self.node_count > max
        {
            return Err(RenderError::new(
                RenderErrorKind::ResourceLimit,
                format!("render exceeded maximum of {max} node evaluations"),
            ));
        }

        if let Some(ref token) = self.options.cancellation_token
            && token.load(Ordering::Relaxed)
        {
            return Err(RenderError::new(
                RenderErrorKind::Cancelled,
                "render cancelled",
            ));
        }

        Ok(())
    }

    /// Check the iteration limit. Called once per loop iteration.
    pub fn check_iteration_limit(&mut self) -> Result<(), RenderError> {
        self.iteration_count += 1;

        if let Some(max) = self.options.max_iterations
            && self.iteration_count > max
        {
            return Err(RenderError::new(
                RenderErrorKind::ResourceLimit,
                format!("render exceeded maximum of {max} loop iterations"),
            ));
        }

        Ok(())
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

/// The items a `for` block walks over.
///
/// Arrays yield their elements, maps their keys, `None` (what a missing
/// variable resolves to leniently) yields nothing.
pub fn iterate(value: Value) -> Result<Vec<Value>, RenderError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Map(entries) => Ok(entries.into_keys().map(Value::String).collect()),
        Value::None => Ok(Vec::new()),
        other => Err(RenderError::not_iterable(other.type_name())),
    }
}

/// Bind one loop item and its `forloop` record in the innermost frame.
pub fn bind_loop_item(ctx: &mut Context, binding: &str, item: Value, index: usize, len: usize) {
    let forloop: Value = [
        ("counter", Value::from((index + 1) as i64)),
        ("counter0", Value::from(index as i64)),
        ("first", Value::Bool(index == 0)),
        ("last", Value::Bool(index + 1 == len)),
    ]
    .into_iter()
    .collect();
    ctx.set("forloop", forloop);
    ctx.set(binding, item);
}

/// HTML-escape `&`, `<`, `>`, `"` and `'` onto `out`.
fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::path::VariablePath;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn var(path: &str) -> Variable {
        Variable::new(VariablePath::parse(path).unwrap())
    }

    #[test]
    fn test_emit_escapes_by_default() {
        let mut exec = Execution::new(RenderOptions::default());
        exec.emit(Value::from("<b>&'\""));
        exec.emit_text("<i>");
        assert_eq!(exec.into_output(), "&lt;b&gt;&amp;&#x27;&quot;<i>");
    }

    #[test]
    fn test_emit_without_autoescape() {
        let mut exec = Execution::new(RenderOptions::new().autoescape(false));
        exec.emit(Value::from("<b>"));
        assert_eq!(exec.output(), "<b>");
    }

    #[test]
    fn test_try_resolve_missing_without_fallback() {
        let exec = Execution::new(RenderOptions::default());
        let value = exec.try_resolve(&var("nope"), &Context::new(), None).unwrap();
        assert_eq!(value, Value::None);
    }

    #[test]
    fn test_try_resolve_missing_with_fallback() {
        let exec = Execution::new(RenderOptions::default());
        let value = exec
            .try_resolve(&var("nope"), &Context::new(), Some(Value::from("N/A")))
            .unwrap();
        assert_eq!(value, Value::from("N/A"));
    }

    #[test]
    fn test_try_resolve_present_ignores_fallback() {
        let exec = Execution::new(RenderOptions::default());
        let ctx: Context = [("name", "Ada")].into_iter().collect();
        let value = exec
            .try_resolve(&var("name"), &ctx, Some(Value::from("N/A")))
            .unwrap();
        assert_eq!(value, Value::from("Ada"));
    }

    #[test]
    fn test_capture_restores_outer_buffer() {
        let mut exec = Execution::new(RenderOptions::default());
        exec.emit_text("outer ");
        let saved = exec.begin_capture();
        exec.emit_text("inner");
        let captured = exec.end_capture(saved);
        assert_eq!(captured, "inner");
        assert_eq!(exec.output(), "outer ");
    }

    #[test]
    fn test_iterate() {
        assert_eq!(iterate(Value::None).unwrap(), Vec::<Value>::new());
        assert_eq!(iterate(Value::from(vec![1i64, 2])).unwrap().len(), 2);
        let map: Value = [("b", 1i64), ("a", 2i64)].into_iter().collect();
        assert_eq!(
            iterate(map).unwrap(),
            vec![Value::from("a"), Value::from("b")]
        );
        let err = iterate(Value::from("text")).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::NotIterable);
    }

    #[test]
    fn test_node_limit() {
        let mut exec = Execution::new(RenderOptions::new().max_node_evaluations(2));
        assert!(exec.check_limits().is_ok());
        assert!(exec.check_limits().is_ok());
        let err = exec.check_limits().unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::ResourceLimit);
    }

    #[test]
    fn test_cancellation() {
        let token = Arc::new(AtomicBool::new(true));
        let mut exec = Execution::new(RenderOptions::new().cancellation_token(token));
        assert_eq!(exec.check_limits().unwrap_err().kind, RenderErrorKind::Cancelled);
    }

    #[test]
    fn test_bind_loop_item() {
        let mut ctx = Context::new();
        bind_loop_item(&mut ctx, "item", Value::from("x"), 0, 2);
        assert_eq!(ctx.get("item"), Some(&Value::from("x")));
        let forloop = ctx.get("forloop").unwrap();
        assert_eq!(forloop.get_segment("counter"), Some(&Value::Number(1.0)));
        assert_eq!(forloop.get_segment("first"), Some(&Value::Bool(true)));
        assert_eq!(forloop.get_segment("last"), Some(&Value::Bool(false)));
    }
}
