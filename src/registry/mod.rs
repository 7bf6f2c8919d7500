//! Filter registration.
//!
//! The [`Registry`] stores the filters templates can call with
//! `{{ value|name }}` or `{{ value|name:arg }}`. The host populates it
//! before compiling or rendering; [`Registry::with_builtins`] starts from
//! the standard set.
//!
//! There are two ways to register filters:
//!
//! - **Closure-based**: [`ClosureFilter`] for simple cases where a full
//!   trait implementation would be boilerplate.
//! - **Trait-based**: implement [`TemplateFilter`] directly. The
//!   `#[template_filter]` macro in the `tapestry_macros` crate generates
//!   an implementation from a plain function.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::value::Value;
use crate::error::RenderError;

mod builtins;

// ── Trait definitions ───────────────────────────────────────────────────

/// A filter, invoked via `{{ value|name }}` or `{{ value|name:arg }}`.
///
/// Filters are pure: they receive the piped value and the optional
/// pre-resolved argument and return a new value. The registry checks the
/// argument against [`FilterSignature::arg`] before calling `apply`.
pub trait TemplateFilter: Send + Sync {
    fn apply(&self, value: Value, arg: Option<Value>) -> Result<Value, RenderError>;

    /// Declare this filter's name and argument expectations.
    fn signature(&self) -> FilterSignature;
}

// ── Signatures ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSignature {
    pub name: String,
    pub arg: ArgSpec,
}

/// Whether a filter takes an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSpec {
    None,
    Optional,
    Required,
}

impl ArgSpec {
    /// Check a call site. Returns the problem, phrased to follow the
    /// filter name in a message, if the call does not fit.
    pub fn check(self, has_arg: bool) -> Result<(), &'static str> {
        match (self, has_arg) {
            (ArgSpec::None, true) => Err("takes no argument"),
            (ArgSpec::Required, false) => Err("requires an argument"),
            _ => Ok(()),
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────────

/// Stores registered filters, keyed by name.
///
/// Filters are held behind `Arc` so compiled programs can keep the
/// filters they reference without borrowing the registry.
///
/// ```rust
/// use tapestry::{Registry, ClosureFilter, Value};
/// use tapestry::registry::ArgSpec;
///
/// let mut registry = Registry::new();
/// registry.register_filter(ClosureFilter::new("shout", ArgSpec::None, |value, _| {
///     Ok(Value::String(format!("{}!", value.to_output_string())))
/// }));
/// assert!(registry.get("shout").is_some());
/// ```
#[derive(Clone)]
pub struct Registry {
    filters: FxHashMap<String, Arc<dyn TemplateFilter>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            filters: FxHashMap::default(),
        }
    }

    /// A registry holding the built-in filters: `default`, `upper`,
    /// `lower`, `capfirst`, `title`, `length`, `first`, `last`, `join`,
    /// `add` and `yesno`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry);
        registry
    }

    /// Register a filter. If a filter with the same name already exists,
    /// it is replaced.
    pub fn register_filter(&mut self, filter: impl TemplateFilter + 'static) {
        let sig = filter.signature();
        self.filters.insert(sig.name, Arc::new(filter));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TemplateFilter>> {
        self.filters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Look up, arity-check and call a filter by name.
    pub fn apply(&self, name: &str, value: Value, arg: Option<Value>) -> Result<Value, RenderError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| RenderError::unknown_filter(name))?;
        filter
            .signature()
            .arg
            .check(arg.is_some())
            .map_err(|problem| RenderError::filter_argument(name, problem))?;
        filter.apply(value, arg)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("filters", &names).finish()
    }
}

// ── Closure-based convenience wrapper ───────────────────────────────────

/// A [`TemplateFilter`] implementation backed by a closure.
///
/// ```rust
/// use tapestry::{ClosureFilter, Value};
/// use tapestry::registry::ArgSpec;
///
/// let filter = ClosureFilter::new("wrap", ArgSpec::Optional, |value, arg| {
///     let mark = arg.map(|a| a.to_output_string()).unwrap_or_else(|| "*".into());
///     Ok(Value::String(format!("{mark}{}{mark}", value.to_output_string())))
/// });
/// ```
pub struct ClosureFilter<F>
where
    F: Fn(Value, Option<Value>) -> Result<Value, RenderError> + Send + Sync,
{
    sig: FilterSignature,
    func: F,
}

impl<F> ClosureFilter<F>
where
    F: Fn(Value, Option<Value>) -> Result<Value, RenderError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, arg: ArgSpec, func: F) -> Self {
        Self {
            sig: FilterSignature {
                name: name.into(),
                arg,
            },
            func,
        }
    }
}

impl<F> TemplateFilter for ClosureFilter<F>
where
    F: Fn(Value, Option<Value>) -> Result<Value, RenderError> + Send + Sync,
{
    fn apply(&self, value: Value, arg: Option<Value>) -> Result<Value, RenderError> {
        (self.func)(value, arg)
    }

    fn signature(&self) -> FilterSignature {
        self.sig.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderErrorKind;

    #[test]
    fn test_unknown_filter() {
        let err = Registry::new().apply("nope", Value::None, None).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::UnknownFilter);
    }

    #[test]
    fn test_arity_checked_before_call() {
        let registry = Registry::with_builtins();
        let err = registry.apply("default", Value::None, None).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::FilterArgument);
        assert_eq!(err.message, "filter `default` requires an argument");

        let err = registry
            .apply("upper", Value::from("a"), Some(Value::from("b")))
            .unwrap_err();
        assert_eq!(err.message, "filter `upper` takes no argument");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::with_builtins();
        registry.register_filter(ClosureFilter::new("upper", ArgSpec::None, |_, _| {
            Ok(Value::from("replaced"))
        }));
        assert_eq!(
            registry.apply("upper", Value::from("x"), None).unwrap(),
            Value::from("replaced")
        );
    }

    #[test]
    fn test_debug_lists_names() {
        let mut registry = Registry::new();
        registry.register_filter(ClosureFilter::new("b", ArgSpec::None, |v, _| Ok(v)));
        registry.register_filter(ClosureFilter::new("a", ArgSpec::None, |v, _| Ok(v)));
        assert_eq!(format!("{registry:?}"), r#"Registry { filters: ["a", "b"] }"#);
    }
}
