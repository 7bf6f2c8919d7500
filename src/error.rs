//! Error types for parsing, compiling, loading and rendering.
//!
//! [`ParseError`] is produced by the parser and carries a byte span for
//! diagnostic formatting. [`CompileError`] is a compile-time contract
//! violation found while lowering a node. [`RenderError`] is produced at
//! render time by the runtime support library, filters, or limits, and
//! carries the template position of the construct that failed.

use crate::ast::span::{SourcePos, Span};
use std::sync::Arc;
use thiserror::Error;

// ── Parse errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Format the error with source context for display
    pub fn format_with_source(&self, source: &str, template_name: Option<&str>) -> String {
        let SourcePos { line, column } = SourcePos::from_offset(source, self.span.start);
        let (line, col) = (line as usize, column as usize);
        let source_line = source.lines().nth(line.saturating_sub(1)).unwrap_or("");

        let location = if let Some(name) = template_name {
            format!(" --> {name}:{line}:{col}")
        } else {
            format!(" --> {line}:{col}")
        };

        let pointer = " ".repeat(col.saturating_sub(1))
            + &"^".repeat((self.span.end.saturating_sub(self.span.start)).max(1));

        let mut output = format!(
            "Error: {}\n{location}\n  |\n{line:>3} | {source_line}\n    | {pointer}",
            self.message
        );

        if let Some(hint) = &self.hint {
            output.push_str(&format!("\n  = hint: {hint}"));
        }

        output
    }
}

// ── Compile errors ──────────────────────────────────────────────────────

/// A node the compiler cannot lower into a correct program.
///
/// Compilation of the whole template stops at the first such node. The
/// position is the node's, or `0:0` for synthetic nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{pos}: unknown filter `{name}`")]
    UnknownFilter { name: String, pos: SourcePos },

    #[error("{pos}: filter `{name}` {problem}")]
    FilterArity {
        name: String,
        problem: &'static str,
        pos: SourcePos,
    },

    /// The construct is valid template syntax but has no lowering rule.
    /// Loaders may fall back to the interpreter for these.
    #[error("{pos}: `{construct}` cannot be compiled")]
    Unsupported {
        construct: &'static str,
        pos: SourcePos,
    },
}

impl CompileError {
    pub fn pos(&self) -> SourcePos {
        match self {
            CompileError::UnknownFilter { pos, .. }
            | CompileError::FilterArity { pos, .. }
            | CompileError::Unsupported { pos, .. } => *pos,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, CompileError::Unsupported { .. })
    }
}

// ── Render errors ───────────────────────────────────────────────────────

/// An error that occurs while rendering a template, compiled or not.
///
/// Carries a structured [`RenderErrorKind`], a human-readable message,
/// the template [`SourcePos`] responsible (once known), and an optional
/// underlying cause.
///
/// # Error chaining
///
/// Filters that wrap a lower-level failure can keep it:
///
/// ```rust
/// use tapestry::RenderError;
///
/// fn example() -> Result<(), RenderError> {
///     let parse_err = "x".parse::<f64>().unwrap_err();
///     Err(RenderError::filter_failed("add", "not a number").with_source(parse_err))
/// }
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub pos: Option<SourcePos>,
    pub message: String,
    /// The underlying error that caused this render error, if any.
    ///
    /// Wrapped in `Arc` so that `RenderError` remains `Clone`.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl RenderError {
    pub fn new(kind: RenderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            pos: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_pos(mut self, pos: SourcePos) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Set the position only if none was recorded closer to the failure.
    pub fn or_pos(self, pos: SourcePos) -> Self {
        if self.pos.is_none() { self.with_pos(pos) } else { self }
    }

    /// Attach an underlying error cause to this render error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn is_missing_variable(&self) -> bool {
        self.kind == RenderErrorKind::MissingVariable
    }

    // Convenience constructors for common error types

    pub fn missing_variable(path: &str) -> Self {
        Self::new(
            RenderErrorKind::MissingVariable,
            format!("variable does not exist: {path}"),
        )
    }

    pub fn unknown_filter(name: &str) -> Self {
        Self::new(
            RenderErrorKind::UnknownFilter,
            format!("unknown filter: {name}"),
        )
    }

    pub fn filter_argument(name: &str, problem: &str) -> Self {
        Self::new(
            RenderErrorKind::FilterArgument,
            format!("filter `{name}` {problem}"),
        )
    }

    pub fn filter_failed(name: &str, message: impl std::fmt::Display) -> Self {
        Self::new(
            RenderErrorKind::FilterFailed,
            format!("filter `{name}` failed: {message}"),
        )
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            RenderErrorKind::TypeError,
            format!("expected {expected}, got {got}"),
        )
    }

    pub fn not_iterable(got: &str) -> Self {
        Self::new(
            RenderErrorKind::NotIterable,
            format!("for requires an array, map or none, got {got}"),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderErrorKind {
    /// A strictly resolved variable is absent from the context.
    MissingVariable,
    UnknownFilter,
    /// A filter was called with a missing or unexpected argument.
    FilterArgument,
    FilterFailed,
    TypeError,
    NotIterable,
    /// The render exceeded a configured resource limit (node count
    /// or iteration cap).
    ResourceLimit,
    /// The render was cancelled via an external cancellation token.
    Cancelled,
}

// ── Loader errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to parse template `{name}`: {}", summarize(.errors))]
    Parse {
        name: String,
        errors: Vec<ParseError>,
    },

    #[error("failed to compile template `{name}`: {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },
}

/// Combined error type returned by the one-step [`render`](crate::render)
/// helpers.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    #[error("{}", summarize(.0))]
    Parse(Vec<ParseError>),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

fn summarize(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
