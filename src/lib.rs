//! # tapestry
//!
//! A Django-flavoured template language with a compiler. Templates are
//! parsed into a node tree, then compiled into a [`Program`]: a list of
//! generated statements that run against an explicit execution object and
//! render context. A tree-walking interpreter renders the same templates
//! directly and serves as the reference the compiler is held to.
//!
//! ## Quick start
//!
//! ```rust
//! use tapestry::{render, Context, Registry};
//!
//! let mut ctx = Context::new();
//! ctx.set("name", "Alice");
//!
//! let registry = Registry::default();
//! let output = render("Hello, {{ name|default:\"you\" }}!", &mut ctx, &registry).unwrap();
//! assert_eq!(output, "Hello, Alice!");
//! ```
//!
//! ## Compiled programs
//!
//! For repeated rendering, compile once and render against different
//! contexts. Each distinct variable path gets a single shared descriptor:
//!
//! ```rust
//! use tapestry::{compile, Context, Registry, RenderOptions};
//!
//! let registry = Registry::default();
//! let program = compile("HP: {{ hp }} / {{ hp|add:10 }}", &registry).unwrap();
//! assert_eq!(program.descriptor_count(), 1);
//!
//! let mut ctx = Context::new();
//! ctx.set("hp", 75i64);
//! assert_eq!(program.render(&mut ctx, RenderOptions::default()).unwrap(), "HP: 75 / 85");
//! ```
//!
//! ## Strict and lenient lookups
//!
//! A missing variable in `{{ ... }}`, an `if` condition or a `for`
//! iterable renders as nothing. A missing variable used as a filter
//! argument is an error that carries its template position:
//!
//! ```rust
//! use tapestry::{render, Context, Registry, TemplateError};
//!
//! let registry = Registry::default();
//! assert_eq!(render("[{{ missing }}]", &mut Context::new(), &registry).unwrap(), "[]");
//!
//! let err = render("{{ x|default:other }}", &mut Context::new(), &registry).unwrap_err();
//! let TemplateError::Render(err) = err else { panic!() };
//! assert!(err.is_missing_variable());
//! assert_eq!(err.pos.unwrap().to_string(), "1:14");
//! ```

pub mod ast;
pub mod codegen;
pub mod engine;
pub mod error;
pub mod interp;
mod parser;
pub mod program;
pub mod registry;
pub mod runtime;

pub use ast::path::VariablePath;
pub use ast::span::{SourcePos, Span, Spanned};
pub use ast::template::{Node, NodeKind, Template};
pub use ast::value::Value;
pub use codegen::CompileOptions;
pub use engine::{Engine, LoadedTemplate};
pub use error::{CompileError, LoadError, ParseError, RenderError, RenderErrorKind, TemplateError};
pub use parser::{parse, parse_filter_expression};
pub use program::Program;
pub use registry::{ClosureFilter, Registry, TemplateFilter};
pub use runtime::{Context, Execution, RenderOptions, Variable};

/// Parse and compile source text into a program with default options.
pub fn compile(source: &str, registry: &Registry) -> Result<Program, TemplateError> {
    let template = parser::parse(source).map_err(TemplateError::Parse)?;
    Ok(codegen::compile(&template, registry, &CompileOptions::default())?)
}

/// Parse, compile and render source text in a single step.
///
/// For repeated rendering of the same source, prefer [`compile`] or an
/// [`Engine`] to avoid recompiling.
pub fn render(source: &str, ctx: &mut Context, registry: &Registry) -> Result<String, TemplateError> {
    render_with_options(source, ctx, registry, RenderOptions::default())
}

/// [`render`] with custom options for escaping, limits and cancellation.
///
/// ```rust
/// use tapestry::{render_with_options, Context, Registry, RenderOptions};
///
/// let opts = RenderOptions::new().autoescape(false).max_node_evaluations(100);
/// let mut ctx = Context::new();
/// ctx.set("html", "<b>hi</b>");
/// let out = render_with_options("{{ html }}", &mut ctx, &Registry::default(), opts).unwrap();
/// assert_eq!(out, "<b>hi</b>");
/// ```
pub fn render_with_options(
    source: &str,
    ctx: &mut Context,
    registry: &Registry,
    options: RenderOptions,
) -> Result<String, TemplateError> {
    let program = compile(source, registry)?;
    Ok(program.render(ctx, options)?)
}
