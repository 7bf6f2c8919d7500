//! The compiling loader.
//!
//! [`Engine`] owns named template sources and a cache of loaded
//! templates. Loading parses and compiles; templates using a construct the
//! compiler cannot lower are rendered by the interpreter instead, when
//! [`CompileOptions::fallback_to_interpreter`] allows it.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ast::template::Template;
use crate::codegen::{CompileOptions, Compiler};
use crate::error::{LoadError, RenderError, TemplateError};
use crate::interp;
use crate::parser;
use crate::program::Program;
use crate::registry::Registry;
use crate::runtime::{Context, RenderOptions};

/// A loaded template, ready to render.
#[derive(Debug)]
pub enum LoadedTemplate {
    Compiled(Program),
    /// Kept as a parsed tree because compilation was not possible.
    Interpreted { name: String, template: Template },
}

impl LoadedTemplate {
    pub fn is_compiled(&self) -> bool {
        matches!(self, LoadedTemplate::Compiled(_))
    }

    pub fn render(
        &self,
        ctx: &mut Context,
        registry: &Registry,
        options: RenderOptions,
    ) -> Result<String, RenderError> {
        match self {
            LoadedTemplate::Compiled(program) => program.render(ctx, options),
            LoadedTemplate::Interpreted { template, .. } => {
                interp::render_with_options(template, ctx, registry, options)
            }
        }
    }
}

/// Loads, compiles and caches named templates.
///
/// ```rust
/// use tapestry::{Context, Engine};
///
/// let engine = Engine::default();
/// engine.add_template("hello", "Hello, {{ name|default:\"you\" }}!");
///
/// let mut ctx = Context::new();
/// assert_eq!(engine.render("hello", &mut ctx).unwrap(), "Hello, you!");
/// assert!(engine.get_template("hello").unwrap().is_compiled());
/// ```
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    options: CompileOptions,
    sources: RwLock<FxHashMap<String, Arc<str>>>,
    cache: RwLock<FxHashMap<String, Arc<LoadedTemplate>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Registry::default())
    }
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        Self::with_options(registry, CompileOptions::default())
    }

    pub fn with_options(registry: Registry, options: CompileOptions) -> Self {
        Self {
            registry,
            options,
            sources: RwLock::new(FxHashMap::default()),
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Add or replace a named template source. Replacing drops any cached
    /// load of the old source.
    pub fn add_template(&self, name: impl Into<String>, source: impl Into<Arc<str>>) {
        let name = name.into();
        // Lock order is cache then sources, as in `cache_if_current`.
        let mut cache = self.cache.write();
        let mut sources = self.sources.write();
        cache.remove(&name);
        sources.insert(name, source.into());
    }

    /// Load `name`, compiling it on first use.
    pub fn get_template(&self, name: &str) -> Result<Arc<LoadedTemplate>, LoadError> {
        if let Some(loaded) = self.cache.read().get(name) {
            return Ok(Arc::clone(loaded));
        }

        let source = self.source(name)?;
        let loaded = Arc::new(self.load(name, &source)?);
        self.cache_if_current(name, &source, &loaded);
        Ok(loaded)
    }

    /// Cache `loaded` unless the source it was built from has been replaced
    /// in the meantime. Returns whether it was cached.
    fn cache_if_current(
        &self,
        name: &str,
        source: &Arc<str>,
        loaded: &Arc<LoadedTemplate>,
    ) -> bool {
        let mut cache = self.cache.write();
        let sources = self.sources.read();
        match sources.get(name) {
            Some(current) if Arc::ptr_eq(current, source) => {
                cache.insert(name.to_string(), Arc::clone(loaded));
                true
            }
            _ => {
                log::debug!("template {name} was replaced while loading; not caching");
                false
            }
        }
    }

    fn source(&self, name: &str) -> Result<Arc<str>, LoadError> {
        self.sources
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }

    fn load(&self, name: &str, source: &str) -> Result<LoadedTemplate, LoadError> {
        let template = parse_source(name, source)?;

        let compiled = Compiler::new(&self.registry, self.options.clone())
            .with_name(name)
            .compile(&template);
        match compiled {
            Ok(program) => Ok(LoadedTemplate::Compiled(program)),
            Err(e) if e.is_unsupported() && self.options.fallback_to_interpreter => {
                log::debug!("template {name} falls back to the interpreter: {e}");
                Ok(LoadedTemplate::Interpreted {
                    name: name.to_string(),
                    template,
                })
            }
            Err(e) => {
                log::warn!("template {name} failed to compile: {e}");
                Err(LoadError::Compile {
                    name: name.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Load and render `name` with default render options.
    pub fn render(&self, name: &str, ctx: &mut Context) -> Result<String, TemplateError> {
        self.render_with_options(name, ctx, RenderOptions::default())
    }

    pub fn render_with_options(
        &self,
        name: &str,
        ctx: &mut Context,
        options: RenderOptions,
    ) -> Result<String, TemplateError> {
        let loaded = self.get_template(name)?;
        Ok(loaded.render(ctx, &self.registry, options)?)
    }

    /// Render `name` with the interpreter, bypassing compilation and the
    /// cache.
    pub fn render_native(
        &self,
        name: &str,
        ctx: &mut Context,
        options: RenderOptions,
    ) -> Result<String, TemplateError> {
        let template = parse_source(name, &self.source(name)?)?;
        Ok(interp::render_with_options(&template, ctx, &self.registry, options)?)
    }
}

fn parse_source(name: &str, source: &str) -> Result<Template, LoadError> {
    parser::parse(source).map_err(|errors| LoadError::Parse {
        name: name.to_string(),
        errors,
    })
}
