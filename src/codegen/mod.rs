//! Template compiler: turns a parsed [`Template`](crate::Template) into a
//! [`Program`](crate::Program) of generated instructions.
//!
//! The pieces, bottom-up:
//!
//! - [`position`]: stamps each instruction with the template position of
//!   the node it came from.
//! - [`ivars`]: interns variable paths into shared descriptors.
//! - [`resolve`]: emits strict or lenient variable lookups.
//! - [`lower`]: turns value fragments into emit statements.
//! - [`walker`]: drives all of the above over the node tree.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::path::VariablePath;
use crate::registry::TemplateFilter;
use crate::runtime::Variable;

pub mod instr;
pub mod ivars;
pub mod lower;
pub mod position;
pub mod resolve;
pub mod walker;

pub use instr::{Branch, ContextRef, Expr, ExprKind, FilterHandle, Fragment, Stmt, StmtKind};
pub use ivars::{DescriptorHandle, InstanceValues};
pub use lower::lower_to_statement;
pub use position::{Located, Positioned, attach};
pub use resolve::{Resolution, resolve};
pub use walker::{CompileOptions, Compiler, compile};

/// Mutable state threaded through one compilation.
#[derive(Default)]
pub struct CompilerState {
    ivars: InstanceValues,
    filters: Vec<Arc<dyn TemplateFilter>>,
    filter_index: FxHashMap<String, FilterHandle>,
}

impl CompilerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The expression naming the render context a program runs against.
    pub fn context_expr(&self) -> ContextRef {
        ContextRef
    }

    pub fn intern(&mut self, path: &VariablePath) -> DescriptorHandle {
        self.ivars.intern(path)
    }

    pub fn ivars(&self) -> &InstanceValues {
        &self.ivars
    }

    /// Return the handle for filter `name`, adding `filter` to the
    /// program's filter table on first use.
    pub fn intern_filter(&mut self, name: &str, filter: Arc<dyn TemplateFilter>) -> FilterHandle {
        if let Some(&handle) = self.filter_index.get(name) {
            return handle;
        }
        let handle = FilterHandle(self.filters.len() as u32);
        self.filters.push(filter);
        self.filter_index.insert(name.to_string(), handle);
        handle
    }

    pub fn filter(&self, handle: FilterHandle) -> Option<&Arc<dyn TemplateFilter>> {
        self.filters.get(handle.index())
    }

    pub(crate) fn finish(self) -> (Arc<[Variable]>, Arc<[Arc<dyn TemplateFilter>]>) {
        (self.ivars.freeze(), self.filters.into())
    }
}

impl std::fmt::Debug for CompilerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut filters: Vec<&str> = self.filter_index.keys().map(String::as_str).collect();
        filters.sort_unstable();
        f.debug_struct("CompilerState")
            .field("ivars", &self.ivars)
            .field("filters", &filters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_intern_filter_once() {
        let registry = Registry::with_builtins();
        let mut state = CompilerState::new();
        let upper = registry.get("upper").unwrap();
        let a = state.intern_filter("upper", upper.clone());
        let b = state.intern_filter("upper", upper);
        let c = state.intern_filter("lower", registry.get("lower").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(state.filter(c).unwrap().signature().name, "lower");
    }
}
