use crate::ast::path::VariablePath;
use crate::ast::value::Value;
use crate::error::RenderError;

use super::context::Context;

/// A variable descriptor: the runtime handle for one dotted path.
///
/// Compiled programs build each distinct descriptor once and share it
/// across every reference and every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    path: VariablePath,
}

impl Variable {
    pub fn new(path: VariablePath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &VariablePath {
        &self.path
    }

    /// Strict lookup. Walks the path from the context entry named by its
    /// first segment through map keys and array indices.
    ///
    /// Fails with a missing-variable error naming the full path if any
    /// step is absent.
    pub fn resolve(&self, ctx: &Context) -> Result<Value, RenderError> {
        let missing = || RenderError::missing_variable(&self.path.key());

        let mut segments = self.path.segments().iter();
        let head = segments.next().ok_or_else(missing)?;
        let mut current = ctx.get(head).ok_or_else(missing)?;
        for segment in segments {
            current = current.get_segment(segment).ok_or_else(missing)?;
        }
        Ok(current.clone())
    }
}
