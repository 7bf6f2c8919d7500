//! Abstract syntax tree types for templates.
//!
//! The parser produces a [`Template`]: a sequence of [`Node`]s whose
//! rendered strings are concatenated. Nodes parsed from real text carry a
//! [`SourcePos`]; the compiler copies it onto the instructions it
//! generates so runtime errors point back at the template.

pub mod path;
pub mod span;
pub mod template;
pub mod value;

// Convenience re-exports
pub use path::VariablePath;
pub use span::{SourcePos, Span, Spanned};
pub use template::*;
pub use value::Value;
