use rustc_hash::FxHashMap;

use crate::ast::value::Value;

/// The data a template renders against.
///
/// A stack of frames: the host fills the bottom frame, loops push a frame
/// for their bindings and pop it when done. Lookups search the innermost
/// frame first, so loop bindings shadow host entries of the same name.
///
/// ```rust
/// use tapestry::{Context, Value};
///
/// let mut ctx = Context::new();
/// ctx.set("name", "Alice");
/// ctx.push_frame();
/// ctx.set("name", "Bob");
/// assert_eq!(ctx.get("name"), Some(&Value::from("Bob")));
/// ctx.pop_frame();
/// assert_eq!(ctx.get("name"), Some(&Value::from("Alice")));
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    frames: Vec<FxHashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    /// Set an entry in the innermost frame. Accepts any type that
    /// implements `Into<Value>`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Pop the innermost frame. The bottom frame is never removed.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.set(k, v);
        }
        ctx
    }
}
