use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Configuration for output escaping, resource limits and cancellation
/// during a render. Applies equally to compiled and interpreted templates.
///
/// Create with [`RenderOptions::new()`] and chain builder methods:
///
/// ```rust
/// use tapestry::RenderOptions;
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicBool;
///
/// let token = Arc::new(AtomicBool::new(false));
/// let opts = RenderOptions::new()
///     .autoescape(false)
///     .max_node_evaluations(10_000)
///     .max_iterations(1_000)
///     .cancellation_token(token);
/// ```
#[derive(Clone)]
pub struct RenderOptions {
    /// HTML-escape values emitted from `{{ ... }}`. Literal template text
    /// is never escaped. On by default.
    pub autoescape: bool,

    /// Maximum number of node (or statement) evaluations before the render
    /// fails with a [`ResourceLimit`](crate::RenderErrorKind::ResourceLimit)
    /// error. `None` means unlimited.
    pub max_node_evaluations: Option<u64>,

    /// Maximum number of loop iterations across all `for` blocks.
    /// `None` means unlimited.
    pub max_iterations: Option<u64>,

    /// An external flag that can be set to `true` to cancel an
    /// in-progress render. Checked on every node evaluation.
    pub cancellation_token: Option<Arc<AtomicBool>>,
}

impl RenderOptions {
    /// Create options with defaults: autoescaping on, no limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    pub fn max_node_evaluations(mut self, limit: u64) -> Self {
        self.max_node_evaluations = Some(limit);
        self
    }

    pub fn max_iterations(mut self, limit: u64) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Attach a cancellation token. Set the `AtomicBool` to `true` from
    /// another thread to abort rendering.
    pub fn cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation_token = Some(token);
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            autoescape: true,
            max_node_evaluations: None,
            max_iterations: None,
            cancellation_token: None,
        }
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("autoescape", &self.autoescape)
            .field("max_node_evaluations", &self.max_node_evaluations)
            .field("max_iterations", &self.max_iterations)
            .field("cancellation_token", &self.cancellation_token.is_some())
            .finish()
    }
}
