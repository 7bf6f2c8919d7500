//! Generated instructions.
//!
//! A compiled template body is a flat list of [`Stmt`]s run against an
//! explicit execution object and render context. Value-producing work is
//! expressed as [`Expr`] trees that statements consume.
//!
//! Every instruction carries one [`SourcePos`]. It starts out unknown and
//! is set exactly once by [`attach`](super::position::attach) right after
//! construction; nothing repositions an instruction after that.

use crate::ast::span::SourcePos;
use crate::ast::value::Value;

use super::ivars::DescriptorHandle;

/// Index into the compiled program's filter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterHandle(pub(crate) u32);

impl FilterHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The render context handed to [`Program::execute`](crate::Program::execute).
///
/// Resolution calls name their context operand explicitly through this
/// handle instead of relying on an ambient variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextRef;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub(super) pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A constant value.
    Literal(Value),

    /// `descriptor.resolve(context)`: strict lookup.
    Resolve {
        descriptor: DescriptorHandle,
        context: ContextRef,
    },

    /// `exec.try_resolve(descriptor, context[, fallback])`: lenient lookup.
    TryResolve {
        descriptor: DescriptorHandle,
        context: ContextRef,
        fallback: Option<Box<Expr>>,
    },

    /// `exec.apply_filter(filter, input[, arg])`. `input` is evaluated
    /// before `arg`.
    Filter {
        filter: FilterHandle,
        input: Box<Expr>,
        arg: Option<Box<Expr>>,
    },

    /// Boolean negation of the operand's truthiness.
    Not(Box<Expr>),
}

impl Expr {
    /// A new, not yet positioned expression.
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            pos: SourcePos::UNKNOWN,
        }
    }

    pub fn literal(value: Value) -> Self {
        Self::new(ExprKind::Literal(value))
    }

    pub fn pos(&self) -> SourcePos {
        self.pos
    }

    /// Compile-time truthiness of an expression used as a fallback.
    ///
    /// Literals follow [`Value::is_truthy`]; anything computed at render
    /// time counts as truthy.
    pub fn is_truthy(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(value) => value.is_truthy(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub(super) pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `exec.emit(value)`
    Emit(Expr),

    /// `exec.emit_text(text)`: literal template text, never escaped.
    Text(String),

    /// The first branch whose test is truthy runs; otherwise `orelse`.
    If {
        branches: Vec<Branch>,
        orelse: Vec<Stmt>,
    },

    /// Runs `body` once per item with `binding` set in a fresh frame, or
    /// `empty` when there are no items.
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
        empty: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub test: Expr,
    pub body: Vec<Stmt>,
}

impl Stmt {
    /// A new, not yet positioned statement.
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            pos: SourcePos::UNKNOWN,
        }
    }

    pub fn pos(&self) -> SourcePos {
        self.pos
    }
}

/// What compiling a construct produced: either something already in
/// statement form, or a value that still has to be emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Stmt(Stmt),
    Expr(Expr),
}

impl From<Stmt> for Fragment {
    fn from(stmt: Stmt) -> Self {
        Fragment::Stmt(stmt)
    }
}

impl From<Expr> for Fragment {
    fn from(expr: Expr) -> Self {
        Fragment::Expr(expr)
    }
}
