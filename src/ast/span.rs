use std::fmt;

/// Byte-offset range into source text.
///
/// Used by the parser for diagnostics. Nodes carry the friendlier
/// [`SourcePos`] derived from the start of their span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Merge two spans into one covering both ranges
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A 1-based (line, column) position in template source.
///
/// `(0, 0)` is reserved for "unknown" and is what generated instructions
/// carry when no source node could supply a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub const UNKNOWN: SourcePos = SourcePos { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Compute the position of a byte offset within `source`.
    ///
    /// Columns count characters, not bytes.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (i, ch) in source.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Wraps any AST item with an optional source position.
///
/// Items built by the parser always have `Some`; items synthesized by
/// the compiler or by hand in tests may have `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub pos: Option<SourcePos>,
}

impl<T> Spanned<T> {
    pub fn new(node: T, pos: SourcePos) -> Self {
        Self {
            node,
            pos: Some(pos),
        }
    }

    /// Build an item that did not come from template text.
    pub fn synthetic(node: T) -> Self {
        Self { node, pos: None }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            pos: self.pos,
        }
    }
}
