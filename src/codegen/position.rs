//! Source position tracking for generated instructions.

use crate::ast::span::{SourcePos, Spanned};

use super::instr::{Expr, Stmt};

/// Anything that can lend its template position to an instruction.
pub trait Located {
    fn source_pos(&self) -> Option<SourcePos>;
}

impl<T> Located for Spanned<T> {
    fn source_pos(&self) -> Option<SourcePos> {
        self.pos
    }
}

impl Located for Expr {
    fn source_pos(&self) -> Option<SourcePos> {
        Some(self.pos)
    }
}

impl Located for Stmt {
    fn source_pos(&self) -> Option<SourcePos> {
        Some(self.pos)
    }
}

impl Located for SourcePos {
    fn source_pos(&self) -> Option<SourcePos> {
        Some(*self)
    }
}

impl Located for Option<SourcePos> {
    fn source_pos(&self) -> Option<SourcePos> {
        *self
    }
}

/// A generated instruction that carries a position.
pub trait Positioned {
    fn set_pos(&mut self, pos: SourcePos);
}

impl Positioned for Expr {
    fn set_pos(&mut self, pos: SourcePos) {
        self.pos = pos;
    }
}

impl Positioned for Stmt {
    fn set_pos(&mut self, pos: SourcePos) {
        self.pos = pos;
    }
}

/// Copy `source`'s position onto `instruction`, or `(0, 0)` if it has none.
///
/// Overwrites whatever position the instruction had. Call it once, right
/// after building the instruction, with the source responsible for it.
pub fn attach<I: Positioned>(mut instruction: I, source: &impl Located) -> I {
    instruction.set_pos(source.source_pos().unwrap_or(SourcePos::UNKNOWN));
    instruction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::template::NodeKind;
    use crate::ast::value::Value;
    use crate::codegen::instr::StmtKind;

    #[test]
    fn test_copies_node_position() {
        let node = Spanned::new(NodeKind::Text("x".into()), SourcePos::new(3, 9));
        let stmt = attach(Stmt::new(StmtKind::Text("x".into())), &node);
        assert_eq!(stmt.pos(), SourcePos::new(3, 9));
    }

    #[test]
    fn test_synthetic_source_gives_unknown() {
        let node = Spanned::synthetic(NodeKind::Comment);
        let expr = attach(Expr::literal(Value::None), &node);
        assert_eq!(expr.pos(), SourcePos::UNKNOWN);
    }

    #[test]
    fn test_overwrites_previous_position() {
        let expr = attach(Expr::literal(Value::None), &SourcePos::new(1, 1));
        let expr = attach(expr, &None::<SourcePos>);
        assert_eq!(expr.pos(), SourcePos::UNKNOWN);
    }

    #[test]
    fn test_idempotent() {
        let source = SourcePos::new(4, 2);
        let once = attach(Expr::literal(Value::from("a")), &source);
        let twice = attach(attach(Expr::literal(Value::from("a")), &source), &source);
        assert_eq!(once, twice);
    }
}
