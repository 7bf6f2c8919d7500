use super::instr::{Fragment, Stmt, StmtKind};
use super::position::attach;

/// Turn a compiled fragment into something that can sit in a statement
/// list.
///
/// Statements pass through untouched. A bare value becomes an emit of
/// that value, positioned where the value came from.
pub fn lower_to_statement(fragment: impl Into<Fragment>) -> Stmt {
    match fragment.into() {
        Fragment::Stmt(stmt) => stmt,
        Fragment::Expr(expr) => {
            let pos = expr.pos();
            attach(Stmt::new(StmtKind::Emit(expr)), &pos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::span::SourcePos;
    use crate::ast::value::Value;
    use crate::codegen::instr::Expr;

    #[test]
    fn test_wraps_expression_in_emit() {
        let expr = attach(Expr::literal(Value::from("hi")), &SourcePos::new(2, 4));
        let stmt = lower_to_statement(expr.clone());
        assert_eq!(stmt.kind, StmtKind::Emit(expr));
        assert_eq!(stmt.pos(), SourcePos::new(2, 4));
    }

    #[test]
    fn test_statement_passes_through() {
        let stmt = attach(Stmt::new(StmtKind::Text("x".into())), &SourcePos::new(1, 1));
        assert_eq!(lower_to_statement(stmt.clone()), stmt);
    }

    #[test]
    fn test_unknown_position_propagates() {
        let stmt = lower_to_statement(Expr::literal(Value::None));
        assert!(stmt.pos().is_unknown());
    }
}
