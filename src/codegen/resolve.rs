//! Variable resolution code generation.

use crate::ast::path::VariablePath;

use super::CompilerState;
use super::instr::{Expr, ExprKind};

/// How a variable reference behaves when the variable is missing at
/// render time.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Missing variables abort the render.
    Strict,
    /// Missing variables produce `fallback`, or `None` without one.
    Lenient { fallback: Option<Expr> },
}

impl Resolution {
    pub fn lenient() -> Self {
        Resolution::Lenient { fallback: None }
    }

    pub fn lenient_with(fallback: Expr) -> Self {
        Resolution::Lenient {
            fallback: Some(fallback),
        }
    }

    /// Build from an ignore-failures flag. A fallback given alongside
    /// `ignore_errors == false` is dropped.
    pub fn from_flag(ignore_errors: bool, fallback: Option<Expr>) -> Self {
        if ignore_errors {
            Resolution::Lenient { fallback }
        } else {
            Resolution::Strict
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Resolution::Strict)
    }
}

/// Generate the expression that looks `path` up in the render context.
///
/// The path is interned in the state's instance-value table, so every
/// reference to the same path shares one descriptor. Strict resolution
/// becomes `descriptor.resolve(context)`; lenient resolution becomes
/// `exec.try_resolve(descriptor, context[, fallback])`.
///
/// A fallback is only passed through when it is truthy. A falsy literal
/// such as `""`, `0` or `false` is dropped and the missing variable
/// renders as `None` instead. Callers that need a falsy fallback to take
/// effect must apply it themselves, as the `default` filter does.
///
/// The returned expression has no position yet; the caller attaches the
/// one of the reference it compiled.
pub fn resolve(path: &VariablePath, state: &mut CompilerState, resolution: Resolution) -> Expr {
    let descriptor = state.intern(path);
    let context = state.context_expr();

    match resolution {
        Resolution::Strict => Expr::new(ExprKind::Resolve { descriptor, context }),
        Resolution::Lenient { fallback } => Expr::new(ExprKind::TryResolve {
            descriptor,
            context,
            fallback: fallback.filter(Expr::is_truthy).map(Box::new),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::span::SourcePos;
    use crate::ast::value::Value;
    use crate::codegen::instr::ContextRef;
    use crate::codegen::position::attach;

    fn path(s: &str) -> VariablePath {
        VariablePath::parse(s).unwrap()
    }

    #[test]
    fn test_strict_shape() {
        let mut state = CompilerState::new();
        let expr = resolve(&path("user.name"), &mut state, Resolution::Strict);
        let handle = state.ivars().get(&path("user.name")).unwrap();
        assert_eq!(
            expr.kind,
            ExprKind::Resolve {
                descriptor: handle,
                context: ContextRef
            }
        );
    }

    #[test]
    fn test_lenient_with_truthy_fallback() {
        let mut state = CompilerState::new();
        let fallback = attach(Expr::literal(Value::from("N/A")), &SourcePos::new(1, 20));
        let expr = resolve(
            &path("user.name"),
            &mut state,
            Resolution::lenient_with(fallback.clone()),
        );
        let ExprKind::TryResolve { fallback: got, .. } = expr.kind else {
            panic!("expected a lenient lookup, got {:?}", expr.kind);
        };
        assert_eq!(got.as_deref(), Some(&fallback));
    }

    #[test]
    fn test_falsy_fallback_is_dropped() {
        for falsy in [
            Value::from(""),
            Value::from(0i64),
            Value::Bool(false),
            Value::None,
            Value::Array(Vec::new()),
        ] {
            let mut state = CompilerState::new();
            let with_falsy = resolve(
                &path("x"),
                &mut state,
                Resolution::lenient_with(Expr::literal(falsy)),
            );
            let without = resolve(&path("x"), &mut state, Resolution::lenient());
            assert_eq!(with_falsy, without);
        }
    }

    #[test]
    fn test_computed_fallback_is_kept() {
        let mut state = CompilerState::new();
        let other = resolve(&path("other"), &mut state, Resolution::Strict);
        let expr = resolve(&path("x"), &mut state, Resolution::lenient_with(other));
        assert!(matches!(
            expr.kind,
            ExprKind::TryResolve { fallback: Some(_), .. }
        ));
    }

    #[test]
    fn test_from_flag_drops_fallback_when_strict() {
        let fallback = Expr::literal(Value::from("N/A"));
        assert_eq!(
            Resolution::from_flag(false, Some(fallback.clone())),
            Resolution::Strict
        );
        assert_eq!(
            Resolution::from_flag(true, Some(fallback.clone())),
            Resolution::lenient_with(fallback)
        );
    }

    #[test]
    fn test_shares_descriptor_across_modes() {
        let mut state = CompilerState::new();
        resolve(&path("a.b"), &mut state, Resolution::Strict);
        resolve(&path("a.b"), &mut state, Resolution::lenient());
        resolve(&path("a"), &mut state, Resolution::lenient());
        assert_eq!(state.ivars().len(), 2);
    }
}
