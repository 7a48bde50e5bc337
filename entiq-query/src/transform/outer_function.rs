//! `OUTER(path)` resolution.
//!
//! Inside a subquery, `OUTER(x)` addresses `x` against the parent
//! query's join structure. The rewrite replaces the call with the
//! resolved path. At the top level there is no parent to resolve
//! against, and the call is deliberately left untouched.

use entiq_expr::{Expression, PathExpression, Predicate};

use crate::error::{QueryError, QueryResult};

/// Resolution callback: resolve the path against the parent level and
/// return `true`, or return `false` when no parent exists.
pub(crate) type OuterResolver<'a> = dyn FnMut(&mut PathExpression) -> QueryResult<bool> + 'a;

fn rewrite(expr: &mut Expression, resolve: &mut OuterResolver<'_>) -> QueryResult<()> {
    if let Expression::Function(call) = expr {
        if call.is("OUTER") {
            if call.args.len() != 1 || !matches!(call.args[0], Expression::Path(_)) {
                return Err(QueryError::path(
                    "OUTER(...)",
                    "OUTER() takes exactly one path argument",
                ));
            }
            if let Expression::Path(path) = &mut call.args[0] {
                if resolve(path)? {
                    let resolved = path.clone();
                    *expr = Expression::Path(resolved);
                }
            }
            // Leave the call (and anything nested in it) alone when no
            // parent exists; never descend into nested OUTER() calls.
            return Ok(());
        }
    }
    match expr {
        Expression::Path(_)
        | Expression::Literal(_)
        | Expression::Parameter(_)
        | Expression::Subquery(_) => Ok(()),
        Expression::Function(call) => {
            for arg in &mut call.args {
                rewrite(arg, resolve)?;
            }
            Ok(())
        }
        Expression::Binary { lhs, rhs, .. } => {
            rewrite(lhs, resolve)?;
            rewrite(rhs, resolve)
        }
        Expression::Neg(inner) => rewrite(inner, resolve),
        Expression::Case { whens, otherwise } => {
            for (when, then) in whens {
                rewrite_in_predicate(when, resolve)?;
                rewrite(then, resolve)?;
            }
            if let Some(e) = otherwise {
                rewrite(e, resolve)?;
            }
            Ok(())
        }
    }
}

/// Rewrite every `OUTER()` call in an expression tree.
pub(crate) fn rewrite_in_expression(
    expr: &mut Expression,
    resolve: &mut OuterResolver<'_>,
) -> QueryResult<()> {
    rewrite(expr, resolve)
}

/// Rewrite every `OUTER()` call under a predicate.
pub(crate) fn rewrite_in_predicate(
    pred: &mut Predicate,
    resolve: &mut OuterResolver<'_>,
) -> QueryResult<()> {
    let mut result = Ok(());
    pred.walk_expressions_mut(&mut |expr| {
        if result.is_ok() {
            result = rewrite(expr, resolve);
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use entiq_expr::{PathBase, parse_predicate};

    #[test]
    fn test_outer_replaced_when_parent_exists() {
        let mut pred = parse_predicate("OUTER(o.total) > c.balance").unwrap();
        let mut resolve = |path: &mut PathExpression| {
            path.base = Some(PathBase::Join {
                node: 0,
                alias: "o".into(),
                property: Some("total".into()),
            });
            Ok(true)
        };
        rewrite_in_predicate(&mut pred, &mut resolve).unwrap();
        assert_eq!(pred.to_string(), "o.total > c.balance");
    }

    #[test]
    fn test_outer_left_untouched_without_parent() {
        let mut pred = parse_predicate("OUTER(o.total) > 1").unwrap();
        let mut resolve = |_: &mut PathExpression| Ok(false);
        rewrite_in_predicate(&mut pred, &mut resolve).unwrap();
        assert_eq!(pred.to_string(), "OUTER(o.total) > 1");
    }

    #[test]
    fn test_outer_requires_single_path_argument() {
        let mut pred = parse_predicate("OUTER(1 + 2) > 1").unwrap();
        let mut resolve = |_: &mut PathExpression| Ok(true);
        assert!(rewrite_in_predicate(&mut pred, &mut resolve).is_err());
    }
}
