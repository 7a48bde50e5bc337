//! `SIZE(collection)` rewriting.
//!
//! `SIZE()` has no direct equivalent across joins, so outside the
//! specially handled SELECT case every call becomes a correlated scalar
//! count subquery. Subquery construction is supplied by the caller as a
//! callback, which also deduplicates subqueries by absolute path.

use std::ops::ControlFlow;

use entiq_expr::{Expression, PathExpression, Predicate};

use crate::error::{QueryError, QueryResult};

/// Subquery factory: turn a collection path into an opaque subquery
/// handle.
pub(crate) type SizeSubqueryFactory<'a> =
    dyn FnMut(&PathExpression) -> QueryResult<u32> + 'a;

/// Whether the expression contains a `SIZE()` call.
pub(crate) fn contains_size(expr: &Expression) -> bool {
    expr.visit(&mut |e| match e {
        Expression::Function(call) if call.is("SIZE") => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    })
    .is_break()
}

/// Whether the expression is exactly one `SIZE(path)` call.
pub(crate) fn as_plain_size(expr: &Expression) -> Option<&PathExpression> {
    match expr {
        Expression::Function(call) if call.is("SIZE") => match call.args.as_slice() {
            [Expression::Path(path)] => Some(path),
            _ => None,
        },
        _ => None,
    }
}

fn rewrite(expr: &mut Expression, make: &mut SizeSubqueryFactory<'_>) -> QueryResult<()> {
    if let Expression::Function(call) = expr {
        if call.is("SIZE") {
            let path = match call.args.as_slice() {
                [Expression::Path(path)] => path.clone(),
                _ => {
                    return Err(QueryError::path(
                        "SIZE(...)",
                        "SIZE() takes exactly one collection path argument",
                    ));
                }
            };
            let id = make(&path)?;
            *expr = Expression::Subquery(id);
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
                rewrite(arg, make)?;
            }
            Ok(())
        }
        Expression::Binary { lhs, rhs, .. } => {
            rewrite(lhs, make)?;
            rewrite(rhs, make)
        }
        Expression::Neg(inner) => rewrite(inner, make),
        Expression::Case { whens, otherwise } => {
            for (when, then) in whens {
                rewrite_in_predicate(when, make)?;
                rewrite(then, make)?;
            }
            if let Some(e) = otherwise {
                rewrite(e, make)?;
            }
            Ok(())
        }
    }
}

/// Rewrite every `SIZE()` call in an expression tree.
pub(crate) fn rewrite_in_expression(
    expr: &mut Expression,
    make: &mut SizeSubqueryFactory<'_>,
) -> QueryResult<()> {
    rewrite(expr, make)
}

/// Rewrite every `SIZE()` call under a predicate.
pub(crate) fn rewrite_in_predicate(
    pred: &mut Predicate,
    make: &mut SizeSubqueryFactory<'_>,
) -> QueryResult<()> {
    let mut result = Ok(());
    pred.walk_expressions_mut(&mut |expr| {
        if result.is_ok() {
            result = rewrite(expr, make);
        }
    });
    result
}
