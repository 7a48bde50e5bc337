//! Aggregate detection: abortable walks answering whether an expression
//! needs GROUP BY treatment or may itself appear in a GROUP BY clause.

use std::ops::ControlFlow;

use entiq_expr::Expression;

const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Whether the expression contains an aggregate function call.
///
/// The walk stops at the first hit.
pub fn contains_aggregate(expr: &Expression) -> bool {
    expr.visit(&mut |e| match e {
        Expression::Function(call) if AGGREGATES.iter().any(|name| call.is(name)) => {
            ControlFlow::Break(())
        }
        _ => ControlFlow::Continue(()),
    })
    .is_break()
}

/// Whether the expression may appear in a GROUP BY clause: neither an
/// aggregate nor a subquery anywhere in the tree.
pub fn is_group_by_usable(expr: &Expression) -> bool {
    expr.visit(&mut |e| match e {
        Expression::Function(call) if AGGREGATES.iter().any(|name| call.is(name)) => {
            ControlFlow::Break(())
        }
        Expression::Subquery(_) => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    })
    .is_continue()
}
