//! Conjunctive-context classification of path occurrences.
//!
//! A path traversed only under AND conjunctions can safely share an
//! inner join; a path under OR, a negated AND, or a null-aware function
//! (`IS NULL`, `COALESCE`, `NULLIF`) makes cardinality-zero rows
//! observable, so the join must be tagged cardinality-sensitive.

use std::collections::HashSet;
use std::ops::ControlFlow;

use entiq_expr::{Expression, Predicate};

/// Context classification of one path occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathContext {
    /// Only reachable through AND conjunctions.
    Conjunctive,
    /// Reachable under OR, negation, or a null-aware construct.
    Disjunctive,
}

const NULL_AWARE: &[&str] = &["COALESCE", "NULLIF"];

fn collect_expr(expr: &Expression, disjunctive: bool, out: &mut HashSet<String>) {
    let _ = expr.visit::<()>(&mut |e| {
        match e {
            Expression::Path(path) if disjunctive => {
                out.insert(path.dotted());
            }
            Expression::Function(call) if NULL_AWARE.iter().any(|name| call.is(name)) => {
                // Everything under a null-aware call is disjunctive,
                // whatever the surrounding context.
                for arg in &call.args {
                    collect_expr(arg, true, out);
                }
                return ControlFlow::Continue(());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    });
}

fn collect_pred(pred: &Predicate, disjunctive: bool, negated: bool, out: &mut HashSet<String>) {
    match pred {
        Predicate::And(parts) => {
            // A negated AND is an OR of negations.
            let child_disjunctive = disjunctive || negated;
            for part in parts {
                collect_pred(part, child_disjunctive, negated, out);
            }
        }
        Predicate::Or(parts) => {
            for part in parts {
                collect_pred(part, true, negated, out);
            }
        }
        Predicate::Not(inner) => collect_pred(inner, disjunctive, !negated, out),
        Predicate::IsNull { expr, .. } => {
            // Null checks observe cardinality regardless of context.
            collect_expr(expr, true, out);
        }
        other => {
            let effective = disjunctive || negated;
            match other {
                Predicate::Compare { lhs, rhs, .. } => {
                    collect_expr(lhs, effective, out);
                    collect_expr(rhs, effective, out);
                }
                Predicate::Between {
                    expr, lower, upper, ..
                } => {
                    collect_expr(expr, effective, out);
                    collect_expr(lower, effective, out);
                    collect_expr(upper, effective, out);
                }
                Predicate::In { expr, items, .. } => {
                    collect_expr(expr, effective, out);
                    for item in items {
                        collect_expr(item, effective, out);
                    }
                }
                Predicate::Like { expr, pattern, .. } => {
                    collect_expr(expr, effective, out);
                    collect_expr(pattern, effective, out);
                }
                Predicate::Exists { .. } => {}
                Predicate::And(_) | Predicate::Or(_) | Predicate::Not(_) | Predicate::IsNull { .. } => {
                    unreachable!("handled above")
                }
            }
        }
    }
}

/// The dotted forms of every path that occurs in a disjunctive or
/// null-aware position of the predicate.
pub fn disjunctive_paths(pred: &Predicate) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_pred(pred, false, false, &mut out);
    out
}

/// Classify one target path's occurrence context within a predicate.
///
/// Returns `None` when the path does not occur at all.
pub fn classify_path(pred: &Predicate, dotted: &str) -> Option<PathContext> {
    let disjunctive = disjunctive_paths(pred);
    if disjunctive.contains(dotted) {
        return Some(PathContext::Disjunctive);
    }
    let occurs = pred
        .visit_expressions(&mut |e| match e {
            Expression::Path(path) if path.dotted() == dotted => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        })
        .is_break();
    occurs.then_some(PathContext::Conjunctive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entiq_expr::parse_predicate;

    #[test]
    fn test_and_only_is_conjunctive() {
        let pred = parse_predicate("a.x = 1 AND a.y = 2").unwrap();
        assert_eq!(classify_path(&pred, "a.x"), Some(PathContext::Conjunctive));
        assert_eq!(classify_path(&pred, "a.y"), Some(PathContext::Conjunctive));
        assert_eq!(classify_path(&pred, "a.z"), None);
    }

    #[test]
    fn test_or_is_disjunctive() {
        let pred = parse_predicate("a.x = 1 OR a.y = 2").unwrap();
        assert_eq!(classify_path(&pred, "a.x"), Some(PathContext::Disjunctive));
    }

    #[test]
    fn test_and_nested_under_or_is_disjunctive() {
        let pred = parse_predicate("(a.x = 1 AND a.y = 2) OR a.z = 3").unwrap();
        assert_eq!(classify_path(&pred, "a.y"), Some(PathContext::Disjunctive));
    }

    #[test]
    fn test_negated_and_is_disjunctive() {
        let pred = parse_predicate("NOT (a.x = 1 AND a.y = 2)").unwrap();
        assert_eq!(classify_path(&pred, "a.x"), Some(PathContext::Disjunctive));
    }

    #[test]
    fn test_is_null_is_always_disjunctive() {
        let pred = parse_predicate("a.x IS NULL AND a.y = 2").unwrap();
        assert_eq!(classify_path(&pred, "a.x"), Some(PathContext::Disjunctive));
        assert_eq!(classify_path(&pred, "a.y"), Some(PathContext::Conjunctive));
    }

    #[test]
    fn test_null_aware_function_is_disjunctive() {
        let pred = parse_predicate("COALESCE(a.x, 0) = 1 AND a.y = 2").unwrap();
        assert_eq!(classify_path(&pred, "a.x"), Some(PathContext::Disjunctive));
        assert_eq!(classify_path(&pred, "a.y"), Some(PathContext::Conjunctive));

        let pred = parse_predicate("NULLIF(a.x, 1) = 1").unwrap();
        assert_eq!(classify_path(&pred, "a.x"), Some(PathContext::Disjunctive));
    }
}
