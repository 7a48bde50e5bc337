//! Alias replacement: substitute a select alias reference by the
//! expression it names.
//!
//! HAVING and GROUP BY cannot reference select aliases in the rendered
//! query language, so the aliased expression is inlined before
//! resolution. The substitute itself is never descended into.

use entiq_expr::{Expression, Predicate};

fn replaces(expr: &Expression, alias: &str) -> bool {
    matches!(expr, Expression::Path(path) if path.is_single() && path.head() == alias)
}

/// Replace every occurrence of `alias` (as a bare path) in the
/// expression with a copy of `substitute`.
pub fn replace_in_expression(expr: &mut Expression, alias: &str, substitute: &Expression) {
    if replaces(expr, alias) {
        *expr = substitute.clone();
        return;
    }
    match expr {
        Expression::Path(_)
        | Expression::Literal(_)
        | Expression::Parameter(_)
        | Expression::Subquery(_) => {}
        Expression::Function(call) => {
            for arg in &mut call.args {
                replace_in_expression(arg, alias, substitute);
            }
        }
        Expression::Binary { lhs, rhs, .. } => {
            replace_in_expression(lhs, alias, substitute);
            replace_in_expression(rhs, alias, substitute);
        }
        Expression::Neg(inner) => replace_in_expression(inner, alias, substitute),
        Expression::Case { whens, otherwise } => {
            for (when, then) in whens {
                replace_in_predicate(when, alias, substitute);
                replace_in_expression(then, alias, substitute);
            }
            if let Some(e) = otherwise {
                replace_in_expression(e, alias, substitute);
            }
        }
    }
}

/// Replace every occurrence of `alias` in the predicate tree.
pub fn replace_in_predicate(pred: &mut Predicate, alias: &str, substitute: &Expression) {
    match pred {
        Predicate::Compare { lhs, rhs, .. } => {
            replace_in_expression(lhs, alias, substitute);
            replace_in_expression(rhs, alias, substitute);
        }
        Predicate::Between {
            expr, lower, upper, ..
        } => {
            replace_in_expression(expr, alias, substitute);
            replace_in_expression(lower, alias, substitute);
            replace_in_expression(upper, alias, substitute);
        }
        Predicate::In { expr, items, .. } => {
            replace_in_expression(expr, alias, substitute);
            for item in items {
                replace_in_expression(item, alias, substitute);
            }
        }
        Predicate::Like { expr, pattern, .. } => {
            replace_in_expression(expr, alias, substitute);
            replace_in_expression(pattern, alias, substitute);
        }
        Predicate::IsNull { expr, .. } => replace_in_expression(expr, alias, substitute),
        Predicate::Exists { .. } => {}
        Predicate::And(parts) | Predicate::Or(parts) => {
            for part in parts {
                replace_in_predicate(part, alias, substitute);
            }
        }
        Predicate::Not(inner) => replace_in_predicate(inner, alias, substitute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entiq_expr::{parse_expression, parse_predicate};

    #[test]
    fn test_replaces_bare_alias_only() {
        let substitute = parse_expression("SUM(o.total)").unwrap();
        let mut pred = parse_predicate("total > 100 AND o.total > 1").unwrap();
        replace_in_predicate(&mut pred, "total", &substitute);
        assert_eq!(pred.to_string(), "SUM(o.total) > 100 AND o.total > 1");
    }

    #[test]
    fn test_does_not_recurse_into_substitute() {
        // A substitute containing the alias itself must not loop.
        let substitute = parse_expression("total + 1").unwrap();
        let mut expr = parse_expression("total * 2").unwrap();
        replace_in_expression(&mut expr, "total", &substitute);
        assert_eq!(expr.to_string(), "(total + 1) * 2");
    }

    #[test]
    fn test_dotted_paths_untouched() {
        let substitute = parse_expression("1").unwrap();
        let mut expr = parse_expression("x.total").unwrap();
        replace_in_expression(&mut expr, "total", &substitute);
        assert_eq!(expr.to_string(), "x.total");
    }
}
