//! Rendering the AST back to query text.
//!
//! Path, parameter and subquery rendering is delegated through
//! [`ExpressionRenderer`] so the resolution engine can substitute join
//! aliases and nested builders; [`SourceRenderer`] prints the unresolved
//! source form for diagnostics and cache keys.

use crate::ast::{
    BinaryOp, Expression, Literal, ParamRef, PathExpression, Predicate,
};

/// Hooks for the pieces of an expression that only a resolver can print.
pub trait ExpressionRenderer {
    /// Write a path expression.
    fn write_path(&self, path: &PathExpression, out: &mut String);

    /// Write a parameter marker.
    fn write_parameter(&self, param: &ParamRef, out: &mut String) {
        match param {
            ParamRef::Named(name) => {
                out.push(':');
                out.push_str(name);
            }
            ParamRef::Positional(idx) => {
                out.push('?');
                out.push_str(&idx.to_string());
            }
        }
    }

    /// Write a subquery referenced by its opaque handle.
    fn write_subquery(&self, id: u32, out: &mut String);
}

/// Renders the unresolved source form: dotted paths, placeholder
/// subqueries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRenderer;

impl ExpressionRenderer for SourceRenderer {
    fn write_path(&self, path: &PathExpression, out: &mut String) {
        for (i, segment) in path.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(segment);
        }
    }

    fn write_subquery(&self, id: u32, out: &mut String) {
        out.push_str("(subquery ");
        out.push_str(&id.to_string());
        out.push(')');
    }
}

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Add | BinaryOp::Sub => 1,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 2,
    }
}

fn write_operand(
    expr: &Expression,
    parent: BinaryOp,
    rhs_side: bool,
    renderer: &dyn ExpressionRenderer,
    out: &mut String,
) {
    let needs_parens = match expr {
        Expression::Binary { op, .. } => {
            precedence(*op) < precedence(parent)
                || (rhs_side
                    && precedence(*op) == precedence(parent)
                    && matches!(parent, BinaryOp::Sub | BinaryOp::Div | BinaryOp::Mod))
        }
        _ => false,
    };
    if needs_parens {
        out.push('(');
        write_expression(expr, renderer, out);
        out.push(')');
    } else {
        write_expression(expr, renderer, out);
    }
}

/// Write a value expression through the given renderer.
pub fn write_expression(expr: &Expression, renderer: &dyn ExpressionRenderer, out: &mut String) {
    match expr {
        Expression::Path(path) => renderer.write_path(path, out),
        Expression::Literal(literal) => write_literal(literal, out),
        Expression::Parameter(param) => renderer.write_parameter(param, out),
        Expression::Function(call) => {
            out.push_str(&call.name);
            out.push('(');
            if call.args.is_empty() && call.is("COUNT") {
                out.push('*');
            } else {
                if call.distinct {
                    out.push_str("DISTINCT ");
                }
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_expression(arg, renderer, out);
                }
            }
            out.push(')');
        }
        Expression::Binary { op, lhs, rhs } => {
            write_operand(lhs, *op, false, renderer, out);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_operand(rhs, *op, true, renderer, out);
        }
        Expression::Neg(inner) => {
            out.push('-');
            match inner.as_ref() {
                Expression::Binary { .. } => {
                    out.push('(');
                    write_expression(inner, renderer, out);
                    out.push(')');
                }
                _ => write_expression(inner, renderer, out),
            }
        }
        Expression::Case { whens, otherwise } => {
            out.push_str("CASE");
            for (when, then) in whens {
                out.push_str(" WHEN ");
                write_predicate(when, renderer, out);
                out.push_str(" THEN ");
                write_expression(then, renderer, out);
            }
            if let Some(expr) = otherwise {
                out.push_str(" ELSE ");
                write_expression(expr, renderer, out);
            }
            out.push_str(" END");
        }
        Expression::Subquery(id) => renderer.write_subquery(*id, out),
    }
}

fn write_literal(literal: &Literal, out: &mut String) {
    match literal {
        Literal::Null => out.push_str("NULL"),
        Literal::Boolean(true) => out.push_str("TRUE"),
        Literal::Boolean(false) => out.push_str("FALSE"),
        Literal::Integer(i) => out.push_str(&i.to_string()),
        Literal::Float(f) => out.push_str(&f.to_string()),
        Literal::String(s) => {
            out.push('\'');
            out.push_str(s);
            out.push('\'');
        }
    }
}

/// Write a predicate tree through the given renderer.
pub fn write_predicate(pred: &Predicate, renderer: &dyn ExpressionRenderer, out: &mut String) {
    match pred {
        Predicate::Compare { op, lhs, rhs } => {
            write_expression(lhs, renderer, out);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_expression(rhs, renderer, out);
        }
        Predicate::Between {
            expr,
            lower,
            upper,
            negated,
        } => {
            write_expression(expr, renderer, out);
            if *negated {
                out.push_str(" NOT");
            }
            out.push_str(" BETWEEN ");
            write_expression(lower, renderer, out);
            out.push_str(" AND ");
            write_expression(upper, renderer, out);
        }
        Predicate::In {
            expr,
            items,
            negated,
        } => {
            write_expression(expr, renderer, out);
            if *negated {
                out.push_str(" NOT");
            }
            out.push_str(" IN ");
            // A single collection-valued parameter renders without parens.
            if let [Expression::Parameter(param)] = items.as_slice() {
                renderer.write_parameter(param, out);
            } else {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_expression(item, renderer, out);
                }
                out.push(')');
            }
        }
        Predicate::Like {
            expr,
            pattern,
            negated,
        } => {
            write_expression(expr, renderer, out);
            if *negated {
                out.push_str(" NOT");
            }
            out.push_str(" LIKE ");
            write_expression(pattern, renderer, out);
        }
        Predicate::IsNull { expr, negated } => {
            write_expression(expr, renderer, out);
            if *negated {
                out.push_str(" IS NOT NULL");
            } else {
                out.push_str(" IS NULL");
            }
        }
        Predicate::Exists { subquery, negated } => {
            if *negated {
                out.push_str("NOT ");
            }
            out.push_str("EXISTS ");
            renderer.write_subquery(*subquery, out);
        }
        Predicate::And(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" AND ");
                }
                if matches!(part, Predicate::Or(_)) {
                    out.push('(');
                    write_predicate(part, renderer, out);
                    out.push(')');
                } else {
                    write_predicate(part, renderer, out);
                }
            }
        }
        Predicate::Or(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" OR ");
                }
                write_predicate(part, renderer, out);
            }
        }
        Predicate::Not(inner) => {
            out.push_str("NOT (");
            write_predicate(inner, renderer, out);
            out.push(')');
        }
    }
}

/// Render an expression in its unresolved source form.
pub fn expression_to_string(expr: &Expression) -> String {
    let mut out = String::new();
    write_expression(expr, &SourceRenderer, &mut out);
    out
}

/// Render a predicate in its unresolved source form.
pub fn predicate_to_string(pred: &Predicate) -> String {
    let mut out = String::new();
    write_predicate(pred, &SourceRenderer, &mut out);
    out
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&expression_to_string(self))
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&predicate_to_string(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_predicate};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_simple() {
        let expr = parse_expression("o.total + tax.rate * 2").unwrap();
        assert_eq!(expression_to_string(&expr), "o.total + tax.rate * 2");
    }

    #[test]
    fn test_parens_preserved_when_needed() {
        let expr = parse_expression("(a + b) * 2").unwrap();
        assert_eq!(expression_to_string(&expr), "(a + b) * 2");
    }

    #[test]
    fn test_predicate_round_trip() {
        let pred = parse_predicate("(a = 1 OR b = 2) AND c IS NOT NULL").unwrap();
        assert_eq!(
            predicate_to_string(&pred),
            "(a = 1 OR b = 2) AND c IS NOT NULL"
        );
    }

    #[test]
    fn test_count_star_renders() {
        let expr = parse_expression("COUNT(*)").unwrap();
        assert_eq!(expression_to_string(&expr), "COUNT(*)");
    }

    #[test]
    fn test_in_parameter_renders_bare() {
        let pred = parse_predicate("o.status IN :statuses").unwrap();
        assert_eq!(predicate_to_string(&pred), "o.status IN :statuses");
    }

    #[test]
    fn test_case_renders() {
        let expr =
            parse_expression("CASE WHEN o.total > 100 THEN 'big' ELSE 'small' END").unwrap();
        assert_eq!(
            expression_to_string(&expr),
            "CASE WHEN o.total > 100 THEN 'big' ELSE 'small' END"
        );
    }
}
