//! Rendering a query core to its final string form.
//!
//! The resolving generator prints resolved paths under their join
//! aliases and inlines pre-rendered subqueries; statement assembly emits
//! the clauses in order with joins sorted by their dependencies.

use tracing::debug;

use entiq_expr::{
    Expression, ExpressionRenderer, PathBase, PathExpression, write_expression, write_predicate,
};

use crate::core::{QueryCore, StatementKind};
use crate::error::{QueryError, QueryResult};
use crate::param::ParamBinding;

/// The rendered query string plus its parameter bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    /// The query string in the provider's query language.
    pub query: String,
    /// Parameter bindings in registration order.
    pub parameters: Vec<ParamBinding>,
}

/// Renders resolved ASTs: paths by their join alias, subqueries from a
/// pre-rendered table.
struct ResolvingGenerator<'a> {
    subqueries: &'a [String],
}

impl ExpressionRenderer for ResolvingGenerator<'_> {
    fn write_path(&self, path: &PathExpression, out: &mut String) {
        match &path.base {
            Some(PathBase::Join {
                alias, property, ..
            }) => {
                out.push_str(alias);
                if let Some(property) = property {
                    out.push('.');
                    out.push_str(property);
                }
            }
            Some(PathBase::SelectAlias) => out.push_str(path.head()),
            // Unresolved paths should not survive to rendering; print
            // the source form so the defect is visible in output.
            None => out.push_str(&path.dotted()),
        }
    }

    fn write_subquery(&self, id: u32, out: &mut String) {
        out.push('(');
        out.push_str(&self.subqueries[id as usize]);
        out.push(')');
    }
}

/// Render an already-resolved expression without subquery context.
pub(crate) fn resolved_expr_text(expr: &Expression) -> String {
    let generator = ResolvingGenerator { subqueries: &[] };
    let mut out = String::new();
    write_expression(expr, &generator, &mut out);
    out
}

/// Render a core to its query string.
pub(crate) fn render_query(core: &QueryCore) -> QueryResult<String> {
    core.verify_builders_ended()?;

    let mut subqueries = Vec::with_capacity(core.subqueries.len());
    for subquery in &core.subqueries {
        subqueries.push(render_query(subquery)?);
    }
    let generator = ResolvingGenerator {
        subqueries: &subqueries,
    };

    let mut out = String::new();
    write_with_clause(core, &mut out)?;
    write_body(core, &generator, &mut out)?;

    for set_op in &core.set_ops {
        out.push(' ');
        out.push_str(set_op.operator.as_sql());
        out.push_str(" (");
        out.push_str(&render_query(&set_op.operand)?);
        out.push(')');
    }

    debug!(query = %out, "rendered query");
    Ok(out)
}

/// Render a core with its parameter bindings.
pub(crate) fn rendered(core: &QueryCore) -> QueryResult<RenderedQuery> {
    Ok(RenderedQuery {
        query: render_query(core)?,
        parameters: core.params.bindings(),
    })
}

fn write_with_clause(core: &QueryCore, out: &mut String) -> QueryResult<()> {
    if core.ctes.is_empty() {
        return Ok(());
    }
    out.push_str("WITH ");
    if core.ctes.iter().any(|cte| cte.recursive) {
        out.push_str("RECURSIVE ");
    }
    for (i, cte) in core.ctes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&cte.name);
        out.push('(');
        for (j, column) in cte.columns.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            out.push_str(column);
        }
        out.push_str(") AS (");
        out.push_str(&render_query(&cte.query)?);
        if let Some(recursive) = &cte.recursive_query {
            out.push(' ');
            out.push_str(if cte.union_all { "UNION ALL" } else { "UNION" });
            out.push(' ');
            out.push_str(&render_query(recursive)?);
        }
        out.push(')');
    }
    out.push(' ');
    Ok(())
}

fn write_body(
    core: &QueryCore,
    generator: &ResolvingGenerator<'_>,
    out: &mut String,
) -> QueryResult<()> {
    match core.kind {
        StatementKind::Select => {
            write_select_head(core, generator, out);
            write_from(core, generator, out)?;
            write_tail(core, generator, out);
        }
        StatementKind::Update => {
            out.push_str("UPDATE ");
            out.push_str(core.root_entity());
            out.push(' ');
            out.push_str(core.root_alias());
            out.push_str(" SET ");
            for (i, (path, value)) in core.sets.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                generator.write_path(path, out);
                out.push_str(" = ");
                write_expression(core.arena.expr(*value), generator, out);
            }
            write_where(core, generator, out);
        }
        StatementKind::Delete => {
            out.push_str("DELETE FROM ");
            out.push_str(core.root_entity());
            out.push(' ');
            out.push_str(core.root_alias());
            write_where(core, generator, out);
        }
        StatementKind::Insert => {
            let binder = core.insert_target.as_ref().ok_or_else(|| {
                QueryError::InvalidStatement("INSERT statement has no target".to_string())
            })?;
            if binder.len() != core.select.items().len() {
                return Err(QueryError::InvalidStatement(format!(
                    "INSERT binds {} column(s) but selects {} expression(s)",
                    binder.len(),
                    core.select.items().len()
                )));
            }
            if binder.is_empty() {
                return Err(QueryError::InvalidStatement(
                    "INSERT statement binds no columns".to_string(),
                ));
            }
            out.push_str("INSERT INTO ");
            out.push_str(binder.entity());
            out.push('(');
            for (i, column) in binder.columns().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(column);
            }
            out.push_str(") ");
            write_select_head(core, generator, out);
            write_from(core, generator, out)?;
            write_tail(core, generator, out);
        }
    }
    Ok(())
}

fn write_select_head(core: &QueryCore, generator: &ResolvingGenerator<'_>, out: &mut String) {
    out.push_str("SELECT ");
    if core.select.is_distinct() {
        out.push_str("DISTINCT ");
    }
    if core.select.is_empty() {
        out.push_str(core.root_alias());
        return;
    }
    for (i, item) in core.select.items().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expression(core.arena.expr(item.expr), generator, out);
        if let Some(alias) = &item.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
    }
}

fn write_from(
    core: &QueryCore,
    generator: &ResolvingGenerator<'_>,
    out: &mut String,
) -> QueryResult<()> {
    let root = core.joins.node(core.joins.root());
    out.push_str(" FROM ");
    match &root.correlation {
        Some(correlation) => out.push_str(correlation),
        None => out.push_str(&root.entity),
    }
    out.push(' ');
    out.push_str(&root.alias);

    for id in core.joins.ordered_join_nodes()? {
        let node = core.joins.node(id);
        let parent = node.parent.expect("non-root join node has a parent");
        out.push(' ');
        out.push_str(node.join_type.as_sql());
        out.push(' ');
        out.push_str(&core.joins.node(parent).alias);
        out.push('.');
        out.push_str(
            node.parent_attribute
                .as_deref()
                .expect("non-root join node joins an attribute"),
        );
        out.push(' ');
        out.push_str(&node.alias);
        if let Some(on) = node.on {
            out.push_str(" ON ");
            write_predicate(core.arena.pred(on), generator, out);
        }
    }
    Ok(())
}

fn write_where(core: &QueryCore, generator: &ResolvingGenerator<'_>, out: &mut String) {
    if let Some(root) = core.where_clause.root() {
        out.push_str(" WHERE ");
        write_predicate(core.arena.pred(root), generator, out);
    }
}

fn write_tail(core: &QueryCore, generator: &ResolvingGenerator<'_>, out: &mut String) {
    write_where(core, generator, out);

    if !core.group_by.is_empty() {
        out.push_str(" GROUP BY ");
        for (i, entry) in core.group_by.entries().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&entry.text);
        }
    }

    if let Some(root) = core.having.root() {
        out.push_str(" HAVING ");
        write_predicate(core.arena.pred(root), generator, out);
    }

    if !core.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        for (i, element) in core.order_by.elements().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_expression(core.arena.expr(element.expr), generator, out);
            out.push_str(if element.ascending { " ASC" } else { " DESC" });
            out.push_str(if element.nulls_first {
                " NULLS FIRST"
            } else {
                " NULLS LAST"
            });
        }
    }

    if let Some(limit) = core.limit {
        out.push_str(" LIMIT ");
        out.push_str(&limit.to_string());
    }
    if let Some(offset) = core.offset {
        out.push_str(" OFFSET ");
        out.push_str(&offset.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entiq_expr::parse_expression;

    #[test]
    fn test_resolved_text_falls_back_to_source_form() {
        let expr = parse_expression("a.b + 1").unwrap();
        assert_eq!(resolved_expr_text(&expr), "a.b + 1");
    }

    #[test]
    fn test_resolved_text_uses_base_alias() {
        let mut expr = parse_expression("o.customer.name").unwrap();
        if let Expression::Path(path) = &mut expr {
            path.base = Some(PathBase::Join {
                node: 1,
                alias: "customer_1".into(),
                property: Some("name".into()),
            });
        }
        assert_eq!(resolved_expr_text(&expr), "customer_1.name");
    }
}
