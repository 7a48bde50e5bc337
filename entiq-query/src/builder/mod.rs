//! The fluent builder surface.
//!
//! [`QueryBuilder`] is the caller-facing handle for one statement; the
//! sub-builder types in this module (predicate groups, ON clauses,
//! subqueries, CTEs, set operands) each borrow the parent exclusively
//! while open and return control through their `end()`.

mod cte;
mod join_on;
mod predicate;
mod set_op;
mod subquery;

pub use cte::CteBuilder;
pub use join_on::OnBuilder;
pub use predicate::OrGroupBuilder;
pub use set_op::SetOperandBuilder;
pub use subquery::{SubqueryBuilder, SubqueryInitiator};

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::clause::ClauseKind;
use crate::core::{QueryCore, StatementKind};
use crate::error::{QueryError, QueryResult};
use crate::join::JoinType;
use crate::param::{ParamValue, TransformerCache};
use crate::render::{self, RenderedQuery};
use crate::set_ops::SetOperator;

/// A fluent builder for one statement.
///
/// Created through [`QueryFactory`](crate::factory::QueryFactory); every
/// method validates eagerly, so a failed call leaves the builder in an
/// unspecified state that must be discarded.
#[derive(Debug)]
pub struct QueryBuilder {
    pub(crate) core: QueryCore,
    pub(crate) transformers: Arc<TransformerCache>,
}

impl QueryBuilder {
    pub(crate) fn new(core: QueryCore, transformers: Arc<TransformerCache>) -> Self {
        Self { core, transformers }
    }

    // -----------------------------------------------------------------
    // Projection
    // -----------------------------------------------------------------

    /// Add a select item.
    pub fn select(&mut self, expression: &str) -> QueryResult<&mut Self> {
        self.core.add_select(expression, None, None)?;
        Ok(self)
    }

    /// Add a select item under an alias usable elsewhere in the query.
    pub fn select_as(&mut self, expression: &str, alias: &str) -> QueryResult<&mut Self> {
        self.core.add_select(expression, Some(alias.into()), None)?;
        Ok(self)
    }

    /// Mark the projection DISTINCT.
    pub fn distinct(&mut self) -> &mut Self {
        self.core.set_distinct(true);
        self
    }

    // -----------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------

    /// AND a predicate string into the WHERE clause.
    pub fn r#where(&mut self, predicate: &str) -> QueryResult<&mut Self> {
        self.core.where_and(predicate, None)?;
        Ok(self)
    }

    /// Open a disjunctive WHERE group; finish it with
    /// [`OrGroupBuilder::end`].
    pub fn where_or(&mut self) -> QueryResult<OrGroupBuilder<'_>> {
        OrGroupBuilder::open(self, ClauseKind::Where)
    }

    /// AND a predicate string into the HAVING clause.
    pub fn having(&mut self, predicate: &str) -> QueryResult<&mut Self> {
        self.core.having_and(predicate, None)?;
        Ok(self)
    }

    /// Open a disjunctive HAVING group.
    pub fn having_or(&mut self) -> QueryResult<OrGroupBuilder<'_>> {
        OrGroupBuilder::open(self, ClauseKind::Having)
    }

    /// Open an `EXISTS` subquery ANDed into the WHERE clause.
    pub fn where_exists(&mut self) -> QueryResult<SubqueryInitiator<'_>> {
        SubqueryInitiator::open(self, false)
    }

    /// Open a `NOT EXISTS` subquery ANDed into the WHERE clause.
    pub fn where_not_exists(&mut self) -> QueryResult<SubqueryInitiator<'_>> {
        SubqueryInitiator::open(self, true)
    }

    // -----------------------------------------------------------------
    // Grouping and ordering
    // -----------------------------------------------------------------

    /// Add a GROUP BY entry (duplicates by resolved text are dropped).
    pub fn group_by(&mut self, expression: &str) -> QueryResult<&mut Self> {
        self.core.add_group_by(expression, None)?;
        Ok(self)
    }

    /// Add an ORDER BY element.
    pub fn order_by(
        &mut self,
        expression: &str,
        ascending: bool,
        nulls_first: bool,
    ) -> QueryResult<&mut Self> {
        self.core
            .add_order_by(expression, ascending, nulls_first, None)?;
        Ok(self)
    }

    /// Add an ascending ORDER BY element (nulls last).
    pub fn order_by_asc(&mut self, expression: &str) -> QueryResult<&mut Self> {
        self.order_by(expression, true, false)
    }

    /// Add a descending ORDER BY element (nulls last).
    pub fn order_by_desc(&mut self, expression: &str) -> QueryResult<&mut Self> {
        self.order_by(expression, false, false)
    }

    // -----------------------------------------------------------------
    // Joins
    // -----------------------------------------------------------------

    /// Declare an aliased inner join.
    pub fn inner_join(&mut self, path: &str, alias: &str) -> QueryResult<&mut Self> {
        self.core.add_join(path, alias, JoinType::Inner, false)?;
        Ok(self)
    }

    /// Declare an aliased left join.
    pub fn left_join(&mut self, path: &str, alias: &str) -> QueryResult<&mut Self> {
        self.core.add_join(path, alias, JoinType::Left, false)?;
        Ok(self)
    }

    /// Declare an aliased right join.
    pub fn right_join(&mut self, path: &str, alias: &str) -> QueryResult<&mut Self> {
        self.core.add_join(path, alias, JoinType::Right, false)?;
        Ok(self)
    }

    /// Declare an aliased join that also serves as the relation's
    /// default; fails when a default join already exists.
    pub fn join_default(
        &mut self,
        path: &str,
        alias: &str,
        join_type: JoinType,
    ) -> QueryResult<&mut Self> {
        self.core.add_join(path, alias, join_type, true)?;
        Ok(self)
    }

    /// Declare an aliased join and open its ON-clause builder.
    pub fn join_on(
        &mut self,
        path: &str,
        alias: &str,
        join_type: JoinType,
    ) -> QueryResult<OnBuilder<'_>> {
        OnBuilder::open(self, path, alias, join_type)
    }

    // -----------------------------------------------------------------
    // CTEs and set operations
    // -----------------------------------------------------------------

    /// Open a CTE builder for the given target entity.
    pub fn with(&mut self, entity: &str) -> QueryResult<CteBuilder<'_>> {
        CteBuilder::open(self, entity, false)
    }

    /// Open a recursive CTE builder for the given target entity.
    pub fn with_recursive(&mut self, entity: &str) -> QueryResult<CteBuilder<'_>> {
        CteBuilder::open(self, entity, true)
    }

    /// Open a UNION operand.
    pub fn union(&mut self, entity: &str, alias: &str) -> QueryResult<SetOperandBuilder<'_>> {
        SetOperandBuilder::open(self, SetOperator::Union, entity, alias)
    }

    /// Open a UNION ALL operand.
    pub fn union_all(&mut self, entity: &str, alias: &str) -> QueryResult<SetOperandBuilder<'_>> {
        SetOperandBuilder::open(self, SetOperator::UnionAll, entity, alias)
    }

    /// Open an INTERSECT operand.
    pub fn intersect(&mut self, entity: &str, alias: &str) -> QueryResult<SetOperandBuilder<'_>> {
        SetOperandBuilder::open(self, SetOperator::Intersect, entity, alias)
    }

    /// Open an EXCEPT operand.
    pub fn except(&mut self, entity: &str, alias: &str) -> QueryResult<SetOperandBuilder<'_>> {
        SetOperandBuilder::open(self, SetOperator::Except, entity, alias)
    }

    // -----------------------------------------------------------------
    // DML
    // -----------------------------------------------------------------

    /// Add an UPDATE SET assignment.
    pub fn set(&mut self, path: &str, value: &str) -> QueryResult<&mut Self> {
        self.core.add_set(path, value)?;
        Ok(self)
    }

    /// Bind an INSERT column to a select expression.
    pub fn bind(&mut self, attribute: &str, expression: &str) -> QueryResult<&mut Self> {
        self.core.bind_insert(attribute, expression)?;
        Ok(self)
    }

    // -----------------------------------------------------------------
    // Parameters, limits, rendering
    // -----------------------------------------------------------------

    /// Bind a named parameter value.
    pub fn set_parameter(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> QueryResult<&mut Self> {
        self.core.set_parameter(name, value)?;
        Ok(self)
    }

    /// Bind an entity-valued parameter; at binding time the value
    /// collapses to the entity's identifier.
    pub fn set_parameter_entity(
        &mut self,
        name: &str,
        entity: &str,
        value: JsonValue,
    ) -> QueryResult<&mut Self> {
        let entity = self.core.metamodel.entity(entity)?;
        let transformer = self.transformers.id_transformer(entity);
        self.core
            .params
            .satisfy_with(name, ParamValue::Json(value), Some(transformer))?;
        Ok(self)
    }

    /// Bind a positional parameter value (`?1`-style markers).
    pub fn set_positional_parameter(
        &mut self,
        index: u32,
        value: impl Into<ParamValue>,
    ) -> QueryResult<&mut Self> {
        self.core.set_positional_parameter(index, value)?;
        Ok(self)
    }

    /// Limit the number of results.
    pub fn set_max_results(&mut self, limit: usize) -> &mut Self {
        self.core.set_max_results(limit);
        self
    }

    /// Skip leading results.
    pub fn set_first_result(&mut self, offset: usize) -> &mut Self {
        self.core.set_first_result(offset);
        self
    }

    /// Whether a named parameter is known to this query.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.core.has_parameter(name)
    }

    /// Names of parameters still missing a value.
    pub fn unsatisfied_parameters(&self) -> Vec<String> {
        self.core.params.unsatisfied()
    }

    /// Render the query string.
    pub fn to_query_string(&self) -> QueryResult<String> {
        render::render_query(&self.core)
    }

    /// Render the query string together with its parameter bindings.
    pub fn rendered(&self) -> QueryResult<RenderedQuery> {
        render::rendered(&self.core)
    }

    pub(crate) fn require_kind(&self, kind: StatementKind, what: &'static str) -> QueryResult<()> {
        if self.core.kind != kind {
            return Err(QueryError::InvalidStatement(format!(
                "{what} requires a {kind:?} statement"
            )));
        }
        Ok(())
    }
}
