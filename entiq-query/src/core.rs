//! The query core: one instance per query level.
//!
//! All statement kinds share this structure; a subquery, a CTE body and
//! a set-operation operand are each a core of their own. The core owns
//! the clause state and orchestrates the resolution pipeline: rewrite
//! passes first (`OUTER()`, `SIZE()`), then conjunction classification,
//! then path resolution and parameter registration.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use entiq_expr::{
    Expression, FunctionCall, ParamRef, PathBase, PathExpression, Predicate,
};
use entiq_schema::Metamodel;

use crate::alias::{AliasKind, AliasScope};
use crate::arena::{ExprArena, ExprId, PredId};
use crate::clause::{
    ClauseKind, GroupByManager, OrderByElement, OrderByManager, PredicateHolder,
    ResolvedExpression, SelectManager,
};
use crate::cte::{AttributeBinder, CteInfo};
use crate::error::{QueryError, QueryResult};
use crate::guard::{BuilderGuard, GuardSet};
use crate::join::{
    JoinManager, JoinNodeId, JoinType, ResolveLevel, ResolveOptions, explicit_join,
    resolve_correlated_root, resolve_path,
};
use crate::param::ParameterManager;
use crate::set_ops::SetOperation;
use crate::transform::{
    aggregate, alias_replacement, conjunction, outer_function, size_to_count,
};

/// What kind of statement a core renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Update,
    Delete,
    Insert,
}

impl StatementKind {
    /// Whether the statement may create joins.
    pub fn supports_joins(&self) -> bool {
        matches!(self, Self::Select | Self::Insert)
    }
}

/// The state of one query level.
#[derive(Debug)]
pub struct QueryCore {
    pub(crate) metamodel: Arc<Metamodel>,
    pub(crate) kind: StatementKind,
    pub(crate) arena: ExprArena,
    pub(crate) joins: JoinManager,
    pub(crate) scope: AliasScope,
    pub(crate) select: SelectManager,
    pub(crate) where_clause: PredicateHolder,
    pub(crate) group_by: GroupByManager,
    pub(crate) having: PredicateHolder,
    pub(crate) order_by: OrderByManager,
    pub(crate) params: ParameterManager,
    pub(crate) subqueries: Vec<QueryCore>,
    size_subqueries: IndexMap<String, u32>,
    pub(crate) ctes: Vec<CteInfo>,
    pub(crate) set_ops: Vec<SetOperation>,
    /// UPDATE SET assignments: resolved target path and value slot.
    pub(crate) sets: Vec<(PathExpression, ExprId)>,
    /// INSERT target and bound columns.
    pub(crate) insert_target: Option<AttributeBinder>,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
    pub(crate) predicate_guard: BuilderGuard,
    pub(crate) on_guard: BuilderGuard,
    pub(crate) subquery_guard: BuilderGuard,
    pub(crate) setop_guard: BuilderGuard,
    pub(crate) cte_guard: GuardSet,
}

impl QueryCore {
    /// Create a core rooted at a metamodel entity.
    pub(crate) fn new(
        metamodel: Arc<Metamodel>,
        kind: StatementKind,
        entity: &str,
        alias: &str,
    ) -> QueryResult<Self> {
        metamodel.entity(entity)?;
        let joins = JoinManager::new(entity, alias);
        let mut scope = AliasScope::new();
        scope.register(alias, AliasKind::Join(joins.root()))?;
        Ok(Self::with_joins(metamodel, kind, joins, scope))
    }

    /// Create a subquery core whose root iterates an outer path.
    pub(crate) fn new_correlated(
        metamodel: Arc<Metamodel>,
        entity: &str,
        alias: &str,
        correlation: String,
    ) -> QueryResult<Self> {
        metamodel.entity(entity)?;
        let joins = JoinManager::new_correlated(entity, alias, correlation);
        let mut scope = AliasScope::new();
        scope.register(alias, AliasKind::Join(joins.root()))?;
        Ok(Self::with_joins(metamodel, StatementKind::Select, joins, scope))
    }

    fn with_joins(
        metamodel: Arc<Metamodel>,
        kind: StatementKind,
        joins: JoinManager,
        scope: AliasScope,
    ) -> Self {
        Self {
            metamodel,
            kind,
            arena: ExprArena::default(),
            joins,
            scope,
            select: SelectManager::default(),
            where_clause: PredicateHolder::new(ClauseKind::Where),
            group_by: GroupByManager::default(),
            having: PredicateHolder::new(ClauseKind::Having),
            order_by: OrderByManager::default(),
            params: ParameterManager::new(),
            subqueries: Vec::new(),
            size_subqueries: IndexMap::new(),
            ctes: Vec::new(),
            set_ops: Vec::new(),
            sets: Vec::new(),
            insert_target: None,
            limit: None,
            offset: None,
            predicate_guard: BuilderGuard::new("predicate"),
            on_guard: BuilderGuard::new("ON"),
            subquery_guard: BuilderGuard::new("subquery"),
            setop_guard: BuilderGuard::new("set-operation"),
            cte_guard: GuardSet::new("CTE"),
        }
    }

    /// The statement root entity name.
    pub(crate) fn root_entity(&self) -> &str {
        &self.joins.node(self.joins.root()).entity
    }

    /// The statement root alias.
    pub(crate) fn root_alias(&self) -> &str {
        &self.joins.node(self.joins.root()).alias
    }

    fn joins_forbidden(&self) -> bool {
        !self.kind.supports_joins()
    }

    /// Assert that no nested builder is still open.
    pub(crate) fn verify_builders_ended(&self) -> QueryResult<()> {
        self.predicate_guard.verify_ended()?;
        self.on_guard.verify_ended()?;
        self.subquery_guard.verify_ended()?;
        self.setop_guard.verify_ended()?;
        self.cte_guard.verify_ended()
    }

    // -----------------------------------------------------------------
    // Resolution pipeline
    // -----------------------------------------------------------------

    fn register_params_pred(&mut self, pred: &Predicate, clause: ClauseKind) {
        let params = &mut self.params;
        let _ = pred.visit_expressions::<()>(&mut |expr| {
            if let Expression::Parameter(param) = expr {
                params.register(param, clause);
            }
            ControlFlow::Continue(())
        });
    }

    fn register_params_expr(&mut self, expr: &Expression, clause: ClauseKind) {
        let params = &mut self.params;
        let _ = expr.visit::<()>(&mut |e| {
            if let Expression::Parameter(param) = e {
                params.register(param, clause);
            }
            ControlFlow::Continue(())
        });
    }

    fn rewrite_outer_in_pred(
        &self,
        pred: &mut Predicate,
        clause: ClauseKind,
        outer: &mut Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let metamodel = Arc::clone(&self.metamodel);
        let mut resolve = |path: &mut PathExpression| -> QueryResult<bool> {
            match outer.as_deref_mut() {
                Some(parent) => {
                    let mut level = ResolveLevel {
                        joins: &mut parent.joins,
                        scope: &mut parent.scope,
                    };
                    resolve_path(
                        &metamodel,
                        &mut level,
                        None,
                        path,
                        &ResolveOptions::clause(clause),
                    )?;
                    Ok(true)
                }
                None => Ok(false),
            }
        };
        outer_function::rewrite_in_predicate(pred, &mut resolve)
    }

    fn rewrite_outer_in_expr(
        &self,
        expr: &mut Expression,
        clause: ClauseKind,
        outer: &mut Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let metamodel = Arc::clone(&self.metamodel);
        let mut resolve = |path: &mut PathExpression| -> QueryResult<bool> {
            match outer.as_deref_mut() {
                Some(parent) => {
                    let mut level = ResolveLevel {
                        joins: &mut parent.joins,
                        scope: &mut parent.scope,
                    };
                    resolve_path(
                        &metamodel,
                        &mut level,
                        None,
                        path,
                        &ResolveOptions::clause(clause),
                    )?;
                    Ok(true)
                }
                None => Ok(false),
            }
        };
        outer_function::rewrite_in_expression(expr, &mut resolve)
    }

    fn resolve_paths_in_pred(
        &mut self,
        pred: &mut Predicate,
        clause: ClauseKind,
        disjunctive: &HashSet<String>,
        on_target: Option<JoinNodeId>,
        outer: &mut Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let metamodel = Arc::clone(&self.metamodel);
        let joins_forbidden = self.joins_forbidden();
        let joins = &mut self.joins;
        let scope = &mut self.scope;
        let mut error: Option<QueryError> = None;
        pred.walk_paths_mut(&mut |path| {
            if error.is_some() || path.base.is_some() {
                return;
            }
            let mut opts = ResolveOptions::clause(clause)
                .cardinality_sensitive(disjunctive.contains(&path.dotted()));
            if let Some(target) = on_target {
                opts = opts.for_on_clause(target);
            }
            if joins_forbidden {
                opts = opts.forbid_joins();
            }
            let mut level = ResolveLevel {
                joins: &mut *joins,
                scope: &mut *scope,
            };
            let result = match outer.as_deref_mut() {
                Some(parent) => {
                    let mut outer_level = ResolveLevel {
                        joins: &mut parent.joins,
                        scope: &mut parent.scope,
                    };
                    resolve_path(&metamodel, &mut level, Some(&mut outer_level), path, &opts)
                }
                None => resolve_path(&metamodel, &mut level, None, path, &opts),
            };
            if let Err(e) = result {
                error = Some(e);
            }
        });
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn resolve_paths_in_expr(
        &mut self,
        expr: &mut Expression,
        clause: ClauseKind,
        outer: &mut Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let metamodel = Arc::clone(&self.metamodel);
        let joins_forbidden = self.joins_forbidden();
        let joins = &mut self.joins;
        let scope = &mut self.scope;
        let mut error: Option<QueryError> = None;
        expr.walk_paths_mut(&mut |path| {
            if error.is_some() || path.base.is_some() {
                return;
            }
            let mut opts = ResolveOptions::clause(clause);
            if joins_forbidden {
                opts = opts.forbid_joins();
            }
            let mut level = ResolveLevel {
                joins: &mut *joins,
                scope: &mut *scope,
            };
            let result = match outer.as_deref_mut() {
                Some(parent) => {
                    let mut outer_level = ResolveLevel {
                        joins: &mut parent.joins,
                        scope: &mut parent.scope,
                    };
                    resolve_path(&metamodel, &mut level, Some(&mut outer_level), path, &opts)
                }
                None => resolve_path(&metamodel, &mut level, None, path, &opts),
            };
            if let Err(e) = result {
                error = Some(e);
            }
        });
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run the full pipeline over a parsed predicate and store it.
    pub(crate) fn process_predicate(
        &mut self,
        mut pred: Predicate,
        clause: ClauseKind,
        on_target: Option<JoinNodeId>,
        mut outer: Option<&mut QueryCore>,
    ) -> QueryResult<PredId> {
        self.rewrite_outer_in_pred(&mut pred, clause, &mut outer)?;

        let mut make = |path: &PathExpression| self.count_subquery_for(path);
        size_to_count::rewrite_in_predicate(&mut pred, &mut make)?;

        let disjunctive = conjunction::disjunctive_paths(&pred);
        self.resolve_paths_in_pred(&mut pred, clause, &disjunctive, on_target, &mut outer)?;
        self.register_params_pred(&pred, clause);
        Ok(self.arena.alloc_pred(pred))
    }

    /// Conjoin a processed predicate into a clause's root slot.
    ///
    /// The existing slot is reused so downstream holders of the id stay
    /// valid.
    pub(crate) fn conjoin(&mut self, holder: ClauseKind, pred: PredId) {
        let root = match holder {
            ClauseKind::Having => &mut self.having,
            _ => &mut self.where_clause,
        };
        match root.root() {
            None => {
                root.set_root(Some(pred));
            }
            Some(existing) => {
                let new = self.arena.replace_pred(pred, Predicate::And(Vec::new()));
                let old = self
                    .arena
                    .replace_pred(existing, Predicate::And(Vec::new()));
                let combined = old.and_also(new);
                self.arena.replace_pred(existing, combined);
            }
        }
    }

    /// Parse, process and conjoin a WHERE conjunct.
    pub(crate) fn where_and(
        &mut self,
        text: &str,
        outer: Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let pred = entiq_expr::parse_predicate(text)?;
        let id = self.process_predicate(pred, ClauseKind::Where, None, outer)?;
        self.conjoin(ClauseKind::Where, id);
        Ok(())
    }

    /// Parse, process and conjoin a HAVING conjunct; select aliases are
    /// inlined first.
    pub(crate) fn having_and(
        &mut self,
        text: &str,
        outer: Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        if self.group_by.is_empty() {
            return Err(QueryError::InvalidStatement(
                "HAVING requires a GROUP BY clause".to_string(),
            ));
        }
        let mut pred = entiq_expr::parse_predicate(text)?;
        for (alias, substitute) in self.aliased_select_items() {
            alias_replacement::replace_in_predicate(&mut pred, &alias, &substitute);
        }
        let id = self.process_predicate(pred, ClauseKind::Having, None, outer)?;
        self.conjoin(ClauseKind::Having, id);
        Ok(())
    }

    fn aliased_select_items(&self) -> Vec<(SmolStr, Expression)> {
        self.select
            .items()
            .iter()
            .filter_map(|item| {
                item.alias
                    .clone()
                    .map(|alias| (alias, self.arena.expr(item.expr).clone()))
            })
            .collect()
    }

    // -----------------------------------------------------------------
    // SELECT clause
    // -----------------------------------------------------------------

    /// Add a select item, applying the SIZE select strategy when it fits.
    pub(crate) fn add_select(
        &mut self,
        text: &str,
        alias: Option<SmolStr>,
        mut outer: Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let mut expr = entiq_expr::parse_expression(text)?;
        self.rewrite_outer_in_expr(&mut expr, ClauseKind::Select, &mut outer)?;

        let plain_size = size_to_count::as_plain_size(&expr).cloned();
        match plain_size {
            Some(path) if !self.select.is_distinct() => {
                expr = self.select_size_as_count_join(&path)?;
            }
            _ if size_to_count::contains_size(&expr) => {
                let mut make = |path: &PathExpression| self.count_subquery_for(path);
                size_to_count::rewrite_in_expression(&mut expr, &mut make)?;
            }
            _ => {}
        }

        self.resolve_paths_in_expr(&mut expr, ClauseKind::Select, &mut outer)?;
        self.register_params_expr(&expr, ClauseKind::Select);
        let id = self.arena.alloc_expr(expr);
        if let Some(alias) = &alias {
            self.scope.register(alias.clone(), AliasKind::Select(id))?;
        }
        self.select.add(id, alias);
        Ok(())
    }

    /// The SIZE select strategy: join the collection, count its alias and
    /// group by the root identifier.
    fn select_size_as_count_join(
        &mut self,
        path: &PathExpression,
    ) -> QueryResult<Expression> {
        let metamodel = Arc::clone(&self.metamodel);
        let mut resolved = path.clone();
        {
            let mut level = ResolveLevel {
                joins: &mut self.joins,
                scope: &mut self.scope,
            };
            let opts = ResolveOptions::clause(ClauseKind::Select).with_object_leaf();
            resolve_path(&metamodel, &mut level, None, &mut resolved, &opts)?;
        }
        // Empty collections must still count zero rows.
        if let Some(PathBase::Join { node, .. }) = &resolved.base {
            let node = self.joins.node_mut(JoinNodeId(*node));
            node.join_type = JoinType::Left;
            node.cardinality_sensitive = true;
        }
        debug!(path = %resolved.dotted(), "rewrote SIZE() select item to counted join");

        // Group the projection by the root identifier so the count
        // aggregates per root row.
        let root_entity = self.root_entity().to_string();
        let id_attribute = metamodel
            .entity(&root_entity)?
            .identifier()
            .map(|a| a.name.clone())
            .ok_or_else(|| {
                QueryError::InvalidStatement(format!(
                    "entity `{root_entity}` has no identifier attribute"
                ))
            })?;
        let root_alias = SmolStr::new(self.root_alias());
        let mut id_path = PathExpression::new([root_alias.clone(), id_attribute.clone()]);
        id_path.base = Some(PathBase::Join {
            node: self.joins.root().index(),
            alias: root_alias.clone(),
            property: Some(id_attribute.clone()),
        });
        let text = format!("{root_alias}.{id_attribute}");
        let id_expr = self.arena.alloc_expr(Expression::Path(id_path));
        self.group_by.add(ResolvedExpression {
            text,
            expr: id_expr,
        });

        let mut count = FunctionCall::new("COUNT", vec![Expression::Path(resolved)]);
        count.distinct = false;
        Ok(Expression::Function(count))
    }

    /// Mark the projection DISTINCT.
    pub(crate) fn set_distinct(&mut self, distinct: bool) {
        self.select.set_distinct(distinct);
    }

    // -----------------------------------------------------------------
    // GROUP BY / ORDER BY
    // -----------------------------------------------------------------

    /// Add a GROUP BY entry; select aliases are inlined, duplicates (by
    /// resolved text) are dropped.
    pub(crate) fn add_group_by(
        &mut self,
        text: &str,
        mut outer: Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let mut expr = entiq_expr::parse_expression(text)?;
        for (alias, substitute) in self.aliased_select_items() {
            alias_replacement::replace_in_expression(&mut expr, &alias, &substitute);
        }
        if !aggregate::is_group_by_usable(&expr) {
            return Err(QueryError::InvalidStatement(format!(
                "`{text}` cannot appear in GROUP BY"
            )));
        }
        self.rewrite_outer_in_expr(&mut expr, ClauseKind::GroupBy, &mut outer)?;
        self.resolve_paths_in_expr(&mut expr, ClauseKind::GroupBy, &mut outer)?;
        self.register_params_expr(&expr, ClauseKind::GroupBy);

        let rendered = crate::render::resolved_expr_text(&expr);
        let id = self.arena.alloc_expr(expr);
        self.group_by.add(ResolvedExpression {
            text: rendered,
            expr: id,
        });
        Ok(())
    }

    /// Add an ORDER BY element.
    pub(crate) fn add_order_by(
        &mut self,
        text: &str,
        ascending: bool,
        nulls_first: bool,
        mut outer: Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let mut expr = entiq_expr::parse_expression(text)?;
        self.rewrite_outer_in_expr(&mut expr, ClauseKind::OrderBy, &mut outer)?;
        self.resolve_paths_in_expr(&mut expr, ClauseKind::OrderBy, &mut outer)?;
        self.register_params_expr(&expr, ClauseKind::OrderBy);

        let (nullable, unique) = self.order_meta(&expr);
        let id = self.arena.alloc_expr(expr);
        self.order_by.add(OrderByElement {
            expr: id,
            ascending,
            nulls_first,
            nullable,
            unique,
        });
        Ok(())
    }

    /// Nullability/uniqueness of an ORDER BY expression, for keyset
    /// analysis.
    fn order_meta(&self, expr: &Expression) -> (bool, bool) {
        let Expression::Path(path) = expr else {
            return (true, false);
        };
        match &path.base {
            Some(PathBase::Join {
                alias,
                property: Some(property),
                ..
            }) => {
                let Some(info) = self.scope.get_local(alias) else {
                    return (true, false);
                };
                let AliasKind::Join(node) = info.kind else {
                    return (true, false);
                };
                let node = self.joins.node(node);
                let Some(attribute) = self.metamodel.attribute(&node.entity, property) else {
                    return (true, false);
                };
                let unique = node.is_root() && attribute.identifier;
                (attribute.optional, unique)
            }
            _ => (true, false),
        }
    }

    // -----------------------------------------------------------------
    // Joins
    // -----------------------------------------------------------------

    /// Create an explicitly aliased join.
    pub(crate) fn add_join(
        &mut self,
        path_text: &str,
        alias: &str,
        join_type: JoinType,
        default: bool,
    ) -> QueryResult<JoinNodeId> {
        if self.joins_forbidden() {
            return Err(QueryError::path(
                path_text,
                "this statement kind cannot declare joins",
            ));
        }
        let metamodel = Arc::clone(&self.metamodel);
        let path = entiq_expr::parse_path_expression(path_text)?;
        let mut level = ResolveLevel {
            joins: &mut self.joins,
            scope: &mut self.scope,
        };
        explicit_join(
            &metamodel,
            &mut level,
            &path,
            SmolStr::new(alias),
            join_type,
            default,
        )
    }

    /// Attach a processed ON predicate to a join node.
    pub(crate) fn set_join_on(
        &mut self,
        node: JoinNodeId,
        pred: Predicate,
        outer: Option<&mut QueryCore>,
    ) -> QueryResult<()> {
        let id = self.process_predicate(pred, ClauseKind::On, Some(node), outer)?;
        self.joins.node_mut(node).on = Some(id);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Subqueries
    // -----------------------------------------------------------------

    /// Adopt a finished subquery core, returning its handle.
    pub(crate) fn attach_subquery(&mut self, mut child: QueryCore, clause: ClauseKind) -> u32 {
        let child_params = std::mem::take(&mut child.params);
        self.params.absorb(child_params, clause);
        let id = self.subqueries.len() as u32;
        self.subqueries.push(child);
        id
    }

    /// Get or build the correlated count subquery for a collection path.
    fn count_subquery_for(&mut self, path: &PathExpression) -> QueryResult<u32> {
        let metamodel = Arc::clone(&self.metamodel);
        let correlated = {
            let mut level = ResolveLevel {
                joins: &mut self.joins,
                scope: &mut self.scope,
            };
            resolve_correlated_root(&metamodel, &mut level, path)?
        };
        if let Some(existing) = self.size_subqueries.get(&correlated.absolute) {
            return Ok(*existing);
        }

        let alias = correlated.attribute.clone();
        let mut child = QueryCore::new_correlated(
            metamodel,
            &correlated.entity,
            &alias,
            correlated.correlation.clone(),
        )?;
        let mut counted = PathExpression::new([alias.clone()]);
        counted.base = Some(PathBase::Join {
            node: child.joins.root().index(),
            alias: alias.clone(),
            property: None,
        });
        let count = Expression::Function(FunctionCall::new(
            "COUNT",
            vec![Expression::Path(counted)],
        ));
        let count_id = child.arena.alloc_expr(count);
        child.select.add(count_id, None);

        debug!(
            path = %correlated.absolute,
            "rewrote SIZE() into correlated count subquery"
        );
        let id = self.attach_subquery(child, ClauseKind::Where);
        self.size_subqueries.insert(correlated.absolute, id);
        Ok(id)
    }

    // -----------------------------------------------------------------
    // DML
    // -----------------------------------------------------------------

    /// Add an UPDATE SET assignment.
    pub(crate) fn add_set(&mut self, path_text: &str, value_text: &str) -> QueryResult<()> {
        if self.kind != StatementKind::Update {
            return Err(QueryError::InvalidStatement(
                "SET assignments require an UPDATE statement".to_string(),
            ));
        }
        let metamodel = Arc::clone(&self.metamodel);
        let mut path = entiq_expr::parse_path_expression(path_text)?;
        {
            let mut level = ResolveLevel {
                joins: &mut self.joins,
                scope: &mut self.scope,
            };
            let opts = ResolveOptions::clause(ClauseKind::Set).forbid_joins();
            resolve_path(&metamodel, &mut level, None, &mut path, &opts)?;
        }
        let mut value = entiq_expr::parse_expression(value_text)?;
        let mut outer: Option<&mut QueryCore> = None;
        self.resolve_paths_in_expr(&mut value, ClauseKind::Set, &mut outer)?;
        self.register_params_expr(&value, ClauseKind::Set);
        let value_id = self.arena.alloc_expr(value);
        self.sets.push((path, value_id));
        Ok(())
    }

    /// Bind an INSERT column and its source select expression.
    pub(crate) fn bind_insert(&mut self, attribute: &str, select_text: &str) -> QueryResult<()> {
        if self.kind != StatementKind::Insert {
            return Err(QueryError::InvalidStatement(
                "column binding requires an INSERT statement".to_string(),
            ));
        }
        let metamodel = Arc::clone(&self.metamodel);
        let binder = self.insert_target.as_mut().ok_or_else(|| {
            QueryError::InvalidStatement("INSERT statement has no target".to_string())
        })?;
        let entity = metamodel.entity(binder.entity())?;
        binder.bind(entity, attribute)?;
        self.add_select(select_text, None, None)
    }

    // -----------------------------------------------------------------
    // Parameters and limits
    // -----------------------------------------------------------------

    /// Bind a named parameter value.
    pub(crate) fn set_parameter(
        &mut self,
        name: &str,
        value: impl Into<crate::param::ParamValue>,
    ) -> QueryResult<()> {
        self.params.satisfy(name, value)
    }

    /// Bind a positional parameter value.
    pub(crate) fn set_positional_parameter(
        &mut self,
        index: u32,
        value: impl Into<crate::param::ParamValue>,
    ) -> QueryResult<()> {
        self.params.satisfy_positional(index, value)
    }

    /// Limit the result count.
    pub(crate) fn set_max_results(&mut self, limit: usize) {
        self.limit = Some(limit);
    }

    /// Skip leading results.
    pub(crate) fn set_first_result(&mut self, offset: usize) {
        self.offset = Some(offset);
    }

    /// Whether a named parameter is known.
    pub(crate) fn has_parameter(&self, name: &str) -> bool {
        self.params.contains(&ParamRef::Named(SmolStr::new(name)))
    }
}
