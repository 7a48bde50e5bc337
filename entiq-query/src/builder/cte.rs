//! CTE builders.
//!
//! A CTE targets a metamodel entity; every projected attribute is bound
//! explicitly via `bind`, which validates the attribute against the
//! target. Recursive CTEs build the base part first, switch to the
//! recursive part with `union()`/`union_all()`, and may reference the
//! CTE's own entity in the recursive FROM clause.

use smol_str::SmolStr;

use crate::builder::QueryBuilder;
use crate::clause::ClauseKind;
use crate::core::{QueryCore, StatementKind};
use crate::cte::{AttributeBinder, CteInfo};
use crate::error::{QueryError, QueryResult};
use crate::guard::BuilderToken;

/// Builds one CTE of the enclosing query.
#[derive(Debug)]
pub struct CteBuilder<'a> {
    parent: &'a mut QueryBuilder,
    name: SmolStr,
    recursive: bool,
    union_all: bool,
    token: BuilderToken,
    binder: AttributeBinder,
    core: Option<QueryCore>,
    base: Option<(QueryCore, AttributeBinder)>,
}

impl<'a> CteBuilder<'a> {
    pub(crate) fn open(
        parent: &'a mut QueryBuilder,
        entity: &str,
        recursive: bool,
    ) -> QueryResult<Self> {
        let target = parent.core.metamodel.entity(entity)?;
        let binder = AttributeBinder::new(target);
        let name = SmolStr::new(entity);
        if parent.core.ctes.iter().any(|cte| cte.name == name) {
            return Err(QueryError::AliasConflict {
                alias: name.to_string(),
            });
        }
        let token = parent.core.cte_guard.on_started();
        Ok(Self {
            parent,
            name,
            recursive,
            union_all: false,
            token,
            binder,
            core: None,
            base: None,
        })
    }

    /// Declare the FROM clause of the current part.
    pub fn from(mut self, entity: &str, alias: &str) -> QueryResult<Self> {
        if self.core.is_some() {
            return Err(QueryError::InvalidStatement(
                "the CTE part already has a FROM clause".to_string(),
            ));
        }
        self.core = Some(QueryCore::new(
            self.parent.core.metamodel.clone(),
            StatementKind::Select,
            entity,
            alias,
        )?);
        Ok(self)
    }

    fn current(&mut self) -> QueryResult<&mut QueryCore> {
        self.core.as_mut().ok_or_else(|| {
            QueryError::InvalidStatement(
                "declare the CTE's FROM clause before adding to it".to_string(),
            )
        })
    }

    /// Bind a target attribute to a select expression.
    pub fn bind(mut self, attribute: &str, expression: &str) -> QueryResult<Self> {
        let metamodel = self.parent.core.metamodel.clone();
        let entity = metamodel.entity(&self.name)?;
        self.binder.bind(entity, attribute)?;
        self.current()?.add_select(expression, None, None)?;
        Ok(self)
    }

    /// AND a predicate string into the current part's WHERE clause.
    pub fn r#where(mut self, predicate: &str) -> QueryResult<Self> {
        self.current()?.where_and(predicate, None)?;
        Ok(self)
    }

    /// Add a GROUP BY entry to the current part.
    pub fn group_by(mut self, expression: &str) -> QueryResult<Self> {
        self.current()?.add_group_by(expression, None)?;
        Ok(self)
    }

    /// Switch from the base part to the recursive part (UNION).
    pub fn union(self) -> QueryResult<Self> {
        self.start_recursive_part(false)
    }

    /// Switch from the base part to the recursive part (UNION ALL).
    pub fn union_all(self) -> QueryResult<Self> {
        self.start_recursive_part(true)
    }

    fn start_recursive_part(mut self, union_all: bool) -> QueryResult<Self> {
        if !self.recursive {
            return Err(QueryError::InvalidStatement(
                "only recursive CTEs have a recursive part".to_string(),
            ));
        }
        if self.base.is_some() {
            return Err(QueryError::InvalidStatement(
                "the recursive part was already started".to_string(),
            ));
        }
        let base_core = self.core.take().ok_or_else(|| {
            QueryError::InvalidStatement(
                "the base part needs a FROM clause before the recursive part".to_string(),
            )
        })?;
        let metamodel = self.parent.core.metamodel.clone();
        let fresh_binder = AttributeBinder::new(metamodel.entity(&self.name)?);
        let base_binder = std::mem::replace(&mut self.binder, fresh_binder);
        self.base = Some((base_core, base_binder));
        self.union_all = union_all;
        Ok(self)
    }

    /// Finish the CTE and register it on the parent query.
    pub fn end(self) -> QueryResult<()> {
        self.parent.core.cte_guard.on_ended(self.token)?;
        let mut last = self.core.ok_or_else(|| {
            QueryError::InvalidStatement("the CTE has no FROM clause".to_string())
        })?;
        last.verify_builders_ended()?;

        let info = match self.base {
            Some((mut base, base_binder)) => {
                base.verify_builders_ended()?;
                if base_binder.is_empty() {
                    return Err(QueryError::InvalidStatement(
                        "the CTE binds no attributes".to_string(),
                    ));
                }
                let base_columns: Vec<SmolStr> = base_binder.columns().cloned().collect();
                let recursive_columns: Vec<SmolStr> = self.binder.columns().cloned().collect();
                if base_columns != recursive_columns {
                    return Err(QueryError::InvalidStatement(format!(
                        "the recursive part binds [{}] but the base part binds [{}]",
                        recursive_columns.join(", "),
                        base_columns.join(", ")
                    )));
                }
                let base_params = std::mem::take(&mut base.params);
                self.parent.core.params.absorb(base_params, ClauseKind::With);
                let last_params = std::mem::take(&mut last.params);
                self.parent.core.params.absorb(last_params, ClauseKind::With);
                CteInfo {
                    name: self.name,
                    columns: base_columns,
                    recursive: true,
                    union_all: self.union_all,
                    query: Box::new(base),
                    recursive_query: Some(Box::new(last)),
                }
            }
            None => {
                if self.recursive {
                    return Err(QueryError::InvalidStatement(
                        "a recursive CTE needs a recursive part".to_string(),
                    ));
                }
                if self.binder.is_empty() {
                    return Err(QueryError::InvalidStatement(
                        "the CTE binds no attributes".to_string(),
                    ));
                }
                let columns: Vec<SmolStr> = self.binder.columns().cloned().collect();
                let last_params = std::mem::take(&mut last.params);
                self.parent.core.params.absorb(last_params, ClauseKind::With);
                CteInfo {
                    name: self.name,
                    columns,
                    recursive: false,
                    union_all: false,
                    query: Box::new(last),
                    recursive_query: None,
                }
            }
        };
        self.parent.core.ctes.push(info);
        Ok(())
    }
}
