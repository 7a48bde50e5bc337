//! The query factory: entry point for building statements.

use std::sync::Arc;

use entiq_schema::Metamodel;

use crate::builder::QueryBuilder;
use crate::core::{QueryCore, StatementKind};
use crate::cte::AttributeBinder;
use crate::error::QueryResult;
use crate::param::TransformerCache;

/// Creates query builders over one metamodel.
///
/// The factory owns the parameter-transformer cache shared by every
/// builder it creates; the cache is the only cross-builder mutable
/// state and is safe to share between threads.
#[derive(Debug, Clone)]
pub struct QueryFactory {
    metamodel: Arc<Metamodel>,
    transformers: Arc<TransformerCache>,
}

impl QueryFactory {
    /// Create a factory over a validated metamodel.
    pub fn new(metamodel: Metamodel) -> Self {
        Self {
            metamodel: Arc::new(metamodel),
            transformers: Arc::new(TransformerCache::new()),
        }
    }

    /// The metamodel this factory resolves against.
    pub fn metamodel(&self) -> &Metamodel {
        &self.metamodel
    }

    /// Start a SELECT statement rooted at an entity.
    pub fn select(&self, entity: &str, alias: &str) -> QueryResult<QueryBuilder> {
        let core = QueryCore::new(
            Arc::clone(&self.metamodel),
            StatementKind::Select,
            entity,
            alias,
        )?;
        Ok(QueryBuilder::new(core, Arc::clone(&self.transformers)))
    }

    /// Start an UPDATE statement rooted at an entity.
    pub fn update(&self, entity: &str, alias: &str) -> QueryResult<QueryBuilder> {
        let core = QueryCore::new(
            Arc::clone(&self.metamodel),
            StatementKind::Update,
            entity,
            alias,
        )?;
        Ok(QueryBuilder::new(core, Arc::clone(&self.transformers)))
    }

    /// Start a DELETE statement rooted at an entity.
    pub fn delete(&self, entity: &str, alias: &str) -> QueryResult<QueryBuilder> {
        let core = QueryCore::new(
            Arc::clone(&self.metamodel),
            StatementKind::Delete,
            entity,
            alias,
        )?;
        Ok(QueryBuilder::new(core, Arc::clone(&self.transformers)))
    }

    /// Start an insert-select statement: rows produced by a select over
    /// `source` are inserted into `target`.
    ///
    /// Columns are declared with [`QueryBuilder::bind`], pairing each
    /// target attribute with a select expression.
    pub fn insert(
        &self,
        target: &str,
        source: &str,
        source_alias: &str,
    ) -> QueryResult<QueryBuilder> {
        let target_entity = self.metamodel.entity(target)?;
        let binder = AttributeBinder::new(target_entity);
        let mut core = QueryCore::new(
            Arc::clone(&self.metamodel),
            StatementKind::Insert,
            source,
            source_alias,
        )?;
        core.insert_target = Some(binder);
        Ok(QueryBuilder::new(core, Arc::clone(&self.transformers)))
    }
}
