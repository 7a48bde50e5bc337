//! Common table expressions.
//!
//! A CTE targets an entity registered in the metamodel; its attribute
//! list is built through [`AttributeBinder`], which validates every
//! `bind` call against the target entity. Recursive CTEs pair a
//! non-recursive base with a recursive part combined by UNION [ALL].

use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use smol_str::SmolStr;

use entiq_schema::EntityType;

use crate::core::QueryCore;
use crate::error::{QueryError, QueryResult};

/// Validates attribute bindings against a target entity.
///
/// Shared by CTE builders and insert-select column binding: an attribute
/// may be bound at most once and must exist on the target.
#[derive(Debug)]
pub struct AttributeBinder {
    entity: SmolStr,
    bound: IndexSet<SmolStr>,
}

impl AttributeBinder {
    /// Create a binder for the target entity.
    pub fn new(entity: &EntityType) -> Self {
        Self {
            entity: SmolStr::new(entity.name()),
            bound: IndexSet::new(),
        }
    }

    /// Bind an attribute, validating existence and uniqueness.
    pub fn bind(&mut self, entity: &EntityType, attribute: &str) -> QueryResult<()> {
        if entity.get(attribute).is_none() {
            return Err(QueryError::CteBinding {
                attribute: attribute.to_string(),
                reason: format!("does not exist on entity `{}`", self.entity),
            });
        }
        if !self.bound.insert(SmolStr::new(attribute)) {
            return Err(QueryError::CteBinding {
                attribute: attribute.to_string(),
                reason: "has already been bound".to_string(),
            });
        }
        Ok(())
    }

    /// The target entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The bound attributes in binding order.
    pub fn columns(&self) -> impl Iterator<Item = &SmolStr> {
        self.bound.iter()
    }

    /// Number of bound attributes.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Whether nothing was bound yet.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

/// A finished CTE definition.
///
/// Equality and hashing use the name only: CTE names are unique within a
/// query.
#[derive(Debug)]
pub struct CteInfo {
    /// The CTE name (the target entity's name).
    pub name: SmolStr,
    /// Bound attribute list.
    pub columns: Vec<SmolStr>,
    /// Whether this is a recursive CTE.
    pub recursive: bool,
    /// UNION ALL (vs UNION) between base and recursive part.
    pub union_all: bool,
    /// The (base) query.
    pub(crate) query: Box<QueryCore>,
    /// The recursive part, present iff `recursive`.
    pub(crate) recursive_query: Option<Box<QueryCore>>,
}

impl PartialEq for CteInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CteInfo {}

impl Hash for CteInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
