//! Parameter registration and value binding.
//!
//! Parameters discovered while parsing clause expressions are registered
//! per clause, so replacing a clause unregisters exactly the markers that
//! clause contributed. Values are bound separately and may pass through a
//! value transformer before execution (entity values collapse to their
//! identifier).

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use entiq_expr::ParamRef;
use entiq_schema::EntityType;

use crate::clause::ClauseKind;
use crate::error::{QueryError, QueryResult};

/// Prefix of internally generated parameter names; user names must not
/// collide with it.
pub const GENERATED_PARAM_PREFIX: &str = "entiq_gen_param_";

/// A value bound to a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value (entity snapshots, composite values).
    Json(serde_json::Value),
    /// List of values (collection-valued parameters).
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Transforms a bound value before it reaches the execution layer.
pub trait ValueTransformer: Send + Sync + std::fmt::Debug {
    /// Transform the bound value.
    fn transform(&self, value: &ParamValue) -> ParamValue;
}

/// Collapses an entity-shaped JSON value to its identifier attribute.
#[derive(Debug)]
pub struct IdFromEntityTransformer {
    id_attribute: SmolStr,
}

impl IdFromEntityTransformer {
    fn new(id_attribute: impl Into<SmolStr>) -> Self {
        Self {
            id_attribute: id_attribute.into(),
        }
    }
}

impl ValueTransformer for IdFromEntityTransformer {
    fn transform(&self, value: &ParamValue) -> ParamValue {
        match value {
            ParamValue::Json(serde_json::Value::Object(map)) => {
                match map.get(self.id_attribute.as_str()) {
                    Some(serde_json::Value::Number(n)) if n.is_i64() => {
                        ParamValue::Int(n.as_i64().unwrap_or_default())
                    }
                    Some(serde_json::Value::String(s)) => ParamValue::String(s.clone()),
                    Some(other) => ParamValue::Json(other.clone()),
                    None => ParamValue::Null,
                }
            }
            ParamValue::List(items) => {
                ParamValue::List(items.iter().map(|v| self.transform(v)).collect())
            }
            other => other.clone(),
        }
    }
}

/// Factory-owned cache of id-extraction transformers, keyed by entity
/// name.
///
/// Entries are immutable once constructed and construction is pure, so
/// concurrent get-or-create races are harmless: the loser's instance is
/// simply dropped.
#[derive(Debug, Default)]
pub struct TransformerCache {
    inner: RwLock<IndexMap<SmolStr, Arc<IdFromEntityTransformer>>>,
}

impl TransformerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the id transformer for an entity type.
    pub fn id_transformer(&self, entity: &EntityType) -> Arc<IdFromEntityTransformer> {
        if let Some(existing) = self.inner.read().get(entity.name()) {
            return Arc::clone(existing);
        }
        let id_attribute = entity
            .identifier()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| SmolStr::new("id"));
        let mut write = self.inner.write();
        Arc::clone(
            write
                .entry(SmolStr::new(entity.name()))
                .or_insert_with(|| Arc::new(IdFromEntityTransformer::new(id_attribute))),
        )
    }

    /// Number of cached transformers.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// One tracked parameter.
#[derive(Debug)]
struct ParameterEntry {
    value: Option<ParamValue>,
    clauses: BTreeSet<ClauseKind>,
    transformer: Option<Arc<dyn ValueTransformer>>,
}

/// A parameter with its final (transformed) value, ready for binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBinding {
    /// The parameter marker as it appears in the rendered query.
    pub name: String,
    /// The transformed value, or `None` when not yet satisfied.
    pub value: Option<ParamValue>,
}

/// Tracks every parameter of a query, per clause.
#[derive(Debug, Default)]
pub struct ParameterManager {
    params: IndexMap<ParamRef, ParameterEntry>,
}

impl ParameterManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter occurrence in a clause. Idempotent per
    /// (parameter, clause) pair.
    pub fn register(&mut self, param: &ParamRef, clause: ClauseKind) {
        self.params
            .entry(param.clone())
            .or_insert_with(|| ParameterEntry {
                value: None,
                clauses: BTreeSet::new(),
                transformer: None,
            })
            .clauses
            .insert(clause);
    }

    /// Drop all registrations a clause contributed; parameters no longer
    /// referenced anywhere and still unsatisfied are removed entirely.
    pub fn unregister_clause(&mut self, clause: ClauseKind) {
        for entry in self.params.values_mut() {
            entry.clauses.remove(&clause);
        }
        self.params
            .retain(|_, entry| !entry.clauses.is_empty() || entry.value.is_some());
    }

    /// Bind a value to a named parameter.
    pub fn satisfy(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> QueryResult<()> {
        self.satisfy_with(name, value, None)
    }

    /// Bind a value with an optional transformer.
    pub fn satisfy_with(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
        transformer: Option<Arc<dyn ValueTransformer>>,
    ) -> QueryResult<()> {
        if name.starts_with(GENERATED_PARAM_PREFIX) {
            return Err(QueryError::InvalidParameter {
                name: name.to_string(),
                reason: format!("the `{GENERATED_PARAM_PREFIX}` prefix is reserved"),
            });
        }
        let key = ParamRef::Named(SmolStr::new(name));
        let entry = self
            .params
            .entry(key)
            .or_insert_with(|| ParameterEntry {
                value: None,
                clauses: BTreeSet::new(),
                transformer: None,
            });
        entry.value = Some(value.into());
        entry.transformer = transformer;
        Ok(())
    }

    /// Bind a value to a positional parameter.
    pub fn satisfy_positional(
        &mut self,
        index: u32,
        value: impl Into<ParamValue>,
    ) -> QueryResult<()> {
        let entry = self
            .params
            .entry(ParamRef::Positional(index))
            .or_insert_with(|| ParameterEntry {
                value: None,
                clauses: BTreeSet::new(),
                transformer: None,
            });
        entry.value = Some(value.into());
        Ok(())
    }

    /// Whether the parameter is known to this query.
    pub fn contains(&self, param: &ParamRef) -> bool {
        self.params.contains_key(param)
    }

    /// Names of registered parameters that have no value yet.
    pub fn unsatisfied(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, entry)| entry.value.is_none())
            .map(|(param, _)| param.to_string())
            .collect()
    }

    /// Merge a finished sub-builder's parameters into this manager.
    ///
    /// Registrations are rehomed under the given clause of the parent; a
    /// discarded sub-builder is simply never merged, which is the
    /// rollback path.
    pub fn absorb(&mut self, child: ParameterManager, clause: ClauseKind) {
        for (param, entry) in child.params {
            let target = self
                .params
                .entry(param)
                .or_insert_with(|| ParameterEntry {
                    value: None,
                    clauses: BTreeSet::new(),
                    transformer: None,
                });
            target.clauses.insert(clause);
            if target.value.is_none() {
                target.value = entry.value;
            }
            if target.transformer.is_none() {
                target.transformer = entry.transformer;
            }
        }
    }

    /// Produce the final bindings, applying transformers.
    pub fn bindings(&self) -> Vec<ParamBinding> {
        self.params
            .iter()
            .map(|(param, entry)| {
                let value = entry.value.as_ref().map(|v| match &entry.transformer {
                    Some(transformer) => transformer.transform(v),
                    None => v.clone(),
                });
                ParamBinding {
                    name: param.to_string(),
                    value,
                }
            })
            .collect()
    }
}
