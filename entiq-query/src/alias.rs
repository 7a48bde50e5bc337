//! Alias registry with chained scopes.
//!
//! Every query level (top-level query, each subquery, each set-operation
//! operand) owns one scope. Scopes form a parent chain so a subquery can
//! see the aliases of its enclosing query for correlation; the reverse
//! direction is never visible.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::arena::ExprId;
use crate::error::{QueryError, QueryResult};
use crate::join::JoinNodeId;

/// What an alias names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    /// A select-clause alias wrapping an expression slot.
    Select(ExprId),
    /// A join alias owning a join node.
    Join(JoinNodeId),
}

/// One registered alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasInfo {
    /// The alias text.
    pub alias: SmolStr,
    /// What the alias names.
    pub kind: AliasKind,
}

/// The alias table of a single query level.
#[derive(Debug, Default)]
pub struct AliasScope {
    entries: IndexMap<SmolStr, AliasInfo>,
}

impl AliasScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias; fails if it is already taken in this scope.
    ///
    /// Shadowing a parent scope's alias is allowed: lookups in this scope
    /// will find the local entry first.
    pub fn register(&mut self, alias: impl Into<SmolStr>, kind: AliasKind) -> QueryResult<()> {
        let alias = alias.into();
        if self.entries.contains_key(&alias) {
            return Err(QueryError::AliasConflict {
                alias: alias.to_string(),
            });
        }
        self.entries.insert(
            alias.clone(),
            AliasInfo { alias, kind },
        );
        Ok(())
    }

    /// Look up an alias in this scope only.
    pub fn get_local(&self, alias: &str) -> Option<&AliasInfo> {
        self.entries.get(alias)
    }

    /// Look up an alias in this scope, then the given parent chain.
    pub fn get<'a>(
        &'a self,
        alias: &str,
        parents: impl IntoIterator<Item = &'a AliasScope>,
    ) -> Option<&'a AliasInfo> {
        if let Some(info) = self.get_local(alias) {
            return Some(info);
        }
        parents
            .into_iter()
            .find_map(|scope| scope.get_local(alias))
    }

    /// Remove an alias, supporting rollback of a discarded sub-builder.
    pub fn remove(&mut self, alias: &str) -> Option<AliasInfo> {
        self.entries.shift_remove(alias)
    }

    /// Iterate all registered aliases in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AliasInfo> {
        self.entries.values()
    }
}
