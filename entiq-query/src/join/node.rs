//! Join nodes and per-relation tree nodes.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::arena::PredId;
use crate::clause::ClauseKind;

/// Index of a join node in its manager's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinNodeId(pub(crate) u32);

impl JoinNodeId {
    /// The raw index, as stored in resolved path bases.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Join type of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    /// The rendered keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// Groups every join-node instantiation of one declared relation under
/// one parent, keyed by alias.
///
/// At most one node is the default: the one non-aliased path traversal
/// reuses.
#[derive(Debug, Default)]
pub struct JoinTreeNode {
    /// Nodes by alias, in creation order.
    pub nodes: IndexMap<SmolStr, JoinNodeId>,
    /// The node implicit traversal reuses.
    pub default_node: Option<JoinNodeId>,
}

impl JoinTreeNode {
    /// Record a newly created node; `default` claims the default slot.
    ///
    /// Returns `false` when a default node already exists and another was
    /// requested — the caller must treat that as an error.
    pub fn insert(&mut self, alias: SmolStr, id: JoinNodeId, default: bool) -> bool {
        if default {
            if self.default_node.is_some() {
                return false;
            }
            self.default_node = Some(id);
        }
        self.nodes.insert(alias, id);
        true
    }
}

/// One instantiated join.
#[derive(Debug)]
pub struct JoinNode {
    /// The node's alias (generated for implicit joins).
    pub alias: SmolStr,
    /// The joined entity type name.
    pub entity: SmolStr,
    /// Parent node; `None` for roots.
    pub parent: Option<JoinNodeId>,
    /// The relation attribute on the parent this node joins.
    pub parent_attribute: Option<SmolStr>,
    /// Join type; roots carry `Inner` but never render a join keyword.
    pub join_type: JoinType,
    /// ON predicate, if declared.
    pub on: Option<PredId>,
    /// Whether this node is its tree node's default.
    pub default_join: bool,
    /// Nodes this node's ON predicate references; they must render first.
    pub dependencies: BTreeSet<JoinNodeId>,
    /// Clauses whose expressions traverse this node.
    pub clause_dependencies: BTreeSet<ClauseKind>,
    /// Set when the node is traversed in a disjunctive or null-aware
    /// context, where cardinality-zero rows are observable and unsafe
    /// join rewrites must be suppressed.
    pub cardinality_sensitive: bool,
    /// Child tree nodes by relation attribute.
    pub children: IndexMap<SmolStr, JoinTreeNode>,
    /// Root-prefixed absolute path, e.g. `o.customer.address`.
    pub absolute_path: String,
    /// For correlated subquery roots: the outer path this root iterates,
    /// already rendered with outer aliases (e.g. `o.items`).
    pub correlation: Option<String>,
}

impl JoinNode {
    /// Whether this node is a (statement or correlated) root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_node_single_default() {
        let mut tree = JoinTreeNode::default();
        assert!(tree.insert("customer_1".into(), JoinNodeId(1), true));
        assert!(!tree.insert("customer_2".into(), JoinNodeId(2), true));
        // Non-default nodes are always accepted.
        assert!(tree.insert("customer_3".into(), JoinNodeId(3), false));
        assert_eq!(tree.default_node, Some(JoinNodeId(1)));
        assert_eq!(tree.nodes.len(), 2);
    }

    #[test]
    fn test_join_type_keywords() {
        assert_eq!(JoinType::Inner.as_sql(), "JOIN");
        assert_eq!(JoinType::Left.as_sql(), "LEFT JOIN");
        assert_eq!(JoinType::Right.as_sql(), "RIGHT JOIN");
    }
}
