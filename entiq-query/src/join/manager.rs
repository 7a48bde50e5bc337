//! The join manager: implicit join resolution and join ordering.
//!
//! Path expressions are resolved segment by segment against the
//! metamodel. Traversing a relation finds or creates a join node; the
//! default node of a relation is shared by every non-aliased traversal,
//! so resolving the same path twice yields the same node. Explicitly
//! aliased joins get their own nodes under the same tree node.

use smol_str::SmolStr;
use tracing::{debug, trace};

use entiq_expr::{PathBase, PathExpression};
use entiq_schema::{Attribute, Metamodel};

use crate::alias::{AliasKind, AliasScope};
use crate::clause::ClauseKind;
use crate::error::{QueryError, QueryResult};
use crate::join::node::{JoinNode, JoinNodeId, JoinTreeNode, JoinType};

/// How a path resolution call should treat joins.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// The clause the path occurs in; recorded on traversed nodes.
    pub clause: ClauseKind,
    /// Whether a relation-valued final segment may itself be joined.
    /// When `false`, a to-one leaf resolves to its parent node with the
    /// relation name as property (rendered as a foreign-key reference).
    pub object_leaf_allowed: bool,
    /// The path occurs in a disjunctive or null-aware context; traversed
    /// nodes are tagged cardinality-sensitive.
    pub cardinality_sensitive: bool,
    /// When resolving a join's ON predicate, the node owning it; every
    /// other traversed node becomes one of its dependencies.
    pub dependency_target: Option<JoinNodeId>,
    /// Statement kinds without a join surface (UPDATE/DELETE) refuse to
    /// create nodes.
    pub joins_forbidden: bool,
}

impl ResolveOptions {
    /// Defaults for a clause: no object leaves, conjunctive context.
    pub fn clause(clause: ClauseKind) -> Self {
        Self {
            clause,
            object_leaf_allowed: false,
            cardinality_sensitive: false,
            dependency_target: None,
            joins_forbidden: false,
        }
    }

    /// Tag traversed nodes cardinality-sensitive.
    pub fn cardinality_sensitive(mut self, sensitive: bool) -> Self {
        self.cardinality_sensitive = sensitive;
        self
    }

    /// Allow the final segment to be a joined relation.
    pub fn with_object_leaf(mut self) -> Self {
        self.object_leaf_allowed = true;
        self
    }

    /// Record traversed nodes as dependencies of an ON clause owner.
    pub fn for_on_clause(mut self, target: JoinNodeId) -> Self {
        self.dependency_target = Some(target);
        self
    }

    /// Refuse join creation (DML statements).
    pub fn forbid_joins(mut self) -> Self {
        self.joins_forbidden = true;
        self
    }
}

/// Join state of one query level.
#[derive(Debug)]
pub struct JoinManager {
    nodes: Vec<JoinNode>,
    roots: Vec<JoinNodeId>,
}

impl JoinManager {
    /// Create a manager with the statement root.
    pub fn new(entity: impl Into<SmolStr>, alias: impl Into<SmolStr>) -> Self {
        let entity = entity.into();
        let alias = alias.into();
        let root = JoinNode {
            absolute_path: alias.to_string(),
            alias,
            entity,
            parent: None,
            parent_attribute: None,
            join_type: JoinType::Inner,
            on: None,
            default_join: true,
            dependencies: Default::default(),
            clause_dependencies: Default::default(),
            cardinality_sensitive: false,
            children: Default::default(),
            correlation: None,
        };
        Self {
            nodes: vec![root],
            roots: vec![JoinNodeId(0)],
        }
    }

    /// Create a manager whose root iterates an outer collection path
    /// (correlated subquery root).
    pub fn new_correlated(
        entity: impl Into<SmolStr>,
        alias: impl Into<SmolStr>,
        correlation: String,
    ) -> Self {
        let mut manager = Self::new(entity, alias);
        manager.nodes[0].correlation = Some(correlation);
        manager
    }

    /// The statement root.
    pub fn root(&self) -> JoinNodeId {
        self.roots[0]
    }

    /// Access a node.
    pub fn node(&self, id: JoinNodeId) -> &JoinNode {
        &self.nodes[id.0 as usize]
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: JoinNodeId) -> &mut JoinNode {
        &mut self.nodes[id.0 as usize]
    }

    /// All nodes in creation order.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether a clause's expressions traverse the node.
    pub fn is_clause_dependent(&self, id: JoinNodeId, clause: ClauseKind) -> bool {
        self.node(id).clause_dependencies.contains(&clause)
    }

    fn next_alias(&self, scope: &AliasScope, attribute: &str) -> SmolStr {
        let mut n = 1usize;
        loop {
            let candidate = SmolStr::new(format!("{attribute}_{n}"));
            if scope.get_local(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Find the default node for `attribute` under `parent`, creating it
    /// when absent.
    fn find_or_create_default(
        &mut self,
        scope: &mut AliasScope,
        parent: JoinNodeId,
        attribute: &Attribute,
        opts: &ResolveOptions,
    ) -> QueryResult<JoinNodeId> {
        if let Some(tree) = self.node(parent).children.get(attribute.name.as_str()) {
            if let Some(existing) = tree.default_node {
                trace!(
                    alias = %self.node(existing).alias,
                    attribute = %attribute.name,
                    "reusing default join node"
                );
                return Ok(existing);
            }
        }
        self.create_node(scope, parent, attribute, None, None, true, opts)
    }

    /// Create a node under `parent` for `attribute`.
    ///
    /// `alias`/`join_type` default to a generated alias and the
    /// optionality-derived type; `default` claims the tree node's default
    /// slot.
    fn create_node(
        &mut self,
        scope: &mut AliasScope,
        parent: JoinNodeId,
        attribute: &Attribute,
        alias: Option<SmolStr>,
        join_type: Option<JoinType>,
        default: bool,
        opts: &ResolveOptions,
    ) -> QueryResult<JoinNodeId> {
        if opts.joins_forbidden {
            return Err(QueryError::path(
                &attribute.name,
                "this statement kind cannot create implicit joins",
            ));
        }
        let target = attribute.target().ok_or_else(|| {
            QueryError::path(&attribute.name, "attribute is not a relation")
        })?;
        let alias = match alias {
            Some(alias) => alias,
            None => self.next_alias(scope, &attribute.name),
        };
        let join_type = join_type.unwrap_or(if attribute.optional {
            JoinType::Left
        } else {
            JoinType::Inner
        });

        let id = JoinNodeId(self.nodes.len() as u32);
        scope.register(alias.clone(), AliasKind::Join(id))?;

        let absolute_path = format!("{}.{}", self.node(parent).absolute_path, attribute.name);
        debug!(
            alias = %alias,
            path = %absolute_path,
            join_type = join_type.as_sql(),
            "created join node"
        );
        self.nodes.push(JoinNode {
            alias: alias.clone(),
            entity: SmolStr::new(target),
            parent: Some(parent),
            parent_attribute: Some(attribute.name.clone()),
            join_type,
            on: None,
            default_join: default,
            dependencies: Default::default(),
            clause_dependencies: Default::default(),
            cardinality_sensitive: false,
            children: Default::default(),
            absolute_path,
            correlation: None,
        });

        let tree = self
            .node_mut(parent)
            .children
            .entry(attribute.name.clone())
            .or_insert_with(JoinTreeNode::default);
        if !tree.insert(alias.clone(), id, default) {
            // Roll the half-finished node back before failing.
            scope.remove(&alias);
            self.nodes.pop();
            return Err(QueryError::path(
                &attribute.name,
                "a default join for this relation already exists",
            ));
        }
        Ok(id)
    }

    fn mark(&mut self, id: JoinNodeId, opts: &ResolveOptions) {
        let node = self.node_mut(id);
        node.clause_dependencies.insert(opts.clause);
        if opts.cardinality_sensitive {
            node.cardinality_sensitive = true;
        }
        if let Some(target) = opts.dependency_target {
            if target != id {
                self.node_mut(target).dependencies.insert(id);
            }
        }
    }

    /// Walk `segments` starting at `start`, joining relations as needed.
    ///
    /// Returns the terminal node and the trailing property, if any.
    /// `crossing_scope` is set when a subquery walks an outer alias;
    /// collection traversal is illegal there.
    fn walk_segments(
        &mut self,
        metamodel: &Metamodel,
        scope: &mut AliasScope,
        start: JoinNodeId,
        segments: &[SmolStr],
        full_path: &PathExpression,
        opts: &ResolveOptions,
        crossing_scope: bool,
    ) -> QueryResult<(JoinNodeId, Option<SmolStr>)> {
        let mut current = start;
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let entity = self.node(current).entity.clone();
            let attribute = metamodel
                .attribute(&entity, segment)
                .ok_or_else(|| {
                    QueryError::path(
                        full_path.dotted(),
                        format!("unknown attribute `{segment}` on entity `{entity}`"),
                    )
                })?
                .clone();

            if !attribute.is_relation() {
                if last {
                    return Ok((current, Some(attribute.name.clone())));
                }
                return Err(QueryError::path(
                    full_path.dotted(),
                    format!("cannot traverse through scalar attribute `{segment}`"),
                ));
            }

            if crossing_scope && attribute.is_collection() {
                return Err(QueryError::IllegalCorrelation {
                    path: full_path.dotted(),
                });
            }

            if last && !opts.object_leaf_allowed {
                if attribute.is_collection() {
                    return Err(QueryError::path(
                        full_path.dotted(),
                        "collection-valued path requires an explicit join",
                    ));
                }
                // Single-valued association leaf: no join, the reference
                // renders against the parent.
                return Ok((current, Some(attribute.name.clone())));
            }

            current = self.find_or_create_default(scope, current, &attribute, opts)?;
            self.mark(current, opts);
        }
        Ok((current, None))
    }

    /// Join nodes in render order: parents before children, ON-clause
    /// dependencies before their dependents, creation order otherwise.
    pub fn ordered_join_nodes(&self) -> QueryResult<Vec<JoinNodeId>> {
        let candidates: Vec<JoinNodeId> = (0..self.nodes.len() as u32)
            .map(JoinNodeId)
            .filter(|id| !self.node(*id).is_root())
            .collect();
        let mut remaining = candidates.clone();
        let mut emitted: Vec<JoinNodeId> = Vec::with_capacity(remaining.len());

        let done = |emitted: &[JoinNodeId], id: JoinNodeId, this: &Self| -> bool {
            let node = this.node(id);
            let parent_ok = node
                .parent
                .map(|p| this.node(p).is_root() || emitted.contains(&p))
                .unwrap_or(true);
            parent_ok
                && node
                    .dependencies
                    .iter()
                    .all(|dep| this.node(*dep).is_root() || emitted.contains(dep))
        };

        while !remaining.is_empty() {
            let position = remaining
                .iter()
                .position(|id| done(&emitted, *id, self));
            match position {
                Some(pos) => emitted.push(remaining.remove(pos)),
                None => {
                    let alias = self.node(remaining[0]).alias.to_string();
                    return Err(QueryError::DependencyCycle { alias });
                }
            }
        }
        Ok(emitted)
    }
}

/// The mutable pieces of one query level used during resolution.
pub(crate) struct ResolveLevel<'a> {
    pub joins: &'a mut JoinManager,
    pub scope: &'a mut AliasScope,
}

/// Resolve a path expression in place, rebinding its base.
///
/// The first segment is matched against the level's aliases, then the
/// outer level's (correlation); otherwise the walk starts at the root.
pub(crate) fn resolve_path(
    metamodel: &Metamodel,
    level: &mut ResolveLevel<'_>,
    mut outer: Option<&mut ResolveLevel<'_>>,
    path: &mut PathExpression,
    opts: &ResolveOptions,
) -> QueryResult<()> {
    let head = path.head().to_string();
    let full = path.clone();

    // Local aliases win over outer ones (shadowing).
    if let Some(info) = level.scope.get_local(&head) {
        match info.kind {
            AliasKind::Select(_) => {
                if !path.is_single() {
                    return Err(QueryError::path(
                        path.dotted(),
                        "a path starting with a select alias is not allowed",
                    ));
                }
                path.base = Some(PathBase::SelectAlias);
                return Ok(());
            }
            AliasKind::Join(start) => {
                let tail: Vec<SmolStr> = path.segments[1..].to_vec();
                let (node, property) = level.joins.walk_segments(
                    metamodel, level.scope, start, &tail, &full, opts, false,
                )?;
                level.joins.mark(node, opts);
                path.base = Some(PathBase::Join {
                    node: node.index(),
                    alias: level.joins.node(node).alias.clone(),
                    property,
                });
                return Ok(());
            }
        }
    }

    if let Some(outer_level) = outer.as_deref_mut() {
        if let Some(info) = outer_level.scope.get_local(&head) {
            match info.kind {
                AliasKind::Select(_) => {
                    return Err(QueryError::path(
                        path.dotted(),
                        "a subquery cannot reference an outer select alias",
                    ));
                }
                AliasKind::Join(start) => {
                    let tail: Vec<SmolStr> = path.segments[1..].to_vec();
                    // Joins float up: to-one navigation from an outer
                    // alias joins in the outer query.
                    let (node, property) = outer_level.joins.walk_segments(
                        metamodel,
                        outer_level.scope,
                        start,
                        &tail,
                        &full,
                        opts,
                        true,
                    )?;
                    path.base = Some(PathBase::Join {
                        node: node.index(),
                        alias: outer_level.joins.node(node).alias.clone(),
                        property,
                    });
                    return Ok(());
                }
            }
        }
    }

    // Attribute-based lookup from the root.
    let start = level.joins.root();
    let segments: Vec<SmolStr> = path.segments.to_vec();
    let (node, property) =
        level
            .joins
            .walk_segments(metamodel, level.scope, start, &segments, &full, opts, false)?;
    level.joins.mark(node, opts);
    path.base = Some(PathBase::Join {
        node: node.index(),
        alias: level.joins.node(node).alias.clone(),
        property,
    });
    Ok(())
}

/// Create an explicitly aliased join for `path`.
///
/// Intermediate segments reuse or create default nodes; the final
/// segment always gets its own node under the given alias. `default`
/// claims the relation's default slot, which fails when one exists.
pub(crate) fn explicit_join(
    metamodel: &Metamodel,
    level: &mut ResolveLevel<'_>,
    path: &PathExpression,
    alias: SmolStr,
    join_type: JoinType,
    default: bool,
) -> QueryResult<JoinNodeId> {
    let opts = ResolveOptions::clause(ClauseKind::Join);
    let (start, segments): (JoinNodeId, &[SmolStr]) =
        match level.scope.get_local(path.head()) {
            Some(info) => match info.kind {
                AliasKind::Join(node) => (node, &path.segments[1..]),
                AliasKind::Select(_) => {
                    return Err(QueryError::path(
                        path.dotted(),
                        "cannot join starting from a select alias",
                    ));
                }
            },
            None => (level.joins.root(), &path.segments[..]),
        };
    if segments.is_empty() {
        return Err(QueryError::path(path.dotted(), "nothing to join"));
    }
    let (intermediate, last) = segments.split_at(segments.len() - 1);
    let (parent, property) = level.joins.walk_segments(
        metamodel,
        level.scope,
        start,
        intermediate,
        path,
        &opts,
        false,
    )?;
    debug_assert!(property.is_none());

    let entity = level.joins.node(parent).entity.clone();
    let attribute = metamodel
        .attribute(&entity, &last[0])
        .ok_or_else(|| {
            QueryError::path(
                path.dotted(),
                format!("unknown attribute `{}` on entity `{entity}`", last[0]),
            )
        })?
        .clone();
    if !attribute.is_relation() {
        return Err(QueryError::path(
            path.dotted(),
            "only relation attributes can be joined",
        ));
    }
    let node = level.joins.create_node(
        level.scope,
        parent,
        &attribute,
        Some(alias),
        Some(join_type),
        default,
        &opts,
    )?;
    level.joins.mark(node, &opts);
    Ok(node)
}

/// A resolved correlated-root declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CorrelatedPath {
    /// The element entity the subquery root iterates.
    pub entity: SmolStr,
    /// The rendered correlation, e.g. `customer_1.orders`.
    pub correlation: String,
    /// The root-prefixed absolute form, e.g. `o.customer.orders`.
    pub absolute: String,
    /// The iterated relation attribute name.
    pub attribute: SmolStr,
}

/// Resolve the outer path a correlated subquery root iterates.
pub(crate) fn resolve_correlated_root(
    metamodel: &Metamodel,
    outer: &mut ResolveLevel<'_>,
    path: &PathExpression,
) -> QueryResult<CorrelatedPath> {
    let head = path.head();
    let info = outer.scope.get_local(head).ok_or_else(|| {
        QueryError::path(
            path.dotted(),
            "a correlated path must start with an alias of the outer query",
        )
    })?;
    let start = match info.kind {
        AliasKind::Join(node) => node,
        AliasKind::Select(_) => {
            return Err(QueryError::path(
                path.dotted(),
                "a correlated path cannot start with a select alias",
            ));
        }
    };
    if path.is_single() {
        return Err(QueryError::path(
            path.dotted(),
            "a correlated path must navigate a relation",
        ));
    }

    // All but the last segment must be to-one navigation in the outer
    // query; the last segment is the iterated relation.
    let tail = &path.segments[1..];
    let (intermediate, last) = tail.split_at(tail.len() - 1);
    let opts = ResolveOptions::clause(ClauseKind::Join).with_object_leaf();
    let (parent_node, none_property) = outer.joins.walk_segments(
        metamodel,
        outer.scope,
        start,
        intermediate,
        path,
        &opts,
        true,
    )?;
    debug_assert!(none_property.is_none());

    let entity = outer.joins.node(parent_node).entity.clone();
    let attribute = metamodel.attribute(&entity, &last[0]).ok_or_else(|| {
        QueryError::path(
            path.dotted(),
            format!("unknown attribute `{}` on entity `{entity}`", last[0]),
        )
    })?;
    let target = attribute.target().ok_or_else(|| {
        QueryError::path(path.dotted(), "a correlated root must iterate a relation")
    })?;
    let parent = outer.joins.node(parent_node);
    Ok(CorrelatedPath {
        entity: SmolStr::new(target),
        correlation: format!("{}.{}", parent.alias, attribute.name),
        absolute: format!("{}.{}", parent.absolute_path, attribute.name),
        attribute: attribute.name.clone(),
    })
}
