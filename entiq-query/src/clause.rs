//! Per-clause state: select items, predicate roots, grouping, ordering.
//!
//! Clause managers own arena indices only; the ASTs themselves live in
//! the query's [`ExprArena`](crate::arena::ExprArena) so transformers can
//! rewrite entries in place.

use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::arena::{ExprId, PredId};

/// The clause a piece of query state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClauseKind {
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    /// A join's ON predicate.
    On,
    /// An UPDATE statement's SET assignments.
    Set,
    Join,
    /// A CTE definition.
    With,
    /// A set-operation operand.
    SetOperand,
}

impl ClauseKind {
    /// Display name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::On => "ON",
            Self::Set => "SET",
            Self::Join => "JOIN",
            Self::With => "WITH",
            Self::SetOperand => "set operand",
        }
    }
}

/// One select-clause entry, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    /// The projected expression.
    pub expr: ExprId,
    /// Select alias, registered in the query's alias scope when present.
    pub alias: Option<SmolStr>,
}

/// The select clause.
#[derive(Debug, Default)]
pub struct SelectManager {
    items: Vec<SelectItem>,
    distinct: bool,
}

impl SelectManager {
    /// Append a select item.
    pub fn add(&mut self, expr: ExprId, alias: Option<SmolStr>) {
        self.items.push(SelectItem { expr, alias });
    }

    /// Mark the projection DISTINCT.
    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    /// Whether the projection is DISTINCT.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Whether no item was selected (the root alias is projected then).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All select items in declaration order.
    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }

    /// Find the expression a select alias names.
    pub fn aliased_expr(&self, alias: &str) -> Option<ExprId> {
        self.items
            .iter()
            .find(|item| item.alias.as_deref() == Some(alias))
            .map(|item| item.expr)
    }
}

/// A WHERE or HAVING clause: a single conjunctive root predicate.
#[derive(Debug)]
pub struct PredicateHolder {
    clause: ClauseKind,
    root: Option<PredId>,
}

impl PredicateHolder {
    /// Create a holder for the given clause.
    pub fn new(clause: ClauseKind) -> Self {
        Self { clause, root: None }
    }

    /// The clause this holder renders into.
    pub fn clause(&self) -> ClauseKind {
        self.clause
    }

    /// The current root predicate.
    pub fn root(&self) -> Option<PredId> {
        self.root
    }

    /// Replace the root predicate, returning the previous one.
    pub fn set_root(&mut self, root: Option<PredId>) -> Option<PredId> {
        std::mem::replace(&mut self.root, root)
    }
}

/// An already-resolved expression, deduplicated by its rendered text.
///
/// Two occurrences of `o.customer.name` resolve to the same join alias
/// and therefore the same text; only one GROUP BY entry survives.
#[derive(Debug, Clone)]
pub struct ResolvedExpression {
    /// The resolved rendering of the expression.
    pub text: String,
    /// The arena slot holding the expression.
    pub expr: ExprId,
}

impl PartialEq for ResolvedExpression {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for ResolvedExpression {}

impl Hash for ResolvedExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

/// The GROUP BY clause with text-identity deduplication.
#[derive(Debug, Default)]
pub struct GroupByManager {
    entries: IndexSet<ResolvedExpression>,
}

impl GroupByManager {
    /// Add a resolved expression; duplicates by text are dropped.
    pub fn add(&mut self, entry: ResolvedExpression) -> bool {
        self.entries.insert(entry)
    }

    /// Whether no grouping was requested.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All distinct entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &ResolvedExpression> {
        self.entries.iter()
    }
}

/// One ORDER BY element.
///
/// `nullable` and `unique` describe the resolved expression and feed
/// keyset analysis; they intentionally do not participate in equality.
#[derive(Debug, Clone)]
pub struct OrderByElement {
    pub expr: ExprId,
    pub ascending: bool,
    pub nulls_first: bool,
    pub nullable: bool,
    pub unique: bool,
}

impl PartialEq for OrderByElement {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
            && self.ascending == other.ascending
            && self.nulls_first == other.nulls_first
    }
}

impl Eq for OrderByElement {}

/// The ORDER BY clause.
#[derive(Debug, Default)]
pub struct OrderByManager {
    elements: Vec<OrderByElement>,
}

impl OrderByManager {
    /// Append an element.
    pub fn add(&mut self, element: OrderByElement) {
        self.elements.push(element);
    }

    /// All elements in declaration order.
    pub fn elements(&self) -> &[OrderByElement] {
        &self.elements
    }

    /// Whether no ordering was requested.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the combined ordering is unique (some prefix element is).
    pub fn is_result_unique(&self) -> bool {
        self.elements.iter().any(|e| e.unique && !e.nullable)
    }
}
