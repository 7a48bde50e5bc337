//! The expression AST.
//!
//! Expressions and predicates are plain tagged unions; every analysis or
//! rewrite over them is a `match`-based function, so the compiler checks
//! exhaustiveness whenever a variant is added.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;

/// What a resolved path expression is anchored to.
///
/// Unresolved paths have no base; the join resolution engine assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathBase {
    /// Anchored to a join node, with an optional trailing property.
    ///
    /// `node` is an opaque id owned by the resolver; `alias` is the join
    /// alias the path renders under, captured here so rendering needs no
    /// arena lookup even when the node lives in an outer query.
    Join {
        node: u32,
        alias: SmolStr,
        property: Option<SmolStr>,
    },
    /// The path is a reference to a select alias; it is never joined.
    SelectAlias,
}

/// A dotted path such as `customer.address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathExpression {
    /// The original dotted segments, kept intact through resolution.
    pub segments: SmallVec<[SmolStr; 4]>,
    /// Resolution result, absent until the join engine has seen the path.
    pub base: Option<PathBase>,
}

impl PathExpression {
    /// Create an unresolved path from segments.
    pub fn new(segments: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            base: None,
        }
    }

    /// The first segment (alias candidate).
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Whether this path is a single bare identifier.
    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    /// Whether the join engine has resolved this path.
    pub fn is_resolved(&self) -> bool {
        self.base.is_some()
    }

    /// The dotted source form of the path.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

/// A literal value appearing in an expression string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// A named or positional query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamRef {
    /// `:name`
    Named(SmolStr),
    /// `?1`
    Positional(u32),
}

impl std::fmt::Display for ParamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, ":{name}"),
            Self::Positional(idx) => write!(f, "?{idx}"),
        }
    }
}

/// A function invocation such as `SIZE(o.items)` or `COALESCE(a, b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Uppercased function name.
    pub name: SmolStr,
    /// Argument expressions.
    pub args: Vec<Expression>,
    /// `COUNT(DISTINCT x)`-style distinct marker.
    pub distinct: bool,
}

impl FunctionCall {
    /// Create a call with the name normalized to uppercase.
    pub fn new(name: impl AsRef<str>, args: Vec<Expression>) -> Self {
        Self {
            name: SmolStr::new(name.as_ref().to_ascii_uppercase()),
            args,
            distinct: false,
        }
    }

    /// Check the (normalized) function name.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// The source-text symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// Comparison operators usable between two value expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The source-text symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A value-producing expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A dotted path.
    Path(PathExpression),
    /// A literal value.
    Literal(Literal),
    /// A named or positional parameter marker.
    Parameter(ParamRef),
    /// A function invocation.
    Function(FunctionCall),
    /// Binary arithmetic.
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// Arithmetic negation.
    Neg(Box<Expression>),
    /// A searched CASE expression.
    Case {
        whens: Vec<(Predicate, Expression)>,
        otherwise: Option<Box<Expression>>,
    },
    /// An opaque handle to a scalar subquery owned by the enclosing
    /// builder; only the resolver can render it.
    Subquery(u32),
}

impl Expression {
    /// Shorthand for a path expression from a dotted string's segments.
    pub fn path(segments: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self::Path(PathExpression::new(segments))
    }

    /// The contained path, if this expression is exactly a path.
    pub fn as_path(&self) -> Option<&PathExpression> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Visit every sub-expression (including `self`), pre-order, until the
    /// callback breaks.
    pub fn visit<'a, B>(
        &'a self,
        f: &mut impl FnMut(&'a Expression) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        f(self)?;
        match self {
            Self::Path(_) | Self::Literal(_) | Self::Parameter(_) | Self::Subquery(_) => {
                ControlFlow::Continue(())
            }
            Self::Function(call) => {
                for arg in &call.args {
                    arg.visit(f)?;
                }
                ControlFlow::Continue(())
            }
            Self::Binary { lhs, rhs, .. } => {
                lhs.visit(f)?;
                rhs.visit(f)
            }
            Self::Neg(inner) => inner.visit(f),
            Self::Case { whens, otherwise } => {
                for (when, then) in whens {
                    when.visit_expressions(f)?;
                    then.visit(f)?;
                }
                if let Some(e) = otherwise {
                    e.visit(f)?;
                }
                ControlFlow::Continue(())
            }
        }
    }

    /// Mutably visit every path expression in the tree, post-order.
    pub fn walk_paths_mut(&mut self, f: &mut impl FnMut(&mut PathExpression)) {
        match self {
            Self::Path(path) => f(path),
            Self::Literal(_) | Self::Parameter(_) | Self::Subquery(_) => {}
            Self::Function(call) => {
                for arg in &mut call.args {
                    arg.walk_paths_mut(f);
                }
            }
            Self::Binary { lhs, rhs, .. } => {
                lhs.walk_paths_mut(f);
                rhs.walk_paths_mut(f);
            }
            Self::Neg(inner) => inner.walk_paths_mut(f),
            Self::Case { whens, otherwise } => {
                for (when, then) in whens {
                    when.walk_paths_mut(f);
                    then.walk_paths_mut(f);
                }
                if let Some(e) = otherwise {
                    e.walk_paths_mut(f);
                }
            }
        }
    }
}

/// A boolean predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Comparison between two value expressions.
    Compare {
        op: CompareOp,
        lhs: Expression,
        rhs: Expression,
    },
    /// `expr [NOT] BETWEEN lower AND upper`
    Between {
        expr: Expression,
        lower: Expression,
        upper: Expression,
        negated: bool,
    },
    /// `expr [NOT] IN (items...)`
    In {
        expr: Expression,
        items: Vec<Expression>,
        negated: bool,
    },
    /// `expr [NOT] LIKE pattern`
    Like {
        expr: Expression,
        pattern: Expression,
        negated: bool,
    },
    /// `expr IS [NOT] NULL`
    IsNull { expr: Expression, negated: bool },
    /// `[NOT] EXISTS (subquery)` — opaque handle like
    /// [`Expression::Subquery`].
    Exists { subquery: u32, negated: bool },
    /// Conjunction.
    And(Vec<Predicate>),
    /// Disjunction.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjoin two predicates, flattening nested `And`s.
    pub fn and_also(self, other: Predicate) -> Predicate {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Visit every value expression in the tree until the callback breaks.
    pub fn visit_expressions<'a, B>(
        &'a self,
        f: &mut impl FnMut(&'a Expression) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                lhs.visit(f)?;
                rhs.visit(f)
            }
            Self::Between {
                expr, lower, upper, ..
            } => {
                expr.visit(f)?;
                lower.visit(f)?;
                upper.visit(f)
            }
            Self::In { expr, items, .. } => {
                expr.visit(f)?;
                for item in items {
                    item.visit(f)?;
                }
                ControlFlow::Continue(())
            }
            Self::Like { expr, pattern, .. } => {
                expr.visit(f)?;
                pattern.visit(f)
            }
            Self::IsNull { expr, .. } => expr.visit(f),
            Self::Exists { .. } => ControlFlow::Continue(()),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.visit_expressions(f)?;
                }
                ControlFlow::Continue(())
            }
            Self::Not(inner) => inner.visit_expressions(f),
        }
    }

    /// Mutably visit every path expression under this predicate.
    pub fn walk_paths_mut(&mut self, f: &mut impl FnMut(&mut PathExpression)) {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                lhs.walk_paths_mut(f);
                rhs.walk_paths_mut(f);
            }
            Self::Between {
                expr, lower, upper, ..
            } => {
                expr.walk_paths_mut(f);
                lower.walk_paths_mut(f);
                upper.walk_paths_mut(f);
            }
            Self::In { expr, items, .. } => {
                expr.walk_paths_mut(f);
                for item in items {
                    item.walk_paths_mut(f);
                }
            }
            Self::Like { expr, pattern, .. } => {
                expr.walk_paths_mut(f);
                pattern.walk_paths_mut(f);
            }
            Self::IsNull { expr, .. } => expr.walk_paths_mut(f),
            Self::Exists { .. } => {}
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.walk_paths_mut(f);
                }
            }
            Self::Not(inner) => inner.walk_paths_mut(f),
        }
    }

    /// Mutably visit every value expression directly under this predicate.
    pub fn walk_expressions_mut(&mut self, f: &mut impl FnMut(&mut Expression)) {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Self::Between {
                expr, lower, upper, ..
            } => {
                f(expr);
                f(lower);
                f(upper);
            }
            Self::In { expr, items, .. } => {
                f(expr);
                for item in items {
                    f(item);
                }
            }
            Self::Like { expr, pattern, .. } => {
                f(expr);
                f(pattern);
            }
            Self::IsNull { expr, .. } => f(expr),
            Self::Exists { .. } => {}
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.walk_expressions_mut(f);
                }
            }
            Self::Not(inner) => inner.walk_expressions_mut(f),
        }
    }
}
