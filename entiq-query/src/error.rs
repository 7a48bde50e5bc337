//! Error types for query building and resolution.
//!
//! Every error here is fatal to the in-flight builder call: nothing is
//! retried, and a builder that returned an error is in an unspecified
//! state and must be discarded.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised by the builder, the resolution engine or the renderer.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A nested builder was started or ended out of order.
    #[error("builder chaining violation: {0}")]
    BuilderChaining(String),

    /// An alias is already registered in the same scope.
    #[error("alias `{alias}` is already registered in this scope")]
    AliasConflict { alias: String },

    /// A path segment could not be resolved against the metamodel.
    #[error("unresolvable path `{path}`: {reason}")]
    UnresolvablePath { path: String, reason: String },

    /// A subquery illegally navigates an outer collection-valued
    /// association.
    #[error("illegal correlation through collection-valued path `{path}`")]
    IllegalCorrelation { path: String },

    /// A construct is not supported by this builder variant.
    #[error("{0} is not supported yet")]
    Unsupported(&'static str),

    /// The statement root references an entity missing from the metamodel.
    #[error(transparent)]
    Schema(#[from] entiq_schema::SchemaError),

    /// An expression string could not be parsed.
    #[error(transparent)]
    Parse(#[from] entiq_expr::ExprError),

    /// A parameter name or value is invalid.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Join dependencies form a cycle and cannot be ordered.
    #[error("join dependency cycle involving alias `{alias}`")]
    DependencyCycle { alias: String },

    /// A CTE attribute binding is invalid.
    #[error("CTE attribute `{attribute}` {reason}")]
    CteBinding { attribute: String, reason: String },

    /// The statement is structurally invalid (e.g. HAVING without
    /// GROUP BY).
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
}

impl QueryError {
    /// Shorthand for an unresolvable-path error.
    pub(crate) fn path(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::UnresolvablePath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a chaining violation.
    pub(crate) fn chaining(message: impl Into<String>) -> Self {
        Self::BuilderChaining(message.into())
    }
}
