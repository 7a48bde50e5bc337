//! # entiq-expr
//!
//! Expression AST and parser for the entiq query builder.
//!
//! The AST is a pair of tagged unions ([`Expression`] for values,
//! [`Predicate`] for boolean trees); every analysis pass over them is a
//! plain `match`. The parser is a nom recursive-descent grammar for the
//! path/predicate strings accepted by the builder API.
//!
//! ```rust
//! use entiq_expr::{parse_predicate, Predicate};
//!
//! let pred = parse_predicate("o.customer.name = :name AND o.total > 100").unwrap();
//! assert!(matches!(pred, Predicate::And(_)));
//! assert_eq!(
//!     pred.to_string(),
//!     "o.customer.name = :name AND o.total > 100"
//! );
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod render;

pub use ast::{
    BinaryOp, CompareOp, Expression, FunctionCall, Literal, ParamRef, PathBase, PathExpression,
    Predicate,
};
pub use error::{ExprError, ExprResult};
pub use parser::{parse_expression, parse_path_expression, parse_predicate};
pub use render::{
    ExpressionRenderer, SourceRenderer, expression_to_string, predicate_to_string,
    write_expression, write_predicate,
};
