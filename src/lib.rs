//! # entiq
//!
//! A fluent entity-graph query builder: chained builder calls are
//! resolved against an entity metamodel, path expressions create
//! implicit joins, and the result is a provider-agnostic query string
//! plus parameter bindings for the host persistence layer.
//!
//! ## Quick Start
//!
//! ```rust
//! use entiq::prelude::*;
//!
//! let metamodel = Metamodel::builder()
//!     .entity(
//!         EntityType::new("Customer")
//!             .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
//!             .attribute(Attribute::scalar("name", ScalarType::String)),
//!     )
//!     .unwrap()
//!     .entity(
//!         EntityType::new("Order")
//!             .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
//!             .attribute(Attribute::scalar("total", ScalarType::Decimal))
//!             .attribute(Attribute::to_one("customer", "Customer").optional()),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let factory = QueryFactory::new(metamodel);
//! let mut builder = factory.select("Order", "o").unwrap();
//! builder
//!     .r#where("o.customer.name LIKE :pattern")
//!     .unwrap()
//!     .order_by_desc("o.total")
//!     .unwrap();
//!
//! assert_eq!(
//!     builder.to_query_string().unwrap(),
//!     "SELECT o FROM Order o LEFT JOIN o.customer customer_1 \
//!      WHERE customer_1.name LIKE :pattern ORDER BY o.total DESC NULLS LAST"
//! );
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

/// The entity metamodel.
pub mod schema {
    pub use entiq_schema::*;
}

/// The expression AST and parser.
pub mod expr {
    pub use entiq_expr::*;
}

/// The resolution and rendering core.
pub mod query {
    pub use entiq_query::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::expr::{Expression, ParamRef, PathExpression, Predicate};
    pub use crate::query::{
        JoinType, KeysetMode, ParamBinding, ParamValue, QueryBuilder, QueryError, QueryFactory,
        QueryResult, RenderedQuery, StatementKind,
    };
    pub use crate::schema::{
        Attribute, AttributeKind, Cardinality, EntityType, Metamodel, ScalarType,
    };
}

// Re-export key types at the crate root
pub use expr::{Expression, Predicate};
pub use query::{QueryBuilder, QueryError, QueryFactory, QueryResult, RenderedQuery};
pub use schema::{EntityType, Metamodel, SchemaError};
