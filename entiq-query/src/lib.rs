//! # entiq-query
//!
//! Join resolution and query rendering core for the entiq query
//! builder.
//!
//! A [`QueryFactory`] hands out fluent [`QueryBuilder`]s over a
//! validated metamodel. Path expressions in clause strings are resolved
//! against the metamodel: traversing a relation creates (or reuses) an
//! implicit join, and rendering emits the joins in dependency order.
//!
//! ```rust
//! use entiq_query::QueryFactory;
//! use entiq_schema::{Attribute, EntityType, Metamodel, ScalarType};
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
//!             .attribute(Attribute::to_one("customer", "Customer")),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let factory = QueryFactory::new(metamodel);
//! let mut builder = factory.select("Order", "o").unwrap();
//! builder.r#where("o.customer.name = :name").unwrap();
//! assert_eq!(
//!     builder.to_query_string().unwrap(),
//!     "SELECT o FROM Order o JOIN o.customer customer_1 WHERE customer_1.name = :name"
//! );
//! ```

pub mod alias;
pub mod arena;
pub mod builder;
pub mod clause;
mod core;
pub mod cte;
pub mod error;
pub mod factory;
pub mod guard;
pub mod join;
pub mod keyset;
pub mod logging;
pub mod param;
mod render;
pub mod set_ops;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use alias::{AliasInfo, AliasKind, AliasScope};
pub use arena::{ExprArena, ExprId, PredId};
pub use builder::{
    CteBuilder, OnBuilder, OrGroupBuilder, QueryBuilder, SetOperandBuilder, SubqueryBuilder,
    SubqueryInitiator,
};
pub use clause::{
    ClauseKind, GroupByManager, OrderByElement, OrderByManager, PredicateHolder,
    ResolvedExpression, SelectItem, SelectManager,
};
pub use self::core::StatementKind;
pub use cte::{AttributeBinder, CteInfo};
pub use error::{QueryError, QueryResult};
pub use factory::QueryFactory;
pub use guard::{BuilderGuard, BuilderToken, GuardSet};
pub use join::{JoinManager, JoinNode, JoinNodeId, JoinTreeNode, JoinType, ResolveOptions};
pub use keyset::{KeysetMode, KeysetReference};
pub use param::{
    GENERATED_PARAM_PREFIX, ParamBinding, ParamValue, ParameterManager, TransformerCache,
    ValueTransformer,
};
pub use render::RenderedQuery;
pub use set_ops::{SetOperation, SetOperator};
