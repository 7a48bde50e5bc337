//! # entiq-schema
//!
//! Entity metamodel for the entiq query builder.
//!
//! The metamodel answers the questions the resolution engine asks while
//! walking path expressions: does this entity have that attribute, is it
//! a scalar or a relation, is it collection-valued, is it optional, and
//! which attribute is the identifier.
//!
//! ```rust
//! use entiq_schema::{Attribute, EntityType, Metamodel, ScalarType};
//!
//! let model = Metamodel::builder()
//!     .entity(
//!         EntityType::new("Customer")
//!             .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
//!             .attribute(Attribute::scalar("name", ScalarType::String)),
//!     )
//!     .unwrap()
//!     .entity(
//!         EntityType::new("Order")
//!             .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
//!             .attribute(Attribute::to_one("customer", "Customer").optional()),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let customer = model.attribute("Order", "customer").unwrap();
//! assert!(customer.is_relation());
//! assert!(customer.optional);
//! ```

pub mod attribute;
pub mod entity;
pub mod error;
pub mod metamodel;
pub mod types;

pub use attribute::{Attribute, AttributeKind, Cardinality};
pub use entity::EntityType;
pub use error::{SchemaError, SchemaResult};
pub use metamodel::{Metamodel, MetamodelBuilder};
pub use types::ScalarType;
