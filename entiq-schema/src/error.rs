//! Error types for metamodel construction and validation.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for metamodel operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while building or validating a metamodel.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// An entity was registered twice under the same name.
    #[error("duplicate entity `{name}`")]
    #[diagnostic(code(entiq::schema::duplicate_entity))]
    DuplicateEntity { name: String },

    /// An attribute was declared twice on the same entity.
    #[error("duplicate attribute `{entity}.{attribute}`")]
    #[diagnostic(code(entiq::schema::duplicate_attribute))]
    DuplicateAttribute { entity: String, attribute: String },

    /// A relation attribute points at an entity that is not registered.
    #[error("relation `{entity}.{attribute}` targets unknown entity `{target}`")]
    #[diagnostic(code(entiq::schema::unknown_target))]
    UnknownTarget {
        entity: String,
        attribute: String,
        target: String,
    },

    /// An entity was looked up that is not part of the metamodel.
    #[error("unknown entity `{name}`")]
    #[diagnostic(code(entiq::schema::unknown_entity))]
    UnknownEntity { name: String },

    /// An entity has no identifier attribute.
    #[error("entity `{name}` has no identifier attribute")]
    #[diagnostic(code(entiq::schema::missing_identifier))]
    MissingIdentifier { name: String },

    /// An entity declares more than one identifier attribute.
    #[error("entity `{name}` declares multiple identifier attributes")]
    #[diagnostic(code(entiq::schema::multiple_identifiers))]
    MultipleIdentifiers { name: String },
}
