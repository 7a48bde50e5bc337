//! Attribute definitions: scalars and relations between entities.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::ScalarType;

/// Cardinality of a relation attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// One-to-one relation.
    OneToOne,
    /// Many-to-one relation.
    ManyToOne,
    /// One-to-many relation.
    OneToMany,
    /// Many-to-many relation.
    ManyToMany,
}

impl Cardinality {
    /// Check if this is a "to-one" relation.
    pub fn is_to_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Check if this is a "to-many" (collection-valued) relation.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneToOne => write!(f, "1:1"),
            Self::ManyToOne => write!(f, "n:1"),
            Self::OneToMany => write!(f, "1:n"),
            Self::ManyToMany => write!(f, "m:n"),
        }
    }
}

/// What kind of value an attribute holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// A basic scalar column.
    Scalar(ScalarType),
    /// A relation to another entity.
    Relation {
        /// The target entity name.
        target: SmolStr,
        /// The relation cardinality.
        cardinality: Cardinality,
    },
}

/// A declared attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: SmolStr,
    /// Scalar or relation kind.
    pub kind: AttributeKind,
    /// Whether the attribute is nullable / the relation optional.
    pub optional: bool,
    /// Whether this attribute is the entity identifier.
    pub identifier: bool,
}

impl Attribute {
    /// Create a scalar attribute.
    pub fn scalar(name: impl Into<SmolStr>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Scalar(ty),
            optional: false,
            identifier: false,
        }
    }

    /// Create a to-one relation attribute.
    pub fn to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Relation {
                target: target.into(),
                cardinality: Cardinality::ManyToOne,
            },
            optional: false,
            identifier: false,
        }
    }

    /// Create a to-many relation attribute.
    pub fn to_many(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Relation {
                target: target.into(),
                cardinality: Cardinality::OneToMany,
            },
            optional: false,
            identifier: false,
        }
    }

    /// Mark the attribute optional (nullable column / optional relation).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the attribute as the entity identifier.
    pub fn id(mut self) -> Self {
        self.identifier = true;
        self
    }

    /// Override the relation cardinality.
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        if let AttributeKind::Relation {
            cardinality: ref mut c,
            ..
        } = self.kind
        {
            *c = cardinality;
        }
        self
    }

    /// Check if this attribute is a relation (joinable).
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, AttributeKind::Relation { .. })
    }

    /// Check if this attribute is a collection-valued relation.
    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind,
            AttributeKind::Relation { cardinality, .. } if cardinality.is_to_many()
        )
    }

    /// The target entity name, if this is a relation.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::Relation { target, .. } => Some(target),
            AttributeKind::Scalar(_) => None,
        }
    }

    /// The scalar type, if this is a scalar attribute.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            AttributeKind::Scalar(ty) => Some(ty),
            AttributeKind::Relation { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality() {
        assert!(Cardinality::ManyToOne.is_to_one());
        assert!(Cardinality::OneToMany.is_to_many());
        assert!(!Cardinality::OneToOne.is_to_many());
    }

    #[test]
    fn test_scalar_attribute() {
        let attr = Attribute::scalar("name", ScalarType::String).optional();
        assert!(!attr.is_relation());
        assert!(attr.optional);
        assert_eq!(attr.scalar_type(), Some(ScalarType::String));
        assert_eq!(attr.target(), None);
    }

    #[test]
    fn test_relation_attribute() {
        let attr = Attribute::to_many("items", "OrderItem");
        assert!(attr.is_relation());
        assert!(attr.is_collection());
        assert_eq!(attr.target(), Some("OrderItem"));

        let attr = Attribute::to_one("customer", "Customer").optional();
        assert!(!attr.is_collection());
        assert!(attr.optional);
    }

    #[test]
    fn test_identifier_attribute() {
        let attr = Attribute::scalar("id", ScalarType::BigInt).id();
        assert!(attr.identifier);
    }
}
