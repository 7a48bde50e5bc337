//! Entity type definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::attribute::Attribute;

/// An entity type: a named set of attributes with one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    /// Entity name.
    pub name: SmolStr,
    /// Declared attributes, in declaration order.
    pub attributes: IndexMap<SmolStr, Attribute>,
}

impl EntityType {
    /// Create a new entity type with no attributes.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Get the entity name as a string.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an attribute, replacing any previous declaration of the same name.
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// The identifier attribute, if declared.
    pub fn identifier(&self) -> Option<&Attribute> {
        self.attributes.values().find(|a| a.identifier)
    }

    /// All relation attributes.
    pub fn relations(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| a.is_relation())
    }

    /// All scalar attributes.
    pub fn scalars(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| !a.is_relation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::types::ScalarType;

    fn order_entity() -> EntityType {
        EntityType::new("Order")
            .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
            .attribute(Attribute::scalar("total", ScalarType::Decimal))
            .attribute(Attribute::to_one("customer", "Customer").optional())
            .attribute(Attribute::to_many("items", "OrderItem"))
    }

    #[test]
    fn test_attribute_lookup() {
        let entity = order_entity();
        assert!(entity.get("customer").is_some());
        assert!(entity.get("missing").is_none());
    }

    #[test]
    fn test_identifier() {
        let entity = order_entity();
        assert_eq!(entity.identifier().map(|a| a.name.as_str()), Some("id"));
    }

    #[test]
    fn test_relation_partition() {
        let entity = order_entity();
        assert_eq!(entity.relations().count(), 2);
        assert_eq!(entity.scalars().count(), 2);
    }
}
