//! The metamodel registry: all entity types known to a query factory.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::attribute::Attribute;
use crate::entity::EntityType;
use crate::error::{SchemaError, SchemaResult};

/// A validated registry of entity types.
///
/// Built once via [`MetamodelBuilder`] and then shared read-only by every
/// query builder created from the same factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metamodel {
    entities: IndexMap<SmolStr, EntityType>,
}

impl Metamodel {
    /// Start building a metamodel.
    pub fn builder() -> MetamodelBuilder {
        MetamodelBuilder::default()
    }

    /// Look up an entity type by name.
    pub fn entity(&self, name: &str) -> SchemaResult<&EntityType> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownEntity {
                name: name.to_string(),
            })
    }

    /// Look up an entity type by name, returning `None` when absent.
    pub fn get_entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.get(name)
    }

    /// Look up an attribute on an entity.
    pub fn attribute(&self, entity: &str, attribute: &str) -> Option<&Attribute> {
        self.entities.get(entity).and_then(|e| e.get(attribute))
    }

    /// Iterate all entity types in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.values()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the metamodel is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Builder for [`Metamodel`] with registration-time and build-time checks.
#[derive(Debug, Default)]
pub struct MetamodelBuilder {
    entities: IndexMap<SmolStr, EntityType>,
}

impl MetamodelBuilder {
    /// Register an entity type. Fails on duplicate names.
    pub fn entity(mut self, entity: EntityType) -> SchemaResult<Self> {
        if self.entities.contains_key(&entity.name) {
            return Err(SchemaError::DuplicateEntity {
                name: entity.name.to_string(),
            });
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(self)
    }

    /// Validate relation targets and identifiers, then freeze the registry.
    pub fn build(self) -> SchemaResult<Metamodel> {
        for entity in self.entities.values() {
            let mut identifiers = 0usize;
            for attribute in entity.attributes.values() {
                if attribute.identifier {
                    identifiers += 1;
                }
                if let Some(target) = attribute.target() {
                    if !self.entities.contains_key(target) {
                        return Err(SchemaError::UnknownTarget {
                            entity: entity.name.to_string(),
                            attribute: attribute.name.to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
            if identifiers == 0 {
                return Err(SchemaError::MissingIdentifier {
                    name: entity.name.to_string(),
                });
            }
            if identifiers > 1 {
                return Err(SchemaError::MultipleIdentifiers {
                    name: entity.name.to_string(),
                });
            }
        }
        Ok(Metamodel {
            entities: self.entities,
        })
    }
}
