use std::sync::Arc;

use crate::core::{PersistenceError, Result};
use crate::mapping::{ClassKey, MappingConfiguration, MappingValidationError, PropertyKey};
use crate::storage::{
    EntityDefinition, InfrastructureStoragePropertyDefinitionProvider, StoragePropertyDefinition,
    StoragePropertyLookup, StoragePropertySlot,
};

/// Fully resolved, read-only mapping of one store.
///
/// Produced by [`super::PersistenceModelLoader`]; safe to share across threads.
#[derive(Debug, Clone)]
pub struct RdbmsPersistenceModel {
    pub(crate) storage_provider: String,
    pub(crate) mapping: Arc<MappingConfiguration>,
    pub(crate) infrastructure: Arc<InfrastructureStoragePropertyDefinitionProvider>,
    pub(crate) entities: Vec<Option<Arc<EntityDefinition>>>,
    pub(crate) properties: Vec<Option<StoragePropertySlot>>,
}

impl RdbmsPersistenceModel {
    pub fn storage_provider(&self) -> &str {
        &self.storage_provider
    }

    pub fn mapping(&self) -> &Arc<MappingConfiguration> {
        &self.mapping
    }

    pub fn infrastructure(&self) -> &InfrastructureStoragePropertyDefinitionProvider {
        &self.infrastructure
    }

    pub fn is_resolved(&self, class: ClassKey) -> bool {
        matches!(self.entities.get(class.0), Some(Some(_)))
    }

    /// Fails if the model was never resolved for `class`.
    pub fn entity_definition(&self, class: ClassKey) -> Result<&Arc<EntityDefinition>> {
        self.entities
            .get(class.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| PersistenceError::EntityNotResolved(self.mapping.class(class).id.clone()))
    }

    pub fn entity_definition_by_id(&self, class_id: &str) -> Result<&Arc<EntityDefinition>> {
        self.entity_definition(self.mapping.class_by_id(class_id)?)
    }

    /// Fails if the property was never resolved or its type is unsupported.
    pub fn storage_property(&self, property: PropertyKey) -> Result<&Arc<StoragePropertyDefinition>> {
        let definition = self.mapping.property(property);
        match self.storage_property_slot(property) {
            None => Err(PersistenceError::StoragePropertyNotResolved {
                class: self.mapping.class(definition.class()).id.clone(),
                property: definition.name.clone(),
            }),
            Some(Err(unsupported)) => Err(PersistenceError::UnsupportedPropertyType {
                class: self.mapping.class(definition.class()).id.clone(),
                property: definition.name.clone(),
                reason: unsupported.message.clone(),
            }),
            Some(Ok(storage_property)) => Ok(storage_property),
        }
    }

    /// Classes with a resolved entity.
    pub fn resolved_classes(&self) -> impl Iterator<Item = ClassKey> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.is_some())
            .map(|(index, _)| ClassKey(index))
    }

    /// Reports every persistent property whose type could not be mapped.
    pub fn validate(&self) -> Vec<MappingValidationError> {
        self.properties
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Some(Err(unsupported)) => {
                    let property = self.mapping.property(PropertyKey(index));
                    Some(MappingValidationError {
                        class: self.mapping.class(property.class()).id.clone(),
                        message: unsupported.message.clone(),
                    })
                }
                _ => None,
            })
            .collect()
    }
}

impl StoragePropertyLookup for RdbmsPersistenceModel {
    fn storage_property_slot(&self, property: PropertyKey) -> Option<&StoragePropertySlot> {
        self.properties.get(property.0).and_then(Option::as_ref)
    }
}
