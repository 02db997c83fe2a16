use std::sync::Arc;

use super::names::StorageNameProvider;
use super::property::{
    ObjectIdStoragePropertyDefinition, ObjectIdWithoutClassIdStoragePropertyDefinition,
    SerializedObjectIdStoragePropertyDefinition, SimpleStoragePropertyDefinition,
    StoragePropertyDefinition, StoragePropertySlot, UnsupportedStorageProperty,
};
use super::types::StorageTypeInformationProvider;
use crate::core::ColumnDefinition;
use crate::mapping::{MappingConfiguration, PropertyKey};

/// Maps scalar properties to a single column.
pub struct ValueStoragePropertyDefinitionFactory {
    names: Arc<dyn StorageNameProvider>,
    types: Arc<dyn StorageTypeInformationProvider>,
}

impl ValueStoragePropertyDefinitionFactory {
    pub fn new(names: Arc<dyn StorageNameProvider>, types: Arc<dyn StorageTypeInformationProvider>) -> Self {
        Self { names, types }
    }

    /// Never fails: unmappable types come back as the error half of the slot.
    pub fn create(&self, mapping: &MappingConfiguration, property: PropertyKey) -> StoragePropertySlot {
        let definition = mapping.property(property);

        // rows of sibling classes share the table and leave this column unset
        let class = definition.class();
        let below_table = mapping
            .ancestors(class)
            .into_iter()
            .any(|ancestor| mapping.class(ancestor).table.is_some());

        let storage_type = self
            .types
            .storage_type_for_property(definition, below_table)
            .map_err(|err| UnsupportedStorageProperty {
                property_type: definition.property_type.to_string(),
                message: format!(
                    "There was an error when retrieving storage type for property '{}' (type '{}'): {}",
                    mapping.property_identifier(property),
                    definition.property_type,
                    err
                ),
            })?;

        let column = ColumnDefinition::new(self.names.column_name(mapping, property), storage_type);
        Ok(Arc::new(StoragePropertyDefinition::Simple(SimpleStoragePropertyDefinition::new(column))))
    }
}

/// Maps the foreign-key side of a relation.
pub struct RelationStoragePropertyDefinitionFactory {
    storage_provider: String,
    force_class_id_columns: bool,
    names: Arc<dyn StorageNameProvider>,
    types: Arc<dyn StorageTypeInformationProvider>,
}

impl RelationStoragePropertyDefinitionFactory {
    pub fn new(
        storage_provider: impl Into<String>,
        force_class_id_columns: bool,
        names: Arc<dyn StorageNameProvider>,
        types: Arc<dyn StorageTypeInformationProvider>,
    ) -> Self {
        Self {
            storage_provider: storage_provider.into(),
            force_class_id_columns,
            names,
            types,
        }
    }

    pub fn create(&self, mapping: &MappingConfiguration, property: PropertyKey) -> StoragePropertySlot {
        let definition = mapping.property(property);
        let Some(relation) = &definition.relation else {
            return Err(UnsupportedStorageProperty {
                property_type: definition.property_type.to_string(),
                message: format!(
                    "Property '{}' is not a relation property",
                    mapping.property_identifier(property)
                ),
            });
        };

        let opposite = mapping.class(relation.opposite_class);
        let column_name = self.names.relation_column_name(mapping, property);

        if opposite.storage_provider != self.storage_provider {
            let column = ColumnDefinition::new(column_name, self.types.storage_type_for_serialized_object_id(true));
            return Ok(Arc::new(StoragePropertyDefinition::SerializedObjectId(
                SerializedObjectIdStoragePropertyDefinition {
                    serialized: SimpleStoragePropertyDefinition::new(column),
                },
            )));
        }

        // a relation may be unset regardless of the property's own nullability
        let value = SimpleStoragePropertyDefinition::new(ColumnDefinition::new(
            column_name,
            self.types.storage_type_for_id(true),
        ));

        if mapping.is_part_of_inheritance_hierarchy(relation.opposite_class) || self.force_class_id_columns {
            let class_id = SimpleStoragePropertyDefinition::new(ColumnDefinition::new(
                self.names.relation_class_id_column_name(mapping, property),
                self.types.storage_type_for_class_id(true),
            ));
            Ok(Arc::new(StoragePropertyDefinition::ObjectId(ObjectIdStoragePropertyDefinition {
                value,
                class_id,
            })))
        } else {
            Ok(Arc::new(StoragePropertyDefinition::ObjectIdWithoutClassId(
                ObjectIdWithoutClassIdStoragePropertyDefinition {
                    value,
                    class_id: opposite.id.clone(),
                },
            )))
        }
    }
}

/// Dispatches to the value or relation factory.
pub struct DataStoragePropertyDefinitionFactory {
    value: ValueStoragePropertyDefinitionFactory,
    relation: RelationStoragePropertyDefinitionFactory,
}

impl DataStoragePropertyDefinitionFactory {
    pub fn new(value: ValueStoragePropertyDefinitionFactory, relation: RelationStoragePropertyDefinitionFactory) -> Self {
        Self { value, relation }
    }

    pub fn create(&self, mapping: &MappingConfiguration, property: PropertyKey) -> StoragePropertySlot {
        if mapping.property(property).is_relation() {
            self.relation.create(mapping, property)
        } else {
            self.value.create(mapping, property)
        }
    }
}
