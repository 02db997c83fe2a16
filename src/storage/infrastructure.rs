use super::names::StorageNameProvider;
use super::property::{ObjectIdStoragePropertyDefinition, SimpleStoragePropertyDefinition};
use super::types::StorageTypeInformationProvider;
use crate::core::ColumnDefinition;

/// The three system columns every entity carries: ID, ClassID and Timestamp.
///
/// Built once per store and shared by every class in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureStoragePropertyDefinitionProvider {
    object_id: ObjectIdStoragePropertyDefinition,
    timestamp: SimpleStoragePropertyDefinition,
}

impl InfrastructureStoragePropertyDefinitionProvider {
    pub fn new(types: &dyn StorageTypeInformationProvider, names: &dyn StorageNameProvider) -> Self {
        let id_column = ColumnDefinition::new(names.id_column_name(), types.storage_type_for_id(false)).primary_key();
        let class_id_column = ColumnDefinition::new(names.class_id_column_name(), types.storage_type_for_class_id(false));
        let timestamp_column =
            ColumnDefinition::new(names.timestamp_column_name(), types.storage_type_for_timestamp(false));

        Self {
            object_id: ObjectIdStoragePropertyDefinition {
                value: SimpleStoragePropertyDefinition::new(id_column),
                class_id: SimpleStoragePropertyDefinition::new(class_id_column),
            },
            timestamp: SimpleStoragePropertyDefinition::new(timestamp_column),
        }
    }

    pub fn id_column(&self) -> &ColumnDefinition {
        &self.object_id.value.column
    }

    pub fn class_id_column(&self) -> &ColumnDefinition {
        &self.object_id.class_id.column
    }

    pub fn timestamp_column(&self) -> &ColumnDefinition {
        &self.timestamp.column
    }

    pub fn object_id_storage_property(&self) -> &ObjectIdStoragePropertyDefinition {
        &self.object_id
    }

    pub fn timestamp_storage_property(&self) -> &SimpleStoragePropertyDefinition {
        &self.timestamp
    }
}
