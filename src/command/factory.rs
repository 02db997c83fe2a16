use std::sync::Arc;

use super::lookup::{MultiObjectLoadCommand, MultiTimestampLoadCommand, RelationLookupCommand, SingleObjectLoadCommand};
use super::query::{CustomQueryCommand, DataContainerQueryCommand, Query, ScalarQueryCommand};
use super::save::SaveCommand;
use crate::data::{DataContainer, ObjectId};
use crate::mapping::{PropertyKey, SortExpression};
use crate::model::RdbmsPersistenceModel;

/// One constructor per storage operation, all bound to the same model.
#[derive(Debug, Clone)]
pub struct StorageProviderCommandFactory {
    model: Arc<RdbmsPersistenceModel>,
}

impl StorageProviderCommandFactory {
    pub fn new(model: Arc<RdbmsPersistenceModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<RdbmsPersistenceModel> {
        &self.model
    }

    pub fn create_for_single_id_lookup(&self, object_id: ObjectId) -> SingleObjectLoadCommand {
        SingleObjectLoadCommand::new(self.model.clone(), object_id)
    }

    pub fn create_for_sorted_multi_id_lookup(&self, object_ids: Vec<ObjectId>) -> MultiObjectLoadCommand {
        MultiObjectLoadCommand::new(self.model.clone(), object_ids)
    }

    pub fn create_for_relation_lookup(
        &self,
        property: PropertyKey,
        related_id: ObjectId,
        sort_expression: Option<SortExpression>,
    ) -> RelationLookupCommand {
        RelationLookupCommand::new(self.model.clone(), property, related_id, sort_expression)
    }

    pub fn create_for_data_container_query(&self, query: Query) -> DataContainerQueryCommand {
        DataContainerQueryCommand::new(self.model.clone(), query)
    }

    pub fn create_for_custom_query(&self, query: Query) -> CustomQueryCommand {
        CustomQueryCommand::new(query)
    }

    pub fn create_for_scalar_query(&self, query: Query) -> ScalarQueryCommand {
        ScalarQueryCommand::new(query)
    }

    pub fn create_for_multi_timestamp_lookup(&self, object_ids: Vec<ObjectId>) -> MultiTimestampLoadCommand {
        MultiTimestampLoadCommand::new(self.model.clone(), object_ids)
    }

    pub fn create_for_save(&self, containers: Vec<DataContainer>) -> SaveCommand {
        SaveCommand::new(self.model.clone(), containers)
    }
}
