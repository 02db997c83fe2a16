use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::reader::DataContainerReader;
use super::sql::{select_by_column_values, select_by_ids};
use super::{RdbmsExecutionContext, StorageProviderCommand};
use crate::core::{ColumnDefinition, PersistenceError, Result, Value};
use crate::data::{DataContainer, ObjectId, ObjectLookupResult, PropertyValue};
use crate::mapping::{PropertyKey, SortExpression, SortOrder};
use crate::model::RdbmsPersistenceModel;
use crate::storage::EntityDefinition;

/// Upper bound on IDs bound into one `IN (...)` list.
pub const MAX_IDS_PER_STATEMENT: usize = 2000;

/// Distinct ID values per entity, in first-seen order.
fn group_by_entity(
    model: &RdbmsPersistenceModel,
    ids: &[ObjectId],
) -> Result<Vec<(Arc<EntityDefinition>, Vec<Value>)>> {
    let mut groups: Vec<(Arc<EntityDefinition>, Vec<Value>)> = Vec::new();
    let mut seen: HashSet<(usize, &Value)> = HashSet::new();
    for id in ids {
        let entity = model.entity_definition_by_id(id.class_id())?;
        if entity.is_empty_view() {
            continue;
        }
        let position = match groups.iter().position(|(e, _)| Arc::ptr_eq(e, entity)) {
            Some(position) => position,
            None => {
                groups.push((entity.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        if seen.insert((position, id.value())) {
            groups[position].1.push(id.value().clone());
        }
    }
    Ok(groups)
}

/// Loads one object by its identifier.
pub struct SingleObjectLoadCommand {
    model: Arc<RdbmsPersistenceModel>,
    object_id: ObjectId,
}

impl SingleObjectLoadCommand {
    pub fn new(model: Arc<RdbmsPersistenceModel>, object_id: ObjectId) -> Self {
        Self { model, object_id }
    }
}

impl StorageProviderCommand for SingleObjectLoadCommand {
    type Output = ObjectLookupResult<DataContainer>;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        let results = MultiObjectLoadCommand::new(self.model.clone(), vec![self.object_id.clone()]).execute(context)?;
        Ok(results
            .into_iter()
            .next()
            .unwrap_or_else(|| ObjectLookupResult::new(self.object_id.clone(), None)))
    }
}

/// Loads several objects; the result follows the order of the input IDs,
/// whatever order the rows come back in.
pub struct MultiObjectLoadCommand {
    model: Arc<RdbmsPersistenceModel>,
    object_ids: Vec<ObjectId>,
}

impl MultiObjectLoadCommand {
    pub fn new(model: Arc<RdbmsPersistenceModel>, object_ids: Vec<ObjectId>) -> Self {
        Self { model, object_ids }
    }
}

impl StorageProviderCommand for MultiObjectLoadCommand {
    type Output = Vec<ObjectLookupResult<DataContainer>>;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        let infrastructure = self.model.infrastructure();
        let reader = DataContainerReader::new(&self.model);
        let mut loaded: HashMap<ObjectId, DataContainer> = HashMap::new();

        for (entity, values) in group_by_entity(&self.model, &self.object_ids)? {
            let columns = entity.all_columns();
            for chunk in values.chunks(MAX_IDS_PER_STATEMENT) {
                let statement = select_by_ids(
                    context.dialect(),
                    entity.view_name(),
                    &columns,
                    infrastructure.id_column(),
                    chunk,
                );
                let result = context.execute_reader(&statement)?;

                for container in reader.read_all(&result)?.into_iter().flatten() {
                    if loaded.contains_key(container.id()) {
                        return Err(PersistenceError::DuplicateResult {
                            object_id: container.id().clone(),
                        });
                    }
                    loaded.insert(container.id().clone(), container);
                }
            }
        }

        Ok(self
            .object_ids
            .iter()
            .map(|id| ObjectLookupResult::new(id.clone(), loaded.get(id).cloned()))
            .collect())
    }
}

/// Loads the objects whose relation property points at `related_id`.
///
/// Returns raw candidates: duplicates and `None` entries are left for the
/// execution context to reject.
pub struct RelationLookupCommand {
    model: Arc<RdbmsPersistenceModel>,
    property: PropertyKey,
    related_id: ObjectId,
    sort_expression: Option<SortExpression>,
}

impl RelationLookupCommand {
    pub fn new(
        model: Arc<RdbmsPersistenceModel>,
        property: PropertyKey,
        related_id: ObjectId,
        sort_expression: Option<SortExpression>,
    ) -> Self {
        Self {
            model,
            property,
            related_id,
            sort_expression,
        }
    }

    fn order_by(&self) -> Result<Vec<(&ColumnDefinition, SortOrder)>> {
        let mut order_by = Vec::new();
        if let Some(sort) = &self.sort_expression {
            for sorted in &sort.sorted_properties {
                let storage_property = self.model.storage_property(sorted.property)?;
                for column in storage_property.columns_for_comparison() {
                    order_by.push((column, sorted.order));
                }
            }
        }
        Ok(order_by)
    }

    /// Union views have no usable row shape, so fetch IDs first and load the
    /// objects from their concrete entities.
    fn execute_indirect(
        &self,
        context: &mut dyn RdbmsExecutionContext,
        entity: &EntityDefinition,
    ) -> Result<Vec<Option<DataContainer>>> {
        let storage_property = self.model.storage_property(self.property)?;
        let related = PropertyValue::Reference(Some(self.related_id.clone()));
        let comparisons = storage_property.split_value_for_comparison(&related)?;
        let infrastructure = self.model.infrastructure();
        let id_columns = [infrastructure.id_column(), infrastructure.class_id_column()];

        let statement = select_by_column_values(
            context.dialect(),
            entity.view_name(),
            &id_columns,
            &comparisons,
            &self.order_by()?,
        );
        let result = context.execute_reader(&statement)?;
        let ids = DataContainerReader::new(&self.model).read_object_ids(&result)?;

        let to_load: Vec<ObjectId> = ids.iter().flatten().cloned().collect();
        let mut loaded: HashMap<ObjectId, DataContainer> = HashMap::new();
        for lookup in MultiObjectLoadCommand::new(self.model.clone(), to_load).execute(context)? {
            if let Some(container) = lookup.located {
                loaded.insert(lookup.object_id, container);
            }
        }

        Ok(ids
            .into_iter()
            .map(|id| id.and_then(|id| loaded.get(&id).cloned()))
            .collect())
    }

    fn execute_direct(
        &self,
        context: &mut dyn RdbmsExecutionContext,
        entity: &EntityDefinition,
    ) -> Result<Vec<Option<DataContainer>>> {
        let storage_property = self.model.storage_property(self.property)?;
        let related = PropertyValue::Reference(Some(self.related_id.clone()));
        let comparisons = storage_property.split_value_for_comparison(&related)?;

        let statement = select_by_column_values(
            context.dialect(),
            entity.view_name(),
            &entity.all_columns(),
            &comparisons,
            &self.order_by()?,
        );
        let result = context.execute_reader(&statement)?;
        DataContainerReader::new(&self.model).read_all(&result)
    }
}

impl StorageProviderCommand for RelationLookupCommand {
    type Output = Vec<Option<DataContainer>>;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        let class = self.model.mapping().property(self.property).class();
        let entity = self.model.entity_definition(class)?.clone();

        match &*entity {
            EntityDefinition::EmptyView(_) => Ok(Vec::new()),
            EntityDefinition::UnionView(_) => self.execute_indirect(context, &entity),
            EntityDefinition::Table(_) | EntityDefinition::FilterView(_) => self.execute_direct(context, &entity),
        }
    }
}

/// Loads only the timestamps of several objects, in input order.
pub struct MultiTimestampLoadCommand {
    model: Arc<RdbmsPersistenceModel>,
    object_ids: Vec<ObjectId>,
}

impl MultiTimestampLoadCommand {
    pub fn new(model: Arc<RdbmsPersistenceModel>, object_ids: Vec<ObjectId>) -> Self {
        Self { model, object_ids }
    }
}

impl StorageProviderCommand for MultiTimestampLoadCommand {
    type Output = Vec<ObjectLookupResult<Value>>;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        let infrastructure = self.model.infrastructure();
        let reader = DataContainerReader::new(&self.model);
        let columns = [
            infrastructure.id_column(),
            infrastructure.class_id_column(),
            infrastructure.timestamp_column(),
        ];
        let mut timestamps: HashMap<ObjectId, Value> = HashMap::new();

        for (entity, values) in group_by_entity(&self.model, &self.object_ids)? {
            for chunk in values.chunks(MAX_IDS_PER_STATEMENT) {
                let statement = select_by_ids(
                    context.dialect(),
                    entity.view_name(),
                    &columns,
                    infrastructure.id_column(),
                    chunk,
                );
                let result = context.execute_reader(&statement)?;
                for (id, timestamp) in reader.read_timestamps(&result)? {
                    if timestamps.insert(id.clone(), timestamp).is_some() {
                        return Err(PersistenceError::DuplicateResult { object_id: id });
                    }
                }
            }
        }

        Ok(self
            .object_ids
            .iter()
            .map(|id| ObjectLookupResult::new(id.clone(), timestamps.get(id).cloned()))
            .collect())
    }
}
