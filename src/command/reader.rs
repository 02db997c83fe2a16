use crate::core::{PersistenceError, Result, Value};
use crate::data::{DataContainer, ObjectId};
use crate::model::RdbmsPersistenceModel;
use crate::result::{DataRow, QueryResult};
use crate::storage::{ColumnValueReader, ObjectIdStoragePropertyDefinition};

/// Reads an `ID`/`ClassID` pair; a NULL ID yields `None`.
pub fn read_object_id(definition: &ObjectIdStoragePropertyDefinition, row: &DataRow<'_>) -> Result<Option<ObjectId>> {
    let value = row.read(&definition.value.column)?;
    if value.is_null() {
        return Ok(None);
    }

    match row.read(&definition.class_id.column)? {
        Value::Text(class_id) => Ok(Some(ObjectId::new(class_id, value)?)),
        other => Err(PersistenceError::TypeMismatch(format!(
            "Column '{}' must contain a class ID, got {}",
            definition.class_id.column.name,
            other.type_name()
        ))),
    }
}

/// Materializes rows of an entity into data containers.
pub struct DataContainerReader<'a> {
    model: &'a RdbmsPersistenceModel,
}

impl<'a> DataContainerReader<'a> {
    pub fn new(model: &'a RdbmsPersistenceModel) -> Self {
        Self { model }
    }

    /// `None` for a row whose ID is NULL.
    pub fn read(&self, row: &DataRow<'_>) -> Result<Option<DataContainer>> {
        let infrastructure = self.model.infrastructure();
        let Some(id) = read_object_id(infrastructure.object_id_storage_property(), row)? else {
            return Ok(None);
        };

        let timestamp = row.read(infrastructure.timestamp_column())?;
        let mut container = DataContainer::new_loaded(id, timestamp);

        let mapping = self.model.mapping();
        let class = mapping.class_by_id(container.id().class_id())?;
        for property in mapping.all_persistent_properties(class) {
            let value = self.model.storage_property(property)?.combine_value(row)?;
            container.set_loaded_value(property, value);
        }

        Ok(Some(container))
    }

    pub fn read_all(&self, result: &QueryResult) -> Result<Vec<Option<DataContainer>>> {
        result.data_rows().map(|row| self.read(&row)).collect()
    }

    pub fn read_object_ids(&self, result: &QueryResult) -> Result<Vec<Option<ObjectId>>> {
        let definition = self.model.infrastructure().object_id_storage_property();
        result.data_rows().map(|row| read_object_id(definition, &row)).collect()
    }

    /// Reads `(ID, Timestamp)` pairs, skipping rows without an ID.
    pub fn read_timestamps(&self, result: &QueryResult) -> Result<Vec<(ObjectId, Value)>> {
        let infrastructure = self.model.infrastructure();
        let mut timestamps = Vec::with_capacity(result.row_count());
        for row in result.data_rows() {
            if let Some(id) = read_object_id(infrastructure.object_id_storage_property(), &row)? {
                timestamps.push((id, row.read(infrastructure.timestamp_column())?));
            }
        }
        Ok(timestamps)
    }
}
