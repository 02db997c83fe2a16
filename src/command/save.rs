use std::sync::Arc;

use super::sql::{self, SqlStatement};
use super::{RdbmsExecutionContext, StorageProviderCommand};
use crate::core::{EntityNameDefinition, PersistenceError, Result, Value};
use crate::data::{DataContainer, DataContainerState, ObjectId, PropertyValue};
use crate::mapping::ClassKey;
use crate::model::RdbmsPersistenceModel;
use crate::storage::ColumnValue;

/// A write plus the object whose timestamp it checks, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveStatement {
    pub statement: SqlStatement,
    pub checked_object: Option<ObjectId>,
}

/// Writes a batch of data containers.
///
/// Statements run in three phases: inserts without foreign key columns,
/// then updates (changed objects, foreign keys of new objects, foreign keys
/// cleared on deleted objects), then deletes. Inserting all rows before any
/// foreign key is set lets objects of one batch reference each other.
pub struct SaveCommand {
    model: Arc<RdbmsPersistenceModel>,
    containers: Vec<DataContainer>,
}

impl SaveCommand {
    pub fn new(model: Arc<RdbmsPersistenceModel>, containers: Vec<DataContainer>) -> Self {
        Self { model, containers }
    }

    fn table_of(&self, container: &DataContainer) -> Result<(ClassKey, EntityNameDefinition)> {
        let class = self.model.mapping().class_by_id(container.id().class_id())?;
        let entity = self.model.entity_definition(class)?;
        let table = entity.table_for_writes().ok_or_else(|| {
            PersistenceError::InvalidConfiguration(format!(
                "Class '{}' is stored in a {} and cannot be written",
                container.id().class_id(),
                entity.kind_name()
            ))
        })?;
        Ok((class, table.table_name.clone()))
    }

    /// Builds every statement of the batch, in execution order.
    pub fn statements(&self, dialect: &dyn sql::SqlDialect) -> Result<Vec<SaveStatement>> {
        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();

        for container in &self.containers {
            let (class, table) = self.table_of(container)?;
            match container.state() {
                DataContainerState::New => {
                    inserts.push(self.insert_statement(dialect, container, class, &table)?);
                    if let Some(update) = self.foreign_key_statement(dialect, container, class, &table)? {
                        updates.push(update);
                    }
                }
                DataContainerState::Changed => {
                    updates.push(self.update_statement(dialect, container, &table)?);
                }
                // deleted before it was ever stored
                DataContainerState::Deleted if container.timestamp().is_none() => {}
                DataContainerState::Deleted => {
                    let cleared = self.clear_foreign_keys_statement(dialect, container, class, &table)?;
                    deletes.push(self.delete_statement(dialect, container, &table, cleared.is_some()));
                    updates.extend(cleared);
                }
                DataContainerState::Unchanged => {}
            }
        }

        inserts.extend(updates);
        inserts.extend(deletes);
        Ok(inserts)
    }

    fn id_columns<'m>(&'m self, container: &DataContainer) -> [ColumnValue<'m>; 2] {
        let infrastructure = self.model.infrastructure();
        [
            ColumnValue {
                column: infrastructure.id_column(),
                value: container.id().value().clone(),
            },
            ColumnValue {
                column: infrastructure.class_id_column(),
                value: Value::Text(container.id().class_id().to_string()),
            },
        ]
    }

    /// `ID = ...`, plus `Timestamp = ...` when the container knows its timestamp.
    fn key_comparisons<'m>(&'m self, container: &DataContainer, check_timestamp: bool) -> Vec<ColumnValue<'m>> {
        let infrastructure = self.model.infrastructure();
        let mut comparisons = vec![ColumnValue {
            column: infrastructure.id_column(),
            value: container.id().value().clone(),
        }];
        if check_timestamp && let Some(timestamp) = container.timestamp() {
            comparisons.push(ColumnValue {
                column: infrastructure.timestamp_column(),
                value: timestamp.clone(),
            });
        }
        comparisons
    }

    fn insert_statement(
        &self,
        dialect: &dyn sql::SqlDialect,
        container: &DataContainer,
        class: ClassKey,
        table: &EntityNameDefinition,
    ) -> Result<SaveStatement> {
        let mut values: Vec<ColumnValue<'_>> = self.id_columns(container).into_iter().collect();
        for property in self.model.mapping().all_persistent_properties(class) {
            let Some(value) = container.value(property) else {
                continue;
            };
            let storage_property = self.model.storage_property(property)?;
            if storage_property.can_create_foreign_key() {
                continue;
            }
            values.extend(storage_property.split_value(value)?);
        }

        Ok(SaveStatement {
            statement: sql::insert(dialect, table, &values),
            checked_object: None,
        })
    }

    fn foreign_key_statement(
        &self,
        dialect: &dyn sql::SqlDialect,
        container: &DataContainer,
        class: ClassKey,
        table: &EntityNameDefinition,
    ) -> Result<Option<SaveStatement>> {
        let mapping = self.model.mapping();
        let mut assignments = Vec::new();
        for property in mapping.all_persistent_properties(class) {
            if !mapping.property(property).is_relation() {
                continue;
            }
            let Some(value) = container.value(property) else {
                continue;
            };
            if value.as_reference().is_none() {
                continue;
            }
            let storage_property = self.model.storage_property(property)?;
            if storage_property.can_create_foreign_key() {
                assignments.extend(storage_property.split_value(value)?);
            }
        }

        if assignments.is_empty() {
            return Ok(None);
        }
        Ok(Some(SaveStatement {
            statement: sql::update(dialect, table, &assignments, &self.key_comparisons(container, false)),
            checked_object: None,
        }))
    }

    fn update_statement(
        &self,
        dialect: &dyn sql::SqlDialect,
        container: &DataContainer,
        table: &EntityNameDefinition,
    ) -> Result<SaveStatement> {
        let mapping = self.model.mapping();
        let mut assignments = Vec::new();
        for property in container.changed_properties() {
            if !mapping.property(property).is_persistent() {
                continue;
            }
            if let Some(value) = container.value(property) {
                assignments.extend(self.model.storage_property(property)?.split_value(value)?);
            }
        }

        // touch the row so its timestamp still moves
        if assignments.is_empty() {
            let [_, class_id] = self.id_columns(container);
            assignments.push(class_id);
        }

        Ok(SaveStatement {
            statement: sql::update(dialect, table, &assignments, &self.key_comparisons(container, true)),
            checked_object: Some(container.id().clone()),
        })
    }

    fn clear_foreign_keys_statement(
        &self,
        dialect: &dyn sql::SqlDialect,
        container: &DataContainer,
        class: ClassKey,
        table: &EntityNameDefinition,
    ) -> Result<Option<SaveStatement>> {
        let mapping = self.model.mapping();
        let mut assignments = Vec::new();
        for property in mapping.all_persistent_properties(class) {
            if !mapping.property(property).is_relation() {
                continue;
            }
            let storage_property = self.model.storage_property(property)?;
            if storage_property.can_create_foreign_key() {
                assignments.extend(storage_property.split_value(&PropertyValue::null_reference())?);
            }
        }

        if assignments.is_empty() {
            return Ok(None);
        }
        Ok(Some(SaveStatement {
            statement: sql::update(dialect, table, &assignments, &self.key_comparisons(container, true)),
            checked_object: Some(container.id().clone()),
        }))
    }

    /// The timestamp was already checked if the foreign keys were cleared first.
    fn delete_statement(
        &self,
        dialect: &dyn sql::SqlDialect,
        container: &DataContainer,
        table: &EntityNameDefinition,
        foreign_keys_cleared: bool,
    ) -> SaveStatement {
        SaveStatement {
            statement: sql::delete(dialect, table, &self.key_comparisons(container, !foreign_keys_cleared)),
            checked_object: Some(container.id().clone()),
        }
    }
}

impl StorageProviderCommand for SaveCommand {
    type Output = ();

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<()> {
        let statements = self.statements(context.dialect())?;
        for save in statements {
            let affected = context.execute_non_query(&save.statement)?;
            if affected == 0
                && let Some(object_id) = save.checked_object
            {
                return Err(PersistenceError::ConcurrencyViolation(vec![object_id]));
            }
        }
        Ok(())
    }
}
