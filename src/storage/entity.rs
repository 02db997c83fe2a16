use std::sync::Arc;

use super::foreign_key::ForeignKeyConstraintDefinition;
use super::property::{
    ObjectIdStoragePropertyDefinition, SimpleStoragePropertyDefinition, StoragePropertyDefinition,
};
use crate::core::{ColumnDefinition, EntityNameDefinition};

/// Columns shared by every entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityColumns {
    pub object_id: ObjectIdStoragePropertyDefinition,
    pub timestamp: SimpleStoragePropertyDefinition,
    /// Storage properties of the whole class hierarchy.
    pub data_properties: Vec<Arc<StoragePropertyDefinition>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyConstraintDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub storage_provider: String,
    pub table_name: EntityNameDefinition,
    pub view_name: EntityNameDefinition,
    pub columns: EntityColumns,
    pub primary_key: PrimaryKeyConstraintDefinition,
    pub foreign_keys: Vec<ForeignKeyConstraintDefinition>,
    /// Class IDs whose rows live in this table.
    pub class_ids: Vec<String>,
}

/// Rows of one class (and its descendants) within a base table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterViewDefinition {
    pub storage_provider: String,
    pub view_name: EntityNameDefinition,
    pub base_entity: Arc<EntityDefinition>,
    pub class_ids: Vec<String>,
    pub columns: EntityColumns,
}

/// Combined extent of the concrete classes below an abstract class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionViewDefinition {
    pub storage_provider: String,
    pub view_name: EntityNameDefinition,
    pub union_entities: Vec<Arc<EntityDefinition>>,
    pub columns: EntityColumns,
}

/// An abstract class without concrete descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyViewDefinition {
    pub storage_provider: String,
    pub view_name: EntityNameDefinition,
    pub columns: EntityColumns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDefinition {
    Table(TableDefinition),
    FilterView(FilterViewDefinition),
    UnionView(UnionViewDefinition),
    EmptyView(EmptyViewDefinition),
}

impl EntityDefinition {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Table(_) => "Table",
            Self::FilterView(_) => "FilterView",
            Self::UnionView(_) => "UnionView",
            Self::EmptyView(_) => "EmptyView",
        }
    }

    pub fn storage_provider(&self) -> &str {
        match self {
            Self::Table(t) => &t.storage_provider,
            Self::FilterView(f) => &f.storage_provider,
            Self::UnionView(u) => &u.storage_provider,
            Self::EmptyView(e) => &e.storage_provider,
        }
    }

    /// The name reads go against.
    pub fn view_name(&self) -> &EntityNameDefinition {
        match self {
            Self::Table(t) => &t.view_name,
            Self::FilterView(f) => &f.view_name,
            Self::UnionView(u) => &u.view_name,
            Self::EmptyView(e) => &e.view_name,
        }
    }

    pub fn entity_columns(&self) -> &EntityColumns {
        match self {
            Self::Table(t) => &t.columns,
            Self::FilterView(f) => &f.columns,
            Self::UnionView(u) => &u.columns,
            Self::EmptyView(e) => &e.columns,
        }
    }

    pub fn object_id_property(&self) -> &ObjectIdStoragePropertyDefinition {
        &self.entity_columns().object_id
    }

    pub fn timestamp_property(&self) -> &SimpleStoragePropertyDefinition {
        &self.entity_columns().timestamp
    }

    pub fn data_properties(&self) -> &[Arc<StoragePropertyDefinition>] {
        &self.entity_columns().data_properties
    }

    /// ID, ClassID, Timestamp, then data columns; duplicates by name removed.
    pub fn all_columns(&self) -> Vec<&ColumnDefinition> {
        let columns = self.entity_columns();
        let mut result = vec![
            &columns.object_id.value.column,
            &columns.object_id.class_id.column,
            &columns.timestamp.column,
        ];
        for property in &columns.data_properties {
            for column in property.columns() {
                if !result.iter().any(|c| c.name == column.name) {
                    result.push(column);
                }
            }
        }
        result
    }

    pub fn is_empty_view(&self) -> bool {
        matches!(self, Self::EmptyView(_))
    }

    /// Distinct tables holding the rows of this entity.
    pub fn tables(&self) -> Vec<&TableDefinition> {
        let mut result: Vec<&TableDefinition> = Vec::new();
        let mut stack = vec![self];
        while let Some(entity) = stack.pop() {
            match entity {
                Self::Table(table) => {
                    if !result.iter().any(|t| t.table_name == table.table_name) {
                        result.push(table);
                    }
                }
                Self::FilterView(filter) => stack.push(&filter.base_entity),
                Self::UnionView(union) => stack.extend(union.union_entities.iter().rev().map(|e| e.as_ref())),
                Self::EmptyView(_) => {}
            }
        }
        result
    }

    /// The table inserts, updates and deletes go to.
    pub fn table_for_writes(&self) -> Option<&TableDefinition> {
        match self {
            Self::Table(table) => Some(table),
            Self::FilterView(filter) => filter.base_entity.table_for_writes(),
            Self::UnionView(_) | Self::EmptyView(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbType, StorageTypeInformation};

    fn columns() -> EntityColumns {
        let guid = StorageTypeInformation::new("uniqueidentifier", DbType::Guid, Some(16));
        let class = StorageTypeInformation::new("varchar(100)", DbType::AnsiString, Some(100));
        let ts = StorageTypeInformation::new("rowversion", DbType::Binary, Some(8));
        let name = StorageTypeInformation::new("nvarchar(50)", DbType::String, Some(50));
        let data = Arc::new(StoragePropertyDefinition::Simple(SimpleStoragePropertyDefinition::new(
            ColumnDefinition::new("Name", name),
        )));
        EntityColumns {
            object_id: ObjectIdStoragePropertyDefinition {
                value: SimpleStoragePropertyDefinition::new(ColumnDefinition::new("ID", guid).primary_key()),
                class_id: SimpleStoragePropertyDefinition::new(ColumnDefinition::new("ClassID", class)),
            },
            timestamp: SimpleStoragePropertyDefinition::new(ColumnDefinition::new("Timestamp", ts)),
            data_properties: vec![data.clone(), data],
        }
    }

    fn table() -> Arc<EntityDefinition> {
        let columns = columns();
        Arc::new(EntityDefinition::Table(TableDefinition {
            storage_provider: "main".into(),
            table_name: EntityNameDefinition::new(None, "Order"),
            view_name: EntityNameDefinition::new(None, "OrderView"),
            primary_key: PrimaryKeyConstraintDefinition {
                name: "PK_Order".into(),
                columns: vec![columns.object_id.value.column.clone()],
            },
            columns,
            foreign_keys: Vec::new(),
            class_ids: vec!["Order".into()],
        }))
    }

    #[test]
    fn test_all_columns_deduplicated() {
        let names: Vec<String> = table().all_columns().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["ID", "ClassID", "Timestamp", "Name"]);
    }

    #[test]
    fn test_tables_of_union_are_distinct() {
        let table = table();
        let filter = Arc::new(EntityDefinition::FilterView(FilterViewDefinition {
            storage_provider: "main".into(),
            view_name: EntityNameDefinition::new(None, "InvoiceView"),
            base_entity: table.clone(),
            class_ids: vec!["Invoice".into()],
            columns: columns(),
        }));
        let union = EntityDefinition::UnionView(UnionViewDefinition {
            storage_provider: "main".into(),
            view_name: EntityNameDefinition::new(None, "DocumentView"),
            union_entities: vec![table, filter.clone()],
            columns: columns(),
        });

        assert_eq!(union.tables().len(), 1);
        assert!(union.table_for_writes().is_none());
        assert_eq!(
            filter.table_for_writes().map(|t| t.table_name.name.as_str()),
            Some("Order")
        );
    }
}
