use std::sync::Arc;

use crate::command::sql::{SqlDialect, literal_list};
use crate::core::ColumnDefinition;
use crate::model::RdbmsPersistenceModel;
use crate::storage::{EntityDefinition, ForeignKeyConstraintDefinition, TableDefinition};

/// Setup and teardown DDL for one store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaScripts {
    pub setup: String,
    pub teardown: String,
}

/// Statements of one script, rendered with the dialect's delimiters.
struct ScriptBuilder<'a> {
    dialect: &'a dyn SqlDialect,
    text: String,
}

impl<'a> ScriptBuilder<'a> {
    fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self {
            dialect,
            text: String::new(),
        }
    }

    fn statement(&mut self, statement: &str) {
        self.text.push_str(statement);
        self.text.push_str(self.dialect.statement_delimiter());
        self.text.push('\n');
    }

    /// Statements that must start a batch of their own, such as CREATE VIEW.
    fn batch(&mut self, statement: &str) {
        if let Some(separator) = self.dialect.batch_separator()
            && !self.text.is_empty()
            && !self.text.ends_with(&format!("{}\n", separator))
        {
            self.text.push_str(separator);
            self.text.push('\n');
        }
        self.statement(statement);
        if let Some(separator) = self.dialect.batch_separator() {
            self.text.push_str(separator);
            self.text.push('\n');
        }
    }

    fn finish(self) -> String {
        self.text
    }
}

/// Renders CREATE and DROP scripts for the entities of a resolved model.
pub struct ScriptGenerator<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn generate(&self, model: &RdbmsPersistenceModel) -> SchemaScripts {
        let entities = distinct_entities(model);
        let tables: Vec<&TableDefinition> = entities
            .iter()
            .filter_map(|entity| match entity.as_ref() {
                EntityDefinition::Table(table) => Some(table),
                _ => None,
            })
            .collect();

        let mut setup = ScriptBuilder::new(self.dialect);
        for table in &tables {
            setup.statement(&self.create_table_sql(table));
        }
        for entity in &entities {
            setup.batch(&self.create_view_sql(entity));
        }
        for table in &tables {
            for foreign_key in &table.foreign_keys {
                setup.statement(&self.add_foreign_key_sql(table, foreign_key));
            }
        }

        let mut teardown = ScriptBuilder::new(self.dialect);
        for table in tables.iter().rev() {
            for foreign_key in table.foreign_keys.iter().rev() {
                teardown.statement(&self.drop_foreign_key_sql(table, foreign_key));
            }
        }
        for entity in entities.iter().rev() {
            teardown.statement(&format!("DROP VIEW {}", self.dialect.qualified_name(entity.view_name())));
        }
        for table in tables.iter().rev() {
            teardown.statement(&format!("DROP TABLE {}", self.dialect.qualified_name(&table.table_name)));
        }

        SchemaScripts {
            setup: setup.finish(),
            teardown: teardown.finish(),
        }
    }

    fn column_sql(&self, column: &ColumnDefinition) -> String {
        format!(
            "{} {} {}",
            self.dialect.delimit_identifier(&column.name),
            column.storage_type.storage_type_name,
            if column.is_nullable() { "NULL" } else { "NOT NULL" }
        )
    }

    pub fn create_table_sql(&self, table: &TableDefinition) -> String {
        let entity = EntityDefinition::Table(table.clone());
        let mut lines: Vec<String> = entity.all_columns().into_iter().map(|c| self.column_sql(c)).collect();

        let key_columns: Vec<String> = table
            .primary_key
            .columns
            .iter()
            .map(|c| self.dialect.delimit_identifier(&c.name))
            .collect();
        lines.push(format!(
            "CONSTRAINT {} PRIMARY KEY CLUSTERED ({})",
            self.dialect.delimit_identifier(&table.primary_key.name),
            key_columns.join(", ")
        ));

        format!(
            "CREATE TABLE {}\n(\n  {}\n)",
            self.dialect.qualified_name(&table.table_name),
            lines.join(",\n  ")
        )
    }

    fn column_names(&self, columns: &[&ColumnDefinition]) -> String {
        columns
            .iter()
            .map(|c| self.dialect.delimit_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Table rows restricted to the given class IDs.
    fn select_from_table(
        &self,
        columns: &[&ColumnDefinition],
        table: &TableDefinition,
        class_ids: Option<&[String]>,
    ) -> String {
        let table_columns = EntityDefinition::Table(table.clone());
        let available = table_columns.all_columns();
        let projection: Vec<String> = columns
            .iter()
            .map(|column| {
                if available.iter().any(|c| c.name == column.name) {
                    self.dialect.delimit_identifier(&column.name)
                } else {
                    self.null_of(column)
                }
            })
            .collect();

        let mut select = format!(
            "SELECT {} FROM {}",
            projection.join(", "),
            self.dialect.qualified_name(&table.table_name)
        );
        if let Some(class_ids) = class_ids {
            select.push_str(&format!(
                " WHERE {} IN ({})",
                self.dialect.delimit_identifier(&table.columns.object_id.class_id.column.name),
                literal_list(self.dialect, class_ids)
            ));
        }
        select
    }

    fn null_of(&self, column: &ColumnDefinition) -> String {
        // rowversion cannot be the target of a cast
        let type_name = match column.storage_type.storage_type_name.as_str() {
            "rowversion" | "timestamp" => "binary(8)",
            other => other,
        };
        format!("CAST(NULL AS {}) AS {}", type_name, self.dialect.delimit_identifier(&column.name))
    }

    pub fn create_view_sql(&self, entity: &EntityDefinition) -> String {
        let columns = entity.all_columns();
        let body = match entity {
            EntityDefinition::Table(table) => self.select_from_table(&columns, table, Some(&table.class_ids)),
            EntityDefinition::FilterView(filter) => match filter.base_entity.table_for_writes() {
                Some(table) => self.select_from_table(&columns, table, Some(&filter.class_ids)),
                None => self.empty_select(&columns),
            },
            EntityDefinition::UnionView(_) => {
                let selects: Vec<String> = entity
                    .tables()
                    .into_iter()
                    .map(|table| self.select_from_table(&columns, table, None))
                    .collect();
                if selects.is_empty() {
                    self.empty_select(&columns)
                } else {
                    selects.join("\n  UNION ALL\n  ")
                }
            }
            EntityDefinition::EmptyView(_) => self.empty_select(&columns),
        };

        format!(
            "CREATE VIEW {} ({})\n  AS\n  {}",
            self.dialect.qualified_name(entity.view_name()),
            self.column_names(&columns),
            body
        )
    }

    fn empty_select(&self, columns: &[&ColumnDefinition]) -> String {
        let projection: Vec<String> = columns.iter().map(|c| self.null_of(c)).collect();
        format!("SELECT {} WHERE 1 = 0", projection.join(", "))
    }

    pub fn add_foreign_key_sql(&self, table: &TableDefinition, foreign_key: &ForeignKeyConstraintDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.dialect.qualified_name(&table.table_name),
            self.dialect.delimit_identifier(&foreign_key.name),
            self.column_names(&foreign_key.referencing_columns.iter().collect::<Vec<_>>()),
            self.dialect.qualified_name(&foreign_key.referenced_table),
            self.column_names(&foreign_key.referenced_columns.iter().collect::<Vec<_>>())
        )
    }

    pub fn drop_foreign_key_sql(&self, table: &TableDefinition, foreign_key: &ForeignKeyConstraintDefinition) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.dialect.qualified_name(&table.table_name),
            self.dialect.delimit_identifier(&foreign_key.name)
        )
    }
}

/// One entry per view name, tables first, then filter, union and empty views.
fn distinct_entities(model: &RdbmsPersistenceModel) -> Vec<Arc<EntityDefinition>> {
    let mut entities: Vec<Arc<EntityDefinition>> = Vec::new();
    for class in model.resolved_classes() {
        let Ok(entity) = model.entity_definition(class) else {
            continue;
        };
        if !entities.iter().any(|e| e.view_name() == entity.view_name()) {
            entities.push(entity.clone());
        }
    }

    entities.sort_by_key(|entity| match entity.as_ref() {
        EntityDefinition::Table(_) => 0,
        EntityDefinition::FilterView(_) => 1,
        EntityDefinition::UnionView(_) => 2,
        EntityDefinition::EmptyView(_) => 3,
    });
    entities
}
