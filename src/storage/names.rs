use crate::core::{ColumnDefinition, EntityNameDefinition};
use crate::mapping::{ClassKey, MappingConfiguration, PropertyKey};

/// Derives table, view, column and constraint names from mapping metadata.
///
/// Implementations must be pure: the same input always yields the same name.
pub trait StorageNameProvider: Send + Sync {
    fn id_column_name(&self) -> &str;
    fn class_id_column_name(&self) -> &str;
    fn timestamp_column_name(&self) -> &str;

    /// `None` signals that the class does not own a table.
    fn table_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> Option<EntityNameDefinition>;
    fn view_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> EntityNameDefinition;

    fn column_name(&self, mapping: &MappingConfiguration, property: PropertyKey) -> String;
    fn relation_column_name(&self, mapping: &MappingConfiguration, property: PropertyKey) -> String;
    fn relation_class_id_column_name(&self, mapping: &MappingConfiguration, property: PropertyKey) -> String;

    fn primary_key_constraint_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> String;
    fn foreign_key_constraint_name(
        &self,
        mapping: &MappingConfiguration,
        class: ClassKey,
        referencing_columns: &[ColumnDefinition],
    ) -> String;
}

/// Naming based on class IDs and property names, honoring explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct DefaultStorageNameProvider {
    schema: Option<String>,
}

impl DefaultStorageNameProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: Option<String>) -> Self {
        Self { schema }
    }
}

impl StorageNameProvider for DefaultStorageNameProvider {
    fn id_column_name(&self) -> &str {
        "ID"
    }

    fn class_id_column_name(&self) -> &str {
        "ClassID"
    }

    fn timestamp_column_name(&self) -> &str {
        "Timestamp"
    }

    fn table_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> Option<EntityNameDefinition> {
        let definition = mapping.class(class);
        definition.table.as_ref().map(|table| {
            let name = table.name.clone().unwrap_or_else(|| definition.id.clone());
            EntityNameDefinition::new(self.schema.clone(), name)
        })
    }

    fn view_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> EntityNameDefinition {
        EntityNameDefinition::new(self.schema.clone(), format!("{}View", mapping.class(class).id))
    }

    fn column_name(&self, mapping: &MappingConfiguration, property: PropertyKey) -> String {
        let definition = mapping.property(property);
        match &definition.column_name {
            Some(name) => name.clone(),
            None if definition.is_relation() => format!("{}ID", definition.name),
            None => definition.name.clone(),
        }
    }

    fn relation_column_name(&self, mapping: &MappingConfiguration, property: PropertyKey) -> String {
        self.column_name(mapping, property)
    }

    fn relation_class_id_column_name(&self, mapping: &MappingConfiguration, property: PropertyKey) -> String {
        format!("{}ClassID", self.relation_column_name(mapping, property))
    }

    fn primary_key_constraint_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> String {
        let name = self
            .table_name(mapping, class)
            .map(|table| table.name)
            .unwrap_or_else(|| mapping.class(class).id.clone());
        format!("PK_{}", name)
    }

    fn foreign_key_constraint_name(
        &self,
        mapping: &MappingConfiguration,
        class: ClassKey,
        referencing_columns: &[ColumnDefinition],
    ) -> String {
        let columns: Vec<&str> = referencing_columns.iter().map(|c| c.name.as_str()).collect();
        format!("FK_{}_{}", mapping.class(class).id, columns.join("_"))
    }
}
