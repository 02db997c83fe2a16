use std::sync::Arc;

use super::infrastructure::InfrastructureStoragePropertyDefinitionProvider;
use super::names::StorageNameProvider;
use super::property::StoragePropertyLookup;
use crate::core::{ColumnDefinition, EntityNameDefinition};
use crate::mapping::{ClassKey, MappingConfiguration, RelationEndPointDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraintDefinition {
    pub name: String,
    pub referencing_columns: Vec<ColumnDefinition>,
    pub referenced_table: EntityNameDefinition,
    pub referenced_columns: Vec<ColumnDefinition>,
}

/// Derives foreign key constraints for the table of a class hierarchy.
pub struct ForeignKeyConstraintDefinitionFactory {
    names: Arc<dyn StorageNameProvider>,
    infrastructure: Arc<InfrastructureStoragePropertyDefinitionProvider>,
}

impl ForeignKeyConstraintDefinitionFactory {
    pub fn new(
        names: Arc<dyn StorageNameProvider>,
        infrastructure: Arc<InfrastructureStoragePropertyDefinitionProvider>,
    ) -> Self {
        Self { names, infrastructure }
    }

    /// One constraint per foreign-key-holding relation property anywhere in
    /// the hierarchy of `class` whose target resolves to a table.
    pub fn create_foreign_key_constraints(
        &self,
        mapping: &MappingConfiguration,
        class: ClassKey,
        lookup: &dyn StoragePropertyLookup,
    ) -> Vec<ForeignKeyConstraintDefinition> {
        let mut constraints = Vec::new();

        for hierarchy_class in mapping.hierarchy(class) {
            for end_point in mapping.relation_end_points(hierarchy_class) {
                let RelationEndPointDefinition::Real(property) = end_point else {
                    continue;
                };

                let definition = mapping.property(property);
                let Some(relation) = &definition.relation else {
                    continue;
                };
                if !definition.is_persistent() {
                    continue;
                }

                let Some(Ok(storage_property)) = lookup.storage_property_slot(property) else {
                    continue;
                };
                if !storage_property.can_create_foreign_key() {
                    continue;
                }

                let Some(referenced_table) = self.find_table_name(mapping, relation.opposite_class) else {
                    continue;
                };

                let referencing_columns: Vec<ColumnDefinition> = storage_property
                    .foreign_key_columns()
                    .into_iter()
                    .cloned()
                    .collect();
                let name = self
                    .names
                    .foreign_key_constraint_name(mapping, class, &referencing_columns);

                constraints.push(ForeignKeyConstraintDefinition {
                    name,
                    referencing_columns,
                    referenced_table,
                    referenced_columns: vec![self.infrastructure.id_column().clone()],
                });
            }
        }

        constraints
    }

    /// Table of `class` or of its nearest table-owning ancestor.
    fn find_table_name(&self, mapping: &MappingConfiguration, class: ClassKey) -> Option<EntityNameDefinition> {
        std::iter::once(class)
            .chain(mapping.ancestors(class))
            .find_map(|key| self.names.table_name(mapping, key))
    }
}
