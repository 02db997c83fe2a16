use std::sync::Arc;
use tracing::{Level, event};

use super::RdbmsPersistenceModel;
use crate::core::{PersistenceError, Result};
use crate::mapping::{ClassKey, MappingConfiguration, PropertyKey};
use crate::provider::StorageProviderDefinition;
use crate::storage::{
    DataStoragePropertyDefinitionFactory, DefaultStorageNameProvider, EmptyViewDefinition, EntityColumns,
    EntityDefinition, FilterViewDefinition, ForeignKeyConstraintDefinitionFactory,
    InfrastructureStoragePropertyDefinitionProvider, PrimaryKeyConstraintDefinition,
    RelationStoragePropertyDefinitionFactory, SqlStorageTypeInformationProvider, StorageNameProvider,
    StoragePropertyLookup, StoragePropertySlot, StorageTypeInformationProvider, TableDefinition,
    UnionViewDefinition, ValueStoragePropertyDefinitionFactory,
};

/// Resolution progress of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    PropertiesResolved,
    EntityResolved,
}

enum Step {
    Visit(ClassKey),
    Assign(ClassKey),
}

/// Assigns storage properties and storage entities to the classes of one store.
///
/// Resolution works per inheritance hierarchy in two passes: first every
/// persistent property gets its storage property, then every class gets its
/// entity. Both passes skip what is already assigned, so loading a hierarchy
/// again is a no-op. The loader is the only writer; [`Self::build`] hands out
/// the read-only model.
pub struct PersistenceModelLoader {
    storage_provider: String,
    mapping: Arc<MappingConfiguration>,
    names: Arc<dyn StorageNameProvider>,
    infrastructure: Arc<InfrastructureStoragePropertyDefinitionProvider>,
    property_factory: DataStoragePropertyDefinitionFactory,
    foreign_keys: ForeignKeyConstraintDefinitionFactory,
    entities: Vec<Option<Arc<EntityDefinition>>>,
    properties: Vec<Option<StoragePropertySlot>>,
}

impl PersistenceModelLoader {
    /// Loader with the default name and type providers.
    pub fn new(definition: &StorageProviderDefinition, mapping: Arc<MappingConfiguration>) -> Self {
        Self::with_providers(
            definition,
            mapping,
            Arc::new(DefaultStorageNameProvider::with_schema(definition.schema.clone())),
            Arc::new(SqlStorageTypeInformationProvider::new()),
        )
    }

    pub fn with_providers(
        definition: &StorageProviderDefinition,
        mapping: Arc<MappingConfiguration>,
        names: Arc<dyn StorageNameProvider>,
        types: Arc<dyn StorageTypeInformationProvider>,
    ) -> Self {
        let infrastructure = Arc::new(InfrastructureStoragePropertyDefinitionProvider::new(
            types.as_ref(),
            names.as_ref(),
        ));
        let property_factory = DataStoragePropertyDefinitionFactory::new(
            ValueStoragePropertyDefinitionFactory::new(names.clone(), types.clone()),
            RelationStoragePropertyDefinitionFactory::new(
                definition.name.clone(),
                definition.force_class_id_columns,
                names.clone(),
                types,
            ),
        );
        let foreign_keys = ForeignKeyConstraintDefinitionFactory::new(names.clone(), infrastructure.clone());

        Self {
            storage_provider: definition.name.clone(),
            entities: vec![None; mapping.class_count()],
            properties: vec![None; mapping.property_count()],
            mapping,
            names,
            infrastructure,
            property_factory,
            foreign_keys,
        }
    }

    /// Assigns an entity ahead of resolution; it is kept as is.
    pub fn preassign_entity(&mut self, class: ClassKey, entity: Arc<EntityDefinition>) -> Result<()> {
        if self.entities[class.0].is_some() {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Class '{}' already has a storage entity",
                self.mapping.class(class).id
            )));
        }
        self.entities[class.0] = Some(entity);
        Ok(())
    }

    /// Assigns a storage property ahead of resolution; it is kept as is.
    pub fn preassign_storage_property(&mut self, property: PropertyKey, slot: StoragePropertySlot) -> Result<()> {
        if self.properties[property.0].is_some() {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Property '{}' already has a storage property",
                self.mapping.property_identifier(property)
            )));
        }
        self.properties[property.0] = Some(slot);
        Ok(())
    }

    pub fn state(&self, class: ClassKey) -> ResolutionState {
        if self.entities[class.0].is_some() {
            return ResolutionState::EntityResolved;
        }
        let all_properties_resolved = self
            .mapping
            .persistent_properties(class)
            .all(|property| self.properties[property.0].is_some());
        if all_properties_resolved && self.pass_one_done(class) {
            ResolutionState::PropertiesResolved
        } else {
            ResolutionState::Unresolved
        }
    }

    fn pass_one_done(&self, class: ClassKey) -> bool {
        self.mapping
            .hierarchy(class)
            .into_iter()
            .flat_map(|key| self.mapping.persistent_properties(key).collect::<Vec<_>>())
            .all(|property| self.properties[property.0].is_some())
    }

    pub fn entity(&self, class: ClassKey) -> Option<&Arc<EntityDefinition>> {
        self.entities[class.0].as_ref()
    }

    /// Resolves the whole hierarchy `class` belongs to.
    pub fn load_hierarchy(&mut self, class: ClassKey) -> Result<()> {
        let root = self.mapping.root_of(class);
        let mut classes = vec![root];
        classes.extend(self.mapping.descendants(root));

        for key in &classes {
            let definition = self.mapping.class(*key);
            if definition.storage_provider != self.storage_provider {
                return Err(PersistenceError::InvalidConfiguration(format!(
                    "Class '{}' belongs to storage provider '{}', not '{}'",
                    definition.id, definition.storage_provider, self.storage_provider
                )));
            }
            if definition.is_interface {
                return Err(PersistenceError::NotImplemented(format!(
                    "Interface '{}' cannot be mapped to storage",
                    definition.id
                )));
            }
        }

        for key in &classes {
            self.resolve_properties(*key);
        }
        for key in &classes {
            self.resolve_entity(*key)?;
        }
        Ok(())
    }

    /// Resolves every hierarchy of this store.
    pub fn load_all(&mut self) -> Result<()> {
        let roots: Vec<ClassKey> = self
            .mapping
            .root_classes()
            .into_iter()
            .filter(|key| self.mapping.class(*key).storage_provider == self.storage_provider)
            .collect();
        for root in roots {
            self.load_hierarchy(root)?;
        }
        Ok(())
    }

    pub fn build(self) -> RdbmsPersistenceModel {
        RdbmsPersistenceModel {
            storage_provider: self.storage_provider,
            mapping: self.mapping,
            infrastructure: self.infrastructure,
            entities: self.entities,
            properties: self.properties,
        }
    }

    fn resolve_properties(&mut self, class: ClassKey) {
        let unresolved: Vec<PropertyKey> = self
            .mapping
            .persistent_properties(class)
            .filter(|property| self.properties[property.0].is_none())
            .collect();

        for property in unresolved {
            let slot = self.property_factory.create(&self.mapping, property);
            if let Err(unsupported) = &slot {
                event!(
                    Level::DEBUG,
                    property = %self.mapping.property_identifier(property),
                    reason = %unsupported.message,
                    "storage property unsupported"
                );
            }
            self.properties[property.0] = Some(slot);
        }
    }

    fn resolve_entity(&mut self, start: ClassKey) -> Result<Arc<EntityDefinition>> {
        // a class is assigned only after everything it refers to
        let mut stack = vec![Step::Visit(start)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(class) => {
                    if self.entities[class.0].is_some() {
                        continue;
                    }

                    if self.names.table_name(&self.mapping, class).is_some() {
                        let table = self.create_table_definition(class);
                        self.assign(class, table);
                        continue;
                    }

                    stack.push(Step::Assign(class));
                    match self.table_owning_ancestor(class) {
                        Some(owner) => stack.push(Step::Visit(owner)),
                        None => {
                            for derived in self.mapping.descendants(class) {
                                if self.entities[derived.0].is_none() {
                                    stack.push(Step::Visit(derived));
                                }
                            }
                        }
                    }
                }
                Step::Assign(class) => {
                    if self.entities[class.0].is_some() {
                        continue;
                    }

                    let entity = match self.table_owning_ancestor(class) {
                        Some(owner) => self.create_filter_view_definition(class, owner)?,
                        None => self.create_union_or_empty_view_definition(class)?,
                    };
                    self.assign(class, entity);
                }
            }
        }

        self.entities[start.0]
            .clone()
            .ok_or_else(|| PersistenceError::EntityNotResolved(self.mapping.class(start).id.clone()))
    }

    fn assign(&mut self, class: ClassKey, entity: EntityDefinition) {
        event!(
            Level::DEBUG,
            class = %self.mapping.class(class).id,
            kind = entity.kind_name(),
            view = %entity.view_name(),
            "storage entity resolved"
        );
        self.entities[class.0] = Some(Arc::new(entity));
    }

    fn table_owning_ancestor(&self, class: ClassKey) -> Option<ClassKey> {
        self.mapping
            .ancestors(class)
            .into_iter()
            .find(|key| self.names.table_name(&self.mapping, *key).is_some())
    }

    fn entity_columns(&self, class: ClassKey) -> EntityColumns {
        let data_properties = self
            .mapping
            .persistent_properties_in_hierarchy(class)
            .into_iter()
            .filter_map(|property| match &self.properties[property.0] {
                Some(Ok(storage_property)) => Some(storage_property.clone()),
                _ => None,
            })
            .collect();

        EntityColumns {
            object_id: self.infrastructure.object_id_storage_property().clone(),
            timestamp: self.infrastructure.timestamp_storage_property().clone(),
            data_properties,
        }
    }

    /// The class itself and all its descendants.
    fn class_ids_of(&self, class: ClassKey) -> Vec<String> {
        std::iter::once(class)
            .chain(self.mapping.descendants(class))
            .map(|key| self.mapping.class(key).id.clone())
            .collect()
    }

    fn create_table_definition(&self, class: ClassKey) -> EntityDefinition {
        let columns = self.entity_columns(class);
        let table_name = self
            .names
            .table_name(&self.mapping, class)
            .unwrap_or_else(|| self.names.view_name(&self.mapping, class));

        EntityDefinition::Table(TableDefinition {
            storage_provider: self.storage_provider.clone(),
            table_name,
            view_name: self.names.view_name(&self.mapping, class),
            primary_key: PrimaryKeyConstraintDefinition {
                name: self.names.primary_key_constraint_name(&self.mapping, class),
                columns: vec![self.infrastructure.id_column().clone()],
            },
            foreign_keys: self
                .foreign_keys
                .create_foreign_key_constraints(&self.mapping, class, self),
            class_ids: self.class_ids_of(class),
            columns,
        })
    }

    fn create_filter_view_definition(&self, class: ClassKey, owner: ClassKey) -> Result<EntityDefinition> {
        let base_entity = self.entities[owner.0]
            .clone()
            .ok_or_else(|| PersistenceError::EntityNotResolved(self.mapping.class(owner).id.clone()))?;

        if !matches!(*base_entity, EntityDefinition::Table(_)) {
            return Err(PersistenceError::EntityKindMismatch {
                class: self.mapping.class(owner).id.clone(),
                expected: "Table",
                actual: base_entity.kind_name(),
            });
        }

        Ok(EntityDefinition::FilterView(FilterViewDefinition {
            storage_provider: self.storage_provider.clone(),
            view_name: self.names.view_name(&self.mapping, class),
            base_entity,
            class_ids: self.class_ids_of(class),
            columns: self.entity_columns(class),
        }))
    }

    fn create_union_or_empty_view_definition(&self, class: ClassKey) -> Result<EntityDefinition> {
        let mut union_entities = Vec::new();
        for derived in self.mapping.descendants(class) {
            if self.mapping.class(derived).is_abstract {
                continue;
            }
            let entity = self.entities[derived.0]
                .clone()
                .ok_or_else(|| PersistenceError::EntityNotResolved(self.mapping.class(derived).id.clone()))?;
            if !entity.is_empty_view() {
                union_entities.push(entity);
            }
        }

        let view_name = self.names.view_name(&self.mapping, class);
        let columns = self.entity_columns(class);

        if union_entities.is_empty() {
            Ok(EntityDefinition::EmptyView(EmptyViewDefinition {
                storage_provider: self.storage_provider.clone(),
                view_name,
                columns,
            }))
        } else {
            Ok(EntityDefinition::UnionView(UnionViewDefinition {
                storage_provider: self.storage_provider.clone(),
                view_name,
                union_entities,
                columns,
            }))
        }
    }
}

impl StoragePropertyLookup for PersistenceModelLoader {
    fn storage_property_slot(&self, property: PropertyKey) -> Option<&StoragePropertySlot> {
        self.properties[property.0].as_ref()
    }
}
