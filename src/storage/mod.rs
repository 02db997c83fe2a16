// ============================================================================
// Storage Definitions
// ============================================================================
//
// Relational shapes derived from the domain mapping: names, column types,
// system columns, per-property column mappings, entities and constraints.
//
// ============================================================================

pub mod entity;
pub mod foreign_key;
pub mod infrastructure;
pub mod names;
pub mod property;
pub mod property_factory;
pub mod types;

pub use entity::{
    EmptyViewDefinition, EntityColumns, EntityDefinition, FilterViewDefinition,
    PrimaryKeyConstraintDefinition, TableDefinition, UnionViewDefinition,
};
pub use foreign_key::{ForeignKeyConstraintDefinition, ForeignKeyConstraintDefinitionFactory};
pub use infrastructure::InfrastructureStoragePropertyDefinitionProvider;
pub use names::{DefaultStorageNameProvider, StorageNameProvider};
pub use property::{
    ColumnValue, ColumnValueReader, ObjectIdStoragePropertyDefinition,
    ObjectIdWithoutClassIdStoragePropertyDefinition, SerializedObjectIdStoragePropertyDefinition,
    SimpleStoragePropertyDefinition, StoragePropertyDefinition, StoragePropertyLookup,
    StoragePropertySlot, UnsupportedStorageProperty,
};
pub use property_factory::{
    DataStoragePropertyDefinitionFactory, RelationStoragePropertyDefinitionFactory,
    ValueStoragePropertyDefinitionFactory,
};
pub use types::{SqlStorageTypeInformationProvider, StorageTypeInformationProvider, UnsupportedStorageType};
