// ============================================================================
// Domain Mapping Metadata
// ============================================================================
//
// Read-only input to the persistence model loader: persistent classes, their
// inheritance links, their properties and relation end points.
//
// ============================================================================

pub mod class;
pub mod configuration;
pub mod document;
pub mod property;
pub mod validation;

pub use class::{
    Cardinality, ClassDefinition, ClassKey, RelationEndPointDefinition, TableAttribute,
    VirtualEndPointDefinition,
};
pub use configuration::MappingConfiguration;
pub use document::MappingDocument;
pub use property::{
    PropertyDefinition, PropertyKey, PropertyType, RelationEndPoint, SortExpression, SortOrder,
    SortedProperty, StorageClass,
};
pub use validation::{MappingValidationError, validate_mapping};
