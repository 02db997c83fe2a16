// ============================================================================
// relmap Library
// ============================================================================
//
// Maps persistent class hierarchies onto relational tables and views, and
// builds the commands that load, query and save data containers through a
// pluggable database driver.
//
// ============================================================================

pub mod command;
pub mod core;
pub mod data;
pub mod mapping;
pub mod model;
pub mod provider;
pub mod result;
pub mod schema;
pub mod storage;

// Re-export main types for convenience
pub use core::{PersistenceError, Result, Value};
pub use data::{DataContainer, DataContainerState, ObjectId, PropertyValue};
pub use mapping::{MappingConfiguration, MappingDocument};
pub use model::{PersistenceModelLoader, RdbmsPersistenceModel, load_persistence_model};
pub use provider::{RdbmsProvider, StorageConfiguration, StorageProviderDefinition};
pub use result::QueryResult;
