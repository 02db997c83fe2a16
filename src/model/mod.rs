// ============================================================================
// Persistence Model
// ============================================================================
//
// Resolution of mapping metadata into storage entities and storage properties
// for one store, and the read-only model handed to commands afterwards.
//
// ============================================================================

pub mod loader;
pub mod persistence_model;

pub use loader::{PersistenceModelLoader, ResolutionState};
pub use persistence_model::RdbmsPersistenceModel;

use std::sync::Arc;

use crate::core::Result;
use crate::mapping::MappingConfiguration;
use crate::provider::StorageProviderDefinition;

/// Resolves every hierarchy of the given store with the default providers.
///
/// Meant to run once at startup; the returned model is immutable.
pub fn load_persistence_model(
    definition: &StorageProviderDefinition,
    mapping: Arc<MappingConfiguration>,
) -> Result<RdbmsPersistenceModel> {
    let mut loader = PersistenceModelLoader::new(definition, mapping);
    loader.load_all()?;
    Ok(loader.build())
}
