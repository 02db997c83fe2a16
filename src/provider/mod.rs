// ============================================================================
// Storage Provider
// ============================================================================
//
// Store configuration, the driver contract and the execution context that
// runs commands against one connection.
//
// ============================================================================

pub mod config;
pub mod driver;
pub mod rdbms;

pub use config::{IsolationLevel, StorageConfiguration, StorageProviderDefinition};
pub use driver::{ConnectionFactory, DbConnection, DriverError, DriverResult};
pub use rdbms::{ProviderState, RdbmsProvider};
