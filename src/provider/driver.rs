use thiserror::Error;

use super::config::{IsolationLevel, StorageProviderDefinition};
use crate::command::sql::SqlStatement;
use crate::core::Value;
use crate::result::QueryResult;

/// Failure reported by the underlying database driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// The minimal surface the execution context needs from a database driver.
///
/// A connection runs at most one transaction at a time; statements executed
/// while one is open belong to it.
pub trait DbConnection: Send {
    fn open(&mut self) -> DriverResult<()>;
    fn close(&mut self) -> DriverResult<()>;

    fn begin_transaction(&mut self, isolation_level: IsolationLevel) -> DriverResult<()>;
    fn commit(&mut self) -> DriverResult<()>;
    fn rollback(&mut self) -> DriverResult<()>;

    fn execute_reader(&mut self, statement: &SqlStatement) -> DriverResult<QueryResult>;
    fn execute_scalar(&mut self, statement: &SqlStatement) -> DriverResult<Value>;

    /// Returns the number of affected rows.
    fn execute_non_query(&mut self, statement: &SqlStatement) -> DriverResult<u64>;
}

/// Creates unopened connections for a store.
pub trait ConnectionFactory: Send + Sync {
    fn create_connection(&self, definition: &StorageProviderDefinition) -> DriverResult<Box<dyn DbConnection>>;
}
