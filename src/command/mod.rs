// ============================================================================
// Storage Provider Commands
// ============================================================================
//
// Each command is built from the resolved persistence model and its own input.
// It owns no connection; it runs against whatever execution context it is
// handed, which turns statements into rows, scalars and affected-row counts.
//
// ============================================================================

pub mod factory;
pub mod lookup;
pub mod query;
pub mod reader;
pub mod save;
pub mod sql;

pub use factory::StorageProviderCommandFactory;
pub use lookup::{
    MultiObjectLoadCommand, MultiTimestampLoadCommand, RelationLookupCommand, SingleObjectLoadCommand,
};
pub use query::{CustomQueryCommand, DataContainerQueryCommand, Query, QueryParameter, QueryType, ScalarQueryCommand};
pub use reader::DataContainerReader;
pub use save::SaveCommand;
pub use sql::{SqlDialect, SqlParameter, SqlServerDialect, SqlStatement, SqlStatementBuilder};

use crate::core::{Result, Value};
use crate::result::QueryResult;

/// What a command needs from the provider at run time.
pub trait RdbmsExecutionContext {
    fn dialect(&self) -> &dyn SqlDialect;

    fn execute_reader(&mut self, statement: &SqlStatement) -> Result<QueryResult>;
    fn execute_scalar(&mut self, statement: &SqlStatement) -> Result<Value>;
    fn execute_non_query(&mut self, statement: &SqlStatement) -> Result<u64>;
}

pub trait StorageProviderCommand {
    type Output;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output>;
}
