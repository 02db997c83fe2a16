pub mod error;
pub mod types;
pub mod value;

pub use error::{PersistenceError, Result};
pub use types::{ColumnDefinition, DbType, EntityNameDefinition, StorageTypeInformation};
pub use value::Value;
