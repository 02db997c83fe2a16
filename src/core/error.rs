use thiserror::Error;

use crate::data::ObjectId;
use crate::provider::driver::DriverError;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid mapping configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Class '{0}' not found in mapping")]
    ClassNotFound(String),

    #[error("Property '{property}' not found on class '{class}'")]
    PropertyNotFound { class: String, property: String },

    #[error(
        "Class '{class}' has a storage entity of kind '{actual}' assigned, expected '{expected}'"
    )]
    EntityKindMismatch {
        class: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Property '{property}' of class '{class}' cannot be stored: {reason}")]
    UnsupportedPropertyType {
        class: String,
        property: String,
        reason: String,
    },

    #[error("The persistence model has not been resolved for class '{0}'")]
    EntityNotResolved(String),

    #[error("The persistence model has not been resolved for property '{property}' of class '{class}'")]
    StoragePropertyNotResolved { class: String, property: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid object identifier: {0}")]
    InvalidObjectId(String),

    #[error("{message}")]
    Execution {
        message: String,
        #[source]
        source: DriverError,
    },

    #[error("Provider state error: {0}")]
    InvalidState(String),

    #[error("A database query returned duplicates of the object '{object_id}', which is not allowed")]
    DuplicateResult { object_id: ObjectId },

    #[error("A database query returned a NULL entry for relation '{relation}', which is not allowed")]
    NullResult { relation: String },

    #[error("Concurrency violation encountered for object(s) {}", format_ids(.0))]
    ConcurrencyViolation(Vec<ObjectId>),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_ids(ids: &[ObjectId]) -> String {
    ids.iter()
        .map(|id| format!("'{}'", id))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistenceError {
    /// Wraps a driver failure with the uniform "Error while executing" context.
    pub fn execution(context: impl AsRef<str>, source: DriverError) -> Self {
        Self::Execution {
            message: format!("Error while executing {}: {}", context.as_ref(), source),
            source,
        }
    }

    pub fn is_concurrency_violation(&self) -> bool {
        matches!(self, Self::ConcurrencyViolation(_))
    }
}
