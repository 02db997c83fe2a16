use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::core::{PersistenceError, Result};

/// Transaction isolation requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Snapshot,
    #[default]
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            Self::ReadCommitted => write!(f, "READ COMMITTED"),
            Self::RepeatableRead => write!(f, "REPEATABLE READ"),
            Self::Snapshot => write!(f, "SNAPSHOT"),
            Self::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Configuration of one relational store.
///
/// # Examples
///
/// ```
/// use relmap::provider::{IsolationLevel, StorageProviderDefinition};
///
/// let definition = StorageProviderDefinition::new("main", "Server=.;Database=Shop")
///     .isolation_level(IsolationLevel::ReadCommitted)
///     .force_class_id_columns(true);
/// assert_eq!(definition.isolation_level, IsolationLevel::ReadCommitted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProviderDefinition {
    /// Store name; classes refer to it.
    pub name: String,

    /// Passed verbatim to the connection factory.
    pub connection_string: String,

    #[serde(default)]
    pub isolation_level: IsolationLevel,

    /// Always emit a ClassID column for same-store relations, even when
    /// the referenced class has no inheritance hierarchy.
    #[serde(default)]
    pub force_class_id_columns: bool,

    /// Schema qualifier for generated table and view names.
    #[serde(default)]
    pub schema: Option<String>,
}

impl StorageProviderDefinition {
    pub fn new(name: &str, connection_string: &str) -> Self {
        Self {
            name: name.to_string(),
            connection_string: connection_string.to_string(),
            isolation_level: IsolationLevel::default(),
            force_class_id_columns: false,
            schema: None,
        }
    }

    /// Set the transaction isolation level
    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    /// Force ClassID columns for relation properties
    pub fn force_class_id_columns(mut self, force: bool) -> Self {
        self.force_class_id_columns = force;
        self
    }

    /// Set the schema qualifier
    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }
}

/// All stores of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfiguration {
    pub default_provider: String,
    pub providers: Vec<StorageProviderDefinition>,
}

impl StorageConfiguration {
    pub fn new(default_provider: StorageProviderDefinition) -> Self {
        Self {
            default_provider: default_provider.name.clone(),
            providers: vec![default_provider],
        }
    }

    pub fn with_provider(mut self, provider: StorageProviderDefinition) -> Self {
        self.providers.push(provider);
        self
    }

    /// Parse from JSON
    ///
    /// ```
    /// # use relmap::provider::StorageConfiguration;
    /// let config = StorageConfiguration::from_json(r#"{
    ///     "default_provider": "main",
    ///     "providers": [ { "name": "main", "connection_string": "Server=." } ]
    /// }"#).unwrap();
    /// assert_eq!(config.default_provider_definition().unwrap().name, "main");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PersistenceError::InvalidConfiguration(format!(
                "Cannot read storage configuration '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn provider(&self, name: &str) -> Result<&StorageProviderDefinition> {
        self.providers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PersistenceError::InvalidConfiguration(format!("Storage provider '{}' is not configured", name)))
    }

    pub fn default_provider_definition(&self) -> Result<&StorageProviderDefinition> {
        self.provider(&self.default_provider)
    }

    fn validate(&self) -> Result<()> {
        for (index, provider) in self.providers.iter().enumerate() {
            if provider.name.is_empty() {
                return Err(PersistenceError::InvalidConfiguration(
                    "Storage provider names must not be empty".into(),
                ));
            }
            if self.providers[..index].iter().any(|p| p.name == provider.name) {
                return Err(PersistenceError::InvalidConfiguration(format!(
                    "Storage provider '{}' is configured more than once",
                    provider.name
                )));
            }
        }
        self.default_provider_definition().map(|_| ())
    }
}
