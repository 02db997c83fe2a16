use std::fmt;

use super::Value;

/// Logical storage type, independent of size and nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Decimal,
    Double,
    Single,
    String,
    AnsiString,
    DateTime,
    Date,
    Guid,
    Binary,
}

impl DbType {
    /// Whether a non-null value of the given kind can be bound to this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Int16 | Self::Int32 | Self::Int64, Value::Integer(_)) => true,
            (Self::Decimal | Self::Double | Self::Single, Value::Float(_) | Value::Integer(_)) => {
                true
            }
            (Self::String | Self::AnsiString, Value::Text(_)) => true,
            (Self::DateTime | Self::Date, Value::DateTime(_)) => true,
            (Self::Guid, Value::Guid(_)) => true,
            (Self::Binary, Value::Binary(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::Single => "Single",
            Self::String => "String",
            Self::AnsiString => "AnsiString",
            Self::DateTime => "DateTime",
            Self::Date => "Date",
            Self::Guid => "Guid",
            Self::Binary => "Binary",
        };
        write!(f, "{}", name)
    }
}

/// Describes how a column is typed in storage.
///
/// `storage_type_name` is the dialect-specific declaration (e.g.
/// `nvarchar(100)`), `db_type` the logical tag. `size` is the maximum
/// width in bytes or characters; `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageTypeInformation {
    pub storage_type_name: String,
    pub db_type: DbType,
    pub size: Option<u32>,
    pub is_nullable: bool,
}

impl StorageTypeInformation {
    pub fn new(storage_type_name: impl Into<String>, db_type: DbType, size: Option<u32>) -> Self {
        Self {
            storage_type_name: storage_type_name.into(),
            db_type,
            size,
            is_nullable: false,
        }
    }

    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    /// Compares the type part only, ignoring nullability.
    pub fn same_type_as(&self, other: &StorageTypeInformation) -> bool {
        self.storage_type_name == other.storage_type_name
            && self.db_type == other.db_type
            && self.size == other.size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDefinition {
    pub name: String,
    pub storage_type: StorageTypeInformation,
    pub is_part_of_primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, storage_type: StorageTypeInformation) -> Self {
        Self {
            name: name.into(),
            storage_type,
            is_part_of_primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_part_of_primary_key = true;
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.storage_type.is_nullable
    }
}

/// A possibly schema-qualified name of a table or view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityNameDefinition {
    pub schema: Option<String>,
    pub name: String,
}

impl EntityNameDefinition {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityNameDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
