use thiserror::Error;

use crate::core::{DbType, StorageTypeInformation, Value};
use crate::data::MAX_SERIALIZED_LENGTH;
use crate::mapping::{PropertyDefinition, PropertyType};

/// Raised when a domain type or value has no storage representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Type '{type_name}' is not supported by this storage provider: {message}")]
pub struct UnsupportedStorageType {
    pub type_name: String,
    pub message: String,
}

impl UnsupportedStorageType {
    fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// Maps identifiers, discriminators, timestamps and property types to
/// storage types. Nullability is decided by the caller.
pub trait StorageTypeInformationProvider: Send + Sync {
    fn storage_type_for_id(&self, is_nullable: bool) -> StorageTypeInformation;
    fn storage_type_for_serialized_object_id(&self, is_nullable: bool) -> StorageTypeInformation;
    fn storage_type_for_class_id(&self, is_nullable: bool) -> StorageTypeInformation;
    fn storage_type_for_timestamp(&self, is_nullable: bool) -> StorageTypeInformation;

    fn storage_type_for_property(
        &self,
        property: &PropertyDefinition,
        force_nullable: bool,
    ) -> Result<StorageTypeInformation, UnsupportedStorageType>;

    /// Storage type used to bind an arbitrary parameter value.
    fn storage_type_for_value(&self, value: &Value) -> StorageTypeInformation;
}

const CLASS_ID_LENGTH: u32 = 100;
const EXTENSIBLE_ENUM_LENGTH: u32 = 100;

/// SQL Server flavoured type names.
#[derive(Debug, Clone, Default)]
pub struct SqlStorageTypeInformationProvider;

impl SqlStorageTypeInformationProvider {
    pub fn new() -> Self {
        Self
    }

    fn sized(name: &str, max_name: &str, db_type: DbType, length: Option<u32>) -> StorageTypeInformation {
        match length {
            Some(length) => StorageTypeInformation::new(format!("{}({})", name, length), db_type, Some(length)),
            None => StorageTypeInformation::new(format!("{}(max)", max_name), db_type, None),
        }
    }
}

impl StorageTypeInformationProvider for SqlStorageTypeInformationProvider {
    fn storage_type_for_id(&self, is_nullable: bool) -> StorageTypeInformation {
        StorageTypeInformation::new("uniqueidentifier", DbType::Guid, Some(16)).nullable(is_nullable)
    }

    fn storage_type_for_serialized_object_id(&self, is_nullable: bool) -> StorageTypeInformation {
        Self::sized("varchar", "varchar", DbType::AnsiString, Some(MAX_SERIALIZED_LENGTH as u32))
            .nullable(is_nullable)
    }

    fn storage_type_for_class_id(&self, is_nullable: bool) -> StorageTypeInformation {
        Self::sized("varchar", "varchar", DbType::AnsiString, Some(CLASS_ID_LENGTH)).nullable(is_nullable)
    }

    fn storage_type_for_timestamp(&self, is_nullable: bool) -> StorageTypeInformation {
        StorageTypeInformation::new("rowversion", DbType::Binary, Some(8)).nullable(is_nullable)
    }

    fn storage_type_for_property(
        &self,
        property: &PropertyDefinition,
        force_nullable: bool,
    ) -> Result<StorageTypeInformation, UnsupportedStorageType> {
        let storage_type = match &property.property_type {
            PropertyType::Boolean => StorageTypeInformation::new("bit", DbType::Boolean, Some(1)),
            PropertyType::Int16 => StorageTypeInformation::new("smallint", DbType::Int16, Some(2)),
            PropertyType::Int32 => StorageTypeInformation::new("int", DbType::Int32, Some(4)),
            PropertyType::Int64 => StorageTypeInformation::new("bigint", DbType::Int64, Some(8)),
            PropertyType::Decimal => StorageTypeInformation::new("decimal(38, 3)", DbType::Decimal, Some(17)),
            PropertyType::Double => StorageTypeInformation::new("float", DbType::Double, Some(8)),
            PropertyType::Single => StorageTypeInformation::new("real", DbType::Single, Some(4)),
            PropertyType::String => Self::sized("nvarchar", "nvarchar", DbType::String, property.max_length),
            PropertyType::DateTime => StorageTypeInformation::new("datetime2", DbType::DateTime, Some(8)),
            PropertyType::Date => StorageTypeInformation::new("date", DbType::Date, Some(3)),
            PropertyType::Guid => StorageTypeInformation::new("uniqueidentifier", DbType::Guid, Some(16)),
            PropertyType::Binary => Self::sized("varbinary", "varbinary", DbType::Binary, property.max_length),
            PropertyType::Enum(_) => StorageTypeInformation::new("int", DbType::Int32, Some(4)),
            PropertyType::ExtensibleEnum(_) => {
                Self::sized("varchar", "varchar", DbType::AnsiString, Some(EXTENSIBLE_ENUM_LENGTH))
            }
            PropertyType::ObjectId => {
                return Err(UnsupportedStorageType::new(
                    "ObjectId",
                    "relation properties are mapped by the relation factory",
                ));
            }
            PropertyType::Custom(name) => {
                return Err(UnsupportedStorageType::new(name.clone(), "no storage type is known for it"));
            }
        };

        Ok(storage_type.nullable(property.is_nullable || force_nullable))
    }

    fn storage_type_for_value(&self, value: &Value) -> StorageTypeInformation {
        let storage_type = match value {
            Value::Null | Value::Text(_) => Self::sized("nvarchar", "nvarchar", DbType::String, None),
            Value::Integer(_) => StorageTypeInformation::new("bigint", DbType::Int64, Some(8)),
            Value::Float(_) => StorageTypeInformation::new("float", DbType::Double, Some(8)),
            Value::Boolean(_) => StorageTypeInformation::new("bit", DbType::Boolean, Some(1)),
            Value::Guid(_) => StorageTypeInformation::new("uniqueidentifier", DbType::Guid, Some(16)),
            Value::DateTime(_) => StorageTypeInformation::new("datetime2", DbType::DateTime, Some(8)),
            Value::Binary(_) => Self::sized("varbinary", "varbinary", DbType::Binary, None),
        };
        storage_type.nullable(value.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_types() {
        let types = SqlStorageTypeInformationProvider::new();

        let id = types.storage_type_for_id(false);
        assert_eq!(id.storage_type_name, "uniqueidentifier");
        assert!(!id.is_nullable);
        assert_eq!(types.storage_type_for_class_id(false).storage_type_name, "varchar(100)");
        assert_eq!(types.storage_type_for_timestamp(false).storage_type_name, "rowversion");
        assert_eq!(
            types.storage_type_for_serialized_object_id(true).storage_type_name,
            "varchar(255)"
        );
    }

    #[test]
    fn test_property_types_and_nullability() {
        let types = SqlStorageTypeInformationProvider::new();

        let name = PropertyDefinition::value("Name", PropertyType::String).max_length(50);
        let info = types.storage_type_for_property(&name, false).unwrap();
        assert_eq!(info.storage_type_name, "nvarchar(50)");
        assert!(!info.is_nullable);

        let forced = types.storage_type_for_property(&name, true).unwrap();
        assert!(forced.is_nullable);

        let blob = PropertyDefinition::value("Data", PropertyType::Binary).nullable();
        let info = types.storage_type_for_property(&blob, false).unwrap();
        assert_eq!(info.storage_type_name, "varbinary(max)");
        assert!(info.is_nullable);
    }

    #[test]
    fn test_unsupported_type() {
        let types = SqlStorageTypeInformationProvider::new();
        let property = PropertyDefinition::value("Shape", PropertyType::Custom("Polygon".into()));

        let err = types.storage_type_for_property(&property, false).unwrap_err();
        assert_eq!(err.type_name, "Polygon");
    }

    #[test]
    fn test_value_types() {
        let types = SqlStorageTypeInformationProvider::new();
        assert_eq!(types.storage_type_for_value(&Value::Integer(1)).db_type, DbType::Int64);
        assert!(types.storage_type_for_value(&Value::Null).is_nullable);
    }
}
