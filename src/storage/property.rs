use std::sync::Arc;

use crate::core::{ColumnDefinition, PersistenceError, Result, Value};
use crate::data::{ObjectId, PropertyValue};
use crate::mapping::PropertyKey;

/// A column together with the value to write to or compare against it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue<'a> {
    pub column: &'a ColumnDefinition,
    pub value: Value,
}

/// Source of column values while materializing a row.
pub trait ColumnValueReader {
    fn read(&self, column: &ColumnDefinition) -> Result<Value>;
}

/// One column holding one scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleStoragePropertyDefinition {
    pub column: ColumnDefinition,
}

impl SimpleStoragePropertyDefinition {
    pub fn new(column: ColumnDefinition) -> Self {
        Self { column }
    }

    fn split(&self, value: &Value) -> Result<ColumnValue<'_>> {
        if value.is_null() && !self.column.is_nullable() {
            return Err(PersistenceError::TypeMismatch(format!(
                "Column '{}' cannot be NULL",
                self.column.name
            )));
        }
        if !self.column.storage_type.db_type.accepts(value) {
            return Err(PersistenceError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.column.name,
                self.column.storage_type.db_type,
                value.type_name()
            )));
        }
        Ok(ColumnValue {
            column: &self.column,
            value: value.clone(),
        })
    }
}

/// Value column plus class-discriminator column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdStoragePropertyDefinition {
    pub value: SimpleStoragePropertyDefinition,
    pub class_id: SimpleStoragePropertyDefinition,
}

/// Value column only; the referenced class is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdWithoutClassIdStoragePropertyDefinition {
    pub value: SimpleStoragePropertyDefinition,
    pub class_id: String,
}

/// One column holding `ClassID|value|TypeTag` of an object in another store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedObjectIdStoragePropertyDefinition {
    pub serialized: SimpleStoragePropertyDefinition,
}

/// A property type that could not be mapped. Carried in the property slot
/// instead of a storage property, and turned into an error on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedStorageProperty {
    pub property_type: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoragePropertyDefinition {
    Simple(SimpleStoragePropertyDefinition),
    ObjectId(ObjectIdStoragePropertyDefinition),
    ObjectIdWithoutClassId(ObjectIdWithoutClassIdStoragePropertyDefinition),
    SerializedObjectId(SerializedObjectIdStoragePropertyDefinition),
}

/// What the loader stores for each persistent property.
pub type StoragePropertySlot = std::result::Result<Arc<StoragePropertyDefinition>, UnsupportedStorageProperty>;

/// Read access to resolved property slots, during or after model loading.
pub trait StoragePropertyLookup {
    fn storage_property_slot(&self, property: PropertyKey) -> Option<&StoragePropertySlot>;
}

impl StoragePropertyDefinition {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Simple(_) => "Simple",
            Self::ObjectId(_) => "ObjectId",
            Self::ObjectIdWithoutClassId(_) => "ObjectIdWithoutClassId",
            Self::SerializedObjectId(_) => "SerializedObjectId",
        }
    }

    pub fn columns(&self) -> Vec<&ColumnDefinition> {
        match self {
            Self::Simple(simple) => vec![&simple.column],
            Self::ObjectId(id) => vec![&id.value.column, &id.class_id.column],
            Self::ObjectIdWithoutClassId(id) => vec![&id.value.column],
            Self::SerializedObjectId(serialized) => vec![&serialized.serialized.column],
        }
    }

    /// Columns needed to test two values for equality; the discriminator is
    /// implied by the value and left out.
    pub fn columns_for_comparison(&self) -> Vec<&ColumnDefinition> {
        match self {
            Self::ObjectId(id) => vec![&id.value.column],
            other => other.columns(),
        }
    }

    /// Whether storage can enforce referential integrity for this property.
    pub fn can_create_foreign_key(&self) -> bool {
        matches!(self, Self::ObjectId(_) | Self::ObjectIdWithoutClassId(_))
    }

    /// Columns that reference the opposite table's ID column.
    pub fn foreign_key_columns(&self) -> Vec<&ColumnDefinition> {
        match self {
            Self::ObjectId(id) => vec![&id.value.column],
            Self::ObjectIdWithoutClassId(id) => vec![&id.value.column],
            _ => Vec::new(),
        }
    }

    pub fn split_value(&self, value: &PropertyValue) -> Result<Vec<ColumnValue<'_>>> {
        match (self, value) {
            (Self::Simple(simple), PropertyValue::Scalar(scalar)) => Ok(vec![simple.split(scalar)?]),
            (Self::ObjectId(id), PropertyValue::Reference(reference)) => match reference {
                Some(object_id) => Ok(vec![
                    id.value.split(object_id.value())?,
                    id.class_id.split(&Value::Text(object_id.class_id().to_string()))?,
                ]),
                None => Ok(vec![id.value.split(&Value::Null)?, id.class_id.split(&Value::Null)?]),
            },
            (Self::ObjectIdWithoutClassId(id), PropertyValue::Reference(reference)) => match reference {
                Some(object_id) => {
                    if object_id.class_id() != id.class_id {
                        return Err(PersistenceError::TypeMismatch(format!(
                            "Column '{}' can only reference objects of class '{}', got '{}'",
                            id.value.column.name, id.class_id, object_id
                        )));
                    }
                    Ok(vec![id.value.split(object_id.value())?])
                }
                None => Ok(vec![id.value.split(&Value::Null)?]),
            },
            (Self::SerializedObjectId(serialized), PropertyValue::Reference(reference)) => {
                let text = match reference {
                    Some(object_id) => Value::Text(object_id.serialize()?),
                    None => Value::Null,
                };
                Ok(vec![serialized.serialized.split(&text)?])
            }
            (definition, value) => Err(PersistenceError::TypeMismatch(format!(
                "A {} storage property cannot store {:?}",
                definition.kind_name(),
                value
            ))),
        }
    }

    pub fn split_value_for_comparison(&self, value: &PropertyValue) -> Result<Vec<ColumnValue<'_>>> {
        let comparison = self.columns_for_comparison();
        Ok(self
            .split_value(value)?
            .into_iter()
            .filter(|column_value| comparison.contains(&column_value.column))
            .collect())
    }

    pub fn combine_value(&self, reader: &dyn ColumnValueReader) -> Result<PropertyValue> {
        match self {
            Self::Simple(simple) => Ok(PropertyValue::Scalar(reader.read(&simple.column)?)),
            Self::ObjectId(id) => {
                let value = reader.read(&id.value.column)?;
                if value.is_null() {
                    return Ok(PropertyValue::Reference(None));
                }
                let class_id = reader.read(&id.class_id.column)?;
                let Some(class_id) = class_id.as_str() else {
                    return Err(PersistenceError::TypeMismatch(format!(
                        "Column '{}' must contain a class ID when '{}' is set",
                        id.class_id.column.name, id.value.column.name
                    )));
                };
                Ok(PropertyValue::Reference(Some(ObjectId::new(class_id, value)?)))
            }
            Self::ObjectIdWithoutClassId(id) => {
                let value = reader.read(&id.value.column)?;
                if value.is_null() {
                    return Ok(PropertyValue::Reference(None));
                }
                Ok(PropertyValue::Reference(Some(ObjectId::new(id.class_id.clone(), value)?)))
            }
            Self::SerializedObjectId(serialized) => match reader.read(&serialized.serialized.column)? {
                Value::Null => Ok(PropertyValue::Reference(None)),
                Value::Text(text) => Ok(PropertyValue::Reference(Some(ObjectId::parse(&text)?))),
                other => Err(PersistenceError::TypeMismatch(format!(
                    "Column '{}' must contain text, got {}",
                    serialized.serialized.column.name,
                    other.type_name()
                ))),
            },
        }
    }
}
