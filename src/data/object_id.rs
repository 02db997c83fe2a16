use std::fmt;
use uuid::Uuid;

use crate::core::{PersistenceError, Result, Value};

/// Upper bound for the serialized form of an identifier; matches the width of
/// the serialized-identifier column.
pub const MAX_SERIALIZED_LENGTH: usize = 255;

/// Addresses one row: class discriminator plus opaque value.
///
/// Equality and hashing cover both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    class_id: String,
    value: Value,
}

impl ObjectId {
    /// Accepts GUID, integer and text values.
    pub fn new(class_id: impl Into<String>, value: Value) -> Result<Self> {
        let class_id = class_id.into();
        if class_id.is_empty() {
            return Err(PersistenceError::InvalidObjectId(
                "class ID must not be empty".into(),
            ));
        }
        if class_id.contains('|') {
            return Err(PersistenceError::InvalidObjectId(format!(
                "class ID '{}' must not contain '|'",
                class_id
            )));
        }
        match &value {
            Value::Guid(_) | Value::Integer(_) => {}
            Value::Text(text) if !text.is_empty() => {}
            other => {
                return Err(PersistenceError::InvalidObjectId(format!(
                    "values of type {} cannot identify objects",
                    other.type_name()
                )));
            }
        }
        Ok(Self { class_id, value })
    }

    pub fn guid(class_id: impl Into<String>, value: Uuid) -> Self {
        Self {
            class_id: class_id.into(),
            value: Value::Guid(value),
        }
    }

    pub fn new_guid(class_id: impl Into<String>) -> Self {
        Self::guid(class_id, Uuid::new_v4())
    }

    pub fn integer(class_id: impl Into<String>, value: i64) -> Self {
        Self {
            class_id: class_id.into(),
            value: Value::Integer(value),
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// `ClassID|value|TypeTag`, the cross-store reference encoding.
    pub fn serialize(&self) -> Result<String> {
        let tag = match &self.value {
            Value::Guid(_) => "Guid",
            Value::Integer(_) => "Int64",
            Value::Text(_) => "String",
            other => {
                return Err(PersistenceError::InvalidObjectId(format!(
                    "values of type {} cannot be serialized",
                    other.type_name()
                )));
            }
        };

        let serialized = format!("{}|{}|{}", self.class_id, self.value, tag);
        if serialized.len() > MAX_SERIALIZED_LENGTH {
            return Err(PersistenceError::InvalidObjectId(format!(
                "serialized identifier of '{}' is {} characters long, the maximum is {}",
                self.class_id,
                serialized.len(),
                MAX_SERIALIZED_LENGTH
            )));
        }
        Ok(serialized)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || PersistenceError::InvalidObjectId(format!("'{}' is not a serialized identifier", text));

        let (class_id, rest) = text.split_once('|').ok_or_else(invalid)?;
        let (raw_value, tag) = rest.rsplit_once('|').ok_or_else(invalid)?;

        let value = match tag {
            "Guid" => Value::Guid(Uuid::parse_str(raw_value).map_err(|_| invalid())?),
            "Int64" => Value::Integer(raw_value.parse().map_err(|_| invalid())?),
            "String" => Value::Text(raw_value.to_string()),
            _ => return Err(invalid()),
        };
        Self::new(class_id, value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.class_id, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_covers_both_parts() {
        let value = Uuid::new_v4();
        assert_eq!(ObjectId::guid("Order", value), ObjectId::guid("Order", value));
        assert_ne!(ObjectId::guid("Order", value), ObjectId::guid("Invoice", value));
    }

    #[test]
    fn test_serialized_form() {
        let id = ObjectId::integer("Customer", 42);
        assert_eq!(id.serialize().unwrap(), "Customer|42|Int64");
        assert_eq!(ObjectId::parse("Customer|42|Int64").unwrap(), id);
    }

    #[test]
    fn test_text_values_may_contain_separator() {
        let id = ObjectId::new("Code", Value::Text("a|b".into())).unwrap();
        let text = id.serialize().unwrap();
        assert_eq!(ObjectId::parse(&text).unwrap(), id);
    }

    #[test]
    fn test_serialized_length_limit() {
        let id = ObjectId::new("Code", Value::Text("x".repeat(300))).unwrap();
        assert!(id.serialize().is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(ObjectId::new("Order", Value::Null).is_err());
        assert!(ObjectId::new("Or|der", Value::Integer(1)).is_err());
        assert!(ObjectId::parse("Order|12|Decimal").is_err());
        assert!(ObjectId::parse("garbage").is_err());
    }
}
