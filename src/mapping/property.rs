use serde::{Deserialize, Serialize};
use std::fmt;

use super::ClassKey;

/// Index of a property inside its [`super::MappingConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey(pub(crate) usize);

impl PropertyKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Domain-level type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Decimal,
    Double,
    Single,
    String,
    DateTime,
    Date,
    Guid,
    Binary,
    /// Stored as its underlying integer.
    Enum(String),
    /// Stored as the identifier string of the value.
    ExtensibleEnum(String),
    /// Relation property referencing another persistent object.
    ObjectId,
    /// A type the storage layer knows nothing about.
    Custom(String),
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(name) => write!(f, "enum {}", name),
            Self::ExtensibleEnum(name) => write!(f, "extensible enum {}", name),
            Self::Custom(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    #[default]
    Persistent,
    /// Lives only in memory for the duration of a transaction.
    Transaction,
}

/// The foreign-key side of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEndPoint {
    pub opposite_class: ClassKey,
}

#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub name: String,
    pub property_type: PropertyType,
    pub storage_class: StorageClass,
    pub is_nullable: bool,
    pub max_length: Option<u32>,
    /// Overrides the derived column name.
    pub column_name: Option<String>,
    pub relation: Option<RelationEndPoint>,
    pub(crate) class: ClassKey,
}

impl PropertyDefinition {
    pub fn value(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            storage_class: StorageClass::Persistent,
            is_nullable: false,
            max_length: None,
            column_name: None,
            relation: None,
            class: ClassKey(usize::MAX),
        }
    }

    pub fn relation(name: impl Into<String>, opposite_class: ClassKey) -> Self {
        let mut property = Self::value(name, PropertyType::ObjectId);
        property.is_nullable = true;
        property.relation = Some(RelationEndPoint { opposite_class });
        property
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn transaction_only(mut self) -> Self {
        self.storage_class = StorageClass::Transaction;
        self
    }

    /// The class that declares this property.
    pub fn class(&self) -> ClassKey {
        self.class
    }

    pub fn is_persistent(&self) -> bool {
        self.storage_class == StorageClass::Persistent
    }

    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedProperty {
    pub property: PropertyKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortExpression {
    pub sorted_properties: Vec<SortedProperty>,
}

impl SortExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascending(mut self, property: PropertyKey) -> Self {
        self.sorted_properties.push(SortedProperty {
            property,
            order: SortOrder::Ascending,
        });
        self
    }

    pub fn descending(mut self, property: PropertyKey) -> Self {
        self.sorted_properties.push(SortedProperty {
            property,
            order: SortOrder::Descending,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_properties.is_empty()
    }
}
