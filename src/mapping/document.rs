//! Serializable description of a mapping, loaded from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    Cardinality, ClassDefinition, ClassKey, MappingConfiguration, PropertyDefinition,
    PropertyType, SortExpression, StorageClass, TableAttribute, VirtualEndPointDefinition,
};
use crate::core::{PersistenceError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
    /// Store used by classes that name none.
    #[serde(default = "default_provider_name")]
    pub default_provider: String,
    pub classes: Vec<ClassDocument>,
}

fn default_provider_name() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDocument {
    pub id: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default, rename = "interface")]
    pub is_interface: bool,
    #[serde(default)]
    pub table: Option<TableDocument>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
    #[serde(default)]
    pub collections: Vec<CollectionDocument>,
}

/// `true` for a table named after the class, or an explicit table name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableDocument {
    Flag(bool),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub name: String,
    #[serde(default, rename = "type")]
    pub property_type: Option<PropertyType>,
    /// Class ID of the referenced class; makes this a relation property.
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub storage_class: StorageClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDocument {
    pub name: String,
    /// `Class.Property` of the foreign-key side.
    pub opposite: String,
    #[serde(default = "default_many")]
    pub many: bool,
    /// e.g. `"Position asc, Name desc"`
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_many() -> bool {
    true
}

impl MappingDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PersistenceError::InvalidConfiguration(format!(
                "Cannot read mapping file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn into_configuration(self) -> Result<MappingConfiguration> {
        let mut mapping = MappingConfiguration::new();

        for class in &self.classes {
            let mut definition = ClassDefinition::new(
                class.id.clone(),
                class
                    .provider
                    .clone()
                    .unwrap_or_else(|| self.default_provider.clone()),
            );
            definition.is_abstract = class.is_abstract || class.is_interface;
            definition.is_interface = class.is_interface;
            definition.table = match &class.table {
                None | Some(TableDocument::Flag(false)) => None,
                Some(TableDocument::Flag(true)) => Some(TableAttribute::default()),
                Some(TableDocument::Name(name)) => Some(TableAttribute {
                    name: Some(name.clone()),
                }),
            };
            mapping.add_class(definition)?;
        }

        for class in &self.classes {
            if let Some(base) = &class.base {
                let derived = mapping.class_by_id(&class.id)?;
                let base = mapping.class_by_id(base)?;
                mapping.set_base_class(derived, base)?;
            }
        }

        for class in &self.classes {
            let key = mapping.class_by_id(&class.id)?;
            for property in &class.properties {
                let definition = property_definition(&mapping, key, property)?;
                mapping.add_property(key, definition)?;
            }
        }

        for class in &self.classes {
            let key = mapping.class_by_id(&class.id)?;
            for collection in &class.collections {
                let end_point = virtual_end_point(&mapping, collection)?;
                mapping.add_virtual_end_point(key, end_point)?;
            }
        }

        Ok(mapping)
    }
}

fn property_definition(
    mapping: &MappingConfiguration,
    class: ClassKey,
    property: &PropertyDocument,
) -> Result<PropertyDefinition> {
    let mut definition = match (&property.relation, &property.property_type) {
        (Some(opposite), None | Some(PropertyType::ObjectId)) => {
            PropertyDefinition::relation(property.name.clone(), mapping.class_by_id(opposite)?)
        }
        (None, Some(property_type)) => {
            PropertyDefinition::value(property.name.clone(), property_type.clone())
        }
        (Some(_), Some(_)) => {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Relation property '{}.{}' must not declare a value type",
                mapping.class(class).id,
                property.name
            )));
        }
        (None, None) => {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Property '{}.{}' declares neither a type nor a relation",
                mapping.class(class).id,
                property.name
            )));
        }
    };

    if let Some(nullable) = property.nullable {
        definition.is_nullable = nullable;
    }
    definition.max_length = property.max_length;
    definition.column_name = property.column.clone();
    definition.storage_class = property.storage_class;
    Ok(definition)
}

fn virtual_end_point(
    mapping: &MappingConfiguration,
    collection: &CollectionDocument,
) -> Result<VirtualEndPointDefinition> {
    let (class_id, property_name) = collection.opposite.split_once('.').ok_or_else(|| {
        PersistenceError::InvalidConfiguration(format!(
            "Collection '{}' must name its opposite as 'Class.Property', got '{}'",
            collection.name, collection.opposite
        ))
    })?;
    let opposite_class = mapping.class_by_id(class_id)?;
    let opposite_property = mapping.property_by_name(opposite_class, property_name)?;

    let sort_expression = match &collection.sort {
        Some(sort) => Some(parse_sort_expression(mapping, opposite_class, sort)?),
        None => None,
    };

    Ok(VirtualEndPointDefinition {
        name: collection.name.clone(),
        opposite_property,
        cardinality: if collection.many {
            Cardinality::Many
        } else {
            Cardinality::One
        },
        sort_expression,
    })
}

/// Parses `"Name asc, Date desc"`; the order keyword is optional.
pub fn parse_sort_expression(
    mapping: &MappingConfiguration,
    class: ClassKey,
    text: &str,
) -> Result<SortExpression> {
    let mut expression = SortExpression::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mut parts = item.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };
        let property = mapping.property_by_name(class, name)?;
        expression = match parts.next().map(|s| s.to_ascii_lowercase()) {
            None => expression.ascending(property),
            Some(order) if order == "asc" || order == "ascending" => expression.ascending(property),
            Some(order) if order == "desc" || order == "descending" => {
                expression.descending(property)
            }
            Some(order) => {
                return Err(PersistenceError::InvalidConfiguration(format!(
                    "Invalid sort order '{}' in sort expression '{}'",
                    order, text
                )));
            }
        };
    }
    Ok(expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SortOrder;

    const MAPPING: &str = r#"{
        "default_provider": "main",
        "classes": [
            { "id": "Customer", "table": true,
              "properties": [ { "name": "Name", "type": "string", "max_length": 100 } ],
              "collections": [ { "name": "Orders", "opposite": "Order.Customer", "sort": "Number desc" } ] },
            { "id": "Order", "table": "OrderTable",
              "properties": [
                { "name": "Number", "type": "int32" },
                { "name": "Priority", "type": { "enum": "Priority" } },
                { "name": "Customer", "relation": "Customer" } ] },
            { "id": "SpecialOrder", "base": "Order" }
        ]
    }"#;

    #[test]
    fn test_document_conversion() {
        let mapping = MappingDocument::from_json(MAPPING)
            .unwrap()
            .into_configuration()
            .unwrap();

        let order = mapping.class_by_id("Order").unwrap();
        let special = mapping.class_by_id("SpecialOrder").unwrap();
        let customer = mapping.class_by_id("Customer").unwrap();

        assert_eq!(mapping.class(special).base_class(), Some(order));
        assert_eq!(
            mapping.class(order).table.as_ref().and_then(|t| t.name.as_deref()),
            Some("OrderTable")
        );
        assert_eq!(mapping.class(order).storage_provider, "main");

        let relation = mapping.property(mapping.property_by_name(order, "Customer").unwrap());
        assert!(relation.is_nullable);
        assert_eq!(relation.relation.as_ref().unwrap().opposite_class, customer);

        let end_points = mapping.class(customer).virtual_end_points();
        assert_eq!(end_points.len(), 1);
        let sort = end_points[0].sort_expression.as_ref().unwrap();
        assert_eq!(sort.sorted_properties[0].order, SortOrder::Descending);
    }

    #[test]
    fn test_unknown_relation_target() {
        let json = r#"{ "classes": [ { "id": "A", "table": true,
            "properties": [ { "name": "B", "relation": "Missing" } ] } ] }"#;
        let result = MappingDocument::from_json(json).unwrap().into_configuration();
        assert!(matches!(result, Err(PersistenceError::ClassNotFound(_))));
    }

    #[test]
    fn test_invalid_sort_order() {
        let mapping = MappingDocument::from_json(MAPPING)
            .unwrap()
            .into_configuration()
            .unwrap();
        let order = mapping.class_by_id("Order").unwrap();
        assert!(parse_sort_expression(&mapping, order, "Number sideways").is_err());
    }
}
