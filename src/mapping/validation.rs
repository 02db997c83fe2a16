//! Structural checks that the persistence model loader relies on but does
//! not re-verify.

use thiserror::Error;

use super::{ClassKey, MappingConfiguration};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{class}: {message}")]
pub struct MappingValidationError {
    pub class: String,
    pub message: String,
}

impl MappingValidationError {
    fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }
}

/// Runs every hierarchy rule and returns all violations found.
pub fn validate_mapping(mapping: &MappingConfiguration) -> Vec<MappingValidationError> {
    let mut errors = Vec::new();

    for class in mapping.class_keys() {
        check_class_id(mapping, class, &mut errors);
        check_single_table_per_chain(mapping, class, &mut errors);
        check_abstract_above_table(mapping, class, &mut errors);
        check_concrete_class_has_table(mapping, class, &mut errors);
        check_same_provider_in_hierarchy(mapping, class, &mut errors);
        check_interface(mapping, class, &mut errors);
    }

    errors
}

fn check_class_id(
    mapping: &MappingConfiguration,
    class: ClassKey,
    errors: &mut Vec<MappingValidationError>,
) {
    let id = &mapping.class(class).id;
    if id.is_empty() {
        errors.push(MappingValidationError::new("<unnamed>", "Class ID must not be empty"));
    } else if id.contains('|') {
        errors.push(MappingValidationError::new(
            id.clone(),
            "Class ID must not contain the '|' character",
        ));
    }
}

fn check_single_table_per_chain(
    mapping: &MappingConfiguration,
    class: ClassKey,
    errors: &mut Vec<MappingValidationError>,
) {
    let definition = mapping.class(class);
    if definition.table.is_none() {
        return;
    }

    if let Some(owner) = mapping
        .ancestors(class)
        .into_iter()
        .find(|key| mapping.class(*key).table.is_some())
    {
        errors.push(MappingValidationError::new(
            definition.id.clone(),
            format!(
                "Class declares a table although its base class '{}' already owns one",
                mapping.class(owner).id
            ),
        ));
    }
}

fn check_abstract_above_table(
    mapping: &MappingConfiguration,
    class: ClassKey,
    errors: &mut Vec<MappingValidationError>,
) {
    if mapping.class(class).table.is_none() {
        return;
    }

    for ancestor in mapping.ancestors(class) {
        let definition = mapping.class(ancestor);
        if !definition.is_abstract {
            errors.push(MappingValidationError::new(
                definition.id.clone(),
                format!(
                    "Class is above the table-owning class '{}' and must be abstract",
                    mapping.class(class).id
                ),
            ));
        }
    }
}

fn check_concrete_class_has_table(
    mapping: &MappingConfiguration,
    class: ClassKey,
    errors: &mut Vec<MappingValidationError>,
) {
    let definition = mapping.class(class);
    if !definition.is_abstract && mapping.table_owner(class).is_none() {
        errors.push(MappingValidationError::new(
            definition.id.clone(),
            "Concrete class has no table in its inheritance chain",
        ));
    }
}

fn check_same_provider_in_hierarchy(
    mapping: &MappingConfiguration,
    class: ClassKey,
    errors: &mut Vec<MappingValidationError>,
) {
    let definition = mapping.class(class);
    if let Some(base) = definition.base_class() {
        let base_definition = mapping.class(base);
        if base_definition.storage_provider != definition.storage_provider {
            errors.push(MappingValidationError::new(
                definition.id.clone(),
                format!(
                    "Class is stored in '{}' but its base class '{}' is stored in '{}'",
                    definition.storage_provider, base_definition.id, base_definition.storage_provider
                ),
            ));
        }
    }
}

fn check_interface(
    mapping: &MappingConfiguration,
    class: ClassKey,
    errors: &mut Vec<MappingValidationError>,
) {
    let definition = mapping.class(class);
    if definition.is_interface {
        errors.push(MappingValidationError::new(
            definition.id.clone(),
            "Interfaces cannot be persisted",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ClassDefinition;

    #[test]
    fn test_valid_hierarchy() {
        let mut mapping = MappingConfiguration::new();
        let document = mapping
            .add_class(ClassDefinition::new("Document", "main").abstract_class())
            .unwrap();
        let order = mapping
            .add_class(ClassDefinition::new("Order", "main").with_table())
            .unwrap();
        let invoice = mapping.add_class(ClassDefinition::new("Invoice", "main")).unwrap();
        mapping.set_base_class(order, document).unwrap();
        mapping.set_base_class(invoice, order).unwrap();

        assert!(validate_mapping(&mapping).is_empty());
    }

    #[test]
    fn test_concrete_class_above_table() {
        let mut mapping = MappingConfiguration::new();
        let base = mapping.add_class(ClassDefinition::new("Base", "main")).unwrap();
        let derived = mapping
            .add_class(ClassDefinition::new("Derived", "main").with_table())
            .unwrap();
        mapping.set_base_class(derived, base).unwrap();

        let errors = validate_mapping(&mapping);
        assert!(errors.iter().any(|e| e.class == "Base" && e.message.contains("must be abstract")));
        assert!(errors.iter().any(|e| e.class == "Base" && e.message.contains("no table")));
    }

    #[test]
    fn test_two_tables_in_chain() {
        let mut mapping = MappingConfiguration::new();
        let base = mapping
            .add_class(ClassDefinition::new("Base", "main").with_table())
            .unwrap();
        let derived = mapping
            .add_class(ClassDefinition::new("Derived", "main").with_table())
            .unwrap();
        mapping.set_base_class(derived, base).unwrap();

        let errors = validate_mapping(&mapping);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.class == "Derived" || e.class == "Base"));
    }

    #[test]
    fn test_mixed_providers() {
        let mut mapping = MappingConfiguration::new();
        let base = mapping
            .add_class(ClassDefinition::new("Base", "main").with_table())
            .unwrap();
        let derived = mapping.add_class(ClassDefinition::new("Derived", "other")).unwrap();
        mapping.set_base_class(derived, base).unwrap();

        let errors = validate_mapping(&mapping);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'other'"));
    }
}
