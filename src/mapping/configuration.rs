use std::collections::HashMap;

use super::{
    ClassDefinition, ClassKey, PropertyDefinition, PropertyKey, RelationEndPointDefinition,
    VirtualEndPointDefinition,
};
use crate::core::{PersistenceError, Result};

/// Arena of all persistent classes and properties of an application.
///
/// Built once at startup, then shared read-only. Classes form a forest;
/// `set_base_class` refuses to introduce a cycle.
#[derive(Debug, Clone, Default)]
pub struct MappingConfiguration {
    classes: Vec<ClassDefinition>,
    properties: Vec<PropertyDefinition>,
    class_index: HashMap<String, ClassKey>,
}

impl MappingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassDefinition) -> Result<ClassKey> {
        if self.class_index.contains_key(&class.id) {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Class '{}' is defined more than once",
                class.id
            )));
        }

        let key = ClassKey(self.classes.len());
        self.class_index.insert(class.id.clone(), key);
        self.classes.push(class);
        Ok(key)
    }

    pub fn set_base_class(&mut self, derived: ClassKey, base: ClassKey) -> Result<()> {
        if let Some(existing) = self.class(derived).base_class {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Class '{}' already derives from '{}'",
                self.class(derived).id,
                self.class(existing).id
            )));
        }

        if derived == base || self.ancestors(base).contains(&derived) {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Deriving '{}' from '{}' would create an inheritance cycle",
                self.class(derived).id,
                self.class(base).id
            )));
        }

        self.classes[derived.0].base_class = Some(base);
        self.classes[base.0].derived_classes.push(derived);
        Ok(())
    }

    pub fn add_property(
        &mut self,
        class: ClassKey,
        mut property: PropertyDefinition,
    ) -> Result<PropertyKey> {
        if self.find_property(class, &property.name).is_some() {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Property '{}' is defined more than once on class '{}'",
                property.name,
                self.class(class).id
            )));
        }

        let key = PropertyKey(self.properties.len());
        property.class = class;
        self.properties.push(property);
        self.classes[class.0].properties.push(key);
        Ok(key)
    }

    pub fn add_virtual_end_point(
        &mut self,
        class: ClassKey,
        end_point: VirtualEndPointDefinition,
    ) -> Result<()> {
        let opposite = self.property(end_point.opposite_property);
        let Some(relation) = &opposite.relation else {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Virtual end point '{}' of class '{}' must point to a relation property, \
                 but '{}' is a value property",
                end_point.name,
                self.class(class).id,
                opposite.name
            )));
        };

        if relation.opposite_class != class && !self.ancestors(class).contains(&relation.opposite_class) {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Relation property '{}' does not reference class '{}'",
                opposite.name,
                self.class(class).id
            )));
        }

        self.classes[class.0].virtual_end_points.push(end_point);
        Ok(())
    }

    pub fn class(&self, key: ClassKey) -> &ClassDefinition {
        &self.classes[key.0]
    }

    pub fn property(&self, key: PropertyKey) -> &PropertyDefinition {
        &self.properties[key.0]
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn class_keys(&self) -> impl Iterator<Item = ClassKey> + '_ {
        (0..self.classes.len()).map(ClassKey)
    }

    pub fn class_by_id(&self, id: &str) -> Result<ClassKey> {
        self.class_index
            .get(id)
            .copied()
            .ok_or_else(|| PersistenceError::ClassNotFound(id.to_string()))
    }

    /// Finds a property declared on `class` or one of its ancestors.
    pub fn find_property(&self, class: ClassKey, name: &str) -> Option<PropertyKey> {
        std::iter::once(class)
            .chain(self.ancestors(class))
            .flat_map(|key| self.class(key).properties.iter().copied())
            .find(|key| self.property(*key).name == name)
    }

    pub fn property_by_name(&self, class: ClassKey, name: &str) -> Result<PropertyKey> {
        self.find_property(class, name)
            .ok_or_else(|| PersistenceError::PropertyNotFound {
                class: self.class(class).id.clone(),
                property: name.to_string(),
            })
    }

    /// "Class.Property", used in diagnostics.
    pub fn property_identifier(&self, key: PropertyKey) -> String {
        let property = self.property(key);
        format!("{}.{}", self.class(property.class).id, property.name)
    }

    /// Ancestor chain, nearest base class first.
    pub fn ancestors(&self, class: ClassKey) -> Vec<ClassKey> {
        let mut result = Vec::new();
        let mut current = self.class(class).base_class;
        while let Some(key) = current {
            result.push(key);
            current = self.class(key).base_class;
        }
        result
    }

    /// All descendants in pre-order.
    pub fn descendants(&self, class: ClassKey) -> Vec<ClassKey> {
        let mut result = Vec::new();
        let mut stack: Vec<ClassKey> = self.class(class).derived_classes.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            result.push(key);
            stack.extend(self.class(key).derived_classes.iter().rev().copied());
        }
        result
    }

    /// Ancestors (root first), the class itself, then its descendants.
    pub fn hierarchy(&self, class: ClassKey) -> Vec<ClassKey> {
        let mut result: Vec<ClassKey> = self.ancestors(class).into_iter().rev().collect();
        result.push(class);
        result.extend(self.descendants(class));
        result
    }

    pub fn root_of(&self, class: ClassKey) -> ClassKey {
        self.ancestors(class).last().copied().unwrap_or(class)
    }

    /// Classes without a base class.
    pub fn root_classes(&self) -> Vec<ClassKey> {
        self.class_keys()
            .filter(|key| self.class(*key).base_class.is_none())
            .collect()
    }

    pub fn is_part_of_inheritance_hierarchy(&self, class: ClassKey) -> bool {
        let definition = self.class(class);
        definition.base_class.is_some() || !definition.derived_classes.is_empty()
    }

    /// Own persistent properties of `class`.
    pub fn persistent_properties(&self, class: ClassKey) -> impl Iterator<Item = PropertyKey> + '_ {
        self.class(class)
            .properties
            .iter()
            .copied()
            .filter(|key| self.property(*key).is_persistent())
    }

    /// Persistent properties visible on `class`, inherited ones first.
    pub fn all_persistent_properties(&self, class: ClassKey) -> Vec<PropertyKey> {
        let mut chain: Vec<ClassKey> = self.ancestors(class).into_iter().rev().collect();
        chain.push(class);
        chain
            .into_iter()
            .flat_map(|key| self.persistent_properties(key).collect::<Vec<_>>())
            .collect()
    }

    /// Persistent properties of every class in the hierarchy of `class`.
    pub fn persistent_properties_in_hierarchy(&self, class: ClassKey) -> Vec<PropertyKey> {
        self.hierarchy(class)
            .into_iter()
            .flat_map(|key| self.persistent_properties(key).collect::<Vec<_>>())
            .collect()
    }

    /// Own relation end points of `class`, real ones first.
    pub fn relation_end_points(&self, class: ClassKey) -> Vec<RelationEndPointDefinition> {
        let definition = self.class(class);
        definition
            .properties
            .iter()
            .filter(|key| self.property(**key).is_relation())
            .map(|key| RelationEndPointDefinition::Real(*key))
            .chain(
                definition
                    .virtual_end_points
                    .iter()
                    .cloned()
                    .map(RelationEndPointDefinition::Virtual),
            )
            .collect()
    }

    /// Nearest class in the chain (starting with `class` itself) that owns a table.
    pub fn table_owner(&self, class: ClassKey) -> Option<ClassKey> {
        std::iter::once(class)
            .chain(self.ancestors(class))
            .find(|key| self.class(*key).table.is_some())
    }

    pub fn classes_of_provider<'a>(&'a self, provider: &'a str) -> impl Iterator<Item = ClassKey> + 'a {
        self.class_keys()
            .filter(move |key| self.class(*key).storage_provider == provider)
    }
}
