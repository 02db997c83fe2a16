use std::collections::BTreeMap;

use super::ObjectId;
use crate::core::Value;
use crate::mapping::PropertyKey;

/// Domain value of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Scalar(Value),
    /// Relation value; `None` when the relation is unset.
    Reference(Option<ObjectId>),
}

impl PropertyValue {
    pub fn null_reference() -> Self {
        Self::Reference(None)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ObjectId> {
        match self {
            Self::Reference(id) => id.as_ref(),
            Self::Scalar(_) => None,
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<ObjectId> for PropertyValue {
    fn from(id: ObjectId) -> Self {
        Self::Reference(Some(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataContainerState {
    New,
    Unchanged,
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
struct PropertySlot {
    original: PropertyValue,
    current: PropertyValue,
}

/// Row-level data of one object, as loaded from or saved to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct DataContainer {
    id: ObjectId,
    state: DataContainerState,
    timestamp: Option<Value>,
    values: BTreeMap<PropertyKey, PropertySlot>,
}

impl DataContainer {
    pub fn new_loaded(id: ObjectId, timestamp: Value) -> Self {
        Self {
            id,
            state: DataContainerState::Unchanged,
            timestamp: Some(timestamp),
            values: BTreeMap::new(),
        }
    }

    pub fn new_for_insert(id: ObjectId) -> Self {
        Self {
            id,
            state: DataContainerState::New,
            timestamp: None,
            values: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn state(&self) -> DataContainerState {
        self.state
    }

    pub fn timestamp(&self) -> Option<&Value> {
        self.timestamp.as_ref()
    }

    pub fn set_timestamp(&mut self, timestamp: Value) {
        self.timestamp = Some(timestamp);
    }

    /// Sets original and current value; used while materializing rows.
    pub fn set_loaded_value(&mut self, property: PropertyKey, value: PropertyValue) {
        self.values.insert(
            property,
            PropertySlot {
                original: value.clone(),
                current: value,
            },
        );
    }

    /// Sets the current value, turning an unchanged container into a changed one.
    pub fn set_value(&mut self, property: PropertyKey, value: PropertyValue) {
        match self.values.get_mut(&property) {
            Some(slot) => slot.current = value,
            None => {
                let original = if self.state == DataContainerState::New {
                    value.clone()
                } else {
                    PropertyValue::Scalar(Value::Null)
                };
                self.values.insert(
                    property,
                    PropertySlot {
                        original,
                        current: value,
                    },
                );
            }
        }

        if self.state == DataContainerState::Unchanged && self.has_value_changed(property) {
            self.state = DataContainerState::Changed;
        }
    }

    pub fn value(&self, property: PropertyKey) -> Option<&PropertyValue> {
        self.values.get(&property).map(|slot| &slot.current)
    }

    pub fn original_value(&self, property: PropertyKey) -> Option<&PropertyValue> {
        self.values.get(&property).map(|slot| &slot.original)
    }

    pub fn has_value_changed(&self, property: PropertyKey) -> bool {
        self.values
            .get(&property)
            .is_some_and(|slot| slot.original != slot.current)
    }

    pub fn properties(&self) -> impl Iterator<Item = PropertyKey> + '_ {
        self.values.keys().copied()
    }

    pub fn changed_properties(&self) -> impl Iterator<Item = PropertyKey> + '_ {
        self.values
            .iter()
            .filter(|(_, slot)| slot.original != slot.current)
            .map(|(key, _)| *key)
    }

    pub fn mark_deleted(&mut self) {
        self.state = DataContainerState::Deleted;
    }

    /// Accepts the current values as persisted.
    pub fn commit_state(&mut self) {
        for slot in self.values.values_mut() {
            slot.original = slot.current.clone();
        }
        self.state = DataContainerState::Unchanged;
    }
}

/// Result of looking up one identifier; `located` is `None` when no row exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLookupResult<T> {
    pub object_id: ObjectId,
    pub located: Option<T>,
}

impl<T> ObjectLookupResult<T> {
    pub fn new(object_id: ObjectId, located: Option<T>) -> Self {
        Self { object_id, located }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ObjectLookupResult<U> {
        ObjectLookupResult {
            object_id: self.object_id,
            located: self.located.map(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PropertyKey;

    #[test]
    fn test_change_tracking() {
        let mut container = DataContainer::new_loaded(ObjectId::integer("Order", 1), Value::Integer(7));
        let number = PropertyKey(0);
        container.set_loaded_value(number, Value::Integer(10).into());

        container.set_value(number, Value::Integer(10).into());
        assert_eq!(container.state(), DataContainerState::Unchanged);

        container.set_value(number, Value::Integer(11).into());
        assert_eq!(container.state(), DataContainerState::Changed);
        assert_eq!(container.changed_properties().collect::<Vec<_>>(), vec![number]);

        container.commit_state();
        assert_eq!(container.state(), DataContainerState::Unchanged);
        assert!(!container.has_value_changed(number));
    }

    #[test]
    fn test_new_container_values() {
        let mut container = DataContainer::new_for_insert(ObjectId::integer("Order", 1));
        container.set_value(PropertyKey(0), Value::Text("x".into()).into());

        assert_eq!(container.state(), DataContainerState::New);
        assert!(container.timestamp().is_none());
        assert_eq!(container.value(PropertyKey(0)), Some(&PropertyValue::Scalar("x".into())));
    }
}
