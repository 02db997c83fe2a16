pub mod container;
pub mod object_id;

pub use container::{DataContainer, DataContainerState, ObjectLookupResult, PropertyValue};
pub use object_id::{MAX_SERIALIZED_LENGTH, ObjectId};
