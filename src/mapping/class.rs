use super::{PropertyKey, SortExpression};

/// Index of a class inside its [`super::MappingConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassKey(pub(crate) usize);

impl ClassKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Marks a class as table-owning. A missing name means "use the class ID".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAttribute {
    pub name: Option<String>,
}

/// A persistent class. Hierarchy links and property lists are maintained by
/// the owning [`super::MappingConfiguration`].
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// Class discriminator value stored in the `ClassID` column.
    pub id: String,
    pub is_abstract: bool,
    /// Interfaces can be declared in the mapping but cannot be persisted.
    pub is_interface: bool,
    pub table: Option<TableAttribute>,
    pub storage_provider: String,
    pub(crate) base_class: Option<ClassKey>,
    pub(crate) derived_classes: Vec<ClassKey>,
    pub(crate) properties: Vec<PropertyKey>,
    pub(crate) virtual_end_points: Vec<VirtualEndPointDefinition>,
}

impl ClassDefinition {
    pub fn new(id: impl Into<String>, storage_provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_abstract: false,
            is_interface: false,
            table: None,
            storage_provider: storage_provider.into(),
            base_class: None,
            derived_classes: Vec::new(),
            properties: Vec::new(),
            virtual_end_points: Vec::new(),
        }
    }

    /// Owns a table named after the class ID.
    pub fn with_table(mut self) -> Self {
        self.table = Some(TableAttribute::default());
        self
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table = Some(TableAttribute {
            name: Some(name.into()),
        });
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self.is_abstract = true;
        self
    }

    pub fn base_class(&self) -> Option<ClassKey> {
        self.base_class
    }

    pub fn derived_classes(&self) -> &[ClassKey] {
        &self.derived_classes
    }

    /// Own properties, excluding inherited ones.
    pub fn properties(&self) -> &[PropertyKey] {
        &self.properties
    }

    pub fn virtual_end_points(&self) -> &[VirtualEndPointDefinition] {
        &self.virtual_end_points
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// The side of a relation that holds no foreign key.
#[derive(Debug, Clone)]
pub struct VirtualEndPointDefinition {
    pub name: String,
    /// The foreign-key property on the opposite class.
    pub opposite_property: PropertyKey,
    pub cardinality: Cardinality,
    pub sort_expression: Option<SortExpression>,
}

/// Either end of a relation, as seen from one class.
#[derive(Debug, Clone)]
pub enum RelationEndPointDefinition {
    /// The foreign-key-holding side; backed by a property of the class.
    Real(PropertyKey),
    Virtual(VirtualEndPointDefinition),
}

impl RelationEndPointDefinition {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }
}
