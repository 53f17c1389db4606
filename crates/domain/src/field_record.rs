use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::field_schema::AttributeMap;
use crate::field_type::FieldType;

/// Opaque identifier of a placed field. Generated once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(Uuid);

impl FieldId {
    /// Creates a random field identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a field identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FieldId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Derives the snake_case field name from a human label.
///
/// Lowercases, drops everything but ASCII letters, digits and whitespace, then
/// joins the remaining words with `_`. Distinct labels may collide.
#[must_use]
pub fn derive_field_name(label: &str) -> String {
    let kept: String = label
        .to_lowercase()
        .chars()
        .filter(|character| character.is_ascii_alphanumeric() || character.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// One field placed in a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    id: FieldId,
    field_type: FieldType,
    name: String,
    attributes: AttributeMap,
    order: u32,
    value: Value,
}

impl FieldRecord {
    /// Creates a field record.
    #[must_use]
    pub fn new(
        id: FieldId,
        field_type: FieldType,
        name: impl Into<String>,
        attributes: AttributeMap,
        order: u32,
        value: Value,
    ) -> Self {
        Self {
            id,
            field_type,
            name: name.into(),
            attributes,
            order,
            value,
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Returns the field type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Returns the derived field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns resolved attributes.
    #[must_use]
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Returns one attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the 1-based display position.
    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Returns the current entered value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_attribute(&mut self, key: String, value: Value) {
        self.attributes.insert(key, value);
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}
