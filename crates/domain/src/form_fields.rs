use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field_record::{FieldId, FieldRecord};
use crate::field_schema::AttributeMap;
use crate::field_type::FieldType;
use crate::record_store::RecordStore;

/// Persisted shape of one form field in a step's `form_fields` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFieldPayload {
    /// Derived field name.
    pub field_name: String,
    /// Field type key.
    pub field_type: FieldType,
    /// Attribute values, verbatim.
    pub field_attributes: AttributeMap,
    /// Current entered value.
    #[serde(default)]
    pub field_value: Value,
    /// 1-based display position.
    pub display_order: u32,
}

/// Flattens records into the persisted array, sorted by `display_order`.
#[must_use]
pub fn flatten_form_fields(records: &[FieldRecord]) -> Vec<FormFieldPayload> {
    let mut payload: Vec<FormFieldPayload> = records
        .iter()
        .map(|record| FormFieldPayload {
            field_name: record.name().to_owned(),
            field_type: record.field_type().clone(),
            field_attributes: record.attributes().clone(),
            field_value: record.value().clone(),
            display_order: record.order(),
        })
        .collect();
    payload.sort_by_key(|field| field.display_order);
    payload
}

impl RecordStore {
    /// Rebuilds a store from previously persisted fields.
    ///
    /// Every field gets a fresh id; names are kept as persisted.
    #[must_use]
    pub fn from_form_fields(fields: Vec<FormFieldPayload>) -> Self {
        Self::from_records(
            fields
                .into_iter()
                .map(|field| {
                    FieldRecord::new(
                        FieldId::new(),
                        field.field_type,
                        field.field_name,
                        field.field_attributes,
                        field.display_order,
                        field.field_value,
                    )
                })
                .collect(),
        )
    }

    /// Flattens the store into the persisted `form_fields` array.
    #[must_use]
    pub fn to_form_fields(&self) -> Vec<FormFieldPayload> {
        flatten_form_fields(self.records())
    }
}
