use std::collections::{BTreeMap, HashSet};

use fieldloom_core::{AppError, AppResult};
use serde::Serialize;
use serde_json::Value;

use crate::attribute_resolver::{
    LABEL_ATTRIBUTE, REQUIRED_ATTRIBUTE, default_label_for, defaults_for, initial_value_for,
    validate_attributes,
};
use crate::field_record::{FieldId, FieldRecord, derive_field_name};
use crate::field_schema::{FieldTypeSchema, is_blank};
use crate::field_type::{FieldType, validate_entered_value};

/// Ordered collection of placed fields owned by one edit session.
///
/// After every mutation the records' `order` values form the dense sequence
/// `1..=len`, matching their position in the list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordStore {
    records: Vec<FieldRecord>,
    selected: Option<FieldId>,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from existing records, ordered by their current `order`.
    #[must_use]
    pub fn from_records(mut records: Vec<FieldRecord>) -> Self {
        records.sort_by_key(FieldRecord::order);
        let mut store = Self {
            records,
            selected: None,
        };
        store.renumber();
        store
    }

    /// Places a new field of `type_key` at `at_index`, or at the end.
    ///
    /// Indexes past the end append. Nothing is inserted when the type is not in the schema.
    pub fn add(
        &mut self,
        type_key: &str,
        at_index: Option<usize>,
        schema: &FieldTypeSchema,
    ) -> AppResult<&FieldRecord> {
        let mut attributes = defaults_for(type_key, schema)?;
        let declared_label = attributes
            .get(LABEL_ATTRIBUTE)
            .and_then(Value::as_str)
            .filter(|label| !label.trim().is_empty())
            .map(str::to_owned);
        let label = match declared_label {
            Some(label) => label,
            None => {
                let label = default_label_for(type_key);
                attributes.insert(LABEL_ATTRIBUTE.to_owned(), Value::String(label.clone()));
                label
            }
        };

        let field_type = FieldType::from_key(type_key);
        let value = initial_value_for(&field_type, &attributes);
        let record = FieldRecord::new(
            FieldId::new(),
            field_type,
            derive_field_name(label.as_str()),
            attributes,
            0,
            value,
        );

        let index = at_index.unwrap_or(self.records.len()).min(self.records.len());
        self.records.insert(index, record);
        self.renumber();

        Ok(&self.records[index])
    }

    /// Removes a field and clears the selection if it pointed at it.
    pub fn remove(&mut self, id: FieldId) -> AppResult<FieldRecord> {
        let index = self.index_of(id)?;
        let removed = self.records.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.renumber();

        Ok(removed)
    }

    /// Replaces the order wholesale. `ids` must be a permutation of the current ids.
    pub fn reorder(&mut self, ids: &[FieldId]) -> AppResult<()> {
        let unique: HashSet<FieldId> = ids.iter().copied().collect();
        if ids.len() != self.records.len() || unique.len() != ids.len() {
            return Err(AppError::Validation(format!(
                "reorder expects each of the {} field ids exactly once",
                self.records.len()
            )));
        }

        let mut by_id: BTreeMap<FieldId, FieldRecord> = BTreeMap::new();
        for id in ids {
            if !self.records.iter().any(|record| record.id() == *id) {
                return Err(AppError::NotFound(format!("field '{id}' is not in the form")));
            }
        }
        for record in self.records.drain(..) {
            by_id.insert(record.id(), record);
        }
        self.records = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        self.renumber();

        Ok(())
    }

    /// Moves one field to `to_index`, clamped to the last position.
    pub fn move_record(&mut self, id: FieldId, to_index: usize) -> AppResult<()> {
        let from_index = self.index_of(id)?;
        let record = self.records.remove(from_index);
        let to_index = to_index.min(self.records.len());
        self.records.insert(to_index, record);
        self.renumber();

        Ok(())
    }

    /// Sets one attribute. Changing the label re-derives the field name.
    pub fn update_attribute(
        &mut self,
        id: FieldId,
        attribute_key: &str,
        value: Value,
    ) -> AppResult<()> {
        let index = self.index_of(id)?;
        let record = &mut self.records[index];

        if attribute_key == LABEL_ATTRIBUTE {
            let label = value.as_str().unwrap_or_default();
            record.set_name(derive_field_name(label));
        }
        record.set_attribute(attribute_key.to_owned(), value);

        Ok(())
    }

    /// Sets the entered (preview) value of a field.
    pub fn set_value(&mut self, id: FieldId, value: Value) -> AppResult<()> {
        let index = self.index_of(id)?;
        self.records[index].set_value(value);
        Ok(())
    }

    /// Points the attribute editor at a field.
    pub fn select(&mut self, id: FieldId) -> AppResult<()> {
        self.index_of(id)?;
        self.selected = Some(id);
        Ok(())
    }

    /// Clears the attribute editor pointer.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Returns the field the attribute editor points at.
    #[must_use]
    pub fn selected(&self) -> Option<&FieldRecord> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Returns a field by id.
    #[must_use]
    pub fn get(&self, id: FieldId) -> Option<&FieldRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Returns fields in display order.
    #[must_use]
    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns field names used by more than one field, in first-use order.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for record in &self.records {
            if !seen.insert(record.name()) && !duplicates.iter().any(|name| name == record.name()) {
                duplicates.push(record.name().to_owned());
            }
        }
        duplicates
    }

    /// Checks every field before the form is saved.
    ///
    /// Collects all problems into one `AppError::ValidationFailed`.
    pub fn validate_for_submit(&self, schema: &FieldTypeSchema) -> AppResult<()> {
        let mut messages = Vec::new();

        for record in &self.records {
            let position = record.order();
            if record.name().is_empty() {
                messages.push(format!(
                    "field {position} needs a label containing letters or digits"
                ));
            }

            let label = if record.name().is_empty() {
                format!("field {position}")
            } else {
                format!("field '{}'", record.name())
            };

            match validate_attributes(record.field_type().as_str(), record.attributes(), schema)
            {
                Ok(attribute_messages) => messages.extend(
                    attribute_messages
                        .into_iter()
                        .map(|message| format!("{label}: {message}")),
                ),
                Err(error) => messages.push(format!("{label}: {error}")),
            }

            if is_blank(record.value()) {
                if record.attribute(REQUIRED_ATTRIBUTE) == Some(&Value::Bool(true)) {
                    messages.push(format!("{label}: a value is required"));
                }
            } else if let Err(message) =
                validate_entered_value(record.field_type(), record.value(), record.attributes())
            {
                messages.push(format!("{label}: {message}"));
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(messages))
        }
    }

    fn index_of(&self, id: FieldId) -> AppResult<usize> {
        self.records
            .iter()
            .position(|record| record.id() == id)
            .ok_or_else(|| AppError::NotFound(format!("field '{id}' is not in the form")))
    }

    fn renumber(&mut self) {
        for (position, record) in (1_u32..).zip(self.records.iter_mut()) {
            record.set_order(position);
        }
    }
}
