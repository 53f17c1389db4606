use std::sync::Arc;

use fieldloom_core::{AppError, AppResult, NonEmptyString};
use fieldloom_domain::{FieldId, FieldRecord, FieldTypeSchema, FormFieldPayload, RecordStore};
use serde_json::Value;
use tracing::{info, warn};

use crate::step_form_ports::{FieldSchemaGateway, StepFormGateway};

/// In-memory document of one SOP step form edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFormSession {
    step_id: NonEmptyString,
    schema: FieldTypeSchema,
    store: RecordStore,
}

impl StepFormSession {
    /// Starts a session over an already fetched schema and store.
    #[must_use]
    pub fn new(step_id: NonEmptyString, schema: FieldTypeSchema, store: RecordStore) -> Self {
        Self {
            step_id,
            schema,
            store,
        }
    }

    /// Returns the edited step id.
    #[must_use]
    pub fn step_id(&self) -> &str {
        self.step_id.as_str()
    }

    /// Returns the field-type schema.
    #[must_use]
    pub fn schema(&self) -> &FieldTypeSchema {
        &self.schema
    }

    /// Returns the field types that can be placed.
    pub fn palette(&self) -> impl Iterator<Item = &str> {
        self.schema.type_keys()
    }

    /// Returns the placed fields.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Places a field from the palette.
    pub fn add_field(&mut self, type_key: &str, at_index: Option<usize>) -> AppResult<FieldId> {
        match self.store.add(type_key, at_index, &self.schema) {
            Ok(record) => Ok(record.id()),
            Err(error) => {
                warn!(
                    step_id = %self.step_id,
                    field_type = type_key,
                    error = %error,
                    "field could not be placed"
                );
                Err(error)
            }
        }
    }

    /// Removes a field.
    pub fn remove_field(&mut self, id: FieldId) -> AppResult<FieldRecord> {
        self.store.remove(id)
    }

    /// Replaces the field order.
    pub fn reorder_fields(&mut self, ids: &[FieldId]) -> AppResult<()> {
        self.store.reorder(ids)
    }

    /// Moves one field.
    pub fn move_field(&mut self, id: FieldId, to_index: usize) -> AppResult<()> {
        self.store.move_record(id, to_index)
    }

    /// Edits one attribute of a field.
    pub fn update_attribute(
        &mut self,
        id: FieldId,
        attribute_key: &str,
        value: Value,
    ) -> AppResult<()> {
        self.store.update_attribute(id, attribute_key, value)
    }

    /// Sets the preview value of a field.
    pub fn set_value(&mut self, id: FieldId, value: Value) -> AppResult<()> {
        self.store.set_value(id, value)
    }

    /// Points the attribute editor at a field.
    pub fn select_field(&mut self, id: FieldId) -> AppResult<()> {
        self.store.select(id)
    }
}

/// Application service driving the fetch, edit and save cycle of step forms.
#[derive(Clone)]
pub struct StepFormEditorService {
    schema_gateway: Arc<dyn FieldSchemaGateway>,
    step_form_gateway: Arc<dyn StepFormGateway>,
}

impl StepFormEditorService {
    /// Creates a new step form editor service.
    #[must_use]
    pub fn new(
        schema_gateway: Arc<dyn FieldSchemaGateway>,
        step_form_gateway: Arc<dyn StepFormGateway>,
    ) -> Self {
        Self {
            schema_gateway,
            step_form_gateway,
        }
    }

    /// Fetches the schema and the step's persisted fields.
    pub async fn open_session(&self, step_id: &str) -> AppResult<StepFormSession> {
        let step_id = NonEmptyString::new(step_id.trim())
            .map_err(|_| AppError::Validation("step id is required".to_owned()))?;
        let schema = self.schema_gateway.fetch_field_schema().await?;
        let fields = self
            .step_form_gateway
            .load_form_fields(step_id.as_str())
            .await?;

        info!(
            step_id = %step_id,
            field_type_count = schema.type_keys().count(),
            field_count = fields.len(),
            "step form session opened"
        );
        Ok(StepFormSession::new(
            step_id,
            schema,
            RecordStore::from_form_fields(fields),
        ))
    }

    /// Validates, flattens and saves the session's fields.
    pub async fn submit(&self, session: &StepFormSession) -> AppResult<Vec<FormFieldPayload>> {
        session.store().validate_for_submit(session.schema())?;

        let duplicates = session.store().duplicate_names();
        if !duplicates.is_empty() {
            warn!(
                step_id = session.step_id(),
                duplicates = ?duplicates,
                "several fields share a derived name"
            );
        }

        let fields = session.store().to_form_fields();
        if let Err(error) = self
            .step_form_gateway
            .save_form_fields(session.step_id(), &fields)
            .await
        {
            warn!(
                step_id = session.step_id(),
                error = %error,
                "step form save failed"
            );
            return Err(error);
        }

        info!(
            step_id = session.step_id(),
            field_count = fields.len(),
            "step form saved"
        );
        Ok(fields)
    }
}
