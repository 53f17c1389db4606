use async_trait::async_trait;
use fieldloom_core::AppResult;
use fieldloom_domain::{FieldTypeSchema, FormFieldPayload};

/// Port fetching the field-type attribute schema.
#[async_trait]
pub trait FieldSchemaGateway: Send + Sync {
    /// Fetches the schema once per session.
    async fn fetch_field_schema(&self) -> AppResult<FieldTypeSchema>;
}

/// Port loading and saving SOP step form fields.
#[async_trait]
pub trait StepFormGateway: Send + Sync {
    /// Loads the persisted fields of a step.
    async fn load_form_fields(&self, step_id: &str) -> AppResult<Vec<FormFieldPayload>>;

    /// Replaces the persisted fields of a step in one bulk call.
    async fn save_form_fields(&self, step_id: &str, fields: &[FormFieldPayload])
    -> AppResult<()>;
}
