use async_trait::async_trait;
use fieldloom_application::{FieldSchemaGateway, StepFormGateway};
use fieldloom_core::AppResult;
use fieldloom_domain::{FieldTypeSchema, FormFieldPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api_client::ApiClient;

const FIELD_SCHEMA_PATH: [&str; 1] = ["field-attributes-schema"];
const SOP_STEPS_SEGMENT: &str = "sop-steps";
const FORM_FIELDS_SEGMENT: &str = "form-fields";
const BULK_SEGMENT: &str = "bulk";

/// Field attribute schema adapter over the REST API.
#[derive(Debug, Clone)]
pub struct HttpFieldSchemaGateway {
    client: ApiClient,
}

impl HttpFieldSchemaGateway {
    /// Creates a gateway using a shared API client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FieldSchemaGateway for HttpFieldSchemaGateway {
    async fn fetch_field_schema(&self) -> AppResult<FieldTypeSchema> {
        let raw: Value = self.client.get_json(&FIELD_SCHEMA_PATH).await?;
        let schema = FieldTypeSchema::from_value(raw)?;
        info!(
            field_type_count = schema.type_keys().count(),
            "field attribute schema fetched"
        );
        Ok(schema)
    }
}

/// SOP step form adapter over the REST API.
#[derive(Debug, Clone)]
pub struct HttpStepFormGateway {
    client: ApiClient,
}

impl HttpStepFormGateway {
    /// Creates a gateway using a shared API client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct FormFieldsResponse {
    #[serde(default)]
    form_fields: Vec<FormFieldPayload>,
}

#[derive(Debug, Serialize)]
struct BulkFormFieldsRequest<'a> {
    form_fields: &'a [FormFieldPayload],
}

#[async_trait]
impl StepFormGateway for HttpStepFormGateway {
    async fn load_form_fields(&self, step_id: &str) -> AppResult<Vec<FormFieldPayload>> {
        let response: FormFieldsResponse = self
            .client
            .get_json(&[SOP_STEPS_SEGMENT, step_id, FORM_FIELDS_SEGMENT])
            .await?;
        Ok(response.form_fields)
    }

    async fn save_form_fields(
        &self,
        step_id: &str,
        fields: &[FormFieldPayload],
    ) -> AppResult<()> {
        self.client
            .post_json(
                &[SOP_STEPS_SEGMENT, step_id, FORM_FIELDS_SEGMENT, BULK_SEGMENT],
                &BulkFormFieldsRequest {
                    form_fields: fields,
                },
            )
            .await
    }
}
