use async_trait::async_trait;
use fieldloom_application::FieldSchemaGateway;
use fieldloom_core::AppResult;
use fieldloom_domain::FieldTypeSchema;
use serde_json::Value;
use tokio::sync::RwLock;

/// Field attribute schema gateway serving a fixed schema.
#[derive(Debug)]
pub struct InMemoryFieldSchemaGateway {
    schema: RwLock<FieldTypeSchema>,
}

impl InMemoryFieldSchemaGateway {
    /// Creates a gateway serving `schema`.
    #[must_use]
    pub fn new(schema: FieldTypeSchema) -> Self {
        Self {
            schema: RwLock::new(schema),
        }
    }

    /// Parses a raw schema document.
    pub fn from_value(raw: Value) -> AppResult<Self> {
        FieldTypeSchema::from_value(raw).map(Self::new)
    }

    /// Replaces the schema served to sessions opened afterwards.
    pub async fn replace(&self, schema: FieldTypeSchema) {
        *self.schema.write().await = schema;
    }
}

#[async_trait]
impl FieldSchemaGateway for InMemoryFieldSchemaGateway {
    async fn fetch_field_schema(&self) -> AppResult<FieldTypeSchema> {
        Ok(self.schema.read().await.clone())
    }
}

#[cfg(test)]
mod tests;
