//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod api_client;
mod http_role_management_gateway;
mod http_step_form_gateway;
mod in_memory_field_schema_gateway;

pub use api_client::ApiClient;
pub use http_role_management_gateway::HttpRoleManagementGateway;
pub use http_step_form_gateway::{HttpFieldSchemaGateway, HttpStepFormGateway};
pub use in_memory_field_schema_gateway::InMemoryFieldSchemaGateway;
