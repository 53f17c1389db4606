//! Application services and ports.

#![forbid(unsafe_code)]

mod role_editor_service;
mod role_management_ports;
mod step_form_editor_service;
mod step_form_ports;

pub use role_editor_service::{RoleEditSession, RoleEditorService};
pub use role_management_ports::{
    RoleCreateRequest, RoleDraft, RoleReferenceGateway, RoleSubmissionGateway,
};
pub use step_form_editor_service::{StepFormEditorService, StepFormSession};
pub use step_form_ports::{FieldSchemaGateway, StepFormGateway};
