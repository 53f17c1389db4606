use async_trait::async_trait;
use fieldloom_core::AppResult;
use fieldloom_domain::{PermissionGrant, PermissionTree};
use serde::{Deserialize, Serialize};

/// Role attributes entered next to the permission editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    /// Role name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the role is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether new users receive the role by default.
    #[serde(default)]
    pub is_default: bool,
    /// Application the role belongs to.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Whether the role bypasses permission checks.
    #[serde(default)]
    pub is_super_role: bool,
}

fn default_true() -> bool {
    true
}

/// Body of the role-create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleCreateRequest {
    /// Role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Whether the role is active.
    pub is_active: bool,
    /// Whether new users receive the role by default.
    pub is_default: bool,
    /// Application the role belongs to.
    pub app_id: Option<String>,
    /// Whether the role bypasses permission checks.
    pub is_super_role: bool,
    /// Reconciled permission grants.
    pub permissions: Vec<PermissionGrant>,
}

/// Port fetching the permission reference tree.
#[async_trait]
pub trait RoleReferenceGateway: Send + Sync {
    /// Fetches the tree the current user may grant from.
    async fn fetch_permission_tree(&self) -> AppResult<PermissionTree>;
}

/// Port submitting new roles.
#[async_trait]
pub trait RoleSubmissionGateway: Send + Sync {
    /// Creates a role.
    async fn create_role(&self, request: &RoleCreateRequest) -> AppResult<()>;
}
