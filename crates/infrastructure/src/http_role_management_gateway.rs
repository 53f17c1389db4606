use async_trait::async_trait;
use fieldloom_application::{RoleCreateRequest, RoleReferenceGateway, RoleSubmissionGateway};
use fieldloom_core::AppResult;
use fieldloom_domain::{PermissionTree, RoleReference};
use serde::Deserialize;
use tracing::info;

use crate::api_client::ApiClient;

const USER_ROLES_PATH: [&str; 3] = ["role-management", "user", "roles"];
const ROLES_PATH: [&str; 2] = ["role-management", "roles"];

/// Role management adapter over the REST API.
#[derive(Debug, Clone)]
pub struct HttpRoleManagementGateway {
    client: ApiClient,
}

impl HttpRoleManagementGateway {
    /// Creates a gateway using a shared API client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct UserRolesResponse {
    #[serde(default)]
    roles: Vec<RoleReference>,
}

impl UserRolesResponse {
    fn into_tree(self) -> PermissionTree {
        PermissionTree::from_roles(self.roles)
    }
}

#[async_trait]
impl RoleReferenceGateway for HttpRoleManagementGateway {
    async fn fetch_permission_tree(&self) -> AppResult<PermissionTree> {
        let response: UserRolesResponse = self.client.get_json(&USER_ROLES_PATH).await?;
        let role_count = response.roles.len();
        let tree = response.into_tree();

        info!(
            role_count,
            permission_count = tree.permissions().count(),
            "permission reference tree fetched"
        );
        Ok(tree)
    }
}

#[async_trait]
impl RoleSubmissionGateway for HttpRoleManagementGateway {
    async fn create_role(&self, request: &RoleCreateRequest) -> AppResult<()> {
        self.client.post_json(&ROLES_PATH, request).await
    }
}
