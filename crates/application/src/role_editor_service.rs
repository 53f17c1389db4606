use std::sync::Arc;

use fieldloom_core::{AppError, AppResult};
use fieldloom_domain::{
    AdvancedOverride, AdvancedOverrides, ComponentKey, ConditionId, CrudBucket, FeatureRef,
    PermissionGrant, PermissionKey, PermissionTree, SelectionState, reconcile_permissions,
};
use tracing::{info, warn};

use crate::role_management_ports::{
    RoleCreateRequest, RoleDraft, RoleReferenceGateway, RoleSubmissionGateway,
};

/// In-memory document of one role edit session.
///
/// The reference tree is fetched once and never mutated; only the selection
/// and advanced overrides change while editing.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleEditSession {
    tree: PermissionTree,
    selection: SelectionState,
    overrides: AdvancedOverrides,
}

impl RoleEditSession {
    /// Starts a session with nothing selected.
    #[must_use]
    pub fn new(tree: PermissionTree) -> Self {
        Self {
            tree,
            selection: SelectionState::new(),
            overrides: AdvancedOverrides::new(),
        }
    }

    /// Starts a session pre-selecting what the server marks active.
    #[must_use]
    pub fn seeded(tree: PermissionTree) -> Self {
        let selection = SelectionState::seeded_from(&tree);
        Self {
            tree,
            selection,
            overrides: AdvancedOverrides::new(),
        }
    }

    /// Returns the reference tree.
    #[must_use]
    pub fn tree(&self) -> &PermissionTree {
        &self.tree
    }

    /// Returns the current selection.
    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Replaces the whole selection.
    pub fn replace_selection(&mut self, selection: SelectionState) {
        self.selection = selection;
    }

    /// Returns the advanced editor snapshots.
    #[must_use]
    pub fn overrides(&self) -> &AdvancedOverrides {
        &self.overrides
    }

    /// Checks or unchecks a permission.
    pub fn toggle_permission(&mut self, key: PermissionKey, selected: bool) {
        self.selection.set_permission(key, selected);
    }

    /// Checks or unchecks a component.
    pub fn toggle_component(&mut self, key: ComponentKey, selected: bool) {
        self.selection.set_component(key, selected);
    }

    /// Replaces the selected conditions of a permission.
    pub fn select_conditions(&mut self, key: PermissionKey, ids: Vec<ConditionId>) {
        self.selection.set_conditions(key, ids);
    }

    /// Toggles a feature's CRUD checkbox.
    pub fn toggle_bucket(
        &mut self,
        feature_ref: &FeatureRef,
        bucket: CrudBucket,
        selected: bool,
    ) -> AppResult<()> {
        let feature = self.tree.feature(feature_ref).ok_or_else(|| {
            AppError::NotFound(format!("feature '{feature_ref}' is not in the permission tree"))
        })?;
        self.selection.set_bucket(feature, bucket, selected);
        Ok(())
    }

    /// Opens the advanced editor of a feature.
    pub fn open_advanced(&mut self, feature_ref: &FeatureRef) -> AppResult<&AdvancedOverride> {
        self.overrides.open(&self.tree, feature_ref)
    }

    /// Stores the advanced editor result of a feature.
    pub fn save_advanced(
        &mut self,
        feature_ref: &FeatureRef,
        formatted_permissions: Vec<PermissionGrant>,
    ) -> AppResult<()> {
        self.overrides
            .save(&self.tree, feature_ref, formatted_permissions)
    }

    /// Clears selection and overrides.
    pub fn reset(&mut self) {
        self.selection = SelectionState::new();
        self.overrides.reset();
    }

    /// Reconciles the session into the `permissions` payload.
    #[must_use]
    pub fn permissions_payload(&self) -> Vec<PermissionGrant> {
        reconcile_permissions(&self.tree, &self.selection, &self.overrides)
    }
}

/// Application service driving the fetch, reconcile and submit cycle of roles.
#[derive(Clone)]
pub struct RoleEditorService {
    reference_gateway: Arc<dyn RoleReferenceGateway>,
    submission_gateway: Arc<dyn RoleSubmissionGateway>,
}

impl RoleEditorService {
    /// Creates a new role editor service.
    #[must_use]
    pub fn new(
        reference_gateway: Arc<dyn RoleReferenceGateway>,
        submission_gateway: Arc<dyn RoleSubmissionGateway>,
    ) -> Self {
        Self {
            reference_gateway,
            submission_gateway,
        }
    }

    /// Fetches the reference tree and starts an empty session.
    pub async fn open_session(&self) -> AppResult<RoleEditSession> {
        let tree = self.reference_gateway.fetch_permission_tree().await?;
        info!(
            module_count = tree.modules().len(),
            permission_count = tree.permissions().count(),
            "permission reference tree loaded"
        );
        Ok(RoleEditSession::new(tree))
    }

    /// Validates the draft and reconciles the session into a create request.
    pub fn build_request(
        &self,
        session: &RoleEditSession,
        draft: &RoleDraft,
    ) -> AppResult<RoleCreateRequest> {
        let permissions = session.permissions_payload();
        let mut messages = Vec::new();

        let name = draft.name.trim();
        if name.is_empty() {
            messages.push("role name is required".to_owned());
        }
        if permissions.is_empty() && !draft.is_super_role {
            messages.push("select at least one permission".to_owned());
        }
        if !messages.is_empty() {
            return Err(AppError::ValidationFailed(messages));
        }

        Ok(RoleCreateRequest {
            name: name.to_owned(),
            description: draft
                .description
                .as_deref()
                .map(str::trim)
                .filter(|description| !description.is_empty())
                .map(str::to_owned),
            is_active: draft.is_active,
            is_default: draft.is_default,
            app_id: draft.app_id.clone(),
            is_super_role: draft.is_super_role,
            permissions,
        })
    }

    /// Submits the role. The session is left untouched so a failed submit can be retried.
    pub async fn submit(
        &self,
        session: &RoleEditSession,
        draft: &RoleDraft,
    ) -> AppResult<RoleCreateRequest> {
        let request = self.build_request(session, draft)?;

        if let Err(error) = self.submission_gateway.create_role(&request).await {
            warn!(role = %request.name, error = %error, "role submission failed");
            return Err(error);
        }

        info!(
            role = %request.name,
            permission_count = request.permissions.len(),
            "role submitted"
        );
        Ok(request)
    }
}
