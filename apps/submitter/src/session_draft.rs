use std::collections::BTreeMap;

use fieldloom_application::{RoleDraft, RoleEditSession, StepFormSession};
use fieldloom_core::AppResult;
use fieldloom_domain::{
    AttributeMap, ComponentKey, ConditionId, CrudBucket, FeatureRef, PermissionGrant,
    PermissionKey, SelectionState,
};
use serde::Deserialize;
use serde_json::Value;

/// Recorded role edit session, replayed against a freshly fetched tree.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleSessionDraft {
    pub role: RoleDraft,
    /// Starts from the permissions the server marks active.
    #[serde(default)]
    pub seed_from_active: bool,
    #[serde(default)]
    pub permissions: BTreeMap<PermissionKey, bool>,
    #[serde(default)]
    pub components: BTreeMap<ComponentKey, bool>,
    #[serde(default)]
    pub conditions: BTreeMap<PermissionKey, Vec<ConditionId>>,
    #[serde(default)]
    pub buckets: Vec<BucketToggle>,
    #[serde(default)]
    pub overrides: Vec<OverrideDraft>,
}

/// One CRUD checkbox click.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketToggle {
    pub feature: FeatureRef,
    pub bucket: CrudBucket,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

/// Result of one advanced editor save.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideDraft {
    pub feature: FeatureRef,
    #[serde(default)]
    pub formatted_permissions: Vec<PermissionGrant>,
}

fn default_selected() -> bool {
    true
}

impl RoleSessionDraft {
    /// Replays the recorded clicks in the order the editor offers them.
    pub fn apply(&self, session: &mut RoleEditSession) -> AppResult<()> {
        session.reset();
        if self.seed_from_active {
            let seeded = SelectionState::seeded_from(session.tree());
            session.replace_selection(seeded);
        }

        for toggle in &self.buckets {
            session.toggle_bucket(&toggle.feature, toggle.bucket, toggle.selected)?;
        }
        for (key, selected) in &self.permissions {
            session.toggle_permission(key.clone(), *selected);
        }
        for (key, selected) in &self.components {
            session.toggle_component(key.clone(), *selected);
        }
        for (key, ids) in &self.conditions {
            session.select_conditions(key.clone(), ids.clone());
        }
        for override_draft in &self.overrides {
            session.open_advanced(&override_draft.feature)?;
            session.save_advanced(
                &override_draft.feature,
                override_draft.formatted_permissions.clone(),
            )?;
        }

        Ok(())
    }
}

/// Recorded step form edit session.
#[derive(Debug, Clone, Deserialize)]
pub struct StepFormSessionDraft {
    pub step_id: String,
    /// Fields appended after the persisted ones, in order.
    #[serde(default)]
    pub fields: Vec<FieldDraft>,
}

/// One field dropped from the palette and edited.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDraft {
    pub field_type: String,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default)]
    pub value: Option<Value>,
}

impl StepFormSessionDraft {
    /// Places and edits every recorded field.
    pub fn apply(&self, session: &mut StepFormSession) -> AppResult<()> {
        for field in &self.fields {
            let id = session.add_field(field.field_type.as_str(), None)?;
            for (attribute_key, value) in &field.attributes {
                session.update_attribute(id, attribute_key, value.clone())?;
            }
            if let Some(value) = &field.value {
                session.set_value(id, value.clone())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fieldloom_application::{RoleEditSession, StepFormSession};
    use fieldloom_core::{AppError, NonEmptyString};
    use fieldloom_domain::{FieldTypeSchema, PermissionTree, RecordStore, RoleReference};
    use serde_json::json;

    use super::{RoleSessionDraft, StepFormSessionDraft};

    fn tree() -> PermissionTree {
        let roles: Vec<RoleReference> = serde_json::from_value(json!([{"modules": [{
            "module_key": "sales",
            "features": [{
                "feature_key": "orders",
                "permissions": [
                    {"permission_key": "view_orders", "permission": 1, "is_active": true},
                    {"permission_key": "edit_orders", "permission": 2},
                    {"permission_key": "export_report", "permission": 3,
                     "components": [{"component_key": "chart"}, {"component_key": "table"}]}
                ]
            }]
        }]}]))
        .unwrap_or_else(|_| unreachable!());
        PermissionTree::from_roles(roles)
    }

    #[test]
    fn role_draft_replays_selection() {
        let draft: RoleSessionDraft = serde_json::from_value(json!({
            "role": {"name": "Order clerks"},
            "buckets": [{"feature": "sales.orders", "bucket": "update"}],
            "permissions": {"export_report": true},
            "components": {"chart": true}
        }))
        .unwrap_or_else(|_| unreachable!());

        let mut session = RoleEditSession::new(tree());
        assert!(draft.apply(&mut session).is_ok());

        let payload = serde_json::to_value(session.permissions_payload())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            payload,
            json!([
                {"permission_key": "edit_orders", "is_active": true},
                {"permission_key": "export_report", "is_active": true,
                 "components": [{"component_key": "chart", "is_active": true}]}
            ])
        );
    }

    #[test]
    fn seed_from_active_selects_active_permissions_of_fresh_session() {
        let draft: RoleSessionDraft = serde_json::from_value(json!({
            "role": {"name": "Viewers"},
            "seed_from_active": true
        }))
        .unwrap_or_else(|_| unreachable!());

        let mut session = RoleEditSession::new(tree());
        assert!(session.permissions_payload().is_empty());
        assert!(draft.apply(&mut session).is_ok());

        let payload = serde_json::to_value(session.permissions_payload())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            payload,
            json!([{"permission_key": "view_orders", "is_active": true}])
        );
    }

    #[test]
    fn unseeded_draft_ignores_prior_selection() {
        let draft: RoleSessionDraft = serde_json::from_value(json!({
            "role": {"name": "Editors"},
            "permissions": {"edit_orders": true}
        }))
        .unwrap_or_else(|_| unreachable!());

        let mut session = RoleEditSession::seeded(tree());
        assert!(draft.apply(&mut session).is_ok());

        let payload = serde_json::to_value(session.permissions_payload())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            payload,
            json!([{"permission_key": "edit_orders", "is_active": true}])
        );
    }

    #[test]
    fn unknown_bucket_feature_fails_replay() {
        let draft: RoleSessionDraft = serde_json::from_value(json!({
            "role": {"name": "Ghosts"},
            "buckets": [{"feature": "sales.invoices", "bucket": "read"}]
        }))
        .unwrap_or_else(|_| unreachable!());

        let mut session = RoleEditSession::new(tree());
        assert!(matches!(
            draft.apply(&mut session),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn step_form_draft_places_and_edits_fields() {
        let schema = FieldTypeSchema::from_value(json!({
            "email": {"label_config": {"type": "text", "default": "Email"}},
            "checkbox_group": {"options_config": {"type": "array", "default": ["a", "b"]}}
        }))
        .unwrap_or_else(|_| unreachable!());
        let mut session = StepFormSession::new(
            NonEmptyString::new("step-3").unwrap_or_else(|_| unreachable!()),
            schema,
            RecordStore::new(),
        );
        let draft: StepFormSessionDraft = serde_json::from_value(json!({
            "step_id": "step-3",
            "fields": [
                {"field_type": "email", "attributes": {"label": "Customer Email!"}},
                {"field_type": "checkbox_group", "value": ["a"]}
            ]
        }))
        .unwrap_or_else(|_| unreachable!());

        assert!(draft.apply(&mut session).is_ok());
        let fields = session.store().to_form_fields();
        assert_eq!(fields[0].field_name, "customer_email");
        assert_eq!(fields[1].field_value, json!(["a"]));
        assert_eq!(fields[1].display_order, 2);
    }
}
