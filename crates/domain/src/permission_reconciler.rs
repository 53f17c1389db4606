use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::advanced_override::AdvancedOverrides;
use crate::permission_tree::{ComponentKey, PermissionKey, PermissionNode, PermissionTree};
use crate::selection::SelectionState;

/// Enabled component inside a permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentGrant {
    /// Component key.
    pub component_key: ComponentKey,
    /// Always `true` for emitted components.
    pub is_active: bool,
}

/// Attribute filter attached to a permission grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGrant {
    /// Attribute the condition filters on.
    pub condition_key: String,
    /// Allowed values. Empty means unrestricted.
    #[serde(default)]
    pub value: Vec<Value>,
}

/// One entry of the role payload's `permissions` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Granted permission.
    pub permission_key: PermissionKey,
    /// Grant state.
    pub is_active: bool,
    /// Enabled components, when the permission is component-gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentGrant>>,
    /// Attached conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ConditionGrant>>,
}

impl PermissionGrant {
    /// Creates a bare active grant.
    #[must_use]
    pub fn active(permission_key: PermissionKey) -> Self {
        Self {
            permission_key,
            is_active: true,
            components: None,
            conditions: None,
        }
    }

    /// Folds another grant for the same permission into this one.
    ///
    /// Components are unioned by key; conditions are appended unless an equal
    /// entry is already present, so absorbing the same grant twice is a no-op.
    pub fn absorb(&mut self, other: &PermissionGrant) {
        if let Some(incoming) = &other.components {
            let components = self.components.get_or_insert_with(Vec::new);
            for component in incoming {
                if !components
                    .iter()
                    .any(|existing| existing.component_key == component.component_key)
                {
                    components.push(component.clone());
                }
            }
        }

        if let Some(incoming) = &other.conditions {
            let conditions = self.conditions.get_or_insert_with(Vec::new);
            for condition in incoming {
                if !conditions.contains(condition) {
                    conditions.push(condition.clone());
                }
            }
        }
    }
}

/// Converts the reference tree plus edit state into the role payload.
///
/// Order: tree traversal entries, then override-only entries, then bare entries
/// for checked permissions not represented yet. A checked permission appears
/// exactly once unless it is component-gated with no component enabled, even
/// when an override names it.
#[must_use]
pub fn reconcile_permissions(
    tree: &PermissionTree,
    selection: &SelectionState,
    overrides: &AdvancedOverrides,
) -> Vec<PermissionGrant> {
    let mut payload: Vec<PermissionGrant> = Vec::new();
    let mut gated_out: BTreeSet<PermissionKey> = BTreeSet::new();

    for permission in tree.permissions() {
        if !selection.is_permission_selected(&permission.permission_key) {
            continue;
        }

        match grant_for(permission, selection) {
            Some(grant) => merge_grant(&mut payload, grant),
            None => {
                gated_out.insert(permission.permission_key.clone());
            }
        }
    }

    for advanced in overrides.iter() {
        merge_override(&mut payload, advanced.formatted_permissions(), selection);
    }
    payload.retain(|grant| passes_component_gate(tree, grant));

    for key in selection.selected_permission_keys() {
        if gated_out.contains(key) || contains_key(&payload, key) {
            continue;
        }
        payload.push(PermissionGrant::active(key.clone()));
    }

    payload
}

/// Merges an advanced editor snapshot into the payload.
///
/// Entries for permissions that are not checked are ignored.
pub fn merge_override(
    payload: &mut Vec<PermissionGrant>,
    formatted_permissions: &[PermissionGrant],
    selection: &SelectionState,
) {
    for grant in formatted_permissions {
        if !selection.is_permission_selected(&grant.permission_key) {
            continue;
        }
        merge_grant(payload, grant.clone());
    }
}

fn grant_for(permission: &PermissionNode, selection: &SelectionState) -> Option<PermissionGrant> {
    let mut grant = PermissionGrant::active(permission.permission_key.clone());

    if !permission.components.is_empty() {
        let components: Vec<ComponentGrant> = permission
            .components
            .iter()
            .filter(|component| selection.is_component_selected(&component.component_key))
            .map(|component| ComponentGrant {
                component_key: component.component_key.clone(),
                is_active: true,
            })
            .collect();

        if components.is_empty() {
            return None;
        }
        grant.components = Some(components);
    }

    let conditions: Vec<ConditionGrant> = selection
        .conditions_for(&permission.permission_key)
        .iter()
        .filter_map(|id| permission.condition(*id))
        .map(|condition| ConditionGrant {
            condition_key: condition.condition_key.clone(),
            value: condition.value.clone(),
        })
        .collect();
    if !conditions.is_empty() {
        grant.conditions = Some(conditions);
    }

    Some(grant)
}

fn passes_component_gate(tree: &PermissionTree, grant: &PermissionGrant) -> bool {
    tree.permission(&grant.permission_key)
        .is_none_or(|permission| {
            permission.components.is_empty()
                || grant
                    .components
                    .as_ref()
                    .is_some_and(|components| !components.is_empty())
        })
}

fn merge_grant(payload: &mut Vec<PermissionGrant>, grant: PermissionGrant) {
    match payload
        .iter_mut()
        .find(|existing| existing.permission_key == grant.permission_key)
    {
        Some(existing) => existing.absorb(&grant),
        None => payload.push(grant),
    }
}

fn contains_key(payload: &[PermissionGrant], key: &PermissionKey) -> bool {
    payload.iter().any(|grant| &grant.permission_key == key)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ComponentGrant, ConditionGrant, PermissionGrant, merge_override, reconcile_permissions,
    };
    use crate::advanced_override::AdvancedOverrides;
    use crate::permission_tree::{
        ComponentKey, ConditionId, FeatureRef, PermissionKey, PermissionTree, RoleReference,
    };
    use crate::selection::SelectionState;

    fn tree() -> PermissionTree {
        let roles: Vec<RoleReference> = serde_json::from_value(json!([{"modules": [{
            "module_key": "sales",
            "features": [{
                "feature_key": "orders",
                "permissions": [
                    {"permission_key": "view_orders", "permission": 1,
                     "conditions": [
                        {"id": 7, "condition_key": "region", "value": ["eu", "us"]},
                        {"id": 8, "condition_key": "owner", "value": []}
                     ]},
                    {"permission_key": "edit_orders", "permission": 2},
                    {"permission_key": "export_report", "permission": 3,
                     "components": [{"component_key": "chart"}, {"component_key": "table"}]}
                ]
            }, {
                "feature_key": "archive",
                "permissions": [{"permission_key": "view_orders", "permission": 1}]
            }]
        }]}]))
        .unwrap_or_else(|_| unreachable!());
        PermissionTree::from_roles(roles)
    }

    fn select(keys: &[&str]) -> SelectionState {
        let mut selection = SelectionState::new();
        for key in keys {
            selection.set_permission(PermissionKey::from(*key), true);
        }
        selection
    }

    fn keys(payload: &[PermissionGrant]) -> Vec<&str> {
        payload
            .iter()
            .map(|grant| grant.permission_key.as_str())
            .collect()
    }

    #[test]
    fn selected_permissions_appear_exactly_once() {
        let mut selection = select(&["view_orders"]);
        selection.set_permission(PermissionKey::from("edit_orders"), false);

        let payload = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        assert_eq!(
            payload,
            vec![PermissionGrant::active(PermissionKey::from("view_orders"))]
        );
        assert_eq!(
            serde_json::to_value(&payload).unwrap_or_else(|_| unreachable!()),
            json!([{"permission_key": "view_orders", "is_active": true}])
        );
    }

    #[test]
    fn component_gated_permission_without_components_is_dropped() {
        let selection = select(&["export_report"]);
        let payload = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        assert!(payload.is_empty());
    }

    #[test]
    fn component_gated_permission_keeps_selected_components() {
        let mut selection = select(&["export_report"]);
        selection.set_component(ComponentKey::from("chart"), true);

        let payload = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        assert_eq!(
            serde_json::to_value(&payload).unwrap_or_else(|_| unreachable!()),
            json!([{
                "permission_key": "export_report",
                "is_active": true,
                "components": [{"component_key": "chart", "is_active": true}]
            }])
        );
    }

    #[test]
    fn selected_condition_ids_resolve_to_reference_conditions() {
        let mut selection = select(&["view_orders"]);
        selection.set_conditions(
            PermissionKey::from("view_orders"),
            vec![ConditionId::new(7), ConditionId::new(99)],
        );

        let payload = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        assert_eq!(payload.len(), 1);
        assert_eq!(
            payload[0].conditions,
            Some(vec![ConditionGrant {
                condition_key: "region".to_owned(),
                value: vec![json!("eu"), json!("us")],
            }])
        );
    }

    #[test]
    fn permissions_outside_the_tree_are_appended_last() {
        let selection = select(&["edit_orders", "legacy_import"]);
        let payload = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        assert_eq!(keys(&payload), vec!["edit_orders", "legacy_import"]);
    }

    #[test]
    fn overrides_merge_into_existing_and_new_entries() {
        let tree = tree();
        let orders = FeatureRef::new("sales", "orders").unwrap_or_else(|_| unreachable!());
        let mut overrides = AdvancedOverrides::new();
        assert!(overrides.open(&tree, &orders).is_ok());
        assert!(
            overrides
                .save(
                    &tree,
                    &orders,
                    vec![
                        PermissionGrant {
                            permission_key: PermissionKey::from("export_report"),
                            is_active: true,
                            components: Some(vec![ComponentGrant {
                                component_key: ComponentKey::from("table"),
                                is_active: true,
                            }]),
                            conditions: None,
                        },
                        PermissionGrant::active(PermissionKey::from("edit_orders")),
                    ],
                )
                .is_ok()
        );

        let mut selection = select(&["export_report", "view_orders"]);
        selection.set_component(ComponentKey::from("chart"), true);

        let payload = reconcile_permissions(&tree, &selection, &overrides);
        assert_eq!(keys(&payload), vec!["view_orders", "export_report"]);
        let components: Vec<&str> = payload[1]
            .components
            .iter()
            .flatten()
            .map(|component| component.component_key.as_str())
            .collect();
        assert_eq!(components, vec!["chart", "table"]);
    }

    #[test]
    fn override_can_enable_components_of_a_gated_permission() {
        let tree = tree();
        let orders = FeatureRef::new("sales", "orders").unwrap_or_else(|_| unreachable!());
        let mut overrides = AdvancedOverrides::new();
        assert!(overrides.open(&tree, &orders).is_ok());
        assert!(
            overrides
                .save(
                    &tree,
                    &orders,
                    vec![PermissionGrant {
                        permission_key: PermissionKey::from("export_report"),
                        is_active: true,
                        components: Some(vec![ComponentGrant {
                            component_key: ComponentKey::from("table"),
                            is_active: true,
                        }]),
                        conditions: None,
                    }],
                )
                .is_ok()
        );

        let selection = select(&["export_report"]);
        let payload = reconcile_permissions(&tree, &selection, &overrides);
        assert_eq!(keys(&payload), vec!["export_report"]);
    }

    #[test]
    fn override_without_components_cannot_bypass_component_gating() {
        let tree = tree();
        let orders = FeatureRef::new("sales", "orders").unwrap_or_else(|_| unreachable!());
        let mut overrides = AdvancedOverrides::new();
        assert!(overrides.open(&tree, &orders).is_ok());
        assert!(
            overrides
                .save(
                    &tree,
                    &orders,
                    vec![
                        PermissionGrant::active(PermissionKey::from("export_report")),
                        PermissionGrant {
                            permission_key: PermissionKey::from("edit_orders"),
                            is_active: true,
                            components: Some(Vec::new()),
                            conditions: None,
                        },
                    ],
                )
                .is_ok()
        );

        let selection = select(&["export_report", "edit_orders"]);
        let payload = reconcile_permissions(&tree, &selection, &overrides);
        assert_eq!(keys(&payload), vec!["edit_orders"]);
    }

    #[test]
    fn merging_the_same_override_twice_is_idempotent() {
        let selection = select(&["view_orders"]);
        let formatted = vec![PermissionGrant {
            permission_key: PermissionKey::from("view_orders"),
            is_active: true,
            components: Some(vec![ComponentGrant {
                component_key: ComponentKey::from("map"),
                is_active: true,
            }]),
            conditions: Some(vec![ConditionGrant {
                condition_key: "region".to_owned(),
                value: vec![json!("eu")],
            }]),
        }];

        let mut once = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        merge_override(&mut once, &formatted, &selection);
        let mut twice = once.clone();
        merge_override(&mut twice, &formatted, &selection);

        assert_eq!(once, twice);
        assert_eq!(once[0].conditions.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn overrides_never_resurrect_unchecked_permissions() {
        let selection = select(&["view_orders"]);
        let mut payload = reconcile_permissions(&tree(), &selection, &AdvancedOverrides::new());
        merge_override(
            &mut payload,
            &[PermissionGrant::active(PermissionKey::from("edit_orders"))],
            &selection,
        );
        assert_eq!(keys(&payload), vec!["view_orders"]);
    }
}
