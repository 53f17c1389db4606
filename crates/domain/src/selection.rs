use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::permission_tree::{
    ComponentKey, ConditionId, CrudBucket, Feature, PermissionKey, PermissionTree,
};

/// User toggles layered on top of the read-only permission tree.
///
/// Conditions are keyed by [`PermissionKey`] like everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    #[serde(default)]
    selected_permissions: BTreeMap<PermissionKey, bool>,
    #[serde(default)]
    selected_components: BTreeMap<ComponentKey, bool>,
    #[serde(default)]
    selected_conditions: BTreeMap<PermissionKey, Vec<ConditionId>>,
}

impl SelectionState {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-selects every permission and component the server marks active.
    #[must_use]
    pub fn seeded_from(tree: &PermissionTree) -> Self {
        let mut selection = Self::new();
        for permission in tree.permissions() {
            if permission.is_active {
                selection.set_permission(permission.permission_key.clone(), true);
            }
            for component in &permission.components {
                if component.is_active {
                    selection.set_component(component.component_key.clone(), true);
                }
            }
        }
        selection
    }

    /// Checks or unchecks a permission.
    pub fn set_permission(&mut self, key: PermissionKey, selected: bool) {
        self.selected_permissions.insert(key, selected);
    }

    /// Returns whether a permission is checked.
    #[must_use]
    pub fn is_permission_selected(&self, key: &PermissionKey) -> bool {
        self.selected_permissions.get(key).copied().unwrap_or(false)
    }

    /// Checks or unchecks a component.
    pub fn set_component(&mut self, key: ComponentKey, selected: bool) {
        self.selected_components.insert(key, selected);
    }

    /// Returns whether a component is checked.
    #[must_use]
    pub fn is_component_selected(&self, key: &ComponentKey) -> bool {
        self.selected_components.get(key).copied().unwrap_or(false)
    }

    /// Replaces the selected conditions of a permission, dropping repeats.
    pub fn set_conditions(&mut self, key: PermissionKey, ids: Vec<ConditionId>) {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        if unique.is_empty() {
            self.selected_conditions.remove(&key);
        } else {
            self.selected_conditions.insert(key, unique);
        }
    }

    /// Returns the selected conditions of a permission.
    #[must_use]
    pub fn conditions_for(&self, key: &PermissionKey) -> &[ConditionId] {
        self.selected_conditions
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates checked permission keys in key order.
    pub fn selected_permission_keys(&self) -> impl Iterator<Item = &PermissionKey> {
        self.selected_permissions
            .iter()
            .filter_map(|(key, selected)| selected.then_some(key))
    }

    /// Checks or unchecks every permission of a CRUD bucket.
    pub fn set_bucket(&mut self, feature: &Feature, bucket: CrudBucket, selected: bool) {
        for permission in feature.crud_permissions(bucket) {
            self.set_permission(permission.permission_key.clone(), selected);
        }
    }

    /// Returns whether a CRUD checkbox renders checked: non-empty and fully selected.
    #[must_use]
    pub fn is_bucket_selected(&self, feature: &Feature, bucket: CrudBucket) -> bool {
        let mut permissions = feature.crud_permissions(bucket).peekable();
        permissions.peek().is_some()
            && permissions.all(|permission| self.is_permission_selected(&permission.permission_key))
    }
}
