use fieldloom_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::permission_reconciler::PermissionGrant;
use crate::permission_tree::{FeatureRef, PermissionTree};

/// Snapshot of one feature's advanced editor (components, special actions, conditions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedOverride {
    feature: FeatureRef,
    #[serde(default)]
    formatted_permissions: Vec<PermissionGrant>,
}

impl AdvancedOverride {
    /// Returns the feature this snapshot belongs to.
    #[must_use]
    pub fn feature(&self) -> &FeatureRef {
        &self.feature
    }

    /// Returns the grants produced by the advanced editor.
    #[must_use]
    pub fn formatted_permissions(&self) -> &[PermissionGrant] {
        &self.formatted_permissions
    }
}

/// Advanced editor snapshots of one edit session, in the order they were opened.
///
/// A snapshot lives until [`AdvancedOverrides::reset`], surviving repeated opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedOverrides {
    overrides: Vec<AdvancedOverride>,
}

impl AdvancedOverrides {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the advanced editor of a feature, creating its snapshot on first open.
    pub fn open(
        &mut self,
        tree: &PermissionTree,
        feature_ref: &FeatureRef,
    ) -> AppResult<&AdvancedOverride> {
        if let Some(index) = self.position(feature_ref) {
            return Ok(&self.overrides[index]);
        }

        let feature = tree.feature(feature_ref).ok_or_else(|| {
            AppError::NotFound(format!("feature '{feature_ref}' is not in the permission tree"))
        })?;
        if !feature.supports_advanced_editing() {
            return Err(AppError::Validation(format!(
                "feature '{feature_ref}' has no components or special actions to edit"
            )));
        }

        self.overrides.push(AdvancedOverride {
            feature: feature_ref.clone(),
            formatted_permissions: Vec::new(),
        });
        Ok(&self.overrides[self.overrides.len() - 1])
    }

    /// Replaces the snapshot of an opened feature.
    ///
    /// Every grant must name a permission of that feature, and every component
    /// it enables must belong to that permission.
    pub fn save(
        &mut self,
        tree: &PermissionTree,
        feature_ref: &FeatureRef,
        formatted_permissions: Vec<PermissionGrant>,
    ) -> AppResult<()> {
        let index = self.position(feature_ref).ok_or_else(|| {
            AppError::NotFound(format!(
                "advanced editor for feature '{feature_ref}' was never opened"
            ))
        })?;
        let feature = tree.feature(feature_ref).ok_or_else(|| {
            AppError::NotFound(format!("feature '{feature_ref}' is not in the permission tree"))
        })?;

        for grant in &formatted_permissions {
            let permission = feature.permission(&grant.permission_key).ok_or_else(|| {
                AppError::Validation(format!(
                    "permission '{}' does not belong to feature '{feature_ref}'",
                    grant.permission_key
                ))
            })?;

            if let Some(foreign) = grant.components.iter().flatten().find(|component| {
                !permission
                    .components
                    .iter()
                    .any(|known| known.component_key == component.component_key)
            }) {
                return Err(AppError::Validation(format!(
                    "component '{}' does not belong to permission '{}'",
                    foreign.component_key.as_str(), grant.permission_key
                )));
            }
        }

        self.overrides[index].formatted_permissions = formatted_permissions;
        Ok(())
    }

    /// Returns the snapshot of a feature.
    #[must_use]
    pub fn get(&self, feature_ref: &FeatureRef) -> Option<&AdvancedOverride> {
        self.position(feature_ref).map(|index| &self.overrides[index])
    }

    /// Iterates snapshots in opening order.
    pub fn iter(&self) -> impl Iterator<Item = &AdvancedOverride> {
        self.overrides.iter()
    }

    /// Returns whether no snapshot exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Drops every snapshot.
    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    fn position(&self, feature_ref: &FeatureRef) -> Option<usize> {
        self.overrides
            .iter()
            .position(|existing| &existing.feature == feature_ref)
    }
}
