use std::str::FromStr;

use fieldloom_core::{AppError, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable string identifier of a permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a permission key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for PermissionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Stable string identifier of a UI component flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
    /// Creates a component key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ComponentKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of an attribute-based access condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(i64);

impl ConditionId {
    /// Creates a condition identifier.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Togglable UI-visibility flag under a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Component key.
    pub component_key: ComponentKey,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Server-side active flag.
    #[serde(default)]
    pub is_active: bool,
}

/// Attribute-based access filter under a permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition identifier.
    pub id: ConditionId,
    /// Attribute the condition filters on.
    pub condition_key: String,
    /// Allowed values. Empty means unrestricted.
    #[serde(default)]
    pub value: Vec<Value>,
}

/// One grantable permission in the reference tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionNode {
    /// Canonical identifier.
    pub permission_key: PermissionKey,
    /// Server-internal numeric id. Kept as data only, never used for lookups.
    #[serde(rename = "permission", default)]
    pub internal_id: Option<i64>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Server-side active flag.
    #[serde(default)]
    pub is_active: bool,
    /// Components gating this permission.
    #[serde(default)]
    pub components: Vec<Component>,
    /// Conditions available for this permission.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl PermissionNode {
    /// Finds a condition by id.
    #[must_use]
    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.iter().find(|condition| condition.id == id)
    }

    fn absorb(&mut self, other: PermissionNode) {
        self.is_active |= other.is_active;
        for component in other.components {
            if !self
                .components
                .iter()
                .any(|existing| existing.component_key == component.component_key)
            {
                self.components.push(component);
            }
        }
        for condition in other.conditions {
            if self.condition(condition.id).is_none() {
                self.conditions.push(condition);
            }
        }
    }
}

/// CRUD checkbox a permission is bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudBucket {
    /// Create access.
    Create,
    /// Read access.
    Read,
    /// Update access.
    Update,
    /// Delete access.
    Delete,
}

impl CrudBucket {
    /// Returns all buckets in checkbox order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Create, Self::Read, Self::Update, Self::Delete]
    }

    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Classifies a permission key by its first CRUD verb token.
    ///
    /// Keys without such a token are special actions.
    #[must_use]
    pub fn classify(permission_key: &PermissionKey) -> Option<Self> {
        permission_key
            .as_str()
            .split(|character: char| !character.is_ascii_alphanumeric())
            .find_map(|token| match token.to_ascii_lowercase().as_str() {
                "create" | "add" | "new" => Some(Self::Create),
                "read" | "view" | "list" | "get" => Some(Self::Read),
                "update" | "edit" | "change" => Some(Self::Update),
                "delete" | "remove" | "destroy" => Some(Self::Delete),
                _ => None,
            })
    }
}

impl FromStr for CrudBucket {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown crud bucket '{value}'"
            ))),
        }
    }
}

/// Feature grouping permissions inside a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature key, unique within its module.
    pub feature_key: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Permissions of this feature.
    #[serde(default)]
    pub permissions: Vec<PermissionNode>,
}

impl Feature {
    /// Returns the permissions in a CRUD bucket.
    pub fn crud_permissions(&self, bucket: CrudBucket) -> impl Iterator<Item = &PermissionNode> {
        self.permissions
            .iter()
            .filter(move |permission| CrudBucket::classify(&permission.permission_key) == Some(bucket))
    }

    /// Returns the permissions outside every CRUD bucket.
    pub fn special_actions(&self) -> impl Iterator<Item = &PermissionNode> {
        self.permissions
            .iter()
            .filter(|permission| CrudBucket::classify(&permission.permission_key).is_none())
    }

    /// Returns whether any permission carries components.
    #[must_use]
    pub fn has_components(&self) -> bool {
        self.permissions
            .iter()
            .any(|permission| !permission.components.is_empty())
    }

    /// Returns whether the advanced editor can be opened for this feature.
    #[must_use]
    pub fn supports_advanced_editing(&self) -> bool {
        self.has_components() || self.special_actions().next().is_some()
    }

    /// Finds a permission by key.
    #[must_use]
    pub fn permission(&self, key: &PermissionKey) -> Option<&PermissionNode> {
        self.permissions
            .iter()
            .find(|permission| &permission.permission_key == key)
    }

    fn absorb(&mut self, other: Feature) {
        for permission in other.permissions {
            match self
                .permissions
                .iter_mut()
                .find(|existing| existing.permission_key == permission.permission_key)
            {
                Some(existing) => existing.absorb(permission),
                None => self.permissions.push(permission),
            }
        }
    }
}

/// Top-level application module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Module key.
    pub module_key: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Features of this module.
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One role of the reference response; only its modules are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleReference {
    /// Modules visible through this role.
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// Address of a feature as `module_key.feature_key`.
///
/// The last dot separates the keys, so module keys may contain dots and
/// feature keys may not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureRef {
    module_key: NonEmptyString,
    feature_key: NonEmptyString,
}

impl FeatureRef {
    /// Creates a feature reference.
    pub fn new(
        module_key: impl Into<String>,
        feature_key: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            module_key: NonEmptyString::new(module_key)?,
            feature_key: NonEmptyString::new(feature_key)?,
        })
    }

    /// Returns the module key.
    #[must_use]
    pub fn module_key(&self) -> &str {
        self.module_key.as_str()
    }

    /// Returns the feature key.
    #[must_use]
    pub fn feature_key(&self) -> &str {
        self.feature_key.as_str()
    }
}

impl FromStr for FeatureRef {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (module_key, feature_key) = value.rsplit_once('.').ok_or_else(|| {
            AppError::Validation(format!(
                "feature reference '{value}' must look like 'module_key.feature_key'"
            ))
        })?;
        Self::new(module_key, feature_key)
    }
}

impl TryFrom<String> for FeatureRef {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeatureRef> for String {
    fn from(value: FeatureRef) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for FeatureRef {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}.{}", self.module_key, self.feature_key)
    }
}

/// Read-only `Module → Feature → Permission` reference tree for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionTree {
    modules: Vec<Module>,
}

impl PermissionTree {
    /// Creates a tree from modules, merging duplicates by key.
    #[must_use]
    pub fn new(modules: Vec<Module>) -> Self {
        let mut tree = Self::default();
        for module in modules {
            tree.absorb(module);
        }
        tree
    }

    /// Merges the modules of every fetched role into one tree.
    #[must_use]
    pub fn from_roles(roles: Vec<RoleReference>) -> Self {
        Self::new(roles.into_iter().flat_map(|role| role.modules).collect())
    }

    /// Returns modules in fetch order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Finds a feature.
    #[must_use]
    pub fn feature(&self, feature_ref: &FeatureRef) -> Option<&Feature> {
        self.modules
            .iter()
            .find(|module| module.module_key == feature_ref.module_key())
            .and_then(|module| {
                module
                    .features
                    .iter()
                    .find(|feature| feature.feature_key == feature_ref.feature_key())
            })
    }

    /// Iterates every permission in traversal order.
    pub fn permissions(&self) -> impl Iterator<Item = &PermissionNode> {
        self.modules
            .iter()
            .flat_map(|module| module.features.iter())
            .flat_map(|feature| feature.permissions.iter())
    }

    /// Finds the first permission with a key.
    #[must_use]
    pub fn permission(&self, key: &PermissionKey) -> Option<&PermissionNode> {
        self.permissions()
            .find(|permission| &permission.permission_key == key)
    }

    fn absorb(&mut self, module: Module) {
        let Some(existing) = self
            .modules
            .iter_mut()
            .find(|existing| existing.module_key == module.module_key)
        else {
            self.modules.push(module);
            return;
        };

        for feature in module.features {
            match existing
                .features
                .iter_mut()
                .find(|candidate| candidate.feature_key == feature.feature_key)
            {
                Some(candidate) => candidate.absorb(feature),
                None => existing.features.push(feature),
            }
        }
    }
}
