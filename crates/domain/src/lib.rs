//! Domain model of the schema-driven record editors.

#![forbid(unsafe_code)]

mod advanced_override;
mod attribute_resolver;
mod field_record;
mod field_schema;
mod field_type;
mod form_fields;
mod permission_reconciler;
mod permission_tree;
mod record_store;
mod selection;

pub use advanced_override::{AdvancedOverride, AdvancedOverrides};
pub use attribute_resolver::{
    LABEL_ATTRIBUTE, REQUIRED_ATTRIBUTE, default_label_for, defaults_for, initial_value_for, validate_attributes,
};
pub use field_record::{FieldId, FieldRecord, derive_field_name};
pub use field_schema::{
    AttributeCondition, AttributeConfig, AttributeKind, AttributeMap, AttributeSchema,
    CONFIG_SUFFIX, FieldTypeSchema, is_blank,
};
pub use field_type::{
    DEFAULT_VALUE_ATTRIBUTE, FieldCapability, FieldType, OPTIONS_ATTRIBUTE, validate_entered_value,
};
pub use form_fields::{FormFieldPayload, flatten_form_fields};
pub use permission_reconciler::{
    ComponentGrant, ConditionGrant, PermissionGrant, merge_override, reconcile_permissions,
};
pub use permission_tree::{
    Component, ComponentKey, Condition, ConditionId, CrudBucket, Feature, FeatureRef, Module,
    PermissionKey, PermissionNode, PermissionTree, RoleReference,
};
pub use record_store::RecordStore;
pub use selection::SelectionState;
