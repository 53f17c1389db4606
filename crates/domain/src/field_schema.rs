use std::collections::BTreeMap;
use std::str::FromStr;

use fieldloom_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix marking a schema entry as an attribute configuration.
pub const CONFIG_SUFFIX: &str = "_config";

/// Resolved attribute values of one field, keyed by attribute key.
pub type AttributeMap = BTreeMap<String, Value>;

/// Value shape declared by an attribute configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Free text.
    Text,
    /// Numeric value.
    Number,
    /// Boolean toggle.
    Boolean,
    /// One value out of a list of options.
    Select,
    /// Any number of values out of a list of options.
    #[serde(alias = "multi-select", alias = "multiselect")]
    MultiSelect,
    /// Ordered list of free values.
    Array,
}

impl AttributeKind {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Array => "array",
        }
    }

    /// Returns whether a value has the shape this kind declares.
    ///
    /// `null` counts as "not set" for scalar kinds.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string() || value.is_null(),
            Self::Number => value.is_number() || value.is_null(),
            Self::Boolean => value.is_boolean() || value.is_null(),
            Self::Select => !value.is_array() && !value.is_object(),
            Self::MultiSelect | Self::Array => value.is_array(),
        }
    }
}

impl FromStr for AttributeKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "select" => Ok(Self::Select),
            "multi_select" | "multi-select" | "multiselect" => Ok(Self::MultiSelect),
            "array" => Ok(Self::Array),
            _ => Err(AppError::Validation(format!(
                "unknown attribute kind '{value}'"
            ))),
        }
    }
}

/// Validity condition making an attribute applicable only when another attribute
/// holds a given value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCondition {
    /// Attribute key the condition reads.
    pub attribute: String,
    /// Value the referenced attribute must equal.
    pub equals: Value,
}

impl AttributeCondition {
    /// Returns whether the condition holds for the given attributes.
    #[must_use]
    pub fn holds(&self, attributes: &AttributeMap) -> bool {
        attributes.get(self.attribute.as_str()) == Some(&self.equals)
    }
}

/// Server-declared configuration of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfig {
    /// Declared value shape.
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    /// Declared default value.
    #[serde(default)]
    pub default: Value,
    /// Whether a value must be present before the form can be saved.
    #[serde(default)]
    pub required: bool,
    /// Allowed values for select kinds. Empty means unrestricted.
    #[serde(default)]
    pub options: Vec<Value>,
    /// Optional applicability condition.
    #[serde(default)]
    pub condition: Option<AttributeCondition>,
}

impl AttributeConfig {
    /// Returns the value a new record starts with for this attribute.
    ///
    /// Multi-select configurations always start empty: schemas do not reliably
    /// declare a usable default for them.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        match self.kind {
            AttributeKind::MultiSelect => Value::Array(Vec::new()),
            _ => self.default.clone(),
        }
    }

    /// Returns whether the attribute applies given the other attribute values.
    #[must_use]
    pub fn is_applicable(&self, attributes: &AttributeMap) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.holds(attributes))
    }

    /// Checks a value against the declared kind and options.
    pub fn check_value(&self, attribute_key: &str, value: &Value) -> Result<(), String> {
        if !self.kind.accepts(value) {
            return Err(format!(
                "attribute '{attribute_key}' expects a {} value",
                self.kind.as_str()
            ));
        }

        if self.options.is_empty() {
            return Ok(());
        }

        let allowed = |candidate: &Value| option_matches(&self.options, candidate);
        let valid = match self.kind {
            AttributeKind::Select => is_blank(value) || allowed(value),
            AttributeKind::MultiSelect => value
                .as_array()
                .is_some_and(|items| items.iter().all(allowed)),
            _ => true,
        };

        if !valid {
            return Err(format!(
                "attribute '{attribute_key}' has a value outside its options"
            ));
        }

        Ok(())
    }
}

/// Returns whether a value equals an option or an option's `value` member.
#[must_use]
pub fn option_matches(options: &[Value], candidate: &Value) -> bool {
    options
        .iter()
        .any(|option| option == candidate || option.get("value") == Some(candidate))
}

/// Returns whether a value counts as "nothing entered".
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Attribute configurations declared for one field type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSchema {
    configs: BTreeMap<String, AttributeConfig>,
}

impl AttributeSchema {
    /// Builds the schema from raw entries, keeping only `*_config` entries.
    pub fn from_entries(
        type_key: &str,
        entries: BTreeMap<String, Value>,
    ) -> AppResult<Self> {
        let mut configs = BTreeMap::new();
        for (entry_key, raw) in entries {
            let Some(attribute_key) = entry_key.strip_suffix(CONFIG_SUFFIX) else {
                continue;
            };
            if attribute_key.is_empty() {
                continue;
            }

            let config: AttributeConfig = serde_json::from_value(raw).map_err(|error| {
                AppError::Validation(format!(
                    "attribute configuration '{entry_key}' of field type '{type_key}' is invalid: {error}"
                ))
            })?;
            configs.insert(attribute_key.to_owned(), config);
        }

        Ok(Self { configs })
    }

    /// Returns the configuration for an attribute key.
    #[must_use]
    pub fn get(&self, attribute_key: &str) -> Option<&AttributeConfig> {
        self.configs.get(attribute_key)
    }

    /// Iterates configurations in attribute-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeConfig)> {
        self.configs
            .iter()
            .map(|(key, config)| (key.as_str(), config))
    }

    /// Returns the number of recognised configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns whether no configuration was recognised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Server-declared catalog of field types and their attribute configurations.
///
/// Fetched once per session and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, BTreeMap<String, Value>>")]
pub struct FieldTypeSchema {
    types: BTreeMap<String, AttributeSchema>,
}

impl FieldTypeSchema {
    /// Parses the schema from the raw JSON document.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_value(value)
            .map_err(|error| {
                AppError::Validation(format!("field attribute schema is malformed: {error}"))
            })?;
        Self::try_from(raw)
    }

    /// Returns the attribute schema of a field type.
    pub fn attributes_for(&self, type_key: &str) -> AppResult<&AttributeSchema> {
        self.types.get(type_key).ok_or_else(|| {
            AppError::SchemaLookup(format!(
                "field type '{type_key}' is not declared in the attribute schema"
            ))
        })
    }

    /// Returns whether the field type is declared.
    #[must_use]
    pub fn contains(&self, type_key: &str) -> bool {
        self.types.contains_key(type_key)
    }

    /// Returns the declared field type keys, i.e. the palette.
    pub fn type_keys(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl TryFrom<BTreeMap<String, BTreeMap<String, Value>>> for FieldTypeSchema {
    type Error = AppError;

    fn try_from(raw: BTreeMap<String, BTreeMap<String, Value>>) -> Result<Self, Self::Error> {
        let mut types = BTreeMap::new();
        for (type_key, entries) in raw {
            let schema = AttributeSchema::from_entries(type_key.as_str(), entries)?;
            types.insert(type_key, schema);
        }

        Ok(Self { types })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AttributeKind, FieldTypeSchema, is_blank};

    #[test]
    fn only_config_suffixed_entries_are_recognised() {
        let schema = FieldTypeSchema::from_value(json!({
            "text": {
                "label_config": {"type": "text", "default": "Text"},
                "placeholder_config": {"type": "text"},
                "description": "free text input"
            }
        }))
        .unwrap_or_else(|_| unreachable!());

        let attributes = schema
            .attributes_for("text")
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(attributes.len(), 2);
        assert!(attributes.get("label").is_some());
        assert!(attributes.get("description").is_none());
    }

    #[test]
    fn unknown_type_is_a_schema_lookup_error() {
        let schema = FieldTypeSchema::default();
        let result = schema.attributes_for("signature");
        assert!(matches!(
            result,
            Err(fieldloom_core::AppError::SchemaLookup(_))
        ));
    }

    #[test]
    fn malformed_configuration_is_rejected() {
        let result = FieldTypeSchema::from_value(json!({
            "text": {"label_config": {"type": "colour"}}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn multi_select_kind_accepts_hyphenated_alias() {
        let kind: AttributeKind =
            serde_json::from_value(json!("multi-select")).unwrap_or_else(|_| unreachable!());
        assert_eq!(kind, AttributeKind::MultiSelect);
    }

    #[test]
    fn select_options_are_enforced() {
        let schema = FieldTypeSchema::from_value(json!({
            "select": {
                "width_config": {"type": "select", "default": "full", "options": ["full", "half"]}
            }
        }))
        .unwrap_or_else(|_| unreachable!());
        let config = schema
            .attributes_for("select")
            .ok()
            .and_then(|attributes| attributes.get("width"))
            .cloned()
            .unwrap_or_else(|| unreachable!());

        assert!(config.check_value("width", &json!("half")).is_ok());
        assert!(config.check_value("width", &json!("quarter")).is_err());
        assert!(config.check_value("width", &json!(3)).is_err());
    }

    #[test]
    fn blank_values_cover_scalar_and_collection_emptiness() {
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&json!(null)));
        assert!(!is_blank(&json!(false)));
        assert!(!is_blank(&json!(0)));
    }
}
