use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field_schema::{AttributeMap, AttributeSchema, is_blank, option_matches};

/// Attribute holding a field's pre-filled value.
pub const DEFAULT_VALUE_ATTRIBUTE: &str = "default_value";
/// Attribute holding the option list of choice fields.
pub const OPTIONS_ATTRIBUTE: &str = "options";

/// Form field types placed by the step form editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Single-line text.
    Text,
    /// Multi-line text.
    TextArea,
    /// Email address.
    Email,
    /// Numeric input.
    Number,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Single boolean checkbox.
    Checkbox,
    /// Dropdown with one selectable option.
    Select,
    /// Radio group with one selectable option.
    Radio,
    /// Dropdown with many selectable options.
    MultiSelect,
    /// Checkbox list with many selectable options.
    CheckboxGroup,
    /// File attachment reference.
    File,
    /// Server-declared type without client-side semantics.
    Other(String),
}

impl FieldType {
    /// Resolves a type key. Unknown keys map to [`FieldType::Other`].
    #[must_use]
    pub fn from_key(value: &str) -> Self {
        match value {
            "text" => Self::Text,
            "textarea" => Self::TextArea,
            "email" => Self::Email,
            "number" => Self::Number,
            "date" => Self::Date,
            "checkbox" => Self::Checkbox,
            "select" => Self::Select,
            "radio" => Self::Radio,
            "multi_select" => Self::MultiSelect,
            "checkbox_group" => Self::CheckboxGroup,
            "file" => Self::File,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the stable type key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::TextArea => "textarea",
            Self::Email => "email",
            Self::Number => "number",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::MultiSelect => "multi_select",
            Self::CheckboxGroup => "checkbox_group",
            Self::File => "file",
            Self::Other(key) => key.as_str(),
        }
    }

    /// Returns the behaviour attached to this type.
    #[must_use]
    pub fn capability(&self) -> &'static dyn FieldCapability {
        match self {
            Self::Text | Self::TextArea => &TextualField,
            Self::Email => &EmailField,
            Self::Number => &NumberField,
            Self::Date => &DateField,
            Self::Checkbox => &CheckboxField,
            Self::Select | Self::Radio => &SingleChoiceField,
            Self::MultiSelect | Self::CheckboxGroup => &MultiChoiceField,
            Self::File => &FileField,
            Self::Other(_) => &OpaqueField,
        }
    }

    /// Returns whether values of this type are lists.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.capability().is_multi_valued()
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        Self::from_key(value.as_str())
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Other(key) => key,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Per-type behaviour of a form field.
pub trait FieldCapability: Send + Sync {
    /// Returns whether the entered value is a list.
    fn is_multi_valued(&self) -> bool {
        false
    }

    /// Resolves the attribute set of a freshly placed field.
    fn default_attributes(&self, schema: &AttributeSchema) -> AttributeMap {
        schema
            .iter()
            .map(|(key, config)| (key.to_owned(), config.initial_value()))
            .collect()
    }

    /// Returns the value a freshly placed field starts with.
    ///
    /// An empty string and an empty list are distinct "uninitialised" states:
    /// the first is a blank scalar, the second a collection with nothing chosen.
    fn initial_value(&self, attributes: &AttributeMap) -> Value {
        match attributes.get(DEFAULT_VALUE_ATTRIBUTE) {
            Some(value) if !value.is_null() => value.clone(),
            _ if self.is_multi_valued() => Value::Array(Vec::new()),
            _ => Value::String(String::new()),
        }
    }

    /// Validates a non-blank entered value against the field's attributes.
    fn validate(&self, value: &Value, attributes: &AttributeMap) -> Result<(), String>;
}

struct TextualField;
struct EmailField;
struct NumberField;
struct DateField;
struct CheckboxField;
struct SingleChoiceField;
struct MultiChoiceField;
struct FileField;
struct OpaqueField;

fn number_attribute(attributes: &AttributeMap, key: &str) -> Option<f64> {
    attributes.get(key).and_then(Value::as_f64)
}

fn options_of(attributes: &AttributeMap) -> &[Value] {
    attributes
        .get(OPTIONS_ATTRIBUTE)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

impl FieldCapability for TextualField {
    fn validate(&self, value: &Value, attributes: &AttributeMap) -> Result<(), String> {
        let text = value.as_str().ok_or("value must be text")?;
        let length = text.chars().count() as f64;

        if let Some(min_length) = number_attribute(attributes, "min_length")
            && length < min_length
        {
            return Err(format!("value must be at least {min_length} characters"));
        }
        if let Some(max_length) = number_attribute(attributes, "max_length")
            && length > max_length
        {
            return Err(format!("value must be at most {max_length} characters"));
        }

        Ok(())
    }
}

impl FieldCapability for EmailField {
    fn validate(&self, value: &Value, _attributes: &AttributeMap) -> Result<(), String> {
        let text = value.as_str().ok_or("value must be text")?.trim();
        let valid = text.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });

        if !valid {
            return Err(format!("'{text}' is not a valid email address"));
        }

        Ok(())
    }
}

impl FieldCapability for NumberField {
    fn validate(&self, value: &Value, attributes: &AttributeMap) -> Result<(), String> {
        let number = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or("value must be a number")?;

        if let Some(min) = number_attribute(attributes, "min")
            && number < min
        {
            return Err(format!("value must be greater than or equal to {min}"));
        }
        if let Some(max) = number_attribute(attributes, "max")
            && number > max
        {
            return Err(format!("value must be less than or equal to {max}"));
        }

        Ok(())
    }
}

impl FieldCapability for DateField {
    fn validate(&self, value: &Value, _attributes: &AttributeMap) -> Result<(), String> {
        let text = value.as_str().ok_or("value must be a date string")?;
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| format!("'{text}' is not a YYYY-MM-DD date"))
    }
}

impl FieldCapability for CheckboxField {
    fn validate(&self, value: &Value, _attributes: &AttributeMap) -> Result<(), String> {
        if value.is_boolean() {
            Ok(())
        } else {
            Err("value must be true or false".to_owned())
        }
    }
}

impl FieldCapability for SingleChoiceField {
    fn validate(&self, value: &Value, attributes: &AttributeMap) -> Result<(), String> {
        if value.is_array() || value.is_object() {
            return Err("value must be a single option".to_owned());
        }

        let options = options_of(attributes);
        if !options.is_empty() && !option_matches(options, value) {
            return Err(format!("{value} is not one of the field options"));
        }

        Ok(())
    }
}

impl FieldCapability for MultiChoiceField {
    fn is_multi_valued(&self) -> bool {
        true
    }

    fn validate(&self, value: &Value, attributes: &AttributeMap) -> Result<(), String> {
        let items = value.as_array().ok_or("value must be a list of options")?;

        let options = options_of(attributes);
        if options.is_empty() {
            return Ok(());
        }

        match items.iter().find(|item| !option_matches(options, item)) {
            Some(item) => Err(format!("{item} is not one of the field options")),
            None => Ok(()),
        }
    }
}

impl FieldCapability for FileField {
    fn validate(&self, value: &Value, _attributes: &AttributeMap) -> Result<(), String> {
        match value {
            Value::String(_) => Ok(()),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(()),
            _ => Err("value must be a file reference or a list of them".to_owned()),
        }
    }
}

impl FieldCapability for OpaqueField {
    fn validate(&self, _value: &Value, _attributes: &AttributeMap) -> Result<(), String> {
        Ok(())
    }
}

/// Validates an entered value, treating blank values as valid.
pub fn validate_entered_value(
    field_type: &FieldType,
    value: &Value,
    attributes: &AttributeMap,
) -> Result<(), String> {
    if is_blank(value) {
        return Ok(());
    }

    field_type.capability().validate(value, attributes)
}
