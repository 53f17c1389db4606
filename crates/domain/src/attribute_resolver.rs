use fieldloom_core::AppResult;
use serde_json::Value;

use crate::field_schema::{AttributeMap, FieldTypeSchema, is_blank};
use crate::field_type::FieldType;

/// Attribute holding the human label a field name is derived from.
pub const LABEL_ATTRIBUTE: &str = "label";

/// Attribute marking a field as mandatory at submit time.
pub const REQUIRED_ATTRIBUTE: &str = "required";

/// Resolves the attribute set of a new field of `type_key`.
///
/// Fails with `AppError::SchemaLookup` when the type is missing from the schema,
/// e.g. when the palette came from a stale cache.
pub fn defaults_for(type_key: &str, schema: &FieldTypeSchema) -> AppResult<AttributeMap> {
    let attribute_schema = schema.attributes_for(type_key)?;
    Ok(FieldType::from_key(type_key)
        .capability()
        .default_attributes(attribute_schema))
}

/// Returns the value a new field of `field_type` starts with.
#[must_use]
pub fn initial_value_for(field_type: &FieldType, attributes: &AttributeMap) -> Value {
    field_type.capability().initial_value(attributes)
}

/// Returns the label a new field is seeded with when the schema declares none.
///
/// `multi_select` becomes `Multi Select`.
#[must_use]
pub fn default_label_for(type_key: &str) -> String {
    type_key
        .split(|character: char| character == '_' || character == '-' || character.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut characters = word.chars();
            characters.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(characters).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Checks applicable attribute values against their configurations.
///
/// Returns one message per violation; an empty list means the attributes are valid.
pub fn validate_attributes(
    type_key: &str,
    attributes: &AttributeMap,
    schema: &FieldTypeSchema,
) -> AppResult<Vec<String>> {
    let attribute_schema = schema.attributes_for(type_key)?;
    let mut messages = Vec::new();

    for (attribute_key, config) in attribute_schema.iter() {
        if !config.is_applicable(attributes) {
            continue;
        }

        match attributes.get(attribute_key) {
            Some(value) if config.required && is_blank(value) => {
                messages.push(format!("attribute '{attribute_key}' is required"));
            }
            Some(value) => {
                if let Err(message) = config.check_value(attribute_key, value) {
                    messages.push(message);
                }
            }
            None if config.required => {
                messages.push(format!("attribute '{attribute_key}' is required"));
            }
            None => {}
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{default_label_for, defaults_for, initial_value_for, validate_attributes};
    use crate::field_schema::FieldTypeSchema;
    use crate::field_type::FieldType;

    fn schema() -> FieldTypeSchema {
        FieldTypeSchema::from_value(json!({
            "multi_select": {
                "label_config": {"type": "text", "default": "Pick several", "required": true},
                "options_config": {"type": "array", "default": ["a", "b"]},
                "default_value_config": {"type": "multi_select", "default": ["a"]}
            },
            "text": {
                "label_config": {"type": "text", "default": ""},
                "max_length_config": {"type": "number", "default": 120},
                "mask_config": {
                    "type": "select",
                    "default": null,
                    "options": ["phone", "postcode"],
                    "condition": {"attribute": "masked", "equals": true}
                },
                "masked_config": {"type": "boolean", "default": false}
            }
        }))
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn defaults_copy_declared_values() {
        let attributes = defaults_for("text", &schema()).unwrap_or_else(|_| unreachable!());
        assert_eq!(attributes.get("max_length"), Some(&json!(120)));
        assert_eq!(attributes.get("masked"), Some(&json!(false)));
    }

    #[test]
    fn multi_select_defaults_override_declared_literal() {
        let attributes =
            defaults_for("multi_select", &schema()).unwrap_or_else(|_| unreachable!());
        assert_eq!(attributes.get("default_value"), Some(&json!([])));
        assert_eq!(attributes.get("options"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn missing_type_fails_lookup() {
        let result = defaults_for("signature", &schema());
        assert!(matches!(
            result,
            Err(fieldloom_core::AppError::SchemaLookup(_))
        ));
    }

    #[test]
    fn initial_value_uses_empty_list_for_multi_select() {
        let attributes =
            defaults_for("multi_select", &schema()).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            initial_value_for(&FieldType::MultiSelect, &attributes),
            json!([])
        );
        let attributes = defaults_for("text", &schema()).unwrap_or_else(|_| unreachable!());
        assert_eq!(initial_value_for(&FieldType::Text, &attributes), json!(""));
    }

    #[test]
    fn default_labels_are_title_cased() {
        assert_eq!(default_label_for("multi_select"), "Multi Select");
        assert_eq!(default_label_for("checkbox-group"), "Checkbox Group");
        assert_eq!(default_label_for("text"), "Text");
    }

    #[test]
    fn conditional_attributes_are_only_checked_when_applicable() {
        let mut attributes = defaults_for("text", &schema()).unwrap_or_else(|_| unreachable!());
        attributes.insert("mask".to_owned(), json!("iban"));

        let messages =
            validate_attributes("text", &attributes, &schema()).unwrap_or_else(|_| unreachable!());
        assert!(messages.is_empty());

        attributes.insert("masked".to_owned(), json!(true));
        let messages =
            validate_attributes("text", &attributes, &schema()).unwrap_or_else(|_| unreachable!());
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn required_attributes_must_be_filled() {
        let mut attributes =
            defaults_for("multi_select", &schema()).unwrap_or_else(|_| unreachable!());
        attributes.insert("label".to_owned(), json!("  "));

        let messages = validate_attributes("multi_select", &attributes, &schema())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(messages, vec!["attribute 'label' is required".to_owned()]);
    }
}
