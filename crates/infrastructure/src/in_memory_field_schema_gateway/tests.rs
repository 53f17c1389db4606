use fieldloom_application::FieldSchemaGateway;
use fieldloom_core::AppError;
use fieldloom_domain::FieldTypeSchema;
use serde_json::json;

use super::InMemoryFieldSchemaGateway;

#[tokio::test]
async fn serves_parsed_schema() {
    let gateway = InMemoryFieldSchemaGateway::from_value(json!({
        "text": {"label_config": {"type": "text", "default": "Text"}},
        "number": {"min_config": {"type": "number", "default": 0}}
    }))
    .unwrap_or_else(|_| unreachable!());

    let schema = gateway
        .fetch_field_schema()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(schema.type_keys().collect::<Vec<_>>(), vec!["number", "text"]);
}

#[tokio::test]
async fn malformed_schema_is_rejected() {
    let result = InMemoryFieldSchemaGateway::from_value(json!(["text", "number"]));
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn replaced_schema_reaches_later_fetches() {
    let gateway = InMemoryFieldSchemaGateway::new(
        FieldTypeSchema::from_value(json!({"text": {}})).unwrap_or_else(|_| unreachable!()),
    );
    let first = gateway
        .fetch_field_schema()
        .await
        .unwrap_or_else(|_| unreachable!());

    gateway
        .replace(
            FieldTypeSchema::from_value(json!({"date": {}})).unwrap_or_else(|_| unreachable!()),
        )
        .await;
    let second = gateway
        .fetch_field_schema()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(first.contains("text"));
    assert!(!second.contains("text"));
    assert!(second.contains("date"));
}
