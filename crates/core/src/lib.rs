//! Shared primitives for all Rust crates in Fieldloom.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Fieldloom crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Submission blocked by one or more validation messages.
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// A field or permission type key is missing from the fetched schema.
    #[error("schema lookup error: {0}")]
    SchemaLookup(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote fetch or submit failed.
    #[error("network error: {0}")]
    Network(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the human-readable validation messages carried by this error.
    #[must_use]
    pub fn validation_messages(&self) -> Vec<String> {
        match self {
            Self::Validation(message) => vec![message.clone()],
            Self::ValidationFailed(messages) => messages.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_deserialization_is_validated() {
        let parsed: Result<NonEmptyString, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());
    }

    #[test]
    fn validation_failed_joins_messages() {
        let error = AppError::ValidationFailed(vec![
            "name is required".to_owned(),
            "select at least one permission".to_owned(),
        ]);
        assert_eq!(
            error.to_string(),
            "validation failed: name is required; select at least one permission"
        );
        assert_eq!(error.validation_messages().len(), 2);
    }
}
