use serde::{Deserialize, Deserializer, Serialize};

/// Error code the backend uses for input validation failures.
pub const VALIDATION_ERROR_CODE: &str = "E005";

/// Error code the backend uses when signing up with an email that is taken.
pub const DUPLICATE_EMAIL_CODE: &str = "E006";

/// Body of every 4xx/5xx response from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(
        rename = "fieldErrors",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub field_errors: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    #[serde(default)]
    pub value: Option<String>,
    pub reason: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FieldError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FieldError>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ErrorResponse {
    /// Wrap a body that was not in the backend's JSON error shape.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            code: String::new(),
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    /// Build a validation error from `(field, rejected value, reason)` triples.
    /// Returns `Ok(())` when there are none.
    pub(crate) fn from_violations(
        violations: Vec<(&str, Option<&str>, &str)>,
    ) -> Result<(), ErrorResponse> {
        if violations.is_empty() {
            return Ok(());
        }
        Err(Self {
            code: VALIDATION_ERROR_CODE.to_string(),
            message: "Input validation failed.".to_string(),
            field_errors: violations
                .into_iter()
                .map(|(field, value, reason)| FieldError {
                    field: field.to_string(),
                    value: value.map(str::to_string),
                    reason: reason.to_string(),
                })
                .collect(),
        })
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.reason.as_str())
    }
}
