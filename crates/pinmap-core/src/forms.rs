//! User-facing feedback for the sign-in and sign-up forms.

use crate::api::ApiError;
use crate::models::FieldError;

const CHECK_INPUT_MESSAGE: &str = "Please check your input.";
const DUPLICATE_EMAIL_MESSAGE: &str = "This email address is already in use.";
const SIGNUP_FAILED_MESSAGE: &str = "Sign-up failed.";
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
const LOGIN_FAILED_MESSAGE: &str = "Sign-in failed.";
const TIMEOUT_MESSAGE: &str = "The server took too long to respond. Please try again.";
const NETWORK_MESSAGE: &str = "Could not reach the server. Please try again.";

/// What a form shows after a failed submit: one message and, optionally,
/// per-field reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFeedback {
    pub message: String,
    pub field_errors: Vec<FieldError>,
}

impl FormFeedback {
    pub fn signup(err: &ApiError) -> Self {
        if !err.field_errors().is_empty() {
            return Self::with_fields(err, CHECK_INPUT_MESSAGE);
        }
        if err.is_duplicate_email() {
            return Self::message_only(DUPLICATE_EMAIL_MESSAGE);
        }
        let message =
            Self::server_message(err).unwrap_or_else(|| SIGNUP_FAILED_MESSAGE.to_string());
        Self::message_only(&message)
    }

    pub fn login(err: &ApiError) -> Self {
        if !err.field_errors().is_empty() {
            return Self::with_fields(err, CHECK_INPUT_MESSAGE);
        }
        if err.is_unauthorized() {
            return Self::message_only(INVALID_CREDENTIALS_MESSAGE);
        }
        let message = Self::server_message(err).unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string());
        Self::message_only(&message)
    }

    /// Reason to show under `field`, if the server flagged it.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.reason.as_str())
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    fn with_fields(err: &ApiError, fallback: &str) -> Self {
        let message = Self::server_message(err).unwrap_or_else(|| fallback.to_string());
        Self {
            message,
            field_errors: err.field_errors().to_vec(),
        }
    }

    fn message_only(message: &str) -> Self {
        Self {
            message: message.to_string(),
            field_errors: Vec::new(),
        }
    }

    fn server_message(err: &ApiError) -> Option<String> {
        match err {
            ApiError::Timeout => Some(TIMEOUT_MESSAGE.to_string()),
            ApiError::Network(_) => Some(NETWORK_MESSAGE.to_string()),
            _ => err
                .body()
                .map(|b| b.message.trim())
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }
}
