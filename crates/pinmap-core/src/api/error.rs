use std::sync::Arc;

use thiserror::Error;

use crate::models::{ErrorResponse, FieldError, DUPLICATE_EMAIL_CODE};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {}", .0.message)]
    Validation(ErrorResponse),

    #[error("Unauthorized: {}", .0.message)]
    Unauthorized(ErrorResponse),

    #[error("Access denied: {}", .0.message)]
    AccessDenied(ErrorResponse),

    #[error("Resource not found: {}", .0.message)]
    NotFound(ErrorResponse),

    #[error("Conflict: {}", .0.message)]
    Conflict(ErrorResponse),

    #[error("Rate limited - please wait before retrying")]
    RateLimited(ErrorResponse),

    #[error("Server error ({status}): {}", .body.message)]
    ServerError { status: u16, body: ErrorResponse },

    #[error("Unexpected status {status}: {}", .body.message)]
    UnexpectedStatus { status: u16, body: ErrorResponse },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Session expired: {0}")]
    SessionExpired(#[source] Arc<ApiError>),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a failing status and its raw body. Bodies in the backend's JSON
    /// error shape are kept whole; anything else becomes the message.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = serde_json::from_str::<ErrorResponse>(body).unwrap_or_else(|_| {
            let text = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                Self::truncate_body(body)
            };
            ErrorResponse::from_message(text)
        });
        match status.as_u16() {
            400 => ApiError::Validation(body),
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            409 => ApiError::Conflict(body),
            429 => ApiError::RateLimited(body),
            code @ 500..=599 => ApiError::ServerError { status: code, body },
            code => ApiError::UnexpectedStatus { status: code, body },
        }
    }

    /// Read the body of a failing response and map it.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    /// Map a send failure, keeping timeouts apart from other network errors.
    pub fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }

    /// HTTP status of the failed response, if the failure came from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::RateLimited(_) => Some(429),
            ApiError::ServerError { status, .. } | ApiError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Backend error body, if there was one.
    pub fn body(&self) -> Option<&ErrorResponse> {
        match self {
            ApiError::Validation(body)
            | ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::Conflict(body)
            | ApiError::RateLimited(body)
            | ApiError::ServerError { body, .. }
            | ApiError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.body()
            .map(|b| b.code.as_str())
            .filter(|code| !code.is_empty())
    }

    pub fn field_errors(&self) -> &[FieldError] {
        self.body().map(|b| b.field_errors.as_slice()).unwrap_or(&[])
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_duplicate_email(&self) -> bool {
        self.code() == Some(DUPLICATE_EMAIL_CODE)
    }

    /// True when the failure ended the session (renewal was refused).
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }
}
