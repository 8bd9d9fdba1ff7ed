//! Request pipeline pieces shared by every call.
//!
//! An `ApiRequest` is an owned description of a call, so it can be sent
//! again after a token renewal. Before each send, the configured
//! `RequestStage`s fill in headers; after it, `classify` decides whether
//! the response is delivered, needs a renewal, or fails.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use super::ApiError;
use crate::auth::SessionStore;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<serde_json::Value>,
    renewal_call: bool,
    allow_renewal: bool,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            renewal_call: false,
            allow_renewal: true,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// The call to the token renewal endpoint. It never carries the access
    /// token and a 401 on it ends the session.
    pub(crate) fn renewal(path: impl Into<String>) -> Self {
        let mut request = Self::post(path);
        request.renewal_call = true;
        request.allow_renewal = false;
        request
    }

    pub fn query(mut self, params: Vec<(String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    /// Serialize `body` once so a replay sends the exact same payload.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Return a 401 to the caller instead of attempting a renewal.
    pub fn without_renewal(mut self) -> Self {
        self.allow_renewal = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_renewal_call(&self) -> bool {
        self.renewal_call
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Flag the request before it is replayed so a second 401 is final.
    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Whether a 401 on this request may be turned into a renewal.
    pub(crate) fn may_renew(&self) -> bool {
        self.allow_renewal && !self.renewal_call && !self.retried
    }
}

/// A pre-request step that contributes headers.
pub trait RequestStage: Send + Sync {
    fn apply(&self, request: &ApiRequest, headers: &mut HeaderMap) -> Result<(), ApiError>;
}

/// Sets the JSON `Accept` header.
pub struct DefaultHeaders;

impl RequestStage for DefaultHeaders {
    fn apply(&self, _request: &ApiRequest, headers: &mut HeaderMap) -> Result<(), ApiError> {
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Ok(())
    }
}

/// Attaches `Authorization: Bearer <token>` when the session holds a token
/// at send time. Renewal calls go out without it.
pub struct BearerAuth {
    session: SessionStore,
}

impl BearerAuth {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

impl RequestStage for BearerAuth {
    fn apply(&self, request: &ApiRequest, headers: &mut HeaderMap) -> Result<(), ApiError> {
        if request.is_renewal_call() {
            headers.remove(header::AUTHORIZATION);
            return Ok(());
        }
        if let Some(token) = self.session.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(())
    }
}

/// Token carried by an outgoing request, if any.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Unauthorized,
    Failure,
}

pub fn classify(status: StatusCode) -> Classification {
    if status.is_success() {
        Classification::Success
    } else if status == StatusCode::UNAUTHORIZED {
        Classification::Unauthorized
    } else {
        Classification::Failure
    }
}
