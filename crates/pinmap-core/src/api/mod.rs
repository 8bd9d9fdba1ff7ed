//! REST API client module for the pinmap backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend to sign in, read pins and posts, and manage the account.
//!
//! The API uses short-lived bearer tokens. A server-held refresh cookie
//! renews them; see `crate::auth` for the session side.

pub mod client;
pub mod error;
pub mod pipeline;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::ApiError;
pub use pipeline::{ApiRequest, BearerAuth, Classification, DefaultHeaders, RequestStage};
