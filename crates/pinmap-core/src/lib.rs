//! Client core for the pinmap map service.
//!
//! Owns the session lifecycle (sign-in, silent token renewal, single retry
//! of failed requests, coordinated sign-out) and the typed API surface for
//! members, pins and posts. Front ends build an `ApiClient`, wrap it in an
//! `AuthService`, and observe the `SessionStore`.

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod models;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use auth::{AuthService, BootstrapOutcome, HistoryNavigator, Navigator, Session, SessionStore};
pub use config::Config;
pub use forms::FormFeedback;
