//! Session lifecycle: who is signed in, and how that changes.
//!
//! This module provides:
//! - `SessionStore`: in-memory token and profile, observable via `watch`
//! - `RefreshCoordinator`: single-flight token renewal on 401
//! - `SessionBootstrapper`: silent session restore at start-up
//! - `AuthService`: login, signup, logout built on the above
//! - `Navigator`: target of the sign-in redirect
//!
//! Tokens live in memory only; the refresh credential is an HTTP-only
//! cookie held by the HTTP client's cookie jar.

pub mod bootstrap;
pub mod navigator;
pub mod refresh;
pub mod service;
pub mod session;

pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use navigator::{HistoryNavigator, Navigator, SIGN_IN_PATH};
pub use refresh::{RefreshCoordinator, RefreshState, Renewal, TokenRenewer};
pub use service::AuthService;
pub use session::{Session, SessionStore};
