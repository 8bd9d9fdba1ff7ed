use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::models::User;

/// Committed session state. Readers always get a whole snapshot, never a
/// token from one commit paired with a user from another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// In-memory owner of the access token and the signed-in user.
///
/// Clone is cheap and every clone shares the same state. Observers
/// subscribe to a `watch` channel and see each commit. Nothing is ever
/// written to disk; a new process starts signed out.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { tx: Arc::new(tx) }
    }

    /// Replace both the token and the user in one commit.
    ///
    /// `user` may be `None` while only the token is known (between a login
    /// or renewal and the follow-up profile fetch).
    pub fn set_auth(&self, token: impl Into<String>, user: Option<User>) {
        let token = token.into();
        debug!(has_user = user.is_some(), "Session: committing token and user");
        self.tx.send_replace(Session {
            access_token: Some(token),
            user,
        });
    }

    /// Replace only the token, keeping the current user.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        debug!("Session: committing renewed token");
        self.tx.send_modify(|session| session.access_token = Some(token));
    }

    /// Reset to signed out. Observers are only notified when something changed.
    pub fn clear(&self) {
        let changed = self.tx.send_if_modified(|session| {
            if session.access_token.is_none() && session.user.is_none() {
                return false;
            }
            *session = Session::default();
            true
        });
        if changed {
            debug!("Session: cleared");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().access_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    /// Receiver that wakes on every commit (UI re-render hook).
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}
