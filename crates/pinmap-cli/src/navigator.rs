use std::sync::Mutex;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use pinmap_core::auth::SIGN_IN_PATH;
use pinmap_core::{Navigator, Session};

/// Tracks which "screen" the terminal is on. A redirect to the sign-in
/// path prints a hint, since there is no page to switch to.
pub struct TerminalNavigator {
    current: Mutex<String>,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self {
            current: Mutex::new("/".to_string()),
        }
    }

    /// Record a screen change made by the user (not a redirect).
    pub fn show(&self, path: &str) {
        *self.lock() = path.to_string();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, String> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        self.lock().clone()
    }

    fn navigate(&self, path: &str) {
        debug!(path = path, "Redirect");
        self.show(path);
        if path == SIGN_IN_PATH {
            println!("\nYour session has expired. Run `login` to sign in again.");
        }
    }
}

/// Print sign-in and sign-out transitions as they are committed.
/// Token renewals keep the same user and are not announced.
pub fn spawn_session_observer(mut rx: watch::Receiver<Session>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut announced: Option<i64> = None;
        while rx.changed().await.is_ok() {
            let session = rx.borrow_and_update().clone();
            match (&session.user, announced) {
                (Some(user), previous) if previous != Some(user.id) => {
                    println!("[session] signed in as {}", user.nickname);
                    announced = Some(user.id);
                }
                (None, Some(_)) if !session.is_authenticated() => {
                    println!("[session] signed out");
                    announced = None;
                }
                _ => {}
            }
        }
    })
}
