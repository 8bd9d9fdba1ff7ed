use std::sync::Mutex;

use tracing::info;

/// Path of the sign-in entry point.
pub const SIGN_IN_PATH: &str = "/login";

/// Target of navigation side effects (the router, in a browser UI).
pub trait Navigator: Send + Sync {
    /// Path currently shown to the user.
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// In-memory navigator that records every visited path.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HistoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![start.into()]),
        }
    }

    /// Every path visited so far, starting with the initial one.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of times `path` was navigated to (the initial path is not counted).
    pub fn visits(&self, path: &str) -> usize {
        self.history().iter().skip(1).filter(|p| *p == path).count()
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.history()
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, path: &str) {
        info!(path = path, "Navigating");
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(path.to_string());
    }
}
