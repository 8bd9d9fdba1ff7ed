use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::refresh::Renewal;
use crate::api::ApiClient;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A token was already present; nothing was sent.
    AlreadyAuthenticated,
    /// The refresh cookie was accepted and the profile loaded.
    Restored(User),
    /// No session could be restored; the client stays signed out.
    Anonymous,
    /// The bootstrap already ran for this client.
    AlreadyRan,
}

/// Restores a session at start-up from the server-held refresh credential.
///
/// Runs once per client. Failures are an expected outcome (anonymous
/// browsing): they leave the session empty and never surface an error.
/// The renewal is shared with failing requests but does not redirect on
/// its own.
pub struct SessionBootstrapper {
    api: ApiClient,
    started: AtomicBool,
}

impl SessionBootstrapper {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            started: AtomicBool::new(false),
        }
    }

    pub async fn run(&self) -> BootstrapOutcome {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Bootstrap already ran");
            return BootstrapOutcome::AlreadyRan;
        }

        let session = self.api.session();
        if session.is_authenticated() {
            debug!("Bootstrap skipped, token already present");
            return BootstrapOutcome::AlreadyAuthenticated;
        }

        // joins any renewal already started by failing requests
        let token = match self.api.refresh_coordinator().renew_silently().await {
            Ok(Renewal::Token(token)) => token,
            Ok(Renewal::SessionEnded) => return BootstrapOutcome::Anonymous,
            Err(e) => {
                debug!(error = %e, "No session to restore");
                return BootstrapOutcome::Anonymous;
            }
        };

        match self.api.me_without_renewal().await {
            Ok(member) => {
                let user = member.to_user();
                session.set_auth(token, Some(user.clone()));
                info!(user_id = user.id, "Session restored");
                BootstrapOutcome::Restored(user)
            }
            Err(e) => {
                debug!(error = %e, "Profile fetch failed after renewal, staying signed out");
                session.clear();
                BootstrapOutcome::Anonymous
            }
        }
    }
}
