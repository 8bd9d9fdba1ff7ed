//! Single-flight access token renewal.
//!
//! A 401 on an ordinary request lands here. The first caller starts one
//! renewal call and parks it as a shared future; callers that fail while it
//! is in flight await the same future instead of starting their own. The
//! future commits its own outcome (new token, or cleared session plus a
//! redirect to sign-in) exactly once, so every chain of the wave observes
//! the same resolution.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::navigator::{Navigator, SIGN_IN_PATH};
use super::session::SessionStore;
use crate::api::ApiError;

/// Exchanges the ambient refresh credential for a fresh access token.
pub trait TokenRenewer: Send + Sync {
    fn renew(&self) -> BoxFuture<'static, Result<String, ApiError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Renewing,
    Succeeded,
    Failed,
}

type RenewalResult = Result<String, Arc<ApiError>>;
type InFlight = Shared<BoxFuture<'static, RenewalResult>>;

/// What a request that failed with 401 should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renewal {
    /// Replay with this token.
    Token(String),
    /// The session was cleared while the request was in flight; the 401 stands.
    SessionEnded,
}

struct Flight {
    state: RefreshState,
    in_flight: Option<InFlight>,
    /// Whether any caller of the current renewal expects a sign-in redirect.
    redirect_on_failure: bool,
    renewals: u64,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    flight: Arc<Mutex<Flight>>,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    renewer: Arc<dyn TokenRenewer>,
    sign_in_path: String,
}

impl RefreshCoordinator {
    pub fn new(
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        renewer: Arc<dyn TokenRenewer>,
    ) -> Self {
        Self {
            flight: Arc::new(Mutex::new(Flight {
                state: RefreshState::Idle,
                in_flight: None,
                redirect_on_failure: false,
                renewals: 0,
            })),
            session,
            navigator,
            renewer,
            sign_in_path: SIGN_IN_PATH.to_string(),
        }
    }

    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    pub fn state(&self) -> RefreshState {
        self.lock().state
    }

    /// Number of renewal calls issued so far.
    pub fn renewals(&self) -> u64 {
        self.lock().renewals
    }

    /// Obtain a token to replay a request that failed with 401.
    ///
    /// `stale_token` is the token the failed request carried. If the session
    /// already moved past it, the current token is returned without a new
    /// renewal call; if the session was cleared meanwhile, the result is
    /// `Renewal::SessionEnded` and the 401 stands. On failure the session has
    /// been cleared, the user sent to sign-in, and the error is
    /// `ApiError::SessionExpired` wrapping the renewal endpoint's error.
    pub async fn renew(&self, stale_token: Option<&str>) -> Result<Renewal, ApiError> {
        self.renew_with(stale_token, true).await
    }

    /// Renew without a sign-in redirect of its own, for start-up restore.
    ///
    /// Shares the in-flight renewal with any failing requests, so there is
    /// still at most one call to the renewal endpoint. If a request that
    /// expects a redirect joins the same renewal and it fails, the redirect
    /// still happens once.
    pub async fn renew_silently(&self) -> Result<Renewal, ApiError> {
        self.renew_with(None, false).await
    }

    async fn renew_with(
        &self,
        stale_token: Option<&str>,
        redirect: bool,
    ) -> Result<Renewal, ApiError> {
        let renewal = {
            let mut flight = self.lock();
            if let Some(in_flight) = flight.in_flight.clone() {
                debug!(redirect, "Renewal already in flight, joining it");
                flight.redirect_on_failure |= redirect;
                in_flight
            } else {
                match (self.session.token(), stale_token) {
                    (Some(current), _) if stale_token != Some(current.as_str()) => {
                        debug!("Session already holds a newer token, skipping renewal");
                        return Ok(Renewal::Token(current));
                    }
                    (None, Some(_)) => {
                        debug!("Session ended while the request was in flight");
                        return Ok(Renewal::SessionEnded);
                    }
                    _ => {}
                }
                let renewal = self.start_renewal().shared();
                flight.state = RefreshState::Renewing;
                flight.renewals += 1;
                flight.redirect_on_failure = redirect;
                flight.in_flight = Some(renewal.clone());
                renewal
            }
        };

        renewal
            .await
            .map(Renewal::Token)
            .map_err(ApiError::SessionExpired)
    }

    fn start_renewal(&self) -> BoxFuture<'static, RenewalResult> {
        let this = self.clone();
        async move {
            info!("Renewing access token");
            let result = this.renewer.renew().await;

            let mut flight = this.lock();
            flight.in_flight = None;
            match result {
                Ok(token) => {
                    this.session.set_token(token.clone());
                    flight.state = RefreshState::Succeeded;
                    info!("Access token renewed");
                    Ok(token)
                }
                Err(err) => {
                    warn!(error = %err, "Token renewal failed, signing out");
                    this.session.clear();
                    flight.state = RefreshState::Failed;
                    let redirect = std::mem::take(&mut flight.redirect_on_failure);
                    drop(flight);
                    if redirect {
                        this.redirect_to_sign_in();
                    }
                    Err(Arc::new(err))
                }
            }
        }
        .boxed()
    }

    fn redirect_to_sign_in(&self) {
        let current = self.navigator.current_path();
        let current_path = current.split(['?', '#']).next().unwrap_or_default();
        if current_path == self.sign_in_path {
            debug!("Already on the sign-in page, not redirecting");
            return;
        }
        self.navigator.navigate(&self.sign_in_path);
    }

    fn lock(&self) -> MutexGuard<'_, Flight> {
        self.flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::join_all;
    use reqwest::StatusCode;

    use super::*;
    use crate::auth::navigator::HistoryNavigator;
    use crate::models::User;

    struct FakeRenewer {
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    impl TokenRenewer for FakeRenewer {
        fn renew(&self) -> BoxFuture<'static, Result<String, ApiError>> {
            let calls = Arc::clone(&self.calls);
            let succeed = self.succeed;
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                if succeed {
                    Ok(format!("tok{}", n + 2))
                } else {
                    Err(ApiError::from_status(StatusCode::UNAUTHORIZED, ""))
                }
            }
            .boxed()
        }
    }

    fn setup(
        succeed: bool,
        start: &str,
    ) -> (RefreshCoordinator, SessionStore, Arc<HistoryNavigator>, Arc<AtomicUsize>) {
        let session = SessionStore::new();
        let navigator = Arc::new(HistoryNavigator::new(start));
        let calls = Arc::new(AtomicUsize::new(0));
        let renewer = Arc::new(FakeRenewer {
            calls: Arc::clone(&calls),
            succeed,
        });
        let coordinator = RefreshCoordinator::new(session.clone(), navigator.clone(), renewer);
        (coordinator, session, navigator, calls)
    }

    fn token(value: &str) -> Renewal {
        Renewal::Token(value.to_string())
    }

    fn kim() -> User {
        User {
            id: 1,
            email: "kim@example.com".to_string(),
            nickname: "kim".to_string(),
            role: "USER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_renewal() {
        let (coordinator, session, navigator, calls) = setup(true, "/");
        session.set_auth("tok1", Some(kim()));
        assert_eq!(coordinator.state(), RefreshState::Idle);

        let results = join_all((0..5).map(|_| coordinator.renew(Some("tok1")))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.renewals(), 1);
        for result in results {
            assert_eq!(result.unwrap(), token("tok2"));
        }
        assert_eq!(session.token().as_deref(), Some("tok2"));
        assert_eq!(session.user(), Some(kim()));
        assert_eq!(coordinator.state(), RefreshState::Succeeded);
        assert_eq!(navigator.visits(SIGN_IN_PATH), 0);
    }

    #[tokio::test]
    async fn test_failed_renewal_clears_session_and_redirects_once() {
        let (coordinator, session, navigator, calls) = setup(false, "/me");
        session.set_auth("tok1", Some(kim()));

        let results = join_all((0..3).map(|_| coordinator.renew(Some("tok1")))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            let err = result.unwrap_err();
            assert!(err.is_session_expired());
        }
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert_eq!(coordinator.state(), RefreshState::Failed);
        assert_eq!(navigator.visits(SIGN_IN_PATH), 1);
        assert_eq!(navigator.current_path(), SIGN_IN_PATH);
    }

    #[tokio::test]
    async fn test_no_redirect_when_already_on_sign_in() {
        let (coordinator, _session, navigator, _calls) = setup(false, "/login?from=%2Fme");

        let result = coordinator.renew(None).await;

        assert!(result.is_err());
        assert_eq!(navigator.visits(SIGN_IN_PATH), 0);
    }

    #[tokio::test]
    async fn test_newer_token_skips_renewal() {
        let (coordinator, session, _navigator, calls) = setup(true, "/");
        session.set_auth("tok2", None);

        let renewal = coordinator.renew(Some("tok1")).await.unwrap();

        assert_eq!(renewal, token("tok2"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn test_separate_waves_renew_separately() {
        let (coordinator, session, _navigator, calls) = setup(true, "/");
        session.set_auth("tok1", None);

        assert_eq!(coordinator.renew(Some("tok1")).await.unwrap(), token("tok2"));
        assert_eq!(coordinator.renew(Some("tok2")).await.unwrap(), token("tok3"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.token().as_deref(), Some("tok3"));
    }

    #[tokio::test]
    async fn test_cleared_session_does_not_renew() {
        let (coordinator, _session, navigator, calls) = setup(true, "/");

        let renewal = coordinator.renew(Some("tok1")).await.unwrap();

        assert_eq!(renewal, Renewal::SessionEnded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(navigator.visits(SIGN_IN_PATH), 0);
    }

    #[tokio::test]
    async fn test_silent_renewal_failure_does_not_redirect() {
        let (coordinator, session, navigator, calls) = setup(false, "/map");

        let err = coordinator.renew_silently().await.unwrap_err();

        assert!(err.is_session_expired());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_authenticated());
        assert_eq!(coordinator.state(), RefreshState::Failed);
        assert_eq!(navigator.visits(SIGN_IN_PATH), 0);
    }

    #[tokio::test]
    async fn test_silent_renewal_shares_flight_with_failing_requests() {
        let (coordinator, _session, navigator, calls) = setup(false, "/map");

        let (silent, loud) = tokio::join!(coordinator.renew_silently(), coordinator.renew(None));

        assert!(silent.is_err());
        assert!(loud.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.visits(SIGN_IN_PATH), 1);
    }

    #[tokio::test]
    async fn test_anonymous_failure_renews() {
        let (coordinator, session, _navigator, calls) = setup(true, "/");

        let renewal = coordinator.renew(None).await.unwrap();

        assert_eq!(renewal, token("tok2"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.token().as_deref(), Some("tok2"));
    }
}
