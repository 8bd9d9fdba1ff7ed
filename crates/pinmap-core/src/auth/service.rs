use std::sync::Arc;

use tracing::{info, warn};

use super::bootstrap::{BootstrapOutcome, SessionBootstrapper};
use super::session::SessionStore;
use crate::api::{ApiClient, ApiError};
use crate::models::{LoginRequest, MemberResponse, SignupRequest, User};

/// Session operations behind the sign-in, sign-up and account screens.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    bootstrapper: Arc<SessionBootstrapper>,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        let bootstrapper = Arc::new(SessionBootstrapper::new(api.clone()));
        Self { api, bootstrapper }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Restore the session from the refresh cookie. Only the first call
    /// does anything.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        self.bootstrapper.run().await
    }

    /// Sign in and load the profile. If the profile cannot be loaded the
    /// session is cleared again and the error returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let credentials = LoginRequest::new(email.trim(), password);
        credentials.validate().map_err(ApiError::Validation)?;

        let tokens = self.api.login(&credentials).await?;
        let session = self.session();
        session.set_auth(tokens.access_token, None);

        match self.api.me().await {
            Ok(member) => {
                let user = member.to_user();
                // the profile call may have renewed the token; commit whatever is current
                match session.token() {
                    Some(token) => session.set_auth(token, Some(user.clone())),
                    None => {
                        return Err(ApiError::InvalidResponse(
                            "session ended during sign-in".into(),
                        ))
                    }
                }
                info!(user_id = user.id, "Signed in");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch after login failed");
                session.clear();
                Err(e)
            }
        }
    }

    /// Create an account. Obvious input mistakes are reported locally as
    /// `ApiError::Validation` without calling the server.
    pub async fn signup(&self, request: &SignupRequest) -> Result<MemberResponse, ApiError> {
        request.validate().map_err(ApiError::Validation)?;
        let member = self.api.signup(request).await?;
        info!(member_id = member.id, "Signed up");
        Ok(member)
    }

    /// Invalidate the server-side refresh credential and clear the session.
    /// The session is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.api.logout().await;
        self.session().clear();
        match result {
            Ok(()) => {
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed, session cleared locally");
                Err(e)
            }
        }
    }

    /// Re-fetch the profile and commit it alongside the current token.
    pub async fn refresh_profile(&self) -> Result<User, ApiError> {
        let member = self.api.me().await?;
        let user = member.to_user();
        if let Some(token) = self.session().token() {
            self.session().set_auth(token, Some(user.clone()));
        }
        Ok(user)
    }
}
