//! API client for the pinmap backend.
//!
//! `ApiClient` sends every call through the request pipeline, intercepts
//! 401 responses and hands them to the `RefreshCoordinator`, then replays
//! the original request once with the renewed token.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::pipeline::{
    bearer_token, classify, ApiRequest, BearerAuth, Classification, DefaultHeaders, RequestStage,
};
use super::ApiError;
use crate::auth::{
    Navigator, RefreshCoordinator, Renewal, SessionStore, TokenRenewer, SIGN_IN_PATH,
};
use crate::models::{
    LoginRequest, LoginResponse, MemberResponse, NearbyQuery, Page, PageRequest, Pin,
    PinCreateRequest, Post, SignupRequest,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// A timeout is a transport failure and never triggers a renewal.
const REQUEST_TIMEOUT_SECS: u64 = 15;

const USER_AGENT: &str = concat!("pinmap/", env!("CARGO_PKG_VERSION"));

const LOGIN_PATH: &str = "/api/auth/login";
const REFRESH_PATH: &str = "/api/auth/refresh";
const LOGOUT_PATH: &str = "/api/auth/logout";
const ME_PATH: &str = "/api/auth/me";
const MEMBERS_PATH: &str = "/api/members";
const PINS_PATH: &str = "/api/pins";
const POSTS_PATH: &str = "/api/posts";

/// Result of one trip through the transport.
enum Dispatch {
    Delivered(Response),
    /// 401 on a request that may still be renewed and replayed. `rejection`
    /// is the server's answer, returned as-is if no replay happens.
    RenewalRequired {
        sent_token: Option<String>,
        rejection: ApiError,
    },
}

/// Sends requests and applies the status rules that do not involve renewal.
struct Transport {
    http: Client,
    base_url: String,
    stages: Vec<Arc<dyn RequestStage>>,
    session: SessionStore,
}

impl Transport {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Dispatch, ApiError> {
        let mut headers = HeaderMap::new();
        for stage in &self.stages {
            stage.apply(request, &mut headers)?;
        }
        let sent_token = bearer_token(&headers);

        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = sent_token.is_some(),
            retried = request.is_retried(),
            "Sending request"
        );
        let response = builder.send().await.map_err(ApiError::transport)?;

        match classify(response.status()) {
            Classification::Success => Ok(Dispatch::Delivered(response)),
            Classification::Unauthorized if request.may_renew() => {
                debug!(path = %request.path, "Unauthorized, renewal required");
                let rejection = ApiError::from_response(response).await;
                Ok(Dispatch::RenewalRequired {
                    sent_token,
                    rejection,
                })
            }
            Classification::Unauthorized => {
                warn!(
                    path = %request.path,
                    renewal_call = request.is_renewal_call(),
                    retried = request.is_retried(),
                    "Unauthorized, clearing session"
                );
                self.session.clear();
                Err(ApiError::from_response(response).await)
            }
            Classification::Failure => {
                debug!(path = %request.path, status = %response.status(), "Request failed");
                Err(ApiError::from_response(response).await)
            }
        }
    }

    /// Call the renewal endpoint with the ambient refresh cookie only.
    async fn refresh(&self) -> Result<LoginResponse, ApiError> {
        match self.dispatch(&ApiRequest::renewal(REFRESH_PATH)).await? {
            Dispatch::Delivered(response) => decode(response).await,
            Dispatch::RenewalRequired { .. } => Err(ApiError::InvalidResponse(
                "renewal call was routed to renewal".to_string(),
            )),
        }
    }
}

/// `TokenRenewer` backed by the refresh endpoint.
struct RefreshEndpoint {
    transport: Arc<Transport>,
}

impl TokenRenewer for RefreshEndpoint {
    fn renew(&self) -> BoxFuture<'static, Result<String, ApiError>> {
        let transport = Arc::clone(&self.transport);
        async move { transport.refresh().await.map(|tokens| tokens.access_token) }.boxed()
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let url = response.url().path().to_string();
    let text = response.text().await.map_err(ApiError::transport)?;
    serde_json::from_str(&text).map_err(|e| {
        ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
    })
}

/// API client for the pinmap backend.
/// Clone is cheap - all clones share the session, connection pool and
/// cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<Transport>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Create a client with the default pipeline and timeout
    pub fn new(
        base_url: impl Into<String>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Self::builder().base_url(base_url).navigator(navigator).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.transport.session
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Send a request, renewing the token and replaying once on 401.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Response, ApiError> {
        let (sent_token, rejection) = match self.transport.dispatch(&request).await? {
            Dispatch::Delivered(response) => return Ok(response),
            Dispatch::RenewalRequired {
                sent_token,
                rejection,
            } => (sent_token, rejection),
        };

        request.mark_retried();
        if let Renewal::SessionEnded = self.refresh.renew(sent_token.as_deref()).await? {
            debug!(path = %request.path, "Session ended meanwhile, not replaying");
            return Err(rejection);
        }

        debug!(path = %request.path, "Replaying request with renewed token");
        match self.transport.dispatch(&request).await? {
            Dispatch::Delivered(response) => Ok(response),
            Dispatch::RenewalRequired { .. } => Err(ApiError::InvalidResponse(
                "replayed request asked for a second renewal".to_string(),
            )),
        }
    }

    /// Execute and decode a JSON body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        decode(response).await
    }

    /// Execute and discard the body.
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Exchange credentials for an access token. The server also sets the
    /// refresh cookie on this response.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?.without_renewal();
        self.execute_json(request).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute_empty(ApiRequest::post(LOGOUT_PATH).without_renewal()).await
    }

    /// Profile of the token holder.
    pub async fn me(&self) -> Result<MemberResponse, ApiError> {
        self.execute_json(ApiRequest::get(ME_PATH)).await
    }

    /// Profile fetch where a 401 is final instead of triggering a renewal.
    pub(crate) async fn me_without_renewal(&self) -> Result<MemberResponse, ApiError> {
        self.execute_json(ApiRequest::get(ME_PATH).without_renewal()).await
    }

    // ===== Members =====

    pub async fn signup(&self, request: &SignupRequest) -> Result<MemberResponse, ApiError> {
        let request = ApiRequest::post(MEMBERS_PATH).json(request)?.without_renewal();
        self.execute_json(request).await
    }

    pub async fn member(&self, id: i64) -> Result<MemberResponse, ApiError> {
        self.execute_json(ApiRequest::get(format!("{}/{}", MEMBERS_PATH, id))).await
    }

    // ===== Pins =====

    /// Pins within `radius_km` of a point. Works signed out too.
    pub async fn nearby_pins(&self, query: &NearbyQuery) -> Result<Page<Pin>, ApiError> {
        let request = ApiRequest::get(format!("{}/nearby", PINS_PATH)).query(query.to_query());
        self.execute_json(request).await
    }

    /// Pins owned by the signed-in member.
    pub async fn my_pins(&self, page: PageRequest) -> Result<Page<Pin>, ApiError> {
        self.execute_json(ApiRequest::get(PINS_PATH).query(page.to_query())).await
    }

    pub async fn pin(&self, id: i64) -> Result<Pin, ApiError> {
        self.execute_json(ApiRequest::get(format!("{}/{}", PINS_PATH, id))).await
    }

    pub async fn create_pin(&self, pin: &PinCreateRequest) -> Result<Pin, ApiError> {
        self.execute_json(ApiRequest::post(PINS_PATH).json(pin)?).await
    }

    // ===== Posts =====

    pub async fn posts(
        &self,
        page: PageRequest,
        keyword: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        let mut params = page.to_query();
        if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
            params.push(("keyword".to_string(), keyword.to_string()));
        }
        self.execute_json(ApiRequest::get(POSTS_PATH).query(params)).await
    }

    pub async fn post(&self, id: i64) -> Result<Post, ApiError> {
        self.execute_json(ApiRequest::get(format!("{}/{}", POSTS_PATH, id))).await
    }

    pub async fn nearby_posts(&self, query: &NearbyQuery) -> Result<Page<Post>, ApiError> {
        let request = ApiRequest::get(format!("{}/nearby", POSTS_PATH)).query(query.to_query());
        self.execute_json(request).await
    }
}

/// Builder for `ApiClient`
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    navigator: Option<Arc<dyn Navigator>>,
    session: Option<SessionStore>,
    timeout: Option<Duration>,
    sign_in_path: Option<String>,
    stages: Vec<Arc<dyn RequestStage>>,
}

impl ApiClientBuilder {
    /// API origin, e.g. `http://localhost:8080`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Where sign-in redirects go
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Share an existing session store instead of creating one
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = Some(path.into());
        self
    }

    /// Add a pre-request stage; it runs after the built-in ones
    pub fn stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Configuration("base_url is required".into()))?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::Configuration("base_url is empty".into()));
        }
        let navigator = self
            .navigator
            .ok_or_else(|| ApiError::Configuration("navigator is required".into()))?;
        let session = self.session.unwrap_or_default();

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let mut stages: Vec<Arc<dyn RequestStage>> = vec![
            Arc::new(DefaultHeaders),
            Arc::new(BearerAuth::new(session.clone())),
        ];
        stages.extend(self.stages);

        let transport = Arc::new(Transport {
            http,
            base_url,
            stages,
            session: session.clone(),
        });
        let renewer = Arc::new(RefreshEndpoint {
            transport: Arc::clone(&transport),
        });
        let refresh = RefreshCoordinator::new(session, navigator, renewer)
            .with_sign_in_path(self.sign_in_path.unwrap_or_else(|| SIGN_IN_PATH.to_string()));

        Ok(ApiClient { transport, refresh })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HistoryNavigator;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ApiClient::builder()
            .navigator(Arc::new(HistoryNavigator::default()))
            .build();
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn test_builder_requires_navigator() {
        let result = ApiClient::builder().base_url("http://localhost:8080").build();
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client =
            ApiClient::new("http://localhost:8080/", Arc::new(HistoryNavigator::default()))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.transport.url(ME_PATH), "http://localhost:8080/api/auth/me");
    }

    #[test]
    fn test_builder_shares_session() {
        let session = SessionStore::new();
        let client = ApiClient::builder()
            .base_url("http://localhost:8080")
            .navigator(Arc::new(HistoryNavigator::default()))
            .session(session.clone())
            .build()
            .unwrap();
        session.set_auth("tok1", None);
        assert_eq!(client.session().token().as_deref(), Some("tok1"));
    }
}
