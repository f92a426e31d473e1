//! Authentication session lifecycle
//!
//! State machine:
//!
//! ```text
//! Unauthenticated ──ensure_valid_token──▶ Authenticating ──ok──▶ Authenticated
//!        ▲                                     │                       │
//!        │                                     └──err──▶ AuthFailed     │
//!        └──────────────── 401/403 on the current token ───────────────┘
//! ```
//!
//! At most one login request is in flight per manager. The login runs on its
//! own task and settles the state when it finishes, even if every caller
//! waiting on it has gone away. Callers that find a login already running
//! await the same shared result, so they all observe the same token or the
//! same [`AuthenticationError`].

use crate::core::wire::decode_login;
use crate::core::{
    sanitize_for_log, AuthenticationError, ClientConfig, Credentials, Error, Result,
};
use crate::runtime::transport::{HttpRequest, HttpResponse, Method, Transport};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Tokens are considered expired this long before their stated expiry,
/// capped at half of the token lifetime
const EXPIRY_SKEW_SECS: i64 = 30;

const LOGIN_PATH: &str = "/auth/token/acquire";

type LoginOutcome = std::result::Result<Arc<Session>, AuthenticationError>;
type LoginFlight = Shared<BoxFuture<'static, LoginOutcome>>;

/// Token material owned by the manager; the token itself never leaves the crate
#[derive(Clone)]
struct Session {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    refresh_token: Option<String>,
}

impl Session {
    /// A session without a stated expiry is valid until the server rejects it
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|expiry| now + self.expiry_margin(expiry) >= expiry)
            .unwrap_or(false)
    }

    fn expiry_margin(&self, expiry: DateTime<Utc>) -> Duration {
        let half_life = (expiry - self.issued_at) / 2;
        Duration::seconds(EXPIRY_SKEW_SECS)
            .min(half_life)
            .max(Duration::zero())
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            has_refresh_token: self.refresh_token.is_some(),
        }
    }
}

/// Public view of the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
}

/// Observable lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// The last login attempt failed; the next call starts a new attempt
    AuthFailed(AuthenticationError),
}

enum AuthState {
    Unauthenticated,
    Authenticating { epoch: u64, flight: LoginFlight },
    Authenticated(Arc<Session>),
    AuthFailed(AuthenticationError),
}

/// Request relative to the API prefix, replayable verbatim on retry
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    /// GET request for a `/`-separated path such as `/resources`
    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a literal path segment; it is percent-encoded when the URL is built
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Path as it appears in logs and errors
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    fn url(&self, config: &ClientConfig) -> Result<Url> {
        let mut url = Url::parse(&config.endpoint(""))
            .map_err(|e| Error::configuration(format!("invalid endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::configuration("base_url cannot carry a path"))?
            .pop_if_empty()
            .extend(self.segments.iter());
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(rename = "authSource", skip_serializing_if = "Option::is_none")]
    auth_source: Option<&'a str>,
}

/// Owns the token of one client and mediates every authenticated call
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    credentials: Arc<Credentials>,
    state: Arc<Mutex<AuthState>>,
    epoch: AtomicU64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.config.base_url)
            .field("username", &self.credentials.username)
            .field("state", &self.state())
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: Arc<ClientConfig>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            config,
            credentials: Arc::new(credentials),
            state: Arc::new(Mutex::new(AuthState::Unauthenticated)),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match &*self.state.lock() {
            AuthState::Unauthenticated => SessionState::Unauthenticated,
            AuthState::Authenticating { .. } => SessionState::Authenticating,
            AuthState::Authenticated(_) => SessionState::Authenticated,
            AuthState::AuthFailed(err) => SessionState::AuthFailed(err.clone()),
        }
    }

    /// Current session metadata, if authenticated
    pub fn session(&self) -> Option<SessionInfo> {
        match &*self.state.lock() {
            AuthState::Authenticated(session) => Some(session.info()),
            _ => None,
        }
    }

    /// Perform a fresh login, replacing any current session
    ///
    /// If a login is already running this joins it instead of starting a
    /// second one.
    pub async fn authenticate(&self) -> Result<SessionInfo> {
        let (epoch, flight) = {
            let mut state = self.state.lock();
            match &*state {
                AuthState::Authenticating { epoch, flight } => (*epoch, flight.clone()),
                _ => self.start_login(&mut state),
            }
        };

        let session = self.finish_login(epoch, flight).await?;
        Ok(session.info())
    }

    /// Return a usable token, logging in first when there is none or it expired
    pub async fn ensure_valid_token(&self) -> Result<String> {
        let (epoch, flight) = {
            let mut state = self.state.lock();
            match &*state {
                AuthState::Authenticated(session) if !session.is_expired(Utc::now()) => {
                    return Ok(session.token.clone());
                }
                AuthState::Authenticating { epoch, flight } => {
                    debug!("Joining in-flight login");
                    (*epoch, flight.clone())
                }
                _ => self.start_login(&mut state),
            }
        };

        let session = self.finish_login(epoch, flight).await?;
        Ok(session.token.clone())
    }

    /// Drop the session if `rejected_token` is still the current token
    ///
    /// Returns `false` when a newer token has already replaced it.
    pub fn invalidate(&self, rejected_token: &str) -> bool {
        let mut state = self.state.lock();
        match &*state {
            AuthState::Authenticated(session) if session.token == rejected_token => {
                *state = AuthState::Unauthenticated;
                true
            }
            _ => false,
        }
    }

    /// Send `request` with the current token, re-authenticating and replaying
    /// it exactly once if the token is rejected
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`] if a needed login fails
    /// - [`Error::AuthorizationExpired`] if the replay is rejected as well
    /// - [`Error::Transport`] if either exchange fails at the network level
    pub async fn execute_with_retry(&self, request: &ApiRequest) -> Result<HttpResponse> {
        let url = request.url(&self.config)?;
        let path = sanitize_for_log(&request.path());

        let token = self.ensure_valid_token().await?;
        debug!("{} {}", request.method, path);
        let response = self.send_with_token(request, &url, &token).await?;
        if !response.is_auth_rejection() {
            return Ok(response);
        }

        warn!(
            "{} {} rejected with status {}, re-authenticating",
            request.method, path, response.status
        );
        self.invalidate(&token);

        let token = self.ensure_valid_token().await?;
        debug!("{} {} (replay)", request.method, path);
        let response = self.send_with_token(request, &url, &token).await?;
        if response.is_auth_rejection() {
            self.invalidate(&token);
            warn!(
                "{} {} rejected again with status {}",
                request.method, path, response.status
            );
            return Err(Error::AuthorizationExpired {
                method: request.method.to_string(),
                path: request.path(),
            });
        }

        Ok(response)
    }

    async fn send_with_token(
        &self,
        request: &ApiRequest,
        url: &Url,
        token: &str,
    ) -> Result<HttpResponse> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            (
                "Authorization".to_string(),
                format!("{} {}", self.config.auth_scheme, token),
            ),
        ];
        if request.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let response = self
            .transport
            .send(HttpRequest {
                method: request.method,
                url: url.to_string(),
                headers,
                body: request.body.clone(),
            })
            .await?;
        Ok(response)
    }

    /// Caller must hold the state lock; installs a new flight in it
    ///
    /// The login is spawned so it completes and settles the state even when
    /// no caller is left awaiting it.
    fn start_login(&self, state: &mut AuthState) -> (u64, LoginFlight) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let login = acquire_token(
            Arc::clone(&self.transport),
            Arc::clone(&self.config),
            Arc::clone(&self.credentials),
        );
        let shared_state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let outcome = login.await;
            settle(&shared_state, epoch, &outcome);
            outcome
        });

        let flight = task
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(AuthenticationError {
                        status: None,
                        body: format!("login task failed: {}", e),
                    })
                })
            })
            .boxed()
            .shared();

        *state = AuthState::Authenticating {
            epoch,
            flight: flight.clone(),
        };
        (epoch, flight)
    }

    async fn finish_login(&self, epoch: u64, flight: LoginFlight) -> Result<Arc<Session>> {
        let outcome = flight.await;
        // Covers a login task that panicked before it could settle
        settle(&self.state, epoch, &outcome);
        outcome.map_err(Error::from)
    }
}

/// Record the outcome of login `epoch` unless a newer login replaced it
fn settle(state: &Mutex<AuthState>, epoch: u64, outcome: &LoginOutcome) {
    let mut state = state.lock();
    let current = matches!(
        &*state,
        AuthState::Authenticating { epoch: running, .. } if *running == epoch
    );
    if current {
        *state = match outcome {
            Ok(session) => AuthState::Authenticated(Arc::clone(session)),
            Err(err) => AuthState::AuthFailed(err.clone()),
        };
    }
}

async fn acquire_token(
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    credentials: Arc<Credentials>,
) -> LoginOutcome {
    let url = config.endpoint(LOGIN_PATH);
    info!("Authenticating with {}", sanitize_for_log(&url));

    let body = serde_json::to_vec(&LoginRequest {
        username: &credentials.username,
        password: credentials.password(),
        auth_source: credentials.domain.as_deref(),
    })
    .map_err(|e| AuthenticationError {
        status: None,
        body: format!("failed to encode login request: {}", e),
    })?;

    let issued_at = Utc::now();
    let response = transport
        .send(HttpRequest {
            method: Method::Post,
            url,
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(Bytes::from(body)),
        })
        .await
        .map_err(|e| {
            error!("Login request failed: {}", e);
            AuthenticationError::transport(&e)
        })?;

    if !response.is_success() {
        error!("Login rejected with status {}", response.status);
        return Err(AuthenticationError::rejected(
            response.status,
            response.body_text(),
        ));
    }

    let grant = decode_login(&response.body, issued_at).map_err(|e| {
        error!("Login response could not be decoded");
        AuthenticationError {
            status: Some(response.status),
            body: e.to_string(),
        }
    })?;

    match grant.expires_at {
        Some(expiry) => info!("Authentication successful, token valid until {}", expiry),
        None => info!("Authentication successful, token expiry not reported"),
    }

    Ok(Arc::new(Session {
        token: grant.token,
        issued_at,
        expires_at: grant.expires_at,
        refresh_token: grant.refresh_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_request_path_and_url() {
        let config = ClientConfig::default();
        let request = ApiRequest::get("/resources")
            .segment("vm 001/a")
            .segment("stats")
            .query("statKey", "cpu|usage_average")
            .query("rollUpType", "AVG");

        assert_eq!(request.path(), "/resources/vm 001/a/stats");
        let url = request.url(&config).unwrap();
        assert_eq!(
            url.path(),
            "/suite-api/api/resources/vm%20001%2Fa/stats"
        );
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("statKey".to_string(), "cpu|usage_average".to_string()),
                ("rollUpType".to_string(), "AVG".to_string()),
            ]
        );
    }

    #[test]
    fn test_session_expiry_with_skew() {
        let now = Utc::now();
        let session = |expires_at| Session {
            token: "t".to_string(),
            issued_at: now,
            expires_at,
            refresh_token: None,
        };

        assert!(!session(None).is_expired(now));
        assert!(!session(Some(now + Duration::minutes(30))).is_expired(now));
        assert!(session(Some(now + Duration::minutes(30))).is_expired(now + Duration::minutes(29)));
        assert!(session(Some(now - Duration::seconds(1))).is_expired(now));
    }

    #[test]
    fn test_short_lived_token_margin_is_capped() {
        let now = Utc::now();
        let session = Session {
            token: "t".to_string(),
            issued_at: now,
            expires_at: Some(now + Duration::seconds(20)),
            refresh_token: None,
        };

        // Margin is 10 s, half of the 20 s lifetime
        assert!(!session.is_expired(now));
        assert!(!session.is_expired(now + Duration::seconds(9)));
        assert!(session.is_expired(now + Duration::seconds(10)));
    }

    #[test]
    fn test_login_request_omits_missing_domain() {
        let body = serde_json::to_value(LoginRequest {
            username: "admin",
            password: "pw",
            auth_source: None,
        })
        .unwrap();
        assert!(body.get("authSource").is_none());

        let body = serde_json::to_value(LoginRequest {
            username: "admin",
            password: "pw",
            auth_source: Some("corp.local"),
        })
        .unwrap();
        assert_eq!(body["authSource"], "corp.local");
    }
}
