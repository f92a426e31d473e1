use thiserror::Error;

/// Failure of the login exchange itself.
///
/// `status` is `None` when the request never produced an HTTP response
/// (connection refused, timeout, TLS failure). The type is `Clone` because a
/// single login attempt may be awaited by many callers at once and each of
/// them receives the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe_login_failure(.status, .body))]
pub struct AuthenticationError {
    pub status: Option<u16>,
    pub body: String,
}

impl AuthenticationError {
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
        }
    }

    pub fn transport(err: &TransportError) -> Self {
        Self {
            status: None,
            body: err.to_string(),
        }
    }
}

fn describe_login_failure(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(status) => format!("login rejected with status {}: {}", status, body),
        None => format!("login request failed: {}", body),
    }
}

/// Network-level failure reported by the transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Why a typed API call could not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// Non-2xx response after the session manager gave up
    #[error("failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Body was not valid JSON or lacked a required field
    #[error("returned an undecodable body: {0}")]
    Decode(String),
}

/// Failure of one resource, metric or alert call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} {cause}")]
pub struct ResourceFetchError {
    pub operation: String,
    pub cause: FetchCause,
}

/// Error type for every fallible operation in the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Authorization expired: {method} {path} was rejected again after re-authentication")]
    AuthorizationExpired { method: String, path: String },

    #[error("Resource fetch error: {0}")]
    ResourceFetch(#[from] ResourceFetchError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a decode failure for the named operation
    pub fn decode<O: Into<String>, S: Into<String>>(operation: O, msg: S) -> Self {
        Self::ResourceFetch(ResourceFetchError {
            operation: operation.into(),
            cause: FetchCause::Decode(msg.into()),
        })
    }

    /// Create a status failure for the named operation
    pub fn status<O: Into<String>, S: Into<String>>(operation: O, status: u16, body: S) -> Self {
        Self::ResourceFetch(ResourceFetchError {
            operation: operation.into(),
            cause: FetchCause::Status {
                status,
                body: body.into(),
            },
        })
    }

    /// Check if a caller may reasonably try this operation again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::ResourceFetch(e) => matches!(
                e.cause,
                FetchCause::Status { status, .. } if (500..=599).contains(&status)
            ),
            _ => false,
        }
    }

    /// Check if the session could not be (re)established or was refused
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::AuthorizationExpired { .. }
        )
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Authentication(err) if err.status.is_none() => format!(
                "Could not reach the login endpoint: {}. Check the host name, network and TLS settings.",
                err.body
            ),
            Self::Authentication(err) => format!(
                "Login was refused ({}). Check the username, password and authentication source.",
                err.status.unwrap_or_default()
            ),
            Self::AuthorizationExpired { .. } => {
                "The server keeps rejecting fresh tokens. Check that the account has API access."
                    .to_string()
            }
            Self::Transport(TransportError::Timeout) => {
                "The request timed out. Try a larger --timeout value.".to_string()
            }
            Self::Configuration(msg) => {
                format!("Invalid configuration: {}. Run 'aria-health config show' to inspect it.", msg)
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
