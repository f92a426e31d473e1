//! HTTP transport seam
//!
//! The session manager only needs "send this request, give me status and
//! body". Keeping that behind a trait lets tests script responses without a
//! server and keeps TLS and timeout policy in one place.

use crate::core::{ClientConfig, Error, Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// User agent for API requests
pub const USER_AGENT: &str = concat!("aria-ops-sdk/", env!("CARGO_PKG_VERSION"));

/// HTTP method subset used by the suite API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

/// Raw response; status is not interpreted by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401 and 403 both mean the token was not accepted
    pub fn is_auth_rejection(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Body as text, lossy, for error messages
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues exactly one HTTP exchange per call, no retries
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport honouring the timeout and TLS settings of `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Wrap an existing `reqwest` client
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.http_client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_classification() {
        let response = |status| HttpResponse {
            status,
            headers: Vec::new(),
            body: Bytes::from_static(b"denied"),
        };

        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(302).is_success());
        assert!(response(401).is_auth_rejection());
        assert!(response(403).is_auth_rejection());
        assert!(!response(404).is_auth_rejection());
        assert_eq!(response(500).body_text(), "denied");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("aria-ops-sdk/"));
    }

    #[test]
    fn test_transport_from_config() {
        let config = ClientConfig {
            verify_tls: false,
            ..Default::default()
        };
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = ClientConfig {
            timeout_secs: 2,
            ..Default::default()
        };
        let transport = ReqwestTransport::from_config(&config).unwrap();
        let result = transport
            .send(HttpRequest {
                method: Method::Get,
                url: "http://127.0.0.1:1/suite-api/api/resources".to_string(),
                headers: Vec::new(),
                body: None,
            })
            .await;

        assert!(result.is_err());
    }
}
