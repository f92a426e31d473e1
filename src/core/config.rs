use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Largest concurrency cap the collector accepts
pub const MAX_CONCURRENCY: usize = 64;

/// Connection and collection settings for a [`Client`](crate::Client)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the appliance, e.g. `https://aria-ops.lab.local`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the suite API
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Scheme placed before the token in the `Authorization` header
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Verify the server certificate
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Refuse plain-http base URLs
    #[serde(default = "default_true")]
    pub require_https: bool,

    /// Host allowlist; empty means any host
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Page size used when listing resources
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on resource pages followed in one listing
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Metric fetches allowed in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Resources whose metrics are collected for one report
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Alerts copied into a report
    #[serde(default = "default_top_alerts")]
    pub top_alerts_limit: usize,

    /// Resource descriptors copied into a report
    #[serde(default = "default_resource_sample")]
    pub resource_sample_limit: usize,

    /// Report window used when the caller passes none
    #[serde(default = "default_window_minutes")]
    pub default_window_minutes: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            auth_scheme: default_auth_scheme(),
            timeout_secs: default_timeout(),
            verify_tls: default_true(),
            require_https: default_true(),
            allowed_hosts: Vec::new(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            batch_limit: default_batch_limit(),
            top_alerts_limit: default_top_alerts(),
            resource_sample_limit: default_resource_sample(),
            default_window_minutes: default_window_minutes(),
        }
    }
}

impl ClientConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let url = self.parsed_base_url()?;

        if self.require_https && url.scheme() != "https" {
            return Err(Error::configuration(format!(
                "base_url must use https, got '{}'",
                url.scheme()
            )));
        }

        if !self.allowed_hosts.is_empty() {
            let host = url.host_str().unwrap_or_default();
            if !self.allowed_hosts.iter().any(|allowed| allowed == host) {
                return Err(Error::configuration(format!(
                    "host '{}' is not in allowed_hosts",
                    host
                )));
            }
        }

        if self.auth_scheme.trim().is_empty() {
            return Err(Error::configuration("auth_scheme must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::configuration("timeout_secs must be greater than zero"));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(Error::configuration(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }
        if self.page_size == 0 {
            return Err(Error::configuration("page_size must be greater than zero"));
        }
        if self.max_pages == 0 {
            return Err(Error::configuration("max_pages must be greater than zero"));
        }
        if self.batch_limit == 0 {
            return Err(Error::configuration("batch_limit must be greater than zero"));
        }

        Ok(())
    }

    /// Base URL with any trailing slash removed
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Absolute URL of an API path such as `/resources`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.normalized_base_url(),
            self.api_prefix.trim_end_matches('/'),
            path
        )
    }

    fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(self.normalized_base_url())
            .map_err(|e| Error::configuration(format!("invalid base_url '{}': {}", self.base_url, e)))?;
        if url.host_str().is_none() {
            return Err(Error::configuration(format!(
                "base_url '{}' has no host",
                self.base_url
            )));
        }
        Ok(url)
    }
}

// Helper functions for default values
fn default_base_url() -> String {
    "https://aria-ops.lab.local".to_string()
}

fn default_api_prefix() -> String {
    "/suite-api/api".to_string()
}

fn default_auth_scheme() -> String {
    "vRealizeOpsToken".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    50
}

fn default_max_pages() -> u32 {
    100
}

fn default_concurrency() -> usize {
    4
}

fn default_batch_limit() -> usize {
    10
}

fn default_top_alerts() -> usize {
    5
}

fn default_resource_sample() -> usize {
    10
}

fn default_window_minutes() -> u32 {
    60
}
