use crate::core::wire::{decode_alerts, decode_resource_page, decode_stats};
use crate::core::{
    sanitize_for_log, AlertFilter, AlertRecord, ClientConfig, Credentials, Error, MetricSample,
    ResourceDescriptor, ResourceFilter, Result, TimeWindow,
};
use crate::runtime::collector::MetricSource;
use crate::runtime::session::{ApiRequest, SessionInfo, SessionManager, SessionState};
use crate::runtime::transport::{ReqwestTransport, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Server-side rollup requested with every stats query
const ROLLUP_TYPE: &str = "AVG";
const INTERVAL_TYPE: &str = "MINUTES";
const INTERVAL_QUANTIFIER: &str = "5";

/// Typed client for the Aria Operations suite API
///
/// Every call goes through the client's [`SessionManager`], so tokens are
/// acquired lazily, shared between concurrent calls and renewed once when the
/// server rejects them. Cloning a `Client` is cheap and clones share the
/// session.
///
/// # Examples
///
/// ```rust,no_run
/// # use aria_ops_sdk::*;
/// # #[tokio::main]
/// # async fn main() -> aria_ops_sdk::Result<()> {
/// let client = Client::builder()
///     .base_url("https://aria-ops.lab.local")
///     .credentials(Credentials::new("admin", "secret"))
///     .build()?;
///
/// let vms = client
///     .list_resources(&ResourceFilter::kind("VirtualMachine"))
///     .await?;
/// println!("{} virtual machines", vms.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    session: Arc<SessionManager>,
}

impl Client {
    /// Create a client that talks HTTPS through `reqwest`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `config` does not validate.
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config)?;
        Self::with_transport(config, credentials, Arc::new(transport))
    }

    /// Create a client on top of a caller-supplied transport
    pub fn with_transport(
        config: ClientConfig,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        if credentials.username.trim().is_empty() {
            return Err(Error::configuration("username must not be empty"));
        }

        let config = Arc::new(config);
        let session = Arc::new(SessionManager::new(
            transport,
            Arc::clone(&config),
            credentials,
        ));
        Ok(Self { config, session })
    }

    /// Create a new client builder for fluent configuration
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session manager shared by this client and its clones
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Log in now instead of on first use, replacing any current token
    pub async fn authenticate(&self) -> Result<SessionInfo> {
        self.session.authenticate().await
    }

    /// List resources matching `filter`, following pages until exhausted
    ///
    /// Paging stops when the server-reported total is reached, a page comes
    /// back short, or `max_pages` pages have been read.
    ///
    /// # Errors
    ///
    /// Any page failing to load or decode fails the whole listing.
    pub async fn list_resources(&self, filter: &ResourceFilter) -> Result<Vec<ResourceDescriptor>> {
        let page_size = filter.page_size.unwrap_or(self.config.page_size);
        if page_size == 0 {
            return Err(Error::configuration("page_size must be greater than zero"));
        }

        let mut resources = Vec::new();
        for page in 0..self.config.max_pages {
            let mut request = ApiRequest::get("/resources");
            if let Some(kind) = &filter.kind {
                request = request.query("resourceKind", kind.as_str());
            }
            if let Some(pattern) = &filter.name_pattern {
                request = request.query("name", pattern.as_str());
            }
            let request = request
                .query("pageSize", page_size.to_string())
                .query("page", page.to_string());

            let body = self.get("list resources", &request).await?;
            let batch = decode_resource_page(&body)?;
            let received = batch.resources.len();
            resources.extend(batch.resources);

            let reached_total = batch
                .total_count
                .map(|total| resources.len() as u64 >= total)
                .unwrap_or(false);
            if reached_total || received < page_size as usize {
                break;
            }
            if page + 1 == self.config.max_pages {
                warn!(
                    "Stopped listing resources after {} pages; results may be incomplete",
                    self.config.max_pages
                );
            }
        }

        info!(
            "Retrieved {} resources of kind {}",
            resources.len(),
            sanitize_for_log(filter.kind.as_deref().unwrap_or("*"))
        );
        Ok(resources)
    }

    /// Fetch 5-minute average rollups of `metric_keys` for one resource
    ///
    /// Duplicate keys are requested once. A resource with no data in the
    /// window yields an empty vector.
    pub async fn fetch_metrics(
        &self,
        resource_id: &str,
        metric_keys: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<MetricSample>> {
        if resource_id.is_empty() {
            return Err(Error::configuration("resource id must not be empty"));
        }
        if metric_keys.is_empty() {
            return Err(Error::configuration("at least one metric key is required"));
        }

        let mut seen = HashSet::new();
        let mut request = ApiRequest::get("/resources")
            .segment(resource_id)
            .segment("stats");
        for key in metric_keys.iter().filter(|k| seen.insert(k.as_str())) {
            request = request.query("statKey", key.as_str());
        }
        let request = request
            .query("begin", window.begin_millis().to_string())
            .query("end", window.end_millis().to_string())
            .query("rollUpType", ROLLUP_TYPE)
            .query("intervalType", INTERVAL_TYPE)
            .query("intervalQuantifier", INTERVAL_QUANTIFIER);

        let body = self.get("fetch metrics", &request).await?;
        let samples = decode_stats(resource_id, &body)?;
        debug!(
            "Fetched {} samples for resource {}",
            samples.len(),
            sanitize_for_log(resource_id)
        );
        Ok(samples)
    }

    /// List active alerts, optionally narrowed by severity and resource kind
    pub async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>> {
        let mut request = ApiRequest::get("/alerts").query("activeOnly", "true");
        if let Some(level) = filter.severity {
            request = request.query("alertCriticality", level.as_str());
        }
        if let Some(kind) = &filter.kind {
            request = request.query("resourceKind", kind.as_str());
        }

        let body = self.get("list alerts", &request).await?;
        let alerts = decode_alerts(&body)?;
        info!("Retrieved {} active alerts", alerts.len());
        Ok(alerts)
    }

    async fn get(&self, operation: &str, request: &ApiRequest) -> Result<Bytes> {
        let response = self.session.execute_with_retry(request).await?;
        if !response.is_success() {
            warn!("{} failed with status {}", operation, response.status);
            return Err(Error::status(
                operation,
                response.status,
                response.body_text(),
            ));
        }
        Ok(response.body)
    }
}

#[async_trait]
impl MetricSource for Client {
    async fn fetch_metrics(
        &self,
        resource_id: &str,
        metric_keys: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<MetricSample>> {
        Client::fetch_metrics(self, resource_id, metric_keys, window).await
    }
}

/// Builder for creating `Client` instances with fluent configuration
///
/// Starts from [`ClientConfig::default`]; credentials are required.
///
/// # Examples
///
/// ```rust,no_run
/// # use aria_ops_sdk::*;
/// # fn main() -> aria_ops_sdk::Result<()> {
/// let client = Client::builder()
///     .base_url("https://aria-ops.lab.local")
///     .credentials(Credentials::new("admin", "secret").with_domain("corp.local"))
///     .timeout_secs(60)
///     .concurrency(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    credentials: Option<Credentials>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new client builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration directly
    ///
    /// Later builder calls still override individual fields.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the per-request timeout in seconds
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use aria_ops_sdk::*;
    /// let builder = Client::builder()
    ///     .timeout_secs(120);  // 2 minute timeout
    /// ```
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Accept invalid certificates when `false`
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    pub fn require_https(mut self, require: bool) -> Self {
        self.config.require_https = require;
        self
    }

    /// Restrict the hosts a client may be pointed at
    pub fn allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.config.allowed_hosts = hosts;
        self
    }

    /// Cap on metric fetches in flight during collection
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn batch_limit(mut self, batch_limit: usize) -> Self {
        self.config.batch_limit = batch_limit;
        self
    }

    /// Use a custom transport instead of `reqwest`
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and build the client
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if credentials are missing or the
    /// configuration does not validate.
    pub fn build(self) -> Result<Client> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::configuration("credentials are required"))?;

        match self.transport {
            Some(transport) => Client::with_transport(self.config, credentials, transport),
            None => Client::new(self.config, credentials),
        }
    }
}
