//! # aria-ops-sdk
//!
//! Async client for the Aria Operations suite API.
//!
//! The crate keeps one authenticated session per client, fetches resource
//! inventories and metric series with bounded parallelism, and reduces the
//! collected samples into a [`HealthReport`] with recommendations.
//!
//! ```rust,no_run
//! use aria_ops_sdk::{Client, Credentials, HealthReporter};
//!
//! # #[tokio::main]
//! # async fn main() -> aria_ops_sdk::Result<()> {
//! let client = Client::builder()
//!     .base_url("https://aria-ops.lab.local")
//!     .credentials(Credentials::new("admin", "secret"))
//!     .timeout_secs(30)
//!     .build()?;
//!
//! let reporter = HealthReporter::new(client);
//! let report = reporter.generate_health_report("VirtualMachine", None).await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`core`]: error taxonomy, configuration and data model
//! - [`runtime`]: transport seam, session manager, resource client, collector
//! - [`analysis`]: aggregation and recommendation rules (pure)
//! - [`report`]: health report assembly

pub mod analysis;
pub mod core;
pub mod report;
pub mod runtime;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::analysis::{
    aggregate, percentile, recommend, summarize_distribution, CategoryAggregate, Distribution,
    MetricCategory, HIGH_UTILIZATION_THRESHOLD,
};
pub use crate::core::{
    AlertFilter, AlertLevel, AlertRecord, AuthenticationError, ClientConfig, Credentials, Error,
    MetricSample, ResourceDescriptor, ResourceFetchError, ResourceFilter, Result, TimeWindow,
    TransportError,
};
pub use crate::report::{HealthReport, HealthReporter, ReportOptions};
pub use crate::runtime::{
    Client, ClientBuilder, CollectionOutcome, MetricCollector, SessionManager, SessionState,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
