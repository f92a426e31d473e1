//! Health report assembly
//!
//! [`HealthReporter`] gathers the inventory, collects metrics for the first
//! `batch_limit` resources, queries active alerts and hands everything to
//! [`assemble_report`], which performs no I/O.
//!
//! Only a failure to list resources fails a report. Metric and alert failures
//! are logged and recorded in [`HealthReport::warnings`].

use crate::analysis::{aggregate, count_critical, recommend, CategoryAggregate, MetricCategory};
use crate::core::{
    sanitize_for_log, AlertFilter, AlertRecord, ClientConfig, Error, ResourceDescriptor,
    ResourceFilter, Result, TimeWindow,
};
use crate::runtime::{Client, CollectionOutcome, MetricCollector, MetricSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(test)]
mod report_test;

/// Warning recorded when the resource listing came back empty
pub const NO_RESOURCES_WARNING: &str = "no resources matched";

/// Everything a report needs from the remote side
#[async_trait]
pub trait HealthDataSource: MetricSource {
    async fn list_resources(&self, filter: &ResourceFilter) -> Result<Vec<ResourceDescriptor>>;

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>>;
}

#[async_trait]
impl HealthDataSource for Client {
    async fn list_resources(&self, filter: &ResourceFilter) -> Result<Vec<ResourceDescriptor>> {
        Client::list_resources(self, filter).await
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>> {
        Client::list_alerts(self, filter).await
    }
}

/// Immutable snapshot of environment health
///
/// Field names in the JSON form are fixed; existing consumers read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub resource_kind: String,
    pub total_resources: usize,
    pub resources_analyzed: usize,
    pub active_alerts: usize,
    pub metrics_summary: BTreeMap<MetricCategory, CategoryAggregate>,
    pub top_alerts: Vec<AlertRecord>,
    pub recommendations: Vec<String>,
    pub resource_details: Vec<ResourceDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl HealthReport {
    pub fn summary_for(&self, category: MetricCategory) -> CategoryAggregate {
        self.metrics_summary
            .get(&category)
            .copied()
            .unwrap_or_default()
    }

    /// Critical alerts among `top_alerts`; alerts past that cut are not counted
    pub fn critical_in_top_alerts(&self) -> usize {
        count_critical(&self.top_alerts)
    }

    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Limits and inputs of one report run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub batch_limit: usize,
    pub top_alerts_limit: usize,
    pub resource_sample_limit: usize,
    pub concurrency: usize,
    pub window_minutes: u32,
    pub metric_keys: Vec<String>,
}

impl ReportOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            batch_limit: config.batch_limit,
            top_alerts_limit: config.top_alerts_limit,
            resource_sample_limit: config.resource_sample_limit,
            concurrency: config.concurrency,
            window_minutes: config.default_window_minutes,
            metric_keys: MetricCategory::ALL
                .iter()
                .map(|category| category.default_metric_key().to_string())
                .collect(),
        }
    }

    pub fn with_window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = minutes;
        self
    }

    pub fn with_metric_keys(mut self, keys: Vec<String>) -> Self {
        self.metric_keys = keys;
        self
    }

    fn default_window(&self) -> TimeWindow {
        TimeWindow::last(Duration::minutes(i64::from(self.window_minutes.max(1))))
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Data gathered for one report, ready to be assembled
#[derive(Debug, Clone)]
pub struct ReportInputs<'a> {
    pub resource_kind: &'a str,
    pub resources: &'a [ResourceDescriptor],
    pub collection: &'a CollectionOutcome,
    pub alerts: &'a [AlertRecord],
    /// Warnings not tied to a resource, in the order they occurred
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Build a report from gathered data without any I/O
pub fn assemble_report(inputs: ReportInputs<'_>, options: &ReportOptions) -> HealthReport {
    let metrics_summary = aggregate(&inputs.collection.samples);
    let recommendations = recommend(&metrics_summary, count_critical(inputs.alerts));

    let mut warnings = Vec::new();
    if inputs.resources.is_empty() {
        warnings.push(NO_RESOURCES_WARNING.to_string());
    }
    warnings.extend(inputs.collection.warnings.iter().map(|w| {
        format!("metrics unavailable for resource {}: {}", w.resource_id, w.message)
    }));
    warnings.extend(inputs.warnings);

    HealthReport {
        generated_at: inputs.generated_at,
        resource_kind: inputs.resource_kind.to_string(),
        total_resources: inputs.resources.len(),
        resources_analyzed: inputs.resources.len().min(options.batch_limit),
        active_alerts: inputs.alerts.len(),
        metrics_summary,
        top_alerts: inputs
            .alerts
            .iter()
            .take(options.top_alerts_limit)
            .cloned()
            .collect(),
        recommendations,
        resource_details: inputs
            .resources
            .iter()
            .take(options.resource_sample_limit)
            .cloned()
            .collect(),
        warnings,
    }
}

/// Produces [`HealthReport`]s from a [`HealthDataSource`]
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
/// let report = HealthReporter::new(client)
///     .generate_health_report("HostSystem", None)
///     .await?;
/// for line in &report.recommendations {
///     println!("- {}", line);
/// }
/// # Ok(())
/// # }
/// ```
pub struct HealthReporter<S: ?Sized = Client> {
    source: Arc<S>,
    options: ReportOptions,
}

impl HealthReporter<Client> {
    /// Reporter using the limits from the client's configuration
    pub fn new(client: Client) -> Self {
        let options = ReportOptions::from_config(client.config());
        Self {
            source: Arc::new(client),
            options,
        }
    }
}

impl<S> HealthReporter<S>
where
    S: HealthDataSource + ?Sized,
{
    pub fn with_source(source: Arc<S>, options: ReportOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn with_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    /// Generate a report for `resource_kind` over `window`
    ///
    /// Without a window the last `window_minutes` are used.
    ///
    /// # Errors
    ///
    /// Fails only if the resource list cannot be obtained or the options are
    /// invalid. Metric and alert failures become warnings.
    pub async fn generate_health_report(
        &self,
        resource_kind: &str,
        window: Option<TimeWindow>,
    ) -> Result<HealthReport> {
        self.generate_health_report_with_cancel(resource_kind, window, &CancellationToken::new())
            .await
    }

    /// Like [`generate_health_report`](Self::generate_health_report), but
    /// abandons all work when `cancel` fires
    pub async fn generate_health_report_with_cancel(
        &self,
        resource_kind: &str,
        window: Option<TimeWindow>,
        cancel: &CancellationToken,
    ) -> Result<HealthReport> {
        let collector = MetricCollector::new(Arc::clone(&self.source), self.options.concurrency)?;
        let window = window.unwrap_or_else(|| self.options.default_window());
        info!(
            "Generating health report for {}",
            sanitize_for_log(resource_kind)
        );

        let filter = ResourceFilter::kind(resource_kind);
        let resources = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            resources = self.source.list_resources(&filter) => resources?,
        };
        if resources.is_empty() {
            warn!(
                "No resources of kind {} found",
                sanitize_for_log(resource_kind)
            );
        }

        let batch: Vec<String> = resources
            .iter()
            .take(self.options.batch_limit)
            .map(|resource| resource.identifier.clone())
            .collect();
        let collection = collector
            .collect_with_cancel(&batch, &self.options.metric_keys, &window, cancel)
            .await?;

        let mut warnings = Vec::new();
        let alert_filter = AlertFilter::default();
        let alerts = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            alerts = self.source.list_alerts(&alert_filter) => match alerts {
                Ok(alerts) => alerts,
                Err(e) => {
                    warn!("Failed to get alerts, continuing without them: {}", e);
                    warnings.push(format!("alerts unavailable: {}", e));
                    Vec::new()
                }
            },
        };

        let report = assemble_report(
            ReportInputs {
                resource_kind,
                resources: &resources,
                collection: &collection,
                alerts: &alerts,
                warnings,
                generated_at: Utc::now(),
            },
            &self.options,
        );
        info!(
            "Health report generated: {} resources, {} analyzed, {} active alerts",
            report.total_resources, report.resources_analyzed, report.active_alerts
        );
        Ok(report)
    }
}
