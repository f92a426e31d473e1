//! Bounded fan-out of metric fetches across many resources
//!
//! One resource failing never aborts a batch: it contributes no samples and
//! a [`CollectionWarning`]. Cancelling a batch discards everything collected
//! so far.

use crate::core::config::MAX_CONCURRENCY;
use crate::core::{sanitize_for_log, Error, MetricSample, Result, TimeWindow};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Anything that can fetch metric samples for one resource
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch_metrics(
        &self,
        resource_id: &str,
        metric_keys: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<MetricSample>>;
}

/// A resource whose metrics could not be collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionWarning {
    pub resource_id: String,
    pub message: String,
}

/// Result of one collection batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionOutcome {
    /// Samples of every resource that succeeded, in completion order
    pub samples: Vec<MetricSample>,
    pub warnings: Vec<CollectionWarning>,
    pub attempted: usize,
    pub succeeded: usize,
}

/// Fetches metrics for many resources with at most `concurrency` in flight
pub struct MetricCollector<S: ?Sized> {
    source: Arc<S>,
    concurrency: usize,
}

impl<S: ?Sized> std::fmt::Debug for MetricCollector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricCollector")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<S: ?Sized> Clone for MetricCollector<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            concurrency: self.concurrency,
        }
    }
}

impl<S> MetricCollector<S>
where
    S: MetricSource + ?Sized,
{
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] unless `1 <= concurrency <= 64`.
    pub fn new(source: Arc<S>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(Error::configuration(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, concurrency
            )));
        }
        Ok(Self {
            source,
            concurrency,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch `metric_keys` for every resource, each attempted exactly once
    pub async fn collect(
        &self,
        resource_ids: &[String],
        metric_keys: &[String],
        window: &TimeWindow,
    ) -> CollectionOutcome {
        debug!(
            "Collecting metrics for {} resources, concurrency {}",
            resource_ids.len(),
            self.concurrency
        );

        let source = &*self.source;
        let mut fetches = stream::iter(resource_ids)
            .map(|id| async move { (id, source.fetch_metrics(id, metric_keys, window).await) })
            .buffer_unordered(self.concurrency);

        let mut outcome = CollectionOutcome {
            attempted: resource_ids.len(),
            ..Default::default()
        };
        while let Some((id, result)) = fetches.next().await {
            match result {
                Ok(samples) => {
                    outcome.succeeded += 1;
                    outcome.samples.extend(samples);
                }
                Err(e) => {
                    warn!(
                        "Failed to get metrics for resource {}: {}",
                        sanitize_for_log(id),
                        e
                    );
                    outcome.warnings.push(CollectionWarning {
                        resource_id: id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Collected {} samples from {}/{} resources",
            outcome.samples.len(),
            outcome.succeeded,
            outcome.attempted
        );
        outcome
    }

    /// Like [`collect`](Self::collect), but stops as soon as `cancel` fires
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`]; partial results are dropped.
    pub async fn collect_with_cancel(
        &self,
        resource_ids: &[String],
        metric_keys: &[String],
        window: &TimeWindow,
        cancel: &CancellationToken,
    ) -> Result<CollectionOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Metric collection cancelled");
                Err(Error::Cancelled)
            }
            outcome = self.collect(resource_ids, metric_keys, window) => Ok(outcome),
        }
    }
}
