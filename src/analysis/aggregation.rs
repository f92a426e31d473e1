//! Reduction of metric samples into per-category statistics
//!
//! Everything here is pure. Results do not depend on the order of the input
//! samples: values are sorted before summing so the floating point result is
//! identical for any permutation.

use crate::core::MetricSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Utilization above this value (0-100 scale) counts as high
pub const HIGH_UTILIZATION_THRESHOLD: f64 = 80.0;

/// Fixed metric categories of a health summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricCategory {
    #[serde(rename = "cpuUtilization")]
    Cpu,
    #[serde(rename = "memoryUtilization")]
    Memory,
    #[serde(rename = "diskUtilization")]
    Disk,
    #[serde(rename = "networkUtilization")]
    Network,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 4] = [
        MetricCategory::Cpu,
        MetricCategory::Memory,
        MetricCategory::Disk,
        MetricCategory::Network,
    ];

    /// Substring a metric key must contain to fall into this category
    pub fn key_pattern(&self) -> &'static str {
        match self {
            MetricCategory::Cpu => "cpu|usage",
            MetricCategory::Memory => "mem|usage",
            MetricCategory::Disk => "disk|usage",
            MetricCategory::Network => "net|usage",
        }
    }

    /// Default metric key requested for this category
    pub fn default_metric_key(&self) -> &'static str {
        match self {
            MetricCategory::Cpu => "cpu|usage_average",
            MetricCategory::Memory => "mem|usage_average",
            MetricCategory::Disk => "disk|usage_average",
            MetricCategory::Network => "net|usage_average",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::Cpu => "CPU",
            MetricCategory::Memory => "Memory",
            MetricCategory::Disk => "Disk",
            MetricCategory::Network => "Network",
        }
    }

    /// Category of `metric_key`, first match in [`ALL`](Self::ALL) order
    pub fn classify(metric_key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| metric_key.contains(category.key_pattern()))
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary statistics over one category's values
///
/// Serialized with the field names existing report consumers expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    #[serde(rename = "avg")]
    pub average: f64,
    #[serde(rename = "max")]
    pub maximum: f64,
    #[serde(rename = "resourcesOver80")]
    pub count_over_threshold: usize,
}

impl CategoryAggregate {
    /// Aggregate raw values; an empty slice yields all zeros
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let sorted = sorted(values);
        let sum: f64 = sorted.iter().sum();
        Self {
            average: sum / sorted.len() as f64,
            maximum: sorted[sorted.len() - 1],
            count_over_threshold: sorted
                .iter()
                .filter(|v| **v > HIGH_UTILIZATION_THRESHOLD)
                .count(),
        }
    }
}

/// Aggregate samples into all four categories using [`MetricCategory::classify`]
pub fn aggregate(samples: &[MetricSample]) -> BTreeMap<MetricCategory, CategoryAggregate> {
    aggregate_with(samples, MetricCategory::classify)
}

/// Aggregate with a custom classifier; unclassified samples are ignored
///
/// Every category is present in the result, zeroed when it has no samples.
pub fn aggregate_with<F>(samples: &[MetricSample], classify: F) -> BTreeMap<MetricCategory, CategoryAggregate>
where
    F: Fn(&str) -> Option<MetricCategory>,
{
    group_values(samples, classify)
        .into_iter()
        .map(|(category, values)| (category, CategoryAggregate::from_values(&values)))
        .collect()
}

/// Value at percentile `p` (0-100) using nearest rank
///
/// The index is `ceil(p / 100 * n) - 1`, clamped to the valid range.
/// Returns `None` for empty input.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    Some(percentile_of_sorted(&sorted, p))
}

/// Shape of one category's values, for analyses beyond the report summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

pub fn summarize_distribution(values: &[f64]) -> Option<Distribution> {
    if values.is_empty() {
        return None;
    }

    let sorted = sorted(values);
    let sum: f64 = sorted.iter().sum();
    Some(Distribution {
        count: sorted.len(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean: sum / sorted.len() as f64,
        p50: percentile_of_sorted(&sorted, 50.0),
        p95: percentile_of_sorted(&sorted, 95.0),
        p99: percentile_of_sorted(&sorted, 99.0),
    })
}

/// Distributions for the categories that have at least one sample
pub fn distributions_by_category(samples: &[MetricSample]) -> BTreeMap<MetricCategory, Distribution> {
    group_values(samples, MetricCategory::classify)
        .into_iter()
        .filter_map(|(category, values)| {
            summarize_distribution(&values).map(|distribution| (category, distribution))
        })
        .collect()
}

fn group_values<F>(samples: &[MetricSample], classify: F) -> BTreeMap<MetricCategory, Vec<f64>>
where
    F: Fn(&str) -> Option<MetricCategory>,
{
    let mut grouped: BTreeMap<MetricCategory, Vec<f64>> = MetricCategory::ALL
        .into_iter()
        .map(|category| (category, Vec::new()))
        .collect();

    for sample in samples {
        if let Some(category) = classify(&sample.metric_key) {
            grouped.entry(category).or_default().push(sample.value);
        }
    }
    grouped
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let clamped_index = index.saturating_sub(1).min(sorted.len() - 1);
    sorted[clamped_index]
}
