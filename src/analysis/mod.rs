//! Pure analysis of collected samples and alerts
//!
//! No I/O happens here; every function is deterministic for its input.

pub mod aggregation;
pub mod recommendations;


pub use aggregation::{
    aggregate, aggregate_with, distributions_by_category, percentile, summarize_distribution,
    CategoryAggregate, Distribution, MetricCategory, HIGH_UTILIZATION_THRESHOLD,
};
pub use recommendations::{count_critical, recommend, NORMAL_OPERATION};
