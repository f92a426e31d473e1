//! Error taxonomy, configuration and data model shared by every layer

pub mod config;
pub mod error;
pub mod types;
pub mod wire;

pub use config::ClientConfig;
pub use error::{AuthenticationError, Error, FetchCause, ResourceFetchError, Result, TransportError};
pub use types::{
    sanitize_for_log, AlertFilter, AlertLevel, AlertRecord, Credentials, MetricSample,
    ResourceDescriptor, ResourceFilter, TimeWindow,
};
