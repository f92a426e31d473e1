//! Network side of the SDK: transport, session, typed client, collector

pub mod client;
pub mod collector;
pub mod session;
pub mod transport;


pub use client::{Client, ClientBuilder};
pub use collector::{CollectionOutcome, CollectionWarning, MetricCollector, MetricSource};
pub use session::{ApiRequest, SessionInfo, SessionManager, SessionState};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
