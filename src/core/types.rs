use crate::core::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login identity, supplied once when a client is built
///
/// The password is never printed; `Debug` redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
    pub domain: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            domain: None,
        }
    }

    /// Set the authentication source (directory domain) used at login
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// One monitored object as returned by a single listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub identifier: String,
    pub name: String,
    #[serde(rename = "resourceKind")]
    pub kind: String,
    pub adapter_kind: String,
}

/// One rolled-up metric value for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub resource_id: String,
    /// Namespaced key such as `cpu|usage_average`
    pub metric_key: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Alert severity as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    #[serde(alias = "INFORMATION")]
    Info,
    #[serde(alias = "IMMEDIATE")]
    Warning,
    Critical,
}

impl AlertLevel {
    /// Value used for the `alertCriticality` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active alert snapshot
///
/// The serialized form uses the server's field names, so the same shape is
/// decoded from the alerts endpoint and written into reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "alertId")]
    pub id: String,
    #[serde(rename = "alertLevel")]
    pub level: AlertLevel,
    pub status: String,
    #[serde(rename = "resourceId")]
    pub resource_id: String,
    #[serde(rename = "startTimeUTC", with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "updateTimeUTC", with = "chrono::serde::ts_milliseconds")]
    pub update_time: DateTime<Utc>,
}

impl AlertRecord {
    pub fn is_critical(&self) -> bool {
        self.level == AlertLevel::Critical
    }
}

/// Closed time interval for a metric query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `start >= end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::configuration(format!(
                "time window start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window ending now and spanning `length`
    pub fn last(length: Duration) -> Self {
        let end = Utc::now();
        Self {
            start: end - length,
            end,
        }
    }

    pub fn begin_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// Filter for resource listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub kind: Option<String>,
    pub name_pattern: Option<String>,
    pub page_size: Option<u32>,
}

impl ResourceFilter {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Filter for alert listings; active alerts only are ever requested
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub severity: Option<AlertLevel>,
    pub kind: Option<String>,
}

impl AlertFilter {
    pub fn severity(level: AlertLevel) -> Self {
        Self {
            severity: Some(level),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Replace control characters so caller-supplied text cannot forge log lines
pub fn sanitize_for_log(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0x1f || (0x7f..=0x9f).contains(&code) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2").with_domain("corp.local");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(debug.contains("corp.local"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_alert_level_aliases() {
        let level: AlertLevel = serde_json::from_str("\"INFORMATION\"").unwrap();
        assert_eq!(level, AlertLevel::Info);
        let level: AlertLevel = serde_json::from_str("\"IMMEDIATE\"").unwrap();
        assert_eq!(level, AlertLevel::Warning);
        let level: AlertLevel = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(level, AlertLevel::Critical);
        assert!(serde_json::from_str::<AlertLevel>("\"SEVERE\"").is_err());
    }

    #[test]
    fn test_alert_record_decoding_requires_fields() {
        let json = r#"{
            "alertId": "a-1",
            "alertLevel": "CRITICAL",
            "status": "ACTIVE",
            "resourceId": "vm-001",
            "startTimeUTC": 1640995200000,
            "updateTimeUTC": 1640995500000
        }"#;
        let alert: AlertRecord = serde_json::from_str(json).unwrap();
        assert!(alert.is_critical());
        assert_eq!(
            alert.start_time,
            Utc.timestamp_millis_opt(1640995200000).unwrap()
        );

        let missing = r#"{"alertId": "a-2", "alertLevel": "WARNING", "status": "ACTIVE"}"#;
        assert!(serde_json::from_str::<AlertRecord>(missing).is_err());
    }

    #[test]
    fn test_time_window_rejects_inverted_range() {
        let now = Utc::now();
        assert!(TimeWindow::new(now, now).is_err());
        assert!(TimeWindow::new(now, now - Duration::minutes(1)).is_err());

        let window = TimeWindow::new(now - Duration::hours(1), now).unwrap();
        assert_eq!(window.end_millis() - window.begin_millis(), 3_600_000);
    }

    #[test]
    fn test_resource_descriptor_serialization() {
        let resource = ResourceDescriptor {
            identifier: "vm-001".to_string(),
            name: "web-01".to_string(),
            kind: "VirtualMachine".to_string(),
            adapter_kind: "VMWARE".to_string(),
        };
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["resourceKind"], "VirtualMachine");
        assert_eq!(value["adapterKind"], "VMWARE");
    }

    #[test]
    fn test_sanitize_for_log() {
        assert_eq!(sanitize_for_log("vm-001"), "vm-001");
        assert_eq!(
            sanitize_for_log("vm\n2024 INFO forged"),
            "vm_2024 INFO forged"
        );
        assert_eq!(sanitize_for_log("a\r\tb\u{7f}c\u{85}"), "a__b_c_");
    }
}
