//! Response shapes of the suite API and their conversion into the data model
//!
//! Decoding fails closed: a missing required field or a malformed data point
//! is reported as a decode error, never replaced with a default.

use crate::core::error::{Error, Result};
use crate::core::types::{AlertRecord, MetricSample, ResourceDescriptor};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ResourceKeyWire {
    name: String,
    #[serde(rename = "adapterKindKey")]
    adapter_kind_key: String,
    #[serde(rename = "resourceKindKey")]
    resource_kind_key: String,
}

#[derive(Debug, Deserialize)]
struct ResourceWire {
    identifier: String,
    #[serde(rename = "resourceKey")]
    resource_key: ResourceKeyWire,
}

#[derive(Debug, Deserialize)]
struct PageInfoWire {
    #[serde(rename = "totalCount")]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResourcesResponseWire {
    #[serde(rename = "resourceList")]
    resource_list: Vec<ResourceWire>,
    #[serde(rename = "pageInfo")]
    page_info: Option<PageInfoWire>,
}

#[derive(Debug, Deserialize)]
struct StatKeyWire {
    key: String,
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatValueWire {
    #[serde(rename = "statKey")]
    stat_key: StatKeyWire,
    #[serde(default)]
    data: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct StatsResponseWire {
    #[serde(default)]
    values: Vec<StatValueWire>,
}

#[derive(Debug, Deserialize)]
struct AlertsResponseWire {
    alerts: Vec<AlertRecord>,
}

#[derive(Debug, Deserialize)]
struct LoginResponseWire {
    token: String,
    #[serde(rename = "expiresIn")]
    expires_in: Option<i64>,
    #[serde(rename = "expiresAt")]
    expires_at: Option<i64>,
    refresh_token: Option<String>,
}

/// One page of a resource listing
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePage {
    pub resources: Vec<ResourceDescriptor>,
    /// Server-reported total across all pages, when present
    pub total_count: Option<u64>,
}

/// Token material returned by the login endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
}

fn parse<T: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::decode(operation, e.to_string()))
}

pub fn decode_resource_page(body: &[u8]) -> Result<ResourcePage> {
    let wire: ResourcesResponseWire = parse("list resources", body)?;
    let resources = wire
        .resource_list
        .into_iter()
        .map(|r| {
            if r.identifier.is_empty() {
                return Err(Error::decode("list resources", "empty resource identifier"));
            }
            Ok(ResourceDescriptor {
                identifier: r.identifier,
                name: r.resource_key.name,
                kind: r.resource_key.resource_kind_key,
                adapter_kind: r.resource_key.adapter_kind_key,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ResourcePage {
        resources,
        total_count: wire.page_info.and_then(|p| p.total_count),
    })
}

pub fn decode_stats(resource_id: &str, body: &[u8]) -> Result<Vec<MetricSample>> {
    let wire: StatsResponseWire = parse("fetch metrics", body)?;
    let mut samples = Vec::new();

    for stat in wire.values {
        if stat.stat_key.key.is_empty() {
            return Err(Error::decode("fetch metrics", "empty statKey.key"));
        }
        for point in &stat.data {
            let (ts, value) = match point.as_slice() {
                [ts, value, ..] => (*ts, *value),
                _ => {
                    return Err(Error::decode(
                        "fetch metrics",
                        format!(
                            "data point for '{}' has {} element(s), expected [timestamp, value]",
                            stat.stat_key.key,
                            point.len()
                        ),
                    ))
                }
            };
            if !value.is_finite() || !ts.is_finite() {
                return Err(Error::decode(
                    "fetch metrics",
                    format!("non-finite data point for '{}'", stat.stat_key.key),
                ));
            }
            let timestamp = Utc
                .timestamp_millis_opt(ts as i64)
                .single()
                .ok_or_else(|| {
                    Error::decode("fetch metrics", format!("timestamp {} out of range", ts))
                })?;

            samples.push(MetricSample {
                resource_id: resource_id.to_string(),
                metric_key: stat.stat_key.key.clone(),
                timestamp,
                value,
                unit: stat.stat_key.unit.clone(),
            });
        }
    }

    Ok(samples)
}

pub fn decode_alerts(body: &[u8]) -> Result<Vec<AlertRecord>> {
    let wire: AlertsResponseWire = parse("list alerts", body)?;
    Ok(wire.alerts)
}

/// Decode a login response; `issued_at` anchors a relative `expiresIn`
pub fn decode_login(body: &[u8], issued_at: DateTime<Utc>) -> Result<LoginGrant> {
    let wire: LoginResponseWire = parse("acquire token", body)?;
    if wire.token.is_empty() {
        return Err(Error::decode("acquire token", "empty token"));
    }

    let expires_at = match (wire.expires_at, wire.expires_in) {
        (Some(ms), _) => Utc.timestamp_millis_opt(ms).single(),
        (None, Some(secs)) if secs > 0 => Some(issued_at + Duration::seconds(secs)),
        _ => None,
    };

    Ok(LoginGrant {
        token: wire.token,
        expires_at,
        refresh_token: wire.refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FetchCause;

    fn decode_cause(err: Error) -> String {
        match err {
            Error::ResourceFetch(e) => match e.cause {
                FetchCause::Decode(msg) => msg,
                other => panic!("Expected decode cause, got {:?}", other),
            },
            other => panic!("Expected ResourceFetch error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_resource_page() {
        let body = br#"{
            "resourceList": [
                {"identifier": "vm-001", "resourceKey": {"name": "web-01", "adapterKindKey": "VMWARE", "resourceKindKey": "VirtualMachine"}},
                {"identifier": "vm-002", "resourceKey": {"name": "web-02", "adapterKindKey": "VMWARE", "resourceKindKey": "VirtualMachine"}}
            ],
            "pageInfo": {"totalCount": 7, "page": 0, "pageSize": 2}
        }"#;
        let page = decode_resource_page(body).unwrap();
        assert_eq!(page.resources.len(), 2);
        assert_eq!(page.resources[1].name, "web-02");
        assert_eq!(page.total_count, Some(7));
    }

    #[test]
    fn test_decode_resource_page_missing_key_fails_closed() {
        let body = br#"{"resourceList": [{"identifier": "vm-001", "resourceKey": {"name": "web-01"}}]}"#;
        let msg = decode_cause(decode_resource_page(body).unwrap_err());
        assert!(msg.contains("adapterKindKey"));
    }

    #[test]
    fn test_decode_stats() {
        let body = br#"{"values": [
            {"statKey": {"key": "cpu|usage_average", "unit": "%"}, "data": [[1640995200000, 45.5], [1640995500000, 47.0]]},
            {"statKey": {"key": "mem|usage_average"}, "data": [[1640995200000, 60.0]]}
        ]}"#;
        let samples = decode_stats("vm-001", body).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].resource_id, "vm-001");
        assert_eq!(samples[0].unit.as_deref(), Some("%"));
        assert_eq!(samples[1].value, 47.0);
        assert_eq!(samples[2].metric_key, "mem|usage_average");
        assert_eq!(samples[2].unit, None);
    }

    #[test]
    fn test_decode_stats_empty_values() {
        assert!(decode_stats("vm-001", br#"{"values": []}"#).unwrap().is_empty());
        assert!(decode_stats("vm-001", br#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn test_decode_stats_short_point_fails_closed() {
        let body = br#"{"values": [{"statKey": {"key": "cpu|usage_average"}, "data": [[1640995200000]]}]}"#;
        let msg = decode_cause(decode_stats("vm-001", body).unwrap_err());
        assert!(msg.contains("expected [timestamp, value]"));
    }

    #[test]
    fn test_decode_stats_malformed_json() {
        let msg = decode_cause(decode_stats("vm-001", b"<html>oops</html>").unwrap_err());
        assert!(!msg.is_empty());
    }

    #[test]
    fn test_decode_login_expiry_variants() {
        let issued = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let grant = decode_login(br#"{"token": "abc", "expiresIn": 1800}"#, issued).unwrap();
        assert_eq!(grant.expires_at, Some(issued + Duration::seconds(1800)));

        let grant =
            decode_login(br#"{"token": "abc", "expiresAt": 1700000600000}"#, issued).unwrap();
        assert_eq!(
            grant.expires_at,
            Some(Utc.timestamp_millis_opt(1_700_000_600_000).unwrap())
        );

        let grant = decode_login(br#"{"token": "abc", "refresh_token": "r"}"#, issued).unwrap();
        assert_eq!(grant.expires_at, None);
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));

        assert!(decode_login(br#"{"token": ""}"#, issued).is_err());
        assert!(decode_login(br#"{"expiresIn": 10}"#, issued).is_err());
    }
}
