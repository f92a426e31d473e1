use super::*;
use crate::analysis::NORMAL_OPERATION;
use crate::core::{AlertLevel, Credentials, MetricSample};
use crate::runtime::CollectionWarning;
use chrono::TimeZone;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory data source with per-resource metric values
#[derive(Default)]
struct FakeSource {
    resources: Vec<ResourceDescriptor>,
    metrics: HashMap<String, Vec<(&'static str, f64)>>,
    alerts: Vec<AlertRecord>,
    failing_metrics: HashSet<String>,
    fail_resources: bool,
    fail_alerts: bool,
    metric_delay: Option<std::time::Duration>,
    fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl MetricSource for FakeSource {
    async fn fetch_metrics(
        &self,
        resource_id: &str,
        _metric_keys: &[String],
        _window: &TimeWindow,
    ) -> Result<Vec<MetricSample>> {
        self.fetched.lock().push(resource_id.to_string());
        if let Some(delay) = self.metric_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_metrics.contains(resource_id) {
            return Err(Error::status("fetch metrics", 404, "no such resource"));
        }
        Ok(self
            .metrics
            .get(resource_id)
            .map(|values| {
                values
                    .iter()
                    .map(|(key, value)| MetricSample {
                        resource_id: resource_id.to_string(),
                        metric_key: key.to_string(),
                        timestamp: Utc::now(),
                        value: *value,
                        unit: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl HealthDataSource for FakeSource {
    async fn list_resources(&self, _filter: &ResourceFilter) -> Result<Vec<ResourceDescriptor>> {
        if self.fail_resources {
            return Err(Error::status("list resources", 500, "down"));
        }
        Ok(self.resources.clone())
    }

    async fn list_alerts(&self, _filter: &AlertFilter) -> Result<Vec<AlertRecord>> {
        if self.fail_alerts {
            return Err(Error::status("list alerts", 502, "bad gateway"));
        }
        Ok(self.alerts.clone())
    }
}

fn resource(id: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        identifier: id.to_string(),
        name: format!("{}-name", id),
        kind: "VirtualMachine".to_string(),
        adapter_kind: "VMWARE".to_string(),
    }
}

fn alert(id: &str, level: AlertLevel) -> AlertRecord {
    AlertRecord {
        id: id.to_string(),
        level,
        status: "ACTIVE".to_string(),
        resource_id: "vm-1".to_string(),
        start_time: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        update_time: Utc.timestamp_millis_opt(1_700_000_300_000).unwrap(),
    }
}

fn reporter(source: FakeSource) -> (Arc<FakeSource>, HealthReporter<FakeSource>) {
    let source = Arc::new(source);
    let reporter = HealthReporter::with_source(Arc::clone(&source), ReportOptions::default());
    (source, reporter)
}

#[tokio::test]
async fn test_two_resource_scenario() {
    let mut metrics = HashMap::new();
    metrics.insert(
        "A".to_string(),
        vec![("cpu|usage_average", 90.0), ("mem|usage_average", 50.0)],
    );
    metrics.insert(
        "B".to_string(),
        vec![("cpu|usage_average", 60.0), ("mem|usage_average", 85.0)],
    );
    let (_, reporter) = reporter(FakeSource {
        resources: vec![resource("A"), resource("B")],
        metrics,
        ..Default::default()
    });

    let report = reporter
        .generate_health_report("VirtualMachine", None)
        .await
        .unwrap();

    let cpu = report.summary_for(MetricCategory::Cpu);
    assert_eq!(cpu.count_over_threshold, 1);
    assert_eq!(cpu.average, 75.0);
    assert_eq!(
        report.summary_for(MetricCategory::Memory).count_over_threshold,
        1
    );
    assert_eq!(
        report.recommendations,
        vec![
            "Consider CPU optimization for 1 resources with high utilization".to_string(),
            "Review memory allocation for 1 resources".to_string(),
        ]
    );
    assert_eq!(report.total_resources, 2);
    assert_eq!(report.resources_analyzed, 2);
    assert!(!report.is_partial());
}

#[tokio::test]
async fn test_batch_and_sample_limits() {
    let resources: Vec<_> = (1..=15).map(|i| resource(&format!("vm-{}", i))).collect();
    let alerts: Vec<_> = (1..=7)
        .map(|i| {
            let level = if i % 2 == 0 {
                AlertLevel::Critical
            } else {
                AlertLevel::Warning
            };
            alert(&format!("a-{}", i), level)
        })
        .collect();
    let (source, reporter) = reporter(FakeSource {
        resources,
        alerts,
        ..Default::default()
    });

    let report = reporter
        .generate_health_report("VirtualMachine", None)
        .await
        .unwrap();

    assert_eq!(report.total_resources, 15);
    assert_eq!(report.resources_analyzed, 10);
    assert_eq!(report.resource_details.len(), 10);
    assert_eq!(report.active_alerts, 7);
    assert_eq!(report.top_alerts.len(), 5);
    assert_eq!(report.top_alerts[0].id, "a-1");
    assert_eq!(
        report.recommendations,
        vec!["Immediate attention required for 3 critical alerts".to_string()]
    );
    // a-6 is critical but falls outside the top five
    assert_eq!(report.critical_in_top_alerts(), 2);

    let mut fetched = source.fetched.lock().clone();
    fetched.sort();
    let mut expected: Vec<String> = (1..=10).map(|i| format!("vm-{}", i)).collect();
    expected.sort();
    assert_eq!(fetched, expected);
}

#[tokio::test]
async fn test_alert_failure_degrades_to_warning() {
    let (_, reporter) = reporter(FakeSource {
        resources: vec![resource("vm-1")],
        fail_alerts: true,
        ..Default::default()
    });

    let report = reporter
        .generate_health_report("VirtualMachine", None)
        .await
        .unwrap();

    assert_eq!(report.active_alerts, 0);
    assert!(report.top_alerts.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("alerts unavailable"));
    assert!(report.warnings[0].contains("502"));
}

#[tokio::test]
async fn test_metric_failure_is_isolated() {
    let mut metrics = HashMap::new();
    metrics.insert("vm-1".to_string(), vec![("cpu|usage_average", 95.0)]);
    let (_, reporter) = reporter(FakeSource {
        resources: vec![resource("vm-1"), resource("vm-2")],
        metrics,
        failing_metrics: HashSet::from(["vm-2".to_string()]),
        ..Default::default()
    });

    let report = reporter
        .generate_health_report("VirtualMachine", None)
        .await
        .unwrap();

    assert_eq!(report.resources_analyzed, 2);
    assert_eq!(report.summary_for(MetricCategory::Cpu).maximum, 95.0);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("vm-2"));
}

#[tokio::test]
async fn test_resource_list_failure_is_fatal() {
    let (source, reporter) = reporter(FakeSource {
        fail_resources: true,
        ..Default::default()
    });

    let result = reporter.generate_health_report("VirtualMachine", None).await;
    assert!(matches!(result, Err(Error::ResourceFetch(_))));
    assert!(source.fetched.lock().is_empty());
}

#[tokio::test]
async fn test_empty_inventory_still_reports() {
    let (_, reporter) = reporter(FakeSource {
        alerts: vec![alert("a-1", AlertLevel::Info)],
        ..Default::default()
    });

    let report = reporter
        .generate_health_report("Datastore", None)
        .await
        .unwrap();

    assert_eq!(report.resource_kind, "Datastore");
    assert_eq!(report.total_resources, 0);
    assert_eq!(report.resources_analyzed, 0);
    assert_eq!(report.active_alerts, 1);
    assert_eq!(report.warnings, vec![NO_RESOURCES_WARNING.to_string()]);
    assert_eq!(report.recommendations, vec![NORMAL_OPERATION.to_string()]);
    for category in MetricCategory::ALL {
        assert_eq!(report.summary_for(category), CategoryAggregate::default());
    }
}

#[tokio::test]
async fn test_cancellation_discards_report() {
    let (_, reporter) = reporter(FakeSource {
        resources: (1..=5).map(|i| resource(&format!("vm-{}", i))).collect(),
        metric_delay: Some(std::time::Duration::from_millis(200)),
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let result = reporter
        .generate_health_report_with_cancel("VirtualMachine", None, &cancel)
        .await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn test_assemble_report_json_shape() {
    let resources = vec![resource("vm-1")];
    let collection = CollectionOutcome {
        samples: vec![MetricSample {
            resource_id: "vm-1".to_string(),
            metric_key: "cpu|usage_average".to_string(),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            value: 42.0,
            unit: Some("%".to_string()),
        }],
        warnings: Vec::new(),
        attempted: 1,
        succeeded: 1,
    };
    let alerts = vec![alert("a-1", AlertLevel::Critical)];
    let generated_at = Utc.timestamp_millis_opt(1_700_000_600_000).unwrap();

    let report = assemble_report(
        ReportInputs {
            resource_kind: "VirtualMachine",
            resources: &resources,
            collection: &collection,
            alerts: &alerts,
            warnings: Vec::new(),
            generated_at,
        },
        &ReportOptions::default(),
    );
    let value = serde_json::to_value(&report).unwrap();

    for key in [
        "generatedAt",
        "resourceKind",
        "totalResources",
        "resourcesAnalyzed",
        "activeAlerts",
        "metricsSummary",
        "topAlerts",
        "recommendations",
        "resourceDetails",
    ] {
        assert!(value.get(key).is_some(), "missing key {}", key);
    }
    assert!(value.get("warnings").is_none());
    assert_eq!(value["metricsSummary"]["cpuUtilization"]["avg"], 42.0);
    assert_eq!(value["metricsSummary"]["diskUtilization"]["resourcesOver80"], 0);
    assert_eq!(value["topAlerts"][0]["alertLevel"], "CRITICAL");
    assert_eq!(value["resourceDetails"][0]["identifier"], "vm-1");
    assert_eq!(
        value["recommendations"][0],
        "Immediate attention required for 1 critical alerts"
    );

    let decoded: HealthReport = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, report);
}

#[test]
fn test_assemble_report_orders_warnings() {
    let collection = CollectionOutcome {
        warnings: vec![CollectionWarning {
            resource_id: "vm-3".to_string(),
            message: "timed out".to_string(),
        }],
        attempted: 1,
        ..Default::default()
    };
    let resources = vec![resource("vm-3")];

    let report = assemble_report(
        ReportInputs {
            resource_kind: "VirtualMachine",
            resources: &resources,
            collection: &collection,
            alerts: &[],
            warnings: vec!["alerts unavailable: down".to_string()],
            generated_at: Utc::now(),
        },
        &ReportOptions::default(),
    );

    assert_eq!(
        report.warnings,
        vec![
            "metrics unavailable for resource vm-3: timed out".to_string(),
            "alerts unavailable: down".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_end_to_end_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/suite-api/api/auth/token/acquire"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "t", "expiresIn": 1800})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/suite-api/api/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceList": [
                {"identifier": "A", "resourceKey": {"name": "vm-a", "adapterKindKey": "VMWARE", "resourceKindKey": "VirtualMachine"}},
                {"identifier": "B", "resourceKey": {"name": "vm-b", "adapterKindKey": "VMWARE", "resourceKindKey": "VirtualMachine"}}
            ],
            "pageInfo": {"totalCount": 2}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/suite-api/api/resources/A/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": [
            {"statKey": {"key": "cpu|usage_average"}, "data": [[1700000000000u64, 90.0]]},
            {"statKey": {"key": "mem|usage_average"}, "data": [[1700000000000u64, 50.0]]}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/suite-api/api/resources/B/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": [
            {"statKey": {"key": "cpu|usage_average"}, "data": [[1700000000000u64, 60.0]]},
            {"statKey": {"key": "mem|usage_average"}, "data": [[1700000000000u64, 85.0]]}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/suite-api/api/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"alerts": []})))
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .require_https(false)
        .credentials(Credentials::new("admin", "secret"))
        .build()
        .unwrap();
    let report = HealthReporter::new(client)
        .generate_health_report("VirtualMachine", None)
        .await
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    let cpu = &value["metricsSummary"]["cpuUtilization"];
    assert_eq!(cpu["resourcesOver80"], 1);
    assert_eq!(cpu["avg"], 75.0);
    assert_eq!(cpu["max"], 90.0);
    assert_eq!(value["metricsSummary"]["memoryUtilization"]["resourcesOver80"], 1);
    assert_eq!(value["totalResources"], 2);
    assert_eq!(value["activeAlerts"], 0);

    let recommendations = &report.recommendations;
    assert!(recommendations.iter().any(|r| r.starts_with("Consider CPU optimization")));
    assert!(recommendations.iter().any(|r| r.starts_with("Review memory allocation")));
}
