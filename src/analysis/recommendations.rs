use crate::analysis::aggregation::{CategoryAggregate, MetricCategory};
use crate::core::AlertRecord;
use std::collections::BTreeMap;

/// Emitted only when no other rule fires
pub const NORMAL_OPERATION: &str = "System appears to be operating within normal parameters";

/// Evaluate the recommendation rules in their fixed order
///
/// 1. CPU values over the threshold
/// 2. memory values over the threshold
/// 3. critical alerts
/// 4. otherwise, a single "normal parameters" line
pub fn recommend(
    summary: &BTreeMap<MetricCategory, CategoryAggregate>,
    critical_alerts: usize,
) -> Vec<String> {
    let over = |category| {
        summary
            .get(&category)
            .map(|aggregate| aggregate.count_over_threshold)
            .unwrap_or(0)
    };

    let mut recommendations = Vec::new();

    let high_cpu = over(MetricCategory::Cpu);
    if high_cpu > 0 {
        recommendations.push(format!(
            "Consider CPU optimization for {} resources with high utilization",
            high_cpu
        ));
    }

    let high_memory = over(MetricCategory::Memory);
    if high_memory > 0 {
        recommendations.push(format!(
            "Review memory allocation for {} resources",
            high_memory
        ));
    }

    if critical_alerts > 0 {
        recommendations.push(format!(
            "Immediate attention required for {} critical alerts",
            critical_alerts
        ));
    }

    if recommendations.is_empty() {
        recommendations.push(NORMAL_OPERATION.to_string());
    }
    recommendations
}

pub fn count_critical(alerts: &[AlertRecord]) -> usize {
    alerts.iter().filter(|alert| alert.is_critical()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AlertLevel;
    use chrono::Utc;

    fn summary(cpu_over: usize, mem_over: usize) -> BTreeMap<MetricCategory, CategoryAggregate> {
        let mut summary: BTreeMap<_, _> = MetricCategory::ALL
            .into_iter()
            .map(|c| (c, CategoryAggregate::default()))
            .collect();
        summary.insert(
            MetricCategory::Cpu,
            CategoryAggregate {
                average: 50.0,
                maximum: 95.0,
                count_over_threshold: cpu_over,
            },
        );
        summary.insert(
            MetricCategory::Memory,
            CategoryAggregate {
                average: 50.0,
                maximum: 95.0,
                count_over_threshold: mem_over,
            },
        );
        summary
    }

    #[test]
    fn test_rule_order_without_normal_line() {
        let recommendations = recommend(&summary(2, 0), 1);
        assert_eq!(
            recommendations,
            vec![
                "Consider CPU optimization for 2 resources with high utilization".to_string(),
                "Immediate attention required for 1 critical alerts".to_string(),
            ]
        );
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let recommendations = recommend(&summary(1, 3), 4);
        assert_eq!(recommendations.len(), 3);
        assert!(recommendations[0].starts_with("Consider CPU optimization for 1"));
        assert_eq!(recommendations[1], "Review memory allocation for 3 resources");
        assert!(recommendations[2].starts_with("Immediate attention required for 4"));
    }

    #[test]
    fn test_normal_line_only_when_nothing_fires() {
        assert_eq!(recommend(&summary(0, 0), 0), vec![NORMAL_OPERATION.to_string()]);
        assert_eq!(recommend(&BTreeMap::new(), 0), vec![NORMAL_OPERATION.to_string()]);
    }

    #[test]
    fn test_count_critical() {
        let alert = |level| AlertRecord {
            id: "a".to_string(),
            level,
            status: "ACTIVE".to_string(),
            resource_id: "vm-1".to_string(),
            start_time: Utc::now(),
            update_time: Utc::now(),
        };
        let alerts = vec![
            alert(AlertLevel::Critical),
            alert(AlertLevel::Warning),
            alert(AlertLevel::Critical),
            alert(AlertLevel::Info),
        ];
        assert_eq!(count_critical(&alerts), 2);
        assert_eq!(count_critical(&[]), 0);
    }
}
