//! Terminal rendering of health reports

use crate::analysis::{MetricCategory, NORMAL_OPERATION};
use crate::report::HealthReport;
use colored::Colorize;
use std::fmt::Write;

/// Human-readable summary of `report`
pub fn render_summary(report: &HealthReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {}",
        "Health report for".bold(),
        report.resource_kind.bold().cyan()
    );
    let _ = writeln!(
        out,
        "Generated at {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "Resources: {} total, {} analyzed",
        report.total_resources, report.resources_analyzed
    );

    let critical = report.critical_in_top_alerts();
    let alerts = format!("Active alerts: {}", report.active_alerts);
    if critical > 0 {
        let _ = writeln!(out, "{} ({} critical in top alerts)", alerts.red(), critical);
    } else {
        let _ = writeln!(out, "{}", alerts);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        format!("{:<10} {:>8} {:>8} {:>8}", "Category", "Avg", "Max", ">80").bold()
    );
    for category in MetricCategory::ALL {
        let aggregate = report.summary_for(category);
        let over = format!("{:>8}", aggregate.count_over_threshold);
        let over = if aggregate.count_over_threshold > 0 {
            over.red().to_string()
        } else {
            over.green().to_string()
        };
        let _ = writeln!(
            out,
            "{:<10} {:>8.1} {:>8.1} {}",
            category.label(),
            aggregate.average,
            aggregate.maximum,
            over
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Recommendations:".bold());
    for recommendation in &report.recommendations {
        let line = if recommendation == NORMAL_OPERATION {
            recommendation.green()
        } else {
            recommendation.yellow()
        };
        let _ = writeln!(out, "  - {}", line);
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Warnings:".bold().yellow());
        for warning in &report.warnings {
            let _ = writeln!(out, "  ! {}", warning);
        }
    }

    out
}
