//! Writing reports to disk

use crate::cli::error::{CliError, Result};
use crate::core::sanitize_for_log;
use crate::report::HealthReport;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// `aria_health_report_<YYYYmmdd_HHMMSS>.json`
pub fn default_report_file_name(now: DateTime<Utc>) -> String {
    format!("aria_health_report_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Write `report` as pretty JSON to `directory/file_name`
///
/// `file_name` must be relative and must not contain `..`, so a report can
/// never be written outside `directory`.
pub fn export_report(report: &HealthReport, file_name: &str, directory: &Path) -> Result<PathBuf> {
    let relative = validate_file_name(file_name)?;
    let path = directory.join(relative);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;

    info!("Report exported to {}", sanitize_for_log(&path.display().to_string()));
    Ok(path)
}

fn validate_file_name(file_name: &str) -> Result<&Path> {
    if file_name.trim().is_empty() {
        return Err(CliError::export("file name must not be empty"));
    }

    let path = Path::new(file_name);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(CliError::export(format!(
                    "'{}' must not contain '..'",
                    file_name
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CliError::export(format!(
                    "'{}' must be a relative path",
                    file_name
                )))
            }
        }
    }
    Ok(path)
}
