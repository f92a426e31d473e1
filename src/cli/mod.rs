//! Command-line front end, enabled with the `cli` feature
//!
//! ## Usage
//!
//! ```bash
//! # Generate a report for all virtual machines
//! ARIA_PASSWORD=... aria-health --host aria-ops.lab.local report
//!
//! # Host systems over the last 4 hours, JSON on stdout
//! aria-health report --kind HostSystem --window-minutes 240 --json
//!
//! # Inspect the effective configuration
//! aria-health config show
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod output;

#[cfg(test)]
mod error_test;

pub use app::Cli;
pub use config::CliConfig;
pub use error::{CliError, Result};
pub use export::{default_report_file_name, export_report};
