use crate::cli::config::{resolve_password, CliConfig};
use crate::cli::error::{CliError, Result};
use crate::cli::export::{default_report_file_name, export_report};
use crate::cli::output::render_summary;
use crate::report::{HealthReporter, ReportOptions};
use crate::runtime::Client;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Health reports for Aria Operations environments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Aria Operations host name or base URL
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Login user name
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Custom config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a health report and save it as JSON
    Report(ReportCommand),

    /// Manage configuration settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Resource kind to analyze
    #[arg(short, long, default_value = "VirtualMachine")]
    pub kind: String,

    /// Length of the metric window in minutes
    #[arg(short, long)]
    pub window_minutes: Option<u32>,

    /// Output file name, relative to the output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print the JSON document instead of the summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => CliConfig::default_path()?,
        };

        if let Commands::Config {
            action: ConfigAction::Init { force },
        } = &self.command
        {
            return init_config(&config_path, *force);
        }

        // File, then environment, then flags
        let config = CliConfig::load_from_file(&config_path)?
            .apply_env()
            .merge_with_cli_args(&self);
        debug!("Using config file {}", config_path.display());

        match self.command {
            Commands::Report(cmd) => cmd.execute(&config).await,
            Commands::Config { action } => action.execute(&config),
        }
    }
}

impl ReportCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        if self.window_minutes == Some(0) {
            return Err(CliError::invalid_input("--window-minutes must be at least 1"));
        }

        let password = resolve_password()?;
        let client = Client::new(config.client.clone(), config.credentials(password))?;

        let mut options = ReportOptions::from_config(&config.client);
        if let Some(minutes) = self.window_minutes {
            options = options.with_window_minutes(minutes);
        }
        let reporter = HealthReporter::new(client).with_options(options);

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling report");
                on_interrupt.cancel();
            }
        });

        let report = reporter
            .generate_health_report_with_cancel(&self.kind, None, &cancel)
            .await?;

        let file_name = self
            .output
            .unwrap_or_else(|| default_report_file_name(Utc::now()));
        let path = export_report(&report, &file_name, &config.output_directory())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render_summary(&report));
            println!();
            println!("Report saved to {}", path.display());
        }
        Ok(())
    }
}

impl ConfigAction {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        match self {
            ConfigAction::Show => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
            // Handled before the file is loaded
            ConfigAction::Init { .. } => Ok(()),
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::configuration(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }
    CliConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
