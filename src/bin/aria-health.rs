use anyhow::Result;
use aria_ops_sdk::cli::Cli;
use clap::Parser;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only raises the fallback level
    let fallback = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting aria-health {}", aria_ops_sdk::VERSION);

    if let Err(e) = cli.execute().await {
        // Log the full error for debugging
        error!("Command execution failed: {:?}", e);

        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}
