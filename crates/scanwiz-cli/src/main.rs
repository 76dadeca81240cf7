mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scanwiz_core::{ScanTool, WizardSelection};
use scanwiz_session::{BACKEND_URL_ENV, ClientConfig, LOG_FILE_NAME, ScanwizDirs};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanwiz")]
#[command(about = "Terminal wizard for garak LLM security scans")]
#[command(version)]
struct Cli {
    /// Base URL of the scan backend
    #[arg(long, global = true, env = BACKEND_URL_ENV)]
    backend_url: Option<String>,

    /// Path to a config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a model, environment, and probe interactively, then watch the scan
    Wizard,
    /// List available models, environments, and probes
    Catalog,
    /// Run a scan without the wizard and stream its output
    Scan {
        /// Model to scan
        #[arg(short, long)]
        model: String,
        /// Conda environment the scanner runs in
        #[arg(short, long)]
        environment: String,
        /// Probe to run
        #[arg(short, long)]
        probe: String,
        /// Scanner to launch
        #[arg(short, long, default_value = "garak")]
        tool: ScanTool,
    },
    /// Show the backend's stored record for a session
    Status {
        /// Session id returned when the scan started
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();

    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref(), cli.backend_url.as_deref())
        .context("Failed to load configuration")?;
    let config = Arc::new(config);

    match cli.command.unwrap_or(Commands::Wizard) {
        Commands::Wizard => {
            commands::wizard(config).await?;
        }
        Commands::Catalog => {
            commands::catalog(config).await?;
        }
        Commands::Scan {
            model,
            environment,
            probe,
            tool,
        } => {
            let selection = WizardSelection {
                model: Some(model),
                environment: Some(environment),
                tool,
                probe: Some(probe),
            };
            commands::scan(config, &selection).await?;
        }
        Commands::Status { session_id } => {
            commands::status(config, &session_id).await?;
        }
    }

    Ok(())
}

/// Log to the state directory, or to stderr when it cannot be written.
fn init_logging() -> Option<WorkerGuard> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_ansi(false);

    match ScanwizDirs::new().and_then(|dirs| dirs.prepare_logs()) {
        Ok(log_dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(rolling::never(log_dir, LOG_FILE_NAME));
            subscriber.with_writer(writer).init();
            Some(guard)
        }
        Err(_) => {
            subscriber.with_writer(std::io::stderr).init();
            None
        }
    }
}
