use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use novatra_api::config::{load_config, ConfigSource};
use novatra_api::lifecycle::{bootstrap, Orchestrator, SignalWatcher};
use novatra_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "novatra-api")]
#[command(about = "Runs the API and metrics listeners with graceful shutdown", long_about = None)]
struct Cli {
    /// Config file (TOML). Defaults to the standard search paths.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate configuration, print the resolved values and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, source) = match load_config(cli.config.as_deref()) {
        Ok((config, source)) => (Arc::new(config), source),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        return match toml::to_string_pretty(config.as_ref()) {
            Ok(rendered) => {
                println!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    if source == ConfigSource::Defaults {
        tracing::info!("No config file found, using environment variables and defaults");
    }
    tracing::info!(
        source = %source,
        version = %config.version,
        environment = %config.environment,
        primary = %config.primary_address(),
        metrics = %config.metrics_address(),
        shutdown_grace_secs = config.lifecycle.shutdown_grace_secs,
        "Configuration loaded"
    );

    let metrics_handle = match metrics::install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            return ExitCode::FAILURE;
        }
    };

    let context = CancellationToken::new();
    let watcher = match SignalWatcher::install(context.clone()) {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let (registry, _services) = match bootstrap(&config, metrics_handle, &context) {
        Ok(wired) => wired,
        Err(e) => {
            tracing::error!(error = %e, "Failed to wire services");
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = Orchestrator::new(config, registry);
    match orchestrator.run(watcher).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "Exiting after lifecycle failure");
            ExitCode::FAILURE
        }
    }
}
