//! Service scaffold binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     settings (TOML + env) ──▶ ServiceConfig ──▶ Orchestrator
//!                                                     │
//!                     ┌───────────────────────────────┤
//!                     ▼                               ▼
//!             serve task (net)               main task waits for
//!     recovery → tracing → access log        SIGINT / SIGTERM
//!             → routes (http)                         │
//!                                                     ▼
//!                                     hooks (in order) → drain (5s) → exit
//! ```

use std::path::PathBuf;

use clap::Parser;

use service_scaffold::config::{load_settings, ServiceConfig};
use service_scaffold::http::person;
use service_scaffold::lifecycle::{signals, Orchestrator, Shutdown};
use service_scaffold::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "service-scaffold", version, about = "HTTP service with graceful shutdown")]
struct Cli {
    /// Optional TOML settings file; environment variables override it.
    #[arg(short, long, env = "SERVICE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    logging::init_logging(&settings);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %settings.listener.address(),
        environment = %settings.environment,
        tracing_enabled = settings.tracing.enabled,
        "service-scaffold starting"
    );

    let mut config = ServiceConfig::new(settings).route(person::route());

    if config.settings.observability.metrics_enabled {
        let handle = metrics::install_recorder().map_err(|e| {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            e
        })?;
        config = config.route(metrics::route(handle));
    }

    let termination = signals::termination().map_err(|e| {
        tracing::error!(error = %e, "Failed to install signal handlers");
        e
    })?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        termination.await;
        trigger.trigger();
    });

    let report = Orchestrator::new(config)
        .run_until(shutdown.triggered())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Service terminated");
            e
        })?;

    if !report.hooks.all_succeeded() {
        tracing::warn!(
            failed = report.hooks.failures.len(),
            "Some shutdown hooks failed"
        );
    }

    Ok(())
}
