//! OpenGTM poller binary.

use clap::Parser;
use gtm_server::api::{self, AppState};
use gtm_server::metrics::MetricsRegistry;
use gtm_server::supervisor::Supervisor;
use healthcheck::{Config, HealthTable};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// OpenGTM health-check poller
#[derive(Parser, Debug)]
#[command(name = "poller", version, about)]
struct Cli {
    /// Path to the JSON pool configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the resolved configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::logging::init();
    let cli = Cli::parse();

    // A config read failure is only fatal when a path was supplied
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => {
            info!("no config file given, starting with default config");
            Config::default()
        }
    };

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("OpenGTM poller starting");

    let config = Arc::new(RwLock::new(config));
    let table = Arc::new(HealthTable::new());
    let metrics = Arc::new(MetricsRegistry::new());

    let supervisor = Supervisor::new(config.clone(), table.clone(), Some(metrics.clone()));
    let state = AppState {
        config,
        table,
        supervisor: supervisor.handle(),
        metrics,
    };

    // Bind before spawning pollers so a bad listen address fails fast
    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!(listen_addr = LISTEN_ADDR, "api listening");

    tokio::spawn(supervisor.run());

    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
