//! emailpilot-aid — EmailPilot AI daemon.
//!
//! Serves the [`Orchestrator`](emailpilot_ai::Orchestrator) over HTTP so the
//! admin backend's routes share a single orchestrator instance.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emailpilot_ai::OrchestratorError;
use emailpilot_ai::server::config::{Config, Secrets};
use emailpilot_ai::server::router;

/// EmailPilot AI daemon — provider orchestration over HTTP.
#[derive(Parser)]
#[command(name = "emailpilot-aid")]
#[command(version = emailpilot_ai::PKG_VERSION)]
#[command(about = "EmailPilot AI orchestration daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Override the configured listen address.
    #[arg(long, env = "EMAILPILOT_AI_ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let orchestrator = config.orchestrator_builder(&secrets).build()?;
    let configured = orchestrator.configured_providers();
    if configured.is_empty() {
        warn!("no provider API keys found; every completion will fail until one is configured");
    }

    let address = args.address.unwrap_or_else(|| config.server.address.clone());
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| OrchestratorError::Configuration(format!("Invalid address: {e}")))?;

    info!(
        version = emailpilot_ai::PKG_VERSION,
        %addr,
        providers = ?configured,
        "emailpilot-aid starting"
    );

    let app = router(Arc::new(orchestrator));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
