//! # fdo-gateway: Binary Entry Point
//!
//! `fdo-gateway <PORT> <DB_DIR> [--wrapper-script PATH] [--json-logs]`
//!
//! Owner Service, exchange and onboarding settings come from the
//! environment; see the `from_env` constructors.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use fdo_gateway::bootstrap::{bootstrap, GatewaySettings};
use fdo_gateway::state::AppConfig;
use fdo_owner_client::{ExchangeConfig, OwnerServiceConfig};

#[derive(Debug, Parser)]
#[command(name = "fdo-gateway", version, about = "Multi-tenant FDO gateway")]
struct Args {
    /// Port to listen on.
    port: u16,

    /// Database root holding `devices/` and `values/`.
    db_dir: PathBuf,

    /// Agent install wrapper script shipped to every device.
    #[arg(long, default_value = "agent-install-wrapper.sh")]
    wrapper_script: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let settings = GatewaySettings {
        db_dir: args.db_dir,
        wrapper_script: args.wrapper_script,
        app: AppConfig::from_env()?,
        owner: OwnerServiceConfig::from_env()?,
        exchange: ExchangeConfig::from_env()?,
    };
    tracing::info!(
        owner = %settings.owner.base_url,
        exchange = %settings.exchange.internal_url,
        "configuration loaded"
    );

    let state = bootstrap(settings).await.map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    let app = fdo_gateway::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("fdo-gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
