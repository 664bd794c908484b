//! ScopeGate HTTP Server binary

use clap::Parser;
use scopegate_core::ScopeEngine;
use scopegate_server::{app, clients, config::CONFIG_ENV, AppState, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "scopegate-server")]
#[command(about = "Scope-based authorization server", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (TOML); falls back to $SCOPEGATE_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let config = ServerConfig::load(config_path.as_deref())?;

    let enable_otel = config.telemetry.otel_enabled;
    if enable_otel {
        scopegate_server::tracing::init_tracing_stack(
            &config.telemetry.service_name,
            &config.telemetry.otlp_endpoint,
        )?;
        info!("OpenTelemetry tracing enabled");
    } else {
        scopegate_server::tracing::init_console_logging()?;
        info!("Console logging enabled (set OTEL_ENABLED=true for OpenTelemetry)");
    }

    info!("Starting ScopeGate HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    scopegate_server::metrics::init_prometheus()?;
    scopegate_server::metrics::init_metrics();

    if config.is_standalone() {
        info!("No OAuth2 provider or policy service configured; using in-memory collaborators");
    }
    let collaborators = clients::from_config(&config)?;
    let engine = Arc::new(ScopeEngine::with_config(collaborators, config.engine.clone()));
    let state = AppState::with_debug(engine, config.debug);

    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = axum::serve(listener, app(state));

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        }
        info!("Received shutdown signal, shutting down gracefully...");
    };

    server
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    if enable_otel {
        info!("Flushing OpenTelemetry traces...");
        scopegate_server::tracing::shutdown_telemetry();
    }

    info!("Server shutdown complete");
    Ok(())
}
