//! ApiPulse Binary Entry Point
//!
//! This binary runs the complete ApiPulse dashboard service.
//! Core functionality is provided by the `apipulse` library crate.

use std::net::SocketAddr;
use std::sync::Arc;

use apipulse::{
    advisor::{GeminiAdvisor, TipsAdvisor},
    config::AppConfig,
    probe::{HttpTransport, ProbeRunner},
    server::{AppState, create_router},
    storage::{RunStore, SqlitePool, init_schema},
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ApiPulse - API Latency Probe Dashboard
#[derive(Parser, Debug)]
#[command(name = "apipulse", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "APIPULSE_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "APIPULSE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "APIPULSE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(long, env = "APIPULSE_DB_URL")]
    db_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,apipulse=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ApiPulse - API Latency Probe Dashboard");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(url) = cli.db_url {
        config.database.url = url;
    }
    config.validate()?;

    tracing::info!(
        "Server: {}:{}, Database: {}",
        config.server.bind,
        config.server.port,
        config.database.url,
    );

    // Build storage layer
    let pool = SqlitePool::connect(&config.database.url).await?;
    init_schema(&pool).await?;
    let run_store = RunStore::new(pool.clone());
    tracing::info!("Storage initialized");

    // Build the probe runner
    let transport = Arc::new(HttpTransport::new(config.probe.timeout)?);
    let runner = Arc::new(ProbeRunner::new(transport, config.probe.max_samples));

    // Build the tips advisor, if enabled
    let advisor: Option<Arc<dyn TipsAdvisor>> = if config.advisor.enabled {
        tracing::info!(model = %config.advisor.model, "Tips advisor enabled");
        Some(Arc::new(GeminiAdvisor::new(
            config.advisor.api_url.as_str(),
            config.advisor.resolved_api_key(),
            config.advisor.model.as_str(),
            config.advisor.timeout,
        )?))
    } else {
        tracing::info!("Tips advisor disabled, runs will be stored without tips");
        None
    };

    // Create web server state
    let app_state = AppState {
        runner,
        advisor,
        run_store,
        default_samples: config.probe.samples,
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Closing database pool...");
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
