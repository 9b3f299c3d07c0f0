//! Query Cache admin server
//!
//! Composition root: builds the shared cache and monitor once and serves
//! the admin API over them.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use query_cache::api::create_router;
use query_cache::{spawn_metrics_reporter, AppState, Config};

/// # Startup Sequence
/// 1. Initialize tracing subscriber
/// 2. Load configuration from environment variables
/// 3. Build the shared cache and performance monitor
/// 4. Start the metrics reporter
/// 5. Serve the admin router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info", overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Query Cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_items={}, max_age={}ms, retries={}, retry_delay={}ms, port={}",
        config.cache_max_items,
        config.cache_max_age_ms,
        config.query_retry_count,
        config.query_retry_delay_ms,
        config.server_port
    );

    let state = AppState::from_config(&config);
    info!(
        max_items = state.cache.max_items(),
        max_age_ms = state.cache.max_age().as_millis() as u64,
        "Cache initialized"
    );

    let reporter = spawn_metrics_reporter(
        state.cache.clone(),
        state.monitor.clone(),
        config.metrics_report_interval,
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(reporter))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops the metrics reporter.
async fn shutdown_signal(reporter: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    reporter.abort();
    warn!("Metrics reporter aborted");
}
