//! devops-app
//!
//! Entry point. Loads settings, builds the metrics registry and router, and
//! serves until SIGINT/SIGTERM.

use devops_app::config::{LogLevel, Settings};
use devops_app::observability::MetricsRegistry;
use devops_app::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Settings come first: they pick the log level. A bad value still gets
    // logged at the default level before the process exits non-zero.
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing(LogLevel::default());
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    init_tracing(settings.log_level);

    info!(
        app_name = %settings.app_name,
        environment = %settings.environment,
        port = settings.port,
        log_level = %settings.log_level,
        database_configured = settings.db_url.is_some(),
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(MetricsRegistry::new());
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let display_url = format!("http://{}:{}", settings.display_host, settings.port);
    let drain_seconds = settings.drain_seconds;

    let state = Arc::new(AppState { settings, metrics });
    let app = routes::build_routes(state);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        e
    })?;

    info!("devops-app listening on {}", addr);
    info!("Open your browser at: {}", display_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain_seconds))
        .await?;

    info!("devops-app shutdown complete");

    Ok(())
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate and to `tower_http` request spans.
fn init_tracing(level: LogLevel) {
    let default_filter = format!(
        "devops_app={level},tower_http={level}",
        level = level.as_directive()
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // Give the orchestrator time to stop routing traffic here.
    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    }
}
