//! HTTP routes.
//!
//! Defines the Axum router and application state.

use crate::config::Settings;
use crate::errors::panic_response;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::observability::MetricsRegistry;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Requests running longer than this get a 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service settings, read-only after startup.
    pub settings: Settings,

    /// Request metrics registry, shared with the metrics middleware.
    pub metrics: Arc<MetricsRegistry>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/healthz` - Readiness and liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - `/`, `/hello`, `/work`, `/favicon.ico` - informational routes
/// - JSON 404 fallback
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - HTTP metrics middleware
/// - Panic-to-500 conversion (outermost)
pub fn build_routes(state: Arc<AppState>) -> Router {
    let metrics = state.metrics.clone();

    let app_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::health_check))
        .route("/hello", get(handlers::hello))
        .route("/work", get(handlers::work))
        .route("/favicon.ico", get(handlers::favicon))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics.clone());

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - 408 after REQUEST_TIMEOUT, still counted by metrics
    // 3. http_metrics_middleware - Record ALL responses, panics and cancellations
    // 4. CatchPanicLayer - Turn a resumed handler panic into a 500 (outermost)
    app_routes
        .merge(metrics_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn_with_state(
            metrics,
            http_metrics_middleware,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
}
