//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape metrics.
//! Labels carry only method, route template and status code.

use crate::observability::metrics::{MetricsRegistry, EXPOSITION_CONTENT_TYPE};
use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

/// Handler for GET /metrics
///
/// Returns the registry snapshot verbatim. Read-only: the scrape itself is
/// counted by the metrics middleware once this response is produced.
///
/// ```text
/// # HELP http_requests_total Total HTTP requests
/// # TYPE http_requests_total counter
/// http_requests_total{method="GET",endpoint="/healthz",status="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "app.metrics.scrape")]
pub async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        registry.render(),
    )
}
