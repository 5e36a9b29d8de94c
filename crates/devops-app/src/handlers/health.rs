//! Health check handler.
//!
//! `/healthz` serves both the readiness and the liveness probe. It answers
//! whether the process can execute code and nothing more: no dependency is
//! checked, not even the configured database. The orchestrator decides what
//! repeated failures mean (eject from traffic or restart).

use crate::models::HealthResponse;
use axum::Json;

/// Liveness/readiness probe handler.
///
/// Always returns 200 `{"status":"ok"}` while the process is serving.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body, HealthResponse::ok());
        assert_eq!(body.status, "ok");
    }
}
