//! Response and query models.

use serde::{Deserialize, Serialize};

/// Liveness/readiness response.
///
/// Returned by `/healthz`. The shape is fixed: `{"status":"ok"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Service index returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Service name from settings.
    pub app: String,

    /// Public endpoints, as links a human can paste.
    pub endpoints: Vec<String>,
}

/// Query parameters for `GET /hello`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloQuery {
    pub name: Option<String>,
}

/// Greeting returned by `GET /hello`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}

/// Result of the simulated work endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkResponse {
    pub result: i64,
}
