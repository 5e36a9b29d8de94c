//! Informational routes: index, greeting, simulated work, favicon, fallback.

use crate::errors::AppError;
use crate::models::{HelloQuery, HelloResponse, IndexResponse, WorkResponse};
use crate::routes::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{StatusCode, Uri},
    Json,
};
use std::sync::Arc;

/// Name greeted when `?name=` is absent.
pub const DEFAULT_NAME: &str = "world";

/// Endpoints advertised by `GET /`.
pub const ADVERTISED_ENDPOINTS: [&str; 3] = ["/healthz", "/hello?name=YOU", "/metrics"];

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Json<IndexResponse> {
    Json(IndexResponse {
        app: state.settings.app_name.clone(),
        endpoints: ADVERTISED_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

/// GET /hello?name=<string>
pub async fn hello(
    query: Result<Query<HelloQuery>, QueryRejection>,
) -> Result<Json<HelloResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let name = query.name.as_deref().unwrap_or(DEFAULT_NAME);

    Ok(Json(HelloResponse {
        message: format!("Hello, {}!", name),
    }))
}

/// GET /work
pub async fn work() -> Json<WorkResponse> {
    Json(WorkResponse { result: 42 })
}

/// GET /favicon.ico
///
/// No favicon is served; 204 keeps browsers from logging 404s.
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
