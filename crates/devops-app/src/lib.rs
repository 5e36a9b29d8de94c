//! devops-app Service Library
//!
//! A minimal HTTP service exposing liveness/readiness and request metrics,
//! meant to run behind an orchestrator that polls `/healthz` and scrapes
//! `/metrics`.
//!
//! # Architecture
//!
//! ```text
//! request -> CatchPanicLayer -> http_metrics_middleware -> TimeoutLayer
//!         -> TraceLayer -> handlers/*.rs
//! ```
//!
//! The middleware times and counts every request into a single
//! [`observability::MetricsRegistry`] that is constructed at startup and
//! shared explicitly with the `/metrics` handler.
//!
//! # Modules
//!
//! - `config` - Settings from `APP_*` environment variables
//! - `errors` - Handler error type with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Request instrumentation
//! - `models` - Response models
//! - `observability` - Metrics registry and request tracker
//! - `routes` - Axum router setup

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
