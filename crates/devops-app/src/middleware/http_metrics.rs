//! HTTP metrics middleware for capturing all request/response metrics.
//!
//! Every request passes through `START -> HANDLING -> FINALIZED`:
//! - START: a [`RequestTracker`] is created with the method and route label
//! - HANDLING: the request is forwarded to the next layer/handler
//! - FINALIZED: the tracker reports into the registry exactly once
//!
//! FINALIZED is reached on every exit path. A returned response is recorded
//! with its status code, including framework-level errors (404, 405, 408).
//! A handler panic is caught, recorded as 500, then resumed unchanged so the
//! outer panic layer still turns it into an error response. A cancelled
//! request future drops the tracker, which records 499.

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::observability::tracker::{RequestTracker, PANIC_STATUS};
use crate::observability::MetricsRegistry;

/// Route label for requests that matched no route, to bound cardinality.
pub const UNMATCHED_ROUTE: &str = "/other";

/// Method label for anything outside the standard HTTP methods.
pub const OTHER_METHOD: &str = "OTHER";

/// Middleware that records request count and latency for all responses.
///
/// Both labels come from closed sets. The route label is the matched route
/// template (e.g. `/hello`), never the raw URI. The method label is one of the
/// nine standard methods, with extension methods folded into `OTHER`.
pub async fn http_metrics_middleware(
    State(registry): State<Arc<MetricsRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let method = method_label(request.method());
    let route = route_label(&request);
    let tracker = RequestTracker::start(registry, method, route);

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            tracker.finish(response.status().as_u16());
            response
        }
        Err(panic) => {
            tracker.finish(PANIC_STATUS);
            std::panic::resume_unwind(panic)
        }
    }
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::HEAD => "HEAD",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        Method::OPTIONS => "OPTIONS",
        Method::CONNECT => "CONNECT",
        Method::TRACE => "TRACE",
        _ => OTHER_METHOD,
    }
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}
