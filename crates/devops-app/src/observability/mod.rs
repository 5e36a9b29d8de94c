//! Observability module.
//!
//! Provides the request metrics registry and the per-request tracker that
//! reports into it.

pub mod metrics;
pub mod tracker;

pub use metrics::{MetricsError, MetricsRegistry};
pub use tracker::RequestTracker;
