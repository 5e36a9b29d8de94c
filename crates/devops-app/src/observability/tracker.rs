//! Per-request tracker.
//!
//! A `RequestTracker` captures a monotonic start time and the request labels,
//! then reports into the [`MetricsRegistry`] exactly once. `finish` is the
//! normal path. If the tracker is dropped unfinished (the request future was
//! cancelled, or the stack is unwinding from a panic) `Drop` records it under
//! a synthetic failure status instead, so no request goes uncounted.

use crate::observability::metrics::MetricsRegistry;
use std::sync::Arc;
use std::time::Instant;

/// Status recorded when a request future is dropped before producing a
/// response (client went away, upstream timeout).
pub const CANCELLED_STATUS: u16 = 499;

/// Status recorded when the handler panicked.
pub const PANIC_STATUS: u16 = 500;

/// Ephemeral request timer. One per in-flight request.
#[derive(Debug)]
pub struct RequestTracker {
    registry: Arc<MetricsRegistry>,
    method: String,
    route: String,
    start: Instant,
    finished: bool,
}

impl RequestTracker {
    /// Start timing a request.
    pub fn start(
        registry: Arc<MetricsRegistry>,
        method: impl Into<String>,
        route: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            method: method.into(),
            route: route.into(),
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Record the request with its final status and discard the tracker.
    pub fn finish(mut self, status_code: u16) {
        self.record(status_code);
    }

    fn record(&mut self, status_code: u16) {
        if self.finished {
            return;
        }
        self.finished = true;

        let elapsed = self.start.elapsed();
        self.registry
            .increment_request(&self.method, &self.route, status_code);

        if let Err(e) =
            self.registry
                .observe_latency(&self.method, &self.route, elapsed.as_secs_f64())
        {
            tracing::error!(
                target: "app.metrics",
                error = %e,
                method = %self.method,
                route = %self.route,
                "Dropping latency observation"
            );
        }
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let status = if std::thread::panicking() {
            PANIC_STATUS
        } else {
            CANCELLED_STATUS
        };

        tracing::debug!(
            target: "app.metrics",
            method = %self.method,
            route = %self.route,
            status,
            "Request ended without a response"
        );

        self.record(status);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_finish_records_once() {
        let registry = Arc::new(MetricsRegistry::new());

        let tracker = RequestTracker::start(registry.clone(), "GET", "/hello");
        assert_eq!(tracker.method(), "GET");
        assert_eq!(tracker.route(), "/hello");
        tracker.finish(200);

        assert_eq!(registry.request_count("GET", "/hello", 200), 1);
        assert_eq!(registry.request_count("GET", "/hello", CANCELLED_STATUS), 0);
        let snapshot = registry.latency_snapshot("GET", "/hello").unwrap();
        assert_eq!(snapshot.count, 1);
    }

    #[test]
    fn test_finish_records_elapsed_time() {
        let registry = Arc::new(MetricsRegistry::new());

        let tracker = RequestTracker::start(registry.clone(), "GET", "/work");
        std::thread::sleep(Duration::from_millis(20));
        tracker.finish(200);

        let snapshot = registry.latency_snapshot("GET", "/work").unwrap();
        assert!(snapshot.sum >= 0.02, "sum was {}", snapshot.sum);
    }

    #[test]
    fn test_drop_without_finish_records_cancellation() {
        let registry = Arc::new(MetricsRegistry::new());

        {
            let _tracker = RequestTracker::start(registry.clone(), "GET", "/slow");
        }

        assert_eq!(registry.request_count("GET", "/slow", CANCELLED_STATUS), 1);
        assert_eq!(registry.latency_snapshot("GET", "/slow").unwrap().count, 1);
    }

    #[test]
    fn test_drop_while_panicking_records_server_error() {
        let registry = Arc::new(MetricsRegistry::new());
        let inner = registry.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _tracker = RequestTracker::start(inner, "GET", "/boom");
            panic!("handler exploded");
        }));

        assert!(result.is_err());
        assert_eq!(registry.request_count("GET", "/boom", PANIC_STATUS), 1);
        assert_eq!(registry.request_count("GET", "/boom", CANCELLED_STATUS), 0);
    }

    #[test]
    fn test_many_trackers_share_one_registry() {
        let registry = Arc::new(MetricsRegistry::new());

        let trackers: Vec<_> = (0..10)
            .map(|_| RequestTracker::start(registry.clone(), "GET", "/"))
            .collect();
        for tracker in trackers {
            tracker.finish(200);
        }

        assert_eq!(registry.request_count("GET", "/", 200), 10);
    }
}
