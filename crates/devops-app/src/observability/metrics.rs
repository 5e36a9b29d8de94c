//! HTTP request metrics registry.
//!
//! Holds the two series every request reports into:
//! - `http_requests_total{method, endpoint, status}` (counter)
//! - `http_request_duration_seconds{method, endpoint}` (histogram)
//!
//! The registry is constructed once at startup and passed explicitly to the
//! middleware and the `/metrics` handler as `Arc<MetricsRegistry>`. Cells live
//! in lock-sharded `DashMap`s and are updated with atomics, so unrelated
//! requests never serialize on a single lock. Cells are never removed.
//!
//! # Exposition
//!
//! `render()` produces the Prometheus text format (version 0.0.4). Series are
//! sorted by label values so repeated scrapes of an idle registry are
//! byte-identical.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Request counter metric name.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Request latency histogram metric name.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Content type of the rendered exposition.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Default latency bucket upper bounds, in seconds.
pub const DEFAULT_LATENCY_BUCKETS: [f64; 14] = [
    0.005, 0.010, 0.025, 0.050, 0.075, 0.100, 0.250, 0.500, 0.750, 1.000, 2.500, 5.000, 7.500,
    10.000,
];

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    /// A caller broke a registry invariant (clock or tracker bug).
    #[error("Metrics invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid histogram buckets: {0}")]
    InvalidBuckets(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RequestKey {
    method: String,
    endpoint: String,
    status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct LatencyKey {
    method: String,
    endpoint: String,
}

/// Histogram cell. `buckets` holds one non-cumulative count per upper bound
/// plus a trailing +Inf overflow slot; the sum is stored as f64 bits.
struct AtomicHistogram {
    buckets: Box<[AtomicU64]>,
    sum_bits: AtomicU64,
}

impl AtomicHistogram {
    fn new(bound_count: usize) -> Self {
        Self {
            buckets: (0..=bound_count).map(|_| AtomicU64::new(0)).collect(),
            sum_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn observe(&self, bucket_index: usize, value: f64) {
        if let Some(bucket) = self.buckets.get(bucket_index) {
            bucket.fetch_add(1, Ordering::Release);
        }
        // fetch_update retries until the CAS lands; the closure never returns None.
        let _ = self
            .sum_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    /// `observe` bumps the bucket before the sum, so reading the sum first
    /// means every observation in `sum` is also in `count`.
    fn snapshot(&self, bounds: &[f64]) -> HistogramSnapshot {
        let sum = f64::from_bits(self.sum_bits.load(Ordering::Acquire));
        let bucket_counts: Vec<u64> = self
            .buckets
            .iter()
            .map(|b| b.load(Ordering::Acquire))
            .collect();
        HistogramSnapshot {
            bounds: bounds.to_vec(),
            count: bucket_counts.iter().sum(),
            bucket_counts,
            sum,
        }
    }
}

/// Point-in-time copy of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Finite bucket upper bounds, ascending.
    pub bounds: Vec<f64>,
    /// Non-cumulative counts; one per bound plus the +Inf overflow bucket.
    pub bucket_counts: Vec<u64>,
    /// Sum of all observed values, in seconds.
    pub sum: f64,
    /// Number of observations.
    pub count: u64,
}

impl HistogramSnapshot {
    /// Cumulative counts as exposed by `_bucket{le=...}` lines.
    pub fn cumulative(&self) -> Vec<u64> {
        self.bucket_counts
            .iter()
            .scan(0u64, |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }
}

/// Process-wide request metrics.
pub struct MetricsRegistry {
    buckets: Vec<f64>,
    requests: DashMap<RequestKey, AtomicU64>,
    latencies: DashMap<LatencyKey, AtomicHistogram>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("buckets", &self.buckets)
            .field("request_series", &self.requests.len())
            .field("latency_series", &self.latencies.len())
            .finish()
    }
}

impl MetricsRegistry {
    /// Create a registry with [`DEFAULT_LATENCY_BUCKETS`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
            requests: DashMap::new(),
            latencies: DashMap::new(),
        }
    }

    /// Create a registry with custom latency bucket upper bounds.
    ///
    /// Bounds must be non-empty, finite and strictly increasing. They are
    /// fixed for the lifetime of the registry.
    pub fn with_buckets(buckets: Vec<f64>) -> Result<Self, MetricsError> {
        if buckets.is_empty() {
            return Err(MetricsError::InvalidBuckets(
                "at least one bucket bound is required".to_string(),
            ));
        }
        if buckets.iter().any(|b| !b.is_finite()) {
            return Err(MetricsError::InvalidBuckets(
                "bucket bounds must be finite (+Inf is implicit)".to_string(),
            ));
        }
        if buckets.windows(2).any(|w| matches!(w, [a, b] if a >= b)) {
            return Err(MetricsError::InvalidBuckets(format!(
                "bucket bounds must be strictly increasing, got {:?}",
                buckets
            )));
        }

        Ok(Self {
            buckets,
            requests: DashMap::new(),
            latencies: DashMap::new(),
        })
    }

    /// Add one to the `(method, endpoint, status)` counter, creating it at 0
    /// if absent.
    pub fn increment_request(&self, method: &str, endpoint: &str, status_code: u16) {
        let key = RequestKey {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status: status_code,
        };

        if let Some(cell) = self.requests.get(&key) {
            cell.fetch_add(1, Ordering::Release);
            return;
        }

        self.requests
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Release);
    }

    /// Record one latency observation for `(method, endpoint)`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::InvariantViolation`] for negative, NaN or
    /// infinite durations. Nothing is recorded in that case.
    pub fn observe_latency(
        &self,
        method: &str,
        endpoint: &str,
        duration_seconds: f64,
    ) -> Result<(), MetricsError> {
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(MetricsError::InvariantViolation(format!(
                "latency for {} {} must be a finite non-negative number of seconds, got {}",
                method, endpoint, duration_seconds
            )));
        }

        let bucket_index = self
            .buckets
            .iter()
            .position(|&bound| duration_seconds <= bound)
            .unwrap_or(self.buckets.len());

        let key = LatencyKey {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
        };

        if let Some(hist) = self.latencies.get(&key) {
            hist.observe(bucket_index, duration_seconds);
            return Ok(());
        }

        let bound_count = self.buckets.len();
        self.latencies
            .entry(key)
            .or_insert_with(|| AtomicHistogram::new(bound_count))
            .observe(bucket_index, duration_seconds);

        Ok(())
    }

    /// Current value of a request counter (0 if the series does not exist).
    pub fn request_count(&self, method: &str, endpoint: &str, status_code: u16) -> u64 {
        let key = RequestKey {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status: status_code,
        };
        self.requests
            .get(&key)
            .map(|cell| cell.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Snapshot of a latency series, if any observation has been recorded.
    pub fn latency_snapshot(&self, method: &str, endpoint: &str) -> Option<HistogramSnapshot> {
        let key = LatencyKey {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
        };
        self.latencies
            .get(&key)
            .map(|hist| hist.snapshot(&self.buckets))
    }

    /// Render all series in Prometheus text exposition format.
    ///
    /// Each histogram is read without a lock. While observations are in
    /// flight, a series may show a `_count` that already includes a request
    /// whose duration has not reached `_sum` yet; the reverse never happens.
    pub fn render(&self) -> String {
        let mut requests: Vec<(RequestKey, u64)> = self
            .requests
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Acquire)))
            .collect();
        requests.sort_by(|a, b| a.0.cmp(&b.0));

        let mut latencies: Vec<(LatencyKey, HistogramSnapshot)> = self
            .latencies
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot(&self.buckets)))
            .collect();
        latencies.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();

        let _ = writeln!(out, "# HELP {} Total HTTP requests", HTTP_REQUESTS_TOTAL);
        let _ = writeln!(out, "# TYPE {} counter", HTTP_REQUESTS_TOTAL);
        for (key, value) in &requests {
            let _ = writeln!(
                out,
                "{}{{method=\"{}\",endpoint=\"{}\",status=\"{}\"}} {}",
                HTTP_REQUESTS_TOTAL,
                escape_label(&key.method),
                escape_label(&key.endpoint),
                key.status,
                value
            );
        }

        let _ = writeln!(
            out,
            "# HELP {} Request latency",
            HTTP_REQUEST_DURATION_SECONDS
        );
        let _ = writeln!(out, "# TYPE {} histogram", HTTP_REQUEST_DURATION_SECONDS);
        for (key, snapshot) in &latencies {
            let labels = format!(
                "method=\"{}\",endpoint=\"{}\"",
                escape_label(&key.method),
                escape_label(&key.endpoint)
            );

            let cumulative = snapshot.cumulative();
            let bounds = snapshot
                .bounds
                .iter()
                .map(|&b| format_float(b))
                .chain(std::iter::once("+Inf".to_string()));
            for (le, count) in bounds.zip(cumulative.iter()) {
                let _ = writeln!(
                    out,
                    "{}_bucket{{{},le=\"{}\"}} {}",
                    HTTP_REQUEST_DURATION_SECONDS, labels, le, count
                );
            }
            let _ = writeln!(
                out,
                "{}_sum{{{}}} {}",
                HTTP_REQUEST_DURATION_SECONDS,
                labels,
                format_float(snapshot.sum)
            );
            let _ = writeln!(
                out,
                "{}_count{{{}}} {}",
                HTTP_REQUEST_DURATION_SECONDS, labels, snapshot.count
            );
        }

        out
    }
}

/// Escape a label value per the text exposition format.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Format a sample value; whole numbers keep a trailing `.0`.
fn format_float(v: f64) -> String {
    if v.is_infinite() {
        let inf = if v > 0.0 { "+Inf" } else { "-Inf" };
        inf.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_creates_cell_and_counts() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.request_count("GET", "/hello", 200), 0);

        registry.increment_request("GET", "/hello", 200);
        registry.increment_request("GET", "/hello", 200);
        registry.increment_request("GET", "/hello", 404);

        assert_eq!(registry.request_count("GET", "/hello", 200), 2);
        assert_eq!(registry.request_count("GET", "/hello", 404), 1);
        assert_eq!(registry.request_count("POST", "/hello", 200), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let registry = Arc::new(MetricsRegistry::new());
        let threads = 8;
        let per_thread = 1_000;

        std::thread::scope(|s| {
            for _ in 0..threads {
                let registry = Arc::clone(&registry);
                s.spawn(move || {
                    for _ in 0..per_thread {
                        registry.increment_request("GET", "/work", 200);
                        registry
                            .observe_latency("GET", "/work", 0.001)
                            .expect("valid latency");
                    }
                });
            }
        });

        let expected = (threads * per_thread) as u64;
        assert_eq!(registry.request_count("GET", "/work", 200), expected);
        let snapshot = registry.latency_snapshot("GET", "/work").unwrap();
        assert_eq!(snapshot.count, expected);
        assert_eq!(snapshot.bucket_counts[0], expected);
    }

    #[test]
    fn test_snapshot_sum_never_runs_ahead_of_count() {
        let registry = Arc::new(MetricsRegistry::new());
        registry.observe_latency("GET", "/work", 1.0).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                s.spawn(move || {
                    for _ in 0..5_000 {
                        registry
                            .observe_latency("GET", "/work", 1.0)
                            .expect("valid latency");
                    }
                });
            }

            for _ in 0..5_000 {
                let snapshot = registry.latency_snapshot("GET", "/work").unwrap();
                assert!(
                    snapshot.sum <= snapshot.count as f64,
                    "sum {} ahead of count {}",
                    snapshot.sum,
                    snapshot.count
                );
            }
        });

        let snapshot = registry.latency_snapshot("GET", "/work").unwrap();
        assert_eq!(snapshot.count, 20_001);
        assert_eq!(snapshot.sum, 20_001.0);
    }

    #[test]
    fn test_observe_selects_smallest_bound_not_below_value() {
        let registry = MetricsRegistry::with_buckets(vec![0.1, 0.5, 1.0]).unwrap();

        registry.observe_latency("GET", "/", 0.0).unwrap();
        registry.observe_latency("GET", "/", 0.1).unwrap();
        registry.observe_latency("GET", "/", 0.2).unwrap();
        registry.observe_latency("GET", "/", 1.0).unwrap();
        registry.observe_latency("GET", "/", 3.0).unwrap();

        let snapshot = registry.latency_snapshot("GET", "/").unwrap();
        assert_eq!(snapshot.bucket_counts, vec![2, 1, 1, 1]);
        assert_eq!(snapshot.cumulative(), vec![2, 3, 4, 5]);
        assert_eq!(snapshot.count, 5);
        assert!((snapshot.sum - 4.3).abs() < 1e-9);
    }

    #[test]
    fn test_negative_latency_is_invariant_violation() {
        let registry = MetricsRegistry::new();

        let result = registry.observe_latency("GET", "/hello", -0.25);

        assert!(matches!(result, Err(MetricsError::InvariantViolation(_))));
        assert!(registry.latency_snapshot("GET", "/hello").is_none());
    }

    #[test]
    fn test_negative_latency_leaves_existing_buckets_untouched() {
        let registry = MetricsRegistry::new();
        registry.observe_latency("GET", "/hello", 0.02).unwrap();
        let before = registry.latency_snapshot("GET", "/hello").unwrap();

        assert!(registry.observe_latency("GET", "/hello", -1.0).is_err());
        assert!(registry.observe_latency("GET", "/hello", f64::NAN).is_err());
        assert!(registry
            .observe_latency("GET", "/hello", f64::INFINITY)
            .is_err());

        assert_eq!(registry.latency_snapshot("GET", "/hello").unwrap(), before);
    }

    #[test]
    fn test_with_buckets_validation() {
        assert!(matches!(
            MetricsRegistry::with_buckets(vec![]),
            Err(MetricsError::InvalidBuckets(_))
        ));
        assert!(matches!(
            MetricsRegistry::with_buckets(vec![0.5, 0.1]),
            Err(MetricsError::InvalidBuckets(_))
        ));
        assert!(matches!(
            MetricsRegistry::with_buckets(vec![0.1, 0.1]),
            Err(MetricsError::InvalidBuckets(_))
        ));
        assert!(matches!(
            MetricsRegistry::with_buckets(vec![0.1, f64::INFINITY]),
            Err(MetricsError::InvalidBuckets(_))
        ));
        assert!(MetricsRegistry::with_buckets(vec![0.1, 0.2]).is_ok());
    }

    #[test]
    fn test_render_empty_registry_has_headers() {
        let rendered = MetricsRegistry::new().render();

        assert!(rendered.contains("# TYPE http_requests_total counter"));
        assert!(rendered.contains("# TYPE http_request_duration_seconds histogram"));
        assert!(!rendered.contains("http_requests_total{"));
    }

    #[test]
    fn test_render_counter_and_histogram_lines() {
        let registry = MetricsRegistry::with_buckets(vec![0.1, 1.0]).unwrap();
        registry.increment_request("GET", "/hello", 200);
        registry.observe_latency("GET", "/hello", 0.05).unwrap();
        registry.observe_latency("GET", "/hello", 2.0).unwrap();

        let rendered = registry.render();

        assert!(rendered
            .contains("http_requests_total{method=\"GET\",endpoint=\"/hello\",status=\"200\"} 1\n"));
        assert!(rendered.contains(
            "http_request_duration_seconds_bucket{method=\"GET\",endpoint=\"/hello\",le=\"0.1\"} 1\n"
        ));
        assert!(rendered.contains(
            "http_request_duration_seconds_bucket{method=\"GET\",endpoint=\"/hello\",le=\"1.0\"} 1\n"
        ));
        assert!(rendered.contains(
            "http_request_duration_seconds_bucket{method=\"GET\",endpoint=\"/hello\",le=\"+Inf\"} 2\n"
        ));
        assert!(rendered
            .contains("http_request_duration_seconds_sum{method=\"GET\",endpoint=\"/hello\"} 2.05\n"));
        assert!(rendered
            .contains("http_request_duration_seconds_count{method=\"GET\",endpoint=\"/hello\"} 2\n"));
    }

    #[test]
    fn test_render_is_sorted_and_idempotent() {
        let registry = MetricsRegistry::new();
        registry.increment_request("POST", "/work", 500);
        registry.increment_request("GET", "/work", 200);
        registry.increment_request("GET", "/hello", 200);
        registry.increment_request("GET", "/hello", 404);

        let first = registry.render();
        let second = registry.render();
        assert_eq!(first, second);

        let series: Vec<&str> = first
            .lines()
            .filter(|l| l.starts_with("http_requests_total{"))
            .collect();
        assert_eq!(series.len(), 4);
        assert!(series[0].contains("endpoint=\"/hello\",status=\"200\""));
        assert!(series[1].contains("endpoint=\"/hello\",status=\"404\""));
        assert!(series[2].contains("method=\"GET\",endpoint=\"/work\""));
        assert!(series[3].contains("method=\"POST\""));
    }

    #[test]
    fn test_render_escapes_label_values() {
        let registry = MetricsRegistry::new();
        registry.increment_request("GET", "/a\"b\\c\nd", 200);

        let rendered = registry.render();
        assert!(rendered.contains("endpoint=\"/a\\\"b\\\\c\\nd\""));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.005), "0.005");
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(10.0), "10.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
    }
}
