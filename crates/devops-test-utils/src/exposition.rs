//! Helpers for reading the text exposition format in tests.

/// Find the value of the `http_requests_total` series with the given labels.
///
/// Returns `None` if no such line is present.
pub fn scrape_counter(body: &str, method: &str, endpoint: &str, status: u16) -> Option<u64> {
    let series = format!(
        "http_requests_total{{method=\"{}\",endpoint=\"{}\",status=\"{}\"}} ",
        method, endpoint, status
    );

    body.lines()
        .find_map(|line| line.strip_prefix(series.as_str()))
        .and_then(|value| value.trim().parse().ok())
}
