//! Per-route request metrics, exported in Prometheus text format on
//! `/__metrics`.

use std::time::Duration;

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Latency buckets in seconds, up to the default client timeout.
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Label used for every path the service does not route.
const UNMATCHED_ROUTE: &str = "unmatched";

const KNOWN_ROUTES: &[&str] = &[
    "/topic",
    "/annotations",
    "/__health",
    "/__gtg",
    "/__build-info",
    "/__metrics",
];

/// Request counters and latency histograms, labelled by route and method.
///
/// Cloning shares the underlying collectors.
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: CounterVec,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// Create the collectors in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Requests handled, by route, method and status"),
            &["route", "method", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "Time spent handling a request")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["route", "method"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
        })
    }

    /// Record one handled request.
    pub fn observe(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let route = route_label(path);
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[route, method, status.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[route, method])
            .observe(elapsed.as_secs_f64());
    }

    /// Requests recorded so far for one label set.
    pub fn request_count(&self, path: &str, method: &str, status: u16) -> f64 {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[route_label(path), method, status.as_str()])
            .get()
    }

    /// Render every collector in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Collapse unrouted paths into one label so arbitrary URLs cannot grow the
/// label set.
fn route_label(path: &str) -> &str {
    KNOWN_ROUTES
        .iter()
        .copied()
        .find(|route| *route == path)
        .unwrap_or(UNMATCHED_ROUTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_route_method_and_status() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe("PUT", "/topic", 200, Duration::from_millis(3));
        metrics.observe("PUT", "/topic", 200, Duration::from_millis(4));
        metrics.observe("PUT", "/topic", 400, Duration::from_millis(1));

        assert_eq!(metrics.request_count("/topic", "PUT", 200), 2.0);
        assert_eq!(metrics.request_count("/topic", "PUT", 400), 1.0);
        assert_eq!(metrics.request_count("/annotations", "PUT", 200), 0.0);
    }

    #[test]
    fn unknown_paths_share_one_label() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe("GET", "/a", 404, Duration::ZERO);
        metrics.observe("GET", "/b/c", 404, Duration::ZERO);

        assert_eq!(metrics.request_count("/anything", "GET", 404), 2.0);
        let text = metrics.encode_text().unwrap();
        assert!(text.contains(r#"route="unmatched""#));
        assert!(!text.contains("/b/c"));
    }

    #[test]
    fn encodes_both_families() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe("GET", "/__gtg", 200, Duration::from_millis(1));

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("http_request_duration_seconds_bucket"));
    }
}
