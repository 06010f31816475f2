// Prometheus metrics definitions for the Yoda backend.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Rounds played, by result (win, loss, tie).
    pub static ref ROUNDS_PLAYED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("yoda_rounds_played_total", "Total RPSLS rounds played"),
        &["result"],
    )
    .unwrap();

    /// Chat messages, by route (joke, conversation).
    pub static ref CHAT_MESSAGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("yoda_chat_messages_total", "Total chat messages handled"),
        &["route"],
    )
    .unwrap();

    /// Joke lookups, by where the joke came from (cache, upstream).
    pub static ref JOKE_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("yoda_joke_fetches_total", "Total joke lookups"),
        &["source"],
    )
    .unwrap();

    /// Failed outbound calls, by service (joke, generation).
    pub static ref UPSTREAM_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("yoda_upstream_errors_total", "Total failed upstream calls"),
        &["service"],
    )
    .unwrap();

    /// Requests rejected by the rate limiter, by route.
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("yoda_rate_limited_total", "Total rate-limited requests"),
        &["route"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("yoda_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "yoda_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 10.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(ROUNDS_PLAYED_TOTAL.clone()),
            Box::new(CHAT_MESSAGES_TOTAL.clone()),
            Box::new(JOKE_FETCHES_TOTAL.clone()),
            Box::new(UPSTREAM_ERRORS_TOTAL.clone()),
            Box::new(RATE_LIMITED_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            REGISTRY.register(c).expect("failed to register metric");
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Endpoint label for requests that matched no route (404s, static files).
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Metric label for a request: the route template it matched, so arbitrary
/// path input can't explode label cardinality.
pub fn endpoint_label(matched_path: Option<&str>) -> &str {
    matched_path.unwrap_or(UNMATCHED_ENDPOINT)
}
