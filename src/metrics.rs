//! Runtime metrics — process-global Prometheus counters and histograms.
//!
//! The registry is created lazily on first use and lives for the whole
//! process; there is no teardown. Cardinality is bounded: labels are the
//! JSON-RPC method name and the numeric error code.

use prometheus::{
    register_counter_with_registry, register_counter_vec_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Registry,
};
use std::sync::OnceLock;

/// Histogram buckets for request latency, in seconds.
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Histogram buckets for events emitted per stream.
const STREAM_EVENT_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0];

static METRICS: OnceLock<RuntimeMetrics> = OnceLock::new();

/// Counters and histograms tracked by the runtime.
pub struct RuntimeMetrics {
    registry: Registry,

    /// Total requests, labeled by method.
    pub requests_total: CounterVec,

    /// Total error responses, labeled by JSON-RPC error code.
    pub errors_total: CounterVec,

    /// Request duration in seconds, labeled by method.
    pub request_duration_seconds: HistogramVec,

    /// Events emitted per streaming response.
    pub stream_events: Histogram,

    /// Total tasks created.
    pub tasks_created_total: Counter,
}

impl RuntimeMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let requests_total = register_counter_vec_with_registry!(
            "a2a_requests_total",
            "Total number of A2A requests by method",
            &["method"],
            registry
        )
        .expect("register a2a_requests_total");

        let errors_total = register_counter_vec_with_registry!(
            "a2a_errors_total",
            "Total number of A2A error responses by code",
            &["code"],
            registry
        )
        .expect("register a2a_errors_total");

        let request_duration_seconds = register_histogram_vec_with_registry!(
            "a2a_request_duration_seconds",
            "A2A request duration in seconds by method",
            &["method"],
            LATENCY_BUCKETS.to_vec(),
            registry
        )
        .expect("register a2a_request_duration_seconds");

        let stream_events = register_histogram_with_registry!(
            "a2a_stream_events",
            "Number of events emitted per streaming response",
            STREAM_EVENT_BUCKETS.to_vec(),
            registry
        )
        .expect("register a2a_stream_events");

        let tasks_created_total = register_counter_with_registry!(
            "a2a_tasks_created_total",
            "Total number of tasks created",
            registry
        )
        .expect("register a2a_tasks_created_total");

        Self {
            registry,
            requests_total,
            errors_total,
            request_duration_seconds,
            stream_events,
            tasks_created_total,
        }
    }

    /// The backing registry, for exposition or test inspection.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a completed request.
    pub fn observe_request(&self, method: &str, duration_secs: f64) {
        self.requests_total.with_label_values(&[method]).inc();
        self.request_duration_seconds
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    /// Record an error response.
    pub fn observe_error(&self, code: i64) {
        self.errors_total
            .with_label_values(&[&code.to_string()])
            .inc();
    }
}

/// The process-global metrics instance.
pub fn metrics() -> &'static RuntimeMetrics {
    METRICS.get_or_init(RuntimeMetrics::new)
}
