//! Prometheus request counters, exported on `GET /metrics`.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

const DURATION_BUCKETS: [f64; 12] =
    [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

pub struct RequestMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl RequestMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("analyzer_requests_total", "Total number of HTTP requests handled"),
            &["path", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "analyzer_request_duration_seconds",
                "HTTP request latency distribution",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["path"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self { registry, requests_total, request_duration })
    }

    pub fn observe(&self, path: &str, status: u16, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[path, &status.to_string()])
            .inc();
        self.request_duration
            .with_label_values(&[path])
            .observe(elapsed.as_secs_f64());
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
