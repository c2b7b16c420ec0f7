// crates/server/src/metrics.rs
//! Prometheus metrics: recorder setup and recording helpers.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
///
/// Returns `false` if a recorder was already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();
    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("api_requests_total", "Total number of API requests");
    describe_histogram!(
        "api_request_duration_seconds",
        "Duration of API requests in seconds"
    );
    describe_counter!(
        "series_served_total",
        "Series responses served, by dataset and level"
    );
}

/// Render current metrics in Prometheus text format, `None` before init.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_request(endpoint: &str, status: &str, duration: Duration) {
    counter!("api_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_series_served(dataset: &str, level: &str) {
    counter!("series_served_total", "dataset" => dataset.to_string(), "level" => level.to_string())
        .increment(1);
}

/// Times one handler invocation.
///
/// ```ignore
/// let timer = RequestTimer::new("stats");
/// // ... do work ...
/// timer.finish_ok();
/// ```
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }

    pub fn finish_ok(self) {
        record_request(self.endpoint, "200", self.start.elapsed());
    }

    pub fn finish_err(self, status: u16) {
        record_request(self.endpoint, &status.to_string(), self.start.elapsed());
    }

    /// Finish from a handler result, reading the status off the error.
    pub fn finish<T>(self, result: &crate::error::ApiResult<T>) {
        match result {
            Ok(_) => self.finish_ok(),
            Err(err) => self.finish_err(err.status_code().as_u16()),
        }
    }
}
