// crates/server/src/routes/metrics.rs
//! Prometheus scrape endpoint at `GET /metrics` (no `/api` prefix).

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::render_metrics;
use crate::state::AppState;

/// 503 until the recorder is installed.
pub async fn metrics_handler() -> Response {
    match render_metrics() {
        Some(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response(),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
