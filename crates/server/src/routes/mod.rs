// crates/server/src/routes/mod.rs
//! API route handlers.

pub mod datasets;
pub mod health;
pub mod locations;
pub mod metrics;
pub mod stats;
pub mod status;

use std::sync::Arc;

use axum::{http::Uri, routing::any, Router};

use crate::error::ApiError;
use crate::state::AppState;

/// Any unmatched `/api/...` path: a JSON 404, never the frontend.
async fn api_not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

/// Combined router: everything under `/api`, plus `/metrics`.
///
/// Routes:
/// - GET /api/health - Health check
/// - GET /api/datasets - Dataset catalog
/// - GET /api/datasets/{dataset}/indicators - Stored base indicators
/// - GET /api/stats/{dataset} - Aligned series with composites
/// - GET /api/stats/{dataset}/table - Same series as one row per year
/// - GET /api/locations/{level} - Location lists and search
/// - GET /api/locations/{level}/{code} - One location
/// - GET /api/status - Import coverage and recent runs
/// - GET /metrics - Prometheus text
/// - * /api/* - JSON 404 for anything else
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", datasets::router())
        .nest("/api", stats::router())
        .nest("/api", locations::router())
        .nest("/api", status::router())
        .route("/api/{*path}", any(api_not_found))
        .merge(metrics::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let db = statfrance_db::Database::new_in_memory()
            .await
            .expect("in-memory DB");
        let state = AppState::new(db);
        let _router = api_routes(state);
    }
}
