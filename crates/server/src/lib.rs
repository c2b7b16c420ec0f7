// crates/server/src/lib.rs
//! statfrance HTTP server.
//!
//! Serves the JSON API over the series database and, when a built frontend
//! is available, the single-page app itself.

pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::path::Path;

use axum::Router;
use statfrance_db::Database;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// API-only application.
pub fn create_app(db: Database) -> Router {
    create_app_with_static(db, None)
}

/// Application serving the API plus, if `static_dir` is given, the frontend
/// files from it. Unknown non-API paths fall back to `index.html` so
/// client-side routes resolve; unknown `/api/...` paths get a JSON 404.
pub fn create_app_with_static(db: Database, static_dir: Option<&Path>) -> Router {
    let state = AppState::new(db);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state));

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
