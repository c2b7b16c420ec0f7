// crates/server/src/routes/status.rs
//! Data freshness: what has been imported and when.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use statfrance_db::{DatasetCoverage, ImportRun};
use ts_rs::TS;

use crate::error::ApiResult;
use crate::metrics::RequestTimer;
use crate::state::AppState;

const RECENT_IMPORTS: u32 = 10;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub coverage: Vec<DatasetCoverage>,
    pub recent_imports: Vec<ImportRun>,
    #[ts(type = "number | null")]
    pub last_import_at: Option<i64>,
}

/// GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    let timer = RequestTimer::new("status");
    let result = async {
        let coverage = state.db.dataset_summary().await?;
        let recent_imports = state.db.recent_import_runs(RECENT_IMPORTS).await?;
        let last_import_at = recent_imports.first().map(|run| run.imported_at);
        Ok::<_, crate::error::ApiError>(StatusResponse {
            coverage,
            recent_imports,
            last_import_at,
        })
    }
    .await;
    timer.finish(&result);
    result.map(Json)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}
