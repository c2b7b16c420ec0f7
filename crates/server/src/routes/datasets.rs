// crates/server/src/routes/datasets.rs
//! Dataset catalog endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use statfrance_core::{Dataset, DatasetInfo, Level};

use crate::error::ApiResult;
use crate::metrics::RequestTimer;
use crate::state::AppState;

/// GET /api/datasets - every published dataset with its levels and composites.
pub async fn list_datasets() -> Json<Vec<DatasetInfo>> {
    let timer = RequestTimer::new("datasets");
    let datasets = Dataset::ALL.iter().map(Dataset::info).collect();
    timer.finish_ok();
    Json(datasets)
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct IndicatorsQuery {
    pub level: Option<String>,
}

async fn indicators_for(
    state: &AppState,
    dataset: &str,
    level: Option<&str>,
) -> ApiResult<Vec<String>> {
    let dataset: Dataset = dataset.parse()?;
    let level = match level {
        Some(level) => level.parse()?,
        None => Level::Country,
    };
    Ok(state.db.list_indicators(dataset, level).await?)
}

/// GET /api/datasets/{dataset}/indicators?level= - base indicators stored
/// for the dataset at one level (country by default).
pub async fn list_indicators(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<String>,
    Query(query): Query<IndicatorsQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let timer = RequestTimer::new("indicators");
    let result = indicators_for(&state, &dataset, query.level.as_deref()).await;
    timer.finish(&result);
    result.map(Json)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/datasets", get(list_datasets))
        .route("/datasets/{dataset}/indicators", get(list_indicators))
}
