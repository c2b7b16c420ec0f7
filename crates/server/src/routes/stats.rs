// crates/server/src/routes/stats.rs
//! Series endpoints: one location's dataset, aligned by year with the
//! dataset's composites merged in.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use statfrance_core::{
    serialize_with_composites, CatalogError, Dataset, Level, RawRow, SerializedSeries,
    COUNTRY_CODE,
};
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_series_served, RequestTimer};
use crate::state::AppState;

const COUNTRY_NAME: &str = "France";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StatsQuery {
    /// Defaults to `country`.
    pub level: Option<String>,
    /// Ignored at country level.
    pub code: Option<String>,
}

/// Response for `GET /api/stats/{dataset}`.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StatsResponse {
    pub dataset: Dataset,
    pub level: Level,
    pub code: String,
    pub location_name: Option<String>,
    pub series: SerializedSeries,
}

/// Response for `GET /api/stats/{dataset}/table`: one row per year.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StatsTableResponse {
    pub dataset: Dataset,
    pub level: Level,
    pub code: String,
    pub location_name: Option<String>,
    /// `year` first, then indicators in name order.
    pub columns: Vec<String>,
    #[ts(type = "Array<Record<string, number>>")]
    pub rows: Vec<RawRow>,
}

// ============================================================================
// Lookup
// ============================================================================

struct Target {
    dataset: Dataset,
    level: Level,
    code: String,
}

fn resolve_target(dataset: &str, query: &StatsQuery) -> ApiResult<Target> {
    let dataset: Dataset = dataset.parse()?;
    let level = match query.level.as_deref() {
        Some(level) => level.parse()?,
        None => Level::Country,
    };
    if !dataset.supports(level) {
        return Err(CatalogError::UnsupportedLevel {
            dataset: dataset.slug().to_string(),
            level: level.slug().to_string(),
        }
        .into());
    }

    let code = match level {
        Level::Country => COUNTRY_CODE.to_string(),
        _ => match query.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "code is required at {} level",
                    level
                )))
            }
        },
    };

    Ok(Target {
        dataset,
        level,
        code,
    })
}

/// Load and serialize the series for `target`.
///
/// A location that is neither in the locations table nor has any stored
/// values is a 404; a known location with no values yields an empty series.
async fn load_series(
    state: &AppState,
    target: &Target,
) -> ApiResult<(Option<String>, SerializedSeries)> {
    let location = state.db.get_location(target.level, &target.code).await?;
    let rows = state
        .db
        .fetch_rows(target.dataset, target.level, &target.code)
        .await?;

    if location.is_none() && rows.is_empty() && target.level != Level::Country {
        return Err(ApiError::LocationNotFound {
            level: target.level.slug().to_string(),
            code: target.code.clone(),
        });
    }

    let location_name = match (location, target.level) {
        (Some(location), _) => Some(location.name),
        (None, Level::Country) => Some(COUNTRY_NAME.to_string()),
        (None, _) => None,
    };

    let series = serialize_with_composites(&rows, &target.dataset.composites());
    tracing::debug!(
        dataset = %target.dataset,
        level = %target.level,
        code = %target.code,
        years = series.labels.len(),
        indicators = series.data.len(),
        "Serialized series"
    );
    record_series_served(target.dataset.slug(), target.level.slug());
    Ok((location_name, series))
}

async fn stats_for(state: &AppState, dataset: &str, query: &StatsQuery) -> ApiResult<StatsResponse> {
    let target = resolve_target(dataset, query)?;
    let (location_name, series) = load_series(state, &target).await?;
    Ok(StatsResponse {
        dataset: target.dataset,
        level: target.level,
        code: target.code,
        location_name,
        series,
    })
}

async fn table_for(
    state: &AppState,
    dataset: &str,
    query: &StatsQuery,
) -> ApiResult<StatsTableResponse> {
    let target = resolve_target(dataset, query)?;
    let (location_name, series) = load_series(state, &target).await?;

    let columns = std::iter::once("year".to_string())
        .chain(series.data.keys().cloned())
        .collect();
    Ok(StatsTableResponse {
        dataset: target.dataset,
        level: target.level,
        code: target.code,
        location_name,
        columns,
        rows: series.to_rows(),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/stats/{dataset}?level=&code=
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StatsResponse>> {
    let timer = RequestTimer::new("stats");
    let result = stats_for(&state, &dataset, &query).await;
    timer.finish(&result);
    result.map(Json)
}

/// GET /api/stats/{dataset}/table?level=&code=
pub async fn get_stats_table(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StatsTableResponse>> {
    let timer = RequestTimer::new("stats_table");
    let result = table_for(&state, &dataset, &query).await;
    timer.finish(&result);
    result.map(Json)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/{dataset}", get(get_stats))
        .route("/stats/{dataset}/table", get(get_stats_table))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use pretty_assertions::assert_eq;
    use statfrance_db::Database;
    use tower::ServiceExt;

    const CRIME_CSV: &str = "\
departement_code;year;homicides;attempted_homicides;assault;sexual_violence;population
75;2021;40;61;12 000;3 100;2 145 906
75;2019;35;;11 500;2 800;2 187 526
75;2020;28;70;;2 900;2 165 423
";

    async fn seeded_app() -> Router {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        db.import_locations_str(
            Level::Departement,
            "deps.csv",
            "code,name\n75,Paris\n2A,Corse-du-Sud\n",
        )
        .await
        .unwrap();
        db.import_observations_str(Dataset::Crime, Level::Departement, "crime.csv", CRIME_CSV)
            .await
            .unwrap();
        db.import_observations_str(
            Dataset::Births,
            Level::Country,
            "births.csv",
            "birth-year,girls,boys\n2001,380000,400000\n2000,390000,410000\n",
        )
        .await
        .unwrap();
        crate::create_app(db)
    }

    async fn do_get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_resolve_target_defaults_to_country() {
        let target = resolve_target("births", &StatsQuery::default()).unwrap();
        assert_eq!(target.level, Level::Country);
        assert_eq!(target.code, "FR");

        let query = StatsQuery {
            level: Some("country".into()),
            code: Some("75".into()),
        };
        assert_eq!(resolve_target("crime", &query).unwrap().code, "FR");
    }

    #[test]
    fn test_resolve_target_requires_code_below_country() {
        let query = StatsQuery {
            level: Some("commune".into()),
            code: Some("  ".into()),
        };
        assert!(matches!(
            resolve_target("population", &query),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_aligned_with_composites() {
        let app = seeded_app().await;
        let (status, body) = do_get(app, "/api/stats/crime?level=departement&code=75").await;
        assert_eq!(status, StatusCode::OK, "{}", body);

        let response: StatsResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.location_name.as_deref(), Some("Paris"));
        assert_eq!(response.series.labels, vec![2019, 2020, 2021]);
        assert_eq!(
            response.series.data["attempted_homicides"],
            vec![None, Some(70.0), Some(61.0)]
        );
        assert_eq!(
            response.series.data["homicides_total"],
            vec![Some(35.0), Some(98.0), Some(101.0)]
        );
        for values in response.series.data.values() {
            assert_eq!(values.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_stats_country_births() {
        let app = seeded_app().await;
        let (status, body) = do_get(app, "/api/stats/births").await;
        assert_eq!(status, StatusCode::OK);

        let response: StatsResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.code, "FR");
        assert_eq!(response.location_name.as_deref(), Some("France"));
        assert_eq!(response.series.labels, vec![2000, 2001]);
        assert_eq!(
            response.series.data["births_total"],
            vec![Some(800_000.0), Some(780_000.0)]
        );
    }

    #[tokio::test]
    async fn test_known_location_without_values_is_empty() {
        let app = seeded_app().await;
        let (status, body) = do_get(app, "/api/stats/crime?level=departement&code=2A").await;
        assert_eq!(status, StatusCode::OK);

        let response: StatsResponse = serde_json::from_str(&body).unwrap();
        assert!(response.series.labels.is_empty());
        assert!(response.series.data.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_location_is_404() {
        let app = seeded_app().await;
        let (status, body) = do_get(app, "/api/stats/crime?level=departement&code=99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Location not found"));
    }

    #[tokio::test]
    async fn test_births_at_commune_level_is_bad_request() {
        let app = seeded_app().await;
        let (status, body) = do_get(app, "/api/stats/births?level=commune&code=75056").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Level not available for dataset"));
    }

    #[tokio::test]
    async fn test_unknown_level_is_bad_request() {
        let app = seeded_app().await;
        let (status, body) = do_get(app, "/api/stats/crime?level=region&code=11").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Unknown level"));
    }

    #[tokio::test]
    async fn test_stats_table_rows() {
        let app = seeded_app().await;
        let (status, body) =
            do_get(app, "/api/stats/crime/table?level=departement&code=75").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["columns"][0], "year");
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["year"].as_f64(), Some(2019.0));
        assert!(rows[0].get("attempted_homicides").is_none());
        assert_eq!(rows[1]["attempted_homicides"], 70.0);
    }
}
