// crates/server/src/routes/locations.rs
//! Location navigation and search.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use statfrance_core::{Level, Location};

use crate::error::{ApiError, ApiResult};
use crate::metrics::RequestTimer;
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 100;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LocationsQuery {
    /// Restrict to children of this parent code.
    pub parent: Option<String>,
    /// Name or code prefix. Switches to search mode when non-empty.
    pub q: Option<String>,
    pub limit: Option<u32>,
}

async fn locations_for(
    state: &AppState,
    level: &str,
    query: &LocationsQuery,
) -> ApiResult<Vec<Location>> {
    let level: Level = level.parse()?;
    match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => {
            let limit = query
                .limit
                .unwrap_or(DEFAULT_SEARCH_LIMIT)
                .clamp(1, MAX_SEARCH_LIMIT);
            Ok(state.db.search_locations(level, q, limit).await?)
        }
        _ => Ok(state
            .db
            .list_locations(level, query.parent.as_deref())
            .await?),
    }
}

/// GET /api/locations/{level}?parent=&q=&limit=
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    Path(level): Path<String>,
    Query(query): Query<LocationsQuery>,
) -> ApiResult<Json<Vec<Location>>> {
    let timer = RequestTimer::new("locations");
    let result = locations_for(&state, &level, &query).await;
    timer.finish(&result);
    result.map(Json)
}

/// GET /api/locations/{level}/{code}
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    Path((level, code)): Path<(String, String)>,
) -> ApiResult<Json<Location>> {
    let timer = RequestTimer::new("location");
    let result = location_for(&state, &level, code).await;
    timer.finish(&result);
    result.map(Json)
}

async fn location_for(state: &AppState, level: &str, code: String) -> ApiResult<Location> {
    let level: Level = level.parse()?;
    state
        .db
        .get_location(level, &code)
        .await?
        .ok_or_else(|| ApiError::LocationNotFound {
            level: level.slug().to_string(),
            code,
        })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations/{level}", get(list_locations))
        .route("/locations/{level}/{code}", get(get_location))
}

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

    async fn seeded_app() -> Router {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        db.import_locations_str(
            Level::Departement,
            "deps.csv",
            "code,name\n13,Bouches-du-Rhône\n75,Paris\n",
        )
        .await
        .unwrap();
        db.import_locations_str(
            Level::Commune,
            "communes.csv",
            "code,name,departement_code\n13055,Marseille,13\n13001,Aix-en-Provence,13\n75056,Paris,75\n",
        )
        .await
        .unwrap();
        crate::create_app(db)
    }

    async fn get_locations(app: Router, uri: &str) -> (StatusCode, Vec<Location>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let locations = if status == StatusCode::OK {
            serde_json::from_slice(&body).unwrap()
        } else {
            Vec::new()
        };
        (status, locations)
    }

    #[tokio::test]
    async fn test_list_children_of_parent() {
        let app = seeded_app().await;
        let (status, communes) = get_locations(app, "/api/locations/commune?parent=13").await;
        assert_eq!(status, StatusCode::OK);

        let names: Vec<&str> = communes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Aix-en-Provence", "Marseille"]);
    }

    #[tokio::test]
    async fn test_search_by_prefix() {
        let app = seeded_app().await;
        let (status, found) = get_locations(app.clone(), "/api/locations/commune?q=mar").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "13055");

        let (_, found) = get_locations(app, "/api/locations/commune?q=13&limit=1").await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_search_limit_default_and_cap() {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        let mut csv = String::from("code,name,departement_code\n");
        for i in 0..150 {
            csv.push_str(&format!("{},Saint-Commune {},01\n", 1000 + i, i));
        }
        db.import_locations_str(Level::Commune, "communes.csv", &csv)
            .await
            .unwrap();
        let app = crate::create_app(db);

        let (status, found) = get_locations(app.clone(), "/api/locations/commune?q=saint").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.len(), DEFAULT_SEARCH_LIMIT as usize);

        let (_, found) = get_locations(app.clone(), "/api/locations/commune?q=saint&limit=500").await;
        assert_eq!(found.len(), MAX_SEARCH_LIMIT as usize);

        let (_, found) = get_locations(app, "/api/locations/commune?q=saint&limit=0").await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_level_is_bad_request() {
        let app = seeded_app().await;
        let (status, _) = get_locations(app, "/api/locations/region").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_single_location() {
        let app = seeded_app().await;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/locations/departement/75")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/locations/departement/00")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
