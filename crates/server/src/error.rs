// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use statfrance_core::CatalogError;
use statfrance_db::DbError;
use thiserror::Error;
use ts_rs::TS;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Location not found: {level}/{code}")]
    LocationNotFound { level: String, code: String },

    #[error("No such endpoint: {0}")]
    RouteNotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::LocationNotFound { .. } | ApiError::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Catalog(_)
            | ApiError::BadRequest(_)
            | ApiError::Database(DbError::UnsupportedLevel { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::LocationNotFound { level, code } => {
                tracing::warn!(level = %level, code = %code, "Location not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details(
                        "Location not found",
                        format!("{} {}", level, code),
                    ),
                )
            }
            ApiError::RouteNotFound(path) => {
                tracing::debug!(path = %path, "No such endpoint");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Not found", path.clone()),
                )
            }
            ApiError::Catalog(catalog_err) => {
                tracing::warn!(error = %catalog_err, "Unknown catalog entry");
                let error_msg = match catalog_err {
                    CatalogError::UnknownDataset(_) => "Unknown dataset",
                    CatalogError::UnknownLevel(_) => "Unknown level",
                    CatalogError::UnsupportedLevel { .. } => "Level not available for dataset",
                };
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details(error_msg, catalog_err.to_string()),
                )
            }
            ApiError::Database(DbError::UnsupportedLevel { dataset, level }) => {
                tracing::warn!(dataset = %dataset, level = %level, "Unsupported level");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details(
                        "Level not available for dataset",
                        self.to_string(),
                    ),
                )
            }
            ApiError::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Database error", db_err.to_string()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
