//! HTTP API handlers for cellward-hs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cellward_common::api::types::ErrorResponse;

pub mod cells;
pub mod health;
pub mod inmates;
pub mod occupancy;
pub mod sse;

pub use cells::{available_cells, create_cell, list_cells, update_cell};
pub use health::health_routes;
pub use inmates::{admit_inmate, list_inmates, remove_inmate, update_inmate};
pub use occupancy::{occupancy_statistics, recompute_counts, reconcile_cells, validate_assignment};
pub use sse::event_stream;

/// API errors mapped onto HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    /// 500 - database or other internal failure
    Database(String),
    /// 404 - path resource does not exist
    NotFound(String),
    /// 400 - malformed request parameter
    Invalid(String),
    /// 409 - assignment blocked by a business rule
    Conflict(String),
}

impl From<cellward_common::Error> for ApiError {
    fn from(err: cellward_common::Error) -> Self {
        use cellward_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::Invalid(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
