use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required fields: {}", .0.join(", "))]
    Validation(Vec<&'static str>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("at least 2 delivery points are required, got {0}")]
    InsufficientPoints(usize),

    #[error("route optimization unavailable: {0}")]
    OptimizationUnavailable(String),

    #[error("no location found for {0:?}")]
    GeocodeNotFound(String),

    #[error("{0} locations match; select one")]
    GeocodeAmbiguous(usize),

    #[error("verify location first")]
    LocationUnverified,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Undecodable bodies get the same `{"error": ...}` shape as every other 400.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::InsufficientPoints(_)
            | AppError::LocationUnverified => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::GeocodeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::GeocodeAmbiguous(_) => StatusCode::CONFLICT,
            AppError::OptimizationUnavailable(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
