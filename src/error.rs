use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use thiserror::Error;

use crate::agent::TurnError;

/// Boundary errors for the HTTP surface. Everything here is scoped to a
/// single request: validation and not-found are rejected before any
/// state mutation, upstream failures abort only the current turn.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")] Validation(String),
    #[error("{0}")] NotFound(String),
    #[error("{0}")] Upstream(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(
            serde_json::json!({
            "error": self.to_string(),
            "status": "failed",
        })
        );
        (self.status(), body).into_response()
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}
