use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Closed set of failure kinds for the whole API. Each kind maps to
/// exactly one status code; rendering to JSON happens only here, so the
/// handlers never build transport-format responses themselves.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, *msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, *msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, *msg),
            ApiError::Internal(err) => {
                // Detail stays in the server log; the client gets a
                // generic message.
                error!("internal error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Malformed or missing JSON bodies are client errors, not 422s.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
