use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// API error type with HTTP status code mapping.
///
/// Validation and policy failures short-circuit before any write; expected
/// uniqueness conflicts never reach this type at all — they become
/// `is_unique = false` inside the pipeline.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    Internal(String),
    DatabaseError(duckdb::Error),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
            Self::DatabaseError(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::DatabaseError(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<duckdb::Error> for ApiError {
    fn from(e: duckdb::Error) -> Self {
        Self::DatabaseError(e)
    }
}
