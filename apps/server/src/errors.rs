use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;

/// API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

/// Application errors - fail fast with clear messages
#[derive(Debug, Error)]
pub enum AppError {
    /// Entity or named relation absent
    #[error("{0}")]
    NotFound(String),
    /// Operation not allowed on the aggregate as it stands
    #[error("{0}")]
    InvalidState(String),
    /// Document store failed; not recoverable within the request
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AppError::InvalidState(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {}", err);
        AppError::Upstream(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, "INVALID_STATE", msg),
            AppError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_FAILURE",
                "Database operation failed".to_string(),
            ),
        };

        (status, Json(ApiError { code, message })).into_response()
    }
}

/// Result type for core operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_status_codes() {
        let cases = [
            (AppError::not_found("no cart"), StatusCode::NOT_FOUND),
            (AppError::invalid_state("expired"), StatusCode::CONFLICT),
            (
                AppError::Upstream("socket closed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
