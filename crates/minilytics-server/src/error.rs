use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use minilytics_core::error::ValidateError;

/// Errors surfaced by the tracking endpoint. Each variant maps to one HTTP
/// status; the body is always `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<ValidateError> for AppError {
    fn from(err: ValidateError) -> Self {
        match err {
            ValidateError::MissingField(_) => AppError::BadRequest(err.to_string()),
            ValidateError::DomainNotAllowed(_) => AppError::Forbidden(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
            }
            AppError::Storage(e) => {
                // Internal detail stays in the log, not the response body.
                error!(error = %e, "request failed on storage");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400_and_403() {
        let bad: AppError = ValidateError::MissingField("path").into();
        assert!(matches!(bad, AppError::BadRequest(_)));

        let forbidden: AppError = ValidateError::DomainNotAllowed("other.com".into()).into();
        assert!(matches!(forbidden, AppError::Forbidden(_)));
    }

    #[test]
    fn storage_errors_hide_the_cause() {
        let resp = AppError::Storage(anyhow::anyhow!("duckdb exploded")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
