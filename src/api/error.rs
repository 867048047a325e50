//! Maps `EngineError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::engine::EngineError;
use crate::model::Action;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHENTICATED",
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let (status, code) = match &err {
            EngineError::Validation(_) | EngineError::LimitExceeded(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            EngineError::InvalidInterval { .. } => (StatusCode::BAD_REQUEST, "INVALID_INTERVAL"),
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            EngineError::Unauthorized(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            EngineError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            // Cancel and complete report a disallowed status as a bad request.
            EngineError::InvalidTransition {
                action: Action::Cancel | Action::Complete,
                ..
            } => (StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
            EngineError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            EngineError::CancelNotAllowed { .. } => (StatusCode::BAD_REQUEST, "CANCEL_NOT_ALLOWED"),
            EngineError::NotYetStarted { .. } => (StatusCode::BAD_REQUEST, "NOT_YET_STARTED"),
            EngineError::WalError(_) => {
                tracing::error!("internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "internal error".to_string(),
            _ => err.to_string(),
        };
        Self { status, code, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
