use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::documents::DocumentActionError;
use crate::services::enrollment::EnrollmentActionError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<EnrollmentActionError> for ApiError {
    fn from(err: EnrollmentActionError) -> Self {
        match err {
            EnrollmentActionError::NotFound => Self::NotFound("Enrollment not found".to_string()),
            EnrollmentActionError::InvalidState(message) => Self::BadRequest(message),
            EnrollmentActionError::InvalidArgument(message) => Self::BadRequest(message.to_string()),
            EnrollmentActionError::Db(err) => Self::internal(err, "Enrollment storage error"),
        }
    }
}

impl From<DocumentActionError> for ApiError {
    fn from(err: DocumentActionError) -> Self {
        match err {
            DocumentActionError::NotFound => Self::NotFound("Document not found".to_string()),
            DocumentActionError::Db(err) => Self::internal(err, "Document storage error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
    }
}
