//! # API Errors
//!
//! Maps engine errors onto HTTP status codes inside the standard envelope.

use super::types::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use schoolhub_core::SchoolError;

/// A `SchoolError` on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub SchoolError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            SchoolError::NotFound { .. } => StatusCode::NOT_FOUND,
            SchoolError::Validation(_) => StatusCode::BAD_REQUEST,
            SchoolError::Conflict(_) => StatusCode::CONFLICT,
            SchoolError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            SchoolError::SerializationError(_)
            | SchoolError::DeserializationError(_)
            | SchoolError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SchoolError> for ApiError {
    fn from(e: SchoolError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(event = "request_failed", error = %self.0, "Internal error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

/// Handler result: JSON envelope or mapped error.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a value in a successful envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
