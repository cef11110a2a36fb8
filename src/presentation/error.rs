// AppError -> HTTP response
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::{ApiError, AppError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    /// Every validation error, for invalid specs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidSpec(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth { .. } => StatusCode::UNAUTHORIZED,
            AppError::Api(ApiError::Transport { timeout: true, .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Api(_) | AppError::NoQueriesProvisioned(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "request rejected");
        }

        let errors = match &self {
            AppError::InvalidSpec(errors) => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            detail: self.to_string(),
            errors,
        };
        (status, Json(body)).into_response()
    }
}
