use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recordquery_core::store::StoreError;
use recordquery_core::view::validate::ViewSpecError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidView(#[from] ViewSpecError),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::SchemaNotFound(_) | StoreError::ViewNotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(StoreError::Io(_) | StoreError::Serde(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidView(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
