//! HTTP API for uploading payer PDFs and working with the extracted codes

pub mod handlers;
pub mod models;
pub mod routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::utils::error::ApiError;
use models::ErrorResponse;

pub use routes::{create_router, AppState};

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Extraction(_)
            | ApiError::Export(_)
            | ApiError::Storage(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
