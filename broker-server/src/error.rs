//! Error handling for the broker's HTTP surface.
//!
//! Maps [`AppError`] to the status codes and JSON bodies fixed by the
//! external interface: 404 for an unknown task, 403 for a rejected
//! credential, 400 for a malformed request body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::QueryRejection;
use broker_core::QueueError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown task")]
    NotFound,
    #[error("not authorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound => AppError::NotFound,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({"error": "Unknown task"})),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, json!({"error": "Not authorized"})),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
        };

        (status, Json(body)).into_response()
    }
}
