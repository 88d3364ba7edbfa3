//! Application-level errors for the JSON and status-only routes.
//!
//! Voice routes never surface these to Twilio; they fall back to an apology
//! document instead. Status routes turn them into HTTP 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::conversation::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Conversation store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(error = %self, "Request failed");
        // Error details stay in the logs
        (status, Json(json!({"error": "internal error"}))).into_response()
    }
}
