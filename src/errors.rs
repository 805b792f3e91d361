use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::views;

/// Failures that escape a request handler.
///
/// Everything here surfaces to the end user as the fixed "internal error"
/// page; the detail stays in the logs for the operator.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, views::internal_error_page()).into_response()
    }
}
