use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use burrow_core::{ShortenerError, StorageError};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
    #[error("missing or invalid x-user-id header")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Shortener(err) => match err {
                ShortenerError::DuplicateUrl { .. }
                | ShortenerError::Storage(StorageError::DuplicateUrl(_)) => StatusCode::CONFLICT,
                ShortenerError::NotFound(_) => StatusCode::NOT_FOUND,
                ShortenerError::Gone(_) => StatusCode::GONE,
                err if err.is_bad_input() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
            // internals stay in the log
            return (status, "internal server error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
