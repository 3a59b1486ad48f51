use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Request-level failures. None of these affect the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing 'key' query parameter")]
    MissingKey,

    #[error("Upload failed: {0:#}")]
    Upload(anyhow::Error),

    #[error("Download failed: {0:#}")]
    Download(anyhow::Error),

    #[error("{0:#}")]
    List(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingKey => StatusCode::BAD_REQUEST,
            ApiError::Upload(_) | ApiError::Download(_) | ApiError::List(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), format!("{self}\n")).into_response()
    }
}
