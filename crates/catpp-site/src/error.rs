use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catpp_core::compile::CompileError;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("config error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Compile(_) | Self::Config(_) => {
                warn!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
