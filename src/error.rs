use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced across the log-reading and HTTP layers.
#[derive(Debug, thiserror::Error)]
pub enum LogViewError {
    /// Missing or invalid server configuration (unset `LOG_FILE_PATH`/`LOG_PASSWORD`).
    #[error("configuration error: {0}")]
    Config(String),

    /// `pwd` query parameter missing or not equal to the configured secret.
    #[error("unauthorized")]
    Unauthorized,

    /// The configured log file does not exist or cannot be opened.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O failure while reading or watching the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be interpreted under the requested parse mode.
    #[error("parse error: {0}")]
    Parse(String),
}

impl IntoResponse for LogViewError {
    fn into_response(self) -> Response {
        let status = match &self {
            LogViewError::Unauthorized => StatusCode::UNAUTHORIZED,
            LogViewError::Config(_) | LogViewError::NotFound(_) | LogViewError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            LogViewError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::UNAUTHORIZED {
            return status.into_response();
        }

        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
