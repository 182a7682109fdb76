use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tanya::AskError;
use tracing::error;

/// A custom error type for the server application.
///
/// Maps pipeline errors onto HTTP responses: input rejections become 400s
/// with a machine-checkable `reason`, rate limiting a 429, an AI outage a
/// 502 carrying only a generic apology, and everything else a 500.
pub enum AppError {
    /// Errors originating from the `tanya` pipeline.
    Ask(AskError),
    /// A `mode` value other than "internal" or "external".
    InvalidMode(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<AskError> for AppError {
    fn from(err: AskError) -> Self {
        AppError::Ask(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, reason, message) = match self {
            AppError::Ask(err) => {
                error!("AskError: {err:?}");
                let reason = err.reason();
                match &err {
                    AskError::InvalidSessionId | AskError::InputRejected(_) => {
                        (StatusCode::BAD_REQUEST, reason, err.to_string())
                    }
                    AskError::RateLimited { .. } => {
                        (StatusCode::TOO_MANY_REQUESTS, reason, err.to_string())
                    }
                    AskError::AiRequest(_)
                    | AskError::AiDeserialization(_)
                    | AskError::AiApi(_) => (
                        StatusCode::BAD_GATEWAY,
                        reason,
                        // The upstream detail stays in the logs.
                        "Maaf, terjadi kesalahan saat memproses permintaan Anda.".to_string(),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        reason,
                        "An internal server error occurred.".to_string(),
                    ),
                }
            }
            AppError::InvalidMode(mode) => (
                StatusCode::BAD_REQUEST,
                "invalid_mode",
                format!("Mode must be 'internal' or 'external', got '{mode}'"),
            ),
            AppError::Internal(err) => {
                error!("Internal server error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "reason": reason,
        }));

        (status_code, body).into_response()
    }
}
