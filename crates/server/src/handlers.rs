use crate::{
    errors::AppError,
    state::AppState,
    types::{ChatRequest, ChatResponse},
};
use axum::{extract::State, Json};
use tanya::{AskRequest, Mode};
use tracing::info;

/// The root handler.
pub async fn root() -> &'static str {
    "tanya server is running."
}

/// The health check handler.
pub async fn health_check() -> &'static str {
    "OK"
}

/// The handler for the `/chat` endpoint: one question in, one answer out.
pub async fn chat_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let mode = match payload.mode.as_deref() {
        None | Some("internal") => Mode::Internal,
        Some("external") => Mode::External,
        Some(other) => return Err(AppError::InvalidMode(other.to_string())),
    };

    info!(session_id = ?payload.session_id, ?mode, "Received chat request");

    let response = app_state
        .chat_client
        .ask(AskRequest {
            question: payload.question,
            session_id: payload.session_id,
            mode,
        })
        .await?;

    Ok(Json(ChatResponse {
        answer: response.answer,
        session_id: response.session_id,
    }))
}
