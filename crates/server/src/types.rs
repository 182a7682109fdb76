use serde::{Deserialize, Serialize};

/// The request body for the `/chat` endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// Auto-generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    /// "internal" (default) or "external". Validated by the handler so an
    /// unknown value gets a machine-checkable rejection instead of a 422.
    #[serde(default)]
    pub mode: Option<String>,
}

/// The response body for the `/chat` endpoint.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub session_id: String,
}
