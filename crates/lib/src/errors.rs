use crate::guard::input::InputViolation;
use thiserror::Error;

/// Errors produced while answering a question.
///
/// Input-rejection variants (`InvalidSessionId`, `RateLimited`, `InputRejected`)
/// are surfaced to the caller before any AI or storage work happens. Provider
/// variants are raised at the collaborator boundary; most of them are caught
/// and degraded inside the resolver, and only a failed answer-generation call
/// reaches the caller.
#[derive(Error, Debug)]
pub enum AskError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Storage query execution failed: {0}")]
    StorageQueryFailed(String),
    #[error("Session id must match ^[A-Za-z0-9_-]{{3,100}}$")]
    InvalidSessionId,
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },
    #[error("Input rejected: {0}")]
    InputRejected(InputViolation),
    #[error("AI provider is missing")]
    MissingAiProvider,
    #[error("Storage provider is missing")]
    MissingStorageProvider,
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Failed to serialize result: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl AskError {
    /// A short machine-checkable reason code for the HTTP layer.
    pub fn reason(&self) -> &'static str {
        match self {
            AskError::InvalidSessionId => "invalid_session_id",
            AskError::RateLimited { .. } => "rate_limited",
            AskError::InputRejected(v) => v.reason(),
            AskError::AiRequest(_) | AskError::AiDeserialization(_) | AskError::AiApi(_) => {
                "ai_unavailable"
            }
            AskError::StorageConnection(_) | AskError::StorageQueryFailed(_) => "storage_error",
            _ => "internal",
        }
    }
}
