pub mod gemini;
pub mod local;

use crate::errors::AskError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with an AI provider.
///
/// One stateless entry point: a system and a user prompt in, generated text
/// out. No tool-calling contract is assumed; all structure is enforced by
/// prompt convention and validated downstream, never trusted blindly.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, AskError>;
}

dyn_clone::clone_trait_object!(AiProvider);
