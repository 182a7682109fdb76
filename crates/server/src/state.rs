//! # Application State
//!
//! Builds the shared state at startup: the AI provider selected by the
//! configuration, the storage provider, and the `ChatClient` with its
//! registry, access policy, and phrase tables. The schema cache is warmed
//! here; a table that fails introspection is logged by the library and
//! degrades to legacy lookups, and an unreachable database leaves the whole
//! service in AI-only mode rather than failing startup.

use crate::config::AppConfig;
use std::sync::Arc;
use tanya::followup::{default_entity_rules, default_followup_rules, FollowupEngine};
use tanya::providers::ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider};
use tanya::providers::db::sqlite::SqliteProvider;
use tanya::types::ClientTuning;
use tanya::{ChatClient, ChatClientBuilder};

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_client: Arc<ChatClient>,
    pub sweep_interval_secs: u64,
}

/// Builds the shared application state from the configuration.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let ai_provider: Box<dyn AiProvider> = match config.ai.provider.as_str() {
        "gemini" => {
            let api_key = config
                .ai
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("ai.api_key is required for the gemini provider"))?;
            let api_url = config.ai.api_url.clone().unwrap_or_else(|| {
                format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                    config.ai.model_name
                )
            });
            Box::new(GeminiProvider::new(api_url, api_key)?)
        }
        "local" => {
            let api_url = config.ai.api_url.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "ai.api_url is required for the local provider. Set TANYA_AI__API_URL in your environment."
                )
            })?;
            Box::new(LocalAiProvider::new(
                api_url,
                config.ai.api_key.clone(),
                Some(config.ai.model_name.clone()),
            )?)
        }
        other => {
            return Err(anyhow::anyhow!("Unsupported AI provider: {other}"));
        }
    };

    let storage = SqliteProvider::new(&config.db_url).await?;
    tracing::info!(db_path = %config.db_url, "Initialized storage provider (SQLite).");

    let mut builder = ChatClientBuilder::new()
        .ai_provider(ai_provider)
        .storage_provider(Box::new(storage))
        .tuning(ClientTuning {
            company_name: config.company_name.clone(),
            rate_limit_max_requests: config.rate_limit.max_requests,
            rate_limit_window_secs: config.rate_limit.window_secs,
            session_idle_ttl_secs: config.session.idle_ttl_secs,
        });

    if let Some(tables) = config.tables.clone() {
        builder = builder.registry(tanya::registry::TableRegistry::new(tables));
    }
    if let Some(access) = config.access.clone() {
        builder = builder.access_policy(access);
    }
    if config.followup.rules.is_some() || config.followup.entities.is_some() {
        let rules = config
            .followup
            .rules
            .clone()
            .unwrap_or_else(default_followup_rules);
        let entities = config
            .followup
            .entities
            .clone()
            .unwrap_or_else(default_entity_rules);
        builder = builder.followup_engine(FollowupEngine::new(rules, entities)?);
    }

    let chat_client = builder.build()?;
    chat_client.warm_schema_cache().await;

    Ok(AppState {
        chat_client: Arc::new(chat_client),
        sweep_interval_secs: config.session.sweep_interval_secs,
    })
}
