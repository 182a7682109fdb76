//! # Application Configuration
//!
//! Layered configuration for `tanya-server`: built-in defaults, an optional
//! `config.yml`, and environment variable overrides on top. The phrase
//! tables (table mappings, follow-up rules, credential table) live in the
//! library with built-in defaults and can be replaced wholesale from the
//! yaml file without touching code.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::fs;
use tanya::access::AccessPolicy;
use tanya::followup::{EntityRule, FollowupRule};
use tanya::registry::TableMapping;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    General(String),
    Unreadable(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::Unreadable(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// Which AI backend to construct, and how to reach it.
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// "gemini" or "local".
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    /// Derived from `model_name` for Gemini when absent.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model_name: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            api_url: None,
            api_key: None,
            model_name: default_ai_model(),
        }
    }
}

fn default_ai_provider() -> String {
    "local".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_max")]
    pub max_requests: u32,
    #[serde(default = "default_rate_limit_window")]
    pub window_secs: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_limit_max(),
            window_secs: default_rate_limit_window(),
        }
    }
}

fn default_rate_limit_max() -> u32 {
    tanya::constants::RATE_LIMIT_MAX_REQUESTS
}

fn default_rate_limit_window() -> i64 {
    tanya::constants::RATE_LIMIT_WINDOW_SECS
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_idle_ttl() -> i64 {
    tanya::constants::SESSION_IDLE_TTL_SECS
}

fn default_sweep_interval() -> u64 {
    300
}

/// Overrides for the library's built-in follow-up phrase tables.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FollowupConfig {
    #[serde(default)]
    pub rules: Option<Vec<FollowupRule>>,
    #[serde(default)]
    pub entities: Option<Vec<EntityRule>>,
}

/// The root configuration structure.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Company identity the internal answer mode may mention.
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Replaces the built-in table mappings when present.
    #[serde(default)]
    pub tables: Option<Vec<TableMapping>>,
    /// Replaces the built-in credential table and table rules when present.
    #[serde(default)]
    pub access: Option<AccessPolicy>,
    #[serde(default)]
    pub followup: FollowupConfig,
}

fn default_port() -> u16 {
    3000
}

fn default_db_url() -> String {
    "db/tanya.db".to_string()
}

/// Loads the configuration.
///
/// Layers, lowest first: struct defaults, the yaml file (the override path,
/// else `config.yml` next to the manifest, skipped when absent), plain
/// environment variables for top-level keys (`PORT`, `DB_URL`), and
/// `TANYA_`-prefixed variables for nested keys (e.g. `TANYA_AI__API_KEY`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let config_path = config_path_override
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/config.yml", env!("CARGO_MANIFEST_DIR")));

    if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from '{config_path}'.");
        let content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::Unreadable(format!("Failed to read config file '{config_path}': {e}"))
        })?;
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    } else {
        info!("No config file at '{config_path}'; using defaults and environment.");
    }

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("TANYA")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
