use crate::access::AccessPolicy;
use crate::errors::AskError;
use crate::followup::FollowupEngine;
use crate::guard::rate_limit::RateLimiter;
use crate::providers::{ai::AiProvider, db::storage::Storage};
use crate::registry::TableRegistry;
use crate::schema::SchemaCache;
use crate::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single result row, keyed by column name in SELECT order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Whether database retrieval is attempted for a question.
///
/// `Internal` runs the full resolution pipeline against company data;
/// `External` answers from general knowledge only and never touches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Internal,
    External,
}

/// The single inbound operation of the library.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Auto-generated when absent; must match `^[A-Za-z0-9_-]{3,100}$` when present.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub mode: Mode,
}

/// The answer to one question.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub session_id: String,
}

/// The type of a table column, as reported by the storage provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Integer,
    Float,
    String,
    Bytes,
    Boolean,
    Timestamp,
    Date,
}

/// One column of a table's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableField {
    pub name: String,
    pub r#type: FieldType,
    #[serde(default)]
    pub max_length: Option<i64>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Ordered column metadata for one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<TableField>,
}

/// How the storage provider's dialect caps row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    /// `SELECT TOP n ...` (T-SQL style).
    Top,
    /// `SELECT ... LIMIT n` (SQLite style).
    Limit,
}

impl RowLimit {
    /// Builds a limited SELECT in the provider's dialect.
    ///
    /// `tail` is everything after the projection: `FROM ... [WHERE ...] [ORDER BY ...]`.
    pub fn select(&self, projection: &str, tail: &str, n: u32) -> String {
        match self {
            // T-SQL wants DISTINCT ahead of TOP.
            RowLimit::Top => match projection.strip_prefix("DISTINCT ") {
                Some(rest) => format!("SELECT DISTINCT TOP {n} {rest} {tail}"),
                None => format!("SELECT TOP {n} {projection} {tail}"),
            },
            RowLimit::Limit => format!("SELECT {projection} {tail} LIMIT {n}"),
        }
    }

    /// The rule line embedded into generation prompts.
    pub fn prompt_rule(&self) -> &'static str {
        match self {
            RowLimit::Top => "Use TOP instead of LIMIT to cap row counts",
            RowLimit::Limit => "Use LIMIT to cap row counts; TOP is not supported",
        }
    }
}

/// What the resolver produced for one question.
///
/// Consumed exhaustively by the answer composer; exactly one variant flows
/// into the answer prompt per request.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// A generated query executed successfully and returned rows.
    AiQuery {
        sql: String,
        table: String,
        description: String,
        rows: Vec<Row>,
    },
    /// A simple COUNT query returned a non-zero scalar.
    Count {
        sql: String,
        table: String,
        value: i64,
    },
    /// A name search matched nothing exactly; close matches are offered instead.
    Suggestions {
        searched_name: String,
        names: Vec<String>,
        table: String,
    },
    /// The session may not read the detected table.
    AccessDenied { message: String },
    /// Listing of tables available in the database (legacy heuristic).
    Tables { names: Vec<String> },
    /// Rows from a fixed legacy heuristic query.
    LegacyRows {
        sql: String,
        description: String,
        rows: Vec<Row>,
    },
    /// Nothing usable was found for this question.
    Empty {
        sql: Option<String>,
        table: Option<String>,
    },
}

impl QueryOutcome {
    /// The SQL that produced this outcome, when one was run.
    pub fn sql(&self) -> Option<&str> {
        match self {
            QueryOutcome::AiQuery { sql, .. }
            | QueryOutcome::Count { sql, .. }
            | QueryOutcome::LegacyRows { sql, .. } => Some(sql),
            QueryOutcome::Empty { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }

    /// The table this outcome concerns, when known.
    pub fn table(&self) -> Option<&str> {
        match self {
            QueryOutcome::AiQuery { table, .. }
            | QueryOutcome::Count { table, .. }
            | QueryOutcome::Suggestions { table, .. } => Some(table),
            QueryOutcome::Empty { table, .. } => table.as_deref(),
            _ => None,
        }
    }
}

/// Tunable knobs that are not worth a full config system at the library level.
#[derive(Debug, Clone)]
pub struct ClientTuning {
    /// Company identity the internal-mode answer framing may mention.
    pub company_name: Option<String>,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: i64,
    pub session_idle_ttl_secs: i64,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            company_name: None,
            rate_limit_max_requests: crate::constants::RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_secs: crate::constants::RATE_LIMIT_WINDOW_SECS,
            session_idle_ttl_secs: crate::constants::SESSION_IDLE_TTL_SECS,
        }
    }
}

/// A client that turns natural-language questions into answers backed by the
/// configured storage and AI providers.
pub struct ChatClient {
    pub(crate) ai_provider: Box<dyn AiProvider>,
    pub(crate) storage_provider: Box<dyn Storage>,
    pub(crate) registry: TableRegistry,
    pub(crate) access: AccessPolicy,
    pub(crate) followup: FollowupEngine,
    pub(crate) schema_cache: SchemaCache,
    pub(crate) sessions: SessionStore,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) tuning: ClientTuning,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("storage", &self.storage_provider.name())
            .field("tables", &self.registry.table_names())
            .finish_non_exhaustive()
    }
}

/// A builder for creating `ChatClient` instances.
#[derive(Default)]
pub struct ChatClientBuilder {
    ai_provider: Option<Box<dyn AiProvider>>,
    storage_provider: Option<Box<dyn Storage>>,
    registry: Option<TableRegistry>,
    access: Option<AccessPolicy>,
    followup: Option<FollowupEngine>,
    tuning: Option<ClientTuning>,
}

impl ChatClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the AI provider.
    pub fn ai_provider(mut self, provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(provider);
        self
    }

    /// Sets the storage provider.
    pub fn storage_provider(mut self, provider: Box<dyn Storage>) -> Self {
        self.storage_provider = Some(provider);
        self
    }

    /// Overrides the built-in table registry.
    pub fn registry(mut self, registry: TableRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Overrides the built-in access policy.
    pub fn access_policy(mut self, access: AccessPolicy) -> Self {
        self.access = Some(access);
        self
    }

    /// Overrides the built-in follow-up phrase tables.
    pub fn followup_engine(mut self, followup: FollowupEngine) -> Self {
        self.followup = Some(followup);
        self
    }

    pub fn tuning(mut self, tuning: ClientTuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Builds the `ChatClient`.
    ///
    /// The schema cache starts cold; call [`ChatClient::warm_schema_cache`]
    /// once at startup to populate it. Fails when either provider is missing.
    pub fn build(self) -> Result<ChatClient, AskError> {
        let ai_provider = self.ai_provider.ok_or(AskError::MissingAiProvider)?;
        let storage_provider = self
            .storage_provider
            .ok_or(AskError::MissingStorageProvider)?;
        let tuning = self.tuning.unwrap_or_default();

        Ok(ChatClient {
            ai_provider,
            storage_provider,
            registry: self.registry.unwrap_or_default(),
            access: self.access.unwrap_or_default(),
            followup: self.followup.unwrap_or_default(),
            schema_cache: SchemaCache::new(),
            sessions: SessionStore::new(
                crate::constants::HISTORY_CAP,
                tuning.session_idle_ttl_secs,
            ),
            rate_limiter: RateLimiter::new(
                tuning.rate_limit_max_requests,
                tuning.rate_limit_window_secs,
            ),
            tuning,
        })
    }
}
