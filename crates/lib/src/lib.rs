//! # Natural Language to Database Answers
//!
//! This crate fronts a relational database with free-text questions: it maps
//! a question to a known table, asks a configurable AI provider to translate
//! it into SQL, validates and executes that SQL against a storage provider,
//! and asks the AI again to phrase a natural-language answer from the
//! results. Per-session conversation state lets elliptical follow-ups
//! ("yang tahun 2025 saja") resolve against the prior turn.

pub mod access;
pub mod composer;
pub mod constants;
pub mod errors;
pub mod followup;
pub mod generator;
pub mod guard;
pub mod prompts;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod types;

pub use errors::AskError;
pub use types::{AskRequest, AskResponse, ChatClient, ChatClientBuilder, Mode, QueryOutcome};

use crate::guard::input::{mask_sensitive_data, sanitize, strip_debug_trailer, valid_session_id};
use crate::session::{AuthState, AuthTurn, Message};
use chrono::Utc;
use tracing::{debug, info};

impl ChatClient {
    /// Answers one question.
    ///
    /// Enforced in order: session-id shape, rate limit, input sanitization,
    /// the debug-authentication state machine, follow-up/entity rewriting,
    /// query resolution (internal mode only), answer composition. Soft data
    /// failures degrade into graceful answers; only a failed answer-generation
    /// call surfaces as an error, since no answer can be produced at all.
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, AskError> {
        let session_id = match request.session_id {
            Some(id) => {
                if !valid_session_id(&id) {
                    return Err(AskError::InvalidSessionId);
                }
                id
            }
            None => uuid::Uuid::new_v4().simple().to_string(),
        };

        let decision = self.rate_limiter.check(&session_id);
        if !decision.allowed {
            return Err(AskError::RateLimited {
                retry_after_secs: (decision.reset_at - Utc::now()).num_seconds().max(0),
            });
        }

        let question = sanitize(&request.question).map_err(AskError::InputRejected)?;
        info!(%session_id, mode = ?request.mode, "Handling question");

        if let Some(response) = self.handle_auth_turn(&session_id, &question).await {
            return Ok(response);
        }

        let session = self.sessions.get_or_create(&session_id).await;
        self.sessions.touch(&session_id).await;

        let outcome = match request.mode {
            Mode::Internal => Some(self.resolve_for_turn(&question, &session).await),
            Mode::External => None,
        };
        debug!(?outcome, "Resolved question");

        let (system_prompt, user_prompt) =
            self.compose_answer_request(&question, outcome.as_ref(), &session, request.mode)?;
        let raw = self
            .ai_provider
            .generate(&system_prompt, &user_prompt)
            .await?;

        // Strip any trailer the model may have echoed, then append the real
        // one for debug sessions only.
        let mut answer = strip_debug_trailer(&mask_sensitive_data(&raw));
        let debug_active = session.auth_state == AuthState::Authenticated && session.debug_mode;
        if debug_active {
            answer.push_str(&self.build_debug_trailer(outcome.as_ref()));
        }

        let (sql, table) = match &outcome {
            Some(o) => (
                o.sql().map(str::to_string),
                o.table().map(str::to_string),
            ),
            None => (None, None),
        };
        self.sessions
            .append(&session_id, Message::user(question).with_query(sql, table))
            .await;
        self.sessions
            .append(&session_id, Message::assistant(answer.clone()))
            .await;

        Ok(AskResponse { answer, session_id })
    }

    /// Runs the authentication state machine for this turn. Returns a canned
    /// response when the turn belonged to the auth exchange; such turns never
    /// reach the resolver or the AI provider.
    async fn handle_auth_turn(&self, session_id: &str, question: &str) -> Option<AskResponse> {
        let turn = self
            .sessions
            .advance_auth(session_id, question, &self.access)
            .await;

        let (user_message, answer) = match turn {
            AuthTurn::NotAuthRelated => return None,
            AuthTurn::PasswordRequested { full_name } => (
                // The claim itself is kept; the context engine skips it.
                Message::user(question),
                format!(
                    "Halo {full_name}! Silakan masukkan password Anda untuk mengaktifkan mode debug."
                ),
            ),
            AuthTurn::Authenticated { full_name } => (
                Message::masked_user(),
                format!(
                    "Password benar. Selamat datang, {full_name}! Mode debug aktif untuk sesi ini."
                ),
            ),
            AuthTurn::WrongPassword => (
                Message::masked_user(),
                "Password salah. Silakan mulai lagi dengan menyebutkan nama Anda.".to_string(),
            ),
        };

        self.sessions.append(session_id, user_message).await;
        self.sessions
            .append(session_id, Message::assistant(answer.clone()))
            .await;

        Some(AskResponse {
            answer,
            session_id: session_id.to_string(),
        })
    }

    /// Introspects every registered table once. Call at startup; failures
    /// degrade the affected tables to legacy lookups rather than erroring.
    pub async fn warm_schema_cache(&self) {
        self.schema_cache
            .warm(self.storage_provider.as_ref(), &self.registry)
            .await;
        info!(
            cached = self.schema_cache.len().await,
            "Schema cache warmed"
        );
    }

    /// Evicts idle sessions and stale rate-limit windows. Intended to be
    /// called periodically from a background task.
    pub async fn sweep_idle_state(&self) {
        self.sessions.sweep_idle().await;
        self.rate_limiter.sweep();
    }

    /// The session store, exposed for inspection and tests.
    pub fn sessions(&self) -> &session::SessionStore {
        &self.sessions
    }

    /// The schema cache, exposed for inspection and tests.
    pub fn schema_cache(&self) -> &schema::SchemaCache {
        &self.schema_cache
    }
}
