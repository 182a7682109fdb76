//! # Session Store
//!
//! Process-wide conversation state keyed by session id: bounded message
//! history, the debug-authentication state machine, and an idle-TTL sweep.
//! Sessions are created lazily on first contact and only ever mutated through
//! the store's operations.
//!
//! There is no per-session mutex: two concurrent requests reusing one session
//! id interleave their appends in arrival order. A single-user chat UI never
//! does this; anything else must accept the interleaving.

use crate::access::AccessPolicy;
use crate::constants::MASKED_CONTENT;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// The SQL the resolver ran for this turn, kept for follow-up resolution.
    pub sql_query: Option<String>,
    pub table_name: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            sql_query: None,
            table_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            sql_query: None,
            table_name: None,
        }
    }

    pub fn with_query(mut self, sql: Option<String>, table: Option<String>) -> Self {
        self.sql_query = sql;
        self.table_name = table;
        self
    }

    /// A password turn, recorded masked so the raw secret never enters history.
    pub fn masked_user() -> Self {
        Self::user(MASKED_CONTENT)
    }
}

/// The debug-authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    None,
    PendingPassword,
    Authenticated,
}

/// One conversation's state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub history: VecDeque<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub auth_state: AuthState,
    pub debug_mode: bool,
    /// Full name of the authenticated identity.
    pub user_name: Option<String>,
    /// Credential-table key of the pending or authenticated identity.
    pub user_key: Option<String>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: VecDeque::new(),
            created_at: now,
            last_activity: now,
            auth_state: AuthState::None,
            debug_mode: false,
            user_name: None,
            user_key: None,
        }
    }

    /// The session's user messages, most recent last.
    pub fn user_messages(&self) -> Vec<&Message> {
        self.history.iter().filter(|m| m.role == Role::User).collect()
    }

    /// The most recent user message that carried a SQL query.
    pub fn last_query_message(&self) -> Option<&Message> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::User && m.sql_query.is_some())
    }
}

/// What one message meant to the authentication state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthTurn {
    /// The message is an ordinary question.
    NotAuthRelated,
    /// An identity claim was recognized; the next message is its password.
    PasswordRequested { full_name: String },
    /// The correct password arrived; the session is now in debug mode.
    Authenticated { full_name: String },
    /// The wrong password arrived; the machine reset to the start.
    WrongPassword,
}

/// Process-wide map of session id -> session.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    history_cap: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(history_cap: usize, idle_ttl_secs: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_cap,
            idle_ttl: Duration::seconds(idle_ttl_secs),
        }
    }

    /// Creates the session when absent and returns a snapshot of it.
    pub async fn get_or_create(&self, session_id: &str) -> Session {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "Creating new session");
                Session::new(session_id.to_string())
            })
            .clone()
    }

    /// A snapshot of the session, if it exists.
    pub async fn snapshot(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Appends a message, evicting the oldest entries past the history cap.
    pub async fn append(&self, session_id: &str, message: Message) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));
        session.history.push_back(message);
        while session.history.len() > self.history_cap {
            session.history.pop_front();
        }
        session.last_activity = Utc::now();
    }

    /// Refreshes the session's last-activity timestamp.
    pub async fn touch(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.last_activity = Utc::now();
        }
    }

    /// Advances the authentication state machine with one incoming message.
    ///
    /// Transitions: an identity claim (`saya <registered name>`) moves the
    /// machine to pending-password; the next message equal to that identity's
    /// password authenticates the session and switches debug mode on; anything
    /// else resets to the start. A bare password with no prior claim is an
    /// ordinary question.
    pub async fn advance_auth(
        &self,
        session_id: &str,
        input: &str,
        policy: &AccessPolicy,
    ) -> AuthTurn {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));

        match session.auth_state {
            AuthState::PendingPassword => {
                let Some(key) = session.user_key.clone() else {
                    session.auth_state = AuthState::None;
                    return AuthTurn::NotAuthRelated;
                };
                let Some(credential) = policy.user(&key) else {
                    session.auth_state = AuthState::None;
                    session.user_key = None;
                    return AuthTurn::WrongPassword;
                };

                if input.trim() == credential.password {
                    session.auth_state = AuthState::Authenticated;
                    session.debug_mode = true;
                    session.user_name = Some(credential.full_name.clone());
                    info!(session_id, user = %credential.full_name, "Session authenticated, debug mode on");
                    AuthTurn::Authenticated {
                        full_name: credential.full_name.clone(),
                    }
                } else {
                    session.auth_state = AuthState::None;
                    session.user_key = None;
                    AuthTurn::WrongPassword
                }
            }
            AuthState::None => match policy.find_identity_claim(input) {
                Some(key) => {
                    let full_name = policy
                        .user(key)
                        .map(|c| c.full_name.clone())
                        .unwrap_or_else(|| key.to_string());
                    session.auth_state = AuthState::PendingPassword;
                    session.user_key = Some(key.to_string());
                    AuthTurn::PasswordRequested { full_name }
                }
                None => AuthTurn::NotAuthRelated,
            },
            AuthState::Authenticated => AuthTurn::NotAuthRelated,
        }
    }

    /// Evicts sessions idle past the TTL; returns how many were removed.
    pub async fn sweep_idle(&self) -> usize {
        let cutoff = Utc::now() - self.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_activity > cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "Swept idle sessions");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
