//! # Shared Constants
//!
//! Centralized limits and markers shared across the library, to avoid magic
//! numbers drifting apart between the guards, the resolver, and the composer.

/// Maximum length of a raw user question, in characters.
pub const MAX_INPUT_CHARS: usize = 2000;

/// Maximum number of `<>{}[]\|` characters tolerated in a question.
pub const MAX_SPECIAL_CHARS: usize = 10;

/// Maximum length of a generated SQL query, in characters.
pub const MAX_SQL_CHARS: usize = 5000;

/// Per-session message history cap; the oldest messages are evicted first.
pub const HISTORY_CAP: usize = 20;

/// Number of recent exchanges rendered into the answer prompt transcript.
pub const RECENT_EXCHANGES: usize = 5;

/// Row cap instructed for generated queries.
pub const GENERATED_ROW_CAP: u32 = 100;

/// Number of sample rows cached per table for prompt context.
pub const SCHEMA_SAMPLE_ROWS: u32 = 2;

/// Maximum distinct names returned by the fuzzy name suggestion query.
pub const SUGGESTION_LIMIT: u32 = 5;

/// Default rate limit: requests per window.
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 30;

/// Default rate limit window, in seconds.
pub const RATE_LIMIT_WINDOW_SECS: i64 = 60;

/// Sessions idle longer than this are swept.
pub const SESSION_IDLE_TTL_SECS: i64 = 2 * 60 * 60;

/// Placeholder recorded in history instead of a password.
pub const MASKED_CONTENT: &str = "****";

/// First line of the diagnostic trailer appended for debug-mode sessions.
/// Anything from this marker onward is stripped from answers shown to
/// sessions that are not in debug mode.
pub const DEBUG_TRAILER_MARKER: &str = "---\n[debug]";

/// Sentinel the follow-up filter prompt uses for "cannot parse".
pub const NO_FILTER_SENTINEL: &str = "NO_FILTER";
