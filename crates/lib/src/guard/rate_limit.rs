//! # Rate Limiter
//!
//! A fixed-window counter per session id. Windows reset lazily on the first
//! request after expiry; long-idle entries are evicted by `sweep`, which the
//! server calls from its background task.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct WindowRecord {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// The outcome of one rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Process-wide fixed-window rate limiter keyed by session id.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    store: Mutex<HashMap<String, WindowRecord>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: i64) -> Self {
        Self {
            max_requests,
            window: Duration::seconds(window_secs),
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request against the session's window.
    pub fn check(&self, session_id: &str) -> RateDecision {
        let now = Utc::now();
        let mut store = self.store.lock().expect("rate limit store poisoned");

        let record = store
            .entry(session_id.to_string())
            .or_insert_with(|| WindowRecord {
                count: 0,
                reset_at: now + self.window,
            });

        if now > record.reset_at {
            record.count = 0;
            record.reset_at = now + self.window;
        }

        if record.count >= self.max_requests {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_at: record.reset_at,
            };
        }

        record.count += 1;
        RateDecision {
            allowed: true,
            remaining: self.max_requests - record.count,
            reset_at: record.reset_at,
        }
    }

    /// Evicts entries whose window expired more than a minute ago.
    pub fn sweep(&self) {
        let cutoff = Utc::now() - Duration::seconds(60);
        let mut store = self.store.lock().expect("rate limit store poisoned");
        store.retain(|_, record| record.reset_at > cutoff);
    }

    pub fn tracked_sessions(&self) -> usize {
        self.store.lock().expect("rate limit store poisoned").len()
    }
}
