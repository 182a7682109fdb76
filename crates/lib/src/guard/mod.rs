//! # Guards
//!
//! Validation layers that sit between untrusted text and the rest of the
//! pipeline: user input sanitization, generated-SQL validation, and
//! per-session rate limiting. All of them are heuristic filters, documented
//! as defense-in-depth rather than guarantees.

pub mod input;
pub mod rate_limit;
pub mod sql;
