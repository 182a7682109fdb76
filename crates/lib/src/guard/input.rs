//! # Input Guard
//!
//! Sanitizes raw user text before anything else touches it, validates
//! session-id shape, and masks sensitive fragments on the way out.
//!
//! The injection detection here is a heuristic blacklist of known
//! prompt-override phrasings. It catches casual attempts, not determined
//! ones; the downstream SQL guard and a read-only database credential carry
//! the real weight.

use crate::constants::{DEBUG_TRAILER_MARKER, MAX_INPUT_CHARS, MAX_SPECIAL_CHARS};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Why a piece of user input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputViolation {
    Empty,
    TooLong,
    InjectionSuspected,
    ExcessiveSpecialChars,
}

impl InputViolation {
    pub fn reason(&self) -> &'static str {
        match self {
            InputViolation::Empty => "empty_input",
            InputViolation::TooLong => "input_too_long",
            InputViolation::InjectionSuspected => "injection_suspected",
            InputViolation::ExcessiveSpecialChars => "excessive_special_chars",
        }
    }
}

impl fmt::Display for InputViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InputViolation::Empty => "input is empty",
            InputViolation::TooLong => "input too long (max 2000 characters)",
            InputViolation::InjectionSuspected => "potential prompt injection detected",
            InputViolation::ExcessiveSpecialChars => "excessive special characters",
        };
        write!(f, "{text}")
    }
}

fn injection_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)ignore\s+(all\s+)?previous\s+instructions?",
            r"(?i)forget\s+(all\s+)?(previous|earlier)\s+instructions?",
            r"(?i)system\s*:\s*",
            r"(?i)assistant\s*:\s*",
            r"(?i)\[SYSTEM\]",
            r"(?i)\[INST\]",
            r"(?i)<\|system\|>",
            r"(?i)<\|assistant\|>",
            r"(?i)you\s+are\s+now",
            r"(?i)your\s+new\s+(role|instructions?|task)",
            r"(?i)disregard\s+(all\s+)?instructions?",
            r"(?i)override\s+instructions?",
            r"(?i)bypass\s+restrictions?",
            r"(?i)reveal\s+(your\s+)?(system\s+)?prompt",
            r"(?i)show\s+me\s+(your\s+)?(system\s+)?prompt",
            r"(?i)print\s+(your\s+)?(system\s+)?prompt",
            r"(?i)display\s+(your\s+)?(system\s+)?prompt",
            r"(?i)what\s+(is|are)\s+your\s+(system\s+)?instructions?",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static injection pattern"))
        .collect()
    })
}

/// Validates and normalizes a raw question.
///
/// On success returns the trimmed text with null bytes stripped and runs of
/// four or more newlines collapsed to three.
pub fn sanitize(input: &str) -> Result<String, InputViolation> {
    if input.trim().is_empty() {
        return Err(InputViolation::Empty);
    }
    if input.chars().count() > MAX_INPUT_CHARS {
        return Err(InputViolation::TooLong);
    }
    if injection_patterns().iter().any(|p| p.is_match(input)) {
        return Err(InputViolation::InjectionSuspected);
    }

    let special_chars = input
        .chars()
        .filter(|c| matches!(c, '<' | '>' | '{' | '}' | '[' | ']' | '\\' | '|'))
        .count();
    if special_chars > MAX_SPECIAL_CHARS {
        return Err(InputViolation::ExcessiveSpecialChars);
    }

    static NEWLINES: OnceLock<Regex> = OnceLock::new();
    let newlines = NEWLINES.get_or_init(|| Regex::new(r"\n{4,}").expect("static pattern"));

    let sanitized = input.trim().replace('\0', "");
    Ok(newlines.replace_all(&sanitized, "\n\n\n").into_owned())
}

/// Validates a session id: 3-100 characters of `[A-Za-z0-9_-]`.
pub fn valid_session_id(session_id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{3,100}$").expect("static pattern"));
    pattern.is_match(session_id)
}

/// Masks password-like assignments, opaque tokens, and e-mail local parts in
/// outgoing text.
pub fn mask_sensitive_data(text: &str) -> String {
    static PASSWORD: OnceLock<Regex> = OnceLock::new();
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    static EMAIL: OnceLock<Regex> = OnceLock::new();

    let password = PASSWORD.get_or_init(|| {
        Regex::new(r#"(?i)(password|pwd|pass)\s*[:=]\s*['"]?([A-Za-z0-9@!#$%^&*]{4,})['"]?"#)
            .expect("static pattern")
    });
    let token =
        TOKEN.get_or_init(|| Regex::new(r"[A-Za-z0-9_-]{32,}").expect("static pattern"));
    let email = EMAIL.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9._-]+)@([A-Za-z0-9.-]+\.[A-Za-z]{2,})").expect("static pattern")
    });

    let masked = password.replace_all(text, "$1: ****");
    let masked = token.replace_all(&masked, |caps: &regex::Captures| {
        let m = &caps[0];
        // Plain words of this length are prose, not credentials.
        if m.chars().all(|c| c.is_ascii_alphabetic()) {
            m.to_string()
        } else {
            format!("{}...{}", &m[..8], &m[m.len() - 4..])
        }
    });
    email
        .replace_all(&masked, |caps: &regex::Captures| {
            let user = &caps[1];
            if user.chars().count() <= 3 {
                caps[0].to_string()
            } else {
                format!("{}***@{}", &user[..3], &caps[2])
            }
        })
        .into_owned()
}

/// Removes a diagnostic trailer from an answer.
///
/// Applied to every answer shown to a session that is not in debug mode, so
/// a trailer can never leak even if the model echoes one back.
pub fn strip_debug_trailer(text: &str) -> String {
    match text.find(DEBUG_TRAILER_MARKER) {
        Some(idx) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
