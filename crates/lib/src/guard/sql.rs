//! # SQL Guard
//!
//! Validates AI-generated SQL before it is allowed anywhere near the storage
//! provider. This is keyword and pattern matching, not a SQL parser: it can
//! over-block legitimate queries (a column literally named `union_count`
//! trips the UNION check) and a sufficiently obfuscated payload can slip
//! past it. Treat it as defense-in-depth; the real safeguard is running the
//! storage connection under a read-only credential.

use crate::constants::MAX_SQL_CHARS;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Why a candidate query was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlViolation {
    ForbiddenOperation(String),
    NotASelect,
    MultipleStatements,
    SuspiciousPattern(String),
    TooLong,
}

impl fmt::Display for SqlViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlViolation::ForbiddenOperation(op) => {
                write!(f, "dangerous SQL operation: {op}")
            }
            SqlViolation::NotASelect => write!(f, "only SELECT queries are allowed"),
            SqlViolation::MultipleStatements => {
                write!(f, "multiple SQL statements are not allowed")
            }
            SqlViolation::SuspiciousPattern(p) => write!(f, "suspicious SQL pattern: {p}"),
            SqlViolation::TooLong => write!(f, "SQL query too long (max 5000 characters)"),
        }
    }
}

/// Operations and fragments that must never appear in a generated query.
/// Matched as plain substrings of the uppercased query.
const FORBIDDEN_OPERATIONS: &[&str] = &[
    "DROP",
    "DELETE",
    "TRUNCATE",
    "ALTER",
    "CREATE",
    "INSERT",
    "UPDATE",
    "EXEC",
    "EXECUTE",
    "SP_",
    "XP_",
    "BACKUP",
    "RESTORE",
    "SHUTDOWN",
    "GRANT",
    "REVOKE",
    "DENY",
    ";--",
    "UNION",
    "0X",
    "CHAR(",
    "CONCAT(",
    "WAITFOR",
    "BENCHMARK",
    "SLEEP(",
];

fn suspicious_patterns() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"--\s*$", "trailing comment"),
            (r"/\*.*\*/", "block comment"),
            (r"(?i)'\s*OR\s*'.*'=", "OR injection"),
            (r"(?i)'\s*OR\s*1\s*=\s*1", "OR 1=1 injection"),
            (r"(?i)'\s*AND\s*1\s*=\s*1", "AND 1=1 injection"),
            (r"(?i)'\s*OR\s*'.*'<>", "OR inequality injection"),
            (r"(?i)UNION\s+SELECT", "UNION SELECT"),
            (r"(?i)INTO\s+OUTFILE", "file write"),
            (r"(?i)LOAD_FILE", "file read"),
            (r"(?i)BENCHMARK\s*\(", "benchmark"),
        ]
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("static pattern"), *label))
        .collect()
    })
}

/// Validates a candidate query against the allow/deny policy.
pub fn validate(sql: &str) -> Result<(), SqlViolation> {
    let upper = sql.to_uppercase();
    let upper = upper.trim();

    for operation in FORBIDDEN_OPERATIONS {
        if upper.contains(operation) {
            return Err(SqlViolation::ForbiddenOperation(operation.to_string()));
        }
    }

    if !upper.starts_with("SELECT") {
        return Err(SqlViolation::NotASelect);
    }

    let statements = sql.split(';').filter(|s| !s.trim().is_empty()).count();
    if statements > 1 {
        return Err(SqlViolation::MultipleStatements);
    }

    for (pattern, label) in suspicious_patterns() {
        if pattern.is_match(sql) {
            return Err(SqlViolation::SuspiciousPattern(label.to_string()));
        }
    }

    if sql.chars().count() > MAX_SQL_CHARS {
        return Err(SqlViolation::TooLong);
    }

    Ok(())
}

/// Escapes a string literal for inclusion in a query (doubles single quotes).
pub fn escape_string(value: &str) -> String {
    value.replace('\'', "''")
}
