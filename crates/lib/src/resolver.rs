//! # Query Resolver
//!
//! The per-request pipeline: table detection, access check, follow-up WHERE
//! extension or full generation, guarded execution, result classification,
//! fuzzy name suggestions, and the legacy heuristic fallbacks. Soft failures
//! never leave this module as errors - a question that cannot be answered
//! from the database degrades into a legacy lookup or an empty outcome, and
//! the composer phrases that gracefully.

use crate::constants::SUGGESTION_LIMIT;
use crate::guard::{self, sql::escape_string};
use crate::registry::TableMapping;
use crate::session::{AuthState, Session};
use crate::types::{ChatClient, QueryOutcome, Row};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Extracts the new subject from an entity-substitution turn
/// ("kalau Budi?", "bagaimana dengan Siti").
pub(crate) fn entity_substitution_target(question: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(kalau|bagaimana dengan|how about|what about)\s+(.+?)\s*\??$")
            .expect("static pattern")
    });
    pattern
        .captures(question.trim())
        .map(|caps| caps[2].to_string())
}

/// True for a plain COUNT query whose single scalar decides "found or not".
fn is_simple_count(sql: &str) -> bool {
    let upper = sql.to_uppercase();
    upper.contains("COUNT(") && !upper.contains("GROUP BY")
}

/// Reads the count from the first column of the first row.
///
/// This mirrors the long-standing behavior of this pipeline: if a generated
/// query selects the count in a later column, the wrong value is read. Rows
/// keep SELECT column order, which keeps this correct for the queries the
/// generation prompt asks for.
fn scalar_count(rows: &[Row]) -> Option<i64> {
    rows.first()
        .and_then(|row| row.values().next())
        .and_then(|value| value.as_i64())
}

/// Splices an extra condition into an existing query's WHERE clause, keeping
/// any trailing GROUP BY / ORDER BY in place.
fn extend_where(sql: &str, fragment: &str) -> String {
    let upper = sql.to_uppercase();
    let tail_start = upper
        .find(" ORDER BY ")
        .into_iter()
        .chain(upper.find(" GROUP BY "))
        .min()
        .unwrap_or(sql.len());
    let (head, tail) = sql.split_at(tail_start);

    if head.to_uppercase().contains(" WHERE ") {
        format!("{head} AND ({fragment}){tail}")
    } else {
        format!("{head} WHERE {fragment}{tail}")
    }
}

impl ChatClient {
    /// Resolves one turn, applying entity substitution once when it fits.
    ///
    /// `kalau <name>?` over a turn that previously produced SQL asks the
    /// model to rewrite the previous *question* around the new subject, then
    /// resolves the rewritten question through the normal pipeline. The
    /// substitution happens at most once per request by construction -
    /// `resolve_question` never re-enters it - so a rewritten question that
    /// still looks like a substitution cannot loop.
    pub(crate) async fn resolve_for_turn(
        &self,
        question: &str,
        session: &Session,
    ) -> QueryOutcome {
        if entity_substitution_target(question).is_some() {
            if let Some(previous) = session.last_query_message() {
                match self
                    .rewrite_question_for_entity(&previous.content, question)
                    .await
                {
                    Ok(Some(rewritten)) => {
                        info!(from = question, to = %rewritten, "Entity substitution rewrite");
                        return self.resolve_question(&rewritten, session).await;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Entity rewrite failed; using template path"),
                }
            }
        }

        let history: Vec<_> = session.history.iter().cloned().collect();
        let auth_names: Vec<String> = self.access.users.keys().cloned().collect();
        let effective = self
            .followup
            .build_context_query(question, &history, &auth_names);

        self.resolve_question(&effective, session).await
    }

    /// The resolution state machine for one standalone question.
    pub(crate) async fn resolve_question(
        &self,
        question: &str,
        session: &Session,
    ) -> QueryOutcome {
        let Some(mapping) = self.registry.find_mapping(question) else {
            debug!(question, "No table mapping matched; trying legacy lookup");
            return self.legacy_lookup(question).await;
        };

        let access = self.access.check_table_access(&mapping.table_name, session);
        if !access.allowed {
            info!(table = %mapping.table_name, "Table access denied for session");
            return QueryOutcome::AccessDenied {
                message: access
                    .denial_message
                    .unwrap_or_else(|| "Anda tidak memiliki akses untuk tabel ini.".to_string()),
            };
        }

        let Some(entry) = self.schema_cache.get(&mapping.table_name).await else {
            debug!(table = %mapping.table_name, "No cached schema; trying legacy lookup");
            return self.legacy_lookup(question).await;
        };

        // A filter-shaped follow-up over the same table extends the previous
        // query's WHERE clause instead of regenerating from scratch.
        let mut sql = None;
        if let Some(detected) = self.followup.detect(question) {
            if detected.kind.is_filter() {
                if let Some(previous) = session.last_query_message() {
                    if previous.table_name.as_deref() == Some(mapping.table_name.as_str()) {
                        if let Some(previous_sql) = previous.sql_query.as_deref() {
                            match self.parse_follow_up_filter(question, mapping).await {
                                Ok(Some(fragment)) => {
                                    let extended = extend_where(previous_sql, &fragment);
                                    debug!(sql = %extended, "Extended previous query");
                                    sql = Some(extended);
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    warn!(error = %e, "Follow-up filter parse failed")
                                }
                            }
                        }
                    }
                }
            }
        }

        if sql.is_none() {
            sql = match self.generate_sql(question, mapping, &entry).await {
                Ok(generated) => generated,
                Err(e) => {
                    warn!(error = %e, "Query generation failed; trying legacy lookup");
                    return self.legacy_lookup(question).await;
                }
            };
        }

        let Some(sql) = sql else {
            return self.legacy_lookup(question).await;
        };

        // Generated or spliced, the query never reaches storage unvalidated.
        if let Err(violation) = guard::sql::validate(&sql) {
            warn!(%violation, "Candidate query rejected; trying legacy lookup");
            return self.legacy_lookup(question).await;
        }

        let rows = match self.storage_provider.execute_query(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Query execution failed; trying legacy lookup");
                return self.legacy_lookup(question).await;
            }
        };

        self.classify_result(mapping, sql, rows, session).await
    }

    /// Classifies an executed query's rows into an outcome.
    async fn classify_result(
        &self,
        mapping: &TableMapping,
        sql: String,
        rows: Vec<Row>,
        session: &Session,
    ) -> QueryOutcome {
        if is_simple_count(&sql) {
            if let Some(value) = scalar_count(&rows) {
                if value == 0 {
                    // A zero count is "nothing found", not an answer of 0.
                    return self.no_results(mapping, sql).await;
                }
                return QueryOutcome::Count {
                    sql,
                    table: mapping.table_name.clone(),
                    value,
                };
            }
        }

        if rows.is_empty() {
            return self.no_results(mapping, sql).await;
        }

        let authenticated = session.auth_state == AuthState::Authenticated;
        let filtered = mapping.filter_fields_by_auth(&rows, authenticated);

        QueryOutcome::AiQuery {
            sql,
            table: mapping.table_name.clone(),
            description: mapping.description.clone(),
            rows: filtered,
        }
    }

    /// Handles a query that found nothing: a name search gets fuzzy
    /// suggestions, anything else an empty outcome.
    async fn no_results(&self, mapping: &TableMapping, sql: String) -> QueryOutcome {
        if let Some(outcome) = self.fuzzy_suggestions(mapping, &sql).await {
            return outcome;
        }
        QueryOutcome::Empty {
            sql: Some(sql),
            table: Some(mapping.table_name.clone()),
        }
    }

    /// Offers close name matches when an exact name search came up empty.
    ///
    /// The searched name is recovered from the query's LIKE pattern against
    /// the table's name column, split into tokens, and re-queried as an
    /// OR-of-LIKE. At most five distinct names come back.
    async fn fuzzy_suggestions(
        &self,
        mapping: &TableMapping,
        sql: &str,
    ) -> Option<QueryOutcome> {
        let name_column = mapping.name_column()?;
        let pattern = Regex::new(&format!(
            r"(?i){}\s+LIKE\s+'([^']+)'",
            regex::escape(name_column)
        ))
        .ok()?;
        let raw_pattern = pattern.captures(sql)?.get(1)?.as_str();

        let searched_name = raw_pattern.replace('%', " ").trim().to_string();
        let tokens: Vec<&str> = searched_name
            .split_whitespace()
            .filter(|t| t.chars().count() >= 2)
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let conditions = tokens
            .iter()
            .map(|token| format!("{name_column} LIKE '%{}%'", escape_string(token)))
            .collect::<Vec<_>>()
            .join(" OR ");
        let suggestion_sql = self.storage_provider.row_limit().select(
            &format!("DISTINCT {name_column}"),
            &format!("FROM {} WHERE {conditions}", mapping.table_name),
            SUGGESTION_LIMIT,
        );
        debug!(sql = %suggestion_sql, "Running fuzzy name suggestion query");

        let rows = match self.storage_provider.execute_query(&suggestion_sql).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Fuzzy suggestion query failed");
                return None;
            }
        };

        let mut seen = Vec::new();
        for row in &rows {
            if let Some(name) = row.values().next().and_then(|v| v.as_str()) {
                if !name.is_empty() && !seen.iter().any(|s: &String| s.eq_ignore_ascii_case(name))
                {
                    seen.push(name.to_string());
                }
            }
            if seen.len() as u32 >= SUGGESTION_LIMIT {
                break;
            }
        }
        if seen.is_empty() {
            return None;
        }

        Some(QueryOutcome::Suggestions {
            searched_name,
            names: seen,
            table: mapping.table_name.clone(),
        })
    }

    /// The fixed heuristic queries used when generation is unavailable.
    ///
    /// The employees branch that used to live here was retired once generated
    /// queries covered it, and stays retired.
    async fn legacy_lookup(&self, question: &str) -> QueryOutcome {
        let lower = question.to_lowercase();
        let limit = self.storage_provider.row_limit();

        if ["data", "informasi", "jumlah", "berapa"]
            .iter()
            .any(|k| lower.contains(k))
        {
            match self.storage_provider.list_tables().await {
                Ok(names) if !names.is_empty() => {
                    return QueryOutcome::Tables { names };
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Table listing failed"),
            }
        }

        if lower.contains("penduduk") {
            let sql = limit.select("*", "FROM penduduk ORDER BY id DESC", 10);
            if let Some(outcome) = self
                .legacy_rows(&sql, "Data penduduk dari database")
                .await
            {
                return outcome;
            }
        }

        if lower.contains("berita") || lower.contains("news") {
            let sql = limit.select("*", "FROM berita ORDER BY id DESC", 10);
            if let Some(outcome) = self.legacy_rows(&sql, "Data berita dari database").await {
                return outcome;
            }
        }

        QueryOutcome::Empty {
            sql: None,
            table: None,
        }
    }

    async fn legacy_rows(&self, sql: &str, description: &str) -> Option<QueryOutcome> {
        match self.storage_provider.execute_query(sql).await {
            Ok(rows) if !rows.is_empty() => Some(QueryOutcome::LegacyRows {
                sql: sql.to_string(),
                description: description.to_string(),
                rows,
            }),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, sql, "Legacy query failed");
                None
            }
        }
    }
}
