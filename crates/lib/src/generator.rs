//! # Text-to-SQL Generation
//!
//! Turns a question plus cached table metadata into a candidate query, and
//! parses short follow-ups into WHERE-clause fragments. Everything the model
//! returns is untrusted: responses are stripped of markdown fences and must
//! pass the SQL guard before the caller is given anything. A response that
//! fails validation is "no usable query", not an error.

use crate::constants::{GENERATED_ROW_CAP, NO_FILTER_SENTINEL};
use crate::errors::AskError;
use crate::guard;
use crate::prompts::core as prompts;
use crate::registry::TableMapping;
use crate::schema::SchemaEntry;
use crate::types::{ChatClient, FieldType, TableField};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Pulls the payload out of a fenced markdown block, if the model added one.
pub(crate) fn strip_code_fences(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE
        .get_or_init(|| Regex::new(r"```(?:sql|query)?\n?([\s\S]*?)```").expect("static pattern"));
    fence
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.trim().to_string())
}

fn describe_field(field: &TableField, mapping: &TableMapping) -> String {
    let type_name = match field.r#type {
        FieldType::Integer => "INTEGER",
        FieldType::Float => "FLOAT",
        FieldType::String => "TEXT",
        FieldType::Bytes => "BLOB",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Date => "DATE",
    };
    let length = field
        .max_length
        .map(|l| format!("({l})"))
        .unwrap_or_default();
    let nullability = if field.nullable { "NULL" } else { "NOT NULL" };

    let aliases: Vec<&str> = mapping
        .field_aliases
        .iter()
        .filter(|(_, column)| *column == &field.name)
        .map(|(alias, _)| alias.as_str())
        .collect();
    let alias_note = if aliases.is_empty() {
        String::new()
    } else {
        let mut sorted = aliases;
        sorted.sort_unstable();
        format!(" -- aliases: {}", sorted.join(", "))
    };

    format!("{} {type_name}{length} {nullability}{alias_note}", field.name)
}

impl ChatClient {
    /// Generates a candidate query for a question about one table.
    ///
    /// Returns `Ok(None)` when the model's output is unusable (not a SELECT,
    /// fails the SQL guard). Transport failures propagate for the caller to
    /// degrade as it sees fit.
    pub(crate) async fn generate_sql(
        &self,
        question: &str,
        mapping: &TableMapping,
        entry: &SchemaEntry,
    ) -> Result<Option<String>, AskError> {
        let schema_text = entry
            .schema
            .fields
            .iter()
            .map(|field| describe_field(field, mapping))
            .collect::<Vec<_>>()
            .join("\n");
        let samples = serde_json::to_string_pretty(&entry.sample_rows)?;

        let system_prompt = prompts::render(
            prompts::SQL_GENERATION_SYSTEM_PROMPT,
            &[
                ("language", self.storage_provider.language()),
                ("db_name", self.storage_provider.name()),
            ],
        );
        let row_cap = GENERATED_ROW_CAP.to_string();
        let user_prompt = prompts::render(
            prompts::SQL_GENERATION_USER_PROMPT,
            &[
                ("table", &mapping.table_name),
                ("description", &mapping.description),
                ("schema", &schema_text),
                ("samples", &samples),
                ("question", question),
                ("limit_rule", self.storage_provider.row_limit().prompt_rule()),
                ("row_cap", &row_cap),
            ],
        );

        let raw = self
            .ai_provider
            .generate(&system_prompt, &user_prompt)
            .await?;
        let sql = strip_code_fences(&raw);
        debug!(table = %mapping.table_name, sql = %sql, "<-- Generated query");

        match guard::sql::validate(&sql) {
            Ok(()) => Ok(Some(sql)),
            Err(violation) => {
                warn!(%violation, sql = %sql, "Generated query rejected by SQL guard");
                Ok(None)
            }
        }
    }

    /// Parses a filter-shaped follow-up into a WHERE-clause fragment.
    ///
    /// Returns `Ok(None)` when the model answers with the cannot-parse
    /// sentinel or something clearly unusable.
    pub(crate) async fn parse_follow_up_filter(
        &self,
        followup: &str,
        mapping: &TableMapping,
    ) -> Result<Option<String>, AskError> {
        let system_prompt = prompts::render(
            prompts::FOLLOWUP_FILTER_SYSTEM_PROMPT,
            &[("sentinel", NO_FILTER_SENTINEL)],
        );
        let aliases = mapping.alias_summary();
        let user_prompt = prompts::render(
            prompts::FOLLOWUP_FILTER_USER_PROMPT,
            &[
                ("aliases", &aliases),
                ("followup", followup),
                ("sentinel", NO_FILTER_SENTINEL),
            ],
        );

        let raw = self
            .ai_provider
            .generate(&system_prompt, &user_prompt)
            .await?;
        let cleaned = strip_code_fences(&raw);
        let trimmed = cleaned.trim();
        let fragment = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("WHERE ") => trimmed[6..].trim(),
            _ => trimmed,
        }
        .to_string();

        if fragment.is_empty()
            || fragment.to_uppercase().contains(NO_FILTER_SENTINEL)
            || fragment.contains(';')
        {
            return Ok(None);
        }
        Ok(Some(fragment))
    }

    /// Asks the model to rewrite a previous question around a new subject.
    pub(crate) async fn rewrite_question_for_entity(
        &self,
        previous_question: &str,
        current_question: &str,
    ) -> Result<Option<String>, AskError> {
        let user_prompt = prompts::render(
            prompts::ENTITY_REWRITE_USER_PROMPT,
            &[
                ("previous_question", previous_question),
                ("current_question", current_question),
            ],
        );
        let raw = self
            .ai_provider
            .generate(prompts::ENTITY_REWRITE_SYSTEM_PROMPT, &user_prompt)
            .await?;
        let rewritten = strip_code_fences(&raw).trim_matches('"').trim().to_string();

        Ok((!rewritten.is_empty()).then_some(rewritten))
    }
}
