//! # Answer Composer
//!
//! Builds the final generation request: a mode-selected system framing, the
//! bounded recent transcript, and exactly one payload branch drawn from the
//! resolver's outcome. Also owns the debug trailer appended for
//! authenticated debug sessions.

use crate::constants::{DEBUG_TRAILER_MARKER, RECENT_EXCHANGES};
use crate::errors::AskError;
use crate::prompts::core as prompts;
use crate::session::{Role, Session};
use crate::types::{ChatClient, Mode, QueryOutcome};

impl ChatClient {
    /// Assembles the (system, user) prompt pair for one answer.
    pub(crate) fn compose_answer_request(
        &self,
        question: &str,
        outcome: Option<&QueryOutcome>,
        session: &Session,
        mode: Mode,
    ) -> Result<(String, String), AskError> {
        let system_prompt = match mode {
            Mode::Internal => {
                let company = self
                    .tuning
                    .company_name
                    .as_deref()
                    .unwrap_or("perusahaan ini");
                prompts::render(prompts::ANSWER_SYSTEM_INTERNAL, &[("company", company)])
            }
            Mode::External => prompts::ANSWER_SYSTEM_EXTERNAL.to_string(),
        };

        let mut user_prompt = String::new();
        let transcript = self.render_transcript(session);
        if !transcript.is_empty() {
            user_prompt.push_str(&prompts::render(
                prompts::TRANSCRIPT_PREAMBLE,
                &[("transcript", &transcript)],
            ));
        }
        user_prompt.push_str(&self.render_payload(question, outcome, mode)?);

        Ok((system_prompt, user_prompt))
    }

    /// The most recent exchanges, as alternating role-labelled lines.
    fn render_transcript(&self, session: &Session) -> String {
        let recent = RECENT_EXCHANGES * 2;
        let skip = session.history.len().saturating_sub(recent);
        session
            .history
            .iter()
            .skip(skip)
            .map(|message| {
                let label = match message.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                format!("{label}: {}", message.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Exactly one payload branch per request.
    fn render_payload(
        &self,
        question: &str,
        outcome: Option<&QueryOutcome>,
        mode: Mode,
    ) -> Result<String, AskError> {
        let rendered = match outcome {
            Some(QueryOutcome::Suggestions {
                searched_name,
                names,
                ..
            }) => {
                let list = names
                    .iter()
                    .map(|name| format!("- {name}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                prompts::render(
                    prompts::SUGGESTIONS_INSTRUCTIONS,
                    &[
                        ("question", question),
                        ("searched_name", searched_name),
                        ("names", &list),
                    ],
                )
            }
            Some(QueryOutcome::Count { value, .. }) => prompts::render(
                prompts::COUNT_INSTRUCTIONS,
                &[("question", question), ("count", &value.to_string())],
            ),
            Some(QueryOutcome::AiQuery {
                rows, description, ..
            }) => {
                let data = serde_json::to_string_pretty(&serde_json::json!({
                    "description": description,
                    "rows": rows,
                }))?;
                prompts::render(
                    prompts::ROWS_INSTRUCTIONS,
                    &[("question", question), ("data", &data)],
                )
            }
            Some(QueryOutcome::LegacyRows {
                rows, description, ..
            }) => {
                let data = serde_json::to_string_pretty(&serde_json::json!({
                    "description": description,
                    "rows": rows,
                }))?;
                prompts::render(
                    prompts::ROWS_INSTRUCTIONS,
                    &[("question", question), ("data", &data)],
                )
            }
            Some(QueryOutcome::Tables { names }) => {
                let data = serde_json::to_string_pretty(&serde_json::json!({
                    "description": "Daftar tabel yang tersedia di database",
                    "tables_available": names,
                }))?;
                prompts::render(
                    prompts::ROWS_INSTRUCTIONS,
                    &[("question", question), ("data", &data)],
                )
            }
            Some(QueryOutcome::AccessDenied { message }) => prompts::render(
                prompts::ACCESS_DENIED_INSTRUCTIONS,
                &[("question", question), ("message", message)],
            ),
            Some(QueryOutcome::Empty { .. }) => prompts::render(
                prompts::NO_DATA_INTERNAL_INSTRUCTIONS,
                &[("question", question)],
            ),
            None => match mode {
                Mode::External => prompts::render(
                    prompts::NO_DATA_EXTERNAL_INSTRUCTIONS,
                    &[("question", question)],
                ),
                Mode::Internal => prompts::render(
                    prompts::NO_DATA_INTERNAL_INSTRUCTIONS,
                    &[("question", question)],
                ),
            },
        };
        Ok(rendered)
    }

    /// The diagnostic trailer appended for authenticated debug sessions:
    /// which table was used, the SQL that ran (or that none did), and the
    /// alias mapping that was consulted.
    pub(crate) fn build_debug_trailer(&self, outcome: Option<&QueryOutcome>) -> String {
        let table = outcome.and_then(|o| o.table());
        let sql = outcome.and_then(|o| o.sql()).unwrap_or("(none)");
        let aliases = table
            .and_then(|t| self.registry.by_table_name(t))
            .map(|mapping| mapping.alias_summary())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "\n\n{DEBUG_TRAILER_MARKER}\ntable: {}\nsql: {sql}\naliases: {aliases}",
            table.unwrap_or("-"),
        )
    }
}
