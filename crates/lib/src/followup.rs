//! # Follow-up Context Engine
//!
//! Detects elliptical follow-up questions ("yang tahun 2025 saja",
//! "tampilkan detailnya") and rewrites them into standalone questions using
//! the session history. Everything here is pattern matching over
//! configuration data: the phrase lists and the keyword -> entity table are
//! plain serde structs, evaluated by an ordered-rule walk with
//! first-match-wins semantics. Rewriting is best-effort; when no template
//! applies the original question passes through unchanged.
//!
//! The phrase lists are locale-mixed (Indonesian/English) on purpose - they
//! mirror how this service's users actually type.

use crate::session::{Message, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// What kind of follow-up a question is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupKind {
    DetailRequest,
    FilterRequest,
    TimeFilter,
    ComparisonRequest,
    StatisticRequest,
}

impl FollowupKind {
    /// Whether this follow-up narrows a previous result set.
    pub fn is_filter(&self) -> bool {
        matches!(self, FollowupKind::FilterRequest | FollowupKind::TimeFilter)
    }
}

/// One detection rule: a kind and the phrases that signal it.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowupRule {
    pub kind: FollowupKind,
    pub phrases: Vec<String>,
}

/// Maps topic keywords to the entity name used in rewritten questions.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRule {
    pub entity: String,
    pub keywords: Vec<String>,
}

/// A successful follow-up detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowupMatch {
    pub kind: FollowupKind,
    pub phrase: String,
}

/// The reconstructed context of a follow-up conversation.
#[derive(Debug, Default)]
struct ContextChain {
    base_question: Option<String>,
    filters: Vec<String>,
    entity: Option<String>,
}

struct CompiledRule {
    kind: FollowupKind,
    phrases: Vec<(String, Regex)>,
}

/// Detects follow-ups and rewrites them against session history.
pub struct FollowupEngine {
    rules: Vec<CompiledRule>,
    entities: Vec<EntityRule>,
}

impl std::fmt::Debug for FollowupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowupEngine")
            .field("rules", &self.rules.len())
            .field("entities", &self.entities.len())
            .finish()
    }
}

impl FollowupEngine {
    /// Compiles the phrase tables into matchers. Rule order is significant:
    /// the first matching rule wins.
    pub fn new(rules: Vec<FollowupRule>, entities: Vec<EntityRule>) -> Result<Self, regex::Error> {
        let compiled = rules
            .into_iter()
            .map(|rule| {
                let phrases = rule
                    .phrases
                    .into_iter()
                    .map(|phrase| {
                        let pattern = format!(r"\b{}\b", regex::escape(&phrase));
                        Regex::new(&pattern).map(|re| (phrase, re))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledRule {
                    kind: rule.kind,
                    phrases,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules: compiled,
            entities,
        })
    }

    /// Classifies a question as a follow-up, or `None` for a standalone one.
    ///
    /// For each phrase, in rule order: exact match (with or without a trailing
    /// question mark), then prefix match, then word-boundary containment.
    pub fn detect(&self, question: &str) -> Option<FollowupMatch> {
        let lower = question.trim().to_lowercase();

        for rule in &self.rules {
            for (phrase, boundary) in &rule.phrases {
                let exact = lower == *phrase || lower == format!("{phrase}?");
                let prefix = lower.starts_with(&format!("{phrase} "));
                if exact || prefix || boundary.is_match(&lower) {
                    return Some(FollowupMatch {
                        kind: rule.kind,
                        phrase: phrase.clone(),
                    });
                }
            }
        }
        None
    }

    /// Extracts the conversation entity from a question, if any keyword hits.
    pub fn extract_entity(&self, context: &str) -> Option<&str> {
        let lower = context.to_lowercase();
        self.entities
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
            .map(|rule| rule.entity.as_str())
    }

    /// Rewrites a follow-up question into a standalone one, best-effort.
    ///
    /// `auth_names` are the lowercase registered identities whose claim turns
    /// ("saya <name>") must be skipped along with masked password turns.
    pub fn build_context_query(
        &self,
        question: &str,
        history: &[Message],
        auth_names: &[String],
    ) -> String {
        if self.detect(question).is_none() {
            return question.to_string();
        }

        let chain = self.build_chain(history, auth_names);
        let Some(base) = &chain.base_question else {
            debug!("No base question in history; leaving follow-up unchanged");
            return question.to_string();
        };
        debug!(%base, filters = chain.filters.len(), "Built follow-up context chain");

        match self.rewrite(question, &chain) {
            Some(rewritten) => {
                debug!(from = question, to = %rewritten, "Rewrote follow-up question");
                rewritten
            }
            None => question.to_string(),
        }
    }

    /// Walks prior user messages, most recent first, splitting them into the
    /// base question and the filter turns layered on top of it.
    fn build_chain(&self, history: &[Message], auth_names: &[String]) -> ContextChain {
        let mut chain = ContextChain::default();

        let valid: Vec<&str> = history
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .filter(|content| !skip_for_context(content, auth_names))
            .collect();

        let mut found_base = false;
        for content in &valid {
            let filter = is_filter_marked(content);
            let detail = is_detail_marked(content);

            if filter && !detail {
                chain.filters.push(content.to_string());
            } else if detail && found_base {
                // A detail request over an established topic adds nothing new.
            } else if !found_base {
                chain.base_question = Some(content.to_string());
                chain.entity = self.extract_entity(content).map(str::to_string);
                found_base = true;
            }
        }

        // Everything was filter-shaped: fall back to the most recent turn.
        if chain.base_question.is_none() {
            if let Some(first) = valid.first() {
                chain.base_question = Some(first.to_string());
                chain.entity = self.extract_entity(first).map(str::to_string);
            }
        }

        chain
    }

    /// The ordered rewrite templates. First applicable template wins.
    fn rewrite(&self, question: &str, chain: &ContextChain) -> Option<String> {
        let lower = question.trim().to_lowercase();
        let entity = chain.entity.as_deref()?;
        let filters = chain.filters.join(" ");

        // Bare detail request: "apa saja?", "siapa saja?", "daftarnya"
        if bare_detail_pattern().is_match(&lower) {
            let mut query = format!("tampilkan daftar {entity}");
            if !filters.is_empty() {
                query.push(' ');
                query.push_str(&filters);
            }
            return Some(query);
        }

        // "saya minta yang X", "tolong tampilkan X"
        if let Some(caps) = request_pattern().captures(&lower) {
            let requested = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
            let mut query = format!("tampilkan {entity}");
            if !filters.is_empty() && !filters.to_lowercase().contains(&requested.to_lowercase()) {
                query.push(' ');
                query.push_str(&filters);
            }
            query.push(' ');
            query.push_str(requested);
            return Some(query);
        }

        // Bare "yang X" adds a filter to the standing topic.
        if let Some(caps) = yang_pattern().captures(&lower) {
            return Some(format!("{entity} {}", &caps[1]));
        }

        // "kalau X" swaps the subject.
        if let Some(caps) = kalau_pattern().captures(&lower) {
            return Some(format!("{entity} {}", &caps[1]));
        }

        // "bagaimana dengan X" / "how about X"
        if let Some(caps) = how_about_pattern().captures(&lower) {
            return Some(format!("{entity} {}", &caps[2]));
        }

        None
    }
}

impl Default for FollowupEngine {
    fn default() -> Self {
        Self::new(default_followup_rules(), default_entity_rules())
            .expect("built-in phrase tables compile")
    }
}

/// True for turns that belong to the auth exchange or are too short to carry
/// context: masked passwords, identity claims, and <= 3 character blips.
fn skip_for_context(content: &str, auth_names: &[String]) -> bool {
    if content == crate::constants::MASKED_CONTENT || content.chars().count() <= 3 {
        return true;
    }
    let lower = content.to_lowercase();
    lower.starts_with("saya ") && auth_names.iter().any(|name| lower.contains(name.as_str()))
}

/// True when the turn narrows a previous result ("yang ...", "hanya ...",
/// a leading time unit, or a trailing "saja"/"aja").
pub(crate) fn is_filter_marked(text: &str) -> bool {
    static TIME_PREFIX: OnceLock<Regex> = OnceLock::new();
    static SAJA: OnceLock<Regex> = OnceLock::new();

    let lower = text.trim().to_lowercase();
    let prefixes = [
        "yang ",
        "which ",
        "with ",
        "di ",
        "hanya ",
        "cuma ",
        "kalau ",
        "bagaimana ",
    ];
    if prefixes.iter().any(|p| lower.starts_with(p)) {
        return true;
    }

    let time_prefix = TIME_PREFIX
        .get_or_init(|| Regex::new(r"^(tahun|bulan|year|month)\s+").expect("static pattern"));
    let saja = SAJA.get_or_init(|| Regex::new(r"\b(saja|aja)\b").expect("static pattern"));
    time_prefix.is_match(&lower) || saja.is_match(&lower)
}

/// True when the turn asks to display or enumerate something.
pub(crate) fn is_detail_marked(text: &str) -> bool {
    static DETAIL: OnceLock<Regex> = OnceLock::new();
    let detail = DETAIL.get_or_init(|| {
        Regex::new(r"\b(tampilkan|sebutkan|list|show|minta|tolong|coba)\b").expect("static pattern")
    });
    detail.is_match(&text.to_lowercase())
}

fn bare_detail_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(apa saja|siapa saja|sebutkan|tampilkan|show|list|daftarnya)[\s\?]*$")
            .expect("static pattern")
    })
}

fn request_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(saya minta|tolong|coba|minta|kasih lihat)\s+(yang\s+)?(.+)$")
            .expect("static pattern")
    })
}

fn yang_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^yang\s+(.+)$").expect("static pattern"))
}

fn kalau_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^kalau\s+(.+)$").expect("static pattern"))
}

fn how_about_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(bagaimana dengan|bagaimana|how about|what about)\s+(.+)$")
            .expect("static pattern")
    })
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// The built-in follow-up phrase table, in evaluation order.
pub fn default_followup_rules() -> Vec<FollowupRule> {
    vec![
        FollowupRule {
            kind: FollowupKind::DetailRequest,
            phrases: phrases(&[
                "apa saja",
                "sebutkan",
                "tampilkan",
                "show me",
                "list",
                "siapa saja",
                "show details",
                "tampilkan detail",
                "tolong sebutkan",
                "tampilkan semua",
                "show all",
                "detailnya",
                "the details",
                "namanya",
                "nama-namanya",
                "daftarnya",
                "the list",
                "listnya",
                "minta",
                "saya minta",
                "tolong",
                "tolong tampilkan",
                "coba tampilkan",
                "bisa tampilkan",
                "kasih lihat",
                "show",
                "display",
                "coba",
                "coba lihat",
            ]),
        },
        FollowupRule {
            kind: FollowupKind::FilterRequest,
            phrases: phrases(&[
                "yang",
                "yang mana",
                "which",
                "dengan",
                "with",
                "yang ada",
                "yang punya",
                "yang memiliki",
                "di",
                "pada",
                "at",
                "in the",
                "hanya",
                "hanya yang",
                "cuma",
                "saja",
                "aja",
                "filter",
                "pilih yang",
            ]),
        },
        FollowupRule {
            kind: FollowupKind::TimeFilter,
            phrases: phrases(&[
                "tahun",
                "year",
                "bulan",
                "month",
                "minggu",
                "week",
                "hari ini",
                "today",
                "kemarin",
                "yesterday",
                "bulan ini",
                "this month",
                "tahun ini",
                "this year",
            ]),
        },
        FollowupRule {
            kind: FollowupKind::ComparisonRequest,
            phrases: phrases(&[
                "bagaimana dengan",
                "how about",
                "kalau",
                "what about",
                "bandingkan",
                "compare",
                "versus",
                "vs",
            ]),
        },
        FollowupRule {
            kind: FollowupKind::StatisticRequest,
            phrases: phrases(&[
                "berapa",
                "how many",
                "total",
                "jumlah",
                "count",
                "ada berapa",
                "how much",
                "rata-rata",
                "average",
            ]),
        },
    ]
}

/// The built-in keyword -> entity table.
pub fn default_entity_rules() -> Vec<EntityRule> {
    vec![
        EntityRule {
            entity: "department".to_string(),
            keywords: phrases(&["department", "dept", "divisi", "departemen"]),
        },
        EntityRule {
            entity: "karyawan".to_string(),
            keywords: phrases(&["karyawan", "employee", "pegawai", "staff", "pekerja"]),
        },
        EntityRule {
            entity: "observation card".to_string(),
            keywords: phrases(&[
                "observation card",
                "obcard",
                "ob card",
                "observasi",
                "kartu observasi",
            ]),
        },
        EntityRule {
            entity: "ticket".to_string(),
            keywords: phrases(&["ticket", "tiket", "ticketing", "helpdesk", "it support"]),
        },
    ]
}
