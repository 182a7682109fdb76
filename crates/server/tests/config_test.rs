//! Tests for configuration layering and the data-driven phrase tables.

use std::io::Write;
use tanya_server::config::get_config;

#[test]
fn defaults_apply_when_no_file_exists() {
    let config = get_config(Some("/nonexistent/config.yml")).expect("defaults load");

    assert_eq!(config.db_url, "db/tanya.db");
    assert_eq!(config.ai.provider, "local");
    assert_eq!(config.rate_limit.max_requests, 30);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert!(config.tables.is_none());
    assert!(config.access.is_none());
}

#[test]
fn yaml_overrides_defaults_and_carries_phrase_tables() {
    let yaml = r#"
port: 4001
db_url: "db/test.db"
company_name: "Cladtek"
ai:
  provider: gemini
  api_key: "test-key"
  model_name: "gemini-2.5-flash"
rate_limit:
  max_requests: 5
  window_secs: 10
tables:
  - table_name: "tickets"
    keywords: ["tiket", "ticket"]
    field_aliases:
      nomor: "TicketNum"
    description: "Data tiket helpdesk"
access:
  users:
    "tester one":
      password: "1234"
      full_name: "Tester One"
      email: "tester@example.com"
      role: "Admin"
  table_rules:
    tickets:
      requires_auth: true
      allowed_users: ["Tester One"]
      denial_message: "Akses ditolak."
"#;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write yaml");

    let config = get_config(Some(file.path().to_str().unwrap())).expect("yaml loads");

    assert_eq!(config.port, 4001);
    assert_eq!(config.db_url, "db/test.db");
    assert_eq!(config.company_name.as_deref(), Some("Cladtek"));
    assert_eq!(config.ai.provider, "gemini");
    assert_eq!(config.rate_limit.max_requests, 5);

    let tables = config.tables.expect("tables parsed");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table_name, "tickets");
    assert_eq!(tables[0].field_aliases.get("nomor").unwrap(), "TicketNum");

    let access = config.access.expect("access parsed");
    assert!(access.user("Tester One").is_some());
    let rule = access.table_rules.get("tickets").unwrap();
    assert!(rule.requires_auth);
    assert_eq!(rule.allowed_users, vec!["Tester One".to_string()]);
}
