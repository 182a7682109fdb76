//! Tests for the resolution pipeline: classification, access denial, fuzzy
//! suggestions, and the legacy fallbacks. Outcomes are observed through the
//! prompts sent to the mock AI provider and the queries logged by the mock
//! storage provider.

mod common;

use common::{row, setup_tracing, MockAiProvider, MockStorageProvider};
use serde_json::json;
use tanya::{AskRequest, ChatClient, ChatClientBuilder};

async fn build_client(
    ai: MockAiProvider,
    storage: MockStorageProvider,
) -> ChatClient {
    let client = ChatClientBuilder::new()
        .ai_provider(Box::new(ai))
        .storage_provider(Box::new(storage))
        .build()
        .expect("client builds");
    client.warm_schema_cache().await;
    client
}

fn obcard_storage() -> MockStorageProvider {
    MockStorageProvider::new().with_text_schema(
        "RecordOBCard",
        &["TrackingNum", "EmpName", "Problem", "CreatedDate"],
    )
}

fn ask(question: &str) -> AskRequest {
    AskRequest {
        question: question.to_string(),
        session_id: Some("resolver-test".to_string()),
        mode: Default::default(),
    }
}

#[tokio::test]
async fn nonzero_count_is_reported_as_a_count() {
    setup_tracing();

    let ai = MockAiProvider::new(vec![
        "SELECT COUNT(*) FROM RecordOBCard".to_string(),
        "Ada 7 observation card.".to_string(),
    ]);
    let storage = obcard_storage();
    storage.push_rows(vec![row(&[("total", json!(7))])]);

    let client = build_client(ai.clone(), storage).await;
    let response = client.ask(ask("berapa total obcard?")).await.unwrap();

    assert_eq!(response.answer, "Ada 7 observation card.");
    let calls = ai.calls();
    assert_eq!(calls.len(), 2, "generation then answer");
    assert!(
        calls[1].1.contains("Hasil perhitungan dari database: 7"),
        "answer prompt should carry the extracted count"
    );
}

#[tokio::test]
async fn zero_count_without_a_name_search_is_no_results() {
    setup_tracing();

    let ai = MockAiProvider::new(vec![
        "SELECT COUNT(*) FROM RecordOBCard".to_string(),
        "Tidak ada data.".to_string(),
    ]);
    let storage = obcard_storage();
    storage.push_rows(vec![row(&[("total", json!(0))])]);

    let client = build_client(ai.clone(), storage).await;
    client.ask(ask("berapa total obcard?")).await.unwrap();

    let calls = ai.calls();
    assert!(
        calls[1].1.contains("Tidak ada data yang ditemukan"),
        "zero count should become the no-data branch"
    );
}

#[tokio::test]
async fn grouped_counts_are_never_reclassified_as_empty() {
    setup_tracing();

    let ai = MockAiProvider::new(vec![
        "SELECT Problem, COUNT(*) AS total FROM RecordOBCard GROUP BY Problem".to_string(),
        "Berikut rinciannya.".to_string(),
    ]);
    let storage = obcard_storage();
    storage.push_rows(vec![
        row(&[("Problem", json!("unsafe act")), ("total", json!(0))]),
        row(&[("Problem", json!("housekeeping")), ("total", json!(5))]),
    ]);

    let client = build_client(ai.clone(), storage).await;
    client.ask(ask("rincian obcard per masalah")).await.unwrap();

    let calls = ai.calls();
    assert!(calls[1].1.contains("unsafe act"), "rows reach the composer");
    assert!(!calls[1].1.contains("Tidak ada data yang ditemukan"));
}

#[tokio::test]
async fn empty_name_search_yields_fuzzy_suggestions() {
    setup_tracing();

    let ai = MockAiProvider::new(vec![
        "SELECT COUNT(*) FROM RecordOBCard WHERE EmpName LIKE '%Zacky%Ahmad%'".to_string(),
        "Nama tidak ditemukan, mungkin maksud Anda Zacky Akbar.".to_string(),
    ]);
    let storage = obcard_storage();
    storage.push_rows(vec![row(&[("total", json!(0))])]);
    storage.push_rows(vec![
        row(&[("EmpName", json!("Zacky Akbar"))]),
        row(&[("EmpName", json!("Ahmad Fauzi"))]),
        row(&[("EmpName", json!("zacky akbar"))]),
    ]);

    let client = build_client(ai.clone(), storage.clone()).await;
    client
        .ask(ask("berapa obcard atas nama Zacky Ahmad?"))
        .await
        .unwrap();

    let executed = storage.executed_queries();
    assert_eq!(executed.len(), 2, "count query then suggestion query");
    assert!(executed[1].contains("EmpName LIKE '%Zacky%'"));
    assert!(executed[1].contains("OR EmpName LIKE '%Ahmad%'"));

    let calls = ai.calls();
    let answer_prompt = &calls[1].1;
    assert!(answer_prompt.contains("TIDAK ditemukan"));
    assert!(answer_prompt.contains("Zacky Akbar"));
    // Case-insensitive dedup keeps the list distinct.
    assert_eq!(answer_prompt.matches("Zacky Akbar").count(), 1);
}

#[tokio::test]
async fn access_denial_short_circuits_before_generation() {
    setup_tracing();

    let ai = MockAiProvider::new(vec!["Maaf, akses ditolak.".to_string()]);
    let storage = MockStorageProvider::new().with_text_schema(
        "employees",
        &["name", "department", "designation", "email"],
    );

    let client = build_client(ai.clone(), storage.clone()).await;
    client
        .ask(ask("tampilkan semua karyawan"))
        .await
        .unwrap();

    let calls = ai.calls();
    assert_eq!(calls.len(), 1, "the generator must never run");
    assert!(calls[0]
        .1
        .contains("Anda tidak memiliki akses untuk melihat data karyawan"));
    assert!(storage.executed_queries().is_empty());
}

#[tokio::test]
async fn unknown_topics_fall_back_to_legacy_heuristics() {
    setup_tracing();

    let ai = MockAiProvider::new(vec!["Berikut data penduduk.".to_string()]);
    let storage = MockStorageProvider::new();
    storage.push_rows(vec![row(&[("id", json!(1)), ("nama", json!("Budi"))])]);

    let client = build_client(ai.clone(), storage.clone()).await;
    client.ask(ask("penduduk terbaru")).await.unwrap();

    let executed = storage.executed_queries();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("FROM penduduk ORDER BY id DESC"));

    let calls = ai.calls();
    assert_eq!(calls.len(), 1, "no generation for legacy lookups");
    assert!(calls[0].1.contains("Data penduduk dari database"));
}

#[tokio::test]
async fn rejected_generation_falls_back_to_legacy() {
    setup_tracing();

    // The "generated" query is destructive; the guard must stop it and the
    // resolver should degrade to the available-tables listing.
    let ai = MockAiProvider::new(vec![
        "DROP TABLE RecordOBCard".to_string(),
        "Berikut daftar tabel.".to_string(),
    ]);
    let storage = obcard_storage();

    let client = build_client(ai.clone(), storage.clone()).await;
    client.ask(ask("berapa total obcard?")).await.unwrap();

    assert!(storage.executed_queries().is_empty(), "nothing reaches storage");
    let calls = ai.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].1.contains("tables_available"));
}

#[tokio::test]
async fn execution_failure_falls_back_to_legacy() {
    setup_tracing();

    let ai = MockAiProvider::new(vec![
        "SELECT COUNT(*) FROM RecordOBCard".to_string(),
        "Berikut daftar tabel.".to_string(),
    ]);
    let storage = obcard_storage();
    storage.push_error("connection reset");

    let client = build_client(ai.clone(), storage.clone()).await;
    let response = client.ask(ask("berapa total obcard?")).await.unwrap();

    // The caller never sees the storage error.
    assert_eq!(response.answer, "Berikut daftar tabel.");
    let calls = ai.calls();
    assert!(calls[1].1.contains("tables_available"));
}
