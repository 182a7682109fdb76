//! Tests for follow-up detection and context-aware question rewriting.

mod common;

use tanya::followup::{FollowupEngine, FollowupKind};
use tanya::session::Message;

fn auth_names() -> Vec<String> {
    vec!["nur iswanto".to_string(), "fernando siboro".to_string()]
}

#[test]
fn detection_is_deterministic() {
    let engine = FollowupEngine::default();

    let hit = engine.detect("siapa saja?").unwrap();
    assert_eq!(hit.kind, FollowupKind::DetailRequest);

    assert!(engine.detect("Apa kabar?").is_none());

    let hit = engine.detect("yang tahun 2025 saja").unwrap();
    assert_eq!(hit.kind, FollowupKind::FilterRequest);

    let hit = engine.detect("kalau Budi?").unwrap();
    assert_eq!(hit.kind, FollowupKind::ComparisonRequest);

    let hit = engine.detect("berapa rata-rata umurnya").unwrap();
    assert_eq!(hit.kind, FollowupKind::StatisticRequest);
}

#[test]
fn standalone_questions_pass_through_unchanged() {
    let engine = FollowupEngine::default();
    let history = vec![Message::user("berapa jumlah karyawan?")];

    assert_eq!(
        engine.build_context_query("Apa kabar?", &history, &auth_names()),
        "Apa kabar?"
    );
}

#[test]
fn bare_detail_request_becomes_entity_listing() {
    let engine = FollowupEngine::default();
    let history = vec![
        Message::user("berapa jumlah karyawan perempuan?"),
        Message::assistant("Ada 12 karyawan perempuan."),
    ];

    let rewritten = engine.build_context_query("siapa saja?", &history, &auth_names());
    assert_eq!(rewritten, "tampilkan daftar karyawan");
}

#[test]
fn filters_accumulate_onto_the_base_question() {
    let engine = FollowupEngine::default();
    let history = vec![
        Message::user("berapa jumlah karyawan?"),
        Message::assistant("Ada 120 karyawan."),
        Message::user("yang perempuan saja"),
        Message::assistant("Ada 45."),
    ];

    let rewritten = engine.build_context_query("siapa saja?", &history, &auth_names());
    assert_eq!(rewritten, "tampilkan daftar karyawan yang perempuan saja");
}

#[test]
fn bare_yang_filter_attaches_to_the_topic() {
    let engine = FollowupEngine::default();
    let history = vec![
        Message::user("tampilkan observasi terbaru"),
        Message::assistant("Berikut daftarnya."),
    ];

    let rewritten = engine.build_context_query("yang tahun 2025", &history, &auth_names());
    assert_eq!(rewritten, "observation card tahun 2025");
}

#[test]
fn auth_turns_are_skipped_when_building_context() {
    let engine = FollowupEngine::default();
    let history = vec![
        Message::user("berapa jumlah karyawan?"),
        Message::assistant("Ada 120 karyawan."),
        Message::user("saya nur iswanto"),
        Message::assistant("Silakan masukkan password Anda."),
        Message::user("****"),
        Message::assistant("Mode debug aktif."),
    ];

    let rewritten = engine.build_context_query("siapa saja?", &history, &auth_names());
    assert_eq!(rewritten, "tampilkan daftar karyawan");
}

#[test]
fn rewriting_without_usable_history_returns_the_question() {
    let engine = FollowupEngine::default();

    assert_eq!(
        engine.build_context_query("siapa saja?", &[], &auth_names()),
        "siapa saja?"
    );

    // History exists but names no known entity: no template applies.
    let history = vec![Message::user("cuaca hari ini bagaimana?")];
    assert_eq!(
        engine.build_context_query("siapa saja?", &history, &auth_names()),
        "siapa saja?"
    );
}
