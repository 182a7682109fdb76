//! Tests for the session store: history bounds, the authentication state
//! machine, and the idle sweep.

mod common;

use tanya::access::AccessPolicy;
use tanya::session::{AuthState, AuthTurn, Message, SessionStore};

#[tokio::test]
async fn history_is_bounded_to_the_most_recent_messages() {
    let store = SessionStore::new(20, 3600);

    for i in 1..=25 {
        store.append("sess", Message::user(format!("pesan {i}"))).await;
    }

    let session = store.snapshot("sess").await.unwrap();
    assert_eq!(session.history.len(), 20);
    assert_eq!(session.history.front().unwrap().content, "pesan 6");
    assert_eq!(session.history.back().unwrap().content, "pesan 25");

    // Retained messages keep their original order.
    let contents: Vec<_> = session.history.iter().map(|m| m.content.clone()).collect();
    let expected: Vec<_> = (6..=25).map(|i| format!("pesan {i}")).collect();
    assert_eq!(contents, expected);
}

#[tokio::test]
async fn auth_machine_walks_claim_then_password() {
    let store = SessionStore::new(20, 3600);
    let policy = AccessPolicy::default();

    let turn = store.advance_auth("sess", "saya nur iswanto", &policy).await;
    assert_eq!(
        turn,
        AuthTurn::PasswordRequested {
            full_name: "Nur Iswanto".to_string()
        }
    );
    let session = store.snapshot("sess").await.unwrap();
    assert_eq!(session.auth_state, AuthState::PendingPassword);
    assert!(!session.debug_mode);

    let turn = store.advance_auth("sess", "5553", &policy).await;
    assert_eq!(
        turn,
        AuthTurn::Authenticated {
            full_name: "Nur Iswanto".to_string()
        }
    );
    let session = store.snapshot("sess").await.unwrap();
    assert_eq!(session.auth_state, AuthState::Authenticated);
    assert!(session.debug_mode);
    assert_eq!(session.user_name.as_deref(), Some("Nur Iswanto"));
}

#[tokio::test]
async fn wrong_password_resets_the_machine() {
    let store = SessionStore::new(20, 3600);
    let policy = AccessPolicy::default();

    store
        .advance_auth("sess", "saya fernando siboro", &policy)
        .await;
    let turn = store.advance_auth("sess", "9999", &policy).await;
    assert_eq!(turn, AuthTurn::WrongPassword);

    let session = store.snapshot("sess").await.unwrap();
    assert_eq!(session.auth_state, AuthState::None);
    assert!(session.user_key.is_none());
}

#[tokio::test]
async fn a_stray_password_is_an_ordinary_question() {
    let store = SessionStore::new(20, 3600);
    let policy = AccessPolicy::default();

    let turn = store.advance_auth("sess", "5553", &policy).await;
    assert_eq!(turn, AuthTurn::NotAuthRelated);
    assert_eq!(
        store.snapshot("sess").await.unwrap().auth_state,
        AuthState::None
    );
}

#[tokio::test]
async fn authenticated_sessions_treat_claims_as_questions() {
    let store = SessionStore::new(20, 3600);
    let policy = AccessPolicy::default();

    store.advance_auth("sess", "saya nur iswanto", &policy).await;
    store.advance_auth("sess", "5553", &policy).await;

    let turn = store.advance_auth("sess", "saya nur iswanto", &policy).await;
    assert_eq!(turn, AuthTurn::NotAuthRelated);
    assert_eq!(
        store.snapshot("sess").await.unwrap().auth_state,
        AuthState::Authenticated
    );
}

#[tokio::test]
async fn idle_sessions_are_swept() {
    let store = SessionStore::new(20, 0);
    store.append("sess", Message::user("halo")).await;
    assert_eq!(store.session_count().await, 1);

    let removed = store.sweep_idle().await;
    assert_eq!(removed, 1);
    assert_eq!(store.session_count().await, 0);

    let fresh = SessionStore::new(20, 3600);
    fresh.append("sess", Message::user("halo")).await;
    assert_eq!(fresh.sweep_idle().await, 0);
    assert_eq!(fresh.session_count().await, 1);
}

#[tokio::test]
async fn last_query_message_finds_the_most_recent_sql_turn() {
    let store = SessionStore::new(20, 3600);
    store
        .append(
            "sess",
            Message::user("berapa total obcard?").with_query(
                Some("SELECT COUNT(*) FROM RecordOBCard".to_string()),
                Some("RecordOBCard".to_string()),
            ),
        )
        .await;
    store.append("sess", Message::assistant("Ada 12.")).await;
    store.append("sess", Message::user("terima kasih")).await;

    let session = store.snapshot("sess").await.unwrap();
    let last = session.last_query_message().unwrap();
    assert_eq!(last.table_name.as_deref(), Some("RecordOBCard"));
}
