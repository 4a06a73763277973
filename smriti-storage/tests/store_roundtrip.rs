//! Integration tests for `LibsqlStore`'s `Store` impl (spec.md §4.1,
//! §6): session/turn roundtrips, vasana upsert uniqueness, and opaque
//! blob persistence. Grounded on `memory-storage-turso/tests/integration_test.rs`'s
//! shape, adapted to an in-memory, network-free libsql database (no
//! `#[ignore]` needed).

use std::collections::HashSet;

use chrono::Utc;
use smriti_core::store::Store;
use smriti_core::types::{
    PatternType, ProjectScope, Role, Samskara, Session, ToolCall, Turn, Valence, Vasana,
};
use smriti_storage::LibsqlStore;
use uuid::Uuid;

fn sample_session(project: &str) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        title: "Deploy the release pipeline".into(),
        created_at: now,
        updated_at: now,
        project: ProjectScope::Project(project.into()),
        agent: "claude".into(),
        model: "sonnet".into(),
        provider: "anthropic".into(),
        parent_session_id: None,
        branch: None,
        tags: vec!["deploy".into()],
        cost: 0.0,
        input_tokens: 0,
        output_tokens: 0,
    }
}

fn sample_vasana(name: &str, project: &str) -> Vasana {
    let now = Utc::now();
    Vasana {
        id: Uuid::new_v4(),
        name: name.into(),
        description: "always confirms before deleting".into(),
        valence: Valence::Positive,
        strength: 0.5,
        stability: 0.2,
        predictive_accuracy: 0.0,
        source_samskaras: HashSet::new(),
        reinforcement_count: 0,
        project: ProjectScope::Project(project.into()),
        created_at: now,
        updated_at: now,
        last_activated: None,
        activation_count: 0,
    }
}

#[tokio::test]
async fn session_put_get_roundtrips() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    let session = sample_session("acme");

    store.put_session(&session).await.unwrap();
    let fetched = store.get_session(session.id).await.unwrap().unwrap();

    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.title, session.title);
    assert_eq!(fetched.project, session.project);
    assert_eq!(fetched.tags, session.tags);
}

#[tokio::test]
async fn get_session_missing_returns_none() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    assert!(store.get_session(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn turns_are_append_only_and_ordered() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    let session = sample_session("acme");
    store.put_session(&session).await.unwrap();

    for i in 0..3u32 {
        let turn = Turn {
            session_id: session.id,
            turn_number: i,
            role: if i % 2 == 0 { Role::User } else { Role::Assistant },
            content: format!("turn {i}"),
            tool_calls: vec![ToolCall {
                name: "read".into(),
                input: serde_json::json!({"path": "a.txt"}),
                result: None,
                is_error: false,
            }],
            created_at: Utc::now(),
        };
        store.append_turn(&turn).await.unwrap();
    }

    let turns = store.get_turns(session.id).await.unwrap();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns.iter().map(|t| t.turn_number).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(turns[0].tool_calls[0].name, "read");
}

#[tokio::test]
async fn recent_sessions_scopes_by_project_and_orders_by_recency() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    let acme = sample_session("acme");
    let other = sample_session("widgets");
    store.put_session(&acme).await.unwrap();
    store.put_session(&other).await.unwrap();

    let acme_only = store.recent_sessions(Some("acme"), 10).await.unwrap();
    assert_eq!(acme_only.len(), 1);
    assert_eq!(acme_only[0].id, acme.id);

    let all = store.recent_sessions(None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn vasana_upsert_is_keyed_by_name_and_project() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    let mut vasana = sample_vasana("confirms-before-delete", "acme");
    store.upsert_vasana(&vasana).await.unwrap();

    vasana.strength = 0.8;
    store.upsert_vasana(&vasana).await.unwrap();

    let rows = store.list_vasanas(Some("acme")).await.unwrap();
    assert_eq!(rows.len(), 1, "second upsert with the same (name, project) must replace, not duplicate");
    assert!((rows[0].strength - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn delete_vasana_removes_the_row() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    let vasana = sample_vasana("confirms-before-delete", "acme");
    store.upsert_vasana(&vasana).await.unwrap();
    store.delete_vasana(vasana.id).await.unwrap();

    let rows = store.list_vasanas(Some("acme")).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn samskaras_round_trip_with_project_scoping() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    let session = sample_session("acme");
    store.put_session(&session).await.unwrap();

    let now = Utc::now();
    let samskara = Samskara {
        id: Uuid::new_v4(),
        session_id: session.id,
        pattern_type: PatternType::Preference,
        pattern_content: "prefers rebase over merge".into(),
        observation_count: 1,
        confidence: 0.9,
        pramana_type: None,
        project: ProjectScope::Project("acme".into()),
        created_at: now,
        updated_at: now,
    };
    store.upsert_samskara(&samskara).await.unwrap();

    let rows = store.list_samskaras(Some("acme")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pattern_content, samskara.pattern_content);
}

#[tokio::test]
async fn opaque_blob_roundtrips_through_get_put() {
    let store = LibsqlStore::open_in_memory().await.unwrap();
    assert!(store.get_blob("weight_learner_state", "__global__").await.unwrap().is_none());

    store.put_blob("weight_learner_state", "__global__", b"not-real-json").await.unwrap();
    let fetched = store.get_blob("weight_learner_state", "__global__").await.unwrap();
    assert_eq!(fetched.as_deref(), Some(b"not-real-json".as_slice()));
}

#[tokio::test]
async fn memory_set_get_and_search_roundtrip() {
    use smriti_core::types::MemoryEntry;

    let store = LibsqlStore::open_in_memory().await.unwrap();
    let entry = MemoryEntry {
        key: "favorite-editor".into(),
        scope: ProjectScope::Project("acme".into()),
        content: "prefers neovim with a minimal config".into(),
        relevance: Some(0.7),
        updated_at: Utc::now(),
    };
    store.set_memory(&entry).await.unwrap();

    let fetched = store.get_memory("favorite-editor", "acme").await.unwrap().unwrap();
    assert_eq!(fetched.content, entry.content);

    let hits = store.search_memory("neovim", Some("acme")).await.unwrap();
    assert_eq!(hits.len(), 1);
}
