//! Coordinator behaviour through the public facade

use healss_sync::shared::{EntityType, OperationKind, StorageError, SyncConfig, WorkoutTemplate};
use healss_sync::sync::{Connectivity, PassOutcome, SyncEvent};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{next_pass, record, workout, TestStorage, USER_ID};
use crate::{assert_err, assert_ok, assert_queue_counts, assert_record_ids};

#[tokio::test]
async fn test_workout_created_offline_reaches_server_when_back_online() {
    let t = TestStorage::open(Connectivity::Offline).await;

    assert_ok!(
        t.storage
            .save(EntityType::Activity, workout("w1", "Leg Day"), OperationKind::Create)
            .await
    );

    let loaded = assert_ok!(t.storage.load(EntityType::Activity).await);
    assert_record_ids!(loaded, ["w1"]);
    assert_eq!(loaded[0].get("name"), Some(&json!("Leg Day")));
    assert!(loaded[0].contains_key("createdAt"));
    assert!(t.remote.calls().is_empty());

    let mut events = t.storage.subscribe();
    t.signal.set_online();
    let report = next_pass(&mut events).await;

    assert_eq!(report.synced, 1);
    assert_queue_counts!(t.storage.sync_status().await, pending: 0, failed: 0);
    assert_eq!(t.remote.written_ids(), vec!["w1"]);
}

#[tokio::test]
async fn test_three_failed_inserts_leave_record_local_only() {
    let t = TestStorage::open(Connectivity::Online).await;
    t.remote.reject("w1");
    let mut events = t.storage.subscribe();

    t.storage
        .save(EntityType::Activity, workout("w1", "Leg Day"), OperationKind::Create)
        .await
        .unwrap();
    next_pass(&mut events).await;

    t.storage.force_sync_all().await;
    t.storage.force_sync_all().await;
    assert_queue_counts!(t.storage.sync_status().await, pending: 0, failed: 1);

    // No further attempts once the budget is spent
    let outcome = t.storage.force_sync_all().await;
    assert_eq!(outcome.report().map(|r| r.attempted), Some(0));
    assert_eq!(t.remote.written_ids().len(), 3);

    let remote_rows = t.remote.tables.rows("workout_activities").await;
    assert!(remote_rows.is_empty());
    let loaded = t.storage.load(EntityType::Activity).await.unwrap();
    assert_record_ids!(loaded, ["w1"]);
}

#[tokio::test]
async fn test_one_failure_does_not_block_later_operations() {
    let t = TestStorage::open(Connectivity::Offline).await;
    for id in ["a", "b", "c"] {
        t.storage
            .save(EntityType::Template, workout(id, "Push"), OperationKind::Create)
            .await
            .unwrap();
    }
    t.remote.reject("a");

    let mut events = t.storage.subscribe();
    t.signal.set_online();
    let report = next_pass(&mut events).await;

    assert_eq!((report.attempted, report.synced, report.failed), (3, 2, 1));
    assert_eq!(t.remote.written_ids(), vec!["a", "b", "c"]);
    assert_queue_counts!(t.storage.sync_status().await, pending: 1, failed: 0);
}

#[tokio::test]
async fn test_load_falls_back_to_cache_when_remote_is_down() {
    let t = TestStorage::open(Connectivity::Online).await;
    t.remote
        .tables
        .seed(
            "workout_templates",
            vec![record(json!({"id": "t1", "name": "Push", "user_id": USER_ID}))],
        )
        .await;
    let fresh = t.storage.load(EntityType::Template).await.unwrap();

    t.remote.set_down(true);
    let cached = assert_ok!(t.storage.load(EntityType::Template).await);

    assert_eq!(cached, fresh);
}

#[tokio::test]
async fn test_load_only_returns_current_users_rows() {
    let t = TestStorage::open(Connectivity::Online).await;
    t.remote
        .tables
        .seed(
            "sleep_data",
            vec![
                record(json!({"id": "mine", "user_id": USER_ID, "created_at": "2026-03-02T00:00:00Z"})),
                record(json!({"id": "theirs", "user_id": "someone-else"})),
                record(json!({"id": "older", "user_id": USER_ID, "created_at": "2026-03-01T00:00:00Z"})),
            ],
        )
        .await;

    let loaded = t.storage.load(EntityType::Sleep).await.unwrap();
    assert_record_ids!(loaded, ["mine", "older"]);
}

#[tokio::test]
async fn test_update_and_delete_follow_create() {
    let t = TestStorage::open(Connectivity::Online).await;
    let mut events = t.storage.subscribe();

    t.storage
        .save(EntityType::Template, workout("t1", "Push"), OperationKind::Create)
        .await
        .unwrap();
    next_pass(&mut events).await;

    t.storage
        .save(EntityType::Template, workout("t1", "Push Heavy"), OperationKind::Update)
        .await
        .unwrap();
    next_pass(&mut events).await;
    let rows = t.remote.tables.rows("workout_templates").await;
    assert_eq!(rows[0].get("name"), Some(&json!("Push Heavy")));

    let loaded = t.storage.load(EntityType::Template).await.unwrap();
    assert_eq!(loaded[0].get("name"), Some(&json!("Push Heavy")));
    assert!(loaded[0].contains_key("created_at"));

    t.storage
        .save(EntityType::Template, record(json!({"id": "t1"})), OperationKind::Delete)
        .await
        .unwrap();
    next_pass(&mut events).await;
    assert!(t.remote.tables.rows("workout_templates").await.is_empty());
    assert!(t.storage.load(EntityType::Template).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_eviction_is_published() {
    let config = SyncConfig::builder().offline_queue_limit(2).build().unwrap();
    let t = TestStorage::open_with(config, Connectivity::Offline).await;
    let mut events = t.storage.subscribe();

    let first = t
        .storage
        .save(EntityType::Goals, record(json!({"id": "g1"})), OperationKind::Create)
        .await
        .unwrap();
    for id in ["g2", "g3"] {
        t.storage
            .save(EntityType::Goals, record(json!({"id": id})), OperationKind::Create)
            .await
            .unwrap();
    }

    match events.try_recv() {
        Ok(SyncEvent::Evicted(op)) => assert_eq!(op.id, first),
        other => panic!("expected an eviction, got {:?}", other),
    }
    let status = t.storage.sync_status().await;
    assert_eq!((status.pending, status.evicted), (2, 1));
}

#[tokio::test]
async fn test_typed_records_round_trip_through_remote() {
    let t = TestStorage::open(Connectivity::Online).await;
    let mut events = t.storage.subscribe();
    let template = WorkoutTemplate {
        id: "t1".into(),
        name: "Full Body".into(),
        exercises: vec![json!({"name": "Squat", "sets": 5})],
        ..Default::default()
    };

    t.storage
        .save_record(&template, OperationKind::Create)
        .await
        .unwrap();
    next_pass(&mut events).await;

    let loaded: Vec<WorkoutTemplate> = t.storage.load_records().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "Full Body");
    assert_eq!(loaded[0].exercises, template.exercises);
    assert_eq!(loaded[0].extra.get("user_id"), Some(&json!(USER_ID)));
}

#[tokio::test]
async fn test_disposed_storage_rejects_work() {
    let t = TestStorage::open(Connectivity::Online).await;
    t.storage.dispose();

    assert_err!(
        t.storage
            .save(EntityType::Sleep, record(json!({"id": "s1"})), OperationKind::Create)
            .await,
        StorageError::Disposed
    );
    assert_eq!(t.storage.force_sync_all().await, PassOutcome::Disposed);
    assert!(t.remote.calls().is_empty());
}

#[test]
fn test_unknown_entity_name_fails_loudly() {
    assert_err!("meals".parse::<EntityType>(), StorageError::UnsupportedType(_));
    assert_err!(
        healss_sync::remote::table_for("workouts"),
        StorageError::UnsupportedType(_)
    );
}
