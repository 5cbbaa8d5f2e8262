//! Coordinator on top of the SQLite store

use healss_sync::local_db::{KeyValueStore, LocalDatabase};
use healss_sync::shared::{EntityType, OperationKind, SyncConfig};
use healss_sync::sync::Connectivity;
use std::sync::Arc;
use tempfile::TempDir;

use crate::common::{next_pass, workout, FlakyRemote, TestStorage};
use crate::{assert_queue_counts, assert_record_ids};

#[tokio::test]
async fn test_offline_writes_survive_restart() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("healss").join("local.db");
    let remote = Arc::new(FlakyRemote::new());

    {
        let db: Arc<dyn KeyValueStore> = Arc::new(LocalDatabase::open(&db_path).await.unwrap());
        let t = TestStorage::open_on(db, remote.clone(), SyncConfig::default(), Connectivity::Offline).await;
        for (id, name) in [("w1", "Leg Day"), ("w2", "Arm Day")] {
            t.storage
                .save(EntityType::Activity, workout(id, name), OperationKind::Create)
                .await
                .unwrap();
        }
        assert_queue_counts!(t.storage.sync_status().await, pending: 2, failed: 0);
    }

    let db: Arc<dyn KeyValueStore> = Arc::new(LocalDatabase::open(&db_path).await.unwrap());
    let t = TestStorage::open_on(db, remote.clone(), SyncConfig::default(), Connectivity::Offline).await;

    assert_queue_counts!(t.storage.sync_status().await, pending: 2, failed: 0);
    let cached = t.storage.load(EntityType::Activity).await.unwrap();
    assert_record_ids!(cached, ["w2", "w1"]);

    let mut events = t.storage.subscribe();
    t.signal.set_online();
    let report = next_pass(&mut events).await;

    assert_eq!(report.synced, 2);
    assert_eq!(remote.written_ids(), vec!["w1", "w2"]);
    assert_queue_counts!(t.storage.sync_status().await, pending: 0, failed: 0);
}

#[tokio::test]
async fn test_keys_are_namespaced_by_user_suffix() {
    let db = Arc::new(LocalDatabase::in_memory().await.unwrap());
    let t = TestStorage::open_on(
        db.clone(),
        Arc::new(FlakyRemote::new()),
        SyncConfig::default(),
        Connectivity::Offline,
    )
    .await;
    t.storage
        .save(EntityType::Sleep, workout("s1", "night"), OperationKind::Create)
        .await
        .unwrap();

    assert!(db.get("healss-sleep-34cd56ef").await.unwrap().is_some());
    assert!(db.get("healss-sync-queue-34cd56ef").await.unwrap().is_some());

    let stats = db.get_stats().await.unwrap();
    assert_eq!(stats.key_count, 2);
}
