//! Property-based tests for the sync queue
//!
//! Uses proptest to generate operation sequences and verify the queue's
//! ordering, deduplication and bound.

use healss_sync::local_db::MemoryStore;
use healss_sync::offline::{StorageOperation, SyncQueue};
use healss_sync::shared::{EntityType, OperationKind, Record};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const KEY: &str = "healss-sync-queue-proptest";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn operations(count: usize) -> Vec<StorageOperation> {
    (0..count)
        .map(|i| {
            StorageOperation::new(
                EntityType::Activity,
                OperationKind::Create,
                Record::from_value(json!({"id": format!("w{}", i)})).unwrap(),
            )
        })
        .collect()
}

fn ids(ops: &[StorageOperation]) -> Vec<String> {
    ops.iter().map(|op| op.id.clone()).collect()
}

proptest! {
    #[test]
    fn test_queue_keeps_newest_within_limit(count in 0usize..40, limit in 1usize..15) {
        let ops = operations(count);
        let (kept, evicted) = runtime().block_on(async {
            let store = Arc::new(MemoryStore::new());
            let mut queue = SyncQueue::load(store, KEY.to_string(), limit).await.unwrap();
            let mut evicted = Vec::new();
            for op in &ops {
                evicted.extend(queue.enqueue(op.clone()).await.unwrap());
                assert!(queue.len() <= limit);
            }
            (queue.pending_eligible(3), evicted)
        });

        let split = count.saturating_sub(limit);
        prop_assert_eq!(ids(&kept), ids(&ops[split..]));
        prop_assert_eq!(ids(&evicted), ids(&ops[..split]));
    }

    #[test]
    fn test_reenqueue_is_idempotent(count in 1usize..20, repeat in 0usize..20) {
        let ops = operations(count);
        let target = ops[repeat % count].clone();
        let (len, entry) = runtime().block_on(async {
            let store = Arc::new(MemoryStore::new());
            let mut queue = SyncQueue::load(store, KEY.to_string(), 100).await.unwrap();
            for op in &ops {
                queue.enqueue(op.clone()).await.unwrap();
            }
            let mut changed = target.clone();
            changed.data.insert("name", "second");
            queue.enqueue(changed).await.unwrap();
            (queue.len(), queue.get(&target.id).cloned())
        });

        prop_assert_eq!(len, count);
        let entry = entry.unwrap();
        prop_assert_eq!(entry.data.get("name"), Some(&json!("second")));
    }

    #[test]
    fn test_persisted_queue_reloads_identically(count in 0usize..20, failures in 0u32..5) {
        let ops = operations(count);
        let (before, after) = runtime().block_on(async {
            let store = Arc::new(MemoryStore::new());
            let mut queue = SyncQueue::load(store.clone(), KEY.to_string(), 100).await.unwrap();
            for op in &ops {
                queue.enqueue(op.clone()).await.unwrap();
            }
            if let Some(first) = ops.first() {
                for _ in 0..failures {
                    queue.record_failure(&first.id);
                }
            }
            queue.persist().await.unwrap();

            let reloaded = SyncQueue::load(store, KEY.to_string(), 100).await.unwrap();
            (
                queue.iter().cloned().collect::<Vec<_>>(),
                reloaded.iter().cloned().collect::<Vec<_>>(),
            )
        });

        prop_assert_eq!(before, after);
    }
}
