//! # Sync Queue
//!
//! Ordered, deduplicated, bounded list of pending mutations, persisted as a
//! JSON array under the user's queue key so it survives a restart.
//!
//! ## Rules
//!
//! - Enqueuing an operation whose id is already queued replaces the old entry.
//! - Beyond the configured limit the oldest entries are evicted first, synced
//!   or not. Evicted operations are returned to the caller so the loss can be
//!   reported; the queue itself does not keep them.
//! - Operations that exhausted their retry budget stay queued (and count as
//!   failed) until [`SyncQueue::clear_failed`] is called.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healss_sync::offline::{StorageOperation, SyncQueue};
//! use healss_sync::local_db::MemoryStore;
//! use healss_sync::shared::{EntityType, OperationKind, Record};
//! use std::sync::Arc;
//!
//! # async fn example() -> healss_sync::shared::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let mut queue = SyncQueue::load(store, "healss-sync-queue-34cd56ef".into(), 100).await?;
//!
//! let op = StorageOperation::new(EntityType::Activity, OperationKind::Create, Record::new());
//! queue.enqueue(op).await?;
//!
//! for op in queue.pending_eligible(3) {
//!     // apply remotely, then:
//!     queue.mark_synced(&op.id);
//! }
//! queue.dequeue_synced().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use crate::local_db::store::KeyValueStore;
use crate::offline::operation::StorageOperation;
use crate::shared::entity::EntityType;
use crate::shared::error::Result;

/// Persistent queue of pending operations
pub struct SyncQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
    limit: usize,
    operations: VecDeque<StorageOperation>,
}

/// Queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// Unsynced operations still within their retry budget
    pub pending: usize,
    /// Unsynced operations that exhausted their retry budget
    pub failed: usize,
    /// Every queued entry
    pub total: usize,
}

impl SyncQueue {
    /// Load the persisted queue, starting empty when it is missing or corrupt
    pub async fn load(store: Arc<dyn KeyValueStore>, key: String, limit: usize) -> Result<Self> {
        let operations = match store.get(&key).await? {
            Some(raw) => match serde_json::from_str::<VecDeque<StorageOperation>>(&raw) {
                Ok(operations) => operations,
                Err(e) => {
                    tracing::warn!("Resetting corrupt sync queue '{}': {}", key, e);
                    VecDeque::new()
                }
            },
            None => VecDeque::new(),
        };

        if !operations.is_empty() {
            tracing::info!("Restored {} queued operations from '{}'", operations.len(), key);
        }

        Ok(Self {
            store,
            key,
            limit,
            operations,
        })
    }

    /// Append an operation, replacing any entry with the same id
    ///
    /// Returns the operations evicted to stay within the limit. The queue is
    /// only changed when persisting the new state succeeds.
    pub async fn enqueue(&mut self, operation: StorageOperation) -> Result<Vec<StorageOperation>> {
        let mut next = self.operations.clone();
        next.retain(|op| op.id != operation.id);
        next.push_back(operation);

        let mut evicted = Vec::new();
        while next.len() > self.limit {
            if let Some(oldest) = next.pop_front() {
                evicted.push(oldest);
            }
        }

        self.write(&next).await?;
        self.operations = next;
        Ok(evicted)
    }

    /// Remove every synced entry, returning how many were removed
    pub async fn dequeue_synced(&mut self) -> Result<usize> {
        let before = self.operations.len();
        self.operations.retain(|op| !op.synced);
        self.persist().await?;
        Ok(before - self.operations.len())
    }

    /// Unsynced entries within the retry budget, oldest first
    pub fn pending_eligible(&self, max_retries: u32) -> Vec<StorageOperation> {
        self.operations
            .iter()
            .filter(|op| op.is_eligible(max_retries))
            .cloned()
            .collect()
    }

    /// Mark an entry synced, returning whether it was found
    pub fn mark_synced(&mut self, id: &str) -> bool {
        match self.operations.iter_mut().find(|op| op.id == id) {
            Some(op) => {
                op.synced = true;
                true
            }
            None => false,
        }
    }

    /// Count a failed attempt, returning the new retry count
    pub fn record_failure(&mut self, id: &str) -> Option<u32> {
        let op = self.operations.iter_mut().find(|op| op.id == id)?;
        op.retry_count += 1;
        Some(op.retry_count)
    }

    /// Unsynced entries touching `entity`, oldest first
    pub fn unsynced_for(&self, entity: EntityType) -> Vec<StorageOperation> {
        self.operations
            .iter()
            .filter(|op| op.entity == entity && !op.synced)
            .cloned()
            .collect()
    }

    /// Get operation statistics
    pub fn counts(&self, max_retries: u32) -> QueueCounts {
        let mut counts = QueueCounts {
            total: self.operations.len(),
            ..QueueCounts::default()
        };
        for op in &self.operations {
            if op.is_eligible(max_retries) {
                counts.pending += 1;
            } else if op.is_failed(max_retries) {
                counts.failed += 1;
            }
        }
        counts
    }

    /// Drop operations that exhausted their retry budget
    pub async fn clear_failed(&mut self, max_retries: u32) -> Result<usize> {
        let before = self.operations.len();
        self.operations.retain(|op| !op.is_failed(max_retries));
        let removed = before - self.operations.len();
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Write the current state to the store
    pub async fn persist(&self) -> Result<()> {
        self.write(&self.operations).await
    }

    pub fn get(&self, id: &str) -> Option<&StorageOperation> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StorageOperation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    async fn write(&self, operations: &VecDeque<StorageOperation>) -> Result<()> {
        let json = serde_json::to_string(operations)?;
        self.store.set(&self.key, &json).await
    }
}
