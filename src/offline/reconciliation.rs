//! # State Reconciliation
//!
//! Merges a freshly loaded remote array with local writes that have not reached
//! the server yet.
//!
//! Remote rows win for everything that is already synced. Every unsynced queued
//! operation for the same entity type is then replayed on top, oldest first:
//! creates and updates upsert the locally cached version of the record (falling
//! back to the queued payload), deletes remove the record. Without this step a
//! load racing a pending save would hide the save until the next sync.

use crate::offline::operation::StorageOperation;
use crate::shared::entity::OperationKind;
use crate::shared::record::Record;

/// Field the coordinator injects into queued payloads
pub const USER_ID_FIELD: &str = "userId";

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    /// Records to cache, most-recent-first
    pub records: Vec<Record>,
    /// Number of queued operations replayed over the remote rows
    pub replayed: usize,
}

/// Replay `pending` operations over `remote` rows
///
/// `local` is the cache content before the load; it supplies the stamped
/// version of records touched by pending creates and updates.
pub fn reconcile(
    remote: Vec<Record>,
    local: &[Record],
    pending: &[StorageOperation],
) -> ReconciliationResult {
    let mut records = remote;
    let mut replayed = 0;

    for op in pending {
        let Some(id) = op.record_id() else {
            continue;
        };

        match op.operation {
            OperationKind::Delete => {
                records.retain(|record| record.id().as_deref() != Some(id.as_str()));
            }
            OperationKind::Create | OperationKind::Update => {
                let local_version = local
                    .iter()
                    .find(|record| record.id().as_deref() == Some(id.as_str()))
                    .cloned();
                let record = local_version.unwrap_or_else(|| {
                    let mut data = op.data.clone();
                    data.remove(USER_ID_FIELD);
                    data
                });

                match records
                    .iter()
                    .position(|existing| existing.id().as_deref() == Some(id.as_str()))
                {
                    Some(index) => records[index] = record,
                    None => records.insert(0, record),
                }
            }
        }
        replayed += 1;
    }

    ReconciliationResult { records, replayed }
}
