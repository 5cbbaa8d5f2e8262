//! Queued mutation operations

use serde::{Deserialize, Serialize};

use crate::shared::entity::{EntityType, OperationKind};
use crate::shared::record::Record;

const RANDOM_SUFFIX_LEN: usize = 9;

/// A mutation waiting to reach the remote database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOperation {
    /// `{type}-{operation}-{timestamp}-{random}`
    pub id: String,
    /// Entity type the payload belongs to
    #[serde(rename = "type")]
    pub entity: EntityType,
    /// Mutation kind
    pub operation: OperationKind,
    /// Record payload including the injected `userId`
    pub data: Record,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Set once the remote write succeeded
    pub synced: bool,
    /// Failed remote attempts so far
    pub retry_count: u32,
}

impl StorageOperation {
    /// Create an unsynced operation stamped with the current time
    pub fn new(entity: EntityType, operation: OperationKind, data: Record) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis();
        Self {
            id: format!(
                "{}-{}-{}-{}",
                entity.as_str(),
                operation.as_str(),
                timestamp,
                random_suffix()
            ),
            entity,
            operation,
            data,
            timestamp,
            synced: false,
            retry_count: 0,
        }
    }

    /// Id of the record this operation touches
    pub fn record_id(&self) -> Option<String> {
        self.data.id()
    }

    /// Unsynced and still within the retry budget
    pub fn is_eligible(&self, max_retries: u32) -> bool {
        !self.synced && self.retry_count < max_retries
    }

    /// Unsynced with the retry budget exhausted
    pub fn is_failed(&self, max_retries: u32) -> bool {
        !self.synced && self.retry_count >= max_retries
    }
}

fn random_suffix() -> String {
    let mut suffix = uuid::Uuid::new_v4().simple().to_string();
    suffix.truncate(RANDOM_SUFFIX_LEN);
    suffix
}
