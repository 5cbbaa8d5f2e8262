//! # Sync State
//!
//! Status snapshot and events published by the coordinator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::offline::operation::StorageOperation;
use crate::sync::network_monitor::Connectivity;

/// Snapshot returned by `UnifiedStorage::sync_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Unsynced operations still within their retry budget
    pub pending: usize,
    /// Operations that exhausted their retry budget
    pub failed: usize,
    pub online: bool,
    /// Whether a pass is running right now
    pub syncing: bool,
    /// Operations dropped by the queue limit since the coordinator opened
    pub evicted: usize,
    /// End of the last completed pass
    pub last_pass_at: Option<DateTime<Utc>>,
}

/// Counters of one completed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
}

/// What a pass trigger ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass was in flight, nothing was done
    AlreadyRunning,
    /// No connectivity, nothing was attempted
    Offline,
    /// The coordinator was disposed
    Disposed,
}

impl PassOutcome {
    /// Report of a pass that ran
    pub fn report(&self) -> Option<PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(*report),
            _ => None,
        }
    }
}

/// Notifications for callers that want more than polling the status
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PassCompleted(PassReport),
    /// The queue limit dropped an operation before it reached the server
    Evicted(StorageOperation),
    /// An operation exhausted its retry budget
    PermanentlyFailed { operation_id: String, error: String },
    ConnectivityChanged(Connectivity),
}
