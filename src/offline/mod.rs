//! # Offline Operation Queue
//!
//! Write-behind support for the storage coordinator: every local write is
//! recorded as a [`StorageOperation`] and kept in the persistent [`SyncQueue`]
//! until the sync processor confirms the remote write.
//!
//! ## Key Components
//!
//! - `operation.rs`: the queued mutation and its id format
//! - `queue.rs`: ordered, deduplicated, bounded persistent queue
//! - `reconciliation.rs`: replay of unsynced operations over remote rows

pub mod operation;
pub mod queue;
pub mod reconciliation;

// Re-export main types
pub use operation::StorageOperation;
pub use queue::{QueueCounts, SyncQueue};
pub use reconciliation::{reconcile, ReconciliationResult};
