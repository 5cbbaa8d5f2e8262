//! healss-sync - Local-first Workout Storage
//!
//! Client-side storage layer for the workout data of one signed-in user. Every
//! write lands in a durable local store first and is queued; a background
//! processor drains the queue into the hosted REST database whenever the
//! device is online.
//!
//! # Module Structure
//!
//! - **`shared`** - Types used by every layer
//!   - Entity and operation kinds, record payloads and typed records
//!   - Configuration, error type
//!
//! - **`local_db`** - On-device persistence
//!   - SQLite key/value table and the in-memory store
//!   - Per-user key naming, the local cache of record arrays
//!
//! - **`offline`** - Write-behind queue
//!   - Queued operations, the bounded persistent queue
//!   - Replay of unsynced operations over remote rows
//!
//! - **`remote`** - Hosted database access
//!   - Entity-to-table mapping, user scoping
//!   - PostgREST client and in-memory tables
//!
//! - **`sync`** - Background synchronization
//!   - Non-reentrant sync passes, interval and connectivity tasks
//!   - Status snapshot and events
//!
//! - **`storage`** - The [`UnifiedStorage`](storage::UnifiedStorage) facade
//!
//! # Feature Flags
//!
//! - **`cli`** (default) - the `healss-sync` binary
//!
//! # Thread Safety
//!
//! The facade is `Send + Sync` and meant to be shared behind an `Arc`. Queue
//! mutations go through one async mutex, and `save`/`load` update cache and
//! queue under a second one. Neither lock is held across a remote call.
//!
//! # Error Handling
//!
//! Fallible operations return [`shared::Result`]. `save` only fails on local
//! problems (quota, serialization, SQLite) or misuse; remote failures are
//! retried in the background and show up in
//! [`sync_status`](storage::UnifiedStorage::sync_status).

/// Shared types and data structures
pub mod shared;

/// On-device persistence
pub mod local_db;

/// Write-behind operation queue
pub mod offline;

/// Hosted database access
pub mod remote;

/// Background synchronization
pub mod sync;

/// Public storage facade
pub mod storage;

pub use storage::UnifiedStorage;
