//! Shared Module
//!
//! Types used by every layer of the storage stack: entity kinds, record
//! payloads, configuration and the error type.

/// Entity and operation kinds
pub mod entity;

/// Untyped and typed record payloads
pub mod record;

/// Storage error types
pub mod error;

/// Coordinator and backend configuration
pub mod config;

pub use config::{BackendConfig, ConfigError, SyncConfig, SyncConfigBuilder};
pub use entity::{EntityType, OperationKind};
pub use error::{Result, StorageError};
pub use record::{
    EntityRecord, OngoingWorkout, Record, SleepEntry, UserGoals, WorkoutActivity,
    WorkoutTemplate,
};
