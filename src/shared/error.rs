//! Storage Error Types
//!
//! This module defines the error type used across the local cache, the sync
//! queue, the remote accessor and the public storage facade.
//!
//! # Error Categories
//!
//! - **Local** - `QuotaExceeded`, `Database`, `Serialization`: the local store
//!   rejected a write. These are the only failures `save()` surfaces.
//! - **Remote** - `Remote`, `Http`, `Timeout`: captured by the sync processor
//!   as retry signals, never returned from `save()`.
//! - **Programmer errors** - `UnsupportedType`, `MissingId`, `Disposed`.
//!
//! # Usage
//!
//! ```rust
//! use healss_sync::shared::error::StorageError;
//!
//! let error = StorageError::remote(503, "service unavailable");
//! assert!(error.is_remote());
//! ```
use std::time::Duration;
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Result alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors produced by the local-first storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key/value backend refused a write because it is full
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, {limit} bytes allowed")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Total bytes the store would hold after the write
        needed: usize,
        /// Configured quota
        limit: usize,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local SQLite failure
    #[error("Local database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The remote database answered with a non-success status
    #[error("Remote error ({status}): {message}")]
    Remote {
        /// HTTP status code, 0 when the remote is not HTTP based
        status: u16,
        /// Response body or description
        message: String,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote call did not finish in time
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Entity type outside the closed set
    #[error("Unsupported entity type: '{0}'")]
    UnsupportedType(String),

    /// Update or delete without a record id
    #[error("Record has no id: {0}")]
    MissingId(String),

    /// The coordinator has been disposed
    #[error("Storage coordinator has been disposed")]
    Disposed,

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StorageError {
    /// Create a new remote error
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether this error came from the remote side (and is therefore retryable)
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::Http(_) | Self::Timeout(_)
        )
    }

    /// Whether this error came from the local store
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded { .. } | Self::Serialization(_) | Self::Database(_)
        )
    }
}
