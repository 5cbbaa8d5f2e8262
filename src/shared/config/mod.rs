//! Configuration module
//!
//! Provides the tunables of the sync coordinator ([`SyncConfig`]) and the
//! connection settings of the remote database ([`BackendConfig`]).
//!
//! # Configuration Sources
//!
//! - [`SyncConfig`] is built in code through [`SyncConfigBuilder`] or read
//!   from a TOML document with [`SyncConfig::from_toml_str`].
//! - [`BackendConfig`] is read from environment variables with
//!   [`BackendConfig::from_env`].

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default interval between background sync passes
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
/// Default number of attempts before an operation is given up on
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default maximum number of queued operations
pub const DEFAULT_OFFLINE_QUEUE_LIMIT: usize = 100;
/// Default timeout around a single remote call
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default prefix of every local storage key
pub const DEFAULT_KEY_PREFIX: &str = "healss";

const ENV_URL: &str = "HEALSS_SUPABASE_URL";
const ENV_ANON_KEY: &str = "HEALSS_SUPABASE_ANON_KEY";
const ENV_ACCESS_TOKEN: &str = "HEALSS_ACCESS_TOKEN";
const ENV_USER_ID: &str = "HEALSS_USER_ID";
const ENV_DB_PATH: &str = "HEALSS_DB_PATH";

/// Sync coordinator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Interval between background sync passes
    pub sync_interval: Duration,
    /// Failed attempts after which an operation is no longer retried
    pub max_retries: u32,
    /// Maximum queue length, oldest entries are evicted beyond it
    pub offline_queue_limit: usize,
    /// Timeout applied to every remote call
    pub remote_timeout: Duration,
    /// Prefix of local storage keys
    pub key_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            offline_queue_limit: DEFAULT_OFFLINE_QUEUE_LIMIT,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

/// On-disk shape of [`SyncConfig`], every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyncConfigFile {
    sync_interval_secs: Option<u64>,
    max_retries: Option<u32>,
    offline_queue_limit: Option<usize>,
    remote_timeout_secs: Option<u64>,
    key_prefix: Option<String>,
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Parse a TOML document, missing keys keep their defaults
    ///
    /// ```rust
    /// use healss_sync::shared::config::SyncConfig;
    ///
    /// let config = SyncConfig::from_toml_str("max_retries = 5").unwrap();
    /// assert_eq!(config.max_retries, 5);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: SyncConfigFile =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut builder = Self::builder();
        if let Some(secs) = file.sync_interval_secs {
            builder = builder.sync_interval(Duration::from_secs(secs));
        }
        if let Some(retries) = file.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(limit) = file.offline_queue_limit {
            builder = builder.offline_queue_limit(limit);
        }
        if let Some(secs) = file.remote_timeout_secs {
            builder = builder.remote_timeout(Duration::from_secs(secs));
        }
        if let Some(prefix) = file.key_prefix {
            builder = builder.key_prefix(prefix);
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sync_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.offline_queue_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "offline_queue_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.remote_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "remote_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::MissingValue("key_prefix"));
        }
        Ok(())
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    sync_interval: Option<Duration>,
    max_retries: Option<u32>,
    offline_queue_limit: Option<usize>,
    remote_timeout: Option<Duration>,
    key_prefix: Option<String>,
}

impl SyncConfigBuilder {
    /// Set the background sync interval
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Set the retry budget per operation
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the maximum queue length
    pub fn offline_queue_limit(mut self, limit: usize) -> Self {
        self.offline_queue_limit = Some(limit);
        self
    }

    /// Set the timeout of a single remote call
    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = Some(timeout);
        self
    }

    /// Set the local storage key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let config = SyncConfig {
            sync_interval: self.sync_interval.unwrap_or(defaults.sync_interval),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            offline_queue_limit: self
                .offline_queue_limit
                .unwrap_or(defaults.offline_queue_limit),
            remote_timeout: self.remote_timeout.unwrap_or(defaults.remote_timeout),
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Connection settings for the hosted REST database
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public API key sent as `apikey`
    pub anon_key: String,
    /// Access token of the signed-in user, falls back to the anon key
    pub access_token: Option<String>,
    /// Id of the signed-in user
    pub user_id: String,
    /// Local SQLite file
    pub db_path: PathBuf,
}

impl BackendConfig {
    /// Read the backend settings from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(ENV_URL).map_err(|_| ConfigError::MissingValue(ENV_URL))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        let anon_key =
            std::env::var(ENV_ANON_KEY).map_err(|_| ConfigError::MissingValue(ENV_ANON_KEY))?;
        let user_id =
            std::env::var(ENV_USER_ID).map_err(|_| ConfigError::MissingValue(ENV_USER_ID))?;
        let access_token = std::env::var(ENV_ACCESS_TOKEN).ok().filter(|t| !t.is_empty());
        let db_path = std::env::var(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_db_path());

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            access_token,
            user_id,
            db_path,
        })
    }
}

/// Platform data directory location of the local database
pub fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("healss");
    path.push("local.db");
    path
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
