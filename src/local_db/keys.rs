//! Storage key naming
//!
//! Keys are namespaced by the last eight characters of the user id:
//! `{prefix}-{type}-{suffix}` for cache arrays and
//! `{prefix}-sync-queue-{suffix}` for the queue.

use crate::shared::entity::EntityType;

const SUFFIX_LEN: usize = 8;

/// Per-user key namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
    suffix: String,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>, user_id: &str) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: user_suffix(user_id),
        }
    }

    /// Key of the cached array for `entity`
    pub fn data_key(&self, entity: EntityType) -> String {
        format!("{}-{}-{}", self.prefix, entity.as_str(), self.suffix)
    }

    /// Key of the persisted sync queue
    pub fn queue_key(&self) -> String {
        format!("{}-sync-queue-{}", self.prefix, self.suffix)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// Last eight characters of a user id, the whole id when shorter
pub fn user_suffix(user_id: &str) -> String {
    let count = user_id.chars().count();
    user_id.chars().skip(count.saturating_sub(SUFFIX_LEN)).collect()
}
