//! # Local Cache Store
//!
//! Per-user arrays of records, one JSON array per entity type, kept in the
//! key/value store so the UI can read its own writes without a network round
//! trip.
//!
//! Arrays are ordered most-recent-first. A write stamps `createdAt` when the
//! record is new and `updatedAt` when it replaces an existing one.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::local_db::keys::KeyNamespace;
use crate::local_db::store::KeyValueStore;
use crate::shared::entity::EntityType;
use crate::shared::error::Result;
use crate::shared::record::Record;

/// Cache of record arrays for one user
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    keys: KeyNamespace,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyNamespace) -> Self {
        Self {
            store,
            keys,
            write_lock: Mutex::new(()),
        }
    }

    /// Insert or replace a record by id, returning the stamped record
    ///
    /// The record must already carry an id.
    pub async fn write(&self, entity: EntityType, mut record: Record) -> Result<Record> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_all(entity).await?;
        let now = chrono::Utc::now().to_rfc3339();
        let id = record.id();

        match records.iter().position(|existing| id.is_some() && existing.id() == id) {
            Some(index) => {
                record.insert("updatedAt", now);
                records[index] = record.clone();
            }
            None => {
                record.insert("createdAt", now);
                records.insert(0, record.clone());
            }
        }

        self.persist(entity, &records).await?;
        tracing::debug!(entity = %entity, id = ?id, "Wrote record to local cache");
        Ok(record)
    }

    /// Every cached record of `entity`; missing or corrupt data reads as empty
    pub async fn read_all(&self, entity: EntityType) -> Result<Vec<Record>> {
        let key = self.keys.data_key(entity);
        let raw = match self.store.get(&key).await? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        match serde_json::from_str::<Vec<Record>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry '{}': {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite the whole array of `entity`
    pub async fn replace_all(&self, entity: EntityType, records: &[Record]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(entity, records).await
    }

    /// Drop the record with `id`, returning whether one was present
    pub async fn remove(&self, entity: EntityType, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_all(entity).await?;
        let before = records.len();
        records.retain(|record| record.id().as_deref() != Some(id));

        if records.len() == before {
            return Ok(false);
        }
        self.persist(entity, &records).await?;
        Ok(true)
    }

    async fn persist(&self, entity: EntityType, records: &[Record]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.store.set(&self.keys.data_key(entity), &json).await
    }
}
