//! # Unified Storage
//!
//! The one object the application talks to. Local-first: `save` returns as
//! soon as the record is in the local cache and the operation is queued; the
//! remote write happens in the background. `load` prefers the server when
//! online and falls back to the cache otherwise.
//!
//! One instance serves exactly one user. Two instances (or two processes)
//! sharing a user's keys in the same store race each other; nothing
//! coordinates them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healss_sync::local_db::MemoryStore;
//! use healss_sync::remote::MemoryRemote;
//! use healss_sync::shared::{EntityType, OperationKind, Record, SyncConfig};
//! use healss_sync::storage::UnifiedStorage;
//! use healss_sync::sync::{Connectivity, ConnectivitySignal};
//! use std::sync::Arc;
//!
//! # async fn example() -> healss_sync::shared::Result<()> {
//! let signal = ConnectivitySignal::new(Connectivity::Online);
//! let storage = UnifiedStorage::open(
//!     "0b7c3f0e-1d2a-4c55-9f7e-12ab34cd56ef",
//!     SyncConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryRemote::new()),
//!     signal.monitor(),
//! )
//! .await?;
//!
//! let mut workout = Record::new();
//! workout.insert("name", "Leg Day");
//! storage.save(EntityType::Activity, workout, OperationKind::Create).await?;
//!
//! let status = storage.sync_status().await;
//! println!("{} pending, {} failed", status.pending, status.failed);
//!
//! storage.dispose();
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::local_db::cache::LocalCache;
use crate::local_db::keys::KeyNamespace;
use crate::local_db::store::KeyValueStore;
use crate::offline::operation::StorageOperation;
use crate::offline::queue::SyncQueue;
use crate::offline::reconciliation::{reconcile, USER_ID_FIELD};
use crate::remote::{RemoteAccessor, RemoteStore};
use crate::shared::config::SyncConfig;
use crate::shared::entity::{EntityType, OperationKind};
use crate::shared::error::{Result, StorageError};
use crate::shared::record::{EntityRecord, Record};
use crate::sync::background::{spawn_connectivity_listener, spawn_interval};
use crate::sync::network_monitor::NetworkMonitor;
use crate::sync::processor::SyncProcessor;
use crate::sync::sync_state::{PassOutcome, SyncEvent, SyncStatus};

const EVENT_CAPACITY: usize = 64;

/// Local-first storage coordinator for one user
pub struct UnifiedStorage {
    user_id: String,
    config: SyncConfig,
    cache: LocalCache,
    queue: Arc<Mutex<SyncQueue>>,
    accessor: Arc<RemoteAccessor>,
    processor: Arc<SyncProcessor>,
    monitor: NetworkMonitor,
    events: broadcast::Sender<SyncEvent>,
    evicted: AtomicUsize,
    /// Serializes cache plus queue updates of `save` and `load`
    write_lock: Mutex<()>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl UnifiedStorage {
    /// Restore the user's queue and start the background tasks
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(
        user_id: impl Into<String>,
        config: SyncConfig,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        monitor: NetworkMonitor,
    ) -> Result<Self> {
        config.validate()?;
        let user_id = user_id.into();
        let keys = KeyNamespace::new(config.key_prefix.clone(), &user_id);

        let queue = SyncQueue::load(store.clone(), keys.queue_key(), config.offline_queue_limit).await?;
        let queue = Arc::new(Mutex::new(queue));
        let accessor = Arc::new(RemoteAccessor::new(remote, user_id.clone()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let processor = Arc::new(SyncProcessor::new(
            queue.clone(),
            accessor.clone(),
            monitor.clone(),
            events.clone(),
            config.max_retries,
            config.remote_timeout,
        ));

        let tasks = vec![
            spawn_interval(processor.clone(), config.sync_interval),
            spawn_connectivity_listener(processor.clone(), monitor.clone(), events.clone()),
        ];

        tracing::info!(
            "Storage opened for user ...{} ({})",
            keys.suffix(),
            monitor.current()
        );

        Ok(Self {
            user_id,
            cache: LocalCache::new(store, keys),
            config,
            queue,
            accessor,
            processor,
            monitor,
            events,
            evicted: AtomicUsize::new(0),
            write_lock: Mutex::new(()),
            tasks: StdMutex::new(tasks),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Write locally, queue the remote write, return the operation id
    ///
    /// A record without an id gets a fresh UUID. Only local failures are
    /// returned; remote failures are retried in the background. When the
    /// operation cannot be queued the cache write is undone.
    pub async fn save(
        &self,
        entity: EntityType,
        mut record: Record,
        operation: OperationKind,
    ) -> Result<String> {
        if self.processor.is_disposed() {
            return Err(StorageError::Disposed);
        }

        let record_id = record.ensure_id();
        let mut payload = record.clone();
        payload.insert(USER_ID_FIELD, self.user_id.as_str());
        let queued = StorageOperation::new(entity, operation, payload);
        let operation_id = queued.id.clone();

        let _guard = self.write_lock.lock().await;
        let before = self.cache.read_all(entity).await?;
        match operation {
            OperationKind::Delete => {
                self.cache.remove(entity, &record_id).await?;
            }
            OperationKind::Create | OperationKind::Update => {
                self.cache.write(entity, record).await?;
            }
        }

        let evicted = match self.queue.lock().await.enqueue(queued).await {
            Ok(evicted) => evicted,
            Err(e) => {
                if let Err(restore) = self.cache.replace_all(entity, &before).await {
                    tracing::warn!(
                        "Failed to roll back cached {} {}: {}",
                        entity,
                        record_id,
                        restore
                    );
                }
                return Err(e);
            }
        };
        for dropped in evicted {
            self.report_eviction(dropped);
        }
        tracing::debug!("Queued {} {} as {}", operation, entity, operation_id);

        if self.monitor.is_online() {
            let processor = self.processor.clone();
            tokio::spawn(async move {
                processor.run_pass().await;
            });
        }

        Ok(operation_id)
    }

    /// Typed variant of [`save`](Self::save)
    pub async fn save_record<R: EntityRecord>(
        &self,
        record: &R,
        operation: OperationKind,
    ) -> Result<String> {
        self.save(R::ENTITY, Record::from_typed(record)?, operation).await
    }

    /// Records of `entity`, from the server when reachable
    ///
    /// A successful remote load refreshes the cache. Operations still in the
    /// queue are replayed over the remote rows first, so unsynced local writes
    /// stay visible. Offline, or when the remote load fails, the cached array
    /// is returned instead.
    pub async fn load(&self, entity: EntityType) -> Result<Vec<Record>> {
        if !self.monitor.is_online() {
            return self.cache.read_all(entity).await;
        }

        let remote = tokio::time::timeout(self.config.remote_timeout, self.accessor.load(entity))
            .await
            .unwrap_or(Err(StorageError::Timeout(self.config.remote_timeout)));
        let rows = match remote {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Remote load of {} failed, using local cache: {}", entity, e);
                return self.cache.read_all(entity).await;
            }
        };

        let _guard = self.write_lock.lock().await;
        let local = self.cache.read_all(entity).await?;
        let pending = self.queue.lock().await.unsynced_for(entity);
        let reconciled = reconcile(rows, &local, &pending);
        if reconciled.replayed > 0 {
            tracing::debug!(
                "Replayed {} unsynced operations over remote {}",
                reconciled.replayed,
                entity
            );
        }

        if let Err(e) = self.cache.replace_all(entity, &reconciled.records).await {
            tracing::warn!("Failed to refresh local cache for {}: {}", entity, e);
        }
        Ok(reconciled.records)
    }

    /// Typed variant of [`load`](Self::load)
    pub async fn load_records<R: EntityRecord>(&self) -> Result<Vec<R>> {
        self.load(R::ENTITY)
            .await?
            .iter()
            .map(Record::to_typed)
            .collect()
    }

    pub async fn sync_status(&self) -> SyncStatus {
        let counts = self.queue.lock().await.counts(self.config.max_retries);
        SyncStatus {
            pending: counts.pending,
            failed: counts.failed,
            online: self.monitor.is_online(),
            syncing: self.processor.is_running(),
            evicted: self.evicted.load(Ordering::Relaxed),
            last_pass_at: self.processor.last_pass_at().await,
        }
    }

    /// Run a pass now
    pub async fn force_sync_all(&self) -> PassOutcome {
        self.processor.run_pass().await
    }

    /// Drop operations that exhausted their retry budget
    ///
    /// Their records stay in the local cache.
    pub async fn clear_failed(&self) -> Result<usize> {
        let removed = self
            .queue
            .lock()
            .await
            .clear_failed(self.config.max_retries)
            .await?;
        if removed > 0 {
            tracing::info!("Cleared {} failed operations", removed);
        }
        Ok(removed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Stop the background tasks; later calls do nothing
    pub fn dispose(&self) {
        if self.processor.is_disposed() {
            return;
        }
        self.processor.dispose();

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        tracing::info!("Storage disposed");
    }

    fn report_eviction(&self, operation: StorageOperation) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Sync queue full, dropped unsent operation {} ({} {})",
            operation.id,
            operation.operation,
            operation.entity
        );
        let _ = self.events.send(SyncEvent::Evicted(operation));
    }
}

impl Drop for UnifiedStorage {
    fn drop(&mut self) {
        self.dispose();
    }
}
