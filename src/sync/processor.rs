//! # Sync Processor
//!
//! Drains the queue into the remote database.
//!
//! A pass takes a snapshot of the eligible operations and applies them one by
//! one, oldest first. Each operation gets exactly one attempt per pass: success
//! marks it synced, failure (including a timeout) bumps its retry count and the
//! pass moves on. Synced entries are removed from the queue when the pass ends.
//!
//! Passes never overlap. A trigger that arrives while a pass is in flight
//! returns [`PassOutcome::AlreadyRunning`] and does nothing. The queue lock is
//! only taken between remote calls, so `save` never waits on the network.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::offline::operation::StorageOperation;
use crate::offline::queue::SyncQueue;
use crate::remote::RemoteAccessor;
use crate::shared::error::{Result, StorageError};
use crate::sync::network_monitor::NetworkMonitor;
use crate::sync::sync_state::{PassOutcome, PassReport, SyncEvent};

/// Entry state of the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Idle,
    Running,
}

/// Puts the processor back to idle when the pass ends, however it ends
struct PassGuard<'a> {
    state: &'a StdMutex<PassState>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = PassState::Idle;
    }
}

pub struct SyncProcessor {
    queue: Arc<Mutex<SyncQueue>>,
    accessor: Arc<RemoteAccessor>,
    monitor: NetworkMonitor,
    events: broadcast::Sender<SyncEvent>,
    max_retries: u32,
    remote_timeout: Duration,
    state: StdMutex<PassState>,
    disposed: AtomicBool,
    last_pass_at: RwLock<Option<chrono::DateTime<Utc>>>,
}

impl SyncProcessor {
    pub fn new(
        queue: Arc<Mutex<SyncQueue>>,
        accessor: Arc<RemoteAccessor>,
        monitor: NetworkMonitor,
        events: broadcast::Sender<SyncEvent>,
        max_retries: u32,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            accessor,
            monitor,
            events,
            max_retries,
            remote_timeout,
            state: StdMutex::new(PassState::Idle),
            disposed: AtomicBool::new(false),
            last_pass_at: RwLock::new(None),
        }
    }

    /// Whether a pass is in flight
    pub fn is_running(&self) -> bool {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) == PassState::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Refuse every later pass; a pass already in flight stops before its next operation
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub async fn last_pass_at(&self) -> Option<chrono::DateTime<Utc>> {
        *self.last_pass_at.read().await
    }

    fn try_begin(&self) -> Option<PassGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            PassState::Running => None,
            PassState::Idle => {
                *state = PassState::Running;
                Some(PassGuard { state: &self.state })
            }
        }
    }

    /// Run one pass over the eligible operations
    pub async fn run_pass(&self) -> PassOutcome {
        if self.is_disposed() {
            return PassOutcome::Disposed;
        }
        if !self.monitor.is_online() {
            tracing::debug!("Skipping sync pass while offline");
            return PassOutcome::Offline;
        }
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Sync pass already running");
            return PassOutcome::AlreadyRunning;
        };

        let pending = self.queue.lock().await.pending_eligible(self.max_retries);
        let mut report = PassReport::default();

        if !pending.is_empty() {
            tracing::info!("Syncing {} pending operations", pending.len());
        }

        for operation in &pending {
            if self.is_disposed() {
                break;
            }
            if !self.monitor.is_online() {
                tracing::info!("Connectivity lost, stopping sync pass early");
                break;
            }

            report.attempted += 1;
            match self.apply(operation).await {
                Ok(()) => {
                    self.queue.lock().await.mark_synced(&operation.id);
                    report.synced += 1;
                    tracing::debug!("Synced operation {}", operation.id);
                }
                Err(e) => {
                    report.failed += 1;
                    self.record_failure(operation, &e).await;
                }
            }
        }

        if let Err(e) = self.queue.lock().await.dequeue_synced().await {
            tracing::warn!("Failed to persist sync queue after pass: {}", e);
        }

        *self.last_pass_at.write().await = Some(Utc::now());
        if report.attempted > 0 {
            tracing::info!(
                "Sync pass finished: {} synced, {} failed",
                report.synced,
                report.failed
            );
        }
        let _ = self.events.send(SyncEvent::PassCompleted(report));

        PassOutcome::Completed(report)
    }

    async fn apply(&self, operation: &StorageOperation) -> Result<()> {
        match tokio::time::timeout(self.remote_timeout, self.accessor.apply(operation)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.remote_timeout)),
        }
    }

    async fn record_failure(&self, operation: &StorageOperation, error: &StorageError) {
        let retries = self.queue.lock().await.record_failure(&operation.id);

        match retries {
            Some(count) if count >= self.max_retries => {
                tracing::error!(
                    "Giving up on operation {} after {} attempts: {}",
                    operation.id,
                    count,
                    error
                );
                let _ = self.events.send(SyncEvent::PermanentlyFailed {
                    operation_id: operation.id.clone(),
                    error: error.to_string(),
                });
            }
            Some(count) => {
                tracing::warn!(
                    "Sync attempt {}/{} failed for {}: {}",
                    count,
                    self.max_retries,
                    operation.id,
                    error
                );
            }
            // Evicted while the remote call was in flight
            None => {
                tracing::debug!("Operation {} left the queue during its sync attempt", operation.id);
            }
        }
    }
}
