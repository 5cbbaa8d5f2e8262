//! Storage fixtures

use healss_sync::local_db::{KeyValueStore, MemoryStore};
use healss_sync::shared::{Record, SyncConfig};
use healss_sync::sync::{Connectivity, ConnectivitySignal, SyncEvent};
use healss_sync::UnifiedStorage;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::remote::FlakyRemote;

pub const USER_ID: &str = "0b7c3f0e-1d2a-4c55-9f7e-12ab34cd56ef";

/// A coordinator wired to in-memory collaborators
pub struct TestStorage {
    pub store: Arc<dyn KeyValueStore>,
    pub remote: Arc<FlakyRemote>,
    pub signal: ConnectivitySignal,
    pub storage: UnifiedStorage,
}

impl TestStorage {
    pub async fn open(connectivity: Connectivity) -> Self {
        Self::open_with(SyncConfig::default(), connectivity).await
    }

    pub async fn open_with(config: SyncConfig, connectivity: Connectivity) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        Self::open_on(store, Arc::new(FlakyRemote::new()), config, connectivity).await
    }

    pub async fn open_on(
        store: Arc<dyn KeyValueStore>,
        remote: Arc<FlakyRemote>,
        config: SyncConfig,
        connectivity: Connectivity,
    ) -> Self {
        let signal = ConnectivitySignal::new(connectivity);
        let storage = UnifiedStorage::open(
            USER_ID,
            config,
            store.clone(),
            remote.clone(),
            signal.monitor(),
        )
        .await
        .expect("storage should open");
        Self {
            store,
            remote,
            signal,
            storage,
        }
    }
}

pub fn record(value: Value) -> Record {
    Record::from_value(value).expect("record must be a JSON object")
}

pub fn workout(id: &str, name: &str) -> Record {
    record(json!({"id": id, "name": name}))
}

/// Wait for the next completed pass, failing the test after a few seconds
pub async fn next_pass(events: &mut broadcast::Receiver<SyncEvent>) -> healss_sync::sync::PassReport {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::PassCompleted(report)) => return report,
                Ok(_) => continue,
                Err(e) => panic!("event stream ended: {:?}", e),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("no sync pass completed in time")
}
