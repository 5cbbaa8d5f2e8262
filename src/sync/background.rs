//! # Background Sync Tasks
//!
//! The two long-lived tasks of a coordinator:
//!
//! - **Interval**: one pass every `sync_interval`, whatever happened recently.
//!   Ticks missed while a pass was slow are skipped, not bunched up.
//! - **Connectivity listener**: publishes every connectivity change and runs
//!   one pass on each offline to online transition.
//!
//! Both are plain Tokio tasks; the coordinator aborts them on dispose.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::sync::network_monitor::{Connectivity, NetworkMonitor};
use crate::sync::processor::SyncProcessor;
use crate::sync::sync_state::{PassOutcome, SyncEvent};

/// Start the periodic pass task; the first tick comes one period from now
pub fn spawn_interval(processor: Arc<SyncProcessor>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if processor.run_pass().await == PassOutcome::Disposed {
                break;
            }
        }
        tracing::debug!("Sync interval task stopped");
    })
}

/// Start the task that reacts to connectivity changes
pub fn spawn_connectivity_listener(
    processor: Arc<SyncProcessor>,
    mut monitor: NetworkMonitor,
    events: broadcast::Sender<SyncEvent>,
) -> JoinHandle<()> {
    let mut previous = monitor.current();
    tokio::spawn(async move {
        while let Some(current) = monitor.changed().await {
            if current == previous {
                continue;
            }
            let _ = events.send(SyncEvent::ConnectivityChanged(current));

            if previous == Connectivity::Offline && current == Connectivity::Online {
                tracing::info!("Back online, syncing pending operations");
                if processor.run_pass().await == PassOutcome::Disposed {
                    break;
                }
            }
            previous = current;
        }
        tracing::debug!("Connectivity listener stopped");
    })
}
