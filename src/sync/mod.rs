//! # Background Sync
//!
//! Moves queued operations to the remote database while respecting
//! connectivity.
//!
//! ## Architecture
//!
//! - **Processor**: one non-reentrant pass over the eligible queue entries
//! - **Background**: interval task and connectivity listener
//! - **Network Monitor**: connectivity signal injected by the host
//! - **Sync State**: status snapshot, pass outcomes and events
//!
//! ## Triggers
//!
//! A pass starts after every `save` made while online, every
//! `sync_interval`, on each offline to online transition and on explicit
//! request. Triggers that arrive while a pass runs are dropped.

pub mod background;
pub mod network_monitor;
pub mod processor;
pub mod sync_state;

pub use network_monitor::{Connectivity, ConnectivitySignal, NetworkMonitor};
pub use processor::SyncProcessor;
pub use sync_state::{PassOutcome, PassReport, SyncEvent, SyncStatus};
