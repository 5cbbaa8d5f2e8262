//! # Network Monitor
//!
//! Two-state connectivity fed by the platform. The platform side holds a
//! [`ConnectivitySignal`] and reports changes; the coordinator side holds a
//! [`NetworkMonitor`] and reads the current state or waits for the next
//! change. Nothing is polled.
//!
//! ## Usage
//!
//! ```rust
//! use healss_sync::sync::{Connectivity, ConnectivitySignal};
//!
//! let signal = ConnectivitySignal::new(Connectivity::Offline);
//! let monitor = signal.monitor();
//! assert!(!monitor.is_online());
//!
//! signal.set_online();
//! assert!(monitor.is_online());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Network connectivity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("online"),
            Connectivity::Offline => f.write_str("offline"),
        }
    }
}

/// Sending half, owned by whatever observes the platform's network state
#[derive(Debug)]
pub struct ConnectivitySignal {
    sender: watch::Sender<Connectivity>,
}

impl ConnectivitySignal {
    pub fn new(initial: Connectivity) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Report a connectivity state; repeating the current state is harmless
    pub fn set(&self, connectivity: Connectivity) {
        let previous = self.sender.send_replace(connectivity);
        if previous != connectivity {
            tracing::info!("Network status changed: {} -> {}", previous, connectivity);
        }
    }

    pub fn set_online(&self) {
        self.set(Connectivity::Online);
    }

    pub fn set_offline(&self) {
        self.set(Connectivity::Offline);
    }

    pub fn current(&self) -> Connectivity {
        *self.sender.borrow()
    }

    /// A new receiving half
    pub fn monitor(&self) -> NetworkMonitor {
        NetworkMonitor {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}

/// Receiving half, read by the coordinator
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    receiver: watch::Receiver<Connectivity>,
}

impl NetworkMonitor {
    /// A monitor stuck at `connectivity`, for hosts without a network signal
    pub fn fixed(connectivity: Connectivity) -> Self {
        let (_, receiver) = watch::channel(connectivity);
        Self { receiver }
    }

    pub fn current(&self) -> Connectivity {
        *self.receiver.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Wait for the next reported state
    ///
    /// Returns `None` once the signal is gone. Several changes reported
    /// before this is polled collapse into the latest one.
    pub async fn changed(&mut self) -> Option<Connectivity> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }
}
