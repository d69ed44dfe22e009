//! Network state monitor.
//!
//! Bridges an external reachability source (OS callbacks, a connectivity
//! plugin, a CLI flag) to the sync engine: every transition is forwarded to
//! [`SyncEngine::handle_connectivity`], which persists the flag and fires an
//! automatic sync on offline-to-online.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sync::SyncEngine;

/// Observes connectivity transitions and drives the engine's reactions.
pub struct ReachabilityMonitor {
    tx: watch::Sender<bool>,
}

impl ReachabilityMonitor {
    /// Create a monitor with the given initial reachability.
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Feed a reachability observation from the external source.
    pub fn set_online(&self, online: bool) {
        // send_if_modified suppresses duplicate observations, so the
        // watcher only sees real transitions
        self.tx.send_if_modified(|state| {
            let changed = *state != online;
            *state = online;
            changed
        });
    }

    /// Last observed reachability.
    #[must_use]
    pub fn current(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to reachability transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Spawn the watcher task that forwards every transition to the engine.
    ///
    /// The task ends when the monitor is dropped. Failures on this path are
    /// logged, never escalated; no caller is waiting on it.
    pub fn spawn_watcher(&self, engine: SyncEngine) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                tracing::info!(
                    "Connectivity changed: {}",
                    if online { "online" } else { "offline" }
                );
                engine.handle_connectivity(online).await;
            }
            tracing::debug!("Reachability source closed, watcher exiting");
        })
    }
}
