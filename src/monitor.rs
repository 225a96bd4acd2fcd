//! # Connectivity Monitor
//!
//! Relays platform online/offline transition events into the coordinator.
//! The monitor holds no state of its own; the coordinator is the single
//! source of truth for the `is_online` flag used by business logic.
//!
//! The platform signal source is abstracted behind an event channel so
//! tests can inject a deterministic sender and fire transitions at will.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::coordinator::SyncCoordinator;
use crate::persistence::SnapshotStore;
use crate::remote::RemoteClient;

/// A platform connectivity transition; carries no payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Forwards connectivity events into a coordinator
pub struct ConnectivityMonitor {
    handle: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Spawn a relay task. Each `Online` event cascades into an automatic
    /// queue replay via [`SyncCoordinator::set_online_status`]; each
    /// `Offline` event flips the flag. The relay stops when the sender
    /// side of the channel is dropped.
    pub fn attach<R, S>(
        coordinator: Arc<SyncCoordinator<R, S>>,
        mut events: mpsc::Receiver<ConnectivityEvent>,
    ) -> Self
    where
        R: RemoteClient + 'static,
        S: SnapshotStore + 'static,
    {
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(?event, "connectivity event");
                match event {
                    ConnectivityEvent::Online => coordinator.set_online_status(true).await,
                    ConnectivityEvent::Offline => coordinator.set_online_status(false).await,
                }
            }
            debug!("connectivity source closed, relay stopping");
        });
        Self { handle }
    }

    /// Stop relaying without waiting for the channel to close
    pub fn detach(self) {
        self.handle.abort();
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
