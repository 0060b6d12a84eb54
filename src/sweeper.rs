//! A periodic background task that triggers [`reclaim`], independent of
//! the eviction piggybacked on `acquire` (which still runs synchronously
//! inline; this sweeper is an operational nicety for deployments that
//! want period-driven GC as well). A struct that owns its channel ends
//! and is spawned via an associated `spawn` function returning a
//! [`JoinHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::registry::Registry;

/// Spawns a task that calls [`crate::eviction::reclaim`] on a fixed
/// interval until the returned handle is dropped or [`EvictionSweeper::stop`]
/// is called.
pub struct EvictionSweeper {
    stop_tx: watch::Sender<bool>,
}

impl EvictionSweeper {
    /// Spawns the sweeper, ticking every `interval`.
    pub fn spawn(registry: Arc<Registry>, interval: Duration) -> (Self, JoinHandle<()>) {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = crate::eviction::reclaim(&registry).await {
                            tracing::warn!(error = %err, "periodic reclaim failed");
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        (Self { stop_tx }, handle)
    }

    /// Signals the sweeper task to stop after its current tick.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
