//! Background reclamation of expired entries.
//!
//! Reads never depend on the sweeper; it only frees memory held by entries
//! nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::KeyValueStore;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running sweeper task. The task stops when the handle is
/// dropped, when [`Sweeper::stop`] is called, or once the store is closed.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Stops the sweeper.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a task on the current tokio runtime that calls
/// `cleanup_expired` every `interval`.
///
/// A zero interval is raised to one millisecond.
pub fn spawn_sweeper(store: Arc<KeyValueStore>, interval: Duration) -> Sweeper {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if store.is_closed() {
                info!("Store closed, stopping sweeper");
                break;
            }
            let removed = store.cleanup_expired();
            debug!(removed, "Sweep finished");
        }
    });

    Sweeper { handle }
}
