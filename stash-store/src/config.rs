//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use stash_core::constants::DEFAULT_SWEEP_INTERVAL_SECS;

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of entries (unbounded when `None`)
    pub max_entries: Option<usize>,
    /// Seconds between background sweeps (no sweeper when `None`)
    pub sweep_interval_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            sweep_interval_secs: Some(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl StoreConfig {
    /// Bounds the number of entries held at once.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Sets the background sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = Some(interval.as_secs().max(1));
        self
    }

    /// Disables the background sweeper; expiry stays lazy.
    pub fn without_sweeper(mut self) -> Self {
        self.sweep_interval_secs = None;
        self
    }

    /// Returns the sweep interval, if a sweeper is configured. A zero
    /// interval counts as no sweeper.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
