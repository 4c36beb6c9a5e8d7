//! Facade configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use stash_core::error::{Result, StashError};
use stash_store::StoreConfig;
use stash_web::WebCacheConfig;

/// Configuration for a [`crate::Stash`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashConfig {
    /// Key-value store settings
    pub store: StoreConfig,
    /// Page cache settings
    pub web: WebCacheConfig,
}

impl StashConfig {
    /// Reads configuration from the environment (and `.env`, if present).
    ///
    /// | Variable                    | Meaning                          |
    /// |-----------------------------|----------------------------------|
    /// | `STASH_MAX_ENTRIES`         | store capacity                   |
    /// | `STASH_SWEEP_INTERVAL_SECS` | sweep interval, `0` disables     |
    /// | `STASH_WEB_TTL_SECS`        | page cache TTL                   |
    /// | `STASH_FETCH_TIMEOUT_MS`    | page fetch deadline              |
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(max) = parse_var::<usize>(&lookup, "STASH_MAX_ENTRIES")? {
            config.store = config.store.with_max_entries(max);
        }
        match parse_var::<u64>(&lookup, "STASH_SWEEP_INTERVAL_SECS")? {
            Some(0) => config.store = config.store.without_sweeper(),
            Some(secs) => {
                config.store = config.store.with_sweep_interval(Duration::from_secs(secs))
            }
            None => {}
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "STASH_WEB_TTL_SECS")? {
            if secs == 0 {
                return Err(StashError::ConfigError(
                    "STASH_WEB_TTL_SECS must be greater than zero".into(),
                ));
            }
            config.web = config.web.with_ttl(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "STASH_FETCH_TIMEOUT_MS")? {
            config.web = config.web.with_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| StashError::ConfigError(format!("{}: {}", name, e))),
        None => Ok(None),
    }
}
