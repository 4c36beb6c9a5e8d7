//! # Stash
//!
//! One explicitly constructed handle over the key-value store, the call
//! analytics registry, and the page cache.
//!
//! ```rust,ignore
//! use stash_client::{Stash, StashConfig};
//!
//! let stash = Stash::connect(StashConfig::from_env()?)?;
//!
//! let key = stash.store("hello")?;
//! assert_eq!(stash.get_as_string(&key)?.as_deref(), Some("hello"));
//! println!("{}", stash.replay(stash_client::STORE_OPERATION));
//!
//! let page = stash.cached_fetch("http://example.com").await?;
//!
//! stash.shutdown();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;

pub use config::StashConfig;

pub use stash_calls::{instrument, with_counting, with_history, CallRegistry, Replay};
pub use stash_core::{CallRecord, Result, StashError, Value};
pub use stash_store::{KeyValueStore, StoreConfig, StoreStats};
pub use stash_web::{HttpFetcher, WebCache, WebCacheConfig};

use std::sync::Arc;
use std::time::Duration;

use stash_core::traits::Fetcher;
use stash_store::{spawn_sweeper, Sweeper};
use tracing::{info, warn};

/// Name under which [`Stash::store`] calls are recorded.
pub const STORE_OPERATION: &str = "KeyValueStore::store";

type StoreOp = Box<dyn Fn(Value) -> Result<String> + Send + Sync>;

/// Store, call analytics, and page cache behind one handle.
///
/// Created with [`Stash::connect`] and released with [`Stash::shutdown`];
/// nothing is shared through process-wide state.
pub struct Stash {
    store: Arc<KeyValueStore>,
    calls: Arc<CallRegistry>,
    web: WebCache,
    instrumented_store: StoreOp,
    sweeper: Option<Sweeper>,
}

impl Stash {
    /// Creates a stash that fetches pages over HTTP.
    pub fn connect(config: StashConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new()?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Creates a stash with a custom page fetcher.
    ///
    /// The background sweeper starts only when called inside a tokio runtime;
    /// expiry stays correct without it.
    pub fn with_fetcher(config: StashConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = Arc::new(KeyValueStore::with_config(config.store.clone()));
        let calls = Arc::new(CallRegistry::new());
        let web = WebCache::with_config(store.clone(), fetcher, config.web.clone());

        let instrumented_store: StoreOp = {
            let store = store.clone();
            Box::new(instrument(&calls, STORE_OPERATION, move |value: Value| {
                store.store(value)
            }))
        };

        let sweeper = config
            .store
            .sweep_interval()
            .and_then(|interval| start_sweeper(store.clone(), interval));

        info!(
            max_entries = ?config.store.max_entries,
            sweeper = sweeper.is_some(),
            "Stash connected"
        );

        Self {
            store,
            calls,
            web,
            instrumented_store,
            sweeper,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STORE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stores `value` under a fresh key. Counted and recorded under
    /// [`STORE_OPERATION`].
    pub fn store(&self, value: impl Into<Value>) -> Result<String> {
        (self.instrumented_store)(value.into())
    }

    /// Stores `value` under a fresh key, expiring after `ttl`.
    pub fn store_with_ttl(&self, value: impl Into<Value>, ttl: Duration) -> Result<String> {
        self.store.store_with_ttl(value, ttl)
    }

    /// Returns the raw value under `key`.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.store.get(key)
    }

    /// Returns the value under `key` passed through `decode`.
    pub fn get_with<T, E, F>(&self, key: &str, decode: F) -> Result<Option<T>>
    where
        F: FnOnce(&[u8]) -> std::result::Result<T, E>,
        E: std::fmt::Display,
    {
        self.store.get_with(key, decode)
    }

    /// Returns the value under `key` as UTF-8 text.
    pub fn get_as_string(&self, key: &str) -> Result<Option<String>> {
        self.store.get_as_string(key)
    }

    /// Returns the value under `key` as an integer.
    pub fn get_as_integer(&self, key: &str) -> Result<Option<i64>> {
        self.store.get_as_integer(key)
    }

    /// Removes `key`. Returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(key)
    }

    /// The underlying store, for counters, lists, and expiry control.
    pub fn kv(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CALL ANALYTICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The call registry, for instrumenting further operations.
    pub fn calls(&self) -> &Arc<CallRegistry> {
        &self.calls
    }

    /// Replays the recorded invocations of `operation`.
    pub fn replay(&self, operation: &str) -> Replay {
        self.calls.replay(operation)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PAGE CACHE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Returns the page at `url`, cached for the configured TTL.
    pub async fn cached_fetch(&self, url: &str) -> Result<String> {
        self.web.cached_fetch(url).await
    }

    /// Returns the page at `url`, caching a fresh fetch for `ttl`.
    pub async fn cached_fetch_with_ttl(&self, url: &str, ttl: Duration) -> Result<String> {
        self.web.cached_fetch_with_ttl(url, ttl).await
    }

    /// Returns how many times `url` was requested.
    pub fn access_count(&self, url: &str) -> Result<u64> {
        self.web.access_count(url)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stops the sweeper and releases the store. Handles to the store that
    /// outlive this call see `BackendUnavailable`.
    pub fn shutdown(self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
        self.store.close();
        info!("Stash shut down");
    }
}

fn start_sweeper(store: Arc<KeyValueStore>, interval: Duration) -> Option<Sweeper> {
    match tokio::runtime::Handle::try_current() {
        Ok(_) => Some(spawn_sweeper(store, interval)),
        Err(_) => {
            warn!("No tokio runtime, background sweep disabled");
            None
        }
    }
}
