//! Common traits for stash.
//!
//! These traits define the seams between the cache and its collaborators,
//! so the web cache can run over any backend and any transport.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key-value storage with expiring entries, counters, and lists.
///
/// Implementations might use:
/// - In-memory storage (`stash_store::KeyValueStore`)
/// - A remote key-value service
///
/// Absent or expired keys are reported as `None`; connection failures are
/// reported as `StashError::BackendUnavailable`, never as absence.
pub trait KeyValueBackend: Send + Sync {
    /// Stores `value` under `key` with no expiry, replacing any previous entry.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Stores `value` under `key`, expiring after `ttl`.
    fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Returns the live value under `key`.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Removes `key`, returning whether an entry was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Atomically increments the integer under `key` and returns the new value.
    fn increment(&self, key: &str) -> Result<i64>;

    /// Appends to the list under `key` and returns its new length.
    fn append_to_list(&self, key: &str, value: Value) -> Result<usize>;

    /// Returns list elements between `start` and `stop` inclusive.
    ///
    /// Negative indices count from the end, as in Redis `LRANGE`.
    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Value>>;

    /// Sets a TTL on an existing key. Returns false if the key is absent.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// FETCHER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for retrieving remote page content.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body of `url` as text.
    ///
    /// Must fail with `StashError::FetchTimeout` once `timeout` elapses.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}
