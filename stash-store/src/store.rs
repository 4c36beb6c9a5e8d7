//! In-memory key-value store.
//!
//! Fast, thread-safe storage with lazy expiry. Every read path checks the
//! entry's deadline and treats expired entries as absent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use stash_core::error::{Result, StashError};
use stash_core::traits::KeyValueBackend;
use stash_core::Value;

use crate::config::StoreConfig;
use crate::decode::{decode_float, decode_integer, decode_utf8};
use crate::entry::{Data, Entry};

/// In-memory key-value store.
///
/// Uses a sharded concurrent map, so operations on different keys never
/// contend on the same lock and every per-key mutation is atomic with respect
/// to other operations on that key.
///
/// # Expiry
///
/// Expiry is lazy: a read that finds an expired entry reports it absent and
/// evicts it. `cleanup_expired` (or a [`crate::Sweeper`]) reclaims entries
/// nobody reads.
///
/// # Lifecycle
///
/// After [`KeyValueStore::close`] every operation fails with
/// `StashError::BackendUnavailable`.
///
/// # Capacity
///
/// With `max_entries` set, writes that may add a key are serialized so the
/// bound holds under concurrent callers. Unbounded stores never take that
/// lock.
#[derive(Debug)]
pub struct KeyValueStore {
    entries: DashMap<String, Entry>,
    config: StoreConfig,
    /// Held across eviction and insert in bounded stores
    room: Mutex<()>,
    closed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl KeyValueStore {
    /// Creates a new store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        let entries = match config.max_entries {
            Some(max) => DashMap::with_capacity(max),
            None => DashMap::new(),
        };
        Self {
            entries,
            config,
            room: Mutex::new(()),
            closed: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SCALARS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stores `value` under a freshly generated UUID key and returns the key.
    #[instrument(skip(self, value))]
    pub fn store(&self, value: impl Into<Value>) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        self.set(&key, value)?;
        Ok(key)
    }

    /// Stores `value` under a fresh key, expiring after `ttl`.
    #[instrument(skip(self, value))]
    pub fn store_with_ttl(&self, value: impl Into<Value>, ttl: Duration) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        self.set_with_ttl(&key, value, ttl)?;
        Ok(key)
    }

    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.insert(key, Data::Scalar(value.into()), None)
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    pub fn set_with_ttl(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        validate_ttl(ttl)?;
        self.insert(key, Data::Scalar(value.into()), Some(ttl))
    }

    /// Returns the live value under `key`.
    ///
    /// Absent and expired keys yield `Ok(None)`. A list entry is a
    /// `WrongType` error.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_open()?;
        let now = Instant::now();

        let Some(entry) = self.entries.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        if entry.is_expired(now) {
            drop(entry);
            self.evict_expired(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        match &entry.data {
            Data::Scalar(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value.clone()))
            }
            Data::List(_) => Err(StashError::WrongType {
                key: key.to_string(),
                expected: "scalar",
                found: "list",
            }),
        }
    }

    /// Returns the live value under `key` passed through `decode`.
    ///
    /// `decode` receives the raw byte rendering of the value. Its failure is a
    /// `DecodeError`, distinct from absence.
    pub fn get_with<T, E, F>(&self, key: &str, decode: F) -> Result<Option<T>>
    where
        F: FnOnce(&[u8]) -> std::result::Result<T, E>,
        E: std::fmt::Display,
    {
        match self.get(key)? {
            Some(value) => decode(&value.to_bytes())
                .map(Some)
                .map_err(|e| StashError::decode(key, e)),
            None => Ok(None),
        }
    }

    /// Returns the value under `key` decoded as UTF-8 text.
    pub fn get_as_string(&self, key: &str) -> Result<Option<String>> {
        self.get_with(key, decode_utf8)
    }

    /// Returns the value under `key` decoded as a base-10 integer.
    pub fn get_as_integer(&self, key: &str) -> Result<Option<i64>> {
        self.get_with(key, decode_integer)
    }

    /// Returns the value under `key` decoded as a float.
    pub fn get_as_float(&self, key: &str) -> Result<Option<f64>> {
        self.get_with(key, decode_float)
    }

    /// Returns the value under `key` decoded as a JSON document.
    pub fn get_as_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value.to_bytes())?)),
            None => Ok(None),
        }
    }

    /// Stores `value` as a JSON document under `key`.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, json)
    }

    /// Removes `key`. Returns whether a live entry was removed.
    #[instrument(skip(self))]
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let removed = self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(Instant::now()));
        debug!(key, removed, "Deleted key");
        Ok(removed)
    }

    /// Returns true if `key` holds a live entry.
    pub fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COUNTERS & LISTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Atomically increments the integer under `key` and returns the new value.
    ///
    /// A missing or expired key starts from zero. An existing TTL is kept.
    pub fn increment(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        let _room = self.reserve(key);
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                let entry = occupied.get_mut();
                let current = match &entry.data {
                    Data::Scalar(value) => value
                        .as_integer()
                        .ok_or_else(|| StashError::decode(key, "value is not an integer"))?,
                    other => {
                        return Err(StashError::WrongType {
                            key: key.to_string(),
                            expected: "integer",
                            found: other.kind(),
                        })
                    }
                };
                let next = current.checked_add(1).ok_or_else(|| StashError::Overflow {
                    key: key.to_string(),
                })?;
                entry.data = Data::Scalar(Value::Int(next));
                Ok(next)
            }
            MapEntry::Occupied(mut occupied) => {
                occupied.insert(Entry::new(Data::Scalar(Value::Int(1)), None));
                Ok(1)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(Data::Scalar(Value::Int(1)), None));
                Ok(1)
            }
        }
    }

    /// Appends `value` to the list under `key` and returns the new length.
    pub fn append_to_list(&self, key: &str, value: impl Into<Value>) -> Result<usize> {
        self.ensure_open()?;
        let _room = self.reserve(key);
        let value = value.into();
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                match &mut occupied.get_mut().data {
                    Data::List(items) => {
                        items.push(value);
                        Ok(items.len())
                    }
                    other => Err(StashError::WrongType {
                        key: key.to_string(),
                        expected: "list",
                        found: other.kind(),
                    }),
                }
            }
            MapEntry::Occupied(mut occupied) => {
                occupied.insert(Entry::new(Data::List(vec![value]), None));
                Ok(1)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(Data::List(vec![value]), None));
                Ok(1)
            }
        }
    }

    /// Returns list elements between `start` and `stop` inclusive.
    ///
    /// Negative indices count from the end (`-1` is the last element), as in
    /// Redis `LRANGE`. A missing key yields an empty list.
    pub fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let now = Instant::now();

        let Some(entry) = self.entries.get(key) else {
            return Ok(Vec::new());
        };
        if entry.is_expired(now) {
            drop(entry);
            self.evict_expired(key);
            return Ok(Vec::new());
        }

        let items = match &entry.data {
            Data::List(items) => items,
            other => {
                return Err(StashError::WrongType {
                    key: key.to_string(),
                    expected: "list",
                    found: other.kind(),
                })
            }
        };

        Ok(match resolve_range(items.len(), start, stop) {
            Some((from, to)) => items[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPIRY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Sets a TTL on a live key. Returns false if the key is absent.
    pub fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.ensure_open()?;
        validate_ttl(ttl)?;
        let now = Instant::now();

        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(entry) => {
                drop(entry);
                self.evict_expired(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Removes the TTL from a live key. Returns true if a TTL was removed.
    pub fn persist(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let now = Instant::now();

        Ok(match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => entry.expires_at.take().is_some(),
            _ => false,
        })
    }

    /// Returns the time left before `key` expires.
    ///
    /// `None` if the key is absent, expired, or has no TTL.
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.ensure_open()?;
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.remaining(now)))
    }

    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Swept expired entries");
        }
        removed
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HOUSEKEEPING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Removes every entry.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        self.entries.clear();
        info!("Flushed store");
        Ok(())
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let now = Instant::now();
        let total = self.entries.len();
        let expired = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .count();
        StoreStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            capacity: self.config.max_entries,
        }
    }

    /// Releases the store. Subsequent operations fail with
    /// `BackendUnavailable`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.entries.clear();
            info!("Closed store");
        }
    }

    /// Returns true once [`KeyValueStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StashError::BackendUnavailable("store is closed".into()));
        }
        Ok(())
    }

    fn insert(&self, key: &str, data: Data, ttl: Option<Duration>) -> Result<()> {
        self.ensure_open()?;
        let _room = self.reserve(key);
        self.entries.insert(key.to_string(), Entry::new(data, ttl));
        Ok(())
    }

    /// Evicts `key` only if it is still expired, so a concurrent overwrite
    /// survives.
    fn evict_expired(&self, key: &str) {
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(Instant::now()))
            .is_some()
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Evicted expired entry");
        }
    }

    /// Makes room for `key` in a bounded store. The returned guard must be
    /// held until the write lands.
    fn reserve(&self, key: &str) -> Option<MutexGuard<'_, ()>> {
        let max = self.config.max_entries?.max(1);
        let guard = self.room.lock();
        self.make_room(key, max);
        Some(guard)
    }

    /// Frees a slot for a new `key` when the store is at capacity: expired
    /// entries go first, then the oldest.
    fn make_room(&self, key: &str, max: usize) {
        if self.entries.len() < max || self.entries.contains_key(key) {
            return;
        }

        self.cleanup_expired();

        while self.entries.len() >= max {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().inserted_at)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else { break };
            if self.entries.remove(&oldest).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %oldest, "Evicted oldest entry at capacity");
            }
        }
    }
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueBackend for KeyValueStore {
    fn set(&self, key: &str, value: Value) -> Result<()> {
        KeyValueStore::set(self, key, value)
    }

    fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        KeyValueStore::set_with_ttl(self, key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        KeyValueStore::get(self, key)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        KeyValueStore::delete(self, key)
    }

    fn increment(&self, key: &str) -> Result<i64> {
        KeyValueStore::increment(self, key)
    }

    fn append_to_list(&self, key: &str, value: Value) -> Result<usize> {
        KeyValueStore::append_to_list(self, key, value)
    }

    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Value>> {
        KeyValueStore::list_range(self, key, start, stop)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        KeyValueStore::expire(self, key, ttl)
    }
}

/// Store statistics.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStats {
    /// Entries physically held
    pub total_entries: usize,
    /// Held entries past their deadline
    pub expired_entries: usize,
    /// Held entries still live
    pub valid_entries: usize,
    /// Reads that found a live scalar
    pub hits: u64,
    /// Reads that found nothing live
    pub misses: u64,
    /// Entries removed by expiry or capacity pressure
    pub evictions: u64,
    /// Configured capacity
    pub capacity: Option<usize>,
}

fn validate_ttl(ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(StashError::InvalidTtl);
    }
    Ok(())
}

/// Clamps an inclusive `LRANGE`-style range to `len`.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}
