//! # Stash Store
//!
//! In-memory key-value store with lazy expiry, atomic counters, and lists.
//!
//! Expired entries are treated as absent on every read path. A background
//! sweeper can additionally reclaim their memory.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use stash_store::KeyValueStore;
//!
//! let store = KeyValueStore::new();
//!
//! let key = store.store("hello").unwrap();
//! assert_eq!(store.get_as_string(&key).unwrap().as_deref(), Some("hello"));
//!
//! let short = store.store_with_ttl(42, Duration::from_secs(10)).unwrap();
//! assert_eq!(store.get_as_integer(&short).unwrap(), Some(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod decode;
mod entry;
mod store;
mod sweeper;

pub use config::StoreConfig;
pub use decode::{decode_float, decode_integer, decode_utf8, DecodeFailure};
pub use store::{KeyValueStore, StoreStats};
pub use sweeper::{spawn_sweeper, Sweeper};

// Re-export the trait from core
pub use stash_core::traits::KeyValueBackend as Backend;
