//! # Stash Core
//!
//! Core types, errors, and traits for the stash key-value cache.
//!
//! This crate provides the foundational building blocks used by all other stash crates:
//!
//! - **Types**: Stored values and call-record snapshots
//! - **Errors**: A single error hierarchy shared by every layer
//! - **Constants**: Defaults for TTLs, timeouts, and key naming
//! - **Traits**: The backend and fetcher seams
//!
//! ## Example
//!
//! ```rust
//! use stash_core::Value;
//!
//! let value = Value::from(42);
//! assert_eq!(value.to_bytes().as_ref(), b"42");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, StashError};
pub use traits::*;
pub use types::*;
