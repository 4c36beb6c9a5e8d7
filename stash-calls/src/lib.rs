//! # Stash Calls
//!
//! Call counting and call history, applied by explicit composition.
//!
//! A wrapper takes an operation and returns a new callable with the same
//! signature that records into a [`CallRegistry`] before and after delegating.
//! Nothing is intercepted implicitly.
//!
//! ## Composition order
//!
//! [`instrument`] applies both wrappers with history outermost and counting
//! innermost, so every history entry brackets exactly one counted call.
//!
//! ## Example
//!
//! ```rust
//! use stash_calls::{instrument, CallRegistry};
//!
//! let calls = CallRegistry::new();
//! let double = instrument(&calls, "double", |x: i32| Ok::<_, String>(x * 2));
//!
//! assert_eq!(double(4), Ok(8));
//! assert_eq!(calls.call_count("double"), 1);
//! println!("{}", calls.replay("double"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod oplog;
mod registry;
mod replay;
mod wrap;

pub use registry::CallRegistry;
pub use replay::Replay;
pub use wrap::{instrument, with_counting, with_history};
