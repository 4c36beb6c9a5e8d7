//! Domain types for stash.
//!
//! - [`Value`]: A scalar stored under a key
//! - [`CallRecord`]: Snapshot of one operation's count and input/output history

mod value;
mod record;

pub use value::*;
pub use record::*;
