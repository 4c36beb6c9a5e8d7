//! Replay of an operation's recorded invocations.

use std::fmt;

use serde::Serialize;

use stash_core::CallRecord;

/// An operation's invocation history, in call order.
///
/// `Display` renders:
///
/// ```text
/// KeyValueStore::store was called 2 times:
/// KeyValueStore::store(Str("foo")) -> "6f1c…"
/// KeyValueStore::store(Int(42)) -> "0b7e…"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Replay {
    record: CallRecord,
}

impl Replay {
    pub(crate) fn new(record: CallRecord) -> Self {
        Self { record }
    }

    /// Name of the replayed operation.
    pub fn operation_name(&self) -> &str {
        &self.record.operation_name
    }

    /// Number of invocations.
    ///
    /// The larger of the counted calls and the recorded history, so an
    /// operation wrapped by only one of the two wrappers still reports its
    /// calls.
    pub fn invocations(&self) -> u64 {
        self.record
            .invocation_count
            .max(self.record.history_len() as u64)
    }

    /// `(input, output)` pairs in invocation order.
    pub fn calls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.record.pairs()
    }

    /// Returns true if the operation was never called.
    pub fn is_empty(&self) -> bool {
        self.invocations() == 0
    }

    /// The underlying record snapshot.
    pub fn record(&self) -> &CallRecord {
        &self.record
    }
}

impl fmt::Display for Replay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.operation_name();
        write!(f, "{} was called {} times:", name, self.invocations())?;
        for (input, output) in self.calls() {
            write!(f, "\n{}({}) -> {}", name, input, output)?;
        }
        Ok(())
    }
}
