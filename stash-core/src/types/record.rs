//! Call-record snapshots produced by the instrumentation layer.

use serde::{Deserialize, Serialize};

/// Point-in-time copy of one operation's call record.
///
/// `input_log` and `output_log` are parallel: the i-th output belongs to the
/// i-th input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Qualified name the operation was registered under
    pub operation_name: String,
    /// Number of invocations started through a counting wrapper
    pub invocation_count: u64,
    /// Rendered arguments, in invocation order
    pub input_log: Vec<String>,
    /// Rendered results or failure markers, in invocation order
    pub output_log: Vec<String>,
}

impl CallRecord {
    /// Creates an empty record for `operation_name`.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Iterates over `(input, output)` pairs in invocation order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.input_log
            .iter()
            .zip(self.output_log.iter())
            .map(|(i, o)| (i.as_str(), o.as_str()))
    }

    /// Number of recorded history entries.
    pub fn history_len(&self) -> usize {
        self.input_log.len()
    }
}
