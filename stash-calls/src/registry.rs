//! Registry of call records keyed by operation name.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, instrument};

use stash_core::error::{Result, StashError};
use stash_core::traits::KeyValueBackend;
use stash_core::{CallRecord, Value};

use crate::oplog::OperationLog;
use crate::replay::Replay;

/// Call records for every instrumented operation.
///
/// A record becomes visible on the first invocation under a name and lives as
/// long as the registry. Wrappers hold their record directly, so recording
/// never goes through the registry's map; wrapping alone leaves the registry
/// looking unchanged.
#[derive(Debug, Default)]
pub struct CallRegistry {
    records: DashMap<String, Arc<OperationLog>>,
}

impl CallRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the log for `name`, creating it on first use.
    pub(crate) fn log(&self, name: &str) -> Arc<OperationLog> {
        self.records
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OperationLog::new(name)))
            .clone()
    }

    fn invoked(&self, name: &str) -> Option<Arc<OperationLog>> {
        self.records
            .get(name)
            .filter(|log| log.was_invoked())
            .map(|log| log.clone())
    }

    /// Returns the number of counted invocations of `name`.
    pub fn call_count(&self, name: &str) -> u64 {
        self.invoked(name).map_or(0, |log| log.count())
    }

    /// Returns a snapshot of the record for `name`.
    ///
    /// An operation that was never called yields an empty record.
    pub fn record(&self, name: &str) -> CallRecord {
        self.invoked(name)
            .map(|log| log.snapshot())
            .unwrap_or_else(|| CallRecord::new(name))
    }

    /// Returns the names of all operations invoked at least once, sorted.
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .iter()
            .filter(|e| e.value().was_invoked())
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Reconstructs the invocation history of `name`.
    pub fn replay(&self, name: &str) -> Replay {
        Replay::new(self.record(name))
    }

    /// Zeroes the count and clears the history of `name`.
    pub fn reset(&self, name: &str) {
        if let Some(log) = self.records.get(name) {
            log.reset();
        }
    }

    /// Writes every record into `backend` using the key layout
    /// `{name}` (count), `{name}:inputs` and `{name}:outputs` (lists).
    ///
    /// Existing lists under those keys are replaced. Returns the number of
    /// operations written.
    #[instrument(skip(self, backend))]
    pub fn export(&self, backend: &dyn KeyValueBackend) -> Result<usize> {
        let mut written = 0;
        for name in self.operations() {
            let record = self.record(&name);
            let inputs_key = format!("{}:inputs", name);
            let outputs_key = format!("{}:outputs", name);

            let count = i64::try_from(record.invocation_count).map_err(|_| {
                StashError::OperationFailed(format!("call count of {} exceeds i64", name))
            })?;
            backend.set(&name, Value::Int(count))?;
            backend.delete(&inputs_key)?;
            backend.delete(&outputs_key)?;
            for (input, output) in record.pairs() {
                backend.append_to_list(&inputs_key, Value::from(input))?;
                backend.append_to_list(&outputs_key, Value::from(output))?;
            }
            written += 1;
        }

        debug!(written, "Exported call records");
        Ok(written)
    }
}
