//! Per-operation call log.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use stash_core::constants::PENDING_MARKER;
use stash_core::CallRecord;

/// Parallel input/output logs guarded together so a slot reserved for an
/// input always receives that invocation's output.
#[derive(Debug, Default)]
struct History {
    inputs: Vec<String>,
    outputs: Vec<String>,
    /// Bumped on reset so slots reserved before it are ignored
    epoch: u64,
}

/// Output slot reserved for one in-flight invocation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Slot {
    epoch: u64,
    index: usize,
}

/// Counter and history for one named operation.
#[derive(Debug)]
pub(crate) struct OperationLog {
    name: String,
    count: AtomicU64,
    /// Set by the first invocation; survives reset
    invoked: AtomicBool,
    history: Mutex<History>,
}

impl OperationLog {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: AtomicU64::new(0),
            invoked: AtomicBool::new(false),
            history: Mutex::new(History::default()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Counts one invocation and returns the new total.
    pub(crate) fn record_call(&self) -> u64 {
        self.invoked.store(true, Ordering::SeqCst);
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Appends `input` and reserves the matching output slot.
    pub(crate) fn begin(&self, input: String) -> Slot {
        self.invoked.store(true, Ordering::SeqCst);
        let mut history = self.history.lock();
        history.inputs.push(input);
        history.outputs.push(PENDING_MARKER.to_string());
        Slot {
            epoch: history.epoch,
            index: history.inputs.len() - 1,
        }
    }

    /// Fills the output slot reserved by [`OperationLog::begin`].
    pub(crate) fn finish(&self, slot: Slot, output: String) {
        let mut history = self.history.lock();
        if history.epoch != slot.epoch {
            return;
        }
        if let Some(out) = history.outputs.get_mut(slot.index) {
            *out = output;
        }
    }

    /// True once any wrapper has seen a call.
    pub(crate) fn was_invoked(&self) -> bool {
        self.invoked.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> CallRecord {
        let history = self.history.lock();
        CallRecord {
            operation_name: self.name.clone(),
            invocation_count: self.count(),
            input_log: history.inputs.clone(),
            output_log: history.outputs.clone(),
        }
    }

    pub(crate) fn reset(&self) {
        let mut history = self.history.lock();
        history.inputs.clear();
        history.outputs.clear();
        history.epoch += 1;
        self.count.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_pair_out_of_order() {
        let log = OperationLog::new("op");
        let first = log.begin("a".into());
        let second = log.begin("b".into());

        // Second invocation returns before the first
        log.finish(second, "B".into());
        assert_eq!(log.snapshot().output_log, vec![PENDING_MARKER, "B"]);

        log.finish(first, "A".into());
        let record = log.snapshot();
        assert_eq!(record.input_log, vec!["a", "b"]);
        assert_eq!(record.output_log, vec!["A", "B"]);
    }

    #[test]
    fn test_count_and_reset() {
        let log = OperationLog::new("op");
        assert_eq!(log.record_call(), 1);
        assert_eq!(log.record_call(), 2);
        log.begin("x".into());

        log.reset();
        let record = log.snapshot();
        assert_eq!(record.invocation_count, 0);
        assert!(record.input_log.is_empty());
        assert!(record.output_log.is_empty());
    }

    #[test]
    fn test_slot_from_before_reset_is_dropped() {
        let log = OperationLog::new("op");
        let stale = log.begin("old".into());
        log.reset();
        log.begin("new".into());

        log.finish(stale, "OLD".into());
        assert_eq!(log.snapshot().output_log, vec![PENDING_MARKER]);
    }
}
