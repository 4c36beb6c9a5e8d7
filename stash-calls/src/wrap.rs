//! Counting and history wrappers.
//!
//! Operations take their arguments as a single value (use a tuple for
//! several) and return a `Result`. Arguments and results are rendered with
//! `Debug`; errors with `Display`.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use tracing::trace;

use stash_core::constants::failure_marker;

use crate::oplog::{OperationLog, Slot};
use crate::registry::CallRegistry;

/// Wraps `op` so each call increments the counter for `name` before
/// delegating.
///
/// Failed calls are counted: the increment happens before the outcome is
/// known.
pub fn with_counting<A, R, E, F>(
    registry: &CallRegistry,
    name: &str,
    op: F,
) -> impl Fn(A) -> Result<R, E>
where
    F: Fn(A) -> Result<R, E>,
{
    let log = registry.log(name);
    move |args| {
        let count = log.record_call();
        trace!(operation = log.name(), count, "Counted call");
        op(args)
    }
}

/// Wraps `op` so each call appends its input before delegating and its
/// output afterwards.
///
/// A failed call records `!error: {err}` as its output and the error is
/// returned unchanged, so the input and output logs always have equal length.
pub fn with_history<A, R, E, F>(
    registry: &CallRegistry,
    name: &str,
    op: F,
) -> impl Fn(A) -> Result<R, E>
where
    A: Debug,
    R: Debug,
    E: Display,
    F: Fn(A) -> Result<R, E>,
{
    let log = registry.log(name);
    move |args| {
        let mut pending = PendingOutput::new(log.clone(), format!("{:?}", args));
        let result = op(args);
        pending.complete(match &result {
            Ok(value) => format!("{:?}", value),
            Err(err) => failure_marker(err),
        });
        result
    }
}

/// Applies both wrappers in canonical order: history outermost, counting
/// innermost.
pub fn instrument<A, R, E, F>(
    registry: &CallRegistry,
    name: &str,
    op: F,
) -> impl Fn(A) -> Result<R, E>
where
    A: Debug,
    R: Debug,
    E: Display,
    F: Fn(A) -> Result<R, E>,
{
    with_history(registry, name, with_counting(registry, name, op))
}

/// Output slot that records a failure marker if the operation unwinds before
/// completing.
struct PendingOutput {
    log: Arc<OperationLog>,
    slot: Slot,
    done: bool,
}

impl PendingOutput {
    fn new(log: Arc<OperationLog>, input: String) -> Self {
        let slot = log.begin(input);
        Self {
            log,
            slot,
            done: false,
        }
    }

    fn complete(&mut self, output: String) {
        self.log.finish(self.slot, output);
        self.done = true;
    }
}

impl Drop for PendingOutput {
    fn drop(&mut self) {
        if !self.done {
            self.log.finish(self.slot, failure_marker("panicked"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use proptest::prelude::*;

    fn parse(s: &str) -> Result<i64, String> {
        s.parse::<i64>().map_err(|e| e.to_string())
    }

    #[test]
    fn test_counting_counts_every_call() {
        let calls = CallRegistry::new();
        let counted = with_counting(&calls, "parse", parse);

        assert_eq!(counted("1"), Ok(1));
        assert!(counted("x").is_err());
        assert_eq!(calls.call_count("parse"), 2);
    }

    #[test]
    fn test_counting_is_visible_before_return() {
        let calls = CallRegistry::new();
        let seen = {
            let calls_ref = &calls;
            let counted = with_counting(&calls, "peek", move |_: ()| {
                Ok::<_, String>(calls_ref.call_count("peek"))
            });
            counted(()).unwrap()
        };
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_history_records_pairs_in_order() {
        let calls = CallRegistry::new();
        let logged = with_history(&calls, "parse", parse);

        logged("7").unwrap();
        logged("8").unwrap();

        let record = calls.record("parse");
        assert_eq!(record.input_log, vec!["\"7\"", "\"8\""]);
        assert_eq!(record.output_log, vec!["7", "8"]);
    }

    #[test]
    fn test_history_records_failure_marker() {
        let calls = CallRegistry::new();
        let logged = with_history(&calls, "parse", parse);

        let err = logged("abc").unwrap_err();
        assert!(err.contains("invalid digit"));

        let record = calls.record("parse");
        assert_eq!(record.input_log.len(), record.output_log.len());
        assert!(record.output_log[0].starts_with("!error: "));
    }

    #[test]
    fn test_history_survives_panic() {
        let calls = CallRegistry::new();
        let logged = with_history(&calls, "boom", |_: ()| -> Result<(), String> {
            panic!("kaboom")
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| logged(())));
        assert!(outcome.is_err());
        assert_eq!(calls.record("boom").output_log, vec!["!error: panicked"]);
    }

    #[test]
    fn test_instrument_keeps_count_and_history_aligned() {
        let calls = CallRegistry::new();
        let op = instrument(&calls, "parse", parse);

        op("1").unwrap();
        op("nope").unwrap_err();
        op("3").unwrap();

        let record = calls.record("parse");
        assert_eq!(record.invocation_count, 3);
        assert_eq!(record.history_len(), 3);

        let replay = calls.replay("parse");
        assert_eq!(replay.invocations(), 3);
        let rendered = replay.to_string();
        assert!(rendered.starts_with("parse was called 3 times:"));
        assert!(rendered.contains("parse(\"3\") -> 3"));
    }

    #[test]
    fn test_wrapped_op_runs_once_per_call() {
        let calls = CallRegistry::new();
        let runs = AtomicUsize::new(0);
        let op = instrument(&calls, "op", |x: u8| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(x)
        });
        op(1).unwrap();
        op(2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_calls_lose_no_counts() {
        let calls = CallRegistry::new();
        let op = instrument(&calls, "square", |x: u64| Ok::<_, String>(x * x));

        thread::scope(|scope| {
            for t in 0..8u64 {
                let op = &op;
                scope.spawn(move || {
                    for i in 0..125u64 {
                        op(t * 1000 + i).unwrap();
                    }
                });
            }
        });

        let record = calls.record("square");
        assert_eq!(record.invocation_count, 1000);
        assert_eq!(record.history_len(), 1000);
        for (input, output) in record.pairs() {
            let x: u64 = input.parse().unwrap();
            assert_eq!(output, (x * x).to_string());
        }
    }

    proptest! {
        #[test]
        fn prop_replay_pairs_match_calls(inputs in proptest::collection::vec(any::<i32>(), 0..40)) {
            let calls = CallRegistry::new();
            let op = instrument(&calls, "neg", |x: i32| Ok::<_, String>(x.wrapping_neg()));

            for x in &inputs {
                op(*x).unwrap();
            }

            let replay = calls.replay("neg");
            prop_assert_eq!(replay.invocations(), inputs.len() as u64);
            for ((input, output), x) in replay.calls().zip(&inputs) {
                prop_assert_eq!(input, x.to_string());
                prop_assert_eq!(output, x.wrapping_neg().to_string());
            }
        }
    }
}
