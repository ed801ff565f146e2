//! Benchmark driver: repeat a backend's transform and keep the best time.

use std::time::Instant;

use num_complex::Complex64;
use serde::Serialize;
use thiserror::Error;

use crate::backend::{Direction, FailurePolicy, TransformBackend, TransformError};

/// A failed invocation of a backend whose policy says the run cannot continue.
#[derive(Debug, Error)]
#[error("{backend} backend failed: {source}")]
pub struct HarnessError {
    pub backend: &'static str,
    #[source]
    pub source: TransformError,
}

/// Timing summary for one backend run. The transformed output rides along
/// for the comparator but stays out of the serialized summary.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub backend: &'static str,
    pub n: usize,
    pub direction: Direction,
    pub repeats: u32,
    pub best_ms: f64,
    #[serde(skip)]
    pub output: Vec<Complex64>,
}

/// Outcome of driving one backend: a timed report, or the first failure's
/// diagnostic for recoverable backends.
#[derive(Debug)]
pub enum BenchOutcome {
    Completed(BenchReport),
    Failed {
        backend: &'static str,
        diagnostic: String,
    },
}

/// Invoke `backend` `repeats` times over the same input, keeping the
/// best-of-R wall-clock figure and the last invocation's output.
///
/// The minimum starts at +infinity and is tightened after each timed call,
/// so the reported figure can only improve as repeats grow. Iteration stops
/// at the first failed invocation: a `Recoverable` backend yields
/// `BenchOutcome::Failed` with no partial latency, a `Fatal` one escalates
/// as `HarnessError`. Callers guarantee `repeats >= 1`.
pub fn run(
    backend: &dyn TransformBackend,
    input: &[Complex64],
    direction: Direction,
    repeats: u32,
) -> Result<BenchOutcome, HarnessError> {
    debug_assert!(repeats >= 1);
    let mut best_ms = f64::INFINITY;
    let mut output = Vec::new();
    for _ in 0..repeats {
        let start = Instant::now();
        match backend.transform(input, direction) {
            Ok(out) => {
                let ms = start.elapsed().as_secs_f64() * 1e3;
                best_ms = best_ms.min(ms);
                output = out;
            }
            Err(source) => {
                return match backend.failure_policy() {
                    FailurePolicy::Fatal => Err(HarnessError {
                        backend: backend.name(),
                        source,
                    }),
                    FailurePolicy::Recoverable => {
                        tracing::warn!(backend = backend.name(), error = %source, "backend failed, stopping repeats");
                        Ok(BenchOutcome::Failed {
                            backend: backend.name(),
                            diagnostic: source.to_string(),
                        })
                    }
                };
            }
        }
    }
    Ok(BenchOutcome::Completed(BenchReport {
        backend: backend.name(),
        n: input.len(),
        direction,
        repeats,
        best_ms,
        output,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    /// Test double: succeeds (after an optional per-call sleep) until the
    /// configured invocation index, then fails.
    struct Scripted {
        policy: FailurePolicy,
        fail_on_call: Option<u32>,
        sleeps_ms: Vec<u64>,
        calls: Cell<u32>,
    }

    impl Scripted {
        fn ok(policy: FailurePolicy) -> Self {
            Self {
                policy,
                fail_on_call: None,
                sleeps_ms: Vec::new(),
                calls: Cell::new(0),
            }
        }

        fn failing_on(policy: FailurePolicy, call: u32) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::ok(policy)
            }
        }
    }

    impl TransformBackend for Scripted {
        fn name(&self) -> &'static str {
            "SCRIPTED"
        }

        fn failure_policy(&self) -> FailurePolicy {
            self.policy
        }

        fn transform(
            &self,
            input: &[Complex64],
            _direction: Direction,
        ) -> Result<Vec<Complex64>, TransformError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.fail_on_call == Some(call) {
                return Err(TransformError::Device("scripted fault".into()));
            }
            if let Some(&ms) = self.sleeps_ms.get(call as usize) {
                std::thread::sleep(Duration::from_millis(ms));
            }
            // Tag the output with the call index so the last one is recognizable.
            let mut out = input.to_vec();
            out.push(Complex64::new(f64::from(call), 0.0));
            Ok(out)
        }
    }

    #[test]
    fn runs_exactly_r_repeats_and_keeps_the_last_output() {
        let backend = Scripted::ok(FailurePolicy::Recoverable);
        let input = [Complex64::new(1.0, 0.0)];
        let outcome = run(&backend, &input, Direction::Forward, 4).unwrap();

        assert_eq!(backend.calls.get(), 4);
        match outcome {
            BenchOutcome::Completed(report) => {
                assert_eq!(report.repeats, 4);
                assert_eq!(report.n, 1);
                assert!(report.best_ms.is_finite());
                assert!(report.best_ms >= 0.0);
                assert_eq!(*report.output.last().unwrap(), Complex64::new(3.0, 0.0));
            }
            BenchOutcome::Failed { diagnostic, .. } => panic!("unexpected failure: {diagnostic}"),
        }
    }

    #[test]
    fn best_of_r_tracks_the_fastest_repeat() {
        let mut backend = Scripted::ok(FailurePolicy::Recoverable);
        backend.sleeps_ms = vec![40, 5, 40];
        let outcome = run(&backend, &[], Direction::Forward, 3).unwrap();
        match outcome {
            BenchOutcome::Completed(report) => {
                // The 5 ms repeat bounds the minimum; generous margin for noise.
                assert!(report.best_ms < 30.0, "best_ms = {}", report.best_ms);
            }
            BenchOutcome::Failed { diagnostic, .. } => panic!("unexpected failure: {diagnostic}"),
        }
    }

    #[test]
    fn recoverable_failure_stops_iteration_immediately() {
        let backend = Scripted::failing_on(FailurePolicy::Recoverable, 0);
        let outcome = run(&backend, &[], Direction::Forward, 5).unwrap();

        assert_eq!(backend.calls.get(), 1);
        match outcome {
            BenchOutcome::Failed { backend, diagnostic } => {
                assert_eq!(backend, "SCRIPTED");
                assert!(diagnostic.contains("scripted fault"), "{diagnostic}");
            }
            BenchOutcome::Completed(_) => panic!("expected failure outcome"),
        }
    }

    #[test]
    fn mid_run_failure_discards_partial_latency() {
        let backend = Scripted::failing_on(FailurePolicy::Recoverable, 2);
        let outcome = run(&backend, &[], Direction::Inverse, 5).unwrap();

        assert_eq!(backend.calls.get(), 3);
        assert!(matches!(outcome, BenchOutcome::Failed { .. }));
    }

    #[test]
    fn fatal_policy_escalates_the_failure() {
        let backend = Scripted::failing_on(FailurePolicy::Fatal, 0);
        let err = run(&backend, &[], Direction::Forward, 2).unwrap_err();
        assert_eq!(err.backend, "SCRIPTED");
        assert!(matches!(err.source, TransformError::Device(_)));
    }

    #[test]
    fn report_serializes_without_the_output_payload() {
        let backend = Scripted::ok(FailurePolicy::Recoverable);
        let outcome = run(&backend, &[], Direction::Forward, 1).unwrap();
        let BenchOutcome::Completed(report) = outcome else {
            panic!("expected completion");
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["backend"], "SCRIPTED");
        assert_eq!(json["direction"], "forward");
        assert!(json.get("output").is_none());
    }
}
