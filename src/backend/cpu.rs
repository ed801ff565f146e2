//! CPU transform backend on rustfft.

use num_complex::Complex64;
use rustfft::FftPlanner;

use super::{Direction, FailurePolicy, TransformBackend, TransformError};

/// Processor-bound DFT via rustfft.
///
/// A fresh plan is built for every invocation so each call owns and fully
/// releases its own scratch state. rustfft picks an algorithm for the given
/// length, so any N is accepted, power of two or not.
#[derive(Debug, Default)]
pub struct CpuFft;

impl CpuFft {
    pub fn new() -> Self {
        Self
    }
}

impl TransformBackend for CpuFft {
    fn name(&self) -> &'static str {
        "CPU"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }

    fn transform(
        &self,
        input: &[Complex64],
        direction: Direction,
    ) -> Result<Vec<Complex64>, TransformError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = match direction {
            Direction::Forward => planner.plan_fft_forward(input.len()),
            Direction::Inverse => planner.plan_fft_inverse(input.len()),
        };
        let mut buf = input.to_vec();
        fft.process(&mut buf);
        Ok(buf)
    }
}
