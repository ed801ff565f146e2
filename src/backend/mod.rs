//! Transform backend contract shared by the CPU and accelerator variants.

mod cpu;
mod gpu;

pub use cpu::CpuFft;
pub use gpu::WgpuFft;

use num_complex::Complex64;
use serde::Serialize;
use thiserror::Error;

/// Transform direction. Neither direction applies 1/N scaling, so a
/// forward/inverse round trip scales the signal by N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "FFT",
            Direction::Inverse => "IFFT",
        }
    }
}

/// How the harness treats a failed invocation of this backend.
///
/// Fixed at backend construction rather than hardcoded per call site, so the
/// driver and comparator stay backend-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Failure aborts the whole run.
    Fatal,
    /// Failure is captured as a diagnostic and the run continues.
    Recoverable,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no compatible accelerator adapter found")]
    AdapterUnavailable,

    #[error("accelerator device request failed: {0}")]
    Device(String),

    #[error("signal length {0} is not a power of two; the radix-2 device pipeline cannot transform it")]
    UnsupportedLength(usize),

    #[error("device readback failed: {0}")]
    Transfer(String),

    #[error("transform pipeline failure: {0}")]
    Pipeline(String),
}

/// One concrete way of computing a length-N complex DFT.
///
/// Both variants read the signal through a shared reference, never mutate
/// it, and return an output of identical length. Forward and inverse are
/// both unnormalized.
pub trait TransformBackend {
    fn name(&self) -> &'static str;

    /// Consulted by the harness when an invocation fails.
    fn failure_policy(&self) -> FailurePolicy;

    fn transform(
        &self,
        input: &[Complex64],
        direction: Direction,
    ) -> Result<Vec<Complex64>, TransformError>;
}
