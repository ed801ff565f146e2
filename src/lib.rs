//! fftbench — benchmark and cross-validate CPU and accelerator DFTs.
//!
//! Two transform backends share one contract: the CPU variant delegates to
//! rustfft, the accelerator variant runs a radix-2 WGSL pipeline through
//! wgpu. The harness times each backend over repeated invocations and keeps
//! the best-of-R figure; the comparator reports the worst-case elementwise
//! deviation between the two outputs.

pub mod backend;
pub mod compare;
pub mod harness;
pub mod shaders;
pub mod signal;

pub use num_complex::Complex64;
