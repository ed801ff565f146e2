//! Worst-case elementwise deviation between two complex signals.

use num_complex::Complex64;

/// Maximum absolute deviation across real and imaginary parts.
///
/// Equal length is a caller-guaranteed precondition: the orchestrator only
/// compares outputs produced from the same input. No tolerance is applied;
/// the caller interprets the figure.
pub fn max_abs_error(a: &[Complex64], b: &[Complex64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).fold(0.0f64, |m, (x, y)| {
        let er = (x.re - y.re).abs();
        let ei = (x.im - y.im).abs();
        m.max(er).max(ei)
    })
}
