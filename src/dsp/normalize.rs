//! Peak normalization to the integer range of a bit depth.

use crate::engine::BitDepth;
use crate::error::{DegradationError, Result};

/// Scale `values` so the larger of `|max|` and `|min|` lands on
/// `2^(bits-1) - 1`
///
/// Rounding to integers happens when the result is wrapped in a buffer.
///
/// # Errors
/// * `DegenerateSignal` - If every value is zero (or the input is empty)
pub fn peak_normalize(values: &[f64], bit_depth: BitDepth) -> Result<Vec<f64>> {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let peak = max.abs().max(min.abs());

    if values.is_empty() || peak == 0.0 || !peak.is_finite() {
        return Err(DegradationError::degenerate(
            "cannot peak-normalize a silent signal",
        ));
    }

    let gain = bit_depth.max_amplitude() / peak;
    Ok(values.iter().map(|v| v * gain).collect())
}
