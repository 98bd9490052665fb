//! Amplitude clipping
//!
//! Two ways to pick the clipping level:
//! - **Auto** (no count given): a loudness scalar is derived from the mean of
//!   `x^2.2` and the signal is scaled so that scalar lands on -5 dBFS.
//! - **Count**: the signal is scaled so the `n`-th largest magnitude reaches
//!   full scale, which clips exactly the `n` loudest samples.
//!
//! Either way the result is hard-clipped to [-1, 1], attenuated by 0.99 and
//! peak-normalized back to the buffer's bit depth.

use rustfft::num_complex::Complex;
use tracing::debug;

use super::normalize::peak_normalize;
use crate::engine::{db_to_linear, SampleBuffer};
use crate::error::{DegradationError, Result};

/// Level the auto-mode loudness scalar is mapped to
pub const AUTO_TARGET_DB: f64 = -5.0;

/// Quantile taken of the auto-mode loudness scalar
pub const AUTO_QUANTILE: f64 = 0.95;

/// Exponent applied to samples in auto mode
pub const AUTO_EXPONENT: f64 = 2.2;

/// Attenuation applied after hard clipping
pub const CLIP_ATTENUATION: f64 = 0.99;

/// How many samples to clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipAmount {
    /// Derive the level from the signal's loudness
    Auto,
    /// Clip this many of the loudest samples
    Samples(usize),
    /// Clip `round(fraction * n)` of the samples, clamped to `1..=n`
    Percent(f64),
}

impl ClipAmount {
    /// Resolve the `n_samples` / `percent_samples` pair
    ///
    /// # Errors
    /// * `ConflictingParameters` - If both are nonzero
    /// * `InvalidParameter` - If `percent_samples` is negative or not finite
    pub fn from_params(n_samples: usize, percent_samples: f64) -> Result<Self> {
        if n_samples > 0 && percent_samples != 0.0 {
            return Err(DegradationError::ConflictingParameters {
                step: "clipping".to_string(),
                conflict: "n_samples and percent_samples cannot both be set".to_string(),
            });
        }
        if percent_samples < 0.0 || !percent_samples.is_finite() {
            return Err(DegradationError::invalid_param(
                "clipping",
                "percent_samples",
                percent_samples,
                "a non-negative fraction of the samples",
            ));
        }

        Ok(if n_samples > 0 {
            ClipAmount::Samples(n_samples)
        } else if percent_samples > 0.0 {
            ClipAmount::Percent(percent_samples)
        } else {
            ClipAmount::Auto
        })
    }
}

/// Clip `audio`
///
/// # Arguments
/// * `n_samples` - Number of loudest samples to clip, 0 for none
/// * `percent_samples` - Fraction of samples to clip (`0.5` is half), 0 for none
///
/// With both zero the level is chosen automatically.
///
/// # Errors
/// * `ConflictingParameters` - If both counts are nonzero
/// * `DegenerateSignal` - If the buffer is empty or silent
pub fn clip(audio: &SampleBuffer, n_samples: usize, percent_samples: f64) -> Result<SampleBuffer> {
    let amount = ClipAmount::from_params(n_samples, percent_samples)?;

    if audio.is_empty() || audio.samples().iter().all(|&s| s == 0.0) {
        return Err(DegradationError::degenerate("cannot clip a silent signal"));
    }

    let x = audio.to_normalized();
    let gain = match amount {
        ClipAmount::Auto => auto_gain(&x),
        ClipAmount::Samples(count) => 1.0 / nth_largest_magnitude(&x, count),
        ClipAmount::Percent(fraction) => {
            let count = (fraction * x.len() as f64).round() as usize;
            1.0 / nth_largest_magnitude(&x, count)
        }
    };

    let clipped: Vec<f64> = x
        .iter()
        .map(|s| (s * gain).clamp(-1.0, 1.0) * CLIP_ATTENUATION)
        .collect();

    debug!(
        ?amount,
        gain,
        clipped = clipped
            .iter()
            .filter(|s| s.abs() >= CLIP_ATTENUATION)
            .count(),
        "clipping"
    );

    let normalized = peak_normalize(&clipped, audio.bit_depth())?;
    Ok(audio.with_samples(normalized))
}

/// Gain that maps the loudness scalar onto [`AUTO_TARGET_DB`]
fn auto_gain(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let sum: Complex<f64> = x
        .iter()
        .map(|&v| Complex::new(v, 0.0).powf(AUTO_EXPONENT))
        .sum();
    let loudness = (sum / n).re;

    // Quantile of a single value is the value itself
    let q = quantile(&[loudness], AUTO_QUANTILE).max(f64::EPSILON);
    db_to_linear(AUTO_TARGET_DB) / q
}

/// Magnitude of the `count`-th largest sample, `count` clamped to `1..=len`
fn nth_largest_magnitude(x: &[f64], count: usize) -> f64 {
    let mut magnitudes: Vec<f64> = x.iter().map(|v| v.abs()).collect();
    magnitudes.sort_by(|a, b| b.total_cmp(a));

    let count = count.clamp(1, magnitudes.len());
    magnitudes[count - 1].max(f64::EPSILON)
}

/// Linearly interpolated quantile, `q` in [0, 1]
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
