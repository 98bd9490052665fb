//! Time warping: wow/flutter and aliasing
//!
//! Wow/flutter models a transport whose speed wobbles sinusoidally. The
//! forward mapping from original time to warped time is
//!
//! ```text
//! t_new(t) = t + a_m * sin(2π f_m t) / (2π f_m)
//! ```
//!
//! Resampling needs the inverse, which has no closed form, so it is solved by
//! fixed-point iteration. The map is a contraction for `a_m < 1`.
//!
//! Aliasing decimates with nearest-neighbor lookups and no anti-alias filter,
//! then brings the result back to the original rate.

use tracing::debug;

use crate::engine::SampleBuffer;
use crate::error::{DegradationError, Result};
use crate::filters::EffectsBackend;

/// Fixed-point iterations used to invert the wow/flutter time map
pub const WOW_FLUTTER_ITERATIONS: usize = 40;

/// Warped time for original time `t`
pub fn forward_time_warp(t: f64, depth: f64, mod_freq_hz: f64) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * mod_freq_hz;
    t + depth * (omega * t).sin() / omega
}

/// Original time that the warp maps onto `t_new`
pub fn inverse_time_warp(t_new: f64, depth: f64, mod_freq_hz: f64) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * mod_freq_hz;
    let mut t_old = t_new;
    for _ in 0..WOW_FLUTTER_ITERATIONS {
        t_old = t_new - depth * (omega * t_old).sin() / omega;
    }
    t_old
}

/// Apply wow/flutter
///
/// # Arguments
/// * `audio` - Input buffer
/// * `intensity_pct` - Modulation depth in percent of playback speed
/// * `mod_freq_hz` - Modulation frequency
/// * `oversample_factor` - The warp runs at `sample_rate * oversample_factor`
/// * `backend` - Used to upsample before warping
///
/// Only whole modulation periods are warped; samples past the last full
/// period pass through. The result is tagged with the oversampled rate.
pub fn wow_flutter(
    audio: &SampleBuffer,
    intensity_pct: f64,
    mod_freq_hz: f64,
    oversample_factor: f64,
    backend: &dyn EffectsBackend,
) -> Result<SampleBuffer> {
    if !(0.0..100.0).contains(&intensity_pct) {
        return Err(DegradationError::invalid_param(
            "wow_flutter",
            "intensity",
            intensity_pct,
            "0 <= intensity < 100",
        ));
    }
    if mod_freq_hz < 0.0 || !mod_freq_hz.is_finite() {
        return Err(DegradationError::invalid_param(
            "wow_flutter",
            "frequency",
            mod_freq_hz,
            "a non-negative frequency",
        ));
    }
    if oversample_factor <= 0.0 || !oversample_factor.is_finite() {
        return Err(DegradationError::invalid_param(
            "wow_flutter",
            "upsampling_factor",
            oversample_factor,
            "a positive factor",
        ));
    }

    let os_rate = (audio.sample_rate() as f64 * oversample_factor).round().max(1.0) as u32;
    let oversampled = if os_rate != audio.sample_rate() {
        backend.resample(audio, os_rate)?
    } else {
        audio.clone()
    };

    let depth = intensity_pct / 100.0;
    let num_full_periods = if mod_freq_hz > 0.0 {
        (audio.duration_secs() * mod_freq_hz).floor()
    } else {
        0.0
    };

    if num_full_periods == 0.0 || depth == 0.0 {
        debug!("wow_flutter: no full modulation period, signal left unwarped");
        return Ok(oversampled);
    }

    let warp_end = num_full_periods / mod_freq_hz;
    let source = oversampled.samples();
    let last = source.len().saturating_sub(1);

    let warped: Vec<f64> = (0..source.len())
        .map(|i| {
            let t_new = i as f64 / os_rate as f64;
            if t_new >= warp_end {
                return source[i];
            }
            let t_old = inverse_time_warp(t_new, depth, mod_freq_hz);
            let idx = (t_old * os_rate as f64).round().max(0.0) as usize;
            source[idx.min(last)]
        })
        .collect();

    debug!(
        os_rate,
        num_full_periods, "wow_flutter warped {} samples", warped.len()
    );

    Ok(oversampled.with_samples(warped))
}

/// Decimate to `dest_frequency_hz` by nearest-neighbor lookup, then resample
/// back to the original rate
///
/// # Errors
/// * `InvalidParameter` - If `dest_frequency_hz` is not positive
/// * `DegenerateSignal` - If the decimated signal would have no samples
pub fn alias(
    audio: &SampleBuffer,
    dest_frequency_hz: f64,
    backend: &dyn EffectsBackend,
) -> Result<SampleBuffer> {
    let decimated = nearest_neighbor_decimate(audio, dest_frequency_hz)?;
    backend.resample(&decimated, audio.sample_rate())
}

/// Nearest-neighbor interpolation onto a `dest_frequency_hz` time axis
///
/// The result is tagged with `dest_frequency_hz` rounded to whole Hz.
pub fn nearest_neighbor_decimate(
    audio: &SampleBuffer,
    dest_frequency_hz: f64,
) -> Result<SampleBuffer> {
    if dest_frequency_hz <= 0.0 || !dest_frequency_hz.is_finite() {
        return Err(DegradationError::invalid_param(
            "aliasing",
            "dest_frequency",
            dest_frequency_hz,
            "a positive frequency",
        ));
    }

    let rate = audio.sample_rate() as f64;
    let n_new = (audio.len() as f64 / rate * dest_frequency_hz).round() as usize;
    if n_new == 0 {
        return Err(DegradationError::degenerate(format!(
            "aliasing to {} Hz leaves no samples",
            dest_frequency_hz
        )));
    }

    let source = audio.samples();
    let last = source.len() - 1;
    let decimated: Vec<f64> = (0..n_new)
        .map(|j| {
            let t_new = j as f64 / dest_frequency_hz;
            let idx = (t_new * rate).round() as usize;
            source[idx.min(last)]
        })
        .collect();

    let dest_rate = dest_frequency_hz.round().max(1.0) as u32;
    audio.with_samples_and_rate(decimated, dest_rate)
}
