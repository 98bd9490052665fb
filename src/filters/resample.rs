//! Sample-rate conversion and tempo change.

use std::f64::consts::PI;

use crate::engine::SampleBuffer;
use crate::error::{DegradationError, Result};

/// Frame length for overlap-add time stretching
pub const STRETCH_FRAME_LEN: usize = 1024;

/// Synthesis hop as a fraction of the frame length
const STRETCH_OVERLAP: usize = 4;

/// Resample by linear interpolation
///
/// `ratio` is target rate over source rate. The output holds
/// `ceil(len * ratio)` samples.
pub fn resample_linear(samples: &[f64], ratio: f64) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = (source_len as f64 * ratio).ceil() as usize;

    (0..target_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let src_idx = src_pos.floor() as usize;
            let frac = src_pos - src_idx as f64;

            if src_idx + 1 < source_len {
                samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
            } else if src_idx < source_len {
                samples[src_idx]
            } else {
                0.0
            }
        })
        .collect()
}

/// Convert `audio` to `target_rate`
pub fn resample(audio: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer> {
    if target_rate == 0 {
        return Err(DegradationError::invalid_param(
            "resample",
            "rate",
            target_rate,
            "a positive sample rate",
        ));
    }
    if target_rate == audio.sample_rate() {
        return Ok(audio.clone());
    }

    let ratio = target_rate as f64 / audio.sample_rate() as f64;
    audio.with_samples_and_rate(resample_linear(audio.samples(), ratio), target_rate)
}

/// Change tempo without changing pitch
///
/// Windowed overlap-add: frames are read every `hop * factor` samples and
/// written every `hop` samples, so `factor > 1` plays faster. The output holds
/// `round(len / factor)` samples.
pub fn time_stretch(audio: &SampleBuffer, factor: f64) -> Result<SampleBuffer> {
    if factor <= 0.0 || !factor.is_finite() {
        return Err(DegradationError::invalid_param(
            "time_stretch",
            "factor",
            factor,
            "a positive factor",
        ));
    }

    Ok(audio.with_samples(overlap_add_stretch(audio.samples(), factor)))
}

/// Overlap-add stretch of raw samples
pub fn overlap_add_stretch(samples: &[f64], factor: f64) -> Vec<f64> {
    let out_len = (samples.len() as f64 / factor).round() as usize;
    if samples.is_empty() || out_len == 0 {
        return Vec::new();
    }

    let frame = STRETCH_FRAME_LEN.min(samples.len()).max(STRETCH_OVERLAP);
    let synthesis_hop = frame / STRETCH_OVERLAP;
    let analysis_hop = synthesis_hop as f64 * factor;

    // Symmetric Hann keeps the first frame's leading sample
    let window: Vec<f64> = (0..frame)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * (i as f64 + 0.5) / frame as f64).cos())
        .collect();

    let mut out = vec![0.0; out_len + frame];
    let mut norm = vec![0.0; out_len + frame];

    let mut k = 0usize;
    loop {
        let write = k * synthesis_hop;
        if write >= out_len {
            break;
        }
        let read = (k as f64 * analysis_hop).round() as usize;

        for (i, w) in window.iter().enumerate() {
            let x = samples.get(read + i).copied().unwrap_or(0.0);
            out[write + i] += x * w;
            norm[write + i] += w;
        }
        k += 1;
    }

    out.truncate(out_len);
    out.iter()
        .zip(norm.iter())
        .map(|(y, n)| if *n > 1e-6 { y / n } else { 0.0 })
        .collect()
}
