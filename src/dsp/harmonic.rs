//! Harmonic distortion by repeated sine waveshaping.

use std::f64::consts::FRAC_PI_2;

use tracing::debug;

use crate::engine::SampleBuffer;

/// Distort `audio` by passing it through `sin(x·π/2)` `num_passes` times
///
/// The signal is first remapped from `[min, max]` to `[-1, 1]` and mapped back
/// afterwards, so the output keeps the input's range. Each pass pushes the
/// waveform further toward a square wave. Zero passes reproduces the input up
/// to floating round-trip error (at most one LSB after rounding).
pub fn distort(audio: &SampleBuffer, num_passes: u32) -> SampleBuffer {
    let samples = audio.samples();
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);

    if samples.is_empty() || max == min {
        debug!("harmonic distortion skipped on constant signal");
        return audio.clone();
    }

    let span = max - min;
    let shaped: Vec<f64> = samples
        .iter()
        .map(|&s| {
            let mut y = 2.0 * (s - min) / span - 1.0;
            for _ in 0..num_passes {
                y = (y * FRAC_PI_2).sin();
            }
            (y + 1.0) / 2.0 * span + min
        })
        .collect();

    audio.with_samples(shaped)
}
