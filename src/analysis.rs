//! Spectral measurements
//!
//! Objective checks used to verify that a degradation did what it claims:
//! - Goertzel power in a narrow frequency band
//! - Welch power spectral density (Hann window, 50% overlap, one-sided)
//! - Summary statistics for `inspect`

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use crate::dsp::power::{power, rms};
use crate::engine::{linear_to_db, SampleBuffer};

/// Welch segment length used by [`welch_total_power`]
pub const DEFAULT_WELCH_SEGMENT: usize = 256;

/// Summed Goertzel power over the DFT bins covering `[f_start, f_end)`
///
/// The whole slice is one analysis window, so the bin spacing is
/// `sample_rate / samples.len()`.
pub fn goertzel_band_power(samples: &[f64], sample_rate: u32, f_start: f64, f_end: f64) -> f64 {
    let window_size = samples.len();
    if window_size == 0 {
        return 0.0;
    }

    let f_step = sample_rate as f64 / window_size as f64;
    let k_start = (f_start / f_step).floor() as usize;
    let k_end = ((f_end / f_step).ceil() as usize).min(window_size - 1);

    (k_start..k_end)
        .map(|k| {
            let f = k as f64 / window_size as f64;
            let w_real = 2.0 * (2.0 * std::f64::consts::PI * f).cos();

            let (mut d1, mut d2) = (0.0_f64, 0.0_f64);
            for &s in samples {
                let y = s + w_real * d1 - d2;
                d2 = d1;
                d1 = y;
            }

            d2 * d2 + d1 * d1 - w_real * d1 * d2
        })
        .sum()
}

/// Welch estimate of the one-sided power spectral density
///
/// Returns `(frequencies, density)`. Segments shorter than `segment_len` shrink
/// the segment to the signal length.
pub fn welch_psd(samples: &[f64], sample_rate: u32, segment_len: usize) -> (Vec<f64>, Vec<f64>) {
    let nperseg = segment_len.min(samples.len());
    if nperseg == 0 {
        return (Vec::new(), Vec::new());
    }

    let step = (nperseg / 2).max(1);
    let window: Vec<f64> = (0..nperseg)
        .map(|i| {
            // Periodic Hann
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / nperseg as f64).cos())
        })
        .collect();
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sample_rate as f64 * window_power);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let num_bins = nperseg / 2 + 1;
    let mut accum = vec![0.0_f64; num_bins];
    let mut segments = 0usize;

    let mut start = 0;
    while start + nperseg <= samples.len() {
        let segment = &samples[start..start + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;

        let mut buf: Vec<Complex<f64>> = segment
            .iter()
            .zip(window.iter())
            .map(|(s, w)| Complex::new((s - mean) * w, 0.0))
            .collect();
        fft.process(&mut buf);

        for (k, acc) in accum.iter_mut().enumerate() {
            *acc += buf[k].norm_sqr();
        }

        segments += 1;
        start += step;
    }

    let nyquist_bin = if nperseg % 2 == 0 { Some(num_bins - 1) } else { None };
    let density: Vec<f64> = accum
        .iter()
        .enumerate()
        .map(|(k, acc)| {
            let one_sided = if k == 0 || Some(k) == nyquist_bin {
                1.0
            } else {
                2.0
            };
            acc / segments as f64 * scale * one_sided
        })
        .collect();

    let freqs = (0..num_bins)
        .map(|k| k as f64 * sample_rate as f64 / nperseg as f64)
        .collect();

    (freqs, density)
}

/// Sum of the Welch density over all bins
pub fn welch_total_power(samples: &[f64], sample_rate: u32) -> f64 {
    welch_psd(samples, sample_rate, DEFAULT_WELCH_SEGMENT)
        .1
        .iter()
        .sum()
}

/// Summary of a buffer for reports and the `inspect` command
#[derive(Debug, Clone, Serialize)]
pub struct BufferStats {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub num_samples: usize,
    pub duration_ms: u64,
    pub mean: f64,
    pub rms_dbfs: f64,
    pub peak_dbfs: f64,
    pub power: f64,
}

impl BufferStats {
    /// Measure a buffer
    pub fn measure(buffer: &SampleBuffer) -> Self {
        let full_scale = buffer.bit_depth().full_scale();
        Self {
            sample_rate: buffer.sample_rate(),
            bit_depth: buffer.bit_depth().bits(),
            num_samples: buffer.len(),
            duration_ms: buffer.duration_ms(),
            mean: buffer.mean(),
            rms_dbfs: linear_to_db(rms(buffer.samples()) / full_scale),
            peak_dbfs: buffer.peak_dbfs(),
            power: power(buffer.samples()),
        }
    }
}
