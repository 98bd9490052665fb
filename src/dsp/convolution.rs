//! Impulse response convolution
//!
//! Full linear convolution of a buffer with an impulse response, computed with
//! zero-padded FFTs, followed by peak normalization to the buffer's bit depth.
//! The output is `len(impulse) - 1` samples longer than the input; the reverb
//! tail is kept.

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use super::normalize::peak_normalize;
use crate::engine::SampleBuffer;
use crate::error::{DegradationError, Result};
use crate::filters::EffectsBackend;

/// Convolve `primary` with `impulse`
///
/// An impulse recorded at another sample rate is resampled to `primary`'s rate
/// by `backend` first.
///
/// # Errors
/// * `DegenerateSignal` - If either input is empty or the result is silent
pub fn convolve(
    primary: &SampleBuffer,
    impulse: &SampleBuffer,
    backend: &dyn EffectsBackend,
) -> Result<SampleBuffer> {
    if primary.is_empty() {
        return Err(DegradationError::degenerate("cannot convolve an empty buffer"));
    }

    let impulse = if impulse.sample_rate() != primary.sample_rate() {
        debug!(
            from = impulse.sample_rate(),
            to = primary.sample_rate(),
            "resampling impulse response"
        );
        backend.resample(impulse, primary.sample_rate())?
    } else {
        impulse.clone()
    };

    if impulse.is_empty() {
        return Err(DegradationError::degenerate("impulse response is empty"));
    }

    let wet = fft_convolve(primary.samples(), impulse.samples());
    let normalized = peak_normalize(&wet, primary.bit_depth())?;

    Ok(primary.with_samples(normalized))
}

/// Linear convolution via FFT, length `a.len() + b.len() - 1`
pub fn fft_convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let out_len = a.len() + b.len() - 1;
    let fft_len = out_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let padded = |x: &[f64]| -> Vec<Complex<f64>> {
        let mut buf = vec![Complex::new(0.0, 0.0); fft_len];
        for (slot, &v) in buf.iter_mut().zip(x.iter()) {
            slot.re = v;
        }
        buf
    };

    let mut fa = padded(a);
    let mut fb = padded(b);
    forward.process(&mut fa);
    forward.process(&mut fb);

    for (x, y) in fa.iter_mut().zip(fb.iter()) {
        *x *= *y;
    }
    inverse.process(&mut fa);

    let scale = 1.0 / fft_len as f64;
    fa.iter().take(out_len).map(|c| c.re * scale).collect()
}

/// Direct-form linear convolution, O(n·m)
pub fn direct_convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &h) in b.iter().enumerate() {
            out[i + j] += x * h;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BitDepth;
    use crate::filters::BiquadBackend;
    use approx::assert_abs_diff_eq;

    fn buffer(samples: Vec<f64>, rate: u32) -> SampleBuffer {
        SampleBuffer::new(samples, rate, BitDepth::Sixteen).unwrap()
    }

    #[test]
    fn test_fft_matches_direct() {
        let a: Vec<f64> = (0..37).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let b: Vec<f64> = (0..13).map(|i| ((i * 3) % 5) as f64 - 2.0).collect();

        let fast = fft_convolve(&a, &b);
        let slow = direct_convolve(&a, &b);

        assert_eq!(fast.len(), 49);
        for (f, s) in fast.iter().zip(slow.iter()) {
            assert_abs_diff_eq!(f, s, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_output_grows_by_impulse_tail() {
        let primary = buffer(vec![100.0, -200.0, 300.0, 0.0, 50.0], 8000);
        let impulse = buffer(vec![1000.0, 500.0, 250.0], 8000);

        let wet = convolve(&primary, &impulse, &BiquadBackend).unwrap();
        assert_eq!(wet.len(), primary.len() + impulse.len() - 1);
    }

    #[test]
    fn test_output_is_peak_normalized() {
        let primary = buffer(vec![10.0, -40.0, 30.0], 8000);
        let impulse = buffer(vec![3.0], 8000);

        let wet = convolve(&primary, &impulse, &BiquadBackend).unwrap();
        assert_eq!(wet.samples(), &[8192.0, -32767.0, 24575.0]);
        assert_eq!(wet.sample_rate(), 8000);
    }

    #[test]
    fn test_dirac_impulse_preserves_shape() {
        let primary = buffer(vec![0.0, 1000.0, -600.0, 200.0], 8000);
        let impulse = buffer(vec![1.0, 0.0, 0.0], 8000);

        let wet = convolve(&primary, &impulse, &BiquadBackend).unwrap();
        assert_eq!(
            wet.samples(),
            &[0.0, 32767.0, -19660.0, 6553.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_impulse_at_other_rate_is_resampled() {
        let primary = buffer(vec![1000.0; 100], 16000);
        let impulse = buffer(vec![1000.0, 500.0, 250.0, 125.0], 8000);

        let wet = convolve(&primary, &impulse, &BiquadBackend).unwrap();
        // The impulse doubles in length at twice the rate
        assert_eq!(wet.len(), 100 + 8 - 1);
    }

    #[test]
    fn test_silent_impulse_is_degenerate() {
        let primary = buffer(vec![1.0, 2.0], 8000);
        let impulse = buffer(vec![0.0, 0.0], 8000);
        let err = convolve(&primary, &impulse, &BiquadBackend).unwrap_err();
        assert_eq!(err.error_code(), "DEGENERATE_SIGNAL");
    }
}
