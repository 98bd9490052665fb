//! SNR mixing
//!
//! Scales a secondary signal so that its power sits `target_snr_db` below the
//! primary signal and adds the two index-for-index. Output samples that leave
//! the bit depth's range saturate instead of wrapping.

use tracing::debug;

use super::power::power;
use crate::engine::{BitDepth, SampleBuffer};
use crate::error::{DegradationError, Result};

/// Gain that places `secondary_power` at `target_snr_db` below `primary_power`
///
/// `k = sqrt((Ps / Pn) * 10^(-snr/10))`
pub fn snr_gain(primary_power: f64, secondary_power: f64, target_snr_db: f64) -> Result<f64> {
    if secondary_power <= 0.0 || !secondary_power.is_finite() {
        return Err(DegradationError::degenerate(
            "secondary signal has zero power, SNR is undefined",
        ));
    }
    Ok(((primary_power / secondary_power) * 10.0_f64.powf(-target_snr_db / 10.0)).sqrt())
}

/// Return the secondary signal scaled to hit `target_snr_db` against `primary`
pub fn scale_to_snr(primary: &[f64], secondary: &[f64], target_snr_db: f64) -> Result<Vec<f64>> {
    let k = snr_gain(power(primary), power(secondary), target_snr_db)?;
    Ok(secondary.iter().map(|s| s * k).collect())
}

/// Add two amplitudes, saturating to the signed range of `bit_depth`
///
/// Returns the sum and whether it had to be saturated.
pub fn saturating_add(a: f64, b: f64, bit_depth: BitDepth) -> (f64, bool) {
    let sum = (a + b).round();
    if sum > bit_depth.max_amplitude() {
        (bit_depth.max_amplitude(), true)
    } else if sum < bit_depth.min_amplitude() {
        (bit_depth.min_amplitude(), true)
    } else {
        (sum, false)
    }
}

/// Mix `secondary` into `primary` at `target_snr_db`
///
/// # Errors
/// * `LengthMismatch` - If `secondary` is not exactly as long as `primary`
/// * `DegenerateSignal` - If `secondary` is silent
pub fn mix(primary: &SampleBuffer, secondary: &[f64], target_snr_db: f64) -> Result<SampleBuffer> {
    if secondary.len() != primary.len() {
        return Err(DegradationError::LengthMismatch {
            expected: primary.len(),
            actual: secondary.len(),
        });
    }

    let scaled = scale_to_snr(primary.samples(), secondary, target_snr_db)?;
    let bit_depth = primary.bit_depth();

    let mut saturated = 0usize;
    let mixed: Vec<f64> = primary
        .samples()
        .iter()
        .zip(scaled.iter())
        .map(|(&p, &s)| {
            let (value, clipped) = saturating_add(p, s, bit_depth);
            saturated += clipped as usize;
            value
        })
        .collect();

    if saturated > 0 {
        debug!(saturated, total = mixed.len(), "mix saturated samples");
    }

    Ok(primary.with_samples(mixed))
}

/// Stretch or cut `secondary` to exactly `primary_len` samples
///
/// Longer input is truncated. Shorter input is tiled: full copies followed by
/// a prefix covering the remainder. Equal-length input passes through.
///
/// # Errors
/// * `DegenerateSignal` - If `secondary` is empty and `primary_len` is not
pub fn reconcile<T: Clone>(primary_len: usize, secondary: &[T]) -> Result<Vec<T>> {
    if secondary.len() >= primary_len {
        return Ok(secondary[..primary_len].to_vec());
    }
    if secondary.is_empty() {
        return Err(DegradationError::degenerate(
            "cannot tile an empty signal to a non-empty length",
        ));
    }

    let mut out = Vec::with_capacity(primary_len);
    while out.len() < primary_len {
        let needed = primary_len - out.len();
        let take = needed.min(secondary.len());
        out.extend_from_slice(&secondary[..take]);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn buffer(samples: Vec<f64>) -> SampleBuffer {
        SampleBuffer::new(samples, 44100, BitDepth::Sixteen).unwrap()
    }

    #[test_case(0.0 ; "equal power")]
    #[test_case(10.0 ; "ten db")]
    #[test_case(20.0 ; "twenty db")]
    #[test_case(-6.0 ; "negative snr")]
    fn test_scaled_secondary_hits_target_snr(snr_db: f64) {
        let primary: Vec<f64> = (0..1000).map(|i| ((i as f64) * 0.1).sin() * 1000.0).collect();
        let secondary: Vec<f64> = (0..1000).map(|i| ((i as f64) * 0.37).cos() * 5.0).collect();

        let scaled = scale_to_snr(&primary, &secondary, snr_db).unwrap();
        let measured = 10.0 * (power(&primary) / power(&scaled)).log10();

        assert_relative_eq!(measured, snr_db, epsilon = 1e-9);
    }

    #[test]
    fn test_silent_secondary_is_degenerate() {
        let err = scale_to_snr(&[1.0, 2.0], &[0.0, 0.0], 20.0).unwrap_err();
        assert_eq!(err.error_code(), "DEGENERATE_SIGNAL");
    }

    #[test]
    fn test_mix_rejects_length_mismatch() {
        let primary = buffer(vec![1.0, 2.0, 3.0]);
        match mix(&primary, &[1.0, 1.0], 10.0).unwrap_err() {
            DegradationError::LengthMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_saturating_add_branches() {
        assert_eq!(
            saturating_add(32000.0, 1000.0, BitDepth::Sixteen),
            (32767.0, true)
        );
        assert_eq!(
            saturating_add(-32000.0, -1000.0, BitDepth::Sixteen),
            (-32768.0, true)
        );
        assert_eq!(saturating_add(100.0, 23.4, BitDepth::Sixteen), (123.0, false));
    }

    #[test]
    fn test_mix_saturates_instead_of_wrapping() {
        // Full-scale square wave mixed with itself at 0 dB doubles every sample
        let primary = buffer(vec![32000.0, -32000.0, 32000.0, -32000.0]);
        let mixed = mix(&primary, primary.samples(), 0.0).unwrap();

        assert_eq!(mixed.samples(), &[32767.0, -32768.0, 32767.0, -32768.0]);
    }

    #[test]
    fn test_mix_preserves_metadata() {
        let primary = SampleBuffer::new(vec![10.0; 8], 16000, BitDepth::TwentyFour).unwrap();
        let mixed = mix(&primary, &[1.0; 8], 20.0).unwrap();

        assert_eq!(mixed.sample_rate(), 16000);
        assert_eq!(mixed.bit_depth(), BitDepth::TwentyFour);
        assert_eq!(mixed.len(), 8);
    }

    #[test]
    fn test_reconcile_truncates() {
        assert_eq!(reconcile(3, &[1, 2, 3, 4, 5]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_reconcile_tiles_with_prefix() {
        assert_eq!(
            reconcile(7, &[1, 2, 3]).unwrap(),
            vec![1, 2, 3, 1, 2, 3, 1]
        );
    }

    #[test]
    fn test_reconcile_passes_equal_length_through() {
        assert_eq!(reconcile(3, &[7, 8, 9]).unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let secondary = [0.5, -0.25, 0.125];
        for len in [0, 1, 2, 3, 4, 10, 31] {
            let once = reconcile(len, &secondary).unwrap();
            let twice = reconcile(len, &once).unwrap();
            assert_eq!(once.len(), len);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_reconcile_empty_secondary() {
        let empty: [f64; 0] = [];
        assert!(reconcile(0, &empty).unwrap().is_empty());
        assert!(reconcile(4, &empty).is_err());
    }
}
