//! Sample Buffer
//!
//! Provides the immutable mono buffer every degradation consumes and produces.
//! Amplitudes are stored as integer-valued `f64` inside the signed range of the
//! buffer's bit depth, mirroring the integer PCM the buffer was decoded from.

use serde::{Deserialize, Serialize};

use crate::error::{DegradationError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f64::NEG_INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Bit Depth
// ============================================================================

/// Bit depth of the integer amplitudes held in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    /// Parse a bit count (8, 16, 24 or 32)
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            24 => Ok(BitDepth::TwentyFour),
            32 => Ok(BitDepth::ThirtyTwo),
            other => Err(DegradationError::UnsupportedFormat {
                format: format!("{}-bit audio (only 8, 16, 24, 32 supported)", other),
            }),
        }
    }

    /// Number of bits per sample
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }

    /// `2^(bits-1)`, the magnitude that maps to 1.0 in normalized form
    pub fn full_scale(self) -> f64 {
        2.0_f64.powi(self.bits() as i32 - 1)
    }

    /// Largest representable amplitude, `2^(bits-1) - 1`
    pub fn max_amplitude(self) -> f64 {
        self.full_scale() - 1.0
    }

    /// Smallest representable amplitude, `-2^(bits-1)`
    pub fn min_amplitude(self) -> f64 {
        -self.full_scale()
    }

    /// Round to the nearest integer amplitude, saturating at the range limits
    pub fn quantize(self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        value.round().clamp(self.min_amplitude(), self.max_amplitude())
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = DegradationError;

    fn try_from(bits: u16) -> Result<Self> {
        BitDepth::from_bits(bits)
    }
}

impl From<BitDepth> for u16 {
    fn from(depth: BitDepth) -> u16 {
        depth.bits()
    }
}

// ============================================================================
// SampleBuffer
// ============================================================================

/// Immutable mono audio buffer
///
/// A buffer is never mutated after construction. Effects derive a new buffer
/// with [`SampleBuffer::with_samples`] or
/// [`SampleBuffer::with_samples_and_rate`], which copy the metadata by value.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
    bit_depth: BitDepth,
}

impl SampleBuffer {
    /// Create a buffer from integer amplitudes
    ///
    /// Values are rounded and saturated to the range of `bit_depth`.
    ///
    /// # Errors
    /// * `UnsupportedFormat` - If `sample_rate` is zero
    pub fn new(samples: Vec<f64>, sample_rate: u32, bit_depth: BitDepth) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DegradationError::UnsupportedFormat {
                format: "0 Hz sample rate".to_string(),
            });
        }

        let samples = samples.into_iter().map(|s| bit_depth.quantize(s)).collect();

        Ok(Self {
            samples,
            sample_rate,
            bit_depth,
        })
    }

    /// Create a buffer from normalized floats in [-1, 1]
    pub fn from_normalized(samples: &[f64], sample_rate: u32, bit_depth: BitDepth) -> Result<Self> {
        let scale = bit_depth.full_scale();
        Self::new(
            samples.iter().map(|s| s * scale).collect(),
            sample_rate,
            bit_depth,
        )
    }

    /// Derive a buffer with new samples and this buffer's rate and bit depth
    pub fn with_samples(&self, samples: Vec<f64>) -> Self {
        let bit_depth = self.bit_depth;
        Self {
            samples: samples.into_iter().map(|s| bit_depth.quantize(s)).collect(),
            sample_rate: self.sample_rate,
            bit_depth,
        }
    }

    /// Derive a buffer with new samples and a new sample rate
    pub fn with_samples_and_rate(&self, samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, self.bit_depth)
    }

    /// Derive a buffer holding the same samples tagged with another rate
    ///
    /// The samples are reinterpreted, not resampled: playback speed and pitch
    /// change by `sample_rate / self.sample_rate()`.
    pub fn with_sample_rate(&self, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DegradationError::UnsupportedFormat {
                format: "0 Hz sample rate".to_string(),
            });
        }
        Ok(Self {
            samples: self.samples.clone(),
            sample_rate,
            bit_depth: self.bit_depth,
        })
    }

    /// Integer amplitudes
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bit depth of the amplitudes
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Always 1; multi-channel input is downmixed on decode
    pub fn channel_count(&self) -> u16 {
        1
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer has no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Duration in whole milliseconds, rounded to nearest
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as f64 * 1000.0 / self.sample_rate as f64).round() as u64
    }

    /// Convert a millisecond count to a sample count at this buffer's rate
    pub fn ms_to_samples(&self, ms: f64) -> usize {
        (ms * self.sample_rate as f64 / 1000.0).round().max(0.0) as usize
    }

    /// Amplitudes scaled to [-1, 1)
    pub fn to_normalized(&self) -> Vec<f64> {
        let scale = self.bit_depth.full_scale();
        self.samples.iter().map(|s| s / scale).collect()
    }

    /// Mean amplitude
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Largest absolute amplitude
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }

    /// Peak level relative to full scale in dB
    pub fn peak_dbfs(&self) -> f64 {
        linear_to_db(self.peak() / self.bit_depth.full_scale())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_conversion() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(-20.0), 0.1, epsilon = 1e-12);
        assert_relative_eq!(linear_to_db(0.1), -20.0, epsilon = 1e-9);
        assert_eq!(linear_to_db(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_bit_depth_ranges() {
        assert_eq!(BitDepth::Sixteen.max_amplitude(), 32767.0);
        assert_eq!(BitDepth::Sixteen.min_amplitude(), -32768.0);
        assert_eq!(BitDepth::Eight.max_amplitude(), 127.0);
        assert_eq!(BitDepth::TwentyFour.max_amplitude(), 8_388_607.0);
        assert_eq!(BitDepth::ThirtyTwo.max_amplitude(), 2_147_483_647.0);
        assert!(BitDepth::from_bits(12).is_err());
    }

    #[test]
    fn test_construction_quantizes_and_saturates() {
        let buffer =
            SampleBuffer::new(vec![0.4, 1.6, 40_000.0, -40_000.0], 44100, BitDepth::Sixteen)
                .unwrap();
        assert_eq!(buffer.samples(), &[0.0, 2.0, 32767.0, -32768.0]);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(SampleBuffer::new(vec![0.0], 0, BitDepth::Sixteen).is_err());
    }

    #[test]
    fn test_with_samples_copies_metadata() {
        let original = SampleBuffer::new(vec![1.0, 2.0], 22050, BitDepth::TwentyFour).unwrap();
        let derived = original.with_samples(vec![3.0, 4.0, 5.0]);

        assert_eq!(derived.sample_rate(), 22050);
        assert_eq!(derived.bit_depth(), BitDepth::TwentyFour);
        assert_eq!(derived.len(), 3);
        // The source buffer is untouched
        assert_eq!(original.samples(), &[1.0, 2.0]);
    }

    #[test]
    fn test_duration_ms_rounds() {
        // 3664 ms at 44.1 kHz is 161582.4 samples
        let buffer = SampleBuffer::new(vec![0.0; 161_582], 44100, BitDepth::Sixteen).unwrap();
        assert_eq!(buffer.duration_ms(), 3664);
        assert_eq!(buffer.ms_to_samples(100.0), 4410);
    }

    #[test]
    fn test_normalized_round_trip() {
        let buffer =
            SampleBuffer::from_normalized(&[0.5, -0.5, 1.0], 8000, BitDepth::Sixteen).unwrap();
        assert_eq!(buffer.samples(), &[16384.0, -16384.0, 32767.0]);

        let normalized = buffer.to_normalized();
        assert_relative_eq!(normalized[0], 0.5);
    }

    #[test]
    fn test_reinterpreted_rate_keeps_samples() {
        let buffer = SampleBuffer::new(vec![1.0, 2.0, 3.0], 44100, BitDepth::Sixteen).unwrap();
        let shifted = buffer.with_sample_rate(22050).unwrap();
        assert_eq!(shifted.samples(), buffer.samples());
        assert_eq!(shifted.sample_rate(), 22050);
    }

    #[test]
    fn test_bit_depth_serializes_as_bits() {
        let json = serde_json::to_string(&BitDepth::TwentyFour).unwrap();
        assert_eq!(json, "24");
        let parsed: BitDepth = serde_json::from_str("16").unwrap();
        assert_eq!(parsed, BitDepth::Sixteen);
    }
}
