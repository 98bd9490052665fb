//! Effects collaborators
//!
//! The pipeline delegates the "library" effects (filtering, gain, dynamics,
//! resampling, tempo) to an [`EffectsBackend`] and MP3 round trips to an
//! optional [`Transcoder`]. [`BiquadBackend`] is the built-in backend.

pub mod biquad;
pub mod dynamics;
pub mod resample;

pub use biquad::{BiquadCoeffs, BiquadState, FilterType};
pub use dynamics::CompressorParams;

use tracing::debug;

use crate::engine::SampleBuffer;
use crate::error::{DegradationError, Result};
use biquad::{bandwidth_to_q_warped, filter_cascade, BUTTERWORTH_Q};

/// Second-order sections per low/high pass (24 dB per octave)
pub const PASS_FILTER_SECTIONS: usize = 2;

/// Filter and effects library
///
/// Every method derives a new buffer; rate and bit depth carry over unless
/// the method says otherwise.
pub trait EffectsBackend: Send + Sync {
    /// Short identifier for logs and reports
    fn name(&self) -> &'static str;

    /// Attenuate content above `cutoff_hz`
    fn low_pass(&self, audio: &SampleBuffer, cutoff_hz: f64) -> Result<SampleBuffer>;

    /// Attenuate content below `cutoff_hz`
    fn high_pass(&self, audio: &SampleBuffer, cutoff_hz: f64) -> Result<SampleBuffer>;

    /// Scale the peak to `headroom_db` below full scale
    fn normalize(&self, audio: &SampleBuffer, headroom_db: f64) -> Result<SampleBuffer>;

    /// Change level by `gain_db`
    fn apply_gain(&self, audio: &SampleBuffer, gain_db: f64) -> Result<SampleBuffer>;

    /// Reduce dynamic range
    fn compress_dynamic_range(
        &self,
        audio: &SampleBuffer,
        params: &CompressorParams,
    ) -> Result<SampleBuffer>;

    /// Boost or cut a band `bandwidth_octaves` wide around `frequency_hz`
    fn equalize(
        &self,
        audio: &SampleBuffer,
        frequency_hz: f64,
        bandwidth_octaves: f64,
        gain_db: f64,
    ) -> Result<SampleBuffer>;

    /// Convert to `target_rate`; the result is tagged with `target_rate`
    fn resample(&self, audio: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer>;

    /// Change tempo by `factor` (> 1 is faster) without changing pitch
    fn time_stretch(&self, audio: &SampleBuffer, factor: f64) -> Result<SampleBuffer>;

    /// Strip leading and trailing silence
    fn trim_silence(&self, audio: &SampleBuffer) -> Result<SampleBuffer>;
}

/// Lossy codec round trip (encode then decode)
pub trait Transcoder: Send + Sync {
    /// Encode at `bitrate_kbps` and decode back to a buffer at the input's
    /// rate and bit depth
    fn transcode(&self, audio: &SampleBuffer, bitrate_kbps: u32) -> Result<SampleBuffer>;
}

/// Built-in backend: cookbook biquads, a feed-forward compressor, linear
/// resampling and overlap-add time stretching
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadBackend;

impl BiquadBackend {
    fn check_frequency(step: &str, param: &str, frequency_hz: f64) -> Result<()> {
        if frequency_hz <= 0.0 || !frequency_hz.is_finite() {
            return Err(DegradationError::invalid_param(
                step,
                param,
                frequency_hz,
                "a positive frequency in Hz",
            ));
        }
        Ok(())
    }

    fn pass_filter(
        audio: &SampleBuffer,
        filter_type: FilterType,
        cutoff_hz: f64,
    ) -> SampleBuffer {
        let coeffs = BiquadCoeffs::calculate(
            filter_type,
            audio.sample_rate() as f64,
            cutoff_hz,
            0.0,
            BUTTERWORTH_Q,
        );
        let sections = [coeffs; PASS_FILTER_SECTIONS];
        audio.with_samples(filter_cascade(audio.samples(), &sections))
    }
}

impl EffectsBackend for BiquadBackend {
    fn name(&self) -> &'static str {
        "biquad"
    }

    fn low_pass(&self, audio: &SampleBuffer, cutoff_hz: f64) -> Result<SampleBuffer> {
        Self::check_frequency("low_pass", "cutoff", cutoff_hz)?;
        debug!(cutoff_hz, "low pass");
        Ok(Self::pass_filter(audio, FilterType::LowPass, cutoff_hz))
    }

    fn high_pass(&self, audio: &SampleBuffer, cutoff_hz: f64) -> Result<SampleBuffer> {
        Self::check_frequency("high_pass", "cutoff", cutoff_hz)?;
        debug!(cutoff_hz, "high pass");
        Ok(Self::pass_filter(audio, FilterType::HighPass, cutoff_hz))
    }

    fn normalize(&self, audio: &SampleBuffer, headroom_db: f64) -> Result<SampleBuffer> {
        dynamics::normalize(audio, headroom_db)
    }

    fn apply_gain(&self, audio: &SampleBuffer, gain_db: f64) -> Result<SampleBuffer> {
        if !gain_db.is_finite() {
            return Err(DegradationError::invalid_param(
                "gain",
                "volume",
                gain_db,
                "a finite gain in dB",
            ));
        }
        Ok(dynamics::apply_gain(audio, gain_db))
    }

    fn compress_dynamic_range(
        &self,
        audio: &SampleBuffer,
        params: &CompressorParams,
    ) -> Result<SampleBuffer> {
        dynamics::compress_dynamic_range(audio, params)
    }

    fn equalize(
        &self,
        audio: &SampleBuffer,
        frequency_hz: f64,
        bandwidth_octaves: f64,
        gain_db: f64,
    ) -> Result<SampleBuffer> {
        Self::check_frequency("equalizer", "frequency", frequency_hz)?;
        if bandwidth_octaves <= 0.0 || !bandwidth_octaves.is_finite() {
            return Err(DegradationError::invalid_param(
                "equalizer",
                "bandwidth",
                bandwidth_octaves,
                "a positive bandwidth in octaves",
            ));
        }

        let rate = audio.sample_rate() as f64;
        let q = bandwidth_to_q_warped(bandwidth_octaves, frequency_hz, rate);
        let coeffs = BiquadCoeffs::calculate(FilterType::Peak, rate, frequency_hz, gain_db, q);
        debug!(frequency_hz, bandwidth_octaves, gain_db, q, "equalizer");

        Ok(audio.with_samples(filter_cascade(audio.samples(), &[coeffs])))
    }

    fn resample(&self, audio: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer> {
        resample::resample(audio, target_rate)
    }

    fn time_stretch(&self, audio: &SampleBuffer, factor: f64) -> Result<SampleBuffer> {
        resample::time_stretch(audio, factor)
    }

    fn trim_silence(&self, audio: &SampleBuffer) -> Result<SampleBuffer> {
        Ok(dynamics::trim_silence(audio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::goertzel_band_power;
    use crate::engine::{generate_harmonic_tone, generate_test_tone, BitDepth};

    fn band_power(audio: &SampleBuffer, lo: f64, hi: f64) -> f64 {
        goertzel_band_power(audio.samples(), audio.sample_rate(), lo, hi)
    }

    #[test]
    fn test_low_pass_removes_tone_above_cutoff() {
        let tone = generate_test_tone(163.0, 1.0, 44100, BitDepth::Sixteen, 0.5).unwrap();
        let filtered = BiquadBackend.low_pass(&tone, 100.0).unwrap();

        assert_eq!(filtered.len(), tone.len());
        assert!(band_power(&filtered, 162.0, 164.0) < band_power(&tone, 162.0, 164.0));
    }

    #[test]
    fn test_high_pass_removes_tone_below_cutoff() {
        let tone = generate_test_tone(163.0, 1.0, 44100, BitDepth::Sixteen, 0.5).unwrap();
        let filtered = BiquadBackend.high_pass(&tone, 200.0).unwrap();
        assert!(band_power(&filtered, 162.0, 164.0) < band_power(&tone, 162.0, 164.0));
    }

    #[test]
    fn test_low_pass_keeps_fundamental_drops_harmonics() {
        let tone = generate_harmonic_tone(200.0, 8, 1.0, 16000, BitDepth::Sixteen, 0.8).unwrap();
        let filtered = BiquadBackend.low_pass(&tone, 400.0).unwrap();

        let fundamental_kept =
            band_power(&filtered, 199.0, 201.0) / band_power(&tone, 199.0, 201.0);
        let harmonic_kept =
            band_power(&filtered, 1599.0, 1601.0) / band_power(&tone, 1599.0, 1601.0);
        assert!(fundamental_kept > 0.5);
        assert!(harmonic_kept < 0.01);
    }

    #[test]
    fn test_equalizer_cuts_band() {
        let tone = generate_test_tone(1000.0, 1.0, 16000, BitDepth::Sixteen, 0.5).unwrap();
        let cut = BiquadBackend.equalize(&tone, 1000.0, 1.0, -12.0).unwrap();
        assert!(band_power(&cut, 999.0, 1001.0) < band_power(&tone, 999.0, 1001.0) * 0.1);
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        let tone = generate_test_tone(163.0, 0.1, 8000, BitDepth::Sixteen, 0.5).unwrap();
        let err = BiquadBackend.low_pass(&tone, -5.0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_gain_through_backend() {
        let tone = generate_test_tone(163.0, 0.1, 8000, BitDepth::Sixteen, 0.1).unwrap();
        let louder = BiquadBackend.apply_gain(&tone, 6.0).unwrap();
        assert!(louder.peak() > tone.peak() * 1.9);
    }
}
