//! Level and dynamics processing: gain, normalization, compression, silence
//! trimming.

use tracing::{debug, warn};

use crate::engine::{db_to_linear, linear_to_db, SampleBuffer};
use crate::error::{DegradationError, Result};

/// Level below which a chunk counts as silence, in dBFS
pub const SILENCE_THRESHOLD_DBFS: f64 = -50.0;

/// Chunk length used when scanning for silence, in milliseconds
pub const SILENCE_CHUNK_MS: f64 = 10.0;

/// Floor for level computations in dB
const MIN_LEVEL_DB: f64 = -120.0;

/// Multiply every sample by `gain_db`, saturating at the bit-depth range
pub fn apply_gain(audio: &SampleBuffer, gain_db: f64) -> SampleBuffer {
    let gain = db_to_linear(gain_db);
    audio.with_samples(audio.samples().iter().map(|s| s * gain).collect())
}

/// Scale so the peak sits `headroom_db` below full scale
///
/// Silent buffers are returned unchanged.
pub fn normalize(audio: &SampleBuffer, headroom_db: f64) -> Result<SampleBuffer> {
    if headroom_db < 0.0 {
        return Err(DegradationError::invalid_param(
            "normalize",
            "headroom",
            headroom_db,
            "a non-negative headroom in dB",
        ));
    }

    let peak = audio.peak();
    if peak == 0.0 {
        debug!("normalize skipped on silent buffer");
        return Ok(audio.clone());
    }

    let target = audio.bit_depth().max_amplitude() * db_to_linear(-headroom_db);
    let gain = target / peak;
    Ok(audio.with_samples(audio.samples().iter().map(|s| s * gain).collect()))
}

/// Compressor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Level above which gain is reduced, in dBFS
    pub threshold_db: f64,
    /// Input dB over threshold per output dB over threshold
    pub ratio: f64,
    /// Attack time in milliseconds
    pub attack_ms: f64,
    /// Release time in milliseconds
    pub release_ms: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
        }
    }
}

impl CompressorParams {
    /// Reject settings the gain computer cannot use
    pub fn validate(&self) -> Result<()> {
        let step = "dynamic_range_compression";
        if self.threshold_db > 0.0 || !self.threshold_db.is_finite() {
            return Err(DegradationError::invalid_param(
                step,
                "threshold",
                self.threshold_db,
                "a level at or below 0 dBFS",
            ));
        }
        if self.ratio < 1.0 || !self.ratio.is_finite() {
            return Err(DegradationError::invalid_param(
                step,
                "ratio",
                self.ratio,
                "a ratio of at least 1.0",
            ));
        }
        if self.attack_ms < 0.0 {
            return Err(DegradationError::invalid_param(
                step,
                "attack",
                self.attack_ms,
                "a non-negative time in ms",
            ));
        }
        if self.release_ms < 0.0 {
            return Err(DegradationError::invalid_param(
                step,
                "release",
                self.release_ms,
                "a non-negative time in ms",
            ));
        }
        Ok(())
    }

    /// Gain change in dB (zero or negative) for a level of `input_db`
    pub fn gain_reduction_db(&self, input_db: f64) -> f64 {
        if input_db <= self.threshold_db {
            0.0
        } else {
            (self.threshold_db + (input_db - self.threshold_db) / self.ratio) - input_db
        }
    }
}

/// One-pole smoothing coefficient for a time constant
fn smoothing_coeff(time_ms: f64, sample_rate: u32) -> f64 {
    let time_samples = time_ms / 1000.0 * sample_rate as f64;
    if time_samples > 0.0 {
        (-1.0 / time_samples).exp()
    } else {
        0.0
    }
}

/// Feed-forward compressor with a peak envelope follower and hard knee
pub fn compress_dynamic_range(
    audio: &SampleBuffer,
    params: &CompressorParams,
) -> Result<SampleBuffer> {
    params.validate()?;

    let attack = smoothing_coeff(params.attack_ms, audio.sample_rate());
    let release = smoothing_coeff(params.release_ms, audio.sample_rate());
    let full_scale = audio.bit_depth().full_scale();

    let mut envelope = 0.0_f64;
    let mut max_reduction = 0.0_f64;

    let compressed: Vec<f64> = audio
        .samples()
        .iter()
        .map(|&s| {
            let level = s.abs() / full_scale;
            let coeff = if level > envelope { attack } else { release };
            envelope = coeff * envelope + (1.0 - coeff) * level;

            let level_db = linear_to_db(envelope).max(MIN_LEVEL_DB);
            let reduction = params.gain_reduction_db(level_db);
            max_reduction = max_reduction.min(reduction);

            s * db_to_linear(reduction)
        })
        .collect();

    debug!(max_reduction_db = max_reduction, "compressor");
    Ok(audio.with_samples(compressed))
}

/// RMS level of a chunk in dBFS
fn chunk_dbfs(chunk: &[f64], full_scale: f64) -> f64 {
    if chunk.is_empty() {
        return MIN_LEVEL_DB;
    }
    let mean_square = chunk.iter().map(|s| s * s).sum::<f64>() / chunk.len() as f64;
    linear_to_db(mean_square.sqrt() / full_scale).max(MIN_LEVEL_DB)
}

/// Remove leading and trailing silence
///
/// The buffer is scanned in [`SILENCE_CHUNK_MS`] chunks from each end until a
/// chunk louder than [`SILENCE_THRESHOLD_DBFS`] is found. A buffer that is
/// silent throughout is returned unchanged.
pub fn trim_silence(audio: &SampleBuffer) -> SampleBuffer {
    let chunk = audio.ms_to_samples(SILENCE_CHUNK_MS).max(1);
    let full_scale = audio.bit_depth().full_scale();
    let samples = audio.samples();

    let loud = |c: &[f64]| chunk_dbfs(c, full_scale) > SILENCE_THRESHOLD_DBFS;

    let Some(first) = samples.chunks(chunk).position(|c| loud(c)) else {
        warn!("buffer is silent throughout, nothing trimmed");
        return audio.clone();
    };
    let start = first * chunk;

    // Scan from the end with chunks aligned to the buffer's tail
    let mut end = samples.len();
    while end > start {
        let chunk_start = end.saturating_sub(chunk).max(start);
        if loud(&samples[chunk_start..end]) {
            break;
        }
        end = chunk_start;
    }

    debug!(
        leading = start,
        trailing = samples.len() - end,
        "trimmed silence"
    );
    audio.with_samples(samples[start..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, BitDepth};
    use approx::assert_relative_eq;

    fn buffer(samples: Vec<f64>) -> SampleBuffer {
        SampleBuffer::new(samples, 8000, BitDepth::Sixteen).unwrap()
    }

    #[test]
    fn test_gain_scales_and_saturates() {
        let audio = buffer(vec![1000.0, -1000.0, 30000.0]);
        let louder = apply_gain(&audio, 20.0);
        assert_eq!(louder.samples(), &[10000.0, -10000.0, 32767.0]);

        let quieter = apply_gain(&audio, -20.0);
        assert_eq!(quieter.samples(), &[100.0, -100.0, 3000.0]);
    }

    #[test]
    fn test_normalize_headroom() {
        let audio = buffer(vec![100.0, -200.0, 50.0]);
        let out = normalize(&audio, 0.0).unwrap();
        assert_eq!(out.peak(), 32767.0);

        let out = normalize(&audio, 6.0).unwrap();
        assert_relative_eq!(out.peak(), 32767.0 * db_to_linear(-6.0), epsilon = 1.0);
    }

    #[test]
    fn test_normalize_silence_unchanged() {
        let audio = buffer(vec![0.0; 10]);
        assert_eq!(normalize(&audio, 0.1).unwrap(), audio);
    }

    #[test]
    fn test_gain_computer() {
        let params = CompressorParams::default();
        assert_eq!(params.gain_reduction_db(-30.0), 0.0);
        // 20 dB over a -20 dB threshold at 4:1 comes out 5 dB over
        assert_relative_eq!(params.gain_reduction_db(0.0), -15.0);
    }

    #[test]
    fn test_compression_reduces_loud_signal() {
        let tone = generate_test_tone(440.0, 0.5, 16000, BitDepth::Sixteen, 0.9).unwrap();
        let out = compress_dynamic_range(&tone, &CompressorParams::default()).unwrap();

        assert_eq!(out.len(), tone.len());

        // Past the attack phase the envelope has settled near the peak
        let settled_peak = out.samples()[4000..]
            .iter()
            .fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(settled_peak < tone.peak() * 0.5);
    }

    #[test]
    fn test_compression_leaves_quiet_signal() {
        let tone = generate_test_tone(440.0, 0.5, 16000, BitDepth::Sixteen, 0.01).unwrap();
        let out = compress_dynamic_range(&tone, &CompressorParams::default()).unwrap();
        assert_eq!(out, tone);
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let params = CompressorParams {
            ratio: 0.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_trim_silence_both_ends() {
        // 8000 Hz: 10 ms chunks are 80 samples
        let mut samples = vec![0.0; 160];
        samples.extend(vec![10000.0; 400]);
        samples.extend(vec![0.0; 240]);
        let trimmed = trim_silence(&buffer(samples));

        assert_eq!(trimmed.len(), 400);
        assert!(trimmed.samples().iter().all(|&s| s == 10000.0));
    }

    #[test]
    fn test_trim_silence_all_silent_unchanged() {
        let audio = buffer(vec![0.0; 800]);
        assert_eq!(trim_silence(&audio), audio);
    }
}
