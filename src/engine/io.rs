//! Audio file I/O
//!
//! Decoding and encoding of the buffers that enter and leave the pipeline.
//! Multi-channel input is downmixed to mono by averaging channels. Sample rate
//! and bit depth are preserved in both directions.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::{BitDepth, SampleBuffer};
use crate::error::{DegradationError, Result};

/// Decoder/encoder collaborator
///
/// The pipeline uses a codec to load the auxiliary files of `mix` and
/// `impulse_response` steps; the CLI uses it to load inputs and export results.
pub trait AudioCodec: Send + Sync {
    /// Decode a file into a mono buffer
    fn decode(&self, path: &Path) -> Result<SampleBuffer>;

    /// Encode a buffer to a file
    fn encode(&self, buffer: &SampleBuffer, path: &Path) -> Result<()>;
}

/// WAV codec backed by `hound`
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl AudioCodec for WavCodec {
    fn decode(&self, path: &Path) -> Result<SampleBuffer> {
        import_audio(path)
    }

    fn encode(&self, buffer: &SampleBuffer, path: &Path) -> Result<()> {
        export_audio(buffer, path)
    }
}

/// Import a WAV file as a mono buffer
///
/// Integer files keep their bit depth. 32-bit float files are scaled to the
/// 32-bit integer range.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file or has no channels
/// * `UnsupportedFormat` - If the bit depth is not 8, 16, 24 or 32
pub fn import_audio(path: &Path) -> Result<SampleBuffer> {
    if !path.exists() {
        return Err(DegradationError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| DegradationError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(DegradationError::InvalidAudio {
            reason: "WAV header declares zero channels".to_string(),
            source: None,
        });
    }

    let (interleaved, bit_depth) = read_samples(reader, spec)?;
    let mono = downmix(&interleaved, channels);

    SampleBuffer::new(mono, spec.sample_rate, bit_depth)
}

/// Export a buffer as a single-channel integer WAV file
pub fn export_audio(buffer: &SampleBuffer, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: buffer.bit_depth().bits(),
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(to_io_error)?;

    for &sample in buffer.samples() {
        writer
            .write_sample(buffer.bit_depth().quantize(sample) as i32)
            .map_err(to_io_error)?;
    }

    writer.finalize().map_err(to_io_error)?;

    Ok(())
}

/// Generate a sine tone
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `duration_secs` - Duration of the tone in seconds
/// * `sample_rate` - Sample rate in Hz
/// * `bit_depth` - Bit depth of the produced buffer
/// * `amplitude` - Peak amplitude relative to full scale (0.0 to 1.0)
pub fn generate_test_tone(
    frequency: f64,
    duration_secs: f64,
    sample_rate: u32,
    bit_depth: BitDepth,
    amplitude: f64,
) -> Result<SampleBuffer> {
    let num_samples = (duration_secs * sample_rate as f64) as usize;
    let angular_freq = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;

    let samples: Vec<f64> = (0..num_samples)
        .map(|i| amplitude * (angular_freq * i as f64).sin())
        .collect();

    SampleBuffer::from_normalized(&samples, sample_rate, bit_depth)
}

/// Generate a tone with harmonics at 1/k amplitude, a rough stand-in for a
/// bowed string
pub fn generate_harmonic_tone(
    fundamental: f64,
    harmonics: usize,
    duration_secs: f64,
    sample_rate: u32,
    bit_depth: BitDepth,
    amplitude: f64,
) -> Result<SampleBuffer> {
    let num_samples = (duration_secs * sample_rate as f64) as usize;
    let norm: f64 = (1..=harmonics.max(1)).map(|k| 1.0 / k as f64).sum();
    let two_pi = 2.0 * std::f64::consts::PI;

    let samples: Vec<f64> = (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let sum: f64 = (1..=harmonics.max(1))
                .map(|k| (two_pi * fundamental * k as f64 * t).sin() / k as f64)
                .sum();
            amplitude * sum / norm
        })
        .collect();

    SampleBuffer::from_normalized(&samples, sample_rate, bit_depth)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn to_io_error(e: hound::Error) -> DegradationError {
    match e {
        hound::Error::IoError(io) => DegradationError::Io(io),
        other => DegradationError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Read interleaved samples as integer amplitudes
fn read_samples<R: std::io::Read>(
    mut reader: WavReader<R>,
    spec: WavSpec,
) -> Result<(Vec<f64>, BitDepth)> {
    match spec.sample_format {
        SampleFormat::Float => {
            let scale = BitDepth::ThirtyTwo.max_amplitude();
            let samples = reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v as f64).clamp(-1.0, 1.0) * scale))
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| DegradationError::InvalidAudio {
                    reason: format!("Failed to read float samples: {}", e),
                    source: Some(Box::new(e)),
                })?;
            Ok((samples, BitDepth::ThirtyTwo))
        }
        SampleFormat::Int => {
            let bit_depth = BitDepth::from_bits(spec.bits_per_sample)?;
            // hound widens every integer width to i32 and recentres 8-bit data
            let samples = reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| DegradationError::InvalidAudio {
                    reason: format!("Failed to read {}-bit samples: {}", spec.bits_per_sample, e),
                    source: Some(Box::new(e)),
                })?;
            Ok((samples, bit_depth))
        }
    }
}

/// Average interleaved frames down to one channel
fn downmix(samples: &[f64], channels: usize) -> Vec<f64> {
    if channels == 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
