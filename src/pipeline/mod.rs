//! Degradation pipeline
//!
//! Applies an ordered list of [`DegradationStep`]s to a buffer. Steps run
//! strictly in order and each one replaces the working buffer only on
//! success, so a failing step leaves the result of the last good step in
//! place.
//!
//! # Example
//!
//! ```no_run
//! use audio_degradation::pipeline::{load_steps, DegradationPipeline};
//! use std::path::Path;
//!
//! # fn main() -> audio_degradation::Result<()> {
//! let mut pipeline = DegradationPipeline::from_file(Path::new("viola.wav"))?.with_seed(7);
//! pipeline.run(&load_steps(Path::new("degradations.json"))?)?;
//! pipeline.export(Path::new("viola_degraded.wav"))?;
//! # Ok(())
//! # }
//! ```

pub mod report;
pub mod step;

pub use report::RunReport;
pub use step::{load_steps, parse_steps, DegradationStep, StepInfo, CATALOG, TRIM_FROM_END};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dsp::{self, NoiseGenerator, SpectralNoiseGenerator};
use crate::engine::{AudioCodec, SampleBuffer, WavCodec};
use crate::error::{DegradationError, Result};
use crate::filters::{BiquadBackend, CompressorParams, EffectsBackend, Transcoder};

/// Record of one successfully applied step
#[derive(Debug, Clone, Serialize)]
pub struct AppliedStep {
    /// Position in the pipeline, starting at 0
    pub index: usize,
    #[serde(flatten)]
    pub step: DegradationStep,
    pub applied_at: DateTime<Utc>,
    /// Shape of the buffer the step produced
    pub num_samples: usize,
    pub sample_rate: u32,
    pub duration_ms: u64,
}

/// Sequential degradation of one buffer
pub struct DegradationPipeline {
    current: SampleBuffer,
    history: Vec<AppliedStep>,
    codec: Box<dyn AudioCodec>,
    noise: Box<dyn NoiseGenerator>,
    backend: Box<dyn EffectsBackend>,
    transcoder: Option<Box<dyn Transcoder>>,
    intermediate_dir: Option<PathBuf>,
}

impl DegradationPipeline {
    /// Start from an in-memory buffer with the built-in collaborators
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            current: buffer,
            history: Vec::new(),
            codec: Box::new(WavCodec),
            noise: Box::new(SpectralNoiseGenerator::new()),
            backend: Box::new(BiquadBackend),
            transcoder: None,
            intermediate_dir: None,
        }
    }

    /// Decode `path` with the built-in WAV codec
    pub fn from_file(path: &Path) -> Result<Self> {
        let buffer = WavCodec.decode(path)?;
        info!(
            path = %path.display(),
            sample_rate = buffer.sample_rate(),
            bits = buffer.bit_depth().bits(),
            duration_ms = buffer.duration_ms(),
            "loaded audio"
        );
        Ok(Self::new(buffer))
    }

    /// Use a seeded noise generator so runs are reproducible
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_noise_generator(Box::new(SpectralNoiseGenerator::with_seed(seed)))
    }

    /// Replace the codec used for `mix` and `impulse_response` files and for
    /// exports
    pub fn with_codec(mut self, codec: Box<dyn AudioCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_noise_generator(mut self, noise: Box<dyn NoiseGenerator>) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_backend(mut self, backend: Box<dyn EffectsBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Install the collaborator for `mp3` steps
    pub fn with_transcoder(mut self, transcoder: Box<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Write each step's output to `dir` as `step_NN_name.wav`
    pub fn with_intermediate_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.intermediate_dir = Some(dir.into());
        self
    }

    /// Working buffer
    pub fn current(&self) -> &SampleBuffer {
        &self.current
    }

    /// Steps applied so far
    pub fn history(&self) -> &[AppliedStep] {
        &self.history
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Consume the pipeline, returning the working buffer
    pub fn into_buffer(self) -> SampleBuffer {
        self.current
    }

    /// Strip leading and trailing silence from the working buffer
    ///
    /// Not recorded in the history.
    pub fn trim_silence(&mut self) -> Result<()> {
        let before = self.current.duration_ms();
        self.current = self.backend.trim_silence(&self.current)?;
        info!(
            before_ms = before,
            after_ms = self.current.duration_ms(),
            "trimmed leading and trailing silence"
        );
        Ok(())
    }

    /// Apply every step in order, halting at the first failure
    ///
    /// # Errors
    /// `StepFailed` wrapping the cause. The working buffer holds the output
    /// of the last successful step.
    pub fn run(&mut self, steps: &[DegradationStep]) -> Result<()> {
        for step in steps {
            self.apply(step)?;
        }
        info!(
            steps = steps.len(),
            duration_ms = self.current.duration_ms(),
            "pipeline finished"
        );
        Ok(())
    }

    /// Apply one step
    pub fn apply(&mut self, step: &DegradationStep) -> Result<()> {
        let index = self.history.len();
        let name = step.name();

        let next = self.process(step).map_err(|e| e.in_step(index, name))?;

        if let Some(dir) = &self.intermediate_dir {
            let path = dir.join(format!("step_{:02}_{}.wav", index, name));
            fs::create_dir_all(dir)
                .map_err(DegradationError::from)
                .and_then(|_| self.codec.encode(&next, &path))
                .map_err(|e| e.in_step(index, name))?;
            debug!(path = %path.display(), "wrote intermediate");
        }

        info!(
            index,
            step = name,
            params = %step.params(),
            duration_ms = next.duration_ms(),
            sample_rate = next.sample_rate(),
            "applied degradation"
        );

        self.history.push(AppliedStep {
            index,
            step: step.clone(),
            applied_at: Utc::now(),
            num_samples: next.len(),
            sample_rate: next.sample_rate(),
            duration_ms: next.duration_ms(),
        });
        self.current = next;
        Ok(())
    }

    /// Write the working buffer with the pipeline's codec
    pub fn export(&self, path: &Path) -> Result<()> {
        self.codec.encode(&self.current, path)
    }

    fn process(&mut self, step: &DegradationStep) -> Result<SampleBuffer> {
        let audio = &self.current;
        let backend = self.backend.as_ref();

        match step {
            DegradationStep::Noise { snr, color } => {
                let noise = self.noise.generate(audio.len(), *color);
                dsp::mix(audio, &noise, *snr)
            }
            DegradationStep::Mp3 { bitrate } => match &self.transcoder {
                Some(transcoder) => transcoder.transcode(audio, *bitrate),
                None => Err(DegradationError::Unsupported {
                    step: "mp3".to_string(),
                    reason: "no MP3 transcoder is installed".to_string(),
                }),
            },
            DegradationStep::Gain { volume } => backend.apply_gain(audio, *volume),
            DegradationStep::Normalize { headroom } => backend.normalize(audio, *headroom),
            DegradationStep::LowPass { cutoff } => backend.low_pass(audio, *cutoff),
            DegradationStep::HighPass { cutoff } => backend.high_pass(audio, *cutoff),
            DegradationStep::TrimMillis { amount, offset } => {
                Ok(trim_millis(audio, *amount, *offset))
            }
            DegradationStep::Mix { path, snr } => {
                let other = self.codec.decode(path)?;
                let other = if other.sample_rate() != audio.sample_rate() {
                    backend.resample(&other, audio.sample_rate())?
                } else {
                    other
                };
                let secondary = dsp::reconcile(audio.len(), other.samples())?;
                dsp::mix(audio, &secondary, *snr)
            }
            DegradationStep::Speedup { speed } => speedup(audio, *speed, backend),
            DegradationStep::Resample { rate } => backend.resample(audio, *rate),
            DegradationStep::PitchShift { octaves } => pitch_shift(audio, *octaves),
            DegradationStep::DynamicRangeCompression {
                threshold,
                ratio,
                attack,
                release,
            } => backend.compress_dynamic_range(
                audio,
                &CompressorParams {
                    threshold_db: *threshold,
                    ratio: *ratio,
                    attack_ms: *attack,
                    release_ms: *release,
                },
            ),
            DegradationStep::ImpulseResponse { path } => {
                let impulse = self.codec.decode(path)?;
                dsp::convolve(audio, &impulse, backend)
            }
            DegradationStep::Equalizer {
                frequency,
                bandwidth,
                gain,
            } => backend.equalize(audio, *frequency, *bandwidth, *gain),
            DegradationStep::TimeStretch { factor } => backend.time_stretch(audio, *factor),
            DegradationStep::Delay { samples } => delay(audio, *samples),
            DegradationStep::Clipping {
                n_samples,
                percent_samples,
            } => dsp::clip(audio, *n_samples, *percent_samples),
            DegradationStep::WowFlutter {
                intensity,
                frequency,
                upsampling_factor,
            } => dsp::wow_flutter(audio, *intensity, *frequency, *upsampling_factor, backend),
            DegradationStep::Aliasing { dest_frequency } => {
                dsp::alias(audio, *dest_frequency, backend)
            }
            DegradationStep::HarmonicDistortion { num_passes } => {
                Ok(dsp::distort(audio, *num_passes))
            }
        }
    }
}

// ============================================================================
// Buffer edits
// ============================================================================

/// Remove `amount_ms` milliseconds
///
/// With `offset_ms == -1` the last `amount_ms` are removed, otherwise the span
/// starting at `offset_ms`. Removing the whole buffer or more, or starting
/// past the end, leaves the buffer unchanged.
pub fn trim_millis(audio: &SampleBuffer, amount_ms: u64, offset_ms: i64) -> SampleBuffer {
    let duration_ms = audio.duration_ms();
    if amount_ms >= duration_ms {
        warn!(
            amount_ms,
            duration_ms, "trim would remove the whole buffer, skipping"
        );
        return audio.clone();
    }

    let samples = audio.samples();
    let amount = audio.ms_to_samples(amount_ms as f64).min(samples.len());

    let kept = if offset_ms == TRIM_FROM_END {
        samples[..samples.len() - amount].to_vec()
    } else {
        let start = audio.ms_to_samples(offset_ms.max(0) as f64);
        if start >= samples.len() {
            warn!(offset_ms, duration_ms, "trim offset is past the end, skipping");
            return audio.clone();
        }
        let end = (start + amount).min(samples.len());
        let mut kept = Vec::with_capacity(samples.len() - (end - start));
        kept.extend_from_slice(&samples[..start]);
        kept.extend_from_slice(&samples[end..]);
        kept
    };

    audio.with_samples(kept)
}

/// Prepend `samples` zeros
///
/// # Errors
/// * `InvalidParameter` - If the delayed buffer cannot be allocated
pub fn delay(audio: &SampleBuffer, samples: usize) -> Result<SampleBuffer> {
    let too_long = || {
        DegradationError::invalid_param("delay", "samples", samples, "a delay that fits in memory")
    };

    let total = samples.checked_add(audio.len()).ok_or_else(too_long)?;
    let mut delayed = Vec::new();
    delayed.try_reserve_exact(total).map_err(|_| too_long())?;

    delayed.resize(samples, 0.0);
    delayed.extend_from_slice(audio.samples());
    Ok(audio.with_samples(delayed))
}

/// Play `speed` times faster
///
/// The samples are reinterpreted at `rate * speed` and then resampled so the
/// result is tagged `floor(rate / speed)`.
pub fn speedup(
    audio: &SampleBuffer,
    speed: f64,
    backend: &dyn EffectsBackend,
) -> Result<SampleBuffer> {
    if speed <= 0.0 || !speed.is_finite() {
        return Err(DegradationError::invalid_param(
            "speedup",
            "speed",
            speed,
            "a positive factor",
        ));
    }

    let rate = audio.sample_rate() as f64;
    let fast_rate = (rate * speed).round().max(1.0) as u32;
    let target_rate = (rate / speed).floor() as u32;
    if target_rate == 0 {
        return Err(DegradationError::invalid_param(
            "speedup",
            "speed",
            speed,
            "a factor leaving a sample rate of at least 1 Hz",
        ));
    }

    let fast = audio.with_sample_rate(fast_rate)?;
    backend.resample(&fast, target_rate)
}

/// Shift pitch by retagging the rate as `rate * 2^octaves`
///
/// Samples are untouched; duration changes along with pitch.
pub fn pitch_shift(audio: &SampleBuffer, octaves: f64) -> Result<SampleBuffer> {
    let new_rate = (audio.sample_rate() as f64 * 2.0_f64.powf(octaves)) as u32;
    if new_rate == 0 {
        return Err(DegradationError::invalid_param(
            "pitch_shift",
            "octaves",
            octaves,
            "a shift leaving a sample rate of at least 1 Hz",
        ));
    }
    audio.with_sample_rate(new_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, BitDepth};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Halves every sample instead of encoding
    struct HalvingTranscoder;

    impl Transcoder for HalvingTranscoder {
        fn transcode(&self, audio: &SampleBuffer, _bitrate_kbps: u32) -> Result<SampleBuffer> {
            Ok(audio.with_samples(audio.samples().iter().map(|s| (s / 2.0).round()).collect()))
        }
    }

    /// Biquad backend that counts resample calls
    struct CountingBackend {
        resamples: Arc<AtomicUsize>,
    }

    impl EffectsBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn low_pass(&self, audio: &SampleBuffer, cutoff_hz: f64) -> Result<SampleBuffer> {
            BiquadBackend.low_pass(audio, cutoff_hz)
        }

        fn high_pass(&self, audio: &SampleBuffer, cutoff_hz: f64) -> Result<SampleBuffer> {
            BiquadBackend.high_pass(audio, cutoff_hz)
        }

        fn normalize(&self, audio: &SampleBuffer, headroom_db: f64) -> Result<SampleBuffer> {
            BiquadBackend.normalize(audio, headroom_db)
        }

        fn apply_gain(&self, audio: &SampleBuffer, gain_db: f64) -> Result<SampleBuffer> {
            BiquadBackend.apply_gain(audio, gain_db)
        }

        fn compress_dynamic_range(
            &self,
            audio: &SampleBuffer,
            params: &CompressorParams,
        ) -> Result<SampleBuffer> {
            BiquadBackend.compress_dynamic_range(audio, params)
        }

        fn equalize(
            &self,
            audio: &SampleBuffer,
            frequency_hz: f64,
            bandwidth_octaves: f64,
            gain_db: f64,
        ) -> Result<SampleBuffer> {
            BiquadBackend.equalize(audio, frequency_hz, bandwidth_octaves, gain_db)
        }

        fn resample(&self, audio: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer> {
            self.resamples.fetch_add(1, Ordering::SeqCst);
            BiquadBackend.resample(audio, target_rate)
        }

        fn time_stretch(&self, audio: &SampleBuffer, factor: f64) -> Result<SampleBuffer> {
            BiquadBackend.time_stretch(audio, factor)
        }

        fn trim_silence(&self, audio: &SampleBuffer) -> Result<SampleBuffer> {
            BiquadBackend.trim_silence(audio)
        }
    }

    /// Decodes every path to the same 22.05 kHz tone and discards encodes
    struct ToneCodec {
        decodes: Arc<AtomicUsize>,
    }

    impl AudioCodec for ToneCodec {
        fn decode(&self, _path: &Path) -> Result<SampleBuffer> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            generate_test_tone(330.0, 0.25, 22050, BitDepth::Sixteen, 0.5)
        }

        fn encode(&self, _buffer: &SampleBuffer, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn viola_stand_in() -> SampleBuffer {
        // 3664 ms at 44.1 kHz
        let tone = generate_test_tone(163.0, 1.0, 44100, BitDepth::Sixteen, 0.5).unwrap();
        let samples: Vec<f64> = tone.samples().iter().cycle().take(161_582).cloned().collect();
        tone.with_samples(samples)
    }

    #[test]
    fn test_trim_from_start_and_end() {
        let audio = viola_stand_in();
        assert_eq!(audio.duration_ms(), 3664);

        let once = trim_millis(&audio, 100, 0);
        let twice = trim_millis(&once, 500, TRIM_FROM_END);
        assert_eq!(twice.duration_ms(), 3064);
    }

    #[test]
    fn test_trim_middle_keeps_both_sides() {
        let audio =
            SampleBuffer::new((0..1000).map(|i| i as f64).collect(), 1000, BitDepth::Sixteen)
                .unwrap();
        let trimmed = trim_millis(&audio, 100, 200);

        assert_eq!(trimmed.len(), 900);
        assert_eq!(trimmed.samples()[199], 199.0);
        assert_eq!(trimmed.samples()[200], 300.0);
    }

    #[test]
    fn test_trim_overrun_is_noop() {
        let audio = viola_stand_in();
        assert_eq!(trim_millis(&audio, 5000, 0), audio);
        assert_eq!(trim_millis(&audio, 100, 9000), audio);
    }

    #[test]
    fn test_delay_prepends_silence() {
        let audio = viola_stand_in();
        let delayed = delay(&audio, 44100).unwrap();

        assert_eq!(delayed.duration_ms(), audio.duration_ms() + 1000);
        assert!(delayed.samples()[..44100].iter().all(|&s| s == 0.0));
        assert_eq!(&delayed.samples()[44100..], audio.samples());
    }

    #[test]
    fn test_delay_too_long_is_an_error() {
        let audio = viola_stand_in();
        let err = delay(&audio, usize::MAX / 2).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");

        let mut pipeline = DegradationPipeline::new(audio.clone());
        let err = pipeline
            .apply(&DegradationStep::Delay {
                samples: usize::MAX,
            })
            .unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(pipeline.current(), &audio);
    }

    #[test]
    fn test_speedup_rate_and_duration() {
        let audio = viola_stand_in();
        let fast = speedup(&audio, 2.0, &BiquadBackend).unwrap();

        assert_eq!(fast.sample_rate(), 22050);
        assert!((fast.duration_ms() as i64 - 1832).abs() <= 1);
    }

    #[test]
    fn test_pitch_shift_retags_rate() {
        let audio = viola_stand_in();
        let shifted = pitch_shift(&audio, -0.5).unwrap();

        assert_eq!(shifted.sample_rate(), (44100.0 * 2.0_f64.powf(-0.5)) as u32);
        assert_eq!(shifted.samples(), audio.samples());
    }

    #[test]
    fn test_mp3_without_transcoder_is_unsupported() {
        let mut pipeline = DegradationPipeline::new(viola_stand_in());
        let err = pipeline
            .apply(&DegradationStep::Mp3 { bitrate: 128 })
            .unwrap_err();

        assert_eq!(err.error_code(), "UNSUPPORTED");
        assert!(pipeline.history().is_empty());
    }

    #[test]
    fn test_injected_collaborators_are_used() {
        let resamples = Arc::new(AtomicUsize::new(0));
        let decodes = Arc::new(AtomicUsize::new(0));
        let audio = generate_test_tone(163.0, 0.5, 16000, BitDepth::Sixteen, 0.5).unwrap();

        let mut pipeline = DegradationPipeline::new(audio.clone())
            .with_seed(9)
            .with_backend(Box::new(CountingBackend {
                resamples: Arc::clone(&resamples),
            }))
            .with_codec(Box::new(ToneCodec {
                decodes: Arc::clone(&decodes),
            }))
            .with_transcoder(Box::new(HalvingTranscoder));
        assert_eq!(pipeline.backend_name(), "counting");

        pipeline
            .apply(&DegradationStep::Mp3 { bitrate: 128 })
            .unwrap();
        assert_eq!(pipeline.history().len(), 1);
        assert_eq!(pipeline.history()[0].step, DegradationStep::Mp3 { bitrate: 128 });
        assert_eq!(pipeline.current().samples()[4], (audio.samples()[4] / 2.0).round());

        pipeline
            .run(&[
                DegradationStep::Resample { rate: 8000 },
                DegradationStep::Aliasing {
                    dest_frequency: 4000.0,
                },
                DegradationStep::Mix {
                    path: PathBuf::from("not/on/disk.wav"),
                    snr: 10.0,
                },
            ])
            .unwrap();

        // resample, aliasing back to 8 kHz, and the 22.05 kHz mix source
        assert_eq!(resamples.load(Ordering::SeqCst), 3);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.history().len(), 4);
        assert_eq!(pipeline.current().sample_rate(), 8000);
        assert_eq!(pipeline.current().len(), 4000);
    }

    #[test]
    fn test_history_records_resolved_steps() {
        let mut pipeline = DegradationPipeline::new(viola_stand_in()).with_seed(3);
        pipeline
            .run(&[
                DegradationStep::Gain { volume: -6.0 },
                DegradationStep::Resample { rate: 16000 },
            ])
            .unwrap();

        let history = pipeline.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].index, 0);
        assert_eq!(history[1].step, DegradationStep::Resample { rate: 16000 });
        assert_eq!(history[1].sample_rate, 16000);
        assert_eq!(pipeline.current().sample_rate(), 16000);
    }
}
