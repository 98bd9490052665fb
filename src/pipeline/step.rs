//! Degradation step descriptors
//!
//! A degradations file is a JSON array of objects, each naming an effect and
//! optionally overriding its parameters:
//!
//! ```json
//! [
//!     { "name": "noise", "snr": 15, "color": "brown" },
//!     { "name": "trim_millis", "offset": -1, "amount": 500 },
//!     { "name": "impulse_response", "path": "./ir/hall.wav" }
//! ]
//! ```
//!
//! Parsing resolves every default and validates every value up front, so a
//! bad descriptor is reported before any step runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::dsp::clip::ClipAmount;
use crate::dsp::NoiseColor;
use crate::error::{DegradationError, Result};
use crate::filters::CompressorParams;

/// Offset value for `trim_millis` that trims from the end
pub const TRIM_FROM_END: i64 = -1;

/// One fully resolved degradation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum DegradationStep {
    /// Add colored noise at a target SNR
    Noise { snr: f64, color: NoiseColor },
    /// Round trip through an MP3 encoder
    Mp3 { bitrate: u32 },
    /// Change level in dB
    Gain { volume: f64 },
    /// Peak-normalize leaving `headroom` dB
    Normalize { headroom: f64 },
    LowPass { cutoff: f64 },
    HighPass { cutoff: f64 },
    /// Remove `amount` ms starting at `offset` ms, or from the end if
    /// `offset` is [`TRIM_FROM_END`]
    TrimMillis { amount: u64, offset: i64 },
    /// Mix in another recording at a target SNR
    Mix { path: PathBuf, snr: f64 },
    Speedup { speed: f64 },
    Resample { rate: u32 },
    PitchShift { octaves: f64 },
    DynamicRangeCompression {
        threshold: f64,
        ratio: f64,
        attack: f64,
        release: f64,
    },
    /// Convolve with an impulse response file
    ImpulseResponse { path: PathBuf },
    Equalizer {
        frequency: f64,
        bandwidth: f64,
        gain: f64,
    },
    TimeStretch { factor: f64 },
    /// Prepend `samples` zeros
    Delay { samples: usize },
    Clipping { n_samples: usize, percent_samples: f64 },
    WowFlutter {
        intensity: f64,
        frequency: f64,
        upsampling_factor: f64,
    },
    Aliasing { dest_frequency: f64 },
    HarmonicDistortion { num_passes: u32 },
}

impl DegradationStep {
    /// Identifier used in degradations files
    pub fn name(&self) -> &'static str {
        match self {
            DegradationStep::Noise { .. } => "noise",
            DegradationStep::Mp3 { .. } => "mp3",
            DegradationStep::Gain { .. } => "gain",
            DegradationStep::Normalize { .. } => "normalize",
            DegradationStep::LowPass { .. } => "low_pass",
            DegradationStep::HighPass { .. } => "high_pass",
            DegradationStep::TrimMillis { .. } => "trim_millis",
            DegradationStep::Mix { .. } => "mix",
            DegradationStep::Speedup { .. } => "speedup",
            DegradationStep::Resample { .. } => "resample",
            DegradationStep::PitchShift { .. } => "pitch_shift",
            DegradationStep::DynamicRangeCompression { .. } => "dynamic_range_compression",
            DegradationStep::ImpulseResponse { .. } => "impulse_response",
            DegradationStep::Equalizer { .. } => "equalizer",
            DegradationStep::TimeStretch { .. } => "time_stretch",
            DegradationStep::Delay { .. } => "delay",
            DegradationStep::Clipping { .. } => "clipping",
            DegradationStep::WowFlutter { .. } => "wow_flutter",
            DegradationStep::Aliasing { .. } => "aliasing",
            DegradationStep::HarmonicDistortion { .. } => "harmonic_distortion",
        }
    }

    /// Resolved parameters as a JSON object (without the name)
    pub fn params(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("name");
                Value::Object(map)
            }
            _ => Value::Object(Map::new()),
        }
    }

    /// Parse one descriptor object
    ///
    /// # Errors
    /// * `InvalidConfig` - If the value is not an object with a string `name`
    /// * `UnknownStep` - If the name is not a known effect
    /// * `MissingParameter` - If a required parameter is absent
    /// * `InvalidParameter` - If a value has the wrong type or is out of range
    /// * `ConflictingParameters` - If clipping sets both counts
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| DegradationError::InvalidConfig {
            reason: format!("degradation must be a JSON object, got {}", value),
        })?;
        let name = map
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| DegradationError::InvalidConfig {
                reason: "degradation is missing a string \"name\"".to_string(),
            })?;

        let p = Params { step: name, map };

        let step = match name {
            "noise" => DegradationStep::Noise {
                snr: p.f64_or("snr", 20.0)?,
                color: p.str_or("color", "pink")?.parse()?,
            },
            "mp3" => DegradationStep::Mp3 {
                bitrate: p.u32_or("bitrate", 320)?,
            },
            "gain" => DegradationStep::Gain {
                volume: p.f64_or("volume", 10.0)?,
            },
            "normalize" => DegradationStep::Normalize {
                headroom: p.f64_or("headroom", 0.1)?,
            },
            "low_pass" => DegradationStep::LowPass {
                cutoff: p.f64_or("cutoff", 1000.0)?,
            },
            "high_pass" => DegradationStep::HighPass {
                cutoff: p.f64_or("cutoff", 1000.0)?,
            },
            "trim_millis" => DegradationStep::TrimMillis {
                amount: p.u64_or("amount", 100)?,
                offset: p.i64_or("offset", 0)?,
            },
            "mix" => DegradationStep::Mix {
                path: p.path("path")?,
                snr: p.f64_or("snr", 20.0)?,
            },
            "speedup" => DegradationStep::Speedup {
                speed: p.f64("speed")?,
            },
            "resample" => DegradationStep::Resample {
                rate: p.u32("rate")?,
            },
            "pitch_shift" => DegradationStep::PitchShift {
                octaves: p.f64("octaves")?,
            },
            "dynamic_range_compression" => DegradationStep::DynamicRangeCompression {
                threshold: p.f64_or("threshold", -20.0)?,
                ratio: p.f64_or("ratio", 4.0)?,
                attack: p.f64_or("attack", 5.0)?,
                release: p.f64_or("release", 50.0)?,
            },
            "impulse_response" => DegradationStep::ImpulseResponse {
                path: p.path("path")?,
            },
            "equalizer" => DegradationStep::Equalizer {
                frequency: p.f64("frequency")?,
                bandwidth: p.f64_or("bandwidth", 1.0)?,
                gain: p.f64_or("gain", -3.0)?,
            },
            "time_stretch" => DegradationStep::TimeStretch {
                factor: p.f64("factor")?,
            },
            "delay" => DegradationStep::Delay {
                samples: p.u64("samples")? as usize,
            },
            "clipping" => DegradationStep::Clipping {
                n_samples: p.u64_or("n_samples", 0)? as usize,
                percent_samples: p.f64_or("percent_samples", 0.0)?,
            },
            "wow_flutter" => DegradationStep::WowFlutter {
                intensity: p.f64_or("intensity", 1.3)?,
                frequency: p.f64_or("frequency", 0.5)?,
                upsampling_factor: p.f64_or("upsampling_factor", 5.0)?,
            },
            "aliasing" => DegradationStep::Aliasing {
                dest_frequency: p.f64_or("dest_frequency", 8000.0)?,
            },
            "harmonic_distortion" => DegradationStep::HarmonicDistortion {
                num_passes: p.u32_or("num_passes", 3)?,
            },
            other => {
                return Err(DegradationError::UnknownStep {
                    name: other.to_string(),
                })
            }
        };

        p.warn_unused(step_param_names(&step));
        step.validate()?;
        Ok(step)
    }

    /// Range checks that do not depend on the audio
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        let positive = |param: &str, value: f64| -> Result<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(DegradationError::invalid_param(
                    name,
                    param,
                    value,
                    "a positive number",
                ))
            }
        };
        let finite = |param: &str, value: f64| -> Result<()> {
            if value.is_finite() {
                Ok(())
            } else {
                Err(DegradationError::invalid_param(
                    name,
                    param,
                    value,
                    "a finite number",
                ))
            }
        };

        match self {
            DegradationStep::Noise { snr, .. } | DegradationStep::Mix { snr, .. } => {
                finite("snr", *snr)
            }
            DegradationStep::Mp3 { bitrate } => positive("bitrate", *bitrate as f64),
            DegradationStep::Gain { volume } => finite("volume", *volume),
            DegradationStep::Normalize { headroom } => {
                if *headroom >= 0.0 && headroom.is_finite() {
                    Ok(())
                } else {
                    Err(DegradationError::invalid_param(
                        name,
                        "headroom",
                        headroom,
                        "a non-negative number of dB",
                    ))
                }
            }
            DegradationStep::LowPass { cutoff } | DegradationStep::HighPass { cutoff } => {
                positive("cutoff", *cutoff)
            }
            DegradationStep::TrimMillis { offset, .. } => {
                if *offset >= TRIM_FROM_END {
                    Ok(())
                } else {
                    Err(DegradationError::invalid_param(
                        name,
                        "offset",
                        offset,
                        "-1 (from the end) or a non-negative offset in ms",
                    ))
                }
            }
            DegradationStep::Speedup { speed } => positive("speed", *speed),
            DegradationStep::Resample { rate } => positive("rate", *rate as f64),
            DegradationStep::PitchShift { octaves } => finite("octaves", *octaves),
            DegradationStep::DynamicRangeCompression {
                threshold,
                ratio,
                attack,
                release,
            } => CompressorParams {
                threshold_db: *threshold,
                ratio: *ratio,
                attack_ms: *attack,
                release_ms: *release,
            }
            .validate(),
            DegradationStep::Equalizer {
                frequency,
                bandwidth,
                gain,
            } => {
                positive("frequency", *frequency)?;
                positive("bandwidth", *bandwidth)?;
                finite("gain", *gain)
            }
            DegradationStep::TimeStretch { factor } => positive("factor", *factor),
            DegradationStep::Clipping {
                n_samples,
                percent_samples,
            } => ClipAmount::from_params(*n_samples, *percent_samples).map(|_| ()),
            DegradationStep::WowFlutter {
                intensity,
                frequency,
                upsampling_factor,
            } => {
                if !(0.0..100.0).contains(intensity) {
                    return Err(DegradationError::invalid_param(
                        name,
                        "intensity",
                        intensity,
                        "0 <= intensity < 100",
                    ));
                }
                if *frequency < 0.0 || !frequency.is_finite() {
                    return Err(DegradationError::invalid_param(
                        name,
                        "frequency",
                        frequency,
                        "a non-negative frequency",
                    ));
                }
                positive("upsampling_factor", *upsampling_factor)
            }
            DegradationStep::Aliasing { dest_frequency } => {
                positive("dest_frequency", *dest_frequency)
            }
            DegradationStep::ImpulseResponse { .. }
            | DegradationStep::Delay { .. }
            | DegradationStep::HarmonicDistortion { .. } => Ok(()),
        }
    }

    /// Make relative file paths relative to `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        match self {
            DegradationStep::Mix { path, .. } | DegradationStep::ImpulseResponse { path } => {
                if path.is_relative() {
                    *path = base_dir.join(&*path);
                }
            }
            _ => {}
        }
    }
}

fn step_param_names(step: &DegradationStep) -> Vec<String> {
    match step.params() {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Typed accessors over a descriptor's fields
struct Params<'a> {
    step: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    fn missing(&self, key: &str) -> DegradationError {
        DegradationError::MissingParameter {
            step: self.step.to_string(),
            param: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, value: &Value, expected: &str) -> DegradationError {
        DegradationError::invalid_param(self.step, key, value, expected)
    }

    fn f64_opt(&self, key: &str) -> Result<Option<f64>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, v, "a number")),
        }
    }

    fn f64(&self, key: &str) -> Result<f64> {
        self.f64_opt(key)?.ok_or_else(|| self.missing(key))
    }

    fn f64_or(&self, key: &str, default: f64) -> Result<f64> {
        Ok(self.f64_opt(key)?.unwrap_or(default))
    }

    /// Integers may be written as `44100` or `44100.0`
    fn i64_opt(&self, key: &str) -> Result<Option<i64>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => {
                if let Some(i) = v.as_i64() {
                    return Ok(Some(i));
                }
                match v.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Some(f as i64))
                    }
                    _ => Err(self.invalid(key, v, "an integer")),
                }
            }
        }
    }

    fn i64_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.i64_opt(key)?.unwrap_or(default))
    }

    fn u64_opt(&self, key: &str) -> Result<Option<u64>> {
        match self.i64_opt(key)? {
            None => Ok(None),
            Some(i) if i >= 0 => Ok(Some(i as u64)),
            Some(_) => Err(self.invalid(key, &self.map[key], "a non-negative integer")),
        }
    }

    fn u64(&self, key: &str) -> Result<u64> {
        self.u64_opt(key)?.ok_or_else(|| self.missing(key))
    }

    fn u64_or(&self, key: &str, default: u64) -> Result<u64> {
        Ok(self.u64_opt(key)?.unwrap_or(default))
    }

    fn u32_opt(&self, key: &str) -> Result<Option<u32>> {
        match self.u64_opt(key)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| self.invalid(key, &self.map[key], "an integer below 2^32")),
        }
    }

    fn u32(&self, key: &str) -> Result<u32> {
        self.u32_opt(key)?.ok_or_else(|| self.missing(key))
    }

    fn u32_or(&self, key: &str, default: u32) -> Result<u32> {
        Ok(self.u32_opt(key)?.unwrap_or(default))
    }

    fn str_or(&self, key: &str, default: &'a str) -> Result<&'a str> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(v) => Err(self.invalid(key, v, "a string")),
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        match self.map.get(key) {
            None | Some(Value::Null) => Err(self.missing(key)),
            Some(Value::String(s)) if !s.is_empty() => Ok(PathBuf::from(s)),
            Some(v) => Err(self.invalid(key, v, "a file path")),
        }
    }

    fn warn_unused(&self, known: Vec<String>) {
        for key in self.map.keys() {
            if key != "name" && !known.iter().any(|k| k == key) {
                warn!(step = self.step, param = %key, "ignoring unknown parameter");
            }
        }
    }
}

/// Parse a JSON array of descriptors
///
/// Errors carry the index and name of the offending descriptor.
pub fn parse_steps(json: &str) -> Result<Vec<DegradationStep>> {
    let value: Value = serde_json::from_str(json)?;
    let items = value.as_array().ok_or_else(|| DegradationError::InvalidConfig {
        reason: "degradations must be a JSON array".to_string(),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            DegradationStep::from_value(item).map_err(|e| {
                let name = item
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>");
                e.in_step(index, name)
            })
        })
        .collect()
}

/// Read and parse a degradations file
///
/// Relative `path` parameters are resolved against the file's directory.
pub fn load_steps(path: &Path) -> Result<Vec<DegradationStep>> {
    let json = fs::read_to_string(path).map_err(|e| DegradationError::FileNotFound {
        path: path.display().to_string(),
        source: Some(e),
    })?;

    let mut steps = parse_steps(&json)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for step in steps.iter_mut() {
        step.resolve_paths(base_dir);
    }
    Ok(steps)
}

// ============================================================================
// Catalog
// ============================================================================

/// Description of one effect for `effects` listings
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// `(parameter, default)`; a default of `"required"` has none
    pub params: &'static [(&'static str, &'static str)],
}

/// Every effect with its parameters and defaults
pub const CATALOG: &[StepInfo] = &[
    StepInfo {
        name: "noise",
        description: "Add colored noise at a target SNR",
        params: &[("snr", "20"), ("color", "pink")],
    },
    StepInfo {
        name: "mp3",
        description: "Round trip through an MP3 encoder",
        params: &[("bitrate", "320")],
    },
    StepInfo {
        name: "gain",
        description: "Change level in dB",
        params: &[("volume", "10")],
    },
    StepInfo {
        name: "normalize",
        description: "Peak-normalize with headroom in dB",
        params: &[("headroom", "0.1")],
    },
    StepInfo {
        name: "low_pass",
        description: "Remove content above the cutoff",
        params: &[("cutoff", "1000")],
    },
    StepInfo {
        name: "high_pass",
        description: "Remove content below the cutoff",
        params: &[("cutoff", "1000")],
    },
    StepInfo {
        name: "trim_millis",
        description: "Cut milliseconds at an offset (-1 = from end)",
        params: &[("amount", "100"), ("offset", "0")],
    },
    StepInfo {
        name: "mix",
        description: "Mix another recording at a target SNR",
        params: &[("path", "required"), ("snr", "20")],
    },
    StepInfo {
        name: "speedup",
        description: "Play faster, raising pitch",
        params: &[("speed", "required")],
    },
    StepInfo {
        name: "resample",
        description: "Convert to a new sample rate",
        params: &[("rate", "required")],
    },
    StepInfo {
        name: "pitch_shift",
        description: "Retag the sample rate by 2^octaves",
        params: &[("octaves", "required")],
    },
    StepInfo {
        name: "dynamic_range_compression",
        description: "Compress dynamics",
        params: &[
            ("threshold", "-20"),
            ("ratio", "4"),
            ("attack", "5"),
            ("release", "50"),
        ],
    },
    StepInfo {
        name: "impulse_response",
        description: "Convolve with an impulse response",
        params: &[("path", "required")],
    },
    StepInfo {
        name: "equalizer",
        description: "Boost or cut a band",
        params: &[("frequency", "required"), ("bandwidth", "1"), ("gain", "-3")],
    },
    StepInfo {
        name: "time_stretch",
        description: "Change tempo without changing pitch",
        params: &[("factor", "required")],
    },
    StepInfo {
        name: "delay",
        description: "Prepend silence",
        params: &[("samples", "required")],
    },
    StepInfo {
        name: "clipping",
        description: "Hard-clip the loudest samples",
        params: &[("n_samples", "0"), ("percent_samples", "0")],
    },
    StepInfo {
        name: "wow_flutter",
        description: "Sinusoidal speed wobble",
        params: &[
            ("intensity", "1.3"),
            ("frequency", "0.5"),
            ("upsampling_factor", "5"),
        ],
    },
    StepInfo {
        name: "aliasing",
        description: "Decimate without anti-aliasing, then restore the rate",
        params: &[("dest_frequency", "8000")],
    },
    StepInfo {
        name: "harmonic_distortion",
        description: "Repeated sine waveshaping",
        params: &[("num_passes", "3")],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_defaults_are_resolved() {
        let steps = parse_steps(
            r#"[{"name": "noise"}, {"name": "trim_millis"}, {"name": "wow_flutter"}]"#,
        )
        .unwrap();

        assert_eq!(
            steps,
            vec![
                DegradationStep::Noise {
                    snr: 20.0,
                    color: NoiseColor::Pink
                },
                DegradationStep::TrimMillis {
                    amount: 100,
                    offset: 0
                },
                DegradationStep::WowFlutter {
                    intensity: 1.3,
                    frequency: 0.5,
                    upsampling_factor: 5.0
                },
            ]
        );
    }

    #[test]
    fn test_overrides() {
        let step = DegradationStep::from_value(&json!({
            "name": "trim_millis", "offset": -1, "amount": 500
        }))
        .unwrap();
        assert_eq!(
            step,
            DegradationStep::TrimMillis {
                amount: 500,
                offset: -1
            }
        );
    }

    #[test]
    fn test_integer_written_as_float() {
        let step = DegradationStep::from_value(&json!({"name": "resample", "rate": 22050.0}));
        assert_eq!(step.unwrap(), DegradationStep::Resample { rate: 22050 });
    }

    #[test_case(json!({"name": "speedup"}), "speed" ; "speedup")]
    #[test_case(json!({"name": "resample"}), "rate" ; "resample")]
    #[test_case(json!({"name": "mix", "snr": 5}), "path" ; "mix")]
    #[test_case(json!({"name": "delay"}), "samples" ; "delay")]
    #[test_case(json!({"name": "equalizer"}), "frequency" ; "equalizer")]
    fn test_required_parameter_missing(value: Value, expected_param: &str) {
        match DegradationStep::from_value(&value).unwrap_err() {
            DegradationError::MissingParameter { param, .. } => assert_eq!(param, expected_param),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unknown_step_reports_index() {
        let err = parse_steps(r#"[{"name": "gain"}, {"name": "reverse"}]"#).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_STEP");
        match err {
            DegradationError::StepFailed { index, name, .. } => {
                assert_eq!(index, 1);
                assert_eq!(name, "reverse");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = DegradationStep::from_value(&json!({"name": "gain", "volume": "loud"}))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");

        let err = DegradationStep::from_value(&json!({"name": "delay", "samples": 1.5}))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_clipping_conflict_at_parse_time() {
        let err = parse_steps(r#"[{"name": "clipping", "n_samples": 10, "percent_samples": 5}]"#)
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICTING_PARAMETERS");
    }

    #[test]
    fn test_out_of_range_rejected() {
        for value in [
            json!({"name": "speedup", "speed": 0}),
            json!({"name": "trim_millis", "offset": -2}),
            json!({"name": "wow_flutter", "intensity": 120}),
            json!({"name": "aliasing", "dest_frequency": -8000}),
            json!({"name": "noise", "color": "plaid"}),
        ] {
            let err = DegradationStep::from_value(&value).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_PARAMETER", "{value}");
        }
    }

    #[test]
    fn test_malformed_config() {
        assert_eq!(
            parse_steps(r#"{"name": "noise"}"#).unwrap_err().error_code(),
            "INVALID_CONFIG"
        );
        assert_eq!(
            parse_steps(r#"[{"snr": 10}]"#).unwrap_err().error_code(),
            "INVALID_CONFIG"
        );
        assert_eq!(
            parse_steps("[{").unwrap_err().error_code(),
            "SERIALIZATION_ERROR"
        );
    }

    #[test]
    fn test_params_round_trip_for_history() {
        let step = DegradationStep::Clipping {
            n_samples: 0,
            percent_samples: 0.5,
        };
        assert_eq!(step.params(), json!({"n_samples": 0, "percent_samples": 0.5}));
        assert_eq!(step.name(), "clipping");
    }

    #[test]
    fn test_relative_paths_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("degradations.json");
        std::fs::write(
            &config,
            r#"[{"name": "mix", "path": "noise/cafe.wav"}, {"name": "impulse_response", "path": "/abs/ir.wav"}]"#,
        )
        .unwrap();

        let steps = load_steps(&config).unwrap();
        assert_eq!(
            steps[0],
            DegradationStep::Mix {
                path: dir.path().join("noise/cafe.wav"),
                snr: 20.0
            }
        );
        assert_eq!(
            steps[1],
            DegradationStep::ImpulseResponse {
                path: PathBuf::from("/abs/ir.wav")
            }
        );
    }

    #[test]
    fn test_catalog_covers_every_step() {
        assert_eq!(CATALOG.len(), 20);
        for info in CATALOG {
            let mut value = json!({"name": info.name});
            for (param, default) in info.params {
                if *default == "required" {
                    value[*param] = match *param {
                        "path" => json!("x.wav"),
                        "rate" | "samples" => json!(8000),
                        _ => json!(1.5),
                    };
                }
            }
            let step = DegradationStep::from_value(&value).unwrap();
            assert_eq!(step.name(), info.name);
        }
    }
}
