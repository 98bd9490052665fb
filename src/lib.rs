//! Audio Degradation Toolbox
//!
//! Applies an ordered list of controlled degradations (noise at a target
//! SNR, filtering, mixing, resampling, impulse response convolution, clipping,
//! wow and flutter, aliasing, harmonic distortion and more) to a mono
//! recording, producing a reproducible, parametrized corruption of the
//! original for dataset augmentation.
//!
//! # Architecture
//!
//! - [`engine`]: the immutable [`SampleBuffer`] and WAV I/O
//! - [`dsp`]: built-in degradation algorithms
//! - [`filters`]: the effects collaborator trait and its biquad backend
//! - [`pipeline`]: step descriptors, sequential application, run reports
//! - [`analysis`]: band power and PSD measurements
//! - [`cli`]: the `audio-degradation` command

pub mod analysis;
pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod filters;
pub mod pipeline;

pub use engine::{AudioCodec, BitDepth, SampleBuffer, WavCodec};
pub use error::{DegradationError, Result};
pub use filters::{BiquadBackend, EffectsBackend, Transcoder};
pub use pipeline::{load_steps, parse_steps, DegradationPipeline, DegradationStep};
