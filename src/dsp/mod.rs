//! Built-in degradation algorithms
//!
//! Pure functions from buffer to buffer. Each produces a new [`SampleBuffer`]
//! and never touches its input.
//!
//! [`SampleBuffer`]: crate::engine::SampleBuffer

pub mod clip;
pub mod convolution;
pub mod harmonic;
pub mod mix;
pub mod noise;
pub mod normalize;
pub mod power;
pub mod warp;

pub use clip::{clip, ClipAmount};
pub use convolution::{convolve, fft_convolve};
pub use harmonic::distort;
pub use mix::{mix, reconcile, saturating_add, scale_to_snr, snr_gain};
pub use noise::{NoiseColor, NoiseGenerator, SpectralNoiseGenerator};
pub use normalize::peak_normalize;
pub use power::{power, rms};
pub use warp::{alias, wow_flutter, WOW_FLUTTER_ITERATIONS};
