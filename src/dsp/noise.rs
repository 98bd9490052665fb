//! Colored noise generation
//!
//! Gaussian white noise is shaped in the frequency domain so that its power
//! spectral density follows `f^beta`:
//!
//! | color  | beta |
//! |--------|------|
//! | white  |  0   |
//! | pink   | -1   |
//! | brown  | -2   |
//! | blue   | +1   |
//! | violet | +2   |
//!
//! Output is zero-mean with unit variance; callers rescale it for a target SNR.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use crate::error::{DegradationError, Result};

/// Spectral color of generated noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseColor {
    White,
    #[default]
    Pink,
    Brown,
    Blue,
    Violet,
}

impl NoiseColor {
    /// All colors, in order of increasing spectral slope
    pub const ALL: [NoiseColor; 5] = [
        NoiseColor::Brown,
        NoiseColor::Pink,
        NoiseColor::White,
        NoiseColor::Blue,
        NoiseColor::Violet,
    ];

    /// Exponent of the power spectral density, `PSD ∝ f^beta`
    pub fn spectral_exponent(self) -> f64 {
        match self {
            NoiseColor::White => 0.0,
            NoiseColor::Pink => -1.0,
            NoiseColor::Brown => -2.0,
            NoiseColor::Blue => 1.0,
            NoiseColor::Violet => 2.0,
        }
    }

    /// Lowercase identifier as used in degradation configs
    pub fn as_str(self) -> &'static str {
        match self {
            NoiseColor::White => "white",
            NoiseColor::Pink => "pink",
            NoiseColor::Brown => "brown",
            NoiseColor::Blue => "blue",
            NoiseColor::Violet => "violet",
        }
    }
}

impl fmt::Display for NoiseColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseColor {
    type Err = DegradationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(NoiseColor::White),
            "pink" => Ok(NoiseColor::Pink),
            "brown" | "red" => Ok(NoiseColor::Brown),
            "blue" => Ok(NoiseColor::Blue),
            "violet" | "purple" => Ok(NoiseColor::Violet),
            other => Err(DegradationError::invalid_param(
                "noise",
                "color",
                other,
                "one of white, pink, brown, blue, violet",
            )),
        }
    }
}

/// Noise source collaborator
///
/// Implementations must return exactly `length` samples with approximately
/// zero mean and a spectrum shaped according to `color`.
pub trait NoiseGenerator: Send {
    /// Generate `length` samples of `color` noise
    fn generate(&mut self, length: usize, color: NoiseColor) -> Vec<f64>;
}

/// Seeded noise generator shaping Gaussian white noise with an FFT
pub struct SpectralNoiseGenerator {
    rng: ChaCha8Rng,
    planner: FftPlanner<f64>,
}

impl SpectralNoiseGenerator {
    /// Create a generator whose output is fully determined by `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            planner: FftPlanner::new(),
        }
    }

    /// Create a generator seeded from the thread RNG
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    fn white(&mut self, length: usize) -> Vec<f64> {
        (0..length)
            .map(|_| self.rng.sample::<f64, _>(StandardNormal))
            .collect()
    }

    /// Scale every bin by `|f|^(beta/2)`; DC is removed
    fn shape(&mut self, white: Vec<f64>, beta: f64) -> Vec<f64> {
        let n = white.len();
        let mut spectrum: Vec<Complex<f64>> =
            white.into_iter().map(|v| Complex::new(v, 0.0)).collect();

        self.planner.plan_fft_forward(n).process(&mut spectrum);

        for (k, bin) in spectrum.iter_mut().enumerate() {
            // Bins above n/2 hold the negative frequencies
            let freq = k.min(n - k) as f64;
            *bin = if freq == 0.0 {
                Complex::new(0.0, 0.0)
            } else {
                *bin * freq.powf(beta / 2.0)
            };
        }

        self.planner.plan_fft_inverse(n).process(&mut spectrum);

        spectrum.into_iter().map(|c| c.re / n as f64).collect()
    }
}

impl Default for SpectralNoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseGenerator for SpectralNoiseGenerator {
    fn generate(&mut self, length: usize, color: NoiseColor) -> Vec<f64> {
        if length == 0 {
            return Vec::new();
        }

        let white = self.white(length);
        let beta = color.spectral_exponent();
        let shaped = if beta == 0.0 {
            white
        } else {
            self.shape(white, beta)
        };

        standardize(shaped)
    }
}

/// Remove the mean and scale to unit variance; all-constant input becomes zeros
fn standardize(mut samples: Vec<f64>) -> Vec<f64> {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    for s in samples.iter_mut() {
        *s = if std_dev > 0.0 { (*s - mean) / std_dev } else { 0.0 };
    }

    samples
}
