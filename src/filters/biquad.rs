//! Biquad filters
//!
//! Second-order sections designed with the Audio EQ Cookbook formulas.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use std::f64::consts::{LN_2, PI};

/// Butterworth Q for a single second-order section
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Bell boost/cut around a center frequency
    Peak,
    /// Remove above the corner frequency
    LowPass,
    /// Remove below the corner frequency
    HighPass,
}

/// Normalized biquad coefficients
///
/// H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Design a section
    ///
    /// `frequency` is clamped below Nyquist. `gain_db` only affects
    /// [`FilterType::Peak`].
    pub fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        let nyquist = sample_rate / 2.0;
        let freq = frequency.clamp(1.0, nyquist * 0.999);
        let q = q.max(1e-3);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Peak => {
                let a = 10.0_f64.powf(gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude response at `frequency`
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Q of a peaking section spanning `octaves` between its -3 dB points
pub fn bandwidth_to_q(octaves: f64) -> f64 {
    let octaves = octaves.max(1e-3);
    let ratio = 2.0_f64.powf(octaves);
    ratio.sqrt() / (ratio - 1.0)
}

/// Same as [`bandwidth_to_q`] with the cookbook's digital warping correction
pub fn bandwidth_to_q_warped(octaves: f64, frequency: f64, sample_rate: f64) -> f64 {
    let w0 = 2.0 * PI * frequency / sample_rate;
    let sin_w0 = w0.sin();
    if sin_w0 <= 0.0 {
        return bandwidth_to_q(octaves);
    }
    1.0 / (2.0 * (LN_2 / 2.0 * octaves.max(1e-3) * w0 / sin_w0).sinh())
}

/// Filter memory for one channel
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Process one sample (direct form I)
    pub fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Run `samples` through a cascade of sections
pub fn filter_cascade(samples: &[f64], sections: &[BiquadCoeffs]) -> Vec<f64> {
    let mut states = vec![BiquadState::default(); sections.len()];
    samples
        .iter()
        .map(|&x| {
            sections
                .iter()
                .zip(states.iter_mut())
                .fold(x, |acc, (coeffs, state)| state.process(acc, coeffs))
        })
        .collect()
}
