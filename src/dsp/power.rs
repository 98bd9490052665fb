//! Mean-square power measurement shared by noise injection and mixing.

use num_traits::ToPrimitive;

/// Mean of squared amplitudes over the whole slice
///
/// Returns 0.0 for an empty slice. Both signals in an SNR comparison must be
/// measured over the same length window.
pub fn power<T: ToPrimitive + Copy>(samples: &[T]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|s| {
            let v = s.to_f64().unwrap_or(0.0);
            v * v
        })
        .sum();

    sum_sq / samples.len() as f64
}

/// Root-mean-square amplitude
pub fn rms<T: ToPrimitive + Copy>(samples: &[T]) -> f64 {
    power(samples).sqrt()
}
