//! Degradation Benchmarks
//!
//! Performance benchmarks for the heavier degradations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use audio_degradation::dsp::{convolve, wow_flutter, NoiseColor, NoiseGenerator};
use audio_degradation::dsp::SpectralNoiseGenerator;
use audio_degradation::engine::{generate_test_tone, BitDepth};
use audio_degradation::filters::{BiquadBackend, EffectsBackend};
use audio_degradation::pipeline::{DegradationPipeline, DegradationStep};

fn benchmark_noise_generation(c: &mut Criterion) {
    let mut generator = SpectralNoiseGenerator::with_seed(1);

    c.bench_function("pink_noise_10s_44k", |b| {
        b.iter(|| generator.generate(black_box(441_000), NoiseColor::Pink))
    });
}

fn benchmark_low_pass(c: &mut Criterion) {
    let tone = generate_test_tone(163.0, 10.0, 44100, BitDepth::Sixteen, 0.5).unwrap();

    c.bench_function("low_pass_10s_44k", |b| {
        b.iter(|| BiquadBackend.low_pass(black_box(&tone), 1000.0).unwrap())
    });
}

fn benchmark_convolution(c: &mut Criterion) {
    let tone = generate_test_tone(163.0, 5.0, 44100, BitDepth::Sixteen, 0.5).unwrap();
    let decay: Vec<f64> = (0..44100)
        .map(|i| 20000.0 * (-(i as f64) / 8000.0).exp())
        .collect();
    let impulse = tone.with_samples(decay);

    c.bench_function("convolve_5s_with_1s_ir", |b| {
        b.iter(|| convolve(black_box(&tone), &impulse, &BiquadBackend).unwrap())
    });
}

fn benchmark_wow_flutter(c: &mut Criterion) {
    let tone = generate_test_tone(163.0, 4.0, 16000, BitDepth::Sixteen, 0.5).unwrap();

    c.bench_function("wow_flutter_4s_16k_x5", |b| {
        b.iter(|| wow_flutter(black_box(&tone), 1.3, 0.5, 5.0, &BiquadBackend).unwrap())
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    let tone = generate_test_tone(163.0, 3.0, 44100, BitDepth::Sixteen, 0.5).unwrap();
    let steps = [
        DegradationStep::Noise {
            snr: 20.0,
            color: NoiseColor::Pink,
        },
        DegradationStep::HighPass { cutoff: 200.0 },
        DegradationStep::Clipping {
            n_samples: 0,
            percent_samples: 0.05,
        },
        DegradationStep::Aliasing {
            dest_frequency: 8000.0,
        },
    ];

    c.bench_function("pipeline_4_steps_3s", |b| {
        b.iter(|| {
            let mut pipeline = DegradationPipeline::new(tone.clone()).with_seed(7);
            pipeline.run(black_box(&steps)).unwrap();
        })
    });
}

criterion_group!(
    benches,
    benchmark_noise_generation,
    benchmark_low_pass,
    benchmark_convolution,
    benchmark_wow_flutter,
    benchmark_pipeline
);
criterion_main!(benches);
