//! Benchmarks for the phase reconstruction pipeline
//!
//! Run with: cargo bench -p qpi-core --bench pipeline_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex64;
use qpi_core::fft2d::Fft2d;
use qpi_core::phase::{PhaseConfig, PhaseEngine};
use qpi_core::resample::{resample, ResampleMode};
use qpi_core::unwrap::{wrap_phase, Unwrapper2D, UnwrapConfig};
use std::f64::consts::PI;
use std::time::Duration;

fn wrapped_ramp(w: usize, h: usize) -> Vec<f64> {
    (0..w * h)
        .map(|i| wrap_phase((i % w) as f64 / 30.0))
        .collect()
}

fn interferogram(w: usize, h: usize) -> Vec<f64> {
    (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            let carrier = 2.0 * PI * (4.0 * x as f64 / w as f64 + 0.25 * y as f64);
            let dx = x as f64 - w as f64 / 2.0;
            let dy = y as f64 - h as f64 / 2.0;
            let bump = 1.5 * (-(dx * dx + dy * dy) / (2.0 * 144.0)).exp();
            2.0 + 2.0 * (carrier + bump).cos()
        })
        .collect()
}

// ============================================================================
// Phase Unwrapping Benchmarks
// ============================================================================

fn bench_unwrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("unwrap");
    group.measurement_time(Duration::from_secs(5));

    for dim in [128, 256, 512].iter() {
        let wrapped = wrapped_ramp(*dim, *dim);
        let mut unwrapper = Unwrapper2D::new(UnwrapConfig::default());
        let mut out = Vec::new();

        group.throughput(Throughput::Elements((dim * dim) as u64));
        group.bench_with_input(BenchmarkId::new("ramp", dim), dim, |b, &d| {
            b.iter(|| unwrapper.unwrap_into(black_box(&wrapped), d, d, &mut out))
        });
    }

    group.finish();
}

// ============================================================================
// Resampling Benchmarks
// ============================================================================

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    let (w, h) = (640, 512);
    let src: Vec<f64> = (0..w * h).map(|i| (i % 251) as f64).collect();
    group.throughput(Throughput::Elements((w * h) as u64));

    group.bench_function("nearest_down_2x", |b| {
        b.iter(|| resample(black_box(&src), w, h, w / 2, h / 2, ResampleMode::Nearest))
    });
    group.bench_function("linear_down_2x", |b| {
        b.iter(|| resample(black_box(&src), w, h, w / 2, h / 2, ResampleMode::Linear))
    });
    group.bench_function("linear_up_2x", |b| {
        b.iter(|| resample(black_box(&src), w, h, w * 2, h * 2, ResampleMode::Linear))
    });

    group.finish();
}

// ============================================================================
// 2D FFT Benchmarks
// ============================================================================

fn bench_fft2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft2d");

    for dim in [256, 512, 1024].iter() {
        let mut fft = Fft2d::new(*dim, *dim);
        let mut data: Vec<Complex64> = (0..dim * dim)
            .map(|i| Complex64::new((i % 127) as f64, 0.0))
            .collect();

        group.throughput(Throughput::Elements((dim * dim) as u64));
        group.bench_with_input(BenchmarkId::new("forward", dim), dim, |b, _| {
            b.iter(|| fft.forward(black_box(&mut data)))
        });
    }

    group.finish();
}

// ============================================================================
// Full Per-Frame Phase Path
// ============================================================================

fn bench_phase_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_path");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for dim in [256, 512].iter() {
        let frame = interferogram(*dim, *dim);
        let mut engine = PhaseEngine::new(PhaseConfig::default());
        // Background capture happens outside the timed loop
        engine.calculate_phase(&frame, *dim, *dim);

        group.throughput(Throughput::Elements((dim * dim) as u64));
        group.bench_with_input(BenchmarkId::new("calculate_phase", dim), dim, |b, &d| {
            b.iter(|| engine.calculate_phase(black_box(&frame), d, d))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_unwrap,
    bench_resample,
    bench_fft2d,
    bench_phase_path
);
criterion_main!(benches);
