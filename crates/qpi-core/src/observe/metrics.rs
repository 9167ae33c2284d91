//! Conversion metrics
//!
//! Lock-free counters, gauges and a latency histogram covering the per-frame
//! reconstruction path. One [`Metrics`] instance lives inside each frame
//! converter; the acquisition layer pulls [`MetricsSnapshot`]s for status
//! displays or logs.
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::observe::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.frames_phase.inc();
//! metrics.convert_latency_us.observe(850.0);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.frames_phase, 1);
//! assert!(snapshot.avg_latency_us() > 0.0);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Monotonic atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Increment by 1.
    #[inline]
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by `n`.
    #[inline]
    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    #[inline]
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// Atomic gauge; goes up and down.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    /// Set the value.
    #[inline]
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram; sum is stored in millis of the observed unit.
#[derive(Debug)]
pub struct Histogram {
    boundaries: Vec<f64>,
    /// One count per boundary plus an overflow bucket
    buckets: Vec<AtomicU64>,
    sum_milli: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::latency_us()
    }
}

impl Histogram {
    /// Histogram with custom bucket boundaries.
    pub fn new(boundaries: Vec<f64>) -> Self {
        let buckets = (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            boundaries,
            buckets,
            sum_milli: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Buckets tuned for per-frame conversion latency in microseconds,
    /// spanning passthrough (<100 µs) to full-frame unwraps (>100 ms).
    pub fn latency_us() -> Self {
        Self::new(vec![
            100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0,
            100_000.0, 250_000.0,
        ])
    }

    /// Record one observation.
    pub fn observe(&self, value: f64) {
        let idx = self
            .boundaries
            .iter()
            .position(|&b| value < b)
            .unwrap_or(self.boundaries.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_milli
            .fetch_add((value * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of observations.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of all observations.
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum_milli.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Per-bucket counts, overflow bucket last.
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    /// Bucket boundaries.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

/// Metrics registry for one frame converter.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Frames passed through in intensity mode
    pub frames_intensity: Counter,
    /// Frames rendered as a log-magnitude spectrum
    pub frames_spectrum: Counter,
    /// Frames reconstructed as phase maps
    pub frames_phase: Counter,
    /// Background refresh requests
    pub background_refreshes: Counter,
    /// Frame-dimension changes observed (each forces a spectral rebuild)
    pub dimension_rebuilds: Counter,
    /// Width of the most recent frame
    pub frame_width: Gauge,
    /// Height of the most recent frame
    pub frame_height: Gauge,
    /// Per-frame conversion latency in microseconds
    pub convert_latency_us: Histogram,
}

impl Metrics {
    /// New registry with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames converted across all modes.
    pub fn frames_total(&self) -> u64 {
        self.frames_intensity.get() + self.frames_spectrum.get() + self.frames_phase.get()
    }

    /// Point-in-time copy of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_intensity: self.frames_intensity.get(),
            frames_spectrum: self.frames_spectrum.get(),
            frames_phase: self.frames_phase.get(),
            background_refreshes: self.background_refreshes.get(),
            dimension_rebuilds: self.dimension_rebuilds.get(),
            frame_width: self.frame_width.get(),
            frame_height: self.frame_height.get(),
            latency_count: self.convert_latency_us.count(),
            latency_sum_us: self.convert_latency_us.sum(),
        }
    }

    /// Reset all counters; gauges keep their last value.
    pub fn reset(&self) {
        self.frames_intensity.reset();
        self.frames_spectrum.reset();
        self.frames_phase.reset();
        self.background_refreshes.reset();
        self.dimension_rebuilds.reset();
    }
}

/// Serialisable copy of the registry at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub frames_intensity: u64,
    pub frames_spectrum: u64,
    pub frames_phase: u64,
    pub background_refreshes: u64,
    pub dimension_rebuilds: u64,
    pub frame_width: i64,
    pub frame_height: i64,
    pub latency_count: u64,
    pub latency_sum_us: f64,
}

impl MetricsSnapshot {
    /// Mean conversion latency in microseconds.
    pub fn avg_latency_us(&self) -> f64 {
        if self.latency_count == 0 {
            0.0
        } else {
            self.latency_sum_us / self.latency_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::default();
        counter.inc();
        counter.inc_by(9);
        assert_eq!(counter.get(), 10);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::default();
        gauge.set(2048);
        assert_eq!(gauge.get(), 2048);
        gauge.set(-1);
        assert_eq!(gauge.get(), -1);
    }

    #[test]
    fn test_histogram_buckets() {
        let hist = Histogram::new(vec![10.0, 100.0]);
        hist.observe(1.0);
        hist.observe(50.0);
        hist.observe(5000.0);

        assert_eq!(hist.count(), 3);
        assert!((hist.sum() - 5051.0).abs() < 0.01);
        assert_eq!(hist.bucket_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn test_snapshot_and_averages() {
        let metrics = Metrics::new();
        metrics.frames_phase.inc_by(3);
        metrics.frames_intensity.inc();
        metrics.frame_width.set(640);
        metrics.convert_latency_us.observe(1000.0);
        metrics.convert_latency_us.observe(3000.0);

        assert_eq!(metrics.frames_total(), 4);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_phase, 3);
        assert_eq!(snapshot.frame_width, 640);
        assert!((snapshot.avg_latency_us() - 2000.0).abs() < 0.01);
    }

    #[test]
    fn test_snapshot_serialises() {
        let metrics = Metrics::new();
        metrics.frames_spectrum.inc();
        let yaml = serde_yaml::to_string(&metrics.snapshot()).unwrap();
        assert!(yaml.contains("frames_spectrum: 1"));
    }
}
