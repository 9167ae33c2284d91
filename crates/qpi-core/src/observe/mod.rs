//! Observability for the reconstruction core
//!
//! Two pillars:
//!
//! - **Logging**: structured events via `tracing`, configured by
//!   [`LogConfig`] and installed with [`init_logging`].
//! - **Metrics**: atomic per-converter counters, gauges and a latency
//!   histogram, exported through [`MetricsSnapshot`].
//!
//! The core itself only *emits* — debug events on spectral rebuilds and
//! background captures, counter increments in the frame converter. Sinks,
//! exporters and persistence belong to the embedding application.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use qpi_core::observe::{self, LogConfig};
//!
//! let metrics = observe::init(&LogConfig::default());
//! metrics.frames_phase.inc();
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use metrics::{Counter, Gauge, Histogram, Metrics, MetricsSnapshot};

/// Set up logging and hand back a fresh metrics registry.
pub fn init(log_config: &LogConfig) -> Metrics {
    init_logging(log_config);
    Metrics::new()
}
