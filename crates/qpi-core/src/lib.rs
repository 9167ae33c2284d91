//! # Quantitative Phase Imaging Core
//!
//! Reconstruction core for an off-axis holographic microscope: turns raw
//! interferogram frames from the camera into quantitative phase maps by
//! Fourier-domain demodulation against a cached background reference,
//! followed by reliability-guided two-dimensional phase unwrapping.
//!
//! ## Signal Flow
//!
//! ```text
//! camera frame ─ FrameConverter ─┬─ Intensity: passthrough
//!                                ├─ Spectrum:  FFT → log10|F| → fftshift
//!                                └─ Phase:     FFT → sideband shift → mask
//!                                              → IFFT → ÷ background
//!                                              → atan2 → decimate → unwrap
//!                                              → median centre → upsample
//! ```
//!
//! The engine caches the demodulated background field and the spectral mask,
//! rebuilding both when the frame dimensions change. One engine instance is
//! single-owner; run one per worker thread for concurrent streams.
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::{DisplayMode, FrameConverter, PhaseConfig, PlotSettings, RawFrame};
//!
//! let mut converter = FrameConverter::new(PhaseConfig::default());
//! let settings = PlotSettings {
//!     mode: DisplayMode::Phase,
//!     ..Default::default()
//! };
//!
//! // Synthetic off-axis interferogram: 2 + 2cos(carrier)
//! let (w, h) = (64, 64);
//! let frame: Vec<f64> = (0..w * h)
//!     .map(|i| {
//!         let (x, y) = (i % w, i / w);
//!         let carrier = 2.0 * std::f64::consts::PI
//!             * (4.0 * x as f64 / w as f64 + 16.0 * y as f64 / h as f64);
//!         2.0 + 2.0 * carrier.cos()
//!     })
//!     .collect();
//!
//! // The first phase frame defines the background and comes back flat
//! let background = converter
//!     .convert(RawFrame::F64(&frame), w, h, &settings)
//!     .unwrap();
//! assert!(background.iter().all(|&v| v == 0.0));
//!
//! // Subsequent frames are referenced against it
//! let phase = converter
//!     .convert(RawFrame::F64(&frame), w, h, &settings)
//!     .unwrap();
//! assert_eq!(phase.len(), w * h);
//! ```

pub mod config;
pub mod convert;
pub mod fft2d;
pub mod observe;
pub mod params;
pub mod phase;
pub mod resample;
pub mod types;
pub mod unwrap;

// Re-export main types
pub use config::{ConfigError, EngineConfig, QpiConfig};
pub use convert::{DisplayMode, FrameConverter, PlotSettings};
pub use fft2d::{circshift2d, fftshift2d, ifftshift2d, Fft2d};
pub use params::OpticsParams;
pub use phase::{PhaseConfig, PhaseEngine};
pub use resample::{resample, resample_into, ResampleMode};
pub use types::{Complex, Field, FrameStats, QpiError, QpiResult, RawFrame};
pub use unwrap::{unwrap_phase, wrap_phase, UnwrapConfig, Unwrapper2D};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::QpiConfig;
    pub use crate::convert::{DisplayMode, FrameConverter, PlotSettings};
    pub use crate::params::OpticsParams;
    pub use crate::phase::{PhaseConfig, PhaseEngine};
    pub use crate::resample::{resample, ResampleMode};
    pub use crate::types::{Complex, QpiError, QpiResult, RawFrame};
    pub use crate::unwrap::{unwrap_phase, UnwrapConfig, Unwrapper2D};
}
