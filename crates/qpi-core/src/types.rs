//! Core types for quantitative phase imaging
//!
//! This module defines the fundamental types shared by the reconstruction
//! pipeline: complex field buffers, raw camera frames, and the crate error
//! type.
//!
//! ## Understanding interferogram frames
//!
//! The camera only records intensity, but an off-axis interferogram encodes
//! the full complex field: interference with a tilted reference beam shifts
//! the object spectrum away from DC, so the Fourier transform of a single
//! intensity frame contains a sideband lobe that carries amplitude *and*
//! phase.
//!
//! ```text
//!         spatial frequency (y)
//!         ^
//!         |        .-.
//!         |       ( + )   <- sideband (complex field, demodulated)
//!         |        `-'
//!         |   .---.
//!         |  ( DC  )      <- autocorrelation / DC term
//!         |   `---'
//!         |        .-.
//!         |       ( - )   <- conjugate sideband (discarded)
//!         +------------------> spatial frequency (x)
//! ```
//!
//! Demodulation isolates the sideband, producing a complex field whose
//! argument is the wrapped phase delay introduced by the specimen.

use num_complex::Complex64;
use std::borrow::Cow;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A complex optical field sampled on the camera grid, flat row-major
pub type Field = Vec<Complex64>;

/// Result type for reconstruction operations
pub type QpiResult<T> = Result<T, QpiError>;

/// Errors that can occur during frame conversion and configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum QpiError {
    #[error("frame buffer holds {actual} pixels but {width}x{height} needs {expected}")]
    FrameSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid optics parameter: {0}")]
    InvalidOptics(String),
}

/// A borrowed single-channel camera frame in its native element type.
///
/// Cameras deliver 8-bit or 16-bit unsigned pixels; computed images (test
/// patterns, simulated interferograms) arrive as f64. Keeping the native
/// representation avoids a float conversion for every displayed intensity
/// frame — only the phase/spectrum paths need f64 input.
#[derive(Debug, Clone, Copy)]
pub enum RawFrame<'a> {
    /// 8-bit unsigned pixels (0-255)
    U8(&'a [u8]),
    /// 16-bit unsigned pixels (0-65535)
    U16(&'a [u16]),
    /// 64-bit floating point pixels
    F64(&'a [f64]),
}

impl<'a> RawFrame<'a> {
    /// Number of pixels in the buffer.
    pub fn len(&self) -> usize {
        match self {
            RawFrame::U8(data) => data.len(),
            RawFrame::U16(data) => data.len(),
            RawFrame::F64(data) => data.len(),
        }
    }

    /// Returns true if the buffer contains no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per pixel of the native representation.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            RawFrame::U8(_) => 1,
            RawFrame::U16(_) => 2,
            RawFrame::F64(_) => 8,
        }
    }

    /// Pixel data as f64, zero-copy for the `F64` variant.
    pub fn to_f64(&self) -> Cow<'a, [f64]> {
        match self {
            RawFrame::U8(data) => Cow::Owned(data.iter().map(|&v| v as f64).collect()),
            RawFrame::U16(data) => Cow::Owned(data.iter().map(|&v| v as f64).collect()),
            RawFrame::F64(data) => Cow::Borrowed(data),
        }
    }
}

/// Simple statistics over a reconstructed frame.
///
/// The plotting layer uses these for autoscaled colour ranges; they are
/// also handy in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Number of pixels
    pub num_pixels: usize,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
}

impl FrameStats {
    /// Compute statistics over a frame. An empty frame yields all zeros.
    pub fn compute(frame: &[f64]) -> Self {
        if frame.is_empty() {
            return Self {
                num_pixels: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in frame {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        Self {
            num_pixels: frame.len(),
            min,
            max,
            mean: sum / frame.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_raw_frame_lengths() {
        let bytes = [0u8, 128, 255];
        let words = [0u16, 1024, 65535];
        let floats = [0.0f64, 0.5, 1.0];

        assert_eq!(RawFrame::U8(&bytes).len(), 3);
        assert_eq!(RawFrame::U16(&words).len(), 3);
        assert_eq!(RawFrame::F64(&floats).len(), 3);
        assert!(!RawFrame::U8(&bytes).is_empty());
        assert_eq!(RawFrame::U16(&words).bytes_per_pixel(), 2);
    }

    #[test]
    fn test_raw_frame_to_f64() {
        let words = [0u16, 100, 65535];
        let converted = RawFrame::U16(&words).to_f64();
        assert_eq!(converted.as_ref(), &[0.0, 100.0, 65535.0]);

        // F64 input must not allocate
        let floats = [1.0f64, 2.0];
        match RawFrame::F64(&floats).to_f64() {
            Cow::Borrowed(slice) => assert_eq!(slice, &floats),
            Cow::Owned(_) => panic!("F64 conversion should borrow"),
        }
    }

    #[test]
    fn test_frame_stats() {
        let frame = [1.0, 2.0, 3.0, 4.0];
        let stats = FrameStats::compute(&frame);
        assert_eq!(stats.num_pixels, 4);
        assert_relative_eq!(stats.min, 1.0);
        assert_relative_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.mean, 2.5);

        let empty = FrameStats::compute(&[]);
        assert_eq!(empty.num_pixels, 0);
        assert_eq!(empty.mean, 0.0);
    }

    #[test]
    fn test_error_display() {
        let err = QpiError::FrameSize {
            width: 4,
            height: 4,
            expected: 16,
            actual: 12,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("16"));
        assert!(msg.contains("12"));
    }
}
