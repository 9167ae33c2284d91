//! 2D FFT processor for interferogram spectra
//!
//! Wraps `rustfft` row/column transforms behind a processor that owns its
//! plans and scratch storage, so the per-frame hot path never allocates.
//! Also provides the circular-shift helpers the demodulation step is built
//! from.
//!
//! ## Why separable transforms
//!
//! A 2D DFT factorises into a 1D DFT along every row followed by a 1D DFT
//! along every column. `rustfft` supplies fast 1D plans for arbitrary sizes
//! (camera ROIs are not always powers of two), so the 2D transform is a
//! row pass over the flat buffer plus a gather/transform/scatter pass per
//! column.
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::fft2d::Fft2d;
//! use num_complex::Complex64;
//!
//! let mut fft = Fft2d::new(8, 4);
//! let mut data = vec![Complex64::new(1.0, 0.0); 32];
//! fft.forward(&mut data);
//! // A constant frame transforms to a single DC bin of value w*h
//! assert!((data[0].re - 32.0).abs() < 1e-9);
//! assert!(data[1].norm() < 1e-9);
//! ```

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Two-dimensional FFT processor with cached plans.
pub struct Fft2d {
    width: usize,
    height: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
    /// Scratch buffer sized for the largest plan
    scratch: Vec<Complex64>,
    /// Gather buffer for column transforms
    column: Vec<Complex64>,
}

impl fmt::Debug for Fft2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft2d")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Fft2d {
    /// Create a processor for `width`×`height` frames.
    pub fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        let row_forward = planner.plan_fft_forward(width);
        let row_inverse = planner.plan_fft_inverse(width);
        let col_forward = planner.plan_fft_forward(height);
        let col_inverse = planner.plan_fft_inverse(height);

        let scratch_len = row_forward
            .get_inplace_scratch_len()
            .max(row_inverse.get_inplace_scratch_len())
            .max(col_forward.get_inplace_scratch_len())
            .max(col_inverse.get_inplace_scratch_len());

        Self {
            width,
            height,
            row_forward,
            row_inverse,
            col_forward,
            col_inverse,
            scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
            column: vec![Complex64::new(0.0, 0.0); height],
        }
    }

    /// Frame width this processor was planned for.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height this processor was planned for.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Forward 2D FFT in place. DC ends up at index 0 (unshifted layout).
    pub fn forward(&mut self, data: &mut [Complex64]) {
        assert_eq!(data.len(), self.width * self.height);

        for row in data.chunks_exact_mut(self.width) {
            self.row_forward.process_with_scratch(row, &mut self.scratch);
        }
        for x in 0..self.width {
            for y in 0..self.height {
                self.column[y] = data[y * self.width + x];
            }
            self.col_forward
                .process_with_scratch(&mut self.column, &mut self.scratch);
            for y in 0..self.height {
                data[y * self.width + x] = self.column[y];
            }
        }
    }

    /// Inverse 2D FFT in place, normalised by `1/(width·height)`.
    pub fn inverse(&mut self, data: &mut [Complex64]) {
        assert_eq!(data.len(), self.width * self.height);

        for row in data.chunks_exact_mut(self.width) {
            self.row_inverse.process_with_scratch(row, &mut self.scratch);
        }
        for x in 0..self.width {
            for y in 0..self.height {
                self.column[y] = data[y * self.width + x];
            }
            self.col_inverse
                .process_with_scratch(&mut self.column, &mut self.scratch);
            for y in 0..self.height {
                data[y * self.width + x] = self.column[y];
            }
        }

        let scale = 1.0 / (self.width * self.height) as f64;
        for sample in data.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Circularly shift a row-major 2D buffer in place.
///
/// Element `(x, y)` moves to `((x + shift_x) mod w, (y + shift_y) mod h)`.
/// Shifting by a full period is a no-op. A vertical shift is one rotation
/// of the flat buffer by whole rows; a horizontal shift rotates each row.
pub fn circshift2d<T>(data: &mut [T], width: usize, height: usize, shift_x: usize, shift_y: usize) {
    assert_eq!(data.len(), width * height);
    if width == 0 || height == 0 {
        return;
    }

    let sy = shift_y % height;
    if sy != 0 {
        data.rotate_right(sy * width);
    }
    let sx = shift_x % width;
    if sx != 0 {
        for row in data.chunks_exact_mut(width) {
            row.rotate_right(sx);
        }
    }
}

/// Move the DC bin to the centre of the grid (display layout).
///
/// Shifts by `floor(dim/2)` per axis; for even dimensions this swaps the
/// array halves, and applying it twice is the identity.
pub fn fftshift2d<T>(data: &mut [T], width: usize, height: usize) {
    circshift2d(data, width, height, width / 2, height / 2);
}

/// Inverse of [`fftshift2d`]: move the centre bin back to index 0.
///
/// Shifts by `ceil(dim/2)` per axis so that
/// `ifftshift2d(fftshift2d(x)) == x` for odd dimensions as well.
pub fn ifftshift2d<T>(data: &mut [T], width: usize, height: usize) {
    if width == 0 || height == 0 {
        return;
    }
    circshift2d(data, width, height, width - width / 2, height - height / 2);
}
