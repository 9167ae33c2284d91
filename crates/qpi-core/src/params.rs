//! Optical system parameters
//!
//! The reconstruction core needs exactly three numbers from the optical
//! train: the effective pixel size at the sample plane, the numerical
//! aperture of the detection objective, and the illumination wavelength.
//! Together they fix the radius of the spectral mask used during sideband
//! demodulation and a handful of derived quantities (resolution limit,
//! coherent cutoff frequency, Nyquist margin).
//!
//! ## Understanding the spectral mask radius
//!
//! A coherent imaging system passes spatial frequencies up to `NA / λ`
//! cycles per micrometre. Expressed in FFT bins over a frame of `width`
//! pixels sampled every `pixel_size` micrometres:
//!
//! ```text
//! bins = width · pixel_size · NA / λ
//! ```
//!
//! Only frequencies inside that disk carry object information; everything
//! outside it is noise and the conjugate/DC terms, which the mask removes.
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::params::OpticsParams;
//!
//! let optics = OpticsParams::builder()
//!     .pixel_size_um(0.1)
//!     .numerical_aperture(0.75)
//!     .wavelength_nm(532.0)
//!     .build();
//!
//! // 512-pixel frame: 512 · 0.1 · 0.75 / 0.532 ≈ 72 bins
//! assert_eq!(optics.mask_radius(512), 72);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{QpiError, QpiResult};

/// Optical parameters of the imaging system.
///
/// All lengths are in micrometres. `pixel_size_um` is the *effective* pixel
/// pitch at the sample plane (camera pitch divided by total magnification),
/// not the physical sensor pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticsParams {
    /// Effective pixel size at the sample plane in µm
    pub pixel_size_um: f64,
    /// Numerical aperture of the detection objective
    pub numerical_aperture: f64,
    /// Illumination wavelength in µm
    pub wavelength_um: f64,
}

impl Default for OpticsParams {
    fn default() -> Self {
        // 60x objective over a 6 µm camera pitch, green illumination
        Self {
            pixel_size_um: 0.1,
            numerical_aperture: 0.75,
            wavelength_um: 0.532,
        }
    }
}

impl OpticsParams {
    /// Create a new builder for optics parameters
    pub fn builder() -> OpticsParamsBuilder {
        OpticsParamsBuilder::default()
    }

    /// Check that every parameter is strictly positive.
    pub fn validate(&self) -> QpiResult<()> {
        if !(self.pixel_size_um > 0.0) {
            return Err(QpiError::InvalidOptics(format!(
                "pixel size must be positive, got {}",
                self.pixel_size_um
            )));
        }
        if !(self.numerical_aperture > 0.0) {
            return Err(QpiError::InvalidOptics(format!(
                "numerical aperture must be positive, got {}",
                self.numerical_aperture
            )));
        }
        if !(self.wavelength_um > 0.0) {
            return Err(QpiError::InvalidOptics(format!(
                "wavelength must be positive, got {}",
                self.wavelength_um
            )));
        }
        Ok(())
    }

    /// Spectral mask radius in FFT bins for a frame of the given width.
    ///
    /// This is `round(width · pixel_size · NA / λ)`: the coherent cutoff
    /// frequency of the objective expressed in frequency bins.
    pub fn mask_radius(&self, width: usize) -> usize {
        (width as f64 * self.pixel_size_um * self.numerical_aperture / self.wavelength_um).round()
            as usize
    }

    /// Coherent cutoff frequency in cycles per µm (`NA / λ`).
    pub fn cutoff_frequency(&self) -> f64 {
        self.numerical_aperture / self.wavelength_um
    }

    /// Rayleigh resolution limit in µm (`0.61 λ / NA`).
    pub fn rayleigh_resolution_um(&self) -> f64 {
        0.61 * self.wavelength_um / self.numerical_aperture
    }

    /// Largest pixel size that still satisfies Nyquist for the coherent
    /// cutoff (`λ / (2 NA)`), in µm.
    pub fn nyquist_pixel_size_um(&self) -> f64 {
        self.wavelength_um / (2.0 * self.numerical_aperture)
    }

    /// True when the sensor samples the field at or beyond Nyquist.
    pub fn is_nyquist_sampled(&self) -> bool {
        self.pixel_size_um <= self.nyquist_pixel_size_um()
    }
}

/// Builder for OpticsParams
#[derive(Default)]
pub struct OpticsParamsBuilder {
    params: OpticsParams,
}

impl OpticsParamsBuilder {
    pub fn pixel_size_um(mut self, um: f64) -> Self {
        self.params.pixel_size_um = um;
        self
    }

    pub fn numerical_aperture(mut self, na: f64) -> Self {
        self.params.numerical_aperture = na;
        self
    }

    pub fn wavelength_um(mut self, um: f64) -> Self {
        self.params.wavelength_um = um;
        self
    }

    /// Wavelength in nanometres, for values straight off the laser label.
    pub fn wavelength_nm(mut self, nm: f64) -> Self {
        self.params.wavelength_um = nm * 1e-3;
        self
    }

    pub fn build(self) -> OpticsParams {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mask_radius() {
        let optics = OpticsParams::builder()
            .pixel_size_um(0.1)
            .numerical_aperture(0.75)
            .wavelength_nm(532.0)
            .build();

        // 512 * 0.1 * 0.75 / 0.532 = 72.18 -> 72
        assert_eq!(optics.mask_radius(512), 72);
        // Scales linearly with frame width
        assert_eq!(optics.mask_radius(1024), 144);
    }

    #[test]
    fn test_derived_quantities() {
        let optics = OpticsParams::default();
        assert_relative_eq!(optics.cutoff_frequency(), 0.75 / 0.532, epsilon = 1e-12);
        assert_relative_eq!(
            optics.rayleigh_resolution_um(),
            0.61 * 0.532 / 0.75,
            epsilon = 1e-12
        );
        // Default pixel (0.1 µm) is well below λ/(2NA) ≈ 0.355 µm
        assert!(optics.is_nyquist_sampled());
    }

    #[test]
    fn test_undersampled_detection() {
        let optics = OpticsParams::builder()
            .pixel_size_um(0.5)
            .numerical_aperture(1.2)
            .wavelength_um(0.660)
            .build();
        assert!(!optics.is_nyquist_sampled());
    }

    #[test]
    fn test_validate() {
        assert!(OpticsParams::default().validate().is_ok());

        let bad = OpticsParams {
            numerical_aperture: 0.0,
            ..OpticsParams::default()
        };
        assert!(bad.validate().is_err());

        let nan = OpticsParams {
            wavelength_um: f64::NAN,
            ..OpticsParams::default()
        };
        assert!(nan.validate().is_err());
    }
}
