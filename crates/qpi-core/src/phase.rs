//! Phase Engine — off-axis interferogram demodulation
//!
//! Turns single-camera intensity frames into quantitative phase maps:
//!
//! ```text
//! frame → [FFT] → sideband search → circshift → mask → [IFFT]
//!       → ÷ background field → atan2 → 2× decimate → unwrap
//!       → median centre → 2× upsample → phase map (radians)
//! ```
//!
//! The engine owns its FFT plans, the complex spectrum buffer, the spectral
//! mask, and the cached background field; all four are rebuilt whenever the
//! frame dimensions change. The background is captured lazily on the first
//! phase computation, or again whenever a refresh is requested, by stopping
//! the pipeline after the masked inverse transform and caching that field.
//!
//! One engine instance is single-owner: calls are synchronous and CPU-bound,
//! there is no internal locking, and the background cache is not atomic.
//! Callers that need concurrent throughput run one engine per worker thread
//! and keep each engine's call stream serialised.
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::phase::{PhaseConfig, PhaseEngine};
//!
//! let mut engine = PhaseEngine::new(PhaseConfig::default());
//! let (w, h) = (64, 64);
//!
//! // Off-axis interferogram: intensity 2 + 2cos(carrier)
//! let frame: Vec<f64> = (0..w * h)
//!     .map(|i| {
//!         let (x, y) = (i % w, i / w);
//!         let carrier = 2.0 * std::f64::consts::PI
//!             * (4.0 * x as f64 / w as f64 + 16.0 * y as f64 / h as f64);
//!         2.0 + 2.0 * carrier.cos()
//!     })
//!     .collect();
//!
//! // First call defines the background and returns a flat map
//! let background = engine.calculate_phase(&frame, w, h);
//! assert!(background.iter().all(|&v| v == 0.0));
//! assert!(engine.has_background());
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::fft2d::{circshift2d, fftshift2d, Fft2d};
use crate::params::OpticsParams;
use crate::resample::{resample, ResampleMode};
use crate::unwrap::{UnwrapConfig, Unwrapper2D};

/// Magnitude floor for the log-spectrum display; zero bins clip here.
const SPECTRUM_MAG_FLOOR: f64 = 1e-30;

/// Phase engine configuration.
///
/// The sideband search band and the division floor are deliberately
/// configurable: the band encodes the reference-beam tilt of a particular
/// optical alignment, and the floor is the policy applied to dead background
/// pixels during complex division.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Optical parameters fixing the spectral mask radius
    pub optics: OpticsParams,
    /// Lower bound of the sideband search band, fraction of frame height.
    /// Default: 0.05
    pub search_min_frac: f64,
    /// Upper bound of the sideband search band, fraction of frame height.
    /// Keeping the band below 0.5 avoids the DC autocorrelation peak.
    /// Default: 0.45
    pub search_max_frac: f64,
    /// Floor applied to `|background|²` in the complex division. Default: 1e-12
    pub background_floor: f64,
    /// Tie-break seed forwarded to the unwrapper. Default: 42
    pub unwrap_seed: u64,
    /// Decimation factor applied to the wrapped map before unwrapping.
    /// Default: 2
    pub unwrap_decimation: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            optics: OpticsParams::default(),
            search_min_frac: 0.05,
            search_max_frac: 0.45,
            background_floor: 1e-12,
            unwrap_seed: 42,
            unwrap_decimation: 2,
        }
    }
}

/// Quantitative phase reconstruction engine.
///
/// Owns the complex spectrum buffer, the spectral mask, the FFT plans and
/// the background reference; see the module docs for the ownership and
/// concurrency contract.
#[derive(Debug)]
pub struct PhaseEngine {
    config: PhaseConfig,
    width: usize,
    height: usize,
    fft: Option<Fft2d>,
    /// Complex spectrum buffer; invariant `len == width * height`
    spectrum: Vec<Complex64>,
    /// Binary occupancy of the sideband disk, one cell per frequency bin
    mask: Vec<u8>,
    mask_radius: usize,
    /// Demodulated background field, valid when `has_background`
    background: Vec<Complex64>,
    has_background: bool,
    refresh_pending: bool,
    /// Detected sideband peak relative to the spectrum centre
    sideband: Option<(isize, isize)>,
    unwrapper: Unwrapper2D,
}

impl PhaseEngine {
    /// Create an engine; buffers are allocated on the first frame.
    pub fn new(config: PhaseConfig) -> Self {
        let unwrap_config = UnwrapConfig {
            seed: config.unwrap_seed,
            ..UnwrapConfig::default()
        };
        Self {
            config,
            width: 0,
            height: 0,
            fft: None,
            spectrum: Vec::new(),
            mask: Vec::new(),
            mask_radius: 0,
            background: Vec::new(),
            has_background: false,
            refresh_pending: false,
            sideband: None,
            unwrapper: Unwrapper2D::new(unwrap_config),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// True once a background reference has been captured for the current
    /// frame dimensions.
    pub fn has_background(&self) -> bool {
        self.has_background
    }

    /// Detected sideband peak position relative to the spectrum centre,
    /// once a background has been captured.
    pub fn sideband(&self) -> Option<(isize, isize)> {
        self.sideband
    }

    /// Spectral mask radius in bins for the current frame width.
    pub fn mask_radius(&self) -> usize {
        self.mask_radius
    }

    /// Arm the one-shot background refresh flag; the next
    /// [`Self::calculate_phase`] call re-captures the background.
    pub fn request_background_refresh(&mut self) {
        self.refresh_pending = true;
    }

    /// Reconstruct the unwrapped, median-centred phase map of a frame.
    ///
    /// A background-defining call (first frame, after a dimension change, or
    /// after [`Self::request_background_refresh`]) caches the demodulated
    /// field and returns an identically zero map: a frame referenced to
    /// itself is flat.
    pub fn calculate_phase(&mut self, frame: &[f64], width: usize, height: usize) -> Vec<f64> {
        if self.demodulate(frame, width, height) {
            return vec![0.0; width * height];
        }

        let floor = self.config.background_floor;
        let wrapped: Vec<f64> = self
            .spectrum
            .iter()
            .zip(self.background.iter())
            .map(|(s, r)| {
                let denom = r.norm_sqr().max(floor);
                let re = (s.re * r.re + s.im * r.im) / denom;
                let im = (s.im * r.re - s.re * r.im) / denom;
                im.atan2(re)
            })
            .collect();

        // Unwrap on a decimated copy of the wrapped map; nearest-neighbour
        // decimation keeps the 2π discontinuities sharp.
        let dw = (width / self.config.unwrap_decimation).max(1);
        let dh = (height / self.config.unwrap_decimation).max(1);
        let small = resample(&wrapped, width, height, dw, dh, ResampleMode::Nearest);
        let mut unwrapped = self.unwrapper.unwrap(&small, dw, dh);

        let centre = median(&unwrapped);
        for v in unwrapped.iter_mut() {
            *v -= centre;
        }

        resample(&unwrapped, dw, dh, width, height, ResampleMode::Linear)
    }

    /// Log-magnitude spectrum for display: `log10(|F| / (w·h))`, DC shifted
    /// to the centre. No masking, no unwrapping.
    pub fn calculate_spectrum(&mut self, frame: &[f64], width: usize, height: usize) -> Vec<f64> {
        self.ensure_dimensions(width, height);
        self.transform_frame(frame);

        let n = (width * height) as f64;
        let mut out: Vec<f64> = self
            .spectrum
            .iter()
            .map(|c| (c.norm() / n).max(SPECTRUM_MAG_FLOOR).log10())
            .collect();
        fftshift2d(&mut out, width, height);
        out
    }

    /// Demodulated, background-normalised complex field.
    ///
    /// This is the quantity a tomographic stacker consumes: amplitude and
    /// wrapped phase in one buffer, before any unwrapping. A
    /// background-defining call returns the unit field.
    pub fn calculate_field(
        &mut self,
        frame: &[f64],
        width: usize,
        height: usize,
    ) -> Vec<Complex64> {
        if self.demodulate(frame, width, height) {
            return vec![Complex64::new(1.0, 0.0); width * height];
        }

        let floor = self.config.background_floor;
        self.spectrum
            .iter()
            .zip(self.background.iter())
            .map(|(s, r)| {
                let denom = r.norm_sqr().max(floor);
                Complex64::new(
                    (s.re * r.re + s.im * r.im) / denom,
                    (s.im * r.re - s.re * r.im) / denom,
                )
            })
            .collect()
    }

    /// Transform, shift the sideband to the origin, mask, inverse-transform.
    ///
    /// Leaves the demodulated spatial field in `self.spectrum` and returns
    /// true when this call (re)defined the background reference.
    fn demodulate(&mut self, frame: &[f64], width: usize, height: usize) -> bool {
        self.ensure_dimensions(width, height);
        self.transform_frame(frame);

        let defining = !self.has_background || self.refresh_pending;
        if defining {
            self.detect_sideband();
        }

        let (px, py) = self.sideband_bin();
        circshift2d(
            &mut self.spectrum,
            width,
            height,
            (width - px) % width,
            (height - py) % height,
        );
        for (s, &m) in self.spectrum.iter_mut().zip(self.mask.iter()) {
            if m == 0 {
                *s = Complex64::new(0.0, 0.0);
            }
        }
        if let Some(fft) = self.fft.as_mut() {
            fft.inverse(&mut self.spectrum);
        }

        if defining {
            self.background.clear();
            self.background.extend_from_slice(&self.spectrum);
            self.has_background = true;
            self.refresh_pending = false;
            tracing::debug!(
                width,
                height,
                sideband = ?self.sideband,
                "background reference captured"
            );
        }
        defining
    }

    /// Copy the real frame into the complex buffer and forward-transform.
    fn transform_frame(&mut self, frame: &[f64]) {
        assert_eq!(frame.len(), self.width * self.height, "frame length mismatch");
        for (dst, &v) in self.spectrum.iter_mut().zip(frame.iter()) {
            *dst = Complex64::new(v, 0.0);
        }
        if let Some(fft) = self.fft.as_mut() {
            fft.forward(&mut self.spectrum);
        }
    }

    /// Locate the strongest bin inside the vertical search band and store it
    /// relative to the spectrum centre.
    ///
    /// The band (5–45 % of the rows by default) excludes row 0, where the
    /// unshifted DC peak would otherwise always win.
    fn detect_sideband(&mut self) {
        let (w, h) = (self.width, self.height);
        let y_start = (self.config.search_min_frac * h as f64).round() as usize;
        let y_end = ((self.config.search_max_frac * h as f64).round() as usize)
            .max(y_start + 1)
            .min(h);

        let mut best = (0usize, y_start.min(h - 1));
        let mut best_power = f64::NEG_INFINITY;
        for y in y_start..y_end {
            for x in 0..w {
                let power = self.spectrum[y * w + x].norm_sqr();
                if power > best_power {
                    best_power = power;
                    best = (x, y);
                }
            }
        }

        self.sideband = Some((
            best.0 as isize - (w / 2) as isize,
            best.1 as isize - (h / 2) as isize,
        ));
    }

    /// Stored sideband position mapped back to unshifted bin coordinates.
    fn sideband_bin(&self) -> (usize, usize) {
        let (w, h) = (self.width as isize, self.height as isize);
        match self.sideband {
            Some((sx, sy)) => (
                (sx + w / 2).rem_euclid(w) as usize,
                (sy + h / 2).rem_euclid(h) as usize,
            ),
            None => (0, 0),
        }
    }

    /// Rebuild plans, buffers and mask when the frame dimensions change.
    /// The background reference does not survive a rebuild.
    fn ensure_dimensions(&mut self, width: usize, height: usize) {
        assert!(width > 0 && height > 0, "frame dimensions must be positive");
        if self.width == width && self.height == height {
            return;
        }
        tracing::debug!(
            from_width = self.width,
            from_height = self.height,
            width,
            height,
            "frame dimensions changed, rebuilding spectral state"
        );

        self.width = width;
        self.height = height;
        self.fft = Some(Fft2d::new(width, height));
        self.spectrum.clear();
        self.spectrum
            .resize(width * height, Complex64::new(0.0, 0.0));
        self.rebuild_mask();
        self.background.clear();
        self.has_background = false;
        self.sideband = None;
    }

    /// Occupancy disk of radius `mask_radius` about the DC bin. Distances
    /// use wrap-around per axis, so the disk folds across the array edges
    /// the way a corner-centred disk on an unshifted spectrum does.
    fn rebuild_mask(&mut self) {
        let (w, h) = (self.width, self.height);
        self.mask_radius = self.config.optics.mask_radius(w);
        let r2 = (self.mask_radius * self.mask_radius) as f64;

        self.mask.clear();
        self.mask.resize(w * h, 0);
        for y in 0..h {
            let dy = y.min(h - y) as f64;
            for x in 0..w {
                let dx = x.min(w - x) as f64;
                if dx * dx + dy * dy <= r2 {
                    self.mask[y * w + x] = 1;
                }
            }
        }
    }
}

/// Median via order statistics: mean of the two central elements for even
/// counts, so the centring step is exact under block-replicating upsampling.
fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut scratch = values.to_vec();
    let n = scratch.len();
    let (lower, upper_mid, _) = scratch.select_nth_unstable_by(n / 2, f64::total_cmp);
    let hi = *upper_mid;
    if n % 2 == 1 {
        hi
    } else {
        let lo = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        0.5 * (lo + hi)
    }
}
