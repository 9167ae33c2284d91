//! Frame Converter — per-frame display-mode dispatch
//!
//! Thin layer between the acquisition loop and the [`PhaseEngine`]: picks
//! the processing path from the plot settings, validates the raw buffer
//! size, and arms the engine's one-shot background refresh on request.
//!
//! ```text
//! RawFrame ──┬─ Intensity ─ passthrough ───────────┐
//!            ├─ Spectrum ── engine.calculate_spectrum ├─ Vec<f64>
//!            └─ Phase ───── engine.calculate_phase ──┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::observe::Metrics;
use crate::phase::{PhaseConfig, PhaseEngine};
use crate::types::{QpiError, QpiResult, RawFrame};

/// Display mode selecting the processing path for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Raw camera intensity, passed through unchanged
    Intensity,
    /// Log-magnitude Fourier spectrum
    Spectrum,
    /// Unwrapped quantitative phase in radians
    Phase,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::Intensity
    }
}

/// Display settings consumed per frame.
///
/// Only `mode` routes processing; the colour range fields ride along for the
/// plotting layer, which applies them after conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    /// Processing path selector
    pub mode: DisplayMode,
    /// Lower colour-range bound
    pub color_min: f64,
    /// Upper colour-range bound
    pub color_max: f64,
    /// Rescale the colour range to the frame extrema each frame
    pub autoscale: bool,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Intensity,
            color_min: 0.0,
            color_max: 1.0,
            autoscale: true,
        }
    }
}

/// Per-frame dispatcher feeding raw camera buffers to the phase engine.
#[derive(Debug)]
pub struct FrameConverter {
    engine: PhaseEngine,
    metrics: Metrics,
    last_dims: Option<(usize, usize)>,
}

impl FrameConverter {
    /// Create a converter with its own phase engine.
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            engine: PhaseEngine::new(config),
            metrics: Metrics::new(),
            last_dims: None,
        }
    }

    /// The wrapped phase engine.
    pub fn engine(&self) -> &PhaseEngine {
        &self.engine
    }

    /// Conversion metrics for this converter.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Arm the engine's one-shot background refresh; consumed by the next
    /// phase-mode conversion.
    pub fn update_background(&mut self) {
        self.metrics.background_refreshes.inc();
        self.engine.request_background_refresh();
    }

    /// Convert one raw frame according to the display settings.
    ///
    /// Returns a same-size f64 buffer: raw intensity, log-magnitude, or
    /// unwrapped phase in radians. The only fallible check is the buffer
    /// length; everything deeper treats bad dimensions as contract
    /// violations.
    pub fn convert(
        &mut self,
        frame: RawFrame<'_>,
        width: usize,
        height: usize,
        settings: &PlotSettings,
    ) -> QpiResult<Vec<f64>> {
        let expected = width * height;
        if frame.len() != expected {
            return Err(QpiError::FrameSize {
                width,
                height,
                expected,
                actual: frame.len(),
            });
        }

        if self.last_dims != Some((width, height)) {
            if self.last_dims.is_some() {
                self.metrics.dimension_rebuilds.inc();
            }
            self.last_dims = Some((width, height));
            self.metrics.frame_width.set(width as i64);
            self.metrics.frame_height.set(height as i64);
        }

        let started = Instant::now();
        let out = match settings.mode {
            DisplayMode::Intensity => {
                self.metrics.frames_intensity.inc();
                frame.to_f64().into_owned()
            }
            DisplayMode::Spectrum => {
                self.metrics.frames_spectrum.inc();
                self.engine.calculate_spectrum(&frame.to_f64(), width, height)
            }
            DisplayMode::Phase => {
                self.metrics.frames_phase.inc();
                self.engine.calculate_phase(&frame.to_f64(), width, height)
            }
        };
        self.metrics
            .convert_latency_us
            .observe(started.elapsed().as_secs_f64() * 1e6);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn carrier_frame(w: usize, h: usize) -> Vec<f64> {
        (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                let carrier = 2.0 * PI * (4.0 * x as f64 / w as f64 + 16.0 * y as f64 / h as f64);
                2.0 + 2.0 * carrier.cos()
            })
            .collect()
    }

    fn settings(mode: DisplayMode) -> PlotSettings {
        PlotSettings {
            mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_intensity_passthrough() {
        let mut converter = FrameConverter::new(PhaseConfig::default());
        let pixels: Vec<u8> = (0..12).collect();
        let out = converter
            .convert(RawFrame::U8(&pixels), 4, 3, &settings(DisplayMode::Intensity))
            .unwrap();
        assert_eq!(out, (0..12).map(|v| v as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_buffer_length_mismatch() {
        let mut converter = FrameConverter::new(PhaseConfig::default());
        let pixels = [0u16; 10];
        let err = converter
            .convert(RawFrame::U16(&pixels), 4, 3, &settings(DisplayMode::Intensity))
            .unwrap_err();
        assert!(matches!(
            err,
            QpiError::FrameSize {
                expected: 12,
                actual: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_spectrum_mode_output_size() {
        let mut converter = FrameConverter::new(PhaseConfig::default());
        let frame = carrier_frame(64, 64);
        let out = converter
            .convert(RawFrame::F64(&frame), 64, 64, &settings(DisplayMode::Spectrum))
            .unwrap();
        assert_eq!(out.len(), 64 * 64);
        assert_eq!(converter.metrics().frames_spectrum.get(), 1);
    }

    #[test]
    fn test_phase_mode_defines_background_first() {
        let mut converter = FrameConverter::new(PhaseConfig::default());
        let frame = carrier_frame(64, 64);

        let first = converter
            .convert(RawFrame::F64(&frame), 64, 64, &settings(DisplayMode::Phase))
            .unwrap();
        assert!(first.iter().all(|&v| v == 0.0));
        assert!(converter.engine().has_background());

        let second = converter
            .convert(RawFrame::F64(&frame), 64, 64, &settings(DisplayMode::Phase))
            .unwrap();
        assert!(second.iter().all(|&v| v.abs() < 1e-9));
        assert_eq!(converter.metrics().frames_phase.get(), 2);
    }

    #[test]
    fn test_update_background_rearms_engine() {
        let mut converter = FrameConverter::new(PhaseConfig::default());
        let frame = carrier_frame(64, 64);
        let phase = settings(DisplayMode::Phase);

        converter.convert(RawFrame::F64(&frame), 64, 64, &phase).unwrap();
        converter.update_background();
        let redefined = converter.convert(RawFrame::F64(&frame), 64, 64, &phase).unwrap();
        assert!(redefined.iter().all(|&v| v == 0.0));
        assert_eq!(converter.metrics().background_refreshes.get(), 1);
    }

    #[test]
    fn test_dimension_rebuild_counted() {
        let mut converter = FrameConverter::new(PhaseConfig::default());
        let intensity = settings(DisplayMode::Intensity);

        let a = vec![1.0; 16];
        let b = vec![1.0; 64];
        converter.convert(RawFrame::F64(&a), 4, 4, &intensity).unwrap();
        assert_eq!(converter.metrics().dimension_rebuilds.get(), 0);
        converter.convert(RawFrame::F64(&b), 8, 8, &intensity).unwrap();
        assert_eq!(converter.metrics().dimension_rebuilds.get(), 1);
        assert_eq!(converter.metrics().frame_width.get(), 8);
    }

    #[test]
    fn test_display_mode_serde() {
        let yaml = serde_yaml::to_string(&DisplayMode::Phase).unwrap();
        assert_eq!(yaml.trim(), "phase");
        let mode: DisplayMode = serde_yaml::from_str("spectrum").unwrap();
        assert_eq!(mode, DisplayMode::Spectrum);
    }
}
