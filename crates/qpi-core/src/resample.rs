//! Grid Resampler — nearest-neighbour and area-weighted rescaling
//!
//! Resamples a flat row-major image between two 2D grids. Two modes:
//!
//! - **Nearest**: each destination pixel takes the value of the closest
//!   source pixel. Used to decimate *wrapped* phase maps, where any kind of
//!   interpolation would smear values across 2π discontinuities.
//! - **Linear**: exact area-weighted accumulation. Each destination cell
//!   integrates every overlapping source cell weighted by the overlap area,
//!   then divides by the destination cell area. This preserves the local
//!   mean for both up- and down-sampling (it is *not* bilinear point
//!   sampling).
//!
//! Both modes are pure functions of their input: no hidden state, fully
//! deterministic, restartable.
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::resample::{resample, ResampleMode};
//!
//! // 4x4 ramp averaged down to 2x2 quadrant means
//! let src: Vec<f64> = (1..=16).map(|v| v as f64).collect();
//! let dst = resample(&src, 4, 4, 2, 2, ResampleMode::Linear);
//! assert_eq!(dst, vec![3.5, 5.5, 11.5, 13.5]);
//! ```

/// Resampling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMode {
    /// Closest source pixel, no interpolation.
    Nearest,
    /// Exact area-weighted averaging over the cell footprint.
    Linear,
}

/// Resample a `src_w`×`src_h` image to `dst_w`×`dst_h`.
///
/// Zero-sized dimensions yield an empty output; validating dimensions is
/// the caller's job.
pub fn resample(
    src: &[f64],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
    mode: ResampleMode,
) -> Vec<f64> {
    let mut dst = Vec::new();
    resample_into(src, src_w, src_h, dst_w, dst_h, mode, &mut dst);
    dst
}

/// Like [`resample`] but reuses the destination allocation.
pub fn resample_into(
    src: &[f64],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
    mode: ResampleMode,
    dst: &mut Vec<f64>,
) {
    dst.clear();
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return;
    }
    debug_assert_eq!(src.len(), src_w * src_h);

    dst.resize(dst_w * dst_h, 0.0);
    match mode {
        ResampleMode::Nearest => nearest(src, src_w, src_h, dst_w, dst_h, dst),
        ResampleMode::Linear => area_weighted(src, src_w, src_h, dst_w, dst_h, dst),
    }
}

fn nearest(src: &[f64], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize, dst: &mut [f64]) {
    // Destination pixel centres mapped back onto the source grid. The index
    // arithmetic can land on the boundary at the last output pixel, so clamp
    // to the valid range.
    let map = |i: usize, src_dim: usize, dst_dim: usize| -> usize {
        let pos = (i as f64 + 0.5) * src_dim as f64 / dst_dim as f64 - 0.5;
        (pos.round().max(0.0) as usize).min(src_dim - 1)
    };

    for y in 0..dst_h {
        let sy = map(y, src_h, dst_h);
        let row = &src[sy * src_w..(sy + 1) * src_w];
        for x in 0..dst_w {
            dst[y * dst_w + x] = row[map(x, src_w, dst_w)];
        }
    }
}

fn area_weighted(
    src: &[f64],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
    dst: &mut [f64],
) {
    let scale_x = src_w as f64 / dst_w as f64;
    let scale_y = src_h as f64 / dst_h as f64;
    let inv_area = 1.0 / (scale_x * scale_y);

    for y in 0..dst_h {
        // Vertical footprint of this destination row on the source grid
        let y0 = y as f64 * scale_y;
        let y1 = y0 + scale_y;
        let iy0 = y0.floor() as usize;
        let iy1 = (y1.ceil() as usize).min(src_h);

        for x in 0..dst_w {
            let x0 = x as f64 * scale_x;
            let x1 = x0 + scale_x;
            let ix0 = x0.floor() as usize;
            let ix1 = (x1.ceil() as usize).min(src_w);

            let mut acc = 0.0;
            for yy in iy0..iy1 {
                let overlap_y = ((yy + 1) as f64).min(y1) - (yy as f64).max(y0);
                if overlap_y <= 0.0 {
                    continue;
                }
                let row = &src[yy * src_w..(yy + 1) * src_w];
                for (xx, &v) in row.iter().enumerate().take(ix1).skip(ix0) {
                    let overlap_x = ((xx + 1) as f64).min(x1) - (xx as f64).max(x0);
                    if overlap_x > 0.0 {
                        acc += v * overlap_x * overlap_y;
                    }
                }
            }
            dst[y * dst_w + x] = acc * inv_area;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_abs_error(a: &[f64], b: f64) -> f64 {
        a.iter().map(|v| (v - b).abs()).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn test_linear_3x3_to_2x2_exact() {
        let src: Vec<f64> = (1..=9).map(|v| v as f64).collect();
        let dst = resample(&src, 3, 3, 2, 2, ResampleMode::Linear);
        let expected = [5.25 / 2.25, 8.25 / 2.25, 14.25 / 2.25, 17.25 / 2.25];
        for (got, want) in dst.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_linear_4x4_to_2x2_exact() {
        let src: Vec<f64> = (1..=16).map(|v| v as f64).collect();
        let dst = resample(&src, 4, 4, 2, 2, ResampleMode::Linear);
        assert_eq!(dst, vec![3.5, 5.5, 11.5, 13.5]);
    }

    #[test]
    fn test_nearest_2x2_to_4x4_block_replication() {
        let src = vec![1.0, 2.0, 3.0, 4.0];
        let dst = resample(&src, 2, 2, 4, 4, ResampleMode::Nearest);
        let expected = vec![
            1.0, 1.0, 2.0, 2.0, //
            1.0, 1.0, 2.0, 2.0, //
            3.0, 3.0, 4.0, 4.0, //
            3.0, 3.0, 4.0, 4.0,
        ];
        assert_eq!(dst, expected);
    }

    #[test]
    fn test_uniform_preserved_downsample() {
        let src = vec![7.25; 640 * 512];
        for mode in [ResampleMode::Nearest, ResampleMode::Linear] {
            let dst = resample(&src, 640, 512, 320, 256, mode);
            assert_eq!(dst.len(), 320 * 256);
            assert!(
                mean_abs_error(&dst, 7.25) < 1e-5,
                "{mode:?} broke uniformity"
            );
        }
    }

    #[test]
    fn test_uniform_preserved_upsample() {
        let src = vec![-3.5; 640 * 512];
        for mode in [ResampleMode::Nearest, ResampleMode::Linear] {
            let dst = resample(&src, 640, 512, 1280, 1024, mode);
            assert_eq!(dst.len(), 1280 * 1024);
            assert!(
                mean_abs_error(&dst, -3.5) < 1e-5,
                "{mode:?} broke uniformity"
            );
        }
    }

    #[test]
    fn test_identity() {
        let src: Vec<f64> = (0..35).map(|v| v as f64 * 0.3).collect();
        for mode in [ResampleMode::Nearest, ResampleMode::Linear] {
            let dst = resample(&src, 7, 5, 7, 5, mode);
            for (a, b) in src.iter().zip(dst.iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_non_integer_ratio_mean_preserved() {
        // Area weighting is conservative: the global mean survives any
        // resize, not just integer ratios.
        let src: Vec<f64> = (0..60).map(|v| (v % 7) as f64).collect();
        let src_mean = src.iter().sum::<f64>() / src.len() as f64;
        let dst = resample(&src, 10, 6, 7, 4, ResampleMode::Linear);
        let dst_mean = dst.iter().sum::<f64>() / dst.len() as f64;
        assert!((src_mean - dst_mean).abs() < 1e-10);
    }

    #[test]
    fn test_zero_dimensions_empty() {
        assert!(resample(&[], 0, 0, 4, 4, ResampleMode::Nearest).is_empty());
        assert!(resample(&[1.0], 1, 1, 0, 4, ResampleMode::Linear).is_empty());
    }

    #[test]
    fn test_resample_into_reuses_buffer() {
        let src = vec![1.0; 16];
        let mut dst = Vec::with_capacity(64);
        resample_into(&src, 4, 4, 8, 8, ResampleMode::Nearest, &mut dst);
        assert_eq!(dst.len(), 64);
        resample_into(&src, 4, 4, 2, 2, ResampleMode::Linear, &mut dst);
        assert_eq!(dst.len(), 4);
        assert!((dst[0] - 1.0).abs() < 1e-12);
    }
}
