//! Bitmap evaluator — signed Euclidean distance transform.
//!
//! Felzenszwalb & Huttenlocher, "Distance Transforms of Sampled
//! Functions": the 2-D squared EDT is computed as a 1-D transform over
//! every column followed by a 1-D transform over every row. Each 1-D pass
//! builds the lower envelope of parabolas `(q - v)² + f(v)` anchored at the
//! finite samples, then reads it back left to right.
//!
//! ```text
//! mask ─┬─► inner grid (0 outside, ∞ inside) ─► sq-EDT ─► √ → +d inside
//!       └─► outer grid (0 inside, ∞ outside) ─► sq-EDT ─► √ → −d outside
//!                                         0.5 + 0.5 · d / spread, clamped
//! ```
//!
//! Distances are measured between pixel centers, so the two pixels on
//! either side of a straight edge encode to values symmetric about 0.5.

use crate::error::SdfError;
use crate::msdf::check_range;
use crate::raster::{Mask, PixelFormat, SdfRaster};

/// Stand-in for +∞ in the squared-distance grids.
pub const INF: f64 = 1e20;

/// Normalized single-channel field, 0.5 on the boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceField {
    pub width: u32,
    pub height: u32,
    /// Row-major values in [0, 1]; > 0.5 inside.
    pub values: Vec<f32>,
}

impl DistanceField {
    /// Quantize to a `Gray8` raster.
    pub fn to_gray8(&self) -> SdfRaster {
        SdfRaster {
            width: self.width,
            height: self.height,
            format: PixelFormat::Gray8,
            data: self.values.iter().map(|&v| quantize(v)).collect(),
        }
    }

    /// Quantize into all four channels of an `Rgba8` raster.
    pub fn to_rgba8(&self) -> SdfRaster {
        let mut data = Vec::with_capacity(self.values.len() * 4);
        for &v in &self.values {
            let b = quantize(v);
            data.extend_from_slice(&[b, b, b, b]);
        }
        SdfRaster {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8,
            data,
        }
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 1-D squared distance transform of `f` into `d`.
///
/// `v` (anchor indices) must hold `f.len()` entries and `z` (envelope
/// boundaries) `f.len() + 1`. Samples `>= INF` anchor no parabola; if
/// every sample is infinite the output is all `INF`.
pub fn transform_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    debug_assert!(d.len() >= n && v.len() >= n && z.len() > n);

    // Envelope size.
    let mut k = 0usize;
    for q in 0..n {
        if f[q] >= INF {
            continue;
        }
        let fq = f[q] + (q * q) as f64;
        loop {
            if k == 0 {
                v[0] = q;
                z[0] = f64::NEG_INFINITY;
                k = 1;
                break;
            }
            let r = v[k - 1];
            let s = (fq - (f[r] + (r * r) as f64)) / (2.0 * (q as f64 - r as f64));
            if s <= z[k - 1] {
                // New parabola hides the top of the envelope from its start.
                k -= 1;
                continue;
            }
            v[k] = q;
            z[k] = s;
            k += 1;
            break;
        }
    }

    if k == 0 {
        d[..n].fill(INF);
        return;
    }
    z[k] = f64::INFINITY;

    let mut j = 0usize;
    for (q, out) in d.iter_mut().enumerate().take(n) {
        while z[j + 1] < q as f64 {
            j += 1;
        }
        let dq = q as f64 - v[j] as f64;
        *out = dq * dq + f[v[j]];
    }
}

/// In-place separable 2-D squared EDT: columns first, then rows.
pub fn transform_2d(grid: &mut [f64], width: usize, height: usize) {
    let n = width.max(height);
    let mut f = vec![0.0; n];
    let mut d = vec![0.0; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0; n + 1];

    for x in 0..width {
        for y in 0..height {
            f[y] = grid[y * width + x];
        }
        transform_1d(&f[..height], &mut d[..height], &mut v[..height], &mut z[..=height]);
        for y in 0..height {
            grid[y * width + x] = d[y];
        }
    }

    for row in grid.chunks_mut(width).take(height) {
        f[..width].copy_from_slice(row);
        transform_1d(&f[..width], &mut d[..width], &mut v[..width], &mut z[..=width]);
        row.copy_from_slice(&d[..width]);
    }
}

/// Signed distance in pixels at every mask pixel (+ inside, − outside).
pub fn signed_distances(mask: &Mask) -> Vec<f64> {
    let (w, h) = (mask.width as usize, mask.height as usize);
    let mut inner: Vec<f64> = mask.data.iter().map(|&m| if m { INF } else { 0.0 }).collect();
    let mut outer: Vec<f64> = mask.data.iter().map(|&m| if m { 0.0 } else { INF }).collect();
    transform_2d(&mut inner, w, h);
    transform_2d(&mut outer, w, h);

    mask.data
        .iter()
        .zip(inner.iter().zip(&outer))
        .map(|(&m, (&di, &dout))| if m { di.sqrt() } else { -dout.sqrt() })
        .collect()
}

/// Normalized SDF of `mask`; `spread` is the distance mapped to 0 and 1.
pub fn generate_sdf(mask: &Mask, spread: f64) -> Result<DistanceField, SdfError> {
    check_range(spread)?;
    let values = signed_distances(mask)
        .into_iter()
        .map(|d| (0.5 + 0.5 * (d / spread)).clamp(0.0, 1.0) as f32)
        .collect();
    log::trace!("edt {}x{} spread {spread}", mask.width, mask.height);
    Ok(DistanceField { width: mask.width, height: mask.height, values })
}

// ===================================================================
// Tests
// ===================================================================
