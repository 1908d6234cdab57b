//! Raster containers shared by both evaluators, plus pixel ↔ shape framing.

use crate::error::SdfError;
use crate::geometry::{Bounds, Point};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// Pixel layout of a raster or atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Single channel, 1 byte per pixel (bitmap/EDT path).
    Gray8,
    /// R, G, B distance channels plus true distance in alpha (MSDF path).
    Rgba8,
}

impl PixelFormat {
    #[inline(always)]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// An encoded distance-field raster, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdfRaster {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl SdfRaster {
    /// Zero-filled raster. Fails on zero dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, SdfError> {
        check_dimensions(width, height)?;
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Ok(Self { width, height, format, data: vec![0; len] })
    }

    /// Bytes of one row.
    #[inline(always)]
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Pixel bytes at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let idx = y as usize * self.stride() + x as usize * bpp;
        &self.data[idx..idx + bpp]
    }
}

/// Binary inside/outside mask, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Result<Self, SdfError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SdfError::BufferSizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { width, height, data })
    }

    pub fn from_fn(
        width: u32,
        height: u32,
        mut inside: impl FnMut(u32, u32) -> bool,
    ) -> Result<Self, SdfError> {
        check_dimensions(width, height)?;
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(inside(x, y));
            }
        }
        Ok(Self { width, height, data })
    }

    /// Build from 8-bit coverage, thresholding at half coverage.
    pub fn from_coverage(width: u32, height: u32, coverage: &[u8]) -> Result<Self, SdfError> {
        Self::new(width, height, coverage.iter().map(|&a| a >= 128).collect())
    }

    #[inline(always)]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Copy surrounded by `pad` pixels of outside on every side.
    pub fn padded(&self, pad: u32) -> Result<Mask, SdfError> {
        let (width, height) = padded_size(self.width, self.height, pad)?;
        let mut data = vec![false; width as usize * height as usize];
        for y in 0..self.height {
            let src = y as usize * self.width as usize;
            let dst = (y + pad) as usize * width as usize + pad as usize;
            data[dst..dst + self.width as usize]
                .copy_from_slice(&self.data[src..src + self.width as usize]);
        }
        Ok(Mask { width, height, data })
    }
}

/// Maps pixel centers into shape space.
///
/// `shape = pixel_center / scale - translate`, with the pixel y axis
/// optionally flipped so row 0 is the top of a y-up outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Framing {
    pub scale: f64,
    pub translate: Point,
    pub flip_y: bool,
}

impl Default for Framing {
    fn default() -> Self {
        Self { scale: 1.0, translate: Point::default(), flip_y: false }
    }
}

impl Framing {
    /// Frame `bounds` with `padding` pixels on each side at `scale`
    /// pixels per shape unit. Returns the framing and the raster size, or
    /// `InvalidDimensions` when the padded size does not fit in `u32`.
    pub fn fit(
        bounds: &Bounds,
        padding: u32,
        scale: f64,
        flip_y: bool,
    ) -> Result<(Framing, u32, u32), SdfError> {
        let (w, h) = if bounds.is_empty() {
            (0, 0)
        } else {
            (
                (bounds.width() * scale).ceil() as u32,
                (bounds.height() * scale).ceil() as u32,
            )
        };
        let pad = padding as f64 / scale;
        let (min_x, min_y) = if bounds.is_empty() { (0.0, 0.0) } else { (bounds.min_x, bounds.min_y) };
        let framing = Framing {
            scale,
            translate: Point::new(pad - min_x, pad - min_y),
            flip_y,
        };
        let (width, height) = padded_size(w, h, padding)?;
        Ok((framing, width, height))
    }

    /// Shape-space position of the center of pixel (col, row).
    #[inline]
    pub fn pixel_to_shape(&self, col: u32, row: u32, height: u32) -> Point {
        let px = col as f64 + 0.5;
        let mut py = row as f64 + 0.5;
        if self.flip_y {
            py = height as f64 - py;
        }
        Point::new(px / self.scale - self.translate.x, py / self.scale - self.translate.y)
    }
}

/// Sample `shape`'s nonzero fill at every pixel center.
pub fn rasterize_mask(
    shape: &Shape,
    framing: &Framing,
    width: u32,
    height: u32,
) -> Result<Mask, SdfError> {
    Mask::from_fn(width, height, |x, y| shape.contains(framing.pixel_to_shape(x, y, height)))
}

/// `width`/`height` grown by `pad` on both sides, rejecting overflow.
fn padded_size(width: u32, height: u32, pad: u32) -> Result<(u32, u32), SdfError> {
    let grow = |n: u32| pad.checked_mul(2).and_then(|p| n.checked_add(p));
    match (grow(width), grow(height)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(SdfError::InvalidDimensions { width, height }),
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), SdfError> {
    if width == 0 || height == 0 {
        return Err(SdfError::InvalidDimensions { width, height });
    }
    Ok(())
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::PathCommand;

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            SdfRaster::new(0, 4, PixelFormat::Gray8),
            Err(SdfError::InvalidDimensions { width: 0, height: 4 })
        ));
        assert!(Mask::from_fn(4, 0, |_, _| true).is_err());
    }

    #[test]
    fn test_mask_length_checked() {
        let err = Mask::new(2, 2, vec![true; 3]).unwrap_err();
        assert!(matches!(err, SdfError::BufferSizeMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_raster_sizes() {
        let r = SdfRaster::new(3, 2, PixelFormat::Rgba8).unwrap();
        assert_eq!(r.data.len(), 24);
        assert_eq!(r.stride(), 12);
        assert_eq!(r.pixel(2, 1).len(), 4);
    }

    #[test]
    fn test_fit_and_pixel_mapping() {
        let bounds = Bounds::new(10.0, 20.0, 14.0, 26.0);
        let (framing, w, h) = Framing::fit(&bounds, 2, 1.0, false).unwrap();
        assert_eq!((w, h), (8, 10));
        // Pixel (2, 2) is the first one inside the bounds.
        let p = framing.pixel_to_shape(2, 2, h);
        assert_eq!(p, Point::new(10.5, 20.5));
    }

    #[test]
    fn test_fit_flip_y_puts_top_row_at_max_y() {
        let bounds = Bounds::new(0.0, 0.0, 4.0, 4.0);
        let (framing, _, h) = Framing::fit(&bounds, 0, 2.0, true).unwrap();
        assert_eq!(h, 8);
        let top = framing.pixel_to_shape(0, 0, h);
        assert!((top.y - 3.75).abs() < 1e-12);
        let bottom = framing.pixel_to_shape(0, h - 1, h);
        assert!((bottom.y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rasterize_square() {
        let shape = Shape::from_commands(vec![
            PathCommand::MoveTo(Point::new(2.0, 2.0)),
            PathCommand::LineTo(Point::new(6.0, 2.0)),
            PathCommand::LineTo(Point::new(6.0, 6.0)),
            PathCommand::LineTo(Point::new(2.0, 6.0)),
            PathCommand::Close,
        ]);
        let mask = rasterize_mask(&shape, &Framing::default(), 8, 8).unwrap();
        let inside = mask.data.iter().filter(|&&b| b).count();
        assert_eq!(inside, 16);
        assert!(mask.get(2, 2));
        assert!(!mask.get(1, 2));
    }

    #[test]
    fn test_mask_padding() {
        let mask = Mask::new(2, 1, vec![true, false]).unwrap();
        let padded = mask.padded(1).unwrap();
        assert_eq!((padded.width, padded.height), (4, 3));
        assert!(padded.get(1, 1));
        assert!(!padded.get(2, 1));
        assert_eq!(padded.data.iter().filter(|&&b| b).count(), 1);
    }

    #[test]
    fn test_oversized_padding_rejected() {
        let huge = Bounds::new(0.0, 0.0, 1.0e12, 4.0);
        assert!(matches!(
            Framing::fit(&huge, 4, 1.0, false),
            Err(SdfError::InvalidDimensions { .. })
        ));
        let mask = Mask::new(2, 1, vec![true, false]).unwrap();
        assert!(matches!(
            mask.padded(u32::MAX / 2),
            Err(SdfError::InvalidDimensions { width: 2, height: 1 })
        ));
    }

    #[test]
    fn test_mask_from_coverage() {
        let mask = Mask::from_coverage(3, 1, &[0, 127, 200]).unwrap();
        assert_eq!(mask.data, vec![false, false, true]);
    }
}
