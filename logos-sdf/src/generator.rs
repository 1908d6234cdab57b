//! High-level generation entry points used per glyph.
//!
//! `SdfGenerator` wraps the two evaluators behind one config:
//!
//! - [`SdfMode::Msdf`] — color edges, evaluate the vector path (RGBA).
//! - [`SdfMode::Sdf`]  — rasterize to a mask, run the EDT (single channel).
//!
//! Generation is a pure function of (shape, config): calling it twice on
//! the same input yields byte-identical rasters.

use crate::coloring::color_shape;
use crate::edt::generate_sdf;
use crate::error::SdfError;
use crate::geometry::{Bounds, Point};
use crate::msdf::{check_range, generate_msdf_parallel};
use crate::raster::{rasterize_mask, Framing, Mask, PixelFormat, SdfRaster};
use crate::shape::Shape;

/// Which distance-field flavour to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SdfMode {
    /// Multi-channel field, `Rgba8` output.
    Msdf,
    /// Single-channel field via the Euclidean distance transform, `Gray8`.
    Sdf,
}

impl SdfMode {
    pub const fn pixel_format(self) -> PixelFormat {
        match self {
            SdfMode::Msdf => PixelFormat::Rgba8,
            SdfMode::Sdf => PixelFormat::Gray8,
        }
    }
}

/// Generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfConfig {
    /// Output flavour.
    pub mode: SdfMode,
    /// Distance in pixels mapped to the ends of the byte range.
    pub range: f64,
    /// Empty border in pixels around the glyph so the field can fall off.
    pub padding: u32,
    /// Raster pixels per outline unit.
    pub scale: f64,
    /// Row-parallel threads inside one glyph (1 = sequential).
    pub row_threads: usize,
    /// Treat outlines as y-up (font convention) and flip into raster rows.
    pub flip_y: bool,
}

impl Default for SdfConfig {
    fn default() -> Self {
        Self {
            mode: SdfMode::Msdf,
            range: 4.0,
            padding: 4,
            scale: 1.0,
            row_threads: 1,
            flip_y: true,
        }
    }
}

impl SdfConfig {
    /// Config for testing (small border, y-down shapes).
    pub fn for_testing() -> Self {
        Self {
            mode: SdfMode::Msdf,
            range: 2.0,
            padding: 2,
            scale: 1.0,
            row_threads: 1,
            flip_y: false,
        }
    }
}

/// A generated raster plus how it maps back to outline space.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphRaster {
    pub raster: SdfRaster,
    pub framing: Framing,
    /// Outline-space bounds the raster was fitted to (before padding).
    pub bounds: Bounds,
}

/// Stateless generator bound to one [`SdfConfig`].
#[derive(Debug, Clone)]
pub struct SdfGenerator {
    config: SdfConfig,
}

impl SdfGenerator {
    pub fn new(config: SdfConfig) -> Result<Self, SdfError> {
        check_range(config.range)?;
        if !(config.scale.is_finite() && config.scale > 0.0) {
            return Err(SdfError::InvalidRange(config.scale));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SdfConfig {
        &self.config
    }

    /// Generate from an outline. Returns `Ok(None)` for an empty shape
    /// (e.g. a space), which has metrics but nothing to draw.
    pub fn generate_outline(&self, mut shape: Shape) -> Result<Option<GlyphRaster>, SdfError> {
        if shape.is_empty() {
            log::trace!("empty outline, skipping distance field");
            return Ok(None);
        }
        let cfg = &self.config;
        let bounds = shape.bounds();
        let (framing, width, height) = Framing::fit(&bounds, cfg.padding, cfg.scale, cfg.flip_y)?;

        let raster = match cfg.mode {
            SdfMode::Msdf => {
                color_shape(&mut shape);
                generate_msdf_parallel(&shape, &framing, width, height, cfg.range, cfg.row_threads)?
            }
            SdfMode::Sdf => {
                let mask = rasterize_mask(&shape, &framing, width, height)?;
                generate_sdf(&mask, cfg.range)?.to_gray8()
            }
        };
        Ok(Some(GlyphRaster { raster, framing, bounds }))
    }

    /// Generate from a coverage mask (no outline available). The mask is
    /// padded by `padding` outside pixels before the transform. In MSDF
    /// mode the single field is replicated into all four channels.
    pub fn generate_mask(&self, mask: &Mask) -> Result<GlyphRaster, SdfError> {
        let cfg = &self.config;
        let padded = mask.padded(cfg.padding)?;
        let field = generate_sdf(&padded, cfg.range)?;
        let raster = match cfg.mode {
            SdfMode::Msdf => field.to_rgba8(),
            SdfMode::Sdf => field.to_gray8(),
        };
        let pad = cfg.padding as f64;
        Ok(GlyphRaster {
            raster,
            framing: Framing {
                scale: 1.0,
                translate: Point::new(pad, pad),
                flip_y: false,
            },
            bounds: Bounds::new(0.0, 0.0, mask.width as f64, mask.height as f64),
        })
    }
}

// ===================================================================
// Tests
// ===================================================================
