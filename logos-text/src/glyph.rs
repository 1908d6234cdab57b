//! Glyph identities and the location records handed to renderers.
//!
//! Two keys name the same glyph:
//!
//! ```text
//! GlyphId  (FontHandle, glyph)         runtime, cheap, in-session only
//! GlyphKey (font name, size, glyph)    stable across runs, persisted
//! ```
//!
//! Font handles are assigned by whoever loaded the font in this process,
//! so a `GlyphId` must never be written to disk.

use logos_sdf::Bounds;
use serde::{Deserialize, Serialize};

use crate::atlas::{AtlasRect, AtlasRegion};

/// Sub-units per pixel used to store font sizes exactly.
const SIZE_SCALE: f32 = 64.0;

/// Process-local font identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontHandle(pub u32);

/// Runtime glyph identity, valid only within one process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId {
    pub font: FontHandle,
    pub glyph: u16,
}

impl GlyphId {
    pub fn new(font: FontHandle, glyph: u16) -> Self {
        Self { font, glyph }
    }
}

/// Stable glyph identity: (font name, size, glyph index).
///
/// The size is held in 1/64 px so the key can derive `Eq`, `Hash` and
/// `Ord`. The ordering fixes manifest iteration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlyphKey {
    pub font: String,
    pub size_64: u32,
    pub glyph: u16,
}

impl GlyphKey {
    pub fn new(font: impl Into<String>, size: f32, glyph: u16) -> Self {
        Self {
            font: font.into(),
            size_64: (size.max(0.0) * SIZE_SCALE).round() as u32,
            glyph,
        }
    }

    /// Font size in pixels.
    pub fn size(&self) -> f32 {
        self.size_64 as f32 / SIZE_SCALE
    }
}

/// Placement metrics in the requested pixel size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    /// Horizontal pen advance.
    pub advance: f32,
    /// Offset from the pen origin to the left of the outline bounds.
    pub bearing_x: f32,
    /// Offset from the baseline to the top of the outline bounds.
    pub bearing_y: f32,
    /// Outline bounding box (`Bounds::EMPTY` for blank glyphs).
    pub bounds: Bounds,
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self { advance: 0.0, bearing_x: 0.0, bearing_y: 0.0, bounds: Bounds::EMPTY }
    }
}

impl GlyphMetrics {
    /// Metrics derived from outline bounds and an advance.
    pub fn from_bounds(bounds: Bounds, advance: f32) -> Self {
        if bounds.is_empty() {
            return Self { advance, ..Self::default() };
        }
        Self {
            advance,
            bearing_x: bounds.min_x as f32,
            bearing_y: bounds.max_y as f32,
            bounds,
        }
    }
}

/// Where a glyph's raster lives in the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasSlot {
    /// Normalized texture coordinates.
    pub uv: AtlasRegion,
    /// Pixel rect (without gutter).
    pub rect: AtlasRect,
}

/// Everything a renderer needs to draw one glyph.
///
/// `slot` is `None` for glyphs with nothing to draw (e.g. a space): the
/// metrics are still valid and cached.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasLocation {
    pub slot: Option<AtlasSlot>,
    /// Empty border baked into the raster, in pixels.
    pub padding: u32,
    pub metrics: GlyphMetrics,
}

impl AtlasLocation {
    /// A metrics-only record.
    pub fn blank(metrics: GlyphMetrics) -> Self {
        Self { slot: None, padding: 0, metrics }
    }

    pub fn is_blank(&self) -> bool {
        self.slot.is_none()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_glyph_key_size_roundtrip() {
        let key = GlyphKey::new("Inter", 13.5, 42);
        assert_eq!(key.size_64, 864);
        assert_eq!(key.size(), 13.5);
        assert_eq!(GlyphKey::new("Inter", -1.0, 1).size_64, 0);
    }

    #[test]
    fn test_glyph_key_equality_is_structural() {
        assert_eq!(GlyphKey::new("Inter", 16.0, 7), GlyphKey::new(String::from("Inter"), 16.0, 7));
        assert_ne!(GlyphKey::new("Inter", 16.0, 7), GlyphKey::new("Inter", 17.0, 7));
    }

    #[test]
    fn test_glyph_key_order_is_deterministic() {
        let mut map = BTreeMap::new();
        map.insert(GlyphKey::new("b", 12.0, 1), 0);
        map.insert(GlyphKey::new("a", 16.0, 9), 1);
        map.insert(GlyphKey::new("a", 12.0, 9), 2);
        map.insert(GlyphKey::new("a", 12.0, 3), 3);
        let order: Vec<_> = map.values().copied().collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_metrics_from_bounds() {
        let m = GlyphMetrics::from_bounds(Bounds::new(1.0, -2.0, 9.0, 11.0), 10.0);
        assert_eq!((m.advance, m.bearing_x, m.bearing_y), (10.0, 1.0, 11.0));
        let blank = GlyphMetrics::from_bounds(Bounds::EMPTY, 4.0);
        assert_eq!(blank.advance, 4.0);
        assert!(blank.bounds.is_empty());
    }
}
