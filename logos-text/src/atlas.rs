//! Glyph atlas — CPU-side texture atlas with skyline bin packing.
//!
//! The packed region's upper boundary is tracked as a list of horizontal
//! shelves ("skyline"). Each node `{x, y, width}` says the columns
//! `[x, x + width)` are free from row `y` downward to the atlas bottom.
//!
//! ```text
//!  y=0 ┌──────┬────┬───────────────┐
//!      │  A   │ B  │               │
//!      │      ├────┘               │   skyline: [{0,10,6} {6,4,4} {10,0,22}]
//!      └──────┘                    │
//!      │                           │
//!      └───────────────────────────┘
//! ```
//!
//! Placement is bottom-left best fit: for every starting node, find the
//! lowest `y` a rect of the requested width can rest at (the max `y` over
//! the nodes it spans), keep the candidate with the lowest top edge
//! `y + height`, break ties by the narrower starting node. After placing,
//! spanned nodes are replaced by one node at `y + height`, the leftover of
//! the last spanned node is re-inserted, and equal-height neighbours are
//! merged.
//!
//! Invariant: the nodes partition `[0, size)` with no gaps or overlaps.
//! It is asserted in debug builds after every mutation.

use bytemuck::{Pod, Zeroable};
use logos_sdf::{PixelFormat, SdfRaster};
use serde::{Deserialize, Serialize};

/// A region within the atlas texture (UV coordinates normalized to [0,1]).
///
/// `Pod` so renderers can copy it straight into an instance buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct AtlasRegion {
    /// Top-left U coordinate.
    pub u_min: f32,
    /// Top-left V coordinate.
    pub v_min: f32,
    /// Bottom-right U coordinate.
    pub u_max: f32,
    /// Bottom-right V coordinate.
    pub v_max: f32,
}

/// One horizontal shelf of free space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkylineNode {
    pub x: u32,
    pub y: u32,
    pub width: u32,
}

/// Pixel-space rectangle within the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    /// True when the two rects share any pixel.
    pub fn overlaps(&self, other: &AtlasRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Reasons a persisted skyline is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkylineFault {
    Empty,
    Gap { expected_x: u32, found_x: u32 },
    ZeroWidth { index: usize },
    Coverage { covered: u32, size: u32 },
    TooTall { index: usize, y: u32 },
}

/// Check that `nodes` partition `[0, size)` and fit in `size` rows.
pub fn validate_skyline(nodes: &[SkylineNode], size: u32) -> Result<(), SkylineFault> {
    if nodes.is_empty() {
        return Err(SkylineFault::Empty);
    }
    let mut x = 0u32;
    for (index, node) in nodes.iter().enumerate() {
        if node.x != x {
            return Err(SkylineFault::Gap { expected_x: x, found_x: node.x });
        }
        if node.width == 0 {
            return Err(SkylineFault::ZeroWidth { index });
        }
        if node.y > size {
            return Err(SkylineFault::TooTall { index, y: node.y });
        }
        x = x.saturating_add(node.width);
    }
    if x != size {
        return Err(SkylineFault::Coverage { covered: x, size });
    }
    Ok(())
}

/// Square atlas raster plus its skyline.
#[derive(Clone, Debug)]
pub struct AtlasPacker {
    size: u32,
    format: PixelFormat,
    skyline: Vec<SkylineNode>,
    data: Vec<u8>,
    used_area: u64,
}

impl AtlasPacker {
    /// Create an empty atlas of `size × size` pixels.
    pub fn new(size: u32, format: PixelFormat) -> Self {
        let len = size as usize * size as usize * format.bytes_per_pixel();
        Self {
            size,
            format,
            skyline: vec![SkylineNode { x: 0, y: 0, width: size }],
            data: vec![0; len],
            used_area: 0,
        }
    }

    /// Rebuild from persisted parts. Returns `None` if the byte length or
    /// the skyline does not match `size`/`format`.
    pub fn from_parts(
        size: u32,
        format: PixelFormat,
        skyline: Vec<SkylineNode>,
        data: Vec<u8>,
        used_area: u64,
    ) -> Option<Self> {
        if data.len() != size as usize * size as usize * format.bytes_per_pixel() {
            return None;
        }
        validate_skyline(&skyline, size).ok()?;
        Some(Self { size, format, skyline, data, used_area })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn skyline(&self) -> &[SkylineNode] {
        &self.skyline
    }

    /// Raw atlas bytes, rows top to bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Fraction of atlas area covered by placed rects.
    pub fn occupancy(&self) -> f32 {
        let total = self.size as f64 * self.size as f64;
        if total == 0.0 {
            return 0.0;
        }
        (self.used_area as f64 / total) as f32
    }

    pub(crate) fn used_area(&self) -> u64 {
        self.used_area
    }

    /// Reset to an empty atlas of the same size.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.skyline.clear();
        self.skyline.push(SkylineNode { x: 0, y: 0, width: self.size });
        self.used_area = 0;
    }

    /// Reserve a `width × height` rect. `None` means the atlas is full.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRect> {
        if width == 0 || height == 0 || width > self.size || height > self.size {
            return None;
        }

        let mut best: Option<(usize, u32)> = None;
        let mut best_top = u32::MAX;
        let mut best_width = u32::MAX;
        for i in 0..self.skyline.len() {
            let Some(y) = self.fit(i, width, height) else {
                continue;
            };
            let top = y + height;
            let node_width = self.skyline[i].width;
            if top < best_top || (top == best_top && node_width < best_width) {
                best = Some((i, y));
                best_top = top;
                best_width = node_width;
            }
        }

        let (index, y) = best?;
        let rect = AtlasRect { x: self.skyline[index].x, y, width, height };
        self.insert_node(index, rect);
        self.merge();
        self.used_area += width as u64 * height as u64;
        debug_assert_eq!(validate_skyline(&self.skyline, self.size), Ok(()));
        Some(rect)
    }

    /// Place `raster` and copy its pixels in. The raster's format must
    /// match the atlas. `gutter` extra pixels are reserved right of and
    /// below the raster but left untouched.
    pub fn add(&mut self, raster: &SdfRaster, gutter: u32) -> Option<AtlasRect> {
        if raster.format != self.format {
            log::warn!(
                "raster format {:?} does not match atlas format {:?}",
                raster.format,
                self.format
            );
            return None;
        }
        let reserved = self.allocate(
            raster.width.checked_add(gutter)?,
            raster.height.checked_add(gutter)?,
        )?;
        let rect = AtlasRect { width: raster.width, height: raster.height, ..reserved };
        self.blit(&rect, raster);
        Some(rect)
    }

    /// Normalize a pixel rect to UV space.
    pub fn rect_to_region(&self, rect: &AtlasRect) -> AtlasRegion {
        let inv = 1.0 / self.size as f32;
        AtlasRegion {
            u_min: rect.x as f32 * inv,
            v_min: rect.y as f32 * inv,
            u_max: (rect.x + rect.width) as f32 * inv,
            v_max: (rect.y + rect.height) as f32 * inv,
        }
    }

    /// Lowest `y` a rect starting at node `index` can rest at, if it fits.
    fn fit(&self, index: usize, width: u32, height: u32) -> Option<u32> {
        let x = self.skyline[index].x;
        if x.checked_add(width)? > self.size {
            return None;
        }
        let mut remaining = width;
        let mut y = 0;
        let mut i = index;
        while remaining > 0 {
            let node = self.skyline.get(i)?;
            y = y.max(node.y);
            if y.checked_add(height)? > self.size {
                return None;
            }
            remaining = remaining.saturating_sub(node.width);
            i += 1;
        }
        Some(y)
    }

    /// Replace the nodes spanned by `rect` (starting at `index`).
    fn insert_node(&mut self, index: usize, rect: AtlasRect) {
        let right = rect.x + rect.width;
        let mut end = index;
        while end < self.skyline.len() && self.skyline[end].x < right {
            end += 1;
        }
        let last = self.skyline[end - 1];
        let last_right = last.x + last.width;

        let mut replacement = vec![SkylineNode { x: rect.x, y: rect.y + rect.height, width: rect.width }];
        if last_right > right {
            replacement.push(SkylineNode { x: right, y: last.y, width: last_right - right });
        }
        self.skyline.splice(index..end, replacement);
    }

    /// Fuse neighbouring nodes at the same height.
    fn merge(&mut self) {
        let mut merged: Vec<SkylineNode> = Vec::with_capacity(self.skyline.len());
        for node in self.skyline.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.y == node.y => prev.width += node.width,
                _ => merged.push(node),
            }
        }
        self.skyline = merged;
    }

    /// Copy raster rows into the atlas at `rect`.
    fn blit(&mut self, rect: &AtlasRect, raster: &SdfRaster) {
        let bpp = self.format.bytes_per_pixel();
        let atlas_stride = self.size as usize * bpp;
        let row_bytes = raster.stride();
        for (row, src) in raster.data.chunks_exact(row_bytes).enumerate() {
            let dst = (rect.y as usize + row) * atlas_stride + rect.x as usize * bpp;
            self.data[dst..dst + row_bytes].copy_from_slice(src);
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
