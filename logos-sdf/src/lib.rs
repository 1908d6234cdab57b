//! # logos-sdf
//!
//! Signed distance field generation for the Logos glyph atlas. Turns a
//! glyph outline (or a coverage mask) into a distance-field raster that
//! stays sharp under GPU magnification.
//!
//! ## Architecture
//!
//! ```text
//! PathCommand stream ──► Shape ──► edge coloring ──► MSDF evaluator ──► RGBA raster
//!                          │
//!                          └──► mask ──┐
//! coverage bitmap ──────────► mask ────┴──► EDT evaluator ──► Gray8 raster
//! ```
//!
//! - **`geometry`** — points, curve segments, distance and winding queries.
//! - **`shape`** — command stream → contours.
//! - **`coloring`** — corner detection and R/G/B edge labels.
//! - **`msdf`** — per-pixel multi-channel signed distance.
//! - **`edt`** — separable squared Euclidean distance transform.
//! - **`raster`** — raster/mask containers and pixel framing.
//! - **`generator`** — per-glyph entry point bound to an [`SdfConfig`].
//!
//! Everything here is pure and synchronous; scheduling and atlas state
//! live in `logos-text`.

pub mod coloring;
pub mod edt;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod msdf;
pub mod raster;
pub mod shape;

// Re-exports for ergonomic use.
pub use coloring::{color_contour, color_shape, detect_corners, CORNER_DOT_THRESHOLD};
pub use edt::{generate_sdf, DistanceField};
pub use error::SdfError;
pub use generator::{GlyphRaster, SdfConfig, SdfGenerator, SdfMode};
pub use geometry::{Bounds, Curve, EdgeColor, Point, Segment};
pub use msdf::{generate_msdf, generate_msdf_parallel};
pub use raster::{rasterize_mask, Framing, Mask, PixelFormat, SdfRaster};
pub use shape::{Contour, PathCommand, Shape, ShapeBuilder};
