//! Error types for distance-field generation.

use thiserror::Error;

/// Failures of the generation entry points.
///
/// An empty shape is not an error: it is a valid "no visible glyph"
/// result that callers detect before asking for a raster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SdfError {
    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("distance range must be finite and positive, got {0}")]
    InvalidRange(f64),

    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}
