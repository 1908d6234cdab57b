//! Error types for the cache and the glyph pipeline.

use logos_sdf::{PixelFormat, SdfError};
use thiserror::Error;

use crate::atlas::SkylineFault;
use crate::glyph::GlyphKey;

/// Cache persistence failures.
///
/// A restore that hits any of the integrity variants discards the
/// persisted state and starts from an empty atlas; it never keeps a
/// partially trusted blob.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("manifest serialization error: {0}")]
    Serialization(String),

    #[error("manifest deserialization error: {0}")]
    Deserialization(String),

    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("persisted atlas is {found_size}px {found_format:?}, configured {size}px {format:?}")]
    AtlasMismatch {
        size: u32,
        format: PixelFormat,
        found_size: u32,
        found_format: PixelFormat,
    },

    #[error("atlas blob is {actual} bytes, expected {expected}")]
    ByteLength { expected: usize, actual: usize },

    #[error("persisted skyline is corrupt: {0:?}")]
    CorruptSkyline(SkylineFault),

    #[error("glyph {0:?} lies outside the atlas")]
    GlyphOutOfBounds(GlyphKey),
}

/// Failures surfaced by [`crate::GlyphPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("atlas full, cannot place {width}x{height} raster for {key:?}")]
    AtlasFull { key: GlyphKey, width: u32, height: u32 },

    #[error("glyph source has no glyph for {0:?}")]
    MissingGlyph(GlyphKey),

    #[error("distance field generation failed: {0}")]
    Sdf(#[from] SdfError),

    #[error("raster format {found:?} does not match atlas format {expected:?}")]
    FormatMismatch { expected: PixelFormat, found: PixelFormat },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        PipelineError::Scheduler(e.to_string())
    }
}

impl From<tokio::sync::AcquireError> for PipelineError {
    fn from(_: tokio::sync::AcquireError) -> Self {
        PipelineError::Scheduler("generation lane closed".to_string())
    }
}
