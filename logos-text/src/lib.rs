//! # logos-text
//!
//! Glyph atlas engine for the Logos design tool. Turns glyph outlines into
//! distance-field rasters (via `logos-sdf`), packs them into one shared
//! texture, and keeps a two-tier cache that survives restarts.
//!
//! ## Architecture
//!
//! ```text
//! GlyphSource (cosmic-text / in-memory)
//!     │  outline, mask or nothing + metrics
//!     ▼
//! GlyphPipeline ──► PipelineScheduler
//!     │                 ├─ generation lane: SdfGenerator (concurrent)
//!     │                 └─ commit lane:     GlyphCache (serialized)
//!     ▼
//! GlyphCache { session map, stable map, AtlasPacker } ──► AtlasLocation
//!     │
//!     ▼
//! manifest + raw atlas bytes on disk
//! ```
//!
//! - **`atlas`** — skyline bin packing into a square texture.
//! - **`glyph`** — glyph identities, metrics, atlas locations.
//! - **`cache`** — two-tier cache, manifest, persistence.
//! - **`scheduler`** — concurrent generation lane + serialized commit lane.
//! - **`source`** — glyph source trait and the `cosmic-text` implementation.
//! - **`pipeline`** — request → generate → place.

pub mod atlas;
pub mod cache;
pub mod error;
pub mod glyph;
pub mod pipeline;
pub mod scheduler;
pub mod source;

// Re-exports for ergonomic use.
pub use atlas::{validate_skyline, AtlasPacker, AtlasRect, AtlasRegion, SkylineFault, SkylineNode};
pub use cache::{
    AtlasConfig, CacheManifest, CacheStats, GlyphCache, Placement, ATLAS_FILE, MANIFEST_FILE,
    MANIFEST_VERSION,
};
pub use error::{CacheError, PipelineError};
pub use glyph::{AtlasLocation, AtlasSlot, FontHandle, GlyphId, GlyphKey, GlyphMetrics};
pub use pipeline::{GlyphPipeline, PipelineConfig};
pub use scheduler::{PipelineScheduler, SchedulerStats};
pub use source::{CosmicGlyphSource, GlyphData, GlyphGeometry, GlyphSource, MemoryGlyphSource};
