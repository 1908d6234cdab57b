//! Glyph pipeline — request a glyph, get an atlas location.
//!
//! ```text
//! request(id, key)
//!   │ cache.lookup ── hit ──────────────────────────────────────► location
//!   ▼ miss
//! generation lane: source.glyph(key) → SdfGenerator → raster
//!   ▼
//! commit lane:     cache.place(raster) → AtlasPacker → both tiers ─► location
//! ```
//!
//! Generation is deterministic, so there are no retries: a failure for a
//! key fails the same way every time until the atlas is reset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use logos_sdf::{SdfConfig, SdfGenerator, SdfRaster, Shape};

use crate::cache::{AtlasConfig, GlyphCache, Placement};
use crate::error::PipelineError;
use crate::glyph::{AtlasLocation, GlyphId, GlyphKey, GlyphMetrics};
use crate::scheduler::{default_workers, PipelineScheduler};
use crate::source::{GlyphGeometry, GlyphSource};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sdf: SdfConfig,
    pub atlas: AtlasConfig,
    /// Concurrent generation jobs. Default: one per core.
    pub max_workers: usize,
    /// Where `save`/startup load keep the cache. `None` disables persistence.
    pub cache_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sdf: SdfConfig::default(),
            atlas: AtlasConfig::default(),
            max_workers: default_workers(),
            cache_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Config for testing (small atlas, two workers, no persistence).
    pub fn for_testing() -> Self {
        Self {
            sdf: SdfConfig::for_testing(),
            atlas: AtlasConfig::for_testing(),
            max_workers: 2,
            cache_dir: None,
        }
    }
}

/// Raster plus metrics, ready to commit.
#[derive(Debug, Clone)]
struct Generated {
    raster: Option<SdfRaster>,
    padding: u32,
    metrics: GlyphMetrics,
}

/// Source → generator → cache, scheduled over two lanes.
pub struct GlyphPipeline<S: GlyphSource> {
    source: Arc<S>,
    generator: Arc<SdfGenerator>,
    cache: Arc<GlyphCache>,
    scheduler: PipelineScheduler,
    cache_dir: Option<PathBuf>,
}

impl<S: GlyphSource> GlyphPipeline<S> {
    /// Build the pipeline. If `cache_dir` holds a compatible cache it is
    /// loaded; an incompatible one is discarded.
    pub fn new(config: PipelineConfig, source: S) -> Result<Self, PipelineError> {
        let expected = config.sdf.mode.pixel_format();
        if expected != config.atlas.format {
            return Err(PipelineError::FormatMismatch { expected: config.atlas.format, found: expected });
        }
        let generator = SdfGenerator::new(config.sdf)?;
        let cache = GlyphCache::new(config.atlas);

        if let Some(dir) = &config.cache_dir {
            if cache.load_from_dir(dir)? {
                log::info!("glyph pipeline started with {} cached glyphs", cache.len());
            }
        }

        Ok(Self {
            source: Arc::new(source),
            generator: Arc::new(generator),
            cache: Arc::new(cache),
            scheduler: PipelineScheduler::new(config.max_workers),
            cache_dir: config.cache_dir,
        })
    }

    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &PipelineScheduler {
        &self.scheduler
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Blocking request: generate and place on the calling thread.
    ///
    /// For callers that must have the glyph now (offline export). Placement
    /// still goes through the cache's writer lock.
    pub fn get_or_generate(&self, id: GlyphId, key: &GlyphKey) -> Result<AtlasLocation, PipelineError> {
        if let Some(location) = self.cache.lookup(id, key) {
            return Ok(location);
        }
        let generated = generate(&*self.source, &self.generator, key)?;
        commit(&self.cache, id, key.clone(), generated)
    }

    /// Request one glyph.
    pub async fn request(&self, id: GlyphId, key: GlyphKey) -> Result<AtlasLocation, PipelineError> {
        if let Some(location) = self.cache.lookup(id, &key) {
            return Ok(location);
        }
        let source = Arc::clone(&self.source);
        let generator = Arc::clone(&self.generator);
        let job_key = key.clone();
        let generated = self
            .scheduler
            .generate(move || generate(&*source, &generator, &job_key))
            .await??;
        self.commit_async(id, key, generated).await
    }

    /// Request many glyphs. Generation runs concurrently; placements are
    /// committed one by one in request order, so the resulting atlas layout
    /// depends only on the request order.
    pub async fn request_batch(
        &self,
        requests: Vec<(GlyphId, GlyphKey)>,
    ) -> Vec<Result<AtlasLocation, PipelineError>> {
        enum Pending {
            Hit(AtlasLocation),
            Job(tokio::task::JoinHandle<Result<Result<Generated, PipelineError>, PipelineError>>),
            Repeat,
        }

        let mut queued = rustc_hash::FxHashSet::default();
        let mut pending = Vec::with_capacity(requests.len());
        for (id, key) in &requests {
            if let Some(location) = self.cache.lookup(*id, key) {
                pending.push(Pending::Hit(location));
            } else if !queued.insert(key.clone()) {
                pending.push(Pending::Repeat);
            } else {
                let source = Arc::clone(&self.source);
                let generator = Arc::clone(&self.generator);
                let key = key.clone();
                pending.push(Pending::Job(
                    self.scheduler.spawn_generate(move || generate(&*source, &generator, &key)),
                ));
            }
        }
        log::debug!("batch of {}: {} to generate", requests.len(), queued.len());

        let mut results = Vec::with_capacity(requests.len());
        for ((id, key), slot) in requests.into_iter().zip(pending) {
            let result = match slot {
                Pending::Hit(location) => Ok(location),
                Pending::Job(handle) => match handle.await {
                    Ok(Ok(Ok(generated))) => self.commit_async(id, key, generated).await,
                    Ok(Ok(Err(e))) | Ok(Err(e)) => Err(e),
                    Err(e) => Err(e.into()),
                },
                // Same key earlier in the batch: reuse its placement, or redo
                // the request to get the same error back.
                Pending::Repeat => match self.cache.lookup(id, &key) {
                    Some(location) => Ok(location),
                    None => self.request(id, key).await,
                },
            };
            results.push(result);
        }
        results
    }

    async fn commit_async(
        &self,
        id: GlyphId,
        key: GlyphKey,
        generated: Generated,
    ) -> Result<AtlasLocation, PipelineError> {
        let cache = Arc::clone(&self.cache);
        self.scheduler.commit(move || commit(&cache, id, key, generated)).await?
    }

    /// Save to the configured `cache_dir`, if any. Returns whether a save
    /// happened.
    pub async fn save(&self) -> Result<bool, PipelineError> {
        let Some(dir) = self.cache_dir.clone() else {
            log::debug!("no cache dir configured, skipping save");
            return Ok(false);
        };
        self.save_to_dir(dir).await?;
        Ok(true)
    }

    /// Save to `dir` on the commit lane.
    pub async fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<(), PipelineError> {
        let cache = Arc::clone(&self.cache);
        let dir = dir.as_ref().to_path_buf();
        self.scheduler.commit(move || cache.save_to_dir(&dir)).await??;
        Ok(())
    }

    /// Load from `dir` on the commit lane. `false` if nothing usable was there.
    pub async fn load_from_dir(&self, dir: impl AsRef<Path>) -> Result<bool, PipelineError> {
        let cache = Arc::clone(&self.cache);
        let dir = dir.as_ref().to_path_buf();
        Ok(self.scheduler.commit(move || cache.load_from_dir(&dir)).await??)
    }

    /// Drop every cached glyph and start a fresh atlas.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        let cache = Arc::clone(&self.cache);
        self.scheduler.commit(move || cache.reset()).await
    }
}

/// Generation step: pure function of (source, config, key).
fn generate<S: GlyphSource + ?Sized>(
    source: &S,
    generator: &SdfGenerator,
    key: &GlyphKey,
) -> Result<Generated, PipelineError> {
    let data = source.glyph(key).ok_or_else(|| PipelineError::MissingGlyph(key.clone()))?;
    let padding = generator.config().padding;

    let raster = match data.geometry {
        GlyphGeometry::Outline(commands) => generator
            .generate_outline(Shape::from_commands(commands))?
            .map(|glyph| glyph.raster),
        GlyphGeometry::Mask(mask) => Some(generator.generate_mask(&mask)?.raster),
        GlyphGeometry::Empty => None,
    };
    match &raster {
        Some(r) => log::debug!("generated {:?}: {}x{}", key, r.width, r.height),
        None => log::debug!("{key:?} is blank, metrics only"),
    }
    Ok(Generated { raster, padding, metrics: data.metrics })
}

/// Placement step: must only run under the cache's writer discipline.
fn commit(
    cache: &GlyphCache,
    id: GlyphId,
    key: GlyphKey,
    generated: Generated,
) -> Result<AtlasLocation, PipelineError> {
    let padding = if generated.raster.is_some() { generated.padding } else { 0 };
    let size = generated.raster.as_ref().map(|r| (r.width, r.height));
    match cache.place(id, key.clone(), generated.raster.as_ref(), padding, generated.metrics) {
        Placement::Inserted(location) | Placement::Cached(location) => Ok(location),
        Placement::AtlasFull => {
            let (width, height) = size.unwrap_or((0, 0));
            Err(PipelineError::AtlasFull { key, width, height })
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::FontHandle;
    use crate::source::{GlyphData, MemoryGlyphSource};
    use logos_sdf::{Mask, PathCommand, PixelFormat, Point, SdfMode};

    fn rect(w: f64, h: f64) -> Vec<PathCommand> {
        vec![
            PathCommand::MoveTo(Point::new(0.0, 0.0)),
            PathCommand::LineTo(Point::new(w, 0.0)),
            PathCommand::LineTo(Point::new(w, h)),
            PathCommand::LineTo(Point::new(0.0, h)),
            PathCommand::Close,
        ]
    }

    fn key(glyph: u16) -> GlyphKey {
        GlyphKey::new("Synthetic", 16.0, glyph)
    }

    fn id(glyph: u16) -> GlyphId {
        GlyphId::new(FontHandle(0), glyph)
    }

    fn source() -> MemoryGlyphSource {
        MemoryGlyphSource::new()
            .with(key(1), GlyphData::outline(rect(6.0, 6.0), 8.0))
            .with(key(2), GlyphData::outline(rect(4.0, 10.0), 6.0))
            .with(key(3), GlyphData::empty(5.0))
            .with(
                key(4),
                GlyphData {
                    metrics: GlyphMetrics { advance: 7.0, ..GlyphMetrics::default() },
                    geometry: GlyphGeometry::Mask(Mask::from_fn(5, 5, |x, y| x > 0 && y > 0).unwrap()),
                },
            )
            .with(key(9), GlyphData::outline(rect(200.0, 200.0), 200.0))
    }

    #[test]
    fn test_format_mismatch_rejected() {
        let config = PipelineConfig {
            sdf: SdfConfig { mode: SdfMode::Sdf, ..SdfConfig::for_testing() },
            ..PipelineConfig::for_testing()
        };
        assert!(matches!(
            GlyphPipeline::new(config, source()),
            Err(PipelineError::FormatMismatch { .. })
        ));
    }

    #[test]
    fn test_get_or_generate_places_and_caches() {
        let pipeline = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        let loc = pipeline.get_or_generate(id(1), &key(1)).unwrap();
        let slot = loc.slot.unwrap();
        // 6 units + 2 px padding each side.
        assert_eq!((slot.rect.width, slot.rect.height), (10, 10));
        assert_eq!(loc.padding, 2);
        assert_eq!(loc.metrics.advance, 8.0);

        assert_eq!(pipeline.get_or_generate(id(1), &key(1)).unwrap(), loc);
        let stats = pipeline.cache().stats();
        assert_eq!((stats.misses, stats.session_hits), (1, 1));
    }

    #[test]
    fn test_blank_and_mask_glyphs() {
        let pipeline = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        let blank = pipeline.get_or_generate(id(3), &key(3)).unwrap();
        assert!(blank.is_blank());
        assert_eq!(blank.metrics.advance, 5.0);
        assert_eq!(blank.padding, 0);

        let masked = pipeline.get_or_generate(id(4), &key(4)).unwrap();
        let slot = masked.slot.unwrap();
        assert_eq!((slot.rect.width, slot.rect.height), (9, 9));
    }

    #[test]
    fn test_missing_glyph_and_atlas_full() {
        let pipeline = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        assert!(matches!(
            pipeline.get_or_generate(id(77), &key(77)),
            Err(PipelineError::MissingGlyph(_))
        ));
        match pipeline.get_or_generate(id(9), &key(9)) {
            Err(PipelineError::AtlasFull { width, height, .. }) => assert_eq!((width, height), (204, 204)),
            other => panic!("expected atlas full, got {other:?}"),
        }
        // A failure leaves no record behind.
        assert!(pipeline.cache().get_stable(&key(9)).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_matches_blocking_path() {
        let blocking = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        let async_ = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        for g in [1, 2, 3, 4] {
            let a = blocking.get_or_generate(id(g), &key(g)).unwrap();
            let b = async_.request(id(g), key(g)).await.unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(blocking.cache().atlas_bytes(), async_.cache().atlas_bytes());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_commits_in_request_order() {
        let sequential = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        let batched = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        let order = [2, 1, 4, 3, 1];

        let mut expected = Vec::new();
        for g in order {
            expected.push(sequential.get_or_generate(id(g), &key(g)).unwrap());
        }
        let results = batched
            .request_batch(order.iter().map(|&g| (id(g), key(g))).collect())
            .await;
        let got: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(got, expected);
        assert_eq!(batched.cache().len(), 4);
    }

    #[tokio::test]
    async fn test_batch_reports_per_request_errors() {
        let pipeline = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        let results = pipeline
            .request_batch(vec![(id(1), key(1)), (id(77), key(77)), (id(77), key(77)), (id(2), key(2))])
            .await;
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PipelineError::MissingGlyph(_))));
        assert!(matches!(results[2], Err(PipelineError::MissingGlyph(_))));
        assert!(results[3].is_ok());
    }

    #[tokio::test]
    async fn test_reset_invalidates() {
        let pipeline = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        pipeline.request(id(1), key(1)).await.unwrap();
        let before = pipeline.cache().atlas_id();
        pipeline.reset().await.unwrap();
        assert_ne!(pipeline.cache().atlas_id(), before);
        assert!(pipeline.cache().is_empty());
        assert_eq!(pipeline.cache().config().format, PixelFormat::Rgba8);
    }

    #[tokio::test]
    async fn test_save_without_dir_is_noop() {
        let pipeline = GlyphPipeline::new(PipelineConfig::for_testing(), source()).unwrap();
        assert!(!pipeline.save().await.unwrap());
    }
}
