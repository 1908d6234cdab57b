//! Cache persistence across "process restarts" (fresh pipeline instances
//! sharing a cache directory).
//!
//! Verifies:
//! - save → load reproduces identical atlas bytes and manifest
//! - a load into a differently sized atlas is discarded, not trusted
//! - corrupt or missing files degrade to an empty cache

use logos_sdf::{PathCommand, Point};
use logos_text::{
    AtlasConfig, CacheManifest, FontHandle, GlyphCache, GlyphData, GlyphId, GlyphKey,
    GlyphPipeline, MemoryGlyphSource, PipelineConfig, ATLAS_FILE, MANIFEST_FILE,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn triangle(s: f64) -> Vec<PathCommand> {
    vec![
        PathCommand::MoveTo(Point::new(0.0, 0.0)),
        PathCommand::LineTo(Point::new(s, 0.0)),
        PathCommand::LineTo(Point::new(s / 2.0, s)),
        PathCommand::Close,
    ]
}

fn key(glyph: u16) -> GlyphKey {
    GlyphKey::new("Persist Sans", 24.0, glyph)
}

fn source() -> MemoryGlyphSource {
    let mut source = MemoryGlyphSource::new();
    for g in 1..=6u16 {
        source.insert(key(g), GlyphData::outline(triangle(4.0 + g as f64), 10.0));
    }
    source.insert(key(32), GlyphData::empty(6.0));
    source
}

fn config(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig { cache_dir: Some(dir.to_path_buf()), ..PipelineConfig::for_testing() }
}

// ─── Round trip ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_save_and_reload_across_instances() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();

    let first = GlyphPipeline::new(config(dir.path()), source()).unwrap();
    let mut placed = Vec::new();
    for g in [3, 1, 32, 6] {
        placed.push(first.request(GlyphId::new(FontHandle(0), g), key(g)).await.unwrap());
    }
    assert!(first.save().await.unwrap());
    assert!(dir.path().join(MANIFEST_FILE).exists());
    assert!(dir.path().join(ATLAS_FILE).exists());

    // New process: font handles differ, stable keys do not.
    let second = GlyphPipeline::new(config(dir.path()), MemoryGlyphSource::new()).unwrap();
    assert_eq!(second.cache().len(), 4);
    assert_eq!(second.cache().atlas_bytes(), first.cache().atlas_bytes());
    assert_eq!(second.cache().atlas_id(), first.cache().atlas_id());

    let (m1, b1) = first.cache().flush();
    let (m2, b2) = second.cache().flush();
    assert_eq!(m1, m2);
    assert_eq!(b1, b2);

    // Served from the stable tier without touching the (empty) source.
    for (g, expected) in [3, 1, 32, 6].into_iter().zip(&placed) {
        let got = second.request(GlyphId::new(FontHandle(7), g), key(g)).await.unwrap();
        assert_eq!(&got, expected);
    }
    assert_eq!(second.cache().stats().stable_hits, 4);
}

#[test]
fn test_manifest_file_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let cache = GlyphCache::new(AtlasConfig::for_testing());
    cache.save_to_dir(dir.path()).unwrap();
    let bytes = std::fs::read(dir.path().join(MANIFEST_FILE)).unwrap();
    let manifest = CacheManifest::decode(&bytes).unwrap();
    assert_eq!(manifest.atlas_size, 128);
    assert!(manifest.glyphs.is_empty());
    let raw = std::fs::read(dir.path().join(ATLAS_FILE)).unwrap();
    assert_eq!(raw.len(), AtlasConfig::for_testing().byte_len());
}

// ─── Integrity ───────────────────────────────────────────────────────────────

#[test]
fn test_size_mismatch_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let small = GlyphPipeline::new(config(dir.path()), source()).unwrap();
    small.get_or_generate(GlyphId::new(FontHandle(0), 1), &key(1)).unwrap();
    small.cache().save_to_dir(dir.path()).unwrap();

    let bigger = PipelineConfig {
        atlas: AtlasConfig { size: 256, ..AtlasConfig::for_testing() },
        ..config(dir.path())
    };
    let pipeline = GlyphPipeline::new(bigger, source()).unwrap();
    assert!(pipeline.cache().is_empty());
    assert!(pipeline.cache().atlas_bytes().iter().all(|&b| b == 0));
    // Still fully usable.
    pipeline.get_or_generate(GlyphId::new(FontHandle(0), 2), &key(2)).unwrap();
}

#[test]
fn test_truncated_blob_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let cache = GlyphCache::new(AtlasConfig::for_testing());
    cache.save_to_dir(dir.path()).unwrap();
    let raw = dir.path().join(ATLAS_FILE);
    let bytes = std::fs::read(&raw).unwrap();
    std::fs::write(&raw, &bytes[..bytes.len() / 2]).unwrap();

    let fresh = GlyphCache::new(AtlasConfig::for_testing());
    assert!(!fresh.load_from_dir(dir.path()).unwrap());
    assert!(fresh.is_empty());
}

#[test]
fn test_corrupt_or_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache = GlyphCache::new(AtlasConfig::for_testing());

    // Nothing there yet.
    assert!(!cache.load_from_dir(dir.path()).unwrap());

    std::fs::write(dir.path().join(MANIFEST_FILE), b"not a manifest").unwrap();
    std::fs::write(dir.path().join(ATLAS_FILE), vec![0u8; 16]).unwrap();
    assert!(!cache.load_from_dir(dir.path()).unwrap());

    std::fs::remove_file(dir.path().join(ATLAS_FILE)).unwrap();
    assert!(!cache.load_from_dir(dir.path()).unwrap());
}
