//! Two-tier glyph cache over one shared atlas.
//!
//! ```text
//!            ┌──────────── read fast path (RwLock read guards) ───────────┐
//! lookup ──► │ session: FxHashMap<GlyphId, AtlasLocation>     (in-process) │
//!            │ stable:  BTreeMap<GlyphKey, AtlasLocation>     (persisted)  │
//!            └─────────────────────────────────────────────────────────────┘
//! place / insert / promote / flush / restore / reset
//!        ──► writer: Mutex<AtlasPacker + atlas id>     (single writer)
//! ```
//!
//! Every mutation of the atlas pixels, the skyline, or either map happens
//! while holding the writer lock, so `flush` can never observe a
//! half-written atlas. Readers only take the map read locks; a location
//! becomes visible after its pixels are already in the atlas.
//!
//! Persisted layout: a bincode manifest (version, atlas id, size, format,
//! skyline, stable map) and a raw blob of exactly
//! `size * size * bytes_per_pixel` bytes. No compression.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use logos_sdf::{PixelFormat, SdfRaster};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::atlas::{validate_skyline, AtlasPacker, SkylineNode};
use crate::error::CacheError;
use crate::glyph::{AtlasLocation, AtlasSlot, GlyphId, GlyphKey, GlyphMetrics};

/// Bumped whenever the manifest layout changes. Older caches are discarded.
pub const MANIFEST_VERSION: u32 = 1;

/// File names used by [`GlyphCache::save_to_dir`].
pub const MANIFEST_FILE: &str = "glyph_atlas.manifest";
pub const ATLAS_FILE: &str = "glyph_atlas.raw";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Atlas configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    /// Width and height in pixels. Default: 1024.
    pub size: u32,
    /// Pixel layout; must match the generator's output. Default: RGBA (MSDF).
    pub format: PixelFormat,
    /// Blank pixels reserved right of and below each glyph. Default: 1.
    pub gutter: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self { size: 1024, format: PixelFormat::Rgba8, gutter: 1 }
    }
}

impl AtlasConfig {
    /// Config for testing (small atlas).
    pub fn for_testing() -> Self {
        Self { size: 128, format: PixelFormat::Rgba8, gutter: 1 }
    }

    /// Exact byte length of the raw atlas blob.
    pub fn byte_len(&self) -> usize {
        self.size as usize * self.size as usize * self.format.bytes_per_pixel()
    }
}

// ─── Manifest ────────────────────────────────────────────────────────────────

/// Persisted cache index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub atlas_id: Uuid,
    pub atlas_size: u32,
    pub format: PixelFormat,
    pub used_area: u64,
    pub skyline: Vec<SkylineNode>,
    /// Sorted by key so the encoded bytes are reproducible.
    pub glyphs: BTreeMap<GlyphKey, AtlasLocation>,
}

impl CacheManifest {
    /// Serialize to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        let (manifest, _): (Self, _) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(manifest)
    }

    /// Check the manifest and blob against the configured atlas.
    pub fn validate(&self, config: &AtlasConfig, atlas_bytes: &[u8]) -> Result<(), CacheError> {
        if self.version != MANIFEST_VERSION {
            return Err(CacheError::VersionMismatch { expected: MANIFEST_VERSION, found: self.version });
        }
        if self.atlas_size != config.size || self.format != config.format {
            return Err(CacheError::AtlasMismatch {
                size: config.size,
                format: config.format,
                found_size: self.atlas_size,
                found_format: self.format,
            });
        }
        if atlas_bytes.len() != config.byte_len() {
            return Err(CacheError::ByteLength { expected: config.byte_len(), actual: atlas_bytes.len() });
        }
        validate_skyline(&self.skyline, config.size).map_err(CacheError::CorruptSkyline)?;
        for (key, location) in &self.glyphs {
            if let Some(slot) = &location.slot {
                let r = slot.rect;
                let fits = |start: u32, extent: u32| {
                    start.checked_add(extent).is_some_and(|end| end <= config.size)
                };
                if !fits(r.x, r.width) || !fits(r.y, r.height) {
                    return Err(CacheError::GlyphOutOfBounds(key.clone()));
                }
            }
        }
        Ok(())
    }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub session_hits: u64,
    pub stable_hits: u64,
    pub misses: u64,
    /// Entries in the stable tier.
    pub glyphs: usize,
    pub atlas_occupancy: f32,
}

#[derive(Default)]
struct Counters {
    session_hits: AtomicU64,
    stable_hits: AtomicU64,
    misses: AtomicU64,
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Outcome of [`GlyphCache::place`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Newly written into the atlas (or recorded as blank).
    Inserted(AtlasLocation),
    /// Another writer placed the same key first; its location is reused.
    Cached(AtlasLocation),
    /// No room left. Nothing was modified.
    AtlasFull,
}

struct Writer {
    packer: AtlasPacker,
    atlas_id: Uuid,
}

/// Two-tier glyph cache owning the atlas.
pub struct GlyphCache {
    config: AtlasConfig,
    session: RwLock<FxHashMap<GlyphId, AtlasLocation>>,
    stable: RwLock<BTreeMap<GlyphKey, AtlasLocation>>,
    writer: Mutex<Writer>,
    counters: Counters,
}

impl GlyphCache {
    pub fn new(config: AtlasConfig) -> Self {
        let packer = AtlasPacker::new(config.size, config.format);
        Self {
            config,
            session: RwLock::new(FxHashMap::default()),
            stable: RwLock::new(BTreeMap::new()),
            writer: Mutex::new(Writer { packer, atlas_id: Uuid::new_v4() }),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Identifier of the current atlas texture. Changes on reset/restore,
    /// which invalidates every location handed out before.
    pub fn atlas_id(&self) -> Uuid {
        self.lock_writer().atlas_id
    }

    /// In-session hit, no counters.
    pub fn get_session(&self, id: &GlyphId) -> Option<AtlasLocation> {
        read(&self.session).get(id).copied()
    }

    /// Cross-session hit, no counters.
    pub fn get_stable(&self, key: &GlyphKey) -> Option<AtlasLocation> {
        read(&self.stable).get(key).copied()
    }

    /// Cache lookup: session tier, then stable tier (promoting the hit into
    /// the session tier), then miss.
    pub fn lookup(&self, id: GlyphId, key: &GlyphKey) -> Option<AtlasLocation> {
        if let Some(location) = self.get_session(&id) {
            self.counters.session_hits.fetch_add(1, Ordering::Relaxed);
            return Some(location);
        }
        if let Some(location) = self.get_stable(key) {
            self.counters.stable_hits.fetch_add(1, Ordering::Relaxed);
            self.promote(id, key);
            return Some(location);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn promote(&self, id: GlyphId, key: &GlyphKey) {
        let _writer = self.lock_writer();
        // A reset may have run since the read; only promote what is still there.
        if let Some(location) = read(&self.stable).get(key).copied() {
            write(&self.session).insert(id, location);
        }
    }

    /// Record an already placed location under both identities.
    pub fn insert(&self, id: GlyphId, key: GlyphKey, location: AtlasLocation) {
        let _writer = self.lock_writer();
        write(&self.stable).insert(key, location);
        write(&self.session).insert(id, location);
    }

    /// Place `raster` into the atlas and record it under both identities.
    ///
    /// `None` records a metrics-only entry. If the key was placed by a
    /// concurrent writer in the meantime, that location is returned instead
    /// and the atlas is left untouched.
    pub fn place(
        &self,
        id: GlyphId,
        key: GlyphKey,
        raster: Option<&SdfRaster>,
        padding: u32,
        metrics: GlyphMetrics,
    ) -> Placement {
        let mut writer = self.lock_writer();

        if let Some(existing) = read(&self.stable).get(&key).copied() {
            write(&self.session).insert(id, existing);
            return Placement::Cached(existing);
        }

        let location = match raster {
            None => AtlasLocation::blank(metrics),
            Some(raster) => {
                let Some(rect) = writer.packer.add(raster, self.config.gutter) else {
                    log::warn!(
                        "atlas full: {}x{} raster for {:?} (occupancy {:.1}%)",
                        raster.width,
                        raster.height,
                        key,
                        writer.packer.occupancy() * 100.0
                    );
                    return Placement::AtlasFull;
                };
                AtlasLocation {
                    slot: Some(AtlasSlot { uv: writer.packer.rect_to_region(&rect), rect }),
                    padding,
                    metrics,
                }
            }
        };

        log::debug!("placed {:?} at {:?}", key, location.slot.map(|s| s.rect));
        write(&self.stable).insert(key, location);
        write(&self.session).insert(id, location);
        Placement::Inserted(location)
    }

    /// Snapshot manifest and atlas bytes, serialized against placement.
    pub fn flush(&self) -> (CacheManifest, Vec<u8>) {
        let writer = self.lock_writer();
        let manifest = CacheManifest {
            version: MANIFEST_VERSION,
            atlas_id: writer.atlas_id,
            atlas_size: self.config.size,
            format: self.config.format,
            used_area: writer.packer.used_area(),
            skyline: writer.packer.skyline().to_vec(),
            glyphs: read(&self.stable).clone(),
        };
        (manifest, writer.packer.data().to_vec())
    }

    /// Replace the cache contents with persisted state.
    ///
    /// Returns `false` and leaves an empty atlas if the state does not match
    /// the configured atlas. The session tier is always cleared.
    pub fn restore(&self, manifest: CacheManifest, atlas_bytes: Vec<u8>) -> bool {
        let mut writer = self.lock_writer();
        write(&self.session).clear();

        if let Err(e) = manifest.validate(&self.config, &atlas_bytes) {
            log::warn!("discarding persisted glyph cache: {e}");
            Self::clear_locked(&mut writer, &self.stable);
            return false;
        }
        let Some(packer) = AtlasPacker::from_parts(
            manifest.atlas_size,
            manifest.format,
            manifest.skyline,
            atlas_bytes,
            manifest.used_area,
        ) else {
            log::warn!("discarding persisted glyph cache: atlas rebuild failed");
            Self::clear_locked(&mut writer, &self.stable);
            return false;
        };

        log::info!("restored glyph cache: {} glyphs, atlas {}", manifest.glyphs.len(), manifest.atlas_id);
        writer.packer = packer;
        writer.atlas_id = manifest.atlas_id;
        *write(&self.stable) = manifest.glyphs;
        true
    }

    /// Drop every glyph and start a fresh atlas with a new id.
    pub fn reset(&self) {
        let mut writer = self.lock_writer();
        write(&self.session).clear();
        Self::clear_locked(&mut writer, &self.stable);
        log::info!("glyph cache reset, new atlas {}", writer.atlas_id);
    }

    fn clear_locked(writer: &mut Writer, stable: &RwLock<BTreeMap<GlyphKey, AtlasLocation>>) {
        writer.packer.clear();
        writer.atlas_id = Uuid::new_v4();
        write(stable).clear();
    }

    /// Copy of the atlas pixels for upload.
    pub fn atlas_bytes(&self) -> Vec<u8> {
        self.lock_writer().packer.data().to_vec()
    }

    /// Number of glyphs in the stable tier.
    pub fn len(&self) -> usize {
        read(&self.stable).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let occupancy = self.lock_writer().packer.occupancy();
        CacheStats {
            session_hits: self.counters.session_hits.load(Ordering::Relaxed),
            stable_hits: self.counters.stable_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            glyphs: self.len(),
            atlas_occupancy: occupancy,
        }
    }

    // ─── Disk persistence ────────────────────────────────────────────────

    /// Write manifest and atlas blob into `dir`.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), CacheError> {
        let (manifest, bytes) = self.flush();
        let encoded = manifest.encode()?;
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(ATLAS_FILE), &bytes)?;
        std::fs::write(dir.join(MANIFEST_FILE), &encoded)?;
        log::info!(
            "saved glyph cache to {}: {} glyphs, {} manifest bytes, {} atlas bytes",
            dir.display(),
            manifest.glyphs.len(),
            encoded.len(),
            bytes.len()
        );
        Ok(())
    }

    /// Load a cache written by [`save_to_dir`](Self::save_to_dir).
    ///
    /// `Ok(false)` when nothing usable was found: missing files, an
    /// undecodable manifest, or state that does not match the configured
    /// atlas. Only unexpected I/O failures are errors.
    pub fn load_from_dir(&self, dir: &Path) -> Result<bool, CacheError> {
        let manifest_bytes = match std::fs::read(dir.join(MANIFEST_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no glyph cache in {}", dir.display());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let atlas_bytes = match std::fs::read(dir.join(ATLAS_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("glyph cache manifest without atlas blob in {}", dir.display());
                self.reset();
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        match CacheManifest::decode(&manifest_bytes) {
            Ok(manifest) => Ok(self.restore(manifest, atlas_bytes)),
            Err(e) => {
                log::warn!("discarding persisted glyph cache: {e}");
                self.reset();
                Ok(false)
            }
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, Writer> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ===================================================================
// Tests
// ===================================================================
