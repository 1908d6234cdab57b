//! Glyph sources — where outlines and metrics come from.
//!
//! The pipeline asks a [`GlyphSource`] for a glyph by stable key and gets
//! back its metrics plus one of:
//!
//! ```text
//! GlyphGeometry::Outline(path commands)  → MSDF or rasterize + EDT
//! GlyphGeometry::Mask(binary mask)       → EDT only
//! GlyphGeometry::Empty                   → metrics-only record
//! ```
//!
//! Coordinates are pixels at the requested size, y-up (font convention).
//!
//! [`CosmicGlyphSource`] reads system fonts through `cosmic-text`'s
//! `FontSystem` and `SwashCache`. Fonts are named by PostScript name so the
//! stable key survives restarts.

use std::sync::{Mutex, MutexGuard, PoisonError};

use cosmic_text::{fontdb, CacheKey, CacheKeyFlags, Command, FontSystem, SwashCache};
use logos_sdf::{Mask, PathCommand, Point, Shape};
use rustc_hash::FxHashMap;

use crate::glyph::{FontHandle, GlyphId, GlyphKey, GlyphMetrics};

/// Drawable part of a glyph.
#[derive(Clone, Debug, PartialEq)]
pub enum GlyphGeometry {
    Outline(Vec<PathCommand>),
    Mask(Mask),
    Empty,
}

/// What a source knows about one glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphData {
    pub metrics: GlyphMetrics,
    pub geometry: GlyphGeometry,
}

impl GlyphData {
    /// Outline glyph with metrics taken from the outline bounds.
    pub fn outline(commands: Vec<PathCommand>, advance: f32) -> Self {
        let bounds = Shape::from_commands(commands.iter().copied()).bounds();
        Self {
            metrics: GlyphMetrics::from_bounds(bounds, advance),
            geometry: GlyphGeometry::Outline(commands),
        }
    }

    /// Nothing to draw, only an advance.
    pub fn empty(advance: f32) -> Self {
        Self {
            metrics: GlyphMetrics { advance, ..GlyphMetrics::default() },
            geometry: GlyphGeometry::Empty,
        }
    }
}

/// Upstream provider of glyph geometry and metrics.
pub trait GlyphSource: Send + Sync + 'static {
    /// `None` if the font or glyph is unknown.
    fn glyph(&self, key: &GlyphKey) -> Option<GlyphData>;
}

// ─── In-memory source ────────────────────────────────────────────────────────

/// Fixed table of glyphs, for synthetic fonts and tests.
#[derive(Default)]
pub struct MemoryGlyphSource {
    glyphs: FxHashMap<GlyphKey, GlyphData>,
}

impl MemoryGlyphSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: GlyphKey, data: GlyphData) {
        self.glyphs.insert(key, data);
    }

    pub fn with(mut self, key: GlyphKey, data: GlyphData) -> Self {
        self.insert(key, data);
        self
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl GlyphSource for MemoryGlyphSource {
    fn glyph(&self, key: &GlyphKey) -> Option<GlyphData> {
        self.glyphs.get(key).cloned()
    }
}

// ─── cosmic-text source ──────────────────────────────────────────────────────

struct CosmicState {
    font_system: FontSystem,
    swash_cache: SwashCache,
    by_name: FxHashMap<String, fontdb::ID>,
    handles: FxHashMap<fontdb::ID, FontHandle>,
}

impl CosmicState {
    fn resolve(&mut self, name: &str) -> Option<fontdb::ID> {
        if let Some(id) = self.by_name.get(name) {
            return Some(*id);
        }
        let id = self
            .font_system
            .db()
            .faces()
            .find(|face| face.post_script_name == name)
            .map(|face| face.id)?;
        self.by_name.insert(name.to_string(), id);
        Some(id)
    }

    fn handle(&mut self, id: fontdb::ID) -> FontHandle {
        let next = FontHandle(self.handles.len() as u32);
        *self.handles.entry(id).or_insert(next)
    }
}

/// System-font glyph source backed by `cosmic-text`.
pub struct CosmicGlyphSource {
    state: Mutex<CosmicState>,
}

impl CosmicGlyphSource {
    /// Discover system fonts.
    pub fn new() -> Self {
        Self::with_font_system(FontSystem::new())
    }

    pub fn with_font_system(font_system: FontSystem) -> Self {
        Self {
            state: Mutex::new(CosmicState {
                font_system,
                swash_cache: SwashCache::new(),
                by_name: FxHashMap::default(),
                handles: FxHashMap::default(),
            }),
        }
    }

    /// PostScript names of every loaded face, sorted.
    pub fn font_names(&self) -> Vec<String> {
        let state = self.lock();
        let mut names: Vec<String> =
            state.font_system.db().faces().map(|face| face.post_script_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Runtime and stable identities of the glyph `font` maps `ch` to.
    ///
    /// Plain character-map lookup: no shaping, no fallback. `None` if the
    /// font is unknown or has no glyph for `ch`.
    pub fn glyph_for_char(&self, font: &str, size: f32, ch: char) -> Option<(GlyphId, GlyphKey)> {
        let mut state = self.lock();
        let id = state.resolve(font)?;
        let face = state.font_system.get_font(id)?;
        let glyph = face.as_swash().charmap().map(ch);
        if glyph == 0 {
            return None;
        }
        let handle = state.handle(id);
        Some((GlyphId::new(handle, glyph), GlyphKey::new(font, size, glyph)))
    }

    fn lock(&self) -> MutexGuard<'_, CosmicState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CosmicGlyphSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphSource for CosmicGlyphSource {
    fn glyph(&self, key: &GlyphKey) -> Option<GlyphData> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let id = state.resolve(&key.font)?;
        let size = key.size();

        let face = state.font_system.get_font(id)?;
        let swash = face.as_swash();
        if key.glyph >= swash.metrics(&[]).glyph_count {
            return None;
        }
        let advance = swash.glyph_metrics(&[]).scale(size).advance_width(key.glyph);

        let (cache_key, _, _) = CacheKey::new(id, key.glyph, size, (0.0, 0.0), CacheKeyFlags::empty());
        let commands: Vec<PathCommand> = state
            .swash_cache
            .get_outline_commands(&mut state.font_system, cache_key)
            .map(|cmds| cmds.iter().map(convert_command).collect())
            .unwrap_or_default();

        if commands.is_empty() {
            log::trace!("{key:?} has no outline");
            return Some(GlyphData::empty(advance));
        }
        Some(GlyphData::outline(commands, advance))
    }
}

fn convert_command(command: &Command) -> PathCommand {
    let p = |x: f32, y: f32| Point::new(x as f64, y as f64);
    match *command {
        Command::MoveTo(to) => PathCommand::MoveTo(p(to.x, to.y)),
        Command::LineTo(to) => PathCommand::LineTo(p(to.x, to.y)),
        Command::QuadTo(c, to) => PathCommand::QuadTo(p(c.x, c.y), p(to.x, to.y)),
        Command::CurveTo(c1, c2, to) => {
            PathCommand::CubicTo(p(c1.x, c1.y), p(c2.x, c2.y), p(to.x, to.y))
        }
        Command::Close => PathCommand::Close,
    }
}

// ===================================================================
// Tests
// ===================================================================
