use crate::raster::RasterImage;
use log::debug;
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    live: Cell<usize>,
    peak: Cell<usize>,
    created: Cell<usize>,
}

/// Counts texture objects so a leak is observable.
///
/// Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct TextureLedger {
    counts: Rc<LedgerCounts>,
}

impl TextureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `image` in a new texture. Defaults to clamping on both axes.
    pub fn create(&self, image: RasterImage) -> TextTexture {
        let counts = &self.counts;
        counts.live.set(counts.live.get() + 1);
        counts.created.set(counts.created.get() + 1);
        counts.peak.set(counts.peak.get().max(counts.live.get()));

        TextTexture {
            id: Uuid::new_v4(),
            image,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            needs_update: true,
            _live: LiveTexture {
                counts: self.counts.clone(),
            },
        }
    }

    pub fn live(&self) -> usize {
        self.counts.live.get()
    }

    /// Highest number of textures alive at the same time.
    pub fn peak(&self) -> usize {
        self.counts.peak.get()
    }

    pub fn created(&self) -> usize {
        self.counts.created.get()
    }
}

#[derive(Debug)]
struct LiveTexture {
    counts: Rc<LedgerCounts>,
}

impl Drop for LiveTexture {
    fn drop(&mut self) {
        self.counts.live.set(self.counts.live.get().saturating_sub(1));
    }
}

/// A raster bound for sampling by a material.
#[derive(Debug)]
pub struct TextTexture {
    id: Uuid,
    image: RasterImage,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    /// Set when the pixels must be (re)uploaded before the next draw.
    pub needs_update: bool,
    _live: LiveTexture,
}

impl TextTexture {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Releases the texture. Dropping has the same effect; this spells it out
    /// at call sites that replace a texture.
    pub fn dispose(self) {
        debug!("disposing text texture {}", self.id);
    }
}
