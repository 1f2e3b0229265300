use crate::config::MaterialConfig;
use crate::raster::RasterImage;
use crate::texture::{TextTexture, TextureLedger, WrapMode};
use crate::utils::rgb_from_hex;
use log::debug;
use uuid::Uuid;

/// Surface description shared by every mesh that shows the text.
#[derive(Debug)]
pub struct Material {
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    /// When set the map's alpha decides where it covers the base color;
    /// otherwise the map covers the whole surface.
    pub transparent: bool,
    map: Option<TextTexture>,
    /// Set whenever the material must be re-composited by the renderer.
    pub needs_update: bool,
}

impl Material {
    pub fn new(config: &MaterialConfig) -> Self {
        Self {
            color: rgb_from_hex(config.color),
            metalness: config.metalness,
            roughness: config.roughness,
            transparent: false,
            map: None,
            needs_update: true,
        }
    }

    pub fn map(&self) -> Option<&TextTexture> {
        self.map.as_ref()
    }

    pub fn map_mut(&mut self) -> Option<&mut TextTexture> {
        self.map.as_mut()
    }

    /// Releases the current map, if any.
    pub fn clear_map(&mut self) {
        if let Some(old) = self.map.take() {
            old.dispose();
            self.needs_update = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No material yet; nothing happened.
    Skipped,
    /// A new texture with this id now sits in the material's map slot.
    Installed(Uuid),
}

/// Replaces the material's map with a texture built from `raster`.
///
/// The previous texture is released before the new one is created, so at most
/// one texture per material is alive at any time.
pub fn refresh(
    raster: RasterImage,
    material: Option<&mut Material>,
    ledger: &TextureLedger,
) -> RefreshOutcome {
    let Some(material) = material else {
        debug!("Material not ready for text update");
        return RefreshOutcome::Skipped;
    };

    material.clear_map();

    let mut texture = ledger.create(raster);
    texture.wrap_s = WrapMode::ClampToEdge;
    texture.wrap_t = WrapMode::Repeat;
    texture.needs_update = true;
    let id = texture.id();

    material.transparent = true;
    material.map = Some(texture);
    material.needs_update = true;
    RefreshOutcome::Installed(id)
}
