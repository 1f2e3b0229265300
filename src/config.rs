use crate::error::PreviewError;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

pub const DEFAULT_TYPEFACE_URL: &str =
    "https://cdn.jsdelivr.net/npm/three@0.128.0/examples/fonts/helvetiker_regular.typeface.json";
pub const DEFAULT_MODEL_URL: &str = "https://raw.githubusercontent.com/KhronosGroup/glTF-Sample-Models/master/2.0/MetalRoughSpheres/glTF-Binary/MetalRoughSpheres.glb";

/// Everything the preview can be tuned with. Every field has a default, so an
/// empty TOML document reproduces the stock preview.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub canvas: CanvasConfig,
    pub assets: AssetsConfig,
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub material: MaterialConfig,
    pub model: ModelConfig,
    pub fallback: FallbackConfig,
    pub window: WindowConfig,
    pub fonts: FontsConfig,
}

impl PreviewConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreviewError> {
        let data = read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, PreviewError> {
        Ok(toml::from_str(data)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub resolution: u32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub shrink_per_char: f32,
    /// Fraction of the canvas width a line may occupy.
    pub max_line_width: f32,
    /// Line advance as a multiple of the font size.
    pub line_height: f32,
    /// Upward nudge of the whole block as a multiple of the font size.
    pub baseline_shift: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            resolution: 1024,
            min_font_size: 60.0,
            max_font_size: 200.0,
            shrink_per_char: 5.0,
            max_line_width: 0.9,
            line_height: 1.2,
            baseline_shift: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub typeface: String,
    pub model: String,
    pub max_download_bytes: u64,
    /// Upper bound on a single remote download.
    pub download_timeout_secs: u64,
    /// Extra TrueType/OpenType files made available to the font selector.
    pub font_files: Vec<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            typeface: DEFAULT_TYPEFACE_URL.to_string(),
            model: DEFAULT_MODEL_URL.to_string(),
            max_download_bytes: 32 * 1024 * 1024,
            download_timeout_secs: 30,
            font_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LightConfig {
    pub color: u32,
    pub intensity: f32,
    #[serde(default)]
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: u32,
    pub ambient: LightConfig,
    pub sun: LightConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: 0xeeeeee,
            ambient: LightConfig {
                color: 0xffffff,
                intensity: 0.5,
                position: [0.0; 3],
            },
            sun: LightConfig {
                color: 0xffffff,
                intensity: 1.0,
                position: [5.0, 10.0, 7.5],
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 1.5, 4.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub target: [f32; 3],
    pub auto_rotate: bool,
    /// 2.0 means one full turn every 30 seconds.
    pub auto_rotate_speed: f32,
    /// Seconds without user input before the idle orbit resumes.
    pub idle_delay: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping: 0.05,
            min_distance: 1.0,
            max_distance: 20.0,
            target: [0.0, 1.0, 0.0],
            auto_rotate: true,
            auto_rotate_speed: 2.0,
            idle_delay: 3.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub color: u32,
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            color: 0x808080,
            metalness: 0.5,
            roughness: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub scale: f32,
    pub offset_y: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scale: 0.5,
            offset_y: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub height: f32,
    pub radial_segments: u32,
    pub offset_y: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            radius_top: 0.5,
            radius_bottom: 0.6,
            height: 2.0,
            radial_segments: 32,
            offset_y: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Tumbler Preview".to_string(),
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FontOption {
    pub label: String,
    /// CSS-style family list, e.g. `"Verdana, sans-serif"`.
    pub family: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct FontsConfig(pub Vec<FontOption>);

impl Default for FontsConfig {
    fn default() -> Self {
        Self(vec![FontOption {
            label: "Default 3D Font".to_string(),
            family: "Arial, sans-serif".to_string(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PreviewConfig::from_toml_str("").expect("parse");
        assert_eq!(config.canvas.resolution, 1024);
        assert_eq!(config.material.color, 0x808080);
        assert_eq!(config.fonts.0.len(), 1);
        assert_eq!(config.fonts.0[0].family, "Arial, sans-serif");
    }
}
