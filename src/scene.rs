use crate::assets::ModelAsset;
use crate::config::{FallbackConfig, LightConfig, MaterialConfig, ModelConfig, SceneConfig};
use crate::geometry::{fallback_tumbler, MeshBuffers};
use crate::material::Material;
use crate::utils::rgb_from_hex;
use glam::{Mat4, Vec3};
use log::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light position; it shines towards the origin.
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the scene towards the light.
    pub fn direction(&self) -> Vec3 {
        self.position.try_normalize().unwrap_or(Vec3::Y)
    }
}

/// What a mesh is shaded with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// The scene's shared text material.
    TextMaterial,
    /// The mesh's own flat color from the model file.
    Base {
        color: [f32; 4],
        metalness: f32,
        roughness: f32,
    },
}

#[derive(Debug, Clone)]
pub struct Mesh {
    id: Uuid,
    pub name: String,
    pub buffers: MeshBuffers,
    pub transform: Mat4,
    pub surface: Surface,
}

impl Mesh {
    pub fn new(name: &str, buffers: MeshBuffers, transform: Mat4, surface: Surface) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            buffers,
            transform,
            surface,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Loaded,
    Fallback,
}

/// The one scene the preview shows: lights, the tumbler meshes, and the
/// material that carries the text.
#[derive(Debug)]
pub struct Scene {
    pub background: [f32; 3],
    pub ambient: AmbientLight,
    pub sun: DirectionalLight,
    meshes: Vec<Mesh>,
    text_material: Option<Material>,
    model_kind: Option<ModelKind>,
}

impl Scene {
    pub fn new(config: &SceneConfig) -> Self {
        let light = |l: &LightConfig| (rgb_from_hex(l.color), l.intensity);
        let (ambient_color, ambient_intensity) = light(&config.ambient);
        let (sun_color, sun_intensity) = light(&config.sun);
        Self {
            background: rgb_from_hex(config.background),
            ambient: AmbientLight {
                color: ambient_color,
                intensity: ambient_intensity,
            },
            sun: DirectionalLight {
                color: sun_color,
                intensity: sun_intensity,
                position: Vec3::from(config.sun.position),
            },
            meshes: Vec::new(),
            text_material: None,
            model_kind: None,
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn model_kind(&self) -> Option<ModelKind> {
        self.model_kind
    }

    pub fn text_material(&self) -> Option<&Material> {
        self.text_material.as_ref()
    }

    pub fn text_material_mut(&mut self) -> Option<&mut Material> {
        self.text_material.as_mut()
    }

    /// Number of meshes shaded with the text material.
    pub fn text_surface_count(&self) -> usize {
        self.meshes
            .iter()
            .filter(|m| m.surface == Surface::TextMaterial)
            .count()
    }

    /// Puts the tumbler into the scene: the loaded model when it has at least
    /// one mesh, the fallback cylinder otherwise. Either way the text
    /// material exists afterwards.
    pub fn install_model(
        &mut self,
        model: Option<ModelAsset>,
        material: &MaterialConfig,
        placement: &ModelConfig,
        fallback: &FallbackConfig,
    ) -> ModelKind {
        self.meshes.clear();
        self.text_material = Some(Material::new(material));

        let model = match model {
            Some(model) if !model.meshes.is_empty() => model,
            Some(_) => {
                warn!("Could not find a suitable mesh in the model to apply text material. Using fallback.");
                return self.install_fallback(fallback);
            }
            None => {
                info!("Using placeholder cylinder as tumbler model");
                return self.install_fallback(fallback);
            }
        };

        let root = Mat4::from_translation(Vec3::new(0.0, placement.offset_y, 0.0))
            * Mat4::from_scale(Vec3::splat(placement.scale));
        for (i, part) in model.meshes.into_iter().enumerate() {
            // only the first mesh carries the text
            let surface = if i == 0 {
                Surface::TextMaterial
            } else {
                Surface::Base {
                    color: part.base_color,
                    metalness: part.metalness,
                    roughness: part.roughness,
                }
            };
            self.meshes
                .push(Mesh::new(&part.name, part.buffers, root * part.transform, surface));
        }
        info!("Installed model with {} mesh(es)", self.meshes.len());
        self.model_kind = Some(ModelKind::Loaded);
        ModelKind::Loaded
    }

    fn install_fallback(&mut self, fallback: &FallbackConfig) -> ModelKind {
        let transform = Mat4::from_translation(Vec3::new(0.0, fallback.offset_y, 0.0));
        self.meshes.push(Mesh::new(
            "fallback-cylinder",
            fallback_tumbler(fallback),
            transform,
            Surface::TextMaterial,
        ));
        self.model_kind = Some(ModelKind::Fallback);
        ModelKind::Fallback
    }
}
