use crate::assets::{AssetFetcher, AssetSource, Typeface3D};
use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::config::{FontOption, PreviewConfig};
use crate::error::PreviewError;
use crate::font::{FontCatalog, FontResolver};
use crate::material::{refresh, RefreshOutcome};
use crate::pipeline::{LoadPipeline, LoadState};
use crate::scene::{ModelKind, Scene};
use crate::text_canvas::{TextCanvas, TextTextureGenerator};
use crate::texture::TextureLedger;
use log::{debug, info};

/// Owns every piece of preview state: the text field, the font selector,
/// the scene with its text material, the camera and the asset loader.
pub struct PreviewContext {
    config: PreviewConfig,
    text: String,
    fonts: FontCatalog,
    generator: TextTextureGenerator,
    ledger: TextureLedger,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    loader: LoadPipeline,
    typeface: Option<Typeface3D>,
}

impl PreviewContext {
    /// Context backed by system fonts plus any `assets.font_files`.
    pub fn new(config: PreviewConfig) -> Result<Self, PreviewError> {
        let mut resolver = FontResolver::new();
        for path in &config.assets.font_files {
            let data = std::fs::read(path)?;
            info!("Registering font file {}", path.display());
            resolver.load_font_data(data);
        }
        Self::with_fonts(config, resolver)
    }

    pub fn with_fonts(config: PreviewConfig, resolver: FontResolver) -> Result<Self, PreviewError> {
        let canvas = TextCanvas::new(config.canvas.clone())?;
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        let mut camera = PerspectiveCamera::new(&config.camera, aspect);
        let controls = OrbitControls::new(&config.controls);
        camera.target = controls.target;

        Ok(Self {
            text: String::new(),
            fonts: FontCatalog::new(config.fonts.0.clone()),
            generator: TextTextureGenerator::new(canvas, resolver),
            ledger: TextureLedger::new(),
            scene: Scene::new(&config.scene),
            camera,
            controls,
            loader: LoadPipeline::new(
                AssetSource::parse(&config.assets.typeface),
                AssetSource::parse(&config.assets.model),
            ),
            typeface: None,
            config,
        })
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn current_font(&self) -> &FontOption {
        self.fonts.current()
    }

    pub fn fonts(&self) -> &FontCatalog {
        &self.fonts
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn ledger(&self) -> &TextureLedger {
        &self.ledger
    }

    pub fn load_state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn loader(&self) -> &LoadPipeline {
        &self.loader
    }

    pub fn typeface(&self) -> Option<&Typeface3D> {
        self.typeface.as_ref()
    }

    /// Replaces the whole text field, as an input event would.
    pub fn set_text(&mut self, text: &str) -> RefreshOutcome {
        self.text = text.to_string();
        self.refresh_texture()
    }

    pub fn insert_text(&mut self, text: &str) -> RefreshOutcome {
        self.text.push_str(text);
        self.refresh_texture()
    }

    pub fn backspace(&mut self) -> RefreshOutcome {
        if self.text.pop().is_none() {
            return RefreshOutcome::Skipped;
        }
        self.refresh_texture()
    }

    pub fn clear_text(&mut self) -> RefreshOutcome {
        self.text.clear();
        self.refresh_texture()
    }

    pub fn select_font(&mut self, index: usize) -> RefreshOutcome {
        if !self.fonts.select(index) {
            return RefreshOutcome::Skipped;
        }
        self.refresh_texture()
    }

    pub fn cycle_font(&mut self, step: isize) -> RefreshOutcome {
        if !self.fonts.cycle(step) {
            return RefreshOutcome::Skipped;
        }
        self.refresh_texture()
    }

    /// Regenerates the raster from the current text and font and installs it
    /// on the text material. A no-op until the model is in the scene.
    pub fn refresh_texture(&mut self) -> RefreshOutcome {
        if self.scene.text_material().is_none() {
            debug!("Tumbler object or material not ready for text update.");
            return RefreshOutcome::Skipped;
        }
        let family = self.fonts.current().family.clone();
        let raster = self.generator.generate(&self.text, &family);
        let outcome = refresh(raster, self.scene.text_material_mut(), &self.ledger);
        if let RefreshOutcome::Installed(_) = outcome {
            info!("Updated text to: \"{}\" with font: \"{}\"", self.text, family);
        }
        outcome
    }

    /// Advances asset loading by at most one stage without blocking. When
    /// loading finishes the model (or its fallback) enters the scene and the
    /// first refresh runs.
    pub fn poll_assets(&mut self, fetcher: &dyn AssetFetcher) -> LoadState {
        let state = self.loader.step(fetcher);
        self.install_loaded();
        state
    }

    /// Runs the loader to completion in one go, waiting on each fetch.
    pub fn load_all(&mut self, fetcher: &dyn AssetFetcher) {
        self.loader.run_to_completion(fetcher);
        self.install_loaded();
    }

    fn install_loaded(&mut self) {
        let Some(loaded) = self.loader.take_loaded() else {
            return;
        };
        self.typeface = loaded.typeface;
        let kind = self.scene.install_model(
            loaded.model,
            &self.config.material,
            &self.config.model,
            &self.config.fallback,
        );
        if kind == ModelKind::Fallback {
            info!("Scene is using the fallback cylinder");
        }
        self.refresh_texture();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    /// Per-frame update of the camera controls.
    pub fn update(&mut self, dt: f32) {
        self.controls.update(&mut self.camera, dt);
    }
}
