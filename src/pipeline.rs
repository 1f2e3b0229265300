use crate::assets::{AssetFetcher, AssetSource, FetchResult, ModelAsset, PendingFetch, Typeface3D};
use crate::error::PreviewError;
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Font,
    Model,
}

/// Progress of the font-then-model load.
///
/// ```text
/// Idle -> FontPending -> ModelPending -> Ready
///              |               |
///              v               v
///        Failed(Font)    Failed(Model)
///              |               |
///              +-> ModelPending +-> Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    FontPending,
    ModelPending,
    Failed(LoadStage),
    Ready,
}

#[derive(Debug)]
pub struct LoadFailure {
    pub stage: LoadStage,
    pub error: PreviewError,
}

/// What the pipeline hands over once it reaches [`LoadState::Ready`].
/// `None` means the stage failed and a fallback applies.
#[derive(Debug, Default)]
pub struct LoadedAssets {
    pub typeface: Option<Typeface3D>,
    pub model: Option<ModelAsset>,
}

/// Loads the typeface and then the model, one transition per [`step`].
///
/// Entering a pending state starts the fetch; the state holds until the
/// fetch finishes. A failed stage never stops the pipeline; it records the
/// failure and moves on, so `Ready` is always reached.
///
/// [`step`]: LoadPipeline::step
pub struct LoadPipeline {
    state: LoadState,
    typeface_source: AssetSource,
    model_source: AssetSource,
    typeface: Option<Typeface3D>,
    model: Option<ModelAsset>,
    failures: Vec<LoadFailure>,
    in_flight: Option<PendingFetch>,
    delivered: bool,
}

impl LoadPipeline {
    pub fn new(typeface_source: AssetSource, model_source: AssetSource) -> Self {
        Self {
            state: LoadState::Idle,
            typeface_source,
            model_source,
            typeface: None,
            model: None,
            failures: Vec::new(),
            in_flight: None,
            delivered: false,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// Performs at most one transition and returns the new state. Never
    /// blocks: a pending stage whose fetch is still running stays put.
    pub fn step(&mut self, fetcher: &dyn AssetFetcher) -> LoadState {
        self.advance(fetcher, false)
    }

    /// Steps until `Ready`, waiting on fetches as needed.
    pub fn run_to_completion(&mut self, fetcher: &dyn AssetFetcher) {
        while !self.is_ready() {
            self.advance(fetcher, true);
        }
    }

    /// Hands the loaded assets over exactly once, after `Ready`.
    pub fn take_loaded(&mut self) -> Option<LoadedAssets> {
        if !self.is_ready() || self.delivered {
            return None;
        }
        self.delivered = true;
        Some(LoadedAssets {
            typeface: self.typeface.take(),
            model: self.model.take(),
        })
    }

    fn advance(&mut self, fetcher: &dyn AssetFetcher, wait: bool) -> LoadState {
        self.state = match self.state {
            LoadState::Idle => {
                info!("Requesting typeface from {}", self.typeface_source);
                self.in_flight = Some(fetcher.request(&self.typeface_source));
                LoadState::FontPending
            }
            LoadState::FontPending => match self.poll(fetcher, LoadStage::Font, wait) {
                None => LoadState::FontPending,
                Some(bytes) => match bytes.and_then(|b| Typeface3D::from_json_bytes(&b)) {
                    Ok(typeface) => {
                        info!(
                            "Typeface '{}' loaded ({} glyphs)",
                            typeface.family(),
                            typeface.glyph_count()
                        );
                        self.typeface = Some(typeface);
                        self.begin_model(fetcher)
                    }
                    Err(e) => self.fail(LoadStage::Font, e),
                },
            },
            LoadState::Failed(LoadStage::Font) => {
                warn!("Continuing without a typeface");
                self.begin_model(fetcher)
            }
            LoadState::ModelPending => match self.poll(fetcher, LoadStage::Model, wait) {
                None => LoadState::ModelPending,
                Some(bytes) => match bytes.and_then(|b| ModelAsset::from_gltf_bytes(&b)) {
                    Ok(model) => {
                        info!("Model loaded from {}", self.model_source);
                        self.model = Some(model);
                        LoadState::Ready
                    }
                    Err(e) => self.fail(LoadStage::Model, e),
                },
            },
            LoadState::Failed(LoadStage::Model) => {
                warn!("Continuing with the fallback model");
                LoadState::Ready
            }
            LoadState::Ready => LoadState::Ready,
        };
        self.state
    }

    fn begin_model(&mut self, fetcher: &dyn AssetFetcher) -> LoadState {
        info!("Requesting model from {}", self.model_source);
        self.in_flight = Some(fetcher.request(&self.model_source));
        LoadState::ModelPending
    }

    /// The finished fetch for `stage`, or `None` while it is still running.
    fn poll(
        &mut self,
        fetcher: &dyn AssetFetcher,
        stage: LoadStage,
        wait: bool,
    ) -> Option<FetchResult> {
        let pending = self.in_flight.get_or_insert_with(|| {
            let source = match stage {
                LoadStage::Font => &self.typeface_source,
                LoadStage::Model => &self.model_source,
            };
            fetcher.request(source)
        });
        let result = if wait {
            pending.wait()
        } else {
            pending.try_take()?
        };
        self.in_flight = None;
        Some(result)
    }

    fn fail(&mut self, stage: LoadStage, error: PreviewError) -> LoadState {
        error!("{:?} load failed: {}", stage, error);
        self.failures.push(LoadFailure { stage, error });
        LoadState::Failed(stage)
    }
}
