use crate::error::PreviewError;
use crate::geometry::MeshBuffers;
use glam::Mat4;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

/// Where an asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Path(PathBuf),
    Url(String),
}

impl AssetSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

pub type FetchResult = Result<Vec<u8>, PreviewError>;

/// A fetch that may still be running.
#[derive(Debug)]
pub struct PendingFetch {
    source_name: String,
    receiver: Receiver<FetchResult>,
}

impl PendingFetch {
    /// A fetch that already finished.
    pub fn ready(source: &AssetSource, result: FetchResult) -> Self {
        let (sender, receiver) = mpsc::channel();
        // the receiver is alive, so the send cannot fail
        let _ = sender.send(result);
        Self {
            source_name: source.to_string(),
            receiver,
        }
    }

    /// Runs `job` on a worker thread.
    pub fn spawn(
        source: &AssetSource,
        job: impl FnOnce() -> FetchResult + Send + 'static,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("asset fetch worker".into())
            .spawn(move || {
                let _ = sender.send(job());
            });
        match spawned {
            Ok(_) => Self {
                source_name: source.to_string(),
                receiver,
            },
            Err(e) => Self::ready(source, Err(PreviewError::fetch(source.to_string(), e))),
        }
    }

    /// The result if the fetch has finished, without blocking.
    pub fn try_take(&self) -> Option<FetchResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.worker_gone())),
        }
    }

    /// Blocks until the fetch finishes.
    pub fn wait(&self) -> FetchResult {
        self.receiver.recv().unwrap_or_else(|_| Err(self.worker_gone()))
    }

    fn worker_gone(&self) -> PreviewError {
        PreviewError::fetch(&*self.source_name, "fetch worker exited without a result")
    }
}

/// Turns an [`AssetSource`] into bytes.
pub trait AssetFetcher {
    fn fetch(&self, source: &AssetSource) -> FetchResult;

    /// Starts fetching `source`. The default fetches inline, so the returned
    /// fetch is already finished.
    fn request(&self, source: &AssetSource) -> PendingFetch {
        PendingFetch::ready(source, self.fetch(source))
    }
}

/// Reads local files, and http(s) URLs when the `remote-assets` feature is on.
///
/// Requests run on a worker thread so the caller never waits on the network.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    pub max_bytes: u64,
    #[cfg(feature = "remote-assets")]
    agent: ureq::Agent,
}

impl DefaultFetcher {
    /// `timeout` bounds a whole download, connect included.
    pub fn new(max_bytes: u64, timeout: Duration) -> Self {
        #[cfg(not(feature = "remote-assets"))]
        let _ = timeout;
        Self {
            max_bytes,
            #[cfg(feature = "remote-assets")]
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    #[cfg(feature = "remote-assets")]
    fn download(&self, url: &str) -> Result<Vec<u8>, PreviewError> {
        use std::io::Read;

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| PreviewError::fetch(url, e))?;
        let mut bytes = Vec::new();
        // read one byte past the limit to detect oversized bodies
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| PreviewError::fetch(url, e))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(PreviewError::fetch(
                url,
                format!("body exceeds {} bytes", self.max_bytes),
            ));
        }
        Ok(bytes)
    }

    #[cfg(not(feature = "remote-assets"))]
    fn download(&self, url: &str) -> Result<Vec<u8>, PreviewError> {
        Err(PreviewError::fetch(
            url,
            "remote assets are disabled in this build",
        ))
    }
}

impl AssetFetcher for DefaultFetcher {
    fn fetch(&self, source: &AssetSource) -> FetchResult {
        debug!("fetching {}", source);
        match source {
            AssetSource::Path(path) => {
                std::fs::read(path).map_err(|e| PreviewError::fetch(path.display().to_string(), e))
            }
            AssetSource::Url(url) => self.download(url),
        }
    }

    fn request(&self, source: &AssetSource) -> PendingFetch {
        let fetcher = self.clone();
        let owned = source.clone();
        PendingFetch::spawn(source, move || fetcher.fetch(&owned))
    }
}

/// Serves pre-registered bytes; anything else is a fetch failure.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(location.to_string(), bytes.into());
        self
    }
}

impl AssetFetcher for StaticFetcher {
    fn fetch(&self, source: &AssetSource) -> FetchResult {
        let key = source.to_string();
        self.entries
            .get(&key)
            .cloned()
            .ok_or_else(|| PreviewError::fetch(key, "not found"))
    }
}

/// One drawable piece of an imported model.
#[derive(Debug, Clone)]
pub struct ModelPart {
    pub name: String,
    pub buffers: MeshBuffers,
    /// Accumulated node transform.
    pub transform: Mat4,
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ModelAsset {
    pub meshes: Vec<ModelPart>,
}

impl ModelAsset {
    /// Decodes a glTF document (`.glb`, or `.gltf` with embedded buffers).
    pub fn from_gltf_bytes(bytes: &[u8]) -> Result<Self, PreviewError> {
        let (document, buffers, _images) = gltf::import_slice(bytes)?;
        let mut meshes = Vec::new();

        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    visit_node(&node, Mat4::IDENTITY, &buffers, &mut meshes);
                }
            }
            None => {
                for mesh in document.meshes() {
                    read_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut meshes);
                }
            }
        }

        info!("Decoded model with {} mesh primitive(s)", meshes.len());
        Ok(Self { meshes })
    }
}

fn visit_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ModelPart>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        read_mesh(&mesh, world, buffers, out);
    }
    for child in node.children() {
        visit_node(&child, world, buffers, out);
    }
}

fn read_mesh(
    mesh: &gltf::Mesh,
    transform: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ModelPart>,
) {
    let name = mesh.name().unwrap_or("mesh");
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            debug!("skipping non-triangle primitive in '{}'", name);
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

        let mut buffers_out = MeshBuffers::new();
        if let Some(positions) = reader.read_positions() {
            buffers_out.positions = positions.collect();
        }
        if let Some(indices) = reader.read_indices() {
            buffers_out.indices = indices.into_u32().collect();
        } else {
            let n = buffers_out.positions.len() as u32;
            if n % 3 == 0 {
                buffers_out.indices = (0..n).collect();
            }
        }
        if buffers_out.is_empty() {
            continue;
        }

        match reader.read_normals() {
            Some(normals) => buffers_out.normals = normals.collect(),
            None => buffers_out.compute_normals(),
        }
        buffers_out.uvs = match reader.read_tex_coords(0) {
            Some(uvs) => uvs.into_f32().collect(),
            None => vec![[0.0, 0.0]; buffers_out.positions.len()],
        };

        let pbr = primitive.material().pbr_metallic_roughness();
        out.push(ModelPart {
            name: name.to_string(),
            buffers: buffers_out,
            transform,
            base_color: pbr.base_color_factor(),
            metalness: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
        });
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypefaceGlyph {
    /// Horizontal advance in font units.
    pub ha: f32,
    #[serde(default)]
    pub x_min: Option<f32>,
    #[serde(default)]
    pub x_max: Option<f32>,
    /// Outline commands.
    #[serde(default)]
    pub o: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypefaceBounds {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// A three.js typeface description. Kept for extruded text; the texture path
/// does not draw with it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typeface3D {
    #[serde(default)]
    pub family_name: Option<String>,
    pub resolution: f32,
    #[serde(default)]
    pub glyphs: HashMap<String, TypefaceGlyph>,
    #[serde(default)]
    pub bounding_box: Option<TypefaceBounds>,
    #[serde(default)]
    pub underline_position: Option<f32>,
    #[serde(default)]
    pub underline_thickness: Option<f32>,
}

impl Typeface3D {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PreviewError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn family(&self) -> &str {
        self.family_name.as_deref().unwrap_or("unknown")
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Advance of `c` at `size` units, if the typeface has the glyph.
    pub fn advance(&self, c: char, size: f32) -> Option<f32> {
        let mut key = [0u8; 4];
        let glyph = self.glyphs.get(&*c.encode_utf8(&mut key))?;
        Some(glyph.ha * size / self.resolution)
    }
}
