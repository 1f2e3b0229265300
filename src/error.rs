use thiserror::Error;

/// Errors surfaced by the preview library.
///
/// Most of these never reach the user: asset failures are recovered by the
/// load pipeline and only show up in the log.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to fetch {source_name}: {reason}")]
    AssetFetch { source_name: String, reason: String },

    #[error("failed to decode model: {0}")]
    ModelDecode(String),

    #[error("failed to decode typeface: {0}")]
    TypefaceDecode(#[from] serde_json::Error),

    #[error("invalid canvas resolution {0}")]
    InvalidCanvas(u32),

    #[error("GPU setup failed: {0}")]
    Gpu(String),
}

impl PreviewError {
    pub fn fetch(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::AssetFetch {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<gltf::Error> for PreviewError {
    fn from(err: gltf::Error) -> Self {
        Self::ModelDecode(err.to_string())
    }
}
