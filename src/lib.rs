//! Live preview of user text printed around a 3D tumbler.
//!
//! The core is CPU-only: [`text_canvas`] lays the text out and rasterizes it,
//! [`material::refresh`] swaps the result into the tumbler's material, and
//! [`preview::PreviewContext`] ties text input, font choice, asset loading and
//! the camera together. [`renderer`] puts the scene on the GPU, and the
//! `viewer` feature adds a winit window around it.

extern crate image;

#[cfg(feature = "viewer")]
pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod gpu_texture;
pub mod material;
pub mod pipeline;
pub mod preview;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod text_canvas;
pub mod texture;
pub mod utils;

pub use config::PreviewConfig;
pub use error::PreviewError;
pub use material::{refresh, RefreshOutcome};
pub use preview::PreviewContext;
pub use raster::RasterImage;
pub use text_canvas::{TextCanvas, TextLayout, TextTextureGenerator};
