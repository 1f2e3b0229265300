use crate::error::PreviewError;
use std::path::Path;
use tiny_skia::Pixmap;

/// A square RGBA canvas produced by the text generator.
///
/// Pixels are stored premultiplied (tiny-skia's layout); [`RasterImage::to_rgba8`]
/// converts to straight alpha for upload and export.
#[derive(Clone, Debug)]
pub struct RasterImage {
    pixmap: Pixmap,
}

impl RasterImage {
    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Alpha of the pixel at `(x, y)`, or `None` outside the canvas.
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|p| p.alpha())
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    pub fn covered_pixels(&self) -> usize {
        self.pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of all covered pixels.
    pub fn coverage_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let width = self.width();
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (i, pixel) in self.pixmap.pixels().iter().enumerate() {
            if pixel.alpha() == 0 {
                continue;
            }
            let x = i as u32 % width;
            let y = i as u32 / width;
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    /// Straight-alpha RGBA8 copy of the canvas.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        image::RgbaImage::from_raw(self.width(), self.height(), data)
            .unwrap_or_else(|| image::RgbaImage::new(self.width(), self.height()))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), PreviewError> {
        self.to_rgba8()
            .save(path.as_ref())
            .map_err(|e| PreviewError::Io(std::io::Error::other(e)))
    }
}
