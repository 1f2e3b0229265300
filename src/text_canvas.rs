use crate::config::CanvasConfig;
use crate::error::PreviewError;
use crate::font::{FontResolver, Typeface};
use crate::raster::RasterImage;
use log::debug;
use tiny_skia::Pixmap;

/// Font sizes are specified against a canvas this many pixels wide.
pub const REFERENCE_RESOLUTION: f32 = 1024.0;

/// Where each line of text lands on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Font size in canvas pixels.
    pub font_size: f32,
    pub line_height: f32,
    pub lines: Vec<String>,
    /// Vertical middle of the first line.
    pub first_line_y: f32,
}

impl TextLayout {
    /// Middle of every line, top to bottom.
    pub fn line_centers(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.lines.len()).map(move |i| self.first_line_y + i as f32 * self.line_height)
    }
}

/// Greedy word wrap: packs whitespace-separated words into lines no wider
/// than `max_width`. Words that cannot fit on a line of their own are broken
/// between characters.
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = break_word(word, max_width, &measure);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if piece.chars().count() > 1 && measure(&piece) > max_width {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Lays out and rasterizes text onto a fixed-size square canvas.
pub struct TextCanvas {
    settings: CanvasConfig,
    blank: Pixmap,
}

impl TextCanvas {
    pub fn new(settings: CanvasConfig) -> Result<Self, PreviewError> {
        let blank = Pixmap::new(settings.resolution, settings.resolution)
            .ok_or(PreviewError::InvalidCanvas(settings.resolution))?;
        Ok(Self { settings, blank })
    }

    pub fn resolution(&self) -> u32 {
        self.settings.resolution
    }

    pub fn settings(&self) -> &CanvasConfig {
        &self.settings
    }

    /// Widest a line may be, in canvas pixels.
    pub fn max_line_width(&self) -> f32 {
        self.settings.resolution as f32 * self.settings.max_line_width
    }

    /// Font size policy in reference units: shorter text gets bigger
    /// glyphs, floored at the minimum size.
    pub fn font_size_for(&self, text: &str) -> f32 {
        let length = text.chars().count() as f32;
        (self.settings.max_font_size - self.settings.shrink_per_char * length)
            .max(self.settings.min_font_size)
    }

    pub fn layout(&self, text: &str, face: &dyn Typeface) -> TextLayout {
        let unit = self.settings.resolution as f32 / REFERENCE_RESOLUTION;
        let font_size = self.font_size_for(text) * unit;
        let max_width = self.max_line_width();

        let lines = if face.measure(text, font_size) <= max_width {
            vec![text.to_string()]
        } else {
            wrap_words(text, max_width, |line| face.measure(line, font_size))
        };

        let height = self.settings.resolution as f32;
        let line_height = font_size * self.settings.line_height;
        let block_height = lines.len() as f32 * line_height;
        let first_line_y = (height - block_height) / 2.0 + line_height / 2.0
            - font_size * self.settings.baseline_shift;

        TextLayout {
            font_size,
            line_height,
            lines,
            first_line_y,
        }
    }

    /// Renders `text` black on a transparent canvas.
    pub fn render(&self, text: &str, face: &dyn Typeface) -> RasterImage {
        let layout = self.layout(text, face);
        let mut pixmap = self.blank.clone();
        let center_x = self.settings.resolution as f32 / 2.0;

        for (line, middle_y) in layout.lines.iter().zip(layout.line_centers()) {
            if line.trim().is_empty() {
                continue;
            }
            face.draw_centered(&mut pixmap, line, layout.font_size, center_x, middle_y);
        }
        debug!(
            "rendered {} line(s) at {:.1}px with '{}'",
            layout.lines.len(),
            layout.font_size,
            face.name()
        );
        RasterImage::from_pixmap(pixmap)
    }
}

/// Text plus font family in, raster out.
pub struct TextTextureGenerator {
    canvas: TextCanvas,
    fonts: FontResolver,
}

impl TextTextureGenerator {
    pub fn new(canvas: TextCanvas, fonts: FontResolver) -> Self {
        Self { canvas, fonts }
    }

    pub fn canvas(&self) -> &TextCanvas {
        &self.canvas
    }

    /// Unresolvable families fall back to the first installed face.
    pub fn generate(&mut self, text: &str, font_family: &str) -> RasterImage {
        let face = self.fonts.resolve(font_family);
        self.canvas.render(text, face.as_ref())
    }

    pub fn layout(&mut self, text: &str, font_family: &str) -> TextLayout {
        let face = self.fonts.resolve(font_family);
        self.canvas.layout(text, face.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_width(line: &str) -> f32 {
        line.chars().count() as f32 * 10.0
    }

    #[test]
    fn greedy_wrap_packs_words() {
        let lines = wrap_words("aa bb cc dd", 50.0, char_width);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn overlong_word_is_broken() {
        let lines = wrap_words("abcdefghij", 40.0, char_width);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn whitespace_only_is_one_blank_line() {
        assert_eq!(wrap_words("   ", 10.0, char_width), vec![String::new()]);
    }
}
