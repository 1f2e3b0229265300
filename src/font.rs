use crate::config::FontOption;
use log::{debug, info, warn};
use resvg::usvg::fontdb;
use rusttype::{point, Font, Scale};
use std::collections::HashMap;
use std::rc::Rc;
use tiny_skia::{Paint, Pixmap, Rect, Transform};

/// Something that can measure and draw a line of text onto a canvas.
pub trait Typeface {
    fn name(&self) -> &str;

    /// Advance width of `text` at `font_size` pixels.
    fn measure(&self, text: &str, font_size: f32) -> f32;

    /// Draws `text` in opaque black, horizontally centered on `center_x`, with
    /// the middle of the em box on `middle_y`.
    fn draw_centered(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        font_size: f32,
        center_x: f32,
        middle_y: f32,
    );
}

/// One entry of a CSS `font-family` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyName {
    Named(String),
    Serif,
    SansSerif,
    Monospace,
    Cursive,
    Fantasy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDescriptor {
    pub families: Vec<FamilyName>,
}

impl FontDescriptor {
    /// Parses a CSS family list such as `"'Open Sans', Arial, sans-serif"`.
    pub fn parse(css: &str) -> Self {
        let families = css
            .split(',')
            .map(|part| part.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|name| !name.is_empty())
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => FamilyName::Serif,
                "sans-serif" => FamilyName::SansSerif,
                "monospace" => FamilyName::Monospace,
                "cursive" => FamilyName::Cursive,
                "fantasy" => FamilyName::Fantasy,
                _ => FamilyName::Named(name.to_string()),
            })
            .collect();
        Self { families }
    }

    fn query_families(&self) -> Vec<fontdb::Family<'_>> {
        self.families
            .iter()
            .map(|family| match family {
                FamilyName::Named(name) => fontdb::Family::Name(name.as_str()),
                FamilyName::Serif => fontdb::Family::Serif,
                FamilyName::SansSerif => fontdb::Family::SansSerif,
                FamilyName::Monospace => fontdb::Family::Monospace,
                FamilyName::Cursive => fontdb::Family::Cursive,
                FamilyName::Fantasy => fontdb::Family::Fantasy,
            })
            .collect()
    }
}

/// Writes black coverage into a premultiplied pixmap with source-over blending.
fn blend_black(pixmap: &mut Pixmap, x: i32, y: i32, coverage: f32) {
    let (width, height) = (pixmap.width() as i32, pixmap.height() as i32);
    if x < 0 || y < 0 || x >= width || y >= height {
        return;
    }
    let index = ((y * width + x) * 4) as usize;
    let data = pixmap.data_mut();
    let dst = data[index + 3] as f32 / 255.0;
    let out = dst + coverage.clamp(0.0, 1.0) * (1.0 - dst);
    // black premultiplied stays (0, 0, 0, a)
    data[index] = 0;
    data[index + 1] = 0;
    data[index + 2] = 0;
    data[index + 3] = (out * 255.0).round() as u8;
}

/// A TrueType/OpenType face rasterized with rusttype.
pub struct RusttypeFace {
    name: String,
    font: Font<'static>,
}

impl RusttypeFace {
    pub fn from_bytes(name: &str, data: Vec<u8>, index: u32) -> Option<Self> {
        let font = Font::try_from_vec_and_index(data, index)?;
        Some(Self {
            name: name.to_string(),
            font,
        })
    }
}

impl Typeface for RusttypeFace {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str, font_size: f32) -> f32 {
        let scale = Scale::uniform(font_size);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    fn draw_centered(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        font_size: f32,
        center_x: f32,
        middle_y: f32,
    ) {
        let scale = Scale::uniform(font_size);
        let v_metrics = self.font.v_metrics(scale);
        // descent is negative, so this lands the baseline below the em middle
        let baseline = middle_y + (v_metrics.ascent + v_metrics.descent) / 2.0;
        let start_x = center_x - self.measure(text, font_size) / 2.0;

        for glyph in self.font.layout(text, scale, point(start_x, baseline)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    blend_black(pixmap, bb.min.x + gx as i32, bb.min.y + gy as i32, coverage);
                });
            }
        }
    }
}

/// Built-in face that draws every visible character as a solid box.
///
/// Used when no system font resolves, and by tests that need deterministic
/// metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockFace;

impl BlockFace {
    pub const ADVANCE: f32 = 0.6;
    pub const BOX_WIDTH: f32 = 0.5;
    pub const BOX_HEIGHT: f32 = 0.7;
}

impl Typeface for BlockFace {
    fn name(&self) -> &str {
        "builtin-block"
    }

    fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * Self::ADVANCE * font_size
    }

    fn draw_centered(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        font_size: f32,
        center_x: f32,
        middle_y: f32,
    ) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = false;

        let advance = Self::ADVANCE * font_size;
        let inset = (Self::ADVANCE - Self::BOX_WIDTH) / 2.0 * font_size;
        let box_height = Self::BOX_HEIGHT * font_size;
        let mut x = center_x - self.measure(text, font_size) / 2.0;

        for c in text.chars() {
            if !c.is_whitespace() {
                if let Some(rect) = Rect::from_xywh(
                    x + inset,
                    middle_y - box_height / 2.0,
                    Self::BOX_WIDTH * font_size,
                    box_height,
                ) {
                    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
            x += advance;
        }
    }
}

/// Installed families tried, in order, for each generic family. fontdb's own
/// defaults name Microsoft fonts that many systems lack.
const SANS_SERIF_CHOICES: &[&str] = &[
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "Roboto",
];
const SERIF_CHOICES: &[&str] = &[
    "Times New Roman",
    "Times",
    "Liberation Serif",
    "DejaVu Serif",
    "Noto Serif",
];
const MONOSPACE_CHOICES: &[&str] = &[
    "Courier New",
    "Courier",
    "Liberation Mono",
    "DejaVu Sans Mono",
    "Noto Sans Mono",
];

fn installed_family(db: &fontdb::Database, choices: &[&str]) -> Option<String> {
    choices.iter().find_map(|choice| {
        db.faces().find_map(|face| {
            face.families
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(choice))
                .map(|(name, _)| name.clone())
        })
    })
}

fn first_family(db: &fontdb::Database) -> Option<String> {
    db.faces()
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
}

/// Points every generic family at a face that is actually installed.
fn assign_generic_families(db: &mut fontdb::Database) {
    let Some(any) = first_family(db) else {
        return;
    };
    let sans = installed_family(db, SANS_SERIF_CHOICES).unwrap_or(any);
    let serif = installed_family(db, SERIF_CHOICES).unwrap_or_else(|| sans.clone());
    let monospace = installed_family(db, MONOSPACE_CHOICES).unwrap_or_else(|| sans.clone());
    debug!("generic families: sans-serif '{sans}', serif '{serif}', monospace '{monospace}'");

    db.set_serif_family(serif);
    db.set_monospace_family(monospace);
    db.set_cursive_family(sans.clone());
    db.set_fantasy_family(sans.clone());
    db.set_sans_serif_family(sans);
}

/// Maps CSS family lists to loaded faces, caching per family string.
///
/// A list that matches nothing gets the first installed face; the block face
/// only stands in when no font is installed at all.
pub struct FontResolver {
    database: Option<fontdb::Database>,
    lookup_enabled: bool,
    cache: HashMap<String, Rc<dyn Typeface>>,
    fallback: Rc<dyn Typeface>,
}

impl FontResolver {
    /// Resolver backed by the system font collection, loaded on first use.
    pub fn new() -> Self {
        Self {
            database: None,
            lookup_enabled: true,
            cache: HashMap::new(),
            fallback: Rc::new(BlockFace),
        }
    }

    /// Resolver that never touches system fonts and always answers with the
    /// block face.
    pub fn builtin_only() -> Self {
        Self {
            lookup_enabled: false,
            ..Self::new()
        }
    }

    /// Resolver that only knows the fonts registered through
    /// [`load_font_data`](Self::load_font_data).
    pub fn without_system_fonts() -> Self {
        Self {
            database: Some(fontdb::Database::new()),
            ..Self::new()
        }
    }

    /// Registers a face from raw font bytes under every family it declares.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        let db = self.database_mut();
        db.load_font_data(data);
        assign_generic_families(db);
        self.lookup_enabled = true;
        self.cache.clear();
    }

    pub fn fallback(&self) -> Rc<dyn Typeface> {
        self.fallback.clone()
    }

    pub fn resolve(&mut self, css: &str) -> Rc<dyn Typeface> {
        if let Some(face) = self.cache.get(css) {
            return face.clone();
        }

        let face = if self.lookup_enabled {
            self.lookup(css).unwrap_or_else(|| {
                warn!("No fonts installed, drawing '{}' with the built-in face", css);
                self.fallback.clone()
            })
        } else {
            self.fallback.clone()
        };
        debug!("font-family '{}' resolved to '{}'", css, face.name());
        self.cache.insert(css.to_string(), face.clone());
        face
    }

    fn database_mut(&mut self) -> &mut fontdb::Database {
        self.database.get_or_insert_with(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            info!("Loaded {} system font faces", db.len());
            assign_generic_families(&mut db);
            db
        })
    }

    fn lookup(&mut self, css: &str) -> Option<Rc<dyn Typeface>> {
        let descriptor = FontDescriptor::parse(css);
        let families = descriptor.query_families();
        let db = self.database_mut();
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        let id = match db.query(&query) {
            Some(id) => id,
            None => {
                let id = db.faces().next()?.id;
                warn!("No face matches font-family '{}', using the first installed face", css);
                id
            }
        };
        let name = db
            .face(id)
            .and_then(|info| info.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| css.to_string());
        let face = db.with_face_data(id, |data, index| {
            RusttypeFace::from_bytes(&name, data.to_vec(), index)
        })??;
        Some(Rc::new(face))
    }
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// The font selector: an ordered list of choices with one active entry.
#[derive(Debug, Clone)]
pub struct FontCatalog {
    options: Vec<FontOption>,
    selected: usize,
}

impl FontCatalog {
    pub fn new(options: Vec<FontOption>) -> Self {
        let options = if options.is_empty() {
            crate::config::FontsConfig::default().0
        } else {
            options
        };
        Self {
            options,
            selected: 0,
        }
    }

    pub fn options(&self) -> &[FontOption] {
        &self.options
    }

    pub fn current(&self) -> &FontOption {
        &self.options[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Returns `true` when the selection changed.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.options.len() || index == self.selected {
            return false;
        }
        self.selected = index;
        true
    }

    /// Moves the selection by `step`, wrapping at both ends.
    pub fn cycle(&mut self, step: isize) -> bool {
        let len = self.options.len() as isize;
        let next = (self.selected as isize + step).rem_euclid(len) as usize;
        self.select(next)
    }
}
