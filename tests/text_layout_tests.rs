use tumbler_preview::config::CanvasConfig;
use tumbler_preview::font::{BlockFace, FontResolver, Typeface};
use tumbler_preview::text_canvas::{wrap_words, TextCanvas, TextTextureGenerator};

const PANGRAM: &str = "The quick brown fox jumps over a lazy dog";
const DEJAVU_SANS: &[u8] = include_bytes!("assets/DejaVuSans.ttf");

fn canvas() -> TextCanvas {
    TextCanvas::new(CanvasConfig::default()).expect("canvas")
}

fn generator() -> TextTextureGenerator {
    TextTextureGenerator::new(canvas(), FontResolver::builtin_only())
}

fn dejavu() -> FontResolver {
    let mut resolver = FontResolver::without_system_fonts();
    resolver.load_font_data(DEJAVU_SANS.to_vec());
    resolver
}

#[test]
fn short_word_stays_on_one_line() {
    let layout = canvas().layout("Hello", &BlockFace);
    assert!((layout.font_size - 175.0).abs() < 1e-4);
    assert_eq!(layout.lines, vec!["Hello"]);
    assert!((layout.line_height - 210.0).abs() < 1e-4);
    assert!((layout.first_line_y - 494.5).abs() < 1e-3);
}

#[test]
fn long_text_shrinks_to_minimum_and_wraps() {
    let layout = canvas().layout(PANGRAM, &BlockFace);
    assert!((layout.font_size - 60.0).abs() < 1e-4);
    assert_eq!(layout.lines, vec!["The quick brown fox jumps", "over a lazy dog"]);
    assert!((layout.first_line_y - 470.0).abs() < 1e-3);
}

#[test]
fn wrapped_lines_fit_the_line_budget() {
    let canvas = canvas();
    let long = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor";
    let layout = canvas.layout(long, &BlockFace);
    assert!(layout.lines.len() > 1);
    for line in &layout.lines {
        assert!(BlockFace.measure(line, layout.font_size) <= canvas.max_line_width());
    }
}

#[test]
fn wrapping_keeps_every_word_in_order() {
    let layout = canvas().layout("  spaced   out\twords  everywhere and then some more text here ", &BlockFace);
    let rejoined = layout.lines.join(" ");
    let expected: Vec<&str> = "spaced out words everywhere and then some more text here"
        .split(' ')
        .collect();
    assert_eq!(rejoined.split(' ').collect::<Vec<_>>(), expected);
}

#[test]
fn font_size_never_grows_with_length() {
    let canvas = canvas();
    let mut previous = f32::MAX;
    for n in 0..60 {
        let text = "x".repeat(n);
        let size = canvas.font_size_for(&text);
        assert!(size <= previous);
        assert!(size >= 60.0);
        previous = size;
    }
    assert_eq!(canvas.font_size_for(""), 200.0);
}

#[test]
fn font_size_scales_with_resolution() {
    let half = TextCanvas::new(CanvasConfig {
        resolution: 512,
        ..CanvasConfig::default()
    })
    .expect("canvas");
    let layout = half.layout("Hello", &BlockFace);
    assert!((layout.font_size - 87.5).abs() < 1e-4);
}

#[test]
fn block_is_centered_around_shifted_middle() {
    let layout = canvas().layout(PANGRAM, &BlockFace);
    let centers: Vec<f32> = layout.line_centers().collect();
    let first = centers[0];
    let last = centers[centers.len() - 1];
    let expected = 1024.0 / 2.0 - 0.1 * layout.font_size;
    assert!(((first + last) / 2.0 - expected).abs() < 1e-3);
}

#[test]
fn empty_text_renders_transparent_canvas() {
    let raster = generator().generate("", "Arial, sans-serif");
    assert_eq!((raster.width(), raster.height()), (1024, 1024));
    assert!(raster.is_fully_transparent());
}

#[test]
fn whitespace_text_renders_transparent_canvas() {
    let raster = generator().generate("   ", "Arial, sans-serif");
    assert!(raster.is_fully_transparent());
}

#[test]
fn raster_size_does_not_depend_on_text() {
    let mut generator = generator();
    for text in ["a", "Hello", PANGRAM] {
        let raster = generator.generate(text, "Arial, sans-serif");
        assert_eq!((raster.width(), raster.height()), (1024, 1024));
    }
}

#[test]
fn hello_is_drawn_centered_and_black() {
    let raster = generator().generate("Hello", "Arial, sans-serif");
    let (x0, y0, x1, y1) = raster.coverage_bounds().expect("text pixels");
    let mid_x = (x0 + x1) as f32 / 2.0;
    let mid_y = (y0 + y1) as f32 / 2.0;
    assert!((mid_x - 512.0).abs() <= 2.0, "mid_x = {mid_x}");
    assert!((mid_y - 494.5).abs() <= 2.0, "mid_y = {mid_y}");

    let rgba = raster.to_rgba8();
    let pixel = rgba.get_pixel(mid_x as u32, mid_y as u32);
    assert_eq!(pixel.0, [0, 0, 0, 255]);
}

#[test]
fn wrapped_lines_are_separate_bands() {
    let mut generator = generator();
    let layout = generator.layout(PANGRAM, "Arial");
    let raster = generator.generate(PANGRAM, "Arial");
    let row_has_ink = |y: f32| (0..raster.width()).any(|x| raster.alpha_at(x, y as u32) != Some(0));

    let centers: Vec<f32> = layout.line_centers().collect();
    assert_eq!(centers.len(), 2);
    assert!(row_has_ink(centers[0]));
    assert!(row_has_ink(centers[1]));
    assert!(!row_has_ink(centers[0] + layout.line_height / 2.0));
}

#[test]
fn wrap_words_accepts_exact_fit() {
    let lines = wrap_words("ab cd", 50.0, |s| s.chars().count() as f32 * 10.0);
    assert_eq!(lines, vec!["ab cd"]);
}

#[test]
fn real_font_hello_is_centered_on_the_canvas() {
    let mut generator = TextTextureGenerator::new(canvas(), dejavu());
    let layout = generator.layout("Hello", "Arial, sans-serif");
    assert_eq!(layout.lines, vec!["Hello"]);
    assert!((layout.first_line_y - 494.5).abs() < 1e-3);

    let raster = generator.generate("Hello", "Arial, sans-serif");
    let (x0, y0, x1, y1) = raster.coverage_bounds().expect("text pixels");
    let mid_x = (x0 + x1) as f32 / 2.0;
    let mid_y = (y0 + y1) as f32 / 2.0;
    // ink is centered up to side bearings and the ascender/descender split
    let slack = 0.05 * layout.font_size;
    assert!((mid_x - 512.0).abs() <= slack, "mid_x = {mid_x}");
    assert!((mid_y - 494.5).abs() <= slack, "mid_y = {mid_y}");
    // real glyphs are narrower than the block face's boxes
    assert!(((x1 - x0) as f32) < BlockFace.measure("Hello", layout.font_size));
}

#[test]
fn real_font_lines_fit_and_rewrap_to_themselves() {
    let canvas = canvas();
    let face = dejavu().resolve("Arial, sans-serif");
    let max_width = canvas.max_line_width();
    for text in [
        PANGRAM,
        "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor",
        "Happy Birthday Grandma",
    ] {
        let layout = canvas.layout(text, face.as_ref());
        for line in &layout.lines {
            assert!(face.measure(line, layout.font_size) <= max_width, "{line:?} overflows");
            let again = wrap_words(line, max_width, |s| face.measure(s, layout.font_size));
            assert_eq!(&again, &vec![line.clone()]);
        }
    }
}

#[test]
fn real_font_pangram_wraps_onto_two_lines() {
    let canvas = canvas();
    let face = dejavu().resolve("sans-serif");
    let layout = canvas.layout(PANGRAM, face.as_ref());
    assert!((layout.font_size - 60.0).abs() < 1e-4);
    assert_eq!(layout.lines.len(), 2);
    assert_eq!(layout.lines.join(" "), PANGRAM);
}
