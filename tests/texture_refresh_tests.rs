use tumbler_preview::assets::StaticFetcher;
use tumbler_preview::config::{CanvasConfig, FontOption, FontsConfig, MaterialConfig, PreviewConfig};
use tumbler_preview::font::FontResolver;
use tumbler_preview::material::{refresh, Material, RefreshOutcome};
use tumbler_preview::text_canvas::{TextCanvas, TextTextureGenerator};
use tumbler_preview::texture::{TextureLedger, WrapMode};
use tumbler_preview::PreviewContext;

fn generator() -> TextTextureGenerator {
    let canvas = TextCanvas::new(CanvasConfig::default()).expect("canvas");
    TextTextureGenerator::new(canvas, FontResolver::builtin_only())
}

fn loaded_context(config: PreviewConfig) -> PreviewContext {
    let mut context =
        PreviewContext::with_fonts(config, FontResolver::builtin_only()).expect("context");
    context.load_all(&StaticFetcher::new());
    context
}

#[test]
fn refresh_without_material_is_a_no_op() {
    let ledger = TextureLedger::new();
    let raster = generator().generate("Hello", "Arial");
    assert_eq!(refresh(raster, None, &ledger), RefreshOutcome::Skipped);
    assert_eq!(ledger.created(), 0);
    assert_eq!(ledger.live(), 0);
}

#[test]
fn refresh_installs_map_with_wrap_modes() {
    let ledger = TextureLedger::new();
    let mut material = Material::new(&MaterialConfig::default());
    assert!(!material.transparent);

    let outcome = refresh(generator().generate("Hello", "Arial"), Some(&mut material), &ledger);
    let RefreshOutcome::Installed(id) = outcome else {
        panic!("expected a texture to be installed");
    };

    let map = material.map().expect("map");
    assert_eq!(map.id(), id);
    assert_eq!(map.wrap_s, WrapMode::ClampToEdge);
    assert_eq!(map.wrap_t, WrapMode::Repeat);
    assert!(map.needs_update);
    assert!(material.transparent);
    assert!(material.needs_update);
    assert!(!map.image().is_fully_transparent());
}

#[test]
fn repeated_refreshes_keep_one_texture_alive() {
    let ledger = TextureLedger::new();
    let mut generator = generator();
    let mut material = Material::new(&MaterialConfig::default());

    let mut last_id = None;
    for i in 0..100 {
        let raster = generator.generate(&format!("text {i}"), "Arial");
        let RefreshOutcome::Installed(id) = refresh(raster, Some(&mut material), &ledger) else {
            panic!("refresh skipped");
        };
        assert_ne!(Some(id), last_id);
        last_id = Some(id);
        assert_eq!(ledger.live(), 1);
    }
    assert_eq!(ledger.created(), 100);
    assert_eq!(ledger.peak(), 1);

    material.clear_map();
    assert_eq!(ledger.live(), 0);
}

#[test]
fn typing_before_load_does_not_touch_textures() {
    let mut context =
        PreviewContext::with_fonts(PreviewConfig::default(), FontResolver::builtin_only())
            .expect("context");
    assert_eq!(context.set_text("early"), RefreshOutcome::Skipped);
    assert_eq!(context.insert_text("!"), RefreshOutcome::Skipped);
    assert_eq!(context.text(), "early!");
    assert_eq!(context.ledger().created(), 0);
}

#[test]
fn load_completion_runs_the_initial_refresh() {
    let mut context =
        PreviewContext::with_fonts(PreviewConfig::default(), FontResolver::builtin_only())
            .expect("context");
    context.set_text("queued");
    context.load_all(&StaticFetcher::new());

    assert_eq!(context.ledger().created(), 1);
    let material = context.scene().text_material().expect("material");
    let map = material.map().expect("map");
    assert!(!map.image().is_fully_transparent());
}

#[test]
fn empty_field_gets_a_transparent_map() {
    let context = loaded_context(PreviewConfig::default());
    let map = context
        .scene()
        .text_material()
        .and_then(|m| m.map())
        .expect("map");
    assert!(map.image().is_fully_transparent());
}

#[test]
fn editing_replaces_the_texture() {
    let mut context = loaded_context(PreviewConfig::default());
    let first = context.scene().text_material().and_then(|m| m.map()).map(|t| t.id());

    let outcome = context.set_text("Hi");
    assert!(matches!(outcome, RefreshOutcome::Installed(_)));
    let second = context.scene().text_material().and_then(|m| m.map()).map(|t| t.id());
    assert_ne!(first, second);
    assert_eq!(context.ledger().live(), 1);
    assert_eq!(context.ledger().created(), 2);

    assert!(matches!(context.backspace(), RefreshOutcome::Installed(_)));
    assert_eq!(context.text(), "H");
    assert!(matches!(context.clear_text(), RefreshOutcome::Installed(_)));
    assert_eq!(context.backspace(), RefreshOutcome::Skipped);
    assert_eq!(context.ledger().live(), 1);
}

#[test]
fn font_change_refreshes_only_when_selection_moves() {
    let config = PreviewConfig {
        fonts: FontsConfig(vec![
            FontOption {
                label: "Default 3D Font".to_string(),
                family: "Arial, sans-serif".to_string(),
            },
            FontOption {
                label: "Serif".to_string(),
                family: "Georgia, serif".to_string(),
            },
        ]),
        ..PreviewConfig::default()
    };
    let mut context = loaded_context(config);
    context.set_text("Cheers");

    assert_eq!(context.select_font(0), RefreshOutcome::Skipped);
    assert_eq!(context.select_font(7), RefreshOutcome::Skipped);
    assert!(matches!(context.select_font(1), RefreshOutcome::Installed(_)));
    assert_eq!(context.current_font().label, "Serif");
    assert!(matches!(context.cycle_font(1), RefreshOutcome::Installed(_)));
    assert_eq!(context.current_font().label, "Default 3D Font");
    assert!(matches!(context.cycle_font(-1), RefreshOutcome::Installed(_)));
    assert_eq!(context.fonts().selected_index(), 1);
}
