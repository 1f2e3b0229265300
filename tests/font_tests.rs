use tumbler_preview::config::FontOption;
use tumbler_preview::font::{BlockFace, FamilyName, FontCatalog, FontDescriptor, FontResolver, Typeface};

const DEJAVU_SANS: &[u8] = include_bytes!("assets/DejaVuSans.ttf");

fn dejavu_resolver() -> FontResolver {
    let mut resolver = FontResolver::without_system_fonts();
    resolver.load_font_data(DEJAVU_SANS.to_vec());
    resolver
}

fn option(label: &str) -> FontOption {
    FontOption {
        label: label.to_string(),
        family: format!("{label}, sans-serif"),
    }
}

#[test]
fn family_lists_parse_quotes_and_generics() {
    let descriptor = FontDescriptor::parse(" 'Open Sans' , \"Helvetica Neue\", Arial, SANS-SERIF,, monospace");
    assert_eq!(
        descriptor.families,
        vec![
            FamilyName::Named("Open Sans".to_string()),
            FamilyName::Named("Helvetica Neue".to_string()),
            FamilyName::Named("Arial".to_string()),
            FamilyName::SansSerif,
            FamilyName::Monospace,
        ]
    );
    assert!(FontDescriptor::parse("  ").families.is_empty());
}

#[test]
fn builtin_resolver_always_answers_with_block_face() {
    let mut resolver = FontResolver::builtin_only();
    let face = resolver.resolve("Definitely Not Installed, serif");
    assert_eq!(face.name(), BlockFace.name());
    assert_eq!(face.measure("abcd", 100.0), BlockFace.measure("abcd", 100.0));
}

#[test]
fn block_face_metrics_are_linear() {
    assert!((BlockFace.measure("Hello", 175.0) - 525.0).abs() < 1e-3);
    assert_eq!(BlockFace.measure("", 175.0), 0.0);
}

#[test]
fn empty_catalog_gets_the_default_font() {
    let catalog = FontCatalog::new(Vec::new());
    assert_eq!(catalog.options().len(), 1);
    assert_eq!(catalog.current().label, "Default 3D Font");
    assert_eq!(catalog.current().family, "Arial, sans-serif");
}

#[test]
fn cycling_wraps_in_both_directions() {
    let mut catalog = FontCatalog::new(vec![option("A"), option("B"), option("C")]);
    assert!(catalog.cycle(-1));
    assert_eq!(catalog.current().label, "C");
    assert!(catalog.cycle(1));
    assert_eq!(catalog.current().label, "A");
    assert!(catalog.cycle(4));
    assert_eq!(catalog.current().label, "B");
    assert!(!catalog.cycle(3), "a full turn lands on the same entry");
}

#[test]
fn single_entry_catalog_never_changes() {
    let mut catalog = FontCatalog::new(vec![option("Only")]);
    assert!(!catalog.cycle(1));
    assert!(!catalog.select(0));
    assert!(!catalog.select(1));
    assert_eq!(catalog.selected_index(), 0);
}

#[test]
fn generic_families_land_on_an_installed_face() {
    let mut resolver = dejavu_resolver();
    for css in [
        "Arial, sans-serif",
        "sans-serif",
        "Georgia, 'Times New Roman', serif",
        "'Courier New', monospace",
        "cursive",
    ] {
        assert_eq!(resolver.resolve(css).name(), "DejaVu Sans", "family list {css}");
    }
}

#[test]
fn unmatched_family_uses_first_installed_face() {
    let mut resolver = dejavu_resolver();
    assert_eq!(resolver.resolve("Verdana").name(), "DejaVu Sans");
    assert_eq!(resolver.resolve("").name(), "DejaVu Sans");
}

#[test]
fn installed_face_draws_glyphs_not_boxes() {
    let mut resolver = dejavu_resolver();
    let face = resolver.resolve("Arial, sans-serif");
    assert!(face.measure("Hello", 175.0) > 0.0);
    // proportional: "i" is narrower than "m"
    assert!(face.measure("i", 100.0) < face.measure("m", 100.0));
    assert_ne!(face.measure("iiii", 100.0), BlockFace.measure("iiii", 100.0));
}

#[test]
fn empty_font_database_uses_block_face() {
    let mut resolver = FontResolver::without_system_fonts();
    assert_eq!(resolver.resolve("Arial, sans-serif").name(), BlockFace.name());
}
