use tumbler_preview::config::{PreviewConfig, DEFAULT_MODEL_URL, DEFAULT_TYPEFACE_URL};
use tumbler_preview::PreviewError;

#[test]
fn stock_preview_defaults() {
    let config = PreviewConfig::default();
    assert_eq!(config.canvas.resolution, 1024);
    assert_eq!(config.assets.typeface, DEFAULT_TYPEFACE_URL);
    assert_eq!(config.assets.model, DEFAULT_MODEL_URL);
    assert_eq!(config.scene.background, 0xeeeeee);
    assert_eq!(config.camera.position, [0.0, 1.5, 4.0]);
    assert_eq!(config.fonts.0.len(), 1);
    assert_eq!(config.fonts.0[0].label, "Default 3D Font");
}

#[test]
fn partial_toml_overrides_only_named_fields() {
    let config = PreviewConfig::from_toml_str(
        r#"
        [canvas]
        resolution = 512

        [assets]
        model = "models/tumbler.glb"

        [controls]
        auto_rotate = false
        "#,
    )
    .expect("config");
    assert_eq!(config.canvas.resolution, 512);
    assert_eq!(config.canvas.min_font_size, 60.0);
    assert_eq!(config.assets.model, "models/tumbler.glb");
    assert_eq!(config.assets.typeface, DEFAULT_TYPEFACE_URL);
    assert!(!config.controls.auto_rotate);
    assert_eq!(config.controls.max_distance, 20.0);
}

#[test]
fn font_list_replaces_the_default() {
    let config = PreviewConfig::from_toml_str(
        r#"
        [[fonts]]
        label = "Rounded"
        family = "'Comic Sans MS', cursive"

        [[fonts]]
        label = "Mono"
        family = "monospace"
        "#,
    )
    .expect("config");
    let labels: Vec<&str> = config.fonts.0.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["Rounded", "Mono"]);
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = PreviewConfig::from_toml_str("[canvas\nresolution = ").expect_err("must fail");
    assert!(matches!(err, PreviewError::Config(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = PreviewConfig::load("does/not/exist.toml").expect_err("must fail");
    assert!(matches!(err, PreviewError::Io(_)));
}

#[test]
fn zero_resolution_is_rejected() {
    let config = PreviewConfig::from_toml_str("[canvas]\nresolution = 0").expect("config");
    let err = tumbler_preview::TextCanvas::new(config.canvas).err().expect("must fail");
    assert!(matches!(err, PreviewError::InvalidCanvas(0)));
}

#[test]
fn missing_font_file_fails_context_creation() {
    let mut config = PreviewConfig::default();
    config.assets.font_files.push("missing/font.ttf".into());
    let err = tumbler_preview::PreviewContext::new(config).err().expect("must fail");
    assert!(matches!(err, PreviewError::Io(_)));
}
