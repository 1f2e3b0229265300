use log::info;
use tumbler_preview::app::run_app;
use tumbler_preview::PreviewConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            PreviewConfig::load(&path)?
        }
        None => PreviewConfig::default(),
    };

    run_app(config)
}
