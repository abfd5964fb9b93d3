use waveviewer::{app, config};

fn main() -> iced::Result {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("waveviewer starting up");

    let config_path = config::default_config_path();
    if !config_path.exists() {
        if let Err(e) = config::save_config(&config::ViewerConfig::default(), &config_path) {
            log::warn!("Could not write default config: {e:#}");
        }
    }
    let config = config::load_config(&config_path);

    app::run(config)
}
