// =============================================================================
// SAMPLE APP - a colored triangle on the asvk frame loop
// =============================================================================
//
// FRAME FLOW (see asvk::app):
// 1. Reset the command list, move the swapchain image to color attachment
// 2. Clear color + depth, draw three vertices
// 3. Move the image back to present, submit, wait on the queue fence
// 4. Present and acquire the next image
//
// =============================================================================

mod sample;

use anyhow::Result;
use asvk::{App, Config};

use sample::SampleApp;

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting sample application");
    log::info!(
        "Window: {}x{} ({}), {} swapchain buffers",
        config.window.width,
        config.window.height,
        config.window.title,
        config.graphics.chain_count
    );
    log::info!("Present mode: {}", config.graphics.present_mode);

    let handler = SampleApp::new(config.resources.clone());
    App::new(config, handler).run()
}

/// Log level from config.toml, overridable through RUST_LOG
fn init_logging(config: &Config) {
    use env_logger::{Builder, Env};

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_env(Env::default());
    builder.format_timestamp_millis();
    builder.init();
}
