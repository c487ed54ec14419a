use tracing::error;
use tracing_subscriber::EnvFilter;
use wallpaper_shell::app::{WallpaperApp, load_config};
use wallpaper_shell::constant;
use wallpaper_shell::ui;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(constant::DEFAULT_LOG_LEVEL)),
        )
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to open configuration: {}", e);
            return Err(eframe::Error::AppCreation(Box::new(e)));
        }
    };
    let options = ui::viewport::build_viewport(&config.window_state());

    eframe::run_native(
        constant::DEFAULT_WINDOW_TITLE,
        options,
        Box::new(|cc| {
            // Workshop titles are frequently CJK
            let fonts = ui::font::setup_fonts();
            cc.egui_ctx.set_fonts(fonts);
            egui_extras::install_image_loaders(&cc.egui_ctx);

            Ok(Box::new(WallpaperApp::new(cc, config)))
        }),
    )
}
