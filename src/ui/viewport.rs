use crate::config::WindowState;
use crate::constant::DEFAULT_WINDOW_TITLE;

pub fn build_viewport(state: &WindowState) -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(DEFAULT_WINDOW_TITLE)
            .with_app_id(crate::constant::APP_NAME)
            .with_inner_size([state.width, state.height])
            .with_min_inner_size([720.0, 480.0])
            .with_resizable(true),
        ..Default::default()
    }
}
