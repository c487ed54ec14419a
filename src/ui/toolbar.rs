use egui::{Align, Layout, ProgressBar, RichText, Ui};

pub enum ToolbarAction {
    Refresh,
    ImportMedia,
    Stop,
    Settings,
}

pub struct Toolbar;

pub struct ToolbarState<'a> {
    pub status: &'a str,
    pub scan_progress: Option<(usize, usize)>,
    pub running_name: Option<&'a str>,
    pub external_enabled: bool,
    pub wallpaper_count: usize,
}

impl Toolbar {
    pub fn show(ui: &mut Ui, state: ToolbarState<'_>) -> Option<ToolbarAction> {
        let ToolbarState {
            status,
            scan_progress,
            running_name,
            external_enabled,
            wallpaper_count,
        } = state;

        let mut action = None;

        ui.horizontal(|ui| {
            ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                let scanning = scan_progress.is_some();
                if ui
                    .add_enabled(!scanning, egui::Button::new("⟳ Refresh"))
                    .on_hover_text("Rescan the workshop folders")
                    .clicked()
                {
                    action = Some(ToolbarAction::Refresh);
                }
                if ui
                    .add_enabled(external_enabled, egui::Button::new("➕ Import media"))
                    .on_hover_text("Add an image, gif or video as a wallpaper")
                    .on_disabled_hover_text("Enable the external renderer in Settings")
                    .clicked()
                {
                    action = Some(ToolbarAction::ImportMedia);
                }
                if ui
                    .add_enabled(running_name.is_some(), egui::Button::new("⏹ Stop"))
                    .clicked()
                {
                    action = Some(ToolbarAction::Stop);
                }
                if ui.button("⚙").on_hover_text("Settings").clicked() {
                    action = Some(ToolbarAction::Settings);
                }

                if let Some((done, total)) = scan_progress {
                    let fraction = if total == 0 {
                        0.0
                    } else {
                        done as f32 / total as f32
                    };
                    ui.add(
                        ProgressBar::new(fraction)
                            .desired_width(160.0)
                            .text(format!("{} / {}", done, total)),
                    );
                }
            });

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(RichText::new(format!("{} wallpapers", wallpaper_count)).small());
                ui.separator();
                match running_name {
                    Some(name) => ui.label(RichText::new(format!("▶ {}", name)).small()),
                    None => ui.label(RichText::new(status).small()),
                };
            });
        });

        action
    }
}
