use crate::backend::workshop::WallpaperInfo;
use crate::constant::EXTERNAL_TYPE;
use crate::style::{ACCENT, MUTED_TEXT};
use egui::{RichText, Sense, Ui, Vec2};
use std::path::Path;

const THUMBNAIL_SIZE: f32 = 56.0;

pub struct LibraryPanel {
    search: String,
    show_external: bool,
    show_workshop: bool,
}

pub fn image_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

impl Default for LibraryPanel {
    fn default() -> Self {
        Self {
            search: String::new(),
            show_external: true,
            show_workshop: true,
        }
    }
}

impl LibraryPanel {
    fn is_visible(&self, wallpaper: &WallpaperInfo) -> bool {
        let external = wallpaper.wallpaper_type == EXTERNAL_TYPE;
        if (external && !self.show_external) || (!external && !self.show_workshop) {
            return false;
        }
        wallpaper.matches(&self.search)
    }

    /// Returns the id of a clicked entry
    pub fn show(
        &mut self,
        ui: &mut Ui,
        wallpapers: &[WallpaperInfo],
        selected: Option<&str>,
        running: Option<&str>,
    ) -> Option<String> {
        let mut clicked = None;

        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.search)
                    .hint_text("🔍 Search")
                    .desired_width(f32::INFINITY),
            );
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.show_workshop, "Workshop");
            ui.checkbox(&mut self.show_external, "Imported");
        });
        ui.separator();

        let visible: Vec<&WallpaperInfo> =
            wallpapers.iter().filter(|w| self.is_visible(w)).collect();

        if visible.is_empty() {
            ui.label(RichText::new("No wallpapers").color(MUTED_TEXT));
            return None;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for wallpaper in visible {
                    let is_selected = selected == Some(wallpaper.id.as_str());
                    let is_running = running == Some(wallpaper.id.as_str());

                    let response = ui
                        .horizontal(|ui| {
                            ui.set_min_height(THUMBNAIL_SIZE);
                            match &wallpaper.preview_path {
                                Some(path) => {
                                    ui.add(
                                        egui::Image::new(image_uri(path))
                                            .fit_to_exact_size(Vec2::splat(THUMBNAIL_SIZE))
                                            .maintain_aspect_ratio(true),
                                    );
                                }
                                None => {
                                    ui.allocate_space(Vec2::splat(THUMBNAIL_SIZE));
                                }
                            }
                            ui.vertical(|ui| {
                                let mut title = RichText::new(wallpaper.display_name());
                                if is_selected {
                                    title = title.strong().color(ACCENT);
                                }
                                ui.add(egui::Label::new(title).truncate());
                                let mut meta = wallpaper.wallpaper_type.clone();
                                if is_running {
                                    meta.push_str("  ▶ running");
                                }
                                ui.label(RichText::new(meta).small().color(MUTED_TEXT));
                            });
                        })
                        .response
                        .interact(Sense::click());

                    if is_selected {
                        ui.painter().rect_stroke(
                            response.rect,
                            4.0,
                            egui::Stroke::new(1.0, ACCENT),
                            egui::StrokeKind::Inside,
                        );
                    }
                    if response.clicked() {
                        clicked = Some(wallpaper.id.clone());
                    }
                    response.on_hover_text(wallpaper.id.as_str());
                }
            });

        clicked
    }
}
