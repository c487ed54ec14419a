use crate::backend::args::WallpaperSettings;
use crate::backend::properties::{
    PropertyKind, WallpaperProperty, format_color, parse_color, parse_properties,
};
use crate::backend::workshop::WallpaperInfo;
use crate::style::MUTED_TEXT;
use crate::ui::library_panel::image_uri;
use egui::{RichText, Ui};
use serde_json::{Map, Value};

const SCALING_MODES: &[&str] = &["default", "stretch", "fit", "fill"];
const CLAMPING_MODES: &[&str] = &["clamp", "border", "repeat"];
const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

pub enum PropertiesAction {
    Launch { extra_args: Vec<String> },
    Stop,
    SaveSettings(Box<WallpaperSettings>),
    ResetSettings,
    SaveProperties(Map<String, Value>),
    ResetProperties,
    Rename(String),
    Remove,
}

pub struct PanelContext<'a> {
    pub wallpaper: &'a WallpaperInfo,
    pub is_running: bool,
    pub has_backup: bool,
    pub is_external: bool,
}

#[derive(Default)]
pub struct PropertiesPanel {
    current_id: Option<String>,
    settings: WallpaperSettings,
    settings_dirty: bool,
    properties: Vec<WallpaperProperty>,
    edited: Map<String, Value>,
    extra_args: String,
    rename: String,
}

impl PropertiesPanel {
    pub fn load(&mut self, wallpaper: &WallpaperInfo, settings: WallpaperSettings) {
        self.current_id = Some(wallpaper.id.clone());
        self.settings = settings;
        self.settings_dirty = false;
        self.properties = parse_properties(&wallpaper.properties);
        self.edited.clear();
        self.rename = wallpaper.name.clone();
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn show(&mut self, ui: &mut Ui, ctx: PanelContext<'_>) -> Option<PropertiesAction> {
        let mut action = None;
        let wallpaper = ctx.wallpaper;

        ui.horizontal(|ui| {
            if ctx.is_running {
                if ui.button("⏹ Stop").clicked() {
                    action = Some(PropertiesAction::Stop);
                }
            } else if ui.button("▶ Launch").clicked() {
                action = Some(PropertiesAction::Launch {
                    extra_args: split_args(&self.extra_args),
                });
            }
            ui.add(
                egui::TextEdit::singleline(&mut self.extra_args)
                    .hint_text("extra arguments")
                    .desired_width(f32::INFINITY),
            );
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.show_info(ui, &ctx, &mut action);

                egui::CollapsingHeader::new("Wallpaper settings")
                    .default_open(true)
                    .show(ui, |ui| {
                        self.show_settings(ui, ctx.is_external);
                        ui.horizontal(|ui| {
                            if ui
                                .add_enabled(self.settings_dirty, egui::Button::new("Save settings"))
                                .clicked()
                            {
                                self.settings_dirty = false;
                                action = Some(PropertiesAction::SaveSettings(Box::new(
                                    self.settings.clone(),
                                )));
                            }
                            if ui
                                .button("Reset to global")
                                .on_hover_text("Drop the overrides stored for this wallpaper")
                                .clicked()
                            {
                                action = Some(PropertiesAction::ResetSettings);
                            }
                        });
                    });

                if !ctx.is_external {
                    egui::CollapsingHeader::new("Engine properties")
                        .default_open(true)
                        .show(ui, |ui| {
                            self.show_properties(ui);
                            ui.horizontal(|ui| {
                                if ui
                                    .add_enabled(
                                        !self.edited.is_empty(),
                                        egui::Button::new("Save properties"),
                                    )
                                    .clicked()
                                {
                                    action = Some(PropertiesAction::SaveProperties(
                                        std::mem::take(&mut self.edited),
                                    ));
                                }
                                if ui
                                    .add_enabled(ctx.has_backup, egui::Button::new("Reset"))
                                    .on_hover_text("Restore the original project.json")
                                    .on_disabled_hover_text("No saved changes")
                                    .clicked()
                                {
                                    action = Some(PropertiesAction::ResetProperties);
                                }
                            });
                        });
                }

                if !wallpaper.description.is_empty() {
                    egui::CollapsingHeader::new("Description").show(ui, |ui| {
                        ui.label(&wallpaper.description);
                    });
                }
            });

        action
    }

    fn show_info(
        &mut self,
        ui: &mut Ui,
        ctx: &PanelContext<'_>,
        action: &mut Option<PropertiesAction>,
    ) {
        let wallpaper = ctx.wallpaper;

        if let Some(preview) = &wallpaper.preview_path {
            ui.add(
                egui::Image::new(image_uri(preview))
                    .max_width(ui.available_width())
                    .max_height(240.0)
                    .maintain_aspect_ratio(true),
            );
        }

        ui.heading(wallpaper.display_name());
        egui::Grid::new("wallpaper_info")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                let row = |ui: &mut Ui, label: &str, value: String| {
                    ui.label(RichText::new(label).color(MUTED_TEXT));
                    ui.label(value);
                    ui.end_row();
                };
                row(ui, "ID", wallpaper.id.clone());
                row(ui, "Type", wallpaper.wallpaper_type.clone());
                if !wallpaper.author.is_empty() {
                    row(ui, "Author", wallpaper.author.clone());
                }
                row(ui, "Size", format_file_size(wallpaper.file_size));
                if let Some(created) = wallpaper.created {
                    row(ui, "Created", created.format("%Y-%m-%d").to_string());
                }
                if let Some(updated) = wallpaper.updated {
                    row(ui, "Updated", updated.format("%Y-%m-%d").to_string());
                }
                if !wallpaper.tags.is_empty() {
                    row(ui, "Tags", wallpaper.tags.join(", "));
                }
                if let Some(resolution) = wallpaper.properties.get("resolution").and_then(Value::as_str)
                {
                    row(ui, "Resolution", resolution.to_string());
                }
                if let Some(codec) = wallpaper.properties.get("codec").and_then(Value::as_str) {
                    row(ui, "Codec", codec.to_string());
                }
            });

        if ctx.is_external {
            ui.horizontal(|ui| {
                ui.add(egui::TextEdit::singleline(&mut self.rename).desired_width(180.0));
                let name = self.rename.trim();
                if ui
                    .add_enabled(
                        !name.is_empty() && name != wallpaper.name,
                        egui::Button::new("Rename"),
                    )
                    .clicked()
                {
                    *action = Some(PropertiesAction::Rename(name.to_string()));
                }
                if ui.button("🗑 Remove").clicked() {
                    *action = Some(PropertiesAction::Remove);
                }
            });
        } else {
            ui.horizontal(|ui| {
                if ui.link("Open folder").clicked() {
                    ui.ctx().open_url(egui::OpenUrl::new_tab(format!(
                        "file://{}",
                        wallpaper.path.display()
                    )));
                }
            });
        }
        ui.separator();
    }

    fn show_settings(&mut self, ui: &mut Ui, is_external: bool) {
        let s = &mut self.settings;
        let mut changed = false;

        ui.label(RichText::new("Audio").strong());
        changed |= ui.checkbox(&mut s.silent, "Silent").changed();
        changed |= ui
            .add_enabled(!s.silent, egui::Slider::new(&mut s.volume, 0..=100).text("Volume"))
            .changed();
        changed |= ui.checkbox(&mut s.no_auto_mute, "Don't mute when other apps play audio").changed();
        if !is_external {
            changed |= ui
                .checkbox(&mut s.no_audio_processing, "Disable audio processing")
                .changed();
            ui.horizontal(|ui| {
                ui.label("Audio device");
                changed |= ui.text_edit_singleline(&mut s.audio_device).changed();
            });
        }

        ui.label(RichText::new("Performance").strong());
        changed |= ui.add(egui::Slider::new(&mut s.fps, 1..=240).text("FPS")).changed();

        ui.label(RichText::new("Display").strong());
        egui::Grid::new("display_settings")
            .num_columns(2)
            .show(ui, |ui| {
                ui.label("Screen");
                changed |= ui.text_edit_singleline(&mut s.screen_root).changed();
                ui.end_row();
                ui.label("Custom screen");
                changed |= ui.text_edit_singleline(&mut s.custom_screen_root).changed();
                ui.end_row();
                ui.label("Scaling");
                changed |= combo(ui, "scaling_mode", &mut s.scaling, SCALING_MODES);
                ui.end_row();
                if !is_external {
                    ui.label("Window");
                    changed |= ui
                        .add(egui::TextEdit::singleline(&mut s.window_geometry).hint_text("XxY WxH"))
                        .changed();
                    ui.end_row();
                    ui.label("Background id");
                    changed |= ui.text_edit_singleline(&mut s.background_id).changed();
                    ui.end_row();
                    ui.label("Clamping");
                    changed |= combo(ui, "clamping_mode", &mut s.clamping, CLAMPING_MODES);
                    ui.end_row();
                }
            });

        if is_external {
            ui.label(RichText::new("Playback").strong());
            changed |= ui.checkbox(&mut s.no_loop, "Play once").changed();
            changed |= ui
                .checkbox(&mut s.no_hardware_decode, "Disable hardware decoding")
                .changed();
            changed |= ui.checkbox(&mut s.force_x11, "Force X11").changed();
            changed |= ui.checkbox(&mut s.force_wayland, "Force Wayland").changed();
            changed |= ui.checkbox(&mut s.verbose, "Verbose output").changed();
            ui.horizontal(|ui| {
                ui.label("Log level");
                changed |= combo(ui, "log_level", &mut s.log_level, LOG_LEVELS);
            });
            ui.horizontal(|ui| {
                ui.label("mpv options");
                changed |= ui.text_edit_singleline(&mut s.mpv_options).changed();
            });
        } else {
            ui.label(RichText::new("Behaviour").strong());
            changed |= ui.checkbox(&mut s.disable_mouse, "Disable mouse interaction").changed();
            changed |= ui.checkbox(&mut s.disable_parallax, "Disable parallax").changed();
            changed |= ui
                .checkbox(&mut s.no_fullscreen_pause, "Keep running over fullscreen apps")
                .changed();
        }

        if changed {
            self.settings_dirty = true;
        }
    }

    fn show_properties(&mut self, ui: &mut Ui) {
        if self.properties.is_empty() {
            ui.label(RichText::new("This wallpaper has no properties").color(MUTED_TEXT));
            return;
        }

        let mut changes = Vec::new();
        egui::Grid::new("engine_properties")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for property in &self.properties {
                    if !property.is_editable() {
                        ui.label(RichText::new(&property.label).strong());
                        ui.end_row();
                        continue;
                    }

                    let mut value = self
                        .edited
                        .get(&property.name)
                        .unwrap_or(&property.value)
                        .clone();
                    ui.label(&property.label);
                    if property_widget(ui, property, &mut value) {
                        changes.push((property.name.clone(), value));
                    }
                    ui.end_row();
                }
            });

        for (name, value) in changes {
            self.record_edit(&name, value);
        }
    }

    /// Stage a new value; labels and unknown entries are never written back
    fn record_edit(&mut self, name: &str, value: Value) -> bool {
        let editable = self
            .properties
            .iter()
            .any(|p| p.name == name && p.is_editable());
        if editable {
            self.edited.insert(name.to_string(), value);
        }
        editable
    }
}

fn combo(ui: &mut Ui, id: &str, value: &mut String, options: &[&str]) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.as_str())
        .show_ui(ui, |ui| {
            for option in options {
                changed |= ui
                    .selectable_value(value, option.to_string(), *option)
                    .changed();
            }
        });
    changed
}

/// Edit one property value in place, returning whether it changed
fn property_widget(ui: &mut Ui, property: &WallpaperProperty, value: &mut Value) -> bool {
    match property.kind {
        PropertyKind::Bool => {
            let mut checked = value.as_bool().unwrap_or(false);
            let changed = ui.checkbox(&mut checked, "").changed();
            if changed {
                *value = Value::Bool(checked);
            }
            changed
        }
        PropertyKind::Slider => {
            let mut number = value.as_f64().unwrap_or(property.min);
            let mut slider = egui::Slider::new(&mut number, property.min..=property.max);
            if property.step > 0.0 {
                slider = slider.step_by(property.step);
            }
            let changed = ui.add(slider).changed();
            if changed {
                *value = serde_json::Number::from_f64(number)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
            }
            changed
        }
        PropertyKind::Combo if !property.options.is_empty() => {
            let current = crate::backend::properties::value_to_arg(value);
            let selected = property
                .options
                .iter()
                .find(|o| o.value == current)
                .map(|o| o.label.clone())
                .unwrap_or_else(|| current.clone());
            let mut picked = None;
            egui::ComboBox::from_id_salt(&property.name)
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for option in &property.options {
                        if ui.selectable_label(option.value == current, &option.label).clicked() {
                            picked = Some(option.value.clone());
                        }
                    }
                });
            match picked {
                Some(choice) if choice != current => {
                    *value = Value::String(choice);
                    true
                }
                _ => false,
            }
        }
        PropertyKind::Color => {
            let mut rgb = value
                .as_str()
                .and_then(parse_color)
                .unwrap_or([0.0, 0.0, 0.0]);
            let changed = ui.color_edit_button_rgb(&mut rgb).changed();
            if changed {
                *value = Value::String(format_color(rgb));
            }
            changed
        }
        PropertyKind::Combo | PropertyKind::TextInput => {
            let mut text = value.as_str().unwrap_or_default().to_string();
            let changed = ui.text_edit_singleline(&mut text).changed();
            if changed {
                *value = Value::String(text);
            }
            changed
        }
        PropertyKind::Text | PropertyKind::Unknown => {
            ui.label(RichText::new(value.to_string()).color(MUTED_TEXT));
            false
        }
    }
}

pub fn split_args(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args("  --fps 60   --silent "),
            vec!["--fps", "60", "--silent"]
        );
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_load_resets_edits() {
        let mut panel = PropertiesPanel::default();
        let mut properties = Map::new();
        properties.insert("speed".to_string(), json!({ "type": "slider", "value": 1 }));
        let wallpaper = WallpaperInfo {
            id: "7".to_string(),
            name: "Seven".to_string(),
            properties,
            ..Default::default()
        };

        panel.edited.insert("speed".to_string(), json!(4));
        panel.load(&wallpaper, WallpaperSettings::default());
        assert_eq!(panel.current_id(), Some("7"));
        assert!(panel.edited.is_empty());
        assert_eq!(panel.properties.len(), 1);
        assert_eq!(panel.rename, "Seven");

        panel.clear();
        assert_eq!(panel.current_id(), None);
    }

    #[test]
    fn test_only_editable_properties_are_staged() {
        let mut panel = PropertiesPanel::default();
        let mut properties = Map::new();
        properties.insert("speed".to_string(), json!({ "type": "slider", "value": 1 }));
        properties.insert("heading".to_string(), json!({ "type": "text", "text": "Motion" }));
        let wallpaper = WallpaperInfo {
            id: "8".to_string(),
            properties,
            ..Default::default()
        };
        panel.load(&wallpaper, WallpaperSettings::default());

        assert!(panel.record_edit("speed", json!(2)));
        assert!(!panel.record_edit("heading", json!("x")));
        assert!(!panel.record_edit("missing", json!(1)));
        assert_eq!(panel.edited.len(), 1);
        assert_eq!(panel.edited.get("speed"), Some(&json!(2)));
    }
}
