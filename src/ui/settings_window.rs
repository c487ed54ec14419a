use crate::config::{ConfigError, ConfigStore, keys};
use crate::messages::PathTarget;
use crate::style::{ERROR_TEXT, MUTED_TEXT};
use egui::{Context, RichText, Ui};
use std::path::{Path, PathBuf};

pub enum SettingsAction {
    Save,
    Browse(PathTarget),
    DetectAssets,
}

/// Editable copy of the global settings, written back on save
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsDraft {
    pub steam_path: String,
    pub steam_library_paths: String,
    pub engine_binary: String,
    pub assets_dir: String,

    pub master_volume: i64,
    pub audio_device: String,
    pub silent: bool,
    pub no_auto_mute: bool,
    pub no_audio_processing: bool,
    pub fps: i64,
    pub screen_root: String,
    pub window_mode: String,
    pub disable_mouse: bool,
    pub disable_parallax: bool,
    pub no_fullscreen_pause: bool,
    pub prime_offload: bool,

    pub external_enabled: bool,
    pub external_binary: String,
    pub external_wallpapers_path: String,
}

impl SettingsDraft {
    pub fn from_config(config: &ConfigStore) -> Self {
        Self {
            steam_path: config.steam_path(),
            steam_library_paths: config.steam_library_paths().join("\n"),
            engine_binary: config.engine_binary(),
            assets_dir: config.assets_dir(),
            master_volume: config.master_volume(),
            audio_device: config.audio_device(),
            silent: config.silent(),
            no_auto_mute: config.no_auto_mute(),
            no_audio_processing: config.no_audio_processing(),
            fps: config.target_fps(),
            screen_root: config.screen_root(),
            window_mode: config.window_mode(),
            disable_mouse: config.disable_mouse(),
            disable_parallax: config.disable_parallax(),
            no_fullscreen_pause: config.no_fullscreen_pause(),
            prime_offload: config.prime_offload(),
            external_enabled: config.external_enabled(),
            external_binary: config.external_binary(),
            external_wallpapers_path: config.external_wallpapers_path().display().to_string(),
        }
    }

    fn library_paths(&self) -> Vec<String> {
        self.steam_library_paths
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn apply(&self, config: &mut ConfigStore) -> Result<(), ConfigError> {
        config.set_steam_path(self.steam_path.trim())?;
        config.set_steam_library_paths(self.library_paths())?;
        config.set_engine_binary(self.engine_binary.trim())?;
        config.set_assets_dir(self.assets_dir.trim())?;

        config.set(keys::MASTER_VOLUME, self.master_volume)?;
        config.set(keys::AUDIO_DEVICE, self.audio_device.trim())?;
        config.set(keys::SILENT, self.silent)?;
        config.set(keys::NO_AUTO_MUTE, self.no_auto_mute)?;
        config.set(keys::NO_AUDIO_PROCESSING, self.no_audio_processing)?;
        config.set(keys::FPS, self.fps)?;
        config.set(keys::SCREEN_ROOT, self.screen_root.trim())?;
        config.set(keys::WINDOW_MODE, self.window_mode.trim())?;
        config.set(keys::DISABLE_MOUSE, self.disable_mouse)?;
        config.set(keys::DISABLE_PARALLAX, self.disable_parallax)?;
        config.set(keys::NO_FULLSCREEN_PAUSE, self.no_fullscreen_pause)?;
        config.set(keys::PRIME_OFFLOAD, self.prime_offload)?;

        config.set_external_enabled(self.external_enabled)?;
        config.set_external_binary(self.external_binary.trim())?;
        config.set_external_wallpapers_path(Path::new(self.external_wallpapers_path.trim()))?;
        config.set(keys::FIRST_RUN, false)?;
        Ok(())
    }

    pub fn set_path(&mut self, target: PathTarget, path: &Path) {
        let value = path.display().to_string();
        match target {
            PathTarget::EngineBinary => self.engine_binary = value,
            PathTarget::AssetsDir => self.assets_dir = value,
            PathTarget::SteamPath => self.steam_path = value,
            PathTarget::SteamLibrary => {
                if !self.library_paths().contains(&value) {
                    if !self.steam_library_paths.trim().is_empty() {
                        self.steam_library_paths.push('\n');
                    }
                    self.steam_library_paths.push_str(&value);
                }
            }
            PathTarget::ExternalBinary => self.external_binary = value,
            PathTarget::ExternalWallpapers => self.external_wallpapers_path = value,
        }
    }
}

/// Whether the native dialog for `target` picks a file or a folder
pub fn picks_file(target: PathTarget) -> bool {
    matches!(target, PathTarget::EngineBinary | PathTarget::ExternalBinary)
}

#[derive(Default)]
pub struct SettingsWindow {
    open: bool,
    draft: SettingsDraft,
    issues: Vec<String>,
}

impl SettingsWindow {
    pub fn open(&mut self, config: &ConfigStore) {
        self.draft = SettingsDraft::from_config(config);
        self.issues = config.configuration_issues();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn draft(&self) -> &SettingsDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut SettingsDraft {
        &mut self.draft
    }

    pub fn set_issues(&mut self, issues: Vec<String>) {
        self.issues = issues;
    }

    pub fn show(&mut self, ctx: &Context) -> Option<SettingsAction> {
        if !self.open {
            return None;
        }

        let mut action = None;
        let mut open = self.open;
        let draft = &mut self.draft;
        let issues = &self.issues;

        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(true)
            .collapsible(false)
            .default_width(520.0)
            .show(ctx, |ui| {
                for issue in issues {
                    ui.label(RichText::new(format!("⚠ {}", issue)).color(ERROR_TEXT));
                }

                egui::ScrollArea::vertical()
                    .max_height(480.0)
                    .show(ui, |ui| {
                        ui.label(RichText::new("Paths").strong());
                        egui::Grid::new("settings_paths")
                            .num_columns(3)
                            .show(ui, |ui| {
                                path_row(ui, "Steam", &mut draft.steam_path, PathTarget::SteamPath, &mut action);
                                path_row(
                                    ui,
                                    "Engine binary",
                                    &mut draft.engine_binary,
                                    PathTarget::EngineBinary,
                                    &mut action,
                                );
                                path_row(ui, "Assets", &mut draft.assets_dir, PathTarget::AssetsDir, &mut action);
                            });
                        ui.horizontal(|ui| {
                            if ui.button("Detect assets").clicked() {
                                action = Some(SettingsAction::DetectAssets);
                            }
                            if ui.button("Add library…").clicked() {
                                action = Some(SettingsAction::Browse(PathTarget::SteamLibrary));
                            }
                        });
                        ui.label(RichText::new("Steam libraries, one per line").small().color(MUTED_TEXT));
                        ui.add(
                            egui::TextEdit::multiline(&mut draft.steam_library_paths)
                                .desired_rows(3)
                                .desired_width(f32::INFINITY),
                        );

                        ui.separator();
                        ui.label(RichText::new("Defaults").strong());
                        ui.add(egui::Slider::new(&mut draft.master_volume, 0..=100).text("Volume"));
                        ui.add(egui::Slider::new(&mut draft.fps, 1..=240).text("FPS"));
                        ui.checkbox(&mut draft.silent, "Silent");
                        ui.checkbox(&mut draft.no_auto_mute, "Don't auto mute");
                        ui.checkbox(&mut draft.no_audio_processing, "Disable audio processing");
                        ui.checkbox(&mut draft.disable_mouse, "Disable mouse interaction");
                        ui.checkbox(&mut draft.disable_parallax, "Disable parallax");
                        ui.checkbox(&mut draft.no_fullscreen_pause, "Keep running over fullscreen apps");
                        egui::Grid::new("settings_display").num_columns(2).show(ui, |ui| {
                            ui.label("Audio device");
                            ui.text_edit_singleline(&mut draft.audio_device);
                            ui.end_row();
                            ui.label("Screen");
                            ui.text_edit_singleline(&mut draft.screen_root);
                            ui.end_row();
                            ui.label("Window");
                            ui.text_edit_singleline(&mut draft.window_mode);
                            ui.end_row();
                        });
                        if cfg!(target_os = "linux") {
                            ui.checkbox(&mut draft.prime_offload, "Render on the NVIDIA GPU (PRIME offload)");
                        }

                        ui.separator();
                        ui.label(RichText::new("External media renderer").strong());
                        ui.checkbox(&mut draft.external_enabled, "Enabled");
                        ui.add_enabled_ui(draft.external_enabled, |ui| {
                            egui::Grid::new("settings_external")
                                .num_columns(3)
                                .show(ui, |ui| {
                                    path_row(
                                        ui,
                                        "Renderer binary",
                                        &mut draft.external_binary,
                                        PathTarget::ExternalBinary,
                                        &mut action,
                                    );
                                    path_row(
                                        ui,
                                        "Library folder",
                                        &mut draft.external_wallpapers_path,
                                        PathTarget::ExternalWallpapers,
                                        &mut action,
                                    );
                                });
                        });
                    });

                ui.separator();
                if ui.button("Save").clicked() {
                    action = Some(SettingsAction::Save);
                }
            });

        self.open = open;
        action
    }
}

fn path_row(
    ui: &mut Ui,
    label: &str,
    value: &mut String,
    target: PathTarget,
    action: &mut Option<SettingsAction>,
) {
    ui.label(label);
    ui.add(egui::TextEdit::singleline(value).desired_width(320.0));
    if ui.button("…").on_hover_text("Browse").clicked() {
        *action = Some(SettingsAction::Browse(target));
    }
    ui.end_row();
}

/// Run a native picker for `target` and return the chosen path
pub fn pick_path(target: PathTarget, start: Option<PathBuf>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new();
    if let Some(dir) = start.filter(|d| d.is_dir()) {
        dialog = dialog.set_directory(dir);
    }
    if picks_file(target) {
        dialog.pick_file()
    } else {
        dialog.pick_folder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    #[test]
    fn test_draft_apply_round_trip() {
        let test_dir = std::env::temp_dir().join(format!("test_settings_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        let mut config = ConfigStore::open(test_dir.join("config.toml")).unwrap();

        let mut draft = SettingsDraft::from_config(&config);
        assert_eq!(draft.master_volume, 15);
        assert!(draft.prime_offload);

        draft.engine_binary = " /opt/engine/run ".to_string();
        draft.steam_library_paths = "/mnt/a\n\n  /mnt/b  \n".to_string();
        draft.master_volume = 70;
        draft.external_enabled = true;
        draft.external_wallpapers_path = test_dir.join("ext").display().to_string();
        draft.apply(&mut config).unwrap();

        assert_eq!(config.engine_binary(), "/opt/engine/run");
        assert_eq!(config.steam_library_paths(), vec!["/mnt/a", "/mnt/b"]);
        assert_eq!(config.master_volume(), 70);
        assert!(config.external_enabled());
        assert_eq!(config.external_wallpapers_path(), test_dir.join("ext"));
        assert!(!config.is_first_run());

        let reloaded = SettingsDraft::from_config(&config);
        assert_eq!(reloaded.steam_library_paths, "/mnt/a\n/mnt/b");

        let _ = fs::remove_dir_all(&test_dir);
    }

    #[test]
    fn test_set_path_targets() {
        let mut draft = SettingsDraft::default();
        draft.set_path(PathTarget::EngineBinary, Path::new("/bin/engine"));
        draft.set_path(PathTarget::SteamLibrary, Path::new("/mnt/games"));
        draft.set_path(PathTarget::SteamLibrary, Path::new("/mnt/more"));
        draft.set_path(PathTarget::SteamLibrary, Path::new("/mnt/games"));

        assert_eq!(draft.engine_binary, "/bin/engine");
        assert_eq!(draft.steam_library_paths, "/mnt/games\n/mnt/more");
        assert!(picks_file(PathTarget::ExternalBinary));
        assert!(!picks_file(PathTarget::AssetsDir));
    }
}
