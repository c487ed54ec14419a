use crate::backend::args::WallpaperSettings;
use crate::backend::external::{ExternalLibrary, supported_extensions};
use crate::backend::manager::WallpaperManager;
use crate::backend::probe::ToolProbe;
use crate::backend::process::{LauncherEvent, LauncherOptions, OutputLevel};
use crate::backend::properties;
use crate::backend::workshop::{self, WallpaperInfo};
use crate::config::{ConfigError, ConfigStore, WindowState};
use crate::messages::{PathTarget, ResponseMessage};
use crate::style::{MUTED_TEXT, configure_style};
use crate::ui::library_panel::LibraryPanel;
use crate::ui::log_view::LogView;
use crate::ui::properties_panel::{PanelContext, PropertiesAction, PropertiesPanel};
use crate::ui::settings_window::{SettingsAction, SettingsWindow, pick_path};
use crate::ui::toolbar::{Toolbar, ToolbarAction, ToolbarState};
use egui::RichText;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;
use tracing::{error, info, warn};

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Open the configuration store, falling back to a scratch file when the
/// platform location is unusable
pub fn load_config() -> Result<ConfigStore, ConfigError> {
    match ConfigStore::open_default() {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("Failed to open config at the default location: {}", e);
            let fallback = std::env::temp_dir()
                .join(crate::constant::APP_NAME)
                .join("config.toml");
            ConfigStore::open(fallback)
        }
    }
}

/// Selected entry as shown by the properties panel, refreshed when the
/// selection changes or the item is rewritten on disk
#[derive(Debug, Clone, PartialEq)]
struct Selection {
    wallpaper: WallpaperInfo,
    has_backup: bool,
    is_external: bool,
}

impl Selection {
    fn capture(manager: &WallpaperManager, id: &str) -> Option<Self> {
        let wallpaper = manager.find(id)?;
        Some(Self {
            has_backup: properties::has_backup(&wallpaper.project_path),
            is_external: manager.is_external(id),
            wallpaper,
        })
    }

    fn id(&self) -> &str {
        &self.wallpaper.id
    }
}

pub struct WallpaperApp {
    config: ConfigStore,
    manager: WallpaperManager,
    launcher_events: Receiver<LauncherEvent>,
    response_sender: Sender<ResponseMessage>,
    response_receiver: Receiver<ResponseMessage>,

    library: LibraryPanel,
    properties: PropertiesPanel,
    settings: SettingsWindow,
    log: LogView,

    library_items: Vec<WallpaperInfo>,
    selection: Option<Selection>,
    running: Option<(String, String)>,
    status: String,
    scan_progress: Option<(usize, usize)>,
    window_state: WindowState,
}

impl WallpaperApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ConfigStore) -> Self {
        configure_style(&cc.egui_ctx);

        let external = ExternalLibrary::new(config.external_wallpapers_path(), Box::new(ToolProbe));
        let (manager, launcher_events) = WallpaperManager::new(external, LauncherOptions::default());
        let (response_sender, response_receiver) = channel();
        let window_state = config.window_state();

        let mut app = Self {
            config,
            manager,
            launcher_events,
            response_sender,
            response_receiver,
            library: LibraryPanel::default(),
            properties: PropertiesPanel::default(),
            settings: SettingsWindow::default(),
            log: LogView::default(),
            library_items: Vec::new(),
            selection: None,
            running: None,
            status: "Ready".to_string(),
            scan_progress: None,
            window_state,
        };

        if app.config.is_first_run() || !app.config.configuration_issues().is_empty() {
            app.settings.open(&app.config);
        }
        app.start_scan(&cc.egui_ctx);
        app
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn report_error(&mut self, message: String) {
        error!("{}", message);
        self.log.push(OutputLevel::Error, message.clone());
        self.status = message;
    }

    fn refresh_external(&mut self) {
        if !self.config.external_enabled() {
            return;
        }
        let external = self.manager.external_mut();
        if let Err(e) = external.ensure_root() {
            warn!("Failed to create external wallpapers directory: {}", e);
        }
        if let Err(e) = external.refresh() {
            warn!("Failed to load external wallpapers: {}", e);
        }
    }

    fn start_scan(&mut self, ctx: &egui::Context) {
        if self.scan_progress.is_some() {
            return;
        }
        self.refresh_external();

        let roots = self.config.workshop_roots();
        if roots.is_empty() {
            warn!("No workshop directories found");
        }
        self.scan_progress = Some((0, 0));
        self.set_status("Scanning…");

        let sender = self.response_sender.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let wallpapers = workshop::scan(&roots, |done, total| {
                let _ = sender.send(ResponseMessage::ScanProgress { done, total });
                ctx.request_repaint();
            });
            if let Err(e) = sender.send(ResponseMessage::ScanFinished(wallpapers)) {
                error!("Failed to send scan result: {}", e);
            }
            ctx.request_repaint();
        });
    }

    fn refresh_library(&mut self) {
        self.library_items = self.manager.all_wallpapers();
        // Names may have changed
        self.running = None;
    }

    fn select(&mut self, id: &str) {
        let Some(selection) = Selection::capture(&self.manager, id) else {
            return;
        };
        let settings = WallpaperSettings::resolve(&self.config, id);
        self.properties.load(&selection.wallpaper, settings);
        self.selection = Some(selection);
        if let Err(e) = self.config.set_last_selected_wallpaper(id) {
            warn!("Failed to remember selection: {}", e);
        }
    }

    fn deselect(&mut self) {
        self.selection = None;
        self.properties.clear();
    }

    fn reload_selected(&mut self) {
        self.refresh_library();
        if let Some(id) = self.selection.as_ref().map(|s| s.id().to_string()) {
            self.select(&id);
        }
    }

    fn handle_response(&mut self, message: ResponseMessage) {
        match message {
            ResponseMessage::ScanProgress { done, total } => {
                self.scan_progress = Some((done, total));
            }
            ResponseMessage::ScanFinished(wallpapers) => {
                self.scan_progress = None;
                let count = wallpapers.len();
                self.manager.set_wallpapers(wallpapers);
                self.refresh_library();
                self.set_status(format!(
                    "Found {} wallpapers, {} imported",
                    count,
                    self.manager.external().all().len()
                ));

                let target = match &self.selection {
                    Some(selection) => selection.id().to_string(),
                    None => self.config.last_selected_wallpaper(),
                };
                if !target.is_empty() && self.manager.find(&target).is_some() {
                    self.select(&target);
                } else {
                    self.deselect();
                }
            }
            ResponseMessage::MediaPicked(path) => match self.manager.external_mut().add(&path, None) {
                Ok(item) => {
                    info!(id = %item.id, "Imported {}", path.display());
                    self.log
                        .push(OutputLevel::Info, format!("Imported {} as {}", path.display(), item.id));
                    self.set_status(format!("Imported {}", item.name));
                    self.refresh_library();
                    self.select(&item.id);
                }
                Err(e) => self.report_error(format!("Import failed: {}", e)),
            },
            ResponseMessage::PathPicked { target, path } => {
                self.settings.draft_mut().set_path(target, &path);
            }
        }
    }

    fn handle_toolbar(&mut self, ctx: &egui::Context, action: ToolbarAction) {
        match action {
            ToolbarAction::Refresh => self.start_scan(ctx),
            ToolbarAction::ImportMedia => {
                let sender = self.response_sender.clone();
                let start = self.config.external_wallpapers_path();
                std::thread::spawn(move || {
                    let mut dialog = rfd::FileDialog::new()
                        .set_title("Import media")
                        .add_filter("Media", &supported_extensions());
                    if let Some(home) = start.parent().filter(|p| p.is_dir()) {
                        dialog = dialog.set_directory(home);
                    }
                    if let Some(path) = dialog.pick_file()
                        && let Err(e) = sender.send(ResponseMessage::MediaPicked(path))
                    {
                        error!("Failed to send picked media: {}", e);
                    }
                });
            }
            ToolbarAction::Stop => {
                self.manager.stop();
                self.set_status("Stopped");
            }
            ToolbarAction::Settings => self.settings.open(&self.config),
        }
    }

    fn handle_properties(&mut self, wallpaper: &WallpaperInfo, action: PropertiesAction) {
        let id = wallpaper.id.as_str();
        match action {
            PropertiesAction::Launch { extra_args } => {
                match self.manager.launch(&self.config, id, &extra_args) {
                    Ok(()) => self.set_status(format!("Running {}", wallpaper.display_name())),
                    Err(e) => self.report_error(format!("Failed to launch {}: {}", id, e)),
                }
            }
            PropertiesAction::Stop => {
                self.manager.stop();
                self.set_status("Stopped");
            }
            PropertiesAction::SaveSettings(settings) => match settings.store(&mut self.config, id) {
                Ok(()) => self.set_status("Settings saved"),
                Err(e) => self.report_error(format!("Failed to save settings: {}", e)),
            },
            PropertiesAction::ResetSettings => {
                match self.config.clear_wallpaper_overrides(id) {
                    Ok(()) => self.set_status("Settings reset to defaults"),
                    Err(e) => self.report_error(format!("Failed to reset settings: {}", e)),
                }
                self.reload_selected();
            }
            PropertiesAction::SaveProperties(values) => {
                match properties::save_property_values(&wallpaper.project_path, &values) {
                    Ok(()) => self.set_status(format!("Saved {} properties", values.len())),
                    Err(e) => self.report_error(format!("Failed to save properties: {}", e)),
                }
                self.reload_workshop_item(wallpaper);
            }
            PropertiesAction::ResetProperties => {
                match properties::reset_from_backup(&wallpaper.project_path) {
                    Ok(()) => self.set_status("Properties restored"),
                    Err(e) => self.report_error(format!("Failed to restore properties: {}", e)),
                }
                self.reload_workshop_item(wallpaper);
            }
            PropertiesAction::Rename(name) => {
                match self.manager.external_mut().rename(id, &name) {
                    Ok(()) => self.set_status(format!("Renamed to {}", name)),
                    Err(e) => self.report_error(format!("Failed to rename: {}", e)),
                }
                self.reload_selected();
            }
            PropertiesAction::Remove => match self.manager.remove_external(id) {
                Ok(()) => {
                    self.set_status(format!("Removed {}", wallpaper.display_name()));
                    self.refresh_library();
                    self.deselect();
                }
                Err(e) => self.report_error(format!("Failed to remove {}: {}", id, e)),
            },
        }
    }

    fn reload_workshop_item(&mut self, wallpaper: &WallpaperInfo) {
        match workshop::load_wallpaper(&wallpaper.path) {
            Ok(fresh) => self.manager.update_wallpaper(fresh),
            Err(e) => warn!("Failed to reload {}: {}", wallpaper.id, e),
        }
        self.reload_selected();
    }

    fn handle_settings(&mut self, ctx: &egui::Context, action: SettingsAction) {
        match action {
            SettingsAction::Save => {
                if let Err(e) = self.settings.draft().apply(&mut self.config) {
                    self.report_error(format!("Failed to save settings: {}", e));
                    return;
                }
                self.manager
                    .external_mut()
                    .set_root(self.config.external_wallpapers_path());
                let issues = self.config.configuration_issues();
                if issues.is_empty() {
                    self.settings.close();
                }
                self.settings.set_issues(issues);
                self.set_status("Settings saved");
                self.start_scan(ctx);
            }
            SettingsAction::Browse(target) => {
                let sender = self.response_sender.clone();
                let start = browse_start(target, self.settings.draft());
                std::thread::spawn(move || {
                    if let Some(path) = pick_path(target, start)
                        && let Err(e) = sender.send(ResponseMessage::PathPicked { target, path })
                    {
                        error!("Failed to send picked path: {}", e);
                    }
                });
            }
            SettingsAction::DetectAssets => match self.config.candidate_assets_dirs().first() {
                Some(dir) => {
                    info!("Detected assets directory: {}", dir.display());
                    self.settings.draft_mut().set_path(PathTarget::AssetsDir, dir);
                }
                None => self.set_status("No assets directory found, save the Steam paths first"),
            },
        }
    }

    fn drain_launcher_events(&mut self) {
        self.manager.poll();
        while let Ok(event) = self.launcher_events.try_recv() {
            match &event {
                LauncherEvent::Error(message) => self.status = message.clone(),
                LauncherEvent::Finished { outcome, .. } if !outcome.is_success() => {
                    self.status = format!("Wallpaper exited: {}", outcome);
                }
                _ => {}
            }
            self.log.push_event(&event);
        }
    }

    /// Keep the `(id, name)` of the running wallpaper, looked up only when it changes
    fn track_running(&mut self) {
        let current = self.manager.current_id();
        if self.running.as_ref().map(|(id, _)| id.as_str()) == current {
            return;
        }
        self.running = current.map(|id| {
            let name = self
                .manager
                .find(id)
                .map(|w| w.display_name().to_string())
                .unwrap_or_else(|| id.to_string());
            (id.to_string(), name)
        });
    }
}

fn browse_start(target: PathTarget, draft: &crate::ui::settings_window::SettingsDraft) -> Option<PathBuf> {
    let current = match target {
        PathTarget::EngineBinary => &draft.engine_binary,
        PathTarget::AssetsDir => &draft.assets_dir,
        PathTarget::SteamPath | PathTarget::SteamLibrary => &draft.steam_path,
        PathTarget::ExternalBinary => &draft.external_binary,
        PathTarget::ExternalWallpapers => &draft.external_wallpapers_path,
    };
    let path = PathBuf::from(current.trim());
    if path.is_dir() {
        Some(path)
    } else {
        path.parent().map(PathBuf::from)
    }
}

impl eframe::App for WallpaperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(message) = self.response_receiver.try_recv() {
            self.handle_response(message);
        }
        self.drain_launcher_events();

        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.window_state.width = rect.width();
            self.window_state.height = rect.height();
        }

        let running = self.manager.is_running();
        self.track_running();
        let running_id = self.running.as_ref().map(|(id, _)| id.clone());
        let running_name = self.running.as_ref().map(|(_, name)| name.clone());

        // Toolbar
        let toolbar_action = egui::TopBottomPanel::top("toolbar_panel")
            .show(ctx, |ui| {
                Toolbar::show(
                    ui,
                    ToolbarState {
                        status: &self.status,
                        scan_progress: self.scan_progress,
                        running_name: running_name.as_deref(),
                        external_enabled: self.config.external_enabled(),
                        wallpaper_count: self.library_items.len(),
                    },
                )
            })
            .inner;
        if let Some(action) = toolbar_action {
            self.handle_toolbar(ctx, action);
        }

        // Library
        let library = egui::SidePanel::left("library_panel")
            .resizable(true)
            .default_width(self.window_state.library_width)
            .width_range(200.0..=520.0)
            .show(ctx, |ui| {
                self.library.show(
                    ui,
                    &self.library_items,
                    self.properties.current_id(),
                    running_id.as_deref(),
                )
            });
        self.window_state.library_width = library.response.rect.width();
        let clicked = library
            .inner
            .filter(|id| self.properties.current_id() != Some(id.as_str()));
        if let Some(id) = clicked {
            self.select(&id);
        }

        // Engine output
        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(160.0)
            .show(ctx, |ui| {
                self.log.show(ui);
            });

        // Properties
        let properties_action = egui::CentralPanel::default()
            .show(ctx, |ui| match &self.selection {
                Some(selection) => {
                    let panel_ctx = PanelContext {
                        wallpaper: &selection.wallpaper,
                        is_running: running_id.as_deref() == Some(selection.id()),
                        has_backup: selection.has_backup,
                        is_external: selection.is_external,
                    };
                    self.properties.show(ui, panel_ctx)
                }
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new("Select a wallpaper").color(MUTED_TEXT));
                    });
                    None
                }
            })
            .inner;
        if let Some(action) = properties_action
            && let Some(wallpaper) = self.selection.as_ref().map(|s| s.wallpaper.clone())
        {
            self.handle_properties(&wallpaper, action);
        }

        if let Some(action) = self.settings.show(ctx) {
            self.handle_settings(ctx, action);
        }

        if running || self.scan_progress.is_some() {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.config.set_window_state(&self.window_state) {
            warn!("Failed to save window state: {}", e);
        }
        self.manager.stop();
        info!("Bye");
    }
}
