use crate::backend::args::{Renderer, WallpaperSettings, translate_engine_args};
use crate::backend::external::{ExternalError, ExternalLibrary};
use crate::backend::process::{
    ExitOutcome, LaunchError, LaunchRequest, LauncherEvent, LauncherOptions, ProcessLauncher,
};
use crate::backend::properties::property_args;
use crate::backend::workshop::WallpaperInfo;
use crate::config::ConfigStore;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Wallpaper not found: {0}")]
    NotFound(String),

    #[error("Wallpaper Engine binary path not configured")]
    EngineNotConfigured,

    #[error("External renderer is not enabled")]
    ExternalDisabled,

    #[error("External renderer binary path not configured")]
    ExternalNotConfigured,

    #[error("External wallpaper media not found: {}", .0.display())]
    MediaMissing(PathBuf),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    External(#[from] ExternalError),
}

/// Owns the library and the single renderer process shared by both renderers
pub struct WallpaperManager {
    wallpapers: Vec<WallpaperInfo>,
    external: ExternalLibrary,
    launcher: ProcessLauncher,
}

impl WallpaperManager {
    pub fn new(
        external: ExternalLibrary,
        options: LauncherOptions,
    ) -> (Self, Receiver<LauncherEvent>) {
        let (launcher, events) = ProcessLauncher::new(options);
        let manager = Self {
            wallpapers: Vec::new(),
            external,
            launcher,
        };
        (manager, events)
    }

    pub fn set_wallpapers(&mut self, wallpapers: Vec<WallpaperInfo>) {
        self.wallpapers = wallpapers;
    }

    /// Swap in a freshly loaded copy of a workshop item
    pub fn update_wallpaper(&mut self, wallpaper: WallpaperInfo) {
        match self.wallpapers.iter_mut().find(|w| w.id == wallpaper.id) {
            Some(existing) => *existing = wallpaper,
            None => self.wallpapers.push(wallpaper),
        }
    }

    pub fn wallpapers(&self) -> &[WallpaperInfo] {
        &self.wallpapers
    }

    pub fn external(&self) -> &ExternalLibrary {
        &self.external
    }

    pub fn external_mut(&mut self) -> &mut ExternalLibrary {
        &mut self.external
    }

    /// Workshop items take precedence over imported media with the same id
    pub fn find(&self, id: &str) -> Option<WallpaperInfo> {
        self.wallpapers
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .or_else(|| self.external.get(id).map(|e| e.to_wallpaper_info()))
    }

    pub fn all_wallpapers(&self) -> Vec<WallpaperInfo> {
        let mut all = self.wallpapers.clone();
        all.extend(self.external.all().iter().map(|e| e.to_wallpaper_info()));
        all
    }

    pub fn is_external(&self, id: &str) -> bool {
        !self.wallpapers.iter().any(|w| w.id == id) && self.external.contains(id)
    }

    /// Build the command line for `id` without starting anything
    pub fn plan_launch(
        &self,
        config: &ConfigStore,
        id: &str,
        extra_args: &[String],
    ) -> Result<LaunchRequest, ManagerError> {
        let settings = WallpaperSettings::resolve(config, id);

        if let Some(wallpaper) = self.wallpapers.iter().find(|w| w.id == id) {
            let binary = config.engine_binary();
            if binary.trim().is_empty() {
                return Err(ManagerError::EngineNotConfigured);
            }
            let program = PathBuf::from(binary);

            let mut args = settings.to_args(Renderer::Engine);
            args.extend(extra_args.iter().cloned());
            let assets_dir = config.assets_dir();
            if !assets_dir.is_empty() && !args.iter().any(|a| a == "--assets-dir") {
                args.push("--assets-dir".to_string());
                args.push(assets_dir);
            }
            args.push(wallpaper.path.display().to_string());

            let overrides = property_args(&wallpaper.project_path);
            if !overrides.is_empty() {
                debug!(
                    "Applying {} property overrides to {}",
                    overrides.len() / 2,
                    id
                );
                args.extend(overrides);
            }

            return Ok(LaunchRequest {
                wallpaper_id: id.to_string(),
                working_dir: program.parent().map(Path::to_path_buf),
                program,
                args,
                env: renderer_env(config),
            });
        }

        let Some(item) = self.external.get(id) else {
            return Err(ManagerError::NotFound(id.to_string()));
        };
        if !config.external_enabled() {
            return Err(ManagerError::ExternalDisabled);
        }
        let binary = config.external_binary();
        if binary.trim().is_empty() {
            return Err(ManagerError::ExternalNotConfigured);
        }
        if item.symlink_path.symlink_metadata().is_err() {
            return Err(ManagerError::MediaMissing(item.symlink_path.clone()));
        }

        let mut args = settings.to_args(Renderer::External);
        args.extend(translate_engine_args(extra_args));
        args.push(item.symlink_path.display().to_string());

        Ok(LaunchRequest {
            wallpaper_id: id.to_string(),
            program: PathBuf::from(binary),
            args,
            working_dir: None,
            env: renderer_env(config),
        })
    }

    pub fn launch(
        &mut self,
        config: &ConfigStore,
        id: &str,
        extra_args: &[String],
    ) -> Result<(), ManagerError> {
        let request = self.plan_launch(config, id, extra_args)?;
        info!(%id, "Launching wallpaper");
        self.launcher.launch(request)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.launcher.stop();
    }

    pub fn is_running(&mut self) -> bool {
        self.launcher.is_running()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.launcher.current_id()
    }

    pub fn poll(&mut self) -> Option<ExitOutcome> {
        self.launcher.poll()
    }

    /// Remove an imported item, stopping it first if it is on screen
    pub fn remove_external(&mut self, id: &str) -> Result<(), ManagerError> {
        if self.current_id() == Some(id) {
            self.stop();
        }
        self.external.remove(id)?;
        Ok(())
    }
}

/// Extra environment for renderer processes
pub fn renderer_env(config: &ConfigStore) -> Vec<(String, String)> {
    if cfg!(target_os = "linux") && config.prime_offload() {
        vec![
            ("__NV_PRIME_RENDER_OFFLOAD".to_string(), "1".to_string()),
            ("__GLX_VENDOR_LIBRARY_NAME".to_string(), "nvidia".to_string()),
        ]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::external::MediaType;
    use crate::backend::probe::MediaProbe;
    use crate::config::{keys, overrides};
    use crate::constant::PROJECT_FILE;
    use serde_json::{Map, json};
    use std::fs;
    use uuid::Uuid;

    struct NullProbe;

    impl MediaProbe for NullProbe {
        fn resolution(&self, _path: &Path, _media_type: MediaType) -> Option<(u32, u32)> {
            None
        }

        fn video_codec(&self, _path: &Path) -> Option<String> {
            None
        }

        fn render_preview(&self, _video: &Path, _output: &Path, _size: u32) -> bool {
            false
        }
    }

    struct Fixture {
        dir: PathBuf,
        config: ConfigStore,
        manager: WallpaperManager,
        _events: Receiver<LauncherEvent>,
    }

    fn setup() -> Fixture {
        let dir = std::env::temp_dir().join(format!("test_manager_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let config = ConfigStore::open(dir.join("config.toml")).unwrap();
        let external = ExternalLibrary::new(dir.join("external"), Box::new(NullProbe));
        let (manager, events) = WallpaperManager::new(external, LauncherOptions::default());
        Fixture {
            dir,
            config,
            manager,
            _events: events,
        }
    }

    fn cleanup(fixture: Fixture) {
        let dir = fixture.dir.clone();
        drop(fixture);
        let _ = fs::remove_dir_all(&dir);
    }

    fn workshop_item(root: &Path, id: &str) -> WallpaperInfo {
        let path = root.join(id);
        fs::create_dir_all(&path).unwrap();
        let project_path = path.join(PROJECT_FILE);
        fs::write(
            &project_path,
            json!({ "general": { "properties": { "speed": { "type": "slider", "value": 1 } } } })
                .to_string(),
        )
        .unwrap();
        WallpaperInfo {
            id: id.to_string(),
            name: format!("Item {}", id),
            path,
            project_path,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_workshop_launch() {
        let mut f = setup();
        let item = workshop_item(&f.dir, "1001");
        f.manager.set_wallpapers(vec![item.clone()]);

        assert!(matches!(
            f.manager.plan_launch(&f.config, "1001", &[]),
            Err(ManagerError::EngineNotConfigured)
        ));

        f.config.set_engine_binary("/opt/engine/linux-wallpaperengine").unwrap();
        f.config.set_assets_dir("/opt/engine/assets").unwrap();
        f.config
            .set_wallpaper_value("1001", overrides::MASTER_VOLUME, 40i64)
            .unwrap();
        f.config
            .set_wallpaper_value("1001", overrides::SCREEN_ROOT, "HDMI-1")
            .unwrap();

        let extra = vec!["--fps".to_string(), "60".to_string()];
        let request = f.manager.plan_launch(&f.config, "1001", &extra).unwrap();
        assert_eq!(request.wallpaper_id, "1001");
        assert_eq!(request.program, PathBuf::from("/opt/engine/linux-wallpaperengine"));
        assert_eq!(request.working_dir, Some(PathBuf::from("/opt/engine")));
        assert_eq!(
            request.args,
            vec![
                "--volume".to_string(),
                "40".to_string(),
                "--screen-root".to_string(),
                "HDMI-1".to_string(),
                "--fps".to_string(),
                "60".to_string(),
                "--assets-dir".to_string(),
                "/opt/engine/assets".to_string(),
                item.path.display().to_string(),
            ]
        );

        cleanup(f);
    }

    #[test]
    fn test_plan_workshop_launch_with_property_overrides() {
        let mut f = setup();
        let item = workshop_item(&f.dir, "2002");
        f.manager.set_wallpapers(vec![item.clone()]);
        f.config.set_engine_binary("/opt/engine/bin").unwrap();

        let mut values = Map::new();
        values.insert("speed".to_string(), json!(3));
        crate::backend::properties::save_property_values(&item.project_path, &values).unwrap();

        let extra = vec!["--assets-dir".to_string(), "/custom".to_string()];
        f.config.set_assets_dir("/ignored").unwrap();
        let request = f.manager.plan_launch(&f.config, "2002", &extra).unwrap();
        assert_eq!(
            request.args,
            vec![
                "--assets-dir".to_string(),
                "/custom".to_string(),
                item.path.display().to_string(),
                "--set-property".to_string(),
                "speed=3".to_string(),
            ]
        );

        cleanup(f);
    }

    #[test]
    fn test_plan_external_launch() {
        let mut f = setup();
        let media = f.dir.join("clip.mp4");
        fs::write(&media, b"video").unwrap();
        let added = f.manager.external_mut().add(&media, None).unwrap();

        assert!(matches!(
            f.manager.plan_launch(&f.config, &added.id, &[]),
            Err(ManagerError::ExternalDisabled)
        ));
        f.config.set(keys::EXTERNAL_ENABLED, true).unwrap();
        assert!(matches!(
            f.manager.plan_launch(&f.config, &added.id, &[]),
            Err(ManagerError::ExternalNotConfigured)
        ));
        f.config.set(keys::EXTERNAL_BINARY, "/usr/bin/wnel").unwrap();
        f.config
            .set_wallpaper_value(&added.id, overrides::MASTER_VOLUME, 50i64)
            .unwrap();

        let extra = vec![
            "--screen-root".to_string(),
            "DP-1".to_string(),
            "--assets-dir".to_string(),
            "/x".to_string(),
        ];
        let request = f.manager.plan_launch(&f.config, &added.id, &extra).unwrap();
        assert_eq!(request.program, PathBuf::from("/usr/bin/wnel"));
        assert_eq!(request.working_dir, None);
        assert_eq!(
            request.args,
            vec![
                "--volume".to_string(),
                "0.50".to_string(),
                "--output".to_string(),
                "DP-1".to_string(),
                added.symlink_path.display().to_string(),
            ]
        );

        fs::remove_file(&added.symlink_path).unwrap();
        assert!(matches!(
            f.manager.plan_launch(&f.config, &added.id, &[]),
            Err(ManagerError::MediaMissing(_))
        ));

        cleanup(f);
    }

    #[test]
    fn test_find_and_unknown_id() {
        let mut f = setup();
        let item = workshop_item(&f.dir, "3003");
        f.manager.set_wallpapers(vec![item]);
        let media = f.dir.join("still.png");
        fs::write(&media, b"png").unwrap();
        let added = f.manager.external_mut().add(&media, Some("Still")).unwrap();

        assert_eq!(f.manager.find("3003").unwrap().name, "Item 3003");
        assert_eq!(f.manager.find(&added.id).unwrap().name, "Still");
        assert!(f.manager.find("missing").is_none());
        assert_eq!(f.manager.all_wallpapers().len(), 2);
        assert!(f.manager.is_external(&added.id));
        assert!(!f.manager.is_external("3003"));
        assert!(matches!(
            f.manager.plan_launch(&f.config, "missing", &[]),
            Err(ManagerError::NotFound(_))
        ));

        f.manager.remove_external(&added.id).unwrap();
        assert!(f.manager.find(&added.id).is_none());

        cleanup(f);
    }

    #[test]
    fn test_renderer_env() {
        let mut f = setup();
        let env = renderer_env(&f.config);
        if cfg!(target_os = "linux") {
            assert_eq!(env.len(), 2);
            assert!(env.contains(&("__NV_PRIME_RENDER_OFFLOAD".to_string(), "1".to_string())));
        } else {
            assert!(env.is_empty());
        }

        f.config.set(keys::PRIME_OFFLOAD, false).unwrap();
        assert!(renderer_env(&f.config).is_empty());

        cleanup(f);
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_and_stop_external() {
        use std::os::unix::fs::PermissionsExt;

        let mut f = setup();
        let script = f.dir.join("renderer.sh");
        fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let media = f.dir.join("still.png");
        fs::write(&media, b"png").unwrap();
        let added = f.manager.external_mut().add(&media, None).unwrap();
        f.config.set(keys::EXTERNAL_ENABLED, true).unwrap();
        f.config.set(keys::EXTERNAL_BINARY, script.display().to_string()).unwrap();

        f.manager.launch(&f.config, &added.id, &[]).unwrap();
        assert!(f.manager.is_running());
        assert_eq!(f.manager.current_id(), Some(added.id.as_str()));

        f.manager.remove_external(&added.id).unwrap();
        assert!(!f.manager.is_running());
        assert!(f.manager.poll().is_none());

        cleanup(f);
    }
}
