//! Application configuration store
//!
//! A flat key-value store persisted with `confy`. Keys follow a
//! `category/subkey` convention; per-wallpaper overrides live under
//! `wallpapers/<id>/<key>` and fall back to the matching global setting.
//! Every write is persisted immediately.

use crate::constant::{
    APP_NAME, CONFIG_NAME, DEFAULT_AUDIO_DEVICE, DEFAULT_CLAMPING, DEFAULT_FPS,
    DEFAULT_LIBRARY_PANEL_WIDTH, DEFAULT_SCALING, DEFAULT_VOLUME, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH, ENGINE_INSTALL_DIR, EXTERNAL_WALLPAPERS_DIR, WORKSHOP_APP_ID,
    WORKSHOP_CONTENT_DIR,
};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Confy(#[from] confy::ConfyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Well-known configuration keys
pub mod keys {
    pub const ENGINE_BINARY: &str = "paths/wallpaper_engine_binary";
    pub const ASSETS_DIR: &str = "paths/assets_dir";

    pub const STEAM_PATH: &str = "steam/path";
    pub const STEAM_LIBRARY_PATHS: &str = "steam/library_paths";

    pub const MASTER_VOLUME: &str = "audio/master_volume";
    pub const AUDIO_DEVICE: &str = "audio/device";
    pub const NO_AUTO_MUTE: &str = "audio/no_auto_mute";
    pub const NO_AUDIO_PROCESSING: &str = "audio/no_audio_processing";

    pub const FPS: &str = "performance/fps";

    pub const DISABLE_MOUSE: &str = "behavior/disable_mouse";
    pub const DISABLE_PARALLAX: &str = "behavior/disable_parallax";
    pub const NO_FULLSCREEN_PAUSE: &str = "behavior/no_fullscreen_pause";

    pub const SCALING: &str = "rendering/scaling";
    pub const CLAMPING: &str = "rendering/clamping_mode";
    pub const PRIME_OFFLOAD: &str = "rendering/nvidia_prime_offload";

    pub const WINDOW_MODE: &str = "display/window_mode";
    pub const SCREEN_ROOT: &str = "display/screen_root";

    pub const SILENT: &str = "General/silent";
    pub const FIRST_RUN: &str = "General/first_run";
    pub const LAST_WALLPAPER: &str = "General/last_wallpaper";

    pub const WINDOW_STATE: &str = "ui/window_state";

    pub const EXTERNAL_ENABLED: &str = "wnel/enabled";
    pub const EXTERNAL_BINARY: &str = "wnel/binary_path";
    pub const EXTERNAL_WALLPAPERS_PATH: &str = "wnel/external_wallpapers_path";

    pub const WALLPAPERS_PREFIX: &str = "wallpapers";
}

/// Per-wallpaper override keys, relative to `wallpapers/<id>/`
pub mod overrides {
    pub const SCREEN_ROOT: &str = "screen_root";
    pub const CUSTOM_SCREEN_ROOT: &str = "custom_screen_root";
    pub const AUDIO_DEVICE: &str = "audio_device";
    pub const MASTER_VOLUME: &str = "master_volume";
    pub const NO_AUTO_MUTE: &str = "no_auto_mute";
    pub const NO_AUDIO_PROCESSING: &str = "no_audio_processing";
    pub const WINDOW_MODE: &str = "window_mode";
    pub const SILENT: &str = "silent";
    pub const FPS: &str = "fps";
    pub const BACKGROUND_ID: &str = "background_id";
    pub const SCALING: &str = "scaling";
    pub const CLAMPING: &str = "clamping";
    pub const DISABLE_MOUSE: &str = "disable_mouse";
    pub const DISABLE_PARALLAX: &str = "disable_parallax";
    pub const NO_FULLSCREEN_PAUSE: &str = "no_fullscreen_pause";
    pub const NO_LOOP: &str = "no_loop";
    pub const NO_HARDWARE_DECODE: &str = "no_hardware_decode";
    pub const FORCE_X11: &str = "force_x11";
    pub const FORCE_WAYLAND: &str = "force_wayland";
    pub const VERBOSE: &str = "verbose";
    pub const LOG_LEVEL: &str = "log_level";
    pub const MPV_OPTIONS: &str = "mpv_options";

    pub const ALL: &[&str] = &[
        SCREEN_ROOT,
        CUSTOM_SCREEN_ROOT,
        AUDIO_DEVICE,
        MASTER_VOLUME,
        NO_AUTO_MUTE,
        NO_AUDIO_PROCESSING,
        WINDOW_MODE,
        SILENT,
        FPS,
        BACKGROUND_ID,
        SCALING,
        CLAMPING,
        DISABLE_MOUSE,
        DISABLE_PARALLAX,
        NO_FULLSCREEN_PAUSE,
        NO_LOOP,
        NO_HARDWARE_DECODE,
        FORCE_X11,
        FORCE_WAYLAND,
        VERBOSE,
        LOG_LEVEL,
        MPV_OPTIONS,
    ];
}

/// A single stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            Self::List(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            Self::List(items) => Some(items.clone()),
            Self::Text(s) if s.is_empty() => Some(Vec::new()),
            Self::Text(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// On-disk layout handled by confy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<String, ConfigValue>,
}

/// Persisted main window layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_library_width")]
    pub library_width: f32,
}

fn default_library_width() -> f32 {
    DEFAULT_LIBRARY_PANEL_WIDTH
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            library_width: DEFAULT_LIBRARY_PANEL_WIDTH,
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigStore {
    /// Open the store at the platform configuration location
    pub fn open_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::open(path)
    }

    /// Open the store at `path`, creating an empty one if it doesn't exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file: StoreFile = confy::load_path(&path)?;
        info!("Load config from {:?} ({} keys)", path, file.entries.len());
        Ok(Self {
            path,
            entries: file.entries,
        })
    }

    /// Get the configuration file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(
            APP_NAME,
            Some(CONFIG_NAME),
        )?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), ConfigError> {
        let file = StoreFile {
            entries: self.entries.clone(),
        };
        confy::store_path(&self.path, file)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Generic access
    // ------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let value = value.into();
        debug!(key, ?value, "Set config value");
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.entries.clear();
        info!("Reset configuration to defaults");
        self.persist()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(ConfigValue::as_bool).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(ConfigValue::as_int).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(ConfigValue::as_float).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(ConfigValue::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).and_then(ConfigValue::as_list).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Per-wallpaper scope
    // ------------------------------------------------------------------

    pub fn wallpaper_key(wallpaper_id: &str, key: &str) -> String {
        format!("{}/{}/{}", keys::WALLPAPERS_PREFIX, wallpaper_id, key)
    }

    pub fn wallpaper_value(&self, wallpaper_id: &str, key: &str) -> Option<&ConfigValue> {
        self.get(&Self::wallpaper_key(wallpaper_id, key))
    }

    pub fn set_wallpaper_value(
        &mut self,
        wallpaper_id: &str,
        key: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigError> {
        self.set(&Self::wallpaper_key(wallpaper_id, key), value)
    }

    /// All override values stored for a wallpaper, keyed by override name
    pub fn wallpaper_overrides(&self, wallpaper_id: &str) -> BTreeMap<String, ConfigValue> {
        overrides::ALL
            .iter()
            .filter_map(|key| {
                self.wallpaper_value(wallpaper_id, key)
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect()
    }

    pub fn clear_wallpaper_overrides(&mut self, wallpaper_id: &str) -> Result<(), ConfigError> {
        let prefix = format!("{}/{}/", keys::WALLPAPERS_PREFIX, wallpaper_id);
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        if self.entries.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    pub fn wallpaper_bool(&self, wallpaper_id: &str, key: &str, global: bool) -> bool {
        self.wallpaper_value(wallpaper_id, key)
            .and_then(ConfigValue::as_bool)
            .unwrap_or(global)
    }

    pub fn wallpaper_int(&self, wallpaper_id: &str, key: &str, global: i64) -> i64 {
        self.wallpaper_value(wallpaper_id, key)
            .and_then(ConfigValue::as_int)
            .unwrap_or(global)
    }

    pub fn wallpaper_str(&self, wallpaper_id: &str, key: &str, global: &str) -> String {
        self.wallpaper_value(wallpaper_id, key)
            .and_then(ConfigValue::as_str)
            .unwrap_or(global)
            .to_string()
    }

    // ------------------------------------------------------------------
    // Global settings
    // ------------------------------------------------------------------

    pub fn engine_binary(&self) -> String {
        self.get_str(keys::ENGINE_BINARY, "")
    }

    pub fn set_engine_binary(&mut self, path: &str) -> Result<(), ConfigError> {
        self.set(keys::ENGINE_BINARY, path)
    }

    pub fn assets_dir(&self) -> String {
        self.get_str(keys::ASSETS_DIR, "")
    }

    pub fn set_assets_dir(&mut self, dir: &str) -> Result<(), ConfigError> {
        self.set(keys::ASSETS_DIR, dir)
    }

    pub fn steam_path(&self) -> String {
        self.get_str(keys::STEAM_PATH, "")
    }

    pub fn set_steam_path(&mut self, path: &str) -> Result<(), ConfigError> {
        self.set(keys::STEAM_PATH, path)
    }

    pub fn steam_library_paths(&self) -> Vec<String> {
        self.get_list(keys::STEAM_LIBRARY_PATHS)
    }

    pub fn set_steam_library_paths(&mut self, paths: Vec<String>) -> Result<(), ConfigError> {
        self.set(keys::STEAM_LIBRARY_PATHS, paths)
    }

    pub fn master_volume(&self) -> i64 {
        self.get_int(keys::MASTER_VOLUME, DEFAULT_VOLUME)
    }

    pub fn audio_device(&self) -> String {
        self.get_str(keys::AUDIO_DEVICE, DEFAULT_AUDIO_DEVICE)
    }

    pub fn no_auto_mute(&self) -> bool {
        self.get_bool(keys::NO_AUTO_MUTE, false)
    }

    pub fn no_audio_processing(&self) -> bool {
        self.get_bool(keys::NO_AUDIO_PROCESSING, false)
    }

    pub fn target_fps(&self) -> i64 {
        self.get_int(keys::FPS, DEFAULT_FPS)
    }

    pub fn screen_root(&self) -> String {
        self.get_str(keys::SCREEN_ROOT, "")
    }

    pub fn window_mode(&self) -> String {
        self.get_str(keys::WINDOW_MODE, "")
    }

    pub fn scaling(&self) -> String {
        self.get_str(keys::SCALING, DEFAULT_SCALING)
    }

    pub fn clamping(&self) -> String {
        self.get_str(keys::CLAMPING, DEFAULT_CLAMPING)
    }

    pub fn silent(&self) -> bool {
        self.get_bool(keys::SILENT, false)
    }

    pub fn disable_mouse(&self) -> bool {
        self.get_bool(keys::DISABLE_MOUSE, false)
    }

    pub fn disable_parallax(&self) -> bool {
        self.get_bool(keys::DISABLE_PARALLAX, false)
    }

    pub fn no_fullscreen_pause(&self) -> bool {
        self.get_bool(keys::NO_FULLSCREEN_PAUSE, false)
    }

    pub fn prime_offload(&self) -> bool {
        self.get_bool(keys::PRIME_OFFLOAD, true)
    }

    pub fn is_first_run(&self) -> bool {
        self.get_bool(keys::FIRST_RUN, true)
    }

    pub fn last_selected_wallpaper(&self) -> String {
        self.get_str(keys::LAST_WALLPAPER, "")
    }

    pub fn set_last_selected_wallpaper(&mut self, wallpaper_id: &str) -> Result<(), ConfigError> {
        self.set(keys::LAST_WALLPAPER, wallpaper_id)
    }

    pub fn external_enabled(&self) -> bool {
        self.get_bool(keys::EXTERNAL_ENABLED, false)
    }

    pub fn external_binary(&self) -> String {
        self.get_str(keys::EXTERNAL_BINARY, "")
    }

    pub fn set_external_enabled(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.set(keys::EXTERNAL_ENABLED, enabled)
    }

    pub fn set_external_binary(&mut self, path: &str) -> Result<(), ConfigError> {
        self.set(keys::EXTERNAL_BINARY, path)
    }

    pub fn set_external_wallpapers_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.set(keys::EXTERNAL_WALLPAPERS_PATH, path.display().to_string())
    }

    pub fn external_wallpapers_path(&self) -> PathBuf {
        match self.get(keys::EXTERNAL_WALLPAPERS_PATH).and_then(ConfigValue::as_str) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_external_wallpapers_path(),
        }
    }

    pub fn window_state(&self) -> WindowState {
        self.get(keys::WINDOW_STATE)
            .and_then(ConfigValue::as_str)
            .and_then(|blob| serde_json::from_str(blob).ok())
            .unwrap_or_default()
    }

    pub fn set_window_state(&mut self, state: &WindowState) -> Result<(), ConfigError> {
        let blob = serde_json::to_string(state)?;
        self.set(keys::WINDOW_STATE, blob)
    }

    // ------------------------------------------------------------------
    // Derived paths and validation
    // ------------------------------------------------------------------

    /// Library roots to look in, falling back to the Steam path itself
    fn library_roots(&self) -> Vec<PathBuf> {
        let mut libraries: Vec<PathBuf> = self
            .steam_library_paths()
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        if libraries.is_empty() {
            let steam = self.steam_path();
            if !steam.is_empty() {
                libraries.push(PathBuf::from(steam));
            }
        }
        libraries
    }

    /// Existing workshop content directories for the wallpaper engine app
    pub fn workshop_roots(&self) -> Vec<PathBuf> {
        self.library_roots()
            .into_iter()
            .map(|lib| lib.join(WORKSHOP_CONTENT_DIR).join(WORKSHOP_APP_ID))
            .filter(|p| p.is_dir())
            .collect()
    }

    /// Plausible `--assets-dir` values; directories with shaders come first
    pub fn candidate_assets_dirs(&self) -> Vec<PathBuf> {
        let mut with_shaders = Vec::new();
        let mut others = Vec::new();

        for lib in self.library_roots() {
            let install = lib.join(ENGINE_INSTALL_DIR);
            for candidate in [
                install.clone(),
                install.join("assets"),
                install.join("bin").join("assets"),
            ] {
                if !candidate.is_dir() {
                    continue;
                }
                if candidate.join("shaders").is_dir() {
                    with_shaders.push(candidate);
                } else {
                    others.push(candidate);
                }
            }
        }

        let mut result: Vec<PathBuf> = Vec::new();
        for path in with_shaders.into_iter().chain(others) {
            if !result.contains(&path) {
                result.push(path);
            }
        }
        result
    }

    pub fn configuration_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let steam = self.steam_path();
        let has_steam_path = !steam.is_empty() && Path::new(&steam).is_dir();
        let has_valid_library = self
            .steam_library_paths()
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| Path::new(p).join(ENGINE_INSTALL_DIR).is_dir());

        if !has_steam_path && !has_valid_library {
            issues.push("No valid Steam installation or library paths configured".to_string());
        }

        let engine = self.engine_binary();
        if !engine.is_empty() && !Path::new(&engine).exists() {
            issues.push(
                "Wallpaper Engine binary path is configured but file doesn't exist".to_string(),
            );
        }

        issues
    }
}

pub fn default_external_wallpapers_path() -> PathBuf {
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(EXTERNAL_WALLPAPERS_DIR),
        None => PathBuf::from(EXTERNAL_WALLPAPERS_DIR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn setup_test_store() -> (ConfigStore, PathBuf) {
        let test_dir = std::env::temp_dir().join(format!("test_config_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        let store = ConfigStore::open(test_dir.join("config.toml")).unwrap();
        (store, test_dir)
    }

    fn cleanup_test_dir(test_dir: &Path) {
        let _ = fs::remove_dir_all(test_dir);
    }

    #[test]
    fn test_set_then_get_returns_same_value() {
        let (mut store, test_dir) = setup_test_store();

        store.set("audio/master_volume", 42).unwrap();
        store.set("display/screen_root", "HDMI-A-1").unwrap();
        store.set("General/silent", true).unwrap();
        store
            .set(
                keys::STEAM_LIBRARY_PATHS,
                vec!["/games/steam".to_string(), "/mnt/lib".to_string()],
            )
            .unwrap();

        assert_eq!(store.get("audio/master_volume"), Some(&ConfigValue::Int(42)));
        assert_eq!(store.screen_root(), "HDMI-A-1");
        assert!(store.silent());
        assert_eq!(
            store.steam_library_paths(),
            vec!["/games/steam".to_string(), "/mnt/lib".to_string()]
        );

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_values_survive_reopen() {
        let (mut store, test_dir) = setup_test_store();
        let path = store.path().to_path_buf();

        store.set(keys::FPS, 60).unwrap();
        store.set(keys::ENGINE_BINARY, "/usr/bin/linux-wallpaperengine").unwrap();
        store.set_wallpaper_value("123456", overrides::SILENT, true).unwrap();
        store.set("rendering/scale_factor", 1.5).unwrap();

        let reopened = ConfigStore::open(&path).unwrap();
        assert_eq!(reopened.target_fps(), 60);
        assert_eq!(reopened.engine_binary(), "/usr/bin/linux-wallpaperengine");
        assert!(reopened.wallpaper_bool("123456", overrides::SILENT, false));
        assert_eq!(reopened.get_float("rendering/scale_factor", 0.0), 1.5);

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let (store, test_dir) = setup_test_store();

        assert_eq!(store.master_volume(), 15);
        assert_eq!(store.audio_device(), "default");
        assert_eq!(store.target_fps(), 30);
        assert_eq!(store.scaling(), "default");
        assert_eq!(store.clamping(), "clamp");
        assert!(store.is_first_run());
        assert!(store.prime_offload());
        assert!(!store.external_enabled());
        assert!(store.steam_library_paths().is_empty());
        assert!(
            store
                .external_wallpapers_path()
                .ends_with(EXTERNAL_WALLPAPERS_DIR)
        );

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_external_wallpapers_path_defaults_to_home() {
        let (mut store, test_dir) = setup_test_store();

        let expected = match BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(EXTERNAL_WALLPAPERS_DIR),
            None => PathBuf::from(EXTERNAL_WALLPAPERS_DIR),
        };
        assert_eq!(store.external_wallpapers_path(), expected);

        store.set(keys::EXTERNAL_WALLPAPERS_PATH, "").unwrap();
        assert_eq!(store.external_wallpapers_path(), expected);

        store.set_external_wallpapers_path(&test_dir.join("media")).unwrap();
        assert_eq!(store.external_wallpapers_path(), test_dir.join("media"));

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_wallpaper_override_falls_back_to_global() {
        let (mut store, test_dir) = setup_test_store();

        store.set(keys::MASTER_VOLUME, 40).unwrap();
        assert_eq!(
            store.wallpaper_int("111", overrides::MASTER_VOLUME, store.master_volume()),
            40
        );

        store
            .set_wallpaper_value("111", overrides::MASTER_VOLUME, 80)
            .unwrap();
        assert_eq!(
            store.wallpaper_int("111", overrides::MASTER_VOLUME, store.master_volume()),
            80
        );
        // Other wallpapers are unaffected
        assert_eq!(
            store.wallpaper_int("222", overrides::MASTER_VOLUME, store.master_volume()),
            40
        );
        assert_eq!(
            ConfigStore::wallpaper_key("111", "master_volume"),
            "wallpapers/111/master_volume"
        );

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_wallpaper_overrides_and_clear() {
        let (mut store, test_dir) = setup_test_store();

        store.set_wallpaper_value("abc", overrides::FPS, 24).unwrap();
        store
            .set_wallpaper_value("abc", overrides::SCREEN_ROOT, "DP-1")
            .unwrap();
        store.set_wallpaper_value("abcd", overrides::FPS, 12).unwrap();

        let overrides = store.wallpaper_overrides("abc");
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("fps"), Some(&ConfigValue::Int(24)));

        store.clear_wallpaper_overrides("abc").unwrap();
        assert!(store.wallpaper_overrides("abc").is_empty());
        // Prefix match must not leak into similarly named ids
        assert_eq!(store.wallpaper_overrides("abcd").len(), 1);

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_remove_and_reset() {
        let (mut store, test_dir) = setup_test_store();

        store.set(keys::SILENT, true).unwrap();
        store.set(keys::FPS, 15).unwrap();
        store.remove(keys::SILENT).unwrap();
        assert!(!store.contains(keys::SILENT));
        assert!(store.contains(keys::FPS));

        store.reset_to_defaults().unwrap();
        assert!(!store.contains(keys::FPS));
        let reopened = ConfigStore::open(store.path()).unwrap();
        assert_eq!(reopened.target_fps(), 30);

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(ConfigValue::Text("true".into()).as_bool(), Some(true));
        assert_eq!(ConfigValue::Int(0).as_bool(), Some(false));
        assert_eq!(ConfigValue::Text(" 25 ".into()).as_int(), Some(25));
        assert_eq!(ConfigValue::Float(29.9).as_int(), Some(29));
        assert_eq!(ConfigValue::Int(3).as_float(), Some(3.0));
        assert_eq!(ConfigValue::Bool(true).as_str(), None);
        assert_eq!(
            ConfigValue::Text("/one".into()).as_list(),
            Some(vec!["/one".to_string()])
        );
    }

    #[test]
    fn test_window_state_blob() {
        let (mut store, test_dir) = setup_test_store();

        assert_eq!(store.window_state(), WindowState::default());

        let state = WindowState {
            width: 1024.0,
            height: 640.0,
            library_width: 300.0,
        };
        store.set_window_state(&state).unwrap();
        assert_eq!(store.window_state(), state);

        // A corrupt blob falls back to defaults
        store.set(keys::WINDOW_STATE, "{not json").unwrap();
        assert_eq!(store.window_state(), WindowState::default());

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_workshop_roots_and_issues() {
        let (mut store, test_dir) = setup_test_store();

        let issues = store.configuration_issues();
        assert_eq!(issues.len(), 1);

        let library = test_dir.join("library");
        let workshop = library
            .join(WORKSHOP_CONTENT_DIR)
            .join(WORKSHOP_APP_ID);
        fs::create_dir_all(&workshop).unwrap();
        fs::create_dir_all(library.join(ENGINE_INSTALL_DIR).join("assets").join("shaders"))
            .unwrap();

        store
            .set_steam_library_paths(vec![library.to_string_lossy().to_string()])
            .unwrap();
        store.set_engine_binary("/does/not/exist").unwrap();

        assert_eq!(store.workshop_roots(), vec![workshop]);

        let candidates = store.candidate_assets_dirs();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], library.join(ENGINE_INSTALL_DIR).join("assets"));

        let issues = store.configuration_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("binary"));

        cleanup_test_dir(&test_dir);
    }
}
