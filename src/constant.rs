// Window size constants
pub const DEFAULT_WINDOW_WIDTH: f32 = 1180.0;
pub const DEFAULT_WINDOW_HEIGHT: f32 = 760.0;
pub const DEFAULT_WINDOW_TITLE: &str = "Wallpaper Shell";
pub const DEFAULT_LIBRARY_PANEL_WIDTH: f32 = 280.0;

/// Application name and metadata constants
pub const APP_NAME: &str = "wallpaper-shell";
pub const CONFIG_NAME: &str = "config";

/// Steam Workshop layout
pub const WORKSHOP_APP_ID: &str = "431960";
pub const WORKSHOP_CONTENT_DIR: &str = "steamapps/workshop/content";
pub const ENGINE_INSTALL_DIR: &str = "steamapps/common/wallpaper_engine";
pub const PROJECT_FILE: &str = "project.json";
pub const BACKUP_SUFFIX: &str = ".backup";
pub const EXTERNAL_WALLPAPERS_DIR: &str = "external_wallpapers";
pub const EXTERNAL_TYPE: &str = "External";
pub const EXTERNAL_ID_PREFIX: &str = "ext_";

/// Renderer defaults; flags equal to these are never emitted
pub const DEFAULT_VOLUME: i64 = 15;
pub const DEFAULT_FPS: i64 = 30;
pub const DEFAULT_AUDIO_DEVICE: &str = "default";
pub const DEFAULT_SCALING: &str = "default";
pub const DEFAULT_CLAMPING: &str = "clamp";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Process lifecycle timings, in milliseconds
pub const TERMINATE_TIMEOUT_MS: u64 = 5000;
pub const KILL_TIMEOUT_MS: u64 = 3000;
pub const STARTUP_GRACE_MS: u64 = 250;

/// App related Magic Numbers
pub const MAX_LOG_LINES: usize = 2000;
pub const PREVIEW_SIZE: u32 = 512;
