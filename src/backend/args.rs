//! Renderer argument translation
//!
//! The wallpaper engine and the external media renderer accept different
//! flag names and value encodings. `WallpaperSettings` is the neutral record;
//! `to_args` renders it for one target.

use crate::config::{ConfigStore, overrides};
use crate::constant::{
    DEFAULT_AUDIO_DEVICE, DEFAULT_CLAMPING, DEFAULT_FPS, DEFAULT_LOG_LEVEL, DEFAULT_SCALING,
    DEFAULT_VOLUME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// linux-wallpaperengine style renderer for workshop items
    Engine,
    /// External media renderer for imported image/video/gif files
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallpaperSettings {
    // Audio
    pub silent: bool,
    pub volume: i64,
    pub no_auto_mute: bool,
    pub no_audio_processing: bool,
    pub audio_device: String,

    // Performance
    pub fps: i64,

    // Display
    pub window_geometry: String,
    pub screen_root: String,
    pub custom_screen_root: String,
    pub background_id: String,
    pub scaling: String,
    pub clamping: String,

    // Behaviour
    pub disable_mouse: bool,
    pub disable_parallax: bool,
    pub no_fullscreen_pause: bool,

    // External renderer only
    pub no_loop: bool,
    pub no_hardware_decode: bool,
    pub force_x11: bool,
    pub force_wayland: bool,
    pub verbose: bool,
    pub log_level: String,
    pub mpv_options: String,
}

impl Default for WallpaperSettings {
    fn default() -> Self {
        Self {
            silent: false,
            volume: DEFAULT_VOLUME,
            no_auto_mute: false,
            no_audio_processing: false,
            audio_device: DEFAULT_AUDIO_DEVICE.to_string(),
            fps: DEFAULT_FPS,
            window_geometry: String::new(),
            screen_root: String::new(),
            custom_screen_root: String::new(),
            background_id: String::new(),
            scaling: DEFAULT_SCALING.to_string(),
            clamping: DEFAULT_CLAMPING.to_string(),
            disable_mouse: false,
            disable_parallax: false,
            no_fullscreen_pause: false,
            no_loop: false,
            no_hardware_decode: false,
            force_x11: false,
            force_wayland: false,
            verbose: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            mpv_options: String::new(),
        }
    }
}

impl WallpaperSettings {
    /// Effective settings for a wallpaper: its overrides, then the global
    /// settings, then the built-in defaults
    pub fn resolve(config: &ConfigStore, wallpaper_id: &str) -> Self {
        let id = wallpaper_id;
        Self {
            silent: config.wallpaper_bool(id, overrides::SILENT, config.silent()),
            volume: config.wallpaper_int(id, overrides::MASTER_VOLUME, config.master_volume()),
            no_auto_mute: config.wallpaper_bool(id, overrides::NO_AUTO_MUTE, config.no_auto_mute()),
            no_audio_processing: config.wallpaper_bool(
                id,
                overrides::NO_AUDIO_PROCESSING,
                config.no_audio_processing(),
            ),
            audio_device: config.wallpaper_str(id, overrides::AUDIO_DEVICE, &config.audio_device()),
            fps: config.wallpaper_int(id, overrides::FPS, config.target_fps()),
            window_geometry: config.wallpaper_str(id, overrides::WINDOW_MODE, &config.window_mode()),
            screen_root: config.wallpaper_str(id, overrides::SCREEN_ROOT, &config.screen_root()),
            custom_screen_root: config.wallpaper_str(id, overrides::CUSTOM_SCREEN_ROOT, ""),
            background_id: config.wallpaper_str(id, overrides::BACKGROUND_ID, ""),
            scaling: config.wallpaper_str(id, overrides::SCALING, &config.scaling()),
            clamping: config.wallpaper_str(id, overrides::CLAMPING, &config.clamping()),
            disable_mouse: config.wallpaper_bool(id, overrides::DISABLE_MOUSE, config.disable_mouse()),
            disable_parallax: config.wallpaper_bool(
                id,
                overrides::DISABLE_PARALLAX,
                config.disable_parallax(),
            ),
            no_fullscreen_pause: config.wallpaper_bool(
                id,
                overrides::NO_FULLSCREEN_PAUSE,
                config.no_fullscreen_pause(),
            ),
            no_loop: config.wallpaper_bool(id, overrides::NO_LOOP, false),
            no_hardware_decode: config.wallpaper_bool(id, overrides::NO_HARDWARE_DECODE, false),
            force_x11: config.wallpaper_bool(id, overrides::FORCE_X11, false),
            force_wayland: config.wallpaper_bool(id, overrides::FORCE_WAYLAND, false),
            verbose: config.wallpaper_bool(id, overrides::VERBOSE, false),
            log_level: config.wallpaper_str(id, overrides::LOG_LEVEL, DEFAULT_LOG_LEVEL),
            mpv_options: config.wallpaper_str(id, overrides::MPV_OPTIONS, ""),
        }
    }

    /// Persist every field as a per-wallpaper override
    pub fn store(
        &self,
        config: &mut ConfigStore,
        wallpaper_id: &str,
    ) -> Result<(), crate::config::ConfigError> {
        let id = wallpaper_id;
        config.set_wallpaper_value(id, overrides::SILENT, self.silent)?;
        config.set_wallpaper_value(id, overrides::MASTER_VOLUME, self.volume)?;
        config.set_wallpaper_value(id, overrides::NO_AUTO_MUTE, self.no_auto_mute)?;
        config.set_wallpaper_value(id, overrides::NO_AUDIO_PROCESSING, self.no_audio_processing)?;
        config.set_wallpaper_value(id, overrides::AUDIO_DEVICE, self.audio_device.as_str())?;
        config.set_wallpaper_value(id, overrides::FPS, self.fps)?;
        config.set_wallpaper_value(id, overrides::WINDOW_MODE, self.window_geometry.as_str())?;
        config.set_wallpaper_value(id, overrides::SCREEN_ROOT, self.screen_root.as_str())?;
        config.set_wallpaper_value(
            id,
            overrides::CUSTOM_SCREEN_ROOT,
            self.custom_screen_root.as_str(),
        )?;
        config.set_wallpaper_value(id, overrides::BACKGROUND_ID, self.background_id.as_str())?;
        config.set_wallpaper_value(id, overrides::SCALING, self.scaling.as_str())?;
        config.set_wallpaper_value(id, overrides::CLAMPING, self.clamping.as_str())?;
        config.set_wallpaper_value(id, overrides::DISABLE_MOUSE, self.disable_mouse)?;
        config.set_wallpaper_value(id, overrides::DISABLE_PARALLAX, self.disable_parallax)?;
        config.set_wallpaper_value(id, overrides::NO_FULLSCREEN_PAUSE, self.no_fullscreen_pause)?;
        config.set_wallpaper_value(id, overrides::NO_LOOP, self.no_loop)?;
        config.set_wallpaper_value(id, overrides::NO_HARDWARE_DECODE, self.no_hardware_decode)?;
        config.set_wallpaper_value(id, overrides::FORCE_X11, self.force_x11)?;
        config.set_wallpaper_value(id, overrides::FORCE_WAYLAND, self.force_wayland)?;
        config.set_wallpaper_value(id, overrides::VERBOSE, self.verbose)?;
        config.set_wallpaper_value(id, overrides::LOG_LEVEL, self.log_level.as_str())?;
        config.set_wallpaper_value(id, overrides::MPV_OPTIONS, self.mpv_options.as_str())?;
        Ok(())
    }

    /// The custom screen root wins over the regular one
    pub fn effective_screen(&self) -> &str {
        if self.custom_screen_root.is_empty() {
            &self.screen_root
        } else {
            &self.custom_screen_root
        }
    }

    pub fn to_args(&self, renderer: Renderer) -> Vec<String> {
        match renderer {
            Renderer::Engine => self.engine_args(),
            Renderer::External => self.external_args(),
        }
    }

    fn engine_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        flag(&mut args, self.silent, "--silent");
        if self.volume != DEFAULT_VOLUME {
            option(&mut args, "--volume", &self.volume.to_string());
        }
        flag(&mut args, self.no_auto_mute, "--noautomute");
        flag(&mut args, self.no_audio_processing, "--no-audio-processing");
        if !self.audio_device.is_empty() && self.audio_device != DEFAULT_AUDIO_DEVICE {
            option(&mut args, "--audio-device", &self.audio_device);
        }
        if self.fps != DEFAULT_FPS {
            option(&mut args, "--fps", &self.fps.to_string());
        }
        if !self.effective_screen().is_empty() {
            option(&mut args, "--screen-root", self.effective_screen());
        }
        if !self.window_geometry.is_empty() {
            option(&mut args, "--window", &self.window_geometry);
        }
        if !self.background_id.is_empty() {
            option(&mut args, "--bg", &self.background_id);
        }
        if !self.scaling.is_empty() && self.scaling != DEFAULT_SCALING {
            option(&mut args, "--scaling", &self.scaling);
        }
        if !self.clamping.is_empty() && self.clamping != DEFAULT_CLAMPING {
            option(&mut args, "--clamping", &self.clamping);
        }
        flag(&mut args, self.disable_mouse, "--disable-mouse");
        flag(&mut args, self.disable_parallax, "--disable-parallax");
        flag(&mut args, self.no_fullscreen_pause, "--no-fullscreen-pause");

        args
    }

    fn external_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        flag(&mut args, self.silent, "--silent");
        if self.volume != DEFAULT_VOLUME {
            option(&mut args, "--volume", &volume_to_decimal(self.volume));
        }
        flag(&mut args, self.no_auto_mute, "--noautomute");
        if self.fps != DEFAULT_FPS {
            option(&mut args, "--fps", &self.fps.to_string());
        }
        if !self.effective_screen().is_empty() {
            option(&mut args, "--output", self.effective_screen());
        }
        if !self.scaling.is_empty() && self.scaling != DEFAULT_SCALING {
            option(&mut args, "--scaling", &self.scaling);
        }
        flag(&mut args, self.no_loop, "--no-loop");
        flag(&mut args, self.no_hardware_decode, "--no-hardware-decode");
        flag(&mut args, self.force_x11, "--force-x11");
        flag(&mut args, self.force_wayland, "--force-wayland");
        flag(&mut args, self.verbose, "--verbose");
        if !self.log_level.is_empty() && self.log_level != DEFAULT_LOG_LEVEL {
            option(&mut args, "--log-level", &self.log_level);
        }
        if !self.mpv_options.is_empty() {
            option(&mut args, "--mpv-options", &self.mpv_options);
        }

        args
    }
}

fn flag(args: &mut Vec<String>, enabled: bool, name: &str) {
    if enabled {
        args.push(name.to_string());
    }
}

fn option(args: &mut Vec<String>, name: &str, value: &str) {
    args.push(name.to_string());
    args.push(value.to_string());
}

/// Percent (0-100) to the 0.00-1.00 form the external renderer expects
pub fn volume_to_decimal(percent: i64) -> String {
    format!("{:.2}", percent as f64 / 100.0)
}

/// Rewrite an engine-style argument list for the external renderer.
/// Flags the external renderer doesn't know are dropped together with their value.
pub fn translate_engine_args(args: &[String]) -> Vec<String> {
    const PASS_WITH_VALUE: &[&str] = &["--fps", "--scaling", "--mpv-options", "--log-level"];
    const PASS_FLAG: &[&str] = &["--silent", "--no-loop", "--no-hardware-decode", "--noautomute"];
    const DROP_WITH_VALUE: &[&str] = &[
        "--assets-dir",
        "--audio-device",
        "--window",
        "--bg",
        "--clamping",
        "--set-property",
    ];

    let mut out = Vec::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let arg = arg.as_str();
        match arg {
            "--volume" => {
                if let Some(value) = iter.next()
                    && let Ok(percent) = value.trim().parse::<i64>()
                {
                    option(&mut out, "--volume", &volume_to_decimal(percent));
                }
            }
            "--screen-root" => {
                if let Some(value) = iter.next() {
                    option(&mut out, "--output", value);
                }
            }
            _ if PASS_WITH_VALUE.contains(&arg) => {
                if let Some(value) = iter.next() {
                    option(&mut out, arg, value);
                }
            }
            _ if PASS_FLAG.contains(&arg) => out.push(arg.to_string()),
            _ if DROP_WITH_VALUE.contains(&arg) => {
                if iter.peek().is_some_and(|v| !v.starts_with("--")) {
                    iter.next();
                }
            }
            _ => {}
        }
    }

    out
}
