use crate::backend::probe::MediaProbe;
use crate::backend::workshop::WallpaperInfo;
use crate::constant::{EXTERNAL_ID_PREFIX, EXTERNAL_TYPE, PREVIEW_SIZE, PROJECT_FILE};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Media file does not exist: {}", .0.display())]
    MediaMissing(PathBuf),

    #[error("External wallpaper not found: {0}")]
    NotFound(String),

    #[error("Media entry escapes the item directory: {0}")]
    InvalidMediaPath(String),
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "webm", "m4v"];
const PREVIEW_FILE: &str = "preview.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Gif,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MediaType {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else if ext == "gif" {
            Self::Gif
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Gif => "gif",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the media file itself can serve as the preview
    fn is_still(&self) -> bool {
        matches!(self, Self::Image | Self::Gif)
    }
}

/// File formats offered by the import dialog
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions = IMAGE_EXTENSIONS.to_vec();
    extensions.extend_from_slice(VIDEO_EXTENSIONS);
    extensions.push("gif");
    extensions
}

/// On-disk descriptor of an imported media file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExternalDescriptor {
    #[serde(default)]
    external: bool,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    media_type: MediaType,
    #[serde(default)]
    file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
    #[serde(rename = "originalPath", default)]
    original_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalWallpaperInfo {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    pub original_path: PathBuf,
    pub symlink_path: PathBuf,
    pub preview_path: Option<PathBuf>,
    pub project_path: PathBuf,
    pub codec: Option<String>,
    pub resolution: Option<(u32, u32)>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub file_size: u64,
}

impl ExternalWallpaperInfo {
    pub fn resolution_label(&self) -> Option<String> {
        self.resolution.map(|(w, h)| format!("{}x{}", w, h))
    }

    pub fn to_wallpaper_info(&self) -> WallpaperInfo {
        let mut properties = Map::new();
        properties.insert("external".to_string(), Value::Bool(true));
        properties.insert(
            "originalPath".to_string(),
            Value::String(self.original_path.display().to_string()),
        );
        properties.insert(
            "mediaType".to_string(),
            Value::String(self.media_type.as_str().to_string()),
        );
        if let Some(codec) = &self.codec {
            properties.insert("codec".to_string(), Value::String(codec.clone()));
        }
        if let Some(resolution) = self.resolution_label() {
            properties.insert("resolution".to_string(), Value::String(resolution));
        }

        WallpaperInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: format!("External {} wallpaper", self.media_type.as_str()),
            author: "Custom".to_string(),
            wallpaper_type: EXTERNAL_TYPE.to_string(),
            path: self.symlink_path.clone(),
            preview_path: self.preview_path.clone(),
            project_path: self.project_path.clone(),
            created: self.created,
            updated: self.updated,
            file_size: self.file_size,
            tags: vec!["external".to_string(), self.media_type.as_str().to_string()],
            properties,
        }
    }

    fn descriptor(&self) -> ExternalDescriptor {
        let timestamp = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or_default();
        ExternalDescriptor {
            external: true,
            title: self.name.clone(),
            media_type: self.media_type,
            file: self
                .symlink_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            codec: self.codec.clone(),
            width: self.resolution.map(|(w, _)| w),
            height: self.resolution.map(|(_, h)| h),
            created: timestamp(self.created),
            updated: timestamp(self.updated),
            original_path: self.original_path.display().to_string(),
        }
    }
}

/// Imported media files, one directory per item under `root`
pub struct ExternalLibrary {
    root: PathBuf,
    probe: Box<dyn MediaProbe>,
    items: Vec<ExternalWallpaperInfo>,
}

impl ExternalLibrary {
    pub fn new(root: PathBuf, probe: Box<dyn MediaProbe>) -> Self {
        Self {
            root,
            probe,
            items: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn set_root(&mut self, root: PathBuf) {
        if self.root != root {
            self.root = root;
            self.items.clear();
        }
    }

    pub fn ensure_root(&self) -> Result<(), ExternalError> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root)?;
            debug!("Created external wallpapers directory: {}", self.root.display());
        }
        Ok(())
    }

    /// Re-read every item descriptor under the root
    pub fn refresh(&mut self) -> Result<usize, ExternalError> {
        self.items.clear();
        if !self.root.is_dir() {
            return Ok(0);
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let project_path = dir.join(PROJECT_FILE);
            if !project_path.is_file() {
                continue;
            }
            match load_item(&project_path) {
                Ok(Some(item)) => self.items.push(item),
                Ok(None) => debug!("Not an external descriptor: {}", project_path.display()),
                Err(e) => warn!("Skipping {}: {}", project_path.display(), e),
            }
        }

        debug!("Refreshed external wallpapers, found: {}", self.items.len());
        Ok(self.items.len())
    }

    /// Import `media_path`, returning the new item
    pub fn add(
        &mut self,
        media_path: &Path,
        name: Option<&str>,
    ) -> Result<ExternalWallpaperInfo, ExternalError> {
        if !media_path.is_file() {
            return Err(ExternalError::MediaMissing(media_path.to_path_buf()));
        }
        self.ensure_root()?;

        let original_path = fs::canonicalize(media_path)?;
        let id = self.allocate_id();
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir)?;

        match self.populate(&id, &dir, &original_path, name) {
            Ok(item) => {
                info!(id = %item.id, name = %item.name, "Added external wallpaper");
                self.items.push(item.clone());
                Ok(item)
            }
            Err(e) => {
                warn!("Failed to import {}: {}", media_path.display(), e);
                let _ = fs::remove_dir_all(&dir);
                Err(e)
            }
        }
    }

    fn populate(
        &self,
        id: &str,
        dir: &Path,
        original_path: &Path,
        name: Option<&str>,
    ) -> Result<ExternalWallpaperInfo, ExternalError> {
        let media_type = MediaType::from_path(original_path);
        let extension = original_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let symlink_path = if extension.is_empty() {
            dir.join("media")
        } else {
            dir.join(format!("media.{}", extension))
        };
        create_symlink(original_path, &symlink_path)?;

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                original_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| id.to_string())
            });

        let codec = match media_type {
            MediaType::Video => self.probe.video_codec(original_path),
            _ => None,
        };

        let preview_path = if media_type.is_still() {
            Some(symlink_path.clone())
        } else if media_type == MediaType::Video {
            let preview = dir.join(PREVIEW_FILE);
            self.probe
                .render_preview(original_path, &preview, PREVIEW_SIZE)
                .then_some(preview)
        } else {
            None
        };
        if preview_path.is_none() {
            warn!("No preview for external wallpaper {}", id);
        }

        let now = Utc::now();
        let item = ExternalWallpaperInfo {
            id: id.to_string(),
            name,
            media_type,
            original_path: original_path.to_path_buf(),
            symlink_path,
            preview_path,
            project_path: dir.join(PROJECT_FILE),
            codec,
            resolution: self.probe.resolution(original_path, media_type),
            created: Some(now),
            updated: Some(now),
            file_size: fs::metadata(original_path)?.len(),
        };
        write_descriptor(&item)?;
        Ok(item)
    }

    fn allocate_id(&self) -> String {
        loop {
            let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
            let id = format!("{}{}", EXTERNAL_ID_PREFIX, suffix);
            if !self.root.join(&id).exists() && !self.contains(&id) {
                return id;
            }
        }
    }

    /// Delete an item and its directory; the source media is untouched
    pub fn remove(&mut self, id: &str) -> Result<(), ExternalError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| ExternalError::NotFound(id.to_string()))?;

        let dir = self.root.join(id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        self.items.remove(index);
        info!(%id, "Removed external wallpaper");
        Ok(())
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), ExternalError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| ExternalError::NotFound(id.to_string()))?;
        item.name = name.trim().to_string();
        item.updated = Some(Utc::now());
        write_descriptor(item)?;
        debug!(%id, "External wallpaper renamed to {}", item.name);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ExternalWallpaperInfo> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn all(&self) -> &[ExternalWallpaperInfo] {
        &self.items
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }
}

fn write_descriptor(item: &ExternalWallpaperInfo) -> Result<(), ExternalError> {
    let content = serde_json::to_string_pretty(&item.descriptor())?;
    fs::write(&item.project_path, content)?;
    Ok(())
}

/// A media entry names a file inside the item directory
fn is_item_relative(file: &str) -> bool {
    !file.is_empty()
        && Path::new(file)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn load_item(project_path: &Path) -> Result<Option<ExternalWallpaperInfo>, ExternalError> {
    let content = fs::read_to_string(project_path)?;
    let descriptor: ExternalDescriptor = serde_json::from_str(&content)?;
    if !descriptor.external {
        return Ok(None);
    }

    let dir = project_path.parent().unwrap_or(Path::new("."));
    let id = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !is_item_relative(&descriptor.file) {
        return Err(ExternalError::InvalidMediaPath(descriptor.file));
    }
    let symlink_path = dir.join(&descriptor.file);

    let preview = dir.join(PREVIEW_FILE);
    let preview_path = if preview.is_file() {
        Some(preview)
    } else if descriptor.media_type.is_still() {
        Some(symlink_path.clone())
    } else {
        None
    };

    let file_size = fs::metadata(&symlink_path).map(|m| m.len()).unwrap_or(0);

    Ok(Some(ExternalWallpaperInfo {
        id,
        name: descriptor.title,
        media_type: descriptor.media_type,
        original_path: PathBuf::from(descriptor.original_path),
        symlink_path,
        preview_path,
        project_path: project_path.to_path_buf(),
        codec: descriptor.codec.filter(|c| !c.is_empty()),
        resolution: descriptor.width.zip(descriptor.height),
        created: parse_timestamp(&descriptor.created),
        updated: parse_timestamp(&descriptor.updated),
        file_size,
    }))
}

/// Accepts RFC 3339 and zone-less ISO-8601 (read as UTC)
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|t| t.and_utc())
        })
}

fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct StubProbe {
        previews: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl MediaProbe for StubProbe {
        fn resolution(&self, _path: &Path, media_type: MediaType) -> Option<(u32, u32)> {
            match media_type {
                MediaType::Unknown => None,
                _ => Some((1920, 1080)),
            }
        }

        fn video_codec(&self, _path: &Path) -> Option<String> {
            Some("h264".to_string())
        }

        fn render_preview(&self, _video: &Path, output: &Path, _size: u32) -> bool {
            self.previews.lock().unwrap().push(output.to_path_buf());
            fs::write(output, b"png").is_ok()
        }
    }

    fn setup_test_dir() -> PathBuf {
        let test_dir = std::env::temp_dir().join(format!("test_external_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        test_dir
    }

    fn cleanup_test_dir(path: &Path) {
        let _ = fs::remove_dir_all(path);
    }

    fn library(test_dir: &Path) -> (ExternalLibrary, StubProbe) {
        let probe = StubProbe::default();
        let library = ExternalLibrary::new(test_dir.join("library"), Box::new(probe.clone()));
        (library, probe)
    }

    #[test]
    fn test_media_type_detection() {
        assert_eq!(MediaType::from_path(Path::new("a.PNG")), MediaType::Image);
        assert_eq!(MediaType::from_path(Path::new("a.webm")), MediaType::Video);
        assert_eq!(MediaType::from_path(Path::new("a.gif")), MediaType::Gif);
        assert_eq!(MediaType::from_path(Path::new("a.txt")), MediaType::Unknown);
        assert_eq!(MediaType::from_path(Path::new("noext")), MediaType::Unknown);
    }

    #[test]
    fn test_add_image_creates_item() {
        let test_dir = setup_test_dir();
        let media = test_dir.join("sunset.jpg");
        fs::write(&media, b"jpegdata").unwrap();
        let (mut library, probe) = library(&test_dir);

        let item = library.add(&media, None).unwrap();
        assert!(item.id.starts_with(EXTERNAL_ID_PREFIX));
        assert_eq!(item.id.len(), EXTERNAL_ID_PREFIX.len() + 6);
        assert_eq!(item.name, "sunset");
        assert_eq!(item.media_type, MediaType::Image);
        assert_eq!(item.codec, None);
        assert_eq!(item.resolution, Some((1920, 1080)));
        assert_eq!(item.file_size, 8);

        let dir = library.root().join(&item.id);
        assert_eq!(item.symlink_path, dir.join("media.jpg"));
        assert_eq!(
            fs::read_link(&item.symlink_path).unwrap(),
            fs::canonicalize(&media).unwrap()
        );
        assert_eq!(item.preview_path, Some(item.symlink_path.clone()));
        assert!(probe.previews.lock().unwrap().is_empty());

        let descriptor: Value =
            serde_json::from_str(&fs::read_to_string(&item.project_path).unwrap()).unwrap();
        assert_eq!(descriptor["external"], Value::Bool(true));
        assert_eq!(descriptor["title"], "sunset");
        assert_eq!(descriptor["type"], "image");
        assert_eq!(descriptor["file"], "media.jpg");
        assert_eq!(descriptor["width"], 1920);
        assert_eq!(descriptor["height"], 1080);
        assert!(descriptor.get("codec").is_none());
        assert!(library.contains(&item.id));

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_add_video_uses_probe() {
        let test_dir = setup_test_dir();
        let media = test_dir.join("clip.mp4");
        fs::write(&media, b"video").unwrap();
        let (mut library, probe) = library(&test_dir);

        let item = library.add(&media, Some("  Rain  ")).unwrap();
        let preview = library.root().join(&item.id).join(PREVIEW_FILE);
        assert_eq!(item.name, "Rain");
        assert_eq!(item.codec.as_deref(), Some("h264"));
        assert_eq!(item.preview_path, Some(preview.clone()));
        assert_eq!(*probe.previews.lock().unwrap(), vec![preview]);

        let info = item.to_wallpaper_info();
        assert_eq!(info.author, "Custom");
        assert_eq!(info.wallpaper_type, EXTERNAL_TYPE);
        assert_eq!(info.description, "External video wallpaper");
        assert_eq!(info.tags, vec!["external", "video"]);
        assert_eq!(info.path, item.symlink_path);
        assert_eq!(info.properties["codec"], "h264");
        assert_eq!(info.properties["resolution"], "1920x1080");
        assert_eq!(info.properties["mediaType"], "video");
        assert_eq!(info.properties["external"], true);

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_add_missing_media_fails() {
        let test_dir = setup_test_dir();
        let (mut library, _) = library(&test_dir);

        let result = library.add(&test_dir.join("nope.png"), None);
        assert!(matches!(result, Err(ExternalError::MediaMissing(_))));
        assert!(library.all().is_empty());

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_refresh_reads_descriptors() {
        let test_dir = setup_test_dir();
        let media = test_dir.join("loop.gif");
        fs::write(&media, b"GIF89a").unwrap();
        let (mut library, _) = library(&test_dir);
        let added = library.add(&media, Some("Loop")).unwrap();

        // Foreign descriptors and stray directories are ignored
        let foreign = library.root().join("123");
        fs::create_dir_all(&foreign).unwrap();
        fs::write(foreign.join(PROJECT_FILE), r#"{"title":"workshop"}"#).unwrap();
        fs::create_dir_all(library.root().join("empty")).unwrap();

        let (mut reopened, _) = self::library(&test_dir);
        assert_eq!(reopened.refresh().unwrap(), 1);
        let item = reopened.get(&added.id).unwrap();
        assert_eq!(item.name, "Loop");
        assert_eq!(item.media_type, MediaType::Gif);
        assert_eq!(item.symlink_path, added.symlink_path);
        assert_eq!(item.preview_path, Some(added.symlink_path.clone()));
        assert_eq!(item.file_size, 6);
        assert_eq!(item.resolution, Some((1920, 1080)));
        assert!(item.created.is_some());

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_refresh_skips_media_outside_item_dir() {
        let test_dir = setup_test_dir();
        let (mut library, _) = library(&test_dir);
        fs::write(test_dir.join("secret.png"), b"png").unwrap();

        for (id, file) in [
            ("ext_aaaaaa", "../../secret.png"),
            ("ext_bbbbbb", "/etc/passwd"),
            ("ext_cccccc", ""),
        ] {
            let dir = library.root().join(id);
            fs::create_dir_all(&dir).unwrap();
            let descriptor = serde_json::json!({
                "external": true,
                "title": id,
                "type": "image",
                "file": file,
            });
            fs::write(dir.join(PROJECT_FILE), descriptor.to_string()).unwrap();
        }
        let ok = library.root().join("ext_dddddd");
        fs::create_dir_all(&ok).unwrap();
        fs::write(
            ok.join(PROJECT_FILE),
            r#"{"external":true,"title":"ok","type":"image","file":"media.png"}"#,
        )
        .unwrap();

        assert_eq!(library.refresh().unwrap(), 1);
        assert!(library.contains("ext_dddddd"));
        assert!(!library.contains("ext_aaaaaa"));
        assert!(!library.contains("ext_bbbbbb"));
        assert!(!library.contains("ext_cccccc"));

        assert!(is_item_relative("media.mp4"));
        assert!(is_item_relative("./media.mp4"));
        assert!(!is_item_relative("sub/../../x"));

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_remove_and_rename() {
        let test_dir = setup_test_dir();
        let media = test_dir.join("still.png");
        fs::write(&media, b"png").unwrap();
        let (mut library, _) = library(&test_dir);
        let item = library.add(&media, None).unwrap();

        library.rename(&item.id, "Renamed").unwrap();
        let (mut reopened, _) = self::library(&test_dir);
        reopened.refresh().unwrap();
        assert_eq!(reopened.get(&item.id).unwrap().name, "Renamed");

        library.remove(&item.id).unwrap();
        assert!(!library.contains(&item.id));
        assert!(!library.root().join(&item.id).exists());
        assert!(media.exists());
        assert!(matches!(
            library.remove(&item.id),
            Err(ExternalError::NotFound(_))
        ));

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T10:20:30Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:20:30+02:00").is_some());
        assert_eq!(
            parse_timestamp("2024-05-01T10:20:30").map(|t| t.to_rfc3339()),
            Some("2024-05-01T10:20:30+00:00".to_string())
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
