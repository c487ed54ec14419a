use crate::constant::{PROJECT_FILE, WORKSHOP_APP_ID};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid descriptor: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No project.json in {}", .0.display())]
    MissingDescriptor(PathBuf),

    #[error("Descriptor is not a JSON object: {}", .0.display())]
    NotAnObject(PathBuf),
}

/// One entry of the library, either a workshop item or an imported media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WallpaperInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub wallpaper_type: String,
    pub path: PathBuf,
    pub preview_path: Option<PathBuf>,
    pub project_path: PathBuf,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub file_size: u64,
    pub tags: Vec<String>,
    pub properties: Map<String, Value>,
}

impl WallpaperInfo {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.id.contains(&query)
            || self.wallpaper_type.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

const PREVIEW_STEMS: &[&str] = &["preview", "thumb", "thumbnail"];
const PREVIEW_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Scan every root's immediate subdirectories for wallpapers.
///
/// `progress(done, total)` is called once per visited directory. Roots that
/// do not exist are skipped, broken items are logged and left out.
pub fn scan<F>(roots: &[PathBuf], mut progress: F) -> Vec<WallpaperInfo>
where
    F: FnMut(usize, usize),
{
    let mut candidates = Vec::new();
    for root in roots {
        match list_subdirectories(root) {
            Ok(dirs) => candidates.extend(dirs),
            Err(e) => debug!("Skipping workshop root {}: {}", root.display(), e),
        }
    }

    let total = candidates.len();
    let mut wallpapers = Vec::new();
    for (index, dir) in candidates.iter().enumerate() {
        if dir.join(PROJECT_FILE).is_file() {
            match load_wallpaper(dir) {
                Ok(wallpaper) => wallpapers.push(wallpaper),
                Err(e) => warn!("Skipping {}: {}", dir.display(), e),
            }
        }
        progress(index + 1, total);
    }

    info!("Found {} wallpapers in {} roots", wallpapers.len(), roots.len());
    wallpapers
}

fn list_subdirectories(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Build a `WallpaperInfo` from one content directory
pub fn load_wallpaper(dir: &Path) -> Result<WallpaperInfo, ScanError> {
    let project_path = dir.join(PROJECT_FILE);
    if !project_path.is_file() {
        return Err(ScanError::MissingDescriptor(dir.to_path_buf()));
    }

    let content = fs::read_to_string(&project_path)?;
    let descriptor: Value = serde_json::from_str(&content)?;
    let Some(root) = descriptor.as_object() else {
        return Err(ScanError::NotAnObject(project_path));
    };

    let text = |key: &str| {
        root.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let tags = root
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let (created, updated) = descriptor_times(&project_path);
    let properties = merged_properties(root);

    debug!(
        "Parsed wallpaper {} with {} properties",
        dir.display(),
        properties.len()
    );

    Ok(WallpaperInfo {
        id: extract_workshop_id(dir),
        name: text("title"),
        description: text("description"),
        author: String::new(),
        wallpaper_type: text("type"),
        path: dir.to_path_buf(),
        preview_path: find_preview_image(dir),
        project_path,
        created,
        updated,
        file_size: directory_size(dir),
        tags,
        properties,
    })
}

/// `general.properties` first, root-level `properties` on top
pub fn merged_properties(root: &Map<String, Value>) -> Map<String, Value> {
    let mut properties = Map::new();
    if let Some(general) = root
        .get("general")
        .and_then(|g| g.get("properties"))
        .and_then(Value::as_object)
    {
        properties.extend(general.clone());
    }
    if let Some(top) = root.get("properties").and_then(Value::as_object) {
        properties.extend(top.clone());
    }
    properties
}

pub fn extract_workshop_id(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !name.is_empty() && name.parse::<u64>().is_ok() {
        return name;
    }

    let marker = format!("/workshop/content/{}/", WORKSHOP_APP_ID);
    let full = dir.to_string_lossy();
    if let Some(pos) = full.find(&marker) {
        let digits: String = full[pos + marker.len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            return digits;
        }
    }

    name
}

pub fn find_preview_image(dir: &Path) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    for stem in PREVIEW_STEMS {
        let found = files.iter().find(|path| {
            path.file_stem().is_some_and(|s| s == *stem)
                && PREVIEW_EXTENSIONS.contains(&extension_of(path).as_str())
        });
        if let Some(path) = found {
            return Some(path.clone());
        }
    }

    for ext in PREVIEW_EXTENSIONS {
        if let Some(path) = files.iter().find(|path| extension_of(path) == *ext) {
            return Some(path.clone());
        }
    }

    None
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

fn descriptor_times(project_path: &Path) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let Ok(metadata) = fs::metadata(project_path) else {
        return (None, None);
    };
    let created = metadata.created().ok().map(DateTime::<Utc>::from);
    let updated = metadata.modified().ok().map(DateTime::<Utc>::from);
    (created.or(updated), updated)
}
