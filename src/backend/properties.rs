use crate::backend::workshop::merged_properties;
use crate::constant::BACKUP_SUFFIX;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PropertyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Descriptor is not a JSON object: {}", .0.display())]
    NotAnObject(PathBuf),

    #[error("No backup found for {}", .0.display())]
    NoBackup(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Bool,
    Slider,
    Combo,
    Color,
    TextInput,
    Text,
    Unknown,
}

impl PropertyKind {
    fn parse(kind: &str) -> Self {
        match kind {
            "bool" => Self::Bool,
            "slider" => Self::Slider,
            "combo" => Self::Combo,
            "color" => Self::Color,
            "textinput" => Self::TextInput,
            "text" => Self::Text,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyOption {
    pub label: String,
    pub value: String,
}

/// Typed view over one entry of a wallpaper's properties bag
#[derive(Debug, Clone, PartialEq)]
pub struct WallpaperProperty {
    pub name: String,
    pub label: String,
    pub kind: PropertyKind,
    pub value: Value,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub options: Vec<PropertyOption>,
    pub order: i64,
}

impl WallpaperProperty {
    /// Editable properties carry a value; plain `text` entries are labels
    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, PropertyKind::Text | PropertyKind::Unknown)
    }
}

pub fn parse_properties(bag: &Map<String, Value>) -> Vec<WallpaperProperty> {
    let mut properties: Vec<WallpaperProperty> = bag
        .iter()
        .filter_map(|(name, entry)| {
            let entry = entry.as_object()?;
            let kind = entry.get("type").and_then(Value::as_str)?;
            let value = entry.get("value")?.clone();

            let label = entry
                .get("text")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .unwrap_or(name)
                .to_string();
            let number = |key: &str, default: f64| {
                entry.get(key).and_then(Value::as_f64).unwrap_or(default)
            };
            let options = entry
                .get("options")
                .and_then(Value::as_array)
                .map(|options| {
                    options
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|option| PropertyOption {
                            label: option
                                .get("label")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            value: option.get("value").map(value_to_arg).unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            Some(WallpaperProperty {
                name: name.clone(),
                label,
                kind: PropertyKind::parse(kind),
                value,
                min: number("min", 0.0),
                max: number("max", 100.0),
                step: number("step", 1.0),
                options,
                order: entry.get("order").and_then(Value::as_i64).unwrap_or(0),
            })
        })
        .collect();

    properties.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
    properties
}

pub fn backup_path(project_path: &Path) -> PathBuf {
    let mut name = project_path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

pub fn has_backup(project_path: &Path) -> bool {
    backup_path(project_path).is_file()
}

fn read_descriptor(project_path: &Path) -> Result<Map<String, Value>, PropertyError> {
    let content = fs::read_to_string(project_path)?;
    match serde_json::from_str(&content)? {
        Value::Object(root) => Ok(root),
        _ => Err(PropertyError::NotAnObject(project_path.to_path_buf())),
    }
}

/// Write edited values into `general.properties`, keeping the pristine
/// descriptor as a backup the first time
pub fn save_property_values(
    project_path: &Path,
    values: &Map<String, Value>,
) -> Result<(), PropertyError> {
    let mut root = read_descriptor(project_path)?;

    let backup = backup_path(project_path);
    if !backup.exists() {
        fs::copy(project_path, &backup)?;
        debug!("Created backup of descriptor: {}", backup.display());
    }

    let general = root
        .entry("general")
        .or_insert_with(|| Value::Object(Map::new()));
    if !general.is_object() {
        *general = Value::Object(Map::new());
    }
    let Some(general) = general.as_object_mut() else {
        return Err(PropertyError::NotAnObject(project_path.to_path_buf()));
    };

    let properties = general
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if !properties.is_object() {
        *properties = Value::Object(Map::new());
    }
    let Some(properties) = properties.as_object_mut() else {
        return Err(PropertyError::NotAnObject(project_path.to_path_buf()));
    };

    for (name, value) in values {
        match properties.get_mut(name).and_then(Value::as_object_mut) {
            Some(entry) => {
                entry.insert("value".to_string(), value.clone());
            }
            None => {
                let mut entry = Map::new();
                entry.insert("value".to_string(), value.clone());
                properties.insert(name.clone(), Value::Object(entry));
            }
        }
    }

    let content = serde_json::to_string_pretty(&Value::Object(root))?;
    fs::write(project_path, content)?;
    info!(
        "Saved {} property values to {}",
        values.len(),
        project_path.display()
    );
    Ok(())
}

/// Put the pristine descriptor back in place
pub fn reset_from_backup(project_path: &Path) -> Result<(), PropertyError> {
    let backup = backup_path(project_path);
    if !backup.is_file() {
        return Err(PropertyError::NoBackup(project_path.to_path_buf()));
    }
    fs::rename(&backup, project_path)?;
    info!("Restored descriptor from backup: {}", project_path.display());
    Ok(())
}

/// `--set-property name=value` pairs for a descriptor that has been edited
pub fn property_args(project_path: &Path) -> Vec<String> {
    if !has_backup(project_path) {
        return Vec::new();
    }

    let root = match read_descriptor(project_path) {
        Ok(root) => root,
        Err(e) => {
            warn!(
                "Failed to read properties from {}: {}",
                project_path.display(),
                e
            );
            return Vec::new();
        }
    };

    let mut args = Vec::new();
    for (name, entry) in merged_properties(&root) {
        if let Some(value) = entry.get("value") {
            args.push("--set-property".to_string());
            args.push(format!("{}={}", name, value_to_arg(value)));
        }
    }
    debug!(
        "Generated {} property overrides from {}",
        args.len() / 2,
        project_path.display()
    );
    args
}

pub fn value_to_arg(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(format_number).unwrap_or_default(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Six significant digits without trailing zeros, so slider drift such as
/// `0.30000000000000004` comes out as `0.3`
pub fn format_number(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return if value == 0.0 { "0".to_string() } else { value.to_string() };
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).max(0) as usize;
    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Colors are stored as space separated floats in 0..=1
pub fn parse_color(value: &str) -> Option<[f32; 3]> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [r, g, b, ..] => Some([r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]),
        _ => None,
    }
}

pub fn format_color(rgb: [f32; 3]) -> String {
    rgb.iter()
        .map(|c| format_number(f64::from(*c)))
        .collect::<Vec<_>>()
        .join(" ")
}
