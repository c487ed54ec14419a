use crate::backend::workshop::WallpaperInfo;
use std::path::PathBuf;

/// Which settings field a native file dialog result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget {
    EngineBinary,
    AssetsDir,
    SteamPath,
    SteamLibrary,
    ExternalBinary,
    ExternalWallpapers,
}

/// Response messages from background operations
pub enum ResponseMessage {
    ScanProgress { done: usize, total: usize },
    ScanFinished(Vec<WallpaperInfo>),
    MediaPicked(PathBuf),
    PathPicked { target: PathTarget, path: PathBuf },
}
