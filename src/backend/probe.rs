use crate::backend::external::MediaType;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(10);

/// Media inspection used when importing external wallpapers
pub trait MediaProbe: Send {
    /// `(width, height)` of an image, gif or video
    fn resolution(&self, path: &Path, media_type: MediaType) -> Option<(u32, u32)>;

    /// Codec name of the first video stream
    fn video_codec(&self, path: &Path) -> Option<String>;

    /// Render the first frame of `video` into a `size`x`size` png at `output`
    fn render_preview(&self, video: &Path, output: &Path, size: u32) -> bool;
}

/// Probe backed by the `image` crate and the ffmpeg command line tools
#[derive(Debug, Clone, Default)]
pub struct ToolProbe;

impl MediaProbe for ToolProbe {
    fn resolution(&self, path: &Path, media_type: MediaType) -> Option<(u32, u32)> {
        match media_type {
            MediaType::Image | MediaType::Gif => match image::image_dimensions(path) {
                Ok(dimensions) => Some(dimensions),
                Err(e) => {
                    warn!("Failed to read image size of {}: {}", path.display(), e);
                    None
                }
            },
            MediaType::Video => {
                let output = run_tool(
                    Command::new("ffprobe")
                        .args(["-v", "quiet", "-select_streams", "v:0"])
                        .args(["-show_entries", "stream=width,height"])
                        .args(["-of", "csv=p=0"])
                        .arg(path),
                    PROBE_TIMEOUT,
                )?;
                parse_resolution(&String::from_utf8_lossy(&output.stdout))
            }
            MediaType::Unknown => None,
        }
    }

    fn video_codec(&self, path: &Path) -> Option<String> {
        let output = run_tool(
            Command::new("ffprobe")
                .args(["-v", "quiet", "-select_streams", "v:0"])
                .args(["-show_entries", "stream=codec_name"])
                .args(["-of", "csv=p=0"])
                .arg(path),
            PROBE_TIMEOUT,
        )?;
        let codec = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!codec.is_empty()).then_some(codec)
    }

    fn render_preview(&self, video: &Path, output: &Path, size: u32) -> bool {
        if output.exists() {
            debug!("Preview already exists: {}", output.display());
            return true;
        }

        let filter = format!(
            "scale={size}:{size}:force_original_aspect_ratio=decrease,pad={size}:{size}:(ow-iw)/2:(oh-ih)/2"
        );
        let result = run_tool(
            Command::new("ffmpeg")
                .args(["-v", "quiet", "-i"])
                .arg(video)
                .args(["-vf", filter.as_str(), "-vframes", "1", "-y"])
                .arg(output)
                .current_dir(std::env::temp_dir()),
            PREVIEW_TIMEOUT,
        );

        match result {
            Some(_) if output.exists() => true,
            _ => {
                warn!("Failed to generate preview from video: {}", video.display());
                false
            }
        }
    }
}

/// Run a short-lived tool, giving up after `timeout`. Only successful runs
/// are returned.
fn run_tool(command: &mut Command, timeout: Duration) -> Option<Output> {
    let mut child = match command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to run {:?}: {}", command.get_program(), e);
            return None;
        }
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(25)),
            _ => {
                warn!("{:?} timed out", command.get_program());
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    }

    let output = child.wait_with_output().ok()?;
    if output.status.success() {
        Some(output)
    } else {
        debug!(
            "{:?} failed: {}",
            command.get_program(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        None
    }
}

/// Parse ffprobe's `width,height` csv line
pub fn parse_resolution(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (width, height) = line.split_once(',')?;
    let width = width.trim().parse().ok()?;
    let height = height.trim().trim_end_matches(',').parse().ok()?;
    Some((width, height))
}
