use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{ImportError, Result};

/// Sibling directory names that commonly hold subtitles.
const SUBTITLE_DIRS: &[&str] = &["subs", "Subs", "Subtitles", "subtitles", "srt"];

/// Container format worth probing for embedded subtitle streams.
const PROBED_EXTENSION: &str = "mkv";

fn srt_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "srt"))
        .collect();
    files.sort();
    files
}

/// Existing `.srt` files that plausibly belong to a media file.
///
/// Looks at `<stem>.srt` next to the file, then each known subtitle directory
/// beside it and a `<stem>/` folder inside that directory.
pub fn find_srt_candidates(media: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![media.with_extension("srt")];

    let parent = media.parent().unwrap_or(Path::new(""));
    let stem = media.file_stem().unwrap_or_default();
    for name in SUBTITLE_DIRS {
        let subs_dir = parent.join(name);
        if !subs_dir.is_dir() {
            continue;
        }
        candidates.extend(srt_files_in(&subs_dir));
        let episode_dir = subs_dir.join(stem);
        if episode_dir.is_dir() {
            candidates.extend(srt_files_in(&episode_dir));
        }
    }

    // On case-insensitive filesystems "subs" and "Subs" are the same folder
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Detects subtitle streams inside a media container.
pub trait SubtitleProbe: Send + Sync {
    fn has_embedded_subtitles(&self, path: &Path) -> Result<bool>;
}

/// Never reports embedded subtitles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl SubtitleProbe for NoProbe {
    fn has_embedded_subtitles(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }
}

/// Asks ffmpeg to extract the first subtitle stream into a null sink.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    pub ffmpeg_path: PathBuf,
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl SubtitleProbe for FfmpegProbe {
    fn has_embedded_subtitles(&self, path: &Path) -> Result<bool> {
        let null_sink = if cfg!(windows) { "NUL" } else { "/dev/null" };
        let status = Command::new(&self.ffmpeg_path)
            .args(["-v", "quiet", "-i"])
            .arg(path)
            .args(["-map", "0:s:0", "-f", "srt", "-y", null_sink])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => Ok(status.success()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "{} not found, assuming no embedded subtitles",
                    self.ffmpeg_path.display()
                );
                Ok(false)
            }
            Err(e) => Err(ImportError::Probe {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }
}

/// Probe only containers that can carry text subtitle streams; everything
/// else is assumed to have none.
pub fn probe_embedded_subtitles(probe: &dyn SubtitleProbe, path: &Path) -> Result<bool> {
    if path.extension().map_or(true, |e| e != PROBED_EXTENSION) {
        return Ok(false);
    }
    let found = probe.has_embedded_subtitles(path)?;
    debug!("Embedded subtitles in {}: {}", path.display(), found);
    Ok(found)
}
