use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cancel::{self, CancellationToken};
use crate::dedup::DigestIndex;
use crate::error::{ImportError, Result};
use crate::hasher::{self, MIB};
use crate::progress::ThrottledProgress;

fn default_extensions() -> Vec<String> {
    vec!["mkv".to_string(), "mp4".to_string()]
}

fn default_min_size() -> u64 {
    2 * MIB
}

/// Which files under a root count as media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Accepted extensions without the leading dot, matched case-sensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Smaller files are treated as samples/extras and never indexed
    #[serde(default = "default_min_size")]
    pub min_size: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            min_size: default_min_size(),
        }
    }
}

impl ScanOptions {
    fn accepts_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|accepted| accepted.trim_start_matches('.') == ext)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

fn is_dangling(e: &walkdir::Error) -> bool {
    let not_found = e
        .io_error()
        .map_or(false, |io| io.kind() == std::io::ErrorKind::NotFound);
    not_found && e.path().map_or(false, |p| p.symlink_metadata().is_ok())
}

/// Recursively list media files under `root`, sorted by path.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ImportError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files = Vec::new();
    // Symlinked directories are descended into; walkdir reports cycles
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                warn!("Skipping symlink loop at {}", e.path().unwrap_or(root).display());
                continue;
            }
            Err(e) if is_dangling(&e) => {
                debug!("Skipping dangling symlink {}", e.path().unwrap_or(root).display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        if !options.accepts_extension(path) || is_hidden(path) {
            continue;
        }
        // The entry already resolved symlinks, so this is the target's metadata
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if meta.len() < options.min_size {
            debug!("Skipping small file {} ({} bytes)", path.display(), meta.len());
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

/// Scan `root` and hash every media file into a digest index.
///
/// Hashing runs on the rayon pool. The first failure aborts the whole scan.
pub fn build_index(
    root: &Path,
    options: &ScanOptions,
    label: &str,
    progress: &ThrottledProgress,
    cancel_token: Option<&CancellationToken>,
) -> Result<DigestIndex> {
    let scan_stage = format!("scan-{label}");
    progress.report(&scan_stage, 0, 1, &format!("Enumerating {}", root.display()));
    let files = scan(root, options)?;
    progress.report(&scan_stage, 1, 1, &format!("Found {} files", files.len()));
    info!("Found {} media files under {}", files.len(), root.display());

    let hash_stage = format!("hash-{label}");
    let total = files.len() as u64;
    let counter = AtomicU64::new(0);
    let hashed: Vec<(String, PathBuf)> = files
        .into_par_iter()
        .map(|path| -> Result<(String, PathBuf)> {
            cancel::check(cancel_token)?;
            let digest = hasher::content_digest(&path)?;
            debug!("{} {}", digest, path.display());
            let current = counter.fetch_add(1, Ordering::Relaxed);
            progress.report(&hash_stage, current, total, "Hashing");
            Ok((digest, path))
        })
        .collect::<Result<_>>()?;

    // collect() keeps scan order, so the last path wins deterministically
    let mut index = DigestIndex::new();
    for (digest, path) in hashed {
        if let Some(previous) = index.insert(digest, path) {
            debug!("Identical content at {}", previous.display());
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_sized(path: &Path, len: usize, seed: u8) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bytes: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(seed)).collect();
        File::create(path).unwrap().write_all(&bytes).unwrap();
    }

    fn noop(_: &str, _: u64, _: u64, _: &str) {}

    #[test]
    fn test_scan_filters() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let big = (2 * MIB) as usize;
        write_sized(&root.join("a/Movie.2019.mkv"), big, 0);
        write_sized(&root.join("b/Show.S01E01.mp4"), big, 1);
        write_sized(&root.join("sample.mkv"), 1024, 2);
        write_sized(&root.join(".hidden.mkv"), big, 3);
        write_sized(&root.join("notes.avi"), big, 4);
        write_sized(&root.join("UPPER.MKV"), big, 5);
        fs::create_dir_all(root.join("dir.mkv")).unwrap();

        let files = scan(root, &ScanOptions::default()).unwrap();
        assert_eq!(
            files,
            vec![root.join("a/Movie.2019.mkv"), root.join("b/Show.S01E01.mp4")]
        );
    }

    #[test]
    fn test_scan_custom_options() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_sized(&root.join("clip.avi"), 10, 0);
        let options = ScanOptions {
            extensions: vec![".avi".to_string()],
            min_size: 0,
        };
        assert_eq!(scan(root, &options).unwrap(), vec![root.join("clip.avi")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_linked_dirs_and_survives_loops() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let root = dir.path();
        let big = (2 * MIB) as usize;
        write_sized(&outside.path().join("Linked.2005.mkv"), big, 6);
        write_sized(&root.join("own/Own.2006.mkv"), big, 7);
        std::os::unix::fs::symlink(outside.path(), root.join("linked")).unwrap();
        std::os::unix::fs::symlink(root, root.join("own/back")).unwrap();
        std::os::unix::fs::symlink(root.join("nowhere.mkv"), root.join("dangling.mkv")).unwrap();

        let files = scan(root, &ScanOptions::default()).unwrap();
        assert_eq!(
            files,
            vec![root.join("linked/Linked.2005.mkv"), root.join("own/Own.2006.mkv")]
        );
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempdir().unwrap();
        let err = scan(&dir.path().join("missing"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn test_build_index_collapses_identical_content() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let big = (2 * MIB) as usize + 17;
        write_sized(&root.join("one.mkv"), big, 9);
        write_sized(&root.join("two.mkv"), big, 9);
        write_sized(&root.join("three.mkv"), big, 10);

        let tp = ThrottledProgress::new(&noop);
        let index = build_index(root, &ScanOptions::default(), "import", &tp, None).unwrap();
        assert_eq!(index.len(), 2);
        let digest = hasher::content_digest(&root.join("one.mkv")).unwrap();
        // sorted scan order: "one" before "two", so "two" wins
        assert_eq!(index.get(&digest), Some(root.join("two.mkv").as_path()));
    }

    #[test]
    fn test_build_index_honours_cancellation() {
        let dir = tempdir().unwrap();
        write_sized(&dir.path().join("one.mkv"), (2 * MIB) as usize, 0);
        let token = CancellationToken::new();
        token.cancel();
        let tp = ThrottledProgress::new(&noop);
        let err = build_index(dir.path(), &ScanOptions::default(), "import", &tp, Some(&token))
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
