use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::cancel::{self, CancellationToken};
use crate::destination::CanonicalPath;
use crate::error::{ImportError, Result};
use crate::media::MediaCandidate;

/// How copies treat the library.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Overwrite destinations that already exist
    pub force: bool,
    /// Plan placements without touching the library
    pub dry_run: bool,
}

/// One file placed (or planned) in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub subtitle_source: Option<PathBuf>,
    pub subtitle_destination: Option<PathBuf>,
}

/// What happened to a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(Placement),
    /// Destination already present and `force` not set
    SkippedExisting(PathBuf),
}

/// Copy one file through a buffered writer and carry over its mtime.
/// A failed copy leaves no destination behind.
fn copy_file(source: &Path, dest: &Path) -> Result<u64> {
    let mut input = File::open(source).map_err(|e| ImportError::io(source, e))?;
    let output = File::create(dest).map_err(|e| ImportError::io(dest, e))?;
    let result = (|| -> io::Result<u64> {
        let mut output = BufWriter::new(output);
        let written = io::copy(&mut input, &mut output)?;
        output.flush()?;
        Ok(written)
    })();

    match result {
        Ok(written) => {
            if let Ok(meta) = fs::metadata(source) {
                let mtime = filetime::FileTime::from_last_modification_time(&meta);
                filetime::set_file_mtime(dest, mtime).ok();
            }
            Ok(written)
        }
        Err(e) => {
            fs::remove_file(dest).ok();
            Err(ImportError::io(dest, e))
        }
    }
}

/// Copy a candidate (and its subtitle) to `library_root/<canonical path>`.
pub fn copy_to_library(
    candidate: &MediaCandidate,
    canonical: &CanonicalPath,
    library_root: &Path,
    options: WriteOptions,
    cancel_token: Option<&CancellationToken>,
) -> Result<CopyOutcome> {
    cancel::check(cancel_token)?;

    let dest = library_root.join(&canonical.media);
    let subtitle = match (&candidate.srt_path, &canonical.subtitle) {
        (Some(src), Some(rel)) => Some((src.clone(), library_root.join(rel))),
        _ => None,
    };

    if !options.force {
        let taken = std::iter::once(&dest)
            .chain(subtitle.as_ref().map(|(_, dst)| dst))
            .find(|path| path.exists());
        if let Some(existing) = taken {
            warn!("{} already exists, skipping {}", existing.display(), candidate.path.display());
            return Ok(CopyOutcome::SkippedExisting(existing.clone()));
        }
    }

    let placement = Placement {
        source: candidate.path.clone(),
        destination: dest.clone(),
        subtitle_source: subtitle.as_ref().map(|(src, _)| src.clone()),
        subtitle_destination: subtitle.as_ref().map(|(_, dst)| dst.clone()),
    };

    if options.dry_run {
        return Ok(CopyOutcome::Copied(placement));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ImportError::io(parent, e))?;
    }
    let replaced = dest.exists();
    let bytes = copy_file(&candidate.path, &dest)?;
    debug!("Copied {} bytes to {}", bytes, dest.display());

    if let Some((src, dst)) = &subtitle {
        let copied = cancel::check(cancel_token).and_then(|()| copy_file(src, dst));
        if let Err(e) = copied {
            // Never leave new media behind without its subtitle
            if !replaced {
                fs::remove_file(&dest).ok();
            }
            return Err(e);
        }
        debug!("Copied subtitle to {}", dst.display());
    }

    Ok(CopyOutcome::Copied(placement))
}
