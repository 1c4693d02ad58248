pub mod cancel;
pub mod dedup;
pub mod destination;
pub mod error;
pub mod hasher;
pub mod infer;
pub mod media;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod subtitles;
pub mod writer;

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::destination::CanonicalPath;
use crate::writer::{CopyOutcome, WriteOptions};

pub use cancel::CancellationToken;
pub use dedup::{DigestIndex, Duplicate};
pub use error::{ImportError, Result};
pub use media::{Classification, Confirmation, MediaCandidate};
pub use progress::{ProgressCallback, ThrottledProgress};
pub use scanner::ScanOptions;
pub use subtitles::{FfmpegProbe, NoProbe, SubtitleProbe};
pub use writer::Placement;

fn default_probe_subtitles() -> bool {
    true
}

/// Everything an import run needs to know. The library root has no default;
/// front-ends must supply it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    pub import_dir: PathBuf,
    pub library: PathBuf,
    #[serde(default)]
    pub scan: ScanOptions,
    #[serde(default = "default_probe_subtitles")]
    pub probe_subtitles: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl ImportOptions {
    pub fn new(import_dir: PathBuf, library: PathBuf) -> Self {
        Self {
            import_dir,
            library,
            scan: ScanOptions::default(),
            probe_subtitles: default_probe_subtitles(),
            force: false,
            dry_run: false,
        }
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            force: self.force,
            dry_run: self.dry_run,
        }
    }
}

/// Control options for an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportControl {
    /// Cancellation token checked between files.
    pub cancel_token: Option<CancellationToken>,
}

impl ImportControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

/// Candidates left after dedup, with inferred metadata, in presentation order.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    /// Distinct files found in the import directory
    pub import_files: u64,
    /// Distinct files found in the library (0 if it was never scanned)
    pub library_files: u64,
    pub duplicates: Vec<Duplicate>,
    pub candidates: Vec<MediaCandidate>,
}

impl ImportPlan {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// What the confirmer is asked about one candidate.
#[derive(Debug)]
pub struct ConfirmRequest<'a> {
    pub candidate: &'a MediaCandidate,
    /// Existing `.srt` files near the media; empty when subtitles are embedded
    pub subtitle_candidates: &'a [PathBuf],
    /// The previous answer did not yield a destination path
    pub unresolved: bool,
    pub index: usize,
    pub total: usize,
}

#[derive(Debug)]
pub enum Decision {
    Import(Confirmation),
    Skip,
}

/// Approves or corrects candidate metadata before anything is copied.
pub trait Confirmer {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Result<Decision>;
}

/// Non-interactive confirmer: takes the inferred metadata as-is, picks the
/// first subtitle candidate, and skips whatever cannot be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptInferred;

impl Confirmer for AcceptInferred {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Result<Decision> {
        if request.unresolved {
            return Ok(Decision::Skip);
        }
        let mut confirmation = Confirmation::from_candidate(request.candidate);
        if !request.candidate.has_embedded_subtitles && confirmation.subtitle.is_none() {
            confirmation.subtitle = request.subtitle_candidates.first().cloned();
        }
        Ok(Decision::Import(confirmation))
    }
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Import set was empty or fully covered by the library
    pub nothing_to_import: bool,
    pub import_files: u64,
    pub library_files: u64,
    pub candidates_considered: u64,
    pub skipped_by_operator: u64,
    pub unresolved: u64,
    pub files_copied: u64,
    pub subtitles_copied: u64,
    /// Destination already present or claimed by another file in the batch
    pub files_skipped: u64,
    pub duplicates: Vec<Duplicate>,
    pub placements: Vec<Placement>,
    pub skipped: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn duplicates_removed(&self) -> u64 {
        self.duplicates.len() as u64
    }
}

/// Scan, dedup, infer and probe. Nothing is written.
///
/// When the import directory holds no media the library is not scanned.
pub fn prepare_import(
    options: &ImportOptions,
    control: &ImportControl,
    probe: &dyn SubtitleProbe,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ImportPlan> {
    let tp = ThrottledProgress::new(progress_callback);
    let cancel_token = control.cancel_token.as_ref();
    cancel::check(cancel_token)?;

    // Stage 1: Index both sides
    let import_index =
        scanner::build_index(&options.import_dir, &options.scan, "import", &tp, cancel_token)?;
    if import_index.is_empty() {
        info!("No media under {}", options.import_dir.display());
        return Ok(ImportPlan::default());
    }
    let import_files = import_index.len() as u64;

    let library_index =
        scanner::build_index(&options.library, &options.scan, "library", &tp, cancel_token)?;
    let library_files = library_index.len() as u64;

    // Stage 2: Drop what the library already has
    let outcome = dedup::dedup(import_index, &library_index);
    for dup in &outcome.removed {
        info!(
            "{} is already in the library at {}",
            dup.import_path.display(),
            dup.library_path.display()
        );
    }
    info!(
        "{} of {} files already in the library",
        outcome.removed_count(),
        import_files
    );

    // Stage 3: Infer metadata from filenames
    let paths = outcome.kept.paths();
    let total = paths.len() as u64;
    let mut candidates: Vec<MediaCandidate> = paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            tp.report("infer", i as u64, total, "Populating initial metadata");
            let inferred = infer::infer(&path);
            MediaCandidate::new(path).with_inference(inferred)
        })
        .collect();

    // Stage 4: Embedded subtitles
    if options.probe_subtitles {
        candidates = candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| -> Result<MediaCandidate> {
                cancel::check(cancel_token)?;
                let found = subtitles::probe_embedded_subtitles(probe, &candidate.path)?;
                tp.report("probe", i as u64, total, "Checking for embedded subtitles");
                Ok(candidate.with_embedded_subtitles(found))
            })
            .collect::<Result<_>>()?;
    }

    destination::sort_candidates(&mut candidates);

    Ok(ImportPlan {
        import_files,
        library_files,
        duplicates: outcome.removed,
        candidates,
    })
}

enum Confirmed {
    Accepted(MediaCandidate, CanonicalPath),
    Skipped { unresolved: bool },
}

/// Ask until the answer resolves to a destination or the operator skips.
fn confirm_candidate(
    confirmer: &mut dyn Confirmer,
    candidate: MediaCandidate,
    subtitle_candidates: &[PathBuf],
    index: usize,
    total: usize,
) -> Result<Confirmed> {
    let mut current = candidate;
    let mut unresolved = false;
    loop {
        let request = ConfirmRequest {
            candidate: &current,
            subtitle_candidates,
            unresolved,
            index,
            total,
        };
        let confirmation = match confirmer.confirm(&request)? {
            Decision::Import(confirmation) => confirmation,
            Decision::Skip => return Ok(Confirmed::Skipped { unresolved }),
        };
        current = current.confirmed(confirmation);
        match destination::resolve(&current) {
            Some(canonical) => return Ok(Confirmed::Accepted(current, canonical)),
            None => unresolved = true,
        }
    }
}

/// Confirm every candidate of a plan, then copy the accepted ones.
pub fn import_plan(
    plan: ImportPlan,
    options: &ImportOptions,
    control: &ImportControl,
    confirmer: &mut dyn Confirmer,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ImportResult> {
    let tp = ThrottledProgress::new(progress_callback);
    let cancel_token = control.cancel_token.as_ref();

    let mut result = ImportResult {
        import_files: plan.import_files,
        library_files: plan.library_files,
        duplicates: plan.duplicates,
        ..ImportResult::default()
    };
    if plan.candidates.is_empty() {
        result.nothing_to_import = true;
        return Ok(result);
    }

    // Stage 5: Confirmation, strictly one candidate at a time
    let total = plan.candidates.len();
    let mut accepted: Vec<(MediaCandidate, CanonicalPath)> = Vec::with_capacity(total);
    for (index, candidate) in plan.candidates.into_iter().enumerate() {
        cancel::check(cancel_token)?;
        result.candidates_considered += 1;

        let subtitle_candidates = if candidate.has_embedded_subtitles {
            Vec::new()
        } else {
            subtitles::find_srt_candidates(&candidate.path)
        };
        let path = candidate.path.clone();
        match confirm_candidate(confirmer, candidate, &subtitle_candidates, index, total)? {
            Confirmed::Accepted(candidate, canonical) => accepted.push((candidate, canonical)),
            Confirmed::Skipped { unresolved } => {
                if unresolved {
                    result.unresolved += 1;
                    warn!("No destination could be resolved for {}", path.display());
                    result
                        .warnings
                        .push(format!("Skipped {}: incomplete metadata", path.display()));
                } else {
                    result.skipped_by_operator += 1;
                }
                result.skipped.push(path);
            }
        }
    }

    // Stage 6: Copy into the library
    let write_options = options.write_options();
    let copy_total = accepted.len() as u64;
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for (i, (candidate, canonical)) in accepted.iter().enumerate() {
        tp.report("copy", i as u64, copy_total, "Copying media into library");

        // Media and subtitle destinations share one claim set: two files
        // with the same stem map to the same `.en.srt`.
        let wanted: Vec<&PathBuf> = std::iter::once(&canonical.media)
            .chain(candidate.srt_path.as_ref().and(canonical.subtitle.as_ref()))
            .collect();
        if let Some(taken) = wanted.iter().find(|path| claimed.contains(**path)) {
            warn!(
                "{} resolves to {}, already taken in this batch",
                candidate.path.display(),
                taken.display()
            );
            result.files_skipped += 1;
            result.skipped.push(candidate.path.clone());
            result.warnings.push(format!(
                "Skipped {}: {} is already used by another file in this import",
                candidate.path.display(),
                taken.display()
            ));
            continue;
        }
        claimed.extend(wanted.into_iter().cloned());

        match writer::copy_to_library(
            candidate,
            canonical,
            &options.library,
            write_options,
            cancel_token,
        )? {
            CopyOutcome::Copied(placement) => {
                result.files_copied += 1;
                if placement.subtitle_destination.is_some() {
                    result.subtitles_copied += 1;
                }
                result.placements.push(placement);
            }
            CopyOutcome::SkippedExisting(dest) => {
                result.files_skipped += 1;
                result.skipped.push(candidate.path.clone());
                result.warnings.push(format!(
                    "Skipped {}: {} already exists",
                    candidate.path.display(),
                    dest.display()
                ));
            }
        }
    }
    tp.report("copy", copy_total, copy_total, "Done");

    Ok(result)
}

/// Run the full import pipeline.
pub fn run_import(
    options: &ImportOptions,
    confirmer: &mut dyn Confirmer,
    probe: &dyn SubtitleProbe,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ImportResult> {
    run_import_with_control(options, &ImportControl::default(), confirmer, probe, progress_callback)
}

/// Run the full import pipeline with control options.
pub fn run_import_with_control(
    options: &ImportOptions,
    control: &ImportControl,
    confirmer: &mut dyn Confirmer,
    probe: &dyn SubtitleProbe,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ImportResult> {
    let plan = prepare_import(options, control, probe, progress_callback)?;
    import_plan(plan, options, control, confirmer, progress_callback)
}
