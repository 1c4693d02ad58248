use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dedup::Duplicate;
use crate::error::{ImportError, Result};
use crate::writer::Placement;
use crate::{ImportOptions, ImportResult};

#[derive(Serialize)]
struct ImportReport<'a> {
    generated_at: DateTime<Utc>,
    options: &'a ImportOptions,
    nothing_to_import: bool,
    import_files: u64,
    library_files: u64,
    duplicates: &'a [Duplicate],
    placements: &'a [Placement],
    skipped: &'a [PathBuf],
    warnings: &'a [String],
}

/// Write a JSON summary of an import run.
pub fn write_import_report(
    result: &ImportResult,
    options: &ImportOptions,
    report_path: &Path,
) -> Result<()> {
    let report = ImportReport {
        generated_at: Utc::now(),
        options,
        nothing_to_import: result.nothing_to_import,
        import_files: result.import_files,
        library_files: result.library_files,
        duplicates: &result.duplicates,
        placements: &result.placements,
        skipped: &result.skipped,
        warnings: &result.warnings,
    };

    let file = File::create(report_path).map_err(|e| ImportError::io(report_path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)
        .map_err(|e| ImportError::io(report_path, e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_report_contents() {
        let dir = tempdir().unwrap();
        let options = ImportOptions::new(PathBuf::from("/in"), PathBuf::from("/lib"));
        let result = ImportResult {
            import_files: 2,
            library_files: 5,
            duplicates: vec![Duplicate {
                digest: "ab".to_string(),
                import_path: PathBuf::from("/in/a.mkv"),
                library_path: PathBuf::from("/lib/Movies/A (2000)/A.mkv"),
            }],
            placements: vec![Placement {
                source: PathBuf::from("/in/b.mkv"),
                destination: PathBuf::from("/lib/Movies/B (2001)/B.mkv"),
                subtitle_source: None,
                subtitle_destination: None,
            }],
            ..ImportResult::default()
        };

        let path = dir.path().join("report.json");
        write_import_report(&result, &options, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(json["import_files"], 2);
        assert_eq!(json["library_files"], 5);
        assert_eq!(json["options"]["library"], "/lib");
        assert_eq!(json["duplicates"][0]["library_path"], "/lib/Movies/A (2000)/A.mkv");
        assert_eq!(json["placements"][0]["destination"], "/lib/Movies/B (2001)/B.mkv");
        assert!(json["generated_at"].is_string());
    }
}
