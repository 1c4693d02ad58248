mod prompt;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use jellyimport_core::{
    report, AcceptInferred, CancellationToken, Confirmer, FfmpegProbe, ImportControl,
    ImportOptions, NoProbe, ScanOptions, SubtitleProbe,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jellyimport", version, about = "Import media files into a library without duplicates")]
struct Cli {
    /// Directory holding the files to import
    import_dir: PathBuf,

    /// Library root (Shows/ and Movies/ live here)
    #[arg(long, env = "JELLYIMPORT_LIBRARY")]
    library: PathBuf,

    /// Media file extension to consider (repeatable)
    #[arg(long = "extension", value_name = "EXT", default_values = ["mkv", "mp4"])]
    extensions: Vec<String>,

    /// Ignore files smaller than this many bytes
    #[arg(long, default_value_t = ScanOptions::default().min_size)]
    min_size: u64,

    /// Accept inferred metadata without prompting
    #[arg(short, long)]
    yes: bool,

    /// Do not run ffmpeg to look for embedded subtitles
    #[arg(long)]
    no_probe: bool,

    /// Overwrite files that already exist in the library
    #[arg(long)]
    force: bool,

    /// Show what would be copied without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Renders core progress callbacks as one indicatif bar per stage.
struct StageBars {
    current: Mutex<Option<(String, ProgressBar)>>,
}

impl StageBars {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn update(&self, stage: &str, current: u64, total: u64, message: &str) {
        let Ok(mut slot) = self.current.lock() else {
            return;
        };
        let same_stage = slot.as_ref().map_or(false, |(s, _)| s == stage);
        if !same_stage {
            if let Some((_, old)) = slot.take() {
                old.finish_and_clear();
            }
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}") {
                pb.set_style(style);
            }
            *slot = Some((stage.to_string(), pb));
        }
        if let Some((_, pb)) = slot.as_ref() {
            pb.set_length(total);
            pb.set_position((current + 1).min(total));
            pb.set_message(message.to_string());
            if current + 1 >= total {
                pb.finish_and_clear();
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let t_total = std::time::Instant::now();

    let token = CancellationToken::new();
    let awaiting_input = Arc::new(AtomicBool::new(false));
    {
        let token = token.clone();
        let awaiting_input = awaiting_input.clone();
        ctrlc::set_handler(move || {
            token.cancel();
            // Blocked on a prompt: nothing has been copied yet, leave now
            if awaiting_input.load(Ordering::SeqCst) {
                eprintln!("\nCancelled.");
                std::process::exit(130);
            }
        })
        .context("failed to install signal handler")?;
    }
    let control = ImportControl::new().with_cancel_token(token.clone());

    let options = ImportOptions {
        scan: ScanOptions {
            extensions: cli.extensions,
            min_size: cli.min_size,
        },
        probe_subtitles: !cli.no_probe,
        force: cli.force,
        dry_run: cli.dry_run,
        ..ImportOptions::new(cli.import_dir, cli.library)
    };

    let bars = StageBars::new();
    let progress = |stage: &str, current: u64, total: u64, message: &str| {
        bars.update(stage, current, total, message);
    };

    let probe: Box<dyn SubtitleProbe> = if options.probe_subtitles {
        Box::new(FfmpegProbe::default())
    } else {
        Box::new(NoProbe)
    };

    let plan = jellyimport_core::prepare_import(&options, &control, probe.as_ref(), &progress)
        .context("Import aborted while scanning")?;

    for dup in &plan.duplicates {
        println!(
            "Skip {}, as it's already in the library at {}.",
            dup.import_path.display(),
            dup.library_path.display()
        );
    }
    if plan.is_empty() {
        println!("No files to import.");
        return Ok(());
    }
    println!("{} files to import.", plan.candidates.len());

    let mut confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AcceptInferred)
    } else {
        Box::new(prompt::Interactive::new(token).with_input_flag(awaiting_input))
    };
    let result =
        jellyimport_core::import_plan(plan, &options, &control, confirmer.as_mut(), &progress)
            .context("Import aborted")?;

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    if cli.dry_run {
        for placement in &result.placements {
            println!("{} -> {}", placement.source.display(), placement.destination.display());
        }
    }
    if let Some(path) = &cli.report {
        report::write_import_report(&result, &options, path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    eprintln!(
        "Done! {} files copied ({} subtitles), {} already in library, {} skipped ({:.2}s)",
        result.files_copied,
        result.subtitles_copied,
        result.duplicates_removed(),
        result.skipped.len(),
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
