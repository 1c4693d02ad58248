use std::io::{self, BufRead, Stderr, StdinLock, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jellyimport_core::{
    CancellationToken, Classification, ConfirmRequest, Confirmation, Confirmer, Decision,
    ImportError, Result,
};

fn console_error(e: io::Error) -> ImportError {
    ImportError::io(Path::new("<console>"), e)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Line-based terminal confirmer.
pub struct Interactive<R, W> {
    input: R,
    output: W,
    cancel_token: CancellationToken,
    /// Set while blocked on a read. A signal handler cannot interrupt
    /// `read_line`, so it checks this flag and exits on its own.
    awaiting_input: Arc<AtomicBool>,
}

impl Interactive<StdinLock<'static>, Stderr> {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self::with_io(io::stdin().lock(), io::stderr(), cancel_token)
    }
}

impl<R: BufRead, W: Write> Interactive<R, W> {
    pub fn with_io(input: R, output: W, cancel_token: CancellationToken) -> Self {
        Self {
            input,
            output,
            cancel_token,
            awaiting_input: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share the "waiting for an answer" flag with a signal handler.
    pub fn with_input_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.awaiting_input = flag;
        self
    }

    /// Ask one question. An empty answer takes the default; end of input cancels.
    fn ask(&mut self, label: &str, default: &str) -> Result<String> {
        if default.is_empty() {
            write!(self.output, "{label}: ").map_err(console_error)?;
        } else {
            write!(self.output, "{label} [{default}]: ").map_err(console_error)?;
        }
        self.output.flush().map_err(console_error)?;

        let mut line = String::new();
        self.awaiting_input.store(true, Ordering::SeqCst);
        let read = self.input.read_line(&mut line);
        self.awaiting_input.store(false, Ordering::SeqCst);
        let read = read.map_err(console_error)?;
        self.cancel_token.check()?;
        if read == 0 {
            return Err(ImportError::Cancelled);
        }
        let answer = line.trim();
        Ok(if answer.is_empty() { default } else { answer }.to_string())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}").map_err(console_error)
    }

    fn ask_classification(&mut self, default: Classification) -> Result<Classification> {
        loop {
            let answer = self.ask("Media collection", &default.to_string())?;
            match answer.parse() {
                Ok(classification) => return Ok(classification),
                Err(e) => self.say(&format!("{e}; use Movies or Shows"))?,
            }
        }
    }

    fn ask_year(&mut self, default: Option<u16>) -> Result<Option<u16>> {
        let default = default.map(|y| y.to_string()).unwrap_or_default();
        loop {
            let answer = self.ask("Year", &default)?;
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse() {
                Ok(year) => return Ok(Some(year)),
                Err(_) => self.say(&format!("{answer:?} is not a year"))?,
            }
        }
    }

    fn ask_subtitle(&mut self, current: Option<&Path>, candidates: &[PathBuf]) -> Result<Option<PathBuf>> {
        for (i, candidate) in candidates.iter().enumerate() {
            self.say(&format!("  {}) {}", i + 1, candidate.display()))?;
        }
        let default = current
            .or_else(|| candidates.first().map(PathBuf::as_path))
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let answer = self.ask("SRT file (- for none)", &default)?;
        if answer.is_empty() || answer == "-" {
            return Ok(None);
        }
        if let Ok(n) = answer.parse::<usize>() {
            if let Some(candidate) = n.checked_sub(1).and_then(|i| candidates.get(i)) {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(Some(PathBuf::from(answer)))
    }
}

impl<R: BufRead, W: Write> Confirmer for Interactive<R, W> {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Result<Decision> {
        let candidate = request.candidate;
        if request.unresolved {
            self.say("Collection, name and year are all required (plus season and episode for shows).")?;
        } else {
            self.say(&format!("[{}/{}]", request.index + 1, request.total))?;
            let answer = self.ask(&format!("Import {}? (y/n)", candidate.path.display()), "y")?;
            if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
                return Ok(Decision::Skip);
            }
        }

        let mut confirmation = Confirmation::from_candidate(candidate);
        confirmation.classification = self.ask_classification(confirmation.classification)?;
        match confirmation.classification {
            Classification::Movie => {
                let title = confirmation.title.clone().unwrap_or_default();
                confirmation.title = non_empty(self.ask("Title", &title)?);
            }
            Classification::Series => {
                let series = confirmation.series.clone().unwrap_or_default();
                confirmation.series = non_empty(self.ask("Series", &series)?);
                let season = confirmation.season.clone().unwrap_or_else(|| "01".to_string());
                confirmation.season = non_empty(self.ask("Season", &season)?);
                let episode = confirmation.episode.clone().unwrap_or_else(|| "S01E01".to_string());
                confirmation.episode = non_empty(self.ask("Episode", &episode)?);
            }
        }
        confirmation.year = self.ask_year(confirmation.year)?;

        if !candidate.has_embedded_subtitles {
            confirmation.subtitle =
                self.ask_subtitle(confirmation.subtitle.as_deref(), request.subtitle_candidates)?;
        }

        Ok(Decision::Import(confirmation))
    }
}
