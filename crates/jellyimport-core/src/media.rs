use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::infer::InferredMetadata;

/// Library collection a media file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Series,
    Movie,
}

impl Classification {
    /// Top-level library directory for this collection.
    pub fn collection_dir(self) -> &'static str {
        match self {
            Classification::Series => "Shows",
            Classification::Movie => "Movies",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_dir())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shows" | "show" | "series" | "tv" => Ok(Classification::Series),
            "movies" | "movie" | "film" => Ok(Classification::Movie),
            other => Err(format!("unknown collection: {other:?}")),
        }
    }
}

/// A media file being considered for import.
///
/// Each stage takes the candidate by value and returns the enriched one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    /// Source file
    pub path: PathBuf,
    /// Companion subtitle chosen for import
    pub srt_path: Option<PathBuf>,
    pub classification: Option<Classification>,
    /// Movie title
    pub title: Option<String>,
    /// Series name
    pub series: Option<String>,
    pub year: Option<u16>,
    /// Two-digit season, e.g. "01"
    pub season: Option<String>,
    /// Episode code, e.g. "S01E03"
    pub episode: Option<String>,
    pub has_embedded_subtitles: bool,
}

impl MediaCandidate {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            srt_path: None,
            classification: None,
            title: None,
            series: None,
            year: None,
            season: None,
            episode: None,
            has_embedded_subtitles: false,
        }
    }

    pub fn with_inference(self, inferred: InferredMetadata) -> Self {
        let (title, series) = match inferred.classification {
            Some(Classification::Series) => (None, inferred.name),
            _ => (inferred.name, None),
        };
        Self {
            classification: inferred.classification,
            title,
            series,
            year: inferred.year,
            season: inferred.season,
            episode: inferred.episode,
            ..self
        }
    }

    pub fn with_embedded_subtitles(self, has_embedded_subtitles: bool) -> Self {
        Self {
            has_embedded_subtitles,
            ..self
        }
    }

    /// Replace the metadata with the operator's confirmed values.
    pub fn confirmed(self, confirmation: Confirmation) -> Self {
        let (title, series, season, episode) = match confirmation.classification {
            Classification::Movie => (confirmation.title, None, None, None),
            Classification::Series => (
                None,
                confirmation.series,
                confirmation.season,
                confirmation.episode,
            ),
        };
        Self {
            classification: Some(confirmation.classification),
            title,
            series,
            year: confirmation.year,
            season,
            episode,
            srt_path: confirmation.subtitle,
            ..self
        }
    }

    /// File extension including the dot, or empty.
    pub fn suffix(&self) -> String {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Final metadata for one candidate, as approved by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub classification: Classification,
    pub title: Option<String>,
    pub series: Option<String>,
    pub year: Option<u16>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub subtitle: Option<PathBuf>,
}

impl Confirmation {
    /// Pre-fill from what the candidate currently holds. Unknown collections
    /// default to movies.
    pub fn from_candidate(candidate: &MediaCandidate) -> Self {
        Self {
            classification: candidate.classification.unwrap_or(Classification::Movie),
            title: candidate.title.clone(),
            series: candidate.series.clone(),
            year: candidate.year,
            season: candidate.season.clone(),
            episode: candidate.episode.clone(),
            subtitle: candidate.srt_path.clone(),
        }
    }
}
