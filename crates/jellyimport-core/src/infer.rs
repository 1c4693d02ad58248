use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::media::Classification;

static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"S(\d\d)E\d\d").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"19\d\d|20[012]\d").unwrap());

const TOKEN_DELIMITERS: [char; 4] = ['.', ' ', '[', ']'];

/// What a single filename token contributes to the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Contains a plausible release year; ends the title
    Year(u16),
    /// Contains an episode code; ends the title
    Episode,
    /// ASCII word that belongs to the title
    Title,
    /// Non-ASCII token such as a language tag
    Dropped,
}

impl TokenClass {
    fn ends_title(self) -> bool {
        matches!(self, TokenClass::Year(_) | TokenClass::Episode)
    }
}

/// Classify one token. Checks run in priority order: year, episode, ASCII.
pub fn classify_token(token: &str) -> TokenClass {
    if let Some(m) = YEAR_RE.find(token) {
        if let Ok(year) = m.as_str().parse() {
            return TokenClass::Year(year);
        }
    }
    if EPISODE_RE.is_match(token) {
        return TokenClass::Episode;
    }
    if token.is_ascii() {
        TokenClass::Title
    } else {
        TokenClass::Dropped
    }
}

/// Metadata guessed from a filename alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredMetadata {
    pub classification: Option<Classification>,
    /// Movie title or series name
    pub name: Option<String>,
    pub year: Option<u16>,
    /// Two-digit season, e.g. "02"
    pub season: Option<String>,
    /// Full episode code, e.g. "S02E05"
    pub episode: Option<String>,
}

/// Split a filename stem into non-empty tokens.
pub fn tokenize(stem: &str) -> impl Iterator<Item = &str> {
    stem.split(TOKEN_DELIMITERS).filter(|t| !t.is_empty())
}

/// Infer series/movie metadata from a media path's filename.
pub fn infer(path: &Path) -> InferredMetadata {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let mut meta = InferredMetadata::default();
    match EPISODE_RE.captures(&file_name) {
        Some(caps) => {
            meta.classification = Some(Classification::Series);
            meta.season = caps.get(1).map(|m| m.as_str().to_string());
            meta.episode = caps.get(0).map(|m| m.as_str().to_string());
        }
        None => meta.classification = Some(Classification::Movie),
    }

    let mut title_tokens: Vec<&str> = Vec::new();
    for token in tokenize(&stem) {
        let class = classify_token(token);
        if let TokenClass::Year(year) = class {
            meta.year = Some(year);
        }
        if class.ends_title() {
            break;
        }
        if class == TokenClass::Title {
            title_tokens.push(token);
        }
    }
    meta.name = Some(title_tokens.join(" "));

    meta
}
