use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::media::{Classification, MediaCandidate};

/// Library-relative destination for a media file and its subtitle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CanonicalPath {
    pub media: PathBuf,
    pub subtitle: Option<PathBuf>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Relative media path, or None if a required field is missing.
fn media_path(candidate: &MediaCandidate) -> Option<PathBuf> {
    let year = candidate.year?;
    let suffix = candidate.suffix();
    match candidate.classification? {
        Classification::Series => {
            let series = present(&candidate.series)?;
            let season = present(&candidate.season)?;
            let episode = present(&candidate.episode)?;
            Some(
                Path::new(Classification::Series.collection_dir())
                    .join(format!("{series} ({year})"))
                    .join(format!("Season {season}"))
                    .join(format!("Episode {episode}{suffix}")),
            )
        }
        Classification::Movie => {
            let title = present(&candidate.title)?;
            Some(
                Path::new(Classification::Movie.collection_dir())
                    .join(format!("{title} ({year})"))
                    .join(format!("{title}{suffix}")),
            )
        }
    }
}

/// Replace the final extension of a media path with `.en.srt`.
pub fn subtitle_path_for(media: &Path) -> PathBuf {
    media.with_extension("en.srt")
}

/// Compute the canonical destination. Never returns a partially filled path.
pub fn resolve(candidate: &MediaCandidate) -> Option<CanonicalPath> {
    let media = media_path(candidate)?;
    let subtitle = candidate
        .srt_path
        .as_ref()
        .map(|_| subtitle_path_for(&media));
    Some(CanonicalPath { media, subtitle })
}

/// Order candidates for presentation: resolvable ones by destination, then
/// unresolved ones by source path.
pub fn sort_candidates(candidates: &mut [MediaCandidate]) {
    candidates.sort_by_cached_key(|c| {
        let dest = resolve(c).map(|p| p.media);
        (dest.is_none(), dest, c.path.clone())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> MediaCandidate {
        MediaCandidate {
            classification: Some(Classification::Series),
            series: Some("Show Name".to_string()),
            year: Some(2022),
            season: Some("02".to_string()),
            episode: Some("S02E05".to_string()),
            ..MediaCandidate::new(PathBuf::from("/in/Show.Name.S02E05.mkv"))
        }
    }

    fn movie(title: &str, year: u16) -> MediaCandidate {
        MediaCandidate {
            classification: Some(Classification::Movie),
            title: Some(title.to_string()),
            year: Some(year),
            ..MediaCandidate::new(PathBuf::from(format!("/in/{title}.mp4")))
        }
    }

    #[test]
    fn test_series_path() {
        let dest = resolve(&series()).unwrap();
        assert_eq!(
            dest.media,
            PathBuf::from("Shows/Show Name (2022)/Season 02/Episode S02E05.mkv")
        );
        assert_eq!(dest.subtitle, None);
    }

    #[test]
    fn test_movie_path_with_subtitle() {
        let candidate = MediaCandidate {
            srt_path: Some(PathBuf::from("/in/subs/eng.srt")),
            ..movie("Some Movie", 2019)
        };
        let dest = resolve(&candidate).unwrap();
        assert_eq!(dest.media, PathBuf::from("Movies/Some Movie (2019)/Some Movie.mp4"));
        assert_eq!(
            dest.subtitle,
            Some(PathBuf::from("Movies/Some Movie (2019)/Some Movie.en.srt"))
        );
    }

    #[test]
    fn test_incomplete_candidates_do_not_resolve() {
        let no_year = MediaCandidate { year: None, ..series() };
        assert_eq!(resolve(&no_year), None);

        let no_series = MediaCandidate { series: Some("  ".to_string()), ..series() };
        assert_eq!(resolve(&no_series), None);

        let no_episode = MediaCandidate { episode: None, ..series() };
        assert_eq!(resolve(&no_episode), None);

        let no_title = MediaCandidate { title: None, ..movie("X", 2000) };
        assert_eq!(resolve(&no_title), None);

        let unclassified = MediaCandidate::new(PathBuf::from("/in/a.mkv"));
        assert_eq!(resolve(&unclassified), None);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let a = series();
        assert_eq!(resolve(&a), resolve(&a.clone()));
    }

    #[test]
    fn test_subtitle_path_replaces_only_final_extension() {
        assert_eq!(
            subtitle_path_for(Path::new("Movies/Mr. Smith (1939)/Mr. Smith.mkv")),
            PathBuf::from("Movies/Mr. Smith (1939)/Mr. Smith.en.srt")
        );
        assert_eq!(
            subtitle_path_for(Path::new("Shows/A.B (2020)/Season 01/Episode S01E01.mp4")),
            PathBuf::from("Shows/A.B (2020)/Season 01/Episode S01E01.en.srt")
        );
    }

    #[test]
    fn test_sort_puts_unresolved_last() {
        let unresolved = MediaCandidate { year: None, ..movie("Aardvark", 2000) };
        let mut list = vec![unresolved.clone(), movie("Zulu", 1964), series(), movie("Alien", 1979)];
        sort_candidates(&mut list);
        let titles: Vec<_> = list
            .iter()
            .map(|c| c.title.clone().or(c.series.clone()).unwrap())
            .collect();
        assert_eq!(titles, vec!["Alien", "Zulu", "Show Name", "Aardvark"]);
    }
}
