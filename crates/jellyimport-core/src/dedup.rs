use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Content digest -> one representative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestIndex {
    entries: HashMap<String, PathBuf>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path under its digest. A later path replaces an earlier one.
    pub fn insert(&mut self, digest: String, path: PathBuf) -> Option<PathBuf> {
        self.entries.insert(digest, path)
    }

    pub fn get(&self, digest: &str) -> Option<&Path> {
        self.entries.get(digest).map(PathBuf::as_path)
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.entries.contains_key(digest)
    }

    pub fn remove(&mut self, digest: &str) -> Option<PathBuf> {
        self.entries.remove(digest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.values().cloned().collect();
        paths.sort();
        paths
    }
}

impl FromIterator<(String, PathBuf)> for DigestIndex {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// An import file whose content is already in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub digest: String,
    pub import_path: PathBuf,
    pub library_path: PathBuf,
}

/// Result of removing library content from an import index.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub kept: DigestIndex,
    /// Sorted by import path
    pub removed: Vec<Duplicate>,
}

impl DedupOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Remove every import entry whose digest is also present in the library.
pub fn dedup(mut import: DigestIndex, library: &DigestIndex) -> DedupOutcome {
    let shared: Vec<String> = import
        .entries
        .keys()
        .filter(|digest| library.contains(digest))
        .cloned()
        .collect();

    let mut removed = Vec::with_capacity(shared.len());
    for digest in shared {
        let (Some(import_path), Some(library_path)) = (import.remove(&digest), library.get(&digest))
        else {
            continue;
        };
        removed.push(Duplicate {
            library_path: library_path.to_path_buf(),
            import_path,
            digest,
        });
    }
    removed.sort_by(|a, b| a.import_path.cmp(&b.import_path));

    DedupOutcome {
        kept: import,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &str)]) -> DigestIndex {
        entries
            .iter()
            .map(|(d, p)| (d.to_string(), PathBuf::from(p)))
            .collect()
    }

    #[test]
    fn test_removes_exactly_the_intersection() {
        let import = index(&[("a", "/in/a.mkv"), ("b", "/in/b.mkv"), ("c", "/in/c.mkv")]);
        let library = index(&[("b", "/lib/b.mkv"), ("z", "/lib/z.mkv")]);

        let outcome = dedup(import, &library);
        assert_eq!(outcome.removed_count(), 1);
        assert_eq!(outcome.kept, index(&[("a", "/in/a.mkv"), ("c", "/in/c.mkv")]));
        assert_eq!(
            outcome.removed[0],
            Duplicate {
                digest: "b".to_string(),
                import_path: PathBuf::from("/in/b.mkv"),
                library_path: PathBuf::from("/lib/b.mkv"),
            }
        );
    }

    #[test]
    fn test_empty_library_keeps_everything() {
        let import = index(&[("a", "/in/a.mkv"), ("b", "/in/b.mkv")]);
        let outcome = dedup(import.clone(), &DigestIndex::new());
        assert_eq!(outcome.kept, import);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_empty_import_stays_empty() {
        let library = index(&[("a", "/lib/a.mkv")]);
        let outcome = dedup(DigestIndex::new(), &library);
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.removed_count(), 0);
    }

    #[test]
    fn test_full_overlap_empties_import() {
        let import = index(&[("a", "/in/2.mkv"), ("b", "/in/1.mkv")]);
        let library = index(&[("a", "/lib/a.mkv"), ("b", "/lib/b.mkv")]);
        let outcome = dedup(import, &library);
        assert!(outcome.kept.is_empty());
        let removed: Vec<_> = outcome.removed.iter().map(|d| d.import_path.clone()).collect();
        assert_eq!(removed, vec![PathBuf::from("/in/1.mkv"), PathBuf::from("/in/2.mkv")]);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut idx = DigestIndex::new();
        idx.insert("a".into(), PathBuf::from("/first.mkv"));
        let prev = idx.insert("a".into(), PathBuf::from("/second.mkv"));
        assert_eq!(prev, Some(PathBuf::from("/first.mkv")));
        assert_eq!(idx.get("a"), Some(Path::new("/second.mkv")));
        assert_eq!(idx.len(), 1);
    }
}
