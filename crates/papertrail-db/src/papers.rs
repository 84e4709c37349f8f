//! Paper store.
//!
//! Holds the authoritative, oldest-first list of papers together with the
//! set of known ids. `merge` is the only mutation path.

use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use papertrail_common::Paper;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// What a call to [`PaperStore::merge`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Papers appended from the batch.
    pub added: usize,
    /// Oldest papers evicted to stay within capacity.
    pub dropped: usize,
    /// Whether the collection was written to disk.
    pub persisted: bool,
}

/// Bounded, persisted collection of papers.
///
/// Invariants: every id in `papers` is in `paper_ids` and vice versa, ids are
/// unique, and `papers.len() <= max_papers` after any merge.
#[derive(Debug)]
pub struct PaperStore {
    path: PathBuf,
    max_papers: usize,
    papers: Vec<Paper>,
    paper_ids: HashSet<String>,
}

impl PaperStore {
    /// Empty store backed by `path`. Nothing is read or written.
    pub fn empty(path: impl Into<PathBuf>, max_papers: usize) -> Self {
        Self {
            path: path.into(),
            max_papers,
            papers: Vec::new(),
            paper_ids: HashSet::new(),
        }
    }

    /// Load the persisted collection.
    ///
    /// A missing, unreadable or corrupt file yields an empty store; the
    /// error is logged and never returned.
    pub fn load(path: impl Into<PathBuf>, max_papers: usize) -> Self {
        let mut store = Self::empty(path, max_papers);

        let papers = match read_papers(&store.path) {
            Ok(Some(papers)) => papers,
            Ok(None) => {
                info!(path = %store.path.display(), "No persisted papers, starting empty");
                return store;
            }
            Err(e) => {
                warn!(path = %store.path.display(), error = %e, "Could not load persisted papers, starting empty");
                return store;
            }
        };

        let on_disk = papers.len();
        for paper in papers {
            if store.paper_ids.insert(paper.id.clone()) {
                store.papers.push(paper);
            } else {
                warn!(id = %paper.id, "Dropping duplicate paper id found on disk");
            }
        }
        for evicted in keep_last(&mut store.papers, max_papers) {
            store.paper_ids.remove(&evicted.id);
        }

        info!(
            path = %store.path.display(),
            on_disk,
            loaded = store.papers.len(),
            "Loaded persisted papers"
        );
        store
    }

    /// O(1) membership test on the paper id.
    pub fn contains(&self, id: &str) -> bool {
        self.paper_ids.contains(id)
    }

    /// Append `new_papers`, evict the oldest beyond capacity and persist.
    ///
    /// Papers whose id is already stored (or repeated within the batch) are
    /// ignored. When nothing new remains the store is untouched and no write
    /// happens. The file is replaced atomically; if the write fails both the
    /// in-memory state and the previous file are left as they were.
    pub fn merge(&mut self, new_papers: Vec<Paper>) -> Result<MergeOutcome> {
        let mut batch_ids = HashSet::new();
        let fresh: Vec<Paper> = new_papers
            .into_iter()
            .filter(|p| !self.paper_ids.contains(&p.id) && batch_ids.insert(p.id.clone()))
            .collect();

        if fresh.is_empty() {
            debug!("Merge batch contained no new papers, nothing to persist");
            return Ok(MergeOutcome::default());
        }

        let added = fresh.len();
        let mut next = Vec::with_capacity(self.papers.len() + added);
        next.extend(self.papers.iter().cloned());
        next.extend(fresh);
        let evicted = keep_last(&mut next, self.max_papers);

        self.persist(&next)?;

        self.paper_ids = next.iter().map(|p| p.id.clone()).collect();
        self.papers = next;

        info!(
            added,
            dropped = evicted.len(),
            total = self.papers.len(),
            "Merged papers into store"
        );

        Ok(MergeOutcome {
            added,
            dropped: evicted.len(),
            persisted: true,
        })
    }

    /// Current collection, oldest first.
    pub fn snapshot(&self) -> &[Paper] {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn max_papers(&self) -> usize {
        self.max_papers
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, papers: &[Paper]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, papers)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(path = %self.path.display(), papers = papers.len(), "Persisted papers");
        Ok(())
    }
}

/// `Ok(None)` when the file does not exist.
fn read_papers(path: &Path) -> Result<Option<Vec<Paper>>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Truncate to the last `max` entries, returning the evicted ones in order.
fn keep_last(papers: &mut Vec<Paper>, max: usize) -> Vec<Paper> {
    let excess = papers.len().saturating_sub(max);
    papers.drain(..excess).collect()
}

/// Make sure the directory that will hold `papers_path` exists.
///
/// A regular file squatting on the directory path is removed first.
pub fn ensure_data_dir(papers_path: &Path) -> std::io::Result<()> {
    let Some(dir) = papers_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };

    if dir.is_file() {
        warn!(dir = %dir.display(), "Data directory path exists as a file, replacing it");
        fs::remove_file(dir)?;
    }
    if !dir.exists() {
        info!(dir = %dir.display(), "Creating data directory");
    }
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrail_common::Candidate;
    use pretty_assertions::assert_eq;

    fn paper(id: &str, keyword: &str) -> Paper {
        Paper::new(
            Candidate {
                id: id.to_string(),
                title: format!("Title {id}"),
                summary: "abstract".to_string(),
                published: "2024-01-01T00:00:00Z".to_string(),
            },
            format!("Summary of {id}"),
            keyword,
        )
    }

    fn ids(store: &PaperStore) -> Vec<&str> {
        store.snapshot().iter().map(|p| p.id.as_str()).collect()
    }

    fn assert_ids_in_sync(store: &PaperStore) {
        assert_eq!(store.paper_ids.len(), store.papers.len());
        for p in &store.papers {
            assert!(store.contains(&p.id));
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PaperStore::load(dir.path().join("papers.json"), 5);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        fs::write(&path, "[{\"id\": \"truncated").unwrap();

        let store = PaperStore::load(&path, 5);
        assert!(store.is_empty());
        assert_ids_in_sync(&store);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");

        let mut store = PaperStore::load(&path, 10);
        store.merge(vec![paper("a", "robotics"), paper("b", "robotics"), paper("c", "vision")]).unwrap();

        let reloaded = PaperStore::load(&path, 10);
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_ids_in_sync(&reloaded);
    }

    #[test]
    fn test_merge_known_ids_is_noop_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");

        let mut store = PaperStore::load(&path, 10);
        store.merge(vec![paper("a", "k"), paper("b", "k")]).unwrap();
        fs::remove_file(&path).unwrap();

        let outcome = store.merge(vec![paper("b", "k"), paper("a", "k")]).unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_ids_in_sync(&store);
        assert!(!path.exists(), "no write expected for an all-known batch");
    }

    #[test]
    fn test_merge_empty_batch_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");

        let mut store = PaperStore::load(&path, 10);
        let outcome = store.merge(Vec::new()).unwrap();
        assert!(!outcome.persisted);
        assert!(!path.exists());
    }

    #[test]
    fn test_merge_drops_duplicates_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PaperStore::load(dir.path().join("papers.json"), 10);

        let outcome = store.merge(vec![paper("a", "k1"), paper("a", "k2"), paper("b", "k1")]).unwrap();
        assert_eq!(outcome.added, 2);
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.snapshot()[0].keyword, "k1");
        assert_ids_in_sync(&store);
    }

    #[test]
    fn test_bound_keeps_most_recent_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PaperStore::load(dir.path().join("papers.json"), 4);
        assert_eq!(store.max_papers(), 4);

        let mut appended: Vec<String> = Vec::new();
        for round in 0..6 {
            let batch: Vec<Paper> = (0..round + 1)
                .map(|i| paper(&format!("r{round}-{i}"), "k"))
                .collect();
            appended.extend(batch.iter().map(|p| p.id.clone()));
            store.merge(batch).unwrap();

            assert!(store.len() <= 4);
            let expected: Vec<&str> = appended[appended.len().saturating_sub(4)..]
                .iter()
                .map(String::as_str)
                .collect();
            assert_eq!(ids(&store), expected);
            assert_ids_in_sync(&store);
        }
    }

    #[test]
    fn test_evicted_id_can_be_rediscovered() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PaperStore::load(dir.path().join("papers.json"), 2);

        store.merge(vec![paper("a", "k"), paper("b", "k"), paper("c", "k")]).unwrap();
        assert!(!store.contains("a"));
        assert_eq!(ids(&store), vec!["b", "c"]);
    }

    #[test]
    fn test_two_cycle_scenario_with_cap_of_five() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        let mut store = PaperStore::load(&path, 5);

        store.merge(vec![paper("p1", "robotics"), paper("p2", "robotics"), paper("p3", "robotics")]).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(PaperStore::load(&path, 5).len(), 3);

        let outcome = store
            .merge(vec![paper("p4", "robotics"), paper("p2", "robotics"), paper("p5", "robotics"), paper("p6", "robotics")])
            .unwrap();
        assert_eq!(outcome, MergeOutcome { added: 3, dropped: 1, persisted: true });
        assert_eq!(ids(&store), vec!["p2", "p3", "p4", "p5", "p6"]);

        let reloaded = PaperStore::load(&path, 5);
        assert_eq!(ids(&reloaded), vec!["p2", "p3", "p4", "p5", "p6"]);
    }

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let mut store = PaperStore::empty(blocker.join("papers.json"), 5);
        let err = store.merge(vec![paper("a", "k")]);
        assert!(err.is_err());
        assert!(store.is_empty());
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_failed_rename_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");

        let mut store = PaperStore::load(&path, 5);
        store.merge(vec![paper("a", "k"), paper("b", "k")]).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // Trailing slash: the temp file is written, then the rename onto a
        // regular file fails with ENOTDIR.
        store.path = PathBuf::from(format!("{}/", path.display()));
        assert!(store.merge(vec![paper("c", "k")]).is_err());

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert!(!store.contains("c"));
        assert_ids_in_sync(&store);

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temp file should be cleaned up");
        assert_eq!(ids(&PaperStore::load(&path, 5)), vec!["a", "b"]);
    }

    #[test]
    fn test_load_deduplicates_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        let on_disk = vec![paper("a", "k"), paper("b", "k"), paper("a", "k"), paper("c", "k")];
        fs::write(&path, serde_json::to_string(&on_disk).unwrap()).unwrap();

        let store = PaperStore::load(&path, 2);
        assert_eq!(ids(&store), vec!["b", "c"]);
        assert_ids_in_sync(&store);
    }

    #[test]
    fn test_ensure_data_dir_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("papers");
        fs::write(&data_dir, "stray").unwrap();

        ensure_data_dir(&data_dir.join("papers.json")).unwrap();
        assert!(data_dir.is_dir());

        // idempotent
        ensure_data_dir(&data_dir.join("papers.json")).unwrap();
        assert!(data_dir.is_dir());
    }
}
