use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::ReviewRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("failed to encode row: {0}")]
    Encode(#[from] csv::Error),
}

/// Keeps the first record seen for each `(username, text)` key, in order.
///
/// First-seen wins: a later record with the same key is dropped even if its
/// rating differs.
pub fn dedup_first_seen<I>(records: I) -> Vec<ReviewRecord>
where
    I: IntoIterator<Item = ReviewRecord>,
{
    let mut seen: HashSet<(String, String)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.username.clone(), r.text.clone())))
        .collect()
}

/// Unions `existing` (first) with `new` and deduplicates. Returns the final
/// dataset and how many rows the new records contributed.
pub fn merge(new: Vec<ReviewRecord>, existing: Option<Vec<ReviewRecord>>) -> (Vec<ReviewRecord>, usize) {
    let new = dedup_first_seen(new);
    match existing {
        None => {
            let added = new.len();
            (new, added)
        }
        Some(existing) => {
            let existing = dedup_first_seen(existing);
            let base = existing.len();
            let combined = dedup_first_seen(existing.into_iter().chain(new));
            let added = combined.len() - base;
            (combined, added)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing new was scraped; the file was left alone.
    Skipped,
    Created { total: usize },
    Updated { total: usize, added: usize },
}

impl MergeOutcome {
    pub fn summary(&self, path: &Path) -> String {
        match self {
            MergeOutcome::Skipped => "No data to save.".to_string(),
            MergeOutcome::Created { total } => {
                format!("New file created: '{}' with {} reviews.", path.display(), total)
            }
            MergeOutcome::Updated { total, added } => {
                format!("{} new reviews added. Total reviews now: {}", added, total)
            }
        }
    }
}

pub struct MergeStore {
    path: PathBuf,
}

impl MergeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MergeStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no dataset has been written yet.
    pub fn load(&self) -> Result<Option<Vec<ReviewRecord>>, StoreError> {
        if !self.path.exists() {
            info!("No existing dataset at {}. A new file will be created.", self.path.display());
            return Ok(None);
        }
        let read_err = |source| StoreError::Read { path: self.path.clone(), source };

        let mut rdr = csv::ReaderBuilder::new()
            .from_path(&self.path)
            .map_err(read_err)?;
        let mut records = Vec::new();
        for row in rdr.deserialize::<ReviewRecord>() {
            let record = row.map_err(read_err)?;
            if record.text.trim().is_empty() {
                warn!("Dropping stored row without review text");
                continue;
            }
            records.push(record);
        }
        info!("Loaded {} existing reviews from {}", records.len(), self.path.display());
        Ok(Some(records))
    }

    pub fn commit(
        &self,
        new: Vec<ReviewRecord>,
        existing: Option<Vec<ReviewRecord>>,
    ) -> Result<MergeOutcome, StoreError> {
        if new.is_empty() {
            return Ok(MergeOutcome::Skipped);
        }
        let had_file = existing.is_some();
        let (dataset, added) = merge(new, existing);
        self.save(&dataset)?;

        Ok(if had_file {
            MergeOutcome::Updated { total: dataset.len(), added }
        } else {
            MergeOutcome::Created { total: dataset.len() }
        })
    }

    /// Writes to a sibling temp file and renames it over the target, so readers
    /// never see a half-written dataset.
    pub fn save(&self, records: &[ReviewRecord]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write { path: self.path.clone(), source };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush().map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        sync_dir(&dir);

        info!("Saved {} reviews to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        warn!("Could not sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(user: &str, text: &str, rating: &str) -> ReviewRecord {
        ReviewRecord::new(user, text, rating)
    }

    fn keys(records: &[ReviewRecord]) -> HashSet<(String, String)> {
        records.iter().map(|x| (x.username.clone(), x.text.clone())).collect()
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let out = dedup_first_seen(vec![r("a", "x", "5"), r("b", "x", "4"), r("a", "x", "1")]);
        assert_eq!(out, vec![r("a", "x", "5"), r("b", "x", "4")]);
    }

    #[test]
    fn existing_records_win_ties() {
        let (out, added) = merge(vec![r("a", "x", "1"), r("c", "z", "3")], Some(vec![r("a", "x", "5")]));
        assert_eq!(out, vec![r("a", "x", "5"), r("c", "z", "3")]);
        assert_eq!(added, 1);
    }

    #[test]
    fn merge_with_itself_is_idempotent() {
        let data = vec![r("a", "x", "5"), r("b", "y", "4"), r("c", "z", "3")];
        let (out, added) = merge(data.clone(), Some(data.clone()));
        assert_eq!(out.len(), data.len());
        assert_eq!(keys(&out), keys(&data));
        assert_eq!(added, 0);
    }

    #[test]
    fn merged_count_is_key_union() {
        let a = vec![r("a", "x", "5"), r("b", "y", "4"), r("b", "y", "2")];
        let b = vec![r("b", "y", "1"), r("c", "z", "3"), r("a", "w", "3")];
        let expected: HashSet<_> = keys(&a).union(&keys(&b)).cloned().collect();
        let (out, _) = merge(b, Some(a));
        assert_eq!(out.len(), expected.len());
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        let store = MergeStore::new(&path);
        assert_eq!(store.commit(Vec::new(), None).unwrap(), MergeOutcome::Skipped);
        assert!(!path.exists());
    }

    #[test]
    fn first_run_creates_file_with_deduplicated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        let store = MergeStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let outcome = store
            .commit(vec![r("a", "x", "5"), r("a", "x", "5"), r("b", "y", "0")], None)
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Created { total: 2 });
        assert!(outcome.summary(&path).contains("New file created"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Username,Review,Rating\na,x,5\nb,y,0\n");
    }

    #[test]
    fn second_run_updates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::write(&path, "Username,Review,Rating\na,\"x, with comma\",5\n").unwrap();
        let store = MergeStore::new(&path);

        let existing = store.load().unwrap();
        assert_eq!(existing.as_ref().map(Vec::len), Some(1));

        let outcome = store
            .commit(vec![r("a", "x, with comma", "2"), r("c", "z", "4")], existing)
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Updated { total: 2, added: 1 });

        let reloaded = store.load().unwrap().unwrap();
        assert_eq!(reloaded, vec![r("a", "x, with comma", "5"), r("c", "z", "4")]);
    }

    #[test]
    fn directory_sync_failure_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        sync_dir(&dir.path().join("gone"));
        sync_dir(dir.path());
    }

    #[test]
    fn unreadable_existing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::write(&path, "Username,Review,Rating\na,b,c,d\n").unwrap();
        assert!(matches!(MergeStore::new(&path).load(), Err(StoreError::Read { .. })));
    }
}
