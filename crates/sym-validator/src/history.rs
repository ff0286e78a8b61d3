//! Capped validation history.

use std::io;
use std::path::{Path, PathBuf};

use sym_core::ValidationHistoryRecord;
use sym_core::fs::{DEFAULT_LOCK_TIMEOUT, FileLock, read_json_opt, write_json_atomic};
use tracing::debug;

use crate::errors::ValidatorError;

/// History file holding at most `limit` records, oldest first.
///
/// Appends run read → push → trim → atomic write under the file lock, so
/// concurrent writers in other processes never lose records.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
}

impl HistoryStore {
    /// Store at `path` keeping `limit` records (at least one).
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    /// History file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, dropping the oldest beyond the cap.
    pub async fn append(&self, record: ValidationHistoryRecord) -> Result<(), ValidatorError> {
        let path = self.path.clone();
        let limit = self.limit;
        self.blocking(move || {
            let _lock = FileLock::acquire(&path, DEFAULT_LOCK_TIMEOUT)?;
            let mut records: Vec<ValidationHistoryRecord> =
                read_json_opt(&path)?.unwrap_or_default();
            records.push(record);
            if records.len() > limit {
                let excess = records.len() - limit;
                let _ = records.drain(..excess);
            }
            write_json_atomic(&path, &records)?;
            debug!(path = %path.display(), count = records.len(), "history appended");
            Ok(())
        })
        .await
    }

    /// Stored records, oldest first. A missing file is an empty history.
    pub async fn load(&self) -> Result<Vec<ValidationHistoryRecord>, ValidatorError> {
        let path = self.path.clone();
        self.blocking(move || Ok(read_json_opt(&path)?.unwrap_or_default())).await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, ValidatorError>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let joined = tokio::task::spawn_blocking(f).await.map_err(io::Error::other);
        joined.and_then(|r| r).map_err(|source| ValidatorError::History {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sym_core::ValidationResult;

    fn record(checked: usize) -> ValidationHistoryRecord {
        let result = ValidationResult {
            checked,
            passed: checked,
            ..ValidationResult::default()
        };
        ValidationHistoryRecord::from_result(&result, vec![format!("f{checked}.js")])
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("h.json"), 50);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cap_drops_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join(".sym/history.json"), 50);
        for i in 1..=51 {
            store.append(record(i)).await.unwrap();
        }
        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 50);
        assert_eq!(records[0].checked, 2);
        assert_eq!(records[49].checked, 51);
        assert!(!dir.path().join(".sym/history.json.lock").exists());
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("h.json"), 50);
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append(record(i)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.load().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, "not json").unwrap();
        let err = HistoryStore::new(&path, 50).load().await.unwrap_err();
        assert!(matches!(err, ValidatorError::History { .. }));
    }
}
