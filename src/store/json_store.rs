use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::config::Config;

const COMPLETED_PREFIX: &str = "study_completed_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store entry {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-day key/value cache on disk. Each entry is one small JSON file named
/// after its key.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self, StoreError> {
        Self::with_base_dir(Config::data_dir())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir).map_err(|source| StoreError::Io {
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn completed_key(day: &str) -> String {
        format!("{COMPLETED_PREFIX}{day}")
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }

    /// Subjects already complete on `day`. A missing or unreadable entry
    /// reads as an empty set.
    pub fn load_completed(&self, day: &str) -> BTreeSet<String> {
        let path = self.file_path(&Self::completed_key(day));
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(list) => list.into_iter().collect(),
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "ignoring corrupt completed cache");
                    BTreeSet::new()
                }
            },
            Err(_) => BTreeSet::new(),
        }
    }

    pub fn save_completed(&self, day: &str, subjects: &BTreeSet<String>) -> Result<(), StoreError> {
        let list: Vec<&String> = subjects.iter().collect();
        self.save(&Self::completed_key(day), &list)
    }

    pub fn remove_completed(&self, day: &str) -> Result<(), StoreError> {
        let path = self.file_path(&Self::completed_key(day));
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    pub fn has_completed(&self, day: &str) -> bool {
        self.file_path(&Self::completed_key(day)).exists()
    }

    fn save<T: serde::Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), StoreError> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string(data).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        let io_err = |source: io::Error| StoreError::Io {
            path: tmp_path.clone(),
            source,
        };
        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io { path, source })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_day_is_empty() {
        let (_dir, store) = make_test_store();
        assert!(store.load_completed("2024-01-01").is_empty());
        assert!(!store.has_completed("2024-01-01"));
    }

    #[test]
    fn test_entry_is_json_array_under_day_key() {
        let (dir, store) = make_test_store();
        store
            .save_completed("2024-01-01", &set(&["수학", "영어"]))
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("study_completed_2024-01-01.json")).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains(&"수학".to_string()));

        assert_eq!(store.load_completed("2024-01-01"), set(&["수학", "영어"]));
    }

    #[test]
    fn test_days_are_partitioned() {
        let (_dir, store) = make_test_store();
        store.save_completed("2024-01-01", &set(&["국어"])).unwrap();
        assert!(store.load_completed("2024-01-02").is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = make_test_store();
        store.save_completed("2024-01-01", &set(&["국어"])).unwrap();
        store.remove_completed("2024-01-01").unwrap();
        assert!(!store.has_completed("2024-01-01"));
        store.remove_completed("2024-01-01").unwrap();
    }

    #[test]
    fn test_corrupt_entry_reads_empty() {
        let (dir, store) = make_test_store();
        fs::write(dir.path().join("study_completed_2024-01-01.json"), "{oops").unwrap();
        assert!(store.load_completed("2024-01-01").is_empty());
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let (dir, store) = make_test_store();
        store.save_completed("2024-01-01", &set(&["국어"])).unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }
}
