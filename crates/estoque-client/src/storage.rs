//! # Preference Storage
//!
//! The storage port the UI providers persist through, plus two adapters.
//!
//! ## Keys
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Key                     │ Values              │ Written by             │
//! │  ─────────────────────── │ ─────────────────── │ ────────────────────── │
//! │  estoque.language        │ "pt-BR" "en" "es"   │ LocaleProvider         │
//! │  estoque.sidebar-open    │ "true" / "false"    │ SidebarProvider        │
//! │  estoque.theme           │ "light" / "dark"    │ ThemeProvider          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent writers (two CLI invocations, two windows) are not
//! coordinated: the last write wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::StorageError;

pub const LANGUAGE_KEY: &str = "estoque.language";
pub const SIDEBAR_OPEN_KEY: &str = "estoque.sidebar-open";
pub const THEME_KEY: &str = "estoque.theme";

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string key/value storage.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store; the test double and the fallback when no data
/// directory exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with values, as if persisted earlier.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.values.lock().unwrap_or_else(PoisonError::into_inner);
            for (k, v) in values {
                map.insert(k.to_string(), v.to_string());
            }
        }
        store
    }

    /// Number of `set` / `remove` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_write(&self) {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let map = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.record_write();
        let mut map = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.record_write();
        let mut map = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(key);
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// JSON object of strings on disk, re-read on every access.
///
/// Re-reading keeps a long-lived process in step with writes made by another
/// process; writes go to a temp file first and are renamed into place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn read_all(&self) -> StorageResult<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let contents = serde_json::to_string_pretty(values).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, contents).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.io_error(e)
        })?;

        debug!(path = ?self.path, "Preferences written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_all()?;
        apply(&mut values);
        self.write_all(&values)
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("estoque-test-{}", uuid::Uuid::new_v4()))
            .join("preferences.json")
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::with_values([(LANGUAGE_KEY, "en")]);
        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("en"));
        assert_eq!(store.write_count(), 0);

        store.set(THEME_KEY, "dark").unwrap();
        store.remove(LANGUAGE_KEY).unwrap();
        assert_eq!(store.get(LANGUAGE_KEY).unwrap(), None);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_file_store_round_trip_between_instances() {
        let path = temp_path();
        let first = FileStore::new(&path);
        assert_eq!(first.get(SIDEBAR_OPEN_KEY).unwrap(), None);

        first.set(SIDEBAR_OPEN_KEY, "true").unwrap();
        first.set(LANGUAGE_KEY, "es").unwrap();

        let second = FileStore::new(&path);
        assert_eq!(second.get(SIDEBAR_OPEN_KEY).unwrap().as_deref(), Some("true"));

        second.remove(LANGUAGE_KEY).unwrap();
        assert_eq!(first.get(LANGUAGE_KEY).unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(
            store.get(LANGUAGE_KEY),
            Err(StorageError::Corrupt { .. })
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
