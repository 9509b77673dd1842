//! File-backed [`LocalStore`]: a flat JSON object of string keys and values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use seed_core::{ChatError, ChatResult, LocalStore};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or unreadable file yields an empty
    /// store; the file is (re)written on the first `set`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt local storage {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!("Local storage {:?} opened with {} keys", path, values.len());
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> ChatResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChatError::storage(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| ChatError::storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ChatError::storage(e.to_string()))?;
        Ok(())
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> ChatResult<()> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::{SID_KEY, THEME_KEY};
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("local_storage.json");

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get(SID_KEY), None);
        store.set(SID_KEY, "1700000000000").unwrap();
        store.set(THEME_KEY, "dark").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(SID_KEY).as_deref(), Some("1700000000000"));
        assert_eq!(reopened.get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");
        std::fs::write(&path, "not json").unwrap();

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get(SID_KEY), None);
        store.set(SID_KEY, "42").unwrap();
        assert_eq!(JsonFileStore::open(&path).get(SID_KEY).as_deref(), Some("42"));
    }
}
