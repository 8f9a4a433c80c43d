//! Token storage backends
//!
//! In-memory storage for embedding and tests, and a JSON file so a command-line
//! session survives between invocations.

use msgdesk_core::{storage_error, DeskError, DeskResult, ErrorContext, TokenStorage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Process-local key-value storage
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with the given entries
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    fn lock(&self) -> DeskResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| storage_error!("Token storage lock poisoned", "memory_storage"))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> DeskResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, String)]) -> DeskResult<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> DeskResult<()> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Key-value storage backed by a single JSON object on disk
///
/// Every write rewrites the whole file through a temporary sibling, so a
/// reader never sees half of an update.
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileTokenStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> DeskResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let data = std::fs::read_to_string(&self.path).map_err(|e| DeskError::Storage {
            message: format!("Failed to read {}: {}", self.path.display(), e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("file_storage").with_operation("read"),
        })?;

        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&data).map_err(|e| DeskError::Storage {
            message: format!("Corrupt session file {}: {}", self.path.display(), e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("file_storage")
                .with_operation("parse")
                .with_suggestion("Delete the session file and log in again"),
        })
    }

    fn write_map(&self, map: &HashMap<String, String>) -> DeskResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Wrote {} keys to {}", map.len(), self.path.display());
        Ok(())
    }

    fn lock(&self) -> DeskResult<std::sync::MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|_| storage_error!("Session file lock poisoned", "file_storage"))
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> DeskResult<Option<String>> {
        let _guard = self.lock()?;
        Ok(self.read_map()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, String)]) -> DeskResult<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map().unwrap_or_default();
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        self.write_map(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> DeskResult<()> {
        let _guard = self.lock()?;
        if !self.path.exists() {
            return Ok(());
        }
        // A corrupt file is replaced rather than blocking the clear
        let mut map = self.read_map().unwrap_or_default();
        for key in keys {
            map.remove(*key);
        }
        self.write_map(&map)
    }
}
