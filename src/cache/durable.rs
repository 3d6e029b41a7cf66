//! Durable tier for the record cache.
//!
//! [`DurableStore`] is the seam between the cache and whatever key-value
//! persistence the process has available. Keys are flat strings with the
//! `catalog_item_` prefix; values are the serialized cache entry JSON.
//! Two implementations ship with the crate:
//!
//! - [`FsStore`] — one file per key under a cache directory (default
//!   `~/.cache/hamstr`), written atomically via tmp + rename.
//! - [`MemoryStore`] — a plain in-process map, for tests and for callers
//!   that want the two-tier shape without touching disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::{HamstrError, Result};

/// Key prefix for all cache entries in the durable tier.
pub const KEY_PREFIX: &str = "catalog_item_";

/// Durable key for a catalog item ID.
pub(crate) fn durable_key(id: u32) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Key-value persistence for cache entries.
///
/// All operations are fallible; the cache treats per-entry failures as
/// misses and never surfaces them to its callers.
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value under `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys carrying the [`KEY_PREFIX`].
    fn keys(&self) -> Result<Vec<String>>;
}

/// File-per-key durable store.
///
/// Each key lives at `<dir>/<key>.json`. Writes go to a tmp file first
/// and are renamed into place so a crash never leaves a half-written
/// entry behind.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Create a store rooted at the default cache directory
    /// (`~/.cache/hamstr`, or `.cache/hamstr` when the platform has no
    /// cache dir).
    pub fn new() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("hamstr");
        Self::with_dir(dir)
    }

    /// Create a store rooted at a custom directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Default for FsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore for FsStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HamstrError::Storage(format!("failed to read {key}: {e}"))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            HamstrError::Storage(format!(
                "failed to create cache dir {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value).map_err(|e| {
            HamstrError::Storage(format!(
                "failed to write {}: {e}",
                tmp_path.display()
            ))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            HamstrError::Storage(format!(
                "failed to rename {} → {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HamstrError::Storage(format!(
                "failed to remove {key}: {e}"
            ))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HamstrError::Storage(format!(
                    "failed to list {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "skipping unreadable dir entry");
                    continue;
                }
            };
            if let Some(key) = key_from_file_name(&entry.path()) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// Extract the durable key from a store file path, filtering out tmp
/// files and anything without the prefix.
fn key_from_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let key = name.strip_suffix(".json")?;
    key.starts_with(KEY_PREFIX).then(|| key.to_string())
}

/// In-process durable store.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| HamstrError::Storage("store mutex poisoned".into()))
    }
}

impl DurableStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(KEY_PREFIX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set_item("catalog_item_1", "payload").unwrap();
        assert_eq!(
            store.get_item("catalog_item_1").unwrap().as_deref(),
            Some("payload")
        );
        store.remove_item("catalog_item_1").unwrap();
        assert!(store.get_item("catalog_item_1").unwrap().is_none());
    }

    #[test]
    fn memory_store_keys_filters_prefix() {
        let store = MemoryStore::new();
        store.set_item("catalog_item_5", "a").unwrap();
        store.set_item("unrelated", "b").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["catalog_item_5".to_string()]);
    }

    #[test]
    fn remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove_item("catalog_item_999").is_ok());
    }

    #[test]
    fn key_from_file_name_rejects_tmp_and_foreign_files() {
        assert_eq!(
            key_from_file_name(Path::new("/x/catalog_item_7.json")),
            Some("catalog_item_7".to_string())
        );
        assert_eq!(
            key_from_file_name(Path::new("/x/catalog_item_7.json.tmp")),
            None
        );
        assert_eq!(key_from_file_name(Path::new("/x/other.json")), None);
    }
}
