use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{KvStore, StoreError, StoreResult};

/// Platform-local default location for the store file.
pub fn default_path() -> StoreResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("memspan-engine").join("store.json"))
        .ok_or_else(|| StoreError::Backend("no platform data directory".into()))
}

/// KV store persisted as one JSON object in a single file. The whole map is
/// cached in memory and rewritten on every mutation through a temp-file
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let cache = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), entries = cache.len(), "file store opened");
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn open_default() -> StoreResult<Self> {
        Self::open(default_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.cache.read().get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.cache.write();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.cache.write();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
