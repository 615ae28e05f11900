//! Key-value persistence backends for the progress record.
//!
//! The engine only needs `read` and `write` of opaque bytes under a key.
//! Two backends are provided: an in-memory map (tests, embedding) and a
//! directory of files, one file per key.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{PyshotError, Result};

/// External key-value storage consumed by the progress store.
pub trait KeyValueStore: Send {
    /// Reads the bytes stored under `key`, or `None` if nothing is stored.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Volatile storage backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Storage in a directory, one `<key>.json` file per key.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PyshotError::persistence(
                key,
                format!("cannot read '{}': {e}", path.display()),
            )),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        std::fs::create_dir_all(&self.dir)
            .and_then(|()| std::fs::write(&tmp, bytes))
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| {
                PyshotError::persistence(key, format!("cannot write '{}': {e}", path.display()))
            })
    }
}
