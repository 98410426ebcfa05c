//! Local persistent key/value storage.
//!
//! Guests keep their cart and wishlist here, and the theme preference lives
//! here for everyone. Values are JSON strings under fixed keys, wrapped in the
//! `{"state": {"items": [...]}}` envelope for collections.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Fixed storage keys.
pub mod keys {
    /// Guest cart snapshot.
    pub const CART: &str = "aries-mall-cart";
    /// Guest wishlist snapshot.
    pub const WISHLIST: &str = "aries-mall-wishlist";
    /// Theme preference (`light` or `dark`).
    pub const THEME: &str = "theme";
    /// Persisted backend session.
    pub const SESSION: &str = "aries-mall-session";
}

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string key/value store that survives restarts.
pub trait LocalStore: Send + Sync {
    /// Returns the stored value, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes a value. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the change cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// `{"state": {"items": ...}}`
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    state: Items<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Items<T> {
    items: T,
}

/// Reads a collection snapshot. Missing or corrupt entries read as `None`.
pub fn read_snapshot<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str::<Envelope<T>>(&raw) {
        Ok(envelope) => Some(envelope.state.items),
        Err(e) => {
            warn!(key, error = %e, "Ignoring unreadable snapshot");
            None
        }
    }
}

/// Writes a collection snapshot.
///
/// # Errors
///
/// Returns `StorageError` if serialization or the write fails.
pub fn write_snapshot<T: Serialize>(
    store: &dyn LocalStore,
    key: &str,
    items: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(&Envelope {
        state: Items { items },
    })?;
    store.set(key, &raw)
}

/// Reads a plain JSON value.
pub fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    serde_json::from_str(&raw)
        .map_err(|e| warn!(key, error = %e, "Ignoring unreadable value"))
        .ok()
}

/// Writes a plain JSON value.
///
/// # Errors
///
/// Returns `StorageError` if serialization or the write fails.
pub fn write_json<T: Serialize>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    store.set(key, &serde_json::to_string(value)?)
}

// =============================================================================
// In-memory store
// =============================================================================

/// Volatile store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Store persisted as one JSON object in a file.
///
/// The whole map is rewritten on every change via a temp file and rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// File name inside the data directory.
    pub const FILE_NAME: &'static str = "local-storage.json";

    /// Opens (or creates) the store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the directory cannot be created or the
    /// existing file cannot be read. A corrupt file is treated as empty.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(Self::FILE_NAME);
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Local store is corrupt; starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.to_owned());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}
