//! Draft persistence.
//!
//! The whole form is stored as one JSON value under [`DRAFT_KEY`] in an
//! injected [`KeyValueStorage`]. Saving overwrites the previous draft. Both
//! directions are best-effort: failures are logged and otherwise ignored.

use crate::types::FormDraft;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Storage key of the autosaved draft
pub const DRAFT_KEY: &str = "formData";

/// Storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("storage I/O failed for key {key:?}: {source}")]
    Io {
        /// Key being accessed
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The stored draft could not be encoded or decoded
    #[error("draft codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Storage refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key/value storage, the shape of browser local storage
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value, `Ok(None)` when the key is absent
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory storage
///
/// Clones share the same entries, so a test can keep one clone to inspect
/// what the store wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed storage: one `<key>.json` file per key under a directory
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`, created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Write then rename so a crash never leaves half a draft behind
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

/// Loads and saves the single form draft
#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl DraftStore {
    /// Draft store over `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Last saved draft, or `None`
    ///
    /// Storage and decoding failures are logged and reported as `None`, so
    /// the form simply starts empty.
    #[must_use]
    pub fn load(&self) -> Option<FormDraft> {
        match self.try_load() {
            Ok(draft) => draft,
            Err(error) => {
                tracing::warn!(%error, key = DRAFT_KEY, "Failed to restore draft, starting empty");
                None
            },
        }
    }

    /// Persists `draft`, overwriting the previous one
    ///
    /// Failures are logged and dropped.
    pub fn save(&self, draft: &FormDraft) {
        if let Err(error) = self.try_save(draft) {
            tracing::warn!(%error, key = DRAFT_KEY, "Failed to autosave draft");
        }
    }

    /// Like [`load`](Self::load) but surfaces failures
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on storage or JSON failure.
    pub fn try_load(&self) -> Result<Option<FormDraft>, StorageError> {
        let Some(raw) = self.storage.get_item(DRAFT_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Like [`save`](Self::save) but surfaces failures
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on storage or JSON failure.
    pub fn try_save(&self, draft: &FormDraft) -> Result<(), StorageError> {
        let raw = serde_json::to_string(draft)?;
        self.storage.set_item(DRAFT_KEY, &raw)?;
        tracing::trace!(bytes = raw.len(), "Draft saved");
        Ok(())
    }
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore").field("key", &DRAFT_KEY).finish_non_exhaustive()
    }
}
