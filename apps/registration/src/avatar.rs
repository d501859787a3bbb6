//! Avatar uploads.
//!
//! A selected image becomes an [`AvatarHandle`]: an owned, cloneable
//! reference registered in an [`AvatarRegistry`]. The registry entry is
//! revoked when the last clone of the handle is dropped, so tearing down
//! the view (or replacing the upload) releases the image bytes.

use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Prefix of every handle reference
const REFERENCE_PREFIX: &str = "blob:confpass/";

/// A file chosen in the avatar picker
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name as reported by the picker
    pub name: String,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Creates a selected file
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, content_type_for(path), bytes))
    }
}

// Bytes are elided; an avatar can be megabytes
impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Why a selected file was not accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    /// The picker only accepts `image/*`
    #[error("{name} is not an image ({content_type})")]
    NotAnImage {
        /// File name
        name: String,
        /// Reported MIME type
        content_type: String,
    },

    /// Zero-byte file
    #[error("{name} is empty")]
    Empty {
        /// File name
        name: String,
    },
}

struct AvatarBlob {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Registry of live avatar handles
///
/// Cloning shares the registry.
#[derive(Clone, Default)]
pub struct AvatarRegistry {
    live: Arc<Mutex<HashMap<Uuid, Arc<AvatarBlob>>>>,
}

impl AvatarRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles not yet revoked
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    /// Whether `reference` names a live handle
    #[must_use]
    pub fn is_live(&self, reference: &str) -> bool {
        reference
            .strip_prefix(REFERENCE_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
            .is_some_and(|id| self.entries().contains_key(&id))
    }

    fn register(&self, blob: AvatarBlob) -> AvatarHandle {
        let id = Uuid::new_v4();
        let blob = Arc::new(blob);
        self.entries().insert(id, Arc::clone(&blob));
        tracing::debug!(%id, file = %blob.file_name, "Avatar handle created");

        AvatarHandle {
            inner: Arc::new(HandleInner {
                id,
                reference: format!("{REFERENCE_PREFIX}{id}"),
                blob,
                registry: self.clone(),
            }),
        }
    }

    fn revoke(&self, id: Uuid) {
        if self.entries().remove(&id).is_some() {
            tracing::debug!(%id, "Avatar handle revoked");
        }
    }

    // A poisoned lock still holds a consistent map: every mutation is a
    // single insert or remove.
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AvatarBlob>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for AvatarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

struct HandleInner {
    id: Uuid,
    reference: String,
    blob: Arc<AvatarBlob>,
    registry: AvatarRegistry,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

/// Revocable reference to an uploaded avatar
///
/// Clones share one registration. It is revoked when the last clone drops.
#[derive(Clone)]
pub struct AvatarHandle {
    inner: Arc<HandleInner>,
}

impl AvatarHandle {
    /// Opaque reference string, usable as a placeholder in the draft
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.inner.reference
    }

    /// Original file name
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.inner.blob.file_name
    }

    /// MIME type of the image
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.inner.blob.content_type
    }

    /// Size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.blob.bytes.len()
    }

    /// Always false: empty files are rejected at load time
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.blob.bytes.is_empty()
    }

    /// `data:` URL usable directly as an `<img src>`
    #[must_use]
    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.inner.blob.bytes);
        format!("data:{};base64,{encoded}", self.inner.blob.content_type)
    }
}

impl PartialEq for AvatarHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for AvatarHandle {}

impl fmt::Debug for AvatarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarHandle")
            .field("reference", &self.inner.reference)
            .field("file_name", &self.inner.blob.file_name)
            .field("len", &self.inner.blob.bytes.len())
            .finish()
    }
}

/// Turns picker selections into avatar handles
#[derive(Clone, Debug, Default)]
pub struct AvatarLoader {
    registry: AvatarRegistry,
}

impl AvatarLoader {
    /// Creates a loader that registers handles in `registry`
    #[must_use]
    pub const fn new(registry: AvatarRegistry) -> Self {
        Self { registry }
    }

    /// The registry handles are created in
    #[must_use]
    pub const fn registry(&self) -> &AvatarRegistry {
        &self.registry
    }

    /// Loads the picker selection
    ///
    /// `None` (picker dismissed) yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`AvatarError`] for non-image or empty files.
    pub fn load(&self, file: Option<SelectedFile>) -> Result<Option<AvatarHandle>, AvatarError> {
        let Some(file) = file else {
            return Ok(None);
        };

        if !file.content_type.starts_with("image/") {
            return Err(AvatarError::NotAnImage {
                name: file.name,
                content_type: file.content_type,
            });
        }

        if file.bytes.is_empty() {
            return Err(AvatarError::Empty { name: file.name });
        }

        Ok(Some(self.registry.register(AvatarBlob {
            file_name: file.name,
            content_type: file.content_type,
            bytes: file.bytes,
        })))
    }
}
