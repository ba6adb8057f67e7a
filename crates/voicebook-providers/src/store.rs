//! Small transactional JSON file store.
//!
//! Both the OAuth state set and the stored credential live in single JSON
//! files. [`JsonFileStore`] gives them the same semantics:
//!
//! - reads never fail: a missing or unparsable file reads as absent
//! - writes go to a temp file that is renamed over the target, so readers
//!   never observe a half-written file
//! - [`JsonFileStore::update`] holds an exclusive lock on a sidecar
//!   `<file>.lock` for the whole load-modify-save, across threads and
//!   processes

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// A JSON document persisted at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

/// Exclusive lock on a store, released on drop.
#[derive(Debug)]
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. Missing and corrupt files both yield `None`.
    pub fn load(&self) -> Option<T> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file not found");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read store file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt store file");
                None
            }
        }
    }

    /// Replaces the document.
    pub fn save(&self, value: &T) -> ProviderResult<()> {
        let _lock = self.lock()?;
        self.write(value)
    }

    /// Removes the document. Returns whether a file was deleted.
    pub fn clear(&self) -> ProviderResult<bool> {
        let _lock = self.lock()?;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed store file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ProviderError::storage(format!(
                "failed to remove {}",
                self.path.display()
            ))
            .with_source(e)),
        }
    }

    /// Runs a locked load-modify-save.
    ///
    /// `f` sees the current document (or `T::default()` when absent or
    /// corrupt). The file is only rewritten when `f` changed the value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> ProviderResult<R>
    where
        T: Default + Clone + PartialEq,
    {
        let _lock = self.lock()?;
        let mut value = self.load().unwrap_or_default();
        let before = value.clone();
        let result = f(&mut value);
        if value != before {
            self.write(&value)?;
        }
        Ok(result)
    }

    fn lock(&self) -> ProviderResult<StoreLock> {
        self.ensure_parent()?;
        let lock_path = sibling(&self.path, ".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                ProviderError::storage(format!("failed to open {}", lock_path.display()))
                    .with_source(e)
            })?;
        file.lock().map_err(|e| {
            ProviderError::storage(format!("failed to lock {}", lock_path.display()))
                .with_source(e)
        })?;
        Ok(StoreLock { file })
    }

    fn ensure_parent(&self) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create {}", parent.display()))
                    .with_source(e)
            })?;
        }
        Ok(())
    }

    fn write(&self, value: &T) -> ProviderResult<()> {
        let content = serde_json::to_string_pretty(value).map_err(|e| {
            ProviderError::internal(format!("failed to serialize {}", self.path.display()))
                .with_source(e)
        })?;

        let temp_path = sibling(&self.path, ".tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::storage(format!("failed to write {}", temp_path.display()))
                .with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to replace {}", self.path.display()))
                .with_source(e)
        })?;

        debug!(path = %self.path.display(), "saved store file");
        Ok(())
    }
}

/// `dir/name.json` -> `dir/name.json<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
