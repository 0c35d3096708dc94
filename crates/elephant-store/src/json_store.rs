//! Durable JSON document store rooted at the data directory.
//!
//! Every write goes to a sibling `*.tmp` file, is fsynced, then renamed over
//! the target, so readers observe either the old or the new document and
//! never a partial one.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use elephant_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// JSON file store for documents under a single root directory.
///
/// All paths passed to its methods are relative to the root.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a root-relative path.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Read and parse a document.
    ///
    /// Missing files and unparsable documents both yield `None`; the latter
    /// is logged.
    pub async fn read<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Option<T> {
        let path = path.as_ref();
        match self.try_read(path).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "json_store: read failed");
                None
            }
        }
    }

    /// Read a document, distinguishing "missing" from "broken".
    ///
    /// Returns `Ok(None)` when the file does not exist and an error when it
    /// exists but cannot be read or parsed.
    pub async fn try_read<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<Option<T>> {
        let full_path = self.resolve(path);
        let bytes = match fs::read(&full_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage("read", full_path, e)),
        };
        let doc = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Serialization(format!("{}: {}", full_path.display(), e))
        })?;
        Ok(Some(doc))
    }

    /// Atomically replace a document with the pretty-printed JSON of `doc`.
    ///
    /// Parent directories are created as needed.
    pub async fn write<T>(&self, path: impl AsRef<Path>, doc: &T) -> Result<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        let full_path = self.resolve(path);
        let data = serde_json::to_vec_pretty(doc)?;
        debug!(path = %full_path.display(), size = data.len(), "json_store: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "json_store: create_dir_all failed");
                Error::storage("create_dir_all", parent, e)
            })?;
        }

        let temp_path = temp_sibling(&full_path);
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "json_store: File::create failed");
            Error::storage("create", &temp_path, e)
        })?;
        file.write_all(&data).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "json_store: write_all failed");
            Error::storage("write", &temp_path, e)
        })?;
        file.sync_all().await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "json_store: sync_all failed");
            Error::storage("sync", &temp_path, e)
        })?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "json_store: rename failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::storage("rename", full_path, e));
        }

        Ok(())
    }

    /// Whether a file exists at `path`.
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    /// Remove a document. Returns `false` when it was already absent.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<bool> {
        let full_path = self.resolve(path);
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!(path = %full_path.display(), error = %e, "json_store: remove failed");
                Err(Error::storage("remove", full_path, e))
            }
        }
    }

    /// File names in a directory. A missing directory lists as empty.
    ///
    /// Names that are not valid UTF-8 are skipped.
    pub async fn list_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let full_path = self.resolve(path);
        let mut entries = match fs::read_dir(&full_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage("read_dir", full_path, e)),
        };

        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if let Ok(name) = entry.file_name().into_string() {
                        names.push(name);
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(Error::storage("read_dir", full_path, e)),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a directory (and parents) under the root.
    pub async fn ensure_dir(&self, path: impl AsRef<Path>) -> Result<()> {
        let full_path = self.resolve(path);
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| Error::storage("create_dir_all", full_path, e))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
