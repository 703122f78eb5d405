//! File store backed by a local directory.
//!
//! Store paths are resolved under the configured root. Absolute paths and
//! `..` segments are rejected outright, and every resolved path (or, for a
//! path that does not exist yet, its nearest existing ancestor) must
//! canonicalize to somewhere under the canonical root, so symlinks cannot
//! lead out of it either.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use workbench_core::{paths, DirEntry, FileStore, NodeKind, RemoteError};

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem.
    fn resolve(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let path = paths::normalize(path);
        if path == paths::ROOT {
            return Ok(self.root.clone());
        }
        let relative = Path::new(&path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(RemoteError::rejected(format!(
                        "{path} escapes the store root"
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// [`Self::resolve`], then follow symlinks and check the result is
    /// still under the root.
    async fn confine(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let resolved = self.resolve(path)?;
        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| io_err(paths::ROOT, e))?;

        let mut existing = resolved.as_path();
        let real = loop {
            match tokio::fs::canonicalize(existing).await {
                Ok(real) => break real,
                Err(err) if err.kind() == io::ErrorKind::NotFound => match existing.parent() {
                    Some(parent) => existing = parent,
                    None => return Err(io_err(path, err)),
                },
                Err(err) => return Err(io_err(path, err)),
            }
        };
        if !real.starts_with(&root) {
            tracing::warn!(path = %path, target = %real.display(), "path escapes the store root");
            return Err(RemoteError::rejected(format!("{path} escapes the store root")));
        }
        Ok(resolved)
    }
}

/// Translate an I/O failure on `path` into the remote error vocabulary.
fn io_err(path: &str, err: io::Error) -> RemoteError {
    match err.kind() {
        io::ErrorKind::NotFound => RemoteError::not_found(path),
        io::ErrorKind::AlreadyExists => RemoteError::rejected(format!("{path} already exists")),
        _ => RemoteError::rejected(format!("{path}: {err}")),
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        let dir = self.confine(path).await?;
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_err(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| io_err(path, e))? {
            let file_type = entry.file_type().await.map_err(|e| io_err(path, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(if file_type.is_dir() {
                DirEntry::folder(name)
            } else {
                DirEntry::file(name)
            });
        }
        entries.sort_by(|a, b| {
            (a.kind != NodeKind::Folder, &a.name).cmp(&(b.kind != NodeKind::Folder, &b.name))
        });
        tracing::trace!(path = %path, count = entries.len(), "listed local folder");
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<String, RemoteError> {
        let file = self.confine(path).await?;
        tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| io_err(path, e))
    }

    async fn save_file(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        let file = self.confine(path).await?;
        tokio::fs::write(&file, content)
            .await
            .map_err(|e| io_err(path, e))
    }

    async fn create_entry(&self, path: &str, kind: NodeKind) -> Result<(), RemoteError> {
        let target = self.confine(path).await?;
        match kind {
            NodeKind::Folder => tokio::fs::create_dir(&target)
                .await
                .map_err(|e| io_err(path, e)),
            NodeKind::File => tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
                .map(|_| ())
                .map_err(|e| io_err(path, e)),
        }
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), RemoteError> {
        let from = self.confine(old_path).await?;
        let to = self.confine(new_path).await?;
        if tokio::fs::try_exists(&to).await.unwrap_or(false) {
            return Err(RemoteError::rejected(format!("{new_path} already exists")));
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| io_err(old_path, e))
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        if paths::normalize(path) == paths::ROOT {
            return Err(RemoteError::rejected("cannot delete the root"));
        }
        let target = self.confine(path).await?;
        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|e| io_err(path, e))?;
        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        removed.map_err(|e| io_err(path, e))
    }
}
