// Document store backed by a vault directory on disk

use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Read-modify-write transform applied by [`DocumentStore::mutate`].
pub type Mutation = Box<dyn FnOnce(String) -> Result<String, StoreError> + Send>;

/// Storage collaborator. Paths are relative to the store root and use `/`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<String, StoreError>;

    /// Atomically replace the content at `path` with `mutation(content)`.
    async fn mutate(&self, path: &str, mutation: Mutation) -> Result<(), StoreError>;

    /// Create a new document, failing if one already exists. Returns its path.
    async fn create(&self, path: &str, content: &str) -> Result<String, StoreError>;

    async fn ensure_folder_exists(&self, path: &str) -> Result<(), StoreError>;

    /// A path inside `folder` for `file_name` that does not collide with an
    /// existing document.
    async fn resolve_unique_path(&self, folder: &str, file_name: &str)
    -> Result<String, StoreError>;
}

pub struct FsDocumentStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Map a store path onto the filesystem, refusing anything that climbs out of the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(StoreError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Inverse of [`resolve`](Self::resolve) for paths reported by the filesystem.
    pub fn relative_path(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full).await.map_err(|source| StoreError::Io {
            path: path.to_string(),
            source,
        })
    }
}

fn io_error(path: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_string(),
        source,
    }
}

pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read(&self, path: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full).await.map_err(io_error(path))
    }

    async fn mutate(&self, path: &str, mutation: Mutation) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;

        let current = tokio::fs::read_to_string(&full)
            .await
            .map_err(io_error(path))?;
        let updated = mutation(current)?;
        tokio::fs::write(&full, updated)
            .await
            .map_err(io_error(path))?;

        debug!("Updated {}", path);
        Ok(())
    }

    async fn create(&self, path: &str, content: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(io_error(path))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(io_error(path))?;
        file.flush().await.map_err(io_error(path))?;

        debug!("Created {}", path);
        Ok(path.to_string())
    }

    async fn ensure_folder_exists(&self, path: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir_all(&full)
            .await
            .map_err(io_error(path))
    }

    async fn resolve_unique_path(
        &self,
        folder: &str,
        file_name: &str,
    ) -> Result<String, StoreError> {
        let candidate = join_path(folder, file_name);
        if !self.exists(&candidate).await? {
            return Ok(candidate);
        }

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
            _ => (file_name, String::new()),
        };
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();

        let mut attempt = 0usize;
        loop {
            let suffix = if attempt == 0 {
                stamp.clone()
            } else {
                format!("{stamp}-{attempt}")
            };
            let candidate = join_path(folder, &format!("{stem} {suffix}{extension}"));
            if !self.exists(&candidate).await? {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }
}
