//! On-disk record storage.
//!
//! Every record is a single file directly under the storage directory, named by
//! its identifier. The directory listing is the only index. Writes land in a
//! hidden `.{id}.part` sibling first and are renamed into place, so concurrent
//! readers never see a half-written record. There is no locking beyond that:
//! two writers for the same id race and the last rename wins.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn, Span};

/// Errors raised by [`FileStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("invalid record id: {0:?}")]
    InvalidId(String),
    #[error("failed to write record {id}: {source}")]
    Write {
        id: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read record {id}: {source}")]
    Read {
        id: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to list storage directory {}: {source}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Filesystem-backed record store.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    span: Span,
}

impl FileStore {
    /// Opens (and creates if missing) the storage directory.
    pub fn new(base_dir: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::create_dir_all(base_dir.as_ref())?;
        let base_dir = base_dir.as_ref().canonicalize()?;
        let span = info_span!("storage", base_dir = %base_dir.display());
        Ok(Self { base_dir, span })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Stores `data` under `id`, replacing any existing record with that id.
    pub async fn create(&self, data: &[u8], id: &str) -> Result<(), StorageError> {
        info!(parent: &self.span, id, bytes = data.len(), "Creating record");
        let location = self.record_path(id)?;
        let staging = self.base_dir.join(format!(".{}.part", id));

        let write = async {
            tokio::fs::write(&staging, data).await?;
            tokio::fs::rename(&staging, &location).await
        };
        if let Err(source) = write.await {
            warn!(parent: &self.span, id, error = %source, "Failed to write record");
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StorageError::Write { id: id.to_string(), source });
        }
        Ok(())
    }

    /// Reads the full contents of a record.
    pub async fn retrieve(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        info!(parent: &self.span, id, "Retrieving record");
        let location = self.record_path(id)?;
        tokio::fs::read(&location).await.map_err(|source| {
            warn!(parent: &self.span, id, error = %source, "Failed to read record");
            match source.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound(id.to_string()),
                _ => StorageError::Read { id: id.to_string(), source },
            }
        })
    }

    /// Returns the on-disk location of a record after checking it exists.
    pub async fn retrieve_as_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        debug!(parent: &self.span, id, "Retrieving record as file");
        let location = self.record_path(id)?;
        match tokio::fs::metadata(&location).await {
            Ok(meta) if meta.is_file() => Ok(location),
            Ok(_) => Err(StorageError::NotFound(id.to_string())),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                warn!(parent: &self.span, id, "Error retrieving file for record");
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(source) => Err(StorageError::Read { id: id.to_string(), source }),
        }
    }

    /// Removes a record. Returns `false` when nothing was removed.
    pub async fn delete(&self, id: &str) -> bool {
        info!(parent: &self.span, id, "Deleting record");
        let location = match self.record_path(id) {
            Ok(location) => location,
            Err(e) => {
                warn!(parent: &self.span, error = %e, "Refusing to delete");
                return false;
            }
        };
        match tokio::fs::remove_file(&location).await {
            Ok(()) => true,
            Err(e) => {
                warn!(parent: &self.span, id, error = %e, "Failed to delete record");
                false
            }
        }
    }

    /// Lists the ids of all stored records, sorted by name.
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        debug!(parent: &self.span, "Retrieving list of records");
        let list_err = |source| StorageError::List { path: self.base_dir.clone(), source };

        let mut entries = tokio::fs::read_dir(&self.base_dir).await.map_err(list_err)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // staging files
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => ids.push(name),
                _ => {}
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Whether the storage directory is currently reachable.
    pub async fn is_ready(&self) -> bool {
        tokio::fs::metadata(&self.base_dir).await.map(|m| m.is_dir()).unwrap_or(false)
    }

    /// Joins `id` onto the base directory. Ids are plain file names; anything
    /// that could escape the directory or collide with staging files is refused.
    pub fn record_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        validate_id(id)?;
        Ok(self.base_dir.join(id))
    }
}

pub fn validate_id(id: &str) -> Result<(), StorageError> {
    let bad = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
        || Path::new(id).components().count() != 1;
    if bad {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(())
}
