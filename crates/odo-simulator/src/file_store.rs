//! Snapshot file backed document store.
//!
//! All documents are kept in a [`MemoryStore`] and the whole set is written
//! to one postcard file per committed batch. The file is first written next
//! to the snapshot and then renamed over it, so a batch is either fully on
//! disk or not at all.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use odo_core::storage::{Document, DocumentKey, DocumentStore, MemoryStore, StoreError, WriteBatch};

pub struct FileStore {
    path: PathBuf,
    documents: MemoryStore,
}

impl FileStore {
    /// Open the snapshot at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let documents = match fs::read(&path) {
            Ok(bytes) => {
                let snapshot: Vec<(DocumentKey, Document)> = postcard::from_bytes(&bytes)
                    .map_err(|e| {
                        StoreError::Unavailable(format!("corrupt snapshot {}: {e}", path.display()))
                    })?;
                info!("Opened {} with {} documents", path.display(), snapshot.len());
                MemoryStore::from_documents(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", path.display());
                MemoryStore::new()
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(Self { path, documents })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn persist(&self, documents: &MemoryStore, batch_len: usize) -> Result<(), StoreError> {
        let write_error = |reason: String| StoreError::Write {
            documents: batch_len,
            reason,
        };

        let snapshot: Vec<(&DocumentKey, &Document)> = documents.documents().collect();
        let bytes = postcard::to_allocvec(&snapshot).map_err(|e| write_error(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }

        let temp = self.temp_path();
        fs::write(&temp, &bytes).map_err(|e| write_error(e.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|e| write_error(e.to_string()))?;

        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}

impl DocumentStore for FileStore {
    async fn get(&mut self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        self.documents.get(key).await
    }

    async fn get_all(
        &mut self,
        keys: &[DocumentKey],
    ) -> Result<Vec<Result<Option<Document>, StoreError>>, StoreError> {
        self.documents.get_all(keys).await
    }

    async fn commit(&mut self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut next = self.documents.clone();
        next.apply(batch);
        self.persist(&next, batch.len())?;
        self.documents = next;
        Ok(())
    }
}
