//! In-memory [`DocumentStore`].
//!
//! Used by tests and as the working copy behind file-backed stores. Failure
//! switches let callers simulate an unreachable store, rejected batch writes
//! and unreadable documents.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use super::{Document, DocumentKey, DocumentStore, StoreError, WriteBatch};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: BTreeMap<DocumentKey, Document>,
    unreadable: BTreeSet<DocumentKey>,
    unavailable: bool,
    reject_commits: bool,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `documents`.
    pub fn from_documents(documents: impl IntoIterator<Item = (DocumentKey, Document)>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Store raw bytes under `key`, bypassing batching.
    pub fn insert(&mut self, key: DocumentKey, document: Document) {
        self.documents.insert(key, document);
    }

    pub fn document(&self, key: &DocumentKey) -> Option<&Document> {
        self.documents.get(key)
    }

    pub fn documents(&self) -> impl Iterator<Item = (&DocumentKey, &Document)> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of batches committed successfully
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Make every read and write fail as if the store were unreachable.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Make batch writes fail while reads keep working.
    pub fn set_reject_commits(&mut self, reject: bool) {
        self.reject_commits = reject;
    }

    /// Make reads of one document fail.
    pub fn set_unreadable(&mut self, key: DocumentKey) {
        self.unreadable.insert(key);
    }

    /// Apply a batch directly, without the failure switches.
    pub fn apply(&mut self, batch: &WriteBatch) {
        for (key, document) in batch.iter() {
            self.documents.insert(key.clone(), document.clone());
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable(String::from("memory store switched off")))
        } else {
            Ok(())
        }
    }

    fn read(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        if self.unreadable.contains(key) {
            return Err(StoreError::Read {
                key: key.clone(),
                reason: String::from("document marked unreadable"),
            });
        }
        Ok(self.documents.get(key).cloned())
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&mut self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        self.check_available()?;
        self.read(key)
    }

    async fn get_all(
        &mut self,
        keys: &[DocumentKey],
    ) -> Result<Vec<Result<Option<Document>, StoreError>>, StoreError> {
        self.check_available()?;
        Ok(keys.iter().map(|key| self.read(key)).collect())
    }

    async fn commit(&mut self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.check_available()?;
        if self.reject_commits {
            return Err(StoreError::Write {
                documents: batch.len(),
                reason: String::from("memory store rejects commits"),
            });
        }

        self.apply(batch);
        self.commits += 1;
        Ok(())
    }
}
