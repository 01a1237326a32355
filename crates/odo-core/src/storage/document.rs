//! Durable document store boundary.
//!
//! The engine never talks to a concrete database. It reads and writes opaque
//! documents addressed by collection and id through [`DocumentStore`], and
//! only ever writes through one atomic [`WriteBatch`] per ingested batch.

use alloc::string::String;
use alloc::vec::Vec;
use core::future::Future;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use super::{BucketId, Granularity};

/// Id of the single document in [`Collection::Events`]
pub const EVENTS_DOCUMENT_ID: &str = "lastEvents";

/// Encoded document body
pub type Document = Vec<u8>;

/// Collection a document lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Buckets of one granularity, keyed by bucket id
    Buckets(Granularity),
    /// The recent events log
    Events,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Buckets(granularity) => granularity.collection(),
            Self::Events => "odometer-events-records",
        }
    }
}

/// Address of one document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub collection: Collection,
    pub id: BucketId,
}

impl DocumentKey {
    pub fn bucket(granularity: Granularity, id: BucketId) -> Self {
        Self {
            collection: Collection::Buckets(granularity),
            id,
        }
    }

    pub fn events() -> Self {
        Self {
            collection: Collection::Events,
            id: BucketId::new(EVENTS_DOCUMENT_ID).unwrap_or_default(),
        }
    }
}

impl core::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.collection.name(), self.id)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read {key}: {reason}")]
    Read { key: DocumentKey, reason: String },
    #[error("failed to write batch of {documents} documents: {reason}")]
    Write { documents: usize, reason: String },
}

/// Set of document writes that must land together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<(DocumentKey, Document)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full overwrite of `key`. A later set of the same key wins.
    pub fn set(&mut self, key: DocumentKey, document: Document) {
        if let Some(slot) = self.writes.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = document;
        } else {
            self.writes.push((key, document));
        }
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentKey, &Document)> {
        self.writes.iter().map(|(k, d)| (k, d))
    }
}

/// Key-addressable document store
///
/// `get_all` distinguishes the two failure levels the engine cares about: the
/// outer `Err` means the store could not be reached at all, while an inner
/// `Err` is a failure of that one document.
pub trait DocumentStore {
    /// Point read of one document, `None` if it does not exist.
    fn get(
        &mut self,
        key: &DocumentKey,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>>;

    /// Multi-key read, one result per key in the same order.
    fn get_all(
        &mut self,
        keys: &[DocumentKey],
    ) -> impl Future<Output = Result<Vec<Result<Option<Document>, StoreError>>, StoreError>>;

    /// Apply every write of the batch atomically.
    fn commit(&mut self, batch: &WriteBatch) -> impl Future<Output = Result<(), StoreError>>;
}
