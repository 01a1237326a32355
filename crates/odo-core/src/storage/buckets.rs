//! In-memory bucket map shared by all granularities.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::{debug, warn};

use super::codec::decode_bucket;
use super::{Bucket, BucketId, DocumentKey, DocumentStore, Granularity, StoreError};

/// Buckets and evictions made by one [`BucketStore::reconcile`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub created: usize,
    pub evicted: usize,
}

/// Every live bucket, keyed by granularity and bucket id
///
/// After [`BucketStore::reconcile`] the ids held for a granularity are exactly
/// its current window, which is what keeps memory bounded as time moves on.
#[derive(Debug, Clone, Default)]
pub struct BucketStore {
    buckets: BTreeMap<(Granularity, BucketId), Bucket>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, granularity: Granularity, id: &BucketId) -> Option<Bucket> {
        self.buckets.get(&(granularity, id.clone())).copied()
    }

    pub fn put(&mut self, granularity: Granularity, id: BucketId, bucket: Bucket) {
        self.buckets.insert((granularity, id), bucket);
    }

    /// Make the held ids of `granularity` equal `window`: missing ids get a
    /// zero bucket, ids outside the window are dropped.
    pub fn reconcile(&mut self, granularity: Granularity, window: &[BucketId]) -> Reconciled {
        let before = self.len(granularity);
        self.buckets
            .retain(|(g, id), _| *g != granularity || window.contains(id));
        let evicted = before - self.len(granularity);

        let mut created = 0;
        for id in window {
            self.buckets
                .entry((granularity, id.clone()))
                .or_insert_with(|| {
                    created += 1;
                    Bucket::ZERO
                });
        }

        Reconciled { created, evicted }
    }

    /// Buckets of one granularity, ordered by id string.
    pub fn iter(&self, granularity: Granularity) -> impl Iterator<Item = (&BucketId, &Bucket)> {
        self.buckets
            .iter()
            .filter(move |((g, _), _)| *g == granularity)
            .map(|((_, id), bucket)| (id, bucket))
    }

    pub fn len(&self, granularity: Granularity) -> usize {
        self.iter(granularity).count()
    }

    pub fn total_len(&self) -> usize {
        self.buckets.len()
    }

    /// Fetch `ids` of one granularity from the durable store.
    ///
    /// Every id is first set to a zero bucket. A missing document stays zero;
    /// a document that fails to read or decode is logged and stays zero. Only
    /// a failure of the whole multi-key read is returned, leaving the zeroed
    /// buckets in place. Returns how many documents were found.
    pub async fn load<S: DocumentStore>(
        &mut self,
        store: &mut S,
        granularity: Granularity,
        ids: &[BucketId],
    ) -> Result<usize, StoreError> {
        for id in ids {
            self.put(granularity, id.clone(), Bucket::ZERO);
        }

        let keys: Vec<DocumentKey> = ids
            .iter()
            .map(|id| DocumentKey::bucket(granularity, id.clone()))
            .collect();
        let results = store.get_all(&keys).await?;

        let mut found = 0;
        for (key, result) in keys.into_iter().zip(results) {
            let document = match result {
                Ok(Some(document)) => document,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Reading {key} failed, using an empty bucket: {e}");
                    continue;
                }
            };

            match decode_bucket(&document) {
                Ok(bucket) => {
                    found += 1;
                    self.put(granularity, key.id, bucket);
                }
                Err(e) => warn!("Stored bucket {key} is unreadable, using an empty bucket: {e}"),
            }
        }

        debug!("Loaded {found}/{} {granularity} buckets", ids.len());
        Ok(found)
    }
}
