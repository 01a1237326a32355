//! Commit coordination between the aggregator and the durable store.
//!
//! A batch of measurements produces one [`WriteBatch`] holding every touched
//! bucket and, when anything was applied, the recent events document. The
//! batch is written best effort: on failure the in-memory state is kept as is
//! and the next successful batch persists the buckets it touches again.

use log::{debug, error, info};

use super::codec::{EventsDocument, encode_bucket, encode_events};
use super::{Aggregator, ChangeSet, DocumentKey, DocumentStore, StoreError, WriteBatch};

/// Outcome of one commit attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Documents in the submitted batch, 0 when nothing was submitted
    pub documents: usize,
    /// Store failure, if the batch was rejected
    pub error: Option<StoreError>,
}

impl CommitReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True when an empty change set skipped the store call
    pub fn skipped(&self) -> bool {
        self.documents == 0 && self.error.is_none()
    }
}

/// Collect the documents a change set must persist.
///
/// A bucket that fails to encode is logged and left out of the batch.
pub fn build_batch(aggregator: &Aggregator, changes: &ChangeSet) -> WriteBatch {
    let mut batch = WriteBatch::new();

    for (granularity, id) in &changes.touched {
        let Some(bucket) = aggregator.buckets().get(*granularity, id) else {
            continue;
        };
        match encode_bucket(&bucket) {
            Ok(document) => batch.set(DocumentKey::bucket(*granularity, id.clone()), document),
            Err(e) => error!("Dropping {granularity} bucket {id} from batch: {e}"),
        }
    }

    if changes.events_changed() {
        let events = EventsDocument {
            events: aggregator.events().to_vec(),
        };
        match encode_events(&events) {
            Ok(document) => batch.set(DocumentKey::events(), document),
            Err(e) => error!("Dropping recent events from batch: {e}"),
        }
    }

    batch
}

/// Submit `batch` as one atomic write.
pub async fn commit<S: DocumentStore>(store: &mut S, batch: &WriteBatch) -> CommitReport {
    if batch.is_empty() {
        debug!("Nothing to save");
        return CommitReport::default();
    }

    info!("Saving {} records...", batch.len());
    match store.commit(batch).await {
        Ok(()) => CommitReport {
            documents: batch.len(),
            error: None,
        },
        Err(e) => {
            error!("Failed to save {} records: {e}", batch.len());
            CommitReport {
                documents: batch.len(),
                error: Some(e),
            }
        }
    }
}
