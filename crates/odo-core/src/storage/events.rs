//! Recent events log.
//!
//! Holds the last few measurement timestamps that were applied, together with
//! the minute bucket each one produced. The dashboard shows it as "last
//! events", and ingestion uses it to drop measurements the edge device sends
//! again after a failed or unacknowledged delivery.

use alloc::vec::Vec;

use heapless::Deque;
use serde::{Deserialize, Serialize};

use super::{Bucket, BucketId};

/// Number of applied measurements remembered
pub const RECENT_EVENTS: usize = 5;

/// One applied measurement and the minute bucket it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEvent {
    pub timestamp: BucketId,
    pub bucket: Bucket,
}

/// Bounded FIFO of the most recently applied measurements
#[derive(Debug, Clone, Default)]
pub struct RecentEvents {
    entries: Deque<RecentEvent, RECENT_EVENTS>,
}

impl RecentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted list, keeping only the newest entries.
    pub fn from_events(events: impl IntoIterator<Item = RecentEvent>) -> Self {
        let mut log = Self::new();
        for event in events {
            log.record(event.timestamp, event.bucket);
        }
        log
    }

    pub fn contains(&self, timestamp: &str) -> bool {
        self.entries.iter().any(|e| e.timestamp == timestamp)
    }

    /// Append an applied measurement, returning the entry pushed out, if any.
    pub fn record(&mut self, timestamp: BucketId, bucket: Bucket) -> Option<RecentEvent> {
        let evicted = if self.entries.is_full() {
            self.entries.pop_front()
        } else {
            None
        };

        // Cannot fail: a slot was freed above when the deque was full.
        let _ = self.entries.push_back(RecentEvent { timestamp, bucket });

        evicted
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &RecentEvent> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<RecentEvent> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
