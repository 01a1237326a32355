pub mod accumulator;
pub mod bucket;
pub mod buckets;
pub mod codec;
pub mod document;
pub mod events;
pub mod manager;
pub mod memory;
pub mod window;

pub use accumulator::{Aggregator, ApplyOutcome, ChangeSet};
pub use bucket::{Bucket, BucketId};
pub use buckets::BucketStore;
pub use document::{Collection, Document, DocumentKey, DocumentStore, StoreError, WriteBatch};
pub use events::{RECENT_EVENTS, RecentEvent, RecentEvents};
pub use manager::CommitReport;
pub use memory::MemoryStore;

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Time granularity of a rolling bucket window
///
/// Each granularity has a fixed window size (how many buckets stay live), a
/// calendar unit that bucket ids are formatted from, and its own durable
/// collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// 60 minute buckets, `YYYY-MM-DD HH:MM`
    Minute,
    /// 24 hour buckets, `YYYY-MM-DD HH`
    Hour,
    /// 7 day buckets, `YYYY-MM-DD`
    Day,
    /// 5 ISO week buckets, `YYYY week W`
    Week,
    /// 12 month buckets, `YYYY-MM`
    Month,
    /// 4 year buckets, `YYYY`
    Year,
}

impl Granularity {
    /// Every granularity, finest first
    pub const ALL: [Granularity; 6] = [
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Year,
    ];

    /// Plural label used in collection names and API paths
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minute => "minutes",
            Self::Hour => "hours",
            Self::Day => "days",
            Self::Week => "weeks",
            Self::Month => "months",
            Self::Year => "years",
        }
    }

    /// Number of buckets in the rolling window
    pub const fn window_size(self) -> usize {
        match self {
            Self::Minute => 60,
            Self::Hour => 24,
            Self::Day => 7,
            Self::Week => 5,
            Self::Month => 12,
            Self::Year => 4,
        }
    }

    /// Durable collection holding this granularity's buckets
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Minute => "odometer-minutes-records",
            Self::Hour => "odometer-hours-records",
            Self::Day => "odometer-days-records",
            Self::Week => "odometer-weeks-records",
            Self::Month => "odometer-months-records",
            Self::Year => "odometer-years-records",
        }
    }

    /// Position in [`Granularity::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl core::fmt::Display for Granularity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown granularity")]
pub struct UnknownGranularity;

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    /// Accepts both the plural label (`hours`) and the singular (`hour`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| {
                let label = g.label();
                s == label || s == &label[..label.len() - 1]
            })
            .ok_or(UnknownGranularity)
    }
}
