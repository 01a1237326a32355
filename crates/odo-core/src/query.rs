//! Read side: zero-filled window queries and the dashboard wire shapes.

use alloc::vec::Vec;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::storage::window::{bucket_id, window_ids};
use crate::storage::{Aggregator, Bucket, BucketId, Granularity, RecentEvent};

/// One bucket as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    #[serde(rename = "c")]
    pub counter: i64,
    #[serde(rename = "ts")]
    pub timestamp: BucketId,
    #[serde(rename = "m")]
    pub meters: f32,
    #[serde(rename = "mps")]
    pub meters_per_second: f32,
    #[serde(rename = "kph")]
    pub kilometers_per_hour: f32,
}

impl DataPoint {
    pub fn new(timestamp: BucketId, bucket: &Bucket) -> Self {
        Self {
            counter: bucket.counter,
            timestamp,
            meters: bucket.meters,
            meters_per_second: bucket.meters_per_second,
            kilometers_per_hour: bucket.kilometers_per_hour,
        }
    }
}

impl From<&RecentEvent> for DataPoint {
    fn from(event: &RecentEvent) -> Self {
        Self::new(event.timestamp.clone(), &event.bucket)
    }
}

/// Window of one granularity, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(rename = "eventTimestamps")]
    pub event_timestamps: Vec<BucketId>,
    #[serde(rename = "dataPoints")]
    pub data_points: Vec<DataPoint>,
}

impl FromIterator<(BucketId, Bucket)> for StatsResponse {
    fn from_iter<I: IntoIterator<Item = (BucketId, Bucket)>>(iter: I) -> Self {
        let data_points: Vec<DataPoint> = iter
            .into_iter()
            .map(|(id, bucket)| DataPoint::new(id, &bucket))
            .collect();
        Self {
            event_timestamps: data_points.iter().map(|p| p.timestamp.clone()).collect(),
            data_points,
        }
    }
}

/// Recent events, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<DataPoint>,
}

impl Aggregator {
    /// Buckets of the window of `granularity` at `now`, oldest first.
    ///
    /// Always exactly `window_size` entries; ids without data come back as
    /// [`Bucket::ZERO`].
    pub fn query(&self, granularity: Granularity, now: NaiveDateTime) -> Vec<(BucketId, Bucket)> {
        window_ids(granularity, now)
            .into_iter()
            .map(|id| {
                let bucket = self
                    .buckets()
                    .get(granularity, &id)
                    .unwrap_or(Bucket::ZERO);
                (id, bucket)
            })
            .collect()
    }

    /// The bucket `now` falls into.
    pub fn latest(&self, granularity: Granularity, now: NaiveDateTime) -> (BucketId, Bucket) {
        let id = bucket_id(granularity, now);
        let bucket = self
            .buckets()
            .get(granularity, &id)
            .unwrap_or(Bucket::ZERO);
        (id, bucket)
    }

    pub fn stats(&self, granularity: Granularity, now: NaiveDateTime) -> StatsResponse {
        self.query(granularity, now).into_iter().collect()
    }

    pub fn recent_events(&self) -> EventsResponse {
        EventsResponse {
            events: self.events().iter().map(DataPoint::from).collect(),
        }
    }
}
