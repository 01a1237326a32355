//! Bucket aggregate records and their identifiers.

use core::fmt::{Display, Write};

use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;

/// Capacity of a bucket id.
///
/// The longest id is a minute id with a chrono year at its widest
/// (`+262143-12-31 23:59`, 19 bytes), so formatting never overflows.
pub const BUCKET_ID_LEN: usize = 24;

/// Identifier of one calendar slot, e.g. `2024-03-01 12:30` or `2024 week 9`
///
/// Ids are stack strings so the whole bucket map can live in a `no_std` heap
/// without a second allocation per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketId(heapless::String<BUCKET_ID_LEN>);

impl BucketId {
    /// Build an id from an existing string, `None` if it does not fit
    pub fn new(id: &str) -> Option<Self> {
        let mut inner = heapless::String::new();
        inner.push_str(id).ok()?;
        Some(Self(inner))
    }

    /// Build an id from format arguments.
    pub(crate) fn format(args: core::fmt::Arguments<'_>) -> Self {
        let mut inner = heapless::String::new();
        // Fits: see BUCKET_ID_LEN.
        let _ = inner.write_fmt(args);
        Self(inner)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for BucketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for BucketId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for BucketId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Aggregated record for one bucket of one granularity
///
/// `counter` is the number of measurements folded in since the bucket was last
/// zeroed, `meters` their summed distance, and the two speeds are running
/// averages updated by [`Bucket::fold`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub counter: i64,
    pub meters: f32,
    pub meters_per_second: f32,
    pub kilometers_per_hour: f32,
}

impl Bucket {
    /// Empty bucket, used for ids without data
    pub const ZERO: Bucket = Bucket {
        counter: 0,
        meters: 0.0,
        meters_per_second: 0.0,
        kilometers_per_hour: 0.0,
    };

    /// A bucket holding exactly one measurement.
    ///
    /// Minute buckets are always this shape: a new measurement for the same
    /// minute replaces the bucket instead of accumulating into it.
    pub fn from_measurement(measurement: &Measurement) -> Self {
        Self {
            counter: 1,
            meters: measurement.meters,
            meters_per_second: measurement.meters_per_second,
            kilometers_per_hour: measurement.kilometers_per_hour,
        }
    }

    /// Fold one more measurement into this bucket.
    ///
    /// The new sample contributes with weight 1 against `old * counter`, so
    /// the speeds are a running mean over every folded sample. The formula is
    /// kept bit-for-bit compatible with records already in the durable store.
    pub fn fold(&self, measurement: &Measurement) -> Self {
        let counter = self.counter + 1;
        let old_weight = self.counter as f32;
        let new_weight = counter as f32;

        Self {
            counter,
            meters: self.meters + measurement.meters,
            meters_per_second: (self.meters_per_second * old_weight
                + measurement.meters_per_second)
                / new_weight,
            kilometers_per_hour: (self.kilometers_per_hour * old_weight
                + measurement.kilometers_per_hour)
                / new_weight,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }
}

impl Display for Bucket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:.2}m @ {:.1}m/s or {:.1}km/h",
            self.meters, self.meters_per_second, self.kilometers_per_hour
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn measurement(meters: f32, mps: f32) -> Measurement {
        Measurement::new("2024-03-01 12:30", meters, mps, mps * 3.6)
    }

    #[test]
    fn test_from_measurement_counts_one() {
        let bucket = Bucket::from_measurement(&measurement(0.2375, 1.0));
        assert_eq!(bucket.counter, 1);
        assert_eq!(bucket.meters, 0.2375);
        assert_eq!(bucket.meters_per_second, 1.0);
    }

    #[test]
    fn test_fold_into_zero_equals_single_measurement() {
        let m = measurement(3.0, 2.5);
        assert_eq!(Bucket::ZERO.fold(&m), Bucket::from_measurement(&m));
    }

    #[test]
    fn test_fold_running_mean() {
        let old = Bucket {
            counter: 2,
            meters: 10.0,
            meters_per_second: 2.0,
            kilometers_per_hour: 7.2,
        };

        let folded = old.fold(&measurement(0.2375, 1.0));

        assert_eq!(folded.counter, 3);
        assert!((folded.meters - 10.2375).abs() < 1e-5);
        assert!(
            (folded.meters_per_second - 5.0 / 3.0).abs() < 1e-5,
            "(2.0 * 2 + 1.0) / 3 expected, got {}",
            folded.meters_per_second
        );
        assert!((folded.kilometers_per_hour - (7.2 * 2.0 + 3.6) / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_bucket_id_capacity() {
        assert!(BucketId::new("+262143-12-31 23:59").is_some());
        assert!(BucketId::new("this id is much too long to fit").is_none());
    }

    #[test]
    fn test_display() {
        let bucket = Bucket {
            counter: 4,
            meters: 12.345,
            meters_per_second: 1.26,
            kilometers_per_hour: 4.54,
        };
        assert_eq!(bucket.to_string(), "12.35m @ 1.3m/s or 4.5km/h");
    }
}
