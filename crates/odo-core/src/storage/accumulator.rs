//! Incremental aggregation of measurements into every granularity.
//!
//! The [`Aggregator`] owns the in-memory bucket map and the recent events log.
//! Applying a measurement updates one bucket per granularity in place; nothing
//! is recomputed from history.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use chrono::NaiveDateTime;
use log::{debug, warn};

use super::buckets::Reconciled;
use super::window::{bucket_id, bucket_ids, window_ids};
use super::{Bucket, BucketId, BucketStore, Granularity, RecentEvents};
use crate::measurement::{Measurement, MeasurementError};

/// Result of applying a single measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The measurement was folded in; the touched bucket id per granularity,
    /// in [`Granularity::ALL`] order
    Applied([BucketId; 6]),
    /// The timestamp was already applied, nothing changed
    Replayed,
}

/// Everything one batch changed, and what it skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Buckets written by the batch
    pub touched: BTreeSet<(Granularity, BucketId)>,
    /// Minute ids of the applied measurements, in application order
    pub applied: Vec<BucketId>,
    pub replayed: usize,
    pub malformed: usize,
}

impl ChangeSet {
    /// True when the batch changed no state at all
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.applied.is_empty()
    }

    /// Whether the recent events log changed
    pub fn events_changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Owned aggregation state: every live bucket plus the recent events log
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    buckets: BucketStore,
    events: RecentEvents,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(buckets: BucketStore, events: RecentEvents) -> Self {
        Self { buckets, events }
    }

    pub fn buckets(&self) -> &BucketStore {
        &self.buckets
    }

    pub fn buckets_mut(&mut self) -> &mut BucketStore {
        &mut self.buckets
    }

    pub fn events(&self) -> &RecentEvents {
        &self.events
    }

    /// Fold one measurement into all six granularities.
    ///
    /// A timestamp already in the recent events log is a replay and leaves
    /// the state untouched. The minute bucket is replaced by the measurement;
    /// the coarser buckets accumulate it, starting from zero when absent.
    pub fn apply(&mut self, measurement: &Measurement) -> Result<ApplyOutcome, MeasurementError> {
        if self.events.contains(&measurement.timestamp) {
            return Ok(ApplyOutcome::Replayed);
        }

        let at = measurement.instant()?;
        let ids = bucket_ids(at);

        // Same minute spelled differently, e.g. without zero padding.
        if self.events.contains(ids[0].as_str()) {
            return Ok(ApplyOutcome::Replayed);
        }

        let minute = Bucket::from_measurement(measurement);
        self.buckets.put(Granularity::Minute, ids[0].clone(), minute);

        for (granularity, id) in Granularity::ALL.into_iter().zip(ids.iter()).skip(1) {
            let current = self.buckets.get(granularity, id).unwrap_or(Bucket::ZERO);
            self.buckets.put(granularity, id.clone(), current.fold(measurement));
        }

        self.events.record(ids[0].clone(), minute);

        Ok(ApplyOutcome::Applied(ids))
    }

    /// Apply a batch in order.
    ///
    /// Malformed measurements are logged and skipped. A minute applied earlier
    /// in the same batch counts as a replay even once the bounded events log
    /// has forgotten it.
    pub fn apply_batch(&mut self, measurements: &[Measurement]) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut seen: BTreeSet<BucketId> = BTreeSet::new();

        for measurement in measurements {
            let outcome = match measurement.instant() {
                Ok(at) if seen.contains(&bucket_id(Granularity::Minute, at)) => {
                    Ok(ApplyOutcome::Replayed)
                }
                _ => self.apply(measurement),
            };

            match outcome {
                Ok(ApplyOutcome::Applied(ids)) => {
                    seen.insert(ids[0].clone());
                    changes.applied.push(ids[0].clone());
                    changes
                        .touched
                        .extend(Granularity::ALL.into_iter().zip(ids));
                }
                Ok(ApplyOutcome::Replayed) => changes.replayed += 1,
                Err(e) => {
                    warn!("Skipping measurement: {e}");
                    changes.malformed += 1;
                }
            }
        }

        debug!(
            "Processed {} events ({} replayed, {} malformed)",
            changes.applied.len(),
            changes.replayed,
            changes.malformed
        );

        changes
    }

    /// Slide every granularity's window to `now`.
    pub fn reconcile(&mut self, now: NaiveDateTime) -> Reconciled {
        let mut total = Reconciled::default();
        for granularity in Granularity::ALL {
            let window = window_ids(granularity, now);
            let reconciled = self.buckets.reconcile(granularity, &window);
            total.created += reconciled.created;
            total.evicted += reconciled.evicted;
        }

        debug!(
            "Reconciled windows: {} created, {} evicted",
            total.created, total.evicted
        );
        total
    }
}
