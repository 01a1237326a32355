//! Station lifecycle: load, then ingest batches and serve dashboard reads.
//!
//! The [`Aggregator`] lives behind an async mutex shared between a single
//! writer ([`Station`]) and any number of readers ([`Dashboard`]). The writer
//! holds the lock while applying a batch and building its write batch,
//! releases it for the store write, and takes it again to slide the windows.

use alloc::vec::Vec;
use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::clock::Clock;
use crate::measurement::Measurement;
use crate::query::{EventsResponse, StatsResponse};
use crate::storage::buckets::Reconciled;
use crate::storage::codec::decode_events;
use crate::storage::manager::{self, CommitReport, build_batch};
use crate::storage::window::window_ids;
use crate::storage::{
    Aggregator, Bucket, BucketId, BucketStore, ChangeSet, DocumentKey, DocumentStore,
    Granularity, RecentEvents, StoreError,
};

/// Aggregation state shared between the station and its dashboards
pub type SharedAggregator<M> = AsyncMutex<M, Aggregator>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Loading,
    Running,
    /// The store was unreachable at startup; running on zeroed state
    Degraded,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Running => "running",
            Self::Degraded => "degraded",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StationError {
    #[error("station has not been started")]
    NotStarted,
    #[error("document store unavailable at startup: {0}")]
    StoreUnavailable(StoreError),
}

/// What one call to [`Station::ingest`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub changes: ChangeSet,
    pub commit: CommitReport,
    pub reconciled: Reconciled,
}

/// Single writer over the shared aggregator
///
/// Owns the durable store and the clock. `ingest` takes `&mut self`, so one
/// batch is fully applied, committed and reconciled before the next starts.
pub struct Station<'a, M: RawMutex, S: DocumentStore, C: Clock> {
    state: &'a SharedAggregator<M>,
    store: S,
    clock: C,
    run_state: RunState,
}

impl<'a, M: RawMutex, S: DocumentStore, C: Clock> Station<'a, M, S, C> {
    pub fn new(state: &'a SharedAggregator<M>, store: S, clock: C) -> Self {
        Self {
            state,
            store,
            clock,
            run_state: RunState::Uninitialized,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Shut the station down, handing back its store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Read-only handle sharing this station's state and clock
    pub fn dashboard(&self) -> Dashboard<'a, M, &C> {
        Dashboard::new(self.state, &self.clock)
    }

    /// Load every window and the recent events log from the store.
    ///
    /// Replaces the shared aggregator. Unreadable documents come back as zero
    /// buckets. If the store cannot be reached at all the station still
    /// switches to [`RunState::Degraded`] on zeroed state and accepts
    /// ingestion, but the error is returned so the caller may abort instead.
    pub async fn start(&mut self) -> Result<(), StationError> {
        self.run_state = RunState::Loading;
        let now = self.clock.now();

        let mut buckets = BucketStore::new();
        let mut unavailable: Option<StoreError> = None;
        let mut found = 0;
        for granularity in Granularity::ALL {
            let ids = window_ids(granularity, now);
            match buckets.load(&mut self.store, granularity, &ids).await {
                Ok(n) => found += n,
                Err(e) => {
                    unavailable.get_or_insert(e);
                }
            }
        }

        let events = match self.store.get(&DocumentKey::events()).await {
            Ok(Some(document)) => match decode_events(&document) {
                Ok(document) => RecentEvents::from_events(document.events),
                Err(e) => {
                    warn!("Stored recent events are unreadable, starting empty: {e}");
                    RecentEvents::new()
                }
            },
            Ok(None) => RecentEvents::new(),
            Err(e @ StoreError::Unavailable(_)) => {
                unavailable.get_or_insert(e);
                RecentEvents::new()
            }
            Err(e) => {
                warn!("Reading recent events failed, starting empty: {e}");
                RecentEvents::new()
            }
        };
        let event_count = events.len();

        *self.state.lock().await = Aggregator::from_parts(buckets, events);

        match unavailable {
            None => {
                info!("Loaded {found} stored buckets and {event_count} recent events");
                self.run_state = RunState::Running;
                Ok(())
            }
            Some(e) => {
                error!("Starting on empty state: {e}");
                self.run_state = RunState::Degraded;
                Err(StationError::StoreUnavailable(e))
            }
        }
    }

    /// Apply a batch, persist what it changed and slide the windows to now.
    ///
    /// A failed store write is reported in the returned [`IngestReport`] and
    /// does not roll back the in-memory state.
    pub async fn ingest(&mut self, measurements: &[Measurement]) -> Result<IngestReport, StationError> {
        if matches!(self.run_state, RunState::Uninitialized | RunState::Loading) {
            return Err(StationError::NotStarted);
        }

        let (changes, batch) = {
            let mut aggregator = self.state.lock().await;
            let changes = aggregator.apply_batch(measurements);
            let batch = build_batch(&aggregator, &changes);
            (changes, batch)
        };

        let commit = manager::commit(&mut self.store, &batch).await;
        if self.run_state == RunState::Degraded && commit.documents > 0 && commit.is_ok() {
            info!("Document store reachable again");
            self.run_state = RunState::Running;
        }

        let now = self.clock.now();
        let mut aggregator = self.state.lock().await;
        let reconciled = aggregator.reconcile(now);

        debug!("Latest records:");
        for granularity in Granularity::ALL {
            let (id, bucket) = aggregator.latest(granularity, now);
            debug!("  {granularity} {id}: {bucket}");
        }

        Ok(IngestReport {
            changes,
            commit,
            reconciled,
        })
    }
}

/// Read-only view of the shared aggregator
///
/// Every read locks briefly and copies out, so it never observes a batch
/// half applied.
pub struct Dashboard<'a, M: RawMutex, C: Clock> {
    state: &'a SharedAggregator<M>,
    clock: C,
}

impl<'a, M: RawMutex, C: Clock> Dashboard<'a, M, C> {
    pub fn new(state: &'a SharedAggregator<M>, clock: C) -> Self {
        Self { state, clock }
    }

    pub async fn query(&self, granularity: Granularity) -> Vec<(BucketId, Bucket)> {
        self.state.lock().await.query(granularity, self.clock.now())
    }

    pub async fn latest(&self, granularity: Granularity) -> (BucketId, Bucket) {
        self.state.lock().await.latest(granularity, self.clock.now())
    }

    pub async fn stats(&self, granularity: Granularity) -> StatsResponse {
        self.state.lock().await.stats(granularity, self.clock.now())
    }

    pub async fn events(&self) -> EventsResponse {
        self.state.lock().await.recent_events()
    }
}
