//! Hardware-independent core library for odo-rs
//!
//! This crate contains the platform-agnostic rolling aggregation engine of the
//! odometer station: measurement parsing, per-granularity bucket windows,
//! incremental aggregation, replay protection, batched persistence and the
//! dashboard query side.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod clock;
pub mod measurement;
pub mod query;
pub mod station;
pub mod storage;

pub use clock::{Clock, FixedClock};
pub use measurement::{Measurement, MeasurementError, UpdateStatsRequest};
pub use query::{DataPoint, EventsResponse, StatsResponse};
pub use station::{Dashboard, IngestReport, RunState, SharedAggregator, Station, StationError};
pub use storage::{
    Aggregator, Bucket, BucketId, DocumentKey, DocumentStore, Granularity, MemoryStore, StoreError,
    WriteBatch,
};
