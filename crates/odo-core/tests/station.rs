//! End-to-end station lifecycle against the in-memory document store.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use odo_core::storage::codec::decode_bucket;
use odo_core::{
    Aggregator, BucketId, DocumentKey, FixedClock, Granularity, Measurement, MemoryStore,
    RunState, SharedAggregator, Station,
};

fn at(d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

fn sample(ts: &str, meters: f32) -> Measurement {
    Measurement::new(ts, meters, 1.0, 3.6)
}

fn stored_counter(store: &MemoryStore, granularity: Granularity, id: &str) -> Option<i64> {
    let key = DocumentKey::bucket(granularity, BucketId::new(id).unwrap());
    store
        .document(&key)
        .map(|document| decode_bucket(document).unwrap().counter)
}

#[test]
fn test_restart_restores_windows_and_replay_protection() {
    let state = SharedAggregator::<NoopRawMutex>::new(Aggregator::new());
    let mut station = Station::new(&state, MemoryStore::new(), FixedClock::new(at(1, 12, 30)));
    block_on(station.start()).unwrap();
    let batch = [
        sample("2024-03-01 12:26", 1.0),
        sample("2024-03-01 12:27", 1.0),
        sample("2024-03-01 12:28", 1.0),
        sample("2024-03-01 12:29", 1.0),
        sample("2024-03-01 12:30", 1.0),
    ];
    block_on(station.ingest(&batch)).unwrap();
    let store = station.into_store();

    // Restart from the persisted documents only.
    let state = SharedAggregator::<NoopRawMutex>::new(Aggregator::new());
    let mut station = Station::new(&state, store, FixedClock::new(at(1, 12, 31)));
    block_on(station.start()).unwrap();
    assert_eq!(station.run_state(), RunState::Running);

    let (_, hour) = block_on(station.dashboard().latest(Granularity::Hour));
    assert_eq!(hour.counter, 5);
    assert_eq!(block_on(station.dashboard().events()).events.len(), 5);

    // The edge device re-sends the same five points after the restart.
    let report = block_on(station.ingest(&batch)).unwrap();
    assert_eq!(report.changes.replayed, 5);
    let (_, hour) = block_on(station.dashboard().latest(Granularity::Hour));
    assert_eq!(hour.counter, 5, "re-sent points must not be counted again");
}

#[test]
fn test_failed_commit_keeps_memory_and_repersists_later() {
    let state = SharedAggregator::<NoopRawMutex>::new(Aggregator::new());
    let clock = FixedClock::new(at(1, 12, 30));
    let mut station = Station::new(&state, MemoryStore::new(), &clock);
    block_on(station.start()).unwrap();

    station.store_mut().set_reject_commits(true);
    let report = block_on(station.ingest(&[sample("2024-03-01 12:30", 2.0)])).unwrap();

    assert!(report.commit.error.is_some());
    assert!(station.store().is_empty(), "nothing reached the store");
    let (_, day) = block_on(station.dashboard().latest(Granularity::Day));
    assert_eq!(day.counter, 1, "memory is not rolled back");

    station.store_mut().set_reject_commits(false);
    clock.advance(TimeDelta::minutes(1));
    let report = block_on(station.ingest(&[sample("2024-03-01 12:31", 3.0)])).unwrap();

    assert!(report.commit.is_ok());
    let store = station.store();
    assert_eq!(stored_counter(store, Granularity::Day, "2024-03-01"), Some(2));
    assert_eq!(stored_counter(store, Granularity::Minute, "2024-03-01 12:31"), Some(1));
    assert_eq!(
        stored_counter(store, Granularity::Minute, "2024-03-01 12:30"),
        None,
        "the untouched minute of the failed batch stays unpersisted"
    );
}

#[test]
fn test_windows_roll_over_midnight() {
    let state = SharedAggregator::<NoopRawMutex>::new(Aggregator::new());
    let clock = FixedClock::new(at(1, 23, 59));
    let mut station = Station::new(&state, MemoryStore::new(), &clock);
    block_on(station.start()).unwrap();
    block_on(station.ingest(&[sample("2024-03-01 23:59", 4.0)])).unwrap();

    clock.set(at(2, 0, 0));
    block_on(station.ingest(&[sample("2024-03-02 00:00", 1.0)])).unwrap();

    let dashboard = station.dashboard();
    let days = block_on(dashboard.query(Granularity::Day));
    assert_eq!(days.len(), 7);
    assert_eq!(days[5].0, "2024-03-01");
    assert_eq!(days[5].1.meters, 4.0);
    assert_eq!(days[6].0, "2024-03-02");
    assert_eq!(days[6].1.meters, 1.0);

    let minutes = block_on(dashboard.query(Granularity::Minute));
    assert_eq!(minutes[58].0, "2024-03-01 23:59");
    assert_eq!(minutes[59].0, "2024-03-02 00:00");

    let (month_id, month) = block_on(dashboard.latest(Granularity::Month));
    assert_eq!(month_id, "2024-03");
    assert_eq!(month.counter, 2);
}

#[test]
fn test_stats_json_shape() {
    let state = SharedAggregator::<NoopRawMutex>::new(Aggregator::new());
    let mut station = Station::new(&state, MemoryStore::new(), FixedClock::new(at(1, 12, 30)));
    block_on(station.start()).unwrap();
    block_on(station.ingest(&[sample("2024-03-01 12:30", 0.25)])).unwrap();

    let stats = block_on(station.dashboard().stats(Granularity::Week));
    let json = serde_json::to_value(&stats).unwrap();

    assert_eq!(json["eventTimestamps"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["eventTimestamps"][4], "2024 week 9");
    assert_eq!(json["dataPoints"][4]["c"], 1);
    assert_eq!(json["dataPoints"][4]["m"], 0.25);
}
