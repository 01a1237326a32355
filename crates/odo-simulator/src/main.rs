//! Desktop simulator for the odo-rs aggregation engine.
//!
//! Plays the part of both ends of the odometer station: a fake wheel sensor
//! produces one measurement per tick, an edge-device style outbox re-sends the
//! last few, and the engine ingests every batch into its rolling windows,
//! persisting to a snapshot file when `--data-path` is given.
//!
//! Run `odo-simulator --help` for the options. Verbosity is controlled through
//! `RUST_LOG`, e.g. `RUST_LOG=debug` also prints the latest record of every
//! granularity after each batch.

mod config;
mod fake;
mod file_store;

use std::error::Error;
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, TimeDelta, Utc};
use clap::Parser;
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};

use odo_core::{
    Aggregator, Clock, Dashboard, DocumentStore, FixedClock, MemoryStore, SharedAggregator,
    Station,
};

use config::Args;
use fake::{FakeOdometer, Outbox};
use file_store::FileStore;

/// Real UTC time, or a virtual clock stepped by the main loop
enum SimClock {
    Wall,
    Virtual(FixedClock),
}

impl SimClock {
    /// Move virtual time on by one tick. Real time moves by itself.
    fn tick(&self) {
        if let Self::Virtual(clock) = self {
            clock.advance(TimeDelta::minutes(1));
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> NaiveDateTime {
        match self {
            Self::Wall => Utc::now().naive_utc(),
            Self::Virtual(clock) => clock.now(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = Args::parse();
    info!("odo-simulator starting");
    info!("Wheel circumference: {:.5}m", args.wheel_circumference);

    match &args.data_path {
        Some(path) => {
            let store = FileStore::open(path).map_err(|e| e.to_string())?;
            info!(
                "Persisting to {} ({} documents)",
                store.path().display(),
                store.len()
            );
            run(&args, store)
        }
        None => {
            info!("No data path given, keeping everything in memory");
            run(&args, MemoryStore::new())
        }
    }
}

fn run<S: DocumentStore>(args: &Args, store: S) -> Result<(), Box<dyn Error>> {
    let clock = if args.virtual_time {
        SimClock::Virtual(FixedClock::new(Utc::now().naive_utc()))
    } else {
        SimClock::Wall
    };

    let state = SharedAggregator::<CriticalSectionRawMutex>::new(Aggregator::new());
    let mut station = Station::new(&state, store, &clock);
    let dashboard = Dashboard::new(&state, &clock);

    if let Err(e) = block_on(station.start()) {
        warn!("Continuing without stored history: {e}");
    }

    let mut odometer = FakeOdometer::new(args.wheel_circumference);
    let mut outbox = Outbox::new(args.resend);
    let interval = Duration::from_millis(args.interval_ms);

    let mut tick: u64 = 0;
    while args.ticks.is_none_or(|ticks| tick < ticks) {
        let tick_start = Instant::now();
        tick += 1;

        let measurement = odometer.next_measurement(clock.now());
        info!(
            "FAKED: {:.1} m @ {:.1} m/s or {:.1} km/h",
            measurement.meters, measurement.meters_per_second, measurement.kilometers_per_hour
        );

        let batch = outbox.batch(measurement);
        let report = block_on(station.ingest(&batch)).map_err(|e| e.to_string())?;
        info!(
            "Tick {tick} ({}): {} applied, {} replayed, {} saved{}",
            station.run_state(),
            report.changes.applied.len(),
            report.changes.replayed,
            report.commit.documents,
            if report.commit.is_ok() { "" } else { " (save failed)" }
        );

        if let Some(granularity) = args.print {
            let stats = block_on(dashboard.stats(granularity));
            println!("{}", serde_json::to_string(&stats)?);
        }

        clock.tick();

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }

    let events = block_on(dashboard.events());
    println!("{}", serde_json::to_string_pretty(&events)?);
    info!("Simulator exiting");
    Ok(())
}
