//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Parser, ValueHint};
use odo_core::Granularity;
use odo_core::storage::RECENT_EVENTS;

/// Wheel circumference of the reference odometer, in meters
pub const DEFAULT_WHEEL_CIRCUMFERENCE: f64 = 0.2375;

/// Drives the odo-rs aggregation engine with synthetic odometer data.
///
/// Every option can also be set through the environment or a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(name = "odo-simulator", version, about)]
pub struct Args {
    /// Snapshot file for the durable store. Without it nothing is persisted.
    #[arg(long, env = "ODO_DATA_PATH", value_hint = ValueHint::FilePath)]
    pub data_path: Option<PathBuf>,

    /// Wall-clock delay between ticks. Measurements are per minute, so with
    /// real time a shorter interval only produces replays; with
    /// `--virtual-time` it sets how fast the simulated minutes pass.
    #[arg(long, env = "ODO_INTERVAL_MS", default_value_t = 60_000)]
    pub interval_ms: u64,

    /// Stop after this many ticks instead of running forever
    #[arg(long, env = "ODO_TICKS")]
    pub ticks: Option<u64>,

    /// Advance a virtual clock by one minute per tick instead of reading UTC
    #[arg(long, env = "ODO_VIRTUAL_TIME")]
    pub virtual_time: bool,

    /// Circumference of the measuring wheel, in meters
    #[arg(long, env = "ODO_WHEEL_CIRCUMFERENCE", default_value_t = DEFAULT_WHEEL_CIRCUMFERENCE)]
    pub wheel_circumference: f64,

    /// Print the JSON stats of this granularity after every tick
    #[arg(long, env = "ODO_PRINT", value_parser = parse_granularity)]
    pub print: Option<Granularity>,

    /// How many already sent measurements to send again with every tick, at
    /// most the size of the engine's replay log
    #[arg(long, env = "ODO_RESEND", default_value_t = 4, value_parser = parse_resend)]
    pub resend: usize,
}

fn parse_resend(value: &str) -> Result<usize, String> {
    let resend = value.parse::<usize>().map_err(|e| e.to_string())?;
    if resend > RECENT_EVENTS {
        return Err(format!(
            "at most {RECENT_EVENTS} measurements can be re-sent without being counted twice"
        ));
    }
    Ok(resend)
}

fn parse_granularity(value: &str) -> Result<Granularity, String> {
    value.parse().map_err(|_| {
        let labels: Vec<&str> = Granularity::ALL.iter().map(|g| g.label()).collect();
        format!("expected one of {}", labels.join(", "))
    })
}
