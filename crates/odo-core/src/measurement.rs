//! Measurements delivered by the sensor side, and their wire format.

use alloc::string::String;
use alloc::vec::Vec;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::storage::Granularity;
use crate::storage::window::bucket_id;

/// Timestamp layout of a measurement: UTC, minute precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Meters per second to kilometers per hour (3600 s/h over 1000 m/km)
pub const MPS_TO_KPH: f32 = 3.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("malformed timestamp {timestamp:?}: {reason}")]
    MalformedTimestamp {
        timestamp: String,
        reason: chrono::ParseError,
    },
}

/// One distance/speed sample
///
/// The minute-precision timestamp is the measurement's identity: two
/// measurements with the same timestamp are the same logical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "ts")]
    pub timestamp: String,
    #[serde(rename = "m")]
    pub meters: f32,
    #[serde(rename = "mps")]
    pub meters_per_second: f32,
    #[serde(rename = "kph")]
    pub kilometers_per_hour: f32,
}

impl Measurement {
    pub fn new(
        timestamp: impl Into<String>,
        meters: f32,
        meters_per_second: f32,
        kilometers_per_hour: f32,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            meters,
            meters_per_second,
            kilometers_per_hour,
        }
    }

    /// Measurement for the minute containing `at`, deriving km/h from m/s
    pub fn at(at: NaiveDateTime, meters: f32, meters_per_second: f32) -> Self {
        Self::new(
            bucket_id(Granularity::Minute, at).as_str(),
            meters,
            meters_per_second,
            meters_per_second * MPS_TO_KPH,
        )
    }

    /// Parse the timestamp at minute precision (UTC).
    pub fn instant(&self) -> Result<NaiveDateTime, MeasurementError> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).map_err(|reason| {
            MeasurementError::MalformedTimestamp {
                timestamp: self.timestamp.clone(),
                reason,
            }
        })
    }
}

/// Batch of measurements as posted by the edge device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatsRequest {
    #[serde(rename = "dataPoints")]
    pub data_points: Vec<Measurement>,
}
