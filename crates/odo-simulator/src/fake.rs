//! Synthetic odometer data and edge-device style delivery.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use odo_core::Measurement;

/// Upper bound of the distance covered in one minute, in meters
const MAX_METERS_PER_MINUTE: f64 = 175.0;

/// Largest change of the per-minute distance between two ticks
const MAX_METERS_CHANGE: f64 = 50.0;

/// Generates a bounded walk of per-minute distances.
///
/// The walk is driven by a few incommensurate sinusoids so that runs are
/// reproducible while still looking irregular on the dashboard. Distances are
/// whole wheel revolutions, as a real wheel sensor would report.
pub struct FakeOdometer {
    wheel_circumference: f64,
    ticks: f64,
    meters: f64,
}

impl FakeOdometer {
    pub fn new(wheel_circumference: f64) -> Self {
        Self {
            wheel_circumference,
            ticks: 0.0,
            meters: MAX_METERS_PER_MINUTE / 2.0,
        }
    }

    /// Measurement for the minute containing `at`.
    pub fn next_measurement(&mut self, at: NaiveDateTime) -> Measurement {
        self.ticks += 1.0;
        let t = self.ticks;

        let magnitude = MAX_METERS_CHANGE * (0.5 + 0.5 * (t / 7.3).sin()).abs();
        let mut change = if (t / 2.9).cos() + 0.4 * (t / 11.0).sin() >= 0.0 {
            magnitude
        } else {
            -magnitude
        };
        if !(0.0..=MAX_METERS_PER_MINUTE).contains(&(self.meters + change)) {
            change = -change;
        }
        self.meters = (self.meters + change).clamp(0.0, MAX_METERS_PER_MINUTE);

        let revolutions = (self.meters / self.wheel_circumference).round();
        let meters = revolutions * self.wheel_circumference;
        let meters_per_second = meters / 60.0;

        Measurement::at(at, meters as f32, meters_per_second as f32)
    }
}

/// Remembers the last few sent measurements and sends them again with every
/// new one, so a batch lost in transit is recovered by the next delivery.
pub struct Outbox {
    sent: VecDeque<Measurement>,
    resend: usize,
}

impl Outbox {
    pub fn new(resend: usize) -> Self {
        Self {
            sent: VecDeque::with_capacity(resend),
            resend,
        }
    }

    /// Batch to deliver: the remembered measurements, oldest first, then `next`.
    pub fn batch(&mut self, next: Measurement) -> Vec<Measurement> {
        let mut batch: Vec<Measurement> = self.sent.iter().cloned().collect();
        batch.push(next.clone());

        if self.resend > 0 {
            if self.sent.len() == self.resend {
                self.sent.pop_front();
            }
            self.sent.push_back(next);
        }

        batch
    }
}
