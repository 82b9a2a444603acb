//! Interval aggregation.
//!
//! Reduces the stream of per-line [`Reading`]s to exactly one
//! [`AggregateRecord`] per fixed wall-clock interval. Fields with no sample
//! in an interval carry forward the last known value; temperature and
//! humidity are never averaged and always take the latest sample.

use crate::parser::{Reading, NO_ECHO_DISTANCE};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One fixed-interval reduction of accumulated readings.
///
/// Serde field names are a contract: the window snapshot handed to the
/// external analyzer serializes records with exactly these keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Wall-clock time of the interval tick that produced this record.
    pub timestamp: DateTime<Local>,
    /// Mean of the interval's sound samples, or the last raw sound value.
    pub sound_avg: f64,
    /// Mean of the interval's motion samples thresholded at 0.5 (ties round
    /// up), or the last raw motion value.
    pub motion: u8,
    /// Latest temperature sample.
    pub temp: f64,
    /// Latest humidity sample.
    pub hum: f64,
    /// Mean of the interval's valid distance samples, or the last known
    /// valid distance, or -1.0 if no echo was ever seen.
    pub dist: f64,
}

/// Accumulates readings and reduces them on each interval tick.
#[derive(Debug)]
pub struct IntervalAggregator {
    sound_samples: Vec<u32>,
    motion_samples: Vec<u8>,
    dist_samples: Vec<i64>,

    last_sound: u32,
    last_motion: u8,
    last_temp: f64,
    last_hum: f64,
    last_dist: f64,
}

impl Default for IntervalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalAggregator {
    /// Create an aggregator with no history. The distance starts at the
    /// no-echo sentinel and stays there until a valid sample arrives.
    pub fn new() -> Self {
        Self {
            sound_samples: Vec::new(),
            motion_samples: Vec::new(),
            dist_samples: Vec::new(),
            last_sound: 0,
            last_motion: 0,
            last_temp: 0.0,
            last_hum: 0.0,
            last_dist: NO_ECHO_DISTANCE as f64,
        }
    }

    /// Feed one decoded reading into the current interval.
    pub fn observe(&mut self, reading: &Reading) {
        self.sound_samples.push(reading.sound);
        self.motion_samples.push(reading.motion);
        if reading.has_valid_distance() {
            self.dist_samples.push(reading.dist);
        }

        self.last_sound = reading.sound;
        self.last_motion = reading.motion;
        self.last_temp = reading.temp;
        self.last_hum = reading.hum;
        self.last_dist = reading.dist as f64;
    }

    /// Close the current interval: emit one record and reset the sample
    /// accumulators. Last-seen scalars persist across resets.
    pub fn tick(&mut self, timestamp: DateTime<Local>) -> AggregateRecord {
        let sound_avg = if self.sound_samples.is_empty() {
            self.last_sound as f64
        } else {
            mean_u32(&self.sound_samples)
        };

        let motion = if self.motion_samples.is_empty() {
            self.last_motion
        } else {
            let motion_avg =
                self.motion_samples.iter().map(|&m| m as f64).sum::<f64>()
                    / self.motion_samples.len() as f64;
            u8::from(motion_avg >= 0.5)
        };

        let dist = if self.dist_samples.is_empty() {
            self.last_dist
        } else {
            self.dist_samples.iter().map(|&d| d as f64).sum::<f64>()
                / self.dist_samples.len() as f64
        };

        self.sound_samples.clear();
        self.motion_samples.clear();
        self.dist_samples.clear();

        AggregateRecord {
            timestamp,
            sound_avg,
            motion,
            temp: self.last_temp,
            hum: self.last_hum,
            dist,
        }
    }
}

fn mean_u32(samples: &[u32]) -> f64 {
    samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64
}
