//! Window statistics parsed from the analyzer's output.
//!
//! In windowed-stats mode the analyzer prints one line per metric group:
//!
//! ```text
//! temp: mean=22.1 std=0.4
//! hum: mean=55.0 std=1.2
//! sound: mean=12.3 max=87.0
//! motion: count=14
//! dist: count=9
//! ```
//!
//! Lines not starting with a known prefix are ignored, as are tokens with
//! unparseable values. The `motion`/`dist` groups carry a sample count that
//! is converted to elapsed seconds by multiplying by the aggregation
//! interval length.

use std::time::Duration;

/// Statistics derived from one full-window analysis cycle.
///
/// Each field is present only when the analyzer emitted its metric group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStats {
    /// Mean temperature over the window.
    pub temp_mean: Option<f64>,
    /// Temperature standard deviation.
    pub temp_std: Option<f64>,
    /// Mean humidity.
    pub hum_mean: Option<f64>,
    /// Humidity standard deviation.
    pub hum_std: Option<f64>,
    /// Mean sound level.
    pub sound_mean: Option<f64>,
    /// Maximum sound level.
    pub sound_max: Option<f64>,
    /// Seconds with motion detected.
    pub motion_time: Option<f64>,
    /// Seconds with a valid distance echo.
    pub dist_time: Option<f64>,
}

impl WindowStats {
    /// Parse the analyzer's windowed-stats output.
    ///
    /// `interval` is the aggregation interval used to convert sample counts
    /// into elapsed time.
    pub fn parse(output: &str, interval: Duration) -> Self {
        let interval_secs = interval.as_secs_f64();
        let mut stats = Self::default();

        for line in output.lines() {
            let line = line.trim();

            if let Some(rest) = line.strip_prefix("temp:") {
                stats.temp_mean = token_value(rest, "mean").or(stats.temp_mean);
                stats.temp_std = token_value(rest, "std").or(stats.temp_std);
            } else if let Some(rest) = line.strip_prefix("hum:") {
                stats.hum_mean = token_value(rest, "mean").or(stats.hum_mean);
                stats.hum_std = token_value(rest, "std").or(stats.hum_std);
            } else if let Some(rest) = line.strip_prefix("sound:") {
                stats.sound_mean = token_value(rest, "mean").or(stats.sound_mean);
                stats.sound_max = token_value(rest, "max").or(stats.sound_max);
            } else if let Some(rest) = line.strip_prefix("motion:") {
                stats.motion_time =
                    token_value(rest, "count").map(|c| c * interval_secs).or(stats.motion_time);
            } else if let Some(rest) = line.strip_prefix("dist:") {
                stats.dist_time =
                    token_value(rest, "count").map(|c| c * interval_secs).or(stats.dist_time);
            }
        }

        stats
    }

    /// Whether no metric group was recognized at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Find `key=value` among whitespace-separated tokens and parse the value.
fn token_value(tokens: &str, key: &str) -> Option<f64> {
    tokens.split_whitespace().find_map(|token| {
        let (name, value) = token.split_once('=')?;
        if name == key {
            value.parse().ok()
        } else {
            None
        }
    })
}
