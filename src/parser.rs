//! Sensor line parser.
//!
//! The sensor node emits one ASCII record per line:
//!
//! ```text
//! sound:123 motion:1 temp:21.5 hum:40.2 dist:87
//! sound:123 motion:0 temp:-3.0 hum:40 dist: sin eco
//! ```
//!
//! A live hardware link routinely delivers partial or garbled lines, so a
//! non-matching line is not an error: [`parse_line`] returns `None` and the
//! caller skips it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Distance token the node emits when the ultrasonic sensor got no echo.
pub const NO_ECHO_TOKEN: &str = "sin eco";

/// Sentinel distance value recorded for a no-echo reading.
pub const NO_ECHO_DISTANCE: i64 = -1;

// The pattern is a constant; a failed compile is a programming error.
#[allow(clippy::expect_used)]
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"sound:(?P<sound>\d+)\s+motion:(?P<motion>[01])\s+temp:(?P<temp>-?\d+\.?\d*)\s+hum:(?P<hum>-?\d+\.?\d*)\s+dist[: ]+(?P<dist>sin eco|-?\d+)",
    )
    .expect("sensor line pattern is valid")
});

/// One decoded sensor sample from a single line.
///
/// Ephemeral: produced per matched line, consumed immediately by the
/// aggregator, never persisted directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Raw sound level.
    pub sound: u32,
    /// Motion detector state, 0 or 1.
    pub motion: u8,
    /// Temperature in degrees Celsius.
    pub temp: f64,
    /// Relative humidity in percent.
    pub hum: f64,
    /// Distance in cm, or [`NO_ECHO_DISTANCE`] when the sensor saw no echo.
    pub dist: i64,
}

impl Reading {
    /// Whether the distance field carries a usable measurement.
    pub fn has_valid_distance(&self) -> bool {
        self.dist > 0
    }
}

/// Attempt to extract a [`Reading`] from one line of sensor output.
///
/// Returns `None` when the line does not match the grammar; the caller must
/// silently skip it.
pub fn parse_line(line: &str) -> Option<Reading> {
    let captures = LINE_PATTERN.captures(line)?;

    // The pattern guarantees every named group is present and numeric groups
    // parse, so field extraction cannot fail on a successful match.
    let sound = captures.name("sound")?.as_str().parse().ok()?;
    let motion = captures.name("motion")?.as_str().parse().ok()?;
    let temp = captures.name("temp")?.as_str().parse().ok()?;
    let hum = captures.name("hum")?.as_str().parse().ok()?;
    let dist_raw = captures.name("dist")?.as_str();
    let dist = if dist_raw == NO_ECHO_TOKEN {
        NO_ECHO_DISTANCE
    } else {
        dist_raw.parse().ok()?
    };

    Some(Reading {
        sound,
        motion,
        temp,
        hum,
        dist,
    })
}
