//! Coordinate math and travel-time heuristics.
//!
//! Walk speeds are empirical averages, not derived from world physics. Treat
//! them as tunable constants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Average sprint speed in units per second.
pub const SPRINT_SPEED: f64 = 4.3;

/// Effective sprint speed when the agent periodically stops to eat.
pub const SPRINT_AND_EAT_SPEED: f64 = 3.82;

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Truncated integer coordinates, used for dedup keys.
    pub fn floored(&self) -> (i64, i64, i64) {
        (
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64,
        )
    }

    /// Whether this position is within `tolerance` of `other` on every axis.
    pub fn within_tolerance(&self, other: &Position, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Estimated walk time in seconds between two positions.
///
/// `stop_and_eat` selects the slower average speed that accounts for
/// periodic eating pauses along the route. The small constant bias keeps the
/// estimate nonzero for adjacent points.
pub fn walk_time(from: &Position, to: &Position, stop_and_eat: bool) -> f64 {
    let speed = if stop_and_eat {
        SPRINT_AND_EAT_SPEED
    } else {
        SPRINT_SPEED
    };
    from.distance(to) / speed + 0.1
}

/// Formats a duration in seconds as `hh:mm:ss`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
