use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in the agent's world, block-scale coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// East/west axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// North/south axis.
    pub z: f64,
}

impl Position {
    /// Creates a position from raw coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
    }

    /// Horizontal (XZ plane) distance to another position.
    #[must_use]
    pub fn horizontal_distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dz.mul_add(dz, dx * dx).sqrt()
    }

    /// Snaps each coordinate to the nearest whole block.
    ///
    /// Seed inputs are built from rounded positions so that sub-block drift
    /// between two observations of the same spot cannot change the seed.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            z: self.z.round(),
        }
    }

    /// Integer block key, used for map lookups and debounce keys.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn block_key(&self) -> (i64, i64, i64) {
        let rounded = self.rounded();
        (rounded.x as i64, rounded.y as i64, rounded.z as i64)
    }
}

impl Default for Position {
    /// Ground level at the world origin.
    fn default() -> Self {
        Self::new(0.0, 64.0, 0.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Priority attached to a navigation lease request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LeasePriority {
    /// Planned tasks and exploratory fallback.
    Normal,
    /// Time-sensitive work (combat positioning, fleeing hazards).
    High,
    /// Safety monitor interventions; preempts everything else.
    Emergency,
}

impl LeasePriority {
    /// Short human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Emergency => "emergency",
        }
    }

    /// Parses a label, defaulting to [`Self::Normal`] for unknown input.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "high" => Self::High,
            "emergency" => Self::Emergency,
            _ => Self::Normal,
        }
    }
}

impl Default for LeasePriority {
    fn default() -> Self {
        Self::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_order_strictly() {
        assert!(LeasePriority::Emergency > LeasePriority::High);
        assert!(LeasePriority::High > LeasePriority::Normal);
    }

    #[test]
    fn rounding_is_stable_for_sub_block_drift() {
        let a = Position::new(10.2, 64.0, -3.4);
        let b = Position::new(9.8, 64.1, -3.2);
        assert_eq!(a.rounded().block_key(), b.rounded().block_key());
    }

    #[test]
    fn distance_matches_pythagoras() {
        let origin = Position::new(0.0, 0.0, 0.0);
        let target = Position::new(3.0, 0.0, 4.0);
        assert!((origin.distance_to(&target) - 5.0).abs() < f64::EPSILON);
        assert!((origin.horizontal_distance_to(&target) - 5.0).abs() < f64::EPSILON);
    }
}
