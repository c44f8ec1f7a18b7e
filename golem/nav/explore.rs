use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::Position;

/// How many recent choices are remembered for loop avoidance.
const HISTORY_CAPACITY: usize = 8;
/// Candidates closer than this to a remembered choice are retried.
const DEDUP_RADIUS: f64 = 5.0;
/// Maximum `:retry:<n>` recomputations before accepting a colliding candidate.
const RETRY_CAP: u32 = 4;

/// Write-once record of one fallback-target computation.
///
/// Attached to the enclosing action result so audit tooling can verify or
/// replay the choice without recomputing it. Recomputation from live agent
/// position can legitimately diverge once the agent has moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationTrace {
    /// Final seed input string, including any retry suffix.
    pub seed_input: String,
    /// Normalized seed derived from the hash, in `[0, 1)`.
    pub seed: f64,
    /// Number of dedup retries performed.
    pub retry_count: u32,
    /// Position that was chosen.
    pub chosen_position: Position,
    /// Origin the candidate was projected from.
    pub origin_position: Position,
    /// Requested travel distance.
    pub distance: f64,
    /// Symbolic target that triggered the fallback.
    pub symbolic_target: String,
}

/// Chosen fallback position plus its audit trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationChoice {
    /// Concrete world position to navigate to.
    pub position: Position,
    /// Full computation record.
    pub trace: ExplorationTrace,
}

/// One remembered choice in the loop-avoidance ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Chosen X coordinate.
    pub x: f64,
    /// Chosen Z coordinate.
    pub z: f64,
    /// When the choice was made.
    pub chosen_at: DateTime<Utc>,
}

/// Derives deterministic world positions for symbolic navigation targets.
///
/// The seed input is built from immutable facts only (scope, target name,
/// rounded origin, distance); wall-clock time never participates, so
/// identical inputs always yield identical positions.
#[derive(Debug)]
pub struct ExplorationSelector {
    history: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
    dedup_radius: f64,
    retry_cap: u32,
}

impl Default for ExplorationSelector {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY, DEDUP_RADIUS, RETRY_CAP)
    }
}

impl ExplorationSelector {
    /// Creates a selector with explicit tuning, mainly for tests.
    #[must_use]
    pub fn new(capacity: usize, dedup_radius: f64, retry_cap: u32) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            dedup_radius,
            retry_cap,
        }
    }

    /// Chooses a concrete position for a symbolic target.
    ///
    /// Candidates colliding with recent choices are recomputed with a
    /// `:retry:<n>` suffix up to the retry cap; an exhausted cap accepts the
    /// last candidate rather than failing the action.
    pub fn select(
        &self,
        scope: &str,
        symbolic_target: &str,
        origin: Position,
        distance: f64,
    ) -> ExplorationChoice {
        let rounded = origin.rounded();
        let base = format!(
            "{scope}|{symbolic_target}|{},{},{}|{distance}",
            rounded.x, rounded.y, rounded.z
        );

        let mut seed_input = base.clone();
        let mut seed = seed_fraction(&seed_input);
        let mut candidate = project(origin, distance, seed);
        let mut retry_count = 0;

        while retry_count < self.retry_cap && self.collides(&candidate) {
            retry_count += 1;
            seed_input = format!("{base}:retry:{retry_count}");
            seed = seed_fraction(&seed_input);
            candidate = project(origin, distance, seed);
        }

        self.remember(&candidate);
        debug!(
            target = symbolic_target,
            retries = retry_count,
            chosen = %candidate,
            "exploration fallback selected"
        );

        ExplorationChoice {
            position: candidate,
            trace: ExplorationTrace {
                seed_input,
                seed,
                retry_count,
                chosen_position: candidate,
                origin_position: origin,
                distance,
                symbolic_target: symbolic_target.to_string(),
            },
        }
    }

    /// Recently chosen positions, oldest first.
    #[must_use]
    pub fn recent_choices(&self) -> Vec<HistoryEntry> {
        self.history.lock().iter().copied().collect()
    }

    fn collides(&self, candidate: &Position) -> bool {
        self.history.lock().iter().any(|entry| {
            let dx = candidate.x - entry.x;
            let dz = candidate.z - entry.z;
            dz.mul_add(dz, dx * dx).sqrt() < self.dedup_radius
        })
    }

    fn remember(&self, candidate: &Position) {
        let mut history = self.history.lock();
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(HistoryEntry {
            x: candidate.x,
            z: candidate.z,
            chosen_at: Utc::now(),
        });
    }
}

/// Maps a seed input string to a float in `[0, 1)`.
///
/// SHA-256 keeps the mapping collision resistant; only the top 53 bits feed
/// the float so the result is exactly representable and bit-stable.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seed_fraction(input: &str) -> f64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let value = u64::from_be_bytes(bytes) >> 11;
    value as f64 / (1_u64 << 53) as f64
}

fn project(origin: Position, distance: f64, seed: f64) -> Position {
    let angle = seed * std::f64::consts::TAU;
    Position::new(
        distance.mul_add(angle.cos(), origin.x),
        origin.y,
        distance.mul_add(angle.sin(), origin.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Position = Position::new(100.0, 64.0, -40.0);

    #[test]
    fn seed_fraction_is_deterministic_and_bounded() {
        let input = "task-7|frontier|100,64,-40|32";
        let first = seed_fraction(input);
        let second = seed_fraction(input);
        assert!(first.to_bits() == second.to_bits());
        assert!((0.0..1.0).contains(&first));
    }

    #[test]
    fn changing_any_fact_changes_the_seed() {
        let base = seed_fraction("task-7|frontier|100,64,-40|32");
        assert_ne!(base, seed_fraction("task-8|frontier|100,64,-40|32"));
        assert_ne!(base, seed_fraction("task-7|cave|100,64,-40|32"));
        assert_ne!(base, seed_fraction("task-7|frontier|101,64,-40|32"));
        assert_ne!(base, seed_fraction("task-7|frontier|100,64,-40|48"));
    }

    #[test]
    fn identical_requests_are_replayable() {
        let selector = ExplorationSelector::default();
        let other = ExplorationSelector::default();
        let a = selector.select("task-7", "frontier", ORIGIN, 32.0);
        let b = other.select("task-7", "frontier", ORIGIN, 32.0);
        assert_eq!(a.trace.seed_input, b.trace.seed_input);
        assert!((a.position.x - b.position.x).abs() < f64::EPSILON);
        assert!((a.position.z - b.position.z).abs() < f64::EPSILON);
    }

    #[test]
    fn candidate_lies_at_requested_distance() {
        let selector = ExplorationSelector::default();
        let choice = selector.select("task-7", "frontier", ORIGIN, 32.0);
        let travelled = ORIGIN.horizontal_distance_to(&choice.position);
        assert!((travelled - 32.0).abs() < 1e-6);
    }

    #[test]
    fn repeated_requests_retry_away_from_history() {
        let selector = ExplorationSelector::default();
        let first = selector.select("task-7", "frontier", ORIGIN, 40.0);
        assert_eq!(first.trace.retry_count, 0);

        let second = selector.select("task-7", "frontier", ORIGIN, 40.0);
        // The unretried candidate is identical to the first choice, so at
        // least one retry must have happened.
        assert!(second.trace.retry_count >= 1);
        if second.trace.retry_count < RETRY_CAP {
            let gap = first.position.horizontal_distance_to(&second.position);
            assert!(gap >= DEDUP_RADIUS);
        }
        assert!(second.trace.seed_input.contains(":retry:"));
    }

    #[test]
    fn exhausted_retries_accept_the_last_candidate() {
        let selector = ExplorationSelector::new(HISTORY_CAPACITY, DEDUP_RADIUS, 0);
        let first = selector.select("task-7", "frontier", ORIGIN, 32.0);
        let second = selector.select("task-7", "frontier", ORIGIN, 32.0);
        assert_eq!(second.trace.retry_count, 0);
        assert!((first.position.x - second.position.x).abs() < f64::EPSILON);
    }

    #[test]
    fn history_is_bounded() {
        let selector = ExplorationSelector::default();
        for index in 0..12 {
            let scope = format!("task-{index}");
            selector.select(&scope, "frontier", ORIGIN, 64.0);
        }
        assert_eq!(selector.recent_choices().len(), HISTORY_CAPACITY);
    }

    #[test]
    fn trace_records_the_inputs() {
        let selector = ExplorationSelector::default();
        let choice = selector.select("task-7", "frontier", ORIGIN, 32.0);
        assert_eq!(choice.trace.symbolic_target, "frontier");
        assert!((choice.trace.distance - 32.0).abs() < f64::EPSILON);
        assert!(choice.trace.seed_input.starts_with("task-7|frontier|"));
        assert!((choice.trace.seed - seed_fraction(&choice.trace.seed_input)).abs() < f64::EPSILON);
    }
}
