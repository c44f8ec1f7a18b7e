use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::types::Position;

/// Advisory suppression of identical-target navigation requests.
///
/// A second request for the same target inside the window is rejected
/// outright rather than queued; distinct targets are unaffected. This exists
/// to stop thrashing, not to provide fairness or ordering.
#[derive(Debug)]
pub struct NavDebounce {
    window: Duration,
    last_seen: Mutex<IndexMap<String, Instant>>,
}

impl NavDebounce {
    /// Creates a debounce with the given suppression window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: Mutex::new(IndexMap::new()),
        }
    }

    /// Returns `true` when the request for `key` may proceed.
    pub fn admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut last_seen = self.last_seen.lock();
        last_seen.retain(|_, seen| now.duration_since(*seen) < self.window);
        if last_seen.contains_key(key) {
            return false;
        }
        last_seen.insert(key.to_string(), now);
        true
    }

    /// Canonical debounce key for a navigation target.
    #[must_use]
    pub fn target_key(target: &Position) -> String {
        let (x, y, z) = target.block_key();
        format!("{x},{y},{z}")
    }
}

impl Default for NavDebounce {
    fn default() -> Self {
        Self::new(Duration::from_millis(750))
    }
}
