use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::Position;

/// Tuning passed to the path planner for one navigation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateOptions {
    /// Hard budget for the whole navigation, in milliseconds.
    pub timeout_ms: u64,
    /// Radius around the target considered "arrived".
    pub arrival_radius: f64,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            arrival_radius: 2.0,
        }
    }
}

/// Outcome of one navigation call as reported by the path planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationReport {
    /// Whether the goal was reached within the arrival radius.
    pub success: bool,
    /// Where the agent ended up.
    pub final_position: Position,
    /// Remaining distance to the goal.
    pub distance_to_goal: f64,
    /// Length of the path that was followed.
    pub path_length: f64,
    /// Number of replans the search performed.
    pub replans: u32,
    /// Planner-reported error, when `success` is false.
    pub error: Option<String>,
}

/// Bridge to the external movement/path-planning subsystem.
///
/// Path computation itself is out of scope here; this layer only arbitrates
/// access and translates intents. All methods are cancellation-friendly:
/// `stop_navigation` asks an in-flight `navigate_to` to wind down, and the
/// in-flight call reports failure rather than resuming.
#[async_trait]
pub trait MovementBridge: Send + Sync {
    /// Drives the agent toward `target`, returning when movement settles.
    async fn navigate_to(&self, target: Position, options: NavigateOptions) -> NavigationReport;

    /// Asks the active navigation, if any, to stop. Never blocks on the stop
    /// being observed.
    async fn stop_navigation(&self);

    /// Waits for the planner to accept commands, up to `timeout`.
    async fn wait_for_ready(&self, timeout: Duration) -> bool;

    /// Whether a navigation is currently in flight.
    async fn is_active(&self) -> bool;
}

/// Read-only view of the agent's world.
#[async_trait]
pub trait WorldQuery: Send + Sync {
    /// Current agent position.
    async fn agent_position(&self) -> Position;

    /// Block name at a position, if the chunk is loaded.
    async fn block_at(&self, position: Position) -> Option<String>;

    /// Whether an unobstructed line exists between two points.
    async fn line_of_sight(&self, from: Position, to: Position) -> bool;
}

/// In-process movement bridge used by tests and local development.
///
/// Teleports instantly, records stop requests, and can be scripted to fail
/// the next navigation.
#[derive(Debug, Default)]
pub struct LoopbackMovementBridge {
    position: Mutex<Position>,
    active: Mutex<bool>,
    stop_requests: Mutex<u32>,
    fail_next: Mutex<Option<String>>,
}

impl LoopbackMovementBridge {
    /// Creates a bridge starting at the given position.
    #[must_use]
    pub fn starting_at(position: Position) -> Self {
        let bridge = Self::default();
        *bridge.position.lock() = position;
        bridge
    }

    /// Scripts the next `navigate_to` call to fail with `error`.
    pub fn script_failure(&self, error: impl Into<String>) {
        *self.fail_next.lock() = Some(error.into());
    }

    /// Number of stop requests received so far.
    #[must_use]
    pub fn stop_count(&self) -> u32 {
        *self.stop_requests.lock()
    }

    /// Current simulated agent position.
    #[must_use]
    pub fn position(&self) -> Position {
        *self.position.lock()
    }
}

#[async_trait]
impl MovementBridge for LoopbackMovementBridge {
    async fn navigate_to(&self, target: Position, _options: NavigateOptions) -> NavigationReport {
        if let Some(error) = self.fail_next.lock().take() {
            let position = *self.position.lock();
            return NavigationReport {
                success: false,
                final_position: position,
                distance_to_goal: position.distance_to(&target),
                path_length: 0.0,
                replans: 0,
                error: Some(error),
            };
        }
        let path_length = {
            let mut position = self.position.lock();
            let travelled = position.distance_to(&target);
            *position = target;
            travelled
        };
        NavigationReport {
            success: true,
            final_position: target,
            distance_to_goal: 0.0,
            path_length,
            replans: 0,
            error: None,
        }
    }

    async fn stop_navigation(&self) {
        *self.stop_requests.lock() += 1;
        *self.active.lock() = false;
    }

    async fn wait_for_ready(&self, _timeout: Duration) -> bool {
        true
    }

    async fn is_active(&self) -> bool {
        *self.active.lock()
    }
}

/// In-process world stub with a sparse block map.
#[derive(Debug, Default)]
pub struct LoopbackWorld {
    position: Mutex<Position>,
    blocks: Mutex<HashMap<(i64, i64, i64), String>>,
}

impl LoopbackWorld {
    /// Creates a world with the agent at the given position.
    #[must_use]
    pub fn with_agent_at(position: Position) -> Self {
        let world = Self::default();
        *world.position.lock() = position;
        world
    }

    /// Moves the simulated agent.
    pub fn set_agent_position(&self, position: Position) {
        *self.position.lock() = position;
    }

    /// Places a named block.
    pub fn set_block(&self, position: Position, name: impl Into<String>) {
        self.blocks.lock().insert(position.block_key(), name.into());
    }
}

#[async_trait]
impl WorldQuery for LoopbackWorld {
    async fn agent_position(&self) -> Position {
        *self.position.lock()
    }

    async fn block_at(&self, position: Position) -> Option<String> {
        self.blocks.lock().get(&position.block_key()).cloned()
    }

    async fn line_of_sight(&self, from: Position, to: Position) -> bool {
        // Coarse stub: blocked only when a registered block sits at the
        // midpoint of the segment.
        let midpoint = Position::new(
            (from.x + to.x) / 2.0,
            (from.y + to.y) / 2.0,
            (from.z + to.z) / 2.0,
        );
        !self.blocks.lock().contains_key(&midpoint.block_key())
    }
}
