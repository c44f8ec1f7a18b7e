#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Navigation arbitration for the golem agent.
//!
//! A single movement resource (the path planner) is shared by safety logic,
//! planned tasks, and exploratory fallback. This crate owns the priority
//! lease that serializes access to it, the deterministic fallback-target
//! selector for symbolic navigation intents, and the debounce that rejects
//! thrashing requests.

/// World geometry and lease priorities.
#[path = "../types.rs"]
pub mod types;

/// Navigation errors.
#[path = "../error.rs"]
pub mod error;

/// Priority lease over the shared movement resource.
#[path = "../lease.rs"]
pub mod lease;

/// Deterministic exploration fallback targets.
#[path = "../explore.rs"]
pub mod explore;

/// Bridges to the external movement and world subsystems.
#[path = "../bridge.rs"]
pub mod bridge;

/// Advisory identical-target suppression.
#[path = "../debounce.rs"]
pub mod debounce;

/// Prelude exports for consumers of the navigation layer.
pub mod prelude {
    pub use crate::bridge::{
        LoopbackMovementBridge, LoopbackWorld, MovementBridge, NavigateOptions, NavigationReport,
        WorldQuery,
    };
    pub use crate::debounce::NavDebounce;
    pub use crate::error::NavError;
    pub use crate::explore::{ExplorationChoice, ExplorationSelector, ExplorationTrace};
    pub use crate::lease::{
        AcquireOutcome, LeaseAttempt, LeaseGuard, NavigationArbiter, PreemptionNotice,
        PreemptionObserver,
    };
    pub use crate::types::{LeasePriority, Position};
}
