#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Intent dispatch for the golem agent.
//!
//! The planner emits abstract actions; this crate normalizes their
//! parameters against per-kind contracts, routes each action to a registered
//! capability or a fixed in-process handler, and holds the navigation lease
//! for anything that drives movement. Every decision is journaled so a
//! failed dispatch can be reconstructed after the fact.

/// Actions, dispatch errors, results, and the audit journal.
#[path = "../action.rs"]
pub mod action;

/// Per-kind parameter contracts and the reserved dispatch namespace.
#[path = "../contract.rs"]
pub mod contract;

/// Contract-driven parameter normalization.
#[path = "../normalizer.rs"]
pub mod normalizer;

/// Capability trait, registry, and cancellation plumbing.
#[path = "../capability.rs"]
pub mod capability;

/// Routing between capabilities and fixed handlers.
#[path = "../router.rs"]
pub mod router;

/// Fixed in-process handlers for movement-centric kinds.
#[path = "../handlers.rs"]
pub mod handlers;

/// The action translator, the single dispatch entry point.
#[path = "../translator.rs"]
pub mod translator;

/// Logging and audit-event sinks.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Prelude exports for consumers of the dispatch layer.
pub mod prelude {
    pub use crate::action::{
        Action, ActionId, ActionResult, DispatchError, DispatchEvent, DispatchJournal,
        DispatchStage, Params,
    };
    pub use crate::capability::{
        cancellation, CancelHandle, CancelSignal, Capability, CapabilityContext,
        CapabilityOutcome, CapabilityRegistry, CapabilityStatus,
    };
    pub use crate::contract::{ActionContract, ContractTable, DispatchMode};
    pub use crate::handlers::{FixedHandler, HandlerContext};
    pub use crate::normalizer::{normalize, NormalizationResult};
    pub use crate::router::{DispatchGuard, DispatchRouter, RouteDecision};
    pub use crate::telemetry::ActuationTelemetry;
    pub use crate::translator::{ActionTranslator, ActionTranslatorBuilder};
}
