use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;

use crate::action::Params;

/// Terminal status reported by a capability run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    /// The capability completed its work.
    Success,
    /// The capability ran but could not complete.
    Failure,
}

/// Result returned by a capability run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityOutcome {
    /// Terminal status.
    pub status: CapabilityStatus,
    /// Payload produced on success.
    pub result: Option<serde_json::Value>,
    /// Failure detail, when `status` is failure.
    pub error: Option<String>,
}

impl CapabilityOutcome {
    /// Successful outcome with a payload.
    #[must_use]
    pub const fn success(result: serde_json::Value) -> Self {
        Self {
            status: CapabilityStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    /// Failed outcome with a detail string.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: CapabilityStatus::Failure,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Cancels an in-flight dispatch. Dropping the handle without calling
/// [`CancelHandle::cancel`] leaves the signal disarmed forever.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cancellation signal observed by capabilities and handlers.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever when the
    /// handle was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// A signal that can never fire, for callers without a cancel path.
    #[must_use]
    pub fn disarmed() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }
}

/// Creates a linked cancel handle and signal.
#[must_use]
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Context handed to every capability run.
#[derive(Debug, Clone)]
pub struct CapabilityContext {
    /// Cancellation signal; the capability must stop promptly and report
    /// failure when it fires.
    pub cancel: CancelSignal,
    /// Effective budget for the run (already floored by the capability's
    /// declared minimum).
    pub timeout: Duration,
    /// Correlation identifier of the enclosing action.
    pub correlation_id: String,
}

/// An independently registered, named unit of world-affecting behavior.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry name, matched against action kinds by the router.
    fn name(&self) -> &str;

    /// Minimum viable budget; the router never passes less.
    fn min_timeout(&self) -> Option<Duration> {
        None
    }

    /// Runs the capability against normalized, reserved-stripped parameters.
    async fn run(&self, ctx: CapabilityContext, params: Params) -> CapabilityOutcome;
}

struct RegistryEntry {
    capability: Arc<dyn Capability>,
    routable: bool,
}

/// Registry of capabilities, injected into the router.
///
/// Capabilities register independently of dispatch code and may appear at
/// runtime, so lookup is by name and the set is interior-mutable.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<IndexMap<String, RegistryEntry>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the default loopback capabilities.
    #[must_use]
    pub fn production_default() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(LoopbackCapability::new(
            "craft_item",
            Some(Duration::from_secs(5)),
        )));
        registry.register(Arc::new(LoopbackCapability::new("dig_block", None)));
        registry.register(Arc::new(LoopbackCapability::new("use_item", None)));
        registry.register(Arc::new(LoopbackCapability::new(
            "collect_material",
            Some(Duration::from_secs(10)),
        )));
        registry.register(Arc::new(LoopbackCapability::new("place_block", None)));
        // Declared in the contract table but not yet implemented.
        registry.register_placeholder("smelt_item");
        registry
    }

    /// Registers a routable capability under its own name.
    pub fn register(&self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        self.entries.write().insert(
            name,
            RegistryEntry {
                capability,
                routable: true,
            },
        );
    }

    /// Registers an unimplemented placeholder: present, never routable.
    pub fn register_placeholder(&self, name: &str) {
        self.entries.write().insert(
            name.to_string(),
            RegistryEntry {
                capability: Arc::new(PlaceholderCapability {
                    name: name.to_string(),
                }),
                routable: false,
            },
        );
    }

    /// Capability registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries
            .read()
            .get(name)
            .map(|entry| Arc::clone(&entry.capability))
    }

    /// Whether `name` is registered and actually executable.
    #[must_use]
    pub fn is_routable(&self, name: &str) -> bool {
        self.entries
            .read()
            .get(name)
            .is_some_and(|entry| entry.routable)
    }

    /// Registered names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

/// In-process capability used by tests and local development: echoes its
/// parameters back and honors cancellation.
#[derive(Debug)]
pub struct LoopbackCapability {
    name: String,
    min_timeout: Option<Duration>,
}

impl LoopbackCapability {
    /// Creates a loopback capability with an optional timeout floor.
    #[must_use]
    pub fn new(name: impl Into<String>, min_timeout: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            min_timeout,
        }
    }
}

#[async_trait]
impl Capability for LoopbackCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_timeout(&self) -> Option<Duration> {
        self.min_timeout
    }

    async fn run(&self, ctx: CapabilityContext, params: Params) -> CapabilityOutcome {
        if ctx.cancel.is_cancelled() {
            return CapabilityOutcome::failure("cancelled before start");
        }
        CapabilityOutcome::success(json!({
            "capability": self.name,
            "params": serde_json::Value::Object(params),
        }))
    }
}

struct PlaceholderCapability {
    name: String,
}

#[async_trait]
impl Capability for PlaceholderCapability {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: CapabilityContext, _params: Params) -> CapabilityOutcome {
        CapabilityOutcome::failure("placeholder capability must never run")
    }
}
