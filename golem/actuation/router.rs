use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tracing::debug;

use crate::{
    action::{DispatchError, Params},
    capability::{Capability, CapabilityRegistry},
    contract::{ActionContract, DispatchMode, RESERVED_PREFIX},
};

/// Default budget when neither the caller nor the capability supplies one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Execution path chosen for one action.
pub enum RouteDecision {
    /// The fixed in-process handler runs.
    FixedHandler {
        /// Why the handler was chosen (`contract` or the firing guard name).
        reason: String,
    },
    /// The named capability runs.
    Capability(Arc<dyn Capability>),
}

impl std::fmt::Debug for RouteDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedHandler { reason } => {
                f.debug_struct("FixedHandler").field("reason", reason).finish()
            }
            Self::Capability(capability) => f
                .debug_tuple("Capability")
                .field(&capability.name())
                .finish(),
        }
    }
}

impl RouteDecision {
    /// Journal-friendly path label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::FixedHandler { reason } => format!("handler:{reason}"),
            Self::Capability(capability) => format!("capability:{}", capability.name()),
        }
    }
}

/// Runtime predicate that defers a guarded action to its fixed handler.
///
/// A fired guard means the handler has behavior the generic capability
/// cannot express for this specific request.
pub trait DispatchGuard: Send + Sync {
    /// Guard name, recorded as the routing reason when it fires.
    fn name(&self) -> &str;

    /// Whether this guard fires for the normalized parameters.
    fn fires(&self, kind: &str, params: &Params) -> bool;
}

/// Defers multi-block placement to the fixed handler.
pub struct BulkPlacementGuard;

impl DispatchGuard for BulkPlacementGuard {
    fn name(&self) -> &str {
        "bulk_placement"
    }

    fn fires(&self, kind: &str, params: &Params) -> bool {
        kind == "place_block"
            && params
                .get("count")
                .and_then(Value::as_u64)
                .is_some_and(|count| count > 1)
    }
}

/// Defers collection with no known source position to the exploratory
/// fallback handler.
pub struct ExploratoryCollectionGuard;

impl DispatchGuard for ExploratoryCollectionGuard {
    fn name(&self) -> &str {
        "exploratory_collection"
    }

    fn fires(&self, kind: &str, params: &Params) -> bool {
        if kind != "collect_material" {
            return false;
        }
        let explicit = params
            .get("allow_explore")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        explicit || !params.contains_key("source")
    }
}

/// Decides, per action, whether a capability, a guarded capability, or a
/// fixed handler executes.
pub struct DispatchRouter {
    registry: Arc<CapabilityRegistry>,
    guards: Vec<Arc<dyn DispatchGuard>>,
}

impl DispatchRouter {
    /// Creates a router over a registry with the built-in guards.
    #[must_use]
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            guards: vec![
                Arc::new(BulkPlacementGuard),
                Arc::new(ExploratoryCollectionGuard),
            ],
        }
    }

    /// Adds a guard evaluated after the built-ins.
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<dyn DispatchGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    /// Chooses the execution path for normalized parameters.
    ///
    /// `Handler` mode never consults the registry. For the capability paths
    /// an absent name and a non-routable placeholder are distinct fail-fast
    /// errors, both different from a runtime failure of a capability that
    /// did run.
    pub fn route(
        &self,
        contract: &ActionContract,
        params: &Params,
    ) -> Result<RouteDecision, DispatchError> {
        let decision = match contract.dispatch_mode {
            DispatchMode::Handler => RouteDecision::FixedHandler {
                reason: "contract".to_string(),
            },
            DispatchMode::Guarded => {
                let fired = self
                    .guards
                    .iter()
                    .find(|guard| guard.fires(&contract.kind, params));
                match fired {
                    Some(guard) => RouteDecision::FixedHandler {
                        reason: guard.name().to_string(),
                    },
                    None => RouteDecision::Capability(self.capability_for(&contract.kind)?),
                }
            }
            DispatchMode::Leaf => RouteDecision::Capability(self.capability_for(&contract.kind)?),
        };
        debug!(kind = contract.kind.as_str(), path = decision.label().as_str(), "routed");
        Ok(decision)
    }

    fn capability_for(&self, name: &str) -> Result<Arc<dyn Capability>, DispatchError> {
        let Some(capability) = self.registry.get(name) else {
            return Err(DispatchError::UnknownCapability(name.to_string()));
        };
        if !self.registry.is_routable(name) {
            return Err(DispatchError::PlaceholderCapability(name.to_string()));
        }
        Ok(capability)
    }

    /// Removes the dispatch-internal parameter namespace so capability
    /// implementations never observe lease/scope plumbing.
    pub fn strip_reserved(params: &mut Params) {
        params.retain(|key, _| !key.starts_with(RESERVED_PREFIX));
    }

    /// Effective budget: never less than the capability's declared floor.
    #[must_use]
    pub fn effective_timeout(requested: Option<Duration>, floor: Option<Duration>) -> Duration {
        match (requested, floor) {
            (Some(requested), Some(floor)) => requested.max(floor),
            (Some(requested), None) => requested,
            (None, Some(floor)) => floor.max(DEFAULT_TIMEOUT),
            (None, None) => DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractTable;
    use serde_json::json;

    fn router() -> DispatchRouter {
        DispatchRouter::new(Arc::new(CapabilityRegistry::production_default()))
    }

    fn params_of(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn leaf_mode_routes_to_capability() {
        let table = ContractTable::builtin();
        let contract = table.get("craft_item").unwrap();
        let decision = router()
            .route(contract, &params_of(json!({ "recipe": "torch" })))
            .unwrap();
        assert!(matches!(decision, RouteDecision::Capability(_)));
    }

    #[test]
    fn handler_mode_ignores_registry() {
        let table = ContractTable::builtin();
        let contract = table.get("navigate").unwrap();
        // Empty registry: navigate still routes to its handler.
        let empty = DispatchRouter::new(Arc::new(CapabilityRegistry::new()));
        let decision = empty
            .route(contract, &params_of(json!({ "target": [0, 64, 0] })))
            .unwrap();
        assert!(matches!(decision, RouteDecision::FixedHandler { .. }));
    }

    #[test]
    fn unknown_and_placeholder_errors_are_distinct() {
        let table = ContractTable::builtin();
        let contract = table.get("smelt_item").unwrap();
        let error = router()
            .route(contract, &params_of(json!({ "input": "iron_ore" })))
            .unwrap_err();
        assert!(matches!(error, DispatchError::PlaceholderCapability(_)));

        let empty = DispatchRouter::new(Arc::new(CapabilityRegistry::new()));
        let error = empty
            .route(
                table.get("craft_item").unwrap(),
                &params_of(json!({ "recipe": "torch" })),
            )
            .unwrap_err();
        assert!(matches!(error, DispatchError::UnknownCapability(_)));
    }

    #[test]
    fn bulk_placement_guard_fires_only_above_one() {
        let table = ContractTable::builtin();
        let contract = table.get("place_block").unwrap();
        let routed = router()
            .route(
                contract,
                &params_of(json!({ "block_type": "stone", "target": [0, 64, 0], "count": 4 })),
            )
            .unwrap();
        match routed {
            RouteDecision::FixedHandler { reason } => assert_eq!(reason, "bulk_placement"),
            other => panic!("expected handler, got {other:?}"),
        }

        let single = router()
            .route(
                contract,
                &params_of(json!({ "block_type": "stone", "target": [0, 64, 0], "count": 1 })),
            )
            .unwrap();
        assert!(matches!(single, RouteDecision::Capability(_)));
    }

    #[test]
    fn collection_without_source_defers_to_handler() {
        let table = ContractTable::builtin();
        let contract = table.get("collect_material").unwrap();
        let routed = router()
            .route(contract, &params_of(json!({ "material": "oak_log", "count": 1 })))
            .unwrap();
        assert!(matches!(routed, RouteDecision::FixedHandler { .. }));

        let sourced = router()
            .route(
                contract,
                &params_of(
                    json!({ "material": "oak_log", "count": 1, "source": [10, 64, 10] }),
                ),
            )
            .unwrap();
        assert!(matches!(sourced, RouteDecision::Capability(_)));
    }

    #[test]
    fn reserved_namespace_is_stripped() {
        let mut params = params_of(json!({
            "recipe": "torch",
            "__dispatch_holder": "safety",
            "__dispatch_priority": "emergency",
        }));
        DispatchRouter::strip_reserved(&mut params);
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("recipe"));
    }

    #[test]
    fn timeout_never_drops_below_floor() {
        let floor = Some(Duration::from_secs(5));
        assert_eq!(
            DispatchRouter::effective_timeout(Some(Duration::from_secs(1)), floor),
            Duration::from_secs(5)
        );
        assert_eq!(
            DispatchRouter::effective_timeout(Some(Duration::from_secs(9)), floor),
            Duration::from_secs(9)
        );
        assert_eq!(
            DispatchRouter::effective_timeout(None, None),
            DEFAULT_TIMEOUT
        );
    }
}
