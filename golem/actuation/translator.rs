use std::{sync::Arc, time::Duration};

use serde_json::{json, Value};
use shared_logging::LogLevel;
use tokio::runtime::Handle;
use tracing::warn;

use golem_nav::{
    bridge::{LoopbackMovementBridge, LoopbackWorld, MovementBridge, WorldQuery},
    debounce::NavDebounce,
    explore::ExplorationSelector,
    lease::{
        AcquireOutcome, LeaseAttempt, NavigationArbiter, PreemptionNotice, PreemptionObserver,
    },
    types::LeasePriority,
};

use crate::{
    action::{Action, ActionResult, DispatchError, DispatchJournal, DispatchStage, Params},
    capability::{Capability, CancelSignal, CapabilityContext, CapabilityRegistry, CapabilityStatus},
    contract::{ContractTable, RESERVED_HOLDER, RESERVED_PRIORITY, RESERVED_SCOPE},
    handlers::{
        BulkPlaceHandler, CollectFallbackHandler, FixedHandler, HandlerContext, NavigateHandler,
    },
    normalizer::normalize,
    router::{DispatchRouter, RouteDecision},
    telemetry::ActuationTelemetry,
};

/// Asks the movement bridge to stop whenever a lease holder is evicted.
///
/// Fire and forget: the arbiter must never wait on the stop, so the request
/// is spawned onto the current runtime. Outside a runtime the stop is
/// skipped; the evicted navigation fails on its own when its lease check
/// comes around.
struct StopOnPreempt {
    bridge: Arc<dyn MovementBridge>,
}

impl PreemptionObserver for StopOnPreempt {
    fn on_preempt(&self, notice: &PreemptionNotice) {
        if let Ok(handle) = Handle::try_current() {
            let bridge = Arc::clone(&self.bridge);
            handle.spawn(async move {
                bridge.stop_navigation().await;
            });
        } else {
            warn!(
                evicted = notice.evicted.as_str(),
                "no runtime available to stop preempted navigation"
            );
        }
    }
}

/// Builder assembling a translator from its collaborators.
///
/// Every collaborator has a loopback default so tests and local development
/// need no external world.
pub struct ActionTranslatorBuilder {
    contracts: ContractTable,
    registry: Arc<CapabilityRegistry>,
    bridge: Arc<dyn MovementBridge>,
    world: Arc<dyn WorldQuery>,
    arbiter: NavigationArbiter,
    selector: Arc<ExplorationSelector>,
    debounce: Arc<NavDebounce>,
    journal: DispatchJournal,
    telemetry: Option<ActuationTelemetry>,
}

impl Default for ActionTranslatorBuilder {
    fn default() -> Self {
        Self {
            contracts: ContractTable::builtin(),
            registry: Arc::new(CapabilityRegistry::production_default()),
            bridge: Arc::new(LoopbackMovementBridge::default()),
            world: Arc::new(LoopbackWorld::default()),
            arbiter: NavigationArbiter::new(),
            selector: Arc::new(ExplorationSelector::default()),
            debounce: Arc::new(NavDebounce::default()),
            journal: DispatchJournal::new(),
            telemetry: None,
        }
    }
}

impl ActionTranslatorBuilder {
    /// Replaces the contract table.
    #[must_use]
    pub fn contracts(mut self, contracts: ContractTable) -> Self {
        self.contracts = contracts;
        self
    }

    /// Replaces the capability registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<CapabilityRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the movement bridge.
    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn MovementBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Replaces the world view.
    #[must_use]
    pub fn world(mut self, world: Arc<dyn WorldQuery>) -> Self {
        self.world = world;
        self
    }

    /// Replaces the navigation arbiter.
    #[must_use]
    pub fn arbiter(mut self, arbiter: NavigationArbiter) -> Self {
        self.arbiter = arbiter;
        self
    }

    /// Replaces the exploration selector.
    #[must_use]
    pub fn selector(mut self, selector: Arc<ExplorationSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replaces the navigation debounce.
    #[must_use]
    pub fn debounce(mut self, debounce: Arc<NavDebounce>) -> Self {
        self.debounce = debounce;
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn telemetry(mut self, telemetry: ActuationTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the translator and wires the preemption observer.
    #[must_use]
    pub fn build(self) -> ActionTranslator {
        self.arbiter
            .set_preemption_observer(Arc::new(StopOnPreempt {
                bridge: Arc::clone(&self.bridge),
            }));
        let router = DispatchRouter::new(Arc::clone(&self.registry));
        ActionTranslator {
            contracts: self.contracts,
            router,
            bridge: self.bridge,
            world: self.world,
            arbiter: self.arbiter,
            selector: self.selector,
            debounce: self.debounce,
            journal: self.journal,
            telemetry: self.telemetry,
        }
    }
}

/// Single entry point from abstract planner intent to concrete execution.
///
/// Dispatch never retries and never reorders: one action in, one normalized
/// parameter set, one routing decision, one terminal result. Retry policy
/// belongs to the planner above.
pub struct ActionTranslator {
    contracts: ContractTable,
    router: DispatchRouter,
    bridge: Arc<dyn MovementBridge>,
    world: Arc<dyn WorldQuery>,
    arbiter: NavigationArbiter,
    selector: Arc<ExplorationSelector>,
    debounce: Arc<NavDebounce>,
    journal: DispatchJournal,
    telemetry: Option<ActuationTelemetry>,
}

impl ActionTranslator {
    /// Returns a builder with loopback defaults.
    #[must_use]
    pub fn builder() -> ActionTranslatorBuilder {
        ActionTranslatorBuilder::default()
    }

    /// Translates and executes one action end to end.
    pub async fn execute_action(&self, action: &Action, cancel: CancelSignal) -> ActionResult {
        let contract = self.contracts.get(&action.kind);
        let normalization = normalize(action, contract);
        self.journal.record(
            action,
            DispatchStage::Normalized {
                warnings: normalization.warnings.len(),
                missing: normalization.missing_keys.len(),
            },
        );
        for warning in &normalization.warnings {
            self.log(
                LogLevel::Warn,
                "dispatch.normalize.warning",
                json!({ "kind": action.kind, "warning": warning }),
            );
        }

        if !normalization.is_complete() {
            return self.fail(
                action,
                &DispatchError::MissingParameters {
                    kind: action.kind.clone(),
                    keys: normalization.missing_keys,
                },
            );
        }
        let Some(contract) = contract else {
            // A missing contract always surfaces as a missing key above.
            return self.fail(
                action,
                &DispatchError::MissingParameters {
                    kind: action.kind.clone(),
                    keys: vec![format!("contract for kind '{}'", action.kind)],
                },
            );
        };

        let mut params = normalization.params;
        let holder = params
            .get(RESERVED_HOLDER)
            .and_then(Value::as_str)
            .unwrap_or(&action.correlation_id)
            .to_string();
        let priority = params
            .get(RESERVED_PRIORITY)
            .and_then(Value::as_str)
            .map_or(contract.lease_priority, LeasePriority::from_label);
        let scope = params
            .get(RESERVED_SCOPE)
            .and_then(Value::as_str)
            .unwrap_or(&action.correlation_id)
            .to_string();
        DispatchRouter::strip_reserved(&mut params);

        let decision = match self.router.route(contract, &params) {
            Ok(decision) => decision,
            Err(error) => return self.fail(action, &error),
        };
        self.journal.record(
            action,
            DispatchStage::Routed {
                path: decision.label(),
            },
        );

        let outcome = match decision {
            RouteDecision::FixedHandler { .. } => {
                let timeout = DispatchRouter::effective_timeout(action.timeout(), None);
                let ctx = HandlerContext {
                    arbiter: self.arbiter.clone(),
                    bridge: Arc::clone(&self.bridge),
                    world: Arc::clone(&self.world),
                    selector: Arc::clone(&self.selector),
                    debounce: Arc::clone(&self.debounce),
                    cancel,
                    holder: holder.clone(),
                    priority,
                    scope,
                    timeout,
                };
                self.run_handler(&action.kind, &ctx, params, timeout).await
            }
            RouteDecision::Capability(capability) => {
                self.run_capability(
                    capability,
                    contract.requires_movement,
                    &holder,
                    priority,
                    cancel,
                    action,
                    params,
                )
                .await
            }
        };

        match outcome {
            Ok(data) => {
                if contract.requires_movement {
                    self.journal.record(
                        action,
                        DispatchStage::LeaseGranted {
                            holder: holder.clone(),
                        },
                    );
                }
                self.journal
                    .record(action, DispatchStage::Completed { success: true });
                self.emit(
                    "actuation.dispatch.completed",
                    json!({
                        "action_id": action.id,
                        "kind": action.kind,
                        "correlation_id": action.correlation_id,
                    }),
                );
                ActionResult::succeeded(data)
            }
            Err(error) => self.fail(action, &error),
        }
    }

    async fn run_handler(
        &self,
        kind: &str,
        ctx: &HandlerContext,
        params: Params,
        timeout: Duration,
    ) -> Result<Value, DispatchError> {
        let handler: &dyn FixedHandler = match kind {
            "navigate" | "explore" => &NavigateHandler,
            "place_block" => &BulkPlaceHandler,
            "collect_material" => &CollectFallbackHandler,
            other => {
                return Err(DispatchError::CapabilityRuntime(format!(
                    "no fixed handler registered for '{other}'"
                )))
            }
        };
        match tokio::time::timeout(timeout, handler.run(ctx, params)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::CapabilityRuntime(format!(
                "handler timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_capability(
        &self,
        capability: Arc<dyn Capability>,
        requires_movement: bool,
        holder: &str,
        priority: LeasePriority,
        cancel: CancelSignal,
        action: &Action,
        params: Params,
    ) -> Result<Value, DispatchError> {
        let timeout = DispatchRouter::effective_timeout(action.timeout(), capability.min_timeout());
        let ctx = CapabilityContext {
            cancel,
            timeout,
            correlation_id: action.correlation_id.clone(),
        };

        let run = move || async move {
            match tokio::time::timeout(timeout, capability.run(ctx, params)).await {
                Ok(outcome) => match outcome.status {
                    CapabilityStatus::Success => {
                        Ok(outcome.result.unwrap_or(Value::Null))
                    }
                    CapabilityStatus::Failure => Err(DispatchError::CapabilityRuntime(
                        outcome
                            .error
                            .unwrap_or_else(|| "capability failed without detail".to_string()),
                    )),
                },
                Err(_) => Err(DispatchError::CapabilityRuntime(format!(
                    "capability timed out after {}ms",
                    timeout.as_millis()
                ))),
            }
        };

        if requires_movement {
            match self.arbiter.with_lease(holder, priority, run).await {
                LeaseAttempt::Completed(result) => result,
                LeaseAttempt::Busy { holder } => Err(DispatchError::NavigationBusy { holder }),
                LeaseAttempt::Preempted { by } => Err(DispatchError::NavigationPreempted { by }),
            }
        } else {
            run().await
        }
    }

    fn fail(&self, action: &Action, error: &DispatchError) -> ActionResult {
        if matches!(
            error,
            DispatchError::NavigationBusy { .. } | DispatchError::NavigationPreempted { .. }
        ) {
            self.journal.record(
                action,
                DispatchStage::LeaseRejected {
                    reason: error.code().to_string(),
                },
            );
        }
        self.journal
            .record(action, DispatchStage::Completed { success: false });
        self.log(
            LogLevel::Warn,
            "dispatch.failed",
            json!({ "kind": action.kind, "code": error.code() }),
        );
        self.emit(
            "actuation.dispatch.failed",
            json!({
                "action_id": action.id,
                "kind": action.kind,
                "code": error.code(),
                "detail": error.to_string(),
            }),
        );
        ActionResult::failed(error)
    }

    /// Acquires the navigation lease outside of action dispatch, for
    /// long-running behaviors that drive movement directly.
    pub fn acquire_navigation_lease(
        &self,
        holder: &str,
        priority: LeasePriority,
    ) -> AcquireOutcome {
        self.arbiter.acquire(holder, priority)
    }

    /// Explicit release counterpart to [`Self::acquire_navigation_lease`].
    pub fn release_navigation_lease(&self, holder: &str) {
        self.arbiter.release(holder);
    }

    /// Whether the movement resource is currently leased.
    #[must_use]
    pub fn is_navigation_busy(&self) -> bool {
        self.arbiter.is_busy()
    }

    /// The dispatch audit journal.
    #[must_use]
    pub const fn journal(&self) -> &DispatchJournal {
        &self.journal
    }

    /// Known action kinds, in contract order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.contracts.kinds()
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(telemetry) = &self.telemetry {
            if let Err(err) = telemetry.log(level, message, metadata) {
                warn!("telemetry log write failed: {err:?}");
            }
        }
    }

    fn emit(&self, event_type: &str, payload: Value) {
        if let Some(telemetry) = &self.telemetry {
            if let Err(err) = telemetry.event(event_type, payload) {
                warn!("telemetry event emit failed: {err:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{cancellation, CapabilityOutcome};
    use async_trait::async_trait;
    use golem_nav::types::Position;

    fn translator() -> ActionTranslator {
        ActionTranslator::builder().build()
    }

    fn translator_with_bridge() -> (ActionTranslator, Arc<LoopbackMovementBridge>) {
        let bridge = Arc::new(LoopbackMovementBridge::default());
        let translator = ActionTranslator::builder()
            .bridge(bridge.clone() as Arc<dyn MovementBridge>)
            .build();
        (translator, bridge)
    }

    #[tokio::test]
    async fn craft_action_round_trips_through_capability() {
        let translator = translator();
        let action = Action::builder("craft_item")
            .param("item", json!("torch"))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "craft failed: {:?}", result.error);
        let data = result.data.unwrap();
        assert_eq!(data["capability"], json!("craft_item"));
        assert_eq!(data["params"]["recipe"], json!("torch"));
        assert_eq!(data["params"]["qty"], json!(1));

        let stages = translator.journal().for_action(action.id);
        assert!(matches!(stages[0].stage, DispatchStage::Normalized { .. }));
        assert!(matches!(stages[1].stage, DispatchStage::Routed { .. }));
        assert!(matches!(
            stages.last().map(|event| &event.stage),
            Some(DispatchStage::Completed { success: true })
        ));
    }

    #[tokio::test]
    async fn missing_required_parameter_fails_closed() {
        let translator = translator();
        let action = Action::builder("craft_item").build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_code(), Some("missing_parameters"));
        assert!(result.error.unwrap().contains("recipe"));
    }

    #[tokio::test]
    async fn unknown_kind_fails_closed() {
        let translator = translator();
        let action = Action::builder("levitate").build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert_eq!(result.error_code(), Some("missing_parameters"));
    }

    #[tokio::test]
    async fn navigate_moves_the_bridge() {
        let (translator, bridge) = translator_with_bridge();
        let action = Action::builder("navigate")
            .param("pos", json!([12.0, 64.0, -5.0]))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "navigate failed: {:?}", result.error);
        assert_eq!(bridge.position().block_key(), (12, 64, -5));
        assert!(!translator.is_navigation_busy());
    }

    #[tokio::test]
    async fn navigate_while_leased_reports_busy() {
        let translator = translator();
        let _guard =
            translator.acquire_navigation_lease("long_running_behavior", LeasePriority::Normal);
        let action = Action::builder("navigate")
            .param("target", json!([5.0, 64.0, 5.0]))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert_eq!(result.error_code(), Some("navigation_busy"));
        assert!(result.error.unwrap().contains("long_running_behavior"));

        let stages = translator.journal().for_action(action.id);
        assert!(stages
            .iter()
            .any(|event| matches!(&event.stage, DispatchStage::LeaseRejected { reason } if reason == "navigation_busy")));
    }

    #[tokio::test]
    async fn emergency_action_preempts_and_stops_navigation() {
        let (translator, bridge) = translator_with_bridge();
        let victim = translator.acquire_navigation_lease("explore", LeasePriority::Normal);
        assert!(victim.is_granted());

        let action = Action::builder("navigate")
            .param("target", json!([0.0, 64.0, 30.0]))
            .param(RESERVED_HOLDER, json!("safety"))
            .param(RESERVED_PRIORITY, json!("emergency"))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "emergency navigate failed: {:?}", result.error);
        // The observer's stop request is spawned; let it run.
        tokio::task::yield_now().await;
        assert_eq!(bridge.stop_count(), 1);
    }

    #[tokio::test]
    async fn preempted_victim_is_told_why() {
        let translator = translator();
        let victim = translator.acquire_navigation_lease("explore", LeasePriority::Normal);
        assert!(victim.is_granted());
        let takeover =
            translator.acquire_navigation_lease("safety", LeasePriority::Emergency);
        assert!(takeover.is_granted());

        let action = Action::builder("navigate")
            .param("target", json!([5.0, 64.0, 5.0]))
            .param(RESERVED_HOLDER, json!("explore"))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert_eq!(result.error_code(), Some("navigation_preempted"));
        assert!(result.error.unwrap().contains("safety"));
    }

    #[tokio::test]
    async fn explore_resolves_symbolically_with_trace() {
        let translator = translator();
        let action = Action::builder("explore").build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "explore failed: {:?}", result.error);
        let data = result.data.unwrap();
        assert_eq!(data["exploration"]["symbolic_target"], json!("frontier"));
        assert!((data["exploration"]["distance"].as_f64().unwrap() - 32.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn repeated_navigate_target_is_debounced() {
        let translator = translator();
        let first = Action::builder("navigate")
            .param("target", json!([9.0, 64.0, 9.0]))
            .build();
        assert!(translator
            .execute_action(&first, CancelSignal::disarmed())
            .await
            .success);
        let second = Action::builder("navigate")
            .param("target", json!([9.0, 64.0, 9.0]))
            .build();
        let result = translator
            .execute_action(&second, CancelSignal::disarmed())
            .await;
        assert_eq!(result.error_code(), Some("debounced_target"));
    }

    #[tokio::test]
    async fn placeholder_capability_is_refused() {
        let translator = translator();
        let action = Action::builder("smelt_item")
            .param("ore", json!("iron_ore"))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert_eq!(result.error_code(), Some("placeholder_capability"));
    }

    #[tokio::test]
    async fn bulk_placement_routes_to_handler() {
        let translator = translator();
        let action = Action::builder("place_block")
            .param("block", json!("stone"))
            .param("position", json!([3.0, 64.0, 3.0]))
            .param("count", json!(3))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "placement failed: {:?}", result.error);
        let stages = translator.journal().for_action(action.id);
        assert!(stages.iter().any(|event| {
            matches!(&event.stage, DispatchStage::Routed { path } if path == "handler:bulk_placement")
        }));
    }

    #[tokio::test]
    async fn collection_without_source_wanders() {
        let translator = translator();
        let action = Action::builder("collect_material")
            .param("resource", json!("oak_log"))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "collect failed: {:?}", result.error);
        let data = result.data.unwrap();
        assert_eq!(
            data["exploration"]["symbolic_target"],
            json!("collect:oak_log")
        );
    }

    #[tokio::test]
    async fn non_movement_kind_ignores_a_busy_lease() {
        let translator = translator();
        let _guard = translator.acquire_navigation_lease("explore", LeasePriority::Normal);
        let action = Action::builder("use_item")
            .param("item", json!("bread"))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success, "use_item failed: {:?}", result.error);
    }

    struct SlowCapability;

    #[async_trait]
    impl Capability for SlowCapability {
        fn name(&self) -> &str {
            "use_item"
        }

        async fn run(&self, _ctx: CapabilityContext, _params: Params) -> CapabilityOutcome {
            tokio::time::sleep(Duration::from_secs(5)).await;
            CapabilityOutcome::success(Value::Null)
        }
    }

    #[tokio::test]
    async fn slow_capability_times_out() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.register(Arc::new(SlowCapability));
        let translator = ActionTranslator::builder().registry(registry).build();
        let action = Action::builder("use_item")
            .param("item", json!("bread"))
            .timeout_ms(20)
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert_eq!(result.error_code(), Some("capability_runtime_failure"));
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn pre_cancelled_dispatch_fails() {
        let translator = translator();
        let (handle, signal) = cancellation();
        handle.cancel();
        let action = Action::builder("craft_item")
            .param("item", json!("torch"))
            .build();
        let result = translator.execute_action(&action, signal).await;
        assert_eq!(result.error_code(), Some("capability_runtime_failure"));
    }

    #[tokio::test]
    async fn lease_surface_round_trips() {
        let translator = translator();
        assert!(!translator.is_navigation_busy());
        let outcome = translator.acquire_navigation_lease("behavior", LeasePriority::High);
        assert!(outcome.is_granted());
        assert!(translator.is_navigation_busy());
        drop(outcome);
        translator.release_navigation_lease("behavior");
        assert!(!translator.is_navigation_busy());
    }

    #[tokio::test]
    async fn dispatch_outcomes_reach_the_audit_bus() {
        let bus = Arc::new(shared_event_bus::MemoryEventBus::new(16));
        let telemetry = ActuationTelemetry::builder("actuation")
            .event_sink(bus.clone())
            .build()
            .unwrap();
        let translator = ActionTranslator::builder().telemetry(telemetry).build();

        let ok = Action::builder("craft_item")
            .param("item", json!("torch"))
            .build();
        assert!(translator
            .execute_action(&ok, CancelSignal::disarmed())
            .await
            .success);
        let bad = Action::builder("craft_item").build();
        assert!(!translator
            .execute_action(&bad, CancelSignal::disarmed())
            .await
            .success);
        tokio::task::yield_now().await;

        assert_eq!(bus.snapshot_of("actuation.dispatch.completed").len(), 1);
        let failed = bus.snapshot_of("actuation.dispatch.failed");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].payload["code"], json!("missing_parameters"));
    }

    #[tokio::test]
    async fn explore_starts_from_agent_position() {
        let world = Arc::new(LoopbackWorld::with_agent_at(Position::new(100.0, 64.0, -40.0)));
        let translator = ActionTranslator::builder()
            .world(world as Arc<dyn WorldQuery>)
            .build();
        let action = Action::builder("explore")
            .param("radius", json!(16.0))
            .build();
        let result = translator
            .execute_action(&action, CancelSignal::disarmed())
            .await;
        assert!(result.success);
        let trace = result.data.unwrap()["exploration"].clone();
        assert!(trace["seed_input"]
            .as_str()
            .unwrap()
            .contains("|frontier|100,64,-40|16"));
    }
}
