use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use golem_nav::{
    bridge::{MovementBridge, NavigateOptions, NavigationReport, WorldQuery},
    debounce::NavDebounce,
    explore::{ExplorationChoice, ExplorationSelector},
    lease::{LeaseAttempt, NavigationArbiter},
    types::{LeasePriority, Position},
};

use crate::{
    action::{DispatchError, Params},
    capability::CancelSignal,
};

/// Default travel distance for symbolic targets with no explicit distance.
const DEFAULT_EXPLORE_DISTANCE: f64 = 32.0;
/// Default travel distance for collection fallback wandering.
const DEFAULT_COLLECT_DISTANCE: f64 = 24.0;
/// How long a handler waits for the path planner to accept commands.
const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything a fixed handler needs to touch the world.
///
/// Built once per dispatched action by the translator; handlers themselves
/// are stateless.
#[derive(Clone)]
pub struct HandlerContext {
    /// Shared movement lease arbiter.
    pub arbiter: NavigationArbiter,
    /// Bridge to the external path planner.
    pub bridge: Arc<dyn MovementBridge>,
    /// Read-only world view.
    pub world: Arc<dyn WorldQuery>,
    /// Deterministic fallback target selector.
    pub selector: Arc<ExplorationSelector>,
    /// Identical-target suppression.
    pub debounce: Arc<NavDebounce>,
    /// Cancellation signal for the enclosing dispatch.
    pub cancel: CancelSignal,
    /// Lease holder identity for this action.
    pub holder: String,
    /// Lease priority for this action.
    pub priority: LeasePriority,
    /// Task scope, fed into the selector's seed input.
    pub scope: String,
    /// Effective budget for the whole handler run.
    pub timeout: Duration,
}

impl HandlerContext {
    async fn drive(&self, target: Position, options: NavigateOptions) -> Result<NavigationReport, DispatchError> {
        if !self.bridge.wait_for_ready(READY_TIMEOUT).await {
            return Err(DispatchError::CapabilityRuntime(
                "movement bridge not ready".to_string(),
            ));
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                self.bridge.stop_navigation().await;
                Err(DispatchError::CapabilityRuntime("navigation cancelled".to_string()))
            }
            report = self.bridge.navigate_to(target, options) => Ok(report),
        }
    }

    fn unwrap_attempt(attempt: LeaseAttempt<Result<Value, DispatchError>>) -> Result<Value, DispatchError> {
        match attempt {
            LeaseAttempt::Completed(value) => value,
            LeaseAttempt::Busy { holder } => Err(DispatchError::NavigationBusy { holder }),
            LeaseAttempt::Preempted { by } => Err(DispatchError::NavigationPreempted { by }),
        }
    }
}

/// In-process execution path for action kinds the generic capability
/// registry cannot serve.
#[async_trait]
pub trait FixedHandler: Send + Sync {
    /// Runs the handler against normalized, reserved-stripped parameters.
    async fn run(&self, ctx: &HandlerContext, params: Params) -> Result<Value, DispatchError>;
}

/// Resolved navigation destination.
enum ResolvedTarget {
    Literal(Position),
    Fallback(ExplorationChoice),
}

impl ResolvedTarget {
    const fn position(&self) -> Position {
        match self {
            Self::Literal(position) => *position,
            Self::Fallback(choice) => choice.position,
        }
    }
}

fn parse_position(value: &Value) -> Option<Position> {
    match value {
        Value::Array(items) if items.len() == 3 => {
            let x = items[0].as_f64()?;
            let y = items[1].as_f64()?;
            let z = items[2].as_f64()?;
            Some(Position::new(x, y, z))
        }
        Value::Object(map) => {
            let x = map.get("x")?.as_f64()?;
            let y = map.get("y")?.as_f64()?;
            let z = map.get("z")?.as_f64()?;
            Some(Position::new(x, y, z))
        }
        _ => None,
    }
}

fn report_json(report: &NavigationReport) -> Value {
    json!({
        "arrived": report.success,
        "final_position": report.final_position,
        "distance_to_goal": report.distance_to_goal,
        "path_length": report.path_length,
        "replans": report.replans,
    })
}

/// Handles `navigate` and `explore`: literal coordinates go straight to the
/// bridge, symbolic names resolve through the deterministic fallback
/// selector, and either way the run holds the navigation lease.
pub struct NavigateHandler;

impl NavigateHandler {
    async fn resolve(
        ctx: &HandlerContext,
        params: &Params,
    ) -> Result<ResolvedTarget, DispatchError> {
        let Some(target) = params.get("target") else {
            return Err(DispatchError::InvalidTarget("no target supplied".to_string()));
        };
        if let Some(position) = parse_position(target) {
            return Ok(ResolvedTarget::Literal(position));
        }
        if let Some(symbolic) = target.as_str() {
            let distance = params
                .get("distance")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_EXPLORE_DISTANCE);
            let origin = ctx.world.agent_position().await;
            let choice = ctx.selector.select(&ctx.scope, symbolic, origin, distance);
            return Ok(ResolvedTarget::Fallback(choice));
        }
        Err(DispatchError::InvalidTarget(format!(
            "unusable target value: {target}"
        )))
    }
}

#[async_trait]
impl FixedHandler for NavigateHandler {
    async fn run(&self, ctx: &HandlerContext, params: Params) -> Result<Value, DispatchError> {
        let resolved = Self::resolve(ctx, &params).await?;
        let target = resolved.position();

        if !ctx.debounce.admit(&NavDebounce::target_key(&target)) {
            return Err(DispatchError::DebouncedTarget);
        }

        let options = NavigateOptions {
            timeout_ms: u64::try_from(ctx.timeout.as_millis()).unwrap_or(u64::MAX),
            arrival_radius: params
                .get("arrival_radius")
                .and_then(Value::as_f64)
                .unwrap_or_else(|| NavigateOptions::default().arrival_radius),
        };

        let attempt = ctx
            .arbiter
            .with_lease(&ctx.holder, ctx.priority, || async {
                let report = ctx.drive(target, options).await?;
                if !report.success {
                    let detail = report
                        .error
                        .unwrap_or_else(|| "navigation did not arrive".to_string());
                    return Err(DispatchError::CapabilityRuntime(detail));
                }
                info!(holder = ctx.holder.as_str(), target = %target, "navigation arrived");
                let mut data = report_json(&report);
                if let ResolvedTarget::Fallback(choice) = &resolved {
                    data["exploration"] = json!(choice.trace);
                }
                Ok(data)
            })
            .await;
        HandlerContext::unwrap_attempt(attempt)
    }
}

/// Handles multi-block placement: one navigation to the base position, then
/// a supervised per-block loop that respects cancellation and skips blocks
/// with no line of sight.
pub struct BulkPlaceHandler;

#[async_trait]
impl FixedHandler for BulkPlaceHandler {
    async fn run(&self, ctx: &HandlerContext, params: Params) -> Result<Value, DispatchError> {
        let base = params
            .get("target")
            .and_then(parse_position)
            .ok_or_else(|| DispatchError::InvalidTarget("placement base required".to_string()))?;
        let block_type = params
            .get("block_type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DispatchError::CapabilityRuntime("block_type must be a string".to_string())
            })?
            .to_string();
        let count = params.get("count").and_then(Value::as_u64).unwrap_or(1);

        let attempt = ctx
            .arbiter
            .with_lease(&ctx.holder, ctx.priority, || async {
                let report = ctx.drive(base, NavigateOptions::default()).await?;
                if !report.success {
                    return Err(DispatchError::CapabilityRuntime(
                        report.error.unwrap_or_else(|| "could not reach placement base".to_string()),
                    ));
                }

                let mut placed = Vec::new();
                let mut skipped = 0_u64;
                for index in 0..count {
                    if ctx.cancel.is_cancelled() {
                        break;
                    }
                    #[allow(clippy::cast_precision_loss)]
                    let slot = Position::new(base.x + index as f64, base.y, base.z);
                    let eye = ctx.world.agent_position().await;
                    if ctx.world.line_of_sight(eye, slot).await {
                        placed.push(slot);
                    } else {
                        skipped += 1;
                        debug!(slot = %slot, "placement slot occluded, skipping");
                    }
                }

                if placed.is_empty() {
                    return Err(DispatchError::CapabilityRuntime(
                        "no placement slot was reachable".to_string(),
                    ));
                }
                Ok(json!({
                    "block_type": block_type,
                    "placed": placed.len(),
                    "skipped": skipped,
                    "cancelled": ctx.cancel.is_cancelled(),
                    "positions": placed,
                }))
            })
            .await;
        HandlerContext::unwrap_attempt(attempt)
    }
}

/// Handles collection with no known source: picks a deterministic wander
/// target, navigates there, and reports where the search should start.
///
/// The inner navigation re-enters the lease already held by the outer scope,
/// so a preemption during the wander surfaces as a single failed action.
pub struct CollectFallbackHandler;

#[async_trait]
impl FixedHandler for CollectFallbackHandler {
    async fn run(&self, ctx: &HandlerContext, params: Params) -> Result<Value, DispatchError> {
        let material = params
            .get("material")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DispatchError::CapabilityRuntime("material must be a string".to_string())
            })?
            .to_string();
        let count = params.get("count").and_then(Value::as_u64).unwrap_or(1);

        let attempt = ctx
            .arbiter
            .with_lease(&ctx.holder, ctx.priority, || async {
                let (search_origin, trace) = match params.get("source").and_then(parse_position) {
                    Some(source) => (source, None),
                    None => {
                        let origin = ctx.world.agent_position().await;
                        let choice = ctx.selector.select(
                            &ctx.scope,
                            &format!("collect:{material}"),
                            origin,
                            DEFAULT_COLLECT_DISTANCE,
                        );
                        (choice.position, Some(choice.trace))
                    }
                };

                // Reentrant: the outer with_lease already holds the slot for
                // this holder, so the nested acquire only bumps the count.
                let inner = ctx
                    .arbiter
                    .with_lease(&ctx.holder, ctx.priority, || async {
                        ctx.drive(search_origin, NavigateOptions::default()).await
                    })
                    .await;
                let report = match inner {
                    LeaseAttempt::Completed(result) => report_json(&result?),
                    LeaseAttempt::Busy { holder } => {
                        return Err(DispatchError::NavigationBusy { holder })
                    }
                    LeaseAttempt::Preempted { by } => {
                        return Err(DispatchError::NavigationPreempted { by })
                    }
                };

                let mut data = json!({
                    "material": material,
                    "count": count,
                    "search_origin": search_origin,
                    "navigation": report,
                });
                if let Some(trace) = trace {
                    data["exploration"] = json!(trace);
                }
                Ok(data)
            })
            .await;
        HandlerContext::unwrap_attempt(attempt)
    }
}
