use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Loosely structured parameters attached to an action.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Strongly typed identifier for every action that flows through dispatch.
pub type ActionId = Uuid;

/// Abstract intent produced by the planner, consumed once by the translator.
///
/// Immutable after construction; the shape of `parameters` varies by `kind`
/// and is validated against the kind's contract at the dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier.
    pub id: ActionId,
    /// Action kind, the contract lookup key (e.g. `navigate`, `craft_item`).
    pub kind: String,
    /// Raw planner-supplied parameters.
    pub parameters: Params,
    /// Caller-requested budget in milliseconds, if any.
    pub timeout_ms: Option<u64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Correlation identifier for cross-system tracking.
    pub correlation_id: String,
}

impl Action {
    /// Creates a builder for the given kind.
    #[must_use]
    pub fn builder(kind: impl Into<String>) -> ActionBuilder {
        ActionBuilder {
            action: Self {
                id: ActionId::new_v4(),
                kind: kind.into(),
                parameters: Params::new(),
                timeout_ms: None,
                created_at: Utc::now(),
                correlation_id: generate_correlation_id(),
            },
        }
    }

    /// Requested timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Builder used to construct actions fluently.
#[derive(Debug)]
pub struct ActionBuilder {
    action: Action,
}

impl ActionBuilder {
    /// Sets one parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.action.parameters.insert(key.into(), value);
        self
    }

    /// Replaces the whole parameter map.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.action.parameters = params;
        self
    }

    /// Sets the timeout budget.
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.action.timeout_ms = Some(timeout_ms);
        self
    }

    /// Supplies a correlation identifier.
    #[must_use]
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.action.correlation_id = correlation_id.into();
        self
    }

    /// Consumes the builder returning the finalized action.
    #[must_use]
    pub fn build(self) -> Action {
        self.action
    }
}

fn generate_correlation_id() -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Errors surfaced through the dispatch lifecycle. Never retried internally;
/// retry policy belongs to the planner/behavior layer above.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum DispatchError {
    /// Normalization found required keys absent.
    #[error("required parameters absent for '{kind}': {keys:?}")]
    MissingParameters {
        /// Action kind that was normalized.
        kind: String,
        /// Keys still missing after aliasing and defaults.
        keys: Vec<String>,
    },
    /// No capability registered under the routed name.
    #[error("no capability registered under '{0}'")]
    UnknownCapability(String),
    /// A capability exists but is an unimplemented placeholder.
    #[error("capability '{0}' is an unimplemented placeholder")]
    PlaceholderCapability(String),
    /// Lease acquisition failed without preemption; the caller may retry.
    #[error("navigation lease held by {holder}")]
    NavigationBusy {
        /// Identity of the current holder.
        holder: String,
    },
    /// This caller's prior lease was just revoked by a higher priority.
    #[error("navigation lease preempted by {by}")]
    NavigationPreempted {
        /// Holder that revoked the lease.
        by: String,
    },
    /// An identical navigation target was rejected inside the debounce window.
    #[error("identical navigation target rejected inside debounce window")]
    DebouncedTarget,
    /// The chosen executor ran and reported failure.
    #[error("capability reported failure: {0}")]
    CapabilityRuntime(String),
    /// The navigation target could not be resolved to coordinates.
    #[error("invalid navigation target: {0}")]
    InvalidTarget(String),
}

impl DispatchError {
    /// Stable machine-branchable taxonomy label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingParameters { .. } => "missing_parameters",
            Self::UnknownCapability(_) => "unknown_capability",
            Self::PlaceholderCapability(_) => "placeholder_capability",
            Self::NavigationBusy { .. } => "navigation_busy",
            Self::NavigationPreempted { .. } => "navigation_preempted",
            Self::DebouncedTarget => "debounced_target",
            Self::CapabilityRuntime(_) => "capability_runtime_failure",
            Self::InvalidTarget(_) => "invalid_target",
        }
    }
}

/// Uniform terminal value returned to the dispatching caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action succeeded.
    pub success: bool,
    /// Executor-produced payload, when successful.
    pub data: Option<serde_json::Value>,
    /// `code: detail` error string, when failed. The prefix before the first
    /// colon is the [`DispatchError::code`] label, specific enough to drive
    /// branching logic in callers.
    pub error: Option<String>,
}

impl ActionResult {
    /// Successful result carrying a payload.
    #[must_use]
    pub const fn succeeded(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed result derived from a dispatch error.
    #[must_use]
    pub fn failed(error: &DispatchError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(format!("{}: {error}", error.code())),
        }
    }

    /// Taxonomy label parsed back out of the error string.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(|error| error.split(':').next().unwrap_or(error))
    }
}

/// Lifecycle stage recorded in the dispatch journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchStage {
    /// Parameters were normalized against the contract.
    Normalized {
        /// Number of non-fatal warnings.
        warnings: usize,
        /// Number of required keys still missing.
        missing: usize,
    },
    /// The router chose an execution path.
    Routed {
        /// `capability:<name>` or `handler:<reason>`.
        path: String,
    },
    /// The navigation lease was granted to this action.
    LeaseGranted {
        /// Holder identity the lease was granted to.
        holder: String,
    },
    /// The navigation lease was refused.
    LeaseRejected {
        /// Taxonomy label of the refusal.
        reason: String,
    },
    /// Terminal outcome.
    Completed {
        /// Whether the action succeeded.
        success: bool,
    },
}

/// Event appended to the dispatch journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    /// Action this event belongs to.
    pub action_id: ActionId,
    /// Action kind.
    pub kind: String,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Stage reached.
    pub stage: DispatchStage,
    /// Optional free-form note.
    pub note: Option<String>,
}

/// Append-only log of dispatch lifecycle events for auditing.
#[derive(Debug, Clone, Default)]
pub struct DispatchJournal {
    entries: Arc<RwLock<Vec<DispatchEvent>>>,
}

impl DispatchJournal {
    /// Creates a new empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: DispatchEvent) {
        self.entries.write().push(event);
    }

    /// Records a stage for an action with no note.
    pub fn record(&self, action: &Action, stage: DispatchStage) {
        self.push(DispatchEvent {
            action_id: action.id,
            kind: action.kind.clone(),
            timestamp: Utc::now(),
            stage,
            note: None,
        });
    }

    /// Snapshot of the whole log.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DispatchEvent> {
        self.entries.read().clone()
    }

    /// Events recorded for one action, in order.
    #[must_use]
    pub fn for_action(&self, action_id: ActionId) -> Vec<DispatchEvent> {
        self.entries
            .read()
            .iter()
            .filter(|event| event.action_id == action_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_assigns_defaults() {
        let action = Action::builder("craft_item")
            .param("item", json!("torch"))
            .timeout_ms(5_000)
            .build();
        assert_eq!(action.kind, "craft_item");
        assert_eq!(action.timeout(), Some(Duration::from_millis(5_000)));
        assert!(action.correlation_id.len() >= 8);
    }

    #[test]
    fn error_codes_round_trip_through_results() {
        let error = DispatchError::NavigationBusy {
            holder: "safety".into(),
        };
        let result = ActionResult::failed(&error);
        assert!(!result.success);
        assert_eq!(result.error_code(), Some("navigation_busy"));
        assert!(result.error.unwrap().contains("safety"));
    }

    #[test]
    fn journal_filters_by_action() {
        let journal = DispatchJournal::new();
        let first = Action::builder("navigate").build();
        let second = Action::builder("craft_item").build();
        journal.record(
            &first,
            DispatchStage::Normalized {
                warnings: 0,
                missing: 0,
            },
        );
        journal.record(&second, DispatchStage::Completed { success: true });
        assert_eq!(journal.for_action(first.id).len(), 1);
        assert_eq!(journal.snapshot().len(), 2);
    }
}
