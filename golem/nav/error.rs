use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the navigation layer.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum NavError {
    /// The lease is held by another holder at equal or greater priority.
    #[error("navigation busy: lease held by {holder}")]
    Busy {
        /// Identity of the current holder.
        holder: String,
    },
    /// This holder's lease was just revoked by a higher-priority request.
    #[error("navigation preempted by {by}")]
    Preempted {
        /// Holder that revoked the lease.
        by: String,
    },
    /// The target could not be resolved to coordinates.
    #[error("invalid navigation target: {0}")]
    InvalidTarget(String),
    /// The movement bridge reported a failure.
    #[error("movement bridge failure: {0}")]
    Bridge(String),
}
