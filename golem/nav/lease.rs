use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::LeasePriority;

/// Snapshot of the occupied lease slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseSlot {
    /// Identity of the current holder.
    pub holder: String,
    /// Priority the lease was granted at.
    pub priority: LeasePriority,
    /// Outstanding reentrant acquisitions by the holder.
    pub ref_count: u32,
    /// Grant timestamp.
    pub acquired_at: DateTime<Utc>,
}

/// Diagnostic record handed to the preemption observer when a holder is
/// evicted, and kept so the victim's next failed acquire can be told apart
/// from an ordinary busy rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreemptionNotice {
    /// Holder that lost the lease.
    pub evicted: String,
    /// Priority the evicted holder had been granted.
    pub evicted_priority: LeasePriority,
    /// Holder that forced the eviction.
    pub by: String,
    /// Priority of the preempting request.
    pub by_priority: LeasePriority,
    /// Eviction timestamp.
    pub at: DateTime<Utc>,
}

/// Observer invoked synchronously while a preempting acquire is in flight.
///
/// Its job is to ask whatever the evicted holder was driving (typically an
/// active path-follow) to stop. The arbiter fires and forgets: the observer
/// must not fail the acquire, and the arbiter never waits for the stop to be
/// observed.
pub trait PreemptionObserver: Send + Sync {
    /// Called once per eviction, before the preempting `acquire` returns.
    fn on_preempt(&self, notice: &PreemptionNotice);
}

/// Result of a lease acquisition attempt.
#[derive(Debug)]
pub enum AcquireOutcome {
    /// The lease is held; dropping the guard releases one reference.
    Granted(LeaseGuard),
    /// Held by another holder at equal or greater priority.
    Busy {
        /// Identity of the current holder.
        holder: String,
    },
    /// This requester was the most recent preemption victim. Reported once,
    /// so callers can tell "never got in" apart from "was kicked out".
    Preempted {
        /// Holder that revoked the requester's lease.
        by: String,
    },
}

impl AcquireOutcome {
    /// Whether the acquisition succeeded.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Result of running a closure under [`NavigationArbiter::with_lease`].
#[derive(Debug)]
pub enum LeaseAttempt<T> {
    /// The closure ran to completion and the lease was released.
    Completed(T),
    /// Acquisition failed because another holder owns the lease.
    Busy {
        /// Identity of the current holder.
        holder: String,
    },
    /// Acquisition failed because this holder was just preempted.
    Preempted {
        /// Holder that revoked the lease.
        by: String,
    },
}

struct SlotState {
    slot: Option<LeaseSlot>,
    generation: u64,
}

struct ArbiterInner {
    state: Mutex<SlotState>,
    last_preemption: Mutex<Option<PreemptionNotice>>,
    observer: Mutex<Option<Arc<dyn PreemptionObserver>>>,
    generations: AtomicU64,
}

/// Single source of truth for "who may currently drive movement".
///
/// One instance is constructed at agent startup and injected into every
/// component that touches the movement resource. There is no global.
#[derive(Clone)]
pub struct NavigationArbiter {
    inner: Arc<ArbiterInner>,
}

impl Default for NavigationArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationArbiter {
    /// Creates an arbiter with an empty slot and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArbiterInner {
                state: Mutex::new(SlotState {
                    slot: None,
                    generation: 0,
                }),
                last_preemption: Mutex::new(None),
                observer: Mutex::new(None),
                generations: AtomicU64::new(1),
            }),
        }
    }

    /// Registers the preemption observer, replacing any previous one.
    pub fn set_preemption_observer(&self, observer: Arc<dyn PreemptionObserver>) {
        *self.inner.observer.lock() = Some(observer);
    }

    /// Attempts to acquire the lease for `holder` at `priority`.
    ///
    /// Succeeds immediately when the slot is empty or already held by the
    /// same holder (reentrant; the ref count is bumped). A strictly higher
    /// priority evicts the current holder: the observer is notified before
    /// this call returns and the victim's ref count is discarded. Equal or
    /// lower priority fails without queueing.
    pub fn acquire(&self, holder: &str, priority: LeasePriority) -> AcquireOutcome {
        let notice = {
            let mut state = self.inner.state.lock();
            match state.slot.as_mut() {
                None => {
                    let generation = self.next_generation();
                    state.slot = Some(LeaseSlot {
                        holder: holder.to_string(),
                        priority,
                        ref_count: 1,
                        acquired_at: Utc::now(),
                    });
                    state.generation = generation;
                    drop(state);
                    self.clear_preemption_record(holder);
                    debug!(holder, priority = priority.label(), "navigation lease granted");
                    return AcquireOutcome::Granted(self.guard(holder, generation));
                }
                Some(slot) if slot.holder == holder => {
                    slot.ref_count += 1;
                    let generation = state.generation;
                    drop(state);
                    debug!(holder, "navigation lease re-entered");
                    return AcquireOutcome::Granted(self.guard(holder, generation));
                }
                Some(slot) if priority > slot.priority => {
                    let notice = PreemptionNotice {
                        evicted: slot.holder.clone(),
                        evicted_priority: slot.priority,
                        by: holder.to_string(),
                        by_priority: priority,
                        at: Utc::now(),
                    };
                    let generation = self.next_generation();
                    state.slot = Some(LeaseSlot {
                        holder: holder.to_string(),
                        priority,
                        ref_count: 1,
                        acquired_at: notice.at,
                    });
                    state.generation = generation;
                    drop(state);
                    *self.inner.last_preemption.lock() = Some(notice.clone());
                    warn!(
                        evicted = notice.evicted.as_str(),
                        by = holder,
                        "navigation lease preempted"
                    );
                    (notice, generation)
                }
                Some(slot) => {
                    let current = slot.holder.clone();
                    drop(state);
                    if let Some(preemption) = self.take_preemption_record(holder) {
                        return AcquireOutcome::Preempted { by: preemption.by };
                    }
                    return AcquireOutcome::Busy { holder: current };
                }
            }
        };
        let (notice, generation) = notice;
        // The observer runs outside the slot lock so it may inspect arbiter
        // state, but still before the preempting acquire returns.
        let observer = self.inner.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_preempt(&notice);
        }
        AcquireOutcome::Granted(self.guard(&notice.by, generation))
    }

    /// Explicit defensive release for `holder`.
    ///
    /// Decrements the ref count and clears the slot at zero. A holder that
    /// does not own the slot is a no-op; an unrelated holder is never
    /// affected.
    pub fn release(&self, holder: &str) {
        let mut state = self.inner.state.lock();
        let cleared = match state.slot.as_mut() {
            Some(slot) if slot.holder == holder => {
                slot.ref_count = slot.ref_count.saturating_sub(1);
                slot.ref_count == 0
            }
            _ => false,
        };
        if cleared {
            state.slot = None;
            drop(state);
            debug!(holder, "navigation lease released");
        }
    }

    /// Runs `run` while holding the lease, releasing on every exit path.
    ///
    /// Acquisition failures are reported without running the closure; the
    /// busy/preempted distinction is preserved so callers can diagnose
    /// oscillation.
    pub async fn with_lease<T, Fut>(
        &self,
        holder: &str,
        priority: LeasePriority,
        run: impl FnOnce() -> Fut,
    ) -> LeaseAttempt<T>
    where
        Fut: Future<Output = T>,
    {
        match self.acquire(holder, priority) {
            AcquireOutcome::Granted(guard) => {
                let value = run().await;
                drop(guard);
                LeaseAttempt::Completed(value)
            }
            AcquireOutcome::Busy { holder } => LeaseAttempt::Busy { holder },
            AcquireOutcome::Preempted { by } => LeaseAttempt::Preempted { by },
        }
    }

    /// Identity of the current holder, if any.
    #[must_use]
    pub fn holder(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .slot
            .as_ref()
            .map(|slot| slot.holder.clone())
    }

    /// Whether the movement resource is currently leased.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().slot.is_some()
    }

    /// Snapshot of the occupied slot for diagnostics.
    #[must_use]
    pub fn slot(&self) -> Option<LeaseSlot> {
        self.inner.state.lock().slot.clone()
    }

    fn guard(&self, holder: &str, generation: u64) -> LeaseGuard {
        LeaseGuard {
            inner: Arc::clone(&self.inner),
            holder: holder.to_string(),
            generation,
        }
    }

    fn next_generation(&self) -> u64 {
        self.inner.generations.fetch_add(1, Ordering::Relaxed)
    }

    fn clear_preemption_record(&self, holder: &str) {
        let mut record = self.inner.last_preemption.lock();
        if record.as_ref().is_some_and(|notice| notice.evicted == holder) {
            *record = None;
        }
    }

    fn take_preemption_record(&self, holder: &str) -> Option<PreemptionNotice> {
        let mut record = self.inner.last_preemption.lock();
        if record.as_ref().is_some_and(|notice| notice.evicted == holder) {
            record.take()
        } else {
            None
        }
    }
}

/// Scoped lease reference. Dropping it releases one acquisition.
///
/// Guards carry the grant generation, so a stale guard held by a preempted
/// holder cannot corrupt a lease that was re-granted later.
pub struct LeaseGuard {
    inner: Arc<ArbiterInner>,
    holder: String,
    generation: u64,
}

impl LeaseGuard {
    /// Identity the guard was granted to.
    #[must_use]
    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if state.generation != self.generation {
            return;
        }
        let cleared = match state.slot.as_mut() {
            Some(slot) if slot.holder == self.holder => {
                slot.ref_count = slot.ref_count.saturating_sub(1);
                slot.ref_count == 0
            }
            _ => false,
        };
        if cleared {
            state.slot = None;
        }
    }
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("holder", &self.holder)
            .field("generation", &self.generation)
            .finish()
    }
}
