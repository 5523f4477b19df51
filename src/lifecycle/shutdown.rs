//! Shutdown coordination for the service.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::lifecycle::hooks::HookReport;

/// Fixed maximum time the drain waits for in-flight requests.
pub const GRACE_DEADLINE: Duration = Duration::from_secs(5);

/// One-shot coordinator for graceful shutdown.
///
/// Cloneable; every clone observes the same trigger. Only the first
/// `trigger()` call fires it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, untriggered coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the trigger. Returns `true` only for the call that fired it.
    pub fn trigger(&self) -> bool {
        let fired = self.tx.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        });
        if !fired {
            tracing::debug!("Shutdown already triggered, ignoring");
        }
        fired
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the trigger has fired.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How the drain phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request finished before the deadline.
    Completed { elapsed: Duration },
    /// The deadline elapsed; remaining connections were dropped.
    TimedOut { in_flight: u64, deadline: Duration },
    /// The serve task failed while draining.
    Failed { reason: String },
}

/// Everything the shutdown sequence did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub hooks: HookReport,
    pub drain: DrainOutcome,
}

impl ShutdownReport {
    /// Whether the listener had to be closed before requests finished.
    pub fn forced(&self) -> bool {
        matches!(self.drain, DrainOutcome::TimedOut { .. })
    }
}
