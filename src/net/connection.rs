//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently inside the router
//! - Report what was still running when a drain deadline expires

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Tracks active requests for graceful shutdown reporting.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active_count: Arc<AtomicU64>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active request. Returns a guard that decrements on drop.
    pub fn track(&self) -> RequestGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            active_count: Arc::clone(&self.active_count),
        }
    }

    /// Current active request count.
    pub fn in_flight(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Decrements the active count when dropped, including when the request
/// future is cancelled.
#[derive(Debug)]
pub struct RequestGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Outermost layer counting every request that reaches the router.
pub async fn track_in_flight(
    State(tracker): State<InFlightTracker>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = tracker.track();
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_counts() {
        let tracker = InFlightTracker::new();
        assert_eq!(tracker.in_flight(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.in_flight(), 1);

        let guard2 = tracker.clone().track();
        assert_eq!(tracker.in_flight(), 2);

        drop(guard1);
        assert_eq!(tracker.in_flight(), 1);

        drop(guard2);
        assert_eq!(tracker.in_flight(), 0);
    }
}
