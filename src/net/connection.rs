//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served by one listener
//! - Publish the count as a gauge
//! - Tell a forced shutdown how much work it abandoned

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Tracks requests in flight on a single service.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    service: Arc<str>,
    active_count: Arc<AtomicU64>,
}

impl InFlightTracker {
    pub fn new(service: &str) -> Self {
        Self {
            service: Arc::from(service),
            active_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a new request. Returns a guard that decrements on drop.
    pub fn track(&self) -> RequestGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::increment_in_flight(&self.service);
        RequestGuard {
            tracker: self.clone(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks one request's lifetime.
#[derive(Debug)]
pub struct RequestGuard {
    tracker: InFlightTracker,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.tracker.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::decrement_in_flight(&self.tracker.service);
    }
}
