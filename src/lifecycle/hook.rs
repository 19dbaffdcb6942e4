//! Start/stop hook contract.
//!
//! Anything the orchestrator brings up and tears down (listeners, storage
//! clients, background workers) implements [`LifecycleHook`]. Hooks receive a
//! [`HookContext`] carrying the deadline of the phase they run in and are
//! expected to honor it cooperatively.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::net::listener::ListenerError;

/// Deadline shared by every hook invoked in one lifecycle phase.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    deadline: Instant,
}

impl HookContext {
    /// Context whose deadline is `budget` from now.
    pub fn with_timeout(budget: Duration) -> Self {
        Self::with_deadline(Instant::now() + budget)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Resolves when the deadline passes.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}

/// A named start/stop pair managed by the lifecycle registry.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Name used for duplicate detection and in shutdown reports.
    fn name(&self) -> &str;

    /// Bring the resource up. Must return once it is ready (e.g. the socket
    /// is bound); long-running work belongs in a spawned task.
    async fn on_start(&self, ctx: &HookContext) -> Result<(), HookError>;

    /// Tear the resource down before `ctx` expires. Called at most once by
    /// the coordinator, but implementations tolerate repeated calls.
    async fn on_stop(&self, ctx: &HookContext) -> Result<(), HookError>;
}

/// Failure reported by a single hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("listener task failed: {0}")]
    Serve(#[source] io::Error),

    #[error("listener task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("drain did not finish within {timeout:?} ({in_flight} request(s) still in flight)")]
    DrainTimeout { timeout: Duration, in_flight: u64 },

    #[error("{0}")]
    Failed(String),
}

impl HookError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Whether the hook gave up because its time budget ran out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DrainTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn context_expires_at_deadline() {
        let ctx = HookContext::with_timeout(Duration::from_secs(5));
        assert!(!ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::from_secs(5));

        ctx.expired().await;

        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[test]
    fn drain_timeout_is_a_timeout() {
        let err = HookError::DrainTimeout {
            timeout: Duration::from_secs(1),
            in_flight: 2,
        };
        assert!(err.is_timeout());
        assert!(!HookError::failed("boom").is_timeout());
    }
}
