//! Shutdown coordination.
//!
//! # Responsibilities
//! - Turn a trigger into a bounded stop sequence over every hook
//! - Aggregate per-hook outcomes into a [`ShutdownReport`]
//! - Decide the process exit status
//!
//! # Design Decisions
//! - One deadline for the whole sequence, derived from the shutdown grace
//! - "forced" (ran out of time) is reported separately from "errored"
//! - Runs at most once; later calls get the cached report

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::lifecycle::hook::HookContext;
use crate::lifecycle::registry::LifecycleRegistry;
use crate::lifecycle::signals::ShutdownTrigger;
use crate::observability::metrics;

/// How a single hook's stop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Success,
    /// The stop operation returned a failure.
    Errored(String),
    /// The stop operation ran out of time and was cut short.
    Forced(String),
}

impl HookOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HookOutcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            HookOutcome::Success => "success",
            HookOutcome::Errored(_) => "errored",
            HookOutcome::Forced(_) => "forced",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            HookOutcome::Success => None,
            HookOutcome::Errored(reason) | HookOutcome::Forced(reason) => Some(reason),
        }
    }
}

impl fmt::Display for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {}", self.label(), reason),
            None => f.write_str(self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub name: String,
    pub outcome: HookOutcome,
    pub elapsed: Duration,
}

/// Outcome of one shutdown attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// What started the shutdown; unset for a bare `stop_all`.
    pub trigger: Option<ShutdownTrigger>,
    /// One entry per hook, in registration order.
    pub hooks: Vec<HookReport>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    pub fn new(hooks: Vec<HookReport>, elapsed: Duration) -> Self {
        Self {
            trigger: None,
            hooks,
            elapsed,
        }
    }

    pub fn with_trigger(mut self, trigger: ShutdownTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn outcome(&self, hook: &str) -> Option<&HookOutcome> {
        self.hooks.iter().find(|r| r.name == hook).map(|r| &r.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &HookReport> {
        self.hooks.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// 0 when every hook stopped cleanly, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

/// Runs the stop sequence once and remembers the result.
pub struct ShutdownCoordinator {
    registry: Arc<LifecycleRegistry>,
    grace: Duration,
    report: OnceCell<ShutdownReport>,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<LifecycleRegistry>, grace: Duration) -> Self {
        Self {
            registry,
            grace,
            report: OnceCell::new(),
        }
    }

    /// Stop every hook within the grace period.
    ///
    /// Only the first call runs the hooks; concurrent and later callers
    /// receive the same report, including the first trigger.
    pub async fn shutdown(&self, trigger: ShutdownTrigger) -> ShutdownReport {
        self.report
            .get_or_init(|| self.run(trigger))
            .await
            .clone()
    }

    /// The report, if shutdown already completed.
    pub fn report(&self) -> Option<&ShutdownReport> {
        self.report.get()
    }

    async fn run(&self, trigger: ShutdownTrigger) -> ShutdownReport {
        tracing::info!(
            trigger = %trigger,
            hooks = self.registry.len(),
            grace_secs = self.grace.as_secs_f64(),
            "Shutting down"
        );

        let started = Instant::now();
        let ctx = HookContext::with_timeout(self.grace);
        let report = self.registry.stop_all(&ctx).await.with_trigger(trigger);
        metrics::record_shutdown_duration(started.elapsed());

        for failure in report.failures() {
            tracing::error!(
                hook = %failure.name,
                kind = failure.outcome.label(),
                reason = failure.outcome.reason().unwrap_or_default(),
                elapsed_ms = failure.elapsed.as_millis() as u64,
                "Hook did not stop cleanly"
            );
        }

        if report.is_clean() {
            tracing::info!(elapsed_ms = report.elapsed.as_millis() as u64, "Graceful shutdown completed");
        } else {
            tracing::error!(
                failed = report.failures().count(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Graceful shutdown failed"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: &[(&str, HookOutcome)]) -> ShutdownReport {
        ShutdownReport::new(
            outcomes
                .iter()
                .map(|(name, outcome)| HookReport {
                    name: name.to_string(),
                    outcome: outcome.clone(),
                    elapsed: Duration::ZERO,
                })
                .collect(),
            Duration::ZERO,
        )
    }

    #[test]
    fn all_success_exits_zero() {
        let report = report(&[("primary", HookOutcome::Success), ("metrics", HookOutcome::Success)]);
        assert!(report.is_clean());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn errored_or_forced_exits_one() {
        let errored = report(&[
            ("primary", HookOutcome::Success),
            ("metrics", HookOutcome::Errored("boom".into())),
        ]);
        assert_eq!(errored.exit_code(), 1);

        let forced = report(&[("primary", HookOutcome::Forced("deadline".into()))]);
        assert_eq!(forced.exit_code(), 1);
        assert_eq!(forced.failures().count(), 1);
    }

    #[test]
    fn outcome_display_names_kind_and_reason() {
        assert_eq!(HookOutcome::Success.to_string(), "success");
        assert_eq!(
            HookOutcome::Forced("drain timed out".into()).to_string(),
            "forced: drain timed out"
        );
    }

    #[test]
    fn empty_report_is_clean() {
        assert!(report(&[]).is_clean());
    }
}
