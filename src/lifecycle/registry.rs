//! Ordered registry of lifecycle hooks.
//!
//! # Responsibilities
//! - Enforce unique hook names
//! - Start hooks strictly in registration order
//! - Stop all hooks concurrently under one shared deadline
//!
//! # Design Decisions
//! - The hook list is only mutated through `&mut self` during wiring; once
//!   shared it is read-only, so start/stop need no locking
//! - `start_all` never rolls back; the caller decides what to stop
//! - Each stop runs in its own task so a hung or panicking hook cannot hold
//!   up the others

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::hook::{HookContext, LifecycleHook};
use crate::lifecycle::shutdown::{HookOutcome, HookReport, ShutdownReport};
use crate::observability::metrics;

#[derive(Default)]
pub struct LifecycleRegistry {
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Fails without modifying the registry if the name is taken.
    pub fn register(&mut self, hook: Arc<dyn LifecycleHook>) -> Result<(), LifecycleError> {
        if self.hooks.iter().any(|h| h.name() == hook.name()) {
            return Err(LifecycleError::DuplicateName(hook.name().to_string()));
        }
        tracing::debug!(hook = %hook.name(), position = self.hooks.len(), "Hook registered");
        self.hooks.push(hook);
        Ok(())
    }

    /// Hook names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Start every hook in registration order.
    ///
    /// Hook N is only started once hook N-1 returned. The first failure (or
    /// the context deadline) aborts the sequence; hooks already started are
    /// left running.
    pub async fn start_all(&self, ctx: &HookContext) -> Result<(), LifecycleError> {
        for hook in &self.hooks {
            let name = hook.name();
            let budget = ctx.remaining();
            tracing::debug!(hook = %name, "Starting hook");

            match tokio::time::timeout_at(ctx.deadline(), hook.on_start(ctx)).await {
                Ok(Ok(())) => {
                    metrics::record_hook_start(name, true);
                }
                Ok(Err(source)) => {
                    metrics::record_hook_start(name, false);
                    return Err(LifecycleError::Startup {
                        name: name.to_string(),
                        source,
                    });
                }
                Err(_) => {
                    metrics::record_hook_start(name, false);
                    return Err(LifecycleError::StartupTimeout {
                        name: name.to_string(),
                        budget,
                    });
                }
            }
        }
        Ok(())
    }

    /// Stop every hook concurrently and collect one outcome per hook.
    ///
    /// Returns once all hooks finished or the context deadline passed,
    /// whichever comes first. Outcomes are listed in registration order.
    pub async fn stop_all(&self, ctx: &HookContext) -> ShutdownReport {
        let started = Instant::now();

        let tasks: Vec<(String, JoinHandle<HookReport>)> = self
            .hooks
            .iter()
            .map(|hook| {
                let name = hook.name().to_string();
                (name, tokio::spawn(stop_one(Arc::clone(hook), *ctx)))
            })
            .collect();

        let mut reports = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            let report = match task.await {
                Ok(report) => report,
                Err(e) => HookReport {
                    name,
                    outcome: HookOutcome::Errored(format!("stop hook panicked: {e}")),
                    elapsed: started.elapsed(),
                },
            };
            metrics::record_hook_stop(&report.name, report.outcome.label());
            reports.push(report);
        }

        ShutdownReport::new(reports, started.elapsed())
    }
}

async fn stop_one(hook: Arc<dyn LifecycleHook>, ctx: HookContext) -> HookReport {
    let started = Instant::now();
    let outcome = match tokio::time::timeout_at(ctx.deadline(), hook.on_stop(&ctx)).await {
        Ok(Ok(())) => HookOutcome::Success,
        Ok(Err(e)) if e.is_timeout() => HookOutcome::Forced(e.to_string()),
        Ok(Err(e)) => HookOutcome::Errored(e.to_string()),
        Err(_) => HookOutcome::Forced("stop did not finish before the shutdown deadline".to_string()),
    };
    HookReport {
        name: hook.name().to_string(),
        outcome,
        elapsed: started.elapsed(),
    }
}
