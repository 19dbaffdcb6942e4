//! Process lifecycle: start, wait for a trigger, shut down.

use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::hook::HookContext;
use crate::lifecycle::registry::LifecycleRegistry;
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::lifecycle::signals::{ShutdownTrigger, SignalWatcher};

/// Drives a fully wired registry through one process run.
pub struct Orchestrator {
    config: Arc<ConfigSnapshot>,
    registry: Arc<LifecycleRegistry>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Orchestrator {
    /// Take ownership of the registry; no hooks can be added afterwards.
    pub fn new(config: Arc<ConfigSnapshot>, registry: LifecycleRegistry) -> Self {
        let registry = Arc::new(registry);
        let coordinator = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&registry),
            config.lifecycle.shutdown_grace(),
        ));
        Self {
            config,
            registry,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Start every hook within the startup budget.
    ///
    /// On failure the hooks that did start are stopped through the
    /// coordinator before the error is returned.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let budget = self.config.lifecycle.startup_timeout();
        tracing::info!(
            hooks = ?self.registry.names(),
            environment = %self.config.environment,
            version = %self.config.version,
            budget_secs = budget.as_secs_f64(),
            "Starting services"
        );

        let ctx = HookContext::with_timeout(budget);
        if let Err(e) = self.registry.start_all(&ctx).await {
            tracing::error!(
                hook = e.hook_name().unwrap_or_default(),
                error = %e,
                "Startup failed, stopping started services"
            );
            self.coordinator.shutdown(ShutdownTrigger::StartupFailed).await;
            return Err(e);
        }

        tracing::info!("All services started");
        Ok(())
    }

    /// Start, block until the watcher fires, then shut down.
    ///
    /// A second termination signal while draining stops waiting and returns
    /// [`LifecycleError::ForcedExit`]. The stop sequence keeps running in its
    /// own task, so the coordinator still runs the hooks only once.
    pub async fn run(&self, watcher: SignalWatcher) -> Result<ShutdownReport, LifecycleError> {
        self.start().await?;

        let (trigger, mut force_exit) = watcher.wait().await;

        let coordinator = Arc::clone(&self.coordinator);
        let mut shutdown = tokio::spawn(async move { coordinator.shutdown(trigger).await });

        tokio::select! {
            joined = &mut shutdown => Ok(joined?),
            signal = force_exit.next() => Err(LifecycleError::ForcedExit(signal)),
        }
    }
}
