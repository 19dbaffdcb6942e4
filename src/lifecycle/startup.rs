//! Service wiring.
//!
//! # Responsibilities
//! - Derive per-listener settings from the config snapshot
//! - Construct the primary and metrics listeners
//! - Register them in start order
//!
//! # Design Decisions
//! - Explicit, hand-ordered wiring: primary first, metrics second
//! - The metrics listener's start policy comes from config

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigSnapshot;
use crate::http::{metrics_router, primary_router};
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::registry::LifecycleRegistry;
use crate::service::{ServiceHandle, ServiceSettings, StartPolicy};

pub const PRIMARY: &str = "primary";
pub const METRICS: &str = "metrics";

/// Handles to the listeners registered by [`bootstrap`].
#[derive(Clone)]
pub struct Services {
    pub primary: Arc<ServiceHandle>,
    pub metrics: Arc<ServiceHandle>,
}

/// Settings for the primary listener.
pub fn primary_settings(config: &ConfigSnapshot) -> ServiceSettings {
    ServiceSettings::new(config.primary_address())
        .with_timeouts(config.server.timeouts())
        .with_drain_timeout(config.lifecycle.shutdown_grace())
        .with_policy(StartPolicy::Required)
}

/// Settings for the metrics listener.
pub fn metrics_settings(config: &ConfigSnapshot) -> ServiceSettings {
    let policy = if config.lifecycle.metrics_required {
        StartPolicy::Required
    } else {
        StartPolicy::Optional
    };
    ServiceSettings::new(config.metrics_address())
        .with_timeouts(config.server.timeouts())
        .with_drain_timeout(config.lifecycle.shutdown_grace())
        .with_policy(policy)
}

/// Build the listeners and the registry that owns them.
///
/// `context` is the process context; a listener whose accept loop dies
/// cancels it.
pub fn bootstrap(
    config: &ConfigSnapshot,
    metrics_handle: PrometheusHandle,
    context: &CancellationToken,
) -> Result<(LifecycleRegistry, Services), LifecycleError> {
    let primary = Arc::new(ServiceHandle::new(
        PRIMARY,
        primary_settings(config),
        primary_router(config),
        context.clone(),
    ));
    let metrics = Arc::new(ServiceHandle::new(
        METRICS,
        metrics_settings(config),
        metrics_router(metrics_handle),
        context.clone(),
    ));

    let mut registry = LifecycleRegistry::new();
    registry.register(primary.clone())?;
    registry.register(metrics.clone())?;

    tracing::info!(
        primary = %config.primary_address(),
        metrics = %config.metrics_address(),
        metrics_required = config.lifecycle.metrics_required,
        "Services wired"
    );

    Ok((registry, Services { primary, metrics }))
}
